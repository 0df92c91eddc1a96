//! cross-post - publish text and media to a social platform

use std::io::Read;
use std::path::PathBuf;

use clap::Parser;
use libcrosscast::credentials::load_token_file;
use libcrosscast::error::ConfigError;
use libcrosscast::logging::{LogFormat, LoggingConfig};
use libcrosscast::{
    Config, CrosscastError, Credentials, Dispatcher, MediaFile, PlatformKind, PublishError, Result,
};

#[derive(Parser, Debug)]
#[command(name = "cross-post")]
#[command(about = "Publish text and media to a social platform", long_about = None)]
struct Cli {
    /// Target platform (twitter or instagram)
    platform: String,

    /// Caption text (reads from stdin if not provided)
    caption: Option<String>,

    /// Media file(s) to attach, in post order
    #[arg(short, long = "media")]
    media: Vec<PathBuf>,

    /// Verify the stored credentials instead of publishing
    #[arg(long)]
    check: bool,

    /// Output format (text or json)
    #[arg(short, long, default_value = "text")]
    format: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "error" };
    LoggingConfig::new(LogFormat::Text, filter).init();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config()?;
    let kind: PlatformKind = cli.platform.parse().map_err(CrosscastError::Publish)?;
    let credentials = credentials_for(&config, kind)?;

    let stager_token = match config.stager.as_ref().and_then(|s| s.token_file.as_deref()) {
        Some(path) => Some(load_token_file(path)?),
        None => None,
    };
    let dispatcher = Dispatcher::from_config(&config, reqwest::Client::new(), stager_token)?;

    if cli.check {
        dispatcher
            .check_credentials(&cli.platform, &credentials)
            .await?;
        println!("{} credentials are valid", kind);
        return Ok(());
    }

    let caption = match cli.caption {
        Some(caption) => caption,
        None => read_stdin()?,
    };

    let files = load_media(&cli.media)?;
    if caption.trim().is_empty() && files.is_empty() {
        return Err(CrosscastError::InvalidInput(
            "a post needs a caption, media files, or both".to_string(),
        ));
    }

    let result = dispatcher
        .publish(&cli.platform, &credentials, &caption, &files)
        .await;

    match cli.format.as_str() {
        "json" => {
            let payload = serde_json::json!({
                "platform": kind.as_str(),
                "success": result.success,
                "platform_post_id": result.platform_post_id,
                "error_kind": result.error.as_ref().map(|e| e.kind()),
                "error": result.error.as_ref().map(|e| e.to_string()),
            });
            println!("{}", serde_json::to_string_pretty(&payload).unwrap());
        }
        _ => {
            if result.success {
                println!(
                    "Published to {}: {}",
                    kind,
                    result.platform_post_id.as_deref().unwrap_or("(no id)")
                );
            } else if let Some(error) = &result.error {
                eprintln!("Failed to publish to {}: {}", kind, error);
            }
        }
    }

    match result.error {
        Some(error) => Err(CrosscastError::Publish(error)),
        None => Ok(()),
    }
}

/// Load the config file, falling back to defaults when none exists.
fn load_config() -> Result<Config> {
    match Config::load() {
        Ok(config) => Ok(config),
        Err(CrosscastError::Config(ConfigError::ReadError(_))) => {
            tracing::debug!("no config file found, using defaults");
            Ok(Config::default_config())
        }
        Err(e) => Err(e),
    }
}

/// Assemble credentials for the platform from the configured token
/// files.
fn credentials_for(config: &Config, kind: PlatformKind) -> Result<Credentials> {
    let missing = || {
        CrosscastError::Publish(PublishError::CredentialsNotFound(format!(
            "{} is not configured; add it to the config file",
            kind
        )))
    };

    match kind {
        PlatformKind::Twitter => {
            let twitter = config.twitter.as_ref().filter(|c| c.enabled).ok_or_else(missing)?;
            let token = load_token_file(&twitter.token_file).map_err(CrosscastError::Publish)?;
            Ok(Credentials::bearer(token))
        }
        PlatformKind::Instagram => {
            let instagram = config
                .instagram
                .as_ref()
                .filter(|c| c.enabled)
                .ok_or_else(missing)?;
            let token = load_token_file(&instagram.token_file).map_err(CrosscastError::Publish)?;
            Ok(Credentials::bearer(token).with_account_id(&instagram.account_id))
        }
    }
}

fn read_stdin() -> Result<String> {
    let mut buffer = String::new();
    std::io::stdin()
        .read_to_string(&mut buffer)
        .map_err(|e| CrosscastError::InvalidInput(format!("failed to read stdin: {}", e)))?;
    Ok(buffer.trim().to_string())
}

fn load_media(paths: &[PathBuf]) -> Result<Vec<MediaFile>> {
    paths
        .iter()
        .map(|path| {
            let bytes = std::fs::read(path).map_err(|e| {
                CrosscastError::InvalidInput(format!("failed to read {}: {}", path.display(), e))
            })?;
            let filename = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            Ok(MediaFile::new(filename, bytes))
        })
        .collect()
}
