//! Crosscast - publish once, everywhere
//!
//! This library implements a cross-platform media publishing pipeline:
//! per-platform upload protocols (chunked media upload for Twitter/X,
//! Graph-API containers for Instagram), concurrent per-file fan-out,
//! asynchronous processing waits, and a single normalized publish
//! result.

pub mod backoff;
pub mod config;
pub mod credentials;
pub mod dispatch;
pub mod error;
pub mod logging;
pub mod platforms;
pub mod stager;
pub mod types;

// Re-export commonly used types
pub use config::Config;
pub use credentials::{CredentialProvider, StaticCredentialProvider};
pub use dispatch::Dispatcher;
pub use error::{CrosscastError, PublishError, Result};
pub use platforms::{PlatformKind, Publisher};
pub use types::{Credentials, MediaFile, PublishResult};
