//! End-to-end dispatcher behavior over mock publishers.

use libcrosscast::platforms::mock::{MockConfig, MockPublisher};
use libcrosscast::platforms::PlatformKind;
use libcrosscast::{
    Credentials, Dispatcher, MediaFile, PublishError, StaticCredentialProvider,
};

fn jpeg_file(name: &str) -> MediaFile {
    let mut bytes = vec![0xFF, 0xD8, 0xFF, 0xE0];
    bytes.resize(512, 0);
    MediaFile::new(name, bytes)
}

fn creds() -> Credentials {
    Credentials::bearer("token")
}

#[tokio::test]
async fn publish_routes_by_platform_name() {
    let twitter = MockPublisher::succeeding("twitter", "tw-1");
    let instagram = MockPublisher::succeeding("instagram", "ig-1");
    let twitter_calls = twitter.config().publish_call_count.clone();
    let instagram_calls = instagram.config().publish_call_count.clone();
    let dispatcher = Dispatcher::new(Box::new(twitter), Box::new(instagram));

    let result = dispatcher
        .publish("twitter", &creds(), "hello", &[jpeg_file("a.jpg")])
        .await;
    assert!(result.success);
    assert_eq!(result.platform_post_id.as_deref(), Some("tw-1"));

    let result = dispatcher
        .publish("instagram", &creds(), "hello", &[jpeg_file("a.jpg")])
        .await;
    assert!(result.success);
    assert_eq!(result.platform_post_id.as_deref(), Some("ig-1"));

    assert_eq!(*twitter_calls.lock().unwrap(), 1);
    assert_eq!(*instagram_calls.lock().unwrap(), 1);
}

#[tokio::test]
async fn every_failure_kind_is_normalized_not_raised() {
    let failures = [
        PublishError::UnsupportedMedia("application/pdf".to_string()),
        PublishError::QuotaExceeded {
            usage: 25,
            total: 25,
        },
        PublishError::Protocol("bad status on FINALIZE: 500".to_string()),
        PublishError::Transient("retry later".to_string()),
        PublishError::Timeout("container readiness".to_string()),
        PublishError::Storage("bucket unreachable".to_string()),
        PublishError::CredentialsNotFound("revoked".to_string()),
    ];

    for error in failures {
        let dispatcher = Dispatcher::new(
            Box::new(MockPublisher::failing("twitter", error.clone())),
            Box::new(MockPublisher::succeeding("instagram", "ig-1")),
        );

        let result = dispatcher.publish("twitter", &creds(), "hello", &[]).await;
        assert!(!result.success);
        assert!(result.platform_post_id.is_none());
        assert_eq!(result.error, Some(error));
    }
}

#[tokio::test]
async fn unknown_platform_never_reaches_a_publisher() {
    let twitter = MockPublisher::succeeding("twitter", "tw-1");
    let calls = twitter.config().publish_call_count.clone();
    let dispatcher = Dispatcher::new(
        Box::new(twitter),
        Box::new(MockPublisher::succeeding("instagram", "ig-1")),
    );

    let result = dispatcher.publish("myspace", &creds(), "hello", &[]).await;

    assert!(!result.success);
    assert_eq!(
        result.error,
        Some(PublishError::UnsupportedPlatform("myspace".to_string()))
    );
    assert_eq!(*calls.lock().unwrap(), 0);
}

#[tokio::test]
async fn empty_request_fails_before_any_platform_call() {
    let twitter = MockPublisher::succeeding("twitter", "tw-1");
    let calls = twitter.config().publish_call_count.clone();
    let dispatcher = Dispatcher::new(
        Box::new(twitter),
        Box::new(MockPublisher::succeeding("instagram", "ig-1")),
    );

    let result = dispatcher.publish("twitter", &creds(), "", &[]).await;

    assert!(!result.success);
    assert_eq!(result.error, Some(PublishError::NoMedia));
    assert_eq!(*calls.lock().unwrap(), 0);
}

#[tokio::test]
async fn caption_and_files_flow_through_unchanged() {
    let twitter = MockPublisher::succeeding("twitter", "tw-1");
    let published = twitter.config().published.clone();
    let dispatcher = Dispatcher::new(
        Box::new(twitter),
        Box::new(MockPublisher::succeeding("instagram", "ig-1")),
    );

    dispatcher
        .publish(
            "twitter",
            &creds(),
            "two attachments",
            &[jpeg_file("a.jpg"), jpeg_file("b.jpg")],
        )
        .await;

    assert_eq!(
        published.lock().unwrap()[0],
        ("two attachments".to_string(), 2)
    );
}

#[tokio::test]
async fn credential_provider_failures_are_normalized() {
    let dispatcher = Dispatcher::new(
        Box::new(MockPublisher::succeeding("twitter", "tw-1")),
        Box::new(MockPublisher::succeeding("instagram", "ig-1")),
    );
    let provider = StaticCredentialProvider::new();

    let result = dispatcher
        .publish_for_user(&provider, "alice", "twitter", "hello", &[])
        .await;

    assert!(!result.success);
    assert!(matches!(
        result.error,
        Some(PublishError::CredentialsNotFound(_))
    ));
}

#[tokio::test]
async fn expired_credentials_fail_before_publish() {
    let twitter = MockPublisher::succeeding("twitter", "tw-1");
    let calls = twitter.config().publish_call_count.clone();
    let dispatcher = Dispatcher::new(
        Box::new(twitter),
        Box::new(MockPublisher::succeeding("instagram", "ig-1")),
    );

    let mut provider = StaticCredentialProvider::new();
    provider.insert(
        "alice",
        PlatformKind::Twitter,
        Credentials::bearer("stale").with_expiry(chrono::Utc::now() - chrono::Duration::days(1)),
    );

    let result = dispatcher
        .publish_for_user(&provider, "alice", "twitter", "hello", &[])
        .await;

    assert!(!result.success);
    assert!(matches!(
        result.error,
        Some(PublishError::CredentialsNotFound(_))
    ));
    assert_eq!(*calls.lock().unwrap(), 0);
}

#[tokio::test]
async fn check_credentials_reports_revocation() {
    let dispatcher = Dispatcher::new(
        Box::new(MockPublisher::succeeding("twitter", "tw-1")),
        Box::new(MockPublisher::new(MockConfig {
            name: "instagram".to_string(),
            credentials_error: Some(PublishError::CredentialsNotFound("revoked".to_string())),
            ..Default::default()
        })),
    );

    assert!(dispatcher
        .check_credentials("twitter", &creds())
        .await
        .is_ok());
    assert!(matches!(
        dispatcher.check_credentials("instagram", &creds()).await,
        Err(PublishError::CredentialsNotFound(_))
    ));
}
