//! Integration tests for the net crate using a local mock server

use httpmock::prelude::*;
use repomirror_errors::{Error, NetworkError};
use repomirror_events::{channel, Event, EventReceiver};
use repomirror_hash::{Checksum, ChecksumAlgorithm};
use repomirror_net::{
    fetch_text, ArtifactDownloader, ArtifactRequest, NetClient, NetConfig, RetryConfig,
};
use std::time::Duration;

fn fast_retry(max_attempts: u32) -> RetryConfig {
    RetryConfig {
        max_attempts,
        initial_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(5),
        backoff_multiplier: 2.0,
        jitter_factor: 0.0,
    }
}

fn drain_events(rx: &mut EventReceiver) -> Vec<Event> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn test_download_artifact_success() {
    let server = MockServer::start();
    let body = b"fake conda artifact payload";

    let mock = server.mock(|when, then| {
        when.method(GET).path("/linux-64/zlib-1.2.13-h166bdaf_4.conda");
        then.status(200).body(body);
    });

    let temp_dir = tempfile::tempdir().unwrap();
    let dest = temp_dir.path().join("zlib-1.2.13-h166bdaf_4.conda");
    let (tx, mut rx) = channel();

    let client = NetClient::with_defaults().unwrap();
    let downloader = ArtifactDownloader::new(client, fast_retry(3));

    let request = ArtifactRequest {
        filename: "zlib-1.2.13-h166bdaf_4.conda".to_string(),
        url: server.url("/linux-64/zlib-1.2.13-h166bdaf_4.conda"),
        expected_size: body.len() as u64,
        checksum: Some(Checksum::of_data(ChecksumAlgorithm::Sha256, body)),
    };

    let size = downloader.download(&request, &dest, &tx).await.unwrap();

    mock.assert();
    assert_eq!(size, body.len() as u64);
    assert_eq!(std::fs::read(&dest).unwrap(), body);
    assert!(!temp_dir
        .path()
        .join("zlib-1.2.13-h166bdaf_4.conda.partial")
        .exists());

    let events = drain_events(&mut rx);
    assert!(events
        .iter()
        .any(|e| matches!(e, Event::DownloadStarted { filename, .. } if filename == "zlib-1.2.13-h166bdaf_4.conda")));
    assert!(events
        .iter()
        .any(|e| matches!(e, Event::DownloadCompleted { size, .. } if *size == body.len() as u64)));
}

#[tokio::test]
async fn test_download_checksum_mismatch_exhausts_retries() {
    let server = MockServer::start();
    let body = b"actual bytes served";

    let mock = server.mock(|when, then| {
        when.method(GET).path("/noarch/tqdm-4.66.1-pyhd8ed1ab_0.conda");
        then.status(200).body(body);
    });

    let temp_dir = tempfile::tempdir().unwrap();
    let dest = temp_dir.path().join("tqdm-4.66.1-pyhd8ed1ab_0.conda");
    let (tx, mut rx) = channel();

    let client = NetClient::with_defaults().unwrap();
    let downloader = ArtifactDownloader::new(client, fast_retry(3));

    let request = ArtifactRequest {
        filename: "tqdm-4.66.1-pyhd8ed1ab_0.conda".to_string(),
        url: server.url("/noarch/tqdm-4.66.1-pyhd8ed1ab_0.conda"),
        expected_size: body.len() as u64,
        checksum: Some(Checksum::of_data(ChecksumAlgorithm::Sha256, b"some other bytes")),
    };

    let failure = downloader.download(&request, &dest, &tx).await.unwrap_err();

    assert!(matches!(
        failure.error,
        Error::Network(NetworkError::ChecksumMismatch { .. })
    ));
    assert_eq!(failure.attempts, 3);
    mock.assert_hits(3);
    assert!(!dest.exists());
    assert!(!temp_dir
        .path()
        .join("tqdm-4.66.1-pyhd8ed1ab_0.conda.partial")
        .exists());

    let events = drain_events(&mut rx);
    let retries = events
        .iter()
        .filter(|e| matches!(e, Event::DownloadRetrying { .. }))
        .count();
    assert_eq!(retries, 2);
}

#[tokio::test]
async fn test_download_not_found_fails_without_retry() {
    let server = MockServer::start();

    let mock = server.mock(|when, then| {
        when.method(GET).path("/linux-64/missing-1.0-0.tar.bz2");
        then.status(404);
    });

    let temp_dir = tempfile::tempdir().unwrap();
    let dest = temp_dir.path().join("missing-1.0-0.tar.bz2");
    let (tx, _rx) = channel();

    let client = NetClient::with_defaults().unwrap();
    let downloader = ArtifactDownloader::new(client, fast_retry(3));

    let request = ArtifactRequest {
        filename: "missing-1.0-0.tar.bz2".to_string(),
        url: server.url("/linux-64/missing-1.0-0.tar.bz2"),
        expected_size: 100,
        checksum: None,
    };

    let failure = downloader.download(&request, &dest, &tx).await.unwrap_err();

    assert!(matches!(
        failure.error,
        Error::Network(NetworkError::NotFound { .. })
    ));
    assert_eq!(failure.attempts, 1);
    mock.assert_hits(1);
    assert!(!dest.exists());
}

#[tokio::test]
async fn test_download_auth_failure_fails_without_retry() {
    let server = MockServer::start();

    let mock = server.mock(|when, then| {
        when.method(GET).path("/linux-64/private-2.0-0.conda");
        then.status(403);
    });

    let temp_dir = tempfile::tempdir().unwrap();
    let dest = temp_dir.path().join("private-2.0-0.conda");
    let (tx, _rx) = channel();

    let client = NetClient::with_defaults().unwrap();
    let downloader = ArtifactDownloader::new(client, fast_retry(3));

    let request = ArtifactRequest {
        filename: "private-2.0-0.conda".to_string(),
        url: server.url("/linux-64/private-2.0-0.conda"),
        expected_size: 100,
        checksum: None,
    };

    let failure = downloader.download(&request, &dest, &tx).await.unwrap_err();

    assert!(matches!(
        failure.error,
        Error::Network(NetworkError::AccessDenied { status: 403, .. })
    ));
    mock.assert_hits(1);
}

#[tokio::test]
async fn test_download_server_error_retries_until_exhausted() {
    let server = MockServer::start();

    let mock = server.mock(|when, then| {
        when.method(GET).path("/linux-64/flaky-1.0-0.conda");
        then.status(503);
    });

    let temp_dir = tempfile::tempdir().unwrap();
    let dest = temp_dir.path().join("flaky-1.0-0.conda");
    let (tx, mut rx) = channel();

    let client = NetClient::with_defaults().unwrap();
    let downloader = ArtifactDownloader::new(client, fast_retry(2));

    let request = ArtifactRequest {
        filename: "flaky-1.0-0.conda".to_string(),
        url: server.url("/linux-64/flaky-1.0-0.conda"),
        expected_size: 100,
        checksum: None,
    };

    let failure = downloader.download(&request, &dest, &tx).await.unwrap_err();

    assert!(matches!(
        failure.error,
        Error::Network(NetworkError::HttpError { status: 503, .. })
    ));
    assert_eq!(failure.attempts, 2);
    mock.assert_hits(2);

    let events = drain_events(&mut rx);
    assert!(events.iter().any(|e| matches!(
        e,
        Event::DownloadRetrying {
            attempt: 1,
            max_attempts: 2,
            ..
        }
    )));
}

#[tokio::test]
async fn test_download_size_mismatch_is_transient() {
    let server = MockServer::start();
    let body = b"short body";

    let mock = server.mock(|when, then| {
        when.method(GET).path("/noarch/truncated-1.0-0.conda");
        then.status(200).body(body);
    });

    let temp_dir = tempfile::tempdir().unwrap();
    let dest = temp_dir.path().join("truncated-1.0-0.conda");
    let (tx, _rx) = channel();

    let client = NetClient::with_defaults().unwrap();
    let downloader = ArtifactDownloader::new(client, fast_retry(2));

    let request = ArtifactRequest {
        filename: "truncated-1.0-0.conda".to_string(),
        url: server.url("/noarch/truncated-1.0-0.conda"),
        expected_size: body.len() as u64 + 5,
        checksum: None,
    };

    let failure = downloader.download(&request, &dest, &tx).await.unwrap_err();

    assert!(matches!(
        failure.error,
        Error::Network(NetworkError::SizeMismatch { .. })
    ));
    mock.assert_hits(2);
    assert!(!dest.exists());
}

#[tokio::test]
async fn test_download_without_checksum_still_checks_size() {
    let server = MockServer::start();
    let body = b"unverified but complete";

    server.mock(|when, then| {
        when.method(GET).path("/noarch/blob-1.0-0.tar.bz2");
        then.status(200).body(body);
    });

    let temp_dir = tempfile::tempdir().unwrap();
    let dest = temp_dir.path().join("blob-1.0-0.tar.bz2");
    let (tx, _rx) = channel();

    let client = NetClient::with_defaults().unwrap();
    let downloader = ArtifactDownloader::new(client, fast_retry(3));

    let request = ArtifactRequest {
        filename: "blob-1.0-0.tar.bz2".to_string(),
        url: server.url("/noarch/blob-1.0-0.tar.bz2"),
        expected_size: body.len() as u64,
        checksum: None,
    };

    let size = downloader.download(&request, &dest, &tx).await.unwrap();
    assert_eq!(size, body.len() as u64);
    assert_eq!(std::fs::read(&dest).unwrap(), body);
}

#[tokio::test]
async fn test_request_timeout_surfaces_as_timeout() {
    let server = MockServer::start();

    server.mock(|when, then| {
        when.method(GET).path("/linux-64/slow-1.0-0.conda");
        then.status(200)
            .delay(Duration::from_millis(500))
            .body(b"late");
    });

    let temp_dir = tempfile::tempdir().unwrap();
    let dest = temp_dir.path().join("slow-1.0-0.conda");
    let (tx, _rx) = channel();

    let config = NetConfig {
        timeout: Duration::from_millis(50),
        ..NetConfig::default()
    };
    let client = NetClient::new(&config).unwrap();
    let downloader = ArtifactDownloader::new(client, fast_retry(1));

    let request = ArtifactRequest {
        filename: "slow-1.0-0.conda".to_string(),
        url: server.url("/linux-64/slow-1.0-0.conda"),
        expected_size: 4,
        checksum: None,
    };

    let failure = downloader.download(&request, &dest, &tx).await.unwrap_err();
    assert!(matches!(
        failure.error,
        Error::Network(NetworkError::Timeout { .. })
    ));
}

#[tokio::test]
async fn test_fetch_text() {
    let server = MockServer::start();
    let payload = r#"{"info": {"subdir": "linux-64"}, "packages": {}}"#;

    let mock = server.mock(|when, then| {
        when.method(GET).path("/linux-64/repodata.json");
        then.status(200).body(payload);
    });

    let (tx, _rx) = channel();
    let client = NetClient::with_defaults().unwrap();

    let text = fetch_text(&client, &server.url("/linux-64/repodata.json"), &tx)
        .await
        .unwrap();

    mock.assert();
    assert_eq!(text, payload);
}

#[tokio::test]
async fn test_fetch_text_not_found() {
    let server = MockServer::start();

    server.mock(|when, then| {
        when.method(GET).path("/linux-64/repodata.json");
        then.status(404);
    });

    let (tx, _rx) = channel();
    let client = NetClient::with_defaults().unwrap();

    let error = fetch_text(&client, &server.url("/linux-64/repodata.json"), &tx)
        .await
        .unwrap_err();

    assert!(matches!(error, Error::Network(NetworkError::NotFound { .. })));
}
