//! Integration tests for events

use repomirror_events::{channel, Event, EventEmitter};

#[tokio::test]
async fn test_event_emitter_helpers() {
    let (tx, mut rx) = channel();

    tx.emit_warning("test warning");
    tx.emit_debug("test debug");

    let event1 = rx.recv().await.unwrap();
    assert!(matches!(event1, Event::Warning { .. }));

    let event2 = rx.recv().await.unwrap();
    assert!(matches!(event2, Event::DebugLog { .. }));
}

#[tokio::test]
async fn test_dropped_receiver() {
    let (tx, rx) = channel();
    drop(rx);

    // Should not panic when receiver is dropped
    tx.emit(Event::warning("ignored"));
}

#[tokio::test]
async fn test_event_payloads_pass_through() {
    let (tx, mut rx) = channel();

    tx.emit(Event::DownloadCompleted {
        filename: "pkg-1.0-0.conda".to_string(),
        size: 1024,
    });

    match rx.recv().await.unwrap() {
        Event::DownloadCompleted { filename, size } => {
            assert_eq!(filename, "pkg-1.0-0.conda");
            assert_eq!(size, 1024);
        }
        other => panic!("unexpected event: {other:?}"),
    }
}
