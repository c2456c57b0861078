//! Control channel dispatch tests: cache updates, view notification, image
//! delivery, and drop handling for bad frames.

use std::io::Write;
use std::sync::{Arc, Mutex};

use flate2::write::GzEncoder;
use flate2::Compression;

use scanlink_client::{
    ClientState, ControlClient, ControlConfig, ControlEvent, DropReason, ImagePayload, ImageSink,
    TreeView,
};
use scanlink_core::transport::{Channel, Frame};
use scanlink_core::tree::{DirectoryEntry, MergeOutcome};
use scanlink_core::Error;
use scanlink_test_utils::{channel_pair, MockChannel};

#[derive(Default)]
struct RecordingView {
    snapshots: Mutex<Vec<Vec<DirectoryEntry>>>,
}

impl TreeView for RecordingView {
    fn tree_updated(&self, entries: &[DirectoryEntry]) {
        self.snapshots.lock().unwrap().push(entries.to_vec());
    }
}

#[derive(Default)]
struct RecordingSink {
    images: Mutex<Vec<Vec<u8>>>,
}

impl ImageSink for RecordingSink {
    fn image_received(&self, image: ImagePayload) {
        self.images.lock().unwrap().push(image.bytes);
    }
}

fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

struct Fixture {
    client: ControlClient,
    server: MockChannel,
    view: Arc<RecordingView>,
    sink: Arc<RecordingSink>,
}

fn fixture(root_prefix: &str) -> Fixture {
    let (client_half, server) = channel_pair();
    let view = Arc::new(RecordingView::default());
    let sink = Arc::new(RecordingSink::default());
    let config = ControlConfig {
        root_prefix: root_prefix.to_string(),
        view: view.clone(),
        sink: sink.clone(),
    };
    Fixture {
        client: ControlClient::from_channel(Box::new(client_half), config),
        server,
        view,
        sink,
    }
}

const FILELIST: &str = r#"{
    "type": "filelist",
    "payload": [
        {
            "text": "data",
            "path": "/home/alice/data",
            "type": "directory",
            "expand": true,
            "children": []
        },
        { "text": "notes.txt", "path": "/home/alice/notes.txt", "type": "text" }
    ]
}"#;

#[tokio::test]
async fn filelist_replaces_cache_and_notifies_view() {
    let mut fx = fixture("home/alice");
    fx.server.send(Frame::Text(FILELIST.into())).await.unwrap();

    let event = fx.client.next_event().await.unwrap();
    assert!(matches!(event, ControlEvent::FileList { entries: 2 }));

    let entries = fx.client.cache().entries();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].text, "data");
    assert_eq!(fx.view.snapshots.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn supplemental_files_merge_into_a_listed_directory() {
    let mut fx = fixture("home/alice");
    fx.server.send(Frame::Text(FILELIST.into())).await.unwrap();
    fx.client.next_event().await.unwrap();

    let supplemental = r#"{
        "type": "supplementalfiles",
        "payload": {
            "path": "/home/alice/data",
            "list": [
                { "text": "scan.nii", "path": "/home/alice/data/scan.nii", "type": "picture" }
            ]
        }
    }"#;
    fx.server.send(Frame::Text(supplemental.into())).await.unwrap();

    let event = fx.client.next_event().await.unwrap();
    match event {
        ControlEvent::Supplemental { path, outcome } => {
            assert_eq!(path, "/home/alice/data");
            assert_eq!(outcome, MergeOutcome::Merged);
        }
        other => panic!("unexpected event: {other:?}"),
    }

    let data = &fx.client.cache().entries()[0];
    let children = data.children.as_ref().unwrap();
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].text, "scan.nii");
    // Loaded directories no longer advertise lazy expansion.
    assert!(!data.expand);
    // Replace plus merge.
    assert_eq!(fx.view.snapshots.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn stale_supplemental_response_leaves_cache_untouched() {
    let mut fx = fixture("home/alice");
    fx.server.send(Frame::Text(FILELIST.into())).await.unwrap();
    fx.client.next_event().await.unwrap();

    let stale = r#"{
        "type": "supplementalfiles",
        "payload": {
            "path": "/home/alice/archive",
            "list": [
                { "text": "old.nii", "path": "/home/alice/archive/old.nii" }
            ]
        }
    }"#;
    fx.server.send(Frame::Text(stale.into())).await.unwrap();

    let event = fx.client.next_event().await.unwrap();
    match event {
        ControlEvent::Supplemental { outcome, .. } => {
            assert_eq!(outcome, MergeOutcome::PathNotFound);
        }
        other => panic!("unexpected event: {other:?}"),
    }

    // No view notification beyond the initial replace.
    assert_eq!(fx.view.snapshots.lock().unwrap().len(), 1);
    assert!(fx.client.cache().entries()[0]
        .children
        .as_ref()
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn server_error_is_surfaced_and_channel_stays_ready() {
    let mut fx = fixture("");
    fx.server
        .send(Frame::Text(
            r#"{"type":"error","payload":"no such directory"}"#.into(),
        ))
        .await
        .unwrap();

    let event = fx.client.next_event().await.unwrap();
    match event {
        ControlEvent::ServerError { payload } => {
            assert_eq!(payload, serde_json::json!("no such directory"));
        }
        other => panic!("unexpected event: {other:?}"),
    }
    assert_eq!(fx.client.state(), ClientState::Ready);
}

#[tokio::test]
async fn unknown_message_type_is_dropped() {
    let mut fx = fixture("");
    fx.server
        .send(Frame::Text(r#"{"type":"serverstats","payload":{}}"#.into()))
        .await
        .unwrap();

    let event = fx.client.next_event().await.unwrap();
    assert!(matches!(
        event,
        ControlEvent::Dropped {
            reason: DropReason::UnknownType
        }
    ));
    assert_eq!(fx.client.state(), ClientState::Ready);
}

#[tokio::test]
async fn malformed_text_frame_is_dropped() {
    let mut fx = fixture("");
    fx.server
        .send(Frame::Text("{not valid json".into()))
        .await
        .unwrap();

    let event = fx.client.next_event().await.unwrap();
    assert!(matches!(
        event,
        ControlEvent::Dropped {
            reason: DropReason::MalformedPayload
        }
    ));
    assert_eq!(fx.client.state(), ClientState::Ready);
}

#[tokio::test]
async fn stray_handshake_reply_is_dropped() {
    let mut fx = fixture("");
    fx.server
        .send(Frame::Text(r#"{"type":"datasocketready"}"#.into()))
        .await
        .unwrap();

    let event = fx.client.next_event().await.unwrap();
    assert!(matches!(
        event,
        ControlEvent::Dropped {
            reason: DropReason::StrayHandshake
        }
    ));
    assert_eq!(fx.client.state(), ClientState::Ready);
}

#[tokio::test]
async fn compressed_binary_frame_reaches_the_image_sink() {
    let mut fx = fixture("");
    let image = b"NIFTI-ish image bytes".to_vec();
    fx.server
        .send(Frame::Binary(gzip(&image)))
        .await
        .unwrap();

    let event = fx.client.next_event().await.unwrap();
    match event {
        ControlEvent::Image { bytes } => assert_eq!(bytes, image.len()),
        other => panic!("unexpected event: {other:?}"),
    }
    assert_eq!(fx.sink.images.lock().unwrap().as_slice(), &[image]);
}

#[tokio::test]
async fn corrupt_binary_frame_is_dropped_without_delivery() {
    let mut fx = fixture("");
    fx.server
        .send(Frame::Binary(vec![0x1f, 0x8b, 0xff, 0x00, 0x01]))
        .await
        .unwrap();

    let event = fx.client.next_event().await.unwrap();
    assert!(matches!(
        event,
        ControlEvent::Dropped {
            reason: DropReason::DecompressionFailed
        }
    ));
    assert!(fx.sink.images.lock().unwrap().is_empty());
    assert_eq!(fx.client.state(), ClientState::Ready);
}

#[tokio::test]
async fn peer_close_disconnects_the_client() {
    let mut fx = fixture("");
    fx.server.close().await.unwrap();

    let event = fx.client.next_event().await.unwrap();
    assert!(matches!(event, ControlEvent::Closed));
    assert_eq!(fx.client.state(), ClientState::Disconnected);

    // Further receives are refused instead of hanging.
    let err = fx.client.next_event().await.unwrap_err();
    assert!(matches!(err, Error::InvalidState { .. }));
}
