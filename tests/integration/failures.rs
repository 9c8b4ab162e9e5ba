use axum::http::{Method, StatusCode};
use dvid_transfer_core::{Dispatcher, Operation, TransferConfig, TransferError};
use serde_json::json;

use crate::*;

fn dispatcher() -> Dispatcher {
    Dispatcher::new(TransferConfig {
        byte_ceiling: 1_500_000,
        ..TransferConfig::default()
    })
}

/// Node with a two-layer, two-band label volume and an empty destination.
async fn two_by_two_node() -> FakeNode {
    let node = FakeNode::start().await;
    node.add_volume("a1", "src", "labels64", 32, [0, 0, 0], [1, 3, 1]);
    node.add_volume("a1", "dst", "labelblk", 32, [0, 0, 0], [0, 0, 0]);
    node
}

// ══════════════════════════════════════════════════════════════════════════════
//  Transfer failures
// ══════════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn read_failure_on_second_strip_stops_transfer() {
    let node = two_by_two_node().await;
    let failing = node.path("a1", "src", "raw/0_1_2/64_64_32/0_64_0");
    node.fail(Method::GET, &failing, StatusCode::INTERNAL_SERVER_ERROR);

    let err = dispatcher()
        .dispatch(&node.url("a1", "src"), &node.url("a1", "dst"))
        .await
        .unwrap_err();

    match &err {
        TransferError::Status { op, status, url } => {
            assert_eq!(*op, Operation::Read);
            assert_eq!(*status, StatusCode::INTERNAL_SERVER_ERROR.as_u16());
            assert!(url.ends_with("/raw/0_1_2/64_64_32/0_64_0"));
        }
        other => panic!("unexpected error: {other}"),
    }

    // Strip 1 landed; nothing was attempted after the failed read.
    assert_eq!(node.writes("a1", "dst").len(), 1);
    let last = node.requests().pop().unwrap();
    assert_eq!(last.method, "GET");
    assert_eq!(last.path, failing);
    assert_eq!(node.data_requests().len(), 3);
}

#[tokio::test]
async fn write_failure_is_fatal() {
    let node = two_by_two_node().await;
    let failing = node.path("a1", "dst", "raw/0_1_2/64_64_32/0_0_0");
    node.fail(Method::POST, &failing, StatusCode::INSUFFICIENT_STORAGE);

    let err = dispatcher()
        .dispatch(&node.url("a1", "src"), &node.url("a1", "dst"))
        .await
        .unwrap_err();

    assert_eq!(err.operation(), Some(Operation::Write));
    assert!(node.writes("a1", "dst").is_empty());
    assert_eq!(node.data_requests().len(), 2);
}

// ══════════════════════════════════════════════════════════════════════════════
//  Compatibility and resolution failures
// ══════════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn incompatible_pairing_issues_no_data_requests() {
    let src = FakeNode::start().await;
    let dst = FakeNode::start().await;
    src.add_volume("a1", "labels", "labels64", 32, [0, 0, 0], [1, 1, 0]);
    dst.add_volume("b2", "grayscale", "uint8blk", 32, [0, 0, 0], [0, 0, 0]);

    let err = dispatcher()
        .dispatch(&src.url("a1", "labels"), &dst.url("b2", "grayscale"))
        .await
        .unwrap_err();

    assert!(matches!(err, TransferError::Incompatible { .. }));
    assert!(err.is_compatibility());
    assert!(src.data_requests().is_empty());
    assert!(dst.data_requests().is_empty());
    assert!(dst.writes("b2", "grayscale").is_empty());
}

#[tokio::test]
async fn unsupported_source_type_is_rejected() {
    let src = FakeNode::start().await;
    let dst = FakeNode::start().await;
    src.add_info("a1", "kv", json!({"Base": {"TypeName": "keyvalue", "Name": "kv"}}));
    dst.add_volume("b2", "labels", "labelblk", 32, [0, 0, 0], [0, 0, 0]);

    let err = dispatcher()
        .dispatch(&src.url("a1", "kv"), &dst.url("b2", "labels"))
        .await
        .unwrap_err();

    match err {
        TransferError::UnsupportedSource { type_name } => assert_eq!(type_name, "keyvalue"),
        other => panic!("unexpected error: {other}"),
    }
    assert!(dst.data_requests().is_empty());
}

#[tokio::test]
async fn missing_destination_instance_fails_resolution() {
    let src = FakeNode::start().await;
    let dst = FakeNode::start().await;
    src.add_volume("a1", "labels", "labels64", 32, [0, 0, 0], [1, 1, 0]);

    let err = dispatcher()
        .dispatch(&src.url("a1", "labels"), &dst.url("nope", "labels"))
        .await
        .unwrap_err();

    match err {
        TransferError::Status { op, status, .. } => {
            assert_eq!(op, Operation::Metadata);
            assert_eq!(status, StatusCode::NOT_FOUND.as_u16());
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(src.data_requests().is_empty());
}

#[tokio::test]
async fn malformed_source_descriptor_fails_resolution() {
    let node = FakeNode::start().await;
    node.add_info("a1", "src", json!("not a descriptor"));
    node.add_volume("a1", "dst", "labelblk", 32, [0, 0, 0], [0, 0, 0]);

    let err = dispatcher()
        .dispatch(&node.url("a1", "src"), &node.url("a1", "dst"))
        .await
        .unwrap_err();

    assert!(matches!(err, TransferError::MalformedDescriptor { .. }));
    assert_eq!(err.operation(), Some(Operation::Metadata));
    // Only the source descriptor was requested.
    assert_eq!(node.requests().len(), 1);
}

#[tokio::test]
async fn invalid_source_geometry_stops_before_data_moves() {
    let node = FakeNode::start().await;
    node.add_volume("a1", "src", "labels64", 32, [-1, 0, 0], [i64::MAX, 0, 0]);
    node.add_empty_volume("a1", "dst", "labelblk", 32);

    let err = dispatcher()
        .dispatch(&node.url("a1", "src"), &node.url("a1", "dst"))
        .await
        .unwrap_err();

    match &err {
        TransferError::MalformedDescriptor { url, .. } => {
            assert_eq!(url, &format!("{}/info", node.url("a1", "src")));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(node.data_requests().is_empty());
}

#[tokio::test]
async fn empty_source_volume_is_malformed() {
    let node = FakeNode::start().await;
    node.add_empty_volume("a1", "src", "labels64", 32);
    node.add_empty_volume("a1", "dst", "labelblk", 32);

    let err = dispatcher()
        .dispatch(&node.url("a1", "src"), &node.url("a1", "dst"))
        .await
        .unwrap_err();

    assert!(matches!(err, TransferError::MalformedDescriptor { .. }));
    assert!(err.to_string().contains("has no geometry"));
    assert!(node.data_requests().is_empty());
}

#[tokio::test]
async fn unparseable_url_fails_before_any_request() {
    let node = two_by_two_node().await;
    let err = dispatcher()
        .dispatch("not-a-url", &node.url("a1", "dst"))
        .await
        .unwrap_err();

    assert!(matches!(err, TransferError::InvalidUrl { .. }));
    assert!(node.requests().is_empty());
}
