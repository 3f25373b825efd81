use std::net::SocketAddr;

use reqwest::StatusCode;
use ringlet_core::dht::PeerStatus;
use serde_json::json;
use serde_json::Value;

use super::*;
use crate::config::PeerAddress;
use crate::endpoint::VERSION_HEADER;
use crate::error::Error;

async fn post(addr: SocketAddr, path: &str, body: &'static str) -> reqwest::Response {
    reqwest::Client::new()
        .post(format!("http://{addr}/{path}"))
        .body(body)
        .send()
        .await
        .unwrap()
}

async fn error_of(resp: reqwest::Response) -> String {
    let body: Value = resp.json().await.unwrap();
    body["error"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_http_wire_answers() {
    let (a, _) = prepare_processor(&test_config());
    let addr = a.local_addr();
    assert_eq!(a.peer().port(), addr.port());

    let resp = post(addr, "status", "").await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers().contains_key(VERSION_HEADER));
    assert_eq!(resp.json::<Value>().await.unwrap(), json!({"status": "lonely"}));

    let resp = post(addr, "predecessor", "").await;
    assert_eq!(resp.json::<Value>().await.unwrap(), json!({}));

    let resp = post(addr, "self", "{}").await;
    assert_eq!(
        resp.json::<Value>().await.unwrap()["port"],
        json!(addr.port())
    );

    let resp = post(addr, "no-such-operation", "{}").await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert!(error_of(resp).await.contains("no-such-operation"));

    let resp = post(addr, "notify", "{garbage").await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = post(addr, "notify", r#"{"host": 1}"#).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(a.node.status().unwrap(), PeerStatus::Lonely);
}

#[tokio::test]
async fn test_http_actions() {
    let (a, _) = prepare_processor(&test_config());
    let addr = a.local_addr();

    let resp = post(addr, "handle/echo", r#"{"x": [1, 2]}"#).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.json::<Value>().await.unwrap(), json!({"x": [1, 2]}));

    let resp = post(addr, "handle/echo", "").await;
    assert_eq!(resp.json::<Value>().await.unwrap(), json!({}));

    let resp = post(addr, "handle/missing", "{}").await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = post(addr, "handle/broken", "{}").await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(error_of(resp).await.contains("handler exploded"));
}

#[tokio::test]
async fn test_http_remote_peer() {
    let (a, _) = prepare_processor(&test_config());
    let (b, _) = prepare_processor(&test_config());
    let remote = b.node.remote(a.peer());

    assert_eq!(&remote.self_record().await.unwrap(), a.peer());
    assert_eq!(remote.status().await.unwrap(), PeerStatus::Lonely);
    assert_eq!(remote.predecessor().await.unwrap(), None);
    assert!(remote.successors().await.unwrap().is_empty());
    // A lonely node owns every key.
    assert_eq!(&remote.find_successor(b.did()).await.unwrap(), a.peer());
    assert_eq!(
        remote.handle("whoami", json!({})).await.unwrap(),
        json!({"name": "ringlet"})
    );

    let err = remote.handle("missing", json!({})).await.unwrap_err();
    assert!(
        matches!(err, ringlet_core::Error::Rejected { status: 404, .. }),
        "{err:?}"
    );
}

#[tokio::test]
async fn test_http_ring_join_and_leave() {
    let (a, handle_a) = prepare_processor(&test_config());
    let (b, handle_b) = prepare_processor(&test_config());

    assert!(b.join(Some(a.peer().clone())).await.unwrap());
    stabilize_all(&[&a, &b], 3).await;

    assert_eq!(a.node.status().unwrap(), PeerStatus::Joined);
    assert_eq!(a.node.successor().unwrap().as_ref(), Some(b.peer()));
    assert_eq!(a.node.predecessor().unwrap().as_ref(), Some(b.peer()));
    assert_eq!(b.node.successor().unwrap().as_ref(), Some(a.peer()));
    assert_eq!(b.node.predecessor().unwrap().as_ref(), Some(a.peer()));

    for key in ["alpha", "beta", "gamma", "delta"] {
        let (owner_a, _) = a.node.locate(key).await.unwrap();
        let (owner_b, _) = b.node.locate(key).await.unwrap();
        assert_eq!(owner_a, owner_b, "{key}");
        let responsible = if &owner_a == a.peer() { &a } else { &b };
        assert!(responsible.node.is_responsible_for(key).unwrap());
    }

    b.shutdown().await.unwrap();
    wait_stopped(handle_b).await;
    assert_eq!(b.node.status().unwrap(), PeerStatus::Stopped);
    assert_eq!(a.node.status().unwrap(), PeerStatus::Lonely);
    assert_eq!(a.node.successor().unwrap(), None);

    let err = a.node.remote(b.peer()).status().await.unwrap_err();
    assert!(err.is_unreachable(), "{err:?}");

    a.shutdown().await.unwrap();
    wait_stopped(handle_a).await;
}

#[tokio::test]
async fn test_join_via_well_known_peers() {
    let (a, _) = prepare_processor(&test_config());
    let dead_port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();

    let mut config = test_config();
    config.well_known_peers = vec![
        PeerAddress {
            host: "127.0.0.1".to_string(),
            port: dead_port,
        },
        PeerAddress {
            host: "127.0.0.1".to_string(),
            port: a.peer().port(),
        },
    ];
    let (b, _) = prepare_processor(&config);
    assert_eq!(b.node.well_known_peers().len(), 2);

    assert!(b.join(None).await.unwrap());
    assert_eq!(b.node.status().unwrap(), PeerStatus::Joined);
    assert_eq!(b.node.successor().unwrap().as_ref(), Some(a.peer()));

    let (c, _) = prepare_processor(&test_config());
    assert!(!c.join(None).await.unwrap());
    assert_eq!(c.node.status().unwrap(), PeerStatus::Lonely);
}

#[tokio::test]
async fn test_processor_from_serialized() {
    let yaml = r#"
host: 127.0.0.1
port: 0
bind_address: 127.0.0.1
metadata:
  zone: test
"#;
    let p = ProcessorBuilder::from_serialized(yaml)
        .unwrap()
        .build()
        .unwrap();
    assert_ne!(p.peer().port(), 0);
    assert_eq!(p.peer().port(), p.local_addr().port());
    assert_eq!(p.node.metadata().get("zone"), Some(&json!("test")));

    let handle = p.listen().unwrap();
    assert!(matches!(p.listen(), Err(Error::AlreadyListening)));

    p.shutdown().await.unwrap();
    wait_stopped(handle).await;
    assert_eq!(p.node.status().unwrap(), PeerStatus::Stopped);
}

#[tokio::test]
async fn test_build_rejects_zero_stabilize_interval() {
    let mut config = test_config();
    config.stabilize_interval = 0;
    let err = ProcessorBuilder::from_config(&config).build().err().unwrap();
    assert!(matches!(err, Error::InvalidConfig(_)), "{err:?}");
}
