use std::collections::HashSet;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::broadcast::error::TryRecvError;

use super::*;
use crate::dht::RingEvent;
use crate::gateway::CallFailure;
use crate::gateway::Operation;
use crate::gateway::RemoteGateway;

/// Delivers every call through the network except `predecessor`, which the
/// target answers with an application error.
struct RefusePredecessor(Arc<LocalNetwork>);

#[async_trait]
impl RemoteGateway for RefusePredecessor {
    async fn call(
        &self,
        target: &PeerRecord,
        operation: &Operation,
        payload: Value,
    ) -> std::result::Result<Value, CallFailure> {
        if operation == &Operation::Predecessor {
            return Err(CallFailure::Rejected {
                status: 500,
                message: "predecessor unavailable".to_string(),
            });
        }
        self.0.call(target, operation, payload).await
    }
}

#[tokio::test]
async fn test_notify_with_closer_candidate() -> Result<()> {
    // 0 -> 1 -> 2 -> 3, node 3 only knows 0 as predecessor
    let network = LocalNetwork::new();
    let peers = gen_ordered_peers(4);
    let node = RingFixture::joined(Some(peers[0].clone()), Some(peers[0].clone()))
        .build(&network, &peers[3])?;

    let candidate = serde_json::to_value(&peers[2])?;
    node.handle_request(&Operation::Notify, candidate).await?;
    assert_eq!(node.predecessor()?, Some(peers[2].clone()));

    // 1 lies outside (2, 3)
    let farther = serde_json::to_value(&peers[1])?;
    node.handle_request(&Operation::Notify, farther).await?;
    assert_eq!(node.predecessor()?, Some(peers[2].clone()));

    // its successor is untouched
    assert_eq!(node.successor()?, Some(peers[0].clone()));
    Ok(())
}

#[tokio::test]
async fn test_notify_is_idempotent() -> Result<()> {
    let network = LocalNetwork::new();
    let peers = gen_ordered_peers(3);
    let node = RingFixture::joined(Some(peers[0].clone()), Some(peers[2].clone()))
        .build(&network, &peers[1])?;
    let mut events = node.subscribe();

    for _ in 0..3 {
        node.handle_request(&Operation::Notify, serde_json::to_value(&peers[0])?)
            .await?;
    }
    assert_eq!(node.predecessor()?, Some(peers[0].clone()));
    assert!(events.try_recv().is_err());
    Ok(())
}

#[tokio::test]
async fn test_notify_with_garbage_is_rejected() -> Result<()> {
    let network = LocalNetwork::new();
    let peers = gen_ordered_peers(2);
    let node = RingFixture::lonely().build(&network, &peers[0])?;
    let err = node
        .handle_request(&Operation::Notify, serde_json::json!({"host": 1}))
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), 400);

    // notified by itself
    node.handle_request(&Operation::Notify, serde_json::to_value(&peers[0])?)
        .await?;
    assert_eq!(node.status()?, PeerStatus::Lonely);
    assert_eq!(node.predecessor()?, None);
    Ok(())
}

#[tokio::test]
async fn test_ring_closure() -> Result<()> {
    let network = LocalNetwork::new();
    let nodes = gen_sorted_nodes(&network, 8, test_config());
    form_ring(&nodes).await?;
    stabilize_until_closed(&nodes, 40).await?;

    for start in nodes.iter() {
        let mut visited = HashSet::new();
        let mut current = start.peer().clone();
        loop {
            assert!(visited.insert(current.clone()), "visited {current} twice");
            let node = nodes.iter().find(|n| n.peer() == &current).unwrap();
            assert_eq!(node.status()?, PeerStatus::Joined);
            current = node.successor()?.unwrap();
            if &current == start.peer() {
                break;
            }
        }
        assert_eq!(visited.len(), nodes.len());
    }
    Ok(())
}

#[tokio::test]
async fn test_successor_list_follows_ring() -> Result<()> {
    let network = LocalNetwork::new();
    let nodes = gen_sorted_nodes(&network, 5, test_config());
    form_ring(&nodes).await?;
    stabilize_until_closed(&nodes, 40).await?;
    // every round makes one more entry of each list correct
    for _ in 0..3 {
        for node in nodes.iter() {
            stabilize_once(node).await?;
        }
    }

    for (i, node) in nodes.iter().enumerate() {
        let expected: Vec<PeerRecord> = (1..=3)
            .map(|k| nodes[(i + k) % nodes.len()].peer().clone())
            .collect();
        assert_eq!(node.ring().successors()?, expected);
        let listed = node
            .handle_request(&Operation::Successors, Value::Null)
            .await?;
        assert_eq!(listed, serde_json::to_value(&expected)?);
    }
    Ok(())
}

#[tokio::test]
async fn test_background_stabilization() -> Result<()> {
    crate::tests::setup_tracing();
    let network = LocalNetwork::new();
    let nodes = gen_sorted_nodes(&network, 4, test_config());
    let mut events = nodes[0].subscribe();
    let handles: Vec<_> = nodes.iter().map(|n| n.start()).collect();

    form_ring(&nodes).await?;
    let closed = tokio::time::timeout(Duration::from_secs(10), async {
        while !is_ring(&nodes)? {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        Ok::<(), crate::error::Error>(())
    })
    .await;
    assert!(closed.is_ok(), "ring did not close in time");

    let mut changed = false;
    loop {
        match events.try_recv() {
            Ok(RingEvent::StatusChanged {
                to: PeerStatus::Joined,
                ..
            }) => changed = true,
            Ok(_) | Err(TryRecvError::Lagged(_)) => continue,
            Err(_) => break,
        }
    }
    assert!(changed);

    for node in nodes.iter() {
        node.stop();
    }
    for handle in handles {
        handle.await.unwrap();
    }
    Ok(())
}

#[tokio::test]
async fn test_notify_after_refused_predecessor_query() -> Result<()> {
    let network = LocalNetwork::new();
    let peers = gen_ordered_peers(2);
    let a = NodeBuilder::new(HOST, peers[0].port(), Arc::new(RefusePredecessor(network.clone())))
        .config(test_config())
        .build();
    network.register(&a);
    a.ring()
        .overwrite(PeerStatus::Joined, None, Some(peers[1].clone()))?;
    let b = RingFixture::lonely().build(&network, &peers[1])?;

    Stabilizer::new(a.clone()).fix_successor().await?;
    assert_eq!(a.successor()?, Some(peers[1].clone()));
    assert_eq!(b.predecessor()?, Some(peers[0].clone()));
    assert_eq!(b.status()?, PeerStatus::Joined);
    Ok(())
}

#[tokio::test]
async fn test_zero_interval_is_raised() -> Result<()> {
    let network = LocalNetwork::new();
    let config = RingConfig {
        stabilize_interval: Duration::ZERO,
        ..test_config()
    };
    let node = prepare_node_with(&network, 7100, config);
    let handle = node.start();

    tokio::time::sleep(Duration::from_millis(50)).await;
    node.stop();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(node.status()?, PeerStatus::Lonely);
    Ok(())
}
