use super::*;
use crate::dht::RingEvent;

async fn closed_ring(network: &Arc<LocalNetwork>, n: usize, config: RingConfig) -> Result<Vec<Arc<Node>>> {
    let nodes = gen_sorted_nodes(network, n, config);
    form_ring(&nodes).await?;
    stabilize_until_closed(&nodes, 40).await?;
    for _ in 0..3 {
        for node in nodes.iter() {
            stabilize_once(node).await?;
        }
    }
    Ok(nodes)
}

#[tokio::test]
async fn test_dead_predecessor_is_cleared() -> Result<()> {
    let network = LocalNetwork::new();
    let nodes = closed_ring(&network, 3, test_config()).await?;
    let (b, c) = (&nodes[1], &nodes[2]);

    network.set_offline(b.peer(), true);
    stabilize_once(c).await?;
    assert_eq!(c.predecessor()?, None);
    assert_eq!(c.status()?, PeerStatus::Joined);
    Ok(())
}

#[tokio::test]
async fn test_dead_successor_falls_back_to_list() -> Result<()> {
    let network = LocalNetwork::new();
    let nodes = closed_ring(&network, 4, test_config()).await?;
    let (a, b, c) = (&nodes[0], &nodes[1], &nodes[2]);

    network.set_offline(b.peer(), true);
    stabilize_once(a).await?;
    assert_eq!(a.successor()?, Some(c.peer().clone()));

    let survivors: Vec<Arc<Node>> = nodes
        .iter()
        .filter(|n| n.peer() != b.peer())
        .cloned()
        .collect();
    stabilize_until_closed(&survivors, 40).await?;
    Ok(())
}

#[tokio::test]
async fn test_lonely_again_when_all_neighbors_die() -> Result<()> {
    let network = LocalNetwork::new();
    let nodes = closed_ring(&network, 2, test_config()).await?;
    let (a, b) = (&nodes[0], &nodes[1]);

    network.set_offline(b.peer(), true);
    stabilize_once(a).await?;
    assert_eq!(a.successor()?, None);
    assert_eq!(a.predecessor()?, None);
    assert_eq!(a.status()?, PeerStatus::Lonely);

    // b still points at a, its next round pulls a back in
    network.set_offline(b.peer(), false);
    stabilize_once(b).await?;
    assert_eq!(a.status()?, PeerStatus::Joined);
    assert_eq!(a.predecessor()?, Some(b.peer().clone()));
    stabilize_until_closed(&nodes, 10).await?;
    Ok(())
}

#[tokio::test]
async fn test_graceful_leave() -> Result<()> {
    let network = LocalNetwork::new();
    let nodes = closed_ring(&network, 3, test_config()).await?;
    let (a, b, c) = (&nodes[0], &nodes[1], &nodes[2]);
    let mut events = b.subscribe();

    b.leave().await?;
    assert_eq!(b.status()?, PeerStatus::Stopped);
    assert!(b.shutdown_token().is_cancelled());
    assert_eq!(a.successor()?, Some(c.peer().clone()));
    assert_eq!(c.predecessor()?, Some(a.peer().clone()));
    assert_eq!(events.try_recv().unwrap(), RingEvent::StatusChanged {
        from: PeerStatus::Joined,
        to: PeerStatus::Leaving,
    });

    // leaving twice is harmless
    b.leave().await?;
    network.set_offline(b.peer(), true);
    stabilize_until_closed(&[a.clone(), c.clone()], 10).await?;
    Ok(())
}

#[tokio::test]
async fn test_last_two_nodes_leave() -> Result<()> {
    let network = LocalNetwork::new();
    let nodes = closed_ring(&network, 2, test_config()).await?;
    let (a, b) = (&nodes[0], &nodes[1]);

    b.leave().await?;
    assert_eq!(a.status()?, PeerStatus::Lonely);
    assert_eq!(a.successor()?, None);
    assert_eq!(a.predecessor()?, None);
    Ok(())
}

#[tokio::test]
async fn test_lookup_retries_past_dead_successor() -> Result<()> {
    let network = LocalNetwork::new();
    let config = RingConfig {
        finger_table: false,
        ..test_config()
    };
    let nodes = closed_ring(&network, 4, config).await?;
    let (a, b, c) = (&nodes[0], &nodes[1], &nodes[2]);

    network.set_offline(b.peer(), true);
    // c owns its own id, the walk would go through b first
    assert_eq!(a.find_successor(c.did()).await?, c.peer().clone());
    assert_eq!(a.successor()?, Some(c.peer().clone()));
    Ok(())
}

#[tokio::test]
async fn test_lookup_fails_when_ring_is_gone() -> Result<()> {
    let network = LocalNetwork::new();
    let nodes = closed_ring(&network, 3, test_config()).await?;
    let a = &nodes[0];
    for node in nodes[1..].iter() {
        network.set_offline(node.peer(), true);
    }
    // a owns its own id, finding that out needs its predecessor
    let err = a.find_successor(a.did()).await.unwrap_err();
    assert!(err.is_unreachable(), "unexpected error {err:?}");
    Ok(())
}
