use serde_json::json;

use super::*;
use crate::error::Error;
use crate::gateway::Operation;
use crate::message::Metadata;

async fn assert_lookups(nodes: &[Arc<Node>]) -> Result<()> {
    let mut keys: Vec<Did> = (0..16).map(|i| Did::from_key(&format!("key-{i}"))).collect();
    for node in nodes {
        keys.push(node.did());
        keys.push(node.did() + Did::from(1u32));
        keys.push(node.did() - Did::from(1u32));
    }
    for key in keys {
        let expected = expected_owner(nodes, key);
        for node in nodes {
            assert_eq!(
                node.find_successor(key).await?,
                expected,
                "{} looked up {}",
                node.peer(),
                key
            );
        }
    }
    Ok(())
}

#[tokio::test]
async fn test_lookup_on_lonely_node() -> Result<()> {
    let network = LocalNetwork::new();
    let node = prepare_node(&network, 2000);
    assert_eq!(node.find_successor(Did::from(7u32)).await?, node.peer().clone());
    assert!(node.is_responsible_for("anything")?);
    Ok(())
}

#[tokio::test]
async fn test_lookup_with_fingers() -> Result<()> {
    let network = LocalNetwork::new();
    let nodes = gen_sorted_nodes(&network, 8, test_config());
    form_ring(&nodes).await?;
    stabilize_until_closed(&nodes, 40).await?;
    for _ in 0..10 {
        for node in nodes.iter() {
            stabilize_once(node).await?;
        }
    }
    assert!(nodes.iter().any(|n| n.inspect().unwrap().finger_table.len() > 1));
    assert_lookups(&nodes).await
}

#[tokio::test]
async fn test_lookup_along_successors() -> Result<()> {
    let network = LocalNetwork::new();
    let config = RingConfig {
        finger_table: false,
        ..test_config()
    };
    let nodes = gen_sorted_nodes(&network, 6, config);
    form_ring(&nodes).await?;
    stabilize_until_closed(&nodes, 40).await?;
    assert_lookups(&nodes).await
}

#[tokio::test]
async fn test_lookup_hop_limit() -> Result<()> {
    let network = LocalNetwork::new();
    let config = RingConfig {
        finger_table: false,
        succ_max: 1,
        max_lookup_hops: 1,
        ..test_config()
    };
    let nodes = gen_sorted_nodes(&network, 5, config);
    form_ring(&nodes).await?;
    stabilize_until_closed(&nodes, 40).await?;

    // from node 0 the owner of node 3's id is three hops away
    let err = nodes[0].find_successor(nodes[3].did()).await.unwrap_err();
    assert!(matches!(err, Error::LookupExhausted(_, 1)), "{err:?}");
    Ok(())
}

#[tokio::test]
async fn test_remote_find_successor() -> Result<()> {
    let network = LocalNetwork::new();
    let nodes = gen_sorted_nodes(&network, 4, test_config());
    form_ring(&nodes).await?;
    stabilize_until_closed(&nodes, 40).await?;

    let key = nodes[2].did();
    let payload = json!({ "id": key.to_string() });
    let found = nodes[0]
        .handle_request(&Operation::FindSuccessor, payload)
        .await?;
    assert_eq!(found, serde_json::to_value(nodes[2].peer())?);

    let found = nodes[3].remote(nodes[1].peer()).find_successor(key).await?;
    assert_eq!(&found, nodes[2].peer());

    let preceding = nodes[0]
        .remote(nodes[1].peer())
        .closest_preceding_finger(key)
        .await?;
    assert_ne!(&preceding, nodes[2].peer());
    Ok(())
}

#[tokio::test]
async fn test_locate_and_responsibility() -> Result<()> {
    let network = LocalNetwork::new();
    let mut nodes: Vec<Arc<Node>> = gen_ordered_peers(5)
        .into_iter()
        .map(|p| {
            let mut metadata = Metadata::new();
            metadata.insert("port".to_string(), json!(p.port()));
            let node = NodeBuilder::new(HOST, p.port(), network.clone())
                .config(test_config())
                .metadata(metadata)
                .build();
            network.register(&node);
            node
        })
        .collect();
    nodes.sort_by_key(|n| n.did());
    form_ring(&nodes).await?;
    stabilize_until_closed(&nodes, 40).await?;

    for key in ["alice", "bob", "carol", "dave"] {
        let owner = expected_owner(&nodes, Did::from_key(key));
        for node in nodes.iter() {
            let (found, metadata) = node.locate(key).await?;
            assert_eq!(found, owner);
            assert_eq!(metadata["port"], json!(owner.port()));
            assert_eq!(node.is_responsible_for(key)?, node.peer() == &owner);
        }
    }
    Ok(())
}
