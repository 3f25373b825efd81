use std::time::Duration;

use ringlet_core::dht::Stabilizer;
use ringlet_core::message::action_fn;
use ringlet_core::message::ActionError;
use serde_json::json;
use serde_json::Value;
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::processor::Processor;
use crate::processor::ProcessorBuilder;

pub mod test_http;

/// Loopback config on a system picked port. Background rounds are rare so the
/// tests drive stabilization themselves.
pub fn test_config() -> Config {
    let mut config = Config::new("127.0.0.1", 0);
    config.bind_address = "127.0.0.1".to_string();
    config.stabilize_interval = 3600;
    config.call_timeout_ms = 1000;
    config
}

pub fn prepare_processor(config: &Config) -> (Processor, JoinHandle<()>) {
    let processor = ProcessorBuilder::from_config(config)
        .action(
            "echo",
            action_fn(|payload| async move { Ok::<Value, ActionError>(payload) }),
        )
        .action(
            "broken",
            action_fn(|_| async { Err::<Value, ActionError>("handler exploded".into()) }),
        )
        .action(
            "whoami",
            action_fn(|_| async { Ok::<Value, ActionError>(json!({"name": "ringlet"})) }),
        )
        .build()
        .unwrap();
    let handle = processor.listen().unwrap();
    (processor, handle)
}

pub async fn stabilize_all(processors: &[&Processor], rounds: usize) {
    for _ in 0..rounds {
        for p in processors {
            Stabilizer::new(p.node.clone()).stabilize().await.unwrap();
        }
    }
}

pub async fn wait_stopped(handle: JoinHandle<()>) {
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .unwrap()
        .unwrap();
}
