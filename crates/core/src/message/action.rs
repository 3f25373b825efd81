//! Application actions served under `handle/{action}`.
//!
//! Each node owns its [HandlerRegistry], filled through
//! [crate::node::NodeBuilder::action]. What a handler does with its payload is
//! none of the ring's business: its errors surface as [Error::ActionFailed] and
//! never touch ring state.
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::empty;
use crate::error::Error;
use crate::error::Result;

/// Error raised by an action handler.
pub type ActionError = Box<dyn std::error::Error + Send + Sync>;

#[async_trait]
pub trait ActionHandler: Send + Sync {
    async fn handle(&self, payload: Value) -> std::result::Result<Value, ActionError>;
}

/// [ActionHandler] built from an async closure.
pub struct FnAction<F>(F);

#[async_trait]
impl<F, Fut> ActionHandler for FnAction<F>
where
    F: Fn(Value) -> Fut + Send + Sync,
    Fut: Future<Output = std::result::Result<Value, ActionError>> + Send,
{
    async fn handle(&self, payload: Value) -> std::result::Result<Value, ActionError> {
        (self.0)(payload).await
    }
}

/// Wrap an async closure as an action handler.
pub fn action_fn<F, Fut>(f: F) -> Arc<dyn ActionHandler>
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = std::result::Result<Value, ActionError>> + Send + 'static,
{
    Arc::new(FnAction(f))
}

/// Action name to handler mapping of one node.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn ActionHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` under `name`, replacing any previous one.
    pub fn register(&mut self, name: impl Into<String>, handler: Arc<dyn ActionHandler>) {
        self.handlers.insert(name.into(), handler);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.handlers.keys().cloned().collect()
    }

    /// Run the handler of `name`. A missing payload is `{}`, a `null` result is `{}`.
    pub async fn dispatch(&self, name: &str, payload: Value) -> Result<Value> {
        let handler = self
            .handlers
            .get(name)
            .cloned()
            .ok_or_else(|| Error::ActionNotFound(name.to_string()))?;
        let payload = if payload.is_null() { empty() } else { payload };
        match handler.handle(payload).await {
            Ok(Value::Null) => Ok(empty()),
            Ok(v) => Ok(v),
            Err(e) => {
                tracing::warn!("action {} failed: {}", name, e);
                Err(Error::ActionFailed(name.to_string(), e.to_string()))
            }
        }
    }
}
