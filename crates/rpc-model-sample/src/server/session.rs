//! # Actor Session
//!
//! [`ActorSession`] is the [`ExecutionContext`] of the sample: every call is
//! forwarded to the [`ServerActor`](super::ServerActor) over its channel and
//! the reply awaited on a one-shot channel.

use super::message::RpcRequest;
use async_trait::async_trait;
use rpc_model::{Config, Context, ExecutionContext, RemoteFault};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};

/// A cloneable handle speaking to the server actor.
#[derive(Clone)]
pub struct ActorSession {
    sender: mpsc::Sender<RpcRequest>,
    config: Config,
    default_context: Context,
}

impl ActorSession {
    pub fn new(sender: mpsc::Sender<RpcRequest>) -> Self {
        Self {
            sender,
            config: Config::default(),
            default_context: Context::new(),
        }
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Context of the "logged-in user" handed to the root environment.
    pub fn with_default_context(mut self, context: Context) -> Self {
        self.default_context = context;
        self
    }

    /// Asks the actor to stop and waits for its acknowledgement.
    pub async fn shutdown(&self) -> Result<(), RemoteFault> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(RpcRequest::Shutdown { respond_to })
            .await
            .map_err(|_| RemoteFault::Transport("Server actor closed".to_string()))?;
        response.await.map_err(|_| dropped_response())
    }
}

fn dropped_response() -> RemoteFault {
    RemoteFault::Transport("Server actor dropped response channel".to_string())
}

#[async_trait]
impl ExecutionContext for ActorSession {
    async fn execute_kw(
        &self,
        model: &str,
        method: &str,
        args: Vec<Value>,
        kwargs: Context,
    ) -> Result<Value, RemoteFault> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(RpcRequest::Execute {
                model: model.to_string(),
                method: method.to_string(),
                args,
                kwargs,
                respond_to,
            })
            .await
            .map_err(|_| RemoteFault::Transport("Server actor closed".to_string()))?;
        let result = response.await.map_err(|_| dropped_response())?;
        result.map_err(RemoteFault::from)
    }

    fn config(&self) -> &Config {
        &self.config
    }

    fn default_context(&self) -> Context {
        self.default_context.clone()
    }
}
