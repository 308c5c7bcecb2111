//! # Server Messages
//!
//! Messages sent from an [`ActorSession`](super::ActorSession) to the
//! [`ServerActor`](super::ServerActor).

use super::error::ServerError;
use rpc_model::Context;
use serde_json::Value;
use tokio::sync::oneshot;

/// One-shot reply channel carried by every request.
pub type Response<T> = oneshot::Sender<Result<T, ServerError>>;

#[derive(Debug)]
pub enum RpcRequest {
    /// Invokes `method` on `model`, as `execute_kw` would on a real server.
    Execute {
        model: String,
        method: String,
        args: Vec<Value>,
        kwargs: Context,
        respond_to: Response<Value>,
    },
    /// Stops the actor even while sessions are still alive.
    Shutdown { respond_to: oneshot::Sender<()> },
}
