//! # Execution Context
//!
//! The [`ExecutionContext`] trait is the only seam between this crate and the
//! transport. Whatever speaks the wire protocol (JSON-RPC, XML-RPC, an
//! in-process fake) implements it; environments, bound models and recordsets
//! only ever talk to `dyn ExecutionContext`.
//!
//! # Async & Errors
//! The trait is `#[async_trait]` so that implementations can await network
//! I/O. Failures are reported as a categorized [`RemoteFault`] and travel
//! through the proxy unchanged.

use crate::config::Config;
use crate::error::RemoteFault;
use crate::Context;
use async_trait::async_trait;
use serde_json::Value;

/// A working RPC channel to the remote server.
#[async_trait]
pub trait ExecutionContext: Send + Sync + 'static {
    /// Invokes `method` on `model` with positional and keyword arguments.
    async fn execute_kw(
        &self,
        model: &str,
        method: &str,
        args: Vec<Value>,
        kwargs: Context,
    ) -> Result<Value, RemoteFault>;

    /// Client configuration (e.g. `auto_context`).
    fn config(&self) -> &Config;

    /// Context of the logged-in user, used for the first environment.
    fn default_context(&self) -> Context {
        Context::new()
    }
}
