//! # Remote Operation Dispatch
//!
//! Server models expose an open-ended set of methods. Instead of knowing their
//! signatures, callers build a [`RemoteCall`] by name and send it:
//!
//! ```rust,ignore
//! let names = partners.call("name_get")?.send().await?;
//! let ids = Partner.call("search")?.arg(json!([["is_company", "=", true]])).send().await?;
//! ```
//!
//! When sent, a call
//! 1. prepends the recordset ids when issued from a recordset,
//! 2. injects the environment context as `context` when `auto_context` is on
//!    and no explicit `context` keyword was given,
//! 3. forwards everything to [`ExecutionContext::execute_kw`](crate::ExecutionContext::execute_kw)
//!    and returns its result (or error) untouched.

use crate::error::ProxyError;
use crate::ids::RecordId;
use crate::model::BoundModel;
use crate::Context;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

/// Names that belong to the local proxy and are never sent to the server.
pub const RESERVED_NAMES: &[&str] = &["id", "ids", "env", "session", "schema", "cache"];

/// Whether `name` may be dispatched as a remote operation.
pub fn is_dispatchable(name: &str) -> bool {
    !name.is_empty() && !name.starts_with('_') && !RESERVED_NAMES.contains(&name)
}

/// A pending invocation of a remote operation.
#[derive(Debug, Clone)]
#[must_use = "a RemoteCall does nothing until sent"]
pub struct RemoteCall {
    model: BoundModel,
    method: String,
    ids: Option<Vec<RecordId>>,
    args: Vec<Value>,
    kwargs: Context,
}

impl RemoteCall {
    /// `ids` is `Some` for instance-level calls, `None` for class-level ones.
    pub(crate) fn new(
        model: BoundModel,
        method: &str,
        ids: Option<Vec<RecordId>>,
    ) -> Result<Self, ProxyError> {
        if !is_dispatchable(method) {
            return Err(ProxyError::NotDispatchable(method.to_string()));
        }
        Ok(Self {
            model,
            method: method.to_string(),
            ids,
            args: Vec::new(),
            kwargs: Context::new(),
        })
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    /// Appends a positional argument.
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.args.push(value.into());
        self
    }

    pub fn args<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.args.extend(values.into_iter().map(Into::into));
        self
    }

    /// Sets a keyword argument, replacing a previous value for `key`.
    pub fn kwarg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.kwargs.insert(key.into(), value.into());
        self
    }

    /// Passes an explicit context, which disables auto-context injection.
    pub fn context(self, context: Context) -> Self {
        self.kwarg("context", Value::Object(context))
    }

    /// Final positional and keyword arguments as they will be sent.
    pub fn into_parts(self) -> (String, Vec<Value>, Context) {
        let mut args = self.args;
        if let Some(ids) = self.ids {
            args.insert(0, Value::from(ids));
        }
        let mut kwargs = self.kwargs;
        let env = self.model.env();
        if env.config().auto_context && !kwargs.contains_key("context") {
            kwargs.insert("context".to_string(), Value::Object(env.context().clone()));
        }
        (self.method, args, kwargs)
    }

    /// Sends the call and returns the raw result.
    pub async fn send(self) -> Result<Value, ProxyError> {
        let model = self.model.clone();
        let (method, args, kwargs) = self.into_parts();
        debug!(model = model.name(), %method, args = args.len(), "Dispatching remote call");

        match model
            .env()
            .session()
            .execute_kw(model.name(), &method, args, kwargs)
            .await
        {
            Ok(result) => Ok(result),
            Err(fault) => {
                warn!(model = model.name(), %method, error = %fault, "Remote call failed");
                Err(fault.into())
            }
        }
    }

    /// Sends the call and decodes the result into `T`.
    pub async fn send_as<T: DeserializeOwned>(self) -> Result<T, ProxyError> {
        let value = self.send().await?;
        Ok(serde_json::from_value(value)?)
    }
}
