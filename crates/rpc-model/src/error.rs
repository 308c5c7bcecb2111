//! # Proxy Errors
//!
//! This module defines the error types surfaced by the recordset proxy.
//! [`RemoteFault`] is the categorized failure reported by an
//! [`ExecutionContext`](crate::ExecutionContext); [`ProxyError`] wraps it
//! together with the few conditions this layer detects locally.

use crate::ids::RecordId;
use serde_json::Value;

/// A failure of the underlying remote call.
///
/// The proxy never inspects or recovers from these, it only propagates them.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RemoteFault {
    #[error("Access denied: {0}")]
    AccessDenied(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Method '{method}' does not exist on model '{model}'")]
    MissingMethod { model: String, method: String },
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Server error: {message}")]
    Server { message: String, data: Value },
}

/// Errors returned by bound models and recordsets.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    /// A load asked for identifiers the remote side does not know.
    #[error("There is no '{model}' record with IDs {ids:?}")]
    RecordNotFound { model: String, ids: Vec<RecordId> },

    /// The operation was used on a recordset that cannot support it.
    #[error("Internal error: {0}")]
    InternalError(String),

    #[error(transparent)]
    Remote(#[from] RemoteFault),

    #[error("Field '{field}' is not defined on model '{model}'")]
    UnknownField { model: String, field: String },

    #[error("Model '{0}' is not registered in this environment")]
    UnknownModel(String),

    /// The name is reserved for local attributes and never sent to the server.
    #[error("'{0}' is a reserved name and cannot be dispatched remotely")]
    NotDispatchable(String),

    #[error("Unexpected response to '{method}': {detail}")]
    UnexpectedResponse { method: String, detail: String },

    #[error("Failed to decode remote result: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ProxyError {
    pub(crate) fn unexpected(method: &str, detail: impl Into<String>) -> Self {
        ProxyError::UnexpectedResponse {
            method: method.to_string(),
            detail: detail.into(),
        }
    }
}
