//! # Server Errors
//!
//! Failures raised while the server actor handles a request, and their
//! mapping onto the categorized [`RemoteFault`] a client sees.

use rpc_model::{RecordId, RemoteFault};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ServerError {
    #[error("Model '{0}' does not exist")]
    UnknownModel(String),
    #[error("Method '{method}' does not exist on model '{model}'")]
    MissingMethod { model: String, method: String },
    #[error("Invalid arguments for '{method}': {detail}")]
    InvalidArguments { method: String, detail: String },
    #[error("Record does not exist or has been deleted: {model} {ids:?}")]
    MissingRecords { model: String, ids: Vec<RecordId> },
    #[error("Unsupported domain term: {0}")]
    UnsupportedDomain(String),
    #[error("Server actor stopped: {0}")]
    Stopped(String),
}

impl ServerError {
    pub(crate) fn invalid(method: &str, detail: impl Into<String>) -> Self {
        ServerError::InvalidArguments {
            method: method.to_string(),
            detail: detail.into(),
        }
    }
}

impl From<ServerError> for RemoteFault {
    fn from(err: ServerError) -> Self {
        match err {
            ServerError::MissingMethod { model, method } => {
                RemoteFault::MissingMethod { model, method }
            }
            ServerError::MissingRecords { .. } | ServerError::InvalidArguments { .. } => {
                RemoteFault::Validation(err.to_string())
            }
            ServerError::Stopped(reason) => RemoteFault::Transport(reason),
            ServerError::UnknownModel(_) | ServerError::UnsupportedDomain(_) => {
                RemoteFault::Server {
                    message: err.to_string(),
                    data: Value::Null,
                }
            }
        }
    }
}
