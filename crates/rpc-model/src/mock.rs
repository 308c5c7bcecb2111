//! # Mock Execution Context
//!
//! [`MockSession`] implements [`ExecutionContext`] entirely in memory. Tests
//! queue the responses they expect, run the code under test, then inspect the
//! calls that were made.
//!
//! | | MockSession | Real server |
//! |---|---|---|
//! | **Speed** | Instant | Network round-trips |
//! | **Determinism** | Fully scripted | Depends on server data |
//! | **Error injection** | `return_err` | Hard |
//!
//! ```rust
//! use rpc_model::mock::MockSession;
//! use rpc_model::{Environment, FieldCatalog, Registry};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let session = Arc::new(MockSession::new());
//!     let catalog = FieldCatalog::builder().field("name").build();
//!     let registry = Registry::new().register("res.partner", catalog);
//!     let env = Environment::new(session.clone(), registry);
//!
//!     session.expect("res.partner", "read").return_ok(json!([{"id": 1, "name": "Azure"}]));
//!     let partner = env.model("res.partner").unwrap().browse(1).await.unwrap();
//!     assert_eq!(partner.value("name").await.unwrap(), json!("Azure"));
//!
//!     session.verify();
//!     assert_eq!(session.calls()[0].method, "read");
//! }
//! ```
//!
//! Calls that do not match the next expectation panic, like any failed
//! assertion.

use crate::config::Config;
use crate::error::RemoteFault;
use crate::session::ExecutionContext;
use crate::Context;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

struct Expectation {
    model: String,
    method: String,
    response: Result<Value, RemoteFault>,
}

/// A call received by the mock, with its final arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub model: String,
    pub method: String,
    pub args: Vec<Value>,
    pub kwargs: Context,
}

/// Scripted [`ExecutionContext`] for tests.
#[derive(Default)]
pub struct MockSession {
    config: Config,
    default_context: Context,
    expectations: Arc<Mutex<VecDeque<Expectation>>>,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockSession {
    /// Creates a mock with default configuration and no expectations.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn with_default_context(mut self, context: Context) -> Self {
        self.default_context = context;
        self
    }

    /// Expects the next call to be `method` on `model`.
    pub fn expect(&self, model: &str, method: &str) -> ExpectationBuilder {
        ExpectationBuilder {
            model: model.to_string(),
            method: method.to_string(),
            expectations: self.expectations.clone(),
        }
    }

    /// Every call received so far, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        lock(&self.calls).clone()
    }

    /// Verifies that all expectations were met.
    pub fn verify(&self) {
        let remaining = lock(&self.expectations).len();
        if remaining > 0 {
            panic!("Not all expectations were met. {} remaining", remaining);
        }
    }
}

#[async_trait]
impl ExecutionContext for MockSession {
    async fn execute_kw(
        &self,
        model: &str,
        method: &str,
        args: Vec<Value>,
        kwargs: Context,
    ) -> Result<Value, RemoteFault> {
        lock(&self.calls).push(RecordedCall {
            model: model.to_string(),
            method: method.to_string(),
            args,
            kwargs,
        });
        let expectation = lock(&self.expectations).pop_front();
        match expectation {
            Some(exp) if exp.model == model && exp.method == method => exp.response,
            Some(exp) => panic!(
                "Unexpected call {}.{} (expected {}.{})",
                model, method, exp.model, exp.method
            ),
            None => panic!("Unexpected call {}.{} (no expectation left)", model, method),
        }
    }

    fn config(&self) -> &Config {
        &self.config
    }

    fn default_context(&self) -> Context {
        self.default_context.clone()
    }
}

/// Builder returned by [`MockSession::expect`].
#[must_use = "an expectation is only registered by return_ok/return_err"]
pub struct ExpectationBuilder {
    model: String,
    method: String,
    expectations: Arc<Mutex<VecDeque<Expectation>>>,
}

impl ExpectationBuilder {
    /// Sets the expectation to return a successful result.
    pub fn return_ok(self, value: Value) {
        self.push(Ok(value));
    }

    /// Sets the expectation to return a remote fault.
    pub fn return_err(self, fault: RemoteFault) {
        self.push(Err(fault));
    }

    fn push(self, response: Result<Value, RemoteFault>) {
        lock(&self.expectations).push_back(Expectation {
            model: self.model,
            method: self.method,
            response,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_mock_session_with_expectations() {
        let mock = MockSession::new();
        mock.expect("res.partner", "search").return_ok(json!([1, 2]));
        mock.expect("res.partner", "unlink")
            .return_err(RemoteFault::AccessDenied("unlink".into()));

        let found = mock
            .execute_kw("res.partner", "search", vec![json!([])], Context::new())
            .await;
        assert_eq!(found, Ok(json!([1, 2])));

        let denied = mock
            .execute_kw("res.partner", "unlink", vec![json!([1])], Context::new())
            .await;
        assert!(matches!(denied, Err(RemoteFault::AccessDenied(_))));

        mock.verify();
        let calls = mock.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].args, vec![json!([1])]);
    }

    #[tokio::test]
    #[should_panic(expected = "Unexpected call")]
    async fn test_unexpected_call_panics() {
        let mock = MockSession::new();
        mock.expect("res.partner", "read").return_ok(json!([]));
        let _ = mock
            .execute_kw("res.users", "read", Vec::new(), Context::new())
            .await;
    }

    #[test]
    #[should_panic(expected = "Not all expectations were met")]
    fn test_verify_reports_leftovers() {
        let mock = MockSession::new();
        mock.expect("res.partner", "read").return_ok(json!([]));
        mock.verify();
    }
}
