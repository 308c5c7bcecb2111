//! # RPC Model Proxy
//!
//! Client-side object layer over a remote ERP-style RPC API. Remote entity
//! types ("models") and their records are represented locally by proxies
//! that fetch field values lazily, stage writes, and forward any other
//! operation to the server.
//!
//! ## Architecture Overview
//!
//! 1. **Session** ([`ExecutionContext`]): the transport seam. One async
//!    method, `execute_kw`, plus the client [`Config`].
//! 2. **Scope** ([`Environment`]): a session plus an immutable context map
//!    (`lang`, `tz`, ...). Deriving a context yields a new environment.
//! 3. **Schema** ([`Registry`], [`FieldCatalog`]): field names and relation
//!    metadata, registered per model and shared by every proxy of that model.
//! 4. **Proxies** ([`BoundModel`], [`Recordset`]): a model bound to an
//!    environment, and a selection of its records with a shared cache.
//!
//! ## Quick Start
//!
//! ```rust
//! use rpc_model::mock::MockSession;
//! use rpc_model::{Cardinality, Environment, FieldCatalog, Registry};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), rpc_model::ProxyError> {
//!     let session = Arc::new(MockSession::new());
//!     let registry = Registry::new().register(
//!         "res.partner",
//!         FieldCatalog::builder()
//!             .field("name")
//!             .relation("child_ids", Cardinality::OneToMany, "res.partner")
//!             .build(),
//!     );
//!     let env = Environment::new(session.clone(), registry);
//!
//!     session.expect("res.partner", "read").return_ok(json!([{"id": 1, "name": "Azure"}]));
//!     session.expect("res.partner", "name_get").return_ok(json!([[1, "Azure"]]));
//!
//!     let partner = env.model("res.partner")?.browse(1).await?;
//!     assert_eq!(partner.value("name").await?, json!("Azure"));
//!
//!     // Any other operation is forwarded by name, ids first.
//!     let names = partner.call("name_get")?.send().await?;
//!     assert_eq!(names, json!([[1, "Azure"]]));
//!     Ok(())
//! }
//! ```
//!
//! ## Concurrency
//!
//! Remote calls are awaited one at a time; nothing here spawns tasks. Proxies
//! are `Send + Sync` and cheap to clone, and the record cache is only locked
//! while values are copied in or out.
//!
//! ## Testing
//!
//! [`mock::MockSession`] is a scripted [`ExecutionContext`] that records every
//! call it receives. See the [`mock`] module.

pub mod catalog;
pub mod commands;
pub mod config;
pub mod dispatch;
pub mod env;
pub mod error;
pub mod ids;
pub mod mock;
pub mod model;
pub mod operations;
pub mod recordset;
pub mod session;
pub mod tracing;

/// Context map sent along with remote calls (`lang`, `tz`, `active_test`, ...).
pub type Context = serde_json::Map<String, serde_json::Value>;

// Re-export core types for convenience
pub use catalog::{Cardinality, FieldCatalog, FieldMeta, Registry, Relation};
pub use commands::{Command, CommandList};
pub use config::Config;
pub use dispatch::RemoteCall;
pub use env::{context_from, Environment};
pub use error::{ProxyError, RemoteFault};
pub use ids::{normalize_ids, IntoIds, RecordId};
pub use model::BoundModel;
pub use recordset::{PendingValue, Recordset, NO_VALUE};
pub use session::ExecutionContext;
