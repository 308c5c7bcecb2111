//! # In-Process Server
//!
//! A stand-in for the remote ERP server, built as an actor: a single Tokio
//! task owns the data and answers `execute_kw` requests sent through an
//! [`ActorSession`].
//!
//! ```text
//! Recordset ──call──▶ ActorSession ──mpsc──▶ ServerActor (tables)
//!     ▲                     │                     │
//!     └──── Value ◀─────────┴────── oneshot ◀─────┘
//! ```

pub mod actor;
pub mod error;
pub mod message;
pub mod session;
pub mod table;

pub use actor::ServerActor;
pub use error::ServerError;
pub use message::RpcRequest;
pub use session::ActorSession;
pub use table::{Row, Table};
