//! # RPC Model Sample
//!
//! Runs the `rpc-model` proxies against an in-process server actor. This
//! library exposes the server and the lifecycle wiring for integration tests.

pub mod lifecycle;
pub mod server;
