//! # Observability & Tracing
//!
//! Everything in this crate logs through the `tracing` facade with structured
//! fields (`model`, `method`, `ids`). Installing a subscriber is left to the
//! application; [`setup_tracing`] is the one the sample binary uses.
//!
//! ## Levels
//!
//! | Level | Emitted for |
//! |---|---|
//! | `debug` | every dispatched call, every cache load |
//! | `info` | environment derivation, reverted writes |
//! | `warn` | remote faults, ids missing from a `read` |
//!
//! ```bash
//! RUST_LOG=info cargo run -p rpc-model-sample
//! RUST_LOG=rpc_model=debug cargo run -p rpc-model-sample
//! ```
//!
//! With `RUST_LOG=debug` a browse shows up as:
//!
//! ```text
//! DEBUG Dispatching remote call model="res.partner" method=read args=2
//! DEBUG Loaded records model="res.partner" count=3
//! ```

/// Installs a compact `fmt` subscriber filtered by `RUST_LOG`.
///
/// Call it once, at the start of `main`.
pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();
}
