//! # Bound Models
//!
//! A [`BoundModel`] is the class-level proxy of a remote model: entity name,
//! shared field catalog and the environment it is bound to. It carries no
//! record identifiers.
//!
//! Rebinding (`with_env`, `with_context`) builds a new value that shares the
//! catalog and points at another environment; existing values keep theirs.

use crate::catalog::FieldCatalog;
use crate::dispatch::RemoteCall;
use crate::env::{context_from, Environment};
use crate::error::ProxyError;
use crate::ids::IntoIds;
use crate::recordset::Recordset;
use crate::Context;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// A remote model bound to an environment.
#[derive(Clone)]
pub struct BoundModel {
    name: Arc<str>,
    catalog: Arc<FieldCatalog>,
    env: Arc<Environment>,
}

impl BoundModel {
    pub fn new(name: &str, catalog: Arc<FieldCatalog>, env: Arc<Environment>) -> Self {
        Self {
            name: Arc::from(name),
            catalog,
            env,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn catalog(&self) -> &Arc<FieldCatalog> {
        &self.catalog
    }

    pub fn env(&self) -> &Arc<Environment> {
        &self.env
    }

    /// Browses `ids` and loads their non-relational fields.
    ///
    /// An empty input yields a virtual record filled with server defaults.
    pub async fn browse(&self, ids: impl IntoIds) -> Result<Recordset, ProxyError> {
        Recordset::browse(self.clone(), ids.into_ids(), None).await
    }

    /// Same model under the current context updated with `overrides`.
    pub fn with_context<I, K, V>(&self, overrides: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.with_env(self.env.derive(None, context_from(overrides)))
    }

    /// Same model under `base` updated with `overrides`.
    pub fn with_context_from<I, K, V>(&self, base: Context, overrides: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.with_env(self.env.derive(Some(base), context_from(overrides)))
    }

    /// Same model bound to `env`.
    pub fn with_env(&self, env: Arc<Environment>) -> Self {
        Self {
            name: Arc::clone(&self.name),
            catalog: Arc::clone(&self.catalog),
            env,
        }
    }

    /// Class-level remote call of `method` (no identifiers prepended).
    pub fn call(&self, method: &str) -> Result<RemoteCall, ProxyError> {
        RemoteCall::new(self.clone(), method, None)
    }

    /// Whether two values share the same catalog instance.
    pub fn same_schema(&self, other: &BoundModel) -> bool {
        Arc::ptr_eq(&self.catalog, &other.catalog)
    }
}

impl fmt::Display for BoundModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Model('{}')", self.name)
    }
}

impl fmt::Debug for BoundModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
