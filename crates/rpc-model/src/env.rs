//! # Environments
//!
//! An [`Environment`] binds a session to a context map (language, timezone,
//! `active_test`, ...). Environments are immutable: asking for another
//! context derives a new one and leaves every existing reference untouched.
//!
//! Environments are always shared as `Arc<Environment>`. Two environments with
//! the same content are interchangeable as call targets, but cached values are
//! scoped to one instance; use [`Environment::same_scope`] to compare them.

use crate::catalog::Registry;
use crate::config::Config;
use crate::error::ProxyError;
use crate::model::BoundModel;
use crate::session::ExecutionContext;
use crate::Context;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::info;

/// Session plus context under which remote operations run.
pub struct Environment {
    session: Arc<dyn ExecutionContext>,
    registry: Arc<Registry>,
    context: Context,
}

impl Environment {
    /// Creates the root environment of a session.
    ///
    /// The context starts from [`ExecutionContext::default_context`].
    pub fn new(session: Arc<dyn ExecutionContext>, registry: Registry) -> Arc<Self> {
        let context = session.default_context();
        Arc::new(Self {
            session,
            registry: Arc::new(registry),
            context,
        })
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Language code from the `lang` context key.
    pub fn lang(&self) -> Option<&str> {
        self.context.get("lang").and_then(Value::as_str)
    }

    /// Timezone name from the `tz` context key.
    pub fn tz(&self) -> Option<&str> {
        self.context.get("tz").and_then(Value::as_str)
    }

    pub fn session(&self) -> &Arc<dyn ExecutionContext> {
        &self.session
    }

    pub fn config(&self) -> &Config {
        self.session.config()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Derives a new environment.
    ///
    /// The new context is `base` (or the current context when `None`) with
    /// `overrides` applied on top; overrides win on key collision.
    pub fn derive(&self, base: Option<Context>, overrides: Context) -> Arc<Self> {
        let context = merge_context(base.unwrap_or_else(|| self.context.clone()), overrides);
        info!(keys = context.len(), lang = ?context.get("lang"), "Derived environment");
        Arc::new(Self {
            session: Arc::clone(&self.session),
            registry: Arc::clone(&self.registry),
            context,
        })
    }

    /// Model proxy for `name`, bound to this environment.
    pub fn model(self: &Arc<Self>, name: &str) -> Result<BoundModel, ProxyError> {
        let catalog = self
            .registry
            .catalog(name)
            .ok_or_else(|| ProxyError::UnknownModel(name.to_string()))?;
        Ok(BoundModel::new(name, catalog, Arc::clone(self)))
    }

    /// Whether two handles point at the same environment instance.
    pub fn same_scope(a: &Arc<Self>, b: &Arc<Self>) -> bool {
        Arc::ptr_eq(a, b)
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

/// Returns `base` with every entry of `overrides` inserted over it.
pub fn merge_context(mut base: Context, overrides: Context) -> Context {
    for (key, value) in overrides {
        base.insert(key, value);
    }
    base
}

/// Builds a context from `(key, value)` pairs.
pub fn context_from<I, K, V>(entries: I) -> Context
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<Value>,
{
    entries
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}
