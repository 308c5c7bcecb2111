//! # System Lifecycle
//!
//! [`DemoSystem`] wires the sample together:
//!
//! 1. **Seed** the server tables ([`seed_tables`]).
//! 2. **Spawn** the [`ServerActor`] on its own task.
//! 3. **Bind** the session to a root [`Environment`] over the demo
//!    [`registry`].
//!
//! ## Graceful Shutdown
//!
//! Recordsets keep their environment (and so the session) alive, which means
//! dropping the system alone would not close the actor's channel.
//! [`DemoSystem::shutdown`] sends an explicit stop request instead and then
//! awaits the actor task. Calls made afterwards fail with
//! [`RemoteFault::Transport`](rpc_model::RemoteFault::Transport).

use crate::server::{ActorSession, Row, ServerActor, ServerError, Table};
use rpc_model::{context_from, Cardinality, Environment, FieldCatalog, Registry};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info};

pub struct DemoSystem {
    /// Root environment, in the demo user's context.
    pub env: Arc<Environment>,
    session: ActorSession,
    handle: JoinHandle<()>,
}

impl DemoSystem {
    /// Seeds the data, spawns the server actor and binds a root environment.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new() -> Self {
        Self::with_tables(seed_tables())
    }

    pub fn with_tables(tables: HashMap<String, Table>) -> Self {
        let (actor, session) = ServerActor::new(32, tables);
        let session = session.with_default_context(context_from([
            ("lang", "en_US"),
            ("tz", "Europe/Brussels"),
        ]));
        let handle = tokio::spawn(actor.run());
        let env = Environment::new(Arc::new(session.clone()), registry());
        info!(models = ?env.registry().models().collect::<Vec<_>>(), "Demo system ready");

        Self { env, session, handle }
    }

    /// Stops the server actor and waits for its task to finish.
    pub async fn shutdown(self) -> Result<(), ServerError> {
        info!("Shutting down demo system...");
        self.session
            .shutdown()
            .await
            .map_err(|e| ServerError::Stopped(e.to_string()))?;

        if let Err(e) = self.handle.await {
            error!("Server task failed: {:?}", e);
            return Err(ServerError::Stopped(format!("Server task failed: {:?}", e)));
        }
        info!("Demo system shutdown complete.");
        Ok(())
    }
}

impl Default for DemoSystem {
    fn default() -> Self {
        Self::new()
    }
}

/// Field catalogs of the demo models.
pub fn registry() -> Registry {
    Registry::new()
        .register(
            "res.partner",
            FieldCatalog::builder()
                .field("name")
                .field("email")
                .field("is_company")
                .relation("country_id", Cardinality::ManyToOne, "res.country")
                .relation("category_id", Cardinality::ManyToMany, "res.partner.category")
                .build(),
        )
        .register(
            "res.country",
            FieldCatalog::builder().field("name").field("code").build(),
        )
        .register(
            "res.partner.category",
            FieldCatalog::builder().field("name").build(),
        )
}

/// Server tables with a handful of partners, countries and tags.
pub fn seed_tables() -> HashMap<String, Table> {
    let mut countries = Table::new();
    for (name, code) in [("Belgium", "BE"), ("France", "FR")] {
        countries.insert(row(json!({"name": name, "code": code})));
    }

    let mut categories = Table::new();
    for name in ["Customer", "Vendor", "VIP"] {
        categories.insert(row(json!({"name": name})));
    }

    let mut partners = Table::new().with_defaults(row(json!({
        "is_company": false,
        "country_id": false,
        "category_id": [],
    })));
    for partner in [
        json!({
            "name": "Azure Interior",
            "email": "azure@example.com",
            "is_company": true,
            "country_id": 1,
            "category_id": [1, 3]
        }),
        json!({
            "name": "Deco Addict",
            "email": "deco@example.com",
            "is_company": true,
            "country_id": 2,
            "category_id": [1]
        }),
        json!({"name": "Brandon Freeman", "email": "brandon@example.com", "country_id": 1}),
    ] {
        partners.insert(row(partner));
    }

    HashMap::from([
        ("res.country".to_string(), countries),
        ("res.partner.category".to_string(), categories),
        ("res.partner".to_string(), partners),
    ])
}

fn row(value: Value) -> Row {
    match value {
        Value::Object(map) => map,
        _ => Row::new(),
    }
}
