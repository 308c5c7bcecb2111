//! # Typed Operations
//!
//! Typed wrappers around the most common server methods. Each one is a thin
//! layer over [`RemoteCall`](crate::dispatch::RemoteCall): the generic path
//! stays available through `call` for everything else.

use crate::error::ProxyError;
use crate::ids::{IntoIds, RecordId};
use crate::model::BoundModel;
use crate::recordset::Recordset;
use crate::Context;
use serde_json::Value;
use tracing::{debug, instrument};

impl BoundModel {
    /// Ids of the records matching `domain`.
    #[instrument(skip(self), fields(model = self.name()))]
    pub async fn search(&self, domain: Value) -> Result<Vec<RecordId>, ProxyError> {
        self.call("search")?.arg(domain).send_as().await
    }

    #[instrument(skip(self), fields(model = self.name()))]
    pub async fn search_count(&self, domain: Value) -> Result<u64, ProxyError> {
        self.call("search_count")?.arg(domain).send_as().await
    }

    /// Searches then browses the matching records.
    pub async fn search_browse(&self, domain: Value) -> Result<Recordset, ProxyError> {
        let ids = self.search(domain).await?;
        self.browse(ids).await
    }

    /// Creates a record and returns its id.
    #[instrument(skip(self, values), fields(model = self.name()))]
    pub async fn create(&self, values: Context) -> Result<RecordId, ProxyError> {
        let result = self.call("create")?.arg(Value::Object(values)).send().await?;
        // Some servers answer a single create with a one-element list.
        result
            .into_ids()
            .first()
            .copied()
            .ok_or_else(|| ProxyError::unexpected("create", "no record id returned"))
    }

    /// Default values of `fields` for a new record.
    pub async fn default_get(&self, fields: &[&str]) -> Result<Context, ProxyError> {
        self.call("default_get")?.arg(fields.to_vec()).send_as().await
    }

    /// `(id, display name)` pairs of records whose name matches `name`.
    #[instrument(skip(self), fields(model = self.name()))]
    pub async fn name_search(&self, name: &str) -> Result<Vec<(RecordId, String)>, ProxyError> {
        self.call("name_search")?.arg(name).send_as().await
    }
}

impl Recordset {
    /// Writes `values` on every held record.
    #[instrument(skip(self, values), fields(model = self.name(), ids = ?self.ids()))]
    pub async fn write(&self, values: Context) -> Result<bool, ProxyError> {
        self.call("write")?.arg(Value::Object(values)).send_as().await
    }

    #[instrument(skip(self), fields(model = self.name(), ids = ?self.ids()))]
    pub async fn unlink(&self) -> Result<bool, ProxyError> {
        self.call("unlink")?.send_as().await
    }

    pub async fn name_get(&self) -> Result<Vec<(RecordId, String)>, ProxyError> {
        self.call("name_get")?.send_as().await
    }

    /// Flushes staged writes to the server.
    ///
    /// Held records get one `write` each (only when something is staged for
    /// them) and are refreshed; the returned recordset is `self`. A virtual
    /// record is created from its staged values and the new record is
    /// returned instead.
    pub async fn save(&self) -> Result<Recordset, ProxyError> {
        if self.is_empty() {
            let values = self.pending_values_for(None);
            let id = self.model().create(values).await?;
            self.clear_pending();
            debug!(model = self.name(), id, "Created record from staged values");
            return self.model().browse(id).await;
        }

        for record in self.iter() {
            let values = self.pending_values_for(record.id());
            if !values.is_empty() {
                record.write(values).await?;
            }
        }
        self.clear_pending();
        self.refresh().await?;
        Ok(self.clone())
    }
}
