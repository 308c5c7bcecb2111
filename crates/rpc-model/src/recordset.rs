//! # Recordsets
//!
//! A [`Recordset`] is a bound model plus an ordered list of record ids. It
//! owns (jointly) a [`RecordCache`] holding the field values fetched from the
//! server and the writes staged locally.
//!
//! ## Cache sharing
//! * [`BoundModel::browse`] allocates a fresh cache and loads every
//!   non-relational field of the requested ids in one `read`.
//! * Views obtained through [`Recordset::at`], [`Recordset::slice`] and
//!   [`Recordset::iter`] share the cache of their origin and never fetch.
//!
//! The cache lives behind `Arc<Mutex<_>>`; the lock is only held while
//! copying values in or out, never across a remote call.
//!
//! ## Virtual records
//! An empty recordset stands for a record not yet created. Its cache holds
//! the server defaults under the `None` key.
//!
//! ## Relational edits
//! A recordset obtained through [`Recordset::related`] remembers its parent
//! record and field. [`Recordset::add`] and [`Recordset::remove`] compute the
//! parent's new [`CommandList`] for that field; installing it is a separate
//! step ([`Recordset::stage_commands`] on the parent, or the `*_and_stage`
//! shortcuts).

use crate::catalog::FieldMeta;
use crate::commands::CommandList;
use crate::dispatch::RemoteCall;
use crate::env::{context_from, Environment};
use crate::error::ProxyError;
use crate::ids::{IntoIds, RecordId};
use crate::model::BoundModel;
use crate::Context;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::{Bound, RangeBounds};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

/// Value stored when the server returns nothing for a field.
pub const NO_VALUE: Value = Value::Bool(false);

/// Value mode asking the server for raw ids on many2one fields.
const CLASSIC_WRITE: &str = "_classic_write";

/// A locally staged write.
#[derive(Debug, Clone, PartialEq)]
pub enum PendingValue {
    Value(Value),
    Commands(CommandList),
}

impl PendingValue {
    pub fn to_value(&self) -> Value {
        match self {
            PendingValue::Value(value) => value.clone(),
            PendingValue::Commands(commands) => commands.to_value(),
        }
    }
}

/// Field values and staged writes, keyed by field then record id.
///
/// The `None` id holds the values of a virtual record.
#[derive(Debug, Default)]
pub struct RecordCache {
    values: HashMap<String, HashMap<Option<RecordId>, Value>>,
    pending: HashMap<String, HashMap<Option<RecordId>, PendingValue>>,
}

impl RecordCache {
    pub fn value(&self, field: &str, id: Option<RecordId>) -> Option<&Value> {
        self.values.get(field)?.get(&id)
    }

    pub fn pending(&self, field: &str, id: Option<RecordId>) -> Option<&PendingValue> {
        self.pending.get(field)?.get(&id)
    }

    fn set_value(&mut self, field: &str, id: Option<RecordId>, value: Value) {
        self.values.entry(field.to_string()).or_default().insert(id, value);
    }

    fn set_pending(&mut self, field: &str, id: Option<RecordId>, value: PendingValue) {
        self.pending.entry(field.to_string()).or_default().insert(id, value);
    }

    fn evict(&mut self, field: &str, keys: &[Option<RecordId>]) {
        if let Some(per_id) = self.values.get_mut(field) {
            for key in keys {
                per_id.remove(key);
            }
        }
    }

    fn clear_pending(&mut self, keys: &[Option<RecordId>]) {
        for per_id in self.pending.values_mut() {
            for key in keys {
                per_id.remove(key);
            }
        }
        self.pending.retain(|_, per_id| !per_id.is_empty());
    }

    fn pending_for(&self, id: Option<RecordId>) -> Context {
        self.pending
            .iter()
            .filter_map(|(field, per_id)| per_id.get(&id).map(|v| (field.clone(), v.to_value())))
            .collect()
    }
}

struct ParentLink {
    record: Recordset,
    field: String,
}

/// A selection of zero or more records of one model.
#[derive(Clone)]
pub struct Recordset {
    model: BoundModel,
    ids: Vec<RecordId>,
    cache: Arc<Mutex<RecordCache>>,
    parent: Option<Arc<ParentLink>>,
    iterated: bool,
}

impl Recordset {
    pub(crate) async fn browse(
        model: BoundModel,
        ids: Vec<RecordId>,
        parent: Option<(Recordset, String)>,
    ) -> Result<Self, ProxyError> {
        let records = Self {
            model,
            ids,
            cache: Arc::new(Mutex::new(RecordCache::default())),
            parent: parent.map(|(record, field)| Arc::new(ParentLink { record, field })),
            iterated: false,
        };
        records.load(None).await?;
        Ok(records)
    }

    /// A view over `ids` sharing this recordset's cache.
    fn view(&self, ids: Vec<RecordId>) -> Self {
        Self {
            model: self.model.clone(),
            ids,
            cache: Arc::clone(&self.cache),
            parent: None,
            iterated: true,
        }
    }

    fn lock_cache(&self) -> MutexGuard<'_, RecordCache> {
        self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn model(&self) -> &BoundModel {
        &self.model
    }

    pub fn name(&self) -> &str {
        self.model.name()
    }

    pub fn env(&self) -> &Arc<Environment> {
        self.model.env()
    }

    pub fn ids(&self) -> &[RecordId] {
        &self.ids
    }

    /// Primary identifier: the first id, `None` for an empty recordset.
    pub fn id(&self) -> Option<RecordId> {
        self.ids.first().copied()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Whether this recordset is a view produced by indexing or iteration.
    pub fn is_iterated(&self) -> bool {
        self.iterated
    }

    /// Parent record and field this recordset was reached through.
    pub fn parent(&self) -> Option<(&Recordset, &str)> {
        self.parent
            .as_deref()
            .map(|link| (&link.record, link.field.as_str()))
    }

    pub fn shares_cache_with(&self, other: &Recordset) -> bool {
        Arc::ptr_eq(&self.cache, &other.cache)
    }

    /// Cached server value of `field` for `id`, without any fetch.
    pub fn cached_value(&self, field: &str, id: Option<RecordId>) -> Option<Value> {
        self.lock_cache().value(field, id).cloned()
    }

    // --- Loading ---

    /// Fills the cache from the server.
    ///
    /// With ids, reads every non-relational field and fails with
    /// [`ProxyError::RecordNotFound`] if any id is missing from the answer.
    /// Relational values cached for the held ids are dropped and fetched
    /// again on next access. Without ids, stores the model defaults under the
    /// `None` key. Existing cached values are overwritten; staged writes are
    /// kept.
    pub async fn load(&self, context: Option<Context>) -> Result<(), ProxyError> {
        let context = context.unwrap_or_else(|| self.env().context().clone());
        if self.ids.is_empty() {
            return self.load_defaults(context).await;
        }
        let catalog = Arc::clone(self.model.catalog());
        {
            let keys = self.cache_keys();
            let mut cache = self.lock_cache();
            for field in catalog.relational_fields() {
                cache.evict(field, &keys);
            }
        }
        self.read_into_cache(catalog.basic_fields(), context).await
    }

    async fn load_defaults(&self, context: Context) -> Result<(), ProxyError> {
        let catalog = Arc::clone(self.model.catalog());
        let fields: Vec<String> = catalog.names().map(str::to_string).collect();
        let defaults = self
            .model
            .call("default_get")?
            .arg(fields)
            .context(context)
            .send()
            .await?;
        let Value::Object(defaults) = defaults else {
            return Err(ProxyError::unexpected("default_get", "expected an object"));
        };

        let mut cache = self.lock_cache();
        for name in catalog.names() {
            let value = defaults.get(name).cloned().unwrap_or(NO_VALUE);
            cache.set_value(name, None, value);
        }
        debug!(model = self.name(), fields = catalog.len(), "Loaded defaults");
        Ok(())
    }

    async fn read_into_cache(
        &self,
        fields: Vec<String>,
        context: Context,
    ) -> Result<(), ProxyError> {
        let rows = self
            .model
            .call("read")?
            .arg(self.ids.clone())
            .arg(fields.clone())
            .context(context)
            .kwarg("load", CLASSIC_WRITE)
            .send()
            .await?;
        let Value::Array(rows) = rows else {
            return Err(ProxyError::unexpected("read", "expected a list of rows"));
        };

        let mut fetched = HashSet::new();
        {
            let mut cache = self.lock_cache();
            for row in rows {
                let Value::Object(row) = row else {
                    return Err(ProxyError::unexpected("read", "row is not an object"));
                };
                let Some(id) = row.get("id").and_then(Value::as_i64) else {
                    return Err(ProxyError::unexpected("read", "row without an integer id"));
                };
                fetched.insert(id);
                for field in &fields {
                    if !row.contains_key(field) {
                        cache.set_value(field, Some(id), NO_VALUE);
                    }
                }
                for (field, value) in row {
                    if field != "id" {
                        cache.set_value(&field, Some(id), value);
                    }
                }
            }
        }

        let mut missing: Vec<RecordId> = self
            .ids
            .iter()
            .copied()
            .filter(|id| !fetched.contains(id))
            .collect();
        if !missing.is_empty() {
            missing.sort_unstable();
            missing.dedup();
            warn!(model = self.name(), ids = ?missing, "Records not found");
            return Err(ProxyError::RecordNotFound {
                model: self.name().to_string(),
                ids: missing,
            });
        }
        debug!(model = self.name(), count = fetched.len(), "Loaded records");
        Ok(())
    }

    /// Re-fetches server values, overwriting the cache.
    pub async fn refresh(&self) -> Result<(), ProxyError> {
        self.load(None).await
    }

    /// Discards staged writes of the held records and re-fetches their values.
    pub async fn revert(&self) -> Result<(), ProxyError> {
        self.lock_cache().clear_pending(&self.cache_keys());
        info!(model = self.name(), ids = ?self.ids, "Reverted staged writes");
        self.refresh().await
    }

    fn cache_keys(&self) -> Vec<Option<RecordId>> {
        if self.ids.is_empty() {
            vec![None]
        } else {
            self.ids.iter().copied().map(Some).collect()
        }
    }

    // --- Field access ---

    /// Value of `field` for the primary record.
    ///
    /// A staged scalar write wins over the server value. A field missing
    /// from the cache is read on its own; a field the server leaves out of
    /// its answer is cached as [`NO_VALUE`].
    pub async fn value(&self, field: &str) -> Result<Value, ProxyError> {
        self.field_meta(field)?;
        let key = self.id();
        if let Some(value) = self.lookup(field, key) {
            return Ok(value);
        }
        if self.ids.is_empty() {
            self.load(None).await?;
        } else {
            let context = self.env().context().clone();
            self.read_into_cache(vec![field.to_string()], context).await?;
        }
        Ok(self.lookup(field, key).unwrap_or(NO_VALUE))
    }

    fn lookup(&self, field: &str, key: Option<RecordId>) -> Option<Value> {
        let cache = self.lock_cache();
        if let Some(PendingValue::Value(value)) = cache.pending(field, key) {
            return Some(value.clone());
        }
        cache.value(field, key).cloned()
    }

    fn field_meta(&self, field: &str) -> Result<FieldMeta, ProxyError> {
        self.model
            .catalog()
            .get(field)
            .cloned()
            .ok_or_else(|| ProxyError::UnknownField {
                model: self.name().to_string(),
                field: field.to_string(),
            })
    }

    /// Records referenced by the relational `field` of the primary record.
    ///
    /// The result remembers this record as its parent, so that
    /// [`add`](Self::add) and [`remove`](Self::remove) can stage edits on it.
    pub async fn related(&self, field: &str) -> Result<Recordset, ProxyError> {
        let relation = self.field_meta(field)?.relation.ok_or_else(|| {
            ProxyError::InternalError(format!("Field '{}' is not relational", field))
        })?;
        let ids = self.value(field).await?.into_ids();
        let model = self.env().model(&relation.model)?;
        Recordset::browse(model, ids, Some((self.clone(), field.to_string()))).await
    }

    // --- Staging ---

    /// Stages a scalar write of `field` on every held record.
    pub fn stage(&self, field: &str, value: impl Into<Value>) -> Result<(), ProxyError> {
        self.field_meta(field)?;
        let value = value.into();
        let mut cache = self.lock_cache();
        for key in self.cache_keys() {
            cache.set_pending(field, key, PendingValue::Value(value.clone()));
        }
        Ok(())
    }

    /// Installs `commands` as the staged edit of `field` on the primary record.
    pub fn stage_commands(&self, field: &str, commands: CommandList) -> Result<(), ProxyError> {
        let meta = self.field_meta(field)?;
        if !meta.relation.is_some_and(|r| r.cardinality.is_to_many()) {
            return Err(ProxyError::InternalError(format!(
                "Field '{}' does not accept link commands",
                field
            )));
        }
        self.lock_cache()
            .set_pending(field, self.id(), PendingValue::Commands(commands));
        Ok(())
    }

    /// Copy of the commands staged on `field` for the primary record.
    pub fn pending_commands(&self, field: &str) -> CommandList {
        match self.lock_cache().pending(field, self.id()) {
            Some(PendingValue::Commands(commands)) => commands.clone(),
            _ => CommandList::new(),
        }
    }

    /// Staged writes of the primary record, ready for `write` or `create`.
    pub fn pending_values(&self) -> Context {
        self.pending_values_for(self.id())
    }

    pub(crate) fn pending_values_for(&self, id: Option<RecordId>) -> Context {
        self.lock_cache().pending_for(id)
    }

    pub(crate) fn clear_pending(&self) {
        self.lock_cache().clear_pending(&self.cache_keys());
    }

    // --- Relational edits ---

    /// Commands linking `records` into the parent field (`+=`).
    pub fn add(&self, records: impl IntoIds) -> Result<CommandList, ProxyError> {
        self.accumulate(records.into_ids(), CommandList::link)
    }

    /// Commands unlinking `records` from the parent field (`-=`).
    pub fn remove(&self, records: impl IntoIds) -> Result<CommandList, ProxyError> {
        self.accumulate(records.into_ids(), CommandList::unlink)
    }

    /// [`add`](Self::add) then stage the result on the parent.
    pub fn add_and_stage(&self, records: impl IntoIds) -> Result<CommandList, ProxyError> {
        let commands = self.add(records)?;
        self.install(commands)
    }

    /// [`remove`](Self::remove) then stage the result on the parent.
    pub fn remove_and_stage(&self, records: impl IntoIds) -> Result<CommandList, ProxyError> {
        let commands = self.remove(records)?;
        self.install(commands)
    }

    fn parent_link(&self) -> Result<&ParentLink, ProxyError> {
        self.parent
            .as_deref()
            .ok_or_else(|| ProxyError::InternalError("No parent record to update".to_string()))
    }

    fn accumulate(
        &self,
        ids: Vec<RecordId>,
        apply: fn(&mut CommandList, RecordId),
    ) -> Result<CommandList, ProxyError> {
        let link = self.parent_link()?;
        let mut commands = link.record.pending_commands(&link.field);
        for id in ids {
            apply(&mut commands, id);
        }
        Ok(commands)
    }

    fn install(&self, commands: CommandList) -> Result<CommandList, ProxyError> {
        let link = self.parent_link()?;
        link.record.stage_commands(&link.field, commands.clone())?;
        Ok(commands)
    }

    // --- Dispatch & rebinding ---

    /// Instance-level remote call of `method`; the ids are sent first.
    pub fn call(&self, method: &str) -> Result<RemoteCall, ProxyError> {
        RemoteCall::new(self.model.clone(), method, Some(self.ids.clone()))
    }

    /// Same ids browsed again under `env` (fresh cache).
    pub async fn with_env(&self, env: Arc<Environment>) -> Result<Recordset, ProxyError> {
        Recordset::browse(self.model.with_env(env), self.ids.clone(), None).await
    }

    /// Same ids browsed again under the current context updated with `overrides`.
    pub async fn with_context<I, K, V>(&self, overrides: I) -> Result<Recordset, ProxyError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let env = self.env().derive(None, context_from(overrides));
        self.with_env(env).await
    }

    /// Same ids browsed again under `base` updated with `overrides`; the
    /// current context is dropped.
    pub async fn with_context_from<I, K, V>(
        &self,
        base: Context,
        overrides: I,
    ) -> Result<Recordset, ProxyError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let env = self.env().derive(Some(base), context_from(overrides));
        self.with_env(env).await
    }

    // --- Indexing & iteration ---

    /// Single-record view at `index`.
    pub fn at(&self, index: usize) -> Option<Recordset> {
        self.ids.get(index).map(|&id| self.view(vec![id]))
    }

    /// View over a range of positions, clamped to the available ids.
    pub fn slice(&self, range: impl RangeBounds<usize>) -> Recordset {
        let len = self.ids.len();
        let start = match range.start_bound() {
            Bound::Included(&s) => s,
            Bound::Excluded(&s) => s.saturating_add(1),
            Bound::Unbounded => 0,
        }
        .min(len);
        let end = match range.end_bound() {
            Bound::Included(&e) => e.saturating_add(1),
            Bound::Excluded(&e) => e,
            Bound::Unbounded => len,
        }
        .clamp(start, len);
        self.view(self.ids[start..end].to_vec())
    }

    /// One single-record view per id, in order.
    pub fn iter(&self) -> impl Iterator<Item = Recordset> + '_ {
        self.ids.iter().map(|&id| self.view(vec![id]))
    }
}

impl IntoIds for &Recordset {
    fn into_ids(self) -> Vec<RecordId> {
        self.ids.clone()
    }
}

impl IntoIds for Recordset {
    fn into_ids(self) -> Vec<RecordId> {
        self.ids
    }
}

/// Recordsets compare by model name and primary id only.
impl PartialEq for Recordset {
    fn eq(&self, other: &Self) -> bool {
        self.name() == other.name() && self.id() == other.id()
    }
}

impl Eq for Recordset {}

impl Hash for Recordset {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name().hash(state);
        self.id().hash(state);
    }
}

impl fmt::Display for Recordset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Recordset('{}', {:?})", self.name(), self.ids)
    }
}

impl fmt::Debug for Recordset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
