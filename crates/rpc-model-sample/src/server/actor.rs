//! # Server Actor
//!
//! The [`ServerActor`] plays the remote ERP server. It owns one [`Table`] per
//! model and processes [`RpcRequest`]s sequentially on its own Tokio task, so
//! the tables need no locking.
//!
//! ## Supported methods
//!
//! | Method | Positional arguments | Result |
//! |---|---|---|
//! | `read` | ids, fields | rows of the existing ids (missing ids are skipped) |
//! | `default_get` | fields | column defaults |
//! | `search` | domain (`offset`, `limit` kwargs) | ids |
//! | `search_count` | domain | count |
//! | `create` | values | new id |
//! | `write` | ids, values | `true` |
//! | `unlink` | ids | `true` |
//! | `name_get` | ids | `[[id, name], ...]` |
//! | `name_search` | name (`limit` kwarg) | `[[id, name], ...]` |
//!
//! Values are always returned raw, as a real server does for
//! `load="_classic_write"`: many-to-one columns hold an id, to-many columns a
//! list of ids. `create` and `write` accept to-many command lists
//! (`[3, id]`, `[4, id]`, `[5]`, `[6, 0, ids]`).

use super::error::ServerError;
use super::message::RpcRequest;
use super::session::ActorSession;
use super::table::{Row, Table};
use rpc_model::{normalize_ids, Context, RecordId};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

pub struct ServerActor {
    receiver: mpsc::Receiver<RpcRequest>,
    tables: HashMap<String, Table>,
}

impl ServerActor {
    /// Creates the actor and a session connected to it.
    ///
    /// The actor does nothing until [`run`](Self::run) is spawned.
    pub fn new(buffer_size: usize, tables: HashMap<String, Table>) -> (Self, ActorSession) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        (Self { receiver, tables }, ActorSession::new(sender))
    }

    /// Processes requests until every session is dropped or a
    /// [`RpcRequest::Shutdown`] arrives.
    pub async fn run(mut self) {
        info!(tables = self.tables.len(), "Server actor started");

        while let Some(msg) = self.receiver.recv().await {
            match msg {
                RpcRequest::Execute {
                    model,
                    method,
                    args,
                    kwargs,
                    respond_to,
                } => {
                    debug!(%model, %method, ?args, "Execute");
                    let result = self.execute(&model, &method, &args, &kwargs);
                    if let Err(e) = &result {
                        warn!(%model, %method, error = %e, "Execute failed");
                    }
                    let _ = respond_to.send(result);
                }
                RpcRequest::Shutdown { respond_to } => {
                    info!("Shutdown requested");
                    let _ = respond_to.send(());
                    break;
                }
            }
        }

        let rows: usize = self.tables.values().map(Table::len).sum();
        info!(tables = self.tables.len(), rows, "Server actor stopped");
    }

    fn execute(
        &mut self,
        model: &str,
        method: &str,
        args: &[Value],
        kwargs: &Context,
    ) -> Result<Value, ServerError> {
        let table = self
            .tables
            .get_mut(model)
            .ok_or_else(|| ServerError::UnknownModel(model.to_string()))?;

        match method {
            "read" => read(table, args),
            "default_get" => default_get(table, args),
            "search" => search(table, args, kwargs),
            "search_count" => {
                let domain = args.first().unwrap_or(&Value::Null);
                Ok(json!(table.search(domain)?.len()))
            }
            "create" => create(table, args),
            "write" => write(model, table, args),
            "unlink" => unlink(model, table, args),
            "name_get" => {
                let ids = ids_arg(args, 0, method)?;
                Ok(name_pairs(model, table, ids))
            }
            "name_search" => {
                let name = args.first().and_then(Value::as_str).unwrap_or("");
                let mut ids = table.search(&json!([["name", "ilike", name]]))?;
                ids.truncate(limit(kwargs).unwrap_or(100));
                Ok(name_pairs(model, table, ids))
            }
            _ => Err(ServerError::MissingMethod {
                model: model.to_string(),
                method: method.to_string(),
            }),
        }
    }
}

// --- Argument helpers ---

fn arg<'a>(args: &'a [Value], index: usize, method: &str) -> Result<&'a Value, ServerError> {
    args.get(index)
        .ok_or_else(|| {
            ServerError::invalid(method, format!("missing positional argument {}", index))
        })
}

fn ids_arg(args: &[Value], index: usize, method: &str) -> Result<Vec<RecordId>, ServerError> {
    Ok(normalize_ids(arg(args, index, method)?))
}

fn values_arg<'a>(args: &'a [Value], index: usize, method: &str) -> Result<&'a Row, ServerError> {
    arg(args, index, method)?
        .as_object()
        .ok_or_else(|| ServerError::invalid(method, "values must be an object"))
}

/// Field names, `None` meaning every column.
fn fields_arg(
    args: &[Value],
    index: usize,
    method: &str,
) -> Result<Option<Vec<String>>, ServerError> {
    match args.get(index) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Array(names)) => Ok(Some(
            names.iter().filter_map(Value::as_str).map(str::to_string).collect(),
        )),
        Some(_) => Err(ServerError::invalid(method, "fields must be a list of names")),
    }
}

fn limit(kwargs: &Context) -> Option<usize> {
    kwargs.get("limit").and_then(Value::as_u64).map(|n| n as usize)
}

fn ensure_exist(model: &str, table: &Table, ids: &[RecordId]) -> Result<(), ServerError> {
    let missing: Vec<RecordId> = ids
        .iter()
        .copied()
        .filter(|&id| table.get(id).is_none())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ServerError::MissingRecords {
            model: model.to_string(),
            ids: missing,
        })
    }
}

// --- Methods ---

fn read(table: &Table, args: &[Value]) -> Result<Value, ServerError> {
    let ids = ids_arg(args, 0, "read")?;
    let fields = fields_arg(args, 1, "read")?;

    let mut seen = HashSet::new();
    let rows = ids
        .into_iter()
        .filter(|id| seen.insert(*id))
        .filter_map(|id| table.get(id).map(|row| (id, row)))
        .map(|(id, row)| {
            let mut out = Row::new();
            out.insert("id".to_string(), json!(id));
            match &fields {
                Some(names) => {
                    for name in names {
                        let value = row.get(name).cloned().unwrap_or(Value::Bool(false));
                        out.insert(name.clone(), value);
                    }
                }
                None => out.extend(row.clone()),
            }
            Value::Object(out)
        })
        .collect();
    Ok(Value::Array(rows))
}

fn default_get(table: &Table, args: &[Value]) -> Result<Value, ServerError> {
    let defaults = table.defaults();
    let values: Row = match fields_arg(args, 0, "default_get")? {
        Some(names) => names
            .into_iter()
            .filter_map(|name| defaults.get(&name).cloned().map(|v| (name, v)))
            .collect(),
        None => defaults.clone(),
    };
    Ok(Value::Object(values))
}

fn search(table: &Table, args: &[Value], kwargs: &Context) -> Result<Value, ServerError> {
    let domain = args.first().unwrap_or(&Value::Null);
    let offset = kwargs.get("offset").and_then(Value::as_u64).unwrap_or(0) as usize;
    let ids: Vec<RecordId> = table
        .search(domain)?
        .into_iter()
        .skip(offset)
        .take(limit(kwargs).unwrap_or(usize::MAX))
        .collect();
    Ok(json!(ids))
}

fn create(table: &mut Table, args: &[Value]) -> Result<Value, ServerError> {
    let values = values_arg(args, 0, "create")?;
    let mut row = Row::new();
    for (field, value) in values {
        row.insert(field.clone(), resolve(Value::Bool(false), value, "create")?);
    }
    let id = table.insert(row);
    info!(id, "Created");
    Ok(json!(id))
}

fn write(model: &str, table: &mut Table, args: &[Value]) -> Result<Value, ServerError> {
    let ids = ids_arg(args, 0, "write")?;
    let values = values_arg(args, 1, "write")?;
    ensure_exist(model, table, &ids)?;

    // Every column is resolved before any row is touched.
    let mut staged: Vec<(RecordId, Vec<(String, Value)>)> = Vec::with_capacity(ids.len());
    for id in &ids {
        let Some(row) = table.get(*id) else { continue };
        let mut columns = Vec::with_capacity(values.len());
        for (field, value) in values {
            let current = row.get(field).cloned().unwrap_or(Value::Bool(false));
            columns.push((field.clone(), resolve(current, value, "write")?));
        }
        staged.push((*id, columns));
    }
    for (id, columns) in staged {
        if let Some(row) = table.get_mut(id) {
            row.extend(columns);
        }
    }
    info!(%model, ids = ?ids, fields = values.len(), "Written");
    Ok(Value::Bool(true))
}

fn unlink(model: &str, table: &mut Table, args: &[Value]) -> Result<Value, ServerError> {
    let ids = ids_arg(args, 0, "unlink")?;
    ensure_exist(model, table, &ids)?;
    for id in &ids {
        table.remove(*id);
    }
    info!(%model, ids = ?ids, remaining = table.len(), "Deleted");
    Ok(Value::Bool(true))
}

fn name_pairs(model: &str, table: &Table, ids: Vec<RecordId>) -> Value {
    let pairs: Vec<Value> = ids
        .into_iter()
        .filter_map(|id| {
            let row = table.get(id)?;
            let name = match row.get("name").and_then(Value::as_str) {
                Some(name) => name.to_string(),
                None => format!("{},{}", model, id),
            };
            Some(json!([id, name]))
        })
        .collect();
    Value::Array(pairs)
}

// --- To-many commands ---

fn is_command_list(value: &Value) -> bool {
    value.as_array().is_some_and(|items| {
        !items.is_empty()
            && items
                .iter()
                .all(|item| item.as_array().and_then(|c| c.first()).is_some_and(Value::is_u64))
    })
}

/// New column value: `value` itself, or `current` with the commands applied.
fn resolve(current: Value, value: &Value, method: &str) -> Result<Value, ServerError> {
    if !is_command_list(value) {
        return Ok(value.clone());
    }
    let mut ids = normalize_ids(current);
    for command in value.as_array().into_iter().flatten() {
        let parts = command.as_array().map(Vec::as_slice).unwrap_or_default();
        let target = || {
            parts.get(1).and_then(Value::as_i64).ok_or_else(|| {
                ServerError::invalid(method, format!("command without id: {}", command))
            })
        };
        match parts.first().and_then(Value::as_u64) {
            Some(3) => {
                let id = target()?;
                ids.retain(|&existing| existing != id);
            }
            Some(4) => {
                let id = target()?;
                if !ids.contains(&id) {
                    ids.push(id);
                }
            }
            Some(5) => ids.clear(),
            Some(6) => ids = parts.get(2).map(|ids| normalize_ids(ids)).unwrap_or_default(),
            _ => {
                return Err(ServerError::invalid(
                    method,
                    format!("unsupported command: {}", command),
                ))
            }
        }
    }
    Ok(json!(ids))
}
