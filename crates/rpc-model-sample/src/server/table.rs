//! # In-Memory Tables
//!
//! One [`Table`] per model: rows keyed by id, column defaults, and a small
//! domain evaluator for `search`.
//!
//! Domains are lists of `[field, operator, value]` terms joined by an
//! implicit AND (an explicit `"&"` is accepted and ignored). Supported
//! operators: `=`, `!=`, `in`, `not in`, `like`, `ilike`, `<`, `<=`, `>`,
//! `>=`. On list-valued columns (to-many relations) `=` means "contains".

use super::error::ServerError;
use rpc_model::RecordId;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// A stored record, without its `id`.
pub type Row = Map<String, Value>;

#[derive(Debug, Clone)]
pub struct Table {
    rows: BTreeMap<RecordId, Row>,
    defaults: Row,
    next_id: RecordId,
}

impl Default for Table {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            defaults: Row::new(),
            next_id: 1,
        }
    }
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    /// Values applied to columns missing from a created row.
    pub fn with_defaults(mut self, defaults: Row) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn defaults(&self) -> &Row {
        &self.defaults
    }

    /// Inserts `row` (completed with the defaults) and returns its new id.
    pub fn insert(&mut self, mut row: Row) -> RecordId {
        for (field, value) in &self.defaults {
            row.entry(field.clone()).or_insert_with(|| value.clone());
        }
        let id = self.next_id;
        self.next_id += 1;
        self.rows.insert(id, row);
        id
    }

    pub fn get(&self, id: RecordId) -> Option<&Row> {
        self.rows.get(&id)
    }

    pub fn get_mut(&mut self, id: RecordId) -> Option<&mut Row> {
        self.rows.get_mut(&id)
    }

    pub fn remove(&mut self, id: RecordId) -> Option<Row> {
        self.rows.remove(&id)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Ids of the rows matching `domain`, ascending.
    pub fn search(&self, domain: &Value) -> Result<Vec<RecordId>, ServerError> {
        let terms = parse_domain(domain)?;
        Ok(self
            .rows
            .iter()
            .filter(|(_, row)| terms.iter().all(|term| term.matches(row)))
            .map(|(&id, _)| id)
            .collect())
    }
}

struct Term<'a> {
    field: &'a str,
    operator: &'a str,
    value: &'a Value,
}

fn parse_domain(domain: &Value) -> Result<Vec<Term<'_>>, ServerError> {
    let items = match domain {
        Value::Array(items) => items,
        Value::Null | Value::Bool(false) => return Ok(Vec::new()),
        other => return Err(ServerError::UnsupportedDomain(other.to_string())),
    };

    let mut terms = Vec::with_capacity(items.len());
    for item in items {
        match item {
            Value::String(op) if op == "&" => continue,
            Value::Array(parts) if parts.len() == 3 => {
                let (Some(field), Some(operator)) = (parts[0].as_str(), parts[1].as_str()) else {
                    return Err(ServerError::UnsupportedDomain(item.to_string()));
                };
                if !is_supported(operator) {
                    return Err(ServerError::UnsupportedDomain(item.to_string()));
                }
                terms.push(Term {
                    field,
                    operator,
                    value: &parts[2],
                });
            }
            other => return Err(ServerError::UnsupportedDomain(other.to_string())),
        }
    }
    Ok(terms)
}

fn is_supported(operator: &str) -> bool {
    matches!(
        operator,
        "=" | "!=" | "in" | "not in" | "like" | "ilike" | "<" | "<=" | ">" | ">="
    )
}

impl Term<'_> {
    fn matches(&self, row: &Row) -> bool {
        let unset = Value::Bool(false);
        let stored = row.get(self.field).unwrap_or(&unset);
        match self.operator {
            "=" => holds(stored, self.value),
            "!=" => !holds(stored, self.value),
            "in" => self.candidates().any(|v| holds(stored, v)),
            "not in" => !self.candidates().any(|v| holds(stored, v)),
            "like" => text_contains(stored, self.value, false),
            "ilike" => text_contains(stored, self.value, true),
            op => compare(stored, self.value).is_some_and(|ord| match op {
                "<" => ord.is_lt(),
                "<=" => ord.is_le(),
                ">" => ord.is_gt(),
                _ => ord.is_ge(),
            }),
        }
    }

    fn candidates(&self) -> impl Iterator<Item = &Value> {
        self.value.as_array().into_iter().flatten()
    }
}

/// Equality, with "contains" semantics on list-valued columns.
fn holds(stored: &Value, value: &Value) -> bool {
    match stored {
        Value::Array(items) if !value.is_array() => items.contains(value),
        _ => stored == value,
    }
}

fn text_contains(stored: &Value, needle: &Value, case_insensitive: bool) -> bool {
    let (Some(haystack), Some(needle)) = (stored.as_str(), needle.as_str()) else {
        return false;
    };
    if case_insensitive {
        haystack.to_lowercase().contains(&needle.to_lowercase())
    } else {
        haystack.contains(needle)
    }
}

fn compare(stored: &Value, value: &Value) -> Option<std::cmp::Ordering> {
    match (stored, value) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => None,
    }
}
