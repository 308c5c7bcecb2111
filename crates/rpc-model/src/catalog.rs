//! # Field Catalogs
//!
//! A [`FieldCatalog`] describes the fields of one remote model: which ones are
//! relational, with which cardinality and target model. Catalogs are built by
//! whoever fetched the schema and are shared read-only (`Arc`) between every
//! bound model and recordset of that type.
//!
//! A [`Registry`] maps model names to their catalogs for one session.

use std::collections::HashMap;
use std::sync::Arc;

/// Cardinality of a relational field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    /// `many2one`: the value is a single id (or `false`).
    ManyToOne,
    /// `one2many`: the value is a list of ids owned by the parent.
    OneToMany,
    /// `many2many`: the value is a list of ids linked through a relation table.
    ManyToMany,
}

impl Cardinality {
    /// Whether the field holds a list of records.
    pub fn is_to_many(self) -> bool {
        matches!(self, Cardinality::OneToMany | Cardinality::ManyToMany)
    }
}

/// Target of a relational field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    pub cardinality: Cardinality,
    pub model: String,
}

/// Metadata of a single field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMeta {
    pub relation: Option<Relation>,
}

impl FieldMeta {
    pub fn is_relational(&self) -> bool {
        self.relation.is_some()
    }
}

/// Ordered field metadata of a remote model.
#[derive(Debug, Clone, Default)]
pub struct FieldCatalog {
    fields: Vec<(String, FieldMeta)>,
    index: HashMap<String, usize>,
}

impl FieldCatalog {
    pub fn builder() -> FieldCatalogBuilder {
        FieldCatalogBuilder::default()
    }

    pub fn get(&self, name: &str) -> Option<&FieldMeta> {
        self.index.get(name).map(|&i| &self.fields[i].1)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// All field names, in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    /// Non-relational field names, in declaration order.
    ///
    /// These are the fields loaded eagerly by `browse`.
    pub fn basic_fields(&self) -> Vec<String> {
        self.fields
            .iter()
            .filter(|(_, meta)| !meta.is_relational())
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Relational field names, in declaration order.
    pub fn relational_fields(&self) -> impl Iterator<Item = &str> {
        self.fields
            .iter()
            .filter(|(_, meta)| meta.is_relational())
            .map(|(name, _)| name.as_str())
    }

    fn insert(&mut self, name: String, meta: FieldMeta) {
        match self.index.get(&name) {
            Some(&i) => self.fields[i].1 = meta,
            None => {
                self.index.insert(name.clone(), self.fields.len());
                self.fields.push((name, meta));
            }
        }
    }
}

/// Builder for [`FieldCatalog`].
///
/// ```rust
/// use rpc_model::{Cardinality, FieldCatalog};
///
/// let catalog = FieldCatalog::builder()
///     .field("name")
///     .field("email")
///     .relation("category_id", Cardinality::ManyToMany, "res.partner.category")
///     .build();
///
/// assert_eq!(catalog.basic_fields(), vec!["name", "email"]);
/// assert_eq!(catalog.relational_fields().collect::<Vec<_>>(), vec!["category_id"]);
/// assert!(catalog.get("category_id").unwrap().is_relational());
/// ```
#[derive(Debug, Default)]
pub struct FieldCatalogBuilder {
    catalog: FieldCatalog,
}

impl FieldCatalogBuilder {
    /// Declares a non-relational field. Redeclaring a field replaces it.
    pub fn field(mut self, name: impl Into<String>) -> Self {
        self.catalog.insert(name.into(), FieldMeta::default());
        self
    }

    /// Declares a relational field pointing at `model`.
    pub fn relation(
        mut self,
        name: impl Into<String>,
        cardinality: Cardinality,
        model: impl Into<String>,
    ) -> Self {
        let meta = FieldMeta {
            relation: Some(Relation {
                cardinality,
                model: model.into(),
            }),
        };
        self.catalog.insert(name.into(), meta);
        self
    }

    pub fn build(self) -> FieldCatalog {
        self.catalog
    }
}

/// Model name to catalog mapping of one session.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    models: HashMap<String, Arc<FieldCatalog>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) the catalog of `model`.
    pub fn register(mut self, model: impl Into<String>, catalog: FieldCatalog) -> Self {
        self.models.insert(model.into(), Arc::new(catalog));
        self
    }

    pub fn catalog(&self, model: &str) -> Option<Arc<FieldCatalog>> {
        self.models.get(model).cloned()
    }

    pub fn models(&self) -> impl Iterator<Item = &str> {
        self.models.keys().map(String::as_str)
    }
}
