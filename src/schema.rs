//! Schema metamodel.
//!
//! A [`Schema`] is compiled once from a declarative [`SchemaDefinition`] and
//! never changes afterwards. It holds one [`TableDefinition`] per declared
//! table; nodes refer to each other (super, children, association targets)
//! by [`TableId`].
//!
//! # Inheritance
//!
//! A table may name one `super` table and inherits all of its attributes and
//! associations. Two storage strategies are derived from the definition:
//!
//! - **Single-table inheritance**: a table whose merged attributes contain a
//!   `type` column shares the physical table of its highest STI ancestor.
//!   Rows are told apart by `type`, which holds the concrete table's
//!   underscore name.
//! - **Class-table inheritance**: any other table with children. Every node of
//!   the subtree has its own physical table holding all its merged columns.
//!
//! # Examples
//!
//! ```
//! use tablewright::schema::{Schema, Strategy};
//! use tablewright::types::TypeRegistry;
//!
//! let schema = Schema::from_json(
//!     r#"{"tables": [
//!         {"name": "document", "attributes": [{"name": "type", "type": "string"}]},
//!         {"name": "book", "super": "document"}
//!     ]}"#,
//!     &TypeRegistry::standard(),
//! )?;
//! let book = schema.find("book").unwrap();
//! assert_eq!(book.collection_name(), "documents");
//! assert_eq!(book.strategy(), Strategy::SingleTable);
//! # Ok::<(), tablewright::schema::SchemaError>(())
//! ```

use crate::types::{TypeError, TypeRegistry};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

mod association;
mod attribute;
mod compiler;
mod ddl;
pub mod definition;
mod table;

pub use association::{Association, Dependent};
pub use attribute::{AttributeDefinition, CREATED_AT, ID, PARENT_ID, PARENT_TYPE, TYPE, UPDATED_AT};
pub use definition::{AssociationSpec, AttributeSpec, Collection, SchemaDefinition, TableSpec};
pub use table::{Strategy, TableDefinition, TableId};

/// Errors raised while loading a schema or while checking a request against it.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("failed to read schema definition {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid schema definition: {0}")]
    Definition(#[from] serde_json::Error),
    #[error("invalid identifier '{0}'")]
    InvalidIdentifier(String),
    #[error("duplicate table '{0}'")]
    DuplicateTable(String),
    #[error("table '{table}' declares attribute '{attribute}' twice")]
    DuplicateAttribute { table: String, attribute: String },
    #[error("unknown table '{0}'")]
    UnknownTable(String),
    #[error("attribute '{attribute}' of '{table}' has unknown type '{type_name}'")]
    UnknownType {
        table: String,
        attribute: String,
        type_name: String,
    },
    #[error("inheritance cycle through '{0}'")]
    InheritanceCycle(String),
    #[error("'{table}' redeclares '{attribute}' as {found}, inherited as {expected}")]
    TypeMismatch {
        table: String,
        attribute: String,
        expected: String,
        found: String,
    },
    #[error("attribute '{attribute}' of '{table}' is reserved")]
    ReservedAttribute { table: String, attribute: String },
    #[error("invalid definition of '{table}': {reason}")]
    InvalidDefinition { table: String, reason: String },
    #[error("invalid restriction on '{table}.{attribute}': {source}")]
    Restriction {
        table: String,
        attribute: String,
        #[source]
        source: TypeError,
    },
    #[error("invalid value for '{attribute}': {source}")]
    InvalidAttribute {
        attribute: String,
        #[source]
        source: TypeError,
    },
    #[error("unknown column '{column}' on '{table}'")]
    UnknownColumn { table: String, column: String },
    #[error("unknown operator '{operator}' for column '{column}'")]
    UnknownOperator { column: String, operator: String },
    #[error("operator '{operator}' is not supported for column '{column}' of type {type_name}")]
    UnsupportedOperator {
        column: String,
        operator: &'static str,
        type_name: &'static str,
    },
    #[error("invalid filter value '{value}' for '{column}': {reason}")]
    InvalidFilter {
        column: String,
        value: String,
        reason: String,
    },
    #[error("invalid {clause} clause: {reason}")]
    InvalidClause { clause: &'static str, reason: String },
    #[error("operator '{0}' is not implemented")]
    NotImplemented(&'static str),
    #[error("'{type_name}' is not a subtype of '{table}'")]
    NotDescendant { table: String, type_name: String },
    #[error("missing required attribute '{attribute}' on '{table}'")]
    MissingRequired { table: String, attribute: String },
    #[error("row of '{table}' has unknown discriminator '{value}'")]
    UnknownDiscriminator { table: String, value: String },
}

/// The compiled, immutable table graph.
#[derive(Debug, Clone)]
pub struct Schema {
    tables: Vec<TableDefinition>,
    by_name: HashMap<String, TableId>,
    by_underscore: HashMap<String, TableId>,
    registry: TypeRegistry,
}

impl Schema {
    /// Compiles a parsed definition.
    ///
    /// # Errors
    ///
    /// Returns a [`SchemaError`] for unknown super/target tables or types,
    /// duplicate names, inheritance cycles, conflicting redeclarations and
    /// invalid restrictions.
    pub fn compile(definition: SchemaDefinition, registry: &TypeRegistry) -> Result<Self, SchemaError> {
        let tables = compiler::compile(definition, registry)?;
        let mut by_name = HashMap::with_capacity(tables.len());
        let mut by_underscore = HashMap::with_capacity(tables.len());
        for table in &tables {
            by_name.insert(table.name.clone(), table.id);
            by_underscore.insert(table.underscore_name.clone(), table.id);
        }
        log::debug!("Compiled schema with {} tables", tables.len());
        Ok(Self {
            tables,
            by_name,
            by_underscore,
            registry: registry.clone(),
        })
    }

    /// Parses and compiles a JSON definition.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::Definition`] for malformed JSON, or any error of
    /// [`Schema::compile`].
    pub fn from_json(json: &str, registry: &TypeRegistry) -> Result<Self, SchemaError> {
        let definition: SchemaDefinition = serde_json::from_str(json)?;
        Self::compile(definition, registry)
    }

    /// Reads and compiles a JSON definition file.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::Io`] if the file cannot be read, or any error of
    /// [`Schema::from_json`].
    pub fn load(path: impl AsRef<Path>, registry: &TypeRegistry) -> Result<Self, SchemaError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| SchemaError::Io {
            path: path.display().to_string(),
            source,
        })?;
        log::info!("Loading schema definition from {}", path.display());
        Self::from_json(&json, registry)
    }

    /// Looks a table up by declared name, falling back to its underscore name.
    pub fn find(&self, name: &str) -> Option<&TableDefinition> {
        self.by_name
            .get(name)
            .or_else(|| self.by_underscore.get(name))
            .map(|id| self.table(*id))
    }

    pub fn find_by_underscore_name(&self, name: &str) -> Option<&TableDefinition> {
        self.by_underscore.get(name).map(|id| self.table(*id))
    }

    /// The table owning a physical table; for STI families this is the family root.
    pub fn find_by_table_name(&self, collection_name: &str) -> Option<&TableDefinition> {
        self.tables.iter().find(|t| {
            t.collection_name == collection_name
                && t.super_table
                    .map_or(true, |p| self.table(p).collection_name != collection_name)
        })
    }

    /// Like [`Schema::find`], but unknown names are an error.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::UnknownTable`].
    pub fn resolve(&self, name: &str) -> Result<&TableDefinition, SchemaError> {
        self.find(name)
            .ok_or_else(|| SchemaError::UnknownTable(name.to_string()))
    }

    /// All tables in declaration order.
    pub fn all(&self) -> &[TableDefinition] {
        &self.tables
    }

    /// The table with the given id. Ids are only handed out by this schema.
    pub fn table(&self, id: TableId) -> &TableDefinition {
        &self.tables[id.0]
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Ancestors of `id`, nearest first.
    pub fn ancestors(&self, id: TableId) -> impl Iterator<Item = &TableDefinition> + '_ {
        std::iter::successors(self.table(id).super_table, move |p| self.table(*p).super_table)
            .map(move |p| self.table(p))
    }

    /// Whether `candidate` is a strict descendant of `ancestor`.
    pub fn is_descendant(&self, ancestor: TableId, candidate: TableId) -> bool {
        self.table(ancestor).children.contains(&candidate)
    }

    /// The node itself or one of its descendants, by underscore name.
    pub fn subtype(&self, id: TableId, underscore_name: &str) -> Option<&TableDefinition> {
        let table = self.table(id);
        std::iter::once(id)
            .chain(table.children.iter().copied())
            .map(|t| self.table(t))
            .find(|t| t.underscore_name == underscore_name)
    }

    /// Discriminator values matched by `id`: its own underscore name followed by
    /// those of its descendants.
    pub fn discriminator_values(&self, id: TableId) -> Vec<&str> {
        let table = self.table(id);
        std::iter::once(table.underscore_name.as_str())
            .chain(table.children.iter().map(|c| self.table(*c).underscore_name.as_str()))
            .collect()
    }
}
