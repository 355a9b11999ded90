//! Compiled table nodes.

use super::association::Association;
use super::attribute::{AttributeDefinition, TYPE};
use std::fmt;

/// Index of a table inside its [`super::Schema`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableId(pub(crate) usize);

impl TableId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// How a table's rows map onto physical tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Shares its family's table; rows are told apart by the `type` column.
    SingleTable,
    /// Has children, each with its own table; queries fan out.
    ClassTable,
    /// No children, own table.
    Leaf,
}

/// A node of the inheritance graph.
#[derive(Debug, Clone)]
pub struct TableDefinition {
    pub(crate) id: TableId,
    pub(crate) name: String,
    pub(crate) underscore_name: String,
    pub(crate) collection_name: String,
    pub(crate) own_attributes: Vec<String>,
    pub(crate) attributes: Vec<AttributeDefinition>,
    pub(crate) super_table: Option<TableId>,
    pub(crate) own_children: Vec<TableId>,
    pub(crate) children: Vec<TableId>,
    pub(crate) associations: Vec<Association>,
    pub(crate) strategy: Strategy,
}

impl TableDefinition {
    pub fn table_id(&self) -> TableId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn underscore_name(&self) -> &str {
        &self.underscore_name
    }

    /// Physical table name.
    pub fn collection_name(&self) -> &str {
        &self.collection_name
    }

    /// The primary key column.
    pub fn id(&self) -> &AttributeDefinition {
        // Compiled tables always start with `id`.
        &self.attributes[0]
    }

    /// Names of the attributes declared on this node itself.
    pub fn own_attributes(&self) -> &[String] {
        &self.own_attributes
    }

    /// Merged attributes, `id` first, then ancestors' before this node's own.
    pub fn attributes(&self) -> &[AttributeDefinition] {
        &self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeDefinition> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attribute(name).is_some()
    }

    pub fn super_table(&self) -> Option<TableId> {
        self.super_table
    }

    pub fn own_children(&self) -> &[TableId] {
        &self.own_children
    }

    /// Transitive descendants in pre-order.
    pub fn children(&self) -> &[TableId] {
        &self.children
    }

    pub fn has_children(&self) -> bool {
        !self.own_children.is_empty()
    }

    pub fn associations(&self) -> &[Association] {
        &self.associations
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub fn is_single_table_inheritance(&self) -> bool {
        self.has_attribute(TYPE)
    }

    pub fn is_class_table_inheritance(&self) -> bool {
        self.strategy == Strategy::ClassTable
    }
}
