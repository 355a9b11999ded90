//! Declarative schema definition, as read from JSON.
//!
//! ```json
//! {
//!   "tables": [
//!     { "name": "document",
//!       "attributes": [ { "name": "type", "type": "string" },
//!                       { "name": "name", "type": "string", "required": true } ],
//!       "hasMany": [ { "target": "comment", "polymorphic": true } ] },
//!     { "name": "book", "super": "document" }
//!   ]
//! }
//! ```

use serde::Deserialize;
use serde_json::Value as JsonValue;

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SchemaDefinition {
    #[serde(default)]
    pub tables: Vec<TableSpec>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TableSpec {
    pub name: String,
    #[serde(rename = "super")]
    pub super_name: Option<String>,
    /// Physical table name; defaults to the pluralized underscore name.
    pub table: Option<String>,
    #[serde(default)]
    pub attributes: Vec<AttributeSpec>,
    #[serde(default)]
    pub belongs_to: Vec<AssociationSpec>,
    #[serde(default)]
    pub has_one: Vec<AssociationSpec>,
    #[serde(default)]
    pub has_many: Vec<AssociationSpec>,
    #[serde(default)]
    pub has_and_belongs_to_many: Vec<AssociationSpec>,
}

/// How many values an attribute holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    #[default]
    #[serde(rename = "none")]
    Scalar,
    Array,
    /// Like `Array`, but duplicates are dropped keeping first-seen order.
    Set,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AttributeSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub collection: Collection,
    pub required: Option<bool>,
    pub readonly: Option<bool>,
    pub unique: Option<bool>,
    pub default: Option<JsonValue>,
    pub minimum: Option<JsonValue>,
    pub maximum: Option<JsonValue>,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub pattern: Option<String>,
    pub enumeration: Option<Vec<JsonValue>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AssociationSpec {
    pub target: String,
    pub foreign_key: Option<String>,
    #[serde(default)]
    pub polymorphic: bool,
    /// Join table of a has-and-belongs-to-many association.
    pub through: Option<String>,
    /// Join table column referencing the target.
    pub association_key: Option<String>,
}
