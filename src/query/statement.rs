//! Finished statements and row selectors.

use super::Params;
use crate::schema::TableId;
use crate::value::Value;

/// SQL text with its positional arguments.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Statement {
    pub sql: String,
    pub args: Vec<Value>,
}

/// Which rows of a table a verb applies to.
#[derive(Debug, Clone, PartialEq)]
pub enum Selector {
    All,
    Id(i64),
    /// Caller filter parameters.
    Filter(Params),
    /// Rows whose `column` references rows of another table, as used by cascades.
    Related(Box<Relation>),
}

/// Rows referencing the rows `selector` picks from `parent`.
#[derive(Debug, Clone, PartialEq)]
pub struct Relation {
    /// Referencing column on the dependent table.
    pub column: String,
    pub parent: TableId,
    pub selector: Selector,
    /// Polymorphic associations also match `parent_type` against these names.
    pub parent_types: Option<Vec<String>>,
}

impl Selector {
    pub fn filter(params: Params) -> Self {
        if params.is_empty() {
            Selector::All
        } else {
            Selector::Filter(params)
        }
    }

    pub fn related(relation: Relation) -> Self {
        Selector::Related(Box::new(relation))
    }

    /// Caller parameters, if this selector carries any.
    pub fn params(&self) -> Option<&Params> {
        match self {
            Selector::Filter(params) => Some(params),
            _ => None,
        }
    }
}
