//! Statement building.
//!
//! Translates caller filter parameters into SQL text and positional
//! arguments for one table node. Filter keys are attribute names; values are
//! either a bare literal (equality) or `[op]operand`:
//!
//! | filter               | SQL                        |
//! |----------------------|----------------------------|
//! | `port=[gt]10`        | `port > $1`                |
//! | `port=[in]1,2,3`     | `port IN ($1,$2,$3)`       |
//! | `name=[is]null`      | `name IS NULL`             |
//! | `port=[between]1,5`  | `port BETWEEN $1 AND $2`   |
//!
//! The keys `groupBy`, `having`, `order`, `limit` and `offset` are reserved
//! and become the statement tail. Single-table inheritance nodes always get a
//! `type` predicate matching the node and its descendants.
//!
//! # Examples
//!
//! ```
//! use tablewright::query::{build, Dialect, ListRendering, Params};
//! use tablewright::schema::Schema;
//! use tablewright::types::TypeRegistry;
//!
//! let schema = Schema::from_json(
//!     r#"{"tables": [{"name": "host", "attributes": [{"name": "port", "type": "integer"}]}]}"#,
//!     &TypeRegistry::standard(),
//! )?;
//! let host = schema.resolve("host")?;
//! let params: Params = [("port".to_string(), "[gt]10".to_string())].into();
//! let (sql, args) = build(&schema, host, &params, Dialect::MySql, ListRendering::Bound)?;
//! assert_eq!(sql, "port > ?");
//! assert_eq!(args.len(), 1);
//! # Ok::<(), tablewright::schema::SchemaError>(())
//! ```

use std::collections::BTreeMap;

mod builder;
mod dialect;
mod operator;
mod statement;

pub use builder::{build, ListRendering, StatementBuilder};
pub use dialect::Dialect;
pub use operator::{split, Operator};
pub use statement::{Relation, Selector, Statement};

/// Filter parameters as received on the wire: attribute name to raw filter value.
pub type Params = BTreeMap<String, String>;

pub const GROUP_BY: &str = "groupBy";
pub const HAVING: &str = "having";
pub const ORDER: &str = "order";
pub const LIMIT: &str = "limit";
pub const OFFSET: &str = "offset";

/// Reserved keys in the order their clauses appear in a statement.
pub const RESERVED: [&str; 5] = [GROUP_BY, HAVING, ORDER, LIMIT, OFFSET];

pub fn is_reserved(key: &str) -> bool {
    RESERVED.contains(&key)
}

/// The static name of a reserved key, for error reporting.
pub(crate) fn reserved_name(key: &str) -> &'static str {
    RESERVED.iter().copied().find(|r| *r == key).unwrap_or(GROUP_BY)
}
