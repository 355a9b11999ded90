//! SELECT lists and row conversion.

use crate::executor::LifeError;
use crate::schema::{Schema, SchemaError, Strategy, TableDefinition, TYPE};
use crate::value::{Record, Value};

/// Columns selected for one physical table and how to read them back.
///
/// Single-table nodes select the discriminator first, then their own merged
/// columns, then columns only their descendants declare, so every row can be
/// read as its concrete subtype.
#[derive(Debug)]
pub(crate) struct Projection<'s> {
    schema: &'s Schema,
    table: &'s TableDefinition,
    columns: Vec<&'s str>,
}

impl<'s> Projection<'s> {
    pub(crate) fn new(schema: &'s Schema, table: &'s TableDefinition) -> Self {
        let mut columns: Vec<&str> = Vec::with_capacity(table.attributes().len() + 1);
        if table.strategy() == Strategy::SingleTable {
            columns.push(TYPE);
            for node in std::iter::once(table).chain(table.children().iter().map(|c| schema.table(*c))) {
                for attr in node.attributes() {
                    if !columns.contains(&attr.name()) {
                        columns.push(attr.name());
                    }
                }
            }
        } else {
            columns.extend(table.attributes().iter().map(|a| a.name()));
        }
        Self { schema, table, columns }
    }

    pub(crate) fn columns(&self) -> &[&'s str] {
        &self.columns
    }

    /// The concrete node of a row: the subtype its discriminator names, or the
    /// projected table itself.
    pub(crate) fn concrete(&self, row: &[Value]) -> Result<&'s TableDefinition, LifeError> {
        if self.table.strategy() != Strategy::SingleTable {
            return Ok(self.table);
        }
        let value = row.first().and_then(Value::as_str).unwrap_or_default();
        self.schema
            .subtype(self.table.table_id(), value)
            .ok_or_else(|| {
                SchemaError::UnknownDiscriminator {
                    table: self.table.name().to_string(),
                    value: value.to_string(),
                }
                .into()
            })
    }

    /// Converts a row into a record of its concrete node's attributes.
    pub(crate) fn record(&self, row: Vec<Value>) -> Result<Record, LifeError> {
        if row.len() != self.columns.len() {
            return Err(LifeError::ParseError(format!(
                "expected {} columns from {}, got {}",
                self.columns.len(),
                self.table.collection_name(),
                row.len()
            )));
        }
        let concrete = self.concrete(&row)?;
        let mut record = Record::new();
        for (column, cell) in self.columns.iter().zip(row) {
            let Some(attr) = concrete.attribute(column) else {
                continue;
            };
            record.insert(attr.name().to_string(), attr.scan(cell)?);
        }
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeRegistry;

    fn schema() -> Schema {
        Schema::from_json(
            r#"{"tables": [
                {"name": "document", "attributes": [
                    {"name": "type", "type": "string"},
                    {"name": "name", "type": "string"}]},
                {"name": "book", "super": "document",
                 "attributes": [{"name": "pages", "type": "integer"}]},
                {"name": "magazine", "super": "document",
                 "attributes": [{"name": "issue", "type": "integer"}]},
                {"name": "host", "attributes": [{"name": "ip", "type": "ipAddress"}]}
            ]}"#,
            &TypeRegistry::standard(),
        )
        .unwrap()
    }

    #[test]
    fn test_sti_projection_covers_family() {
        let schema = schema();
        let projection = Projection::new(&schema, schema.find("document").unwrap());
        assert_eq!(projection.columns(), &["type", "id", "name", "pages", "issue"]);
        let leaf = Projection::new(&schema, schema.find("host").unwrap());
        assert_eq!(leaf.columns(), &["id", "ip"]);
    }

    #[test]
    fn test_rows_read_as_concrete_subtype() {
        let schema = schema();
        let projection = Projection::new(&schema, schema.find("document").unwrap());
        let record = projection
            .record(vec![
                Value::from("book"),
                Value::Int(3),
                Value::from("Dune"),
                Value::Int(412),
                Value::Null,
            ])
            .unwrap();
        assert_eq!(record.get("type"), Some(&Value::from("book")));
        assert_eq!(record.get("pages"), Some(&Value::Int(412)));
        assert!(!record.contains_key("issue"));
    }

    #[test]
    fn test_unknown_discriminator() {
        let schema = schema();
        let projection = Projection::new(&schema, schema.find("book").unwrap());
        let err = projection
            .record(vec![Value::from("magazine"), Value::Int(1), Value::Null, Value::Null])
            .unwrap_err();
        assert!(matches!(
            err,
            LifeError::Schema(SchemaError::UnknownDiscriminator { .. })
        ));
    }

    #[test]
    fn test_cells_are_canonicalized() {
        let schema = schema();
        let projection = Projection::new(&schema, schema.find("host").unwrap());
        let record = projection.record(vec![Value::Int(1), Value::from("10.0.0.1")]).unwrap();
        assert_eq!(record.get("ip"), Some(&Value::IpAddr("10.0.0.1".parse().unwrap())));
    }
}
