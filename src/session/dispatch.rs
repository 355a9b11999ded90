//! Per-strategy execution of session verbs.
//!
//! Single-table and leaf nodes run one statement against their physical
//! table. Class-table nodes run the same verb on their own table and then on
//! each direct child, reducing the results: counts and affected rows add up,
//! found rows concatenate (own rows first, children in declaration order).

use super::cascade;
use super::rows::Projection;
use crate::executor::{LifeError, LifeExecutor};
use crate::query::{ListRendering, Selector, StatementBuilder};
use crate::schema::{Schema, Strategy, TableDefinition, TableId, ID, TYPE};
use crate::value::{Record, Value};

pub(crate) struct Dispatcher<'a> {
    pub(crate) schema: &'a Schema,
    pub(crate) executor: &'a dyn LifeExecutor,
    pub(crate) rendering: ListRendering,
}

impl<'a> Dispatcher<'a> {
    pub(crate) fn builder(&self) -> StatementBuilder {
        StatementBuilder::new(self.executor.dialect(), self.rendering)
    }

    fn children<'t>(&self, table: &'t TableDefinition) -> impl Iterator<Item = &'a TableDefinition> + 't
    where
        'a: 't,
    {
        let schema = self.schema;
        table.own_children().iter().map(move |c| schema.table(*c))
    }

    pub(crate) fn count(&self, table: &TableDefinition, selector: &Selector) -> Result<u64, LifeError> {
        let mut total = self.count_one(table, selector)?;
        if table.strategy() == Strategy::ClassTable {
            for child in self.children(table) {
                total += self.count(child, selector)?;
            }
        }
        Ok(total)
    }

    /// `COUNT(*)` over the table's own physical table.
    fn count_one(&self, table: &TableDefinition, selector: &Selector) -> Result<u64, LifeError> {
        let stmt = self.builder().count(self.schema, table, selector)?;
        log::debug!("count {}: {}", table.name(), stmt.sql);
        let rows = self.executor.query_all(&stmt.sql, &stmt.args)?;
        let count = rows
            .first()
            .and_then(|r| r.first())
            .and_then(Value::as_i64)
            .ok_or_else(|| LifeError::ParseError(format!("no count returned by '{}'", stmt.sql)))?;
        u64::try_from(count).map_err(|_| LifeError::ParseError(format!("negative count {count}")))
    }

    pub(crate) fn find(&self, table: &TableDefinition, selector: &Selector) -> Result<Vec<Record>, LifeError> {
        let mut records = self.find_one(table, selector)?;
        if table.strategy() == Strategy::ClassTable {
            for child in self.children(table) {
                records.extend(self.find(child, selector)?);
            }
        }
        Ok(records)
    }

    /// Rows of the table's own physical table.
    pub(crate) fn find_one(&self, table: &TableDefinition, selector: &Selector) -> Result<Vec<Record>, LifeError> {
        let projection = Projection::new(self.schema, table);
        let stmt = self
            .builder()
            .select(self.schema, table, selector, projection.columns())?;
        log::debug!("find {}: {}", table.name(), stmt.sql);
        self.executor
            .query_all(&stmt.sql, &stmt.args)?
            .into_iter()
            .map(|row| projection.record(row))
            .collect()
    }

    /// The node whose own rows hold `id`: the subtype a single-table row
    /// names, or the first class-table node (self, then children depth-first)
    /// that has it.
    pub(crate) fn locate(&self, table: &'a TableDefinition, id: i64) -> Result<Option<&'a TableDefinition>, LifeError> {
        match table.strategy() {
            Strategy::SingleTable => {
                let projection = Projection::new(self.schema, table);
                let stmt = self
                    .builder()
                    .select(self.schema, table, &Selector::Id(id), &[TYPE])?;
                let rows = self.executor.query_all(&stmt.sql, &stmt.args)?;
                rows.first().map(|row| projection.concrete(row)).transpose()
            }
            Strategy::Leaf => Ok((self.count_one(table, &Selector::Id(id))? > 0).then_some(table)),
            Strategy::ClassTable => {
                if self.count_one(table, &Selector::Id(id))? > 0 {
                    return Ok(Some(table));
                }
                for child in self.children(table) {
                    if let Some(found) = self.locate(child, id)? {
                        return Ok(Some(found));
                    }
                }
                Ok(None)
            }
        }
    }

    pub(crate) fn update(
        &self,
        table: &TableDefinition,
        assignments: &[(String, Value)],
        selector: &Selector,
    ) -> Result<u64, LifeError> {
        let mut total = self.update_one(table, assignments, selector)?;
        if table.strategy() == Strategy::ClassTable {
            for child in self.children(table) {
                total += self.update(child, assignments, selector)?;
            }
        }
        Ok(total)
    }

    pub(crate) fn update_one(
        &self,
        table: &TableDefinition,
        assignments: &[(String, Value)],
        selector: &Selector,
    ) -> Result<u64, LifeError> {
        let stmt = self.builder().update(self.schema, table, assignments, selector)?;
        log::debug!("update {}: {}", table.name(), stmt.sql);
        self.executor.execute(&stmt.sql, &stmt.args)
    }

    /// Deletes matching rows and, first, their dependents.
    ///
    /// `path` holds the nodes whose deletes are in progress further up the
    /// cascade.
    pub(crate) fn delete(&self, table: &TableDefinition, selector: &Selector, path: &mut Vec<TableId>) -> Result<u64, LifeError> {
        let mut total = self.delete_one(table, selector, path)?;
        if table.strategy() == Strategy::ClassTable {
            for child in self.children(table) {
                total += self.delete(child, selector, path)?;
            }
        }
        Ok(total)
    }

    pub(crate) fn delete_one(&self, table: &TableDefinition, selector: &Selector, path: &mut Vec<TableId>) -> Result<u64, LifeError> {
        let dependents = cascade::delete_dependents(self, table, selector, path)?;
        if dependents > 0 {
            log::debug!("Cascade removed {dependents} dependent rows of {}", table.name());
        }
        let stmt = self.builder().delete(self.schema, table, selector)?;
        log::debug!("delete {}: {}", table.name(), stmt.sql);
        self.executor.execute(&stmt.sql, &stmt.args)
    }

    /// Calls `visit` with the concrete node and id of every matching row.
    pub(crate) fn for_each(
        &self,
        table: &'a TableDefinition,
        selector: &Selector,
        visit: &mut dyn FnMut(&TableDefinition, i64) -> Result<(), LifeError>,
    ) -> Result<(), LifeError> {
        let sti = table.strategy() == Strategy::SingleTable;
        let columns: &[&str] = if sti { &[TYPE, ID] } else { &[ID] };
        let stmt = self.builder().select(self.schema, table, selector, columns)?;
        log::debug!("for_each {}: {}", table.name(), stmt.sql);
        let projection = Projection::new(self.schema, table);
        for row in self.executor.query_all(&stmt.sql, &stmt.args)? {
            let concrete = projection.concrete(&row)?;
            let id = row
                .get(usize::from(sti))
                .and_then(Value::as_i64)
                .ok_or_else(|| LifeError::ParseError(format!("row of {} has no integer id", table.name())))?;
            visit(concrete, id)?;
        }
        if table.strategy() == Strategy::ClassTable {
            for child in self.children(table) {
                self.for_each(child, selector, visit)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::MockExecutor;
    use crate::types::TypeRegistry;

    fn schema() -> Schema {
        Schema::from_json(
            r#"{"tables": [
                {"name": "host", "attributes": [{"name": "name", "type": "string"}]},
                {"name": "router", "super": "host"},
                {"name": "switch", "super": "host"},
                {"name": "core_router", "super": "router"}
            ]}"#,
            &TypeRegistry::standard(),
        )
        .unwrap()
    }

    fn dispatcher<'a>(schema: &'a Schema, mock: &'a MockExecutor) -> Dispatcher<'a> {
        Dispatcher {
            schema,
            executor: mock,
            rendering: ListRendering::Bound,
        }
    }

    #[test]
    fn test_class_table_count_fans_out() {
        let schema = schema();
        let mock = MockExecutor::new();
        mock.respond_rows("FROM hosts", vec![vec![Value::Int(1)]]);
        mock.respond_rows("FROM routers", vec![vec![Value::Int(2)]]);
        mock.respond_rows("FROM switches", vec![vec![Value::Int(3)]]);
        mock.respond_rows("FROM core_routers", vec![vec![Value::Int(4)]]);
        let d = dispatcher(&schema, &mock);
        assert_eq!(d.count(schema.find("host").unwrap(), &Selector::All).unwrap(), 10);
        assert_eq!(d.count(schema.find("router").unwrap(), &Selector::All).unwrap(), 6);
        assert_eq!(
            mock.statements()[..4],
            [
                "SELECT COUNT(*) FROM hosts",
                "SELECT COUNT(*) FROM routers",
                "SELECT COUNT(*) FROM core_routers",
                "SELECT COUNT(*) FROM switches"
            ]
        );
    }

    #[test]
    fn test_class_table_update_fans_out() {
        let schema = schema();
        let mock = MockExecutor::new();
        mock.respond_affected("UPDATE hosts", 1);
        mock.respond_affected("UPDATE routers", 2);
        mock.respond_affected("UPDATE switches", 3);
        mock.respond_affected("UPDATE core_routers", 4);
        let d = dispatcher(&schema, &mock);
        let assignments = [("name".to_string(), Value::from("x"))];
        assert_eq!(d.update(schema.find("host").unwrap(), &assignments, &Selector::All).unwrap(), 10);
        assert_eq!(
            mock.statements(),
            [
                "UPDATE hosts SET name = $1",
                "UPDATE routers SET name = $1",
                "UPDATE core_routers SET name = $1",
                "UPDATE switches SET name = $1"
            ]
        );
        assert!(mock.calls().iter().all(|call| call.args == [Value::from("x")]));

        mock.clear();
        assert_eq!(d.update(schema.find("router").unwrap(), &assignments, &Selector::All).unwrap(), 6);
        assert_eq!(mock.statements().len(), 2);
    }

    #[test]
    fn test_find_concatenates_own_rows_first() {
        let schema = schema();
        let mock = MockExecutor::new();
        mock.respond_rows("FROM hosts", vec![vec![Value::Int(1), Value::from("h")]]);
        mock.respond_rows("FROM switches", vec![vec![Value::Int(9), Value::from("s")]]);
        let d = dispatcher(&schema, &mock);
        let found = d.find(schema.find("host").unwrap(), &Selector::All).unwrap();
        let names: Vec<_> = found.iter().map(|r| r["name"].to_string()).collect();
        assert_eq!(names, ["h", "s"]);
    }

    #[test]
    fn test_locate_searches_children_depth_first() {
        let schema = schema();
        let mock = MockExecutor::new();
        mock.respond_rows("FROM core_routers", vec![vec![Value::Int(1)]]);
        let d = dispatcher(&schema, &mock);
        let found = d.locate(schema.find("host").unwrap(), 5).unwrap().unwrap();
        assert_eq!(found.name(), "core_router");
        assert!(!mock.statements().iter().any(|s| s.contains("switches")));
    }

    #[test]
    fn test_for_each_visits_every_table() {
        let schema = schema();
        let mock = MockExecutor::new();
        mock.respond_rows("FROM hosts", vec![vec![Value::Int(1)]]);
        mock.respond_rows("FROM core_routers", vec![vec![Value::Int(2)], vec![Value::Int(3)]]);
        let d = dispatcher(&schema, &mock);
        let mut seen = Vec::new();
        d.for_each(schema.find("host").unwrap(), &Selector::All, &mut |t, id| {
            seen.push((t.name().to_string(), id));
            Ok(())
        })
        .unwrap();
        assert_eq!(
            seen,
            [
                ("host".to_string(), 1),
                ("core_router".to_string(), 2),
                ("core_router".to_string(), 3)
            ]
        );
    }

    #[test]
    fn test_visitor_can_abort() {
        let schema = schema();
        let mock = MockExecutor::new();
        mock.respond_rows("FROM hosts", vec![vec![Value::Int(1)], vec![Value::Int(2)]]);
        let d = dispatcher(&schema, &mock);
        let mut visits = 0;
        let err = d
            .for_each(schema.find("host").unwrap(), &Selector::All, &mut |_, _| {
                visits += 1;
                Err(LifeError::Other("stop".to_string()))
            })
            .unwrap_err();
        assert_eq!(visits, 1);
        assert!(err.to_string().contains("stop"));
        assert_eq!(mock.statements().len(), 1);
    }
}
