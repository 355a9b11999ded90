//! Dependent removal ahead of physical deletes.
//!
//! The associations of the deleted node, its ancestors and (for single-table
//! nodes, whose deletes also remove descendant rows) its descendants are
//! walked in that order:
//!
//! - has-one / has-many targets are deleted through the dispatcher, so their
//!   own dependents, discriminators and class-table children are handled too;
//! - polymorphic targets are additionally matched on `parent_type`;
//! - has-and-belongs-to-many join rows are deleted;
//! - belongs-to targets are left alone.

use super::dispatch::Dispatcher;
use crate::executor::LifeError;
use crate::query::{Relation, Selector};
use crate::schema::{Association, Strategy, TableDefinition, TableId};

/// Deletes every dependent of the rows `selector` picks from `table`.
///
/// Returns the number of dependent rows removed, join rows included.
pub(crate) fn delete_dependents(
    d: &Dispatcher<'_>,
    table: &TableDefinition,
    selector: &Selector,
    path: &mut Vec<TableId>,
) -> Result<u64, LifeError> {
    let schema = d.schema;
    let mut removed = 0;

    // (association owner, node whose rows are the parents)
    let mut owners: Vec<(&TableDefinition, &TableDefinition)> = std::iter::once(table)
        .chain(schema.ancestors(table.table_id()))
        .map(|owner| (owner, table))
        .collect();
    if table.strategy() == Strategy::SingleTable {
        owners.extend(table.children().iter().map(|c| {
            let child = schema.table(*c);
            (child, child)
        }));
    }

    for (owner, parent) in owners {
        for association in owner.associations() {
            removed += match association {
                Association::BelongsTo { .. } => 0,
                Association::HasOne(dep) | Association::HasMany(dep) => {
                    let target = schema.table(dep.target);
                    if path.contains(&dep.target) {
                        log::warn!(
                            "Not cascading from {} into {}: already being deleted",
                            parent.name(),
                            target.name()
                        );
                        continue;
                    }
                    let parent_types = dep.polymorphic.then(|| parent_type_values(d, parent));
                    let related = Selector::related(Relation {
                        column: dep.foreign_key.clone(),
                        parent: parent.table_id(),
                        selector: selector.clone(),
                        parent_types,
                    });
                    log::debug!("Cascading delete from {} into {}", parent.name(), target.name());
                    path.push(dep.target);
                    let deleted = d.delete(target, &related, path);
                    path.pop();
                    deleted?
                }
                Association::HasAndBelongsToMany { through, foreign_key, .. } => {
                    let relation = Relation {
                        column: foreign_key.clone(),
                        parent: parent.table_id(),
                        selector: selector.clone(),
                        parent_types: None,
                    };
                    let stmt = d.builder().delete_related(schema, through, &relation)?;
                    log::debug!("Removing {} join rows: {}", through, stmt.sql);
                    d.executor.execute(&stmt.sql, &stmt.args)?
                }
            };
        }
    }
    Ok(removed)
}

/// `parent_type` values of `parent`'s rows: the node and, for single-table
/// nodes, its descendants.
fn parent_type_values(d: &Dispatcher<'_>, parent: &TableDefinition) -> Vec<String> {
    if parent.strategy() == Strategy::SingleTable {
        d.schema
            .discriminator_values(parent.table_id())
            .into_iter()
            .map(str::to_string)
            .collect()
    } else {
        vec![parent.underscore_name().to_string()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::ListRendering;
    use crate::schema::Schema;
    use crate::test_helpers::MockExecutor;
    use crate::types::TypeRegistry;

    fn schema() -> Schema {
        Schema::from_json(
            r#"{"tables": [
                {"name": "device", "attributes": [{"name": "name", "type": "string"}],
                 "hasMany": [{"target": "port"}, {"target": "note", "polymorphic": true}],
                 "hasAndBelongsToMany": [{"target": "group"}]},
                {"name": "port", "attributes": [{"name": "device_id", "type": "objectId"}],
                 "belongsTo": [{"target": "device"}],
                 "hasOne": [{"target": "note", "polymorphic": true}]},
                {"name": "note", "attributes": [
                    {"name": "parent_type", "type": "string"},
                    {"name": "parent_id", "type": "objectId"}]},
                {"name": "group", "attributes": [{"name": "label", "type": "string"}],
                 "hasAndBelongsToMany": [{"target": "device"}]},
                {"name": "folder", "attributes": [{"name": "folder_id", "type": "objectId"}],
                 "hasMany": [{"target": "folder"}]}
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
    fn test_cascade_by_id() {
        let schema = schema();
        let mock = MockExecutor::new();
        let d = dispatcher(&schema, &mock);
        let device = schema.find("device").unwrap();
        let mut path = vec![device.table_id()];
        d.delete(device, &Selector::Id(7), &mut path).unwrap();
        assert_eq!(
            mock.statements(),
            [
                "DELETE FROM notes WHERE parent_id IN (SELECT id FROM ports WHERE device_id = $1) \
                 AND parent_type = $2",
                "DELETE FROM ports WHERE device_id = $1",
                "DELETE FROM notes WHERE parent_id = $1 AND parent_type = $2",
                "DELETE FROM devices_groups WHERE device_id = $1",
                "DELETE FROM devices WHERE id = $1",
            ]
        );
        assert_eq!(path, [device.table_id()]);
    }

    #[test]
    fn test_belongs_to_is_not_cascaded() {
        let schema = schema();
        let mock = MockExecutor::new();
        let d = dispatcher(&schema, &mock);
        let port = schema.find("port").unwrap();
        d.delete(port, &Selector::All, &mut vec![port.table_id()]).unwrap();
        assert_eq!(
            mock.statements(),
            [
                "DELETE FROM notes WHERE parent_id IS NOT NULL AND parent_type = $1",
                "DELETE FROM ports"
            ]
        );
    }

    #[test]
    fn test_self_reference_is_not_reentered() {
        let schema = schema();
        let mock = MockExecutor::new();
        let d = dispatcher(&schema, &mock);
        let folder = schema.find("folder").unwrap();
        d.delete(folder, &Selector::Id(1), &mut vec![folder.table_id()]).unwrap();
        assert_eq!(mock.statements(), ["DELETE FROM folders WHERE id = $1"]);
    }

    #[test]
    fn test_cascade_failure_stops_delete() {
        let schema = schema();
        let mock = MockExecutor::new();
        mock.fail_on("DELETE FROM ports", "constraint");
        let d = dispatcher(&schema, &mock);
        let device = schema.find("device").unwrap();
        assert!(d.delete(device, &Selector::Id(7), &mut vec![device.table_id()]).is_err());
        assert!(!mock.statements().iter().any(|s| s.starts_with("DELETE FROM devices ")));
    }

    #[test]
    fn test_sti_descendant_associations() {
        let schema = Schema::from_json(
            r#"{"tables": [
                {"name": "document", "attributes": [{"name": "type", "type": "string"}],
                 "hasMany": [{"target": "comment", "polymorphic": true}]},
                {"name": "book", "super": "document", "hasMany": [{"target": "chapter"}]},
                {"name": "chapter", "attributes": [{"name": "book_id", "type": "objectId"}]},
                {"name": "comment", "attributes": [
                    {"name": "parent_type", "type": "string"},
                    {"name": "parent_id", "type": "objectId"}]}
            ]}"#,
            &TypeRegistry::standard(),
        )
        .unwrap();
        let mock = MockExecutor::new();
        let d = dispatcher(&schema, &mock);
        let document = schema.find("document").unwrap();
        d.delete(document, &Selector::All, &mut vec![document.table_id()]).unwrap();
        let statements = mock.statements();
        assert_eq!(
            statements[0],
            "DELETE FROM comments WHERE parent_id IN (SELECT id FROM documents WHERE type IN ($1,$2)) \
             AND parent_type IN ($3,$4)"
        );
        assert_eq!(
            statements[1],
            "DELETE FROM chapters WHERE book_id IN (SELECT id FROM documents WHERE type = $1)"
        );
        assert_eq!(statements[2], "DELETE FROM documents WHERE type IN ($1,$2)");
    }
}
