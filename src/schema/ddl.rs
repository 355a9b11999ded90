//! `CREATE TABLE` generation for a compiled schema.

use super::association::Association;
use super::attribute::AttributeDefinition;
use super::table::TableDefinition;
use super::Schema;
use crate::query::Dialect;
use crate::types::SqlType;
use sea_query::{
    Alias, ColumnDef, Index, MysqlQueryBuilder, PostgresQueryBuilder, SqliteQueryBuilder, Table, TableCreateStatement,
    TableDropStatement,
};
use std::collections::BTreeSet;

impl Schema {
    /// One `CREATE TABLE IF NOT EXISTS` per physical table, followed by the
    /// join tables of has-and-belongs-to-many associations.
    ///
    /// Single-table families get the union of every member's columns; columns
    /// that only exist on descendants are nullable.
    pub fn create_table_statements(&self, dialect: Dialect) -> Vec<String> {
        let mut statements: Vec<String> = self
            .physical_owners()
            .map(|table| render_create(&self.create_table(table, dialect), dialect))
            .collect();
        for (through, foreign_key, association_key) in self.join_tables() {
            let create = Table::create()
                .table(Alias::new(through.to_string()))
                .if_not_exists()
                .col(ColumnDef::new(Alias::new(foreign_key.to_string())).big_integer().not_null())
                .col(ColumnDef::new(Alias::new(association_key.to_string())).big_integer().not_null())
                .primary_key(
                    Index::create()
                        .col(Alias::new(foreign_key.to_string()))
                        .col(Alias::new(association_key.to_string())),
                )
                .to_owned();
            statements.push(render_create(&create, dialect));
        }
        statements
    }

    /// `DROP TABLE IF EXISTS` for every table [`Schema::create_table_statements`] creates.
    pub fn drop_table_statements(&self, dialect: Dialect) -> Vec<String> {
        let names = self
            .physical_owners()
            .map(|t| t.collection_name().to_string())
            .chain(self.join_tables().into_iter().map(|(through, _, _)| through.to_string()));
        names
            .map(|name| {
                let mut drop = Table::drop();
                drop.table(Alias::new(name)).if_exists();
                if dialect == Dialect::Postgres {
                    drop.cascade();
                }
                render_drop(&drop, dialect)
            })
            .collect()
    }

    /// Tables that own their physical table (everything but STI descendants).
    fn physical_owners(&self) -> impl Iterator<Item = &TableDefinition> + '_ {
        self.all().iter().filter(|t| {
            t.super_table()
                .map_or(true, |p| self.table(p).collection_name() != t.collection_name())
        })
    }

    fn join_tables(&self) -> Vec<(&str, &str, &str)> {
        let mut seen = BTreeSet::new();
        let mut joins = Vec::new();
        for table in self.all() {
            for assoc in table.associations() {
                if let Association::HasAndBelongsToMany {
                    through,
                    foreign_key,
                    association_key,
                    ..
                } = assoc
                {
                    if seen.insert(through.as_str()) {
                        joins.push((through.as_str(), foreign_key.as_str(), association_key.as_str()));
                    }
                }
            }
        }
        joins
    }

    fn create_table(&self, owner: &TableDefinition, dialect: Dialect) -> TableCreateStatement {
        let mut create = Table::create();
        create.table(Alias::new(owner.collection_name().to_string())).if_not_exists();
        for attr in owner.attributes() {
            create.col(column_def(attr, false, dialect));
        }
        let mut extra: Vec<&str> = Vec::new();
        if owner.strategy() == super::Strategy::SingleTable {
            for child in owner.children() {
                for attr in self.table(*child).attributes() {
                    if owner.has_attribute(attr.name()) || extra.contains(&attr.name()) {
                        continue;
                    }
                    extra.push(attr.name());
                    create.col(column_def(attr, true, dialect));
                }
            }
        }
        create
    }
}

fn column_def(attr: &AttributeDefinition, nullable: bool, dialect: Dialect) -> ColumnDef {
    let mut def = ColumnDef::new(Alias::new(attr.name().to_string()));
    if attr.is_primary_key() {
        if dialect == Dialect::Sqlite {
            def.integer();
        } else {
            def.big_integer();
        }
        def.not_null().auto_increment().primary_key();
        return def;
    }
    if attr.is_collection() {
        def.text();
    } else {
        match (attr.type_def().sql_type(), dialect) {
            (SqlType::BigInt, _) => def.big_integer(),
            (SqlType::Decimal, _) => def.decimal(),
            (SqlType::Text, _) => def.text(),
            (SqlType::TimestampTz, _) => def.timestamp_with_time_zone(),
            (SqlType::Boolean, _) => def.boolean(),
            (SqlType::Inet, Dialect::Postgres) => def.inet(),
            (SqlType::MacAddr, Dialect::Postgres) => def.mac_address(),
            (SqlType::Inet | SqlType::MacAddr, _) => def.text(),
        };
    }
    if attr.is_required() && !nullable {
        def.not_null();
    } else {
        def.null();
    }
    if attr.is_unique() {
        def.unique_key();
    }
    def
}

fn render_create(statement: &TableCreateStatement, dialect: Dialect) -> String {
    match dialect {
        Dialect::Postgres => statement.to_string(PostgresQueryBuilder),
        Dialect::MySql => statement.to_string(MysqlQueryBuilder),
        Dialect::Sqlite | Dialect::Other => statement.to_string(SqliteQueryBuilder),
    }
}

fn render_drop(statement: &TableDropStatement, dialect: Dialect) -> String {
    match dialect {
        Dialect::Postgres => statement.to_string(PostgresQueryBuilder),
        Dialect::MySql => statement.to_string(MysqlQueryBuilder),
        Dialect::Sqlite | Dialect::Other => statement.to_string(SqliteQueryBuilder),
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
                    {"name": "name", "type": "string", "required": true}],
                 "hasAndBelongsToMany": [{"target": "tag"}]},
                {"name": "book", "super": "document",
                 "attributes": [{"name": "pages", "type": "integer", "required": true}]},
                {"name": "tag", "attributes": [{"name": "label", "type": "string", "unique": true}],
                 "hasAndBelongsToMany": [{"target": "document"}]},
                {"name": "host", "attributes": [{"name": "ip", "type": "ipAddress"}]},
                {"name": "router", "super": "host"}
            ]}"#,
            &TypeRegistry::standard(),
        )
        .unwrap()
    }

    #[test]
    fn test_one_statement_per_physical_table() {
        let statements = schema().create_table_statements(Dialect::Postgres);
        // documents, tags, hosts, routers, documents_tags
        assert_eq!(statements.len(), 5, "{statements:#?}");
        assert!(statements.iter().all(|s| s.starts_with("CREATE TABLE IF NOT EXISTS")));
        assert!(!statements.iter().any(|s| s.contains("\"books\"")));
        assert!(statements[4].contains("\"documents_tags\""));
    }

    #[test]
    fn test_sti_descendant_columns_are_nullable() {
        let statements = schema().create_table_statements(Dialect::Postgres);
        let documents = &statements[0];
        assert!(documents.contains("\"pages\" bigint"), "{documents}");
        assert!(!documents.contains("\"pages\" bigint NOT NULL"), "{documents}");
        assert!(documents.contains("\"name\" text NOT NULL"), "{documents}");
        assert!(documents.contains("\"id\" bigserial"), "{documents}");
    }

    #[test]
    fn test_cti_child_holds_merged_columns() {
        let statements = schema().create_table_statements(Dialect::Postgres);
        let routers = statements.iter().find(|s| s.contains("\"routers\"")).unwrap();
        assert!(routers.contains("\"ip\" inet"), "{routers}");
        let sqlite = schema().create_table_statements(Dialect::Sqlite);
        let routers = sqlite.iter().find(|s| s.contains("\"routers\"")).unwrap();
        assert!(routers.contains("\"ip\" text"), "{routers}");
    }

    #[test]
    fn test_drop_statements() {
        let drops = schema().drop_table_statements(Dialect::Postgres);
        assert_eq!(drops.len(), 5);
        assert!(drops.iter().all(|d| d.starts_with("DROP TABLE IF EXISTS") && d.ends_with("CASCADE")));
    }
}
