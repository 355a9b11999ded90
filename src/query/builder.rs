//! SQL text generation.

use super::operator::{self, IsTest, Operator};
use super::statement::{Relation, Selector, Statement};
use super::{Dialect, Params, GROUP_BY, HAVING, LIMIT, OFFSET, ORDER};
use crate::schema::{AttributeDefinition, Schema, SchemaError, Strategy, TableDefinition, ID, PARENT_TYPE, TYPE};
use crate::types::{SqlType, TypeFamily};
use crate::value::Value;
use serde::Deserialize;

/// How list operands, `LIKE` patterns and discriminators reach the SQL text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListRendering {
    /// Every operand is a bound argument.
    #[default]
    Bound,
    /// Operands are validated, quoted and written into the SQL text.
    Inline,
}

/// Accumulates SQL fragments and their bound arguments for one statement.
///
/// Placeholders are numbered in the order [`StatementBuilder::bind`] is
/// called, so clauses must be built in the order they appear in the text.
#[derive(Debug)]
pub struct StatementBuilder {
    dialect: Dialect,
    rendering: ListRendering,
    args: Vec<Value>,
}

impl StatementBuilder {
    pub fn new(dialect: Dialect, rendering: ListRendering) -> Self {
        Self {
            dialect,
            rendering,
            args: Vec::new(),
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }

    /// Adds an argument and returns its placeholder.
    pub fn bind(&mut self, value: Value) -> String {
        self.args.push(value);
        self.dialect.placeholder(self.args.len())
    }

    pub fn finish(self, sql: String) -> Statement {
        Statement { sql, args: self.args }
    }

    /// Conditions for every non-reserved key of `params`, in key order.
    ///
    /// # Errors
    ///
    /// Returns a [`SchemaError`] for unknown columns or operators, operators
    /// the column's type does not support, and operands that do not parse.
    pub fn filter_conditions(&mut self, table: &TableDefinition, params: &Params) -> Result<Vec<String>, SchemaError> {
        params
            .iter()
            .filter(|(key, _)| !super::is_reserved(key))
            .map(|(key, raw)| self.condition(table, key, raw))
            .collect()
    }

    /// Renders one `column` filter.
    ///
    /// # Errors
    ///
    /// See [`StatementBuilder::filter_conditions`].
    pub fn condition(&mut self, table: &TableDefinition, column: &str, raw: &str) -> Result<String, SchemaError> {
        let attr = table.attribute(column).ok_or_else(|| SchemaError::UnknownColumn {
            table: table.name().to_string(),
            column: column.to_string(),
        })?;
        let (op, operand) = operator::split(column, raw)?;
        let unsupported = || SchemaError::UnsupportedOperator {
            column: column.to_string(),
            operator: op.name(),
            type_name: attr.type_name(),
        };
        if attr.is_collection() && op != Operator::Is {
            return Err(unsupported());
        }

        match op {
            Operator::Eq | Operator::Ne | Operator::Gt | Operator::Gte | Operator::Lt | Operator::Lte => {
                let value = attr.parse(&operand)?;
                let comparison = op.comparison().ok_or_else(unsupported)?;
                Ok(format!("{column} {comparison} {}", self.bind(value)))
            }
            Operator::In | Operator::Nin => {
                let family = attr.type_def().family();
                if !matches!(family, TypeFamily::Textual | TypeFamily::Numeric) {
                    return Err(unsupported());
                }
                let keyword = if op == Operator::In { "IN" } else { "NOT IN" };
                let values = operand
                    .split(',')
                    .map(|item| attr.parse(item.trim()))
                    .collect::<Result<Vec<_>, _>>()?;
                let list = self.value_list(values, family == TypeFamily::Textual);
                Ok(format!("{column} {keyword} {list}"))
            }
            Operator::Between => {
                let bounds: Vec<&str> = operand.split(',').map(str::trim).collect();
                let [low, high] = bounds.as_slice() else {
                    return Err(SchemaError::InvalidFilter {
                        column: column.to_string(),
                        value: operand.clone(),
                        reason: "between takes exactly two comma separated values".to_string(),
                    });
                };
                let (low, high) = (attr.parse(low)?, attr.parse(high)?);
                let low = self.bind(low);
                let high = self.bind(high);
                Ok(format!("{column} BETWEEN {low} AND {high}"))
            }
            Operator::Is => {
                let test = IsTest::parse(&operand).ok_or_else(|| SchemaError::InvalidFilter {
                    column: column.to_string(),
                    value: operand.clone(),
                    reason: "expected null, notnull, true or false".to_string(),
                })?;
                Ok(format!("{column} {}", test.sql()))
            }
            Operator::Like => {
                // Rejected for `string` columns only; other columns match on their text form.
                if attr.type_name() == "string" {
                    return Err(unsupported());
                }
                let pattern = match self.rendering {
                    ListRendering::Bound => self.bind(Value::String(operand)),
                    ListRendering::Inline => quote(&operand),
                };
                let subject = match (attr.type_def().sql_type(), self.dialect) {
                    (SqlType::Text, _) => column.to_string(),
                    (_, Dialect::Postgres) => format!("{column}::text"),
                    _ => format!("CAST({column} AS TEXT)"),
                };
                Ok(format!("{subject} LIKE {pattern}"))
            }
            Operator::Exists => Err(SchemaError::NotImplemented("exists")),
        }
    }

    /// `= x` for one value, `IN (x,y)` otherwise.
    pub fn text_list<S: AsRef<str>>(&mut self, values: &[S]) -> String {
        let values: Vec<Value> = values.iter().map(|v| Value::from(v.as_ref())).collect();
        if values.len() == 1 {
            let single = self.list_item(values.into_iter().next().unwrap_or_default(), true);
            return format!("= {single}");
        }
        format!("IN {}", self.value_list(values, true))
    }

    /// Discriminator predicate for an STI node: its own name and its descendants'.
    pub fn discriminator<S: AsRef<str>>(&mut self, values: &[S]) -> String {
        format!("{TYPE} {}", self.text_list(values))
    }

    /// Conditions selecting `selector` rows of `table`, discriminator first.
    ///
    /// # Errors
    ///
    /// Propagates filter errors of [`Selector::Filter`] selectors, including
    /// those of related parents.
    pub fn selector_conditions(
        &mut self,
        schema: &Schema,
        table: &TableDefinition,
        selector: &Selector,
    ) -> Result<Vec<String>, SchemaError> {
        let mut conditions = Vec::new();
        if table.strategy() == Strategy::SingleTable {
            conditions.push(self.discriminator(&schema.discriminator_values(table.table_id())));
        }
        match selector {
            Selector::All => {}
            Selector::Id(id) => conditions.push(format!("{ID} = {}", self.bind(Value::Int(*id)))),
            Selector::Filter(params) => conditions.extend(self.filter_conditions(table, params)?),
            Selector::Related(relation) => conditions.extend(self.relation_conditions(schema, relation)?),
        }
        Ok(conditions)
    }

    /// Conditions matching rows that reference `relation.parent` rows.
    ///
    /// Also used for join tables, which have no table node of their own.
    ///
    /// # Errors
    ///
    /// Propagates errors of the parent selector.
    pub fn relation_conditions(&mut self, schema: &Schema, relation: &Relation) -> Result<Vec<String>, SchemaError> {
        let parent = schema.table(relation.parent);
        let column = &relation.column;
        let mut conditions = Vec::new();
        match &relation.selector {
            Selector::Id(id) => conditions.push(format!("{column} = {}", self.bind(Value::Int(*id)))),
            Selector::All if parent.strategy() != Strategy::SingleTable => {
                conditions.push(format!("{column} IS NOT NULL"));
            }
            selector => {
                let inner = self.selector_conditions(schema, parent, selector)?;
                conditions.push(format!(
                    "{column} IN (SELECT {ID} FROM {}{})",
                    parent.collection_name(),
                    where_clause(&inner)
                ));
            }
        }
        if let Some(types) = &relation.parent_types {
            conditions.push(format!("{PARENT_TYPE} {}", self.text_list(types)));
        }
        Ok(conditions)
    }

    /// `GROUP BY`, `HAVING`, `ORDER BY`, `LIMIT` and `OFFSET` clauses, in that order.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::InvalidClause`] for unknown columns, a `having`
    /// containing `;`, non-positive limits, negative offsets, or an offset
    /// without a limit, and [`SchemaError::UnknownColumn`] for unknown columns.
    pub fn tail(&self, table: &TableDefinition, params: &Params) -> Result<String, SchemaError> {
        let mut clauses = Vec::new();
        if let Some(group_by) = params.get(GROUP_BY) {
            let columns = group_by
                .split(',')
                .map(|c| known_column(table, c.trim()))
                .collect::<Result<Vec<_>, _>>()?;
            clauses.push(format!("GROUP BY {}", columns.join(", ")));
        }
        if let Some(having) = params.get(HAVING) {
            if having.contains(';') || having.trim().is_empty() {
                return Err(SchemaError::InvalidClause {
                    clause: HAVING,
                    reason: format!("'{having}' is not a single expression"),
                });
            }
            clauses.push(format!("HAVING {}", having.trim()));
        }
        if let Some(order) = params.get(ORDER) {
            let terms = order
                .split(',')
                .map(|term| order_term(table, term))
                .collect::<Result<Vec<_>, _>>()?;
            clauses.push(format!("ORDER BY {}", terms.join(", ")));
        }
        let limit = params.get(LIMIT).map(|l| parse_count(LIMIT, l, 1)).transpose()?;
        let offset = params.get(OFFSET).map(|o| parse_count(OFFSET, o, 0)).transpose()?;
        match (limit, offset) {
            (Some(limit), offset) => {
                clauses.push(format!("LIMIT {limit}"));
                if let Some(offset) = offset {
                    clauses.push(format!("OFFSET {offset}"));
                }
            }
            (None, Some(_)) => {
                return Err(SchemaError::InvalidClause {
                    clause: OFFSET,
                    reason: "offset requires a limit".to_string(),
                });
            }
            (None, None) => {}
        }
        Ok(clauses.iter().map(|c| format!(" {c}")).collect())
    }

    /// `SELECT COUNT(*)`. Tail clauses are ignored.
    ///
    /// # Errors
    ///
    /// Propagates selector errors.
    pub fn count(mut self, schema: &Schema, table: &TableDefinition, selector: &Selector) -> Result<Statement, SchemaError> {
        let conditions = self.selector_conditions(schema, table, selector)?;
        let sql = format!(
            "SELECT COUNT(*) FROM {}{}",
            table.collection_name(),
            where_clause(&conditions)
        );
        Ok(self.finish(sql))
    }

    /// `SELECT columns`, with the tail clauses of a filter selector.
    ///
    /// # Errors
    ///
    /// Propagates selector and tail errors.
    pub fn select(
        mut self,
        schema: &Schema,
        table: &TableDefinition,
        selector: &Selector,
        columns: &[&str],
    ) -> Result<Statement, SchemaError> {
        let conditions = self.selector_conditions(schema, table, selector)?;
        let tail = match selector.params() {
            Some(params) => self.tail(table, params)?,
            None => String::new(),
        };
        let sql = format!(
            "SELECT {} FROM {}{}{}",
            columns.join(", "),
            table.collection_name(),
            where_clause(&conditions),
            tail
        );
        Ok(self.finish(sql))
    }

    /// `DELETE FROM`.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::InvalidClause`] if the selector carries tail
    /// clauses, and propagates selector errors.
    pub fn delete(mut self, schema: &Schema, table: &TableDefinition, selector: &Selector) -> Result<Statement, SchemaError> {
        reject_tail(selector)?;
        let conditions = self.selector_conditions(schema, table, selector)?;
        let sql = format!("DELETE FROM {}{}", table.collection_name(), where_clause(&conditions));
        Ok(self.finish(sql))
    }

    /// `DELETE FROM` a join table, for rows referencing `relation.parent`.
    ///
    /// # Errors
    ///
    /// Propagates selector errors.
    pub fn delete_related(mut self, schema: &Schema, table_name: &str, relation: &Relation) -> Result<Statement, SchemaError> {
        let conditions = self.relation_conditions(schema, relation)?;
        let sql = format!("DELETE FROM {table_name}{}", where_clause(&conditions));
        Ok(self.finish(sql))
    }

    /// `UPDATE … SET`; the assignments are bound before the selector.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::InvalidClause`] if the selector carries tail
    /// clauses, and propagates selector errors.
    pub fn update(
        mut self,
        schema: &Schema,
        table: &TableDefinition,
        assignments: &[(String, Value)],
        selector: &Selector,
    ) -> Result<Statement, SchemaError> {
        reject_tail(selector)?;
        let set = assignments
            .iter()
            .map(|(column, value)| format!("{column} = {}", self.bind(value.clone())))
            .collect::<Vec<_>>()
            .join(", ");
        let conditions = self.selector_conditions(schema, table, selector)?;
        let sql = format!(
            "UPDATE {} SET {set}{}",
            table.collection_name(),
            where_clause(&conditions)
        );
        Ok(self.finish(sql))
    }

    /// `INSERT INTO`, returning the id where the dialect supports it.
    pub fn insert(mut self, table: &TableDefinition, values: &[(String, Value)]) -> Statement {
        let target = table.collection_name();
        let mut sql = if values.is_empty() {
            match self.dialect {
                Dialect::MySql => format!("INSERT INTO {target} () VALUES ()"),
                _ => format!("INSERT INTO {target} DEFAULT VALUES"),
            }
        } else {
            let columns: Vec<&str> = values.iter().map(|(c, _)| c.as_str()).collect();
            let placeholders: Vec<String> = values.iter().map(|(_, v)| self.bind(v.clone())).collect();
            format!(
                "INSERT INTO {target} ({}) VALUES ({})",
                columns.join(", "),
                placeholders.join(", ")
            )
        };
        if self.dialect.returns_id() {
            sql.push_str(&format!(" RETURNING {ID}"));
        }
        self.finish(sql)
    }

    fn value_list(&mut self, values: Vec<Value>, textual: bool) -> String {
        let items: Vec<String> = values.into_iter().map(|v| self.list_item(v, textual)).collect();
        format!("({})", items.join(","))
    }

    fn list_item(&mut self, value: Value, textual: bool) -> String {
        match self.rendering {
            ListRendering::Bound => self.bind(value),
            ListRendering::Inline if textual => quote(&value.to_string()),
            ListRendering::Inline => value.to_string(),
        }
    }
}

/// Single-quoted SQL literal with embedded quotes doubled.
fn quote(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

pub(crate) fn where_clause(conditions: &[String]) -> String {
    if conditions.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", conditions.join(" AND "))
    }
}

fn known_column<'t>(table: &'t TableDefinition, column: &str) -> Result<&'t str, SchemaError> {
    table
        .attribute(column)
        .map(AttributeDefinition::name)
        .ok_or_else(|| SchemaError::UnknownColumn {
            table: table.name().to_string(),
            column: column.to_string(),
        })
}

fn order_term(table: &TableDefinition, term: &str) -> Result<String, SchemaError> {
    let mut parts = term.split_whitespace();
    let column = known_column(table, parts.next().unwrap_or_default())?;
    let direction = match parts.next().map(str::to_ascii_uppercase).as_deref() {
        None => None,
        Some(dir @ ("ASC" | "DESC")) => Some(dir.to_string()),
        Some(other) => {
            return Err(SchemaError::InvalidClause {
                clause: ORDER,
                reason: format!("unknown direction '{other}'"),
            })
        }
    };
    if parts.next().is_some() {
        return Err(SchemaError::InvalidClause {
            clause: ORDER,
            reason: format!("'{}' is not 'column [ASC|DESC]'", term.trim()),
        });
    }
    Ok(match direction {
        Some(dir) => format!("{column} {dir}"),
        None => column.to_string(),
    })
}

fn parse_count(clause: &'static str, raw: &str, min: i64) -> Result<i64, SchemaError> {
    match raw.trim().parse::<i64>() {
        Ok(n) if n >= min => Ok(n),
        _ => Err(SchemaError::InvalidClause {
            clause,
            reason: format!("'{raw}' must be an integer >= {min}"),
        }),
    }
}

fn reject_tail(selector: &Selector) -> Result<(), SchemaError> {
    if let Some(key) = selector.params().and_then(|p| p.keys().find(|k| super::is_reserved(k))) {
        return Err(SchemaError::InvalidClause {
            clause: super::reserved_name(key),
            reason: "not allowed on updates or deletes".to_string(),
        });
    }
    Ok(())
}

/// Builds the `WHERE` text (without the keyword) and arguments for `params`
/// on `table`, including the discriminator of single-table nodes.
///
/// # Errors
///
/// See [`StatementBuilder::filter_conditions`].
pub fn build(
    schema: &Schema,
    table: &TableDefinition,
    params: &Params,
    dialect: Dialect,
    rendering: ListRendering,
) -> Result<(String, Vec<Value>), SchemaError> {
    let mut builder = StatementBuilder::new(dialect, rendering);
    let conditions = builder.selector_conditions(schema, table, &Selector::Filter(params.clone()))?;
    Ok((conditions.join(" AND "), builder.args))
}
