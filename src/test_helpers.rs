//! Test double for [`LifeExecutor`].
//!
//! `MockExecutor` records every statement and answers from a script of
//! responses matched by SQL fragment. Unmatched statements affect no rows,
//! count zero, select nothing, and inserts get increasing ids starting at 1.

use crate::executor::{LifeError, LifeExecutor};
use crate::query::{Dialect, Statement};
use crate::value::Value;
use std::cell::{Cell, RefCell};

#[derive(Debug, Clone)]
enum Response {
    Rows(Vec<Vec<Value>>),
    Affected(u64),
    Fail(String),
}

#[derive(Debug)]
struct Rule {
    fragment: String,
    response: Response,
    once: bool,
}

#[derive(Debug, Default)]
pub struct MockExecutor {
    dialect: Dialect,
    rules: RefCell<Vec<Rule>>,
    log: RefCell<Vec<Statement>>,
    next_id: Cell<i64>,
}

impl MockExecutor {
    pub fn new() -> Self {
        Self::with_dialect(Dialect::Postgres)
    }

    pub fn with_dialect(dialect: Dialect) -> Self {
        Self {
            dialect,
            next_id: Cell::new(1),
            ..Self::default()
        }
    }

    /// Statements containing `fragment` return `rows`.
    pub fn respond_rows(&self, fragment: &str, rows: Vec<Vec<Value>>) {
        self.push(fragment, Response::Rows(rows), false);
    }

    /// Like [`MockExecutor::respond_rows`], for the next matching statement only.
    pub fn respond_rows_once(&self, fragment: &str, rows: Vec<Vec<Value>>) {
        self.push(fragment, Response::Rows(rows), true);
    }

    /// Statements containing `fragment` report `affected` rows.
    pub fn respond_affected(&self, fragment: &str, affected: u64) {
        self.push(fragment, Response::Affected(affected), false);
    }

    pub fn respond_affected_once(&self, fragment: &str, affected: u64) {
        self.push(fragment, Response::Affected(affected), true);
    }

    /// Statements containing `fragment` fail with a query error.
    pub fn fail_on(&self, fragment: &str, message: &str) {
        self.push(fragment, Response::Fail(message.to_string()), false);
    }

    /// SQL of every statement run so far.
    pub fn statements(&self) -> Vec<String> {
        self.log.borrow().iter().map(|s| s.sql.clone()).collect()
    }

    /// Every statement run so far, with its arguments.
    pub fn calls(&self) -> Vec<Statement> {
        self.log.borrow().clone()
    }

    pub fn clear(&self) {
        self.log.borrow_mut().clear();
    }

    fn push(&self, fragment: &str, response: Response, once: bool) {
        self.rules.borrow_mut().push(Rule {
            fragment: fragment.to_string(),
            response,
            once,
        });
    }

    fn respond(&self, query: &str, params: &[Value]) -> Option<Response> {
        self.log.borrow_mut().push(Statement {
            sql: query.to_string(),
            args: params.to_vec(),
        });
        let mut rules = self.rules.borrow_mut();
        let index = rules.iter().position(|r| query.contains(&r.fragment))?;
        let response = rules[index].response.clone();
        if rules[index].once {
            rules.remove(index);
        }
        Some(response)
    }
}

impl LifeExecutor for MockExecutor {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn execute(&self, query: &str, params: &[Value]) -> Result<u64, LifeError> {
        match self.respond(query, params) {
            None if query.starts_with("INSERT") => {
                self.generate_id();
                Ok(1)
            }
            None => Ok(0),
            Some(Response::Affected(n)) => Ok(n),
            Some(Response::Rows(rows)) => Ok(rows.len() as u64),
            Some(Response::Fail(message)) => Err(LifeError::QueryError(message)),
        }
    }

    fn query_all(&self, query: &str, params: &[Value]) -> Result<Vec<Vec<Value>>, LifeError> {
        match self.respond(query, params) {
            None if query.contains("COUNT(*)") => Ok(vec![vec![Value::Int(0)]]),
            None | Some(Response::Affected(_)) => Ok(Vec::new()),
            Some(Response::Rows(rows)) => Ok(rows),
            Some(Response::Fail(message)) => Err(LifeError::QueryError(message)),
        }
    }

    fn query_id(&self, query: &str, params: &[Value]) -> Result<i64, LifeError> {
        match self.respond(query, params) {
            Some(Response::Fail(message)) => Err(LifeError::QueryError(message)),
            Some(Response::Rows(rows)) => rows
                .first()
                .and_then(|r| r.first())
                .and_then(Value::as_i64)
                .ok_or_else(|| LifeError::ParseError("scripted row has no id".to_string())),
            None | Some(Response::Affected(_)) => Ok(self.generate_id()),
        }
    }

    fn last_insert_id(&self) -> Result<i64, LifeError> {
        if self.dialect.returns_id() {
            return Err(LifeError::QueryError("use RETURNING id".to_string()));
        }
        Ok(self.next_id.get() - 1)
    }
}

impl MockExecutor {
    fn generate_id(&self) -> i64 {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_responses() {
        let mock = MockExecutor::new();
        mock.respond_rows_once("FROM hosts", vec![vec![Value::Int(1)]]);
        mock.respond_affected("DELETE", 3);
        assert_eq!(mock.query_all("SELECT id FROM hosts", &[]).unwrap().len(), 1);
        assert!(mock.query_all("SELECT id FROM hosts", &[]).unwrap().is_empty());
        assert_eq!(mock.execute("DELETE FROM hosts", &[]).unwrap(), 3);
        assert_eq!(mock.execute("DELETE FROM hosts", &[]).unwrap(), 3);
        assert_eq!(mock.statements().len(), 4);
    }

    #[test]
    fn test_generated_ids() {
        let mock = MockExecutor::new();
        assert_eq!(mock.query_id("INSERT INTO a DEFAULT VALUES RETURNING id", &[]).unwrap(), 1);
        assert_eq!(mock.query_id("INSERT INTO a DEFAULT VALUES RETURNING id", &[]).unwrap(), 2);

        let mysql = MockExecutor::with_dialect(Dialect::MySql);
        mysql.execute("INSERT INTO a () VALUES ()", &[]).unwrap();
        mysql.execute("INSERT INTO a () VALUES ()", &[]).unwrap();
        assert_eq!(mysql.last_insert_id().unwrap(), 2);
    }
}
