//! Driver-specific SQL conventions.

use std::fmt;

/// Placeholder style and insert-id strategy, chosen by driver name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    /// `$1…$N` placeholders, `INSERT … RETURNING id`
    #[default]
    Postgres,
    MySql,
    Sqlite,
    /// Any other driver: `?` placeholders and a last-insert-id call
    Other,
}

impl Dialect {
    /// Maps a driver name onto a dialect. Only `"postgres"` gets numbered
    /// placeholders.
    pub fn from_driver(driver: &str) -> Self {
        match driver {
            "postgres" => Dialect::Postgres,
            "mysql" => Dialect::MySql,
            "sqlite" | "sqlite3" => Dialect::Sqlite,
            _ => Dialect::Other,
        }
    }

    /// Placeholder for the `n`th (1-based) bound argument.
    pub fn placeholder(self, n: usize) -> String {
        match self {
            Dialect::Postgres => format!("${n}"),
            _ => "?".to_string(),
        }
    }

    /// Whether inserts report the new id through `RETURNING`.
    pub fn returns_id(self) -> bool {
        self == Dialect::Postgres
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Dialect::Postgres => "postgres",
            Dialect::MySql => "mysql",
            Dialect::Sqlite => "sqlite",
            Dialect::Other => "other",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_driver() {
        assert_eq!(Dialect::from_driver("postgres"), Dialect::Postgres);
        assert_eq!(Dialect::from_driver("mysql"), Dialect::MySql);
        assert_eq!(Dialect::from_driver("sqlite3"), Dialect::Sqlite);
        assert_eq!(Dialect::from_driver("postgresql"), Dialect::Other);
    }

    #[test]
    fn test_placeholders() {
        assert_eq!(Dialect::Postgres.placeholder(3), "$3");
        assert_eq!(Dialect::MySql.placeholder(3), "?");
        assert!(Dialect::Postgres.returns_id());
        assert!(!Dialect::Sqlite.returns_id());
    }
}
