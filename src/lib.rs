//! # Tablewright
//!
//! Schema-driven relational mapping over PostgreSQL using the `may` runtime.
//!
//! A declarative [`SchemaDefinition`](schema::SchemaDefinition) is compiled once
//! into an immutable [`Schema`]: tables with typed attributes, associations and
//! an inheritance graph stored either as single-table (a shared table told apart
//! by a `type` column) or class-table (one physical table per node). A
//! [`Session`] then offers generic CRUD verbs over any table of the schema,
//! dispatching on the storage strategy and cascading deletes to dependents.
//!
//! ```no_run
//! use std::sync::Arc;
//! use tablewright::{CallContext, EngineConfig, LifeError, LifePool, Params, Schema, Session, TypeRegistry};
//!
//! # fn main() -> Result<(), LifeError> {
//! let config = EngineConfig::load().map_err(|e| LifeError::Other(e.to_string()))?;
//! let path = config.schema_path.as_deref().unwrap_or("schema.json");
//! let schema = Arc::new(Schema::load(path, &TypeRegistry::standard())?);
//! let pool = LifePool::new(&config)?;
//!
//! let session = Session::new(schema, pool.acquire()?).with_rendering(config.list_rendering);
//! let total = session.count(&CallContext::from_config(&config), "document", &Params::new())?;
//! println!("{total} documents");
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod connection;
pub mod context;
pub mod executor;
pub mod metrics;
pub mod pool;
pub mod query;
pub mod schema;
pub mod session;
pub mod transaction;
pub mod types;
pub mod value;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

pub use crate::config::EngineConfig;
pub use connection::{connect, ConnectionError};
pub use context::CallContext;
pub use executor::{LifeError, LifeExecutor, MayPostgresExecutor};
pub use pool::{LifePool, PooledExecutor};
pub use query::{Dialect, ListRendering, Params, Selector, StatementBuilder};
pub use schema::{Schema, SchemaError, Strategy, TableDefinition};
pub use session::Session;
pub use transaction::{IsolationLevel, Transaction, TransactionError};
pub use types::TypeRegistry;
pub use value::{Record, Value};
