//! Connection pool.
//!
//! [`LifePool`] opens a fixed number of `may_postgres` clients up front, one
//! coroutine per connection, and hands them out as [`PooledExecutor`]s over a
//! bounded crossbeam channel.
//! A pooled executor returns its client to the pool when dropped, so a
//! session built on one keeps the same connection (and any open
//! transaction) for its whole lifetime.

pub mod config;

use crate::connection::{connect, ConnectionError};
use crate::executor::{LifeError, LifeExecutor, MayPostgresExecutor};
use crate::query::Dialect;
use crate::value::Value;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use may_postgres::Client;
use std::time::{Duration, Instant};

pub use self::config::EngineConfig;

/// A fixed-size pool of PostgreSQL clients.
#[derive(Clone)]
pub struct LifePool {
    sender: Sender<Client>,
    receiver: Receiver<Client>,
    size: usize,
    timeout: Duration,
}

impl LifePool {
    /// Opens `config.max_connections` connections to `config.url`.
    ///
    /// # Errors
    ///
    /// Returns `ConnectionError::UnsupportedDriver` before connecting when
    /// `config.driver` names anything but PostgreSQL, and `ConnectionError`
    /// if any connection fails.
    pub fn new(config: &EngineConfig) -> Result<Self, ConnectionError> {
        if config.dialect() != Dialect::Postgres {
            return Err(ConnectionError::UnsupportedDriver(config.driver.clone()));
        }
        let size = config.max_connections.max(1);
        let handles: Vec<_> = (0..size)
            .map(|_| {
                let url = config.url.clone();
                may::go!(move || connect(&url))
            })
            .collect();
        let clients = handles
            .into_iter()
            .map(|handle| {
                handle
                    .join()
                    .unwrap_or_else(|_| Err(ConnectionError::Other("connection coroutine panicked".to_string())))
            })
            .collect::<Result<Vec<_>, _>>()?;
        log::info!("Opened pool of {size} connections");
        Ok(Self::from_clients(clients, config.pool_timeout()))
    }

    /// Builds a pool around already open clients.
    pub fn from_clients(clients: Vec<Client>, timeout: Duration) -> Self {
        let size = clients.len();
        let (sender, receiver) = bounded(size.max(1));
        for client in clients {
            // The channel has room for every client.
            let _ = sender.try_send(client);
        }
        Self {
            sender,
            receiver,
            size,
            timeout,
        }
    }

    /// Takes a connection, waiting up to the pool timeout.
    ///
    /// # Errors
    ///
    /// Returns `ConnectionError::PoolTimeout` if none becomes free in time.
    pub fn acquire(&self) -> Result<PooledExecutor, ConnectionError> {
        let start = Instant::now();
        let client = match self.receiver.recv_timeout(self.timeout) {
            Ok(client) => client,
            Err(RecvTimeoutError::Timeout) => return Err(ConnectionError::PoolTimeout(self.timeout)),
            Err(RecvTimeoutError::Disconnected) => {
                return Err(ConnectionError::Other("pool is closed".to_string()))
            }
        };
        let waited = start.elapsed();
        log::debug!("Acquired pooled connection after {waited:?}");
        #[cfg(feature = "metrics")]
        crate::metrics::METRICS.record_connection_wait(waited);
        Ok(PooledExecutor {
            executor: Some(MayPostgresExecutor::new(client)),
            home: self.sender.clone(),
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Connections currently free.
    pub fn idle(&self) -> usize {
        self.receiver.len()
    }
}

/// A connection on loan from a [`LifePool`].
pub struct PooledExecutor {
    executor: Option<MayPostgresExecutor>,
    home: Sender<Client>,
}

impl PooledExecutor {
    fn inner(&self) -> Result<&MayPostgresExecutor, LifeError> {
        self.executor
            .as_ref()
            .ok_or_else(|| LifeError::Other("pooled connection already returned".to_string()))
    }
}

impl Drop for PooledExecutor {
    fn drop(&mut self) {
        if let Some(executor) = self.executor.take() {
            if self.home.send(executor.into_client()).is_err() {
                log::debug!("Pool dropped before connection was returned");
            }
        }
    }
}

impl LifeExecutor for PooledExecutor {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    fn execute(&self, query: &str, params: &[Value]) -> Result<u64, LifeError> {
        self.inner()?.execute(query, params)
    }

    fn query_all(&self, query: &str, params: &[Value]) -> Result<Vec<Vec<Value>>, LifeError> {
        self.inner()?.query_all(query, params)
    }

    fn last_insert_id(&self) -> Result<i64, LifeError> {
        self.inner()?.last_insert_id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_pool_times_out() {
        let pool = LifePool::from_clients(Vec::new(), Duration::from_millis(10));
        assert_eq!(pool.size(), 0);
        assert_eq!(pool.idle(), 0);
        assert!(matches!(pool.acquire(), Err(ConnectionError::PoolTimeout(_))));
    }

    #[test]
    fn test_non_postgres_driver_is_rejected_before_connecting() {
        let config = EngineConfig {
            url: "postgresql://nobody@127.0.0.1:1/none".to_string(),
            driver: "mysql".to_string(),
            ..EngineConfig::default()
        };
        match LifePool::new(&config) {
            Err(ConnectionError::UnsupportedDriver(driver)) => assert_eq!(driver, "mysql"),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("pool opened for a mysql driver"),
        }
    }
}
