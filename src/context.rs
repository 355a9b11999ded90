//! Per-call deadline and cancellation.

use crate::config::EngineConfig;
use crate::executor::{LifeError, LifeExecutor};
use crate::query::Dialect;
use crate::value::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Deadline and cancellation flag for one session call.
///
/// Clones share the cancellation flag, so a clone handed to another thread
/// can cancel a call in progress. Both are checked before every statement.
///
/// ```
/// use tablewright::CallContext;
///
/// let ctx = CallContext::new();
/// let handle = ctx.clone();
/// handle.cancel();
/// assert!(ctx.check().is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    deadline: Option<Instant>,
    cancelled: Arc<AtomicBool>,
}

impl CallContext {
    /// No deadline, not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// A context with the configured default deadline, if any.
    pub fn from_config(config: &EngineConfig) -> Self {
        match config.statement_deadline() {
            Some(timeout) => Self::new().with_timeout(timeout),
            None => Self::new(),
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// # Errors
    ///
    /// [`LifeError::Cancelled`] after [`CallContext::cancel`], otherwise
    /// [`LifeError::DeadlineExceeded`] once the deadline has passed.
    pub fn check(&self) -> Result<(), LifeError> {
        if self.is_cancelled() {
            return Err(LifeError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(LifeError::DeadlineExceeded),
            _ => Ok(()),
        }
    }
}

/// Executor that checks a [`CallContext`] before delegating each statement.
pub(crate) struct Guarded<'a> {
    inner: &'a dyn LifeExecutor,
    ctx: &'a CallContext,
}

impl<'a> Guarded<'a> {
    pub(crate) fn new(inner: &'a dyn LifeExecutor, ctx: &'a CallContext) -> Self {
        Self { inner, ctx }
    }
}

impl LifeExecutor for Guarded<'_> {
    fn dialect(&self) -> Dialect {
        self.inner.dialect()
    }

    fn execute(&self, query: &str, params: &[Value]) -> Result<u64, LifeError> {
        self.ctx.check()?;
        self.inner.execute(query, params)
    }

    fn query_all(&self, query: &str, params: &[Value]) -> Result<Vec<Vec<Value>>, LifeError> {
        self.ctx.check()?;
        self.inner.query_all(query, params)
    }

    fn query_id(&self, query: &str, params: &[Value]) -> Result<i64, LifeError> {
        self.ctx.check()?;
        self.inner.query_id(query, params)
    }

    fn last_insert_id(&self) -> Result<i64, LifeError> {
        self.inner.last_insert_id()
    }

    fn transaction_depth(&self) -> u32 {
        self.inner.transaction_depth()
    }
}
