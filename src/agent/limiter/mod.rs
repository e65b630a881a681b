use crate::errors::ShellpilotError;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{Semaphore, SemaphorePermit};
use tracing::debug;

/// Counting admission gate shared across sessions.
///
/// Backed by a tokio `Semaphore`, which admits waiters in arrival order.
/// Callers suspend until a slot frees up; the slot is released when the permit
/// (or the wrapped future) is dropped, including on cancellation.
#[derive(Clone)]
pub struct ConcurrencyLimiter {
    name: &'static str,
    capacity: usize,
    semaphore: Arc<Semaphore>,
}

impl ConcurrencyLimiter {
    pub fn new(name: &'static str, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            name,
            capacity,
            semaphore: Arc::new(Semaphore::new(capacity)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    pub async fn acquire(&self) -> Result<SemaphorePermit<'_>, ShellpilotError> {
        if self.semaphore.available_permits() == 0 {
            debug!("{} limiter full ({} slots), waiting", self.name, self.capacity);
        }
        self.semaphore
            .acquire()
            .await
            .map_err(|_| anyhow::anyhow!("{} limiter closed", self.name).into())
    }

    /// Run `fut` while holding one slot.
    pub async fn run<T, F>(&self, fut: F) -> Result<T, ShellpilotError>
    where
        F: Future<Output = Result<T, ShellpilotError>>,
    {
        let _permit = self.acquire().await?;
        fut.await
    }
}
