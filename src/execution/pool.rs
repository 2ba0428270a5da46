//! Bounded worker pool for exchange submission.
//!
//! The dispatcher must never block on network I/O, so packages are queued
//! and submitted by a fixed set of tokio workers.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use super::OrderExecutor;
use crate::config::ExecutionConfig;
use crate::domain::OrderPackage;
use crate::error::ExecutionError;

/// Sends one package to an exchange.
#[async_trait]
pub trait PackageSubmitter: Send + Sync {
    async fn submit(&self, package: OrderPackage) -> Result<(), ExecutionError>;
}

type SharedReceiver = Arc<tokio::sync::Mutex<mpsc::Receiver<OrderPackage>>>;

/// [`OrderExecutor`] backed by worker tasks feeding a [`PackageSubmitter`].
///
/// Must be created inside a tokio runtime.
pub struct PooledExecutor {
    sender: Mutex<Option<mpsc::Sender<OrderPackage>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl PooledExecutor {
    #[must_use]
    pub fn new(config: &ExecutionConfig, submitter: Arc<dyn PackageSubmitter>) -> Self {
        let (tx, rx) = mpsc::channel(config.worker_queue_capacity.max(1));
        let receiver: SharedReceiver = Arc::new(tokio::sync::Mutex::new(rx));
        let workers = (0..config.workers.max(1))
            .map(|id| tokio::spawn(worker(id, Arc::clone(&receiver), Arc::clone(&submitter))))
            .collect();
        info!(workers = config.workers, "Execution pool started");
        Self {
            sender: Mutex::new(Some(tx)),
            workers: Mutex::new(workers),
        }
    }

    /// Stop accepting packages and wait for queued ones to be submitted.
    pub async fn shutdown(&self) {
        self.sender.lock().take();
        let workers = std::mem::take(&mut *self.workers.lock());
        for handle in workers {
            if let Err(err) = handle.await {
                error!(error = %err, "Execution worker panicked");
            }
        }
        info!("Execution pool stopped");
    }
}

impl OrderExecutor for PooledExecutor {
    fn execute(&self, package: OrderPackage) -> Result<(), ExecutionError> {
        let guard = self.sender.lock();
        let Some(tx) = guard.as_ref() else {
            return Err(ExecutionError::QueueClosed);
        };
        tx.try_send(package).map_err(|err| match err {
            TrySendError::Full(package) => ExecutionError::QueueFull {
                package_id: package.id().to_string(),
            },
            TrySendError::Closed(_) => ExecutionError::QueueClosed,
        })
    }
}

async fn worker(id: usize, receiver: SharedReceiver, submitter: Arc<dyn PackageSubmitter>) {
    loop {
        let package = receiver.lock().await.recv().await;
        let Some(package) = package else {
            break;
        };
        let package_id = package.id();
        if let Err(err) = submitter.submit(package).await {
            error!(worker = id, package_id = %package_id, error = %err, "Package submission failed");
        }
    }
    debug!(worker = id, "Execution worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ClientId, MarketId, OrderPackageType};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingSubmitter {
        submitted: AtomicUsize,
    }

    #[async_trait]
    impl PackageSubmitter for CountingSubmitter {
        async fn submit(&self, _package: OrderPackage) -> Result<(), ExecutionError> {
            self.submitted.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn package() -> OrderPackage {
        OrderPackage::new(
            ClientId::from("live"),
            MarketId::from("1.23"),
            OrderPackageType::Place,
            Vec::new(),
            None,
            0,
            false,
        )
    }

    #[tokio::test]
    async fn submits_every_package_before_shutdown() {
        let submitter = Arc::new(CountingSubmitter::default());
        let config = ExecutionConfig {
            workers: 2,
            ..ExecutionConfig::default()
        };
        let pool = PooledExecutor::new(&config, submitter.clone());
        for _ in 0..5 {
            pool.execute(package()).unwrap();
        }
        pool.shutdown().await;
        assert_eq!(submitter.submitted.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn rejects_after_shutdown() {
        let pool = PooledExecutor::new(
            &ExecutionConfig::default(),
            Arc::new(CountingSubmitter::default()),
        );
        pool.shutdown().await;
        assert_eq!(pool.execute(package()).unwrap_err(), ExecutionError::QueueClosed);
    }
}
