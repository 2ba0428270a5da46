//! Executor that records packages instead of sending them.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::domain::OrderPackage;
use crate::error::ExecutionError;
use crate::execution::OrderExecutor;

/// Captures every package it is given. Clones share the same record.
#[derive(Debug, Clone, Default)]
pub struct RecordingExecutor {
    packages: Arc<Mutex<Vec<OrderPackage>>>,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Packages received so far, oldest first.
    pub fn packages(&self) -> Vec<OrderPackage> {
        self.packages.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.packages.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.lock().is_empty()
    }

    pub fn clear(&self) {
        self.packages.lock().clear();
    }
}

impl OrderExecutor for RecordingExecutor {
    fn execute(&self, package: OrderPackage) -> Result<(), ExecutionError> {
        self.packages.lock().push(package);
        Ok(())
    }
}
