//! Order execution configuration.

use serde::Deserialize;

use crate::domain::order::DEFAULT_ORDER_SEPARATOR;
use crate::domain::OrderPackageType;

/// Maximum orders per package, by package type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PackageLimits {
    pub place: usize,
    pub cancel: usize,
    pub update: usize,
    pub replace: usize,
}

impl Default for PackageLimits {
    fn default() -> Self {
        Self {
            place: 200,
            cancel: 60,
            update: 60,
            replace: 60,
        }
    }
}

/// Transaction and executor settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionConfig {
    /// Place orders without waiting for a bet id.
    #[serde(default)]
    pub async_place_orders: bool,
    /// Separator between strategy hash and order id in the customer reference.
    #[serde(default = "default_order_separator")]
    pub order_separator: String,
    /// Worker tasks in the pooled executor.
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Packages buffered ahead of the workers.
    #[serde(default = "default_worker_queue_capacity")]
    pub worker_queue_capacity: usize,
    #[serde(default)]
    pub package_limits: PackageLimits,
}

fn default_order_separator() -> String {
    DEFAULT_ORDER_SEPARATOR.to_string()
}

fn default_workers() -> usize {
    4
}

fn default_worker_queue_capacity() -> usize {
    1000
}

impl ExecutionConfig {
    /// Maximum orders in one package of `package_type`.
    #[must_use]
    pub fn limit(&self, package_type: OrderPackageType) -> usize {
        match package_type {
            OrderPackageType::Place => self.package_limits.place,
            OrderPackageType::Cancel => self.package_limits.cancel,
            OrderPackageType::Update => self.package_limits.update,
            OrderPackageType::Replace => self.package_limits.replace,
        }
    }

    /// The separator as a char, falling back to the default for invalid values.
    #[must_use]
    pub fn separator(&self) -> char {
        let mut chars = self.order_separator.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => c,
            _ => DEFAULT_ORDER_SEPARATOR,
        }
    }
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            async_place_orders: false,
            order_separator: default_order_separator(),
            workers: default_workers(),
            worker_queue_capacity: default_worker_queue_capacity(),
            package_limits: PackageLimits::default(),
        }
    }
}
