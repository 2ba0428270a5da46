use rust_decimal::Decimal;
use thiserror::Error;

/// Configuration-related errors with structured variants.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),
}

/// Order state errors.
///
/// These indicate a programming error in the caller rather than a runtime
/// condition, so they are raised instead of being swallowed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OrderError {
    #[error("order {order_id} already exists in blotter for market {market_id}")]
    DuplicateOrder { order_id: String, market_id: String },

    #[error("order {order_id} not found in market {market_id}")]
    UnknownOrder { order_id: String, market_id: String },

    #[error("trade {trade_id} not found in market {market_id}")]
    UnknownTrade { trade_id: String, market_id: String },

    #[error("cannot {action} order {order_id} in status {status}")]
    InvalidTransition {
        order_id: String,
        action: &'static str,
        status: String,
    },

    #[error("{action} is only supported for LIMIT orders, order {order_id} is {order_type}")]
    UnsupportedOrderType {
        order_id: String,
        action: &'static str,
        order_type: &'static str,
    },

    #[error("order {order_id} already has persistence type {persistence_type}")]
    UnchangedPersistence {
        order_id: String,
        persistence_type: String,
    },
}

/// Trading control violations.
///
/// Expected in normal operation: the order is marked as a violation and
/// the mutation is aborted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ControlError {
    #[error("Order exposure ({exposure}) is greater than strategy.max_order_exposure ({limit})")]
    OrderExposure { exposure: Decimal, limit: Decimal },

    #[error(
        "Potential selection exposure ({exposure:.2}) is greater than strategy.max_selection_exposure ({limit})"
    )]
    SelectionExposure { exposure: Decimal, limit: Decimal },

    #[error("{message}")]
    StrategyValidation { message: String },

    #[error("{control} rejected order: {reason}")]
    Rejected {
        control: &'static str,
        reason: String,
    },
}

/// Execution-related errors with structured variants.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecutionError {
    #[error("no clients provided")]
    NoClients,

    #[error("client {client_id} already registered")]
    DuplicateClient { client_id: String },

    #[error("client {client_id} not found")]
    UnknownClient { client_id: String },

    #[error("execution queue full, package {package_id} rejected")]
    QueueFull { package_id: String },

    #[error("execution queue closed")]
    QueueClosed,

    #[error("failed to submit package {package_id}: {reason}")]
    SubmissionFailed { package_id: String, reason: String },
}

/// Errors returned from strategy and middleware callbacks.
#[derive(Error, Debug)]
pub enum StrategyError {
    /// A domain failure raised deliberately by strategy code.
    #[error("{0}")]
    Rejected(String),

    #[error(transparent)]
    Order(#[from] OrderError),

    #[error(transparent)]
    Execution(#[from] ExecutionError),

    /// Anything else. Re-raised when the engine runs with `raise_errors`.
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl StrategyError {
    /// Create a domain rejection from a message.
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected(message.into())
    }

    /// Whether this error is outside the expected domain failures.
    #[must_use]
    pub fn is_unexpected(&self) -> bool {
        matches!(self, Self::Unexpected(_))
    }
}

impl From<Error> for StrategyError {
    fn from(err: Error) -> Self {
        match err {
            Error::Order(e) => Self::Order(e),
            Error::Execution(e) => Self::Execution(e),
            other => Self::Unexpected(anyhow::Error::new(other)),
        }
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Order(#[from] OrderError),

    #[error(transparent)]
    Control(#[from] ControlError),

    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error("strategy already registered: {name}")]
    DuplicateStrategy { name: String },

    #[error("unexpected error in {callback} for market {market_id}: {reason}")]
    Callback {
        callback: &'static str,
        market_id: String,
        reason: String,
    },

    #[error("event queue closed")]
    QueueClosed,

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn order_exposure_message_cites_values() {
        let err = ControlError::OrderExposure {
            exposure: dec!(12.0),
            limit: dec!(10),
        };
        assert_eq!(
            err.to_string(),
            "Order exposure (12.0) is greater than strategy.max_order_exposure (10)"
        );
    }

    #[test]
    fn selection_exposure_message_uses_two_decimals() {
        let err = ControlError::SelectionExposure {
            exposure: dec!(14),
            limit: dec!(10),
        };
        assert_eq!(
            err.to_string(),
            "Potential selection exposure (14.00) is greater than strategy.max_selection_exposure (10)"
        );
    }

    #[test]
    fn crate_error_maps_into_strategy_error() {
        let err = Error::Order(OrderError::UnknownOrder {
            order_id: "1".into(),
            market_id: "1.23".into(),
        });
        assert!(matches!(StrategyError::from(err), StrategyError::Order(_)));

        let err = Error::QueueClosed;
        assert!(StrategyError::from(err).is_unexpected());
    }
}
