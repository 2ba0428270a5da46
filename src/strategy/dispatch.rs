//! Isolation of strategy and middleware callbacks.
//!
//! A failing callback never stops the dispatcher. Domain errors are logged
//! and swallowed; unexpected errors and panics are logged and, with
//! `raise_errors`, returned to the caller.

use std::panic::{catch_unwind, AssertUnwindSafe};

use tracing::error;

use crate::error::{Error, Result, StrategyError};

/// Run one callback.
///
/// Returns `Ok(Some(value))` on success and `Ok(None)` when the failure was
/// swallowed.
///
/// # Errors
///
/// Returns [`Error::Callback`] for an unexpected failure when `raise_errors` is set.
pub(crate) fn call_strategy<T>(
    callback: &'static str,
    owner: &str,
    market_id: &str,
    raise_errors: bool,
    f: impl FnOnce() -> std::result::Result<T, StrategyError>,
) -> Result<Option<T>> {
    let failure = match catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(value)) => return Ok(Some(value)),
        Ok(Err(err)) if !err.is_unexpected() => {
            error!(
                callback,
                strategy = owner,
                market_id,
                error = %err,
                "Callback failed"
            );
            return Ok(None);
        }
        Ok(Err(err)) => err.to_string(),
        Err(panic) => panic_message(panic.as_ref()),
    };

    error!(
        callback,
        strategy = owner,
        market_id,
        error = %failure,
        "Unknown error in callback"
    );
    if raise_errors {
        return Err(Error::Callback {
            callback,
            market_id: market_id.to_string(),
            reason: failure,
        });
    }
    Ok(None)
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "panic".to_string()
    }
}
