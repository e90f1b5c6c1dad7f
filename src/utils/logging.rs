//! Logging configuration and setup
//!
//! This module provides logging initialization and structured logging utilities
//! for the OrderBuddy application.

use tracing::{debug, error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LoggingConfig;
use crate::utils::errors::{ErrorSeverity, OrderBuddyError, Result};

/// Initialize logging based on configuration.
///
/// The returned guard flushes the file appender when dropped and must be
/// held for the lifetime of the process.
pub fn init_logging(config: &LoggingConfig) -> Result<WorkerGuard> {
    let file_appender = tracing_appender::rolling::daily(&config.directory, "orderbuddy.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.level))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stdout))
        .with(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(non_blocking))
        .init();

    info!("Logging initialized with level: {}", config.level);
    Ok(guard)
}

/// Log a conversation state change
pub fn log_transition(tenant_id: &str, user_id: &str, from: &str, to: &str, forced: bool) {
    if forced {
        info!(
            tenant_id = tenant_id,
            user_id = user_id,
            from = from,
            to = to,
            forced = forced,
            "Forced conversation transition"
        );
    } else {
        debug!(
            tenant_id = tenant_id,
            user_id = user_id,
            from = from,
            to = to,
            "Conversation transition"
        );
    }
}

/// Log a failed handler at the level its error severity calls for
pub fn log_handler_error(tenant_id: &str, user_id: &str, state: &str, err: &OrderBuddyError) {
    let recoverable = err.is_recoverable();
    match err.severity() {
        ErrorSeverity::Info => debug!(
            tenant_id = tenant_id,
            user_id = user_id,
            state = state,
            error = %err,
            "Message rejected, conversation restored"
        ),
        ErrorSeverity::Warning => warn!(
            tenant_id = tenant_id,
            user_id = user_id,
            state = state,
            recoverable = recoverable,
            error = %err,
            "Handler failed, conversation restored"
        ),
        severity => error!(
            tenant_id = tenant_id,
            user_id = user_id,
            state = state,
            recoverable = recoverable,
            severity = %severity,
            error = %err,
            "Handler failed, conversation restored"
        ),
    }
}

/// Log a created order
pub fn log_order_created(tenant_id: &str, user_id: &str, order_id: &str, order_number: &str) {
    info!(
        tenant_id = tenant_id,
        user_id = user_id,
        order_id = order_id,
        order_number = order_number,
        "Order created"
    );
}

/// Log an out-of-band payment result
pub fn log_payment_result(tenant_id: &str, user_id: &str, order_id: &str, approved: bool) {
    if approved {
        info!(
            tenant_id = tenant_id,
            user_id = user_id,
            order_id = order_id,
            "Payment approved"
        );
    } else {
        warn!(
            tenant_id = tenant_id,
            user_id = user_id,
            order_id = order_id,
            "Payment rejected"
        );
    }
}

/// Log a completed sweep pass
pub fn log_sweep(evicted: usize, remaining: usize, busy: usize) {
    if evicted > 0 {
        info!(evicted = evicted, remaining = remaining, busy = busy, "Conversation sweep evicted idle sessions");
    } else {
        debug!(remaining = remaining, busy = busy, "Conversation sweep found nothing to evict");
    }
}
