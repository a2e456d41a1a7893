use log::{debug, info};
use std::sync::Once;

static INIT: Once = Once::new();

/// Initialize the logging system
/// This should be called once at application startup
pub fn init_logger() {
    INIT.call_once(|| {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Info) // Default level
            .filter_module("reelflow_lib", log::LevelFilter::Debug) // More verbose for the engine
            .filter_module("reqwest", log::LevelFilter::Warn) // Reduce HTTP noise
            .filter_module("hyper", log::LevelFilter::Warn)
            .filter_module("tokio", log::LevelFilter::Warn) // Reduce tokio noise
            .format_timestamp_secs()
            .format_target(false)
            .format_module_path(false)
            .init();

        // Spans around the publish fan-out are emitted through tracing.
        let subscriber = tracing_subscriber::fmt()
            .with_target(false)
            .with_max_level(tracing::Level::INFO)
            .finish();
        if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
            log::warn!("Tracing subscriber already installed: {}", e);
        }

        info!("Logging system initialized");
    });
}

/// Macro for structured logging with context
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        log::info!($($arg)*)
    };
}

#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        log::debug!($($arg)*)
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        log::warn!($($arg)*)
    };
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        log::error!($($arg)*)
    };
}

/// Structured logging helpers for common patterns
pub struct LogContext;

impl LogContext {
    /// Log a finished reconciliation pass
    pub fn reconciliation_pass(matched: usize, adopted: usize, processing_left: usize) {
        if matched + adopted > 0 {
            info!(
                "Reconcile: matched {} job(s), adopted {} orphan(s), {} still processing",
                matched, adopted, processing_left
            );
        } else {
            debug!(
                "Reconcile: no new completions, {} still processing",
                processing_left
            );
        }
    }

    /// Log one platform outcome of a publish fan-out
    pub fn publish_result(platform: &str, client_id: &str, error: Option<&str>) {
        match error {
            Some(e) => log::warn!("Publish: {} failed for job {}: {}", platform, client_id, e),
            None => info!("Publish: {} succeeded for job {}", platform, client_id),
        }
    }

    /// Log errors with context
    pub fn error_with_context(error: &dyn std::error::Error, context: &str) {
        log::error!("{}: {}", context, error);
    }

    /// Log performance metrics
    pub fn performance_metric(operation: &str, duration_ms: u64, additional_info: Option<&str>) {
        match additional_info {
            Some(info) => debug!(
                "Performance: {} took {}ms ({})",
                operation, duration_ms, info
            ),
            None => debug!("Performance: {} took {}ms", operation, duration_ms),
        }
    }
}

/// Helper for timing operations
pub struct TimedOperation {
    start: std::time::Instant,
    operation: String,
}

impl TimedOperation {
    pub fn new(operation: &str) -> Self {
        debug!("Starting: {}", operation);
        Self {
            start: std::time::Instant::now(),
            operation: operation.to_string(),
        }
    }

    pub fn finish_with_info(self, info: &str) -> u64 {
        let duration = self.start.elapsed().as_millis() as u64;
        LogContext::performance_metric(&self.operation, duration, Some(info));
        duration
    }
}
