//! Structured logging macros.
//!
//! Every line carries a `subsystem` field so JSON logs from the provider,
//! the host channel and the upstream transport can be filtered apart.

/// Helper to create structured log entries with consistent formatting.
#[macro_export]
macro_rules! log_event {
    // Info level with subsystem
    (info, $subsystem:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::info!(
            subsystem = $subsystem,
            $($($field)*,)?
            $msg
        )
    };

    // Warn level with subsystem
    (warn, $subsystem:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::warn!(
            subsystem = $subsystem,
            $($($field)*,)?
            $msg
        )
    };

    // Error level with subsystem
    (error, $subsystem:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::error!(
            subsystem = $subsystem,
            $($($field)*,)?
            $msg
        )
    };

    // Debug level with subsystem
    (debug, $subsystem:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::debug!(
            subsystem = $subsystem,
            $($($field)*,)?
            $msg
        )
    };
}

/// Log a request-related event with standard fields.
#[macro_export]
macro_rules! log_rpc_event {
    (
        $level:ident, $subsystem:expr, $msg:expr, $request_id:expr, $method:expr
        $(, $($field:tt)*)?
    ) => {
        tracing::$level!(
            subsystem = $subsystem,
            request_id = $request_id,
            method = %$method,
            $($($field)*,)?
            $msg
        )
    };
}
