//! Optional metrics collection for observability.
//!
//! Convenience macros that record through the `metrics` facade when the
//! `metrics` feature is enabled. When disabled, all operations are no-ops.
//!
//! # Usage
//!
//! ```ignore
//! use transcode_core::metrics::{record_counter, record_gauge};
//!
//! record_counter!("coder.send.accepted", 1, "codec" => "rawvideo");
//! record_gauge!("coder.queue.depth", depth as f64);
//! ```
//!
//! # Metric Names
//!
//! - `coder.send.accepted` - units accepted by a coder
//! - `coder.send.busy` - sends rejected because the queues were full
//! - `coder.receive.units` - units handed back to the caller
//! - `coder.algorithm.faults` - algorithm errors surfaced through receive
//! - `coder.queue.depth` - units buffered after a send
//! - `coder.process.duration_ns` - time spent in one algorithm call

/// Record a counter metric (increments by given value).
///
/// When the `metrics` feature is disabled, this is a no-op.
///
/// # Example
///
/// ```ignore
/// use transcode_core::metrics::record_counter;
///
/// record_counter!("coder.send.accepted", 1);
/// record_counter!("coder.algorithm.faults", 1, "codec" => "pcm_s16le");
/// ```
#[macro_export]
#[cfg(feature = "metrics")]
macro_rules! record_counter {
    ($name:expr, $value:expr) => {
        $crate::__metrics::counter!($name).increment($value)
    };
    ($name:expr, $value:expr, $($label_key:expr => $label_value:expr),+ $(,)?) => {
        $crate::__metrics::counter!($name, $($label_key => $label_value),+).increment($value)
    };
}

#[macro_export]
#[cfg(not(feature = "metrics"))]
macro_rules! record_counter {
    ($name:expr, $value:expr) => {
        let _ = ($name, $value);
    };
    ($name:expr, $value:expr, $($label_key:expr => $label_value:expr),+ $(,)?) => {
        let _ = ($name, $value, $($label_key, $label_value),+);
    };
}

/// Record a histogram/distribution metric.
///
/// When the `metrics` feature is disabled, this is a no-op.
///
/// # Example
///
/// ```ignore
/// use transcode_core::metrics::record_histogram;
/// use std::time::Instant;
///
/// let start = Instant::now();
/// // ... do work ...
/// record_histogram!("coder.process.duration_ns", start.elapsed().as_nanos() as f64);
/// ```
#[macro_export]
#[cfg(feature = "metrics")]
macro_rules! record_histogram {
    ($name:expr, $value:expr) => {
        $crate::__metrics::histogram!($name).record($value)
    };
    ($name:expr, $value:expr, $($label_key:expr => $label_value:expr),+ $(,)?) => {
        $crate::__metrics::histogram!($name, $($label_key => $label_value),+).record($value)
    };
}

#[macro_export]
#[cfg(not(feature = "metrics"))]
macro_rules! record_histogram {
    ($name:expr, $value:expr) => {
        let _ = ($name, $value);
    };
    ($name:expr, $value:expr, $($label_key:expr => $label_value:expr),+ $(,)?) => {
        let _ = ($name, $value, $($label_key, $label_value),+);
    };
}

/// Record a gauge metric (absolute value).
///
/// When the `metrics` feature is disabled, this is a no-op.
///
/// # Example
///
/// ```ignore
/// use transcode_core::metrics::record_gauge;
///
/// record_gauge!("coder.queue.depth", queue.len() as f64);
/// ```
#[macro_export]
#[cfg(feature = "metrics")]
macro_rules! record_gauge {
    ($name:expr, $value:expr) => {
        $crate::__metrics::gauge!($name).set($value)
    };
    ($name:expr, $value:expr, $($label_key:expr => $label_value:expr),+ $(,)?) => {
        $crate::__metrics::gauge!($name, $($label_key => $label_value),+).set($value)
    };
}

#[macro_export]
#[cfg(not(feature = "metrics"))]
macro_rules! record_gauge {
    ($name:expr, $value:expr) => {
        let _ = ($name, $value);
    };
    ($name:expr, $value:expr, $($label_key:expr => $label_value:expr),+ $(,)?) => {
        let _ = ($name, $value, $($label_key, $label_value),+);
    };
}

// Re-export macros at module level for convenient imports
pub use record_counter;
pub use record_gauge;
pub use record_histogram;

/// Helper to time an operation and record a histogram.
///
/// Returns the result of the closure and records the duration.
///
/// # Example
///
/// ```ignore
/// use transcode_core::metrics::timed;
///
/// let result = timed("coder.process.duration_ns", || {
///     algorithm.decode(packet, &mut ctx)
/// });
/// ```
#[inline]
pub fn timed<F, R>(metric_name: &'static str, f: F) -> R
where
    F: FnOnce() -> R,
{
    #[cfg(feature = "metrics")]
    {
        let start = std::time::Instant::now();
        let result = f();
        record_histogram!(metric_name, start.elapsed().as_nanos() as f64);
        result
    }

    #[cfg(not(feature = "metrics"))]
    {
        let _ = metric_name;
        f()
    }
}
