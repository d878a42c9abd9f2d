//! Shared metrics recording for storage backends.
//!
//! Every store operation records two metrics through the `metrics` facade:
//! 1. `storage_operations_total` - counter by backend, operation and status
//! 2. `storage_operation_duration_ms` - latency histogram with the same labels
//!
//! Nothing is exported unless the host process installs a recorder.

use crate::Result;
use std::time::Instant;

/// Records operation metrics for a finished storage operation.
///
/// # Arguments
///
/// * `backend` - Backend name (e.g., "sqlite", "memory")
/// * `operation` - Operation name (e.g., "upsert", "search")
/// * `start` - Operation start time from `Instant::now()`
/// * `status` - Operation status ("success" or "error")
pub fn record_operation_metrics(
    backend: &'static str,
    operation: &'static str,
    start: Instant,
    status: &'static str,
) {
    metrics::counter!(
        "storage_operations_total",
        "backend" => backend,
        "operation" => operation,
        "status" => status
    )
    .increment(1);
    metrics::histogram!(
        "storage_operation_duration_ms",
        "backend" => backend,
        "operation" => operation,
        "status" => status
    )
    .record(start.elapsed().as_secs_f64() * 1000.0);
}

/// Runs `op` and records its outcome and latency.
pub fn observe<T>(
    backend: &'static str,
    operation: &'static str,
    op: impl FnOnce() -> Result<T>,
) -> Result<T> {
    let start = Instant::now();
    let result = op();
    let status = if result.is_ok() { "success" } else { "error" };
    if let Err(e) = &result {
        tracing::debug!(backend, operation, error = %e, "Storage operation failed");
    }
    record_operation_metrics(backend, operation, start, status);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_record_operation_metrics_without_recorder() {
        let start = Instant::now();
        thread::sleep(Duration::from_millis(1));
        record_operation_metrics("sqlite", "search", start, "success");
        record_operation_metrics("memory", "upsert", start, "error");
    }

    #[test]
    fn test_observe_passes_results_through() {
        let ok = observe("memory", "count", || Ok(7_u64));
        assert_eq!(ok.unwrap(), 7);

        let err: Result<()> = observe("memory", "count", || Err(Error::Closed));
        assert!(matches!(err, Err(Error::Closed)));
    }
}
