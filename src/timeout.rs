//! Time-bounded async wrappers.
//!
//! libchrony calls block. Each wrapper runs its report on the blocking pool
//! and gives up after [`ClientConfig::timeout`]. A call that times out keeps
//! running in the background and still closes its session when it returns.
//! A report task that panics yields a data error with
//! [`DataReason::RequestFailed`].

use std::time::Duration;

use chronyscope_core::{ChronyError, ClientConfig, DataReason, Result, RtcData, Source, SourceStats, TrackingStatus};

/// Runs `op` on the blocking pool, bounded by `timeout`.
async fn within<T, F>(timeout: Duration, op: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    let task = tokio::task::spawn_blocking(op);
    match tokio::time::timeout(timeout, task).await {
        Ok(Ok(result)) => result,
        // Panicked or cancelled report task.
        Ok(Err(join)) => Err(ChronyError::data(
            DataReason::RequestFailed,
            format!("report task failed: {join}"),
        )),
        Err(_) => {
            tracing::warn!(?timeout, "chrony report timed out");
            Err(ChronyError::connection(format!(
                "timed out after {timeout:?} waiting for chronyd"
            )))
        }
    }
}

/// [`tracking_with`](crate::tracking_with), bounded by `config.timeout`.
///
/// # Errors
/// As the blocking call, or a connection error on timeout.
pub async fn tracking_within(config: ClientConfig) -> Result<TrackingStatus> {
    within(config.timeout, move || crate::tracking_with(&config)).await
}

/// [`sources_with`](crate::sources_with), bounded by `config.timeout`.
///
/// # Errors
/// As the blocking call, or a connection error on timeout.
pub async fn sources_within(config: ClientConfig) -> Result<Vec<Source>> {
    within(config.timeout, move || crate::sources_with(&config)).await
}

/// [`source_stats_with`](crate::source_stats_with), bounded by `config.timeout`.
///
/// # Errors
/// As the blocking call, or a connection error on timeout.
pub async fn source_stats_within(config: ClientConfig) -> Result<Vec<SourceStats>> {
    within(config.timeout, move || crate::source_stats_with(&config)).await
}

/// [`rtc_data_with`](crate::rtc_data_with), bounded by `config.timeout`.
///
/// # Errors
/// As the blocking call, or a connection error on timeout.
pub async fn rtc_data_within(config: ClientConfig) -> Result<RtcData> {
    within(config.timeout, move || crate::rtc_data_with(&config)).await
}
