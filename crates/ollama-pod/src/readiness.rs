//! Polling a pod until the provider reports a runtime.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::providers::{Pod, PodProvider};

/// Default time to wait for a pod to come up.
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Polling interval when waiting for a pod.
pub const POLL_INTERVAL_SECS: u64 = 5;

/// Bounds for [`wait_ready`].
#[derive(Debug, Clone, Copy)]
pub struct WaitOptions {
    /// Give up after this long.
    pub timeout: Duration,
    /// Delay between status polls.
    pub poll_interval: Duration,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            poll_interval: Duration::from_secs(POLL_INTERVAL_SECS),
        }
    }
}

impl WaitOptions {
    /// Default interval with a custom timeout.
    #[must_use]
    pub fn with_timeout_secs(timeout_secs: u64) -> Self {
        Self {
            timeout: Duration::from_secs(timeout_secs),
            ..Self::default()
        }
    }
}

/// Poll `pod_id` until it has a runtime descriptor.
///
/// Only the "not ready yet" condition is retried; an error from the status
/// call is returned immediately. Terminating a pod that never came up is the
/// caller's job.
///
/// # Errors
/// [`Error::ReadinessTimeout`] once the deadline passes, or the provider error
/// from the status call.
pub async fn wait_ready<P: PodProvider + ?Sized>(
    provider: &P,
    pod_id: &str,
    options: WaitOptions,
) -> Result<Pod> {
    info!(pod_id = %pod_id, timeout_secs = options.timeout.as_secs(), "Waiting for pod to be ready");

    let start = Instant::now();
    let deadline = start + options.timeout;

    while Instant::now() < deadline {
        let pod = provider.get_pod(pod_id).await?;

        debug!(
            pod_id = %pod_id,
            status = %pod.desired_status.map_or_else(|| "unknown".to_string(), |s| s.to_string()),
            elapsed_secs = start.elapsed().as_secs(),
            "Polling pod status"
        );

        if pod.is_ready() {
            info!(pod_id = %pod_id, "Pod is ready");
            return Ok(pod);
        }

        tokio::time::sleep(options.poll_interval).await;
    }

    Err(Error::ReadinessTimeout {
        pod_id: pod_id.to_string(),
        timeout_secs: options.timeout.as_secs(),
    })
}
