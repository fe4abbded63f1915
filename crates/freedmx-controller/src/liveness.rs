//! Device liveness tracking from inbound traffic.
//!
//! Any datagram from the device re-arms a timeout. If the timeout fires
//! before the next datagram, the device is reported lost: a warning is
//! logged and a counter bumped. Nothing else happens; transmission carries
//! on unchanged.

use std::sync::Arc;
use std::time::Duration;

use freedmx_transport::{TransportError, UdpEndpoint, RECV_BUFFER_SIZE};
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::stats::Counters;

/// Listens on the controller's socket and tracks device silence.
pub struct LivenessMonitor {
    endpoint: Arc<UdpEndpoint>,
    counters: Arc<Counters>,
    ack_timeout: Duration,
}

impl LivenessMonitor {
    pub fn new(endpoint: Arc<UdpEndpoint>, counters: Arc<Counters>, ack_timeout: Duration) -> Self {
        Self {
            endpoint,
            counters,
            ack_timeout,
        }
    }

    /// Run until `cancel` fires or the endpoint shuts down.
    ///
    /// The timeout is only armed after the first inbound datagram, and fires
    /// at most once per silence.
    pub async fn run(self, cancel: CancellationToken) {
        let mut buf = [0u8; RECV_BUFFER_SIZE];
        let timeout = sleep(self.ack_timeout);
        tokio::pin!(timeout);
        let mut armed = false;
        let mut errors = ErrorStreak::default();

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                () = &mut timeout, if armed => {
                    armed = false;
                    self.counters.record_liveness_lost();
                    warn!(
                        device = %self.endpoint.target(),
                        timeout_ms = self.ack_timeout.as_millis() as u64,
                        "acknowledge timeout, device silent"
                    );
                }
                received = self.endpoint.recv(&mut buf) => match received {
                    Ok((size, from)) => {
                        let failed = errors.clear();
                        if failed > 0 {
                            debug!(failed, "receive recovered");
                        }
                        if !armed && !self.counters.device_alive() {
                            info!(device = %from, "device traffic observed");
                        }
                        self.counters.record_received();
                        debug!(%from, size, "device datagram");
                        timeout.as_mut().reset(Instant::now() + self.ack_timeout);
                        armed = true;
                    }
                    Err(TransportError::Shutdown) => break,
                    Err(err) => {
                        if errors.record() {
                            warn!(
                                device = %self.endpoint.target(),
                                error = %err,
                                "receive failed, repeats suppressed until traffic resumes"
                            );
                        } else {
                            trace!(error = %err, "receive failed");
                        }
                    }
                },
            }
        }

        debug!(device = %self.endpoint.target(), "liveness monitor stopped");
    }
}

/// Collapses a run of receive errors into a single warning.
#[derive(Debug, Default)]
struct ErrorStreak {
    count: u64,
}

impl ErrorStreak {
    /// Count one failure. True only for the first failure of a streak.
    fn record(&mut self) -> bool {
        self.count = self.count.saturating_add(1);
        self.count == 1
    }

    /// End the streak, returning how many failures it held.
    fn clear(&mut self) -> u64 {
        std::mem::take(&mut self.count)
    }
}

impl std::fmt::Debug for LivenessMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LivenessMonitor")
            .field("device", &self.endpoint.target())
            .field("ack_timeout", &self.ack_timeout)
            .finish()
    }
}
