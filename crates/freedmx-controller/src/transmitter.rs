//! Periodic transmission of the full encoded frame.
//!
//! Every tick copies the frame under its lock, releases the lock, then sends
//! each slice of the plan as its own datagram. A failed slice is logged and
//! skipped; the next tick resends the whole current frame, which repairs
//! anything the device missed.

use std::sync::Arc;

use freedmx_frame::{SharedFrame, SlicePlan, FRAME_SIZE};
use freedmx_transport::UdpEndpoint;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::scheduler::Scheduler;
use crate::stats::Counters;

/// Sends the shared frame to the device once per scheduler tick.
pub struct Transmitter {
    frame: SharedFrame,
    plan: SlicePlan,
    endpoint: Arc<UdpEndpoint>,
    counters: Arc<Counters>,
    snapshot: [u8; FRAME_SIZE],
}

impl Transmitter {
    pub fn new(
        frame: SharedFrame,
        plan: SlicePlan,
        endpoint: Arc<UdpEndpoint>,
        counters: Arc<Counters>,
    ) -> Self {
        Self {
            frame,
            plan,
            endpoint,
            counters,
            snapshot: [0u8; FRAME_SIZE],
        }
    }

    /// Run until `cancel` fires or the scheduler stops.
    ///
    /// Cancellation is only observed between cycles, so a cycle that has
    /// started always sends every slice before the loop exits.
    pub async fn run<S: Scheduler>(mut self, mut scheduler: S, cancel: CancellationToken) {
        debug!(device = %self.endpoint.target(), slices = self.plan.len(), "transmitter started");

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                running = scheduler.tick() => {
                    if !running {
                        break;
                    }
                }
            }

            self.send_cycle().await;
        }

        debug!(device = %self.endpoint.target(), "transmitter stopped");
    }

    /// Send one complete frame. Returns the number of slices sent in full.
    pub async fn send_cycle(&mut self) -> usize {
        self.frame.snapshot_into(&mut self.snapshot);

        let mut sent = 0;
        for (index, slice) in self.plan.iter().enumerate() {
            let Some(payload) = slice.view(&self.snapshot) else {
                warn!(
                    slice = index,
                    offset = slice.offset,
                    size = slice.len,
                    "slice outside frame, cycle cut short"
                );
                break;
            };

            match self.endpoint.send(payload).await {
                Ok(size) => {
                    self.counters.record_sent();
                    sent += 1;
                    trace!(slice = index, size, "slice sent");
                }
                Err(err) => {
                    warn!(slice = index, size = slice.len, error = %err, "slice send failed");
                }
            }

            if slice.is_last {
                break;
            }
        }

        sent
    }
}

impl std::fmt::Debug for Transmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transmitter")
            .field("device", &self.endpoint.target())
            .field("slices", &self.plan.len())
            .finish()
    }
}
