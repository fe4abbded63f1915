use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use serde::Serialize;

/// Packet counters shared by the controller and its background tasks.
#[derive(Debug, Default)]
pub struct Counters {
    sent: AtomicU64,
    received: AtomicU64,
    liveness_lost: AtomicU64,
    device_alive: AtomicBool,
}

impl Counters {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_sent(&self) {
        self.sent.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_received(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
        self.device_alive.store(true, Ordering::Relaxed);
    }

    pub(crate) fn record_liveness_lost(&self) {
        self.liveness_lost.fetch_add(1, Ordering::Relaxed);
        self.device_alive.store(false, Ordering::Relaxed);
    }

    /// Datagrams handed to the socket in full, handshakes included.
    pub fn sent(&self) -> u64 {
        self.sent.load(Ordering::Relaxed)
    }

    /// Datagrams received from the device (liveness monitor only).
    pub fn received(&self) -> u64 {
        self.received.load(Ordering::Relaxed)
    }

    /// Times the device went silent for longer than the ack timeout.
    pub fn liveness_lost(&self) -> u64 {
        self.liveness_lost.load(Ordering::Relaxed)
    }

    /// Whether the device has been heard from within the ack timeout.
    pub fn device_alive(&self) -> bool {
        self.device_alive.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            sent: self.sent(),
            received: self.received(),
            liveness_lost: self.liveness_lost(),
        }
    }
}

/// Point-in-time copy of [`Counters`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CounterSnapshot {
    pub sent: u64,
    pub received: u64,
    pub liveness_lost: u64,
}
