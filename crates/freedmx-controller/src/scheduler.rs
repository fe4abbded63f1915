//! Clocks that drive the transmitter.
//!
//! The transmitter only asks for "the next tick"; where ticks come from is
//! up to the runtime. [`IntervalScheduler`] is the fixed-rate clock used in
//! production, [`ManualScheduler`] lets a caller fire ticks explicitly.

use std::future::Future;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{self, Interval, MissedTickBehavior};

/// Source of transmit ticks.
pub trait Scheduler: Send + 'static {
    /// Wait for the next tick. Resolves to `false` once the clock has stopped
    /// for good.
    fn tick(&mut self) -> impl Future<Output = bool> + Send;
}

/// Fixed-rate clock backed by a tokio interval.
///
/// The first tick fires immediately. Ticks missed while a cycle overran are
/// skipped rather than bursted.
#[derive(Debug)]
pub struct IntervalScheduler {
    interval: Interval,
}

impl IntervalScheduler {
    /// Must be called from within a tokio runtime.
    pub fn new(period: Duration) -> Self {
        let mut interval = time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Self { interval }
    }

    pub fn period(&self) -> Duration {
        self.interval.period()
    }
}

impl Scheduler for IntervalScheduler {
    async fn tick(&mut self) -> bool {
        self.interval.tick().await;
        true
    }
}

/// Clock fired by hand through a paired [`ManualTicker`].
#[derive(Debug)]
pub struct ManualScheduler {
    rx: mpsc::UnboundedReceiver<()>,
}

/// Handle that fires ticks on a [`ManualScheduler`].
#[derive(Debug, Clone)]
pub struct ManualTicker {
    tx: mpsc::UnboundedSender<()>,
}

impl ManualScheduler {
    pub fn new() -> (Self, ManualTicker) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { rx }, ManualTicker { tx })
    }
}

impl Scheduler for ManualScheduler {
    async fn tick(&mut self) -> bool {
        self.rx.recv().await.is_some()
    }
}

impl ManualTicker {
    /// Fire one tick. Returns `false` if the scheduler is gone.
    pub fn tick(&self) -> bool {
        self.tx.send(()).is_ok()
    }
}
