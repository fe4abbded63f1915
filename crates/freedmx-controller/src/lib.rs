//! freeDMX transmission engine.
//!
//! A [`Controller`] keeps a 512-channel frame for one freeDMX AP device and
//! resends it over UDP at a fixed cadence, bracketed by the hello and
//! goodbye handshakes. Host code writes channel values at any time through
//! [`Controller::update`] or a [`FrameSink`].
//!
//! ```no_run
//! use freedmx_controller::{Controller, ControllerConfig};
//!
//! # async fn run() -> freedmx_controller::Result<()> {
//! let mut controller = Controller::new(ControllerConfig::default());
//! controller.activate().await?;
//! controller.update(&[255, 128, 0]);
//! controller.deactivate().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod controller;
pub mod error;
pub mod handshake;
pub mod liveness;
pub mod scheduler;
pub mod sink;
pub mod stats;
pub mod transmitter;

pub use config::{
    ControllerConfig, RefreshRate, DEFAULT_ACK_TIMEOUT, DEFAULT_DEVICE_ADDRESS,
    DEFAULT_DEVICE_PORT,
};
pub use controller::{Controller, ControllerInfo, ControllerState};
pub use error::{ControllerError, Result};
pub use liveness::LivenessMonitor;
pub use scheduler::{IntervalScheduler, ManualScheduler, ManualTicker, Scheduler};
pub use sink::{ChannelSink, FrameSink};
pub use stats::{CounterSnapshot, Counters};
pub use transmitter::Transmitter;
