//! freeDMX AP transmission engine.
//!
//! Keeps a 512-channel DMX frame, encodes it into the freeDMX wire format
//! and resends it over UDP to one freeDMX AP device at a fixed cadence.
//!
//! # Crate Structure
//!
//! - [`transport`]: UDP endpoint bound to one device
//! - [`frame`]: triplet codec, frame buffer, datagram slicing and reassembly
//! - [`controller`]: controller lifecycle, transmit clock, liveness monitor

/// Re-export transport types.
pub mod transport {
    pub use freedmx_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use freedmx_frame::*;
}

/// Re-export controller types.
pub mod controller {
    pub use freedmx_controller::*;
}
