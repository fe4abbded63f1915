//! UDP datagram transport for freeDMX devices.
//!
//! This is the lowest layer of freedmx. A [`UdpEndpoint`] owns one local
//! socket and one fixed device address: every datagram the controller emits
//! goes to that address, and every datagram received on the socket counts as
//! device traffic.

pub mod error;
pub mod udp;

pub use error::{Result, TransportError};
pub use udp::{UdpEndpoint, DEFAULT_BIND_ADDRESS, RECV_BUFFER_SIZE};
