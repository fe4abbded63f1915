use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use freedmx_transport::DEFAULT_BIND_ADDRESS;
use serde::{Deserialize, Serialize};

/// Address of a freeDMX AP on its own access point network.
pub const DEFAULT_DEVICE_ADDRESS: IpAddr = IpAddr::V4(Ipv4Addr::new(192, 168, 4, 1));

/// UDP port the freeDMX AP listens on.
pub const DEFAULT_DEVICE_PORT: u16 = 10100;

/// Silence after the last inbound datagram before the device is considered lost.
pub const DEFAULT_ACK_TIMEOUT: Duration = Duration::from_millis(2000);

/// Fastest cadence accepted for a custom refresh rate.
const MAX_REFRESH_HZ: u32 = 1000;

/// How often the full frame is resent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshRate {
    /// 25 refreshes per second (40 ms).
    #[default]
    Standard,
    /// 2 refreshes per second (500 ms), for slow links and debugging.
    Legacy,
    /// Explicit refreshes per second, clamped to 1..=1000.
    Custom(u32),
}

impl RefreshRate {
    pub fn hz(self) -> u32 {
        match self {
            RefreshRate::Standard => 25,
            RefreshRate::Legacy => 2,
            RefreshRate::Custom(hz) => hz.clamp(1, MAX_REFRESH_HZ),
        }
    }

    /// Interval between two transmit cycles.
    pub fn period(self) -> Duration {
        Duration::from_micros(1_000_000 / u64::from(self.hz()))
    }
}

/// Configuration for one controller (one output line).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Device address.
    pub address: IpAddr,
    /// Device UDP port.
    pub port: u16,
    /// Local address to bind. Default: any interface, ephemeral port.
    pub bind_address: SocketAddr,
    /// Transmit cadence.
    pub refresh_rate: RefreshRate,
    /// Listen for device traffic and report silence longer than `ack_timeout`.
    pub enable_liveness_monitor: bool,
    /// Liveness timeout, re-armed on every inbound datagram.
    #[serde(rename = "ack_timeout_ms", with = "duration_ms")]
    pub ack_timeout: Duration,
}

impl ControllerConfig {
    /// Target a specific device.
    pub fn with_device(mut self, device: SocketAddr) -> Self {
        self.address = device.ip();
        self.port = device.port();
        self
    }

    /// Override the local bind address.
    pub fn with_bind_address(mut self, bind_address: SocketAddr) -> Self {
        self.bind_address = bind_address;
        self
    }

    /// Override the transmit cadence.
    pub fn with_refresh_rate(mut self, refresh_rate: RefreshRate) -> Self {
        self.refresh_rate = refresh_rate;
        self
    }

    /// Enable or disable the liveness monitor.
    pub fn with_liveness_monitor(mut self, enabled: bool) -> Self {
        self.enable_liveness_monitor = enabled;
        self
    }

    /// Override the liveness timeout.
    pub fn with_ack_timeout(mut self, ack_timeout: Duration) -> Self {
        self.ack_timeout = ack_timeout;
        self
    }

    /// Full device socket address.
    pub fn device_addr(&self) -> SocketAddr {
        SocketAddr::new(self.address, self.port)
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_DEVICE_ADDRESS,
            port: DEFAULT_DEVICE_PORT,
            bind_address: DEFAULT_BIND_ADDRESS,
            refresh_rate: RefreshRate::default(),
            enable_liveness_monitor: false,
            ack_timeout: DEFAULT_ACK_TIMEOUT,
        }
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
