use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::net::UdpSocket;
use tracing::{debug, info};

use crate::error::{Result, TransportError};

/// Wildcard address with an ephemeral port.
pub const DEFAULT_BIND_ADDRESS: SocketAddr =
    SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0));

/// Receive buffer size. Larger than any datagram a device sends back.
pub const RECV_BUFFER_SIZE: usize = 2048;

/// A bound UDP socket paired with the one device it talks to.
///
/// Sends are fire-and-forget: a datagram is either handed to the kernel in
/// full or reported as an error, never retried here.
pub struct UdpEndpoint {
    socket: UdpSocket,
    target: SocketAddr,
    closed: AtomicBool,
}

impl UdpEndpoint {
    /// Bind a local socket and fix the device address for all sends.
    pub async fn bind(local: SocketAddr, target: SocketAddr) -> Result<Self> {
        let socket = UdpSocket::bind(local)
            .await
            .map_err(|source| TransportError::Bind {
                addr: local,
                source,
            })?;

        if matches!(target, SocketAddr::V4(v4) if v4.ip().is_broadcast()) {
            socket.set_broadcast(true)?;
        }

        let local_addr = socket.local_addr()?;
        info!(%local_addr, %target, "udp endpoint bound");

        Ok(Self {
            socket,
            target,
            closed: AtomicBool::new(false),
        })
    }

    /// Send one datagram to the device.
    ///
    /// Returns the number of bytes sent, which always equals `payload.len()`
    /// on success.
    pub async fn send(&self, payload: &[u8]) -> Result<usize> {
        self.send_to(payload, self.target).await
    }

    /// Send one datagram to an explicit peer instead of the device.
    pub async fn send_to(&self, payload: &[u8], peer: SocketAddr) -> Result<usize> {
        if self.is_closed() {
            return Err(TransportError::Shutdown);
        }

        let sent = self.socket.send_to(payload, peer).await?;
        if sent != payload.len() {
            return Err(TransportError::PartialSend {
                sent,
                expected: payload.len(),
            });
        }
        Ok(sent)
    }

    /// Receive the next inbound datagram from any sender.
    pub async fn recv(&self, buf: &mut [u8]) -> Result<(usize, SocketAddr)> {
        if self.is_closed() {
            return Err(TransportError::Shutdown);
        }

        let (len, from) = self.socket.recv_from(buf).await?;
        debug!(%from, size = len, "datagram received");
        Ok((len, from))
    }

    /// Mark the endpoint closed. Later sends and receives fail with
    /// [`TransportError::Shutdown`]; the socket itself is released on drop.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            debug!(target_addr = %self.target, "udp endpoint closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Local address the socket is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.socket.local_addr().map_err(Into::into)
    }

    /// Device address every datagram is sent to.
    pub fn target(&self) -> SocketAddr {
        self.target
    }
}

impl std::fmt::Debug for UdpEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UdpEndpoint")
            .field("local", &self.socket.local_addr().ok())
            .field("target", &self.target)
            .field("closed", &self.is_closed())
            .finish()
    }
}
