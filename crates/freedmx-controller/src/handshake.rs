//! Hello and goodbye datagrams bracketing a transmit session.

use freedmx_frame::{GOODBYE, HELLO};
use freedmx_transport::UdpEndpoint;
use tracing::{info, warn};

use crate::stats::Counters;

/// Send the hello sequence. Returns whether it was sent.
pub async fn say_hello(endpoint: &UdpEndpoint, counters: &Counters) -> bool {
    send_handshake(endpoint, counters, &HELLO, "hello").await
}

/// Send the goodbye sequence. Returns whether it was sent.
pub async fn say_goodbye(endpoint: &UdpEndpoint, counters: &Counters) -> bool {
    send_handshake(endpoint, counters, &GOODBYE, "goodbye").await
}

async fn send_handshake(
    endpoint: &UdpEndpoint,
    counters: &Counters,
    payload: &[u8],
    kind: &'static str,
) -> bool {
    match endpoint.send(payload).await {
        Ok(_) => {
            counters.record_sent();
            info!(device = %endpoint.target(), kind, "handshake sent");
            true
        }
        Err(err) => {
            warn!(device = %endpoint.target(), kind, error = %err, "handshake send failed");
            false
        }
    }
}
