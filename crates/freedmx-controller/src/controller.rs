use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

use freedmx_frame::{FrameBuffer, SharedFrame, SlicePlan};
use freedmx_transport::UdpEndpoint;
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument, Span};

use crate::config::ControllerConfig;
use crate::error::{ControllerError, Result};
use crate::handshake::{say_goodbye, say_hello};
use crate::liveness::LivenessMonitor;
use crate::scheduler::{IntervalScheduler, Scheduler};
use crate::sink::{ChannelSink, FrameSink};
use crate::stats::{CounterSnapshot, Counters};
use crate::transmitter::Transmitter;

/// Lifecycle of a controller. There is no way back from `Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ControllerState {
    Uninitialized,
    Active,
    Closed,
}

impl fmt::Display for ControllerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ControllerState::Uninitialized => "uninitialized",
            ControllerState::Active => "active",
            ControllerState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Diagnostic snapshot of one controller, for display by the host.
#[derive(Debug, Clone, Serialize)]
pub struct ControllerInfo {
    pub device: SocketAddr,
    pub local_addr: Option<SocketAddr>,
    pub state: ControllerState,
    pub degraded: bool,
    pub refresh_hz: u32,
    pub liveness_monitor: bool,
    pub device_alive: Option<bool>,
    pub counters: CounterSnapshot,
}

/// Drives one freeDMX device: owns the frame, the socket and the timers.
///
/// ```text
/// Uninitialized --activate--> Active --deactivate--> Closed
/// ```
///
/// Activation binds the socket, sends hello and starts the transmit clock
/// (and the liveness monitor when enabled). Deactivation stops the clock,
/// sends goodbye, stops the monitor and releases the socket, in that order.
///
/// If the socket cannot be bound, the controller still becomes `Active` but
/// degraded: nothing is ever sent, and deactivation skips the goodbye.
pub struct Controller {
    config: ControllerConfig,
    frame: SharedFrame,
    plan: SlicePlan,
    counters: Arc<Counters>,
    state: ControllerState,
    session: Option<Session>,
}

/// Everything that exists only while the socket is open.
struct Session {
    endpoint: Arc<UdpEndpoint>,
    cancel: CancellationToken,
    transmit_cancel: CancellationToken,
    monitor_cancel: CancellationToken,
    transmitter: JoinHandle<()>,
    monitor: Option<JoinHandle<()>>,
    /// Parent of every event the session's tasks emit.
    span: Span,
}

impl Controller {
    /// Create a controller with a zeroed frame and its slice plan.
    pub fn new(config: ControllerConfig) -> Self {
        Self {
            config,
            frame: SharedFrame::new(),
            plan: SlicePlan::standard(),
            counters: Arc::new(Counters::new()),
            state: ControllerState::Uninitialized,
            session: None,
        }
    }

    /// Activate with the fixed-rate clock from the configured refresh rate.
    pub async fn activate(&mut self) -> Result<()> {
        self.expect_state(ControllerState::Uninitialized, "activate")?;
        let scheduler = IntervalScheduler::new(self.config.refresh_rate.period());
        self.activate_with_scheduler(scheduler).await
    }

    /// Activate with an explicit clock.
    pub async fn activate_with_scheduler<S: Scheduler>(&mut self, scheduler: S) -> Result<()> {
        self.expect_state(ControllerState::Uninitialized, "activate")?;

        let device = self.config.device_addr();
        let endpoint = match UdpEndpoint::bind(self.config.bind_address, device).await {
            Ok(endpoint) => Arc::new(endpoint),
            Err(err) => {
                warn!(%device, error = %err, "cannot open channel, controller degraded");
                self.state = ControllerState::Active;
                return Ok(());
            }
        };

        let span = info_span!("controller", %device);
        let cancel = CancellationToken::new();
        let transmit_cancel = cancel.child_token();
        let monitor_cancel = cancel.child_token();

        let monitor = self.config.enable_liveness_monitor.then(|| {
            let monitor = LivenessMonitor::new(
                Arc::clone(&endpoint),
                Arc::clone(&self.counters),
                self.config.ack_timeout,
            );
            tokio::spawn(monitor.run(monitor_cancel.clone()).instrument(span.clone()))
        });

        say_hello(&endpoint, &self.counters)
            .instrument(span.clone())
            .await;

        let transmitter = Transmitter::new(
            self.frame.clone(),
            self.plan.clone(),
            Arc::clone(&endpoint),
            Arc::clone(&self.counters),
        );
        let transmitter = tokio::spawn(
            transmitter
                .run(scheduler, transmit_cancel.clone())
                .instrument(span.clone()),
        );

        self.session = Some(Session {
            endpoint,
            cancel,
            transmit_cancel,
            monitor_cancel,
            transmitter,
            monitor,
            span,
        });
        self.state = ControllerState::Active;

        info!(
            %device,
            refresh_hz = self.config.refresh_rate.hz(),
            liveness_monitor = self.config.enable_liveness_monitor,
            "controller activated"
        );
        Ok(())
    }

    /// Stop transmitting, say goodbye and release the socket.
    ///
    /// Returns once both background tasks have finished, so no scheduled
    /// send or timeout can run after this.
    pub async fn deactivate(&mut self) -> Result<()> {
        self.expect_state(ControllerState::Active, "deactivate")?;

        match self.session.take() {
            Some(session) => {
                let span = session.span.clone();
                session.close(&self.counters).instrument(span).await;
            }
            None => debug!("degraded controller closed without goodbye"),
        }

        self.state = ControllerState::Closed;
        info!(
            device = %self.config.device_addr(),
            sent = self.counters.sent(),
            received = self.counters.received(),
            "controller deactivated"
        );
        Ok(())
    }

    /// Write channel values into the frame sent on the next cycle.
    pub fn update(&self, values: &[u8]) {
        self.frame.update(values);
    }

    /// Cloneable write handle for host threads.
    pub fn sink(&self) -> FrameSink {
        FrameSink::new(self.frame.clone())
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    /// Active without a socket, after a failed bind.
    pub fn is_degraded(&self) -> bool {
        self.state == ControllerState::Active && self.session.is_none()
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Local address of the open socket.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.session
            .as_ref()
            .and_then(|session| session.endpoint.local_addr().ok())
    }

    /// Datagrams sent, hello and goodbye included.
    pub fn sent_count(&self) -> u64 {
        self.counters.sent()
    }

    /// Datagrams received from the device. Stays zero without the liveness monitor.
    pub fn received_count(&self) -> u64 {
        self.counters.received()
    }

    pub fn liveness_lost_count(&self) -> u64 {
        self.counters.liveness_lost()
    }

    /// `None` when the liveness monitor is disabled.
    pub fn is_device_alive(&self) -> Option<bool> {
        self.config
            .enable_liveness_monitor
            .then(|| self.counters.device_alive())
    }

    /// Current frame contents.
    pub fn frame(&self) -> FrameBuffer {
        self.frame.snapshot()
    }

    pub fn info(&self) -> ControllerInfo {
        ControllerInfo {
            device: self.config.device_addr(),
            local_addr: self.local_addr(),
            state: self.state,
            degraded: self.is_degraded(),
            refresh_hz: self.config.refresh_rate.hz(),
            liveness_monitor: self.config.enable_liveness_monitor,
            device_alive: self.is_device_alive(),
            counters: self.counters.snapshot(),
        }
    }

    fn expect_state(&self, expected: ControllerState, action: &'static str) -> Result<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(ControllerError::InvalidTransition {
                from: self.state,
                action,
            })
        }
    }
}

impl Session {
    async fn close(self, counters: &Counters) {
        self.transmit_cancel.cancel();
        if let Err(err) = self.transmitter.await {
            warn!(error = %err, "transmitter task failed");
        }

        say_goodbye(&self.endpoint, counters).await;

        self.monitor_cancel.cancel();
        if let Some(monitor) = self.monitor {
            if let Err(err) = monitor.await {
                warn!(error = %err, "liveness monitor task failed");
            }
        }

        self.endpoint.close();
    }
}

impl ChannelSink for Controller {
    fn update(&self, values: &[u8]) {
        Controller::update(self, values);
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        // Dropped while active: stop the tasks even though no goodbye can be sent.
        if let Some(session) = &self.session {
            debug!("controller dropped while active, cancelling tasks");
            session.cancel.cancel();
            session.endpoint.close();
        }
    }
}

impl fmt::Debug for Controller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Controller")
            .field("device", &self.config.device_addr())
            .field("state", &self.state)
            .field("degraded", &self.is_degraded())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;
    use std::time::Duration;

    use freedmx_frame::{FrameAssembler, CHANNEL_COUNT, GOODBYE, HELLO};
    use tokio::net::UdpSocket;

    use super::*;
    use crate::config::RefreshRate;
    use crate::scheduler::{ManualScheduler, ManualTicker};

    async fn device() -> UdpSocket {
        UdpSocket::bind("127.0.0.1:0").await.unwrap()
    }

    fn config_for(device: &UdpSocket) -> ControllerConfig {
        ControllerConfig::default()
            .with_device(device.local_addr().unwrap())
            .with_bind_address(SocketAddr::from(([127, 0, 0, 1], 0)))
    }

    async fn recv_from(device: &UdpSocket) -> (Vec<u8>, SocketAddr) {
        let mut buf = [0u8; 2048];
        let (len, from) =
            tokio::time::timeout(Duration::from_secs(2), device.recv_from(&mut buf))
                .await
                .expect("datagram should arrive")
                .unwrap();
        (buf[..len].to_vec(), from)
    }

    async fn recv(device: &UdpSocket) -> Vec<u8> {
        recv_from(device).await.0
    }

    async fn recv_cycle(device: &UdpSocket) -> Vec<Vec<u8>> {
        let mut slices = Vec::with_capacity(7);
        for _ in 0..7 {
            slices.push(recv(device).await);
        }
        slices
    }

    async fn drain(device: &UdpSocket) -> Vec<Vec<u8>> {
        let mut datagrams = Vec::new();
        let mut buf = [0u8; 2048];
        while let Ok(Ok((len, _))) =
            tokio::time::timeout(Duration::from_millis(200), device.recv_from(&mut buf)).await
        {
            datagrams.push(buf[..len].to_vec());
        }
        datagrams
    }

    async fn active_manual(device: &UdpSocket) -> (Controller, ManualTicker) {
        let mut controller = Controller::new(config_for(device));
        let (scheduler, ticker) = ManualScheduler::new();
        controller.activate_with_scheduler(scheduler).await.unwrap();
        (controller, ticker)
    }

    #[test]
    fn test_state_display() {
        assert_eq!(ControllerState::Uninitialized.to_string(), "uninitialized");
        assert_eq!(ControllerState::Active.to_string(), "active");
        assert_eq!(ControllerState::Closed.to_string(), "closed");
    }

    #[test]
    fn test_new_controller_is_uninitialized() {
        let controller = Controller::new(ControllerConfig::default());
        assert_eq!(controller.state(), ControllerState::Uninitialized);
        assert!(!controller.is_degraded());
        assert_eq!(controller.sent_count(), 0);
        assert_eq!(controller.local_addr(), None);
        assert!(controller.frame().values().iter().all(|v| *v == 0));
    }

    #[tokio::test]
    async fn test_session_order_hello_frames_goodbye() {
        let device = device().await;
        let (mut controller, ticker) = active_manual(&device).await;
        assert_eq!(controller.state(), ControllerState::Active);
        assert!(controller.local_addr().is_some());

        assert_eq!(recv(&device).await, HELLO);

        controller.update(&[255, 128, 0]);
        ticker.tick();
        let first = recv_cycle(&device).await;
        assert_eq!(&first[0][..6], &[0xC1, 0x00, 0x7F, 0xC1, 0x01, 0x00]);
        assert!(first[..6].iter().all(|d| d.len() == 250));
        assert_eq!(first[6].len(), 36);

        ticker.tick();
        let second = recv_cycle(&device).await;
        assert_eq!(first, second);

        controller.deactivate().await.unwrap();
        assert_eq!(recv(&device).await, GOODBYE);
        assert_eq!(controller.state(), ControllerState::Closed);
        assert_eq!(controller.sent_count(), 16);
    }

    #[tokio::test]
    async fn test_interval_cadence_sends_whole_cycles() {
        let device = device().await;
        let config = config_for(&device).with_refresh_rate(RefreshRate::Custom(100));
        let mut controller = Controller::new(config);

        controller.activate().await.unwrap();
        tokio::time::sleep(Duration::from_millis(120)).await;
        controller.deactivate().await.unwrap();

        let datagrams = drain(&device).await;
        assert!(datagrams.len() >= 2 + 7);
        assert_eq!(datagrams.first().unwrap(), &HELLO);
        assert_eq!(datagrams.last().unwrap(), &GOODBYE);

        let frames = &datagrams[1..datagrams.len() - 1];
        assert_eq!(frames.len() % 7, 0);
        assert!(frames.iter().all(|d| d.len() == 250 || d.len() == 36));
        assert_eq!(controller.sent_count(), datagrams.len() as u64);
    }

    #[tokio::test]
    async fn test_bind_failure_degrades_without_sending() {
        let config = ControllerConfig::default()
            .with_device(SocketAddr::from(([127, 0, 0, 1], 10100)))
            .with_bind_address(SocketAddr::from(([192, 0, 2, 1], 0)));
        let mut controller = Controller::new(config);

        controller.activate().await.unwrap();
        assert_eq!(controller.state(), ControllerState::Active);
        assert!(controller.is_degraded());
        assert_eq!(controller.local_addr(), None);

        controller.update(&[1, 2, 3]);
        assert_eq!(&controller.frame().values()[..3], &[1, 2, 3]);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(controller.sent_count(), 0);

        controller.deactivate().await.unwrap();
        assert_eq!(controller.state(), ControllerState::Closed);
        assert!(!controller.is_degraded());
        assert_eq!(controller.sent_count(), 0);
    }

    #[tokio::test]
    async fn test_invalid_transitions() {
        let device = device().await;
        let mut controller = Controller::new(config_for(&device));

        assert_eq!(
            controller.deactivate().await,
            Err(ControllerError::InvalidTransition {
                from: ControllerState::Uninitialized,
                action: "deactivate",
            })
        );

        let (scheduler, _ticker) = ManualScheduler::new();
        controller.activate_with_scheduler(scheduler).await.unwrap();
        let (scheduler, _ticker2) = ManualScheduler::new();
        assert_eq!(
            controller.activate_with_scheduler(scheduler).await,
            Err(ControllerError::InvalidTransition {
                from: ControllerState::Active,
                action: "activate",
            })
        );

        controller.deactivate().await.unwrap();
        let err = controller.activate().await.unwrap_err();
        assert_eq!(err.to_string(), "cannot activate a controller that is closed");
        assert!(controller.deactivate().await.is_err());

        // Hello and goodbye only.
        assert_eq!(controller.sent_count(), 2);
    }

    #[tokio::test]
    async fn test_liveness_monitor_tracks_device() {
        let device = device().await;
        let config = config_for(&device)
            .with_liveness_monitor(true)
            .with_ack_timeout(Duration::from_millis(100));
        let mut controller = Controller::new(config);
        let (scheduler, _ticker) = ManualScheduler::new();
        controller.activate_with_scheduler(scheduler).await.unwrap();

        let (hello, from) = recv_from(&device).await;
        assert_eq!(hello, HELLO);
        assert_eq!(controller.is_device_alive(), Some(false));

        device.send_to(b"ack", from).await.unwrap();
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(controller.received_count(), 1);
        assert_eq!(controller.is_device_alive(), Some(true));

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(controller.liveness_lost_count(), 1);
        assert_eq!(controller.is_device_alive(), Some(false));

        controller.deactivate().await.unwrap();
        assert_eq!(recv(&device).await, GOODBYE);
    }

    #[tokio::test]
    async fn test_without_monitor_nothing_is_received() {
        let device = device().await;
        let (mut controller, _ticker) = active_manual(&device).await;
        assert_eq!(controller.is_device_alive(), None);

        let (_, from) = recv_from(&device).await;
        device.send_to(b"ack", from).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(controller.received_count(), 0);

        controller.deactivate().await.unwrap();
    }

    #[tokio::test]
    async fn test_frames_are_never_torn_on_the_wire() {
        let device = device().await;
        let (mut controller, ticker) = active_manual(&device).await;
        assert_eq!(recv(&device).await, HELLO);

        let sink = controller.sink();
        let stop = Arc::new(AtomicBool::new(false));
        let writer = {
            let stop = stop.clone();
            thread::spawn(move || {
                let low = [0u8; CHANNEL_COUNT];
                let high = [255u8; CHANNEL_COUNT];
                while !stop.load(Ordering::Relaxed) {
                    sink.update(&low);
                    sink.update(&high);
                }
            })
        };

        let mut assembler = FrameAssembler::new();
        for _ in 0..50 {
            ticker.tick();
            let mut values = None;
            for slice in recv_cycle(&device).await {
                values = assembler.push(&slice).unwrap();
            }
            let values = values.expect("cycle should complete a frame");
            assert!(
                values.iter().all(|v| *v == values[0]),
                "torn frame on the wire"
            );
        }

        stop.store(true, Ordering::Relaxed);
        writer.join().unwrap();
        controller.deactivate().await.unwrap();
    }

    #[test]
    fn test_sink_updates_from_host_thread() {
        fn write_all<S: ChannelSink>(sink: &S, value: u8) {
            sink.update(&[value; CHANNEL_COUNT]);
        }

        let controller = Controller::new(ControllerConfig::default());
        let sink = controller.sink();
        thread::spawn(move || write_all(&sink, 7)).join().unwrap();
        assert!(controller.frame().values().iter().all(|v| *v == 7));

        write_all(&controller, 9);
        assert!(controller.frame().values().iter().all(|v| *v == 9));
    }

    #[tokio::test]
    async fn test_info_serializes() {
        let device = device().await;
        let (mut controller, _ticker) = active_manual(&device).await;
        recv(&device).await;

        let info = serde_json::to_value(controller.info()).unwrap();
        assert_eq!(info["state"], "active");
        assert_eq!(info["degraded"], false);
        assert_eq!(info["refresh_hz"], 25);
        assert_eq!(info["device_alive"], serde_json::Value::Null);
        assert_eq!(info["counters"]["sent"], 1);

        controller.deactivate().await.unwrap();
        assert_eq!(controller.info().state, ControllerState::Closed);
    }

    #[tokio::test]
    async fn test_drop_while_active_stops_tasks() {
        let device = device().await;
        let (controller, ticker) = active_manual(&device).await;
        drop(controller);

        tokio::time::timeout(Duration::from_secs(2), async {
            while ticker.tick() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("transmitter should stop after drop");
    }
}
