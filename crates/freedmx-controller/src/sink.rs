use freedmx_frame::SharedFrame;

/// Accepts fresh channel values from the host.
///
/// Implementations must not block on I/O: the host calls this from its own
/// clock and expects it to return immediately.
pub trait ChannelSink {
    /// Write channel values starting at channel 0. Channels past
    /// `values.len()` keep their previous values; input longer than one
    /// universe is truncated.
    fn update(&self, values: &[u8]);
}

/// Cloneable write handle onto a controller's frame.
///
/// Stays valid after the controller closes; writes then simply have no
/// receiver.
#[derive(Debug, Clone)]
pub struct FrameSink {
    frame: SharedFrame,
}

impl FrameSink {
    pub(crate) fn new(frame: SharedFrame) -> Self {
        Self { frame }
    }
}

impl ChannelSink for FrameSink {
    fn update(&self, values: &[u8]) {
        self.frame.update(values);
    }
}
