use crate::controller::ControllerState;

/// Errors that can occur in controller operations.
///
/// Runtime failures (send errors, bind failures, liveness timeouts) are
/// logged and counted rather than returned; only misuse of the lifecycle
/// surfaces here.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ControllerError {
    /// The lifecycle operation is not allowed from the current state.
    #[error("cannot {action} a controller that is {from}")]
    InvalidTransition {
        from: ControllerState,
        action: &'static str,
    },
}

pub type Result<T> = std::result::Result<T, ControllerError>;
