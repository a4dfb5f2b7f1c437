//! Setup/runtime errors surfaced at the gateway binary's outer edges.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("failed to open serial device {path}: {source}")]
    SerialOpen {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to bind TCP listener on port {port}: {source}")]
    ListenerBind {
        port: u16,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to create the event loop's poll instance: {0}")]
    PollCreate(#[source] std::io::Error),
}

impl GatewayError {
    /// Process exit code for this error, per the documented CLI contract.
    pub fn exit_code(&self) -> i32 {
        1
    }
}
