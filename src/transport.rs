//! Outbound message transport
//!
//! The server never talks to a socket directly; it hands encoded reply
//! payloads to a [`Transport`]. Inbound delivery is the caller's concern
//! (see `McpServer::run_stdio`).

use std::io::Write;

use crate::error::{DeviceMcpError, Result, TransportError};

/// Accepts encoded reply payloads for delivery to the remote controller
pub trait Transport: Send + Sync {
    /// Deliver one encoded message. Must not block beyond a single send.
    fn send(&self, payload: &str) -> Result<()>;
}

/// Line-delimited JSON on stdout
///
/// Logs go to stderr; stdout belongs to the protocol.
pub struct StdoutTransport;

impl Transport for StdoutTransport {
    fn send(&self, payload: &str) -> Result<()> {
        let stdout = std::io::stdout();
        let mut handle = stdout.lock();
        writeln!(handle, "{}", payload)
            .and_then(|_| handle.flush())
            .map_err(|e| {
                DeviceMcpError::Transport(TransportError::SendFailed {
                    message: e.to_string(),
                })
            })
    }
}
