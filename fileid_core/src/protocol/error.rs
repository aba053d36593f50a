//! Protocol-specific error types
//!
//! The taxonomy here mirrors how failures propagate: framing problems and
//! timeouts are local to one command, authentication failures and bans affect
//! every subsequent call. "No such file" is a valid negative result and is not
//! represented here at all — lookups return `Option`.

use std::time::Duration;
use thiserror::Error;

/// Result type alias for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Network I/O error on the shared socket.
    #[error("network I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No reply arrived within the command deadline.
    #[error("no reply within {0:?}")]
    Timeout(Duration),

    /// Inbound datagram that could not be tokenized even by the salvage
    /// grammar. The datagram is dropped; any pending command waits out its
    /// deadline.
    #[error("malformed reply: {message}")]
    Framing { message: String },

    /// Bad credentials. Fatal; never retried.
    #[error("authentication failed: {reason}")]
    AuthFailed { reason: String },

    /// Access denied by the server. Fatal; never retried.
    #[error("access denied")]
    AccessDenied,

    /// The server no longer accepts our session token.
    #[error("session expired")]
    SessionExpired,

    /// The server banned this client. Sticky until the cooldown elapses;
    /// every command fails fast in the meantime.
    #[error("banned by server: {reason} (retry in {remaining:?})")]
    Banned {
        reason: String,
        remaining: Duration,
    },

    /// Command was attempted after the client was shut down.
    #[error("client is shut down")]
    Shutdown,

    /// Any other non-success reply, carrying the raw code and text.
    #[error("server error {code}: {message}")]
    Server { code: u16, message: String },
}

impl ProtocolError {
    pub fn framing(message: impl Into<String>) -> Self {
        Self::Framing {
            message: message.into(),
        }
    }

    pub fn auth_failed(reason: impl Into<String>) -> Self {
        Self::AuthFailed {
            reason: reason.into(),
        }
    }

    pub fn server(code: u16, message: impl Into<String>) -> Self {
        Self::Server {
            code,
            message: message.into(),
        }
    }

    /// True for failures local to a single command: they leave session and
    /// throttle state untouched.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Io(_) | Self::Timeout(_) | Self::Framing { .. } | Self::Server { code: 600..=602, .. }
        )
    }

    /// True when the session must be re-established before the next command.
    pub fn requires_relogin(&self) -> bool {
        matches!(self, Self::SessionExpired)
    }
}
