//! AniDB UDP protocol
//!
//! Modular implementation of the file-lookup subset of the AniDB UDP API:
//! - `wire`: command framing, gzip detection, and reply-line tokenizing
//! - `masks`: field-selection bitmasks and the decode order they imply
//! - `record`: mask-driven decoding of FILE payloads
//! - `client`: the session-holding client with tag correlation and ban state

pub mod client;
pub mod error;
pub mod masks;
pub mod record;
pub mod wire;

pub use client::{ClientOptions, ProtocolClient, SessionCredentials};
pub use error::{ProtocolError, Result};
pub use masks::{Amask, Fmask};
pub use record::FileRecord;

/// Protocol version sent with AUTH.
pub const PROTOCOL_VERSION: &str = "3";

/// Maximum UDP packet size (considering PPPoE).
pub const MAX_PACKET_SIZE: usize = 1400;

/// Well-known AniDB API endpoint.
pub const DEFAULT_SERVER: &str = "api.anidb.net";
pub const DEFAULT_PORT: u16 = 9000;

/// Sessions expire 30 minutes after login.
pub const SESSION_TTL_SECS: u64 = 30 * 60;

/// A command with no reply after this long is timed out and its tag retired.
pub const REPLY_DEADLINE_SECS: u64 = 30;

/// How long a ban reply keeps the client in the banned state.
pub const BAN_COOLDOWN_SECS: u64 = 30 * 60;

/// Reply codes used by this implementation. The meanings are fixed by the
/// remote service.
pub mod codes {
    pub const LOGIN_ACCEPTED: u16 = 200;
    pub const LOGIN_ACCEPTED_NEW_VERSION: u16 = 201;
    pub const LOGGED_OUT: u16 = 203;
    pub const FILE: u16 = 220;
    pub const MYLIST: u16 = 221;
    pub const NO_SUCH_FILE: u16 = 320;
    pub const NO_SUCH_ANIME: u16 = 330;
    pub const LOGIN_FAILED: u16 = 500;
    pub const LOGIN_FIRST: u16 = 501;
    pub const ACCESS_DENIED: u16 = 505;
    pub const INVALID_SESSION: u16 = 506;
    pub const BANNED: u16 = 555;
    pub const UNKNOWN_COMMAND: u16 = 598;
    pub const INTERNAL_SERVER_ERROR: u16 = 600;
    pub const OUT_OF_SERVICE: u16 = 601;
    pub const SERVER_BUSY: u16 = 602;

    /// Human-readable description for a reply code.
    pub fn description(code: u16) -> &'static str {
        match code {
            LOGIN_ACCEPTED => "LOGIN ACCEPTED",
            LOGIN_ACCEPTED_NEW_VERSION => "LOGIN ACCEPTED - NEW VERSION AVAILABLE",
            LOGGED_OUT => "LOGGED OUT",
            FILE => "FILE",
            MYLIST => "MYLIST",
            NO_SUCH_FILE => "NO SUCH FILE",
            NO_SUCH_ANIME => "NO SUCH ANIME",
            LOGIN_FAILED => "LOGIN FAILED",
            LOGIN_FIRST => "LOGIN FIRST",
            ACCESS_DENIED => "ACCESS DENIED",
            INVALID_SESSION => "INVALID SESSION",
            BANNED => "BANNED",
            UNKNOWN_COMMAND => "UNKNOWN COMMAND",
            INTERNAL_SERVER_ERROR => "INTERNAL SERVER ERROR",
            OUT_OF_SERVICE => "ANIDB OUT OF SERVICE",
            SERVER_BUSY => "SERVER BUSY",
            _ => "UNKNOWN RESPONSE CODE",
        }
    }

    /// True for either code meaning the session is no longer accepted.
    pub fn is_session_invalid(code: u16) -> bool {
        matches!(code, LOGIN_FIRST | INVALID_SESSION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_constants() {
        assert_eq!(PROTOCOL_VERSION, "3");
        assert_eq!(DEFAULT_SERVER, "api.anidb.net");
        assert_eq!(DEFAULT_PORT, 9000);
        assert_eq!(SESSION_TTL_SECS, 1800);
        assert_eq!(REPLY_DEADLINE_SECS, 30);
    }

    #[test]
    fn test_code_descriptions() {
        assert_eq!(codes::description(200), "LOGIN ACCEPTED");
        assert_eq!(codes::description(555), "BANNED");
        assert_eq!(codes::description(999), "UNKNOWN RESPONSE CODE");
    }

    #[test]
    fn test_session_invalid_codes() {
        assert!(codes::is_session_invalid(501));
        assert!(codes::is_session_invalid(506));
        assert!(!codes::is_session_invalid(500));
    }
}
