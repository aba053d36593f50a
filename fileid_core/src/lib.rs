//! Core library for AniDB file identification
//!
//! Three layers, composed bottom-up:
//!
//! - [`hashing`] computes the chunked-MD4 ed2k fingerprint of a file;
//! - [`throttle`] paces every outbound command to the server's rate rules;
//! - [`protocol`] drives the UDP protocol (framing, session, correlation);
//! - [`identification`] ties them together behind one entry point.
//!
//! A process holds exactly one [`protocol::ProtocolClient`] and one
//! [`throttle::RequestThrottle`], shared by reference between callers. Note
//! the throttle is process-local: running several processes against the same
//! account defeats it.
//!
//! ```no_run
//! use fileid_core::identification::{FileIdentifier, IdentificationService};
//! use fileid_core::protocol::{ClientOptions, ProtocolClient, SessionCredentials};
//! use fileid_core::throttle::{RequestThrottle, ThrottleConfig};
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let throttle = Arc::new(RequestThrottle::new(ThrottleConfig::default()));
//! let client = Arc::new(
//!     ProtocolClient::new(
//!         ClientOptions {
//!             client_name: "myclient".into(),
//!             client_version: "1".into(),
//!             ..Default::default()
//!         },
//!         SessionCredentials {
//!             username: "user".into(),
//!             password: "hunter2".into(),
//!         },
//!         throttle,
//!     )
//!     .await?,
//! );
//!
//! let service = IdentificationService::new(client);
//! let result = service.identify("episode.mkv".as_ref()).await?;
//! println!("{:?}", result.record);
//! # Ok(())
//! # }
//! ```

pub mod hashing;
pub mod identification;
pub mod protocol;
pub mod throttle;

pub use hashing::{Fingerprint, compute_fingerprint, ed2k_link, fingerprint_file};
pub use identification::{FileIdentifier, Identification, IdentificationService, IdentifyError};
pub use protocol::{ClientOptions, ProtocolClient, ProtocolError, SessionCredentials};
pub use throttle::{RequestThrottle, ThrottleConfig};
