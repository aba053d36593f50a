//! File identification service
//!
//! Ties the content hasher to the protocol client: hash the file, look the
//! fingerprint up, hand back the catalog record. This is the only entry point
//! external collaborators should call; client session and throttle state stay
//! behind it.

use crate::hashing::{Fingerprint, ed2k_link, fingerprint_file};
use crate::protocol::{FileRecord, ProtocolClient, ProtocolError};
use log::{debug, info};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Result of identifying one file. The fingerprint and size are always
/// computed; `record` is `None` when the catalog has no matching entry.
#[derive(Debug, Clone, Serialize)]
pub struct Identification {
    pub fingerprint: Fingerprint,
    pub size: u64,
    pub record: Option<FileRecord>,
}

impl Identification {
    /// Whether the catalog knew this file.
    pub fn is_identified(&self) -> bool {
        self.record.is_some()
    }

    /// The standard ed2k link for this file under the given display name.
    pub fn link(&self, name: &str) -> String {
        ed2k_link(name, self.size, &self.fingerprint)
    }
}

#[derive(Error, Debug)]
pub enum IdentifyError {
    /// The file could not be read. Not retried.
    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The lookup failed at the protocol layer.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

/// Identification entry point, mockable at the seam for callers that drive
/// batches or UIs.
#[async_trait::async_trait]
pub trait FileIdentifier: Send + Sync {
    /// Identify a file on disk by content.
    async fn identify(&self, path: &Path) -> Result<Identification, IdentifyError>;

    /// Identify by an already-known fingerprint and size.
    async fn identify_fingerprint(
        &self,
        fingerprint: &Fingerprint,
        size: u64,
    ) -> Result<Identification, IdentifyError>;
}

/// Production identifier backed by a shared [`ProtocolClient`].
pub struct IdentificationService {
    client: Arc<ProtocolClient>,
}

impl IdentificationService {
    pub fn new(client: Arc<ProtocolClient>) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl FileIdentifier for IdentificationService {
    async fn identify(&self, path: &Path) -> Result<Identification, IdentifyError> {
        debug!("hashing {}", path.display());
        let (fingerprint, size) =
            fingerprint_file(path)
                .await
                .map_err(|source| IdentifyError::Io {
                    path: path.display().to_string(),
                    source,
                })?;
        info!("{} -> {fingerprint} ({size} bytes)", path.display());

        self.identify_fingerprint(&fingerprint, size).await
    }

    async fn identify_fingerprint(
        &self,
        fingerprint: &Fingerprint,
        size: u64,
    ) -> Result<Identification, IdentifyError> {
        let record = self.client.lookup(fingerprint, size).await?;
        match &record {
            Some(record) => info!("identified as fid {}", record.fid),
            None => info!("no catalog entry for {fingerprint}"),
        }
        Ok(Identification {
            fingerprint: *fingerprint,
            size,
            record,
        })
    }
}
