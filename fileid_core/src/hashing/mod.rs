//! Content fingerprinting
//!
//! This module computes the ed2k fingerprint AniDB uses to identify a file:
//! a chunked MD4 over the file bytes. Hashing is streaming and never holds
//! more than one chunk in memory.

mod ed2k;

pub use ed2k::{CHUNK_SIZE, Ed2kHasher};

use log::{debug, trace};
use std::fmt;
use std::io::Read;
use std::path::Path;

/// Read buffer size for streaming a file through the hasher.
const READ_BUFFER_SIZE: usize = 256 * 1024;

/// The 16-byte ed2k digest identifying a file's content.
///
/// Renders as 32 lowercase hex characters; a pure function of the file bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; 16]);

impl Fingerprint {
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Uppercase hex rendering, used by the ed2k link format.
    pub fn hex_upper(&self) -> String {
        self.0.iter().map(|b| format!("{b:02X}")).collect()
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl serde::Serialize for Fingerprint {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Compute the fingerprint of an arbitrary byte stream.
pub fn compute_fingerprint<R: Read>(mut reader: R) -> std::io::Result<Fingerprint> {
    let mut hasher = Ed2kHasher::new();
    let mut buffer = vec![0u8; READ_BUFFER_SIZE];

    loop {
        let read = reader.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    trace!("hashed {} bytes", hasher.bytes_processed());
    Ok(hasher.finalize())
}

/// Compute the fingerprint and size of a file on disk.
///
/// Hashing runs on the blocking thread pool; the async caller only suspends.
/// An unreadable or missing file surfaces the I/O error unchanged — retries,
/// if any, belong to the caller.
pub async fn fingerprint_file(path: &Path) -> std::io::Result<(Fingerprint, u64)> {
    let path = path.to_path_buf();
    let handle = tokio::task::spawn_blocking(move || {
        let file = std::fs::File::open(&path)?;
        let size = file.metadata()?.len();
        let fingerprint = compute_fingerprint(std::io::BufReader::new(file))?;
        Ok::<_, std::io::Error>((fingerprint, size))
    });

    let (fingerprint, size) = handle
        .await
        .map_err(|e| std::io::Error::other(format!("hashing task failed: {e}")))??;

    debug!("fingerprint {fingerprint} for {size} byte file");
    Ok((fingerprint, size))
}

/// Render the standard ed2k link for a named file.
///
/// Format: `ed2k://|file|<urlencoded-name>|<size>|<HASH-uppercase>|/`
pub fn ed2k_link(name: &str, size: u64, fingerprint: &Fingerprint) -> String {
    format!(
        "ed2k://|file|{}|{}|{}|/",
        urlencoding::encode(name),
        size,
        fingerprint.hex_upper()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_display_lowercase() {
        let fp = Fingerprint::from_bytes([
            0x31, 0xd6, 0xcf, 0xe0, 0xd1, 0x6a, 0xe9, 0x31, 0xb7, 0x3c, 0x59, 0xd7, 0xe0, 0xc0,
            0x89, 0xc0,
        ]);
        assert_eq!(fp.to_string(), "31d6cfe0d16ae931b73c59d7e0c089c0");
        assert_eq!(fp.hex_upper(), "31D6CFE0D16AE931B73C59D7E0C089C0");
    }

    #[test]
    fn test_compute_fingerprint_from_reader() {
        let fp = compute_fingerprint(std::io::Cursor::new(b"abc")).unwrap();
        assert_eq!(fp.to_string(), "a448017aaf21d8525fc10ae87aa6729d");
    }

    #[test]
    fn test_ed2k_link_format() {
        let fp = compute_fingerprint(std::io::Cursor::new(b"")).unwrap();
        let link = ed2k_link("my episode [group].mkv", 0, &fp);
        assert_eq!(
            link,
            "ed2k://|file|my%20episode%20%5Bgroup%5D.mkv|0|31D6CFE0D16AE931B73C59D7E0C089C0|/"
        );
    }
}
