//! Streaming chunked-MD4 (ed2k) hasher
//!
//! AniDB identifies files by the ed2k hash: the file is cut into 9,728,000-byte
//! chunks, each chunk is MD4-hashed, and the fingerprint is the MD4 of the
//! concatenated chunk digests. Files of at most one chunk use the single chunk
//! digest directly.

use crate::hashing::Fingerprint;
use md4::{Digest, Md4};

/// Canonical ed2k chunk size in bytes.
pub const CHUNK_SIZE: usize = 9_728_000;

/// Incremental ed2k hasher. Feed bytes with [`update`](Ed2kHasher::update),
/// then call [`finalize`](Ed2kHasher::finalize). Holds at most one chunk of
/// input in memory regardless of file size.
pub struct Ed2kHasher {
    /// Partial chunk awaiting either completion or end-of-stream.
    chunk: Vec<u8>,
    /// Digests of completed chunks, in order.
    digests: Vec<[u8; 16]>,
}

impl Ed2kHasher {
    pub fn new() -> Self {
        Self {
            chunk: Vec::new(),
            digests: Vec::new(),
        }
    }

    /// Append bytes to the stream, hashing each chunk as soon as it fills.
    pub fn update(&mut self, data: &[u8]) {
        let mut remaining = data;

        while !remaining.is_empty() {
            let space = CHUNK_SIZE - self.chunk.len();
            let take = remaining.len().min(space);

            self.chunk.extend_from_slice(&remaining[..take]);
            remaining = &remaining[take..];

            if self.chunk.len() == CHUNK_SIZE {
                self.flush_chunk();
            }
        }
    }

    /// Total bytes consumed so far.
    pub fn bytes_processed(&self) -> u64 {
        self.digests.len() as u64 * CHUNK_SIZE as u64 + self.chunk.len() as u64
    }

    /// Finish the stream and produce the fingerprint.
    ///
    /// A trailing partial chunk is hashed as the final chunk. An empty stream
    /// still produces one digest (of the empty buffer). A stream of exactly
    /// n whole chunks produces exactly n digests: the empty remainder is not
    /// hashed as an extra chunk.
    pub fn finalize(mut self) -> Fingerprint {
        if !self.chunk.is_empty() || self.digests.is_empty() {
            self.flush_chunk();
        }

        if self.digests.len() == 1 {
            return Fingerprint::from_bytes(self.digests[0]);
        }

        let mut outer = Md4::new();
        for digest in &self.digests {
            outer.update(digest);
        }
        Fingerprint::from_bytes(outer.finalize().into())
    }

    fn flush_chunk(&mut self) {
        let mut hasher = Md4::new();
        hasher.update(&self.chunk);
        self.digests.push(hasher.finalize().into());
        self.chunk.clear();
    }
}

impl Default for Ed2kHasher {
    fn default() -> Self {
        Self::new()
    }
}
