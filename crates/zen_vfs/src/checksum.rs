//! Content checksums.
//!
//! Entry checksums are xxHash3 (64-bit) digests of the uncompressed content.
//! Readers compute them once while indexing; extraction can recompute them
//! while streaming when verification is enabled.

use std::io::{self, Read};
use xxhash_rust::xxh3::{xxh3_64, Xxh3};

const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Checksum of an in-memory buffer.
pub fn checksum(bytes: &[u8]) -> u64 {
    xxh3_64(bytes)
}

/// Incremental checksum, fed one buffer at a time.
pub struct ChecksumHasher {
    inner: Xxh3,
    len: u64,
}

impl Default for ChecksumHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl ChecksumHasher {
    pub fn new() -> Self {
        Self {
            inner: Xxh3::new(),
            len: 0,
        }
    }

    pub fn update(&mut self, bytes: &[u8]) {
        self.inner.update(bytes);
        self.len += bytes.len() as u64;
    }

    /// Number of bytes hashed so far.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn finish(&self) -> u64 {
        self.inner.digest()
    }
}

/// Drain a reader, returning `(byte_count, checksum)`.
pub fn checksum_reader<R: Read + ?Sized>(reader: &mut R) -> io::Result<(u64, u64)> {
    let mut hasher = ChecksumHasher::new();
    let mut buf = vec![0u8; READ_BUFFER_SIZE];
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buf[..n]);
    }
    Ok((hasher.len(), hasher.finish()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_incremental_matches_oneshot() {
        let data: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();

        let mut hasher = ChecksumHasher::new();
        for chunk in data.chunks(4096) {
            hasher.update(chunk);
        }

        assert_eq!(hasher.finish(), checksum(&data));
        assert_eq!(hasher.len(), data.len() as u64);
    }

    #[test]
    fn test_checksum_reader() {
        let data = b"INSTANCE PC_HERO (C_NPC)".to_vec();
        let (len, digest) = checksum_reader(&mut data.as_slice()).unwrap();
        assert_eq!(len, data.len() as u64);
        assert_eq!(digest, checksum(&data));
    }

    #[test]
    fn test_empty() {
        let hasher = ChecksumHasher::new();
        assert!(hasher.is_empty());
        assert_eq!(hasher.finish(), checksum(b""));
    }
}
