//! # PrimeList — ordered prime container with content hashing
//!
//! Holds the output of an enumeration sieve: 64-bit primes in ascending
//! order, created with a capacity hint and trimmed to exact length when the
//! sieve finishes. A SHA-256 hash over the prime bytes (host byte order)
//! fingerprints the content; the binary file format stores it as a trailer
//! and the read path rejects any mismatch.
//!
//! File layout: `p_count` as a signed 32-bit integer, `p_count` 64-bit
//! unsigned primes, 32-byte SHA-256 of the prime bytes. Byte order is
//! host-native, so files are not portable across endianness.

use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;

use crate::bitmap::read_u64_ne;
use crate::error::{IzError, Result};

/// Ordered collection of 64-bit primes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimeList {
    primes: Vec<u64>,
}

impl PrimeList {
    /// Create an empty list with a capacity hint.
    pub fn with_capacity(estimate: usize) -> Self {
        PrimeList {
            primes: Vec::with_capacity(estimate),
        }
    }

    /// Append a prime. Callers append in ascending order.
    #[inline]
    pub fn push(&mut self, p: u64) {
        self.primes.push(p);
    }

    /// Remove and return the last prime.
    pub fn pop(&mut self) -> Option<u64> {
        self.primes.pop()
    }

    /// The last (largest) prime.
    #[inline]
    pub fn last(&self) -> Option<u64> {
        self.primes.last().copied()
    }

    /// Number of primes held.
    #[inline]
    pub fn len(&self) -> usize {
        self.primes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.primes.is_empty()
    }

    /// The primes as a slice.
    #[inline]
    pub fn as_slice(&self) -> &[u64] {
        &self.primes
    }

    /// Release the capacity slack left over from the initial estimate.
    pub fn trim(&mut self) {
        self.primes.shrink_to_fit();
    }

    fn body_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.primes.len() * 8);
        for p in &self.primes {
            bytes.extend_from_slice(&p.to_ne_bytes());
        }
        bytes
    }

    /// SHA-256 over the prime bytes in host order.
    pub fn content_hash(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(self.body_bytes());
        hasher.finalize().into()
    }

    /// Write the list to a binary file, atomically via a temporary sibling.
    pub fn write_file(&self, path: &Path) -> Result<()> {
        let count = i32::try_from(self.primes.len())
            .map_err(|_| IzError::InvalidArgument("prime count exceeds i32 range".into()))?;
        let body = self.body_bytes();
        let mut buf = Vec::with_capacity(4 + body.len() + 32);
        buf.extend_from_slice(&count.to_ne_bytes());
        buf.extend_from_slice(&body);
        buf.extend_from_slice(&self.content_hash());
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, &buf)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Read a list back, recomputing and validating the stored hash.
    pub fn read_file(path: &Path) -> Result<PrimeList> {
        let data = fs::read(path)?;
        if data.len() < 4 + 32 {
            return Err(IzError::IntegrityFailed);
        }
        let mut count_bytes = [0u8; 4];
        count_bytes.copy_from_slice(&data[..4]);
        let count = i32::from_ne_bytes(count_bytes);
        if count < 0 {
            return Err(IzError::IntegrityFailed);
        }
        let count = count as usize;
        let body = &data[4..];
        if body.len() != count * 8 + 32 {
            return Err(IzError::IntegrityFailed);
        }
        let mut primes = Vec::with_capacity(count);
        for chunk in body[..count * 8].chunks_exact(8) {
            primes.push(read_u64_ne(chunk));
        }
        let list = PrimeList { primes };
        if list.content_hash() != body[count * 8..] {
            return Err(IzError::IntegrityFailed);
        }
        Ok(list)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_list() -> PrimeList {
        let mut list = PrimeList::with_capacity(16);
        for p in [2u64, 3, 5, 7, 11, 13, 17, 19, 23, 29] {
            list.push(p);
        }
        list
    }

    #[test]
    fn push_last_pop() {
        let mut list = sample_list();
        assert_eq!(list.len(), 10);
        assert_eq!(list.last(), Some(29));
        assert_eq!(list.pop(), Some(29));
        assert_eq!(list.last(), Some(23));
        assert_eq!(list.len(), 9);
    }

    #[test]
    fn content_hash_is_order_and_value_sensitive() {
        let list = sample_list();
        let mut other = sample_list();
        assert_eq!(list.content_hash(), other.content_hash());
        other.pop();
        other.push(31);
        assert_ne!(list.content_hash(), other.content_hash());
    }

    #[test]
    fn trim_keeps_content() {
        let mut list = PrimeList::with_capacity(1_000);
        list.push(2);
        list.push(3);
        let before = list.content_hash();
        list.trim();
        assert_eq!(list.len(), 2);
        assert_eq!(list.content_hash(), before);
    }

    #[test]
    fn file_round_trip_is_bit_exact() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("primes.bin");
        let list = sample_list();
        list.write_file(&path).expect("write");
        let back = PrimeList::read_file(&path).expect("read");
        assert_eq!(back, list);
        assert_eq!(back.content_hash(), list.content_hash());
    }

    #[test]
    fn tampered_body_fails_integrity() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("primes.bin");
        sample_list().write_file(&path).expect("write");

        let mut data = fs::read(&path).expect("raw read");
        // Flip one bit inside the body (first prime).
        data[4] ^= 0x01;
        fs::write(&path, &data).expect("rewrite");

        assert!(matches!(
            PrimeList::read_file(&path),
            Err(IzError::IntegrityFailed)
        ));
    }

    #[test]
    fn truncated_file_fails_integrity() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("primes.bin");
        sample_list().write_file(&path).expect("write");

        let data = fs::read(&path).expect("raw read");
        fs::write(&path, &data[..data.len() - 9]).expect("rewrite");

        assert!(matches!(
            PrimeList::read_file(&path),
            Err(IzError::IntegrityFailed)
        ));
    }
}
