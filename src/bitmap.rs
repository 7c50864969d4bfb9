//! # Bitmap — packed bit array for sieve segments
//!
//! Fixed-capacity bit storage backing every sieve in the crate. Bits are
//! packed into `u64` words: bit `i` lives in word `i / 64` at position
//! `i % 64`, giving an 8× memory reduction over `Vec<bool>` and hardware
//! `POPCNT` counting. A set bit means the index is still a prime candidate;
//! a clear bit means it was eliminated.
//!
//! Beyond single-bit access the array supports the whole-array operations
//! the sieves are built from:
//!
//! 1. **Stride clearing** (`clear_stride`) — the inner loop of every sieve:
//!    eliminate `start, start + step, start + 2·step, …` up to an inclusive
//!    limit.
//! 2. **Segment duplication** (`duplicate_segment`) — tile a pre-sieved
//!    prefix across the rest of the array when growing a base segment by the
//!    next prime factor.
//! 3. **Content hashing** (`content_hash`) — SHA-256 over the word bytes,
//!    used to fingerprint persisted bitmaps.
//!
//! Capacity never changes after creation. Words beyond `len` are kept clear
//! so that hashing and counting stay deterministic.

use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;

use crate::error::{IzError, Result};

/// Fixed-size packed bit array.
#[derive(Clone)]
pub struct Bitmap {
    words: Vec<u64>,
    len: usize,
}

impl Bitmap {
    /// Create a bitmap of `len` bits, all clear.
    pub fn new(len: usize) -> Self {
        let num_words = len.div_ceil(64);
        Bitmap {
            words: vec![0u64; num_words],
            len,
        }
    }

    /// Create a bitmap of `len` bits, all set.
    pub fn new_all_set(len: usize) -> Self {
        let mut bitmap = Bitmap::new(len);
        bitmap.set_all();
        bitmap
    }

    /// Number of bits in the array.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the array has zero length.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Set every bit. Unused high bits in the last word stay clear.
    pub fn set_all(&mut self) {
        self.words.fill(u64::MAX);
        let extra = self.words.len() * 64 - self.len;
        if extra > 0 {
            if let Some(last) = self.words.last_mut() {
                *last >>= extra;
            }
        }
    }

    /// Clear every bit.
    pub fn clear_all(&mut self) {
        self.words.fill(0);
    }

    /// Get bit `index`.
    ///
    /// # Panics
    /// Panics in debug builds if `index >= len`.
    #[inline]
    pub fn get(&self, index: usize) -> bool {
        debug_assert!(
            index < self.len,
            "bitmap index out of bounds: {} >= {}",
            index,
            self.len
        );
        self.words[index / 64] & (1u64 << (index % 64)) != 0
    }

    /// Set bit `index` to 1.
    #[inline]
    pub fn set(&mut self, index: usize) {
        debug_assert!(index < self.len);
        self.words[index / 64] |= 1u64 << (index % 64);
    }

    /// Clear bit `index` to 0.
    #[inline]
    pub fn clear(&mut self, index: usize) {
        debug_assert!(index < self.len);
        self.words[index / 64] &= !(1u64 << (index % 64));
    }

    /// Flip bit `index`.
    #[inline]
    pub fn flip(&mut self, index: usize) {
        debug_assert!(index < self.len);
        self.words[index / 64] ^= 1u64 << (index % 64);
    }

    /// Count the set bits using hardware POPCNT.
    pub fn count_ones(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Clear `start, start + step, start + 2·step, …` while the index stays
    /// `<= limit`. The limit is inclusive: callers walk inclusive index
    /// ranges and every marked index up to the last readable one must be
    /// eliminated.
    pub fn clear_stride(&mut self, step: usize, start: usize, limit: usize) {
        debug_assert!(step > 0, "stride step must be positive");
        debug_assert!(limit < self.len, "stride limit {} >= len {}", limit, self.len);
        let mut index = start;
        while index <= limit {
            self.words[index / 64] &= !(1u64 << (index % 64));
            index += step;
        }
    }

    /// Copy `len` bits from `src` starting at `src_index` into `self`
    /// starting at `dst_index`.
    pub fn copy_range(&mut self, dst_index: usize, src: &Bitmap, src_index: usize, len: usize) {
        debug_assert!(src_index + len <= src.len);
        debug_assert!(dst_index + len <= self.len);
        for i in 0..len {
            if src.get(src_index + i) {
                self.set(dst_index + i);
            } else {
                self.clear(dst_index + i);
            }
        }
    }

    /// Tile the pattern in `[start, start + seg_size)` across the next
    /// `k - 1` windows, so that after the call every range
    /// `[start + j·seg_size, start + (j+1)·seg_size)` for `j in 1..k` is a
    /// bitwise copy of the first.
    pub fn duplicate_segment(&mut self, start: usize, seg_size: usize, k: usize) {
        debug_assert!(start + seg_size * k <= self.len);
        for j in 1..k {
            let dst = start + j * seg_size;
            for i in 0..seg_size {
                if self.get(start + i) {
                    self.set(dst + i);
                } else {
                    self.clear(dst + i);
                }
            }
        }
    }

    /// The backing words as host-order bytes.
    fn word_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.words.len() * 8);
        for w in &self.words {
            bytes.extend_from_slice(&w.to_ne_bytes());
        }
        bytes
    }

    /// SHA-256 of the word bytes in host order.
    pub fn content_hash(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(self.word_bytes());
        hasher.finalize().into()
    }

    /// Serialize to a binary file: bit count, word bytes, 32-byte hash.
    /// Written atomically via a temporary sibling.
    pub fn write_file(&self, path: &Path) -> Result<()> {
        let bytes = self.word_bytes();
        let mut buf = Vec::with_capacity(8 + bytes.len() + 32);
        buf.extend_from_slice(&(self.len as u64).to_ne_bytes());
        buf.extend_from_slice(&bytes);
        buf.extend_from_slice(&self.content_hash());
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, &buf)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Read a bitmap back, validating the stored hash.
    pub fn read_file(path: &Path) -> Result<Bitmap> {
        let data = fs::read(path)?;
        if data.len() < 8 + 32 {
            return Err(IzError::IntegrityFailed);
        }
        let len = read_u64_ne(&data) as usize;
        let num_words = len.div_ceil(64);
        let body = &data[8..];
        if body.len() != num_words * 8 + 32 {
            return Err(IzError::IntegrityFailed);
        }
        let mut words = Vec::with_capacity(num_words);
        for chunk in body[..num_words * 8].chunks_exact(8) {
            words.push(read_u64_ne(chunk));
        }
        let bitmap = Bitmap { words, len };
        if bitmap.content_hash() != body[num_words * 8..] {
            return Err(IzError::IntegrityFailed);
        }
        Ok(bitmap)
    }
}

/// Read a host-order u64 from the first 8 bytes of a slice.
pub(crate) fn read_u64_ne(bytes: &[u8]) -> u64 {
    let mut arr = [0u8; 8];
    arr.copy_from_slice(&bytes[..8]);
    u64::from_ne_bytes(arr)
}
