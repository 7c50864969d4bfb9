//! # VX containers — prime-gap lists and shared sieve assets
//!
//! A [`VxObj`] holds the result of sieving one `vx`-wide segment of the
//! iZ-Matrix at offset `y`: the 16-bit gaps between consecutive primes found
//! in the segment, plus two observational counters. Gaps rather than primes
//! because at cryptographic offsets each prime needs hundreds of bytes while
//! gaps stay tiny; walking `iZ(y·vx, +1)` plus the prefix sums of the gaps
//! reproduces the primes in ascending order.
//!
//! [`VxAssets`] bundles what every segment at the same width shares: the
//! root primes up to `vx` and the pre-sieved base bitmap pair. Built once
//! per batch and borrowed by every [`sieve_vx`](crate::sieve_vx::sieve_vx)
//! call; never rebuilt per segment.
//!
//! File layout of a gap list: `y_len` (usize) counting the ASCII-decimal `y`
//! bytes plus a terminating NUL, the `y` bytes and NUL, `p_count` (usize),
//! `p_count` 16-bit gaps, 32-byte SHA-256 of the gap bytes. Host byte order
//! throughout; the canonical `.vx` extension is appended when absent. The
//! gap buffer is sized from the stored `p_count` only after that field is
//! read.

use sha2::{Digest, Sha256};
use std::fs;
use std::mem::size_of;
use std::path::{Path, PathBuf};
use tracing::error;

use crate::bitmap::Bitmap;
use crate::error::{IzError, Result};
use crate::iz::construct_base_segment;
use crate::primes::PrimeList;
use crate::sieve_iz::sieve_iz;

/// Canonical extension for serialized gap lists.
pub const VX_EXT: &str = "vx";

/// Extra bits allocated past `vx` so strides may run past the last index.
pub(crate) const VX_PAD: u64 = 10;

/// Prime gaps discovered in one segment of the iZ-Matrix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VxObj {
    vx: u64,
    y: String,
    gaps: Vec<u16>,
    /// Bitwise mark operations performed by the deterministic sieve.
    pub bit_ops: u64,
    /// Probabilistic primality tests performed in large mode.
    pub p_test_ops: u64,
}

impl VxObj {
    /// Create an empty gap list for the segment at offset `y`, taking
    /// ownership of the offset string. Fails with
    /// [`IzError::InvalidArgument`] unless `y` is a non-empty decimal
    /// string.
    pub fn new(vx: u64, y: impl Into<String>) -> Result<Self> {
        let y = validate_y(y.into())?;
        Ok(VxObj {
            vx,
            y,
            gaps: Vec::with_capacity((vx / 2) as usize),
            bit_ops: 0,
            p_test_ops: 0,
        })
    }

    #[inline]
    pub fn vx(&self) -> u64 {
        self.vx
    }

    /// The segment offset as a decimal string.
    #[inline]
    pub fn y(&self) -> &str {
        &self.y
    }

    /// The recorded gaps.
    #[inline]
    pub fn gaps(&self) -> &[u16] {
        &self.gaps
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.gaps.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.gaps.is_empty()
    }

    /// Append the gap to the next prime.
    #[inline]
    pub fn push_gap(&mut self, gap: u16) {
        self.gaps.push(gap);
    }

    /// Release the capacity slack left over from the initial estimate.
    pub fn trim(&mut self) {
        self.gaps.shrink_to_fit();
    }

    /// Count the named small gaps: twins (gap 2), cousins (gap 4) and sexy
    /// pairs (gap 6).
    pub fn gap_stats(&self) -> GapStats {
        let mut stats = GapStats::default();
        for &gap in &self.gaps {
            match gap {
                2 => stats.twins += 1,
                4 => stats.cousins += 1,
                6 => stats.sexy += 1,
                _ => {}
            }
        }
        stats
    }

    fn gap_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.gaps.len() * 2);
        for g in &self.gaps {
            bytes.extend_from_slice(&g.to_ne_bytes());
        }
        bytes
    }

    /// SHA-256 over the gap bytes in host order.
    pub fn content_hash(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(self.gap_bytes());
        hasher.finalize().into()
    }

    /// Write the gap list to a binary file, appending the `.vx` extension
    /// when absent. Returns the path actually written.
    pub fn write_file(&self, path: &Path) -> Result<PathBuf> {
        let path = canonical_vx_path(path);
        let gap_bytes = self.gap_bytes();
        let y_len = self.y.len() + 1;
        let mut buf =
            Vec::with_capacity(2 * size_of::<usize>() + y_len + gap_bytes.len() + 32);
        buf.extend_from_slice(&y_len.to_ne_bytes());
        buf.extend_from_slice(self.y.as_bytes());
        buf.push(0);
        buf.extend_from_slice(&self.gaps.len().to_ne_bytes());
        buf.extend_from_slice(&gap_bytes);
        buf.extend_from_slice(&self.content_hash());
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, &buf)?;
        fs::rename(&tmp, &path)?;
        Ok(path)
    }

    /// Read a gap list for a segment of width `vx` back from `path`,
    /// appending the `.vx` extension when absent and validating the stored
    /// hash. A hash mismatch discards the partially read object.
    pub fn read_file(vx: u64, path: &Path) -> Result<VxObj> {
        let path = canonical_vx_path(path);
        let data = fs::read(&path)?;

        let mut offset = 0usize;
        let y_len = read_usize_ne(&data, &mut offset)?;
        if y_len == 0 || offset + y_len > data.len() {
            error!(path = %path.display(), "gap list header is malformed");
            return Err(IzError::IntegrityFailed);
        }
        // The stored y includes a terminating NUL.
        let y_raw = &data[offset..offset + y_len - 1];
        if data[offset + y_len - 1] != 0 {
            return Err(IzError::IntegrityFailed);
        }
        offset += y_len;
        let y = std::str::from_utf8(y_raw)
            .map_err(|_| IzError::InvalidArgument("stored y is not valid text".into()))?
            .to_owned();

        let p_count = read_usize_ne(&data, &mut offset)?;
        let expected_len = p_count
            .checked_mul(2)
            .and_then(|bytes| bytes.checked_add(offset + 32));
        if expected_len != Some(data.len()) {
            error!(path = %path.display(), "gap list body is malformed");
            return Err(IzError::IntegrityFailed);
        }
        let mut gaps = Vec::with_capacity(p_count);
        for chunk in data[offset..offset + p_count * 2].chunks_exact(2) {
            gaps.push(u16::from_ne_bytes([chunk[0], chunk[1]]));
        }
        offset += p_count * 2;

        let obj = VxObj {
            vx,
            y: validate_y(y)?,
            gaps,
            bit_ops: 0,
            p_test_ops: 0,
        };
        if obj.content_hash() != data[offset..] {
            error!(path = %path.display(), "gap list hash mismatch");
            return Err(IzError::IntegrityFailed);
        }
        Ok(obj)
    }
}

/// Counts of the named prime-pair gaps inside one segment.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct GapStats {
    /// Gaps of 2 (twin primes).
    pub twins: u64,
    /// Gaps of 4 (cousin primes).
    pub cousins: u64,
    /// Gaps of 6 (sexy prime pairs).
    pub sexy: u64,
}

/// A segment offset must be a non-empty decimal string.
fn validate_y(y: String) -> Result<String> {
    if y.is_empty() || !y.bytes().all(|b| b.is_ascii_digit()) {
        return Err(IzError::InvalidArgument(format!(
            "segment offset {:?} is not a decimal string",
            y
        )));
    }
    Ok(y)
}

/// Append the `.vx` extension unless the path already carries it.
fn canonical_vx_path(path: &Path) -> PathBuf {
    match path.extension() {
        Some(ext) if ext == VX_EXT => path.to_path_buf(),
        _ => {
            let mut name = path.as_os_str().to_owned();
            name.push(".");
            name.push(VX_EXT);
            PathBuf::from(name)
        }
    }
}

/// Read a host-order usize at `*offset`, advancing it.
fn read_usize_ne(data: &[u8], offset: &mut usize) -> Result<usize> {
    let word = size_of::<usize>();
    if *offset + word > data.len() {
        return Err(IzError::IntegrityFailed);
    }
    let mut arr = [0u8; size_of::<usize>()];
    arr.copy_from_slice(&data[*offset..*offset + word]);
    *offset += word;
    Ok(usize::from_ne_bytes(arr))
}

/// Shared, read-only assets for sieving segments of width `vx`: the root
/// primes up to `vx` and the pre-sieved base bitmap pair. Immutable after
/// construction.
pub struct VxAssets {
    vx: u64,
    root_primes: PrimeList,
    base_x5: Bitmap,
    base_x7: Bitmap,
}

impl VxAssets {
    /// Build the assets for segments of width `vx`. `vx` must be a product
    /// of consecutive primes starting at 5.
    pub fn new(vx: u64) -> Result<VxAssets> {
        let root_primes = sieve_iz(vx)?;
        let cap = (vx + VX_PAD) as usize;
        let mut base_x5 = Bitmap::new(cap);
        let mut base_x7 = Bitmap::new(cap);
        construct_base_segment(vx, &mut base_x5, &mut base_x7);
        Ok(VxAssets {
            vx,
            root_primes,
            base_x5,
            base_x7,
        })
    }

    #[inline]
    pub fn vx(&self) -> u64 {
        self.vx
    }

    /// All primes up to `vx`, the stride primes for the deterministic pass.
    #[inline]
    pub fn root_primes(&self) -> &PrimeList {
        &self.root_primes
    }

    #[inline]
    pub fn base_x5(&self) -> &Bitmap {
        &self.base_x5
    }

    #[inline]
    pub fn base_x7(&self) -> &Bitmap {
        &self.base_x7
    }
}
