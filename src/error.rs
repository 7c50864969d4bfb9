//! Error kinds shared across the crate.
//!
//! Library functions return [`IzError`] through the crate-local [`Result`]
//! alias. Precondition violations in the residue algebra (a non-positive `x`,
//! an out-of-range product) are programming errors and are enforced with
//! debug assertions rather than error values.

use std::io;
use thiserror::Error;

/// Errors surfaced by the sieves, the containers, and the residue algebra.
#[derive(Debug, Error)]
pub enum IzError {
    /// The requested bound is below the minimum the algorithm supports.
    #[error("bound {n} is below the supported minimum {min}")]
    TooSmall { n: u64, min: u64 },

    /// A caller-supplied value failed validation (e.g. a non-numeric y string).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// `gcd(a, m) != 1`: no modular inverse, and no column solution when the
    /// stride prime divides the segment size.
    #[error("arguments are not coprime, no solution exists")]
    NotCoprime,

    /// A bounded search exhausted its attempt or segment cap. Not fatal;
    /// callers may retry or widen the search.
    #[error("no prime found within the search cap")]
    NotFound,

    /// A stored content hash does not match the recomputed hash.
    #[error("content hash mismatch, stored data is corrupt")]
    IntegrityFailed,

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, IzError>;
