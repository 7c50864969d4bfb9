//! # izprime — prime sieves and random prime generation on the iZ set
//!
//! Every prime above 3 has the form `6x − 1` or `6x + 1`. This crate builds
//! two families of prime machinery on that single observation:
//!
//! **Enumeration** — deterministic sieves listing every prime up to a 64-bit
//! bound:
//! - [`sieve_iz::sieve_iz`] — flat sieve over the two residue classes.
//! - [`sieve_iz::sieve_izm`] — segmented variant with a bounded working set.
//! - [`sieve_vx::sieve_vx`] — segment kernel for arbitrary offsets, emitting
//!   prime gaps and switching to probabilistic confirmation when the
//!   deterministic strides can no longer certify primality.
//! - [`classic`] — Eratosthenes (three variants), Euler and Atkin, kept as
//!   independent correctness oracles.
//!
//! **Generation** — randomized search for cryptographic-sized probable
//! primes:
//! - [`prime_gen::search_iz_prime`] — vertical walk down one coprime column
//!   of the iZ-Matrix.
//! - [`prime_gen::random_iz_prime`] — the same search raced across worker
//!   threads, first writer wins.
//! - [`prime_gen::iz_next_prime`] — nearest prime above/below a base via
//!   pre-sieved segment scanning.
//!
//! ## Module organization
//!
//! - [`bitmap`] — packed bit array: stride clearing, segment duplication,
//!   content hashing.
//! - [`iz`] — the residue algebra: `6x + i`, column solving, modular
//!   inverses, segment sizing, base-segment construction.
//! - [`primes`] / [`vx`] — result containers with SHA-256 content hashes and
//!   host-order binary file formats.
//!
//! All probabilistic primality decisions use [`TEST_ROUNDS`] Miller–Rabin
//! rounds; callers needing stronger guarantees layer additional rounds on
//! the returned values.

use rug::integer::IsPrime;
use rug::rand::RandState;
use rug::Integer;
use std::path::PathBuf;

pub mod bitmap;
pub mod classic;
pub mod error;
pub mod iz;
pub mod prime_gen;
pub mod primes;
pub mod sieve_iz;
pub mod sieve_vx;
pub mod vx;

pub use error::{IzError, Result};
pub use iz::IzClass;
pub use primes::PrimeList;
pub use vx::{GapStats, VxAssets, VxObj};

/// Default segment width: `5·7·11·13·17·19`, covering 6·vx ≈ 9.7M naturals.
pub const VX6: u64 = 5 * 7 * 11 * 13 * 17 * 19;

/// Miller–Rabin rounds used by every probabilistic primality decision.
pub const TEST_ROUNDS: u32 = 25;

/// Directory where result files are written, created lazily with mode 0700.
pub const OUTPUT_DIR: &str = "output";

/// Estimate pi(n) for container capacity hints: 1.3·n/ln(n), never below a
/// small floor so tiny bounds still get a sane allocation.
pub(crate) fn estimate_pi(n: u64) -> usize {
    if n < 10 {
        return 8;
    }
    let nf = n as f64;
    (1.3 * nf / nf.ln()) as usize
}

/// Probabilistic primality with a cheap pre-screen: two fast rounds first,
/// the full budget only for survivors. Composites usually fail within two
/// rounds, so the screen rejects them without paying for the rest.
pub fn screened_probable_prime(candidate: &Integer, rounds: u32) -> bool {
    if rounds > 2 && candidate.is_probably_prime(2) == IsPrime::No {
        return false;
    }
    candidate.is_probably_prime(rounds) != IsPrime::No
}

/// A fresh GMP random state seeded from the operating system's entropy
/// source. Each worker seeds its own state so parallel searches diverge.
pub(crate) fn os_seeded_randstate() -> RandState<'static> {
    use rand::RngCore;

    let mut seed_bytes = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut seed_bytes);
    let mut state = RandState::new();
    state.seed(&Integer::from_digits(&seed_bytes, rug::integer::Order::Lsf));
    state
}

/// Ensure the output directory exists and return its path. Created with
/// permissions 0700 on Unix.
pub fn output_dir() -> Result<PathBuf> {
    let dir = PathBuf::from(OUTPUT_DIR);
    if !dir.is_dir() {
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            std::fs::DirBuilder::new().mode(0o700).create(&dir)?;
        }
        #[cfg(not(unix))]
        {
            std::fs::DirBuilder::new().create(&dir)?;
        }
    }
    Ok(dir)
}
