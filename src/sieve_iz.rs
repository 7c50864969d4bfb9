//! # iZ enumeration sieves
//!
//! Two sieves that enumerate every prime up to a 64-bit bound `n`, both
//! walking only the iZ set (numbers of the form `6x ± 1`) and therefore
//! touching a third of the naive candidate space:
//!
//! 1. [`sieve_iz`] — the flat variant. Two bitmaps of `n/6 + 1` bits, one
//!    per residue class; every surviving index is a prime, and each root
//!    prime eliminates its composites in both classes with two strides.
//!    Simple and fast up to ~10⁸; it is the correctness oracle for the
//!    segmented variant.
//! 2. [`sieve_izm`] — the segmented variant. Picks a segment width `vx` (a
//!    product of small primes), pre-sieves a base segment once, and
//!    processes the range in `vx`-wide slices with a bounded working set
//!    (two bitmaps of `vx` bits, ~0.2 MB each at the default width),
//!    re-cloning the base pattern for every slice.
//!
//! Both return a [`PrimeList`] whose first two entries are 2 and 3, the only
//! primes outside the iZ set.

use crate::bitmap::Bitmap;
use crate::error::{IzError, Result};
use crate::estimate_pi;
use crate::iz::{construct_base_segment, iz, solve_for_x, IzClass, SMALL_VX_PRIMES};
use crate::primes::PrimeList;
use crate::vx::VX_PAD;

/// Enumerate every prime up to `n` with the flat iZ sieve.
///
/// Fails with [`IzError::TooSmall`] for `n < 10`.
pub fn sieve_iz(n: u64) -> Result<PrimeList> {
    if n < 10 {
        return Err(IzError::TooSmall { n, min: 10 });
    }

    let mut primes = PrimeList::with_capacity(estimate_pi(n));
    primes.push(2);
    primes.push(3);

    // Last index whose candidate pair can still contain a prime <= n: for
    // n ≡ 5 (mod 6) the bound itself sits at index n/6 + 1.
    let x_n = walk_bound(n);
    let mut x5 = Bitmap::new_all_set((x_n + 1) as usize);
    let mut x7 = Bitmap::new_all_set((x_n + 1) as usize);

    let n_sqrt = (n as f64).sqrt() as u64 + 1;
    let limit = x_n as usize;

    for x in 1..=x_n {
        if x5.get(x as usize) {
            let p = 6 * x - 1;
            primes.push(p);
            if p < n_sqrt {
                x5.clear_stride(p as usize, (p * x + x) as usize, limit);
                x7.clear_stride(p as usize, (p * x - x) as usize, limit);
            }
        }
        if x7.get(x as usize) {
            let p = 6 * x + 1;
            primes.push(p);
            if p < n_sqrt {
                x5.clear_stride(p as usize, (p * x - x) as usize, limit);
                x7.clear_stride(p as usize, (p * x + x) as usize, limit);
            }
        }
    }

    // The last candidate pair straddles n; drop the overshoot if present.
    if primes.last().is_some_and(|p| p > n) {
        primes.pop();
    }
    primes.trim();
    Ok(primes)
}

/// Largest index x whose candidate pair iZ(x, ±1) can still hold a prime
/// <= n. At most one candidate at this index exceeds n, so a single
/// overshoot check suffices after collection.
fn walk_bound(n: u64) -> u64 {
    n / 6 + u64::from(n % 6 == 5)
}

/// Enumerate every prime up to `n` with the segmented iZ-Matrix sieve.
///
/// Delegates to [`sieve_iz`] below 1000 (and inherits its
/// [`IzError::TooSmall`] bound).
pub fn sieve_izm(n: u64) -> Result<PrimeList> {
    if n < 1_000 {
        return sieve_iz(n);
    }

    let x_n = walk_bound(n);
    let mut primes = PrimeList::with_capacity(estimate_pi(n));
    primes.push(2);
    primes.push(3);

    let vx = crate::iz::compute_limited_vx(n / 6 + 1, 6);

    // The primes dividing vx never appear as survivors in any segment, so
    // they join the list up front. start_i marks where the stride primes
    // begin.
    let mut start_i = 2usize;
    for &sp in &SMALL_VX_PRIMES {
        if vx % sp == 0 {
            primes.push(sp);
            start_i += 1;
        } else {
            break;
        }
    }

    let cap = (vx + VX_PAD) as usize;
    let mut base_x5 = Bitmap::new(cap);
    let mut base_x7 = Bitmap::new(cap);
    construct_base_segment(vx, &mut base_x5, &mut base_x7);

    // Segment 0 collects the root primes for everything that follows.
    {
        let mut x5 = base_x5.clone();
        let mut x7 = base_x7.clone();
        let limit = vx as usize;
        for x in 2..=vx {
            if x5.get(x as usize) {
                let p = 6 * x - 1;
                primes.push(p);
                if p * p / 6 < vx {
                    x5.clear_stride(p as usize, (p * x + x) as usize, limit);
                    x7.clear_stride(p as usize, (p * x - x) as usize, limit);
                }
            }
            if x7.get(x as usize) {
                let p = 6 * x + 1;
                primes.push(p);
                if p * p / 6 < vx {
                    x5.clear_stride(p as usize, (p * x - x) as usize, limit);
                    x7.clear_stride(p as usize, (p * x + x) as usize, limit);
                }
            }
        }
    }

    // Remaining segments: reset to the base pattern, mark the root primes'
    // strides via solve_for_x, then collect survivors.
    let max_y = x_n / vx;
    let mut yvx = vx;
    let mut limit = vx;
    for y in 1..=max_y {
        let mut x5 = base_x5.clone();
        let mut x7 = base_x7.clone();
        if y == max_y {
            limit = x_n % vx;
        }

        for i in start_i..primes.len() {
            let p = primes.as_slice()[i];
            // p has no composites in this segment once p² passes its end.
            if (p as u128) * (p as u128) > 6 * (yvx + limit) as u128 + 1 {
                break;
            }
            x5.clear_stride(
                p as usize,
                solve_for_x(IzClass::Minus, p, vx, y) as usize,
                limit as usize,
            );
            x7.clear_stride(
                p as usize,
                solve_for_x(IzClass::Plus, p, vx, y) as usize,
                limit as usize,
            );
        }

        for x in 2..=limit {
            if x5.get(x as usize) {
                primes.push(iz(x + yvx, IzClass::Minus));
            }
            if x7.get(x as usize) {
                primes.push(iz(x + yvx, IzClass::Plus));
            }
        }
        yvx += vx;
    }

    if primes.last().is_some_and(|p| p > n) {
        primes.pop();
    }
    primes.trim();
    Ok(primes)
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── Flat sieve ─────────────────────────────────────────────────────

    #[test]
    fn sieve_iz_first_primes() {
        let primes = sieve_iz(30).expect("sieve");
        assert_eq!(primes.as_slice(), &[2, 3, 5, 7, 11, 13, 17, 19, 23, 29]);
    }

    #[test]
    fn sieve_iz_rejects_small_bounds() {
        for n in 0..10 {
            assert!(
                matches!(sieve_iz(n), Err(IzError::TooSmall { .. })),
                "sieve_iz({}) must fail",
                n
            );
        }
        assert!(sieve_iz(10).is_ok());
    }

    #[test]
    fn sieve_iz_known_counts() {
        // pi(x) values from standard tables.
        assert_eq!(sieve_iz(100).expect("sieve").len(), 25);
        assert_eq!(sieve_iz(1_000).expect("sieve").len(), 168);
        assert_eq!(sieve_iz(10_000).expect("sieve").len(), 1_229);
        assert_eq!(sieve_iz(100_000).expect("sieve").len(), 9_592);
    }

    #[test]
    fn sieve_iz_boundary_bounds() {
        // Bounds adjacent to primes: the overshoot drop must keep exactly
        // the primes <= n.
        assert_eq!(sieve_iz(11).expect("sieve").last(), Some(11));
        assert_eq!(sieve_iz(17).expect("sieve").last(), Some(17));
        assert_eq!(sieve_iz(28).expect("sieve").last(), Some(23));
        assert_eq!(sieve_iz(29).expect("sieve").last(), Some(29));
        assert_eq!(sieve_iz(30).expect("sieve").last(), Some(29));
        assert_eq!(sieve_iz(31).expect("sieve").last(), Some(31));
        assert_eq!(sieve_iz(36).expect("sieve").last(), Some(31));
        assert_eq!(sieve_iz(37).expect("sieve").last(), Some(37));
    }

    #[test]
    fn sieve_iz_last_is_prime_and_bounded() {
        for n in [10u64, 50, 97, 1_000, 4_999, 25_000] {
            let primes = sieve_iz(n).expect("sieve");
            let last = primes.last().expect("non-empty");
            assert!(last <= n, "last prime {} exceeds bound {}", last, n);
            let big = rug::Integer::from(last);
            assert_ne!(
                big.is_probably_prime(25),
                rug::integer::IsPrime::No,
                "last entry {} is not prime",
                last
            );
        }
    }

    #[test]
    fn sieve_iz_residues() {
        let primes = sieve_iz(10_000).expect("sieve");
        for &p in &primes.as_slice()[2..] {
            assert!(p % 6 == 1 || p % 6 == 5, "{} escaped the iZ set", p);
        }
    }

    // ── Segmented sieve ────────────────────────────────────────────────

    #[test]
    fn sieve_izm_delegates_below_1000() {
        let a = sieve_izm(999).expect("sieve");
        let b = sieve_iz(999).expect("sieve");
        assert_eq!(a.as_slice(), b.as_slice());
    }

    #[test]
    fn sieve_izm_matches_flat_sieve() {
        // 1014 ends right below the twin pair (1019, 1021); 30029 and 99995
        // are ≡ 5 (mod 6), where the bound itself is a candidate.
        for n in [
            1_000u64, 1_001, 1_014, 1_020, 5_005 * 6, 30_029, 30_030, 30_031, 99_991, 99_995,
            250_000,
        ] {
            let flat = sieve_iz(n).expect("flat");
            let segmented = sieve_izm(n).expect("segmented");
            assert_eq!(
                flat.as_slice(),
                segmented.as_slice(),
                "flat and segmented sieves diverge at n = {}",
                n
            );
        }
    }

    #[test]
    fn sieve_izm_million_count() {
        assert_eq!(sieve_izm(1_000_000).expect("sieve").len(), 78_498);
    }

    #[test]
    fn sieve_izm_segment_boundary_composites() {
        // 30031 = 59·509 sits exactly at the last index of segment 0 when
        // vx = 5005; a one-off stride bound would let it through.
        let primes = sieve_izm(31_000).expect("sieve");
        assert!(
            !primes.as_slice().contains(&30_031),
            "30031 = 59·509 must not be listed"
        );
        assert!(primes.as_slice().contains(&30_029));
    }

    #[test]
    fn sieve_izm_tail_segment_alignment() {
        // Bounds chosen so the tail segment is empty, one index wide, and
        // exactly full.
        let vx = 5_005u64;
        for x_n_offset in [0u64, 1, vx - 1] {
            let x_n = 3 * vx + x_n_offset;
            let n = (x_n - 1) * 6;
            let flat = sieve_iz(n).expect("flat");
            let segmented = sieve_izm(n).expect("segmented");
            assert_eq!(flat.as_slice(), segmented.as_slice(), "divergence at n = {}", n);
        }
    }
}
