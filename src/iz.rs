//! # iZ — residue algebra of the 6x ± 1 decomposition
//!
//! Every prime above 3 has the form `6x − 1` or `6x + 1`. This module holds
//! the algebra that the sieves and the random prime search are built on:
//!
//! 1. **The map itself** — [`iz`] and [`iz_big`] compute `6x + i` for
//!    `i ∈ {−1, +1}`, with [`IzClass`] naming the two residue classes.
//! 2. **Segment sizing** — [`compute_limited_vx`] and [`compute_max_vx_big`]
//!    pick a segment width `vx` as a product of consecutive small primes
//!    starting at 5, bounded by a range or a bit size.
//! 3. **Column solving** — [`solve_for_x`] / [`solve_for_x_big`] find the
//!    first index of a prime's composite progression inside a segment at
//!    offset `y`; [`solve_for_y`] inverts the relation via a modular
//!    inverse.
//! 4. **Base segments** — [`construct_base_segment`] builds the pre-sieved
//!    bitmap pair of width `vx`, with every composite of a prime dividing
//!    `vx` already eliminated. Built once, the pattern is valid for every
//!    segment offset because those composites repeat with period `vx`.
//!
//! ## The Xp wheel
//!
//! For a prime `p = iZ(x_p, ±1)` with `x_p = (p + 1) / 6`, the composites of
//! `p` inside each class form arithmetic progressions with common difference
//! `p` in index space. In `p`'s own class the progression starts at
//! `p·x_p + x_p` (which is the index of `p²`); in the opposite class at
//! `p·x_p − x_p`. Everything below those start points is divisible by a
//! smaller prime.

use rug::Integer;

use crate::bitmap::Bitmap;
use crate::error::{IzError, Result};

/// Residue class of an iZ number: `Minus` is `6x − 1`, `Plus` is `6x + 1`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IzClass {
    Minus,
    Plus,
}

impl IzClass {
    /// The `i` in `6x + i`.
    #[inline]
    pub fn sign(self) -> i32 {
        match self {
            IzClass::Minus => -1,
            IzClass::Plus => 1,
        }
    }

    /// Classify a number coprime to 6 by its residue mod 6.
    #[inline]
    pub fn of(n: u64) -> IzClass {
        debug_assert!(n % 6 == 1 || n % 6 == 5, "{} is not in the iZ set", n);
        if n % 6 == 1 {
            IzClass::Plus
        } else {
            IzClass::Minus
        }
    }
}

/// Consecutive primes above 3, the candidate factors of a segment width.
pub(crate) const SMALL_VX_PRIMES: [u64; 13] = [5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43, 47];

/// Compute `6x + i`.
///
/// # Panics
/// Panics in debug builds if `x == 0` or `6x` overflows.
#[inline]
pub fn iz(x: u64, class: IzClass) -> u64 {
    debug_assert!(x > 0, "x must be positive");
    debug_assert!(x <= u64::MAX / 6, "6x must fit in 64 bits");
    match class {
        IzClass::Minus => 6 * x - 1,
        IzClass::Plus => 6 * x + 1,
    }
}

/// Compute `6x + i` on unbounded integers. `x = 0` is allowed so segment
/// base values can be formed.
pub fn iz_big(x: &Integer, class: IzClass) -> Integer {
    debug_assert!(*x >= 0, "x must be non-negative");
    Integer::from(x * 6u32) + class.sign()
}

/// Segment width for a sieve over `[1, x_n]` in index space: starting from
/// `35 = 5·7`, multiply the next primes from {11, 13, 17, 19, …} while the
/// product stays below `x_n / 2` and at most `k − 2` extra primes are
/// consumed.
pub fn compute_limited_vx(x_n: u64, k: usize) -> u64 {
    let mut vx: u64 = 35;
    let mut i = 2;
    while i < k
        && i < SMALL_VX_PRIMES.len()
        && vx * SMALL_VX_PRIMES[i] < x_n / 2
    {
        vx *= SMALL_VX_PRIMES[i];
        i += 1;
    }
    vx
}

/// Largest primorial `5·7·11·…·p_k` whose bit length does not exceed
/// `bit_size`. Returns at least 5.
pub fn compute_max_vx_big(bit_size: u32) -> Integer {
    let primes = crate::sieve_iz::sieve_iz(PRIMORIAL_SIEVE_BOUND)
        .expect("the primorial sieve bound is above the sieve minimum");
    let mut vx = Integer::from(5u32);
    for &p in &primes.as_slice()[3..] {
        let next = Integer::from(&vx * p);
        if next.significant_bits() > bit_size {
            break;
        }
        vx = next;
    }
    vx
}

/// Primes up to this bound feed [`compute_max_vx_big`]; their primorial
/// exceeds 14,000 bits, far past any practical key size.
const PRIMORIAL_SIEVE_BOUND: u64 = 10_000;

/// Index of `p` in its own class: `x_p = (p + 1) / 6`, flipped to `p − x_p`
/// when solving in the opposite class.
#[inline]
fn normalized_xp(class: IzClass, p: u64) -> u64 {
    let x_p = (p + 1) / 6;
    if IzClass::of(p) == class {
        x_p
    } else {
        p - x_p
    }
}

/// Smallest `x` in `[1, p]` such that `p` divides `iZ(y·vx + x, class)`:
/// the first composite index of `p` inside the segment at offset `y`.
///
/// Requires `p` coprime to 6 and `y·vx` in range.
pub fn solve_for_x(class: IzClass, p: u64, vx: u64, y: u64) -> u64 {
    let x_p = normalized_xp(class, p);
    let yvx = y * vx;
    // (yvx − x_p) mod p without intermediate underflow
    let r = (yvx % p + p - x_p % p) % p;
    p - r
}

/// [`solve_for_x`] for an arbitrary-precision segment offset `y`.
///
/// Requires `p < 2³²` (root primes are bounded by the segment width).
pub fn solve_for_x_big(class: IzClass, p: u64, vx: u64, y: &Integer) -> u64 {
    debug_assert!(p <= u32::MAX as u64, "root primes must fit in 32 bits");
    let x_p = normalized_xp(class, p);
    let m = Integer::from(y * vx).mod_u(p as u32) as u64;
    let r = (m + p - x_p % p) % p;
    p - r
}

/// Smallest `y` such that `iZ(y·vx + x, class)` is divisible by `p`.
/// Fails with [`IzError::NotCoprime`] when `p` divides `vx` (the column of
/// `x` then never meets `p`'s progression).
pub fn solve_for_y(class: IzClass, p: u64, vx: u64, x: u64) -> Result<u64> {
    if vx % p == 0 {
        return Err(IzError::NotCoprime);
    }
    let x_p = normalized_xp(class, p);
    if x % p == x_p % p {
        return Ok(0);
    }
    let delta = (x_p % p + p - x % p) % p;
    let inv = modular_inverse(vx % p, p)?;
    Ok((delta as u128 * inv as u128 % p as u128) as u64)
}

/// Multiplicative inverse of `a` modulo `m` via the extended Euclidean
/// algorithm. Fails with [`IzError::NotCoprime`] when `gcd(a, m) != 1`.
pub fn modular_inverse(a: u64, m: u64) -> Result<u64> {
    if m == 0 {
        return Err(IzError::NotCoprime);
    }
    if m == 1 {
        return Ok(0);
    }
    let (mut old_r, mut r) = (a as i128 % m as i128, m as i128);
    let (mut old_s, mut s) = (1i128, 0i128);
    while r != 0 {
        let q = old_r / r;
        (old_r, r) = (r, old_r - q * r);
        (old_s, s) = (s, old_s - q * s);
    }
    if old_r != 1 {
        return Err(IzError::NotCoprime);
    }
    Ok(old_s.rem_euclid(m as i128) as u64)
}

/// Multiplicative inverse on unbounded integers. Fails with
/// [`IzError::NotCoprime`] when `gcd(a, m) != 1`.
pub fn modular_inverse_big(a: &Integer, m: &Integer) -> Result<Integer> {
    a.clone().invert(m).map_err(|_| IzError::NotCoprime)
}

/// Seed pattern for `vx = 35`: candidates in `[1, 35]` that avoid the
/// composite columns of 5 and 7. In index space the multiples of 5 sit at
/// `x ≡ 1 (mod 5)` in the minus class and `x ≡ −1 (mod 5)` in the plus
/// class; for 7 the congruences swap sign.
fn construct_vx2(x5: &mut Bitmap, x7: &mut Bitmap) {
    for i in 1..=35usize {
        if (i - 1) % 5 != 0 && (i + 1) % 7 != 0 {
            x5.set(i);
        }
        if (i + 1) % 5 != 0 && (i - 1) % 7 != 0 {
            x7.set(i);
        }
    }
}

/// Build the pre-sieved base segment of width `vx` into the (initially
/// clear) bitmaps `x5` and `x7`: set every candidate, then eliminate every
/// index whose iZ value is divisible by a prime dividing `vx`.
///
/// Starts from the hard-coded 35-pattern, then for each further prime
/// `p | vx`: tile the live prefix `p` times, extend the live region by the
/// factor `p`, and clear `p`'s two progressions, including `x_p` itself in
/// `p`'s own class. The result depends only on `vx`.
pub fn construct_base_segment(vx: u64, x5: &mut Bitmap, x7: &mut Bitmap) {
    debug_assert!(vx % 35 == 0, "vx must be a product of primes starting at 5");
    debug_assert!(x5.len() as u64 > vx && x7.len() as u64 > vx);

    construct_vx2(x5, x7);

    let mut current: u64 = 35;
    let mut i = 2;
    while i < SMALL_VX_PRIMES.len() && vx % SMALL_VX_PRIMES[i] == 0 {
        let p = SMALL_VX_PRIMES[i];
        i += 1;
        let x_p = (p + 1) / 6;

        x5.duplicate_segment(1, current as usize, p as usize);
        x7.duplicate_segment(1, current as usize, p as usize);
        current *= p;

        let own_start = (p * x_p + x_p) as usize;
        let other_start = (p * x_p - x_p) as usize;
        let limit = current as usize;
        match IzClass::of(p) {
            IzClass::Minus => {
                x5.clear(x_p as usize);
                x5.clear_stride(p as usize, own_start, limit);
                x7.clear_stride(p as usize, other_start, limit);
            }
            IzClass::Plus => {
                x7.clear(x_p as usize);
                x5.clear_stride(p as usize, other_start, limit);
                x7.clear_stride(p as usize, own_start, limit);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── The iZ map ─────────────────────────────────────────────────────

    #[test]
    fn iz_known_values() {
        assert_eq!(iz(1, IzClass::Minus), 5);
        assert_eq!(iz(1, IzClass::Plus), 7);
        assert_eq!(iz(2, IzClass::Minus), 11);
        assert_eq!(iz(2, IzClass::Plus), 13);
        assert_eq!(iz(100, IzClass::Minus), 599);
    }

    #[test]
    fn iz_gap_constants() {
        // The emission walk of the VX kernel relies on these two constants:
        // iZ(x+1, −1) − iZ(x, +1) = 4 and iZ(x, +1) − iZ(x, −1) = 2.
        for x in 1..1000u64 {
            assert_eq!(iz(x + 1, IzClass::Minus) - iz(x, IzClass::Plus), 4);
            assert_eq!(iz(x, IzClass::Plus) - iz(x, IzClass::Minus), 2);
        }
    }

    #[test]
    fn iz_big_matches_iz() {
        for x in 1..100u64 {
            for class in [IzClass::Minus, IzClass::Plus] {
                assert_eq!(iz_big(&Integer::from(x), class), iz(x, class));
            }
        }
    }

    #[test]
    fn class_of_residues() {
        assert_eq!(IzClass::of(5), IzClass::Minus);
        assert_eq!(IzClass::of(7), IzClass::Plus);
        assert_eq!(IzClass::of(29), IzClass::Minus);
        assert_eq!(IzClass::of(31), IzClass::Plus);
    }

    // ── Segment sizing ─────────────────────────────────────────────────

    #[test]
    fn limited_vx_known_values() {
        // x_n for n = 10^6: 35·11 and 35·11·13 pass, 35·11·13·17 does not.
        assert_eq!(compute_limited_vx(1_000_000 / 6 + 1, 6), 5_005);
        // One factor beyond the seed product fits under 1000/2.
        assert_eq!(compute_limited_vx(1_000, 6), 385);
        // Small range: nothing beyond the seed product fits.
        assert_eq!(compute_limited_vx(200, 6), 35);
        // Huge range: capped by the prime budget at 5·7·11·13·17·19.
        assert_eq!(compute_limited_vx(u64::MAX / 8, 6), crate::VX6);
    }

    #[test]
    fn limited_vx_respects_prime_budget() {
        let unbounded = compute_limited_vx(u64::MAX / 8, 8);
        assert_eq!(unbounded, crate::VX6 * 23 * 29);
    }

    #[test]
    fn max_vx_big_bit_bounds() {
        for bits in [16u32, 64, 128, 512, 1024] {
            let vx = compute_max_vx_big(bits);
            assert!(
                vx.significant_bits() <= bits,
                "vx for {} bits has {} bits",
                bits,
                vx.significant_bits()
            );
            // The next prime factor would push it past the bound, so the
            // result is within ~14 bits of the target.
            assert!(vx.significant_bits() + 14 >= bits);
        }
        assert_eq!(compute_max_vx_big(3), Integer::from(5));
        assert_eq!(compute_max_vx_big(5), Integer::from(5));
        assert_eq!(compute_max_vx_big(6), Integer::from(35));
    }

    // ── Column solving ─────────────────────────────────────────────────

    #[test]
    fn solve_for_x_congruence_law() {
        // (y·vx + x) ≡ x_p (mod p) must hold for the returned x.
        let vx = 5_005u64;
        for &p in &[23u64, 29, 31, 97, 101, 1009] {
            for y in [0u64, 1, 2, 17, 1_000, 123_456] {
                for class in [IzClass::Minus, IzClass::Plus] {
                    let x = solve_for_x(class, p, vx, y);
                    assert!((1..=p).contains(&x), "x = {} out of [1, p]", x);
                    let value = iz(y * vx + x, class);
                    assert_eq!(
                        value % p,
                        0,
                        "iZ({}·{} + {}, {:?}) = {} not divisible by {}",
                        y,
                        vx,
                        x,
                        class,
                        value,
                        p
                    );
                }
            }
        }
    }

    #[test]
    fn solve_for_x_big_matches_small() {
        let vx = 5_005u64;
        for &p in &[23u64, 97, 1009] {
            for y in [0u64, 1, 99, 123_456] {
                for class in [IzClass::Minus, IzClass::Plus] {
                    assert_eq!(
                        solve_for_x_big(class, p, vx, &Integer::from(y)),
                        solve_for_x(class, p, vx, y),
                        "big/small divergence at p={}, y={}",
                        p,
                        y
                    );
                }
            }
        }
    }

    #[test]
    fn solve_for_y_inverts_solve_for_x() {
        let vx = 5_005u64;
        for &p in &[23u64, 29, 97, 1009] {
            for class in [IzClass::Minus, IzClass::Plus] {
                for x in [1u64, 2, 100, 4_999] {
                    let y = solve_for_y(class, p, vx, x).expect("p does not divide vx");
                    assert!(y < p);
                    let value = iz(y * vx + x, class);
                    assert_eq!(value % p, 0, "column ({}, {:?}) misses p={} at y={}", x, class, p, y);
                }
            }
        }
    }

    #[test]
    fn solve_for_y_rejects_dividing_prime() {
        match solve_for_y(IzClass::Minus, 7, 5_005, 3) {
            Err(IzError::NotCoprime) => {}
            other => panic!("expected NotCoprime, got {:?}", other),
        }
    }

    // ── Modular inverse ────────────────────────────────────────────────

    #[test]
    fn modular_inverse_law() {
        for &(a, m) in &[(3u64, 7u64), (2, 5), (10, 17), (5_005, 1_000_003), (35, 64)] {
            let inv = modular_inverse(a, m).expect("coprime inputs");
            assert_eq!(
                (a as u128 * inv as u128 % m as u128) as u64,
                1 % m,
                "{}·{} != 1 (mod {})",
                a,
                inv,
                m
            );
        }
    }

    #[test]
    fn modular_inverse_rejects_common_factor() {
        assert!(matches!(modular_inverse(6, 9), Err(IzError::NotCoprime)));
        assert!(matches!(modular_inverse(0, 7), Err(IzError::NotCoprime)));
        assert!(matches!(modular_inverse(7, 7), Err(IzError::NotCoprime)));
    }

    #[test]
    fn modular_inverse_modulus_one() {
        assert_eq!(modular_inverse(5, 1).expect("m = 1"), 0);
    }

    #[test]
    fn modular_inverse_big_matches_small() {
        for &(a, m) in &[(3u64, 7u64), (5_005, 1_000_003), (123_456_789, 1_000_000_007)] {
            let small = modular_inverse(a, m).expect("coprime");
            let big = modular_inverse_big(&Integer::from(a), &Integer::from(m)).expect("coprime");
            assert_eq!(big, small);
        }
        assert!(matches!(
            modular_inverse_big(&Integer::from(6), &Integer::from(9)),
            Err(IzError::NotCoprime)
        ));
    }

    // ── Base segments ──────────────────────────────────────────────────

    /// Brute-force oracle: index x survives in a class iff its iZ value is
    /// coprime to vx.
    fn survives(vx: u64, x: u64, class: IzClass) -> bool {
        let value = iz(x, class);
        SMALL_VX_PRIMES
            .iter()
            .take_while(|&&p| vx % p == 0)
            .all(|&p| value % p != 0)
    }

    #[test]
    fn base_segment_35_matches_divisibility() {
        let mut x5 = Bitmap::new(45);
        let mut x7 = Bitmap::new(45);
        construct_base_segment(35, &mut x5, &mut x7);
        for x in 1..=35u64 {
            assert_eq!(x5.get(x as usize), survives(35, x, IzClass::Minus), "x5[{}]", x);
            assert_eq!(x7.get(x as usize), survives(35, x, IzClass::Plus), "x7[{}]", x);
        }
    }

    #[test]
    fn base_segment_5005_matches_divisibility() {
        let vx = 5_005u64;
        let mut x5 = Bitmap::new((vx + 10) as usize);
        let mut x7 = Bitmap::new((vx + 10) as usize);
        construct_base_segment(vx, &mut x5, &mut x7);
        for x in 1..=vx {
            assert_eq!(x5.get(x as usize), survives(vx, x, IzClass::Minus), "x5[{}]", x);
            assert_eq!(x7.get(x as usize), survives(vx, x, IzClass::Plus), "x7[{}]", x);
        }
    }

    #[test]
    fn base_segment_pattern_repeats_with_period_vx() {
        // The whole point of the base segment: composites of primes dividing
        // vx repeat with period vx in index space, so the same pattern
        // pre-sieves every segment offset.
        let vx = 385u64;
        let mut x5 = Bitmap::new((vx + 10) as usize);
        let mut x7 = Bitmap::new((vx + 10) as usize);
        construct_base_segment(vx, &mut x5, &mut x7);
        for y in 1..4u64 {
            for x in 1..=vx {
                let shifted = y * vx + x;
                assert_eq!(
                    x5.get(x as usize),
                    survives(vx, shifted, IzClass::Minus),
                    "period violated at y={}, x={}",
                    y,
                    x
                );
                assert_eq!(x7.get(x as usize), survives(vx, shifted, IzClass::Plus));
            }
        }
    }
}
