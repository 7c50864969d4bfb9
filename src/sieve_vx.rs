//! # VX-segment kernel
//!
//! [`sieve_vx`] processes one `vx`-wide segment of the iZ-Matrix at an
//! arbitrary — possibly cryptographic-sized — offset `y`, emitting the gaps
//! between consecutive primes instead of the primes themselves. The segment
//! covers the iZ values in `(iZ(y·vx, +1), iZ((y+1)·vx, +1)]`; walking the
//! base value plus the prefix sums of the emitted gaps reproduces the primes
//! in ascending order.
//!
//! Two regimes, selected by `root_limit = ⌊√iZ((y+1)·vx, +1)⌋`:
//!
//! - **Small segments** (`root_limit <= vx`): the stride primes decide
//!   primality outright and every survivor is emitted as-is.
//! - **Large mode** (`root_limit > vx`): the strides only thin the
//!   candidates; each survivor must additionally pass 25 rounds of the
//!   probabilistic primality test before its gap is emitted.
//!
//! The deterministic pass accounts `2·vx/p` bit operations per stride prime
//! and the emission pass counts primality tests; both land in the
//! observational counters of the gap list.

use rug::Integer;

use crate::error::{IzError, Result};
use crate::iz::{iz_big, solve_for_x_big, IzClass, SMALL_VX_PRIMES};
use crate::vx::{VxAssets, VxObj};
use crate::{screened_probable_prime, TEST_ROUNDS, VX6};

/// Sieve the segment described by `vx_obj`, filling it with prime gaps.
///
/// # Panics
/// Panics if the gap list and the assets disagree on the segment width.
pub fn sieve_vx(vx_obj: &mut VxObj, assets: &VxAssets) -> Result<()> {
    let vx = assets.vx();
    assert_eq!(vx_obj.vx(), vx, "gap list and sieve assets disagree on vx");

    let y = Integer::from_str_radix(vx_obj.y(), 10)
        .map_err(|_| IzError::InvalidArgument("segment offset is not a decimal string".into()))?;

    let mut x5 = assets.base_x5().clone();
    let mut x7 = assets.base_x7().clone();

    // Segment 0 is special: the own-class column of every prime holds the
    // prime itself at x_p, not a composite. For the primes dividing vx that
    // cell must be re-set in the base pattern; for the stride primes the
    // marking below starts one stride later instead.
    let segment_zero = y == 0u32;
    if segment_zero {
        for &p in &SMALL_VX_PRIMES {
            if vx % p != 0 {
                break;
            }
            let x_p = ((p + 1) / 6) as usize;
            match IzClass::of(p) {
                IzClass::Minus => x5.set(x_p),
                IzClass::Plus => x7.set(x_p),
            }
        }
    }

    let yvx = Integer::from(&y * vx);
    let root_limit = iz_big(&Integer::from(&yvx + vx), IzClass::Plus).sqrt();
    let large_mode = root_limit > vx;

    // Deterministic pass: stride out the composites of every root prime
    // that does not divide vx. Outside large mode the strides prove
    // primality on their own, so primes past the root limit are skipped.
    for &p in &assets.root_primes().as_slice()[2..] {
        if vx % p == 0 {
            continue;
        }
        if !large_mode && root_limit < p {
            break;
        }
        let mut start5 = solve_for_x_big(IzClass::Minus, p, vx, &y);
        let mut start7 = solve_for_x_big(IzClass::Plus, p, vx, &y);
        if segment_zero {
            // The first own-class hit in segment 0 is p itself.
            match IzClass::of(p) {
                IzClass::Minus => start5 += p,
                IzClass::Plus => start7 += p,
            }
        }
        x5.clear_stride(p as usize, start5 as usize, vx as usize);
        x7.clear_stride(p as usize, start7 as usize, vx as usize);
        vx_obj.bit_ops += 2 * vx / p;
    }

    // Emission pass: walk the segment accumulating the distance since the
    // last emitted prime. Per index, iZ− sits 4 past the previous iZ+ and
    // iZ+ sits 2 past iZ−.
    let mut gap: u64 = 0;
    for x in 1..=vx {
        gap += 4;
        if x5.get(x as usize) && confirm(vx_obj, large_mode, &yvx, x, IzClass::Minus) {
            vx_obj.push_gap(checked_gap(gap));
            gap = 0;
        }
        gap += 2;
        if x7.get(x as usize) && confirm(vx_obj, large_mode, &yvx, x, IzClass::Plus) {
            vx_obj.push_gap(checked_gap(gap));
            gap = 0;
        }
    }

    vx_obj.trim();
    Ok(())
}

/// In large mode a surviving candidate still needs the probabilistic test;
/// in small segments the strides already decided.
fn confirm(vx_obj: &mut VxObj, large_mode: bool, yvx: &Integer, x: u64, class: IzClass) -> bool {
    if !large_mode {
        return true;
    }
    vx_obj.p_test_ops += 1;
    let candidate = iz_big(&Integer::from(yvx + x), class);
    screened_probable_prime(&candidate, TEST_ROUNDS)
}

/// Gaps are stored in 16 bits; a wider gap would silently corrupt the walk,
/// so overflow is a hard failure.
fn checked_gap(gap: u64) -> u16 {
    u16::try_from(gap).unwrap_or_else(|_| {
        panic!("prime gap {} exceeds u16::MAX; the gap walk would be corrupted", gap)
    })
}

/// Sieve `count` consecutive segments starting at `start_y`, constructing
/// the shared assets once and reusing them for every segment.
pub fn sieve_vx_range(start_y: &str, count: u32) -> Result<Vec<VxObj>> {
    let assets = VxAssets::new(VX6)?;
    let mut y = Integer::from_str_radix(start_y, 10)
        .map_err(|_| IzError::InvalidArgument("start offset is not a decimal string".into()))?;
    let mut results = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let mut vx_obj = VxObj::new(VX6, y.to_string_radix(10))?;
        sieve_vx(&mut vx_obj, &assets)?;
        results.push(vx_obj);
        y += 1u32;
    }
    Ok(results)
}
