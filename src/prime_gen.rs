//! # Random prime generation
//!
//! Randomized search for probable primes of a requested bit size, built on
//! the same residue algebra as the sieves.
//!
//! ## Vertical search
//!
//! [`search_iz_prime`] picks a random column of the iZ-Matrix inside the
//! target bit window, slides to a column coprime to the segment width `vx`
//! (such a column contains no composite of any prime dividing `vx`), then
//! walks down the column in `6·vx` steps testing each row with 25 rounds of
//! Miller–Rabin. The step preserves both the residue class and the
//! coprimality, so every candidate arrives pre-filtered by all the primes in
//! `vx` without a single division. When a walk would leave the bit window it
//! re-anchors on a fresh random column, so the returned prime always has
//! exactly the requested bit length.
//!
//! ## The worker race
//!
//! [`random_iz_prime`] runs the same search on independent worker threads,
//! each with its own OS-seeded random state. The first worker to find a
//! prime writes its decimal representation to a shared channel; the
//! coordinator takes that first message, flips a stop flag, joins the rest
//! and returns the parsed prime. Which worker wins is nondeterministic —
//! callers must treat the result as a fresh random prime, not a function of
//! the inputs.
//!
//! ## Neighbor search
//!
//! [`iz_next_prime`] finds the nearest probable prime strictly above or
//! below a base by scanning pre-sieved `vx = 5005` segments around it,
//! probing only the surviving candidates in ascending (or descending) value
//! order.

use rug::Integer;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use tracing::{debug, warn};

use crate::bitmap::Bitmap;
use crate::error::{IzError, Result};
use crate::iz::{compute_max_vx_big, construct_base_segment, iz_big, IzClass};
use crate::vx::VX_PAD;
use crate::{os_seeded_randstate, screened_probable_prime, TEST_ROUNDS};

/// Bit sizes below this are clamped up.
pub const MIN_PRIME_BITS: u32 = 10;

/// Worker counts above this are clamped down.
pub const MAX_WORKERS: usize = 16;

/// Hard cap on primality tests per search invocation.
const SEARCH_ATTEMPTS_LIMIT: u32 = 1_000_000;

/// The filter primorial is computed this many bits under the target so the
/// walk has thousands of rows of room inside the bit window.
const VX_BIT_MARGIN: u32 = 16;

/// Segment width for the neighbor search: 5·7·11·13, one segment spans
/// 6·5005 = 30030 naturals.
const NEXT_PRIME_VX: u64 = 5 * 7 * 11 * 13;

/// Segment cap for the neighbor search.
const NEXT_PRIME_MAX_SEGMENTS: u32 = 1_000;

/// Search one probable prime of exactly `bit_size` bits in the given residue
/// class, filtering candidates through the primorial `vx`.
///
/// Fails with [`IzError::NotFound`] when the attempt cap is exhausted;
/// callers may simply retry.
pub fn search_iz_prime(class: IzClass, bit_size: u32, vx: &Integer) -> Result<Integer> {
    search_with_stop(class, bit_size, vx, &AtomicBool::new(false))
}

fn search_with_stop(
    class: IzClass,
    bit_size: u32,
    vx: &Integer,
    stop: &AtomicBool,
) -> Result<Integer> {
    debug_assert!(bit_size >= MIN_PRIME_BITS);
    let mut rand = os_seeded_randstate();

    let window_floor = Integer::from(1u32) << (bit_size - 1);
    let window_ceil = Integer::from(1u32) << bit_size;
    // Smallest x with iZ(x, class) inside the window.
    let x_floor = (Integer::from(&window_floor - class.sign()) + 5u32) / 6u32;
    let step = Integer::from(vx * 6u32);

    let mut attempts: u32 = 0;
    loop {
        if stop.load(Ordering::Relaxed) {
            return Err(IzError::NotFound);
        }

        // Anchor a fresh random column at the bottom of the window.
        let offset = vx.clone().random_below(&mut rand);
        let x = Integer::from(&x_floor + &offset);
        let mut candidate = iz_big(&x, class);

        // Slide to a column coprime to vx; stepping by 6 keeps the class.
        while Integer::from(candidate.gcd_ref(vx)) != 1u32 {
            candidate += 6u32;
        }

        // Walk the column one row at a time until a prime appears or the
        // walk leaves the window.
        loop {
            candidate += &step;
            if candidate >= window_ceil {
                break;
            }
            if stop.load(Ordering::Relaxed) {
                return Err(IzError::NotFound);
            }
            attempts += 1;
            if screened_probable_prime(&candidate, TEST_ROUNDS) {
                debug_assert_eq!(candidate.significant_bits(), bit_size);
                return Ok(candidate);
            }
            if attempts >= SEARCH_ATTEMPTS_LIMIT {
                debug!(bit_size, attempts, "prime search exhausted its attempt cap");
                return Err(IzError::NotFound);
            }
        }
    }
}

/// Generate a random probable prime of `bit_size` bits in the given residue
/// class, racing `workers` independent searches. The first candidate wins
/// and the remaining workers are cancelled.
pub fn random_iz_prime(class: IzClass, bit_size: u32, workers: usize) -> Result<Integer> {
    let bit_size = if bit_size < MIN_PRIME_BITS {
        warn!(bit_size, "clamping bit size to the minimum {}", MIN_PRIME_BITS);
        MIN_PRIME_BITS
    } else {
        bit_size
    };
    let workers = if workers > MAX_WORKERS {
        warn!(workers, "clamping worker count to the maximum {}", MAX_WORKERS);
        MAX_WORKERS
    } else {
        workers.max(1)
    };

    let vx = compute_max_vx_big(bit_size.saturating_sub(VX_BIT_MARGIN).max(3));

    if workers == 1 {
        return search_iz_prime(class, bit_size, &vx);
    }

    let stop = Arc::new(AtomicBool::new(false));
    let (tx, rx) = mpsc::channel::<String>();
    let mut handles = Vec::with_capacity(workers);
    for _ in 0..workers {
        let vx = vx.clone();
        let stop = Arc::clone(&stop);
        let tx = tx.clone();
        handles.push(thread::spawn(move || {
            if let Ok(p) = search_with_stop(class, bit_size, &vx, &stop) {
                // Losing the race to a sender whose receiver is gone is fine.
                let _ = tx.send(p.to_string_radix(10));
            }
        }));
    }
    drop(tx);

    // Blocks until the first candidate arrives or every worker gives up.
    let first = rx.recv();
    stop.store(true, Ordering::Relaxed);
    for handle in handles {
        let _ = handle.join();
    }

    let digits = first.map_err(|_| IzError::NotFound)?;
    Integer::from_str_radix(&digits, 10)
        .map_err(|_| IzError::InvalidArgument("worker reported a non-numeric candidate".into()))
}

/// Find the nearest probable prime strictly greater than `base`
/// (`forward = true`) or strictly less than it (`forward = false`).
///
/// Fails with [`IzError::NotFound`] when the segment cap is exhausted, or
/// backward from bases at or below 2.
pub fn iz_next_prime(base: &Integer, forward: bool) -> Result<Integer> {
    // The scan only sees candidates in the iZ set that are coprime to the
    // segment width; {2, 3} and the primes dividing vx = 5005 need explicit
    // ladders.
    if forward {
        for q in [2u32, 3, 5, 7, 11, 13] {
            if *base < q {
                return Ok(Integer::from(q));
            }
        }
    } else {
        if *base <= 2u32 {
            return Err(IzError::NotFound);
        }
        for (bound, q) in [(3u32, 2u32), (5, 3), (7, 5), (11, 7), (13, 11), (17, 13)] {
            if *base <= bound {
                return Ok(Integer::from(q));
            }
        }
    }

    let base_mod6 = base.mod_u(6);
    if forward && base_mod6 == 5 {
        // base is iZ−; its iZ+ twin two above is the nearest candidate.
        let candidate = Integer::from(base + 2u32);
        if screened_probable_prime(&candidate, TEST_ROUNDS) {
            return Ok(candidate);
        }
    } else if !forward && base_mod6 == 1 {
        let candidate = Integer::from(base - 2u32);
        if screened_probable_prime(&candidate, TEST_ROUNDS) {
            return Ok(candidate);
        }
    }

    let vx = NEXT_PRIME_VX;
    let cap = (vx + VX_PAD) as usize;
    let mut x5 = Bitmap::new(cap);
    let mut x7 = Bitmap::new(cap);
    construct_base_segment(vx, &mut x5, &mut x7);

    // Normalize the scan origin into [1, vx]: base sits at index m of the
    // segment starting at yvx.
    let x_p = Integer::from(base / 6u32);
    let mut m = Integer::from(&x_p - 1u32).mod_u(vx as u32) as u64 + 1;
    let mut yvx = Integer::from(&x_p - m);

    // The first segment may hold candidates on the wrong side of base (and
    // base itself); those are filtered by value, not by index.
    let mut first_segment = true;
    for _ in 0..NEXT_PRIME_MAX_SEGMENTS {
        if forward {
            for x in m..=vx {
                for class in [IzClass::Minus, IzClass::Plus] {
                    let bits = match class {
                        IzClass::Minus => &x5,
                        IzClass::Plus => &x7,
                    };
                    if !bits.get(x as usize) {
                        continue;
                    }
                    let candidate = iz_big(&Integer::from(&yvx + x), class);
                    if first_segment && candidate <= *base {
                        continue;
                    }
                    if screened_probable_prime(&candidate, TEST_ROUNDS) {
                        return Ok(candidate);
                    }
                }
            }
            yvx += vx;
        } else {
            for x in (2..=m).rev() {
                for class in [IzClass::Plus, IzClass::Minus] {
                    let bits = match class {
                        IzClass::Minus => &x5,
                        IzClass::Plus => &x7,
                    };
                    if !bits.get(x as usize) {
                        continue;
                    }
                    let candidate = iz_big(&Integer::from(&yvx + x), class);
                    if first_segment && candidate >= *base {
                        continue;
                    }
                    if screened_probable_prime(&candidate, TEST_ROUNDS) {
                        return Ok(candidate);
                    }
                }
            }
            if yvx == 0u32 {
                // Everything above the small-prime ladders has been scanned.
                return Err(IzError::NotFound);
            }
            yvx -= vx;
        }
        first_segment = false;
        m = if forward { 1 } else { vx };
    }
    Err(IzError::NotFound)
}

/// Draw a uniformly random integer below `2^bit_size` and return the next
/// probable prime above it.
pub fn iz_random_next_prime(bit_size: u32) -> Result<Integer> {
    let bit_size = if bit_size < MIN_PRIME_BITS {
        warn!(bit_size, "clamping bit size to the minimum {}", MIN_PRIME_BITS);
        MIN_PRIME_BITS
    } else {
        bit_size
    };
    let mut rand = os_seeded_randstate();
    let base = Integer::from(Integer::random_bits(bit_size, &mut rand));
    iz_next_prime(&base, true)
}
