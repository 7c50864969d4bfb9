//! # Classical sieves — correctness oracles
//!
//! Independent implementations of well-known prime sieves, kept so the iZ
//! sieves can be validated against algorithms with entirely different
//! mechanics: any divergence in the seven-way content-hash comparison points
//! at a real bug rather than a shared blind spot.
//!
//! - [`classic_sieve_eratosthenes`] — the textbook sieve over every integer.
//! - [`sieve_eratosthenes`] — odd-only walk, strides start at `p²`.
//! - [`segmented_sieve`] — √n-wide segments, bounded working set.
//! - [`sieve_euler`] — linear sieve, each composite crossed off exactly once
//!   by its smallest prime factor.
//! - [`sieve_atkin`] — quadratic-form candidate marking followed by striding
//!   out odd multiples of every surviving number ≥ 5.

use crate::bitmap::Bitmap;
use crate::error::{IzError, Result};
use crate::estimate_pi;
use crate::primes::PrimeList;

/// Textbook Sieve of Eratosthenes up to `n`.
///
/// Fails with [`IzError::TooSmall`] for `n < 10`.
pub fn classic_sieve_eratosthenes(n: u64) -> Result<PrimeList> {
    if n < 10 {
        return Err(IzError::TooSmall { n, min: 10 });
    }
    let mut primes = PrimeList::with_capacity(estimate_pi(n));
    let mut bits = Bitmap::new_all_set((n + 1) as usize);
    let n_sqrt = (n as f64).sqrt() as u64;

    for p in 2..=n {
        if bits.get(p as usize) {
            primes.push(p);
            if p <= n_sqrt {
                bits.clear_stride(p as usize, (p * p) as usize, n as usize);
            }
        }
    }
    primes.trim();
    Ok(primes)
}

/// Sieve of Eratosthenes walking odd numbers only.
///
/// Fails with [`IzError::TooSmall`] for `n < 10`.
pub fn sieve_eratosthenes(n: u64) -> Result<PrimeList> {
    if n < 10 {
        return Err(IzError::TooSmall { n, min: 10 });
    }
    let mut primes = PrimeList::with_capacity(estimate_pi(n));
    let mut bits = Bitmap::new_all_set((n + 1) as usize);
    let n_sqrt = (n as f64).sqrt() as u64;

    primes.push(2);
    let mut p = 3u64;
    while p <= n {
        if bits.get(p as usize) {
            primes.push(p);
            if p <= n_sqrt {
                // Even multiples need no marking, stride by 2p.
                bits.clear_stride((2 * p) as usize, (p * p) as usize, n as usize);
            }
        }
        p += 2;
    }
    primes.trim();
    Ok(primes)
}

/// Segmented Sieve of Eratosthenes with √n-wide segments.
///
/// Delegates to [`sieve_eratosthenes`] below 1000.
pub fn segmented_sieve(n: u64) -> Result<PrimeList> {
    if n < 1_000 {
        return sieve_eratosthenes(n);
    }
    let mut primes = PrimeList::with_capacity(estimate_pi(n));
    let segment_size = (n as f64).sqrt() as u64;
    let mut bits = Bitmap::new_all_set((segment_size + 1) as usize);

    // Small primes up to the segment size feed the segment marking.
    primes.push(2);
    let mut p = 3u64;
    while p <= segment_size {
        if bits.get(p as usize) {
            primes.push(p);
            let mut multiple = p * p;
            while multiple <= segment_size {
                bits.clear(multiple as usize);
                multiple += 2 * p;
            }
        }
        p += 2;
    }

    let mut low = segment_size + 1;
    let mut high = (low + segment_size - 1).min(n);
    while low <= n {
        bits.set_all();

        let small_count = primes.len();
        for i in 0..small_count {
            let p = primes.as_slice()[i];
            if (p as u128) * (p as u128) > high as u128 {
                break;
            }
            let mut start = (low / p) * p;
            if start < low {
                start += p;
            }
            if start < p * p {
                start = p * p;
            }
            let mut j = start;
            while j <= high {
                if j % 2 != 0 {
                    bits.clear((j - low) as usize);
                }
                j += p;
            }
        }

        let mut i = low;
        while i <= high {
            if i % 2 != 0 && bits.get((i - low) as usize) {
                primes.push(i);
            }
            i += 1;
        }

        low = high + 1;
        high = (low + segment_size - 1).min(n);
    }
    primes.trim();
    Ok(primes)
}

/// Sieve of Euler (linear sieve): every composite is eliminated exactly
/// once, by its smallest prime factor.
///
/// Fails with [`IzError::TooSmall`] for `n < 10`.
pub fn sieve_euler(n: u64) -> Result<PrimeList> {
    if n < 10 {
        return Err(IzError::TooSmall { n, min: 10 });
    }
    let mut primes = PrimeList::with_capacity(estimate_pi(n));
    let mut bits = Bitmap::new_all_set((n + 1) as usize);

    primes.push(2);
    let mut i = 3u64;
    while i <= n {
        if bits.get(i as usize) {
            primes.push(i);
        }
        // Cross off i·p for the listed odd primes up to the smallest prime
        // factor of i; beyond that, p·i has a smaller factor than p and
        // belongs to another i.
        for j in 1..primes.len() {
            let p = primes.as_slice()[j];
            match p.checked_mul(i) {
                Some(composite) if composite <= n => bits.clear(composite as usize),
                _ => break,
            }
            if i % p == 0 {
                break;
            }
        }
        i += 2;
    }
    primes.trim();
    Ok(primes)
}

/// Sieve of Atkin.
///
/// Candidates are marked by the three quadratic-form residue conditions,
/// then every odd multiple of a surviving number ≥ 5 is stridden out; what
/// remains above 3 is prime.
///
/// Fails with [`IzError::TooSmall`] for `n < 10`.
pub fn sieve_atkin(n: u64) -> Result<PrimeList> {
    if n < 10 {
        return Err(IzError::TooSmall { n, min: 10 });
    }
    let mut primes = PrimeList::with_capacity(estimate_pi(n));
    let mut bits = Bitmap::new((n + 1) as usize);
    let n_sqrt = (n as f64).sqrt() as u64 + 1;

    primes.push(2);
    primes.push(3);

    for x in 1..n_sqrt {
        for y in 1..n_sqrt {
            let num = 4 * x * x + y * y;
            if num <= n && (num % 12 == 1 || num % 12 == 5) {
                bits.set(num as usize);
            }
            let num = 3 * x * x + y * y;
            if num <= n && num % 12 == 7 {
                bits.set(num as usize);
            }
            if x > y {
                let num = 3 * x * x - y * y;
                if num <= n && num % 12 == 11 {
                    bits.set(num as usize);
                }
            }
        }
    }

    let mut i = 5u64;
    while i <= n_sqrt {
        if bits.get(i as usize) {
            bits.clear_stride((2 * i) as usize, (i * i) as usize, n as usize);
        }
        i += 2;
    }

    let mut i = 5u64;
    while i <= n {
        if bits.get(i as usize) {
            primes.push(i);
        }
        i += 2;
    }
    primes.trim();
    Ok(primes)
}
