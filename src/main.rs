//! # Main — CLI entry point
//!
//! Thin command-line surface over the library: run an enumeration sieve,
//! sieve VX segments into gap files, generate a random prime, or find the
//! neighbor of a base. Results land under `output/` when a file is
//! requested; everything human-readable goes to stdout and logs to stderr.

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use rug::Integer;
use std::path::PathBuf;

use izprime::prime_gen::{iz_next_prime, random_iz_prime};
use izprime::sieve_vx::sieve_vx_range;
use izprime::{classic, output_dir, sieve_iz, IzClass, PrimeList, TEST_ROUNDS};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
#[command(name = "izprime", about = "Prime sieves and random prime generation on the iZ set")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Algorithm {
    /// Flat iZ sieve
    Iz,
    /// Segmented iZ-Matrix sieve
    Izm,
    /// Textbook Sieve of Eratosthenes
    Eratosthenes,
    /// Odd-only Sieve of Eratosthenes
    OddEratosthenes,
    /// Segmented Sieve of Eratosthenes
    Segmented,
    /// Sieve of Euler
    Euler,
    /// Sieve of Atkin
    Atkin,
}

impl Algorithm {
    fn run(self, n: u64) -> izprime::Result<PrimeList> {
        match self {
            Algorithm::Iz => sieve_iz::sieve_iz(n),
            Algorithm::Izm => sieve_iz::sieve_izm(n),
            Algorithm::Eratosthenes => classic::classic_sieve_eratosthenes(n),
            Algorithm::OddEratosthenes => classic::sieve_eratosthenes(n),
            Algorithm::Segmented => classic::segmented_sieve(n),
            Algorithm::Euler => classic::sieve_euler(n),
            Algorithm::Atkin => classic::sieve_atkin(n),
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Class {
    /// Primes of the form 6x − 1
    Minus,
    /// Primes of the form 6x + 1
    Plus,
}

impl From<Class> for IzClass {
    fn from(class: Class) -> IzClass {
        match class {
            Class::Minus => IzClass::Minus,
            Class::Plus => IzClass::Plus,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Enumerate every prime up to a bound
    Sieve {
        /// Upper bound (inclusive)
        #[arg(long)]
        n: u64,
        /// Sieve algorithm
        #[arg(long, value_enum, default_value = "izm")]
        algorithm: Algorithm,
        /// Write the list to output/<file> (binary, hash-protected)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Sieve VX segments at an offset, emitting prime gaps
    Vx {
        /// Segment offset y (decimal, arbitrary size)
        #[arg(long)]
        y: String,
        /// Number of consecutive segments
        #[arg(long, default_value_t = 1)]
        count: u32,
        /// Write each gap list to output/ as <y>.vx
        #[arg(long)]
        write: bool,
    },
    /// Generate a random probable prime
    RandomPrime {
        /// Target bit size
        #[arg(long)]
        bits: u32,
        /// Residue class of the prime
        #[arg(long, value_enum, default_value = "minus")]
        class: Class,
        /// Parallel workers racing for the first candidate
        #[arg(long, default_value_t = 1)]
        workers: usize,
    },
    /// Find the nearest prime above (or below) a base
    NextPrime {
        /// Base value (decimal, arbitrary size)
        #[arg(long)]
        base: String,
        /// Search downward instead of upward
        #[arg(long)]
        backward: bool,
    },
}

fn hex(hash: &[u8; 32]) -> String {
    hash.iter().map(|b| format!("{:02x}", b)).collect()
}

fn main() -> Result<()> {
    // Structured logging: LOG_FORMAT=json for machines, human-readable
    // on stderr otherwise.
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_default();
    if log_format == "json" {
        tracing_subscriber::fmt().json().with_target(false).init();
    } else {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_target(false)
            .init();
    }

    let cli = Cli::parse();
    match cli.command {
        Commands::Sieve { n, algorithm, out } => {
            let primes = algorithm.run(n)?;
            println!("p_count: {}", primes.len());
            if let Some(last) = primes.last() {
                println!("last: {}", last);
            }
            println!("sha256: {}", hex(&primes.content_hash()));
            if let Some(name) = out {
                let path = output_dir()?.join(name);
                primes.write_file(&path)?;
                println!("written: {}", path.display());
            }
        }
        Commands::Vx { y, count, write } => {
            let results = sieve_vx_range(&y, count)?;
            for vx_obj in &results {
                let preview: Vec<u16> = vx_obj.gaps().iter().take(10).copied().collect();
                let stats = vx_obj.gap_stats();
                println!(
                    "y: {} p_count: {} twins: {} cousins: {} sexy: {} bit_ops: {} p_test_ops: {} gaps: {:?}...",
                    vx_obj.y(),
                    vx_obj.len(),
                    stats.twins,
                    stats.cousins,
                    stats.sexy,
                    vx_obj.bit_ops,
                    vx_obj.p_test_ops,
                    preview
                );
                if write {
                    let path = output_dir()?.join(vx_obj.y());
                    let written = vx_obj.write_file(&path)?;
                    println!("written: {}", written.display());
                }
            }
        }
        Commands::RandomPrime { bits, class, workers } => {
            let p = random_iz_prime(class.into(), bits, workers)?;
            println!("{}", p);
            println!(
                "bits: {} mod6: {} rounds: {}",
                p.significant_bits(),
                p.mod_u(6),
                TEST_ROUNDS
            );
        }
        Commands::NextPrime { base, backward } => {
            let base = Integer::from_str_radix(&base, 10)
                .map_err(|e| anyhow::anyhow!("base is not a decimal integer: {}", e))?;
            let p = iz_next_prime(&base, !backward)?;
            println!("{}", p);
        }
    }
    Ok(())
}
