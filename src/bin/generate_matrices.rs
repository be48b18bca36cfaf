//! Golden matrix fixture generator.
//!
//! ```text
//! generate_matrices [--dir <path>] [--seed <u64>] [size ...]
//! ```
//!
//! Writes `matrix<n>_<n>{A,B,C}.txt` for each size. Sizes of 1000 and above
//! take a long time; run this offline, not as part of a test pass.

use anyhow::{Context, Result};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::path::PathBuf;
use worker_conformance::matrix::generate_fixtures;

const DEFAULT_DIR: &str = "data/matrix";
const DEFAULT_SIZES: [usize; 3] = [3, 100, 300];

struct Args {
    dir: PathBuf,
    seed: Option<u64>,
    sizes: Vec<usize>,
}

fn parse_args() -> Result<Args> {
    let mut args = Args {
        dir: PathBuf::from(DEFAULT_DIR),
        seed: None,
        sizes: Vec::new(),
    };

    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--dir" => {
                args.dir = iter.next().map(PathBuf::from).context("--dir needs a path")?;
            }
            "--seed" => {
                let value = iter.next().context("--seed needs a value")?;
                args.seed = Some(value.parse().with_context(|| format!("invalid seed {}", value))?);
            }
            size => {
                args.sizes
                    .push(size.parse().with_context(|| format!("invalid size {}", size))?);
            }
        }
    }
    if args.sizes.is_empty() {
        args.sizes = DEFAULT_SIZES.to_vec();
    }
    Ok(args)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_target(false).init();

    let args = parse_args()?;
    println!("generating matrices of sizes: {:?}", args.sizes);

    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let written = generate_fixtures(&args.dir, &args.sizes, &mut rng)
        .with_context(|| format!("failed to generate fixtures in {}", args.dir.display()))?;

    for paths in &written {
        println!("✅ {} -> {}", paths.name, paths.c.display());
    }
    Ok(())
}
