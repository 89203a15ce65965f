use std::{
    hash::{BuildHasher, Hasher},
    io::{self, BufWriter, Write},
};

use anyhow::{Context, Result};

use crate::hasher::{derive32, BuildMurmurHash64A};

/// 64-bit hash, its 32-bit half, and the input, tab separated
fn hash_line(hasher: &BuildMurmurHash64A, value: &str) -> String {
    let mut state = hasher.build_hasher();
    state.write(value.as_bytes());
    let hash = state.finish();

    format!("{hash:016x}\t{:08x}\t{value}", derive32(hash))
}

/// Print the hashes of each string
pub fn hash_strings(values: &[String], seed: u64) -> Result<()> {
    let hasher = BuildMurmurHash64A { seed };

    let mut stdout = BufWriter::new(io::stdout().lock());
    for value in values {
        writeln!(stdout, "{}", hash_line(&hasher, value)).context("Failed to write to stdout")?;
    }

    stdout.flush().context("Failed to flush stdout")
}
