use std::{
    io::{self, BufWriter, Write},
    path::Path,
};

use anyhow::{Context, Result};
use serde::Serialize;

use super::open_header;
use crate::{bundle::BundleHeader, hash_repository::HashRepository, options::ReaderOptions};

#[derive(Serialize)]
struct Info<'a> {
    path: &'a Path,
    #[serde(flatten)]
    header: BundleHeader,
}

/// Print a bundle's header and directory as JSON
pub fn bundle_info(path: &Path, options: &ReaderOptions, repository: &HashRepository) -> Result<()> {
    let header = open_header(path, options, repository)?;

    let mut stdout = BufWriter::new(io::stdout().lock());
    serde_json::to_writer_pretty(&mut stdout, &Info { path, header })
        .context("Failed to serialise header")?;
    writeln!(stdout).context("Failed to write to stdout")?;

    stdout.flush().context("Failed to flush stdout")
}
