use std::{
    io::{self, BufWriter, Write},
    path::PathBuf,
};

use anyhow::{ensure, Context, Result};
use glob::Pattern;
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use tracing::warn;

use super::{matches_any, open_header};
use crate::{hash_repository::HashRepository, options::ReaderOptions};

/// List resources matching a glob pattern, as `name.type`. Bundles are read in parallel and
/// printed in the order given.
pub fn list_resources(
    bundles: &[PathBuf],
    patterns: &[Pattern],
    options: &ReaderOptions,
    repository: &HashRepository,
) -> Result<()> {
    let listings = bundles
        .par_iter()
        .map(|path| -> Result<_> {
            let header = open_header(path, options, repository)?;
            let names = header
                .directory
                .iter()
                .map(|entry| entry.locator.to_string())
                .filter(|name| matches_any(patterns, name))
                .collect::<Vec<_>>();

            Ok((path, names))
        })
        .collect::<Vec<_>>();

    // Use a buffered writer since we're dumping a lot of data
    let mut stdout = BufWriter::new(io::stdout().lock());
    let mut failures = 0;

    for listing in listings {
        match listing {
            Ok((path, names)) => {
                for name in names {
                    let written = if bundles.len() > 1 {
                        writeln!(stdout, "{}\t{name}", path.display())
                    } else {
                        writeln!(stdout, "{name}")
                    };
                    written.context("Failed to write to stdout")?;
                }
            }
            Err(e) => {
                warn!("{e:#}");
                failures += 1;
            }
        }
    }

    stdout.flush().context("Failed to flush stdout")?;

    ensure!(
        failures < bundles.len() || bundles.is_empty(),
        "No bundle could be read"
    );
    Ok(())
}
