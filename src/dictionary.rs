//! Loading hash dictionaries: text files that map hashes back to the strings that made them
//!
//! Each line is `<hex hash><whitespace><string>`, where 8 hex digits mean a 32-bit hash and 16
//! mean a 64-bit one. A line holding only a string is hashed into both domains.

use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

use rayon::iter::{IntoParallelIterator, ParallelIterator};
use tracing::{debug, info};
use winnow::{
    ascii::{space0, space1},
    combinator::{alt, eof, preceded, terminated},
    error::ContextError,
    token::{rest, take_while},
    Parser,
};

use crate::{
    error::Result,
    hash_id::{HashId32, HashId64},
    hash_repository::HashRepository,
};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Line<'a> {
    Hash32(u32, &'a str),
    Hash64(u64, &'a str),
    Name(&'a str),
}

/// What happened to the lines of a dictionary
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DictionaryStats {
    pub added: usize,
    /// Already present, with the same or a different string
    pub duplicates: usize,
    /// Lines that couldn't be read
    pub rejected: usize,
}

/// Exactly `N` hex digits, followed by whitespace
fn hex_hash<'a, const N: usize>() -> impl Parser<&'a str, u64, ContextError> {
    terminated(
        take_while(N, |c: char| c.is_ascii_hexdigit()),
        space1,
    )
    .try_map(|digits| u64::from_str_radix(digits, 16))
}

/// The rest of the line, trailing whitespace dropped
fn name<'a>(input: &mut &'a str) -> winnow::Result<&'a str> {
    rest.map(str::trim_end)
        .verify(|s: &str| !s.is_empty())
        .parse_next(input)
}

fn line<'a>(input: &mut &'a str) -> winnow::Result<Line<'a>> {
    preceded(
        space0,
        alt((
            (hex_hash::<16>(), name).map(|(hash, s)| Line::Hash64(hash, s)),
            (hex_hash::<8>(), name).map(|(hash, s)| Line::Hash32(hash as u32, s)),
            terminated(take_while(1.., |c: char| !c.is_whitespace()), (space0, eof))
                .map(Line::Name),
        )),
    )
    .parse_next(input)
}

fn parse_line(text: &str) -> Option<Line<'_>> {
    line.parse(text).ok()
}

/// Store one name under both hash widths. True if the 64-bit entry was new.
fn add_name(repository: &HashRepository, name: &str) -> bool {
    repository.try_add(HashId32::new(name));
    repository.try_add(HashId64::new(name))
}

/// Read a dictionary into the repository. Unreadable lines are counted, not fatal.
pub fn load_dictionary(repository: &HashRepository, reader: impl BufRead) -> Result<DictionaryStats> {
    let mut stats = DictionaryStats::default();

    for (number, text) in reader.lines().enumerate() {
        let text = text?;
        let trimmed = text.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let added = match parse_line(&text) {
            Some(Line::Hash32(hash, name)) => repository.try_add(HashId32::with_name(hash, name)),
            Some(Line::Hash64(hash, name)) => repository.try_add(HashId64::with_name(hash, name)),
            Some(Line::Name(name)) => add_name(repository, name),
            None => {
                debug!(line = number + 1, text = trimmed, "Skipping unreadable dictionary line");
                stats.rejected += 1;
                continue;
            }
        };

        if added {
            stats.added += 1;
        } else {
            stats.duplicates += 1;
        }
    }

    Ok(stats)
}

pub fn load_dictionary_file(repository: &HashRepository, path: &Path) -> Result<DictionaryStats> {
    let file = File::open(path)?;
    let stats = load_dictionary(repository, BufReader::new(file))?;

    info!(
        path = %path.display(),
        added = stats.added,
        duplicates = stats.duplicates,
        rejected = stats.rejected,
        "Loaded hash dictionary"
    );

    Ok(stats)
}

/// Hash and store many names at once, in parallel. Returns how many were new.
pub fn seed_names<'a>(
    repository: &HashRepository,
    names: impl IntoParallelIterator<Item = &'a str>,
) -> usize {
    names
        .into_par_iter()
        .filter(|name| add_name(repository, name))
        .count()
}
