use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use glob::Pattern;
use stingray_tools::{
    chunk::DEFAULT_READ_AHEAD,
    commands::{
        cat::cat_resource, default_dictionary_path, extract::extract_resources,
        hash::hash_strings, info::bundle_info, list::list_resources, prepare_repository,
    },
    HashRepository, ReaderOptions,
};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Subcommand)]
enum Command {
    /// Print a bundle's header and directory as JSON
    Info {
        bundle: PathBuf,
    },
    /// List resources as name.type
    List {
        /// Bundles to read
        #[arg(required = true, num_args = 1..)]
        bundles: Vec<PathBuf>,
        /// Glob patterns to filter the list of resources
        #[arg(long = "glob", default_value = "**")]
        globs: Vec<Pattern>,
    },
    /// Extract matched resources to a folder
    Extract {
        bundle: PathBuf,
        /// Path to the folder to output the extracted files
        output_folder: PathBuf,
        /// Glob patterns to filter the list of resources
        #[arg(long = "glob", default_value = "**")]
        globs: Vec<Pattern>,
    },
    /// Write a single resource to stdout
    Cat {
        bundle: PathBuf,
        /// name.type, either part may be #<hex hash>
        name: String,
    },
    /// Print the 64 and 32-bit hashes of strings
    Hash {
        #[arg(required = true, num_args = 1..)]
        values: Vec<String>,
        #[arg(long, default_value_t = 0, value_parser = parse_seed)]
        seed: u64,
    },
}

/// Decimal, or hex with a 0x prefix
fn parse_seed(value: &str) -> Result<u64, String> {
    match value.strip_prefix("0x") {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => value.parse(),
    }
    .map_err(|e| e.to_string())
}

/// Reads Stingray bundle archives
#[derive(Parser, Debug)]
#[command(name = "bundle_tools")]
#[clap(version)]
struct Cli {
    /// Hash dictionary files used to name resources. Can be repeated.
    #[arg(short, long, global = true)]
    dictionary: Vec<PathBuf>,

    /// Dictionary for bundle versions that compress with zstd
    #[arg(long, global = true)]
    codec_dictionary: Option<PathBuf>,

    /// Chunks decompressed at a time
    #[arg(long, global = true, default_value_t = DEFAULT_READ_AHEAD)]
    read_ahead: usize,

    /// Debug logging
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Validates user input and builds the reader options
fn reader_options(cli: &Cli) -> Result<ReaderOptions> {
    let mut options = ReaderOptions::default().with_read_ahead(cli.read_ahead);

    if let Some(path) = &cli.codec_dictionary {
        let dictionary =
            fs::read(path).with_context(|| format!("Failed to read codec dictionary {path:?}"))?;
        options = options.with_codec_dictionary(dictionary);
    }

    Ok(options)
}

/// The given dictionaries, or the default one if it exists
fn dictionaries(cli: &Cli) -> Vec<PathBuf> {
    if !cli.dictionary.is_empty() {
        return cli.dictionary.clone();
    }

    default_dictionary_path()
        .filter(|path| path.exists())
        .into_iter()
        .collect()
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let options = reader_options(&cli)?;
    let repository = HashRepository::global();
    prepare_repository(repository, &dictionaries(&cli))?;

    match cli.command {
        Command::Info { bundle } => {
            bundle_info(&bundle, &options, repository).context("Info command failed")?
        }
        Command::List { bundles, globs } => list_resources(&bundles, &globs, &options, repository)
            .context("List command failed")?,
        Command::Extract {
            bundle,
            output_folder,
            globs,
        } => {
            extract_resources(&bundle, &globs, &output_folder, &options, repository)
                .context("Extract command failed")?;
        }
        Command::Cat { bundle, name } => {
            cat_resource(&bundle, &name, &options, repository).context("Cat command failed")?
        }
        Command::Hash { values, seed } => {
            hash_strings(&values, seed).context("Hash command failed")?
        }
    }

    Ok(())
}
