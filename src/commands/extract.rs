use std::{
    fs,
    path::{Component, Path, PathBuf},
};

use anyhow::{ensure, Context, Result};
use glob::Pattern;
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use tracing::{info, warn};

use super::{matches_any, open_bundle};
use crate::{
    bundle::{Language, Resource, Variant},
    hash_repository::HashRepository,
    options::ReaderOptions,
};

/// `name.type` for the default language, `name.type.<language>` for the others
fn variant_path(resource: &Resource, variant: &Variant) -> PathBuf {
    let name = resource.locator.to_string();
    if variant.language == Language::DEFAULT {
        PathBuf::from(name)
    } else {
        PathBuf::from(format!("{name}.{}", variant.language.0))
    }
}

/// Resource names come from the bundle, so they may not climb out of the output folder
fn is_contained(path: &Path) -> bool {
    path.components().all(|c| matches!(c, Component::Normal(_)))
}

fn write_variant(output_folder: &Path, relative: &Path, variant: &Variant) -> Result<()> {
    ensure!(is_contained(relative), "Refusing to write outside the output folder");

    let out_filename = output_folder.join(relative);
    if let Some(parent) = out_filename.parent() {
        fs::create_dir_all(parent).context("Failed to create folder")?;
    }

    fs::write(&out_filename, &variant.data).context("Failed to write file")
}

/// Extract resources matching a glob pattern to a folder. Returns how many files were written.
pub fn extract_resources(
    bundle_path: &Path,
    patterns: &[Pattern],
    output_folder: &Path,
    options: &ReaderOptions,
    repository: &HashRepository,
) -> Result<usize> {
    let bundle = open_bundle(bundle_path, options, repository)?;

    let jobs = bundle
        .resources()
        .filter(|resource| matches_any(patterns, &resource.locator.to_string()))
        .flat_map(|resource| {
            resource
                .variants
                .iter()
                .map(move |variant| (variant_path(resource, variant), variant))
        })
        .collect::<Vec<_>>();

    let written = jobs
        .into_par_iter()
        .map(|(relative, variant)| {
            write_variant(output_folder, &relative, variant)
                .with_context(|| format!("Failed to extract {relative:?}"))
        })
        // Report results
        .filter(|result| match result {
            Ok(()) => true,
            Err(e) => {
                warn!("{e:#}");
                false
            }
        })
        .count();

    info!(written, folder = %output_folder.display(), "Extracted resources");
    Ok(written)
}
