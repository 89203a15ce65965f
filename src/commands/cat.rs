use std::{
    io::{self, BufWriter, Write},
    path::Path,
};

use anyhow::{anyhow, Context, Result};

use super::open_bundle;
use crate::{
    bundle::{Bundle, Language, ResourceLocator, Variant},
    hash_repository::HashRepository,
    options::ReaderOptions,
};

/// The default-language variant, or else the first one
fn pick_variant<'a>(bundle: &'a Bundle, locator: &ResourceLocator) -> Result<&'a Variant> {
    let resource = bundle
        .resource(locator)
        .ok_or_else(|| anyhow!("Resource {locator} not found in bundle"))?;

    resource
        .variant(Language::DEFAULT)
        .or_else(|| resource.variants.first())
        .ok_or_else(|| anyhow!("Resource {locator} has no variants"))
}

/// Write a resource's bytes to stdout. `name` is `name.type`, either part may be `#<hex hash>`.
pub fn cat_resource(
    bundle_path: &Path,
    name: &str,
    options: &ReaderOptions,
    repository: &HashRepository,
) -> Result<()> {
    let locator: ResourceLocator = name.parse().context("Invalid resource name")?;
    let bundle = open_bundle(bundle_path, options, repository)?;
    let variant = pick_variant(&bundle, &locator)?;

    let mut stdout = BufWriter::new(io::stdout().lock());
    stdout
        .write_all(&variant.data)
        .context("Failed to write to stdout")?;

    stdout.flush().context("Failed to flush stdout")
}
