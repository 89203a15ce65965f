use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use glob::{MatchOptions, Pattern};

use crate::{
    bundle::{read_header, Bundle, BundleHeader},
    dictionary::{load_dictionary_file, seed_names},
    hash_repository::HashRepository,
    options::ReaderOptions,
};

pub mod cat;
pub mod extract;
pub mod hash;
pub mod info;
pub mod list;

/// Engine resource types, so listings show type names without a dictionary
pub const KNOWN_TYPES: &[&str] = &[
    "animation",
    "animation_curves",
    "bik",
    "bones",
    "config",
    "crypto",
    "data",
    "entity",
    "flow",
    "font",
    "ini",
    "ivf",
    "level",
    "lua",
    "material",
    "mod",
    "mouse_cursor",
    "navdata",
    "network_config",
    "package",
    "particles",
    "physics_properties",
    "render_config",
    "scene",
    "shader",
    "shader_library",
    "shader_library_group",
    "shading_environment",
    "shading_environment_mapping",
    "slug",
    "slug_album",
    "sound_environment",
    "state_machine",
    "strings",
    "surface_properties",
    "texture",
    "timpani_bank",
    "timpani_master",
    "tome",
    "unit",
    "vector_field",
    "wwise_bank",
    "wwise_dep",
    "wwise_event",
    "wwise_metadata",
    "wwise_stream",
];

/// Where a hash dictionary is picked up from when none is given
pub fn default_dictionary_path() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join("bundle_tools").join("dictionary.txt"))
}

/// Fill the repository with the known type names and the given dictionaries
pub fn prepare_repository(repository: &HashRepository, dictionaries: &[PathBuf]) -> Result<()> {
    seed_names(repository, KNOWN_TYPES.to_vec());

    for path in dictionaries {
        load_dictionary_file(repository, path)
            .with_context(|| format!("Failed to load hash dictionary {path:?}"))?;
    }

    Ok(())
}

fn match_options() -> MatchOptions {
    MatchOptions {
        require_literal_separator: true,
        ..Default::default()
    }
}

/// True if any pattern matches
pub fn matches_any(patterns: &[Pattern], name: &str) -> bool {
    patterns
        .iter()
        .any(|pattern| pattern.matches_with(name, match_options()))
}

pub fn open_bundle(path: &Path, options: &ReaderOptions, repository: &HashRepository) -> Result<Bundle> {
    let file = File::open(path).with_context(|| format!("Failed to open bundle {path:?}"))?;

    Bundle::open(BufReader::new(file), options, repository)
        .with_context(|| format!("Failed to read bundle {path:?}"))
}

pub fn open_header(
    path: &Path,
    options: &ReaderOptions,
    repository: &HashRepository,
) -> Result<BundleHeader> {
    let file = File::open(path).with_context(|| format!("Failed to open bundle {path:?}"))?;

    read_header(&mut BufReader::new(file), options, repository)
        .with_context(|| format!("Failed to read bundle header {path:?}"))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use glob::Pattern;

    use super::{matches_any, prepare_repository};
    use crate::{hash_id::HashId64, hash_repository::HashRepository, hasher::hash64_str};

    #[test]
    fn test_matches_any() {
        let patterns = [
            Pattern::new("units/*.unit").unwrap(),
            Pattern::new("**/*.lua").unwrap(),
        ];

        assert!(matches_any(&patterns, "units/box.unit"));
        assert!(!matches_any(&patterns, "units/crates/box.unit"));
        assert!(matches_any(&patterns, "scripts/game/main.lua"));
        assert!(!matches_any(&patterns, "scripts/game/main.strings"));
    }

    #[test]
    fn test_prepare_repository() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{:016x} scripts/boot", hash64_str("scripts/boot")).unwrap();

        let repository = HashRepository::new();
        prepare_repository(&repository, &[file.path().to_path_buf()]).unwrap();

        let lua = repository.get(hash64_str("lua")).unwrap();
        assert_eq!(lua.name(), Some("lua"));
        assert_eq!(
            repository.get(hash64_str("scripts/boot")).unwrap(),
            HashId64::new("scripts/boot")
        );

        let missing = [file.path().with_extension("missing")];
        assert!(prepare_repository(&repository, &missing).is_err());
    }
}
