//! Configuration loading and discovery for `stitch.toml`
//!
//! Provides functions to find, load, and merge configuration.

use super::schema::{FusionMethod, GridKind, StitchConfig};
use crate::traversal::Corner;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the project configuration file.
pub const CONFIG_FILE_NAME: &str = "stitch.toml";

/// Configuration loading error
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// File I/O error
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error
    #[error("Failed to parse stitch.toml: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error
    #[error("Config validation failed:\n{}", .0.iter().map(|e| format!("  - {}", e)).collect::<Vec<_>>().join("\n"))]
    Validation(Vec<String>),
}

/// CLI arguments that can override config values
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    /// Override the tile directory
    pub directory: Option<PathBuf>,
    pub kind: Option<GridKind>,
    pub order: Option<Corner>,
    pub size_x: Option<usize>,
    pub size_y: Option<usize>,
    /// Overlap in percent
    pub overlap: Option<f64>,
    pub first_index: Option<u64>,
    pub first_x: Option<u64>,
    pub first_y: Option<u64>,
    pub file_names: Option<String>,
    /// Override the tile configuration file name
    pub tile_configuration: Option<String>,
    pub fusion_method: Option<FusionMethod>,
    pub compute_overlap: Option<bool>,
}

/// Find stitch.toml by walking up from the current working directory.
pub fn find_config() -> Option<PathBuf> {
    env::current_dir().ok().and_then(find_config_from)
}

/// Find stitch.toml by walking up from a specific directory.
pub fn find_config_from(start: PathBuf) -> Option<PathBuf> {
    let mut current = start;

    loop {
        let config_path = current.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            return None;
        }
    }
}

/// Load configuration from a stitch.toml file.
///
/// If a path is provided, loads from that file. Otherwise, uses `find_config()`
/// to locate the config file. If no config file is found, returns a default
/// configuration.
///
/// Relative input directories are resolved against the directory holding
/// the config file.
pub fn load_config(path: Option<&Path>) -> Result<StitchConfig, ConfigError> {
    let config_path = match path {
        Some(p) => Some(p.to_path_buf()),
        None => find_config(),
    };

    match config_path {
        Some(p) => {
            let mut config = load_config_file(&p)?;
            if let Some(root) = project_root(&p) {
                config.input.directory = resolve_path(root, &config.input.directory);
            }
            tracing::debug!(path = %p.display(), "loaded configuration");
            Ok(config)
        }
        None => Ok(default_config()),
    }
}

/// Load configuration from a specific file path.
fn load_config_file(path: &Path) -> Result<StitchConfig, ConfigError> {
    let contents = fs::read_to_string(path)?;
    let config: StitchConfig = toml::from_str(&contents)?;

    let errors = config.validate();
    if !errors.is_empty() {
        return Err(ConfigError::Validation(errors.into_iter().map(|e| e.to_string()).collect()));
    }

    Ok(config)
}

/// Configuration used when no stitch.toml is found.
pub fn default_config() -> StitchConfig {
    StitchConfig::default()
}

/// Merge CLI overrides into a configuration.
///
/// CLI arguments take precedence over config file values. The merged
/// configuration is validated again so that bad flag values are reported
/// the same way as bad file values.
pub fn merge_cli_overrides(
    config: &mut StitchConfig,
    overrides: &CliOverrides,
) -> Result<(), ConfigError> {
    if let Some(ref directory) = overrides.directory {
        config.input.directory = directory.clone();
    }

    let grid = &mut config.grid;
    if let Some(kind) = overrides.kind {
        grid.kind = kind;
    }
    if let Some(order) = overrides.order {
        grid.order = order;
    }
    if let Some(size_x) = overrides.size_x {
        grid.size_x = size_x;
    }
    if let Some(size_y) = overrides.size_y {
        grid.size_y = size_y;
    }
    if let Some(overlap) = overrides.overlap {
        grid.overlap = overlap;
    }
    if let Some(first_index) = overrides.first_index {
        grid.first_index = first_index;
    }
    if let Some(first_x) = overrides.first_x {
        grid.first_x = first_x;
    }
    if let Some(first_y) = overrides.first_y {
        grid.first_y = first_y;
    }
    if let Some(ref file_names) = overrides.file_names {
        grid.file_names = file_names.clone();
    }

    if let Some(ref name) = overrides.tile_configuration {
        config.output.tile_configuration = name.clone();
    }
    if let Some(method) = overrides.fusion_method {
        config.registration.fusion_method = method;
    }
    if let Some(compute_overlap) = overrides.compute_overlap {
        config.registration.compute_overlap = compute_overlap;
    }

    let errors = config.validate();
    if !errors.is_empty() {
        return Err(ConfigError::Validation(errors.into_iter().map(|e| e.to_string()).collect()));
    }
    Ok(())
}

/// Get the project root directory from a config file path.
pub fn project_root(config_path: &Path) -> Option<&Path> {
    config_path.parent()
}

/// Resolve a path relative to the project root.
///
/// If the path is absolute, returns it unchanged.
/// If relative, joins it with the project root.
pub fn resolve_path(project_root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        project_root.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traversal::{GridType, TraversalOrder};
    use std::fs::File;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_config(dir: &Path, content: &[u8]) -> PathBuf {
        let config_path = dir.join(CONFIG_FILE_NAME);
        File::create(&config_path)
            .expect("should create config file")
            .write_all(content)
            .expect("should write config content");
        config_path
    }

    #[test]
    fn test_find_config_in_current_dir() {
        let temp = TempDir::new().expect("should create temp dir");
        let config_path = write_config(temp.path(), b"[grid]\nsize_x = 3\n");

        let found = find_config_from(temp.path().to_path_buf());
        assert_eq!(found, Some(config_path));
    }

    #[test]
    fn test_find_config_in_parent_dir() {
        let temp = TempDir::new().expect("should create temp dir");
        let config_path = write_config(temp.path(), b"[grid]\nsize_x = 3\n");

        let subdir = temp.path().join("plate1").join("well_a1");
        fs::create_dir_all(&subdir).expect("should create subdirectories");

        let found = find_config_from(subdir);
        assert_eq!(found, Some(config_path));
    }

    #[test]
    fn test_find_config_not_found() {
        let temp = TempDir::new().expect("should create temp dir");
        assert_eq!(find_config_from(temp.path().to_path_buf()), None);
    }

    #[test]
    fn test_load_config_from_file_resolves_directory() {
        let temp = TempDir::new().expect("should create temp dir");
        let config_path = write_config(
            temp.path(),
            br#"
[grid]
type = "snake-by-rows"
order = "left-down"
size_x = 3
size_y = 2

[input]
directory = "tiles"
"#,
        );

        let config = load_config(Some(&config_path)).expect("should load valid config");
        assert_eq!(
            config.grid.grid_type(),
            GridType::Sequential { order: TraversalOrder::SnakeByRows, corner: Corner::LeftDown }
        );
        assert_eq!(config.input.directory, temp.path().join("tiles"));
    }

    #[test]
    fn test_load_config_missing_file_is_error() {
        let temp = TempDir::new().expect("should create temp dir");
        let result = load_config(Some(&temp.path().join("nonexistent.toml")));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_load_config_invalid_toml() {
        let temp = TempDir::new().expect("should create temp dir");
        let config_path = write_config(temp.path(), b"this is not valid toml {{{");

        let result = load_config(Some(&config_path));
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_config_validation_error() {
        let temp = TempDir::new().expect("should create temp dir");
        let config_path = write_config(temp.path(), b"[grid]\nsize_y = 0\noverlap = -5.0\n");

        match load_config(Some(&config_path)) {
            Err(ConfigError::Validation(errors)) => assert_eq!(errors.len(), 2),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_merge_cli_overrides() {
        let mut config = default_config();
        let overrides = CliOverrides {
            directory: Some(PathBuf::from("/scans")),
            kind: Some(GridKind::FixedPosition),
            size_x: Some(5),
            overlap: Some(10.0),
            file_names: Some("r{yy}_c{xx}.png".to_string()),
            compute_overlap: Some(false),
            ..Default::default()
        };
        merge_cli_overrides(&mut config, &overrides).expect("overrides should be valid");

        assert_eq!(config.input.directory, PathBuf::from("/scans"));
        assert_eq!(config.grid.grid_type(), GridType::FixedPosition);
        assert_eq!(config.grid.size_x, 5);
        assert_eq!(config.grid.size_y, 3);
        assert_eq!(config.grid.overlap, 10.0);
        assert!(!config.registration.compute_overlap);
    }

    #[test]
    fn test_merge_cli_overrides_rejects_invalid_values() {
        let mut config = default_config();
        let overrides = CliOverrides { size_x: Some(0), ..Default::default() };
        assert!(matches!(
            merge_cli_overrides(&mut config, &overrides),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_resolve_path() {
        let root = Path::new("/project");
        assert_eq!(resolve_path(root, Path::new("tiles")), PathBuf::from("/project/tiles"));
        assert_eq!(resolve_path(root, Path::new("/abs")), PathBuf::from("/abs"));
    }
}
