//! Config file discovery and layered loading.
//!
//! `Config::load()`:
//! 1. Parse `defaults.toml` → base
//! 2. Merge `/etc/authlist/config.toml` (system)
//! 3. Merge `~/.authlist/config.toml` (user)
//! 4. Merge the explicit `--config` file, if any
//! 5. Apply env var fallbacks for unset fields
//! 6. Resolve `${VAR}` references and deserialize
//! 7. Append entries from `registry.path`
//! 8. Validate

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::env::{apply_env_fallbacks, collect_env_vars, resolve_env_references};
use crate::error::{ConfigError, ConfigResult};
use crate::merge::{ConfigLayer, FieldSources, deep_merge_tracking, record_leaves};
use crate::types::{ComponentsFile, Config};
use crate::validate;

/// Embedded default configuration.
const DEFAULTS_TOML: &str = include_str!("defaults.toml");

/// Maximum allowed config file size (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1_048_576;

/// A loaded configuration with provenance.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// The final merged configuration.
    pub config: Config,
    /// Dotted field path → which layer set the value.
    pub field_sources: FieldSources,
    /// Files that were loaded, in precedence order.
    pub loaded_files: Vec<String>,
}

/// Where to look for configuration files.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// File given on the command line; must exist when set.
    pub explicit: Option<PathBuf>,
    /// Replaces `~/.authlist` for user-level discovery.
    pub home_override: Option<PathBuf>,
    /// Replaces `/etc/authlist/config.toml`. Tests point this at a temp dir.
    pub system_path: Option<PathBuf>,
}

/// Load the configuration with layered file precedence.
///
/// # Errors
///
/// Returns a [`ConfigError`] if any config file is malformed, the explicit
/// file is missing, or the merged configuration fails validation.
pub fn load(options: &LoadOptions) -> ConfigResult<ResolvedConfig> {
    let env_vars = collect_env_vars();

    let mut merged: toml::Value =
        toml::from_str(DEFAULTS_TOML).map_err(|e| ConfigError::ParseError {
            path: "<embedded defaults>".to_owned(),
            source: e,
        })?;

    let mut field_sources = FieldSources::new();
    let mut loaded_files = Vec::new();
    record_leaves(&merged, "", &ConfigLayer::Defaults, &mut field_sources);

    let system_path = options
        .system_path
        .clone()
        .unwrap_or_else(|| PathBuf::from("/etc/authlist/config.toml"));
    let user_path = match &options.home_override {
        Some(dir) => Some(dir.join("config.toml")),
        None => home_directory()
            .map(|home| home.join(".authlist").join("config.toml"))
            .map_err(|e| debug!(error = %e, "skipping user config"))
            .ok(),
    };

    let mut layers = vec![(system_path, ConfigLayer::System)];
    if let Some(path) = user_path {
        layers.push((path, ConfigLayer::User));
    }

    for (path, layer) in layers {
        if let Some(overlay) = try_load_file(&path)? {
            deep_merge_tracking(&mut merged, &overlay, "", &layer, &mut field_sources);
            info!(path = %path.display(), layer = %layer, "loaded config");
            loaded_files.push(path.display().to_string());
        }
    }

    if let Some(path) = &options.explicit {
        let overlay = try_load_file(path)?.ok_or_else(|| ConfigError::ReadError {
            path: path.display().to_string(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        })?;
        deep_merge_tracking(
            &mut merged,
            &overlay,
            "",
            &ConfigLayer::Explicit,
            &mut field_sources,
        );
        info!(path = %path.display(), "loaded explicit config");
        loaded_files.push(path.display().to_string());
    }

    let env_count = apply_env_fallbacks(&mut merged, &mut field_sources, &env_vars);
    if env_count > 0 {
        debug!(count = env_count, "applied environment variable fallbacks");
    }

    resolve_env_references(&mut merged, &env_vars);
    let mut config: Config =
        merged
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::ParseError {
                path: "<merged config>".to_owned(),
                source: e,
            })?;

    if let Some(path) = config.registry.path.clone() {
        let extra = load_components_file(Path::new(&path))?;
        info!(path = %path, count = extra.components.len(), "loaded registry file");
        config.registry.components.extend(extra.components);
        loaded_files.push(path);
    }

    validate::validate(&config)?;

    Ok(ResolvedConfig {
        config,
        field_sources,
        loaded_files,
    })
}

/// Load a config from a single file, with no other layers and no env
/// fallbacks. Missing fields take their [`Default`] values.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file cannot be read or parsed, or the
/// result fails validation.
pub fn load_file(path: &Path) -> ConfigResult<Config> {
    let content = read_limited(path)?;
    let mut config: Config = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
        path: path.display().to_string(),
        source: e,
    })?;

    if let Some(registry_path) = config.registry.path.clone() {
        let extra = load_components_file(Path::new(&registry_path))?;
        config.registry.components.extend(extra.components);
    }

    validate::validate(&config)?;
    Ok(config)
}

fn load_components_file(path: &Path) -> ConfigResult<ComponentsFile> {
    let content = read_limited(path)?;
    toml::from_str(&content).map_err(|e| ConfigError::ParseError {
        path: path.display().to_string(),
        source: e,
    })
}

/// Read a file, rejecting anything over the size limit.
fn read_limited(path: &Path) -> ConfigResult<String> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.display().to_string(),
        source: e,
    })?;
    check_size(path, &content)?;
    Ok(content)
}

fn check_size(path: &Path, content: &str) -> ConfigResult<()> {
    if content.len() as u64 > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::ValidationError {
            field: path.display().to_string(),
            message: format!(
                "config file is {} bytes, exceeding the {MAX_CONFIG_FILE_SIZE} byte limit",
                content.len()
            ),
        });
    }
    Ok(())
}

/// Try to load a file, returning `None` if it doesn't exist.
fn try_load_file(path: &Path) -> ConfigResult<Option<toml::Value>> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "config file not found, skipping");
            return Ok(None);
        },
        Err(e) => {
            return Err(ConfigError::ReadError {
                path: path.display().to_string(),
                source: e,
            });
        },
    };
    check_size(path, &content)?;

    let value: toml::Value = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
        path: path.display().to_string(),
        source: e,
    })?;
    Ok(Some(value))
}

fn home_directory() -> ConfigResult<PathBuf> {
    directories::BaseDirs::new()
        .map(|d| d.home_dir().to_path_buf())
        .ok_or(ConfigError::NoHomeDir)
}
