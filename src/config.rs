use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::errors::{ResolverError, Result};
use crate::resolution::{Registration, ResolverRegistry};
use crate::strategy::StrategyCatalog;

/// Name of the directory under the user's config dir.
pub const CONFIG_DIR_NAME: &str = "sigresolve";

/// Name of the default configuration file.
pub const CONFIG_FILENAME: &str = "config.toml";

/// One strategy to register by identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyEntry {
    /// Catalog identifier, e.g. `direct-http`.
    pub name: String,
    /// Register with the highest priority instead of the lowest.
    #[serde(default)]
    pub at_start: bool,
    /// Properties applied to the instance after registration.
    #[serde(default)]
    pub properties: HashMap<String, String>,
}

impl StrategyEntry {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            at_start: false,
            properties: HashMap::new(),
        }
    }
}

/// Deployment configuration: which resolvers exist and in what order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Schema version of the configuration.
    #[serde(default = "default_version")]
    pub version: u32,
    /// Append the four built-in resolvers before any listed strategy.
    #[serde(default = "default_true")]
    pub register_defaults: bool,
    /// Additional strategies, registered in file order.
    #[serde(default)]
    pub strategies: Vec<StrategyEntry>,
}

fn default_version() -> u32 {
    1
}

fn default_true() -> bool {
    true
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            register_defaults: true,
            strategies: Vec::new(),
        }
    }
}

/// Supported on-disk encodings, picked by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Toml,
    Json,
}

fn format_for(path: &Path) -> Result<Format> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("toml") => Ok(Format::Toml),
        Some("json") => Ok(Format::Json),
        _ => Err(ResolverError::Config {
            message: format!(
                "unsupported config file '{}': expected a .toml or .json extension",
                path.display()
            ),
        }),
    }
}

/// Returns the default config path, `<config dir>/sigresolve/config.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILENAME))
}

/// Loads the configuration from `path`.
///
/// A missing file yields the default configuration.
pub fn load_config(path: &Path) -> Result<ResolverConfig> {
    let format = format_for(path)?;
    if !path.exists() {
        return Ok(ResolverConfig::default());
    }

    let contents = fs::read_to_string(path).map_err(|e| ResolverError::Config {
        message: format!("failed to read config file '{}': {}", path.display(), e),
    })?;

    parse_config(&contents, format).map_err(|e| ResolverError::Config {
        message: format!("failed to parse config file '{}': {}", path.display(), e),
    })
}

fn parse_config(contents: &str, format: Format) -> Result<ResolverConfig> {
    let config = match format {
        Format::Toml => toml::from_str(contents)?,
        Format::Json => serde_json::from_str(contents)?,
    };
    Ok(config)
}

/// Saves the configuration to `path` using an atomic write.
///
/// Writes to a temporary file first and then renames it into place.
pub fn save_config(path: &Path, config: &ResolverConfig) -> Result<()> {
    let format = format_for(path)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| ResolverError::Config {
            message: format!(
                "failed to create config directory '{}': {}",
                parent.display(),
                e
            ),
        })?;
    }

    let serialized = match format {
        Format::Toml => toml::to_string_pretty(config).map_err(|e| ResolverError::Config {
            message: format!("failed to serialize config: {}", e),
        })?,
        Format::Json => serde_json::to_string_pretty(config)?,
    };

    let tmp_path = tmp_path_for(path);
    fs::write(&tmp_path, &serialized).map_err(|e| ResolverError::Config {
        message: format!(
            "failed to write temporary config file '{}': {}",
            tmp_path.display(),
            e
        ),
    })?;

    fs::rename(&tmp_path, path).map_err(|e| ResolverError::Config {
        message: format!(
            "failed to rename temporary config file '{}' to '{}': {}",
            tmp_path.display(),
            path.display(),
            e
        ),
    })?;

    Ok(())
}

/// `<file name>.tmp` next to `path`, unique per target file.
fn tmp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Builds a registry from `config` using the built-in catalog.
pub fn bootstrap(config: &ResolverConfig) -> (ResolverRegistry, Vec<Registration>) {
    bootstrap_with_catalog(config, StrategyCatalog::builtin())
}

/// Builds a registry from `config`, resolving identifiers against `catalog`.
///
/// Defaults come first when enabled, then every listed strategy in file
/// order. Entries that cannot be registered are reported in the returned
/// outcomes and otherwise ignored.
pub fn bootstrap_with_catalog(
    config: &ResolverConfig,
    catalog: StrategyCatalog,
) -> (ResolverRegistry, Vec<Registration>) {
    let registry = ResolverRegistry::with_catalog(catalog);
    let mut outcomes = Vec::new();

    if config.register_defaults {
        outcomes.extend(registry.register_defaults());
    }

    for entry in &config.strategies {
        let outcome = registry.register_by_name_with(&entry.name, entry.at_start, |handle| {
            for key in entry.properties.keys() {
                if !handle.understands_property(key) {
                    warn!(strategy = %entry.name, %key, "property not understood by resolver");
                }
            }
            handle.add_properties(&entry.properties);
        });
        outcomes.push(outcome);
    }

    (registry, outcomes)
}
