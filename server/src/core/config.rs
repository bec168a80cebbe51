use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::data::filters::{CatalogDeclaration, CatalogDefaults, ParseLimits};
use crate::data::sql::Backend;
use crate::utils::file::expand_path;
use crate::utils::time::parse_timezone;

use super::cli::CliConfig;
use super::constants::{
    APP_DOT_FOLDER, CONFIG_FILE_NAME, DEFAULT_MAX_FILTER_DEPTH, DEFAULT_PAGE_ITEMS,
    MAX_FILTER_JSON_SIZE, MAX_PAGE_ITEMS,
};

// =============================================================================
// File Configuration
// =============================================================================

#[derive(Debug, Default, Clone, Deserialize)]
pub struct LimitsFileConfig {
    pub max_depth: Option<usize>,
    pub max_request_bytes: Option<usize>,
}

/// File-based configuration (JSON)
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    pub dialect: Option<Backend>,
    pub timezone: Option<String>,
    pub default_items: Option<u32>,
    pub limits: Option<LimitsFileConfig>,
    pub catalogs: Option<Vec<CatalogDeclaration>>,
    #[serde(flatten)]
    pub extra: serde_json::Value,
}

impl FileConfig {
    /// Load configuration from a JSON file
    fn load_from_file(path: &Path) -> Result<Self> {
        tracing::debug!(path = %path.display(), "Loading config file");
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        tracing::trace!(config = ?config, "Parsed config file");
        Ok(config)
    }

    /// Warn about unknown fields in the config
    fn warn_unknown_fields(&self) {
        if let serde_json::Value::Object(map) = &self.extra
            && !map.is_empty()
        {
            let keys_str: String = map
                .keys()
                .map(|k| k.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            tracing::warn!(
                fields = %keys_str,
                "Unknown fields in config file (possible typos)"
            );
        }
    }

    /// Merge another FileConfig into this one (other takes precedence)
    ///
    /// Catalogs are merged by resource: a later declaration replaces an
    /// earlier one with the same name.
    fn merge(&mut self, other: FileConfig) {
        if other.dialect.is_some() {
            tracing::trace!(dialect = ?other.dialect, "Merging dialect");
            self.dialect = other.dialect;
        }
        if other.timezone.is_some() {
            tracing::trace!(timezone = ?other.timezone, "Merging timezone");
            self.timezone = other.timezone;
        }
        if other.default_items.is_some() {
            tracing::trace!(default_items = ?other.default_items, "Merging default_items");
            self.default_items = other.default_items;
        }

        if let Some(limits) = other.limits {
            let current = self.limits.get_or_insert_with(LimitsFileConfig::default);
            if limits.max_depth.is_some() {
                tracing::trace!(max_depth = ?limits.max_depth, "Merging limits.max_depth");
                current.max_depth = limits.max_depth;
            }
            if limits.max_request_bytes.is_some() {
                tracing::trace!(
                    max_request_bytes = ?limits.max_request_bytes,
                    "Merging limits.max_request_bytes"
                );
                current.max_request_bytes = limits.max_request_bytes;
            }
        }

        if let Some(catalogs) = other.catalogs {
            let current = self.catalogs.get_or_insert_with(Vec::new);
            for catalog in catalogs {
                tracing::trace!(resource = %catalog.resource, "Merging catalog");
                match current.iter_mut().find(|c| c.resource == catalog.resource) {
                    Some(existing) => *existing = catalog,
                    None => current.push(catalog),
                }
            }
        }
    }
}

// =============================================================================
// Application Configuration
// =============================================================================

/// Final merged application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub dialect: Backend,
    pub limits: ParseLimits,
    pub defaults: CatalogDefaults,
    pub catalogs: Vec<CatalogDeclaration>,
}

impl AppConfig {
    /// Load configuration from all sources
    ///
    /// Priority (lowest to highest):
    /// 1. Defaults
    /// 2. Profile directory config (~/.sieve/sieve.json)
    /// 3. Local directory config OR CLI-specified config path
    /// 4. CLI arguments (which include env var fallbacks via clap)
    pub fn load(cli: &CliConfig) -> Result<Self> {
        tracing::debug!("Loading application configuration");
        tracing::trace!(cli = ?cli, "CLI config");

        let mut file_config = FileConfig::default();
        let mut found_configs: Vec<String> = Vec::new();

        if let Some(profile_path) = get_profile_config_path()
            && profile_path.exists()
        {
            let profile_config = FileConfig::load_from_file(&profile_path)?;
            profile_config.warn_unknown_fields();
            file_config.merge(profile_config);
            found_configs.push(profile_path.display().to_string());
        }

        let overlay_path = if let Some(ref path) = cli.config {
            let expanded = expand_path(&path.to_string_lossy());
            if !expanded.exists() {
                anyhow::bail!("Config file not found: {}", expanded.display());
            }
            Some(expanded)
        } else {
            let local = PathBuf::from(CONFIG_FILE_NAME);
            if local.exists() { Some(local) } else { None }
        };

        if let Some(path) = overlay_path {
            let overlay_config = FileConfig::load_from_file(&path)?;
            overlay_config.warn_unknown_fields();
            file_config.merge(overlay_config);
            found_configs.push(path.display().to_string());
        }

        tracing::debug!(configs = ?found_configs, "Config files loaded");

        let file_limits = file_config.limits.unwrap_or_default();

        // Layer configs: defaults -> file config -> CLI/env overrides
        let dialect = cli.dialect.or(file_config.dialect).unwrap_or_default();

        let timezone = match cli.timezone.as_deref().or(file_config.timezone.as_deref()) {
            Some(name) => parse_timezone(name)
                .with_context(|| format!("Unknown timezone '{}'", name))?,
            None => chrono_tz::UTC,
        };

        let default_items = file_config.default_items.unwrap_or(DEFAULT_PAGE_ITEMS);
        if !(1..=MAX_PAGE_ITEMS).contains(&default_items) {
            anyhow::bail!(
                "default_items must be between 1 and {}, got {}",
                MAX_PAGE_ITEMS,
                default_items
            );
        }

        let max_depth = cli
            .max_depth
            .or(file_limits.max_depth)
            .unwrap_or(DEFAULT_MAX_FILTER_DEPTH);
        if max_depth == 0 {
            anyhow::bail!("limits.max_depth must be at least 1");
        }

        let max_request_bytes = file_limits
            .max_request_bytes
            .unwrap_or(MAX_FILTER_JSON_SIZE);
        if max_request_bytes == 0 {
            anyhow::bail!("limits.max_request_bytes must be at least 1");
        }

        let config = Self {
            dialect,
            limits: ParseLimits {
                max_depth,
                max_request_bytes,
            },
            defaults: CatalogDefaults {
                timezone,
                default_items,
            },
            catalogs: file_config.catalogs.unwrap_or_default(),
        };

        tracing::debug!(
            dialect = %config.dialect,
            catalogs = config.catalogs.len(),
            max_depth = config.limits.max_depth,
            "Configuration loaded"
        );

        Ok(config)
    }
}

/// Get the profile config path (~/.sieve/sieve.json)
fn get_profile_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(APP_DOT_FOLDER).join(CONFIG_FILE_NAME))
}
