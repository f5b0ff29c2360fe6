//! # Configuration
//!
//! Centralizes all settings with a clear override hierarchy:
//! defaults → config file → env vars → CLI flags.
//!
//! Config lives at `~/.edison/config.toml`. If missing on first run, a
//! commented-out default is generated so users can discover all options.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

// ============================================================================
// Config Structs (all fields Option<T> for sparse TOML)
// ============================================================================

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct EdisonConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub sections: Vec<SectionEntry>,
    #[serde(default)]
    pub route_extensions: Vec<toml::Table>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct GeneralConfig {
    pub route_container: Option<String>,
    pub debug: Option<bool>,
    pub template_dir: Option<String>,
    pub start_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SectionEntry {
    pub name: String,
    pub parent: Option<String>,
    pub default_route: Option<String>,
    #[serde(default)]
    pub routes: Vec<RouteEntry>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteEntry {
    pub name: String,
    /// Template id; defaults to the route name.
    pub template: Option<String>,
}

impl RouteEntry {
    pub fn template_id(&self) -> &str {
        self.template.as_deref().unwrap_or(&self.name)
    }
}

// ============================================================================
// Defaults
// ============================================================================

pub const DEFAULT_DEBUG: bool = true;
pub const DEFAULT_TEMPLATE_DIR: &str = "templates";

// ============================================================================
// Resolved Config (concrete values where a default exists)
// ============================================================================

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Left unset when nobody provides one; the coordinator rejects that.
    pub route_container: Option<String>,
    pub debug: bool,
    pub template_dir: PathBuf,
    pub start_path: Option<String>,
    pub sections: Vec<SectionEntry>,
    pub route_extensions: Vec<serde_json::Value>,
}

/// Values given on the command line (None = not specified).
#[derive(Debug, Default)]
pub struct CliOverrides {
    pub route_container: Option<String>,
    pub template_dir: Option<PathBuf>,
    pub start_path: Option<String>,
    pub quiet: bool,
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "config I/O error: {e}"),
            ConfigError::Parse(e) => write!(f, "config parse error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Loading
// ============================================================================

/// Returns `~/.edison`.
pub fn config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".edison"))
}

/// Returns the path to `~/.edison/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("config.toml"))
}

/// Load config from `~/.edison/config.toml`.
///
/// If the file doesn't exist, generates a commented-out default and
/// returns `EdisonConfig::default()`. If it exists but is malformed,
/// returns `ConfigError::Parse`.
pub fn load_config() -> Result<EdisonConfig, ConfigError> {
    let path = match config_path() {
        Some(p) => p,
        None => {
            warn!("Could not determine home directory, using default config");
            return Ok(EdisonConfig::default());
        }
    };

    if !path.exists() {
        info!("No config file found, generating default at {}", path.display());
        generate_default_config(&path);
        return Ok(EdisonConfig::default());
    }

    load_config_from(&path)
}

/// Load config from an explicit path. A missing file is an error here.
pub fn load_config_from(path: &Path) -> Result<EdisonConfig, ConfigError> {
    let contents = fs::read_to_string(path).map_err(ConfigError::Io)?;
    let config: EdisonConfig = toml::from_str(&contents).map_err(ConfigError::Parse)?;
    info!("Loaded config from {}", path.display());
    debug!("Config: {:?}", config);
    Ok(config)
}

/// Generates a commented-out default config file at the given path.
fn generate_default_config(path: &Path) {
    let default_content = r#"# Edison Configuration
# All settings are optional; defaults are used for anything not specified.
# Override hierarchy: defaults → this file → env vars → CLI flags.

# [general]
# route_container = "app"            # Element id routes render into (required)
# debug = true                       # Trace every routing event
# template_dir = "templates"         # Relative to ~/.edison/; holds rtpl_<id>.hbs files
# start_path = "dashboard"           # Dispatched when routes start

# [[sections]]
# name = "dashboard"
# default_route = "home"
#
# [[sections.routes]]
# name = "home"
# template = "home"                  # Looks up the rtpl_home element

# [[sections]]
# name = "settings"
# parent = "dashboard"
#
# [[sections.routes]]
# name = "profile"

# [[route_extensions]]
# routes = { "" = "dashboard", "me" = "settings/profile" }
"#;

    if let Some(parent) = path.parent() {
        if let Err(e) = fs::create_dir_all(parent) {
            warn!("Failed to create config directory: {}", e);
            return;
        }
    }
    if let Err(e) = fs::write(path, default_content) {
        warn!("Failed to write default config: {}", e);
    }
}

// ============================================================================
// Resolution
// ============================================================================

/// Resolve the final config by collapsing: defaults → config file → env vars → CLI.
pub fn resolve(config: &EdisonConfig, cli: &CliOverrides) -> ResolvedConfig {
    // Route container: CLI → env → config (no default)
    let route_container = cli
        .route_container
        .clone()
        .or_else(|| std::env::var("EDISON_ROUTE_CONTAINER").ok())
        .or_else(|| config.general.route_container.clone());

    // Debug: --quiet → env → config → default
    let debug = if cli.quiet {
        false
    } else {
        std::env::var("EDISON_DEBUG")
            .ok()
            .and_then(|v| parse_flag(&v))
            .or(config.general.debug)
            .unwrap_or(DEFAULT_DEBUG)
    };

    // Template dir: CLI → env → config (relative to ~/.edison/) → default
    let template_dir = cli
        .template_dir
        .clone()
        .or_else(|| std::env::var("EDISON_TEMPLATE_DIR").ok().map(PathBuf::from))
        .or_else(|| {
            config.general.template_dir.as_ref().map(|dir| {
                let dir = PathBuf::from(dir);
                match config_dir() {
                    Some(base) if dir.is_relative() => base.join(dir),
                    _ => dir,
                }
            })
        })
        .unwrap_or_else(|| PathBuf::from(DEFAULT_TEMPLATE_DIR));

    // Start path: CLI → env → config
    let start_path = cli
        .start_path
        .clone()
        .or_else(|| std::env::var("EDISON_START_PATH").ok())
        .or_else(|| config.general.start_path.clone());

    ResolvedConfig {
        route_container,
        debug,
        template_dir,
        start_path,
        sections: config.sections.clone(),
        route_extensions: resolve_extensions(&config.route_extensions),
    }
}

fn resolve_extensions(tables: &[toml::Table]) -> Vec<serde_json::Value> {
    tables
        .iter()
        .filter_map(|table| match serde_json::to_value(table) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Skipping route extension that has no JSON form: {}", e);
                None
            }
        })
        .collect()
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => {
            warn!("Ignoring unrecognized flag value '{}'", value);
            None
        }
    }
}
