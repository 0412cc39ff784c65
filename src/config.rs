//! Configuration for swbk.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (SWBK_OUTPUT_DIR, SWBK_SCRATCH_DIR)
//! 2. Config file (.swbk/config.yaml)
//! 3. Defaults (current directory)
//!
//! Config file discovery:
//! - Searches current directory and parents for .swbk/config.yaml
//! - Paths in config file are relative to the config file's project root

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

/// Browser identity sent when downloading iCity photos
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/79.0.3945.74 Safari/537.36 Edg/79.0.309.43";

/// Referer sent when downloading iCity photos
pub const DEFAULT_REFERER: &str = "https://icity.ly/";

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub icity: Option<ICityConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExportConfig {
    /// Directory for generated bundles (relative to project root)
    pub output_dir: Option<String>,
    /// Scratch directory for zip exports (relative to project root)
    pub scratch_dir: Option<String>,
    /// Remove the scratch directory after a zip export
    pub cleanup_scratch: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ICityConfig {
    pub user_agent: Option<String>,
    pub referer: Option<String>,
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Directory where bundles are written by default
    pub output_dir: PathBuf,
    /// Scratch directory for zip exports (None: derived from the zip path)
    pub scratch_dir: Option<PathBuf>,
    /// Remove the scratch directory after a zip export
    pub cleanup_scratch: bool,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
    /// HTTP settings for the iCity adapter
    pub icity: ICitySettings,
}

/// HTTP settings for the iCity adapter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ICitySettings {
    pub user_agent: String,
    pub referer: String,
}

impl Default for ICitySettings {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            referer: DEFAULT_REFERER.to_string(),
        }
    }
}

impl ResolvedConfig {
    /// Default bundle path for a run started at `unix_secs`
    pub fn default_output(&self, unix_secs: i64) -> PathBuf {
        self.output_dir.join(format!("export_{}.zip", unix_secs))
    }
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(".swbk").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to the config file's project root
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
            .canonicalize()
            .unwrap_or_else(|_| base.join(path_str))
    }
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    let config_file = find_config_file();
    let file = match config_file {
        Some(ref path) => Some(load_config_file(path)?),
        None => None,
    };

    // Base directory is the parent of .swbk/ (i.e., grandparent of config.yaml)
    let base_dir = config_file
        .as_ref()
        .and_then(|p| p.parent())
        .and_then(|p| p.parent())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    Ok(resolve(
        file,
        config_file,
        &base_dir,
        std::env::var("SWBK_OUTPUT_DIR").ok(),
        std::env::var("SWBK_SCRATCH_DIR").ok(),
    ))
}

/// Merge env overrides, config file values and defaults
fn resolve(
    file: Option<ConfigFile>,
    config_file: Option<PathBuf>,
    base_dir: &Path,
    env_output: Option<String>,
    env_scratch: Option<String>,
) -> ResolvedConfig {
    let export = file.as_ref().map(|f| f.export.clone()).unwrap_or_default();

    let output_dir = if let Some(dir) = env_output {
        PathBuf::from(dir)
    } else if let Some(ref dir) = export.output_dir {
        resolve_path(base_dir, dir)
    } else {
        PathBuf::from(".")
    };

    let scratch_dir = if let Some(dir) = env_scratch {
        Some(PathBuf::from(dir))
    } else {
        export
            .scratch_dir
            .as_ref()
            .map(|dir| resolve_path(base_dir, dir))
    };

    let icity_file = file.as_ref().and_then(|f| f.icity.clone());
    let defaults = ICitySettings::default();
    let icity = ICitySettings {
        user_agent: icity_file
            .as_ref()
            .and_then(|c| c.user_agent.clone())
            .unwrap_or(defaults.user_agent),
        referer: icity_file
            .as_ref()
            .and_then(|c| c.referer.clone())
            .unwrap_or(defaults.referer),
    };

    ResolvedConfig {
        output_dir,
        scratch_dir,
        cleanup_scratch: export.cleanup_scratch.unwrap_or(false),
        config_file,
        icity,
    }
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| e.to_string()));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}
