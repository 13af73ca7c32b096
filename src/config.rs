//! Configuration file parsing, defaults, and merging.
//!
//! Configuration is loaded in layers (last wins):
//! 1. Built-in defaults
//! 2. Global config from `~/.repograph/config.toml`
//! 3. Per-repo config from `<repo_root>/.repograph/config.toml`
//!
//! Each layer only overrides fields it explicitly sets; absent fields
//! are left at their previous value.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

/// Directory name holding config, under the home directory and the repo root.
pub const CONFIG_DIR: &str = ".repograph";

// ---------------------------------------------------------------------------
// Public config types (fully resolved, no Options)
// ---------------------------------------------------------------------------

/// Top-level configuration, fully resolved with defaults applied.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Config {
    pub scan: ScanConfig,
    pub extract: ExtractConfig,
    pub output: OutputConfig,
}

/// Which files get submitted to the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanConfig {
    /// Directory names never descended into.
    pub ignore_names: Vec<String>,
    /// Skip entries whose name starts with `.`.
    pub skip_hidden: bool,
    /// Files larger than this (in KiB) are skipped.
    pub max_file_size_kb: u64,
    /// Extra glob patterns to exclude.
    pub patterns: Vec<String>,
}

/// Tag extraction settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractConfig {
    /// Keep source text on definition and reference nodes.
    pub include_text: bool,
    /// A tree with syntax errors fails the file.
    pub strict_syntax: bool,
    /// Names added to the global-symbols set.
    pub extra_globals: Vec<String>,
}

/// Summary output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Output / display settings.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OutputConfig {
    pub format: OutputFormat,
    /// Stamp `createdAt` on every node.
    pub timestamps: bool,
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

const DEFAULT_IGNORE_NAMES: &[&str] = &[
    ".git",
    "node_modules",
    "vendor",
    "target",
    "build",
    "dist",
    "out",
    "coverage",
    "__pycache__",
    ".venv",
];

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            ignore_names: DEFAULT_IGNORE_NAMES.iter().map(|s| s.to_string()).collect(),
            skip_hidden: true,
            max_file_size_kb: 1024,
            patterns: Vec::new(),
        }
    }
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            include_text: true,
            strict_syntax: true,
            extra_globals: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Option-based overlay types (for partial deserialization)
// ---------------------------------------------------------------------------

/// Mirror of [`Config`] where every field is `Option`, so we can
/// deserialize a partial TOML file and overlay only the keys that are
/// present.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ConfigOverlay {
    scan: Option<ScanOverlay>,
    extract: Option<ExtractOverlay>,
    output: Option<OutputOverlay>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ScanOverlay {
    ignore_names: Option<Vec<String>>,
    skip_hidden: Option<bool>,
    max_file_size_kb: Option<u64>,
    patterns: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ExtractOverlay {
    include_text: Option<bool>,
    strict_syntax: Option<bool>,
    extra_globals: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct OutputOverlay {
    format: Option<OutputFormat>,
    timestamps: Option<bool>,
}

// ---------------------------------------------------------------------------
// Merge helpers
// ---------------------------------------------------------------------------

impl Config {
    /// Apply an overlay on top of this config, replacing only the fields
    /// that are `Some` in the overlay.
    fn apply_overlay(&mut self, overlay: ConfigOverlay) {
        if let Some(scan) = overlay.scan {
            if let Some(v) = scan.ignore_names {
                self.scan.ignore_names = v;
            }
            if let Some(v) = scan.skip_hidden {
                self.scan.skip_hidden = v;
            }
            if let Some(v) = scan.max_file_size_kb {
                self.scan.max_file_size_kb = v;
            }
            if let Some(v) = scan.patterns {
                self.scan.patterns = v;
            }
        }
        if let Some(ext) = overlay.extract {
            if let Some(v) = ext.include_text {
                self.extract.include_text = v;
            }
            if let Some(v) = ext.strict_syntax {
                self.extract.strict_syntax = v;
            }
            if let Some(v) = ext.extra_globals {
                self.extract.extra_globals = v;
            }
        }
        if let Some(out) = overlay.output {
            if let Some(v) = out.format {
                self.output.format = v;
            }
            if let Some(v) = out.timestamps {
                self.output.timestamps = v;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Return the user's home directory.
fn home_dir() -> Option<PathBuf> {
    #[allow(deprecated)]
    std::env::home_dir()
}

/// Parse a TOML string into a [`ConfigOverlay`], producing a clear error
/// message on malformed input.
fn parse_overlay(contents: &str, path: &Path) -> Result<ConfigOverlay> {
    toml::from_str(contents)
        .with_context(|| format!("failed to parse config file: {}", path.display()))
}

/// Try to read a config file and parse it as an overlay.
/// Returns `Ok(None)` if the file does not exist.
fn load_overlay(path: &Path) -> Result<Option<ConfigOverlay>> {
    match std::fs::read_to_string(path) {
        Ok(contents) => parse_overlay(&contents, path).map(Some),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(anyhow::anyhow!(
            "failed to read config file {}: {}",
            path.display(),
            e
        )),
    }
}

impl Config {
    /// Load configuration by merging layers:
    /// defaults -> global (`~/.repograph/config.toml`) -> per-repo
    /// (`<repo>/.repograph/config.toml`).
    pub fn load(repo_root: Option<&Path>) -> Result<Config> {
        let global_dir = home_dir().map(|h| h.join(CONFIG_DIR));
        Self::load_with_global_dir(global_dir.as_deref(), repo_root)
    }

    /// Load config with an explicit global config directory, so tests can
    /// point at a temporary directory instead of `~/.repograph`.
    fn load_with_global_dir(global_dir: Option<&Path>, repo_root: Option<&Path>) -> Result<Config> {
        let mut config = Config::default();

        if let Some(dir) = global_dir
            && let Some(overlay) = load_overlay(&dir.join("config.toml"))?
        {
            config.apply_overlay(overlay);
        }

        if let Some(root) = repo_root
            && let Some(overlay) = load_overlay(&root.join(CONFIG_DIR).join("config.toml"))?
        {
            config.apply_overlay(overlay);
        }

        Ok(config)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
