//! Configuration for gobridge.
//!
//! Loads config from:
//! 1. Global: ~/.config/gobridge/config.toml
//! 2. Per-project: .gobridge/config.toml (overrides global)
//!
//! Command-line flags override both.
//!
//! Example config.toml:
//! ```toml
//! log_level = "info"
//!
//! [output]
//! import_source = "valibot"
//! export = true
//! infer_types = true
//!
//! [ordering]
//! all_anonymous_fields = false
//! ```

use anyhow::Context;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Output configuration.
#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct OutputConfig {
    /// Module the validators are imported from.
    pub import_source: Option<String>,
    /// Prefix declarations with `export`.
    pub export: Option<bool>,
    /// Emit `InferOutput` type aliases.
    pub infer_types: Option<bool>,
}

/// Declaration ordering configuration.
#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct OrderingConfig {
    /// Follow every field of anonymous structs when ordering.
    pub all_anonymous_fields: Option<bool>,
}

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct GobridgeConfig {
    pub output: OutputConfig,
    pub ordering: OrderingConfig,
    /// Default log filter when neither `RUST_LOG` nor `-v` is given.
    pub log_level: Option<String>,
}

impl GobridgeConfig {
    /// Load configuration for a project.
    pub fn load(root: &Path) -> anyhow::Result<Self> {
        Self::load_from(Self::global_config_path().as_deref(), root)
    }

    fn load_from(global: Option<&Path>, root: &Path) -> anyhow::Result<Self> {
        let mut config = Self::default();

        if let Some(global) = global.map(Self::load_file).transpose()?.flatten() {
            config = config.merge(global);
        }

        let project_path = root.join(".gobridge").join("config.toml");
        if let Some(project) = Self::load_file(&project_path)? {
            config = config.merge(project);
        }

        Ok(config)
    }

    /// Get the global config path.
    fn global_config_path() -> Option<PathBuf> {
        let config_home = std::env::var("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .ok()
            .or_else(|| dirs::home_dir().map(|h| h.join(".config")))?;
        Some(config_home.join("gobridge").join("config.toml"))
    }

    /// Load config from a file path. A missing file is not an error.
    fn load_file(path: &Path) -> anyhow::Result<Option<Self>> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("failed to read {}", path.display()));
            }
        };
        let config = toml::from_str(&content)
            .with_context(|| format!("invalid config {}", path.display()))?;
        Ok(Some(config))
    }

    /// Merge another config into this one. Values set in `other` win.
    fn merge(self, other: Self) -> Self {
        Self {
            output: OutputConfig {
                import_source: other.output.import_source.or(self.output.import_source),
                export: other.output.export.or(self.output.export),
                infer_types: other.output.infer_types.or(self.output.infer_types),
            },
            ordering: OrderingConfig {
                all_anonymous_fields: other
                    .ordering
                    .all_anonymous_fields
                    .or(self.ordering.all_anonymous_fields),
            },
            log_level: other.log_level.or(self.log_level),
        }
    }
}
