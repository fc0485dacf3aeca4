//! Extractor configuration.
//!
//! Loaded from YAML. When no path is given, `featurelens.yaml` or
//! `.featurelens.yaml` is looked up in the working directory, then in the
//! user configuration directory.

use directories::ProjectDirs;
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ExtractError;
use crate::features::registry::DEFAULT_MAX_STRING_LENGTH;
use crate::features::ProviderSettings;
use crate::views::ViewGroup;
use crate::vocab::Vocabulary;

pub const DEFAULT_CONFIG_NAMES: &[&str] = &["featurelens.yaml", ".featurelens.yaml"];

/// Set to any value but `0` or `false` to keep api records without a true label.
pub const INCLUDE_ALL_SNIPPETS_ENV: &str = "INCLUDE_ALL_SNIPPETS";

/// The default configuration file written by `featurelens init`.
pub const DEFAULT_TEMPLATE: &str = include_str!("templates/default.yaml");

fn default_true() -> bool {
    true
}

fn default_max_string_length() -> usize {
    DEFAULT_MAX_STRING_LENGTH
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExtractorConfig {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub name: String,
    /// Glob patterns for paths to skip (e.g. "**/dist/**").
    #[serde(default)]
    pub excluded_paths: Vec<String>,
    #[serde(default)]
    pub include_test_files: bool,
    /// Keep api records that no label claims.
    #[serde(default)]
    pub include_all_snippets: bool,
    /// Enabled groups by name. Empty means all of them.
    #[serde(default)]
    pub groups: Vec<String>,
    #[serde(default = "default_max_string_length")]
    pub max_string_length: usize,
    #[serde(default)]
    pub http_methods: Option<Vec<String>>,
    #[serde(default)]
    pub app_framework_methods: Option<Vec<String>>,
    #[serde(default = "default_true")]
    pub parallel: bool,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            version: String::new(),
            name: String::new(),
            excluded_paths: Vec::new(),
            include_test_files: false,
            include_all_snippets: false,
            groups: Vec::new(),
            max_string_length: DEFAULT_MAX_STRING_LENGTH,
            http_methods: None,
            app_framework_methods: None,
            parallel: true,
        }
    }
}

impl ExtractorConfig {
    /// Parse a configuration from a YAML file.
    pub fn parse_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: ExtractorConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Loads `path`, or the discovered file, or the defaults.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let config = match path.map(Path::to_path_buf).or_else(discover) {
            Some(path) => {
                tracing::debug!(path = %path.display(), "loading configuration");
                Self::parse_file(&path)?
            }
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ExtractError> {
        for group in &self.groups {
            if ViewGroup::parse(group).is_none() {
                return Err(ExtractError::Config(format!(
                    "unknown group {:?}, expected one of api, data_model, method",
                    group
                )));
            }
        }
        for pattern in &self.excluded_paths {
            Glob::new(pattern).map_err(|e| {
                ExtractError::Config(format!("invalid excluded_paths pattern {:?}: {}", pattern, e))
            })?;
        }
        if self.max_string_length == 0 {
            return Err(ExtractError::Config(
                "max_string_length must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Enabled groups, in output order.
    pub fn enabled_groups(&self) -> Vec<ViewGroup> {
        if self.groups.is_empty() {
            return ViewGroup::ALL.to_vec();
        }
        ViewGroup::ALL
            .into_iter()
            .filter(|g| self.groups.iter().any(|name| ViewGroup::parse(name) == Some(*g)))
            .collect()
    }

    /// The config flag, or the environment override.
    pub fn include_all_snippets(&self) -> bool {
        self.include_all_snippets
            || std::env::var(INCLUDE_ALL_SNIPPETS_ENV)
                .map(|v| !v.is_empty() && v != "0" && !v.eq_ignore_ascii_case("false"))
                .unwrap_or(false)
    }

    pub fn vocabulary(&self) -> Vocabulary {
        Vocabulary::new(self.http_methods.as_deref(), self.app_framework_methods.as_deref())
    }

    pub fn provider_settings(&self) -> ProviderSettings {
        ProviderSettings {
            max_string_length: self.max_string_length,
        }
    }

    /// Compiled `excluded_paths`. Invalid patterns are rejected by [`Self::validate`].
    pub fn exclusions(&self) -> Result<GlobSet, ExtractError> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &self.excluded_paths {
            let glob = Glob::new(pattern).map_err(|e| {
                ExtractError::Config(format!("invalid excluded_paths pattern {:?}: {}", pattern, e))
            })?;
            builder.add(glob);
        }
        builder
            .build()
            .map_err(|e| ExtractError::Config(e.to_string()))
    }

    /// Check if a path should be excluded based on excluded_paths patterns.
    pub fn is_path_excluded(&self, path: &Path) -> bool {
        if self.excluded_paths.is_empty() {
            return false;
        }
        self.exclusions()
            .map(|set| set.is_match(path))
            .unwrap_or(false)
    }
}

/// The first default-named file in the working directory, then in the
/// user configuration directory.
pub fn discover() -> Option<PathBuf> {
    let local = DEFAULT_CONFIG_NAMES
        .iter()
        .map(PathBuf::from)
        .find(|path| path.exists());
    local.or_else(|| {
        let dirs = ProjectDirs::from("", "", "featurelens")?;
        DEFAULT_CONFIG_NAMES
            .iter()
            .map(|name| dirs.config_dir().join(name))
            .find(|path| path.exists())
    })
}
