use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use debrepo_core::{StripConvention, StripConventions};
use serde::Deserialize;

pub(crate) const DEFAULT_CONFIG_FILE: &str = "debrepo.toml";
const DEFAULT_OUTPUT_DIR: &str = "debian_packages";
const DEFAULT_LOG_LEVEL: &str = "warn";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ConfigFile {
    pub(crate) base_url: Option<String>,
    pub(crate) output_dir: Option<PathBuf>,
    pub(crate) distributions: Option<Vec<String>>,
    pub(crate) components: Option<Vec<String>>,
    pub(crate) architectures: Option<Vec<String>>,
    pub(crate) binary_strip: Option<StripConvention>,
    pub(crate) source_strip: Option<StripConvention>,
    pub(crate) log_level: Option<String>,
    pub(crate) user_agent: Option<String>,
    pub(crate) timeout_secs: Option<u64>,
}

impl ConfigFile {
    pub(crate) fn from_toml_str(input: &str) -> Result<Self> {
        toml::from_str(input).context("config-invalid: failed to parse debrepo config")
    }
}

/// Values given on the command line; each one wins over the config file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Overrides {
    pub(crate) base_url: Option<String>,
    pub(crate) output_dir: Option<PathBuf>,
    pub(crate) distributions: Option<Vec<String>>,
    pub(crate) components: Option<Vec<String>>,
    pub(crate) architectures: Option<Vec<String>>,
    pub(crate) binary_strip: Option<StripConvention>,
    pub(crate) source_strip: Option<StripConvention>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Settings {
    pub(crate) base_url: Option<String>,
    pub(crate) output_dir: PathBuf,
    pub(crate) distributions: Vec<String>,
    pub(crate) components: Vec<String>,
    pub(crate) architectures: Vec<String>,
    pub(crate) conventions: StripConventions,
    pub(crate) log_level: String,
    pub(crate) user_agent: String,
    pub(crate) timeout: Duration,
}

impl Settings {
    pub(crate) fn resolve(file: ConfigFile, overrides: Overrides) -> Result<Self> {
        let settings = Self {
            base_url: overrides.base_url.or(file.base_url),
            output_dir: overrides
                .output_dir
                .or(file.output_dir)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
            distributions: pick_list(overrides.distributions, file.distributions, &["stable"]),
            components: pick_list(overrides.components, file.components, &["main", "contrib"]),
            architectures: pick_list(
                overrides.architectures,
                file.architectures,
                &["binary-amd64", "source"],
            ),
            conventions: StripConventions {
                binary: overrides
                    .binary_strip
                    .or(file.binary_strip)
                    .unwrap_or_default(),
                source: overrides
                    .source_strip
                    .or(file.source_strip)
                    .unwrap_or_default(),
            },
            log_level: file
                .log_level
                .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
            user_agent: file
                .user_agent
                .unwrap_or_else(|| format!("debrepoctl/{}", env!("CARGO_PKG_VERSION"))),
            timeout: Duration::from_secs(file.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)),
        };

        for (name, values) in [
            ("distributions", &settings.distributions),
            ("components", &settings.components),
            ("architectures", &settings.architectures),
        ] {
            if values.is_empty() {
                anyhow::bail!("config-invalid: {name} must not be empty");
            }
            if let Some(bad) = values.iter().find(|value| !is_path_segment(value)) {
                anyhow::bail!("config-invalid: {name} entry '{bad}' is not a single path segment");
            }
        }

        Ok(settings)
    }
}

/// Reads `explicit` if given; otherwise `debrepo.toml` in the working
/// directory when present, else an empty config.
pub(crate) fn load_config_file(explicit: Option<&Path>) -> Result<ConfigFile> {
    let (path, required) = match explicit {
        Some(path) => (path.to_path_buf(), true),
        None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
    };

    if !path.exists() {
        if required {
            anyhow::bail!("config-invalid: config file not found: {}", path.display());
        }
        return Ok(ConfigFile::default());
    }

    let content = fs::read_to_string(&path)
        .with_context(|| format!("failed reading config: {}", path.display()))?;
    ConfigFile::from_toml_str(&content)
        .with_context(|| format!("failed loading config: {}", path.display()))
}

fn pick_list(
    overridden: Option<Vec<String>>,
    configured: Option<Vec<String>>,
    default: &[&str],
) -> Vec<String> {
    let values = overridden
        .or(configured)
        .unwrap_or_else(|| default.iter().map(|value| value.to_string()).collect());
    values
        .into_iter()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .collect()
}

fn is_path_segment(value: &str) -> bool {
    value != "." && value != ".." && !value.contains(['/', '\\'])
}
