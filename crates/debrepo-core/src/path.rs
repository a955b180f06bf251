use std::fmt;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::record::{Record, DIRECTORY_FIELD, FILENAME_FIELD};

const POOL_DIR: &str = "pool";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexFamily {
    Binary,
    Source,
}

impl IndexFamily {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Binary => "binary",
            Self::Source => "source",
        }
    }

    pub fn index_file_name(self) -> &'static str {
        match self {
            Self::Binary => "Packages.gz",
            Self::Source => "Sources.gz",
        }
    }

    pub fn from_index_file_name(name: &str) -> Option<Self> {
        match name {
            "Packages.gz" => Some(Self::Binary),
            "Sources.gz" => Some(Self::Source),
            _ => None,
        }
    }

    /// Archive architecture directories are `binary-<arch>`, except `source`.
    pub fn from_arch(arch: &str) -> Self {
        if arch == "source" {
            Self::Source
        } else {
            Self::Binary
        }
    }

    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_ascii_lowercase().as_str() {
            "binary" => Some(Self::Binary),
            "source" => Some(Self::Source),
            _ => None,
        }
    }
}

/// How many leading components of a pool path are dropped to obtain the path
/// under an architecture-scoped output root.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum StripConvention {
    /// `pool/<component>/` is stripped: `pool/main/f/foo/x.deb` -> `f/foo/x.deb`.
    #[default]
    PoolComponent,
    /// `pool/<component>/<prefix>/` is stripped, where `<prefix>` must be the
    /// archive hash prefix of the following directory: `-> foo/x.deb`.
    PoolComponentPrefix,
    /// Exactly this many components, with no structural check.
    Components(usize),
}

impl StripConvention {
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        match trimmed {
            "pool-component" => return Ok(Self::PoolComponent),
            "pool-component-prefix" => return Ok(Self::PoolComponentPrefix),
            _ => {}
        }

        let count = trimmed.strip_prefix("components:").unwrap_or(trimmed);
        match count.parse::<usize>() {
            Ok(count) => Ok(Self::Components(count)),
            Err(_) => anyhow::bail!(
                "invalid strip convention '{input}': expected pool-component, pool-component-prefix, or components:<n>"
            ),
        }
    }

    pub fn strip_count(self) -> usize {
        match self {
            Self::PoolComponent => 2,
            Self::PoolComponentPrefix => 3,
            Self::Components(count) => count,
        }
    }

    /// Strips the leading pool components from a raw `/`-separated archive path.
    pub fn strip(self, raw: &str) -> Result<String, ResolveError> {
        let parts: Vec<&str> = raw.split('/').filter(|part| !part.is_empty()).collect();
        if parts.iter().any(|part| *part == ".." || *part == ".") {
            return Err(ResolveError::UnsafePath {
                raw: raw.to_string(),
            });
        }

        let count = self.strip_count();
        if parts.len() <= count {
            return Err(self.mismatch(raw, "too few path components"));
        }

        match self {
            Self::PoolComponent | Self::PoolComponentPrefix if parts[0] != POOL_DIR => {
                return Err(self.mismatch(raw, "path does not start with pool/"));
            }
            Self::PoolComponentPrefix if parts[2] != archive_prefix(parts[3]) => {
                return Err(self.mismatch(raw, "hash prefix does not match source directory"));
            }
            _ => {}
        }

        Ok(parts[count..].join("/"))
    }

    fn mismatch(self, raw: &str, reason: &str) -> ResolveError {
        ResolveError::PathConvention {
            raw: raw.to_string(),
            convention: self,
            reason: reason.to_string(),
        }
    }
}

impl fmt::Display for StripConvention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PoolComponent => f.write_str("pool-component"),
            Self::PoolComponentPrefix => f.write_str("pool-component-prefix"),
            Self::Components(count) => write!(f, "components:{count}"),
        }
    }
}

impl TryFrom<String> for StripConvention {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<StripConvention> for String {
    fn from(value: StripConvention) -> Self {
        value.to_string()
    }
}

/// Per-family strip conventions; binary and source indices may differ.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StripConventions {
    pub binary: StripConvention,
    pub source: StripConvention,
}

impl StripConventions {
    pub fn for_family(&self, family: IndexFamily) -> StripConvention {
        match family {
            IndexFamily::Binary => self.binary,
            IndexFamily::Source => self.source,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("record {label} has neither Filename nor Directory with Package and Version")]
    MissingIdentity { label: String },
    #[error("path '{raw}' does not match strip convention {convention}: {reason}")]
    PathConvention {
        raw: String,
        convention: StripConvention,
        reason: String,
    },
    #[error("path '{raw}' escapes the output root")]
    UnsafePath { raw: String },
}

/// Maps records to `/`-separated paths relative to one output root.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PathResolver {
    convention: StripConvention,
}

impl PathResolver {
    pub fn new(convention: StripConvention) -> Self {
        Self { convention }
    }

    pub fn convention(&self) -> StripConvention {
        self.convention
    }

    pub fn resolve(&self, record: &Record) -> Result<String, ResolveError> {
        let raw = raw_archive_path(record)?;
        self.convention.strip(&raw)
    }
}

/// `Filename` verbatim, or the `.dsc` path synthesized for a source record.
pub fn raw_archive_path(record: &Record) -> Result<String, ResolveError> {
    if let Some(filename) = record.get(FILENAME_FIELD) {
        return Ok(filename.to_string());
    }

    let missing = || ResolveError::MissingIdentity {
        label: record.label(),
    };
    let directory = record.get(DIRECTORY_FIELD).ok_or_else(missing)?;
    let package = record.package().ok_or_else(missing)?;
    let version = record.version().ok_or_else(missing)?;
    Ok(format!("{directory}/{package}_{version}.dsc"))
}

/// Pool hash prefix of a source name: `libf` for `libfoo`, `f` for `foo`.
pub fn archive_prefix(source_name: &str) -> &str {
    if source_name.starts_with("lib") && source_name.len() > 3 {
        let end = source_name
            .char_indices()
            .nth(4)
            .map_or(source_name.len(), |(index, _)| index);
        return &source_name[..end];
    }
    let end = source_name
        .char_indices()
        .nth(1)
        .map_or(source_name.len(), |(index, _)| index);
    &source_name[..end]
}
