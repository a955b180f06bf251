use serde::{Deserialize, Serialize};

pub const PACKAGE_FIELD: &str = "Package";
pub const VERSION_FIELD: &str = "Version";
pub const FILENAME_FIELD: &str = "Filename";
pub const DIRECTORY_FIELD: &str = "Directory";

/// One control-file stanza: field names in their original order, each unique.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    fields: Vec<(String, String)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fields<K, V>(fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let mut record = Self::new();
        for (key, value) in fields {
            record.insert(key, value);
        }
        record
    }

    /// Sets `key` to `value`. An existing key keeps its position.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| value.as_str())
    }

    pub(crate) fn get_mut(&mut self, key: &str) -> Option<&mut String> {
        self.fields
            .iter_mut()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| value)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn package(&self) -> Option<&str> {
        self.get(PACKAGE_FIELD)
    }

    pub fn version(&self) -> Option<&str> {
        self.get(VERSION_FIELD)
    }

    /// The (Package, Version) lookup key, when both fields are present.
    pub fn identity(&self) -> Option<PackageId> {
        Some(PackageId::new(self.package()?, self.version()?))
    }

    /// Short human label for logs and issue reports.
    pub fn label(&self) -> String {
        match (self.package(), self.version()) {
            (Some(package), Some(version)) => format!("{package}={version}"),
            (Some(package), None) => package.to_string(),
            _ => "<unnamed record>".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PackageId {
    pub package: String,
    pub version: String,
}

impl PackageId {
    pub fn new(package: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            version: version.into(),
        }
    }
}

impl std::fmt::Display for PackageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}={}", self.package, self.version)
    }
}
