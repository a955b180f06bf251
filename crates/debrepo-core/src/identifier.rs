use crate::record::PackageId;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentifierList {
    pub ids: Vec<PackageId>,
    /// Non-comment lines that are not `Package=Version`, with their 1-based line number.
    pub malformed: Vec<(usize, String)>,
}

impl IdentifierList {
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Parses newline-delimited `Package=Version` identifiers, skipping blank and `#` lines.
pub fn parse_identifier_list(text: &str) -> IdentifierList {
    let mut list = IdentifierList::default();
    for (index, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        match parse_identifier(trimmed) {
            Some(id) => list.ids.push(id),
            None => list.malformed.push((index + 1, trimmed.to_string())),
        }
    }
    list
}

pub fn parse_identifier(input: &str) -> Option<PackageId> {
    let (package, version) = input.split_once('=')?;
    let package = package.trim();
    let version = version.trim();
    if package.is_empty() || version.is_empty() {
        return None;
    }
    Some(PackageId::new(package, version))
}
