mod identifier;
mod path;
mod record;
mod stanza;

pub use identifier::{parse_identifier, parse_identifier_list, IdentifierList};
pub use path::{
    archive_prefix, raw_archive_path, IndexFamily, PathResolver, ResolveError, StripConvention,
    StripConventions,
};
pub use record::{
    PackageId, Record, DIRECTORY_FIELD, FILENAME_FIELD, PACKAGE_FIELD, VERSION_FIELD,
};
pub use stanza::{parse_lines, parse_str, serialize_record, serialize_records, StanzaParser};

#[cfg(test)]
mod tests;
