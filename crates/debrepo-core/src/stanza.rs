use tracing::trace;

use crate::record::Record;

const FIELD_DELIMITER: char = ':';

#[derive(Debug)]
enum ParserState {
    BetweenStanzas,
    InStanza { record: Record, last_field: String },
}

/// Line-driven control-file parser.
///
/// A blank line closes the open stanza. A line holding a `:` opens a new field,
/// unless it is indented inside an open stanza, in which case it folds into the
/// last field like any other continuation line. Continuations are joined to the
/// previous value with `\n` and keep their leading whitespace so the record
/// serializes back to the text it was read from. Lines that fit none of these
/// rules are dropped.
#[derive(Debug)]
pub struct StanzaParser {
    state: ParserState,
    records: Vec<Record>,
}

impl Default for StanzaParser {
    fn default() -> Self {
        Self::new()
    }
}

impl StanzaParser {
    pub fn new() -> Self {
        Self {
            state: ParserState::BetweenStanzas,
            records: Vec::new(),
        }
    }

    pub fn push_line(&mut self, line: &str) {
        let line = line.trim_end_matches(['\n', '\r']);
        if line.trim().is_empty() {
            self.close_stanza();
            return;
        }

        let state = std::mem::replace(&mut self.state, ParserState::BetweenStanzas);
        self.state = match state {
            ParserState::BetweenStanzas => match split_field(line) {
                Some((key, value)) => {
                    let mut record = Record::new();
                    record.insert(key, value);
                    ParserState::InStanza {
                        record,
                        last_field: key.to_string(),
                    }
                }
                None => {
                    trace!(line, "dropping line outside of a stanza");
                    ParserState::BetweenStanzas
                }
            },
            ParserState::InStanza {
                mut record,
                last_field,
            } => {
                if is_folded(line) {
                    append_continuation(&mut record, &last_field, line);
                    ParserState::InStanza { record, last_field }
                } else if line.contains(FIELD_DELIMITER) {
                    match split_field(line) {
                        Some((key, value)) => {
                            record.insert(key, value);
                            ParserState::InStanza {
                                record,
                                last_field: key.to_string(),
                            }
                        }
                        None => {
                            trace!(line, "dropping field line with an empty name");
                            ParserState::InStanza { record, last_field }
                        }
                    }
                } else {
                    append_continuation(&mut record, &last_field, line);
                    ParserState::InStanza { record, last_field }
                }
            }
        };
    }

    /// Flushes a trailing stanza that was never closed by a blank line.
    pub fn finish(mut self) -> Vec<Record> {
        self.close_stanza();
        self.records
    }

    fn close_stanza(&mut self) {
        if let ParserState::InStanza { record, .. } =
            std::mem::replace(&mut self.state, ParserState::BetweenStanzas)
        {
            if !record.is_empty() {
                self.records.push(record);
            }
        }
    }
}

pub fn parse_lines<I, S>(lines: I) -> Vec<Record>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut parser = StanzaParser::new();
    for line in lines {
        parser.push_line(line.as_ref());
    }
    parser.finish()
}

pub fn parse_str(text: &str) -> Vec<Record> {
    parse_lines(text.lines())
}

/// `Key: Value` lines in field order followed by the blank stanza terminator.
/// A value with an empty first line is written as `Key:` with nothing after
/// the colon, as in the `Files:` block of a source stanza.
pub fn serialize_record(record: &Record) -> String {
    let mut out = String::new();
    for (key, value) in record.fields() {
        out.push_str(key);
        out.push(FIELD_DELIMITER);
        if !value.is_empty() && !value.starts_with('\n') {
            out.push(' ');
        }
        out.push_str(value);
        out.push('\n');
    }
    out.push('\n');
    out
}

pub fn serialize_records<'a>(records: impl IntoIterator<Item = &'a Record>) -> String {
    records.into_iter().map(serialize_record).collect()
}

fn split_field(line: &str) -> Option<(&str, &str)> {
    let (key, value) = line.split_once(FIELD_DELIMITER)?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    Some((key, value.trim()))
}

fn is_folded(line: &str) -> bool {
    line.starts_with([' ', '\t'])
}

fn append_continuation(record: &mut Record, last_field: &str, line: &str) {
    if let Some(value) = record.get_mut(last_field) {
        value.push('\n');
        value.push_str(line.trim_end());
    }
}
