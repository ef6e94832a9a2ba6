//! Batch input parsing
//!
//! Turns the two raw text blocks (one key per line, one tab-separated name
//! triple per line) into an ordered list of pending records. Parsing never
//! fails: short or missing name lines degrade to empty fields.

use tracing::debug;

use crate::record::{NameFields, Record};

/// Parse correlated key and name blocks into pending records.
///
/// Line `n` of `names` belongs to line `n` of `keys`. Blank key lines are
/// skipped but still consume their name line so the two blocks stay aligned.
pub fn parse_batch(keys: &str, names: &str) -> Vec<Record> {
    let mut name_lines = names.lines();
    let mut records = Vec::new();

    for (line_no, raw_key) in keys.lines().enumerate() {
        let name_line = name_lines.next();
        let key = raw_key.trim();
        if key.is_empty() {
            continue;
        }

        let input = match name_line {
            Some(line) => split_names(line),
            None => {
                debug!(line = line_no + 1, key, "No name line for key, using empty fields");
                NameFields::default()
            }
        };

        records.push(Record::pending(records.len(), key, input));
    }

    records
}

/// Split one tab-delimited line into the three name fields.
fn split_names(line: &str) -> NameFields {
    let mut parts = line.split('\t').map(str::trim);
    let given_name = parts.next().unwrap_or_default();
    let first_surname = parts.next().unwrap_or_default();
    let second_surname = parts.next().unwrap_or_default();

    if first_surname.is_empty() || second_surname.is_empty() {
        debug!(line, "Name line has missing fields");
    }

    NameFields::new(given_name, first_surname, second_surname)
}
