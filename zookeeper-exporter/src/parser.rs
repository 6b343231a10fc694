//! Parser for `mntr` responses.
//!
//! A response is a list of `key<TAB>value` lines. Lines of any other shape
//! and keys missing from the [`Catalog`] are skipped; neither aborts the
//! parse.

use tracing::{trace, warn};

use crate::catalog::{Catalog, MetricSpec};

/// Outcome of parsing one response.
#[derive(Debug, Default, PartialEq)]
pub struct ParsedResponse<'a> {
    /// Recognized entries with their raw values, in encounter order.
    pub entries: Vec<(&'static MetricSpec, &'a str)>,
    /// Lines that did not have exactly two tab-separated fields.
    pub malformed_lines: usize,
    /// Well-formed lines whose key is not in the catalog.
    pub unknown_keys: usize,
}

/// Split `raw` into catalog entries.
pub fn parse<'a>(raw: &'a str, catalog: &Catalog) -> ParsedResponse<'a> {
    let mut parsed = ParsedResponse::default();

    let data = raw.trim();
    if data.is_empty() {
        return parsed;
    }

    for line in data.split('\n') {
        let mut fields = line.split('\t');
        let (Some(key), Some(value), None) = (fields.next(), fields.next(), fields.next()) else {
            warn!(
                data = %line,
                "Unexpected format of returned data, expected tab-separated key/value"
            );
            parsed.malformed_lines += 1;
            continue;
        };

        match catalog.lookup(key) {
            Some(spec) => {
                trace!(key = %key, value = %value, "Resolved metric");
                parsed.entries.push((spec, value));
            }
            None => {
                warn!(key = %key, "Key not configured in metric catalog");
                parsed.unknown_keys += 1;
            }
        }
    }

    parsed
}
