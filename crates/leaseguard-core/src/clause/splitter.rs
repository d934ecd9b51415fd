//! Numbered-clause splitting for plain-text clause listings.
//!
//! Extraction output (and most hand-typed leases) enumerate clauses as
//! `1. ...`, `2. ...` on their own lines. Text before the first marker is
//! kept as its own clause when non-empty.

use lazy_static::lazy_static;
use regex::Regex;

use super::Clause;

lazy_static! {
    /// Line-leading clause number: `1.`, `12)`, with surrounding indentation.
    static ref CLAUSE_MARKER: Regex = Regex::new(r"(?m)^[ \t]*\d+[.)][ \t]+").unwrap();
}

/// Split plain text into clauses on line-leading number markers.
pub fn split_numbered_clauses(text: &str) -> Vec<Clause> {
    CLAUSE_MARKER
        .split(text)
        .filter_map(Clause::new)
        .collect()
}
