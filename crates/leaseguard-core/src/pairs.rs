//! Unordered clause pair enumeration.

use serde::{Deserialize, Serialize};

/// An unordered pair of clause indices with `first < second`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ClausePair {
    pub first: usize,
    pub second: usize,
}

impl ClausePair {
    /// Create a pair, ordering the indices. Returns `None` for a self-pair.
    pub fn new(a: usize, b: usize) -> Option<Self> {
        match a.cmp(&b) {
            std::cmp::Ordering::Less => Some(Self { first: a, second: b }),
            std::cmp::Ordering::Greater => Some(Self { first: b, second: a }),
            std::cmp::Ordering::Equal => None,
        }
    }
}

impl std::fmt::Display for ClausePair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.first, self.second)
    }
}

/// Number of unordered pairs over `n` clauses.
pub fn pair_count(n: usize) -> usize {
    n.saturating_mul(n.saturating_sub(1)) / 2
}

/// Every unordered pair over `n` clauses, ascending by `(first, second)`.
pub fn pair_candidates(n: usize) -> impl Iterator<Item = ClausePair> {
    (0..n).flat_map(move |first| {
        (first + 1..n).map(move |second| ClausePair { first, second })
    })
}
