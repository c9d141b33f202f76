//! Cross-search (federation) eligibility.

use serde::Serialize;

/// Whether a keyword, or a whole query, may run against sister sites
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CrossSearchStrategy {
    /// Only the host site can answer this
    #[default]
    HostOnly,
    /// Any site can answer this
    AllSites,
}

impl CrossSearchStrategy {
    /// Logical AND of two verdicts
    pub fn intersect(self, other: CrossSearchStrategy) -> CrossSearchStrategy {
        match (self, other) {
            (CrossSearchStrategy::AllSites, CrossSearchStrategy::AllSites) => {
                CrossSearchStrategy::AllSites
            }
            _ => CrossSearchStrategy::HostOnly,
        }
    }

    pub fn is_all_sites(self) -> bool {
        self == CrossSearchStrategy::AllSites
    }
}

/// Fold per-keyword votes into one verdict, starting from all-sites.
///
/// A query without keywords may always federate.
pub fn evaluate<I>(votes: I) -> CrossSearchStrategy
where
    I: IntoIterator<Item = CrossSearchStrategy>,
{
    votes
        .into_iter()
        .fold(CrossSearchStrategy::AllSites, CrossSearchStrategy::intersect)
}
