//! Enrichment status of an inventory record.

use std::fmt;

/// Where a record stands in the enrichment pipeline.
///
/// State transitions:
/// - Pending -> Enriched (card resolved and deck count fetched)
/// - Pending -> Failed (card resolved, deck count unavailable)
/// - Failed -> Enriched (on a retrying run)
///
/// A record whose card cannot be resolved is left untouched and stays Pending.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum EnrichmentStatus {
    #[default]
    Pending,
    Enriched,
    Failed,
}

impl EnrichmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Enriched => "enriched",
            Self::Failed => "failed",
        }
    }

    /// Unknown values read back as Pending so they get picked up again.
    pub fn from_db_str(s: &str) -> Self {
        match s {
            "enriched" => Self::Enriched,
            "failed" => Self::Failed,
            _ => Self::Pending,
        }
    }
}

impl fmt::Display for EnrichmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
