//! Remote card payloads and the card tie-break policy.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use super::format::Format;

/// Non-physical pseudo-card types skipped when resolving a name.
pub const MARKER_TYPES: [&str; 1] = ["Stickers"];

/// One card object from the remote card search.
///
/// Only the fields the enrichment needs are decoded; everything else in the
/// payload is ignored. Missing and `null` fields decode to their default.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RemoteCard {
    pub id: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub type_line: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub color_identity: Vec<String>,

    /// format -> "legal" | "not_legal" | "banned" | ...
    #[serde(default, deserialize_with = "null_as_default")]
    pub legalities: BTreeMap<String, String>,

    /// price source -> amount (number or numeric string)
    #[serde(default, deserialize_with = "null_as_default")]
    pub prices: BTreeMap<String, Value>,

    #[serde(default)]
    pub edhrec_rank: Option<i64>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl RemoteCard {
    pub fn is_legal_in(&self, format: Format) -> bool {
        self.legalities
            .get(format.as_str())
            .is_some_and(|legality| legality == "legal")
    }

    pub fn is_marker_type(&self) -> bool {
        MARKER_TYPES.contains(&self.type_line.as_str())
    }
}

/// Result of a public deck search for one card.
#[derive(Debug, Clone, PartialEq)]
pub struct DeckSearch {
    pub total_results: u64,
    pub raw: Value,
}

/// Pick the best match among the cards returned for a name search.
///
/// Policy, in order:
/// 1. a single result is the match;
/// 2. prefer cards legal in `format` (all cards when none is legal);
/// 3. among those, skip marker types;
/// 4. first remaining card, else first legal card, else first card.
pub fn select_card(cards: Vec<RemoteCard>, format: Format) -> Option<RemoteCard> {
    if cards.len() <= 1 {
        return cards.into_iter().next();
    }

    let legal: Vec<usize> = (0..cards.len())
        .filter(|&i| cards[i].is_legal_in(format))
        .collect();
    let pool: Vec<usize> = if legal.is_empty() {
        (0..cards.len()).collect()
    } else {
        legal.clone()
    };

    let chosen = pool
        .iter()
        .copied()
        .find(|&i| !cards[i].is_marker_type())
        .or_else(|| legal.first().copied())
        .unwrap_or(0);

    cards.into_iter().nth(chosen)
}
