#![allow(missing_docs)]

use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::{Card, NamedAbility};

/// Placeholder the catalog build writes when it could not read a faction file.
const UNKNOWN: &str = "Unknown";

/// Catalog index document listing the available factions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogIndex {
    #[serde(default)]
    pub factions: Vec<IndexEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_factions: Option<usize>,
}

impl CatalogIndex {
    /// Lightweight descriptions suitable for a faction picker.
    pub fn summaries(&self) -> Vec<FactionSummary> {
        self.factions.iter().map(IndexEntry::summary).collect()
    }

    /// Entry whose faction id (its file path) matches `id`.
    pub fn entry(&self, id: &str) -> Option<&IndexEntry> {
        self.factions.iter().find(|entry| entry.file == id)
    }
}

/// Index row pointing at one faction file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    /// Display name.
    pub faction: String,
    /// Path of the faction file relative to the index.
    pub file: String,
    #[serde(
        rename = "cards_count",
        alias = "card_count",
        default,
        deserialize_with = "lenient_count",
        skip_serializing_if = "Option::is_none"
    )]
    pub card_count: Option<usize>,
    #[serde(
        default,
        deserialize_with = "lenient_ability",
        skip_serializing_if = "Option::is_none"
    )]
    pub faction_ability: Option<NamedAbility>,
}

impl IndexEntry {
    /// Convert into a picker summary.
    pub fn summary(&self) -> FactionSummary {
        FactionSummary {
            id: self.file.clone(),
            display_name: self.faction.clone(),
            card_count: self.card_count,
            faction_ability: self.faction_ability.clone(),
        }
    }
}

/// Faction reference exposed to the presentation layer and saved crews.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactionSummary {
    /// Stable identifier; the faction file path within the catalog.
    pub id: String,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub faction_ability: Option<NamedAbility>,
}

impl FactionSummary {
    /// Summary carrying only the identifying fields.
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            card_count: None,
            faction_ability: None,
        }
    }
}

/// Parsed faction file. Cards are shared so crew rosters can reference them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Faction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub faction: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_ability",
        skip_serializing_if = "Option::is_none"
    )]
    pub faction_ability: Option<NamedAbility>,
    #[serde(default)]
    pub cards: Vec<Arc<Card>>,
}

impl Faction {
    /// First card carrying `name`.
    pub fn card(&self, name: &str) -> Option<&Arc<Card>> {
        self.cards.iter().find(|card| card.name == name)
    }

    /// Filter cards using a case-insensitive substring search over name, rank
    /// and keywords.
    pub fn cards_matching(&self, query: &str) -> Vec<&Arc<Card>> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return self.cards.iter().collect();
        }

        self.cards
            .iter()
            .filter(|card| {
                card.name.to_lowercase().contains(&needle)
                    || card.rank_text().to_lowercase().contains(&needle)
                    || card
                        .keywords
                        .iter()
                        .any(|keyword| keyword.to_lowercase().contains(&needle))
            })
            .collect()
    }
}

/// Card count as a number; the `"Unknown"` placeholder and other strings read as absent.
fn lenient_count<'de, D>(deserializer: D) -> Result<Option<usize>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .and_then(|value| value.as_u64())
        .and_then(|count| usize::try_from(count).ok()))
}

/// Faction ability as a `{name, description}` object. A bare string is kept as
/// the name, except the `"Unknown"` placeholder.
pub(crate) fn lenient_ability<'de, D>(deserializer: D) -> Result<Option<NamedAbility>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(name)) => {
            let name = name.trim();
            if name.is_empty() || name == UNKNOWN {
                Ok(None)
            } else {
                Ok(Some(NamedAbility {
                    name: name.to_string(),
                    description: String::new(),
                }))
            }
        }
        Some(value @ Value::Object(_)) => serde_json::from_value(value)
            .map(Some)
            .map_err(serde::de::Error::custom),
        _ => Ok(None),
    }
}
