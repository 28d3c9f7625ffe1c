#![allow(missing_docs)]

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::Rank;

/// Keyword tag restricting a card to a single copy per crew.
pub const UNIQUE_KEYWORD: &str = "Unique";

/// A character card as published in a faction file.
///
/// Only `name`, `rank`, `ducats` and `keywords` matter to the crew rules; the
/// remaining fields are carried so snapshots reproduce the card faithfully.
/// Unrecognised fields are preserved in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    /// Card identity within its faction.
    pub name: String,
    /// Rank label as published; [`Card::rank`] maps it onto [`Rank`].
    #[serde(rename = "rank", default, skip_serializing_if = "Option::is_none")]
    pub rank_label: Option<String>,
    /// Point cost.
    #[serde(default)]
    pub ducats: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_size: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actions: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub will: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub life: Option<u32>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stat_block: Option<StatBlock>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub weapons: Vec<Weapon>,
    #[serde(default)]
    pub abilities: Abilities,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Card {
    /// Minimal card with no descriptive data.
    pub fn new(name: impl Into<String>, rank: Rank, ducats: u32) -> Self {
        Self {
            name: name.into(),
            rank_label: rank.label().map(str::to_string),
            ducats,
            page: None,
            version: None,
            base_size: None,
            actions: None,
            command: None,
            will: None,
            life: None,
            keywords: Vec::new(),
            stat_block: None,
            weapons: Vec::new(),
            abilities: Abilities::default(),
            extra: Map::new(),
        }
    }

    /// Builder-style helper attaching a keyword tag.
    pub fn with_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keywords.push(keyword.into());
        self
    }

    /// Case-insensitive keyword lookup.
    pub fn has_keyword(&self, keyword: &str) -> bool {
        self.keywords
            .iter()
            .any(|candidate| candidate.trim().eq_ignore_ascii_case(keyword))
    }

    /// Whether the card carries the `Unique` tag in any casing.
    pub fn is_unique(&self) -> bool {
        self.has_keyword(UNIQUE_KEYWORD)
    }

    /// Rank tier derived from the published label.
    pub fn rank(&self) -> Rank {
        self.rank_label
            .as_deref()
            .map(Rank::from_label)
            .unwrap_or_default()
    }

    /// Published rank label, or `"Unranked"` when there is none.
    pub fn rank_text(&self) -> &str {
        match self.rank_label.as_deref().map(str::trim) {
            Some(label) if !label.is_empty() => label,
            _ => "Unranked",
        }
    }
}

/// Core profile characteristics.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StatBlock {
    #[serde(default)]
    pub movement: Option<Value>,
    #[serde(default)]
    pub dexterity: Option<Value>,
    #[serde(default)]
    pub attack: Option<Value>,
    #[serde(default)]
    pub protection: Option<Value>,
    #[serde(default)]
    pub mind: Option<Value>,
}

impl StatBlock {
    /// Names of characteristics that are absent or null.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("movement", &self.movement),
            ("dexterity", &self.dexterity),
            ("attack", &self.attack),
            ("protection", &self.protection),
            ("mind", &self.mind),
        ]
        .into_iter()
        .filter(|(_, value)| matches!(value, None | Some(Value::Null)))
        .map(|(name, _)| name)
        .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Weapon {
    pub name: String,
    #[serde(default)]
    pub range: Value,
    #[serde(default)]
    pub evasion: Value,
    #[serde(default)]
    pub damage: Value,
    #[serde(default)]
    pub penetration: Value,
    #[serde(default)]
    pub abilities: Value,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Abilities {
    #[serde(default)]
    pub common: Vec<CommonAbility>,
    #[serde(default)]
    pub unique: Vec<NamedAbility>,
    #[serde(default)]
    pub command: Vec<CommandAbility>,
}

/// Common abilities appear either as a bare rulebook name or with their text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CommonAbility {
    /// Rulebook reference, e.g. `"Swimmer (2)"`.
    Name(String),
    /// Name plus printed description.
    Described(NamedAbility),
}

impl CommonAbility {
    /// Ability name regardless of representation.
    pub fn name(&self) -> &str {
        match self {
            CommonAbility::Name(name) => name,
            CommonAbility::Described(ability) => &ability.name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedAbility {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandAbility {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// `PULSE` or `AURA`.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}
