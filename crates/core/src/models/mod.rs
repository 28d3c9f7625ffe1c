//! Catalog data models.

mod card;
mod faction;

pub use card::{Abilities, Card, CommandAbility, CommonAbility, NamedAbility, StatBlock, Weapon};
pub use faction::{CatalogIndex, Faction, FactionSummary, IndexEntry};
pub(crate) use faction::lenient_ability;

/// Role tier of a card.
///
/// Catalog files carry the rank as a free-form label; [`Rank::from_label`] is
/// the single mapping from those labels to this enum. Any label other than
/// leader, hero or henchman becomes [`Rank::Unranked`], which rosters file
/// alongside henchmen (see [`Rank::slot`]). Cards keep the label itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Rank {
    /// At most one per crew.
    Leader,
    /// Limited by the henchman count.
    Hero,
    /// Rank-and-file members.
    Henchman,
    /// No recognised rank label.
    #[default]
    Unranked,
}

impl Rank {
    /// Map a catalog label such as `"Leader"` or `" henchman "` to a rank.
    /// Matching is exact apart from case and surrounding whitespace.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "leader" => Rank::Leader,
            "hero" => Rank::Hero,
            "henchman" | "henchmen" => Rank::Henchman,
            _ => Rank::Unranked,
        }
    }

    /// Canonical label; `None` for unranked cards.
    pub fn label(self) -> Option<&'static str> {
        match self {
            Rank::Leader => Some("Leader"),
            Rank::Hero => Some("Hero"),
            Rank::Henchman => Some("Henchman"),
            Rank::Unranked => None,
        }
    }

    /// Roster section a card of this rank is filed under.
    pub fn slot(self) -> Slot {
        match self {
            Rank::Leader => Slot::Leaders,
            Rank::Hero => Slot::Heroes,
            Rank::Henchman | Rank::Unranked => Slot::Henchmen,
        }
    }
}

/// One of the three ordered sections of a crew roster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    /// Leader-rank cards.
    Leaders,
    /// Hero-rank cards.
    Heroes,
    /// Henchmen and unranked cards.
    Henchmen,
}

impl Slot {
    /// Fixed search order used when removing by name.
    pub const ORDER: [Slot; 3] = [Slot::Leaders, Slot::Heroes, Slot::Henchmen];

    /// Section heading.
    pub fn title(self) -> &'static str {
        match self {
            Slot::Leaders => "Leader",
            Slot::Heroes => "Heroes",
            Slot::Henchmen => "Henchmen",
        }
    }
}
