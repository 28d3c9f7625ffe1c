use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::models::{Card, Slot};

/// Cards selected for a crew, grouped by roster section.
///
/// Entries share the catalog's cards rather than copying them. The structure
/// itself enforces nothing; composition limits are applied by
/// [`crate::crew::rules`] before insertion.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CrewRoster {
    leaders: Vec<Arc<Card>>,
    heroes: Vec<Arc<Card>>,
    henchmen: Vec<Arc<Card>>,
}

impl CrewRoster {
    /// Empty roster.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cards filed under `slot`, in insertion order.
    pub fn section(&self, slot: Slot) -> &[Arc<Card>] {
        match slot {
            Slot::Leaders => &self.leaders,
            Slot::Heroes => &self.heroes,
            Slot::Henchmen => &self.henchmen,
        }
    }

    fn section_mut(&mut self, slot: Slot) -> &mut Vec<Arc<Card>> {
        match slot {
            Slot::Leaders => &mut self.leaders,
            Slot::Heroes => &mut self.heroes,
            Slot::Henchmen => &mut self.henchmen,
        }
    }

    /// Leader-rank entries.
    pub fn leaders(&self) -> &[Arc<Card>] {
        &self.leaders
    }

    /// Hero-rank entries.
    pub fn heroes(&self) -> &[Arc<Card>] {
        &self.heroes
    }

    /// Henchman and unranked entries.
    pub fn henchmen(&self) -> &[Arc<Card>] {
        &self.henchmen
    }

    /// All entries in leaders → heroes → henchmen order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Card>> {
        self.leaders
            .iter()
            .chain(self.heroes.iter())
            .chain(self.henchmen.iter())
    }

    /// Number of entries across every section.
    pub fn len(&self) -> usize {
        self.leaders.len() + self.heroes.len() + self.henchmen.len()
    }

    /// Whether no card has been selected.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sum of ducat costs over every entry.
    pub fn total_cost(&self) -> u32 {
        self.iter().fold(0u32, |total, card| total.saturating_add(card.ducats))
    }

    /// Number of entries named `name` across every section.
    pub fn count_of(&self, name: &str) -> usize {
        self.iter().filter(|card| card.name == name).count()
    }

    /// Whether any entry is named `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.iter().any(|card| card.name == name)
    }

    /// Append `card` to the section its rank maps to. Callers must have
    /// consulted the composition rules first.
    pub(crate) fn push(&mut self, card: Arc<Card>) -> Slot {
        let slot = card.rank().slot();
        self.section_mut(slot).push(card);
        slot
    }

    /// Remove the first entry named `name`, searching leaders, then heroes,
    /// then henchmen.
    pub fn remove_one(&mut self, name: &str) -> Option<Arc<Card>> {
        for slot in Slot::ORDER {
            let section = self.section_mut(slot);
            if let Some(index) = section.iter().position(|card| card.name == name) {
                return Some(section.remove(index));
            }
        }
        None
    }

    /// Remove every entry named `name`, returning how many were dropped.
    pub fn remove_all(&mut self, name: &str) -> usize {
        let before = self.len();
        for slot in Slot::ORDER {
            self.section_mut(slot).retain(|card| card.name != name);
        }
        before - self.len()
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.leaders.clear();
        self.heroes.clear();
        self.henchmen.clear();
    }

    /// Deep copy of the roster for persistence.
    pub fn snapshot(&self) -> CrewSnapshot {
        let copy = |cards: &[Arc<Card>]| -> Vec<Card> {
            cards.iter().map(|card| Card::clone(card)).collect()
        };
        CrewSnapshot {
            leaders: copy(&self.leaders),
            heroes: copy(&self.heroes),
            henchmen: copy(&self.henchmen),
        }
    }
}

/// Persisted roster shape: full card objects per section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CrewSnapshot {
    /// Leader-rank cards.
    #[serde(default)]
    pub leaders: Vec<Card>,
    /// Hero-rank cards.
    #[serde(default)]
    pub heroes: Vec<Card>,
    /// Henchman and unranked cards.
    #[serde(default)]
    pub henchmen: Vec<Card>,
}

impl CrewSnapshot {
    /// Every stored card in leaders → heroes → henchmen order.
    pub fn cards(&self) -> impl Iterator<Item = &Card> {
        self.leaders
            .iter()
            .chain(self.heroes.iter())
            .chain(self.henchmen.iter())
    }

    /// Sum of ducat costs.
    pub fn total_cost(&self) -> u32 {
        self.cards().fold(0u32, |total, card| total.saturating_add(card.ducats))
    }
}
