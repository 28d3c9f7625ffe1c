#![allow(missing_docs)]

use std::sync::Arc;

use tracing::debug;

use super::{rules, CrewReport, CrewRoster};
use crate::{
    error::AddRejected,
    models::{Card, Slot},
    store::SavedCrew,
};

/// Live crew being edited: the roster, its budget and the saved crew it is
/// bound to, if any.
#[derive(Debug, Clone)]
pub struct CrewModel {
    roster: CrewRoster,
    budget: u32,
    saved_id: Option<String>,
}

impl CrewModel {
    /// Empty crew with the given ducat limit.
    pub fn new(budget: u32) -> Self {
        Self {
            roster: CrewRoster::new(),
            budget,
            saved_id: None,
        }
    }

    pub fn roster(&self) -> &CrewRoster {
        &self.roster
    }

    pub fn budget(&self) -> u32 {
        self.budget
    }

    pub fn set_budget(&mut self, budget: u32) {
        self.budget = budget;
    }

    /// Identifier of the saved crew subsequent saves overwrite.
    pub fn saved_id(&self) -> Option<&str> {
        self.saved_id.as_deref()
    }

    pub fn bind_saved(&mut self, id: impl Into<String>) {
        self.saved_id = Some(id.into());
    }

    /// Forget the binding; the next save creates a new entry.
    pub fn unbind_saved(&mut self) {
        self.saved_id = None;
    }

    /// Add `card` if the composition rules allow it, returning the section it
    /// was filed under.
    pub fn add(&mut self, card: Arc<Card>) -> Result<Slot, AddRejected> {
        if let Err(rejected) = rules::check_add(&card, &self.roster) {
            debug!(card = %card.name, reason = %rejected, "Add rejected");
            return Err(rejected);
        }
        Ok(self.roster.push(card))
    }

    /// Remove the first entry named `name` (leaders, then heroes, then henchmen).
    pub fn remove_one(&mut self, name: &str) -> Option<Arc<Card>> {
        self.roster.remove_one(name)
    }

    /// Remove every entry named `name`.
    pub fn remove_all(&mut self, name: &str) -> usize {
        self.roster.remove_all(name)
    }

    /// Clear the roster and forget the saved-crew binding. The budget is kept.
    pub fn reset(&mut self) {
        self.roster.clear();
        self.saved_id = None;
    }

    pub fn total_cost(&self) -> u32 {
        self.roster.total_cost()
    }

    pub fn count_of(&self, name: &str) -> usize {
        self.roster.count_of(name)
    }

    pub fn can_add(&self, card: &Card) -> bool {
        rules::can_add(card, &self.roster)
    }

    pub fn report(&self) -> CrewReport {
        rules::report(&self.roster, self.budget)
    }

    /// Replace the live crew with the contents of `saved`.
    ///
    /// Cards are re-added one by one through [`CrewModel::add`], so a snapshot
    /// that breaks the composition limits cannot smuggle a second leader or a
    /// duplicate unique card back in; refused cards are returned.
    pub fn restore(&mut self, saved: &SavedCrew) -> Vec<AddRejected> {
        self.reset();
        self.budget = saved.budget;
        self.saved_id = Some(saved.id.clone());

        saved
            .crew
            .cards()
            .filter_map(|card| self.add(Arc::new(card.clone())).err())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Rank;

    fn card(name: &str, rank: Rank, ducats: u32) -> Arc<Card> {
        Arc::new(Card::new(name, rank, ducats))
    }

    #[test]
    fn add_respects_rules_and_rank_slots() {
        let mut crew = CrewModel::new(100);
        assert_eq!(crew.add(card("Boss", Rank::Leader, 20)), Ok(Slot::Leaders));
        assert_eq!(crew.add(card("Rat", Rank::Unranked, 3)), Ok(Slot::Henchmen));
        assert!(matches!(
            crew.add(card("Boss Two", Rank::Leader, 20)),
            Err(AddRejected::LeaderLimit { .. })
        ));
        assert_eq!(crew.roster().len(), 2);
        assert_eq!(crew.total_cost(), 23);
    }

    #[test]
    fn add_then_remove_restores_total_cost() {
        let mut crew = CrewModel::new(100);
        crew.add(card("Boss", Rank::Leader, 20)).unwrap();
        let before = crew.total_cost();

        crew.add(card("Thug", Rank::Henchman, 10)).unwrap();
        assert_eq!(crew.total_cost(), before + 10);
        assert!(crew.remove_one("Thug").is_some());
        assert_eq!(crew.total_cost(), before);
    }

    #[test]
    fn reset_clears_roster_and_binding() {
        let mut crew = CrewModel::new(80);
        crew.add(card("Thug", Rank::Henchman, 10)).unwrap();
        crew.add(card("Thug", Rank::Henchman, 10)).unwrap();
        crew.bind_saved("abc");
        assert_eq!(crew.count_of("Thug"), 2);

        crew.reset();
        assert!(crew.roster().is_empty());
        assert_eq!(crew.saved_id(), None);
        assert_eq!(crew.budget(), 80);
    }

    #[test]
    fn unique_card_can_return_after_removal() {
        let mut crew = CrewModel::new(100);
        let unique = Arc::new(Card::new("Gondolier", Rank::Hero, 12).with_keyword("Unique"));
        crew.add(unique.clone()).unwrap();
        assert!(!crew.can_add(&unique));
        assert_eq!(crew.remove_all("Gondolier"), 1);
        assert!(crew.can_add(&unique));
    }
}
