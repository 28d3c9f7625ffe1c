//! The editing session a frontend drives: the loaded faction plus the live crew.

use std::sync::Arc;

use tracing::info;

use crate::{
    catalog::LoadedFaction,
    crew::{CrewModel, CrewReport},
    error::{AddRejected, SessionError},
    models::{Card, Faction, Slot},
    store::{CrewRepository, SavedCrew},
};

/// Loaded faction and the crew being built from it.
///
/// Installing a faction always starts a fresh crew, so a crew never mixes
/// cards from two factions.
#[derive(Debug, Clone)]
pub struct CrewSession {
    faction: Option<LoadedFaction>,
    crew: CrewModel,
}

impl CrewSession {
    /// Session with no faction and an empty crew limited to `default_budget`.
    pub fn new(default_budget: u32) -> Self {
        Self {
            faction: None,
            crew: CrewModel::new(default_budget),
        }
    }

    /// Faction currently installed.
    pub fn faction(&self) -> Option<&LoadedFaction> {
        self.faction.as_ref()
    }

    /// Live crew.
    pub fn crew(&self) -> &CrewModel {
        &self.crew
    }

    /// Mutable access to the live crew (budget edits and the like).
    pub fn crew_mut(&mut self) -> &mut CrewModel {
        &mut self.crew
    }

    /// Make `loaded` the active faction and reset the crew. Called for every
    /// completed load, so the most recent completion wins.
    pub fn install_faction(&mut self, loaded: LoadedFaction) {
        info!(
            faction = %loaded.summary.id,
            cards = loaded.faction.cards.len(),
            "Faction installed"
        );
        self.faction = Some(loaded);
        self.crew.reset();
    }

    fn loaded(&self) -> Result<&LoadedFaction, SessionError> {
        self.faction.as_ref().ok_or(SessionError::NoFaction)
    }

    fn catalog(&self) -> Result<&Faction, SessionError> {
        Ok(&self.loaded()?.faction)
    }

    /// Card named `name` from the installed faction.
    pub fn card(&self, name: &str) -> Result<&Arc<Card>, SessionError> {
        self.catalog()?
            .card(name)
            .ok_or_else(|| SessionError::UnknownCard(name.to_string()))
    }

    /// Add the catalog card named `name` to the crew.
    pub fn add_card(&mut self, name: &str) -> Result<Slot, SessionError> {
        let card = Arc::clone(self.card(name)?);
        Ok(self.crew.add(card)?)
    }

    /// Remove one entry named `name`. Returns false when none was present.
    pub fn remove_one(&mut self, name: &str) -> bool {
        self.crew.remove_one(name).is_some()
    }

    /// Remove every entry named `name`, returning how many went.
    pub fn remove_all(&mut self, name: &str) -> usize {
        self.crew.remove_all(name)
    }

    /// Change the ducat limit of the live crew.
    pub fn set_budget(&mut self, budget: u32) {
        self.crew.set_budget(budget);
    }

    /// Start over with an empty, unbound crew. Faction and budget stay.
    pub fn new_crew(&mut self) {
        self.crew.reset();
    }

    /// Budget and warnings for the live crew.
    pub fn report(&self) -> CrewReport {
        self.crew.report()
    }

    /// Save the crew, overwriting the saved crew it is bound to if there is one.
    pub fn save(
        &mut self,
        repo: &dyn CrewRepository,
        name: &str,
    ) -> Result<SavedCrew, SessionError> {
        let existing = self.crew.saved_id().map(str::to_string);
        self.persist(repo, name, existing.as_deref())
    }

    /// Save the crew as a new entry, leaving any previously saved copy alone.
    pub fn save_as_new(
        &mut self,
        repo: &dyn CrewRepository,
        name: &str,
    ) -> Result<SavedCrew, SessionError> {
        self.persist(repo, name, None)
    }

    fn persist(
        &mut self,
        repo: &dyn CrewRepository,
        name: &str,
        existing_id: Option<&str>,
    ) -> Result<SavedCrew, SessionError> {
        let summary = self.loaded()?.summary.clone();
        let saved = repo.save(
            self.crew.roster(),
            self.crew.budget(),
            &summary,
            name,
            existing_id,
        )?;
        self.crew.bind_saved(saved.id.clone());
        Ok(saved)
    }

    /// Replace the live crew with `saved`. The saved crew's faction must be the
    /// installed one; cards the rules refuse are returned.
    pub fn restore_saved(&mut self, saved: &SavedCrew) -> Result<Vec<AddRejected>, SessionError> {
        let loaded = self.loaded()?;
        if loaded.summary.id != saved.faction {
            return Err(SessionError::FactionMismatch {
                expected: saved.faction.clone(),
                loaded: loaded.summary.id.clone(),
            });
        }
        let rejected = self.crew.restore(saved);
        info!(id = %saved.id, rejected = rejected.len(), "Saved crew restored");
        Ok(rejected)
    }

    /// Look up `id` in `repo` and restore it.
    pub fn load_saved(
        &mut self,
        repo: &dyn CrewRepository,
        id: &str,
    ) -> Result<Vec<AddRejected>, SessionError> {
        let saved = repo
            .get(id)
            .ok_or_else(|| SessionError::UnknownSave(id.to_string()))?;
        self.restore_saved(&saved)
    }

    /// Delete a saved crew. If the live crew was bound to it, later saves
    /// create a new entry.
    pub fn delete_saved(&mut self, repo: &dyn CrewRepository, id: &str) -> Result<(), SessionError> {
        repo.delete(id)?;
        if self.crew.saved_id() == Some(id) {
            self.crew.unbind_saved();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{FactionSummary, Rank},
        store::{KvCrewRepository, MemoryStore},
    };
    use chrono::Utc;

    fn loaded(id: &str) -> LoadedFaction {
        let faction = Faction {
            faction: Some("The Guild".to_string()),
            faction_ability: None,
            cards: vec![
                Arc::new(Card::new("Captain", Rank::Leader, 40).with_keyword("Unique")),
                Arc::new(Card::new("Sergeant", Rank::Hero, 25)),
                Arc::new(Card::new("Thug", Rank::Henchman, 6)),
            ],
        };
        LoadedFaction {
            summary: FactionSummary::new(id, "The Guild"),
            faction: Arc::new(faction),
            findings: Vec::new(),
            loaded_at: Utc::now(),
        }
    }

    fn session() -> CrewSession {
        let mut session = CrewSession::new(150);
        session.install_faction(loaded("guild_cards.json"));
        session
    }

    #[test]
    fn operations_require_a_faction() {
        let mut session = CrewSession::new(150);
        assert!(matches!(
            session.add_card("Captain"),
            Err(SessionError::NoFaction)
        ));
        let repo = KvCrewRepository::new(MemoryStore::new());
        assert!(matches!(
            session.save(&repo, "x"),
            Err(SessionError::NoFaction)
        ));
    }

    #[test]
    fn add_and_remove_cards_by_name() {
        let mut session = session();
        assert_eq!(session.add_card("Captain").unwrap(), Slot::Leaders);
        assert_eq!(session.add_card("Thug").unwrap(), Slot::Henchmen);
        assert_eq!(session.add_card("Thug").unwrap(), Slot::Henchmen);
        assert!(matches!(
            session.add_card("Captain"),
            Err(SessionError::Rejected(_))
        ));
        assert!(matches!(
            session.add_card("Ghost"),
            Err(SessionError::UnknownCard(_))
        ));

        assert!(session.remove_one("Thug"));
        assert_eq!(session.crew().count_of("Thug"), 1);
        assert_eq!(session.remove_all("Thug"), 1);
        assert!(!session.remove_one("Thug"));
        assert_eq!(session.report().total_cost, 40);
    }

    #[test]
    fn installing_a_faction_resets_the_crew() {
        let mut session = session();
        session.add_card("Captain").unwrap();
        session.set_budget(200);

        session.install_faction(loaded("strigoi_cards.json"));
        assert!(session.crew().roster().is_empty());
        assert_eq!(session.crew().budget(), 200);
        assert_eq!(
            session.faction().map(|f| f.summary.id.as_str()),
            Some("strigoi_cards.json")
        );
    }

    #[test]
    fn save_binds_and_updates_in_place() {
        let repo = KvCrewRepository::new(MemoryStore::new());
        let mut session = session();
        session.add_card("Captain").unwrap();

        let first = session.save(&repo, "Night watch").unwrap();
        assert_eq!(session.crew().saved_id(), Some(first.id.as_str()));

        session.add_card("Thug").unwrap();
        let second = session.save(&repo, "Night watch").unwrap();
        assert_eq!(second.id, first.id);
        assert_eq!(repo.list_saved().len(), 1);
        assert_eq!(repo.list_saved()[0].total_cost, 46);

        let copy = session.save_as_new(&repo, "Copy").unwrap();
        assert_ne!(copy.id, first.id);
        assert_eq!(session.crew().saved_id(), Some(copy.id.as_str()));
        assert_eq!(repo.list_saved().len(), 2);

        session.new_crew();
        assert!(session.crew().saved_id().is_none());
        assert!(session.crew().roster().is_empty());
    }

    #[test]
    fn load_saved_checks_faction_and_rebinds() {
        let repo = KvCrewRepository::new(MemoryStore::new());
        let mut session = session();
        session.add_card("Captain").unwrap();
        session.add_card("Sergeant").unwrap();
        session.set_budget(120);
        let saved = session.save(&repo, "Alpha").unwrap();

        session.new_crew();
        session.set_budget(150);
        let rejected = session.load_saved(&repo, &saved.id).unwrap();
        assert!(rejected.is_empty());
        assert_eq!(session.crew().roster().len(), 2);
        assert_eq!(session.crew().budget(), 120);
        assert_eq!(session.crew().saved_id(), Some(saved.id.as_str()));

        assert!(matches!(
            session.load_saved(&repo, "missing"),
            Err(SessionError::UnknownSave(_))
        ));

        session.install_faction(loaded("strigoi_cards.json"));
        assert!(matches!(
            session.restore_saved(&saved),
            Err(SessionError::FactionMismatch { .. })
        ));
        assert!(session.crew().roster().is_empty());
    }

    #[test]
    fn deleting_the_bound_save_unbinds_but_keeps_the_roster() {
        let repo = KvCrewRepository::new(MemoryStore::new());
        let mut session = session();
        session.add_card("Thug").unwrap();
        let saved = session.save(&repo, "Alpha").unwrap();

        session.delete_saved(&repo, &saved.id).unwrap();
        assert!(repo.list_saved().is_empty());
        assert!(session.crew().saved_id().is_none());
        assert_eq!(session.crew().count_of("Thug"), 1);

        let again = session.save(&repo, "Alpha").unwrap();
        assert_ne!(again.id, saved.id);
    }
}
