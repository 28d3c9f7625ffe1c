use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use super::KeyValueStore;
use crate::{
    crew::{rules, CrewRoster, CrewSnapshot},
    error::StoreError,
    models::FactionSummary,
};

/// Store key holding the whole saved-crew collection.
pub const SAVED_CREWS_KEY: &str = "saved-crews";

/// Persisted, named snapshot of a crew with its faction and budget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedCrew {
    /// Generated once, kept across later saves of the same crew.
    pub id: String,
    /// Display name chosen by the user.
    pub name: String,
    /// Faction identifier.
    pub faction: String,
    /// Faction display name at save time.
    pub faction_name: String,
    /// Ducat limit.
    pub budget: u32,
    /// Deep copy of the roster.
    pub crew: CrewSnapshot,
    /// Roster cost at save time.
    pub total_cost: u32,
    /// Last save timestamp.
    pub saved_at: DateTime<Utc>,
    /// Whether the crew raised no warnings when saved.
    pub valid: bool,
}

impl SavedCrew {
    /// Faction reference the crew was built for.
    pub fn faction_ref(&self) -> FactionSummary {
        FactionSummary::new(self.faction.clone(), self.faction_name.clone())
    }
}

/// Storage-agnostic access to saved crews.
pub trait CrewRepository {
    /// Every saved crew in creation order. Unreadable or corrupt data yields an
    /// empty list.
    fn list_saved(&self) -> Vec<SavedCrew>;

    /// Saved crew with identifier `id`.
    fn get(&self, id: &str) -> Option<SavedCrew> {
        self.list_saved().into_iter().find(|crew| crew.id == id)
    }

    /// Save `roster`, overwriting the entry named by `existing_id` in place when
    /// it exists and appending a new entry with a fresh identifier otherwise.
    fn save(
        &self,
        roster: &CrewRoster,
        budget: u32,
        faction: &FactionSummary,
        name: &str,
        existing_id: Option<&str>,
    ) -> Result<SavedCrew, StoreError>;

    /// Remove the entry with identifier `id`; absent ids are ignored.
    fn delete(&self, id: &str) -> Result<(), StoreError>;
}

enum Collection {
    Absent,
    Parsed(Vec<SavedCrew>),
    Corrupt(String),
}

/// [`CrewRepository`] keeping the collection as one JSON array under a single
/// key of a [`KeyValueStore`].
pub struct KvCrewRepository<S> {
    store: S,
    key: String,
}

impl<S: KeyValueStore> KvCrewRepository<S> {
    /// Repository using the default [`SAVED_CREWS_KEY`].
    pub fn new(store: S) -> Self {
        Self::with_key(store, SAVED_CREWS_KEY)
    }

    /// Repository using a custom collection key.
    pub fn with_key(store: S, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    /// Underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    fn read_collection(&self) -> Result<Collection, StoreError> {
        let Some(raw) = self.store.get(&self.key)? else {
            return Ok(Collection::Absent);
        };
        match serde_json::from_str(&raw) {
            Ok(crews) => Ok(Collection::Parsed(crews)),
            Err(err) => {
                warn!(key = %self.key, "Saved crews unparsable: {err}");
                Ok(Collection::Corrupt(raw))
            }
        }
    }

    /// Current collection for a read-modify-write cycle. Unparsable data is
    /// copied aside first so the rewrite cannot destroy it.
    fn load_for_update(&self) -> Result<Vec<SavedCrew>, StoreError> {
        match self.read_collection()? {
            Collection::Absent => Ok(Vec::new()),
            Collection::Parsed(crews) => Ok(crews),
            Collection::Corrupt(raw) => {
                let backup_key = format!(
                    "{}.corrupt-{}",
                    self.key,
                    Utc::now().format("%Y%m%d%H%M%S%3f")
                );
                self.store.set(&backup_key, &raw)?;
                warn!(backup = %backup_key, "Backed up corrupt saved crews before rewrite");
                Ok(Vec::new())
            }
        }
    }

    fn write_collection(&self, crews: &[SavedCrew]) -> Result<(), StoreError> {
        let serialised = serde_json::to_string(crews)?;
        self.store.set(&self.key, &serialised)
    }
}

impl<S: KeyValueStore> CrewRepository for KvCrewRepository<S> {
    fn list_saved(&self) -> Vec<SavedCrew> {
        match self.read_collection() {
            Ok(Collection::Parsed(crews)) => crews,
            Ok(Collection::Absent) | Ok(Collection::Corrupt(_)) => Vec::new(),
            Err(err) => {
                warn!(key = %self.key, "Failed to read saved crews: {err}");
                Vec::new()
            }
        }
    }

    fn save(
        &self,
        roster: &CrewRoster,
        budget: u32,
        faction: &FactionSummary,
        name: &str,
        existing_id: Option<&str>,
    ) -> Result<SavedCrew, StoreError> {
        let mut crews = self.load_for_update()?;
        let position = existing_id.and_then(|id| crews.iter().position(|crew| crew.id == id));
        let id = match position {
            Some(index) => crews[index].id.clone(),
            None => Uuid::new_v4().hyphenated().to_string(),
        };

        let saved = SavedCrew {
            id,
            name: display_name(name, faction),
            faction: faction.id.clone(),
            faction_name: faction.display_name.clone(),
            budget,
            crew: roster.snapshot(),
            total_cost: roster.total_cost(),
            saved_at: Utc::now(),
            valid: rules::is_valid(roster, budget),
        };

        match position {
            Some(index) => crews[index] = saved.clone(),
            None => crews.push(saved.clone()),
        }
        self.write_collection(&crews)?;
        info!(
            id = %saved.id,
            name = %saved.name,
            faction = %saved.faction,
            updated = position.is_some(),
            "Crew saved"
        );
        Ok(saved)
    }

    fn delete(&self, id: &str) -> Result<(), StoreError> {
        let Collection::Parsed(mut crews) = self.read_collection()? else {
            return Ok(());
        };
        let before = crews.len();
        crews.retain(|crew| crew.id != id);
        if crews.len() == before {
            return Ok(());
        }
        self.write_collection(&crews)?;
        info!(id = %id, "Saved crew deleted");
        Ok(())
    }
}

fn display_name(name: &str, faction: &FactionSummary) -> String {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        format!("{} crew", faction.display_name)
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        crew::CrewModel,
        models::{Card, Rank},
        store::MemoryStore,
    };
    use anyhow::Result;

    fn guild() -> FactionSummary {
        FactionSummary::new("guild_cards.json", "The Guild")
    }

    fn sample_crew() -> CrewModel {
        let mut crew = CrewModel::new(60);
        for card in [
            Card::new("Boss", Rank::Leader, 20),
            Card::new("Blade", Rank::Hero, 15),
            Card::new("Blade", Rank::Hero, 15),
            Card::new("Thug", Rank::Henchman, 10),
            Card::new("Thug", Rank::Henchman, 10).with_keyword("Human"),
        ] {
            crew.add(Arc::new(card)).unwrap();
        }
        crew
    }

    #[test]
    fn save_and_reload_reproduces_roster() -> Result<()> {
        let repo = KvCrewRepository::new(MemoryStore::new());
        let crew = sample_crew();

        let saved = repo.save(crew.roster(), crew.budget(), &guild(), "  Night Watch ", None)?;
        assert_eq!(saved.name, "Night Watch");
        assert_eq!(saved.total_cost, 60);
        assert!(saved.valid);
        assert_eq!(saved.id.len(), 36);

        let loaded = repo.get(&saved.id).expect("saved crew present");
        assert_eq!(loaded, saved);

        let mut restored = CrewModel::new(0);
        let rejected = restored.restore(&loaded);
        assert!(rejected.is_empty());
        assert_eq!(restored.roster(), crew.roster());
        assert_eq!(restored.budget(), 60);
        assert_eq!(restored.saved_id(), Some(saved.id.as_str()));
        Ok(())
    }

    #[test]
    fn saving_with_existing_id_updates_in_place() -> Result<()> {
        let repo = KvCrewRepository::new(MemoryStore::new());
        let mut crew = sample_crew();

        let first = repo.save(crew.roster(), 60, &guild(), "First", None)?;
        let second = repo.save(crew.roster(), 60, &guild(), "Second", None)?;
        crew.add(Arc::new(Card::new("Thug", Rank::Henchman, 10)))
            .unwrap();
        let updated = repo.save(crew.roster(), 60, &guild(), "First v2", Some(&first.id))?;

        let all = repo.list_saved();
        assert_eq!(all.len(), 2);
        assert_eq!(updated.id, first.id);
        assert_eq!(all[0].id, first.id);
        assert_eq!(all[0].name, "First v2");
        assert_eq!(all[0].total_cost, 70);
        assert!(!all[0].valid);
        assert_eq!(all[1].id, second.id);
        Ok(())
    }

    #[test]
    fn unknown_existing_id_appends_new_entry() -> Result<()> {
        let repo = KvCrewRepository::new(MemoryStore::new());
        let crew = sample_crew();
        let saved = repo.save(crew.roster(), 60, &guild(), "", Some("stale-id"))?;
        assert_ne!(saved.id, "stale-id");
        assert_eq!(saved.name, "The Guild crew");
        assert_eq!(repo.list_saved().len(), 1);
        Ok(())
    }

    #[test]
    fn delete_removes_only_the_matching_entry() -> Result<()> {
        let repo = KvCrewRepository::new(MemoryStore::new());
        let crew = sample_crew();
        let a = repo.save(crew.roster(), 60, &guild(), "A", None)?;
        let b = repo.save(crew.roster(), 60, &guild(), "B", None)?;
        let c = repo.save(crew.roster(), 60, &guild(), "C", None)?;

        repo.delete(&b.id)?;
        repo.delete("not-there")?;

        let ids: Vec<String> = repo.list_saved().into_iter().map(|crew| crew.id).collect();
        assert_eq!(ids, vec![a.id, c.id]);
        assert!(repo.get(&b.id).is_none());
        Ok(())
    }

    #[test]
    fn corrupt_collection_reads_empty_and_is_backed_up_on_save() -> Result<()> {
        let store = MemoryStore::new();
        store.set(SAVED_CREWS_KEY, "[{ broken")?;
        let repo = KvCrewRepository::new(&store);

        assert!(repo.list_saved().is_empty());
        assert!(repo.get("anything").is_none());
        repo.delete("anything")?;
        assert_eq!(store.get(SAVED_CREWS_KEY)?.as_deref(), Some("[{ broken"));

        let crew = sample_crew();
        repo.save(crew.roster(), 60, &guild(), "Fresh", None)?;
        assert_eq!(repo.list_saved().len(), 1);

        let backups: Vec<String> = store
            .keys()
            .into_iter()
            .filter(|key| key.starts_with("saved-crews.corrupt-"))
            .collect();
        assert_eq!(backups.len(), 1);
        assert_eq!(store.get(&backups[0])?.as_deref(), Some("[{ broken"));
        Ok(())
    }

    #[test]
    fn stored_records_use_camel_case_fields() -> Result<()> {
        let store = MemoryStore::new();
        let repo = KvCrewRepository::new(&store);
        let crew = sample_crew();
        repo.save(crew.roster(), 60, &guild(), "Shape", None)?;

        let raw = store.get(SAVED_CREWS_KEY)?.unwrap_or_default();
        let value: serde_json::Value = serde_json::from_str(&raw)?;
        let record = &value[0];
        assert_eq!(record["factionName"], "The Guild");
        assert_eq!(record["totalCost"], 60);
        assert_eq!(record["crew"]["leaders"][0]["name"], "Boss");
        assert_eq!(record["crew"]["heroes"].as_array().map(Vec::len), Some(2));
        assert!(record["savedAt"].is_string());
        Ok(())
    }
}
