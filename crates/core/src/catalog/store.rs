use std::{io::ErrorKind, sync::Arc};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::{info, warn};

use super::{audit_faction, discover_index, AuditFinding, CatalogSource};
use crate::{
    config::AppConfig,
    error::LoadError,
    models::{CatalogIndex, Faction, FactionSummary},
};

/// A faction that finished loading, with its audit results.
#[derive(Debug, Clone)]
pub struct LoadedFaction {
    /// Index entry the faction was loaded from.
    pub summary: FactionSummary,
    /// Parsed faction file.
    pub faction: Arc<Faction>,
    /// Data problems found in the file.
    pub findings: Vec<AuditFinding>,
    /// Completion time of the load.
    pub loaded_at: DateTime<Utc>,
}

/// Cloneable handle to the faction index and the most recently loaded
/// faction. Loads may overlap; whichever completes last becomes current.
#[derive(Clone)]
pub struct CatalogStore {
    source: CatalogSource,
    index_file: String,
    inner: Arc<RwLock<Inner>>,
}

#[derive(Default)]
struct Inner {
    index: Option<CatalogIndex>,
    current: Option<LoadedFaction>,
}

impl CatalogStore {
    /// Build a store reading `index_file` and faction files from `source`.
    pub fn new(source: CatalogSource, index_file: impl Into<String>) -> Self {
        Self {
            source,
            index_file: index_file.into(),
            inner: Arc::new(RwLock::new(Inner::default())),
        }
    }

    /// Store configured from application settings.
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.catalog_source(), config.index_file.clone())
    }

    /// Location of the catalog.
    pub fn source(&self) -> &CatalogSource {
        &self.source
    }

    /// Fetch the faction index. A local catalog without an index file is
    /// indexed from its faction files instead.
    pub async fn load_index(&self) -> Result<Vec<FactionSummary>, LoadError> {
        let index = match self.source.fetch::<CatalogIndex>(&self.index_file).await {
            Ok(index) => index,
            Err(LoadError::Read { path, source }) if source.kind() == ErrorKind::NotFound => {
                let Some(dir) = self.source.directory() else {
                    return Err(LoadError::Read { path, source });
                };
                warn!(dir = %dir.display(), "Index missing; discovering faction files");
                discover_index(dir)?
            }
            Err(err) => {
                warn!("Catalog index load failed: {err}");
                return Err(err);
            }
        };

        let summaries = index.summaries();
        info!(total = summaries.len(), "Catalog index loaded");
        self.inner.write().index = Some(index);
        Ok(summaries)
    }

    /// Cached index summaries, if the index has been loaded.
    pub fn factions(&self) -> Vec<FactionSummary> {
        self.inner
            .read()
            .index
            .as_ref()
            .map(CatalogIndex::summaries)
            .unwrap_or_default()
    }

    /// Load the faction identified by `faction_id` and make it current.
    pub async fn load_faction(&self, faction_id: &str) -> Result<LoadedFaction, LoadError> {
        let summary = match self.lookup(faction_id) {
            Some(found) => found,
            None => {
                self.load_index().await?;
                self.lookup(faction_id).flatten()
            }
        }
        .ok_or_else(|| LoadError::UnknownFaction(faction_id.to_string()))?;

        let faction: Faction = match self.source.fetch(&summary.id).await {
            Ok(faction) => faction,
            Err(err) => {
                warn!(faction = %summary.id, "Faction load failed: {err}");
                return Err(err);
            }
        };

        let findings = audit_faction(&faction);
        for finding in &findings {
            warn!(faction = %summary.id, "Catalog audit: {finding}");
        }

        let loaded = LoadedFaction {
            summary,
            faction: Arc::new(faction),
            findings,
            loaded_at: Utc::now(),
        };
        info!(
            faction = %loaded.summary.id,
            cards = loaded.faction.cards.len(),
            findings = loaded.findings.len(),
            "Faction loaded"
        );
        self.inner.write().current = Some(loaded.clone());
        Ok(loaded)
    }

    /// `None` when no index is cached yet, otherwise the matching summary.
    fn lookup(&self, faction_id: &str) -> Option<Option<FactionSummary>> {
        let inner = self.inner.read();
        let index = inner.index.as_ref()?;
        Some(index.entry(faction_id).map(|entry| entry.summary()))
    }

    /// Most recently loaded faction.
    pub fn current(&self) -> Option<LoadedFaction> {
        self.inner.read().current.clone()
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use anyhow::Result;
    use serde_json::json;
    use tempfile::tempdir;

    fn write_catalog(dir: &std::path::Path) -> Result<()> {
        fs::write(
            dir.join("index.json"),
            json!({
                "factions": [
                    {
                        "faction": "The Guild",
                        "file": "guild_cards.json",
                        "cards_count": 2,
                        "faction_ability": {"name": "Trade Routes", "description": "Hire mercenaries."}
                    },
                    {"faction": "Strigoi", "file": "strigoi_cards.json", "cards_count": 1},
                    {"faction": "Ghosts", "file": "missing_cards.json"}
                ],
                "total_factions": 3
            })
            .to_string(),
        )?;
        fs::write(
            dir.join("guild_cards.json"),
            json!({
                "faction": "The Guild",
                "faction_ability": {"name": "Trade Routes", "description": "Hire mercenaries."},
                "cards": [
                    {"name": "Captain", "rank": "Leader", "ducats": 40, "keywords": ["Unique"]},
                    {"name": "Thug", "rank": "Henchman", "ducats": 6}
                ]
            })
            .to_string(),
        )?;
        fs::write(
            dir.join("strigoi_cards.json"),
            json!({"cards": [{"name": "Vampire", "rank": "Leader", "ducats": 55}]}).to_string(),
        )?;
        Ok(())
    }

    #[tokio::test]
    async fn loads_index_and_factions_from_directory() -> Result<()> {
        let dir = tempdir()?;
        write_catalog(dir.path())?;
        let store = CatalogStore::new(CatalogSource::Directory(dir.path().into()), "index.json");

        let factions = store.load_index().await?;
        assert_eq!(factions.len(), 3);
        assert_eq!(factions[0].display_name, "The Guild");
        assert_eq!(store.factions(), factions);

        let guild = store.load_faction("guild_cards.json").await?;
        assert_eq!(guild.faction.cards.len(), 2);
        assert_eq!(guild.summary.display_name, "The Guild");
        assert!(!guild.findings.is_empty());

        let strigoi = store.load_faction("strigoi_cards.json").await?;
        let current = store.current().expect("current faction");
        assert_eq!(current.summary.id, strigoi.summary.id);
        Ok(())
    }

    #[tokio::test]
    async fn loads_catalog_in_build_output_shape() -> Result<()> {
        let dir = tempdir()?;
        fs::write(
            dir.path().join("index.json"),
            json!({
                "version": "1.0.0",
                "factions": [
                    {
                        "file": "guild_cards.json",
                        "faction": "The Guild",
                        "cards_count": 1,
                        "faction_ability": {
                            "name": "Mercenary Contracts",
                            "description": "The Guild may hire mercenaries from any faction."
                        }
                    },
                    {
                        "file": "broken_cards.json",
                        "faction": "Broken",
                        "cards_count": "Unknown",
                        "faction_ability": "Unknown"
                    }
                ]
            })
            .to_string(),
        )?;
        fs::write(
            dir.path().join("guild_cards.json"),
            json!({
                "faction": "The Guild",
                "faction_ability": {
                    "name": "Mercenary Contracts",
                    "description": "The Guild may hire mercenaries from any faction."
                },
                "cards": [{
                    "name": "Guild Master",
                    "rank": "Leader",
                    "ducats": 55,
                    "version": "2.2.0",
                    "keywords": ["Unique", "Human"],
                    "abilities": {"common": ["Leader"], "unique": [], "command": []}
                }]
            })
            .to_string(),
        )?;
        let store = CatalogStore::new(CatalogSource::Directory(dir.path().into()), "index.json");

        let factions = store.load_index().await?;
        assert_eq!(factions.len(), 2);
        assert_eq!(factions[0].card_count, Some(1));
        assert_eq!(
            factions[0].faction_ability.as_ref().map(|a| a.name.as_str()),
            Some("Mercenary Contracts")
        );
        assert_eq!(factions[1].card_count, None);
        assert_eq!(factions[1].faction_ability, None);

        let guild = store.load_faction("guild_cards.json").await?;
        assert_eq!(guild.faction.cards[0].name, "Guild Master");
        let ability = guild.faction.faction_ability.as_ref().expect("faction ability");
        assert!(ability.description.starts_with("The Guild may hire"));
        Ok(())
    }

    #[tokio::test]
    async fn load_faction_fetches_index_on_demand() -> Result<()> {
        let dir = tempdir()?;
        write_catalog(dir.path())?;
        let store = CatalogStore::new(CatalogSource::Directory(dir.path().into()), "index.json");

        let guild = store.load_faction("guild_cards.json").await?;
        assert_eq!(guild.faction.cards[0].name, "Captain");
        Ok(())
    }

    #[tokio::test]
    async fn failures_surface_as_load_errors_without_replacing_current() -> Result<()> {
        let dir = tempdir()?;
        write_catalog(dir.path())?;
        let store = CatalogStore::new(CatalogSource::Directory(dir.path().into()), "index.json");
        store.load_faction("guild_cards.json").await?;

        assert!(matches!(
            store.load_faction("nope.json").await,
            Err(LoadError::UnknownFaction(_))
        ));
        assert!(matches!(
            store.load_faction("missing_cards.json").await,
            Err(LoadError::Read { .. })
        ));
        fs::write(dir.path().join("strigoi_cards.json"), "{ broken")?;
        assert!(matches!(
            store.load_faction("strigoi_cards.json").await,
            Err(LoadError::Parse { .. })
        ));

        let current = store.current().expect("previous faction kept");
        assert_eq!(current.summary.id, "guild_cards.json");
        Ok(())
    }

    #[tokio::test]
    async fn missing_index_falls_back_to_discovery() -> Result<()> {
        let dir = tempdir()?;
        write_catalog(dir.path())?;
        fs::remove_file(dir.path().join("index.json"))?;
        let store = CatalogStore::new(CatalogSource::Directory(dir.path().into()), "index.json");

        let factions = store.load_index().await?;
        let ids: Vec<&str> = factions.iter().map(|summary| summary.id.as_str()).collect();
        assert_eq!(ids, vec!["guild_cards.json", "strigoi_cards.json"]);
        assert_eq!(factions[1].display_name, "Strigoi");
        Ok(())
    }
}
