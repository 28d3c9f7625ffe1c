use std::{fs, path::Path};

use serde::{de::IgnoredAny, Deserialize};
use tracing::warn;
use walkdir::WalkDir;

use crate::{
    error::LoadError,
    models::{lenient_ability, CatalogIndex, IndexEntry, NamedAbility},
};

/// File name suffix used by published faction files.
pub const FACTION_FILE_SUFFIX: &str = "_cards.json";

#[derive(Deserialize)]
struct FactionHeader {
    #[serde(default)]
    faction: Option<String>,
    #[serde(default, deserialize_with = "lenient_ability")]
    faction_ability: Option<NamedAbility>,
    #[serde(default)]
    cards: Vec<IgnoredAny>,
}

/// Build an index from the `*_cards.json` files directly inside `dir`,
/// ordered by file name.
pub fn discover_index(dir: &Path) -> Result<CatalogIndex, LoadError> {
    let mut factions = Vec::new();

    let files = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file());

    for entry in files {
        let file = entry.file_name().to_string_lossy().to_string();
        let Some(stem) = file.strip_suffix(FACTION_FILE_SUFFIX) else {
            continue;
        };

        let header = fs::read_to_string(entry.path())
            .map_err(|err| err.to_string())
            .and_then(|content| {
                serde_json::from_str::<FactionHeader>(&content).map_err(|err| err.to_string())
            });
        let index_entry = match header {
            Ok(header) => IndexEntry {
                faction: header
                    .faction
                    .filter(|name| !name.trim().is_empty())
                    .unwrap_or_else(|| title_from_stem(stem)),
                file: file.clone(),
                card_count: Some(header.cards.len()),
                faction_ability: header.faction_ability,
            },
            Err(err) => {
                warn!("Indexing {} without metadata: {}", file, err);
                IndexEntry {
                    faction: title_from_stem(stem),
                    file: file.clone(),
                    card_count: None,
                    faction_ability: None,
                }
            }
        };
        factions.push(index_entry);
    }

    if factions.is_empty() {
        return Err(LoadError::MissingFaction(dir.to_path_buf()));
    }

    Ok(CatalogIndex {
        total_factions: Some(factions.len()),
        factions,
    })
}

fn title_from_stem(stem: &str) -> String {
    stem.split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
