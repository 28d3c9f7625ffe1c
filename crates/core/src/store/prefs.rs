use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::KeyValueStore;
use crate::error::StoreError;

/// Store key for panel collapse flags. Kept apart from saved crews.
pub const COLLAPSED_SECTIONS_KEY: &str = "collapsed-sections";

/// Per-section collapse preferences for the presentation layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SectionFlags {
    flags: BTreeMap<String, bool>,
}

impl SectionFlags {
    /// Load flags, falling back to "everything expanded" on any read problem.
    pub fn load(store: &impl KeyValueStore) -> Self {
        match store.get(COLLAPSED_SECTIONS_KEY) {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|err| {
                warn!("Ignoring unreadable section flags: {err}");
                Self::default()
            }),
            Ok(None) => Self::default(),
            Err(err) => {
                warn!("Failed to read section flags: {err}");
                Self::default()
            }
        }
    }

    /// Write the flags back to `store`.
    pub fn persist(&self, store: &impl KeyValueStore) -> Result<(), StoreError> {
        let serialised = serde_json::to_string(self)?;
        store.set(COLLAPSED_SECTIONS_KEY, &serialised)
    }

    /// Whether `section` is collapsed; unknown sections are expanded.
    pub fn is_collapsed(&self, section: &str) -> bool {
        self.flags.get(section).copied().unwrap_or(false)
    }

    /// Flip a section and return its new collapsed state.
    pub fn toggle(&mut self, section: &str) -> bool {
        let entry = self.flags.entry(section.to_string()).or_insert(false);
        *entry = !*entry;
        *entry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, SAVED_CREWS_KEY};
    use anyhow::Result;

    #[test]
    fn flags_persist_under_their_own_key() -> Result<()> {
        let store = MemoryStore::new();
        let mut flags = SectionFlags::load(&store);
        assert!(!flags.is_collapsed("details"));
        assert!(flags.toggle("details"));
        flags.persist(&store)?;

        let reloaded = SectionFlags::load(&store);
        assert!(reloaded.is_collapsed("details"));
        assert!(!reloaded.is_collapsed("warnings"));
        assert_eq!(store.get(SAVED_CREWS_KEY)?, None);
        Ok(())
    }

    #[test]
    fn garbage_flags_fall_back_to_defaults() -> Result<()> {
        let store = MemoryStore::new();
        store.set(COLLAPSED_SECTIONS_KEY, "nope")?;
        assert_eq!(SectionFlags::load(&store), SectionFlags::default());
        Ok(())
    }
}
