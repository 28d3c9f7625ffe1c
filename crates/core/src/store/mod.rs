//! Local persistence: a flat key-value store and the saved-crew repository
//! layered on top of it.

mod crews;
mod kv;
mod prefs;

pub use crews::{CrewRepository, KvCrewRepository, SavedCrew, SAVED_CREWS_KEY};
pub use kv::{FileStore, KeyValueStore, MemoryStore};
pub use prefs::{SectionFlags, COLLAPSED_SECTIONS_KEY};
