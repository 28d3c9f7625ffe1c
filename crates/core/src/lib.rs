#![warn(clippy::all, missing_docs)]

//! Core domain logic for the crewbook crew builder.
//!
//! This crate hosts the card catalog models and loaders, the crew
//! composition rules, saved-crew persistence and configuration used by
//! the terminal UI and any future frontends.

pub mod catalog;
pub mod config;
pub mod crew;
pub mod error;
pub mod models;
pub mod session;
pub mod store;

pub use catalog::{CatalogSource, CatalogStore, LoadedFaction};
pub use config::AppConfig;
pub use crew::{CrewModel, CrewReport, CrewRoster};
pub use error::{AddRejected, LoadError, SessionError, StoreError};
pub use models::{Card, Faction, FactionSummary, Rank, Slot};
pub use session::CrewSession;
pub use store::{CrewRepository, FileStore, KvCrewRepository, SavedCrew, SectionFlags};
