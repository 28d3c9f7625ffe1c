//! Catalog loading: the faction index, faction files and their sources.

/// Data-quality checks run on freshly loaded factions.
pub mod audit;
/// Index reconstruction from a directory of faction files.
pub mod discovery;
/// Local and remote catalog locations.
pub mod source;
mod store;

pub use audit::{audit_faction, AuditFinding, AuditProblem};
pub use discovery::discover_index;
pub use source::CatalogSource;
pub use store::{CatalogStore, LoadedFaction};
