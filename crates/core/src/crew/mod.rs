//! Crew roster, composition rules and the live editing model.

mod model;
mod roster;
pub mod rules;

pub use model::CrewModel;
pub use roster::{CrewRoster, CrewSnapshot};
pub use rules::{CrewReport, Severity, Warning, WarningKind, OVERAGE_TOLERANCE};
