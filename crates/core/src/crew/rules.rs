//! Crew composition rules.
//!
//! Everything here is a pure function of the roster, the budget and the
//! candidate card. Nothing blocks or throws: eligibility is answered with a
//! reason, validity with a list of warnings.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::CrewRoster;
use crate::{error::AddRejected, models::Card, models::Rank};

/// Ducats a crew may exceed its budget by before the overage counts as a
/// violation rather than an advisory.
pub const OVERAGE_TOLERANCE: u32 = 5;

/// Check whether `card` may join `roster`, naming the rule that forbids it.
pub fn check_add(card: &Card, roster: &CrewRoster) -> Result<(), AddRejected> {
    if card.rank() == Rank::Leader && !roster.leaders().is_empty() {
        return Err(AddRejected::LeaderLimit {
            card: card.name.clone(),
        });
    }
    if card.is_unique() && roster.contains(&card.name) {
        return Err(AddRejected::DuplicateUnique {
            card: card.name.clone(),
        });
    }
    Ok(())
}

/// Whether `card` may join `roster`.
pub fn can_add(card: &Card, roster: &CrewRoster) -> bool {
    check_add(card, roster).is_ok()
}

/// How seriously a warning should be taken. Neither level blocks saving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Worth pointing out; the crew is still playable.
    Advisory,
    /// Breaks a composition rule.
    Violation,
}

/// Rule a warning was raised for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum WarningKind {
    /// No leader selected.
    LeaderRequired,
    /// More than one leader selected.
    TooManyLeaders {
        /// Leaders present.
        leaders: usize,
    },
    /// Heroes outnumber henchmen.
    HeroesExceedHenchmen {
        /// Heroes present.
        heroes: usize,
        /// Henchmen present.
        henchmen: usize,
    },
    /// Total cost exceeds the budget.
    OverBudget {
        /// Ducats above the budget.
        overage: u32,
    },
}

/// A single validation finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warning {
    /// Blocking convention for this finding.
    pub severity: Severity,
    /// Rule that produced it.
    #[serde(flatten)]
    pub kind: WarningKind,
}

impl Warning {
    fn advisory(kind: WarningKind) -> Self {
        Self {
            severity: Severity::Advisory,
            kind,
        }
    }

    fn violation(kind: WarningKind) -> Self {
        Self {
            severity: Severity::Violation,
            kind,
        }
    }

    /// Whether this finding breaks a rule.
    pub fn is_violation(&self) -> bool {
        self.severity == Severity::Violation
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            WarningKind::LeaderRequired => write!(f, "A leader is required"),
            WarningKind::TooManyLeaders { leaders } => {
                write!(f, "Only one leader allowed ({leaders} selected)")
            }
            WarningKind::HeroesExceedHenchmen { heroes, henchmen } => write!(
                f,
                "Heroes ({heroes}) cannot outnumber henchmen ({henchmen})"
            ),
            WarningKind::OverBudget { overage } => {
                write!(f, "Over budget by {overage} ducats")
            }
        }
    }
}

/// Evaluate every composition rule against `roster` and `budget`.
pub fn validate(roster: &CrewRoster, budget: u32) -> Vec<Warning> {
    let mut warnings = Vec::new();

    match roster.leaders().len() {
        0 => warnings.push(Warning::advisory(WarningKind::LeaderRequired)),
        1 => {}
        leaders => warnings.push(Warning::violation(WarningKind::TooManyLeaders { leaders })),
    }

    let heroes = roster.heroes().len();
    let henchmen = roster.henchmen().len();
    if heroes > henchmen {
        warnings.push(Warning::violation(WarningKind::HeroesExceedHenchmen {
            heroes,
            henchmen,
        }));
    }

    let total = roster.total_cost();
    if total > budget {
        let overage = total - budget;
        let kind = WarningKind::OverBudget { overage };
        if overage <= OVERAGE_TOLERANCE {
            warnings.push(Warning::advisory(kind));
        } else {
            warnings.push(Warning::violation(kind));
        }
    }

    warnings
}

/// Whether the roster raises no warnings at all.
pub fn is_valid(roster: &CrewRoster, budget: u32) -> bool {
    validate(roster, budget).is_empty()
}

/// Budget and validity summary rendered alongside a crew.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrewReport {
    /// Sum of ducats over the roster.
    pub total_cost: u32,
    /// Configured ducat limit.
    pub budget: u32,
    /// Ducats left; negative when over budget.
    pub remaining: i64,
    /// Findings from [`validate`].
    pub warnings: Vec<Warning>,
}

impl CrewReport {
    /// No warnings raised.
    pub fn is_valid(&self) -> bool {
        self.warnings.is_empty()
    }

    /// At least one rule is broken.
    pub fn has_violations(&self) -> bool {
        self.warnings.iter().any(Warning::is_violation)
    }
}

/// Build a [`CrewReport`] for presentation.
pub fn report(roster: &CrewRoster, budget: u32) -> CrewReport {
    let total_cost = roster.total_cost();
    CrewReport {
        total_cost,
        budget,
        remaining: i64::from(budget) - i64::from(total_cost),
        warnings: validate(roster, budget),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn card(name: &str, rank: Rank, ducats: u32) -> Arc<Card> {
        Arc::new(Card::new(name, rank, ducats))
    }

    fn sample_roster() -> CrewRoster {
        let mut roster = CrewRoster::new();
        roster.push(card("Boss", Rank::Leader, 20));
        roster.push(card("Blade", Rank::Hero, 15));
        roster.push(card("Blade", Rank::Hero, 15));
        roster.push(card("Thug", Rank::Henchman, 10));
        roster.push(card("Thug", Rank::Henchman, 10));
        roster
    }

    #[test]
    fn second_leader_is_refused_even_when_not_unique() {
        let mut roster = CrewRoster::new();
        let boss = card("Boss", Rank::Leader, 20);
        assert!(can_add(&boss, &roster));
        roster.push(boss);

        let other = Card::new("Other Boss", Rank::Leader, 25);
        assert_eq!(
            check_add(&other, &roster),
            Err(AddRejected::LeaderLimit {
                card: "Other Boss".to_string()
            })
        );
        let unique_other = Card::new("Unique Boss", Rank::Leader, 25).with_keyword("Unique");
        assert!(!can_add(&unique_other, &roster));
    }

    #[test]
    fn unique_tag_blocks_duplicates_in_any_casing() {
        let mut roster = CrewRoster::new();
        let hero = Card::new("Gondolier", Rank::Hero, 12).with_keyword("uNiQuE");
        assert!(can_add(&hero, &roster));
        roster.push(Arc::new(hero.clone()));

        assert_eq!(
            check_add(&hero, &roster),
            Err(AddRejected::DuplicateUnique {
                card: "Gondolier".to_string()
            })
        );
        let different = Card::new("Bravo", Rank::Hero, 12).with_keyword("UNIQUE");
        assert!(can_add(&different, &roster));
    }

    #[test]
    fn non_unique_cards_repeat_freely() {
        let mut roster = CrewRoster::new();
        let thug = card("Thug", Rank::Henchman, 10);
        for _ in 0..6 {
            assert!(can_add(&thug, &roster));
            roster.push(thug.clone());
        }
        assert_eq!(roster.count_of("Thug"), 6);
        let tagged = Card::new("Thug", Rank::Henchman, 10).with_keyword("Uniquely Ugly");
        assert!(can_add(&tagged, &roster));
    }

    #[test]
    fn balanced_roster_on_budget_is_valid() {
        let roster = sample_roster();
        assert_eq!(roster.total_cost(), 60);
        assert!(validate(&roster, 60).is_empty());
        assert!(is_valid(&roster, 60));
    }

    #[test]
    fn large_overage_is_a_violation() {
        let roster = sample_roster();
        let warnings = validate(&roster, 50);
        assert_eq!(
            warnings,
            vec![Warning::violation(WarningKind::OverBudget { overage: 10 })]
        );
    }

    #[test]
    fn overage_boundary_switches_severity_after_five() {
        let roster = sample_roster();
        assert_eq!(
            validate(&roster, 55),
            vec![Warning::advisory(WarningKind::OverBudget { overage: 5 })]
        );
        assert_eq!(
            validate(&roster, 54),
            vec![Warning::violation(WarningKind::OverBudget { overage: 6 })]
        );
    }

    #[test]
    fn leader_and_ratio_rules() {
        let mut roster = CrewRoster::new();
        assert_eq!(
            validate(&roster, 100),
            vec![Warning::advisory(WarningKind::LeaderRequired)]
        );

        roster.push(card("Blade", Rank::Hero, 15));
        roster.push(card("Boss", Rank::Leader, 20));
        roster.push(card("Boss Two", Rank::Leader, 20));
        let warnings = validate(&roster, 100);
        assert_eq!(warnings.len(), 2);
        assert!(warnings.iter().all(Warning::is_violation));
        assert_eq!(warnings[0].kind, WarningKind::TooManyLeaders { leaders: 2 });
        assert_eq!(
            warnings[1].kind,
            WarningKind::HeroesExceedHenchmen {
                heroes: 1,
                henchmen: 0
            }
        );
    }

    #[test]
    fn report_tracks_remaining_budget() {
        let roster = sample_roster();
        let over = report(&roster, 50);
        assert_eq!(over.remaining, -10);
        assert!(over.has_violations());
        assert!(!over.is_valid());

        let under = report(&roster, 75);
        assert_eq!(under.remaining, 15);
        assert!(under.is_valid());
        assert_eq!(under.warnings.len(), 0);
    }

    #[test]
    fn warnings_render_readable_messages() {
        let warning = Warning::violation(WarningKind::OverBudget { overage: 7 });
        assert_eq!(warning.to_string(), "Over budget by 7 ducats");
        let value = serde_json::to_value(warning).unwrap();
        assert_eq!(value["severity"], "violation");
        assert_eq!(value["rule"], "over_budget");
        assert_eq!(value["overage"], 7);
    }
}
