use std::{collections::HashSet, fmt};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::{Card, Faction, Rank};

static VERSION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+\.\d+\.\d+$").expect("failed to compile card version regex"));

/// Data problem spotted in a faction file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditProblem {
    /// A required top-level field is absent.
    MissingField(&'static str),
    /// A stat block characteristic is absent.
    MissingStat(&'static str),
    /// The version is not `MAJOR.MINOR.PATCH`.
    MalformedVersion(String),
    /// Another card already uses this name.
    DuplicateName,
    /// The same common ability is listed twice.
    DuplicateCommonAbility(String),
    /// The faction file has no faction ability.
    MissingFactionAbility,
    /// The faction ability has an empty `name` or `description`.
    EmptyFactionAbility(&'static str),
}

/// Problem attributed to one card, or to the faction itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditFinding {
    /// Offending card name, or the faction name for faction-level problems.
    pub subject: String,
    /// What is wrong with it.
    pub problem: AuditProblem,
}

impl fmt::Display for AuditFinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.problem {
            AuditProblem::MissingField(field) => write!(f, "{}: missing {}", self.subject, field),
            AuditProblem::MissingStat(stat) => {
                write!(f, "{}: missing stat_block.{}", self.subject, stat)
            }
            AuditProblem::MalformedVersion(version) => {
                write!(f, "{}: malformed version '{}'", self.subject, version)
            }
            AuditProblem::DuplicateName => write!(f, "{}: duplicate card name", self.subject),
            AuditProblem::DuplicateCommonAbility(name) => {
                write!(f, "{}: common ability '{}' listed twice", self.subject, name)
            }
            AuditProblem::MissingFactionAbility => {
                write!(f, "{}: missing faction_ability", self.subject)
            }
            AuditProblem::EmptyFactionAbility(field) => {
                write!(f, "{}: empty faction_ability.{}", self.subject, field)
            }
        }
    }
}

/// Check a faction for incomplete or inconsistent cards.
///
/// Findings are informational; the faction stays usable.
pub fn audit_faction(faction: &Faction) -> Vec<AuditFinding> {
    let mut findings = Vec::new();
    audit_ability(faction, &mut findings);

    let mut seen = HashSet::new();
    for card in &faction.cards {
        if !seen.insert(card.name.as_str()) {
            findings.push(AuditFinding {
                subject: card.name.clone(),
                problem: AuditProblem::DuplicateName,
            });
        }
        audit_card(card, &mut findings);
    }

    findings
}

fn audit_ability(faction: &Faction, findings: &mut Vec<AuditFinding>) {
    let subject = faction
        .faction
        .clone()
        .unwrap_or_else(|| "faction".to_string());
    let mut report = |problem| {
        findings.push(AuditFinding {
            subject: subject.clone(),
            problem,
        })
    };

    match &faction.faction_ability {
        None => report(AuditProblem::MissingFactionAbility),
        Some(ability) => {
            if ability.name.trim().is_empty() {
                report(AuditProblem::EmptyFactionAbility("name"));
            }
            if ability.description.trim().is_empty() {
                report(AuditProblem::EmptyFactionAbility("description"));
            }
        }
    }
}

fn audit_card(card: &Card, findings: &mut Vec<AuditFinding>) {
    let mut report = |problem| {
        findings.push(AuditFinding {
            subject: card.name.clone(),
            problem,
        })
    };

    if card.rank() == Rank::Unranked {
        report(AuditProblem::MissingField("rank"));
    }
    match card.version.as_deref().map(str::trim) {
        None | Some("") => report(AuditProblem::MissingField("version")),
        Some(version) if !VERSION_RE.is_match(version) => {
            report(AuditProblem::MalformedVersion(version.to_string()))
        }
        Some(_) => {}
    }
    if card.base_size.is_none() {
        report(AuditProblem::MissingField("base_size"));
    }
    if card.actions.is_none() {
        report(AuditProblem::MissingField("actions"));
    }
    if card.life.is_none() {
        report(AuditProblem::MissingField("life"));
    }
    match &card.stat_block {
        None => report(AuditProblem::MissingField("stat_block")),
        Some(stats) => {
            for stat in stats.missing_fields() {
                report(AuditProblem::MissingStat(stat));
            }
        }
    }

    let mut abilities = HashSet::new();
    for ability in &card.abilities.common {
        if !abilities.insert(ability.name()) {
            report(AuditProblem::DuplicateCommonAbility(ability.name().to_string()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn faction(cards: serde_json::Value) -> Faction {
        serde_json::from_value(json!({
            "faction": "The Guild",
            "faction_ability": {"name": "Trade Routes", "description": "Hire mercenaries."},
            "cards": cards
        }))
        .unwrap()
    }

    #[test]
    fn complete_card_has_no_findings() {
        let faction = faction(json!([{
            "name": "Thug", "rank": "Henchman", "ducats": 6, "version": "2.2.0",
            "base_size": "30mm", "actions": 2, "life": 6,
            "stat_block": {"movement": 6, "dexterity": 3, "attack": 3, "protection": 1, "mind": 2},
            "abilities": {"common": ["Brawler"]}
        }]));
        assert!(audit_faction(&faction).is_empty());
    }

    #[test]
    fn reports_gaps_duplicates_and_bad_versions() {
        let faction = faction(json!([
            {
                "name": "Rat", "ducats": 1, "version": "v2",
                "stat_block": {"movement": 8, "dexterity": 2, "attack": 1, "protection": 0},
                "abilities": {"common": ["Swarm", {"name": "Swarm", "description": "again"}]}
            },
            {"name": "Rat", "rank": "Henchman", "ducats": 1, "version": "2.2.0",
             "base_size": 25, "actions": 1, "life": 1,
             "stat_block": {"movement": 8, "dexterity": 2, "attack": 1, "protection": 0, "mind": 1}}
        ]));

        let findings = audit_faction(&faction);
        let problems: Vec<&AuditProblem> = findings.iter().map(|f| &f.problem).collect();
        assert_eq!(
            problems,
            vec![
                &AuditProblem::MissingField("rank"),
                &AuditProblem::MalformedVersion("v2".to_string()),
                &AuditProblem::MissingField("base_size"),
                &AuditProblem::MissingField("actions"),
                &AuditProblem::MissingField("life"),
                &AuditProblem::MissingStat("mind"),
                &AuditProblem::DuplicateCommonAbility("Swarm".to_string()),
                &AuditProblem::DuplicateName,
            ]
        );
        assert_eq!(findings[1].to_string(), "Rat: malformed version 'v2'");
    }

    #[test]
    fn reports_missing_or_blank_faction_ability() {
        let missing: Faction = serde_json::from_value(json!({"cards": []})).unwrap();
        let findings = audit_faction(&missing);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].to_string(), "faction: missing faction_ability");

        let blank: Faction = serde_json::from_value(json!({
            "faction": "Strigoi",
            "faction_ability": {"name": "Night Hunt", "description": "  "},
            "cards": []
        }))
        .unwrap();
        let findings = audit_faction(&blank);
        assert_eq!(
            findings,
            vec![AuditFinding {
                subject: "Strigoi".to_string(),
                problem: AuditProblem::EmptyFactionAbility("description"),
            }]
        );
    }
}
