//! Pattern definition types
//!
//! Definitions are data: each one names an effect, the catalog it belongs to,
//! what it means for the affected creature, and the ordered narration
//! templates that announce it. Builtin catalogs are constructed in code;
//! additional definitions can be loaded from TOML.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

// ═══════════════════════════════════════════════════════════════════════════
// Classification Enums
// ═══════════════════════════════════════════════════════════════════════════

/// Catalog a definition belongs to.
///
/// The declaration order is the order in which category matchers are tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Flare,
    Critical,
    Damage,
    Status,
    Sequence,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Flare,
        Category::Critical,
        Category::Damage,
        Category::Status,
        Category::Sequence,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Flare => "flare",
            Self::Critical => "critical",
            Self::Damage => "damage",
            Self::Status => "status",
            Self::Sequence => "sequence",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Semantic effect of a matched line on its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Hit points lost
    Damage,
    /// The creature died
    Death,
    /// A body location was wounded by a critical hit
    Wound,
    /// Beneficial effect on the target
    Buff,
    /// Harmful or disabling effect on the target
    Debuff,
    /// Magical effects stripped from the target
    Dispel,
    /// Weapon blinked in from another plane
    Blink,
    /// Hit points restored
    Heal,
    /// The player started attacking the target
    Engage,
    /// The target attacked the player
    Disengage,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Damage => "damage",
            Self::Death => "death",
            Self::Wound => "wound",
            Self::Buff => "buff",
            Self::Debuff => "debuff",
            Self::Dispel => "dispel",
            Self::Blink => "blink",
            Self::Heal => "heal",
            Self::Engage => "engage",
            Self::Disengage => "disengage",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a status line installs or removes the status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusAction {
    Add,
    Remove,
}

/// Body location wounded by a critical hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyPart {
    Head,
    Neck,
    Chest,
    Abdomen,
    Back,
    RightArm,
    LeftArm,
    RightHand,
    LeftHand,
    RightLeg,
    LeftLeg,
    RightEye,
    LeftEye,
    Nerves,
}

impl BodyPart {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Head => "head",
            Self::Neck => "neck",
            Self::Chest => "chest",
            Self::Abdomen => "abdomen",
            Self::Back => "back",
            Self::RightArm => "right_arm",
            Self::LeftArm => "left_arm",
            Self::RightHand => "right_hand",
            Self::LeftHand => "left_hand",
            Self::RightLeg => "right_leg",
            Self::LeftLeg => "left_leg",
            Self::RightEye => "right_eye",
            Self::LeftEye => "left_eye",
            Self::Nerves => "nerves",
        }
    }
}

impl fmt::Display for BodyPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Pattern Definition
// ═══════════════════════════════════════════════════════════════════════════

/// One catalog entry.
///
/// Templates are regular expressions matched case-insensitively against the
/// normalized line. Two named captures are recognized: `target` (the affected
/// creature, plain text or an entity link) and `amount` (damage dealt).
/// Both are optional per template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternDefinition {
    /// Effect name reported on match (e.g. "fire", "stunned")
    pub name: String,

    pub category: Category,

    pub outcome: Outcome,

    /// Affects every creature in the room rather than one target
    #[serde(default)]
    pub area_effect: bool,

    /// Ordered templates; the first that matches wins
    pub templates: Vec<String>,

    // ─── Critical detail ────────────────────────────────────────────────────
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<BodyPart>,

    /// Wound severity added to `location`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank: Option<u8>,

    /// The critical kills outright
    #[serde(default)]
    pub fatal: bool,

    // ─── Status detail ──────────────────────────────────────────────────────
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<StatusAction>,
}

impl PatternDefinition {
    fn base(name: &str, category: Category, outcome: Outcome, templates: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            category,
            outcome,
            area_effect: false,
            templates: templates.iter().map(|t| t.to_string()).collect(),
            location: None,
            rank: None,
            fatal: false,
            action: None,
        }
    }

    /// Damage amount line (`amount` capture required in practice).
    pub fn damage(name: &str, templates: &[&str]) -> Self {
        Self::base(name, Category::Damage, Outcome::Damage, templates)
    }

    /// Death narration.
    pub fn death(name: &str, templates: &[&str]) -> Self {
        Self::base(name, Category::Damage, Outcome::Death, templates)
    }

    /// Critical wound at `location` with severity `rank`.
    pub fn critical(
        name: &str,
        location: BodyPart,
        rank: u8,
        fatal: bool,
        templates: &[&str],
    ) -> Self {
        Self {
            location: Some(location),
            rank: Some(rank),
            fatal,
            ..Self::base(name, Category::Critical, Outcome::Wound, templates)
        }
    }

    /// Status installed or removed.
    pub fn status(name: &str, action: StatusAction, templates: &[&str]) -> Self {
        let outcome = match action {
            StatusAction::Add => Outcome::Debuff,
            StatusAction::Remove => Outcome::Dispel,
        };
        Self {
            action: Some(action),
            ..Self::base(name, Category::Status, outcome, templates)
        }
    }

    /// Weapon or armor flare.
    pub fn flare(name: &str, outcome: Outcome, area_effect: bool, templates: &[&str]) -> Self {
        Self {
            area_effect,
            ..Self::base(name, Category::Flare, outcome, templates)
        }
    }

    /// Attack sequence line (`Engage` or `Disengage`).
    pub fn sequence(name: &str, outcome: Outcome, templates: &[&str]) -> Self {
        Self::base(name, Category::Sequence, outcome, templates)
    }

    /// Check that the category-specific fields are consistent.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidDefinition {
            definition: self.name.clone(),
            reason: reason.to_string(),
        };

        if self.name.trim().is_empty() {
            return Err(invalid("name cannot be empty"));
        }
        if self.templates.is_empty() || self.templates.iter().any(|t| t.trim().is_empty()) {
            return Err(invalid("at least one non-empty template is required"));
        }

        match self.category {
            Category::Critical => {
                if self.location.is_none() || self.rank.is_none() {
                    return Err(invalid("critical definitions need a location and a rank"));
                }
            }
            Category::Status => {
                if self.action.is_none() {
                    return Err(invalid("status definitions need an action (add or remove)"));
                }
            }
            Category::Damage => {
                if !matches!(self.outcome, Outcome::Damage | Outcome::Death) {
                    return Err(invalid("damage definitions must have outcome damage or death"));
                }
            }
            Category::Sequence => {
                if !matches!(self.outcome, Outcome::Engage | Outcome::Disengage) {
                    return Err(invalid(
                        "sequence definitions must have outcome engage or disengage",
                    ));
                }
            }
            Category::Flare => {}
        }

        Ok(())
    }
}

/// Root structure for definition files.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DefinitionConfig {
    #[serde(default, rename = "definition")]
    pub definitions: Vec<PatternDefinition>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_definition_toml() {
        let toml = r#"
[[definition]]
name = "disintegration"
category = "flare"
outcome = "damage"
area_effect = true
templates = ['\*\* Your .+? releases a shimmering beam of disintegration']

[[definition]]
name = "eye gouged"
category = "critical"
outcome = "wound"
location = "right_eye"
rank = 4
templates = ['right eye is gouged out']
"#;

        let config: DefinitionConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.definitions.len(), 2);
        assert!(config.definitions[0].area_effect);
        assert_eq!(config.definitions[1].location, Some(BodyPart::RightEye));
        assert_eq!(config.definitions[1].rank, Some(4));
        assert!(!config.definitions[1].fatal);
        for def in &config.definitions {
            def.validate().unwrap();
        }
    }

    #[test]
    fn test_validate_rejects_status_without_action() {
        let mut def = PatternDefinition::status("dazed", StatusAction::Add, &["is dazed"]);
        def.action = None;
        assert!(matches!(
            def.validate(),
            Err(ConfigError::InvalidDefinition { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_empty_templates() {
        let def = PatternDefinition::damage("hit", &[]);
        assert!(def.validate().is_err());
    }

    #[test]
    fn test_status_outcome_follows_action() {
        let add = PatternDefinition::status("stunned", StatusAction::Add, &["is stunned"]);
        let remove = PatternDefinition::status("stunned", StatusAction::Remove, &["composure"]);
        assert_eq!(add.outcome, Outcome::Debuff);
        assert_eq!(remove.outcome, Outcome::Dispel);
    }
}
