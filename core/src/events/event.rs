use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::patterns::{BodyPart, Category, Outcome, StatusAction};

/// A creature named by narration.
///
/// `id` is the stream's existence id when the line carried an entity link;
/// plain-text narration only yields a display name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TargetRef {
    pub id: Option<i64>,
    pub name: String,
    pub noun: Option<String>,
}

impl TargetRef {
    pub fn with_id(id: i64, name: impl Into<String>) -> Self {
        Self {
            id: Some(id),
            name: name.into(),
            noun: None,
        }
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            noun: None,
        }
    }
}

/// Category-specific data extracted from a matched line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum Payload {
    /// `amount` is unset when the template matched without an amount capture
    Damage { amount: Option<u32> },
    Death,
    Critical {
        location: BodyPart,
        rank: u8,
        fatal: bool,
    },
    Status { action: StatusAction },
    Flare,
    Engage,
    Disengage,
}

/// Result of matching one line against the pattern registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classified {
    pub category: Category,
    /// Name of the matching definition
    pub name: String,
    pub outcome: Outcome,
    pub area_effect: bool,
    /// Creature captured by the template, if the template names one
    pub target: Option<TargetRef>,
    pub payload: Payload,
}

/// A classified line bound to the creature it applies to.
///
/// Produced by the line processor once the target is resolved (from the
/// template capture or the current attack sequence).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatEvent {
    pub category: Category,
    pub name: String,
    pub outcome: Outcome,
    pub area_effect: bool,
    pub target: TargetRef,
    pub payload: Payload,
    pub timestamp: NaiveDateTime,
}

impl CombatEvent {
    /// Bind a classification to a resolved target.
    pub fn from_classified(classified: Classified, target: TargetRef, timestamp: NaiveDateTime) -> Self {
        Self {
            category: classified.category,
            name: classified.name,
            outcome: classified.outcome,
            area_effect: classified.area_effect,
            target,
            payload: classified.payload,
            timestamp,
        }
    }
}
