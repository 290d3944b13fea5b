//! Combat event tracking engine
//!
//! Classifies combat narration into typed events and maintains per-creature
//! state (HP estimates, damage history, wounds, statuses, deaths).
//!
//! ```no_run
//! use bestiary_core::CombatTracker;
//! use bestiary_types::{ReportSortKey, TrackerSettings};
//!
//! let tracker = CombatTracker::new(TrackerSettings::default())?;
//! tracker.submit("The goblin is stunned!");
//! let report = tracker.damage_report(1, ReportSortKey::MaxDamage, false);
//! # Ok::<(), bestiary_core::ConfigError>(())
//! ```

pub mod creature;
pub mod error;
pub mod events;
pub mod patterns;
pub mod processor;
pub mod report;
pub mod text;
pub mod tracker;

// Re-exports for convenience
pub use creature::{Creature, DamageSample, DeathCause, LifeState};
pub use error::{ClassifyError, ConfigError};
pub use events::{Classified, CombatEvent, EventSink, Payload, TargetRef};
pub use patterns::{Category, Outcome, PatternDefinition, PatternRegistry};
pub use processor::{CounterSnapshot, LineProcessor};
pub use report::{DamageGroup, DamageReport, damage_report, parse_sort_key};
pub use tracker::{CombatTracker, CreatureKey, TrackerStats};
