//! Creature state machine
//!
//! ```text
//! alive (unknown HP) ──death narration──▶ dead (depletion)
//!        │                                     ▲
//!        │ estimate known                      │ cumulative damage ≥ estimate
//!        ▼                                     │
//! alive (HP estimated) ────────────────────────┘
//!        │
//!        └──fatal critical (from either alive state)──▶ dead (fatal crit)
//! ```
//!
//! The HP estimate only ever moves up, and only on a depletion death. Fatal
//! criticals kill before HP runs out, so they never feed the estimate.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::events::{CombatEvent, Payload};
use crate::patterns::{BodyPart, StatusAction, status_duration};

// ═══════════════════════════════════════════════════════════════════════════
// Types
// ═══════════════════════════════════════════════════════════════════════════

/// How a creature died.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeathCause {
    /// Ran out of hit points
    Depletion,
    /// Killed outright by a fatal critical hit
    FatalCritical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "cause")]
pub enum LifeState {
    Alive,
    Dead(DeathCause),
}

/// One observed damage amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DamageSample {
    pub amount: u32,
    /// This hit carried a fatal critical
    pub fatal_crit: bool,
    pub timestamp: NaiveDateTime,
}

/// Derived state for one tracked creature.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Creature {
    /// Existence id from the stream, when known
    pub id: Option<i64>,
    pub name: String,
    pub noun: Option<String>,

    max_hp_estimate: Option<u32>,
    /// Max HP assumed while no estimate exists
    fallback_max_hp: u32,

    damage_samples: Vec<DamageSample>,
    total_damage: u64,
    /// Cumulative damage at the moment of death
    death_damage: Option<u64>,

    /// Active status name → install time
    statuses: BTreeMap<String, NaiveDateTime>,
    /// Accumulated wound severity per location
    injuries: BTreeMap<BodyPart, u32>,
    /// Flare name → times seen
    flares: BTreeMap<String, u32>,

    state: LifeState,

    pub created_at: NaiveDateTime,
    pub last_seen_at: NaiveDateTime,
    pub died_at: Option<NaiveDateTime>,
}

impl Creature {
    pub fn new(
        id: Option<i64>,
        name: impl Into<String>,
        fallback_max_hp: u32,
        now: NaiveDateTime,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            noun: None,
            max_hp_estimate: None,
            fallback_max_hp,
            damage_samples: Vec::new(),
            total_damage: 0,
            death_damage: None,
            statuses: BTreeMap::new(),
            injuries: BTreeMap::new(),
            flares: BTreeMap::new(),
            state: LifeState::Alive,
            created_at: now,
            last_seen_at: now,
            died_at: None,
        }
    }

    // ─── Event application ──────────────────────────────────────────────────

    /// Apply an event already routed to this creature.
    pub fn apply(&mut self, event: &CombatEvent) {
        if self.noun.is_none() {
            self.noun = event.target.noun.clone();
        }

        match event.payload {
            Payload::Damage { amount: Some(amount) } => self.apply_damage(amount, event.timestamp),
            Payload::Damage { amount: None } => self.touch(event.timestamp),
            Payload::Death => self.apply_death(event.timestamp),
            Payload::Critical {
                location,
                rank,
                fatal,
            } => {
                self.add_injury(location, rank, event.timestamp);
                if fatal {
                    self.apply_fatal_crit(event.timestamp);
                }
            }
            Payload::Status {
                action: StatusAction::Add,
            } => self.add_status(&event.name, event.timestamp),
            Payload::Status {
                action: StatusAction::Remove,
            } => self.remove_status(&event.name, event.timestamp),
            Payload::Flare => self.record_flare(&event.name, event.timestamp),
            Payload::Engage | Payload::Disengage => self.touch(event.timestamp),
        }
    }

    pub fn touch(&mut self, at: NaiveDateTime) {
        if at > self.last_seen_at {
            self.last_seen_at = at;
        }
    }

    /// Record a hit. Ignored for HP once dead.
    pub fn apply_damage(&mut self, amount: u32, at: NaiveDateTime) {
        self.touch(at);
        if self.is_dead() {
            return;
        }

        self.damage_samples.push(DamageSample {
            amount,
            fatal_crit: false,
            timestamp: at,
        });
        self.total_damage += u64::from(amount);

        if let Some(estimate) = self.max_hp_estimate
            && self.total_damage >= u64::from(estimate)
        {
            self.die(DeathCause::Depletion, at);
        }
    }

    /// Death narration: the creature ran out of hit points.
    ///
    /// No-op if it already died (e.g. to a fatal critical).
    pub fn apply_death(&mut self, at: NaiveDateTime) {
        self.touch(at);
        if self.is_dead() {
            return;
        }

        self.die(DeathCause::Depletion, at);
    }

    /// Fatal critical: dead regardless of remaining HP. The estimate is left alone.
    pub fn apply_fatal_crit(&mut self, at: NaiveDateTime) {
        self.touch(at);
        if self.is_dead() {
            return;
        }
        if let Some(last) = self.damage_samples.last_mut() {
            last.fatal_crit = true;
        }
        self.die(DeathCause::FatalCritical, at);
    }

    /// A depletion death raises the estimate to the damage it took.
    fn die(&mut self, cause: DeathCause, at: NaiveDateTime) {
        if cause == DeathCause::Depletion {
            let cumulative = u32::try_from(self.total_damage).unwrap_or(u32::MAX);
            self.max_hp_estimate =
                Some(self.max_hp_estimate.map_or(cumulative, |prior| prior.max(cumulative)));
        }
        self.state = LifeState::Dead(cause);
        self.death_damage = Some(self.total_damage);
        self.died_at = Some(at);
    }

    pub fn add_injury(&mut self, location: BodyPart, rank: u8, at: NaiveDateTime) {
        self.touch(at);
        *self.injuries.entry(location).or_insert(0) += u32::from(rank);
    }

    /// Install or refresh a status.
    pub fn add_status(&mut self, name: &str, at: NaiveDateTime) {
        self.touch(at);
        self.statuses.insert(name.to_string(), at);
    }

    /// Remove a status; removing an inactive one does nothing.
    pub fn remove_status(&mut self, name: &str, at: NaiveDateTime) {
        self.touch(at);
        self.statuses.remove(name);
    }

    pub fn record_flare(&mut self, name: &str, at: NaiveDateTime) {
        self.touch(at);
        *self.flares.entry(name.to_string()).or_insert(0) += 1;
    }

    /// Seed a known max HP (e.g. from a host that can query it).
    ///
    /// Follows the upward-only rule; a living creature whose damage already
    /// reaches the new estimate dies of depletion.
    pub fn seed_max_hp(&mut self, max_hp: u32, at: NaiveDateTime) {
        let next = self.max_hp_estimate.map_or(max_hp, |prior| prior.max(max_hp));
        self.max_hp_estimate = Some(next);
        if !self.is_dead() && self.total_damage >= u64::from(next) {
            self.die(DeathCause::Depletion, at);
        }
    }

    /// Drop timed statuses that outlived their duration. Returns how many.
    pub fn cleanup_expired_statuses(&mut self, now: NaiveDateTime) -> usize {
        let before = self.statuses.len();
        self.statuses.retain(|name, installed_at| match status_duration(name) {
            Some(duration) => now - *installed_at <= duration,
            None => true,
        });
        before - self.statuses.len()
    }

    // ─── Queries ────────────────────────────────────────────────────────────

    pub fn state(&self) -> LifeState {
        self.state
    }

    pub fn is_dead(&self) -> bool {
        matches!(self.state, LifeState::Dead(_))
    }

    pub fn is_fatal_crit(&self) -> bool {
        self.state == LifeState::Dead(DeathCause::FatalCritical)
    }

    /// Max HP learned from a depletion death, if any.
    pub fn max_hp(&self) -> Option<u32> {
        self.max_hp_estimate
    }

    pub fn fallback_max_hp(&self) -> u32 {
        self.fallback_max_hp
    }

    /// Remaining HP against the estimate (or the fallback). Zero once dead.
    pub fn current_hp(&self) -> Option<u32> {
        if self.is_dead() {
            return Some(0);
        }
        let max = u64::from(self.max_hp_estimate.unwrap_or(self.fallback_max_hp));
        Some(max.saturating_sub(self.total_damage) as u32)
    }

    pub fn total_damage(&self) -> u64 {
        self.total_damage
    }

    pub fn damage_samples(&self) -> &[DamageSample] {
        &self.damage_samples
    }

    /// Cumulative damage at death.
    pub fn death_damage(&self) -> Option<u64> {
        self.death_damage
    }

    pub fn status_effects(&self) -> impl Iterator<Item = &str> {
        self.statuses.keys().map(String::as_str)
    }

    pub fn has_status(&self, name: &str) -> bool {
        self.statuses.contains_key(name)
    }

    pub fn injuries(&self) -> &BTreeMap<BodyPart, u32> {
        &self.injuries
    }

    pub fn injured_locations(&self) -> impl Iterator<Item = BodyPart> + '_ {
        self.injuries.keys().copied()
    }

    pub fn flares(&self) -> &BTreeMap<String, u32> {
        &self.flares
    }
}
