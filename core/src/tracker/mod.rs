//! Combat tracker
//!
//! Owns the creature registry and the line processor. Lines go in through
//! [`CombatTracker::submit`]; the processor classifies them and hands the
//! resulting events back to the tracker's sink, which routes each one to its
//! creature under the registry lock.

mod registry;

#[cfg(test)]
mod tracker_tests;

pub use registry::{CreatureKey, CreatureRegistry};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bestiary_types::{ReportSortKey, TrackerOptions, TrackerSettings};
use chrono::{Local, NaiveDateTime};
use serde::Serialize;

use crate::creature::Creature;
use crate::error::ConfigError;
use crate::events::{CombatEvent, EventSink};
use crate::patterns::{PatternDefinition, PatternRegistry};
use crate::processor::{CounterSnapshot, LineProcessor, ProcessorConfig, ProcessorCounters};
use crate::report::{DamageReport, damage_report};

fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

/// Reject settings the engine cannot run with.
pub fn validate_settings(settings: &TrackerSettings) -> Result<(), ConfigError> {
    if settings.max_threads == 0 {
        return Err(ConfigError::InvalidThreadCount(settings.max_threads));
    }
    if settings.buffer_size == 0 {
        return Err(ConfigError::InvalidBufferSize(settings.buffer_size));
    }
    if settings.fallback_max_hp == 0 {
        return Err(ConfigError::InvalidFallbackHp(settings.fallback_max_hp));
    }
    Ok(())
}

/// Routing entry point handed to the processor.
#[derive(Debug)]
struct Shared {
    creatures: Mutex<CreatureRegistry>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, CreatureRegistry> {
        self.creatures.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl EventSink for Shared {
    fn handle_event(&self, event: CombatEvent) {
        self.lock().route(&event);
    }

    fn handle_events(&self, events: Vec<CombatEvent>) {
        let mut creatures = self.lock();
        for event in &events {
            creatures.route(event);
        }
    }
}

/// Point-in-time tracker statistics.
#[derive(Debug, Clone, Serialize)]
pub struct TrackerStats {
    pub enabled: bool,
    pub buffer_size: usize,
    /// Events waiting in worker lanes
    pub pending: usize,
    pub settings: TrackerSettings,
    /// Living creatures
    pub active_count: usize,
    /// All tracked creatures, living and dead
    pub total_count: usize,
    pub counters: CounterSnapshot,
}

/// The combat event tracking engine.
pub struct CombatTracker {
    settings: TrackerSettings,
    /// Custom definitions, kept for registry rebuilds
    definitions: Vec<PatternDefinition>,
    patterns: Arc<PatternRegistry>,
    shared: Arc<Shared>,
    counters: Arc<ProcessorCounters>,
    debug: Arc<AtomicBool>,
    processor: Option<LineProcessor>,
}

impl CombatTracker {
    /// Build an enabled tracker with the builtin catalogs.
    pub fn new(settings: TrackerSettings) -> Result<Self, ConfigError> {
        Self::with_definitions(settings, Vec::new())
    }

    /// Build an enabled tracker with extra pattern definitions.
    pub fn with_definitions(
        settings: TrackerSettings,
        definitions: Vec<PatternDefinition>,
    ) -> Result<Self, ConfigError> {
        validate_settings(&settings)?;
        let patterns = Arc::new(PatternRegistry::with_definitions(
            &settings.categories,
            definitions.clone(),
        )?);

        let mut tracker = Self {
            shared: Arc::new(Shared {
                creatures: Mutex::new(CreatureRegistry::new(settings.fallback_max_hp)),
            }),
            debug: Arc::new(AtomicBool::new(settings.debug)),
            counters: Arc::new(ProcessorCounters::default()),
            settings,
            definitions,
            patterns,
            processor: None,
        };
        tracker.processor = Some(tracker.build_processor()?);

        tracing::info!(
            threads = tracker.settings.max_threads,
            buffer_size = tracker.settings.buffer_size,
            categories = ?tracker.settings.categories.enabled_names(),
            "Combat tracker enabled"
        );
        Ok(tracker)
    }

    fn build_processor(&self) -> Result<LineProcessor, ConfigError> {
        LineProcessor::new(
            self.patterns.clone(),
            self.shared.clone(),
            self.counters.clone(),
            ProcessorConfig {
                threads: self.settings.max_threads,
                buffer_size: self.settings.buffer_size,
                track_sequences: self.settings.categories.sequences,
                debug: self.debug.clone(),
            },
        )
    }

    fn creatures(&self) -> MutexGuard<'_, CreatureRegistry> {
        self.shared.lock()
    }

    // ─── Configuration ──────────────────────────────────────────────────────

    /// Merge a partial configuration.
    ///
    /// On error nothing changes. Pipeline changes (categories, threads,
    /// buffer size) drain and replace the running processor; lines already
    /// processed are not reclassified.
    pub fn configure(&mut self, options: &TrackerOptions) -> Result<(), ConfigError> {
        let merged = self.settings.merge(options);
        validate_settings(&merged)?;

        let patterns = if merged.categories != self.settings.categories {
            Arc::new(PatternRegistry::with_definitions(
                &merged.categories,
                self.definitions.clone(),
            )?)
        } else {
            self.patterns.clone()
        };

        let previous = std::mem::replace(&mut self.settings, merged);
        let previous_patterns = std::mem::replace(&mut self.patterns, patterns);

        if options.touches_pipeline() && self.processor.is_some() {
            match self.build_processor() {
                Ok(next) => {
                    if let Some(old) = self.processor.replace(next) {
                        old.shutdown();
                    }
                }
                Err(e) => {
                    self.settings = previous;
                    self.patterns = previous_patterns;
                    return Err(e);
                }
            }
        }

        self.debug.store(self.settings.debug, Ordering::Relaxed);
        self.creatures()
            .set_fallback_max_hp(self.settings.fallback_max_hp);

        tracing::info!(
            threads = self.settings.max_threads,
            buffer_size = self.settings.buffer_size,
            fallback_max_hp = self.settings.fallback_max_hp,
            debug = self.settings.debug,
            categories = ?self.settings.categories.enabled_names(),
            "Tracker reconfigured"
        );
        Ok(())
    }

    /// Start processing with a fresh buffer. No-op when already enabled.
    pub fn enable(&mut self) -> Result<(), ConfigError> {
        if self.processor.is_some() {
            return Ok(());
        }
        self.processor = Some(self.build_processor()?);
        tracing::info!("Combat tracker enabled");
        Ok(())
    }

    /// Stop processing. Buffered lines are drained and routed first.
    pub fn disable(&mut self) {
        let Some(processor) = self.processor.take() else {
            return;
        };
        processor.shutdown();
        tracing::info!(counters = ?self.counters.snapshot(), "Combat tracker disabled");
    }

    pub fn is_enabled(&self) -> bool {
        self.processor.is_some()
    }

    pub fn enable_debug(&mut self) {
        self.settings.debug = true;
        self.debug.store(true, Ordering::Relaxed);
    }

    pub fn disable_debug(&mut self) {
        self.settings.debug = false;
        self.debug.store(false, Ordering::Relaxed);
    }

    /// Fallback max HP for creatures created from now on.
    pub fn set_fallback_hp(&mut self, hp: u32) -> Result<(), ConfigError> {
        self.configure(&TrackerOptions {
            fallback_max_hp: Some(hp),
            ..Default::default()
        })
    }

    pub fn settings(&self) -> &TrackerSettings {
        &self.settings
    }

    pub fn patterns(&self) -> &PatternRegistry {
        &self.patterns
    }

    // ─── Intake ─────────────────────────────────────────────────────────────

    /// Feed one narration line. Ignored while disabled.
    pub fn submit(&self, line: &str) {
        self.submit_at(line, now());
    }

    /// Feed one line with an explicit timestamp (replays, tests).
    pub fn submit_at(&self, line: &str, timestamp: NaiveDateTime) {
        if let Some(processor) = &self.processor {
            processor.submit(line, timestamp);
        }
    }

    /// Create or rename the creature with existence id `id`.
    pub fn register(&self, id: i64, name: &str) {
        self.register_at(id, name, now());
    }

    pub fn register_at(&self, id: i64, name: &str, at: NaiveDateTime) {
        self.creatures().register(id, name, at);
    }

    /// Seed a known max HP for the creature with `id`. Returns `false` if
    /// no such creature is tracked.
    pub fn set_max_hp_estimate(&self, id: i64, max_hp: u32) -> bool {
        let mut creatures = self.creatures();
        let Some(creature) = creatures.get_mut(&CreatureKey::Id(id)) else {
            return false;
        };
        creature.seed_max_hp(max_hp, now());
        true
    }

    // ─── Queries ────────────────────────────────────────────────────────────

    pub fn stats(&self) -> TrackerStats {
        let (active_count, total_count) = {
            let creatures = self.creatures();
            (creatures.alive_count(), creatures.len())
        };
        TrackerStats {
            enabled: self.is_enabled(),
            buffer_size: self.settings.buffer_size,
            pending: self.processor.as_ref().map_or(0, LineProcessor::pending),
            settings: self.settings.clone(),
            active_count,
            total_count,
            counters: self.counters.snapshot(),
        }
    }

    /// Snapshot of the creature with existence id `id`.
    pub fn get(&self, id: i64) -> Option<Creature> {
        self.get_key(&CreatureKey::Id(id))
    }

    /// Snapshot of one creature.
    ///
    /// Timed statuses are expired against the stream clock (the latest
    /// timestamp observed) before copying.
    pub fn get_key(&self, key: &CreatureKey) -> Option<Creature> {
        let mut creatures = self.creatures();
        let stream_time = creatures.stream_time();
        let creature = creatures.get_mut(key)?;
        if let Some(now) = stream_time {
            creature.cleanup_expired_statuses(now);
        }
        Some(creature.clone())
    }

    /// Snapshot of the creature a name currently refers to.
    pub fn find_by_name(&self, name: &str) -> Option<Creature> {
        let mut creatures = self.creatures();
        let key = creatures.find_key_by_name(name)?;
        let stream_time = creatures.stream_time();
        let creature = creatures.get_mut(&key)?;
        if let Some(now) = stream_time {
            creature.cleanup_expired_statuses(now);
        }
        Some(creature.clone())
    }

    /// Snapshot of every tracked creature, most recently seen first.
    pub fn all(&self) -> Vec<Creature> {
        let mut creatures = self.creatures();
        if let Some(now) = creatures.stream_time() {
            creatures.expire_statuses(now);
        }
        creatures.snapshot()
    }

    /// Aggregate death damage per creature name.
    pub fn damage_report(
        &self,
        min_samples: usize,
        sort_by: ReportSortKey,
        include_fatal: bool,
    ) -> DamageReport {
        let snapshot = self.all();
        damage_report(&snapshot, min_samples, sort_by, include_fatal)
    }

    // ─── Lifecycle ──────────────────────────────────────────────────────────

    /// Evict stale creatures: first by age, then down to a count cap.
    ///
    /// Returns the number evicted.
    pub fn cleanup_old(&self, max_age_seconds: Option<u64>, max_instances: Option<usize>) -> usize {
        self.cleanup_old_at(now(), max_age_seconds, max_instances)
    }

    pub fn cleanup_old_at(
        &self,
        now: NaiveDateTime,
        max_age_seconds: Option<u64>,
        max_instances: Option<usize>,
    ) -> usize {
        let mut creatures = self.creatures();
        let mut evicted = 0;
        if let Some(secs) = max_age_seconds {
            let max_age = chrono::Duration::seconds(i64::try_from(secs).unwrap_or(i64::MAX));
            evicted += creatures.evict_older_than(now, max_age);
        }
        if let Some(max) = max_instances {
            evicted += creatures.evict_beyond(max);
        }
        if evicted > 0 {
            tracing::info!(evicted, remaining = creatures.len(), "Evicted old creatures");
        }
        evicted
    }

    /// Expire timed statuses on every creature. Returns how many were removed.
    pub fn cleanup_expired_statuses(&self) -> usize {
        self.cleanup_expired_statuses_at(now())
    }

    pub fn cleanup_expired_statuses_at(&self, now: NaiveDateTime) -> usize {
        self.creatures().expire_statuses(now)
    }

    /// Forget every creature and zero the counters.
    pub fn reset(&self) {
        self.creatures().clear();
        self.counters.reset();
        tracing::info!("Tracker reset");
    }

    /// Drain buffered lines and join workers; the tracker ends disabled.
    pub fn shutdown(&mut self) {
        self.disable();
    }
}

impl Drop for CombatTracker {
    fn drop(&mut self) {
        if let Some(processor) = self.processor.take() {
            processor.shutdown();
        }
    }
}
