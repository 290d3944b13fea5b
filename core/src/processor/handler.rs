//! Line handling: classify, resolve the target, deliver to the sink

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::NaiveDateTime;

use super::counters::ProcessorCounters;
use crate::events::{CombatEvent, EventSink, Payload, TargetRef};
use crate::patterns::PatternRegistry;

/// The creature the player is currently attacking.
///
/// Narration such as `... and hits for 50 points of damage!` does not name
/// its target; it applies to whoever the last attack line named.
#[derive(Debug, Default, Clone)]
pub struct SequenceContext {
    target: Option<TargetRef>,
}

impl SequenceContext {
    pub fn engage(&mut self, target: TargetRef) {
        self.target = Some(target);
    }

    pub fn clear(&mut self) {
        self.target = None;
    }

    pub fn target(&self) -> Option<&TargetRef> {
        self.target.as_ref()
    }
}

/// Classifies lines and resolves each event's target.
///
/// One handler per processor, fed in submission order, so the sequence
/// context follows the stream as written.
pub(crate) struct LineHandler {
    registry: Arc<PatternRegistry>,
    counters: Arc<ProcessorCounters>,
    debug: Arc<AtomicBool>,
    /// `None` when sequence tracking is disabled
    context: Option<SequenceContext>,
}

impl LineHandler {
    pub fn new(
        registry: Arc<PatternRegistry>,
        counters: Arc<ProcessorCounters>,
        debug: Arc<AtomicBool>,
        track_sequences: bool,
    ) -> Self {
        Self {
            registry,
            counters,
            debug,
            context: track_sequences.then(SequenceContext::default),
        }
    }

    /// Classify one line and bind it to its creature.
    ///
    /// Lines that yield no event (misses, untargeted events, errors, panics)
    /// are counted as processed here; events are counted when delivered.
    pub fn resolve(&mut self, line: &str, timestamp: NaiveDateTime) -> Option<CombatEvent> {
        let outcome = catch_unwind(AssertUnwindSafe(|| self.resolve_inner(line, timestamp)));
        match outcome {
            Ok(Some(event)) => Some(event),
            Ok(None) => {
                self.counters.record_processed(1);
                None
            }
            Err(_) => {
                self.counters.record_processed(1);
                self.counters.record_error();
                if debug_enabled(&self.debug) {
                    tracing::debug!(line, "Panic while classifying line");
                }
                None
            }
        }
    }

    fn resolve_inner(&mut self, line: &str, timestamp: NaiveDateTime) -> Option<CombatEvent> {
        let classified = match self.registry.classify(line) {
            Ok(Some(classified)) => classified,
            Ok(None) => {
                if debug_enabled(&self.debug) {
                    tracing::debug!(line, "Unclassified line");
                }
                return None;
            }
            Err(e) => {
                self.counters.record_error();
                if debug_enabled(&self.debug) {
                    tracing::debug!(line, error = %e, "Classification failed");
                }
                return None;
            }
        };
        self.counters.record_classified();

        if let Some(context) = self.context.as_mut() {
            match (&classified.payload, &classified.target) {
                (Payload::Engage, Some(target)) => context.engage(target.clone()),
                (Payload::Disengage, _) => context.clear(),
                _ => {}
            }
        }

        let target = match classified.target.clone() {
            Some(target) => target,
            None => match self.context.as_ref().and_then(SequenceContext::target) {
                Some(target) => target.clone(),
                None => {
                    tracing::debug!(
                        effect = %classified.name,
                        category = %classified.category,
                        "No target for event, discarding"
                    );
                    return None;
                }
            },
        };

        Some(CombatEvent::from_classified(classified, target, timestamp))
    }
}

fn debug_enabled(debug: &AtomicBool) -> bool {
    debug.load(Ordering::Relaxed)
}

/// Hands resolved events to the sink.
///
/// A panicking sink is contained: the events are counted as processed and
/// the panic as one error.
#[derive(Clone)]
pub(crate) struct Delivery {
    sink: Arc<dyn EventSink>,
    counters: Arc<ProcessorCounters>,
    debug: Arc<AtomicBool>,
}

impl Delivery {
    pub fn new(
        sink: Arc<dyn EventSink>,
        counters: Arc<ProcessorCounters>,
        debug: Arc<AtomicBool>,
    ) -> Self {
        Self {
            sink,
            counters,
            debug,
        }
    }

    pub fn one(&self, event: CombatEvent) {
        let outcome = catch_unwind(AssertUnwindSafe(|| self.sink.handle_event(event)));
        self.finish(1, outcome.is_err());
    }

    pub fn batch(&self, events: Vec<CombatEvent>) {
        let count = events.len() as u64;
        let outcome = catch_unwind(AssertUnwindSafe(|| self.sink.handle_events(events)));
        self.finish(count, outcome.is_err());
    }

    fn finish(&self, count: u64, panicked: bool) {
        self.counters.record_processed(count);
        if panicked {
            self.counters.record_error();
            if debug_enabled(&self.debug) {
                tracing::debug!(count, "Panic while routing events");
            }
        }
    }
}
