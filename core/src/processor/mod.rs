//! Line processor
//!
//! Turns submitted narration lines into [`CombatEvent`](crate::events::CombatEvent)s
//! delivered to an [`EventSink`].
//!
//! Lines are classified and bound to their creature in submission order, so
//! attack sequences resolve against the stream as written. With one thread
//! the event is delivered inline with `submit`. With more, each worker owns a
//! bounded lane and events are routed to a lane by the creature's name tail
//! (the noun every reference to it shares), so everything about one creature
//! is applied by the same worker, in submission order.

mod counters;
mod handler;
mod lane;

pub use counters::{CounterSnapshot, ProcessorCounters};
pub use handler::SequenceContext;

use std::hash::BuildHasher;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use chrono::NaiveDateTime;
use hashbrown::DefaultHashBuilder;

use crate::error::ConfigError;
use crate::events::{EventSink, TargetRef};
use crate::patterns::PatternRegistry;
use crate::text::{name_tail, normalize_name};
use handler::{Delivery, LineHandler};
use lane::{Lanes, Push};

/// Most events a worker hands to the sink under one registry lock.
const WORKER_BATCH: usize = 64;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Processor construction parameters.
#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    /// Worker count; 1 means inline processing
    pub threads: usize,
    /// Total buffered events across all lanes
    pub buffer_size: usize,
    pub track_sequences: bool,
    /// Shared with the owner so debug logging can be toggled live
    pub debug: Arc<AtomicBool>,
}

struct Intake {
    handler: LineHandler,
    /// `None` once shut down; dropping it closes every lane
    lanes: Option<Lanes>,
}

struct Pool {
    threads: usize,
    intake: Mutex<Intake>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    hasher: DefaultHashBuilder,
}

impl Pool {
    /// Lane for a creature. Keyed by name tail so that linked and plain-text
    /// references to one creature agree; nameless links fall back to the id.
    fn lane_for(&self, target: &TargetRef, lanes: usize) -> usize {
        let normalized = normalize_name(&target.name);
        let tail = name_tail(&normalized);
        let hash = if tail.is_empty() {
            self.hasher.hash_one(target.id)
        } else {
            self.hasher.hash_one(tail)
        };
        (hash % lanes as u64) as usize
    }
}

enum Mode {
    Inline {
        handler: Mutex<LineHandler>,
        delivery: Delivery,
    },
    Pool(Pool),
}

/// Buffered, optionally concurrent line processor.
pub struct LineProcessor {
    mode: Mode,
    counters: Arc<ProcessorCounters>,
    closed: AtomicBool,
}

impl LineProcessor {
    pub fn new(
        registry: Arc<PatternRegistry>,
        sink: Arc<dyn EventSink>,
        counters: Arc<ProcessorCounters>,
        config: ProcessorConfig,
    ) -> Result<Self, ConfigError> {
        if config.threads == 0 {
            return Err(ConfigError::InvalidThreadCount(config.threads));
        }
        if config.buffer_size == 0 {
            return Err(ConfigError::InvalidBufferSize(config.buffer_size));
        }

        let handler = LineHandler::new(
            registry,
            counters.clone(),
            config.debug.clone(),
            config.track_sequences,
        );
        let delivery = Delivery::new(sink, counters.clone(), config.debug.clone());

        let mode = if config.threads == 1 {
            Mode::Inline {
                handler: Mutex::new(handler),
                delivery,
            }
        } else {
            let (lanes, receivers) = Lanes::new(config.threads, config.buffer_size);

            let mut workers = Vec::with_capacity(config.threads);
            for (n, receiver) in receivers.into_iter().enumerate() {
                let delivery = delivery.clone();
                let spawned = thread::Builder::new()
                    .name(format!("bestiary-worker-{n}"))
                    .spawn(move || {
                        while let Some(batch) = receiver.recv_batch(WORKER_BATCH) {
                            delivery.batch(batch);
                        }
                    });
                match spawned {
                    Ok(handle) => workers.push(handle),
                    Err(e) => {
                        // Release the workers that did start
                        drop(lanes);
                        for handle in workers {
                            let _ = handle.join();
                        }
                        return Err(ConfigError::WorkerSpawn(e));
                    }
                }
            }

            tracing::debug!(
                threads = config.threads,
                buffer_size = config.buffer_size,
                "Worker pool started"
            );

            Mode::Pool(Pool {
                threads: config.threads,
                intake: Mutex::new(Intake {
                    handler,
                    lanes: Some(lanes),
                }),
                workers: Mutex::new(workers),
                hasher: DefaultHashBuilder::default(),
            })
        };

        Ok(Self {
            mode,
            counters,
            closed: AtomicBool::new(false),
        })
    }

    /// Submit one line stamped with `timestamp`.
    ///
    /// Never fails. Lines submitted after shutdown are ignored.
    pub fn submit(&self, line: &str, timestamp: NaiveDateTime) {
        if self.closed.load(Ordering::Acquire) {
            return;
        }
        self.counters.record_submitted();

        match &self.mode {
            Mode::Inline { handler, delivery } => {
                let mut handler = lock(handler);
                if let Some(event) = handler.resolve(line, timestamp) {
                    delivery.one(event);
                }
            }
            Mode::Pool(pool) => {
                let mut intake = lock(&pool.intake);
                let Some(event) = intake.handler.resolve(line, timestamp) else {
                    return;
                };
                let Some(lanes) = intake.lanes.as_ref() else {
                    // Shut down between the check above and here
                    self.counters.record_dropped();
                    return;
                };

                let lane = pool.lane_for(&event.target, lanes.len());
                if let Push::Dropped(count) = lanes.push(lane, event) {
                    for _ in 0..count {
                        let dropped = self.counters.record_dropped();
                        if dropped.is_power_of_two() {
                            tracing::warn!(
                                dropped,
                                lane,
                                capacity = lanes.capacity(),
                                "Event buffer full, dropping oldest events"
                            );
                        }
                    }
                }
            }
        }
    }

    /// Number of worker threads (0 when processing inline).
    pub fn worker_count(&self) -> usize {
        match &self.mode {
            Mode::Inline { .. } => 0,
            Mode::Pool(pool) => pool.threads,
        }
    }

    /// Events buffered and not yet picked up by a worker.
    pub fn pending(&self) -> usize {
        match &self.mode {
            Mode::Inline { .. } => 0,
            Mode::Pool(pool) => lock(&pool.intake).lanes.as_ref().map_or(0, Lanes::pending),
        }
    }

    pub fn counters(&self) -> CounterSnapshot {
        self.counters.snapshot()
    }

    /// Close intake, let workers drain their lanes, and join them.
    ///
    /// Idempotent; every buffered event has been delivered when this returns.
    pub fn shutdown(&self) {
        self.closed.store(true, Ordering::Release);

        let Mode::Pool(pool) = &self.mode else {
            return;
        };
        drop(lock(&pool.intake).lanes.take());
        let workers: Vec<_> = lock(&pool.workers).drain(..).collect();
        if workers.is_empty() {
            return;
        }
        for handle in workers {
            if handle.join().is_err() {
                tracing::warn!("Worker thread exited with a panic");
            }
        }
        tracing::debug!("Worker pool stopped");
    }
}

impl Drop for LineProcessor {
    fn drop(&mut self) {
        self.shutdown();
    }
}
