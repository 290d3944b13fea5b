//! Bounded per-worker event lanes
//!
//! Each lane is a bounded channel drained by exactly one worker. The buffer
//! budget is shared: `pending` counts events across every lane, and once it
//! reaches capacity the oldest event of the lane being pushed (or of the
//! longest lane, when that one is empty) is evicted to make room.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crossbeam_channel::{Receiver, Sender, TrySendError};

use crate::events::CombatEvent;

/// Outcome of pushing onto a lane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Push {
    Queued,
    /// This many events were lost to make room
    Dropped(usize),
}

/// Submit-side handle to every lane.
///
/// Dropping it closes the lanes; workers finish what is queued and stop.
pub(crate) struct Lanes {
    senders: Vec<Sender<CombatEvent>>,
    /// Receiver clones kept for eviction only
    drains: Vec<Receiver<CombatEvent>>,
    pending: Arc<AtomicUsize>,
    capacity: usize,
}

/// Worker end of one lane.
pub(crate) struct LaneReceiver {
    rx: Receiver<CombatEvent>,
    pending: Arc<AtomicUsize>,
}

impl LaneReceiver {
    /// Block for the next event, then take up to `max - 1` more that are
    /// already queued. Returns `None` once the lane is closed and drained.
    pub fn recv_batch(&self, max: usize) -> Option<Vec<CombatEvent>> {
        let first = self.rx.recv().ok()?;
        let mut batch = Vec::with_capacity(self.rx.len().min(max) + 1);
        batch.push(first);
        batch.extend(self.rx.try_iter().take(max.saturating_sub(1)));
        self.pending.fetch_sub(batch.len(), Ordering::AcqRel);
        Some(batch)
    }
}

impl Lanes {
    pub fn new(count: usize, capacity: usize) -> (Self, Vec<LaneReceiver>) {
        let capacity = capacity.max(1);
        let pending = Arc::new(AtomicUsize::new(0));
        let mut senders = Vec::with_capacity(count);
        let mut drains = Vec::with_capacity(count);
        let mut receivers = Vec::with_capacity(count);

        for _ in 0..count {
            let (tx, rx) = crossbeam_channel::bounded(capacity);
            senders.push(tx);
            drains.push(rx.clone());
            receivers.push(LaneReceiver {
                rx,
                pending: pending.clone(),
            });
        }

        let lanes = Self {
            senders,
            drains,
            pending,
            capacity,
        };
        (lanes, receivers)
    }

    pub fn len(&self) -> usize {
        self.senders.len()
    }

    /// Events queued across all lanes.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Queue `event` on `lane`, evicting the oldest queued events while the
    /// shared budget is exhausted.
    ///
    /// Callers serialize pushes; only workers race with this.
    pub fn push(&self, lane: usize, event: CombatEvent) -> Push {
        let mut dropped = 0;
        while self.pending() >= self.capacity && self.evict(lane) {
            dropped += 1;
        }

        self.pending.fetch_add(1, Ordering::AcqRel);
        let mut event = event;
        loop {
            match self.senders[lane].try_send(event) {
                Ok(()) => break,
                Err(TrySendError::Full(back)) => {
                    event = back;
                    if self.evict_from(lane) {
                        dropped += 1;
                    }
                }
                Err(TrySendError::Disconnected(_)) => {
                    self.pending.fetch_sub(1, Ordering::AcqRel);
                    return Push::Dropped(dropped + 1);
                }
            }
        }

        if dropped == 0 {
            Push::Queued
        } else {
            Push::Dropped(dropped)
        }
    }

    /// Evict one event, preferring `lane`, else the longest lane.
    fn evict(&self, lane: usize) -> bool {
        if self.evict_from(lane) {
            return true;
        }
        let longest = (0..self.drains.len()).max_by_key(|&n| self.drains[n].len());
        longest.is_some_and(|n| self.evict_from(n))
    }

    fn evict_from(&self, lane: usize) -> bool {
        match self.drains[lane].try_recv() {
            Ok(_) => {
                self.pending.fetch_sub(1, Ordering::AcqRel);
                true
            }
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDateTime;

    use super::*;
    use crate::events::{Payload, TargetRef};
    use crate::patterns::{Category, Outcome};

    fn hit(amount: u32) -> CombatEvent {
        CombatEvent {
            category: Category::Damage,
            name: "hit".into(),
            outcome: Outcome::Damage,
            area_effect: false,
            target: TargetRef::named("rat"),
            payload: Payload::Damage {
                amount: Some(amount),
            },
            timestamp: NaiveDateTime::default(),
        }
    }

    fn amounts(batch: Vec<CombatEvent>) -> Vec<u32> {
        batch
            .into_iter()
            .filter_map(|e| match e.payload {
                Payload::Damage { amount } => amount,
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_full_budget_drops_oldest() {
        let (lanes, receivers) = Lanes::new(1, 2);
        assert_eq!(lanes.push(0, hit(1)), Push::Queued);
        assert_eq!(lanes.push(0, hit(2)), Push::Queued);
        assert_eq!(lanes.push(0, hit(3)), Push::Dropped(1));
        assert_eq!(lanes.pending(), 2);

        drop(lanes);
        assert_eq!(amounts(receivers[0].recv_batch(10).unwrap()), vec![2, 3]);
        assert!(receivers[0].recv_batch(10).is_none());
    }

    #[test]
    fn test_one_lane_may_use_the_whole_budget() {
        let (lanes, receivers) = Lanes::new(4, 8);
        for amount in 0..8 {
            assert_eq!(lanes.push(2, hit(amount)), Push::Queued);
        }
        assert_eq!(lanes.pending(), 8);

        // Budget exhausted and lane 1 is empty: evict from the longest lane
        assert_eq!(lanes.push(1, hit(100)), Push::Dropped(1));
        assert_eq!(lanes.pending(), 8);

        drop(lanes);
        assert_eq!(amounts(receivers[2].recv_batch(100).unwrap()), (1..8).collect::<Vec<_>>());
        assert_eq!(amounts(receivers[1].recv_batch(100).unwrap()), vec![100]);
    }
}
