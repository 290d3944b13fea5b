//! Creature registry: identity resolution and eviction

use chrono::NaiveDateTime;
use hashbrown::HashMap;

use crate::creature::Creature;
use crate::events::{CombatEvent, Payload, TargetRef};
use crate::text::{name_tail, normalize_name};

/// How a creature is keyed in the registry.
///
/// Narration with an entity link gives a stable existence id; plain-text
/// narration only gives a display name, and distinct creatures sharing a
/// name cannot be told apart.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CreatureKey {
    Id(i64),
    /// Normalized display name
    Name(String),
    /// A name-keyed corpse displaced by a newer creature of the same name
    Retired(u64),
}

#[derive(Debug, Clone)]
struct Entry {
    creature: Creature,
    /// Monotonic touch order, breaks ties between equal timestamps
    touched: u64,
}

impl Entry {
    fn recency(&self) -> (NaiveDateTime, u64) {
        (self.creature.last_seen_at, self.touched)
    }

    fn answers_to(&self, normalized: &str) -> bool {
        let own = normalize_name(&self.creature.name);
        own == normalized
            || name_tail(&own) == normalized
            || self
                .creature
                .noun
                .as_deref()
                .is_some_and(|noun| noun.eq_ignore_ascii_case(normalized))
    }
}

/// Every tracked creature, owned by the tracker behind one mutex.
#[derive(Debug)]
pub struct CreatureRegistry {
    entries: HashMap<CreatureKey, Entry>,
    fallback_max_hp: u32,
    clock: u64,
    /// Latest timestamp observed from the stream
    stream_time: Option<NaiveDateTime>,
}

impl CreatureRegistry {
    pub fn new(fallback_max_hp: u32) -> Self {
        Self {
            entries: HashMap::new(),
            fallback_max_hp,
            clock: 0,
            stream_time: None,
        }
    }

    fn tick(&mut self, at: NaiveDateTime) -> u64 {
        if self.stream_time.is_none_or(|latest| at > latest) {
            self.stream_time = Some(at);
        }
        self.clock += 1;
        self.clock
    }

    /// Latest timestamp seen on any routed event or registration.
    pub fn stream_time(&self) -> Option<NaiveDateTime> {
        self.stream_time
    }

    pub fn set_fallback_max_hp(&mut self, hp: u32) {
        self.fallback_max_hp = hp;
    }

    /// Key of the creature a name refers to.
    ///
    /// Prefers the most recently seen living creature answering to the name
    /// (full name, noun, or last word), then the most recently seen dead one.
    pub fn find_key_by_name(&self, name: &str) -> Option<CreatureKey> {
        let normalized = normalize_name(name);
        if normalized.is_empty() {
            return None;
        }

        let best = |alive: bool| {
            self.entries
                .iter()
                .filter(|(_, e)| e.creature.is_dead() != alive && e.answers_to(&normalized))
                .max_by_key(|(_, e)| e.recency())
                .map(|(key, _)| key.clone())
        };
        best(true).or_else(|| best(false))
    }

    /// Resolve (or create) the creature an event targets.
    ///
    /// An attack or hit that resolves by name to a corpse starts a new
    /// creature; the corpse is moved aside under a [`CreatureKey::Retired`] key.
    fn resolve(&mut self, event: &CombatEvent) -> CreatureKey {
        let target = &event.target;
        let starts_fight = matches!(event.payload, Payload::Damage { .. } | Payload::Engage);
        let key = match target.id {
            Some(id) => CreatureKey::Id(id),
            None => match self.find_key_by_name(&target.name) {
                Some(key) if !(starts_fight && self.is_dead(&key)) => key,
                _ => {
                    let key = CreatureKey::Name(normalize_name(&target.name));
                    if starts_fight && self.is_dead(&key) {
                        self.retire(&key);
                    }
                    key
                }
            },
        };

        if !self.entries.contains_key(&key) {
            let now = event.timestamp;
            let mut creature = Creature::new(target.id, &target.name, self.fallback_max_hp, now);
            creature.noun = target.noun.clone();
            tracing::trace!(?key, name = %target.name, "New creature");
            self.entries.insert(key.clone(), Entry { creature, touched: 0 });
        }
        key
    }

    fn is_dead(&self, key: &CreatureKey) -> bool {
        self.entries.get(key).is_some_and(|e| e.creature.is_dead())
    }

    fn retire(&mut self, key: &CreatureKey) {
        if let Some(entry) = self.entries.remove(key) {
            self.clock += 1;
            tracing::trace!(?key, serial = self.clock, "Retired corpse");
            self.entries.insert(CreatureKey::Retired(self.clock), entry);
        }
    }

    /// Route an event to its creature and apply it.
    pub fn route(&mut self, event: &CombatEvent) {
        let key = self.resolve(event);
        let touched = self.tick(event.timestamp);
        if let Some(entry) = self.entries.get_mut(&key) {
            entry.creature.apply(event);
            entry.touched = touched;
        }
    }

    /// Create or rename the creature with `id`.
    pub fn register(&mut self, id: i64, name: &str, now: NaiveDateTime) {
        let touched = self.tick(now);
        let fallback = self.fallback_max_hp;
        let entry = self.entries.entry(CreatureKey::Id(id)).or_insert_with(|| Entry {
            creature: Creature::new(Some(id), name, fallback, now),
            touched,
        });
        entry.creature.name = name.to_string();
        entry.creature.touch(now);
        entry.touched = touched;
    }

    pub fn get(&self, key: &CreatureKey) -> Option<&Creature> {
        self.entries.get(key).map(|e| &e.creature)
    }

    pub fn get_mut(&mut self, key: &CreatureKey) -> Option<&mut Creature> {
        self.entries.get_mut(key).map(|e| &mut e.creature)
    }

    /// All creatures, most recently seen first.
    pub fn snapshot(&self) -> Vec<Creature> {
        let mut entries: Vec<&Entry> = self.entries.values().collect();
        entries.sort_by_key(|e| std::cmp::Reverse(e.recency()));
        entries.into_iter().map(|e| e.creature.clone()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Creature> {
        self.entries.values().map(|e| &e.creature)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn alive_count(&self) -> usize {
        self.entries.values().filter(|e| !e.creature.is_dead()).count()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.stream_time = None;
    }

    /// Expire timed statuses on every creature. Returns how many were removed.
    pub fn expire_statuses(&mut self, now: NaiveDateTime) -> usize {
        self.entries
            .values_mut()
            .map(|e| e.creature.cleanup_expired_statuses(now))
            .sum()
    }

    /// Evict creatures not seen for longer than `max_age`.
    pub fn evict_older_than(&mut self, now: NaiveDateTime, max_age: chrono::Duration) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, e| now - e.creature.last_seen_at <= max_age);
        before - self.entries.len()
    }

    /// Keep only the `max` most recently seen creatures.
    pub fn evict_beyond(&mut self, max: usize) -> usize {
        if self.entries.len() <= max {
            return 0;
        }
        let mut by_recency: Vec<(CreatureKey, (NaiveDateTime, u64))> = self
            .entries
            .iter()
            .map(|(key, e)| (key.clone(), e.recency()))
            .collect();
        by_recency.sort_by_key(|(_, recency)| std::cmp::Reverse(*recency));

        let evicted = by_recency.len() - max;
        for (key, _) in by_recency.into_iter().skip(max) {
            self.entries.remove(&key);
        }
        evicted
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate};

    use super::*;
    use crate::events::Payload;
    use crate::patterns::{Category, Outcome};

    fn t(secs: i64) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            + Duration::seconds(secs)
    }

    fn damage(target: TargetRef, amount: u32, at: NaiveDateTime) -> CombatEvent {
        CombatEvent {
            category: Category::Damage,
            name: "hit".into(),
            outcome: Outcome::Damage,
            area_effect: false,
            target,
            payload: Payload::Damage {
                amount: Some(amount),
            },
            timestamp: at,
        }
    }

    fn death(target: TargetRef, at: NaiveDateTime) -> CombatEvent {
        CombatEvent {
            category: Category::Damage,
            name: "death".into(),
            outcome: Outcome::Death,
            area_effect: false,
            target,
            payload: Payload::Death,
            timestamp: at,
        }
    }

    #[test]
    fn test_id_lookup_creates_with_fallback() {
        let mut registry = CreatureRegistry::new(250);
        registry.route(&damage(TargetRef::with_id(7, "troll"), 30, t(0)));

        let troll = registry.get(&CreatureKey::Id(7)).unwrap();
        assert_eq!(troll.name, "troll");
        assert_eq!(troll.fallback_max_hp(), 250);
        assert_eq!(troll.current_hp(), Some(220));
    }

    #[test]
    fn test_name_heuristic_matches_noun_and_last_word() {
        let mut registry = CreatureRegistry::new(100);
        let mut linked = TargetRef::with_id(1, "savage fork-tongued wendigo");
        linked.noun = Some("wendigo".into());
        registry.route(&damage(linked, 10, t(0)));

        assert_eq!(registry.find_key_by_name("wendigo"), Some(CreatureKey::Id(1)));
        assert_eq!(
            registry.find_key_by_name("The Savage Fork-tongued Wendigo"),
            Some(CreatureKey::Id(1))
        );
        assert_eq!(registry.find_key_by_name("goblin"), None);
    }

    #[test]
    fn test_name_heuristic_prefers_living() {
        let mut registry = CreatureRegistry::new(100);
        registry.route(&damage(TargetRef::with_id(1, "goblin"), 10, t(0)));
        registry.route(&damage(TargetRef::with_id(2, "goblin"), 10, t(1)));
        registry.route(&death(TargetRef::with_id(2, "goblin"), t(2)));

        // Goblin 2 is more recent but dead
        assert_eq!(registry.find_key_by_name("goblin"), Some(CreatureKey::Id(1)));

        registry.route(&death(TargetRef::with_id(1, "goblin"), t(3)));
        assert_eq!(registry.find_key_by_name("goblin"), Some(CreatureKey::Id(1)));
    }

    #[test]
    fn test_unknown_name_creates_name_keyed_creature() {
        let mut registry = CreatureRegistry::new(100);
        registry.route(&damage(TargetRef::named("Goblin"), 10, t(0)));
        registry.route(&damage(TargetRef::named("goblin"), 15, t(1)));

        assert_eq!(registry.len(), 1);
        let goblin = registry.get(&CreatureKey::Name("goblin".into())).unwrap();
        assert_eq!(goblin.total_damage(), 25);
    }

    #[test]
    fn test_new_fight_with_same_name_retires_corpse() {
        let mut registry = CreatureRegistry::new(100);
        registry.route(&damage(TargetRef::named("goblin"), 40, t(0)));
        registry.route(&death(TargetRef::named("goblin"), t(1)));
        registry.route(&damage(TargetRef::named("goblin"), 25, t(2)));
        registry.route(&death(TargetRef::named("goblin"), t(3)));

        assert_eq!(registry.len(), 2);
        let current = registry.get(&CreatureKey::Name("goblin".into())).unwrap();
        assert_eq!(current.total_damage(), 25);
        assert!(current.is_dead());

        let mut deaths: Vec<Option<u64>> = registry.iter().map(|c| c.death_damage()).collect();
        deaths.sort();
        assert_eq!(deaths, vec![Some(25), Some(40)]);
    }

    #[test]
    fn test_status_on_corpse_does_not_start_new_creature() {
        let mut registry = CreatureRegistry::new(100);
        registry.route(&damage(TargetRef::named("goblin"), 40, t(0)));
        registry.route(&death(TargetRef::named("goblin"), t(1)));
        registry.route(&death(TargetRef::named("goblin"), t(2)));

        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_register_renames() {
        let mut registry = CreatureRegistry::new(100);
        registry.register(5, "a shadow", t(0));
        registry.register(5, "Grimlock the Shade", t(10));

        let creature = registry.get(&CreatureKey::Id(5)).unwrap();
        assert_eq!(creature.name, "Grimlock the Shade");
        assert_eq!(creature.last_seen_at, t(10));
        assert_eq!(creature.created_at, t(0));
    }

    #[test]
    fn test_eviction_by_age_then_count() {
        let mut registry = CreatureRegistry::new(100);
        for id in 0..10 {
            registry.register(id, "rat", t(id));
        }

        assert_eq!(registry.evict_older_than(t(10), Duration::seconds(5)), 5);
        assert_eq!(registry.len(), 5);

        assert_eq!(registry.evict_beyond(2), 3);
        let mut kept: Vec<_> = registry.iter().filter_map(|c| c.id).collect();
        kept.sort();
        assert_eq!(kept, vec![8, 9]);
        assert_eq!(registry.evict_beyond(5), 0);
    }
}
