//! Tests for the combat tracker
//!
//! End-to-end scenarios: narration lines in, creature state and reports out.

use bestiary_types::{ReportSortKey, TrackerOptions, TrackerSettings};
use chrono::{Duration, NaiveDate, NaiveDateTime};

use super::{CombatTracker, CreatureKey};
use crate::error::ConfigError;

fn t(secs: i64) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 3, 14)
        .unwrap()
        .and_hms_opt(20, 0, 0)
        .unwrap()
        + Duration::seconds(secs)
}

fn make_tracker(threads: usize) -> CombatTracker {
    CombatTracker::new(TrackerSettings {
        max_threads: threads,
        ..Default::default()
    })
    .unwrap()
}

fn link(id: i64, noun: &str, name: &str) -> String {
    format!(r#"<pushBold/><a exist="{id}" noun="{noun}">{name}</a><popBold/>"#)
}

fn wendigo() -> String {
    link(123, "wendigo", "savage fork-tongued wendigo")
}

fn hit_line(target: &str, amount: u32) -> String {
    format!("The {target} is hit for {amount} points of damage!")
}

fn death_line(target: &str) -> String {
    format!("The {target} falls to the ground motionless.")
}

#[test]
fn test_depletion_death_estimates_max_hp() {
    let tracker = make_tracker(1);
    for (i, amount) in [50, 75, 60, 215, 200].into_iter().enumerate() {
        tracker.submit_at(&hit_line(&wendigo(), amount), t(i as i64));
    }
    tracker.submit_at(&death_line(&wendigo()), t(10));

    let creature = tracker.get(123).unwrap();
    assert_eq!(creature.name, "savage fork-tongued wendigo");
    assert_eq!(creature.noun.as_deref(), Some("wendigo"));
    assert!(creature.is_dead());
    assert!(!creature.is_fatal_crit());
    assert_eq!(creature.max_hp(), Some(600));
    assert_eq!(creature.damage_samples().len(), 5);
}

#[test]
fn test_fatal_crit_after_damage_leaves_max_hp_unset() {
    let tracker = make_tracker(1);
    tracker.submit_at(&format!("You swing a battle axe at the {}!", wendigo()), t(0));
    tracker.submit_at("... and hits for 100 points of damage!", t(1));
    tracker.submit_at("... and hits for 200 points of damage!", t(2));
    tracker.submit_at("Skull shattered! Brain matter flies!", t(3));
    tracker.submit_at(&death_line(&wendigo()), t(4));

    let creature = tracker.get(123).unwrap();
    assert!(creature.is_fatal_crit());
    assert_eq!(creature.max_hp(), None);
    assert_eq!(creature.total_damage(), 300);
    assert_eq!(creature.death_damage(), Some(300));
}

#[test]
fn test_fatal_crit_does_not_affect_other_instances() {
    let tracker = make_tracker(1);
    let first = link(1, "wendigo", "wendigo");
    let second = link(2, "wendigo", "wendigo");

    tracker.submit_at(&hit_line(&first, 300), t(0));
    tracker.submit_at(&format!("You swing a battle axe at the {first}!"), t(1));
    tracker.submit_at("Skull shattered! Brain matter flies!", t(2));

    tracker.submit_at(&hit_line(&second, 450), t(3));
    tracker.submit_at(&death_line(&second), t(4));

    assert_eq!(tracker.get(1).unwrap().max_hp(), None);
    assert_eq!(tracker.get(2).unwrap().max_hp(), Some(450));

    let report = tracker.damage_report(1, ReportSortKey::Name, false);
    assert_eq!(report.len(), 1);
    let group = &report.groups[0];
    assert_eq!(group.count, 1);
    assert_eq!(group.max, 450);
    assert_eq!(group.fatal_crit_count, 1);
}

#[test]
fn test_status_add_then_remove() {
    let tracker = make_tracker(1);

    tracker.submit_at("The goblin is stunned!", t(0));
    let goblin = tracker.find_by_name("goblin").unwrap();
    assert_eq!(goblin.status_effects().collect::<Vec<_>>(), vec!["stunned"]);
    assert!(goblin.has_status("stunned"));

    tracker.submit_at("goblin regains its composure.", t(1));
    let goblin = tracker.find_by_name("goblin").unwrap();
    assert_eq!(goblin.status_effects().count(), 0);
    assert_eq!(tracker.all().len(), 1);
}

#[test]
fn test_remove_without_add_is_noop() {
    let tracker = make_tracker(1);
    tracker.submit_at("The goblin regains its composure.", t(0));
    let goblin = tracker
        .get_key(&CreatureKey::Name("goblin".into()))
        .unwrap();
    assert_eq!(goblin.status_effects().count(), 0);
}

#[test]
fn test_timed_status_expires_on_stream_clock() {
    let tracker = make_tracker(1);
    tracker.submit_at("The goblin is stunned!", t(0));
    tracker.submit_at("The troll is poisoned!", t(45));

    assert!(!tracker.find_by_name("goblin").unwrap().has_status("stunned"));
    assert!(tracker.find_by_name("troll").unwrap().has_status("poisoned"));
    assert_eq!(tracker.cleanup_expired_statuses_at(t(500)), 1);
}

#[test]
fn test_untargeted_lines_follow_attack_sequence() {
    let tracker = make_tracker(1);
    let troll = link(77, "troll", "cave troll");

    tracker.submit_at(&format!("You swing a battle axe at a {troll}!"), t(0));
    tracker.submit_at("** Your battle axe flares with a burst of flame! **", t(1));
    tracker.submit_at("... and hits for 42 points of damage!", t(1));
    tracker.submit_at("Deep gash across the right arm.", t(1));

    let creature = tracker.get(77).unwrap();
    assert_eq!(creature.flares()["fire"], 1);
    assert_eq!(creature.total_damage(), 42);
    assert_eq!(creature.injured_locations().count(), 1);
}

#[test]
fn test_cleanup_old_count_cap_keeps_most_recent() {
    let tracker = make_tracker(1);
    for id in 0..10 {
        tracker.register_at(id, "rat", t(id));
    }

    assert_eq!(tracker.cleanup_old_at(t(10), None, Some(3)), 7);
    let mut remaining: Vec<i64> = tracker.all().iter().filter_map(|c| c.id).collect();
    remaining.sort();
    assert_eq!(remaining, vec![7, 8, 9]);

    // Cap larger than the population evicts nothing
    assert_eq!(tracker.cleanup_old_at(t(10), None, Some(50)), 0);
}

#[test]
fn test_cleanup_old_age_before_cap() {
    let tracker = make_tracker(1);
    for id in 0..6 {
        tracker.register_at(id, "rat", t(id * 10));
    }

    // Ages at t=60: 60, 50, 40, 30, 20, 10
    assert_eq!(tracker.cleanup_old_at(t(60), Some(35), Some(2)), 4);
    assert!(tracker.get(5).is_some());
    assert!(tracker.get(4).is_some());
    assert!(tracker.get(3).is_none());
}

#[test]
fn test_register_then_route_by_id() {
    let tracker = make_tracker(1);
    tracker.register_at(9, "a hulking ogre", t(0));
    tracker.submit_at(&hit_line(&link(9, "ogre", "hulking ogre"), 30), t(1));

    let ogre = tracker.get(9).unwrap();
    assert_eq!(ogre.name, "a hulking ogre");
    assert_eq!(ogre.total_damage(), 30);
    assert_eq!(ogre.current_hp(), Some(70));
}

#[test]
fn test_per_entity_ordering_with_worker_pool() {
    let mut tracker = CombatTracker::new(TrackerSettings {
        max_threads: 4,
        buffer_size: 100_000,
        ..Default::default()
    })
    .unwrap();
    for round in 0..100u32 {
        for id in 1..=12 {
            tracker.submit_at(&hit_line(&link(id, "rat", "giant rat"), round + 1), t(0));
        }
    }
    tracker.shutdown();

    for id in 1..=12 {
        let amounts: Vec<u32> = tracker
            .get(id)
            .unwrap()
            .damage_samples()
            .iter()
            .map(|s| s.amount)
            .collect();
        assert_eq!(amounts, (1..=100).collect::<Vec<_>>(), "id {id}");
    }
    let stats = tracker.stats();
    assert!(!stats.enabled);
    assert_eq!(stats.counters.submitted, 1200);
    assert_eq!(stats.counters.processed, 1200);
}

#[test]
fn test_plain_text_status_pairs_stay_ordered_with_worker_pool() {
    for _ in 0..20 {
        let mut tracker = CombatTracker::new(TrackerSettings {
            max_threads: 4,
            buffer_size: 100_000,
            ..Default::default()
        })
        .unwrap();
        for n in 0..2_000 {
            tracker.submit_at(&hit_line(&link(n % 16, "rat", "giant rat"), 1), t(0));
        }
        tracker.submit_at("The goblin is stunned!", t(1));
        tracker.submit_at(&hit_line(&link(500, "rat", "giant rat"), 5), t(1));
        tracker.submit_at("goblin regains its composure.", t(2));
        tracker.shutdown();

        let goblin = tracker.find_by_name("goblin").unwrap();
        assert!(!goblin.has_status("stunned"));
        assert_eq!(tracker.stats().counters.dropped, 0);
    }
}

#[test]
fn test_registered_non_ascii_name_does_not_break_lookups() {
    let tracker = make_tracker(1);
    tracker.register_at(1, "Łódź beast", t(0));
    assert!(tracker.find_by_name("goblin").is_none());

    tracker.submit_at("The goblin is stunned!", t(1));
    assert!(tracker.find_by_name("goblin").unwrap().has_status("stunned"));
    assert_eq!(tracker.find_by_name("beast").unwrap().id, Some(1));

    let stats = tracker.stats();
    assert_eq!(stats.total_count, 2);
    assert_eq!(stats.counters.errors, 0);
}

#[test]
fn test_overshooting_hit_raises_estimate() {
    let tracker = make_tracker(1);
    let bandit = link(5, "bandit", "bandit");
    tracker.register_at(5, "bandit", t(0));
    assert!(tracker.set_max_hp_estimate(5, 100));

    tracker.submit_at(&hit_line(&bandit, 60), t(1));
    tracker.submit_at(&hit_line(&bandit, 70), t(2));

    let creature = tracker.get(5).unwrap();
    assert!(creature.is_dead());
    assert_eq!(creature.max_hp(), Some(130));
    assert_eq!(creature.death_damage(), Some(130));
}

#[test]
fn test_unlinked_creatures_sharing_a_name_report_separately() {
    let tracker = make_tracker(1);
    for (i, amount) in [90u32, 110].into_iter().enumerate() {
        let at = i as i64 * 10;
        tracker.submit_at(&hit_line("goblin", amount), t(at));
        tracker.submit_at(&death_line("goblin"), t(at + 1));
    }

    assert_eq!(tracker.all().len(), 2);
    let report = tracker.damage_report(1, ReportSortKey::Name, false);
    let goblins = &report.groups[0];
    assert_eq!((goblins.count, goblins.min, goblins.max), (2, 90, 110));
}

#[test]
fn test_disable_drains_and_ignores_later_lines() {
    let mut tracker = make_tracker(2);
    tracker.submit_at(&hit_line(&wendigo(), 10), t(0));
    tracker.disable();
    tracker.submit_at(&hit_line(&wendigo(), 20), t(1));

    assert_eq!(tracker.get(123).unwrap().total_damage(), 10);

    tracker.enable().unwrap();
    tracker.enable().unwrap();
    tracker.submit_at(&hit_line(&wendigo(), 5), t(2));
    tracker.disable();
    assert_eq!(tracker.get(123).unwrap().total_damage(), 15);
}

#[test]
fn test_configure_rejects_invalid_values_without_changes() {
    let mut tracker = make_tracker(1);

    let err = tracker
        .configure(&TrackerOptions {
            max_threads: Some(0),
            flares: Some(false),
            ..Default::default()
        })
        .unwrap_err();
    assert!(matches!(err, ConfigError::InvalidThreadCount(0)));
    assert!(tracker.settings().categories.flares);

    assert!(matches!(
        tracker.configure(&TrackerOptions {
            buffer_size: Some(0),
            ..Default::default()
        }),
        Err(ConfigError::InvalidBufferSize(0))
    ));
    assert!(matches!(
        tracker.set_fallback_hp(0),
        Err(ConfigError::InvalidFallbackHp(0))
    ));
    assert_eq!(tracker.settings(), &TrackerSettings::default());
}

#[test]
fn test_configure_disabling_category_applies_to_new_lines() {
    let mut tracker = make_tracker(1);
    tracker.submit_at("The goblin is stunned!", t(0));

    tracker
        .configure(&TrackerOptions {
            statuses: Some(false),
            max_threads: Some(2),
            ..Default::default()
        })
        .unwrap();
    tracker.submit_at("The troll is stunned!", t(1));
    tracker.shutdown();

    assert!(tracker.find_by_name("goblin").unwrap().has_status("stunned"));
    assert!(tracker.find_by_name("troll").is_none());
    assert_eq!(tracker.settings().max_threads, 2);
}

#[test]
fn test_fallback_hp_applies_to_new_creatures() {
    let mut tracker = make_tracker(1);
    tracker.submit_at(&hit_line(&link(1, "rat", "rat"), 10), t(0));
    tracker.set_fallback_hp(400).unwrap();
    tracker.submit_at(&hit_line(&link(2, "rat", "rat"), 10), t(1));

    assert_eq!(tracker.get(1).unwrap().current_hp(), Some(90));
    assert_eq!(tracker.get(2).unwrap().current_hp(), Some(390));
}

#[test]
fn test_damage_report_is_idempotent() {
    let tracker = make_tracker(1);
    for (id, total) in [(1, 120u32), (2, 80), (3, 100)] {
        let goblin = link(id, "goblin", "goblin");
        tracker.submit_at(&hit_line(&goblin, total), t(id));
        tracker.submit_at(&death_line(&goblin), t(id));
    }

    let first = tracker.damage_report(1, ReportSortKey::MaxDamage, false);
    let second = tracker.damage_report(1, ReportSortKey::MaxDamage, false);
    assert_eq!(first, second);

    let goblins = &first.groups[0];
    assert_eq!(goblins.name, "goblin");
    assert_eq!((goblins.min, goblins.max, goblins.count), (80, 120, 3));
    assert_eq!(goblins.median, 100.0);
}

#[test]
fn test_stats_and_reset() {
    let tracker = make_tracker(1);
    tracker.submit_at(&hit_line(&link(1, "rat", "rat"), 10), t(0));
    tracker.submit_at(&hit_line(&link(2, "rat", "rat"), 10), t(0));
    tracker.submit_at(&death_line(&link(2, "rat", "rat")), t(1));
    tracker.submit_at("Nothing happens.", t(2));

    let stats = tracker.stats();
    assert!(stats.enabled);
    assert_eq!(stats.active_count, 1);
    assert_eq!(stats.total_count, 2);
    assert_eq!(stats.counters.submitted, 4);
    assert_eq!(stats.counters.classified, 3);
    assert_eq!(stats.buffer_size, 1000);

    tracker.reset();
    let stats = tracker.stats();
    assert_eq!(stats.total_count, 0);
    assert_eq!(stats.counters.submitted, 0);
}

#[test]
fn test_set_max_hp_estimate_enables_depletion() {
    let tracker = make_tracker(1);
    tracker.register_at(5, "bandit", t(0));
    assert!(tracker.set_max_hp_estimate(5, 60));
    assert!(!tracker.set_max_hp_estimate(99, 60));

    tracker.submit_at(&hit_line(&link(5, "bandit", "bandit"), 60), t(1));
    let bandit = tracker.get(5).unwrap();
    assert!(bandit.is_dead());
    assert!(!bandit.is_fatal_crit());
}
