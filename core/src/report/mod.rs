//! Damage aggregation for HP estimation
//!
//! Groups dead creatures by name and summarizes the cumulative damage each
//! one had taken when it died. Depletion deaths measure a creature's full HP
//! pool; fatal-crit deaths only give a lower bound, so they are excluded
//! unless asked for.

use bestiary_types::ReportSortKey;
use hashbrown::HashMap;
use serde::Serialize;

use crate::creature::Creature;
use crate::error::ConfigError;
use crate::text::normalize_name;

/// Parse a sort key, rejecting unknown spellings.
pub fn parse_sort_key(s: &str) -> Result<ReportSortKey, ConfigError> {
    ReportSortKey::parse(s).ok_or_else(|| ConfigError::UnknownSortKey(s.to_string()))
}

/// Summary for one creature name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DamageGroup {
    pub name: String,
    /// Usable samples
    pub count: usize,
    pub min: u64,
    pub max: u64,
    pub avg: f64,
    pub median: f64,
    /// Deaths in this group caused by a fatal critical
    pub fatal_crit_count: usize,
}

/// Aggregated death damage, one group per creature name.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DamageReport {
    pub groups: Vec<DamageGroup>,
    pub sort_by: ReportSortKey,
    pub include_fatal: bool,
}

impl DamageReport {
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DamageGroup> {
        self.groups.iter()
    }

    pub fn get(&self, name: &str) -> Option<&DamageGroup> {
        let name = normalize_name(name);
        self.groups.iter().find(|g| g.name == name)
    }
}

#[derive(Default)]
struct Accumulator {
    samples: Vec<u64>,
    fatal_crits: usize,
}

fn median(sorted: &[u64]) -> f64 {
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] as f64 + sorted[mid] as f64) / 2.0
    } else {
        sorted[mid] as f64
    }
}

/// Build a damage report from a creature snapshot.
///
/// Groups with fewer than `min_samples` usable samples are dropped. Pure:
/// the same input always gives the same report.
pub fn damage_report(
    creatures: &[Creature],
    min_samples: usize,
    sort_by: ReportSortKey,
    include_fatal: bool,
) -> DamageReport {
    let mut by_name: HashMap<String, Accumulator> = HashMap::new();

    for creature in creatures.iter().filter(|c| c.is_dead()) {
        let acc = by_name.entry(normalize_name(&creature.name)).or_default();
        if creature.is_fatal_crit() {
            acc.fatal_crits += 1;
            if !include_fatal {
                continue;
            }
        }
        if let Some(damage) = creature.death_damage() {
            acc.samples.push(damage);
        }
    }

    let mut groups: Vec<DamageGroup> = by_name
        .into_iter()
        .filter(|(_, acc)| !acc.samples.is_empty() && acc.samples.len() >= min_samples)
        .map(|(name, mut acc)| {
            acc.samples.sort_unstable();
            let count = acc.samples.len();
            let total: u64 = acc.samples.iter().sum();
            DamageGroup {
                name,
                count,
                min: acc.samples[0],
                max: acc.samples[count - 1],
                avg: total as f64 / count as f64,
                median: median(&acc.samples),
                fatal_crit_count: acc.fatal_crits,
            }
        })
        .collect();

    match sort_by {
        ReportSortKey::Name => groups.sort_by(|a, b| a.name.cmp(&b.name)),
        ReportSortKey::MaxDamage => {
            groups.sort_by(|a, b| b.max.cmp(&a.max).then_with(|| a.name.cmp(&b.name)))
        }
        ReportSortKey::AvgDamage => groups.sort_by(|a, b| {
            b.avg
                .total_cmp(&a.avg)
                .then_with(|| a.name.cmp(&b.name))
        }),
    }

    DamageReport {
        groups,
        sort_by,
        include_fatal,
    }
}
