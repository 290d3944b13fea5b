//! Tracker settings and partial option overlays
//!
//! Settings are plain serde structs so hosts can persist them however they
//! like (TOML file, JSON blob, command-line flags). Validation of values lives
//! in the engine, which rejects bad input at the call boundary.

use serde::{Deserialize, Serialize};

/// Default capacity of the line buffer, across all worker lanes.
pub const DEFAULT_BUFFER_SIZE: usize = 1000;

/// Assumed maximum HP for creatures with no observed death.
pub const DEFAULT_FALLBACK_MAX_HP: u32 = 100;

// ═══════════════════════════════════════════════════════════════════════════
// Tracked Categories
// ═══════════════════════════════════════════════════════════════════════════

/// Which pattern catalogs are compiled into the registry.
///
/// Each dimension can be switched off independently to save matching work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackedCategories {
    /// Damage amounts and death narration
    pub damage: bool,
    /// Critical wounds (body location + rank, fatal crits)
    pub wounds: bool,
    /// Weapon/armor flares
    pub flares: bool,
    /// Status effects (stunned, webbed, prone...)
    pub statuses: bool,
    /// Attack sequences that establish the current target
    pub sequences: bool,
}

impl Default for TrackedCategories {
    fn default() -> Self {
        Self::all()
    }
}

impl TrackedCategories {
    /// Every category enabled.
    pub const fn all() -> Self {
        Self {
            damage: true,
            wounds: true,
            flares: true,
            statuses: true,
            sequences: true,
        }
    }

    /// Every category disabled.
    pub const fn none() -> Self {
        Self {
            damage: false,
            wounds: false,
            flares: false,
            statuses: false,
            sequences: false,
        }
    }

    /// Toggle a category by its configuration name.
    ///
    /// Returns `false` if the name is not a known category.
    pub fn set(&mut self, name: &str, enabled: bool) -> bool {
        let slot = match name.trim().to_ascii_lowercase().as_str() {
            "damage" => &mut self.damage,
            "wounds" | "criticals" | "critical" => &mut self.wounds,
            "flares" | "flare" => &mut self.flares,
            "statuses" | "status" => &mut self.statuses,
            "sequences" | "sequence" => &mut self.sequences,
            _ => return false,
        };
        *slot = enabled;
        true
    }

    /// Names of the enabled categories, in configuration spelling.
    pub fn enabled_names(&self) -> Vec<&'static str> {
        [
            ("damage", self.damage),
            ("wounds", self.wounds),
            ("flares", self.flares),
            ("statuses", self.statuses),
            ("sequences", self.sequences),
        ]
        .into_iter()
        .filter_map(|(name, on)| on.then_some(name))
        .collect()
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Tracker Settings
// ═══════════════════════════════════════════════════════════════════════════

/// Complete tracker configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerSettings {
    pub categories: TrackedCategories,
    /// Worker count. 1 processes lines inline with `submit`.
    pub max_threads: usize,
    /// Total buffer capacity, shared by all worker lanes
    pub buffer_size: usize,
    /// Max HP assumed for creatures with no death-based estimate
    pub fallback_max_hp: u32,
    /// Log per-line misses and matcher failures
    pub debug: bool,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            categories: TrackedCategories::default(),
            max_threads: 1,
            buffer_size: DEFAULT_BUFFER_SIZE,
            fallback_max_hp: DEFAULT_FALLBACK_MAX_HP,
            debug: false,
        }
    }
}

impl TrackerSettings {
    /// Overlay a partial configuration, returning the merged settings.
    ///
    /// Fields left as `None` in `options` keep their current value.
    pub fn merge(&self, options: &TrackerOptions) -> Self {
        let mut merged = self.clone();
        let cats = &mut merged.categories;
        if let Some(on) = options.damage {
            cats.damage = on;
        }
        if let Some(on) = options.wounds {
            cats.wounds = on;
        }
        if let Some(on) = options.flares {
            cats.flares = on;
        }
        if let Some(on) = options.statuses {
            cats.statuses = on;
        }
        if let Some(on) = options.sequences {
            cats.sequences = on;
        }
        if let Some(threads) = options.max_threads {
            merged.max_threads = threads;
        }
        if let Some(size) = options.buffer_size {
            merged.buffer_size = size;
        }
        if let Some(hp) = options.fallback_max_hp {
            merged.fallback_max_hp = hp;
        }
        if let Some(debug) = options.debug {
            merged.debug = debug;
        }
        merged
    }
}

/// Partial configuration accepted by `configure`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerOptions {
    pub damage: Option<bool>,
    pub wounds: Option<bool>,
    pub flares: Option<bool>,
    pub statuses: Option<bool>,
    pub sequences: Option<bool>,
    pub max_threads: Option<usize>,
    pub buffer_size: Option<usize>,
    pub fallback_max_hp: Option<u32>,
    pub debug: Option<bool>,
}

impl TrackerOptions {
    /// True when no field is set.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Whether applying these options changes how lines are matched or buffered.
    pub fn touches_pipeline(&self) -> bool {
        self.damage.is_some()
            || self.wounds.is_some()
            || self.flares.is_some()
            || self.statuses.is_some()
            || self.sequences.is_some()
            || self.max_threads.is_some()
            || self.buffer_size.is_some()
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Report Sorting
// ═══════════════════════════════════════════════════════════════════════════

/// Ordering of damage report groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportSortKey {
    /// Creature name, ascending
    #[default]
    Name,
    /// Largest observed death damage first
    MaxDamage,
    /// Highest average death damage first
    AvgDamage,
}

impl ReportSortKey {
    /// Parse a configuration spelling (`name`, `max_damage`, `avg_damage`).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "name" => Some(Self::Name),
            "max_damage" | "max" => Some(Self::MaxDamage),
            "avg_damage" | "avg" | "average" => Some(Self::AvgDamage),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::MaxDamage => "max_damage",
            Self::AvgDamage => "avg_damage",
        }
    }
}
