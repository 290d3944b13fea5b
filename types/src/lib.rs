//! Configuration types shared between the bestiary engine and its tools.

pub mod formatting;
mod settings;

pub use settings::{
    DEFAULT_BUFFER_SIZE, DEFAULT_FALLBACK_MAX_HP, ReportSortKey, TrackedCategories,
    TrackerOptions, TrackerSettings,
};
