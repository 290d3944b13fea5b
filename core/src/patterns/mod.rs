//! Pattern catalogs and classification
//!
//! Definitions describe the narration lines we care about; the registry
//! compiles them into matchers and classifies raw lines.

mod builtin;
mod config;
mod definition;
mod durations;
mod registry;

pub use builtin::builtin_definitions;
pub use config::{categories_from_names, load_definitions, parse_definitions};
pub use definition::{BodyPart, Category, DefinitionConfig, Outcome, PatternDefinition, StatusAction};
pub use durations::status_duration;
pub use registry::{PatternRegistry, category_enabled};
