use std::path::PathBuf;

/// Errors raised while building or reconfiguring the engine.
///
/// These are the only failures that surface to callers; per-line problems
/// are contained inside the processor.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("max_threads must be at least 1 (got {0})")]
    InvalidThreadCount(usize),

    #[error("buffer_size must be at least 1 (got {0})")]
    InvalidBufferSize(usize),

    #[error("fallback max HP must be positive (got {0})")]
    InvalidFallbackHp(u32),

    #[error("unknown tracking category '{0}' (expected damage, wounds, flares, statuses or sequences)")]
    UnknownCategory(String),

    #[error("unknown report sort key '{0}' (expected name, max_damage or avg_damage)")]
    UnknownSortKey(String),

    #[error("definition '{definition}' has an invalid template: {source}")]
    InvalidTemplate {
        definition: String,
        #[source]
        source: Box<fancy_regex::Error>,
    },

    #[error("definition '{definition}' is invalid: {reason}")]
    InvalidDefinition { definition: String, reason: String },

    #[error("IO error reading {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse error in {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to spawn worker thread: {0}")]
    WorkerSpawn(#[source] std::io::Error),
}

/// Failure while matching a single line.
///
/// Raised by the regex engine (e.g. backtrack limit exceeded on a
/// pathological line); the processor skips the line and keeps going.
#[derive(Debug, thiserror::Error)]
pub enum ClassifyError {
    #[error("matcher for '{definition}' failed: {source}")]
    Regex {
        definition: String,
        #[source]
        source: Box<fancy_regex::Error>,
    },
}
