//! Replay a captured narration log through the combat tracker.
//!
//! ```text
//! bestiary-replay session.log --threads 4 --sort max_damage
//! bestiary-replay --classify-only session.log
//! cat session.log | bestiary-replay --json
//! ```

mod render;

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use bestiary_core::patterns::{PatternRegistry, categories_from_names, load_definitions};
use bestiary_core::{CombatTracker, PatternDefinition, parse_sort_key};
use bestiary_types::TrackerSettings;
use chrono::Local;
use clap::Parser;
use serde::Serialize;
use tracing_subscriber::filter::EnvFilter;

#[derive(Parser, Debug)]
#[command(version, about = "Replay a combat narration log and report creature HP estimates")]
struct Cli {
    /// Log file to replay (reads stdin when omitted)
    log: Option<PathBuf>,

    /// Tracker settings file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Extra pattern definitions (TOML)
    #[arg(short, long)]
    definitions: Option<PathBuf>,

    /// Worker threads (1 = inline)
    #[arg(short, long)]
    threads: Option<usize>,

    /// Total line buffer size
    #[arg(long)]
    buffer_size: Option<usize>,

    /// Max HP assumed for creatures without an estimate
    #[arg(long)]
    fallback_hp: Option<u32>,

    /// Comma-separated categories to track (damage,wounds,flares,statuses,sequences)
    #[arg(long, value_delimiter = ',')]
    categories: Option<Vec<String>>,

    /// Log per-line misses and failures
    #[arg(long)]
    debug: bool,

    /// Minimum usable deaths per creature name
    #[arg(long, default_value_t = 1)]
    min_samples: usize,

    /// Report order: name, max_damage or avg_damage
    #[arg(long, default_value = "name")]
    sort: String,

    /// Count fatal-crit deaths as samples
    #[arg(long)]
    include_fatal: bool,

    /// Evict creatures not seen for this many seconds before reporting
    #[arg(long)]
    max_age: Option<u64>,

    /// Keep at most this many creatures before reporting
    #[arg(long)]
    max_instances: Option<usize>,

    /// List every tracked creature
    #[arg(long)]
    creatures: bool,

    /// Only classify lines (in parallel) and summarize matches per definition
    #[arg(long)]
    classify_only: bool,

    /// Emit JSON instead of tables
    #[arg(long)]
    json: bool,
}

fn init_logging(debug: bool) {
    let default_level = if debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    let filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(io::stderr)
        .init();
}

/// Settings file, then command-line overrides.
fn load_settings(cli: &Cli) -> Result<TrackerSettings, String> {
    let mut settings = match &cli.config {
        Some(path) => {
            let content = fs::read_to_string(path)
                .map_err(|e| format!("failed to read {}: {e}", path.display()))?;
            toml::from_str(&content).map_err(|e| format!("invalid settings in {}: {e}", path.display()))?
        }
        None => TrackerSettings::default(),
    };

    if let Some(names) = &cli.categories {
        settings.categories = categories_from_names(names).map_err(|e| e.to_string())?;
    }
    if let Some(threads) = cli.threads {
        settings.max_threads = threads;
    }
    if let Some(size) = cli.buffer_size {
        settings.buffer_size = size;
    }
    if let Some(hp) = cli.fallback_hp {
        settings.fallback_max_hp = hp;
    }
    if cli.debug {
        settings.debug = true;
    }
    Ok(settings)
}

fn read_log(path: Option<&Path>) -> io::Result<String> {
    let mut bytes = Vec::new();
    match path {
        Some(path) => bytes = fs::read(path)?,
        None => {
            io::stdin().read_to_end(&mut bytes)?;
        }
    }
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[derive(Serialize)]
struct ClassifySummary<'a> {
    lines: usize,
    unmatched: usize,
    errors: usize,
    by_definition: BTreeMap<String, usize>,
    first_unmatched: Vec<&'a str>,
}

fn classify_only(
    settings: &TrackerSettings,
    definitions: Vec<PatternDefinition>,
    log: &str,
    json: bool,
) -> Result<(), String> {
    let registry = PatternRegistry::with_definitions(&settings.categories, definitions)
        .map_err(|e| e.to_string())?;
    let lines: Vec<&str> = log.lines().filter(|l| !l.trim().is_empty()).collect();
    let results = registry.classify_all(&lines);

    let mut summary = ClassifySummary {
        lines: lines.len(),
        unmatched: 0,
        errors: 0,
        by_definition: BTreeMap::new(),
        first_unmatched: Vec::new(),
    };
    for (line, result) in lines.iter().zip(&results) {
        match result {
            Ok(Some(classified)) => {
                let key = format!("{}/{}", classified.category, classified.name);
                *summary.by_definition.entry(key).or_insert(0) += 1;
            }
            Ok(None) => {
                summary.unmatched += 1;
                if summary.first_unmatched.len() < 20 {
                    summary.first_unmatched.push(*line);
                }
            }
            Err(e) => {
                summary.errors += 1;
                tracing::warn!(line, error = %e, "Classification failed");
            }
        }
    }

    let mut out = io::stdout().lock();
    if json {
        let text = serde_json::to_string_pretty(&summary).map_err(|e| e.to_string())?;
        writeln!(out, "{text}").map_err(|e| e.to_string())?;
        return Ok(());
    }

    let write = |out: &mut io::StdoutLock<'_>| -> io::Result<()> {
        writeln!(
            out,
            "{} lines, {} unmatched, {} errors",
            summary.lines, summary.unmatched, summary.errors
        )?;
        for (definition, count) in &summary.by_definition {
            writeln!(out, "  {definition:<32} {count:>8}")?;
        }
        if !summary.first_unmatched.is_empty() {
            writeln!(out, "\nFirst unmatched lines:")?;
            for line in &summary.first_unmatched {
                writeln!(out, "  {line}")?;
            }
        }
        Ok(())
    };
    write(&mut out).map_err(|e| e.to_string())
}

fn run(cli: Cli) -> Result<(), String> {
    let settings = load_settings(&cli)?;
    let sort_by = parse_sort_key(&cli.sort).map_err(|e| e.to_string())?;
    let definitions = match &cli.definitions {
        Some(path) => load_definitions(path).map_err(|e| e.to_string())?,
        None => Vec::new(),
    };

    let log = read_log(cli.log.as_deref()).map_err(|e| format!("failed to read log: {e}"))?;

    if cli.classify_only {
        return classify_only(&settings, definitions, &log, cli.json);
    }

    let mut tracker =
        CombatTracker::with_definitions(settings, definitions).map_err(|e| e.to_string())?;
    let timer = std::time::Instant::now();
    for line in log.lines() {
        tracker.submit(line);
    }
    // Drain worker lanes so every line is routed before reporting
    tracker.shutdown();
    tracing::info!(elapsed_ms = timer.elapsed().as_millis() as u64, "Replay finished");

    if cli.max_age.is_some() || cli.max_instances.is_some() {
        tracker.cleanup_old(cli.max_age, cli.max_instances);
    }

    let stats = tracker.stats();
    let report = tracker.damage_report(cli.min_samples, sort_by, cli.include_fatal);
    let creatures = if cli.creatures { tracker.all() } else { Vec::new() };

    let mut out = io::stdout().lock();
    if cli.json {
        let value = serde_json::json!({
            "stats": stats,
            "report": report,
            "creatures": creatures,
        });
        let text = serde_json::to_string_pretty(&value).map_err(|e| e.to_string())?;
        writeln!(out, "{text}").map_err(|e| e.to_string())?;
        return Ok(());
    }

    let write = |out: &mut io::StdoutLock<'_>| -> io::Result<()> {
        render::print_stats(out, &stats)?;
        writeln!(out)?;
        render::print_damage_report(out, &report)?;
        if cli.creatures {
            writeln!(out)?;
            render::print_creatures(out, &creatures, Local::now().naive_local())?;
        }
        Ok(())
    };
    write(&mut out).map_err(|e| e.to_string())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.debug);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Replay failed");
            ExitCode::FAILURE
        }
    }
}
