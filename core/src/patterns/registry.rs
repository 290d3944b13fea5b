//! Compiled pattern registry
//!
//! Each enabled category compiles to one union matcher (every template of the
//! category as a single alternation) plus the ordered per-template matchers.
//! Classification tries the union first so most lines are rejected with one
//! regex per category, then walks the category's templates in order and
//! returns the first match.

use bestiary_types::TrackedCategories;
use fancy_regex::{Captures, Regex};
use rayon::prelude::*;

use super::builtin::builtin_definitions;
use super::definition::{Category, Outcome, PatternDefinition};
use crate::error::{ClassifyError, ConfigError};
use crate::events::{Classified, Payload};
use crate::text::{normalize_line, parse_target};

/// Expansion of `{target}`: optional article, then an entity link or a plain name.
const TARGET_FRAGMENT: &str =
    r"(?:(?:the|an?) )?(?P<target><a [^>]*>[^<]*</a>|[a-z][\w'-]*(?: [\w'-]+)*?)";

/// Expansion of `{amount}`.
const AMOUNT_FRAGMENT: &str = r"(?P<amount>\d+)";

fn expand_template(template: &str) -> String {
    template
        .replace("{target}", TARGET_FRAGMENT)
        .replace("{amount}", AMOUNT_FRAGMENT)
}

/// Replace named groups with plain non-capturing groups so templates can be
/// joined into one alternation without duplicate group names.
fn strip_named_groups(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len());
    let mut rest = pattern;
    while let Some(pos) = rest.find("(?") {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 2..];
        let name_start = if after.starts_with("P<") {
            Some(2)
        } else if after.starts_with('<')
            && after[1..].starts_with(|c: char| c.is_ascii_alphabetic() || c == '_')
        {
            Some(1)
        } else {
            None
        };
        match name_start.and_then(|start| after.find('>').map(|end| (start, end))) {
            Some((_, end)) => {
                out.push_str("(?:");
                rest = &after[end + 1..];
            }
            None => {
                out.push_str("(?");
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

fn compile(definition: &str, pattern: &str) -> Result<Regex, ConfigError> {
    Regex::new(pattern).map_err(|e| ConfigError::InvalidTemplate {
        definition: definition.to_string(),
        source: Box::new(e),
    })
}

/// Whether the tracking configuration enables a category.
pub fn category_enabled(categories: &TrackedCategories, category: Category) -> bool {
    match category {
        Category::Damage => categories.damage,
        Category::Critical => categories.wounds,
        Category::Flare => categories.flares,
        Category::Status => categories.statuses,
        Category::Sequence => categories.sequences,
    }
}

/// Payload shape of a definition, with captured fields left unset.
fn base_payload(def: &PatternDefinition) -> Result<Payload, ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidDefinition {
        definition: def.name.clone(),
        reason: reason.to_string(),
    };
    Ok(match def.category {
        Category::Damage if def.outcome == Outcome::Death => Payload::Death,
        Category::Damage => Payload::Damage { amount: None },
        Category::Critical => Payload::Critical {
            location: def.location.ok_or_else(|| invalid("missing location"))?,
            rank: def.rank.ok_or_else(|| invalid("missing rank"))?,
            fatal: def.fatal,
        },
        Category::Status => Payload::Status {
            action: def.action.ok_or_else(|| invalid("missing action"))?,
        },
        Category::Flare => Payload::Flare,
        Category::Sequence if def.outcome == Outcome::Disengage => Payload::Disengage,
        Category::Sequence => Payload::Engage,
    })
}

#[derive(Debug)]
struct CompiledDefinition {
    definition: PatternDefinition,
    payload: Payload,
    templates: Vec<Regex>,
}

impl CompiledDefinition {
    fn build(&self, caps: &Captures<'_>) -> Classified {
        let target = caps.name("target").and_then(|m| parse_target(m.as_str()));
        let payload = match self.payload {
            Payload::Damage { .. } => Payload::Damage {
                amount: caps.name("amount").and_then(|m| m.as_str().parse().ok()),
            },
            other => other,
        };
        Classified {
            category: self.definition.category,
            name: self.definition.name.clone(),
            outcome: self.definition.outcome,
            area_effect: self.definition.area_effect,
            target,
            payload,
        }
    }
}

#[derive(Debug)]
struct CategoryMatcher {
    category: Category,
    union: Regex,
    definitions: Vec<CompiledDefinition>,
}

/// Immutable, thread-safe catalog of compiled pattern definitions.
#[derive(Debug)]
pub struct PatternRegistry {
    categories: TrackedCategories,
    matchers: Vec<CategoryMatcher>,
}

impl PatternRegistry {
    /// Build from the builtin catalogs.
    pub fn new(categories: &TrackedCategories) -> Result<Self, ConfigError> {
        Self::with_definitions(categories, Vec::new())
    }

    /// Build from the builtin catalogs plus `extra` definitions.
    ///
    /// Extra definitions are appended after the builtins of their category,
    /// so builtins keep precedence.
    pub fn with_definitions(
        categories: &TrackedCategories,
        extra: Vec<PatternDefinition>,
    ) -> Result<Self, ConfigError> {
        let mut matchers = Vec::new();
        let all: Vec<PatternDefinition> = builtin_definitions().into_iter().chain(extra).collect();

        for category in Category::ALL {
            if !category_enabled(categories, category) {
                continue;
            }

            let mut definitions = Vec::new();
            let mut alternatives = Vec::new();
            for def in all.iter().filter(|d| d.category == category) {
                def.validate()?;
                let payload = base_payload(def)?;
                let mut templates = Vec::with_capacity(def.templates.len());
                for template in &def.templates {
                    let expanded = expand_template(template);
                    templates.push(compile(&def.name, &format!("(?i){expanded}"))?);
                    alternatives.push(format!("(?:{})", strip_named_groups(&expanded)));
                }
                definitions.push(CompiledDefinition {
                    definition: def.clone(),
                    payload,
                    templates,
                });
            }

            if definitions.is_empty() {
                continue;
            }
            let union = compile(
                category.as_str(),
                &format!("(?i){}", alternatives.join("|")),
            )?;
            matchers.push(CategoryMatcher {
                category,
                union,
                definitions,
            });
        }

        tracing::debug!(
            categories = ?categories.enabled_names(),
            definitions = matchers.iter().map(|m| m.definitions.len()).sum::<usize>(),
            "Pattern registry compiled"
        );

        Ok(Self {
            categories: *categories,
            matchers,
        })
    }

    /// Classify one raw line.
    ///
    /// Returns `Ok(None)` when no active template matches. Errors only come
    /// from the regex engine (e.g. backtrack limit on a pathological line).
    pub fn classify(&self, line: &str) -> Result<Option<Classified>, ClassifyError> {
        let normalized = normalize_line(line);
        let text = normalized.as_ref();
        if text.is_empty() {
            return Ok(None);
        }

        for matcher in &self.matchers {
            let hit = matcher.union.is_match(text).map_err(|e| ClassifyError::Regex {
                definition: matcher.category.to_string(),
                source: Box::new(e),
            })?;
            if !hit {
                continue;
            }

            for compiled in &matcher.definitions {
                for regex in &compiled.templates {
                    let caps = regex.captures(text).map_err(|e| ClassifyError::Regex {
                        definition: compiled.definition.name.clone(),
                        source: Box::new(e),
                    })?;
                    if let Some(caps) = caps {
                        return Ok(Some(compiled.build(&caps)));
                    }
                }
            }
        }

        Ok(None)
    }

    /// Classify a batch of lines in parallel, preserving input order.
    pub fn classify_all<S>(&self, lines: &[S]) -> Vec<Result<Option<Classified>, ClassifyError>>
    where
        S: AsRef<str> + Sync,
    {
        lines
            .par_iter()
            .map(|line| self.classify(line.as_ref()))
            .collect()
    }

    pub fn categories(&self) -> &TrackedCategories {
        &self.categories
    }

    /// Whether any matcher was compiled for `category`.
    pub fn has_category(&self, category: Category) -> bool {
        self.matchers.iter().any(|m| m.category == category)
    }

    pub fn len(&self) -> usize {
        self.matchers.iter().map(|m| m.definitions.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.matchers.is_empty()
    }
}
