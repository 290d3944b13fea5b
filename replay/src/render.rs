//! Plain-text rendering of tracker output

use std::io::{self, Write};

use bestiary_core::{Creature, DamageReport, TrackerStats};
use bestiary_types::formatting::{format_age, format_compact, format_decimal, format_pct_ratio, format_thousands};
use chrono::NaiveDateTime;

/// Render a damage report as an aligned table.
pub fn print_damage_report(out: &mut impl Write, report: &DamageReport) -> io::Result<()> {
    if report.is_empty() {
        writeln!(out, "No creature deaths with usable damage samples.")?;
        return Ok(());
    }

    let name_width = report
        .iter()
        .map(|g| g.name.len())
        .max()
        .unwrap_or(0)
        .max("Creature".len());

    writeln!(
        out,
        "{:<name_width$}  {:>5}  {:>8}  {:>8}  {:>10}  {:>10}  {:>6}",
        "Creature", "Count", "Min", "Max", "Avg", "Median", "Crits"
    )?;
    writeln!(out, "{}", "-".repeat(name_width + 61))?;

    for group in report.iter() {
        writeln!(
            out,
            "{:<name_width$}  {:>5}  {:>8}  {:>8}  {:>10}  {:>10}  {:>6}",
            group.name,
            group.count,
            format_thousands(group.min),
            format_thousands(group.max),
            format_decimal(group.avg, 1),
            format_decimal(group.median, 1),
            group.fatal_crit_count,
        )?;
    }

    writeln!(
        out,
        "\n{} group(s), sorted by {}{}",
        report.len(),
        report.sort_by.as_str(),
        if report.include_fatal {
            ", fatal crits included"
        } else {
            ""
        }
    )
}

pub fn print_stats(out: &mut impl Write, stats: &TrackerStats) -> io::Result<()> {
    let c = &stats.counters;
    writeln!(out, "Lines submitted:   {}", format_compact(c.submitted))?;
    writeln!(
        out,
        "Lines classified:  {} ({})",
        format_thousands(c.classified),
        format_pct_ratio(c.classified as usize, c.processed as usize)
    )?;
    writeln!(out, "Lines dropped:     {}", format_thousands(c.dropped))?;
    writeln!(out, "Errors:            {}", format_thousands(c.errors))?;
    writeln!(
        out,
        "Creatures:         {} alive / {} tracked",
        stats.active_count, stats.total_count
    )?;
    writeln!(
        out,
        "Workers:           {} (buffer {})",
        stats.settings.max_threads, stats.buffer_size
    )
}

/// One line per creature, most recently seen first.
pub fn print_creatures(
    out: &mut impl Write,
    creatures: &[Creature],
    now: NaiveDateTime,
) -> io::Result<()> {
    for creature in creatures {
        let id = creature
            .id
            .map_or_else(|| "-".to_string(), |id| id.to_string());
        let hp = match (creature.current_hp(), creature.max_hp()) {
            (Some(hp), Some(max)) => format!("{hp}/{max}"),
            (Some(hp), None) => format!("{hp}/~{}", creature.fallback_max_hp()),
            (None, _) => "?".to_string(),
        };
        let state = if creature.is_fatal_crit() {
            "dead (fatal crit)"
        } else if creature.is_dead() {
            "dead"
        } else {
            "alive"
        };
        let statuses: Vec<&str> = creature.status_effects().collect();
        let age = (now - creature.last_seen_at).num_seconds().max(0);

        writeln!(
            out,
            "{:>10}  {:<30}  {:<18}  {:>10}  dmg {:>8}  seen {} ago{}",
            id,
            creature.name,
            state,
            hp,
            format_thousands(creature.total_damage()),
            format_age(age),
            if statuses.is_empty() {
                String::new()
            } else {
                format!("  [{}]", statuses.join(", "))
            }
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use bestiary_core::damage_report;
    use bestiary_types::ReportSortKey;

    use super::*;

    #[test]
    fn test_empty_report_message() {
        let mut buf = Vec::new();
        print_damage_report(&mut buf, &DamageReport::default()).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("No creature deaths"));
    }

    #[test]
    fn test_report_table_rows() {
        let mut wolf = Creature::new(None, "dire wolf", 100, NaiveDateTime::default());
        wolf.apply_damage(1250, NaiveDateTime::default());
        wolf.apply_death(NaiveDateTime::default());

        let report = damage_report(&[wolf], 1, ReportSortKey::Name, false);
        let mut buf = Vec::new();
        print_damage_report(&mut buf, &report).unwrap();
        let text = String::from_utf8(buf).unwrap();

        assert!(text.contains("dire wolf"));
        assert!(text.contains("1,250"));
        assert!(text.contains("sorted by name"));
    }
}
