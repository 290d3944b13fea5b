//! Implicit status durations
//!
//! Some statuses wear off without narration (or the narration is easy to
//! miss). Statuses listed here expire once they have been installed for
//! longer than their duration; unlisted statuses only end on a remove line.

use chrono::Duration;

static STATUS_DURATION_SECS: phf::Map<&'static str, i64> = phf::phf_map! {
    "stunned" => 30,
    "prone" => 20,
    "webbed" => 30,
    "sleeping" => 60,
    "calmed" => 60,
    "immobilized" => 30,
    "frozen" => 20,
    "blinded" => 45,
    "silenced" => 45,
    "poisoned" => 120,
};

/// Duration after which `status` expires on its own, if it has one.
pub fn status_duration(status: &str) -> Option<Duration> {
    STATUS_DURATION_SECS
        .get(status)
        .map(|secs| Duration::seconds(*secs))
}
