//! Narration text helpers
//!
//! The host stream interleaves narration with presentation markup. Only
//! entity links carry information we need:
//!
//! ```text
//! The <pushBold/><a exist="123" noun="wendigo">savage fork-tongued wendigo</a><popBold/> is stunned!
//! ```
//!
//! Everything else (bold toggles, command links, style tags) is stripped
//! before matching, and a handful of XML entities are decoded.

use std::borrow::Cow;

use memchr::{memchr, memmem};

use crate::events::TargetRef;

const EXIST_ATTR: &[u8] = b"exist=\"";

/// Strip presentation markup (keeping `<a ...>` entity links), decode
/// entities, collapse runs of whitespace and trim.
pub fn normalize_line(line: &str) -> Cow<'_, str> {
    let bytes = line.as_bytes();
    let needs_work = memchr(b'<', bytes).is_some()
        || memchr(b'&', bytes).is_some()
        || line.contains("  ")
        || line.contains('\t')
        || line.trim().len() != line.len();
    if !needs_work {
        return Cow::Borrowed(line);
    }

    let mut out = String::with_capacity(line.len());
    let mut rest = line;
    while let Some(open) = memchr(b'<', rest.as_bytes()) {
        push_text(&mut out, &rest[..open]);
        let tag_region = &rest[open..];
        let Some(close) = memchr(b'>', tag_region.as_bytes()) else {
            // Unterminated tag: keep the remainder as text
            push_text(&mut out, tag_region);
            rest = "";
            break;
        };
        let tag = &tag_region[..=close];
        if is_link_tag(tag) {
            out.push_str(tag);
        }
        rest = &tag_region[close + 1..];
    }
    push_text(&mut out, rest);

    collapse_whitespace(&out)
}

fn is_link_tag(tag: &str) -> bool {
    let inner = tag.trim_start_matches('<');
    inner.starts_with("a ") || inner.starts_with("a>") || inner.starts_with("/a>")
}

fn push_text(out: &mut String, text: &str) {
    if memchr(b'&', text.as_bytes()).is_none() {
        out.push_str(text);
        return;
    }
    out.push_str(
        &text
            .replace("&gt;", ">")
            .replace("&lt;", "<")
            .replace("&quot;", "\"")
            .replace("&apos;", "'")
            .replace("&amp;", "&"),
    );
}

fn collapse_whitespace(s: &str) -> Cow<'static, str> {
    let mut out = String::with_capacity(s.len());
    for word in s.split_whitespace() {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }
    Cow::Owned(out)
}

/// Existence id of the first entity link in the line, if any.
///
/// Used for routing before the line is classified, so it only scans bytes.
pub fn first_link_id(line: &str) -> Option<i64> {
    let bytes = line.as_bytes();
    let start = memmem::find(bytes, EXIST_ATTR)? + EXIST_ATTR.len();
    let end = start + memchr(b'"', &bytes[start..])?;
    line[start..end].parse().ok()
}

/// Build a target reference from a `target` capture.
///
/// Captures are either an entity link or plain narration text. Returns
/// `None` when nothing usable remains (empty capture, or the player).
pub fn parse_target(capture: &str) -> Option<TargetRef> {
    let capture = capture.trim();
    if capture.starts_with("<a ") {
        return parse_link(capture);
    }

    let name = strip_article(capture.trim_end_matches(['.', '!', ',', '?']).trim());
    if name.is_empty() || name.eq_ignore_ascii_case("you") {
        return None;
    }
    Some(TargetRef {
        id: None,
        name: name.to_string(),
        noun: None,
    })
}

fn parse_link(link: &str) -> Option<TargetRef> {
    let open_end = memchr(b'>', link.as_bytes())?;
    let attrs = &link[..open_end];
    let body_end = memmem::find(link.as_bytes(), b"</a>").unwrap_or(link.len());
    let name = strip_article(link.get(open_end + 1..body_end)?.trim());

    let id = first_link_id(attrs);
    let noun = attr_value(attrs, "noun").map(str::to_string);

    if name.is_empty() && id.is_none() {
        return None;
    }
    Some(TargetRef {
        id,
        name: name.to_string(),
        noun,
    })
}

fn attr_value<'a>(attrs: &'a str, key: &str) -> Option<&'a str> {
    let needle = format!("{key}=\"");
    let start = attrs.find(&needle)? + needle.len();
    let len = attrs[start..].find('"')?;
    Some(&attrs[start..start + len])
}

/// Remove a leading English article.
pub fn strip_article(s: &str) -> &str {
    for article in ["the ", "an ", "a "] {
        if s.len() > article.len()
            && s.get(..article.len())
                .is_some_and(|prefix| prefix.eq_ignore_ascii_case(article))
        {
            return s[article.len()..].trim_start();
        }
    }
    s
}

/// Last word of a normalized name, the noun narration usually calls a
/// creature by.
pub fn name_tail(normalized: &str) -> &str {
    normalized.rsplit(' ').next().unwrap_or(normalized)
}

/// Canonical form of a display name used for name-keyed lookup.
pub fn normalize_name(name: &str) -> String {
    strip_article(name.trim())
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_markup_but_keeps_links() {
        let line = r#"The <pushBold/><a exist="123" noun="wendigo">savage fork-tongued wendigo</a><popBold/>   is stunned!"#;
        assert_eq!(
            normalize_line(line),
            r#"The <a exist="123" noun="wendigo">savage fork-tongued wendigo</a> is stunned!"#
        );
    }

    #[test]
    fn test_normalize_plain_line_is_borrowed() {
        let line = "The goblin is stunned!";
        assert!(matches!(normalize_line(line), Cow::Borrowed(_)));
    }

    #[test]
    fn test_normalize_decodes_entities() {
        assert_eq!(normalize_line("  a &gt; b &amp; c "), "a > b & c");
    }

    #[test]
    fn test_first_link_id() {
        let line = r#"You swing at <a exist="-10467221" noun="troll">a troll</a>!"#;
        assert_eq!(first_link_id(line), Some(-10467221));
        assert_eq!(first_link_id("The goblin is stunned!"), None);
    }

    #[test]
    fn test_parse_target_link() {
        let target =
            parse_target(r#"<a exist="123" noun="wendigo">savage fork-tongued wendigo</a>"#)
                .unwrap();
        assert_eq!(target.id, Some(123));
        assert_eq!(target.name, "savage fork-tongued wendigo");
        assert_eq!(target.noun.as_deref(), Some("wendigo"));
    }

    #[test]
    fn test_parse_target_plain_text() {
        let target = parse_target("The goblin").unwrap();
        assert_eq!(target.id, None);
        assert_eq!(target.name, "goblin");
        assert!(parse_target("you").is_none());
        assert!(parse_target("  ").is_none());
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("A  Savage   Goblin"), "savage goblin");
        assert_eq!(normalize_name("the goblin"), "goblin");
        assert_eq!(normalize_name("a"), "a");
    }

    #[test]
    fn test_name_tail() {
        assert_eq!(name_tail("savage fork-tongued wendigo"), "wendigo");
        assert_eq!(name_tail("goblin"), "goblin");
        assert_eq!(name_tail(""), "");
    }

    #[test]
    fn test_normalize_name_non_ascii() {
        assert_eq!(normalize_name("Łódź beast"), "łódź beast");
        assert_eq!(normalize_name("The Łódź beast"), "łódź beast");
        assert_eq!(strip_article("añb"), "añb");
        assert_eq!(strip_article("Ébène"), "Ébène");
    }
}
