//! Typed field extraction from a bounded text span.
//!
//! Every lookup takes the first match inside the span it is given. Callers
//! bound the span so a record never picks up a field from one of its nested
//! provisions. A missing field yields the default documented on each function.

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::model::{PermitSummary, SourceMap};
use crate::parser::scan;

/// Single-quoted value, honouring backslash escapes.
pub const QUOTED: &str = r"'((?:[^'\\]|\\.)*)'";

const STRING_FIELDS: &[&str] = &[
    "slug",
    "name",
    "county",
    "municipalityType",
    "lastReviewed",
    "bylawLastUpdated",
    "bylawRetrievedAt",
    "bylawVersionDate",
    "bylawSource",
    "bylawSourceTitle",
    "bylawSourceUrl",
    "agDecisionDate",
    "agDecisionUrl",
    "resistanceTag",
    "bottomLine",
    "stateLaw",
    "localBylaw",
    "impact",
    "agDecision",
    "tag",
    "title",
    "summary",
    "body",
];

const INTEGER_FIELDS: &[&str] = &[
    "population",
    "agDisapprovals",
    "submitted",
    "approved",
    "denied",
    "pending",
    "approvalRate",
];

const FLAG_FIELDS: &[&str] = &["isExempt"];

static STRINGS: LazyLock<HashMap<&'static str, Regex>> =
    LazyLock::new(|| compile_all(STRING_FIELDS, string_pattern));
static INTEGERS: LazyLock<HashMap<&'static str, Regex>> =
    LazyLock::new(|| compile_all(INTEGER_FIELDS, integer_pattern));
static FLAGS: LazyLock<HashMap<&'static str, Regex>> =
    LazyLock::new(|| compile_all(FLAG_FIELDS, flag_pattern));
static LINKS: LazyLock<HashMap<&'static str, Regex>> =
    LazyLock::new(|| compile_all(&["bylawSourceUrl", "agDecisionUrl", "url"], link_pattern));

static PERMITS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bpermits\s*:\s*\{").unwrap());
static UNICODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9a-fA-F]{4}").unwrap());

pub fn string_pattern(field: &str) -> String {
    format!(r"\b{}\s*:\s*{}", regex::escape(field), QUOTED)
}

fn integer_pattern(field: &str) -> String {
    format!(r"\b{}\s*:\s*(\d+)", regex::escape(field))
}

fn flag_pattern(field: &str) -> String {
    format!(r"\b{}\s*:\s*(true|false)\b", regex::escape(field))
}

fn link_pattern(field: &str) -> String {
    format!(
        r"\b{}\s*:\s*(?:{}|SOURCES\.(\w+))",
        regex::escape(field),
        QUOTED
    )
}

fn compile_all(
    names: &[&'static str],
    pattern: fn(&str) -> String,
) -> HashMap<&'static str, Regex> {
    names
        .iter()
        .filter_map(|name| Regex::new(&pattern(name)).ok().map(|re| (*name, re)))
        .collect()
}

/// Cached regex for a known field; any other name is compiled on demand.
fn lookup<'a>(
    table: &'a HashMap<&'static str, Regex>,
    field: &str,
    pattern: fn(&str) -> String,
) -> Option<Cow<'a, Regex>> {
    if let Some(re) = table.get(field) {
        return Some(Cow::Borrowed(re));
    }
    debug!(field, "compiling uncached field pattern");
    Regex::new(&pattern(field)).ok().map(Cow::Owned)
}

/// Raw (still escaped) contents of a quoted field.
fn raw_string<'s>(span: &'s str, field: &str) -> Option<&'s str> {
    let re = lookup(&STRINGS, field, string_pattern)?;
    re.captures(span)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Unescaped string value, or `None` when absent.
pub fn optional_string(span: &str, field: &str) -> Option<String> {
    raw_string(span, field).map(unescape)
}

/// Unescaped string value; empty string when absent.
pub fn string(span: &str, field: &str) -> String {
    optional_string(span, field).unwrap_or_default()
}

/// Non-negative integer; 0 when absent or out of range.
pub fn integer(span: &str, field: &str) -> u64 {
    let Some(re) = lookup(&INTEGERS, field, integer_pattern) else {
        return 0;
    };
    re.captures(span)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0)
}

pub fn count(span: &str, field: &str) -> u32 {
    u32::try_from(integer(span, field)).unwrap_or(u32::MAX)
}

/// Boolean literal; `false` when absent.
pub fn flag(span: &str, field: &str) -> bool {
    let Some(re) = lookup(&FLAGS, field, flag_pattern) else {
        return false;
    };
    re.captures(span)
        .and_then(|caps| caps.get(1))
        .is_some_and(|m| m.as_str() == "true")
}

/// Enumerated tag, parsed from the string value (empty string when absent).
pub fn tag<T>(span: &str, field: &str, parse: fn(&str) -> T) -> T {
    parse(&string(span, field))
}

/// A URL-valued field: either a literal or a reference into the source map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkValue {
    Literal(String),
    Source(String),
}

impl LinkValue {
    /// Resolve through `sources`. Unknown keys are kept as `SOURCES.<key>`.
    pub fn resolve(self, sources: &SourceMap) -> String {
        match self {
            LinkValue::Literal(url) => url,
            LinkValue::Source(key) => match sources.get(&key) {
                Some(citation) => citation.url.clone(),
                None => {
                    debug!(key = %key, "unresolved source reference");
                    format!("SOURCES.{key}")
                }
            },
        }
    }
}

pub fn link(span: &str, field: &str) -> Option<LinkValue> {
    let re = lookup(&LINKS, field, link_pattern)?;
    let caps = re.captures(span)?;
    if let Some(literal) = caps.get(1) {
        return Some(LinkValue::Literal(unescape(literal.as_str())));
    }
    caps.get(2).map(|key| LinkValue::Source(key.as_str().to_string()))
}

/// The `permits: { … }` object. Each count defaults to 0 independently.
pub fn permits(span: &str) -> PermitSummary {
    let object = match scan::find_block(span, &PERMITS_RE) {
        Some((open, Some(end))) => &span[open..end],
        Some((open, None)) => &span[open..],
        None => return PermitSummary::default(),
    };
    PermitSummary {
        submitted: count(object, "submitted"),
        approved: count(object, "approved"),
        denied: count(object, "denied"),
        pending: count(object, "pending"),
        approval_rate: count(object, "approvalRate"),
    }
}

/// Undo the source's escape sequences: `\n`, `\t`, `\'`, `\"`, `\\` and `\uXXXX`.
/// Unknown escapes keep the escaped character.
pub fn unescape(raw: &str) -> String {
    if !raw.contains('\\') {
        return raw.to_string();
    }
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(pos) = rest.find('\\') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];
        let mut chars = after.chars();
        let Some(c) = chars.next() else {
            out.push('\\');
            rest = "";
            break;
        };
        match c {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => {}
            'u' if UNICODE_RE.is_match(&after[1..]) => {
                let decoded = u32::from_str_radix(&after[1..5], 16)
                    .ok()
                    .and_then(char::from_u32);
                match decoded {
                    Some(ch) => out.push(ch),
                    None => out.push_str(&after[..5]),
                }
                rest = &after[5..];
                continue;
            }
            other => out.push(other),
        }
        rest = &after[c.len_utf8()..];
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Citation;

    const SPAN: &str = r#"
    slug: 'fall-river',
    name: 'Fall River',
    population: 94000,
    isExempt: true,
    permits: { submitted: 25, approved: 13, denied: 0, pending: 0, approvalRate: 52 },
    summary: 'ZBA has attached “no ADU” conditions. It\'s unusual.\nSecond line.',
    bylawSourceUrl: SOURCES.fall_river_beacon,
    "#;

    #[test]
    fn strings_and_defaults() {
        assert_eq!(string(SPAN, "slug"), "fall-river");
        assert_eq!(string(SPAN, "name"), "Fall River");
        assert_eq!(string(SPAN, "county"), "");
        assert_eq!(optional_string(SPAN, "agDecisionDate"), None);
    }

    #[test]
    fn escaped_delimiters_do_not_end_value() {
        let summary = string(SPAN, "summary");
        assert!(summary.contains("It's unusual."));
        assert!(summary.contains("\u{201c}no ADU\u{201d}"));
        assert!(summary.ends_with("\nSecond line."));
    }

    #[test]
    fn integers_and_flags() {
        assert_eq!(integer(SPAN, "population"), 94000);
        assert_eq!(integer(SPAN, "agDisapprovals"), 0);
        assert!(flag(SPAN, "isExempt"));
        assert!(!flag("isExempt: false", "isExempt"));
        assert!(!flag("", "isExempt"));
    }

    #[test]
    fn field_names_need_a_word_boundary() {
        let span = "nickname: 'nope', county: 'Bristol'";
        assert_eq!(string(span, "name"), "");
        assert_eq!(optional_string("agDecisionDate: '2025-05-27'", "agDecision"), None);
    }

    #[test]
    fn uncached_field_names_still_work() {
        assert_eq!(string("label: 'EOHLC FAQ'", "label"), "EOHLC FAQ");
    }

    #[test]
    fn permit_object() {
        let p = permits(SPAN);
        assert_eq!(p.submitted, 25);
        assert_eq!(p.approved, 13);
        assert_eq!(p.approval_rate, 52);
        assert_eq!(permits("no permits here"), PermitSummary::default());
    }

    #[test]
    fn permit_counts_default_independently() {
        let p = permits("permits: { approvalRate: 75, submitted: 4 }");
        assert_eq!(p.submitted, 4);
        assert_eq!(p.approved, 0);
        assert_eq!(p.approval_rate, 75);
    }

    #[test]
    fn link_references_resolve() {
        let mut sources = SourceMap::new();
        sources.insert(
            "fall_river_beacon".into(),
            Citation {
                label: "CommonWealth Beacon".into(),
                url: "https://commonwealthbeacon.org/x".into(),
            },
        );
        let value = link(SPAN, "bylawSourceUrl").unwrap();
        assert_eq!(value, LinkValue::Source("fall_river_beacon".into()));
        assert_eq!(value.resolve(&sources), "https://commonwealthbeacon.org/x");

        let literal = link("url: 'https://example.org'", "url").unwrap();
        assert_eq!(literal.resolve(&sources), "https://example.org");

        let missing = LinkValue::Source("gone".into()).resolve(&sources);
        assert_eq!(missing, "SOURCES.gone");
    }

    #[test]
    fn unescape_sequences() {
        assert_eq!(unescape(r"a\nb"), "a\nb");
        assert_eq!(unescape(r"it\'s"), "it's");
        assert_eq!(unescape(r"back\\slash"), "back\\slash");
        assert_eq!(unescape(r"\u00a73"), "§3");
        assert_eq!(unescape(r"\uZZ"), "uZZ");
        assert_eq!(unescape("trailing\\"), "trailing\\");
        assert_eq!(unescape("plain"), "plain");
    }
}
