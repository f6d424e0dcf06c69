//! Input scrubbing for board posts.
//!
//! Rich bodies keep their markup minus active content; plain-text fields are
//! escaped.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;

const BLOCKED_TAGS: [&str; 5] = ["script", "style", "iframe", "object", "embed"];

static BLOCK_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    BLOCKED_TAGS
        .iter()
        .map(|tag| {
            Regex::new(&format!(r"(?is)<{tag}\b[^>]*>.*?</{tag}\s*>")).expect("block regex")
        })
        .collect()
});
static STRAY_TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)</?\s*(script|style|iframe|object|embed)\b[^>]*>").expect("stray tag regex")
});
static START_TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<([a-zA-Z][a-zA-Z0-9:-]*)((?:"[^"]*"|'[^']*'|[^'">])*)>"#)
        .expect("start tag regex")
});
static ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([^\s"'>/=]+)(?:\s*=\s*("[^"]*"|'[^']*'|[^\s"'>]+))?"#).expect("attr regex")
});
static NUMERIC_ENTITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)&#(x[0-9a-f]+|[0-9]+);?").expect("entity regex"));

static ANY_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"</?[a-zA-Z][^>]*>"#).expect("tag regex"));

const SCRIPT_SCHEMES: [&str; 3] = ["javascript:", "vbscript:", "data:"];

#[must_use]
pub fn sanitize_html(body: &str) -> String {
    let mut output: Cow<'_, str> = Cow::Borrowed(body);
    for re in BLOCK_RES.iter() {
        if re.is_match(&output) {
            output = Cow::Owned(re.replace_all(&output, "").into_owned());
        }
    }
    let output = STRAY_TAG_RE.replace_all(&output, "");
    let output = START_TAG_RE.replace_all(&output, |caps: &regex::Captures<'_>| {
        scrub_start_tag(&caps[0], &caps[1], &caps[2])
    });
    output.trim().to_string()
}

/// Drops `on*` handlers and neutralizes script-scheme values. Tags with
/// nothing to remove are returned untouched.
fn scrub_start_tag(raw: &str, name: &str, attrs: &str) -> String {
    let mut kept = Vec::new();
    let mut changed = false;
    for caps in ATTR_RE.captures_iter(attrs) {
        let attr_name = &caps[1];
        if attr_name.to_ascii_lowercase().starts_with("on") {
            changed = true;
            continue;
        }
        match caps.get(2) {
            Some(value) if has_script_scheme(value.as_str()) => {
                changed = true;
                kept.push(format!("{attr_name}=\"#\""));
            }
            _ => kept.push(caps[0].to_string()),
        }
    }
    if !changed {
        return raw.to_string();
    }
    let mut tag = format!("<{name}");
    for attr in kept {
        tag.push(' ');
        tag.push_str(&attr);
    }
    if attrs.trim_end().ends_with('/') {
        tag.push_str(" /");
    }
    tag.push('>');
    tag
}

/// Browsers decode entities and skip whitespace and control characters
/// before reading a URL scheme.
fn has_script_scheme(value: &str) -> bool {
    let unquoted = value.trim_matches(|c| c == '"' || c == '\'');
    let decoded = decode_entities(unquoted);
    let compact: String = decoded
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .flat_map(char::to_lowercase)
        .collect();
    SCRIPT_SCHEMES.iter().any(|scheme| compact.starts_with(scheme))
}

fn decode_entities(value: &str) -> String {
    let numeric = NUMERIC_ENTITY_RE.replace_all(value, |caps: &regex::Captures<'_>| {
        let digits = &caps[1];
        let code = match digits.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok(),
            None => digits.parse::<u32>().ok(),
        };
        code.and_then(char::from_u32)
            .map(String::from)
            .unwrap_or_default()
    });
    let mut decoded = numeric.into_owned();
    for (entity, ch) in [
        ("&colon;", ":"),
        ("&tab;", "\t"),
        ("&newline;", "\n"),
        ("&lt;", "<"),
        ("&gt;", ">"),
        ("&quot;", "\""),
        ("&amp;", "&"),
    ] {
        if decoded.to_ascii_lowercase().contains(entity) {
            decoded = replace_ignore_case(&decoded, entity, ch);
        }
    }
    decoded
}

fn replace_ignore_case(haystack: &str, needle: &str, with: &str) -> String {
    let lower = haystack.to_ascii_lowercase();
    let mut result = String::with_capacity(haystack.len());
    let mut last = 0;
    for (index, _) in lower.match_indices(needle) {
        result.push_str(&haystack[last..index]);
        result.push_str(with);
        last = index + needle.len();
    }
    result.push_str(&haystack[last..]);
    result
}

#[must_use]
pub fn escape_text(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Inverse of [`escape_text`], for values leaving the HTML context.
#[must_use]
pub fn unescape_text(value: &str) -> String {
    value
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#x27;", "'")
        .replace("&amp;", "&")
}

/// Plain-text rendering of a scrubbed body: tags dropped, entities decoded.
#[must_use]
pub fn to_plain_text(html: &str) -> String {
    let without_tags = ANY_TAG_RE.replace_all(html, "");
    decode_entities(&without_tags).trim().to_string()
}
