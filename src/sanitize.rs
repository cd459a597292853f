//! Text, markup, URL and title sanitizers applied to every course field
//! before it is stored.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use url::Url;

/// Tags (and their permitted attributes) kept in rich-text course content.
pub const CONTENT_ALLOWED_TAGS: &[(&str, &[&str])] = &[
    ("h3", &["class"]),
    ("p", &[]),
    ("ul", &[]),
    ("li", &[]),
    ("strong", &[]),
    ("br", &[]),
    ("em", &[]),
    ("b", &[]),
    ("i", &[]),
    ("span", &["class"]),
];

static SCRIPT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<script\b.*?</script\s*>|<style\b.*?</style\s*>").expect("valid regex")
});
static COMMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("valid regex"));
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<(/?)([a-zA-Z][a-zA-Z0-9]*)([^>]*)>").expect("valid regex")
});
static ANY_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("valid regex"));
static ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([a-zA-Z_:][a-zA-Z0-9_:.-]*)\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("valid regex")
});
static PARENTHETICAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\([^()]*\)").expect("valid regex"));
static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Removes every tag, drops script/style bodies and collapses whitespace.
pub fn sanitize_text_field(input: &str) -> String {
    let without_scripts = SCRIPT_RE.replace_all(input, "");
    let without_tags = ANY_TAG_RE.replace_all(&without_scripts, "");
    collapse_whitespace(&without_tags)
}

/// Keeps only the allow-listed tags and attributes. Disallowed tags are
/// removed while their inner text survives; script and style bodies and
/// comments are removed entirely.
pub fn kses(input: &str, allowed: &[(&str, &[&str])]) -> String {
    let without_scripts = SCRIPT_RE.replace_all(input, "");
    let without_comments = COMMENT_RE.replace_all(&without_scripts, "");

    TAG_RE
        .replace_all(&without_comments, |caps: &Captures<'_>| {
            let closing = !caps[1].is_empty();
            let tag = caps[2].to_ascii_lowercase();
            let Some((_, attrs)) = allowed.iter().find(|(name, _)| *name == tag) else {
                return String::new();
            };

            if closing {
                return format!("</{}>", tag);
            }

            let raw_attrs = &caps[3];
            let mut kept = String::new();
            for attr in ATTR_RE.captures_iter(raw_attrs) {
                let name = attr[1].to_ascii_lowercase();
                if !attrs.contains(&name.as_str()) {
                    continue;
                }
                let value = attr
                    .get(2)
                    .or_else(|| attr.get(3))
                    .map(|m| m.as_str())
                    .unwrap_or_default();
                kept.push_str(&format!(" {}=\"{}\"", name, escape_attr(value)));
            }

            if raw_attrs.trim_end().ends_with('/') {
                format!("<{}{} />", tag, kept)
            } else {
                format!("<{}{}>", tag, kept)
            }
        })
        .into_owned()
}

/// Rich-text filter with the course content allow-list.
pub fn sanitize_content(input: &str) -> String {
    kses(input, CONTENT_ALLOWED_TAGS)
}

/// Returns the URL when it parses as http(s), otherwise an empty string.
pub fn esc_url(input: &str) -> String {
    let trimmed = input.trim();
    match Url::parse(trimmed) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => trimmed.to_string(),
        _ => String::new(),
    }
}

pub fn is_valid_url(input: &str) -> bool {
    !esc_url(input).is_empty()
}

/// Drops parenthetical annotations such as `(Free Preview 2024)` and
/// collapses whitespace.
pub fn clean_title(raw: &str) -> String {
    let mut current = sanitize_text_field(raw);
    // nested parentheses are peeled from the inside out
    loop {
        let next = PARENTHETICAL_RE.replace_all(&current, " ").into_owned();
        if next == current {
            break;
        }
        current = next;
    }
    collapse_whitespace(&current)
}

/// Lowercase, dash-separated slug.
pub fn sanitize_title(input: &str) -> String {
    let text = sanitize_text_field(input).to_lowercase();
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;

    for ch in text.chars() {
        if ch.is_ascii_alphanumeric() || ch == '_' {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch);
        } else {
            pending_dash = true;
        }
    }

    slug
}

/// Last path segment of a permalink, without query string or fragment.
pub fn slug_from_permalink(permalink: &str) -> String {
    let basename = match Url::parse(permalink.trim()) {
        Ok(url) => url
            .path_segments()
            .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
            .unwrap_or_default()
            .to_string(),
        Err(_) => permalink
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .to_string(),
    };
    sanitize_title(&basename)
}

/// Absolute value of the leading integer in `input`; anything unparseable
/// is 0. `"-5"` gives 5, `"12abc"` gives 12, `"abc"` gives 0.
pub fn absint(input: &str) -> i64 {
    let trimmed = input.trim_start();
    let (negative, rest) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    let value = digits.parse::<i64>().unwrap_or(if digits.is_empty() { 0 } else { i64::MAX });
    if negative { value.saturating_abs() } else { value }
}

fn collapse_whitespace(input: &str) -> String {
    WHITESPACE_RE.replace_all(input, " ").trim().to_string()
}

fn escape_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_title_removes_parenthetical_annotation() {
        assert_eq!(clean_title("Intro to Rust (Free Preview 2024)"), "Intro to Rust");
        assert_eq!(clean_title("  Data   (beta) Science (2024) "), "Data Science");
        assert_eq!(clean_title("Outer (inner (deep)) End"), "Outer End");
        assert_eq!(clean_title("(Only Annotation)"), "");
    }

    #[test]
    fn test_sanitize_text_field_strips_markup() {
        assert_eq!(
            sanitize_text_field("<b>Jane</b>\n\t Doe<script>alert(1)</script>"),
            "Jane Doe"
        );
    }

    #[test]
    fn test_kses_keeps_allowed_tags_and_attributes() {
        let html = r#"<h3 class="title" onclick="x()">Hi</h3><div><p style="a">Body</p></div><img src="x.png"><br/>"#;
        assert_eq!(
            sanitize_content(html),
            r#"<h3 class="title">Hi</h3><p>Body</p><br />"#
        );
    }

    #[test]
    fn test_kses_drops_script_bodies_and_comments() {
        let html = "<p>a</p><script>steal()</script><!-- note --><span class='x'>b</span>";
        assert_eq!(sanitize_content(html), r#"<p>a</p><span class="x">b</span>"#);
    }

    #[test]
    fn test_esc_url_accepts_only_http() {
        assert_eq!(esc_url(" https://example.com/c/1 "), "https://example.com/c/1");
        assert_eq!(esc_url("javascript:alert(1)"), "");
        assert_eq!(esc_url("not a url"), "");
    }

    #[test]
    fn test_absint_takes_leading_digits() {
        assert_eq!(absint("10"), 10);
        assert_eq!(absint("-5"), 5);
        assert_eq!(absint(" 12abc"), 12);
        assert_eq!(absint("abc"), 0);
        assert_eq!(absint(""), 0);
        assert_eq!(absint("99999999999999999999"), i64::MAX);
    }

    #[test]
    fn test_slug_helpers() {
        assert_eq!(sanitize_title("Intro to Rust!"), "intro-to-rust");
        assert_eq!(slug_from_permalink("https://site.test/courses/intro-to-rust/"), "intro-to-rust");
        assert_eq!(slug_from_permalink("https://site.test/?p=12"), "");
        assert_eq!(slug_from_permalink(""), "");
    }
}
