//! Sanitizers for text and names spliced into generated JavaScript
//!
//! String literals never go through here: templates emit them with the
//! `json_encode` filter. These helpers cover the places a JSON literal cannot
//! go, such as comments and identifiers.

use once_cell::sync::Lazy;
use regex::Regex;

static TYPOGRAPHIC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[\u{2018}\u{2019}\u{201C}\u{201D}\u{2013}\u{2014}]").expect("valid regex")
});
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));
static NON_IDENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9_$]").expect("valid regex"));

const COMMENT_LIMIT: usize = 160;

/// Flatten free text into something safe for a single `//` line comment
///
/// # Examples
/// ```
/// use mcpforge::generation::sanitizers::sanitize_comment;
///
/// assert_eq!(sanitize_comment("Get the \u{201C}current\u{201D}\nweather"), "Get the \"current\" weather");
/// ```
pub fn sanitize_comment(input: &str) -> String {
    let plain = TYPOGRAPHIC.replace_all(input, |caps: &regex::Captures| match &caps[0] {
        "\u{2018}" | "\u{2019}" => "'",
        "\u{201C}" | "\u{201D}" => "\"",
        _ => "-",
    });
    let collapsed = WHITESPACE.replace_all(plain.trim(), " ").replace("*/", "* /");

    if collapsed.chars().count() <= COMMENT_LIMIT {
        return collapsed;
    }
    let mut truncated: String = collapsed.chars().take(COMMENT_LIMIT - 3).collect();
    truncated.push_str("...");
    truncated
}

/// Turn a tool name into a valid JavaScript identifier
///
/// # Examples
/// ```
/// use mcpforge::generation::sanitizers::js_identifier;
///
/// assert_eq!(js_identifier("listUsers_1"), "listUsers_1");
/// assert_eq!(js_identifier("get-user.profile"), "get_user_profile");
/// assert_eq!(js_identifier("2fa"), "_2fa");
/// ```
pub fn js_identifier(name: &str) -> String {
    let ident = NON_IDENT.replace_all(name.trim(), "_").into_owned();
    match ident.chars().next() {
        None => "_".to_string(),
        Some(first) if first.is_ascii_digit() => format!("_{ident}"),
        Some(_) => ident,
    }
}
