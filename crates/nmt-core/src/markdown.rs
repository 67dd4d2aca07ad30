//! Markdown detection and post-translation sanitization, guarding
//! downstream Markdown renderers against parser depth errors. See spec §4.3.

use std::sync::LazyLock;

use regex::Regex;

/// RTL language codes whose translated output is prone to flipped bracket
/// direction (`[text]` rendered as `]text[`).
pub const RTL_LANGS: &[&str] = &["ar", "he", "fa", "ur", "yi", "ps"];

const BRACKET_PAIRS: &[(char, char)] = &[('[', ']'), ('(', ')')];

static LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[.+?\]\(.+?\)").expect("valid link regex"));
static IMAGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!\[.*?\]\(.+?\)").expect("valid image regex"));
static HEADER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^#{1,6}\s+.+").expect("valid header regex"));
static FENCED_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```.*?```").expect("valid fenced code regex"));
static TABLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\|.+\|.+\|").expect("valid table regex"));
static TABLE_SEP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\|-+\|").expect("valid table separator regex"));
static BOLD_STAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*[^*\n]+\*\*").expect("valid bold-star regex"));
static BOLD_UNDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"__[^_\n]+__").expect("valid bold-underscore regex"));
static ITALIC_STAR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:[^*\w]|^)\*[^*\n]+\*(?:[^*\w]|$)").expect("valid italic-star regex")
});
static ITALIC_UNDER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:[^_\w]|^)_[^_\n]+_(?:[^_\w]|$)").expect("valid italic-underscore regex")
});
static INLINE_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"`[^`\n]+`").expect("valid inline-code regex"));
static UL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*[-*+]\s+\S").expect("valid unordered-list regex"));
static OL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*\d+\.\s+\S").expect("valid ordered-list regex"));
static BLOCKQUOTE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^>\s*.+").expect("valid blockquote regex"));
static REFERENCE_LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[.+?\]\[.+?\]").expect("valid reference-link regex"));
static LINK_DEF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\[.+?\]:\s*\S+").expect("valid link-definition regex"));
static STRIKETHROUGH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"~~.+?~~").expect("valid strikethrough regex"));
static HR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^---+$").expect("valid horizontal-rule regex"));
static HR_ALT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\*\*\*+$").expect("valid horizontal-rule-alt regex"));

static UNBALANCED_EMPHASIS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\*{1,3}|_{1,3})(?:[^*_]*\1){3,}").expect("valid unbalanced-emphasis regex")
});
static REVERSED_SQUARE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\]([^\[\]]+)\[").expect("valid reversed-square regex"));
static REVERSED_PAREN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\)([^()]+)\(").expect("valid reversed-paren regex"));

static IMAGE_STRIP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!\[([^\]]*)\]\([^)]*\)").expect("valid image-strip regex"));
static LINK_STRIP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]*)\]\([^)]*\)").expect("valid link-strip regex"));
static REFERENCE_LINK_STRIP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[([^\]]*)\]\[[^\]]*\]").expect("valid reference-link-strip regex")
});
static LINK_DEF_STRIP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*\[[^\]]+\]:\s*.*$").expect("valid link-definition-strip regex")
});
static TRIPLE_STAR_EMPHASIS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*{3,}([^*]+)\*{3,}").expect("valid triple-star regex"));
static TRIPLE_UNDER_EMPHASIS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_{3,}([^_]+)_{3,}").expect("valid triple-underscore regex"));
static HTML_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]+>").expect("valid html-tag regex"));
static MULTI_OPEN_SQUARE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[{2,}").expect("valid multi-open-square regex"));
static MULTI_CLOSE_SQUARE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\]{2,}").expect("valid multi-close-square regex"));
static MULTI_OPEN_PAREN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\({2,}").expect("valid multi-open-paren regex"));
static MULTI_CLOSE_PAREN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\){2,}").expect("valid multi-close-paren regex"));

const MARKDOWN_CONFIDENCE_THRESHOLD: f64 = 0.5;

/// Outcome of [`detect_markdown`].
#[derive(Debug, Clone, PartialEq)]
pub struct MarkdownDetection {
    pub is_markdown: bool,
    pub confidence: f64,
    pub patterns_found: Vec<&'static str>,
}

/// Weighted pattern scan used to decide whether `text` should be treated as
/// Markdown rather than plain prose before translation.
pub fn detect_markdown(text: &str) -> MarkdownDetection {
    if text.chars().count() < 2 {
        return MarkdownDetection {
            is_markdown: false,
            confidence: 0.0,
            patterns_found: Vec::new(),
        };
    }

    let indicators: &[(&LazyLock<Regex>, f64, &'static str)] = &[
        (&LINK_RE, 1.0, "link"),
        (&IMAGE_RE, 1.0, "image"),
        (&HEADER_RE, 0.9, "header"),
        (&FENCED_CODE_RE, 1.0, "fenced_code"),
        (&TABLE_RE, 0.95, "table"),
        (&TABLE_SEP_RE, 1.0, "table_separator"),
        (&BOLD_STAR_RE, 0.8, "bold_asterisk"),
        (&BOLD_UNDER_RE, 0.8, "bold_underscore"),
        (&ITALIC_STAR_RE, 0.6, "italic_asterisk"),
        (&ITALIC_UNDER_RE, 0.5, "italic_underscore"),
        (&INLINE_CODE_RE, 0.7, "inline_code"),
        (&UL_RE, 0.6, "unordered_list"),
        (&OL_RE, 0.6, "ordered_list"),
        (&BLOCKQUOTE_RE, 0.7, "blockquote"),
        (&REFERENCE_LINK_RE, 0.9, "reference_link"),
        (&LINK_DEF_RE, 1.0, "link_definition"),
        (&STRIKETHROUGH_RE, 0.8, "strikethrough"),
        (&HR_RE, 0.7, "horizontal_rule"),
        (&HR_ALT_RE, 0.7, "horizontal_rule_alt"),
    ];

    let mut patterns_found = Vec::new();
    let mut max_confidence: f64 = 0.0;

    for (re, weight, name) in indicators {
        if re.is_match(text) {
            patterns_found.push(*name);
            max_confidence = max_confidence.max(*weight);
        }
    }

    let confidence = if patterns_found.is_empty() {
        0.0
    } else {
        let bonus = (patterns_found.len() as f64 * 0.05).min(0.2);
        (max_confidence + bonus).min(1.0)
    };

    MarkdownDetection {
        is_markdown: confidence >= MARKDOWN_CONFIDENCE_THRESHOLD,
        confidence,
        patterns_found,
    }
}

/// Result of [`sanitize`].
#[derive(Debug, Clone, PartialEq)]
pub struct SanitizationResult {
    pub text: String,
    pub was_sanitized: bool,
    pub issues_found: Vec<String>,
    pub depth_warning: bool,
}

fn count_nesting_depth(text: &str) -> i64 {
    let mut max_depth = 0i64;
    let mut depth = 0i64;
    for ch in text.chars() {
        match ch {
            '[' | '(' => {
                depth += 1;
                max_depth = max_depth.max(depth);
            }
            ']' | ')' => depth = (depth - 1).max(0),
            _ => {}
        }
    }
    max_depth
}

fn balance_brackets(text: &str, open_ch: char, close_ch: char) -> (String, bool) {
    let chars: Vec<char> = text.chars().collect();
    let mut open_stack: Vec<usize> = Vec::new();
    let mut unmatched_close: Vec<usize> = Vec::new();

    for (i, &ch) in chars.iter().enumerate() {
        if ch == open_ch {
            open_stack.push(i);
        } else if ch == close_ch {
            if open_stack.pop().is_none() {
                unmatched_close.push(i);
            }
        }
    }

    let mut unmatched: std::collections::HashSet<usize> = open_stack.into_iter().collect();
    unmatched.extend(unmatched_close);

    if unmatched.is_empty() {
        return (text.to_owned(), false);
    }

    let result: String = chars
        .into_iter()
        .enumerate()
        .filter(|(i, _)| !unmatched.contains(i))
        .map(|(_, c)| c)
        .collect();

    (result, true)
}

fn fix_rtl_brackets(text: &str) -> (String, bool) {
    let mut modified = false;
    let mut result = text.to_owned();

    loop {
        let Some(m) = REVERSED_SQUARE_RE.captures(&result) else {
            break;
        };
        let whole = m.get(0).expect("group 0 always present");
        let inner = &m[1];
        let replacement = format!("[{inner}]");
        result = format!(
            "{}{}{}",
            &result[..whole.start()],
            replacement,
            &result[whole.end()..]
        );
        modified = true;
    }

    loop {
        let Some(m) = REVERSED_PAREN_RE.captures(&result) else {
            break;
        };
        let whole = m.get(0).expect("group 0 always present");
        let inner = &m[1];
        let replacement = format!("({inner})");
        result = format!(
            "{}{}{}",
            &result[..whole.start()],
            replacement,
            &result[whole.end()..]
        );
        modified = true;
    }

    (result, modified)
}

fn break_deep_nesting(text: &str, max_depth: i64) -> (String, bool) {
    let depth = count_nesting_depth(text);
    if depth <= max_depth {
        return (text.to_owned(), false);
    }

    let mut result = String::with_capacity(text.len());
    let mut current_depth = 0i64;
    let mut modified = false;

    for ch in text.chars() {
        match ch {
            '[' | '(' => {
                current_depth += 1;
                if current_depth > max_depth {
                    modified = true;
                    continue;
                }
            }
            ']' | ')' => {
                if current_depth > max_depth {
                    current_depth = (current_depth - 1).max(0);
                    modified = true;
                    continue;
                }
                current_depth = (current_depth - 1).max(0);
            }
            _ => {}
        }
        result.push(ch);
    }

    (result, modified)
}

fn balance_emphasis_marker(marker: &str, text: &str) -> String {
    let count = text.matches(marker).count();
    if count % 2 == 0 {
        return text.to_owned();
    }
    match text.rfind(marker) {
        Some(idx) => format!("{}{}", &text[..idx], &text[idx + marker.len()..]),
        None => text.to_owned(),
    }
}

fn fix_nested_emphasis(text: &str) -> (String, bool) {
    if !UNBALANCED_EMPHASIS_RE.is_match(text) {
        return (text.to_owned(), false);
    }

    let mut result = text.to_owned();
    for marker in ["***", "**", "*", "___", "__", "_"] {
        result = balance_emphasis_marker(marker, &result);
    }

    let modified = result != text;
    (result, modified)
}

/// Strip links, images, reference definitions, HTML tags, and deeply
/// repeated emphasis/bracket runs down to their plain-text content. Used
/// in "safe mode", where the output must not contain anything a Markdown
/// renderer could trip over.
fn strip_complex_markdown(text: &str) -> String {
    let result = IMAGE_STRIP_RE.replace_all(text, "$1");
    let result = LINK_STRIP_RE.replace_all(&result, "$1");
    let result = REFERENCE_LINK_STRIP_RE.replace_all(&result, "$1");
    let result = LINK_DEF_STRIP_RE.replace_all(&result, "");
    let result = TRIPLE_STAR_EMPHASIS_RE.replace_all(&result, "**$1**");
    let result = TRIPLE_UNDER_EMPHASIS_RE.replace_all(&result, "__$1__");
    let result = HTML_TAG_RE.replace_all(&result, "");
    let result = MULTI_OPEN_SQUARE_RE.replace_all(&result, "[");
    let result = MULTI_CLOSE_SQUARE_RE.replace_all(&result, "]");
    let result = MULTI_OPEN_PAREN_RE.replace_all(&result, "(");
    MULTI_CLOSE_PAREN_RE.replace_all(&result, ")").into_owned()
}

/// Run the sanitization pipeline over translated `text`. `target_lang`
/// drives the RTL bracket fix; `max_depth` bounds nesting (see
/// `ConfigSnapshot::markdown_max_depth`). When `safe_mode` is set, complex
/// markdown is stripped entirely and the rest of the pipeline is skipped
/// (see spec §4.3 step 1).
pub fn sanitize(
    text: &str,
    target_lang: Option<&str>,
    max_depth: usize,
    safe_mode: bool,
) -> SanitizationResult {
    if text.is_empty() {
        return SanitizationResult {
            text: String::new(),
            was_sanitized: false,
            issues_found: Vec::new(),
            depth_warning: false,
        };
    }

    let max_depth = max_depth as i64;
    let mut issues = Vec::new();
    let mut was_sanitized = false;
    let mut result = text.to_owned();

    let initial_depth = count_nesting_depth(&result);
    let depth_warning = initial_depth > max_depth;
    if depth_warning {
        issues.push(format!(
            "initial nesting depth {initial_depth} exceeds limit {max_depth}"
        ));
    }

    if safe_mode {
        result = strip_complex_markdown(&result);
        issues.push("safe mode: stripped complex markdown".to_owned());
        return SanitizationResult {
            text: result,
            was_sanitized: true,
            issues_found: issues,
            depth_warning,
        };
    }

    let is_rtl = target_lang.is_some_and(|lang| RTL_LANGS.contains(&lang));
    if is_rtl {
        let (fixed, modified) = fix_rtl_brackets(&result);
        result = fixed;
        if modified {
            issues.push("fixed RTL bracket direction".to_owned());
            was_sanitized = true;
        }
    }

    for &(open_ch, close_ch) in BRACKET_PAIRS {
        let (balanced, modified) = balance_brackets(&result, open_ch, close_ch);
        result = balanced;
        if modified {
            issues.push(format!("balanced {open_ch}{close_ch} brackets"));
            was_sanitized = true;
        }
    }

    let (broken, modified) = break_deep_nesting(&result, max_depth);
    result = broken;
    if modified {
        issues.push("reduced excessive nesting depth".to_owned());
        was_sanitized = true;
    }

    let (fixed_emphasis, modified) = fix_nested_emphasis(&result);
    result = fixed_emphasis;
    if modified {
        issues.push("fixed unbalanced emphasis markers".to_owned());
        was_sanitized = true;
    }

    SanitizationResult {
        text: result,
        was_sanitized,
        issues_found: issues,
        depth_warning,
    }
}

/// `(is_valid, actual_depth)` bracket-nesting check.
pub fn validate_depth(text: &str, max_depth: usize) -> (bool, i64) {
    let depth = count_nesting_depth(text);
    (depth <= max_depth as i64, depth)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_link_as_markdown() {
        let det = detect_markdown("see [here](https://example.com) for details");
        assert!(det.is_markdown);
        assert!(det.patterns_found.contains(&"link"));
    }

    #[test]
    fn plain_prose_is_not_markdown() {
        let det = detect_markdown("just a normal sentence with no formatting at all");
        assert!(!det.is_markdown);
    }

    #[test]
    fn balances_unmatched_opening_bracket() {
        let (out, modified) = balance_brackets("a [b c", '[', ']');
        assert!(modified);
        assert_eq!(out, "a b c");
    }

    #[test]
    fn fixes_reversed_square_brackets() {
        let (out, modified) = fix_rtl_brackets("]hello[ world");
        assert!(modified);
        assert_eq!(out, "[hello] world");
    }

    #[test]
    fn breaks_nesting_past_configured_depth() {
        let deep = "[".repeat(5) + "x" + &"]".repeat(5);
        let (out, modified) = break_deep_nesting(&deep, 2);
        assert!(modified);
        let (valid, depth) = validate_depth(&out, 2);
        assert!(valid, "depth {depth} should be <= 2");
    }

    #[test]
    fn fixes_odd_count_emphasis_markers() {
        let (out, modified) = fix_nested_emphasis("*a*b*c*");
        assert!(modified);
        assert_eq!(out.matches('*').count() % 2, 0);
    }

    #[test]
    fn sanitize_reports_rtl_fix_for_rtl_target() {
        let result = sanitize("]text[", Some("ar"), 10, false);
        assert!(result.was_sanitized);
        assert!(result.issues_found.iter().any(|i| i.contains("RTL")));
        assert_eq!(result.text, "[text]");
    }

    #[test]
    fn sanitize_is_noop_on_clean_text() {
        let result = sanitize("Hello, world.", Some("en"), 10, false);
        assert!(!result.was_sanitized);
        assert_eq!(result.text, "Hello, world.");
    }

    #[test]
    fn strip_complex_markdown_flattens_links_and_images() {
        let out = strip_complex_markdown("see ![alt](img.png) and [here](https://example.com)");
        assert_eq!(out, "see alt and here");
    }

    #[test]
    fn strip_complex_markdown_drops_link_definitions_and_html() {
        let out = strip_complex_markdown("[ref]: https://example.com\n<b>bold</b> text");
        assert_eq!(out, "\nbold text");
    }

    #[test]
    fn strip_complex_markdown_collapses_repeated_brackets() {
        let out = strip_complex_markdown("[[[nested]]] ((deep))");
        assert_eq!(out, "[nested] (deep)");
    }

    #[test]
    fn sanitize_safe_mode_strips_instead_of_balancing() {
        let result = sanitize("see [here](https://example.com) and ]text[", Some("ar"), 10, true);
        assert!(result.was_sanitized);
        assert!(result.issues_found.iter().any(|i| i.contains("safe mode")));
        assert_eq!(result.text, "see here and ]text[");
    }
}
