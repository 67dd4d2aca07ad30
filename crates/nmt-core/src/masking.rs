//! Hide punctuation/symbol/digit/emoji runs from the translator and restore
//! them afterwards. See spec §4.2.

use std::sync::LazyLock;

use regex::Regex;

const MASK_PREFIX: &str = "\u{27ea}MSK";
const MASK_SUFFIX: &str = "\u{27eb}";

/// Contiguous Unicode code point ranges treated as emoji, plus the
/// catch-all "Symbol, other" general category.
const EMOJI_RANGES: &[(u32, u32)] = &[
    (0x1F300, 0x1FAFF),
    (0x1F600, 0x1F64F),
    (0x1F680, 0x1F6FF),
    (0x2600, 0x26FF),
    (0x2700, 0x27BF),
    (0x1F900, 0x1F9FF),
];

fn is_emoji_char(ch: char) -> bool {
    let cp = ch as u32;
    EMOJI_RANGES.iter().any(|&(a, b)| cp >= a && cp <= b)
}

/// The original segments masked out of a single text, indexed by the
/// position embedded in each `⟪MSKk⟫` token.
pub type MaskingLog = Vec<String>;

/// Toggles controlling which character classes [`mask`] treats as
/// maskable. Mirrors `ConfigSnapshot`'s `mask_digits`/`mask_punct`/
/// `mask_emoji`/`symbol_masking` fields.
#[derive(Debug, Clone, Copy)]
pub struct MaskOptions {
    pub enabled: bool,
    pub mask_digits: bool,
    pub mask_punct: bool,
    pub mask_emoji: bool,
}

fn is_maskable_char(ch: char, opts: MaskOptions) -> bool {
    if opts.mask_digits && ch.is_numeric() {
        return true;
    }
    if opts.mask_punct && (ch.is_ascii_punctuation() || is_non_ascii_symbolish(ch)) {
        return true;
    }
    if opts.mask_emoji && is_emoji_char(ch) {
        return true;
    }
    false
}

/// Non-ASCII punctuation/symbol approximation (no full Unicode properties
/// table in the dependency stack): any non-alphanumeric, non-whitespace,
/// non-control, non-emoji character qualifies.
fn is_non_ascii_symbolish(ch: char) -> bool {
    !ch.is_ascii()
        && !ch.is_whitespace()
        && !ch.is_control()
        && !ch.is_alphanumeric()
        && !is_emoji_char(ch)
}

/// Replace each maximal run of maskable characters in `text` with a
/// `⟪MSKk⟫` sentinel, returning the masked text and the log of originals
/// needed to restore it. Identity when masking is disabled.
pub fn mask(text: &str, opts: MaskOptions) -> (String, MaskingLog) {
    if !opts.enabled || text.is_empty() {
        return (text.to_owned(), Vec::new());
    }

    let mut originals = MaskingLog::new();
    let mut out = String::with_capacity(text.len());
    let chars: Vec<char> = text.chars().collect();
    let n = chars.len();
    let mut i = 0usize;

    while i < n {
        let ch = chars[i];
        if is_maskable_char(ch, opts) {
            let mut j = i + 1;
            while j < n && is_maskable_char(chars[j], opts) {
                j += 1;
            }
            let seg: String = chars[i..j].iter().collect();
            let idx = originals.len();
            originals.push(seg);
            out.push_str(MASK_PREFIX);
            out.push_str(&idx.to_string());
            out.push_str(MASK_SUFFIX);
            i = j;
        } else {
            out.push(ch);
            i += 1;
        }
    }

    (out, originals)
}

static QUOTED_VARIANT_RE_TEMPLATES: &[(&str, &str)] = &[
    ("\"", "\""),
    ("'", "'"),
    ("\u{ab}", "\u{bb}"),
    ("\u{27ea}", "\u{27eb}"),
    ("[", "]"),
    ("(", ")"),
];

/// Restore mask tokens in `text` using the originals in `log`, in order.
/// Identity when masking is disabled or the log is empty.
///
/// Restoration proceeds in four tiers per index, from most to least
/// exact (spec §4.2):
/// 1. Exact-match `⟪MSKk⟫`.
/// 2. A quoted/bracketed variant (one of `" ' « » ⟪ [ (`), case-insensitive
///    `MSK`, optional internal whitespace.
/// 3. A bare variant: case-insensitive `MSK` with optional whitespace
///    before `k`, guarded so `MSK1` never steals the match for `MSK12`.
/// 4. Left unrestored (best effort).
pub fn unmask(text: &str, log: &MaskingLog, opts: MaskOptions) -> String {
    if !opts.enabled || log.is_empty() || text.is_empty() {
        return text.to_owned();
    }

    let mut out = text.to_owned();

    for (idx, orig) in log.iter().enumerate() {
        let exact_token = format!("{MASK_PREFIX}{idx}{MASK_SUFFIX}");
        if let Some(pos) = out.find(&exact_token) {
            out.replace_range(pos..pos + exact_token.len(), orig);
            continue;
        }

        if let Some((start, end)) = find_quoted_variant(&out, idx) {
            out.replace_range(start..end, orig);
            continue;
        }

        if let Some((start, end)) = find_bare_variant(&out, idx) {
            out.replace_range(start..end, orig);
            continue;
        }

        // leave unrestored
    }

    out
}

fn find_quoted_variant(haystack: &str, idx: usize) -> Option<(usize, usize)> {
    for (open, close) in QUOTED_VARIANT_RE_TEMPLATES {
        let pattern = format!(
            r"(?i){}\s*MSK\s*{}\s*{}",
            regex::escape(open),
            idx,
            regex::escape(close)
        );
        if let Ok(re) = Regex::new(&pattern) {
            if let Some(m) = re.find(haystack) {
                return Some((m.start(), m.end()));
            }
        }
    }
    None
}

fn find_bare_variant(haystack: &str, idx: usize) -> Option<(usize, usize)> {
    static CACHE: LazyLock<std::sync::Mutex<std::collections::HashMap<usize, Regex>>> =
        LazyLock::new(|| std::sync::Mutex::new(std::collections::HashMap::new()));

    let mut cache = CACHE.lock().expect("bare-variant regex cache poisoned");
    let re = cache.entry(idx).or_insert_with(|| {
        let pattern = format!(r"(?i)MSK\s*{idx}(?!\d)");
        Regex::new(&pattern).expect("valid bare-variant regex")
    });

    re.find(haystack).map(|m| (m.start(), m.end()))
}
