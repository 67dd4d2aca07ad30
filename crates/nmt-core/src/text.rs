//! Noise detection, sentence splitting, chunk packing, and translation
//! artifact stripping. See spec §4.1.

use std::sync::LazyLock;

use regex::Regex;

static SENT_BOUNDARY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([.!?\u{2026}]+)(\s+)").expect("valid sentence boundary regex"));
static WORD_SPLIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(,|;|:|\s+)").expect("valid word split regex"));
static EXTRA_WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s{3,}").expect("valid whitespace collapse regex"));

/// Remove code points below `0x20` except tab, newline, and carriage return.
pub fn strip_control(s: &str) -> String {
    s.chars()
        .filter(|&ch| ch == '\t' || ch == '\n' || ch == '\r' || (ch as u32) >= 0x20)
        .collect()
}

/// True if `s`, after control-stripping and trimming, looks like noise:
/// too short, no non-space characters, no alphanumerics, or an
/// alphanumeric ratio below the configured minimum.
pub fn is_noise(s: &str, min_chars: usize, min_alnum_ratio: f64) -> bool {
    let cleaned = strip_control(s);
    let trimmed = cleaned.trim();

    if trimmed.chars().count() < min_chars {
        return true;
    }

    let non_space: Vec<char> = trimmed.chars().filter(|c| !c.is_whitespace()).collect();
    if non_space.is_empty() {
        return true;
    }

    let alnum = non_space.iter().filter(|c| c.is_alphanumeric()).count();
    if alnum == 0 {
        return true;
    }

    let ratio = alnum as f64 / non_space.len().max(1) as f64;
    ratio < min_alnum_ratio
}

/// Split `text` into sentences, enforcing `max_sentence_chars` by further
/// splitting at word boundaries when a sentence runs long.
pub fn split_sentences(text: &str, max_sentence_chars: usize) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }

    let cleaned = strip_control(text);
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return Vec::new();
    }

    let mut parts: Vec<String> = Vec::new();
    let mut last = 0usize;

    for m in SENT_BOUNDARY_RE.find_iter(cleaned) {
        let end = m.end();
        parts.push(cleaned[last..end].trim().to_owned());
        last = end;
    }
    if last < cleaned.len() {
        parts.push(cleaned[last..].trim().to_owned());
    }
    if parts.is_empty() {
        parts.push(cleaned.to_owned());
    }

    let mut enforced = Vec::with_capacity(parts.len());
    for p in parts {
        if p.chars().count() <= max_sentence_chars {
            enforced.push(p);
            continue;
        }

        let mut buffer = String::new();
        let mut cur_len = 0usize;

        for tok in WORD_SPLIT_RE.split(&p) {
            if tok.is_empty() {
                continue;
            }
            let tok_len = tok.chars().count();

            if cur_len + tok_len > max_sentence_chars && !buffer.is_empty() {
                enforced.push(buffer.trim().to_owned());
                buffer = tok.to_owned();
                cur_len = tok_len;
            } else {
                buffer.push_str(tok);
                cur_len += tok_len;
            }
        }
        if !buffer.is_empty() {
            enforced.push(buffer.trim().to_owned());
        }
    }

    enforced.into_iter().filter(|s| !s.is_empty()).collect()
}

/// Greedily pack `sentences` into chunks of at most `max_chars`, preserving
/// order and joining with `join_with`.
pub fn chunk_sentences(sentences: &[String], max_chars: usize, join_with: &str) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut cur: Vec<&str> = Vec::new();
    let mut cur_len = 0usize;

    for s in sentences {
        let add_len = if cur.is_empty() {
            s.chars().count()
        } else {
            join_with.chars().count() + s.chars().count()
        };

        if !cur.is_empty() && cur_len + add_len > max_chars {
            chunks.push(cur.join(join_with));
            cur = vec![s.as_str()];
            cur_len = s.chars().count();
        } else {
            cur.push(s.as_str());
            cur_len += add_len;
        }
    }
    if !cur.is_empty() {
        chunks.push(cur.join(join_with));
    }

    chunks
}

fn is_symbol_char(ch: char) -> bool {
    if ch.is_whitespace() || ch.is_alphanumeric() {
        return false;
    }
    unicode_category_is_p_or_s(ch)
}

/// Approximate Unicode general category P*/S* test without pulling in a
/// full Unicode properties crate: punctuation and symbol code points are
/// exactly the non-alphanumeric, non-whitespace, non-control characters
/// that `char::is_ascii_punctuation` (for ASCII) or a broader printable
/// check (for non-ASCII) would flag. Digits and letters are excluded by
/// the caller before this is reached.
fn unicode_category_is_p_or_s(ch: char) -> bool {
    !ch.is_control()
}

/// Remove runs (length >= 2) of an identical symbol character from `out`
/// when that symbol does not appear anywhere in `src`, collapsing any
/// resulting excess whitespace. Guards against translator artifacts like
/// repeated punctuation or emoji spam. Idempotent: applying it twice
/// yields the same result as applying it once.
pub fn remove_new_repeats(src: &str, out: &str) -> String {
    if out.is_empty() {
        return out.to_owned();
    }

    let allowed: std::collections::HashSet<char> =
        src.chars().filter(|&c| is_symbol_char(c)).collect();

    let chars: Vec<char> = out.chars().collect();
    let n = chars.len();
    let mut buf = String::with_capacity(out.len());
    let mut i = 0usize;

    while i < n {
        let ch = chars[i];
        let mut j = i + 1;
        while j < n && chars[j] == ch {
            j += 1;
        }
        let run_len = j - i;

        if run_len >= 2 && is_symbol_char(ch) && !allowed.contains(&ch) {
            // drop the whole run
        } else {
            buf.extend(chars[i..j].iter());
        }
        i = j;
    }

    EXTRA_WHITESPACE_RE.replace_all(&buf, "  ").into_owned()
}
