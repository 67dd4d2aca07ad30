//! Source-language identification. See spec: "Language detection (opaque
//! `LanguageDetector.detect(text) -> code|UND`)".
//!
//! A statistically-trained n-gram identifier is out of scope for this
//! crate (no such crate is in the dependency stack); [`ScriptHeuristicDetector`]
//! is a best-effort stand-in good enough for source-language auto-detect
//! on non-noise input, and the [`LanguageDetector`] trait is the seam a
//! deployment can swap a stronger implementation behind.

use std::collections::HashMap;
use std::sync::LazyLock;

use crate::text::is_noise;

/// Identifies the language of a piece of text, or reports that it could
/// not be determined.
pub trait LanguageDetector: Send + Sync {
    /// Detect the language of `text`, returning an ISO 639-1-ish code or
    /// `undetermined_code` when detection fails or the input is noise.
    fn detect(&self, text: &str, min_chars: usize, min_alnum_ratio: f64, undetermined_code: &str) -> String;

    fn detect_batch(
        &self,
        texts: &[String],
        min_chars: usize,
        min_alnum_ratio: f64,
        undetermined_code: &str,
    ) -> Vec<String> {
        texts
            .iter()
            .map(|t| self.detect(t, min_chars, min_alnum_ratio, undetermined_code))
            .collect()
    }
}

/// Non-overlapping Unicode script ranges mapped to the language most
/// often written in them. Scripts shared by many languages (Latin,
/// Cyrillic) fall through to the stopword scorer instead.
const SCRIPT_RANGES: &[(char, char, &str)] = &[
    ('\u{0370}', '\u{03FF}', "el"),
    ('\u{0590}', '\u{05FF}', "he"),
    ('\u{0600}', '\u{06FF}', "ar"),
    ('\u{0900}', '\u{097F}', "hi"),
    ('\u{0E00}', '\u{0E7F}', "th"),
    ('\u{3040}', '\u{30FF}', "ja"),
    ('\u{31F0}', '\u{31FF}', "ja"),
    ('\u{AC00}', '\u{D7A3}', "ko"),
    ('\u{4E00}', '\u{9FFF}', "zh"),
];

/// Short, high-frequency function words per language, used to break ties
/// among scripts (Latin, Cyrillic) that many languages share.
static STOPWORDS: LazyLock<Vec<(&'static str, &'static [&'static str])>> = LazyLock::new(|| {
    vec![
        ("en", &["the", "and", "is", "are", "of", "to", "in", "that", "it", "for"]),
        ("fr", &["le", "la", "les", "et", "de", "des", "est", "une", "un", "que"]),
        ("de", &["der", "die", "das", "und", "ist", "ein", "eine", "nicht", "mit", "zu"]),
        ("es", &["el", "la", "los", "las", "de", "es", "un", "una", "que", "para"]),
        ("it", &["il", "lo", "la", "di", "che", "un", "una", "per", "non", "sono"]),
        ("pt", &["o", "a", "os", "as", "de", "que", "um", "uma", "para", "não"]),
        ("nl", &["de", "het", "een", "van", "is", "dat", "niet", "en", "te", "op"]),
        ("ru", &["и", "в", "не", "на", "что", "с", "как", "это", "по", "его"]),
        ("uk", &["і", "в", "не", "на", "що", "з", "як", "це", "та", "до"]),
        ("pl", &["i", "w", "nie", "na", "że", "z", "do", "to", "się", "jest"]),
    ]
});

/// Best-effort detector: scores writing system directly for exclusive
/// scripts, otherwise scores stopword overlap across the Latin/Cyrillic
/// language set.
#[derive(Debug, Default)]
pub struct ScriptHeuristicDetector;

impl ScriptHeuristicDetector {
    pub fn new() -> Self {
        Self
    }

    fn detect_script(text: &str) -> Option<&'static str> {
        let mut counts: HashMap<&'static str, usize> = HashMap::new();
        for ch in text.chars() {
            for &(lo, hi, lang) in SCRIPT_RANGES {
                if ch >= lo && ch <= hi {
                    *counts.entry(lang).or_insert(0) += 1;
                }
            }
        }
        counts.into_iter().max_by_key(|&(_, n)| n).map(|(l, _)| l)
    }

    fn detect_by_stopwords(text: &str) -> Option<&'static str> {
        let lower = text.to_lowercase();
        let words: Vec<&str> = lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();
        if words.is_empty() {
            return None;
        }

        let mut best: Option<(&'static str, usize)> = None;
        for &(lang, list) in STOPWORDS.iter() {
            let hits = words.iter().filter(|w| list.contains(w)).count();
            if hits == 0 {
                continue;
            }
            if best.map(|(_, b)| hits > b).unwrap_or(true) {
                best = Some((lang, hits));
            }
        }
        best.map(|(lang, _)| lang)
    }
}

impl LanguageDetector for ScriptHeuristicDetector {
    fn detect(&self, text: &str, min_chars: usize, min_alnum_ratio: f64, undetermined_code: &str) -> String {
        if is_noise(text, min_chars, min_alnum_ratio) {
            return undetermined_code.to_owned();
        }

        if let Some(lang) = Self::detect_script(text) {
            return lang.to_owned();
        }
        if let Some(lang) = Self::detect_by_stopwords(text) {
            return lang.to_owned();
        }
        "en".to_owned()
    }
}
