//! Request and response payloads for the HTTP API.
//!
//! Shapes mirror the recognized request/response entities from the data
//! model this service exposes: translation, language detection, and
//! observability. Field names are `snake_case` to match the wire format
//! external clients already depend on.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Either a single string or a list of strings. `POST /translate` and the
/// language-detection endpoints both accept this shape.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TextOrList {
    One(String),
    Many(Vec<String>),
}

impl TextOrList {
    /// Normalize to a flat list. Non-string items are not representable in
    /// this enum's deserialization, so there is nothing to coerce to `""`
    /// here (unlike the dynamically-typed original); the shape itself rules
    /// that case out.
    pub fn into_vec(self) -> Vec<String> {
        match self {
            TextOrList::One(s) => vec![s],
            TextOrList::Many(v) => v,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TranslatePostBody {
    pub text: TextOrList,
    pub target_lang: String,
    #[serde(default)]
    pub source_lang: String,
    #[serde(default = "default_beam_size")]
    pub beam_size: u32,
    #[serde(default = "default_true")]
    pub perform_sentence_splitting: bool,
}

fn default_beam_size() -> u32 {
    5
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize)]
pub struct TranslationMetadata {
    pub model_name: String,
    pub model_family: String,
    pub languages_used: Vec<String>,
    pub chunks_processed: usize,
    pub chunk_size: usize,
    pub auto_chunked: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct TranslatePostResponse {
    pub target_lang: String,
    pub source_lang: String,
    pub detected_langs: Option<Vec<String>>,
    pub translated: Vec<String>,
    pub translation_time: f64,
    pub pivot_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<TranslationMetadata>,
}

/// GET `/translate` query parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct TranslateGetQuery {
    pub text: String,
    pub target_lang: String,
    #[serde(default)]
    pub source_lang: String,
    #[serde(default = "default_beam_size")]
    pub beam_size: u32,
    #[serde(default = "default_true")]
    pub perform_sentence_splitting: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct TranslateResponse {
    pub translations: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pivot_path: Option<String>,
}

/// `Too many requests`/`Service busy` error body, shared by the 429 and
/// 503 responses.
#[derive(Debug, Clone, Serialize)]
pub struct BusyErrorBody {
    pub message: String,
    pub retry_after_sec: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LanguageDetectionPostBody {
    pub text: LanguageDetectionPayload,
}

/// Language detection accepts a string, a list, or a mapping of key to
/// text (batch detection keyed by caller-chosen IDs).
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum LanguageDetectionPayload {
    One(String),
    Many(Vec<String>),
    Keyed(HashMap<String, String>),
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum LanguageDetectionPostResponse {
    Single { language: String },
    Batch { languages: Vec<String> },
    Keyed(HashMap<String, String>),
}

#[derive(Debug, Clone, Serialize)]
pub struct LanguageDetectionResponse {
    pub language: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LanguageDetectionGetQuery {
    pub text: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LanguagePairsQuery {
    pub source_lang: Option<String>,
    pub target_lang: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LanguagePairsResponse {
    pub language_pairs: Vec<[String; 2]>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LanguagesResponse {
    pub languages: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReadinessResponse {
    pub status: &'static str,
    pub device: String,
    pub queue_enabled: bool,
    pub max_inflight: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct CacheStatusResponse {
    pub capacity: usize,
    pub size: usize,
    pub keys: Vec<String>,
    pub device: String,
    pub inflight: usize,
    pub queue_enabled: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoggingInfo {
    pub log_level: String,
    pub log_to_file: bool,
    pub log_file_path: Option<String>,
    pub log_format: String,
    pub request_log: bool,
    pub log_include_text: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelInfoResponse {
    pub model_name: String,
    pub device: String,
    pub easynmt_model: String,
    pub batch_size: usize,
    pub max_text_len: Option<u32>,
    pub max_beam_size: Option<u32>,
    pub workers: HashMap<String, usize>,
    pub input_sanitize: bool,
    pub input_sanitize_min_alnum_ratio: f64,
    pub input_sanitize_min_chars: usize,
    pub undetermined_lang_code: String,
    pub align_responses: bool,
    pub sanitize_placeholder: String,
    pub sentence_splitting_default: bool,
    pub max_sentence_chars: usize,
    pub max_chunk_chars: usize,
    pub join_sentences_with: String,
    pub pivot_fallback: bool,
    pub pivot_lang: String,
    pub logging: LoggingInfo,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelDiscoveryResponse {
    pub model_family: String,
    pub language_pairs: Vec<[String; 2]>,
    pub pair_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct FamilyDiscovery {
    pub language_pairs: Vec<[String; 2]>,
    pub pair_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct AllModelsDiscoveryResponse {
    pub models: HashMap<String, FamilyDiscovery>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusMessageResponse {
    pub status: &'static str,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_or_list_normalizes_single_string() {
        let body: TranslatePostBody = serde_json::from_str(
            r#"{"text": "hello", "target_lang": "de"}"#,
        )
        .unwrap();
        assert_eq!(body.text.into_vec(), vec!["hello".to_owned()]);
        assert_eq!(body.beam_size, 5);
        assert!(body.perform_sentence_splitting);
    }

    #[test]
    fn text_or_list_normalizes_array() {
        let body: TranslatePostBody = serde_json::from_str(
            r#"{"text": ["a", "b"], "target_lang": "de", "source_lang": "en"}"#,
        )
        .unwrap();
        assert_eq!(body.text.into_vec(), vec!["a".to_owned(), "b".to_owned()]);
    }

    #[test]
    fn language_detection_payload_accepts_keyed_map() {
        let body: LanguageDetectionPostBody = serde_json::from_str(
            r#"{"text": {"a": "bonjour", "b": "hello"}}"#,
        )
        .unwrap();
        match body.text {
            LanguageDetectionPayload::Keyed(map) => assert_eq!(map.len(), 2),
            _ => panic!("expected keyed variant"),
        }
    }
}
