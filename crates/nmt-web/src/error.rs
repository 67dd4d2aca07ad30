//! Maps [`NmtError`] onto HTTP responses. See spec §4.9/§7.

use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use nmt_core::NmtError;
use serde::Serialize;

use crate::models::{BusyErrorBody, ErrorBody};

/// Wraps [`NmtError`] so this crate can give it a foreign-local
/// [`IntoResponse`] impl without violating the orphan rule.
pub struct ApiError {
    pub source: NmtError,
    pub retry_after_sec: u64,
}

impl ApiError {
    pub fn new(source: NmtError, retry_after_sec: u64) -> Self {
        Self {
            source,
            retry_after_sec,
        }
    }
}

#[derive(Debug, Serialize)]
struct UnsupportedPairBody {
    error: &'static str,
    src: String,
    tgt: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self.source {
            NmtError::UnsupportedLanguagePair { src, tgt } => (
                StatusCode::BAD_REQUEST,
                Json(UnsupportedPairBody {
                    error: "Unsupported language pair",
                    src,
                    tgt,
                }),
            )
                .into_response(),

            NmtError::QueueOverflow { .. } => with_retry_after(
                StatusCode::TOO_MANY_REQUESTS,
                BusyErrorBody {
                    message: "Too many requests; queue full".to_owned(),
                    retry_after_sec: self.retry_after_sec,
                },
                self.retry_after_sec,
            ),

            NmtError::ServiceBusy => with_retry_after(
                StatusCode::SERVICE_UNAVAILABLE,
                BusyErrorBody {
                    message: "Service busy; no translation slot available".to_owned(),
                    retry_after_sec: self.retry_after_sec,
                },
                self.retry_after_sec,
            ),

            NmtError::TranslationTimeout => with_retry_after(
                StatusCode::SERVICE_UNAVAILABLE,
                BusyErrorBody {
                    message: "Translation timed out".to_owned(),
                    retry_after_sec: self.retry_after_sec,
                },
                self.retry_after_sec,
            ),

            NmtError::OutOfMemory { .. } => with_retry_after(
                StatusCode::SERVICE_UNAVAILABLE,
                BusyErrorBody {
                    message: "Service busy; memory pressure".to_owned(),
                    retry_after_sec: self.retry_after_sec,
                },
                self.retry_after_sec,
            ),

            NmtError::ModelLoadError { pair, cause } => {
                tracing::error!(pair = %pair, cause = %cause, "model load failure surfaced to handler");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorBody {
                        message: "Failed to load translation model".to_owned(),
                    }),
                )
                    .into_response()
            }

            other => {
                tracing::error!(error = %other, "unhandled error reached request handler");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorBody {
                        message: "Internal server error".to_owned(),
                    }),
                )
                    .into_response()
            }
        }
    }
}

fn with_retry_after<T: Serialize>(status: StatusCode, body: T, retry_after_sec: u64) -> Response {
    let mut resp = (status, Json(body)).into_response();
    if let Ok(value) = HeaderValue::from_str(&retry_after_sec.to_string()) {
        resp.headers_mut().insert("Retry-After", value);
    }
    resp
}
