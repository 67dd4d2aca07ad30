//! HTTP route handlers, grouped the way the underlying services are: core
//! translation, observability, language metadata, and model discovery.

pub mod discovery;
pub mod language;
pub mod observability;
pub mod translation;
