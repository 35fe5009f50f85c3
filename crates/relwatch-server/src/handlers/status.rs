//! Liveness probe.

use axum::Json;
use relwatch_core::config::AppConfig;
use serde_json::{json, Value};

pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": AppConfig::VERSION,
    }))
}
