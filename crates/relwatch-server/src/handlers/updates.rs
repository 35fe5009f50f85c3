//! `/api/updates/*` handlers.

use crate::server::AppState;
use crate::wrapper::{success, success_with, to_data, ApiError};
use axum::extract::{Path, RawQuery, State};
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

/// Message returned when the libraries query names nothing.
pub const NO_LIBRARIES: &str = "No libraries specified";

type ApiResult = Result<Json<Value>, ApiError>;

/// `GET /api/updates/languages`
pub async fn language_updates(State(state): State<Arc<AppState>>) -> ApiResult {
    let snapshot = state.service.language_updates().await;
    Ok(Json(success_with(
        to_data(&snapshot.data)?,
        [("cached_at", to_data(&snapshot.cached_at)?)],
    )))
}

/// `GET /api/updates/libraries?libraries[]=a&libraries[]=b`
pub async fn library_updates(
    State(state): State<Arc<AppState>>,
    RawQuery(query): RawQuery,
) -> ApiResult {
    let names = library_names(query.as_deref().unwrap_or_default());
    if names.is_empty() {
        return Err(ApiError::bad_request(NO_LIBRARIES));
    }
    debug!("Library lookup for {:?}", names);
    Ok(Json(success(to_data(&state.service.library_updates(&names))?)))
}

/// `GET /api/updates/package/:package`
pub async fn package_updates(
    State(state): State<Arc<AppState>>,
    Path(package): Path<String>,
) -> ApiResult {
    let updates = state.service.package_updates(&package).await;
    let data = json!({
        "npm": to_data(&updates.npm)?,
        "packagist": to_data(&updates.packagist)?,
        "pypi": to_data(&updates.pypi)?,
    });
    Ok(Json(success_with(data, [("package", Value::String(package))])))
}

/// `GET /api/updates/github/:owner/:repo`
///
/// 404 when GitHub answered with an error status, 500 when it could not be
/// reached at all.
pub async fn github_release(
    State(state): State<Arc<AppState>>,
    Path((owner, repo)): Path<(String, String)>,
) -> ApiResult {
    let release = state.service.github_release(&owner, &repo).await;
    if release.is_success() {
        return Ok(Json(success(to_data(&release)?)));
    }

    let message = release.error.clone().unwrap_or_default();
    Err(match release.status_code {
        Some(code) => {
            ApiError::new(StatusCode::NOT_FOUND, message).with_field("status_code", json!(code))
        }
        None => ApiError::internal(message),
    })
}

/// Library names from a raw query string.
///
/// Accepts `libraries[]=a`, indexed `libraries[0]=a` and plain `libraries=a`;
/// blank and repeated names are dropped.
pub fn library_names(query: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        let is_library = key == "libraries"
            || (key.starts_with("libraries[") && key.ends_with(']'));
        let value = value.trim();
        if is_library && !value.is_empty() && !names.iter().any(|n| n == value) {
            names.push(value.to_string());
        }
    }
    names
}
