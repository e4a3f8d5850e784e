//! Route handlers.

use axum::{
    Form,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, Uri, header},
    response::{Html, IntoResponse, Response},
};
use serde::Serialize;

use crate::error::{AppError, Result};
use crate::pipeline::{Query, dispatch};
use crate::services::SlashCommand;

use super::AppState;
use super::pages;

/// Response encoding chosen from the `Accept` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// `application/json`, compact
    Json,
    /// Indented JSON as plain text
    Text,
}

impl Format {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let wants_json = headers
            .get_all(header::ACCEPT)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .any(|value| value.contains("application/json"));
        if wants_json { Self::Json } else { Self::Text }
    }
}

/// Serialize `value` in the requested format.
pub fn render<T: Serialize>(format: Format, value: &T) -> Result<Response> {
    let response = match format {
        Format::Json => (
            [(header::CONTENT_TYPE, "application/json")],
            serde_json::to_string(value)?,
        )
            .into_response(),
        Format::Text => (
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            serde_json::to_string_pretty(value)?,
        )
            .into_response(),
    };
    Ok(response)
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() && !matches!(self, AppError::EmptyCollection) {
            log::error!("Request failed: {self}");
        }
        (status, self.to_string()).into_response()
    }
}

async fn answer(state: &AppState, headers: &HeaderMap, query: Query) -> Result<Response> {
    let modules = state
        .scheduler
        .snapshot()
        .await
        .ok_or(AppError::EmptyCollection)?;
    let result = dispatch(&modules, &query)?;
    render(Format::from_headers(headers), &result)
}

pub async fn all(State(state): State<AppState>, headers: HeaderMap) -> Result<Response> {
    answer(&state, &headers, Query::All).await
}

pub async fn latest(State(state): State<AppState>, headers: HeaderMap) -> Result<Response> {
    answer(&state, &headers, Query::Latest).await
}

pub async fn tags(State(state): State<AppState>, headers: HeaderMap) -> Result<Response> {
    answer(&state, &headers, Query::Tags).await
}

pub async fn by_tag(
    State(state): State<AppState>,
    Path(tag): Path<String>,
    headers: HeaderMap,
) -> Result<Response> {
    answer(&state, &headers, Query::ByTag(tag)).await
}

/// Send image requests to the same path on the source site.
pub async fn image_redirect(State(state): State<AppState>, uri: Uri) -> Response {
    let path = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| uri.path());
    let location = format!("{}{}", state.source_base.trim_end_matches('/'), path);
    (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
}

pub async fn slack_landing(State(state): State<AppState>) -> Html<String> {
    Html(pages::landing(&state.slack_client_id))
}

pub async fn slack_command(
    State(state): State<AppState>,
    Form(command): Form<SlashCommand>,
) -> &'static str {
    state.bridge.handle(command)
}

pub async fn slack_oauth() -> Html<&'static str> {
    Html(pages::INSTALLED)
}
