use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{
    common::{errors::ApiError, readable},
    server::AppState,
};

/// One row of `GET /scores`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreRow {
    pub name: Option<String>,
    pub score: u64,
    pub listening: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReadableQuery {
    pub seconds: Option<String>,
}

/// GET /
pub async fn index() -> &'static str {
    "This is not the endpoint you are looking for."
}

/// GET /scores
pub async fn list_scores(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match score_rows(&state).await {
        Ok(rows) => (StatusCode::OK, Json(rows)).into_response(),
        Err(e) => {
            warn!("GET /scores failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiError::service_unavailable(e.to_string(), "/scores")),
            )
                .into_response()
        }
    }
}

async fn score_rows(state: &AppState) -> Result<Vec<ScoreRow>, crate::ledger::StoreError> {
    let mut rows = Vec::new();
    for entry in state.ledger.top_n(usize::MAX).await? {
        rows.push(ScoreRow {
            name: state.ledger.display_name(entry.member).await?,
            score: entry.score,
            listening: state.registry.is_active(entry.member),
        });
    }
    Ok(rows)
}

/// GET /readable?seconds=N
pub async fn readable_duration(Query(params): Query<ReadableQuery>) -> String {
    let seconds = params
        .seconds
        .filter(|s| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(0);
    readable(seconds)
}
