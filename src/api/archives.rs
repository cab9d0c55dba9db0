//! Archive creation and read-only archive views.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use super::error::ApiJson;
use super::{ApiResult, AppState};
use crate::archiver::{self, ArchiveOutcome};
use crate::error::parse_id;
use crate::models::{Archive, Transaction};

#[derive(Debug, Deserialize)]
pub struct CreateArchiveRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/archives", get(list).post(create))
        .route("/archives/:id", get(show))
        .route("/archives/:id/transactions", get(transactions))
}

/// POST /api/archives
///
/// The response has the same shape whether or not anyone had a share; an
/// archive of unassigned transactions simply has no person totals.
async fn create(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CreateArchiveRequest>,
) -> ApiResult<(StatusCode, Json<ArchiveOutcome>)> {
    let outcome = state
        .run(move |conn| archiver::create_archive(conn, &req.name, req.description.as_deref()))
        .await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

/// GET /api/archives
async fn list(State(state): State<AppState>) -> ApiResult<Json<Vec<Archive>>> {
    let rows = state.run(|conn| archiver::list_archives(conn)).await?;
    Ok(Json(rows))
}

/// GET /api/archives/:id
async fn show(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<ArchiveOutcome>> {
    let id = parse_id(&id, "archive")?;
    let details = state.run(move |conn| archiver::archive_details(conn, &id)).await?;
    Ok(Json(details))
}

/// GET /api/archives/:id/transactions
async fn transactions(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<Transaction>>> {
    let id = parse_id(&id, "archive")?;
    let rows = state
        .run(move |conn| archiver::archived_transactions(conn, &id))
        .await?;
    Ok(Json(rows))
}
