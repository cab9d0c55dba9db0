//! Active ledger endpoints and on-demand totals.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::error::ApiJson;
use super::{ApiResult, AppState};
use crate::error::parse_id;
use crate::importer::{self, ImportResult, IngestRecord};
use crate::ledger;
use crate::models::{NewTransaction, PersonTotal, Transaction};
use crate::splits;

#[derive(Debug, Deserialize)]
pub struct AssignRequest {
    pub assigned_to: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct CategoryRequest {
    #[serde(default)]
    pub category_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ImportRequest {
    #[serde(default)]
    pub file_name: Option<String>,
    pub records: Vec<IngestRecord>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/transactions",
            get(list_active).post(create).delete(clear_active),
        )
        .route("/transactions/import", post(import))
        .route("/transactions/:id", delete(delete_one))
        .route("/transactions/:id/assign", put(assign))
        .route("/transactions/:id/category", put(set_category))
        .route("/totals", get(totals))
}

/// GET /api/transactions
async fn list_active(State(state): State<AppState>) -> ApiResult<Json<Vec<Transaction>>> {
    let rows = state.run(|conn| ledger::list_active(conn)).await?;
    Ok(Json(rows))
}

/// POST /api/transactions
async fn create(
    State(state): State<AppState>,
    ApiJson(mut new): ApiJson<NewTransaction>,
) -> ApiResult<(StatusCode, Json<Transaction>)> {
    new.category_id = new
        .category_id
        .as_deref()
        .map(|c| parse_id(c, "category"))
        .transpose()?;
    let txn = state.run(move |conn| ledger::create_transaction(conn, &new)).await?;
    Ok((StatusCode::CREATED, Json(txn)))
}

/// DELETE /api/transactions
async fn clear_active(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let deleted = state.run(|conn| ledger::clear_active(conn)).await?;
    Ok(Json(json!({ "deleted": deleted })))
}

/// POST /api/transactions/import
async fn import(
    State(state): State<AppState>,
    ApiJson(mut req): ApiJson<ImportRequest>,
) -> ApiResult<Json<ImportResult>> {
    for record in &mut req.records {
        record.category_id = record
            .category_id
            .as_deref()
            .map(|c| parse_id(c, "category"))
            .transpose()?;
    }
    let result = state
        .run(move |conn| importer::ingest(conn, req.file_name.as_deref(), None, &req.records))
        .await?;
    Ok(Json(result))
}

/// DELETE /api/transactions/:id
async fn delete_one(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Value>> {
    let id = parse_id(&id, "transaction")?;
    let deleted = state.run(move |conn| ledger::delete_transaction(conn, &id)).await?;
    Ok(Json(json!({ "deleted": deleted })))
}

/// PUT /api/transactions/:id/assign
async fn assign(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<AssignRequest>,
) -> ApiResult<Json<Transaction>> {
    let id = parse_id(&id, "transaction")?;
    let people = req
        .assigned_to
        .iter()
        .map(|p| parse_id(p, "person"))
        .collect::<Result<Vec<_>, _>>()?;
    let txn = state.run(move |conn| ledger::assign(conn, &id, &people)).await?;
    Ok(Json(txn))
}

/// PUT /api/transactions/:id/category
async fn set_category(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<CategoryRequest>,
) -> ApiResult<Json<Transaction>> {
    let id = parse_id(&id, "transaction")?;
    let category_id = req
        .category_id
        .as_deref()
        .map(|c| parse_id(c, "category"))
        .transpose()?;
    let txn = state
        .run(move |conn| ledger::set_category(conn, &id, category_id.as_deref()))
        .await?;
    Ok(Json(txn))
}

/// GET /api/totals
async fn totals(State(state): State<AppState>) -> ApiResult<Json<Vec<PersonTotal>>> {
    let totals = state.run(|conn| splits::totals_for_active(conn)).await?;
    Ok(Json(totals))
}
