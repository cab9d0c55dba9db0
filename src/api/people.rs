use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use serde::Deserialize;

use super::error::ApiJson;
use super::{ApiResult, AppState};
use crate::error::parse_id;
use crate::models::Person;
use crate::registry;

#[derive(Debug, Deserialize)]
pub struct PersonRequest {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/people", get(list).post(create))
        .route("/people/:id", put(update).delete(remove))
}

async fn list(State(state): State<AppState>) -> ApiResult<Json<Vec<Person>>> {
    let rows = state.run(|conn| registry::list_people(conn)).await?;
    Ok(Json(rows))
}

async fn create(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<PersonRequest>,
) -> ApiResult<(StatusCode, Json<Person>)> {
    let person = state
        .run(move |conn| registry::create_person(conn, &req.name, req.email.as_deref()))
        .await?;
    Ok((StatusCode::CREATED, Json(person)))
}

async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<PersonRequest>,
) -> ApiResult<Json<Person>> {
    let id = parse_id(&id, "person")?;
    let person = state
        .run(move |conn| registry::update_person(conn, &id, &req.name, req.email.as_deref()))
        .await?;
    Ok(Json(person))
}

/// Strips the person from every transaction, archived ones included, then
/// deletes them.
async fn remove(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<StatusCode> {
    let id = parse_id(&id, "person")?;
    state.run(move |conn| registry::delete_person(conn, &id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
