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
use crate::models::Category;
use crate::registry;

#[derive(Debug, Deserialize)]
pub struct CategoryRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/categories", get(list).post(create))
        .route("/categories/:id", put(update).delete(remove))
}

async fn list(State(state): State<AppState>) -> ApiResult<Json<Vec<Category>>> {
    let rows = state.run(|conn| registry::list_categories(conn)).await?;
    Ok(Json(rows))
}

async fn create(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CategoryRequest>,
) -> ApiResult<(StatusCode, Json<Category>)> {
    let category = state
        .run(move |conn| {
            registry::create_category(conn, &req.name, req.description.as_deref(), req.color.as_deref())
        })
        .await?;
    Ok((StatusCode::CREATED, Json(category)))
}

async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<CategoryRequest>,
) -> ApiResult<Json<Category>> {
    let id = parse_id(&id, "category")?;
    let category = state
        .run(move |conn| {
            registry::update_category(
                conn,
                &id,
                &req.name,
                req.description.as_deref(),
                req.color.as_deref(),
            )
        })
        .await?;
    Ok(Json(category))
}

async fn remove(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<StatusCode> {
    let id = parse_id(&id, "category")?;
    state.run(move |conn| registry::delete_category(conn, &id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use crate::api::test_support::{add_transaction, send, test_app};

    #[tokio::test]
    async fn test_bad_color_is_400() {
        let (_dir, app) = test_app();
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/categories",
            Some(json!({ "name": "Food", "color": "red" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("color"));
    }

    #[tokio::test]
    async fn test_duplicate_is_409() {
        let (_dir, app) = test_app();
        send(&app, Method::POST, "/api/categories", Some(json!({ "name": "Food" }))).await;
        let (status, _) = send(&app, Method::POST, "/api/categories", Some(json!({ "name": "Food" }))).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_delete_nulls_transaction_category() {
        let (_dir, app) = test_app();
        let (_, cat) = send(
            &app,
            Method::POST,
            "/api/categories",
            Some(json!({ "name": "Food", "color": "#00ff00" })),
        )
        .await;
        let cat_id = cat["id"].as_str().unwrap().to_string();
        let txn = add_transaction(&app, "Lunch", 12.0).await;
        send(
            &app,
            Method::PUT,
            &format!("/api/transactions/{txn}/category"),
            Some(json!({ "category_id": cat_id })),
        )
        .await;

        let (status, _) = send(&app, Method::DELETE, &format!("/api/categories/{cat_id}"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (_, list) = send(&app, Method::GET, "/api/transactions", None).await;
        assert!(list[0]["category_id"].is_null());
        let (status, _) = send(&app, Method::DELETE, &format!("/api/categories/{cat_id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
