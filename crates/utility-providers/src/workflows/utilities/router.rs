use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::UtilityCategory;
use super::service::ProviderSuggestionService;

/// Router builder exposing suggestion and provider search endpoints.
pub fn utilities_router(service: Arc<ProviderSuggestionService>) -> Router {
    Router::new()
        .route("/api/v1/utilities/suggestions", post(suggestions_handler))
        .route(
            "/api/v1/utilities/suggestions/batch",
            post(batch_suggestions_handler),
        )
        .route("/api/v1/utilities/providers", get(search_handler))
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub struct SuggestionRequest {
    pub address: String,
    pub category: String,
}

#[derive(Debug, Deserialize)]
pub struct BatchSuggestionRequest {
    pub address: String,
    pub categories: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
    pub category: Option<String>,
}

pub(crate) async fn suggestions_handler(
    State(service): State<Arc<ProviderSuggestionService>>,
    axum::Json(request): axum::Json<SuggestionRequest>,
) -> Response {
    let category = match request.category.parse::<UtilityCategory>() {
        Ok(category) => category,
        Err(err) => return unprocessable(err),
    };

    let suggestions = service.get_suggestions(&request.address, category).await;
    let payload = json!({
        "category": category,
        "suggestions": suggestions,
    });
    (StatusCode::OK, axum::Json(payload)).into_response()
}

pub(crate) async fn batch_suggestions_handler(
    State(service): State<Arc<ProviderSuggestionService>>,
    axum::Json(request): axum::Json<BatchSuggestionRequest>,
) -> Response {
    let categories = match request
        .categories
        .iter()
        .map(|value| value.parse::<UtilityCategory>())
        .collect::<Result<Vec<_>, _>>()
    {
        Ok(categories) => categories,
        Err(err) => return unprocessable(err),
    };

    let suggestions = service
        .get_all_suggestions(&request.address, &categories)
        .await;
    (StatusCode::OK, axum::Json(json!({ "suggestions": suggestions }))).into_response()
}

pub(crate) async fn search_handler(
    State(service): State<Arc<ProviderSuggestionService>>,
    Query(params): Query<SearchParams>,
) -> Response {
    let category = match params.category.as_deref().map(str::parse::<UtilityCategory>) {
        None => None,
        Some(Ok(category)) => Some(category),
        Some(Err(err)) => return unprocessable(err),
    };

    let providers = service.search_providers(&params.q, category);
    (StatusCode::OK, axum::Json(json!({ "providers": providers }))).into_response()
}

fn unprocessable(err: impl std::fmt::Display) -> Response {
    let payload = json!({
        "error": err.to_string(),
    });
    (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response()
}
