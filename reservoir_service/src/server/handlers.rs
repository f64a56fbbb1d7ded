use axum::{
    Json,
    extract::{Query, State, rejection::QueryRejection},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;

use super::{SharedState, load_report};
use crate::model::ReservoirReport;
use crate::server::error::ApiError;
use crate::view::{self, SortState};

#[derive(Debug, Default, Deserialize)]
pub struct ReservoirQuery {
    pub date: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub date: Option<String>,
    pub sort: Option<String>,
    pub dir: Option<String>,
}

pub async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// `GET /api/reservoirs?date=YYYY-MM-DD`
pub async fn list_reservoirs(
    State(state): State<SharedState>,
    query: Result<Query<ReservoirQuery>, QueryRejection>,
) -> Result<Json<ReservoirReport>, ApiError> {
    let Query(query) = query?;
    let report = load_report(&state, query.date.as_deref()).await?;
    Ok(Json(report))
}

/// `GET /?date=&sort=&dir=`
pub async fn index_page(
    State(state): State<SharedState>,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> Response {
    match render_index(&state, query).await {
        Ok(page) => Html(page).into_response(),
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Html(view::render_error_page(&err.to_string())),
        )
            .into_response(),
    }
}

async fn render_index(
    state: &SharedState,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> Result<String, ApiError> {
    let Query(query) = query?;
    let sort = SortState::from_params(query.sort.as_deref(), query.dir.as_deref());
    let report = load_report(state, query.date.as_deref()).await?;
    Ok(view::render_page(&report, sort))
}
