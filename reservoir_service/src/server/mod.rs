//! HTTP surface: the JSON endpoint, the table page and a liveness check.
//!
//! Submodules:
//! - `handlers` — request handlers.
//! - `error` — `ApiError` (always HTTP 500) and `ServerError`.

pub mod error;
pub mod handlers;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{Router, routing::get};
use chrono::{NaiveDate, Utc};
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::info;

use crate::config::Settings;
use crate::ingest::safetydata;
use crate::logging::{self, DataSource};
use crate::model::{ReservoirReport, SafetyDataError};
use error::ServerError;

pub struct AppState {
    pub settings: Settings,
    pub client: reqwest::Client,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(settings: Settings) -> Result<SharedState, SafetyDataError> {
        let client = safetydata::build_client(&settings.upstream)?;
        Ok(Arc::new(AppState { settings, client }))
    }
}

pub fn create_router(state: SharedState) -> Router {
    let mut router = Router::new()
        .route("/", get(handlers::index_page))
        .route("/health", get(handlers::health))
        .route("/api/reservoirs", get(handlers::list_reservoirs));

    if let Some(dir) = &state.settings.static_dir {
        router = router.fallback_service(ServeDir::new(dir));
    }

    router.layer(TraceLayer::new_for_http()).with_state(state)
}

/// Pick the date a request is about: the query value, else the configured
/// `TARGET_DATE`, else today (UTC). Empty strings count as absent.
pub fn resolve_request_date(
    requested: Option<&str>,
    target_date: Option<&str>,
    today: NaiveDate,
) -> String {
    requested
        .filter(|d| !d.is_empty())
        .or(target_date.filter(|d| !d.is_empty()))
        .map(str::to_string)
        .unwrap_or_else(|| today.format("%Y-%m-%d").to_string())
}

/// Fetch, filter and wrap one day of data.
pub async fn load_report(
    state: &AppState,
    requested: Option<&str>,
) -> Result<ReservoirReport, SafetyDataError> {
    let settings = &state.settings;
    let date = resolve_request_date(
        requested,
        settings.target_date.as_deref(),
        Utc::now().date_naive(),
    );

    let result = match safetydata::to_upstream_date(&date) {
        Ok(ymd) => {
            safetydata::fetch_reservoirs(&state.client, &settings.upstream, &settings.region, &ymd)
                .await
        }
        Err(err) => Err(err),
    };

    match result {
        Ok(rows) => Ok(ReservoirReport::new(date, rows)),
        Err(err) => {
            logging::log_fetch_failure(&date, "reservoir fetch", &err);
            Err(err)
        }
    }
}

/// Bind and serve until the process is stopped.
pub async fn serve(settings: Settings) -> Result<(), ServerError> {
    let addr: SocketAddr = ([0, 0, 0, 0], settings.port).into();
    let state = AppState::new(settings)?;

    info!(
        source = %DataSource::Server,
        %addr,
        region_prefix = %state.settings.region.code_prefix,
        service_key_set = state.settings.upstream.service_key.is_some(),
        "Reservoir server running at http://localhost:{}",
        addr.port()
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, create_router(state)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn may_first() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
    }

    #[test]
    fn test_requested_date_wins() {
        assert_eq!(
            resolve_request_date(Some("2023-08-15"), Some("2024-01-01"), may_first()),
            "2023-08-15"
        );
    }

    #[test]
    fn test_target_date_used_when_request_has_none() {
        assert_eq!(
            resolve_request_date(None, Some("2024-01-01"), may_first()),
            "2024-01-01"
        );
        assert_eq!(
            resolve_request_date(Some(""), Some("2024-01-01"), may_first()),
            "2024-01-01"
        );
    }

    #[test]
    fn test_falls_back_to_today() {
        assert_eq!(resolve_request_date(None, None, may_first()), "2024-05-01");
    }
}
