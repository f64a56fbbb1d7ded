//! End-to-end tests against a local stand-in for the SafetyData API.
//!
//! Each test binds a small axum app on an ephemeral port and points the
//! service at it, so the real HTTP client, parser, filter and router are
//! all exercised.

use std::collections::HashMap;

use axum::{
    Json, Router,
    body::Body,
    extract::Query,
    http::{Request, StatusCode},
    routing::get,
};
use serde_json::{Value, json};
use tower::ServiceExt;

use reservoir_service::config::Settings;
use reservoir_service::ingest::safetydata::{RegionFilter, UpstreamSettings};
use reservoir_service::model::{ReservoirReport, SOURCE_LABEL};
use reservoir_service::server::{AppState, create_router};

const SERVICE_KEY: &str = "test-key";
const STUB_PATH: &str = "/1741000/Reservoir/getReservoir";

// ---------------------------------------------------------------------------
// Test Helpers
// ---------------------------------------------------------------------------

async fn spawn_stub(stub: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, stub).await.unwrap();
    });
    format!("http://{}{}", addr, STUB_PATH)
}

async fn spawn_reservoir_stub() -> String {
    spawn_stub(Router::new().route(STUB_PATH, get(reservoir_stub))).await
}

fn sample_body() -> Value {
    json!({
        "response": {
            "header": {"resultCode": "00", "resultMsg": "NORMAL SERVICE."},
            "body": {
                "items": {"item": [
                    {"targetDt": "20240501", "sido": "경기도", "sigungu": "수원시", "sigunguCd": "41110",
                     "reservoirCnt": "4", "effctvRsvrQty": "1,200", "nowRsvrQty": "600", "nowRsvrRt": "50.0"},
                    {"ctprvnNm": "경기도", "signguNm": "화성시", "signguCode": 41590,
                     "reservoirCnt": 7, "effctvRsvrQty": 2000, "nowRsvrQty": 1500, "nowRsvrRt": 75},
                    {"sido": "강원특별자치도", "sigungu": "춘천시", "sigunguCd": "51110",
                     "reservoirCnt": 2, "nowRsvrRt": 90},
                    {"sido": "경기도 ", "sigungu": "가평군", "reservoirCnt": 1, "nowRsvrRt": null}
                ]},
                "totalCount": 4
            }
        }
    })
}

/// Answers like the real API, but only for the expected key and date.
async fn reservoir_stub(
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Value>, StatusCode> {
    let param = |name: &str| params.get(name).map(String::as_str);

    if param("serviceKey") != Some(SERVICE_KEY) {
        return Err(StatusCode::UNAUTHORIZED);
    }
    if param("targetDt") != Some("20240501")
        || param("type") != Some("json")
        || param("pageNo") != Some("1")
        || param("numOfRows") != Some("10000")
    {
        return Err(StatusCode::BAD_REQUEST);
    }
    Ok(Json(sample_body()))
}

fn settings_for(base_url: String) -> Settings {
    Settings {
        upstream: UpstreamSettings {
            base_url,
            service_key: Some(SERVICE_KEY.to_string()),
            timeout_secs: 5,
            ..Default::default()
        },
        ..Default::default()
    }
}

async fn request(settings: Settings, uri: &str) -> (StatusCode, String) {
    let app = create_router(AppState::new(settings).unwrap());
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

// ---------------------------------------------------------------------------
// JSON endpoint
// ---------------------------------------------------------------------------

#[tokio::test]
async fn returns_filtered_and_normalized_rows() {
    let base = spawn_reservoir_stub().await;

    let (status, body) = request(settings_for(base), "/api/reservoirs?date=2024-05-01").await;
    assert_eq!(status, StatusCode::OK, "body: {body}");

    let report: ReservoirReport = serde_json::from_str(&body).unwrap();
    assert_eq!(report.source, SOURCE_LABEL);
    assert_eq!(report.date, "2024-05-01");
    assert_eq!(report.count, 3);
    assert_eq!(report.rows.len(), 3);

    let counties: Vec<_> = report.rows.iter().map(|r| r.county.as_deref().unwrap()).collect();
    assert_eq!(counties, vec!["수원시", "화성시", "가평군"]);

    let suwon = &report.rows[0];
    assert_eq!(suwon.date, "20240501");
    assert_eq!(suwon.reservoir_count, Some(4));
    assert_eq!(suwon.effective_storage, Some(1200.0));
    assert_eq!(suwon.current_storage, Some(600.0));
    assert_eq!(suwon.current_storage_rate, Some(50.0));

    let hwaseong = &report.rows[1];
    assert_eq!(hwaseong.date, "20240501");
    assert_eq!(hwaseong.province.as_deref(), Some("경기도"));
    assert_eq!(hwaseong.current_storage_rate, Some(75.0));

    let gapyeong = &report.rows[2];
    assert_eq!(gapyeong.current_storage_rate, None);
}

#[tokio::test]
async fn response_uses_camel_case_contract() {
    let base = spawn_reservoir_stub().await;

    let (_, body) = request(settings_for(base), "/api/reservoirs?date=2024-05-01").await;
    let json: Value = serde_json::from_str(&body).unwrap();
    let first = &json["rows"][0];
    for field in [
        "date",
        "province",
        "county",
        "reservoirCount",
        "effectiveStorage",
        "currentStorage",
        "currentStorageRate",
    ] {
        assert!(first.get(field).is_some(), "missing field {field}");
    }
    assert_eq!(json["count"], 3);
}

#[tokio::test]
async fn other_region_prefix_selects_other_rows() {
    let base = spawn_reservoir_stub().await;

    let mut settings = settings_for(base);
    settings.region = RegionFilter::for_prefix("51");

    let (status, body) = request(settings, "/api/reservoirs?date=2024-05-01").await;
    assert_eq!(status, StatusCode::OK);
    let report: ReservoirReport = serde_json::from_str(&body).unwrap();
    assert_eq!(report.count, 1);
    assert_eq!(report.rows[0].county.as_deref(), Some("춘천시"));
}

#[tokio::test]
async fn target_date_is_used_when_request_has_no_date() {
    let base = spawn_reservoir_stub().await;

    let mut settings = settings_for(base);
    settings.target_date = Some("2024-05-01".to_string());

    let (status, body) = request(settings, "/api/reservoirs").await;
    assert_eq!(status, StatusCode::OK, "body: {body}");
    let report: ReservoirReport = serde_json::from_str(&body).unwrap();
    assert_eq!(report.date, "2024-05-01");
}

// ---------------------------------------------------------------------------
// Upstream failures
// ---------------------------------------------------------------------------

#[tokio::test]
async fn upstream_status_error_is_500() {
    let stub = Router::new().route(
        STUB_PATH,
        get(|| async { StatusCode::SERVICE_UNAVAILABLE }),
    );
    let base = spawn_stub(stub).await;

    let (status, body) = request(settings_for(base), "/api/reservoirs?date=2024-05-01").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["error"], "SafetyData API error: HTTP 503");
}

#[tokio::test]
async fn wrong_key_surfaces_upstream_status() {
    let base = spawn_reservoir_stub().await;

    let mut settings = settings_for(base);
    settings.upstream.service_key = Some("other-key".to_string());

    let (status, body) = request(settings, "/api/reservoirs?date=2024-05-01").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.contains("HTTP 401"));
    assert!(!body.contains("other-key"), "service key must not leak");
}

#[tokio::test]
async fn result_code_error_is_500() {
    let stub = Router::new().route(
        STUB_PATH,
        get(|| async {
            Json(json!({"response": {"header": {
                "resultCode": "22",
                "resultMsg": "LIMITED_NUMBER_OF_SERVICE_REQUESTS_EXCEEDS_ERROR"
            }}}))
        }),
    );
    let base = spawn_stub(stub).await;

    let (status, body) = request(settings_for(base), "/api/reservoirs?date=2024-05-01").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(
        json["error"],
        "SafetyData API error 22: LIMITED_NUMBER_OF_SERVICE_REQUESTS_EXCEEDS_ERROR"
    );
}

#[tokio::test]
async fn non_json_body_is_500() {
    let stub = Router::new().route(
        STUB_PATH,
        get(|| async { "service temporarily unavailable" }),
    );
    let base = spawn_stub(stub).await;

    let (status, body) = request(settings_for(base), "/api/reservoirs?date=2024-05-01").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.contains("Parse error"));
}

// ---------------------------------------------------------------------------
// Table page
// ---------------------------------------------------------------------------

#[tokio::test]
async fn page_sorts_by_requested_column() {
    let base = spawn_reservoir_stub().await;

    let (status, html) = request(settings_for(base), "/?date=2024-05-01&sort=county&dir=asc").await;
    assert_eq!(status, StatusCode::OK);

    let gapyeong = html.find("가평군").unwrap();
    let suwon = html.find("수원시").unwrap();
    let hwaseong = html.find("화성시").unwrap();
    assert!(gapyeong < suwon && suwon < hwaseong);

    // Clicking the active column again flips to descending.
    assert!(html.contains("sort=county&amp;dir=desc"));
    assert!(html.contains("1,200"));
}

#[tokio::test]
async fn page_defaults_to_rate_descending() {
    let base = spawn_reservoir_stub().await;

    let (status, html) = request(settings_for(base), "/?date=2024-05-01").await;
    assert_eq!(status, StatusCode::OK);

    let hwaseong = html.find("화성시").unwrap();
    let suwon = html.find("수원시").unwrap();
    let gapyeong = html.find("가평군").unwrap();
    assert!(hwaseong < suwon && suwon < gapyeong);
}
