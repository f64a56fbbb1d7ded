/// SafetyData (행정안전부 안전데이터) Reservoir API Client
///
/// Retrieves the daily county-level reservoir storage table (시군저수지 저수
/// 현황, data.go.kr dataset 15139723) and reduces it to the rows of a single
/// province. The feed is refreshed once per day.
///
/// Endpoint: https://apis.data.go.kr/1741000/Reservoir/getReservoir
/// Query: serviceKey, targetDt=YYYYMMDD, pageNo, numOfRows, type=json

use std::time::Duration;

use chrono::NaiveDate;
use reqwest::Url;
use serde_json::Value;
use tracing::debug;

use crate::logging::{self, DataSource};
use crate::model::{RESULT_CODE_OK, ReservoirRecord, SafetyDataError, UpstreamItem};
use crate::regions::{self, DEFAULT_REGION_PREFIX};

pub const SAFETYDATA_BASE_URL: &str = "https://apis.data.go.kr/1741000/Reservoir/getReservoir";

/// One oversized page; the API is never paged beyond this.
pub const DEFAULT_NUM_OF_ROWS: u32 = 10_000;

pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Locations of the item list in a response body, tried in order. The flag
/// says whether a lone object at that path is accepted as a one-item list
/// (data.go.kr collapses single-row arrays).
const ITEM_PATHS: &[(&str, bool)] = &[
    ("/response/body/items/item", true),
    ("/response/body/items", false),
    ("/items", false),
];

// ============================================================================
// Settings and filtering
// ============================================================================

/// Connection settings for the upstream API.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamSettings {
    pub base_url: String,
    /// data.go.kr service key in its decoded form; it is URL-encoded on use.
    pub service_key: Option<String>,
    pub num_of_rows: u32,
    pub timeout_secs: u64,
}

impl Default for UpstreamSettings {
    fn default() -> Self {
        Self {
            base_url: SAFETYDATA_BASE_URL.to_string(),
            service_key: None,
            num_of_rows: DEFAULT_NUM_OF_ROWS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Selects the rows belonging to one province.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionFilter {
    /// Region-code prefix, e.g. `"41"` for 경기도.
    pub code_prefix: String,
    /// Province names matched by substring against the row's 시도 name.
    pub province_names: Vec<String>,
}

impl RegionFilter {
    pub fn new(code_prefix: impl Into<String>, province_names: Vec<String>) -> Self {
        Self {
            code_prefix: code_prefix.into(),
            province_names,
        }
    }

    /// Filter for a prefix, with the province names taken from the registry.
    pub fn for_prefix(code_prefix: &str) -> Self {
        Self::new(code_prefix, regions::province_names_for_prefix(code_prefix))
    }

    /// A row is kept when its region code starts with the prefix or its
    /// province name contains one of the configured names.
    pub fn matches(&self, item: &UpstreamItem) -> bool {
        if item.region_code().starts_with(self.code_prefix.as_str()) {
            return true;
        }
        let province = item.province().map(str::trim).unwrap_or("");
        self.province_names
            .iter()
            .any(|name| !name.is_empty() && province.contains(name.as_str()))
    }
}

impl Default for RegionFilter {
    fn default() -> Self {
        Self::for_prefix(DEFAULT_REGION_PREFIX)
    }
}

// ============================================================================
// API Client Functions
// ============================================================================

/// Build the shared HTTP client with the configured upstream timeout.
pub fn build_client(upstream: &UpstreamSettings) -> Result<reqwest::Client, SafetyDataError> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(upstream.timeout_secs))
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(client)
}

/// Build the request URL for one day of data.
pub fn build_request_url(
    base_url: &str,
    service_key: &str,
    ymd: &str,
    num_of_rows: u32,
) -> Result<Url, SafetyDataError> {
    let mut url = Url::parse(base_url)
        .map_err(|e| SafetyDataError::InvalidUrl(format!("{}: {}", base_url, e)))?;

    url.query_pairs_mut()
        .append_pair("serviceKey", service_key)
        .append_pair("targetDt", ymd)
        .append_pair("pageNo", "1")
        .append_pair("numOfRows", &num_of_rows.to_string())
        .append_pair("type", "json");

    Ok(url)
}

/// Fetch one day of reservoir statistics and reduce it to the filtered,
/// normalized record set.
///
/// # Parameters
/// - `client`: HTTP client (see `build_client`)
/// - `upstream`: endpoint, service key and paging settings
/// - `filter`: province selection
/// - `ymd`: target date in `YYYYMMDD` form
///
/// Fails with `MissingServiceKey` before any network I/O when no key is set.
pub async fn fetch_reservoirs(
    client: &reqwest::Client,
    upstream: &UpstreamSettings,
    filter: &RegionFilter,
    ymd: &str,
) -> Result<Vec<ReservoirRecord>, SafetyDataError> {
    let service_key = upstream
        .service_key
        .as_deref()
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .ok_or(SafetyDataError::MissingServiceKey)?;

    let url = build_request_url(&upstream.base_url, service_key, ymd, upstream.num_of_rows)?;

    let response = client
        .get(url)
        .header("Accept", "application/json")
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        return Err(SafetyDataError::UpstreamStatus(status.as_u16()));
    }

    let body = response.text().await?;
    let items = parse_items(&body)?;
    let total = items.len();

    let rows = filter_and_normalize(items, filter, ymd);
    debug!(
        source = %DataSource::SafetyData,
        target_dt = ymd,
        region_prefix = %filter.code_prefix,
        "received {} upstream items",
        total
    );
    logging::log_fetch_summary(ymd, total, rows.len());

    Ok(rows)
}

// ============================================================================
// Response parsing
// ============================================================================

/// Parse a response body into upstream items.
///
/// Fails when the body is not JSON or when `response.header.resultCode`
/// reports an error. A body with no recognizable item list yields no items.
pub fn parse_items(body: &str) -> Result<Vec<UpstreamItem>, SafetyDataError> {
    let trimmed = body.trim_start();
    if trimmed.starts_with('<') {
        // The data.go.kr gateway answers key and quota errors in XML
        // regardless of the requested type.
        return Err(xml_gateway_error(trimmed));
    }

    let json: Value = serde_json::from_str(body)?;
    check_result_header(&json)?;

    let mut items = Vec::new();
    for entry in locate_items(&json) {
        if entry.is_object() {
            items.push(serde_json::from_value::<UpstreamItem>(entry.clone())?);
        }
    }
    Ok(items)
}

fn locate_items(json: &Value) -> Vec<&Value> {
    for (path, allow_single) in ITEM_PATHS {
        match json.pointer(path) {
            Some(Value::Array(list)) => return list.iter().collect(),
            Some(single @ Value::Object(_)) if *allow_single => return vec![single],
            Some(value) if is_truthy(value) => return Vec::new(),
            _ => continue,
        }
    }
    Vec::new()
}

/// Missing, null, false, zero and empty-string values do not stop the search
/// for an item list.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|v| v != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn check_result_header(json: &Value) -> Result<(), SafetyDataError> {
    let code = match json.pointer("/response/header/resultCode") {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => match n.as_u64() {
            Some(code) => format!("{:02}", code),
            None => n.to_string(),
        },
        _ => return Ok(()),
    };

    if code == RESULT_CODE_OK {
        return Ok(());
    }

    let message = json
        .pointer("/response/header/resultMsg")
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string();
    Err(SafetyDataError::UpstreamApi { code, message })
}

fn xml_gateway_error(body: &str) -> SafetyDataError {
    let code = xml_tag_text(body, "returnReasonCode")
        .or_else(|| xml_tag_text(body, "resultCode"))
        .unwrap_or("?");
    let message = xml_tag_text(body, "returnAuthMsg")
        .or_else(|| xml_tag_text(body, "resultMsg"))
        .or_else(|| xml_tag_text(body, "errMsg"));

    match message {
        Some(message) => SafetyDataError::UpstreamApi {
            code: code.to_string(),
            message: message.to_string(),
        },
        None => SafetyDataError::Parse("unexpected XML response".to_string()),
    }
}

fn xml_tag_text<'a>(body: &'a str, tag: &str) -> Option<&'a str> {
    let open = format!("<{}>", tag);
    let close = format!("</{}>", tag);
    let start = body.find(&open)? + open.len();
    let end = body[start..].find(&close)? + start;
    Some(body[start..end].trim())
}

// ============================================================================
// Normalization
// ============================================================================

/// Map one upstream item onto the unified record shape.
///
/// `ymd` is used as the date when the item carries no `targetDt`.
pub fn normalize(item: &UpstreamItem, ymd: &str) -> ReservoirRecord {
    let date = item
        .target_dt
        .as_deref()
        .filter(|d| !d.is_empty())
        .unwrap_or(ymd)
        .to_string();

    ReservoirRecord {
        date,
        province: item.province().map(str::to_string),
        county: item.county().map(str::to_string),
        reservoir_count: item
            .reservoir_cnt
            .filter(|n| *n >= 0.0)
            .map(|n| n.round() as u64),
        effective_storage: item.effctv_rsvr_qty,
        current_storage: item.now_rsvr_qty,
        current_storage_rate: item.now_rsvr_rt,
    }
}

/// Keep the items selected by `filter`, preserving upstream order.
pub fn filter_and_normalize(
    items: Vec<UpstreamItem>,
    filter: &RegionFilter,
    ymd: &str,
) -> Vec<ReservoirRecord> {
    items
        .iter()
        .filter(|item| filter.matches(item))
        .map(|item| normalize(item, ymd))
        .collect()
}

// ============================================================================
// Date Helpers
// ============================================================================

/// Convert a request date (`YYYY-MM-DD`, or already `YYYYMMDD`) into the
/// upstream `targetDt` form.
pub fn to_upstream_date(date: &str) -> Result<String, SafetyDataError> {
    let trimmed = date.trim();
    let parsed = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(trimmed, "%Y%m%d"))
        .map_err(|_| SafetyDataError::InvalidDate(date.to_string()))?;
    Ok(parsed.format("%Y%m%d").to_string())
}

// ============================================================================
// Tests
// ============================================================================
