//! Core data types for the reservoir storage proxy.
//!
//! This module defines the shared domain model imported by all other modules.
//! It contains no I/O. The only logic here is the lenient decoding needed to
//! cope with the upstream API's loosely typed JSON.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Label reported in the `source` field of every report.
pub const SOURCE_LABEL: &str = "MOIS SafetyData OpenAPI (daily)";

/// `response.header.resultCode` value for a successful upstream call.
pub const RESULT_CODE_OK: &str = "00";

// ---------------------------------------------------------------------------
// Upstream item
// ---------------------------------------------------------------------------

/// A single raw row from the SafetyData reservoir API.
///
/// The API has published the same columns under more than one name (the
/// `sido`/`sigungu` family and the `ctprvnNm`/`signguNm` family), so each
/// variant is captured separately and resolved by the accessor methods.
/// Scalars may arrive as JSON numbers or strings; both are accepted.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct UpstreamItem {
    #[serde(rename = "targetDt", default, deserialize_with = "lenient_string")]
    pub target_dt: Option<String>,

    #[serde(default, deserialize_with = "lenient_string")]
    pub sido: Option<String>,
    #[serde(rename = "ctprvnNm", default, deserialize_with = "lenient_string")]
    pub ctprvn_nm: Option<String>,

    #[serde(default, deserialize_with = "lenient_string")]
    pub sigungu: Option<String>,
    #[serde(rename = "signguNm", default, deserialize_with = "lenient_string")]
    pub signgu_nm: Option<String>,

    #[serde(rename = "sigunguCd", default, deserialize_with = "lenient_string")]
    pub sigungu_cd: Option<String>,
    #[serde(rename = "signguCode", default, deserialize_with = "lenient_string")]
    pub signgu_code: Option<String>,

    #[serde(rename = "reservoirCnt", default, deserialize_with = "lenient_number")]
    pub reservoir_cnt: Option<f64>,
    /// 유효저수량 (effective storage capacity)
    #[serde(rename = "effctvRsvrQty", default, deserialize_with = "lenient_number")]
    pub effctv_rsvr_qty: Option<f64>,
    /// 현재저수량 (current storage)
    #[serde(rename = "nowRsvrQty", default, deserialize_with = "lenient_number")]
    pub now_rsvr_qty: Option<f64>,
    /// 현재저수율 (current storage rate, %)
    #[serde(rename = "nowRsvrRt", default, deserialize_with = "lenient_number")]
    pub now_rsvr_rt: Option<f64>,
}

impl UpstreamItem {
    /// Region code, or `""` when neither code field is populated.
    pub fn region_code(&self) -> &str {
        first_non_empty(&[&self.sigungu_cd, &self.signgu_code]).unwrap_or("")
    }

    /// Province (시도) name.
    pub fn province(&self) -> Option<&str> {
        first_non_empty(&[&self.sido, &self.ctprvn_nm])
    }

    /// County (시군구) name.
    pub fn county(&self) -> Option<&str> {
        first_non_empty(&[&self.sigungu, &self.signgu_nm])
    }
}

fn first_non_empty<'a>(candidates: &[&'a Option<String>]) -> Option<&'a str> {
    candidates
        .iter()
        .filter_map(|c| c.as_deref())
        .find(|s| !s.is_empty())
}

// ---------------------------------------------------------------------------
// Normalized record
// ---------------------------------------------------------------------------

/// One county-level row of the simplified JSON contract served to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservoirRecord {
    /// Observation date in upstream `YYYYMMDD` form.
    pub date: String,
    pub province: Option<String>,
    pub county: Option<String>,
    pub reservoir_count: Option<u64>,
    pub effective_storage: Option<f64>,
    pub current_storage: Option<f64>,
    /// Percent of effective storage currently held.
    pub current_storage_rate: Option<f64>,
}

/// Response envelope for `GET /api/reservoirs`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReservoirReport {
    pub source: String,
    /// The date as requested by the client, before conversion.
    pub date: String,
    pub count: usize,
    pub rows: Vec<ReservoirRecord>,
}

impl ReservoirReport {
    pub fn new(date: impl Into<String>, rows: Vec<ReservoirRecord>) -> Self {
        Self {
            source: SOURCE_LABEL.to_string(),
            date: date.into(),
            count: rows.len(),
            rows,
        }
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can arise when fetching or processing SafetyData reservoir data.
#[derive(Debug, Error)]
pub enum SafetyDataError {
    /// No service key was configured; raised before any network I/O.
    #[error("SAFETYDATA_SERVICE_KEY is not set")]
    MissingServiceKey,
    /// The requested date is not a calendar date.
    #[error("invalid date '{0}': expected YYYY-MM-DD")]
    InvalidDate(String),
    /// The configured base URL cannot be parsed.
    #[error("invalid upstream URL {0}")]
    InvalidUrl(String),
    /// Transport failure (connect, timeout, body read).
    #[error("HTTP error: {0}")]
    Http(reqwest::Error),
    /// Non-2xx HTTP response from the upstream API.
    #[error("SafetyData API error: HTTP {0}")]
    UpstreamStatus(u16),
    /// The upstream answered 200 but reported a failure in its header.
    #[error("SafetyData API error {code}: {message}")]
    UpstreamApi { code: String, message: String },
    /// The response body could not be deserialized.
    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for SafetyDataError {
    fn from(err: reqwest::Error) -> Self {
        // The request URL carries the service key.
        SafetyDataError::Http(err.without_url())
    }
}

impl From<serde_json::Error> for SafetyDataError {
    fn from(err: serde_json::Error) -> Self {
        SafetyDataError::Parse(err.to_string())
    }
}

// ---------------------------------------------------------------------------
// Lenient scalar decoding
// ---------------------------------------------------------------------------

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(number_from_value))
}

/// Reads a JSON number or a numeric string such as `"1,234.5"`.
pub fn number_from_value(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let cleaned: String = s.trim().chars().filter(|c| *c != ',').collect();
            if cleaned.is_empty() {
                None
            } else {
                cleaned.parse::<f64>().ok()
            }
        }
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
