//! Browser table for the reservoir report.
//!
//! The page is rendered server-side. Sort state travels in the query string
//! (`?date=&sort=&dir=`), and each column header links to the toggled state,
//! so clicking a header reloads the page sorted by that column.

use std::cmp::Ordering;
use std::fmt::Write;

use reqwest::Url;

use crate::model::{ReservoirRecord, ReservoirReport};

// ---------------------------------------------------------------------------
// Sort state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    County,
    ReservoirCount,
    EffectiveStorage,
    CurrentStorage,
    CurrentStorageRate,
}

impl SortKey {
    /// Columns in display order.
    pub const ALL: [SortKey; 5] = [
        SortKey::County,
        SortKey::ReservoirCount,
        SortKey::EffectiveStorage,
        SortKey::CurrentStorage,
        SortKey::CurrentStorageRate,
    ];

    /// Query-string value; matches the JSON field name.
    pub fn param(self) -> &'static str {
        match self {
            SortKey::County => "county",
            SortKey::ReservoirCount => "reservoirCount",
            SortKey::EffectiveStorage => "effectiveStorage",
            SortKey::CurrentStorage => "currentStorage",
            SortKey::CurrentStorageRate => "currentStorageRate",
        }
    }

    pub fn from_param(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|key| key.param() == value)
    }

    pub fn label(self) -> &'static str {
        match self {
            SortKey::County => "시군",
            SortKey::ReservoirCount => "저수지 수",
            SortKey::EffectiveStorage => "유효저수량",
            SortKey::CurrentStorage => "현재저수량",
            SortKey::CurrentStorageRate => "저수율(%)",
        }
    }

    fn numeric_value(self, row: &ReservoirRecord) -> Option<f64> {
        match self {
            SortKey::County => None,
            SortKey::ReservoirCount => row.reservoir_count.map(|n| n as f64),
            SortKey::EffectiveStorage => row.effective_storage,
            SortKey::CurrentStorage => row.current_storage,
            SortKey::CurrentStorageRate => row.current_storage_rate,
        }
    }

    fn compare(self, a: &ReservoirRecord, b: &ReservoirRecord) -> Ordering {
        match self {
            SortKey::County => a
                .county
                .as_deref()
                .unwrap_or("")
                .cmp(b.county.as_deref().unwrap_or("")),
            _ => {
                let va = self.numeric_value(a).unwrap_or(0.0);
                let vb = self.numeric_value(b).unwrap_or(0.0);
                va.total_cmp(&vb)
            }
        }
    }
}

/// Current sort column and direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortState {
    pub key: SortKey,
    pub ascending: bool,
}

impl Default for SortState {
    /// Highest storage rate first.
    fn default() -> Self {
        Self {
            key: SortKey::CurrentStorageRate,
            ascending: false,
        }
    }
}

impl SortState {
    /// State after clicking the header of `key`: the same column flips
    /// direction, a different column starts descending.
    pub fn toggle(self, key: SortKey) -> Self {
        if key == self.key {
            Self {
                key,
                ascending: !self.ascending,
            }
        } else {
            Self {
                key,
                ascending: false,
            }
        }
    }

    /// Read `sort` and `dir` query values. An unknown column falls back to
    /// the default state; a missing or unknown direction means descending.
    pub fn from_params(sort: Option<&str>, dir: Option<&str>) -> Self {
        match sort.and_then(SortKey::from_param) {
            Some(key) => Self {
                key,
                ascending: dir == Some("asc"),
            },
            None => Self::default(),
        }
    }

    pub fn dir_param(self) -> &'static str {
        if self.ascending { "asc" } else { "desc" }
    }
}

/// Sort rows in place. Numeric columns treat missing values as 0; the
/// county column compares names. The sort is stable.
pub fn sort_rows(rows: &mut [ReservoirRecord], state: SortState) {
    rows.sort_by(|a, b| {
        let ord = state.key.compare(a, b);
        if state.ascending { ord } else { ord.reverse() }
    });
}

// ---------------------------------------------------------------------------
// Formatting
// ---------------------------------------------------------------------------

/// Format a number the way `ko-KR` locale formatting does: thousands
/// separators and at most three fraction digits. Missing values render as `-`.
pub fn format_number(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => group_thousands(v),
        _ => "-".to_string(),
    }
}

fn group_thousands(value: f64) -> String {
    let fixed = format!("{:.3}", value.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));
    let frac_part = frac_part.trim_end_matches('0');

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let is_zero = grouped == "0" && frac_part.is_empty();
    let mut out = String::new();
    if value < 0.0 && !is_zero {
        out.push('-');
    }
    out.push_str(&grouped);
    if !frac_part.is_empty() {
        out.push('.');
        out.push_str(frac_part);
    }
    out
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Page rendering
// ---------------------------------------------------------------------------

const PAGE_STYLE: &str = "body{font-family:sans-serif;margin:2rem}\
table{border-collapse:collapse;min-width:40rem}\
th,td{border:1px solid #ccc;padding:.3rem .6rem}\
td.num{text-align:right}th a{color:inherit;text-decoration:none}\
.error{color:#b00}";

fn page_head(out: &mut String, title: &str) {
    let _ = write!(
        out,
        "<!DOCTYPE html>\n<html lang=\"ko\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{}</title>\n<style>{}</style>\n</head>\n<body>\n",
        escape_html(title),
        PAGE_STYLE
    );
}

fn date_form(out: &mut String, date: &str, state: SortState) {
    let _ = write!(
        out,
        "<form method=\"get\" action=\"/\">\n\
         <input type=\"date\" id=\"datePicker\" name=\"date\" value=\"{}\">\n\
         <input type=\"hidden\" name=\"sort\" value=\"{}\">\n\
         <input type=\"hidden\" name=\"dir\" value=\"{}\">\n\
         <button type=\"submit\" id=\"reload\">새로고침</button>\n</form>\n",
        escape_html(date),
        state.key.param(),
        state.dir_param()
    );
}

/// Render the report as a sorted HTML table. `report.rows` is sorted
/// according to `state` before rendering.
pub fn render_page(report: &ReservoirReport, state: SortState) -> String {
    let mut rows = report.rows.clone();
    sort_rows(&mut rows, state);

    let mut out = String::new();
    page_head(&mut out, "시군 저수지 저수 현황");
    let _ = write!(
        out,
        "<h1>시군 저수지 저수 현황</h1>\n<p>기준일: <span id=\"date\">{}</span> · {}건 · {}</p>\n",
        escape_html(&report.date),
        report.count,
        escape_html(&report.source)
    );
    date_form(&mut out, &report.date, state);

    out.push_str("<table id=\"tbl\">\n<thead><tr>");
    for key in SortKey::ALL {
        let next = state.toggle(key);
        let marker = match (key == state.key, state.ascending) {
            (true, true) => " ▲",
            (true, false) => " ▼",
            (false, _) => "",
        };
        let _ = write!(
            out,
            "<th data-key=\"{key}\"><a href=\"{href}\">{label}{marker}</a></th>",
            key = key.param(),
            href = escape_html(&page_href(&report.date, next)),
            label = key.label(),
            marker = marker
        );
    }
    out.push_str("</tr></thead>\n<tbody>\n");

    for row in &rows {
        let _ = write!(
            out,
            "<tr><td>{}</td><td class=\"num\">{}</td><td class=\"num\">{}</td>\
             <td class=\"num\">{}</td><td class=\"num\">{}</td></tr>\n",
            escape_html(row.county.as_deref().unwrap_or("-")),
            format_number(row.reservoir_count.map(|n| n as f64)),
            format_number(row.effective_storage),
            format_number(row.current_storage),
            format_number(row.current_storage_rate)
        );
    }
    out.push_str("</tbody>\n</table>\n</body>\n</html>\n");
    out
}

/// Percent-encoded `/?date=&sort=&dir=` link for a sort state.
fn page_href(date: &str, state: SortState) -> String {
    let Ok(mut url) = Url::parse("http://localhost/") else {
        return "/".to_string();
    };
    url.query_pairs_mut()
        .append_pair("date", date)
        .append_pair("sort", state.key.param())
        .append_pair("dir", state.dir_param());
    format!("/?{}", url.query().unwrap_or_default())
}

/// Render the page shown when the report could not be produced.
pub fn render_error_page(message: &str) -> String {
    let mut out = String::new();
    page_head(&mut out, "저수 현황 - 오류");
    let _ = write!(
        out,
        "<h1>저수 현황을 불러오지 못했습니다</h1>\n<p class=\"error\">{}</p>\n\
         <p><a href=\"/\">다시 시도</a></p>\n</body>\n</html>\n",
        escape_html(message)
    );
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
