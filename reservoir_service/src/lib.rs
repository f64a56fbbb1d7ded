//! Reservoir storage proxy.
//!
//! Fetches the daily county-level reservoir storage table from the
//! SafetyData OpenAPI, keeps the rows of one province, reshapes them into a
//! small JSON contract and serves them as JSON and as a sortable HTML table.

pub mod config;
pub mod ingest;
pub mod logging;
pub mod model;
pub mod regions;
pub mod server;
pub mod view;
