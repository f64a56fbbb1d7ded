//! Service configuration.
//!
//! Settings are resolved once at startup from three layers, lowest
//! precedence first: built-in defaults, an optional TOML file, and
//! overrides collected from the environment / command line.
//!
//! ```toml
//! [upstream]
//! base_url = "https://apis.data.go.kr/1741000/Reservoir/getReservoir"
//! num_of_rows = 10000
//! timeout_secs = 10
//!
//! [region]
//! prefix = "41"
//! province_name = "경기도"
//!
//! [server]
//! port = 8787
//! static_dir = "./static"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use crate::ingest::safetydata::{self, RegionFilter, UpstreamSettings};
use crate::logging::DataSource;
use crate::regions::{self, DEFAULT_REGION_PREFIX};

/// Config file read when no explicit path is given. Absence is not an error.
pub const DEFAULT_CONFIG_PATH: &str = "./reservoir_service.toml";

pub const DEFAULT_PORT: u16 = 8787;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

// ---------------------------------------------------------------------------
// File layer
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub upstream: UpstreamSection,
    pub region: RegionSection,
    pub server: ServerSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UpstreamSection {
    pub base_url: Option<String>,
    pub num_of_rows: Option<u32>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegionSection {
    pub prefix: Option<String>,
    pub province_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerSection {
    pub port: Option<u16>,
    pub static_dir: Option<PathBuf>,
}

impl FileConfig {
    pub fn from_toml_str(text: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load the config file. An explicit path must exist; the default path
    /// is optional.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let path = explicit.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_PATH));
        match fs::read_to_string(path) {
            Ok(text) => {
                info!(source = %DataSource::Config, path = %path.display(), "loaded config file");
                Self::from_toml_str(&text, path)
            }
            Err(e) if explicit.is_none() && e.kind() == std::io::ErrorKind::NotFound => {
                Ok(Self::default())
            }
            Err(source) => Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Environment / CLI layer
// ---------------------------------------------------------------------------

/// Values taken from the environment (`SAFETYDATA_SERVICE_KEY`, `PORT`,
/// `TARGET_DATE`, `GG_PREFIX`, `PROVINCE_NAME`, `STATIC_DIR`) or the
/// matching command-line flags.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub service_key: Option<String>,
    pub port: Option<u16>,
    pub target_date: Option<String>,
    pub region_prefix: Option<String>,
    pub province_name: Option<String>,
    pub static_dir: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Resolved settings
// ---------------------------------------------------------------------------

/// Immutable settings shared by every request.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub upstream: UpstreamSettings,
    pub region: RegionFilter,
    /// Date served when a request does not name one (`YYYY-MM-DD`).
    pub target_date: Option<String>,
    pub port: u16,
    pub static_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            upstream: UpstreamSettings::default(),
            region: RegionFilter::default(),
            target_date: None,
            port: DEFAULT_PORT,
            static_dir: None,
        }
    }
}

impl Settings {
    /// Read the config file (if any) and apply `overrides` on top.
    pub fn load(config_path: Option<&Path>, overrides: Overrides) -> Result<Self, ConfigError> {
        let file = FileConfig::load(config_path)?;
        Self::resolve(file, overrides)
    }

    pub fn resolve(file: FileConfig, overrides: Overrides) -> Result<Self, ConfigError> {
        let defaults = UpstreamSettings::default();

        let upstream = UpstreamSettings {
            base_url: file.upstream.base_url.unwrap_or(defaults.base_url),
            service_key: non_blank(overrides.service_key),
            num_of_rows: file.upstream.num_of_rows.unwrap_or(defaults.num_of_rows),
            timeout_secs: file.upstream.timeout_secs.unwrap_or(defaults.timeout_secs),
        };

        let prefix = non_blank(overrides.region_prefix)
            .or(non_blank(file.region.prefix))
            .unwrap_or_else(|| DEFAULT_REGION_PREFIX.to_string());

        let province_names = match non_blank(overrides.province_name)
            .or(non_blank(file.region.province_name))
        {
            Some(name) => vec![name],
            None => regions::province_names_for_prefix(&prefix),
        };

        let settings = Settings {
            upstream,
            region: RegionFilter::new(prefix, province_names),
            target_date: non_blank(overrides.target_date),
            port: overrides.port.or(file.server.port).unwrap_or(DEFAULT_PORT),
            static_dir: overrides.static_dir.or(file.server.static_dir),
        };
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.upstream.num_of_rows == 0 {
            return Err(ConfigError::Invalid("upstream.num_of_rows must be positive".into()));
        }
        if self.upstream.timeout_secs == 0 {
            return Err(ConfigError::Invalid("upstream.timeout_secs must be positive".into()));
        }
        reqwest::Url::parse(&self.upstream.base_url).map_err(|e| {
            ConfigError::Invalid(format!("upstream.base_url '{}': {}", self.upstream.base_url, e))
        })?;
        if let Some(date) = &self.target_date {
            safetydata::to_upstream_date(date)
                .map_err(|_| ConfigError::Invalid(format!("TARGET_DATE '{}' is not YYYY-MM-DD", date)))?;
        }
        Ok(())
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
