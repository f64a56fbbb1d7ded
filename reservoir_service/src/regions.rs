//! Region registry for the reservoir storage proxy.
//!
//! Defines the first-level administrative regions (시도) of South Korea,
//! keyed by the two-digit prefix that every county-level region code in
//! the SafetyData feed starts with. Province names have changed over the
//! years (강원도 → 강원특별자치도, 전라북도 → 전북특별자치도), so each entry
//! lists every name the upstream data may carry.

// ---------------------------------------------------------------------------
// Region metadata
// ---------------------------------------------------------------------------

/// Prefix used when `GG_PREFIX` is not configured (경기도).
pub const DEFAULT_REGION_PREFIX: &str = "41";

/// Metadata for a single province-level region.
pub struct Region {
    /// Leading digits of the region code (legal-dong code, first two digits).
    pub code_prefix: &'static str,
    /// Current official name.
    pub name: &'static str,
    /// Names the upstream `sido` / `ctprvnNm` fields may contain.
    /// The official name is always listed first.
    pub name_variants: &'static [&'static str],
}

/// All first-level regions. Where a province was re-chartered both the old
/// and new code prefixes are listed, since upstream rows are not always
/// re-coded at the same time.
pub static REGION_REGISTRY: &[Region] = &[
    Region { code_prefix: "11", name: "서울특별시", name_variants: &["서울특별시"] },
    Region { code_prefix: "26", name: "부산광역시", name_variants: &["부산광역시"] },
    Region { code_prefix: "27", name: "대구광역시", name_variants: &["대구광역시"] },
    Region { code_prefix: "28", name: "인천광역시", name_variants: &["인천광역시"] },
    Region { code_prefix: "29", name: "광주광역시", name_variants: &["광주광역시"] },
    Region { code_prefix: "30", name: "대전광역시", name_variants: &["대전광역시"] },
    Region { code_prefix: "31", name: "울산광역시", name_variants: &["울산광역시"] },
    Region { code_prefix: "36", name: "세종특별자치시", name_variants: &["세종특별자치시"] },
    Region { code_prefix: "41", name: "경기도", name_variants: &["경기도"] },
    Region {
        code_prefix: "42",
        name: "강원도",
        name_variants: &["강원도", "강원특별자치도"],
    },
    Region { code_prefix: "43", name: "충청북도", name_variants: &["충청북도"] },
    Region { code_prefix: "44", name: "충청남도", name_variants: &["충청남도"] },
    Region {
        code_prefix: "45",
        name: "전라북도",
        name_variants: &["전라북도", "전북특별자치도"],
    },
    Region { code_prefix: "46", name: "전라남도", name_variants: &["전라남도"] },
    Region { code_prefix: "47", name: "경상북도", name_variants: &["경상북도"] },
    Region { code_prefix: "48", name: "경상남도", name_variants: &["경상남도"] },
    Region { code_prefix: "50", name: "제주특별자치도", name_variants: &["제주특별자치도", "제주도"] },
    Region {
        code_prefix: "51",
        name: "강원특별자치도",
        name_variants: &["강원특별자치도", "강원도"],
    },
    Region {
        code_prefix: "52",
        name: "전북특별자치도",
        name_variants: &["전북특별자치도", "전라북도"],
    },
];

/// Looks up a region by its code prefix. Returns `None` if not found.
pub fn find_region(code_prefix: &str) -> Option<&'static Region> {
    REGION_REGISTRY.iter().find(|r| r.code_prefix == code_prefix)
}

/// Province names to match for a prefix. Empty for an unknown prefix, in
/// which case filtering falls back to the region code alone.
pub fn province_names_for_prefix(code_prefix: &str) -> Vec<String> {
    find_region(code_prefix)
        .map(|r| r.name_variants.iter().map(|n| n.to_string()).collect())
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
