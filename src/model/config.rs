use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const SCHEMA_VERSION: &str = "0.2.0";

/// Project settings from `config.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_schema_version")]
    pub schema_version: String,

    // --- Slugs ---
    #[serde(default = "default_slug_max_length")]
    pub slug_max_length: usize,
    /// Characters matching this pattern are collapsed into a single hyphen
    #[serde(default = "default_slug_regex_pattern")]
    pub slug_regex_pattern: String,
    /// Maximum number of words kept before slugging (0 = no limit)
    #[serde(default = "default_slug_word_limit")]
    pub slug_word_limit: usize,
    #[serde(default = "default_slug_filler_words")]
    pub slug_filler_words: Vec<String>,

    // --- Dates ---
    /// strftime formats tried in order
    #[serde(default = "default_date_formats")]
    pub date_formats: Vec<String>,
    #[serde(default = "default_date_max_years_future")]
    pub date_max_years_future: u32,
    #[serde(default = "default_date_max_years_past")]
    pub date_max_years_past: u32,

    // --- Display ---
    #[serde(default = "default_status_header_width")]
    pub status_header_width: usize,
    #[serde(default = "default_percentage_round_precision")]
    pub percentage_round_precision: u32,

    // --- Orphans ---
    #[serde(default = "default_orphan_name_regex")]
    pub orphan_name_regex: String,
    #[serde(default)]
    pub orphan_default_priority: i64,
    #[serde(default = "default_orphan_priority_min")]
    pub orphan_priority_min: i64,
    #[serde(default = "default_orphan_priority_max")]
    pub orphan_priority_max: i64,
    #[serde(default = "default_orphan_priority_labels")]
    pub orphan_priority_labels: BTreeMap<String, i64>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            schema_version: default_schema_version(),
            slug_max_length: default_slug_max_length(),
            slug_regex_pattern: default_slug_regex_pattern(),
            slug_word_limit: default_slug_word_limit(),
            slug_filler_words: default_slug_filler_words(),
            date_formats: default_date_formats(),
            date_max_years_future: default_date_max_years_future(),
            date_max_years_past: default_date_max_years_past(),
            status_header_width: default_status_header_width(),
            percentage_round_precision: default_percentage_round_precision(),
            orphan_name_regex: default_orphan_name_regex(),
            orphan_default_priority: 0,
            orphan_priority_min: default_orphan_priority_min(),
            orphan_priority_max: default_orphan_priority_max(),
            orphan_priority_labels: default_orphan_priority_labels(),
        }
    }
}

fn default_schema_version() -> String {
    SCHEMA_VERSION.to_string()
}

fn default_slug_max_length() -> usize {
    15
}

fn default_slug_regex_pattern() -> String {
    "[^a-z0-9]+".to_string()
}

fn default_slug_word_limit() -> usize {
    3
}

fn default_slug_filler_words() -> Vec<String> {
    [
        "a", "an", "and", "as", "at", "by", "for", "from", "if", "in", "into", "of", "on", "or",
        "the", "to", "with",
    ]
    .iter()
    .map(|w| w.to_string())
    .collect()
}

fn default_date_formats() -> Vec<String> {
    [
        "%Y-%m-%d",
        "%Y/%m/%d",
        "%d-%m-%Y",
        "%d/%m/%Y",
        "%m-%d-%Y",
        "%m/%d/%Y",
        "%Y%m%d",
        "%d %B %Y",
        "%d %b %Y",
        "%B %d, %Y",
        "%b %d, %Y",
    ]
    .iter()
    .map(|f| f.to_string())
    .collect()
}

fn default_date_max_years_future() -> u32 {
    10
}

fn default_date_max_years_past() -> u32 {
    1
}

fn default_status_header_width() -> usize {
    25
}

fn default_percentage_round_precision() -> u32 {
    1
}

fn default_orphan_name_regex() -> String {
    r#"^[a-zA-Z0-9\s\-_'"]+$"#.to_string()
}

fn default_orphan_priority_min() -> i64 {
    -100
}

fn default_orphan_priority_max() -> i64 {
    100
}

fn default_orphan_priority_labels() -> BTreeMap<String, i64> {
    BTreeMap::from([
        ("low".to_string(), -10),
        ("medium".to_string(), 0),
        ("high".to_string(), 10),
        ("critical".to_string(), 50),
    ])
}
