use serde::{Deserialize, Serialize};

/// Main configuration structure for llms-export
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub export: ExportSettings,
    pub site: SiteConfig,
    pub artifact: ArtifactConfig,
    pub output: OutputConfig,
}

/// Export behavior settings
///
/// A clone of this struct is persisted inside the run state when a run
/// starts, so settings changed mid-run never affect in-flight processing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportSettings {
    /// Content kinds to export, in manifest section order
    #[serde(default = "default_kinds")]
    pub kinds: Vec<String>,

    /// Whether the host should regenerate automatically on content changes
    #[serde(rename = "auto-update", default = "default_true")]
    pub auto_update: bool,

    /// Use item excerpts as manifest link descriptions
    #[serde(rename = "include-excerpts", default = "default_true")]
    pub include_excerpts: bool,

    /// Prepend a metadata block (published date, author, kind) to each artifact
    #[serde(rename = "include-meta", default)]
    pub include_meta: bool,

    /// Append a taxonomy block to each artifact
    #[serde(rename = "include-taxonomies", default)]
    pub include_taxonomies: bool,

    /// Maximum items enumerated per kind (clamped to 1..=1000)
    #[serde(rename = "max-items-per-kind", default = "default_max_items")]
    pub max_items_per_kind: u32,

    /// Word cap for normalized artifact bodies
    #[serde(rename = "max-words", default = "default_max_words")]
    pub max_words: u32,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            kinds: default_kinds(),
            auto_update: true,
            include_excerpts: true,
            include_meta: false,
            include_taxonomies: false,
            max_items_per_kind: default_max_items(),
            max_words: default_max_words(),
        }
    }
}

/// Site identity used for the manifest header and the artifact namespace
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Manifest title
    pub title: String,

    /// Optional manifest description line
    #[serde(default)]
    pub description: Option<String>,

    /// Stable identifier distinguishing this site's namespace to the
    /// artifact store
    #[serde(rename = "tenant-id")]
    pub tenant_id: String,
}

/// Artifact store endpoint configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ArtifactConfig {
    /// Upload endpoint URL
    pub endpoint: String,

    /// Optional bearer token sent with every upload
    #[serde(rename = "bearer-token", default)]
    pub bearer_token: Option<String>,

    /// Per-request timeout in seconds (clamped to 1..=300)
    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Path the assembled manifest is written to
    #[serde(rename = "manifest-path")]
    pub manifest_path: String,
}

fn default_kinds() -> Vec<String> {
    vec!["post".to_string(), "page".to_string()]
}

fn default_true() -> bool {
    true
}

fn default_max_items() -> u32 {
    50
}

fn default_max_words() -> u32 {
    500
}

fn default_timeout_secs() -> u64 {
    30
}
