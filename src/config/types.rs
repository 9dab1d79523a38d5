use serde::Deserialize;

/// Main configuration structure for Hadith-Harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub harvest: HarvestConfig,
    #[serde(default)]
    pub selectors: SelectorConfig,
    pub store: StoreConfig,
    #[serde(default)]
    pub browser: BrowserConfig,
}

/// Where the harvest starts and which collection it fills
#[derive(Debug, Clone, Deserialize)]
pub struct HarvestConfig {
    /// First listing page of the collection
    pub entrypoint: String,

    /// Book id stamped on every record of this session
    #[serde(rename = "book-id")]
    pub book_id: i32,

    /// How long to wait for the listing panels to appear (milliseconds)
    #[serde(rename = "selector-timeout-ms", default = "default_selector_timeout_ms")]
    pub selector_timeout_ms: u64,
}

/// CSS selectors describing the listing markup
#[derive(Debug, Clone, Deserialize)]
pub struct SelectorConfig {
    /// One element per hadith
    #[serde(default = "default_panel_selector")]
    pub panel: String,

    /// Header holding the hadith number, searched inside a panel
    #[serde(default = "default_header_selector")]
    pub header: String,

    /// Arabic paragraph, searched inside a panel
    #[serde(default = "default_arabic_selector")]
    pub arabic: String,

    /// Translation paragraph, searched inside a panel
    #[serde(default = "default_translation_selector")]
    pub translation: String,

    /// Anchor leading to the next listing page
    #[serde(default = "default_next_selector")]
    pub next: String,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            panel: default_panel_selector(),
            header: default_header_selector(),
            arabic: default_arabic_selector(),
            translation: default_translation_selector(),
            next: default_next_selector(),
        }
    }
}

/// Which relational store receives the records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Postgres,
    Sqlite,
}

/// Relational store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_backend")]
    pub backend: StoreBackend,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Database name (postgres) or database file path (sqlite)
    pub database: String,

    #[serde(default)]
    pub user: String,

    #[serde(default)]
    pub password: String,

    /// Target table, optionally schema-qualified
    #[serde(default = "default_table")]
    pub table: String,

    /// Upper bound on pooled connections (postgres only)
    #[serde(rename = "max-connections", default = "default_max_connections")]
    pub max_connections: u32,
}

/// Headless browser configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BrowserConfig {
    #[serde(default = "default_headless")]
    pub headless: bool,

    /// Path to a Chrome/Chromium binary; autodetected when absent
    #[serde(default)]
    pub executable: Option<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: default_headless(),
            executable: None,
        }
    }
}

fn default_selector_timeout_ms() -> u64 {
    30_000
}

fn default_panel_selector() -> String {
    ".row>.panel.panel-default".to_string()
}

fn default_header_selector() -> String {
    ".title-header".to_string()
}

fn default_arabic_selector() -> String {
    "p.arabic".to_string()
}

fn default_translation_selector() -> String {
    "p:not(.arabic)".to_string()
}

fn default_next_selector() -> String {
    r#"a[rel="next"]"#.to_string()
}

fn default_backend() -> StoreBackend {
    StoreBackend::Postgres
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    5432
}

fn default_table() -> String {
    "hadiths".to_string()
}

fn default_max_connections() -> u32 {
    1
}

fn default_headless() -> bool {
    true
}
