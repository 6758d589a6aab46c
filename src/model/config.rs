use serde::{Deserialize, Serialize};

/// Configuration from taskboard.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BoardConfig {
    #[serde(default)]
    pub paging: PagingConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PagingConfig {
    /// Tasks per page
    #[serde(default = "default_page_size")]
    pub items_per_page: usize,
    /// Tasks shown on a page before "load more" reveals the rest
    #[serde(default = "default_page_size")]
    pub initial_display_count: usize,
}

impl Default for PagingConfig {
    fn default() -> Self {
        PagingConfig {
            items_per_page: default_page_size(),
            initial_display_count: default_page_size(),
        }
    }
}

impl PagingConfig {
    /// Zero-sized pages make no sense; clamp both counts to at least 1.
    pub fn normalized(self) -> Self {
        PagingConfig {
            items_per_page: self.items_per_page.max(1),
            initial_display_count: self.initial_display_count.max(1),
        }
    }
}

fn default_page_size() -> usize {
    3
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Base URL of the hosted data service
    #[serde(default)]
    pub url: String,
    /// Public API key sent with every request
    #[serde(default)]
    pub api_key: String,
    /// Bearer token for the signed-in user
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default = "default_table")]
    pub table: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            url: String::new(),
            api_key: String::new(),
            access_token: None,
            table: default_table(),
        }
    }
}

fn default_table() -> String {
    "tasks".to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}
