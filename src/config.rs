use serde::Deserialize;

/// Orchestrator configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Base URL of the myVOD REST API (without trailing slash)
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Bearer token forwarded on every gateway request
    #[serde(default)]
    pub api_token: Option<String>,

    /// Maximum number of movies a selection flow may hold at once
    #[serde(default = "default_max_selected")]
    pub max_selected: usize,

    /// Per-request timeout for the HTTP gateway
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Queries shorter than this never reach the search endpoint
    #[serde(default = "default_search_min_chars")]
    pub search_min_chars: usize,
}

fn default_api_base_url() -> String {
    "http://localhost:8000/api".to_string()
}

fn default_max_selected() -> usize {
    3
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_search_min_chars() -> usize {
    2
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            api_token: None,
            max_selected: default_max_selected(),
            request_timeout_secs: default_request_timeout_secs(),
            search_min_chars: default_search_min_chars(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_iter(std::env::vars())
    }

    /// Load configuration from an explicit set of key/value pairs
    pub fn from_iter<I>(vars: I) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let config = envy::from_iter::<_, Config>(vars)
            .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

        if config.max_selected == 0 {
            anyhow::bail!("Failed to load config: max_selected must be at least 1");
        }

        Ok(config)
    }
}
