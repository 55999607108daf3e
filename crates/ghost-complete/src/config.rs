//! Configuration surface and persisted settings.

use crate::engine::EngineConfig;
use ghost_provider::{
    GeminiAdapter, OllamaAdapter, OpenAiAdapter, ProviderAdapter, DEFAULT_LOCAL_ENDPOINT,
};
use ghost_router::GenerationRouter;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

/// Serialized settings from ~/.ghost/config.json
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub fast_model: String,
    pub timeout_ms: u64,
    pub use_indexer: bool,
    pub max_context_symbols: usize,
    pub local_endpoint: String,
    pub openai_api_key: Option<String>,
    pub gemini_api_key: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fast_model: "qwen2.5-coder:1.5b".to_string(),
            timeout_ms: 80,
            use_indexer: true,
            max_context_symbols: 5,
            local_endpoint: DEFAULT_LOCAL_ENDPOINT.to_string(),
            openai_api_key: None,
            gemini_api_key: None,
        }
    }
}

impl Config {
    /// Engine view of the configuration.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            fast_model: self.fast_model.clone(),
            timeout_ms: self.timeout_ms,
            use_indexer: self.use_indexer,
            max_context_symbols: self.max_context_symbols,
            ..EngineConfig::default()
        }
    }

    /// Assemble the router from whatever backends are configured.
    ///
    /// The local daemon is always registered; whether it is actually up is
    /// the probe's call at generate time. Cloud adapters are registered only
    /// when a key is present (config file or environment).
    pub fn build_router(&self) -> GenerationRouter {
        let mut adapters: Vec<Arc<dyn ProviderAdapter>> =
            vec![Arc::new(OllamaAdapter::new(&self.local_endpoint))];

        if let Some(key) = self.resolved_key(&self.gemini_api_key, "GEMINI_API_KEY") {
            adapters.push(Arc::new(GeminiAdapter::new(key)));
        }
        if let Some(key) = self.resolved_key(&self.openai_api_key, "OPENAI_API_KEY") {
            adapters.push(Arc::new(OpenAiAdapter::new(key)));
        }

        GenerationRouter::new(adapters)
    }

    /// Whether any cloud backend is configured; when false the router is
    /// entirely at the mercy of the local daemon, worth one loud warning
    /// at startup.
    pub fn has_cloud_backend(&self) -> bool {
        self.resolved_key(&self.gemini_api_key, "GEMINI_API_KEY")
            .is_some()
            || self
                .resolved_key(&self.openai_api_key, "OPENAI_API_KEY")
                .is_some()
    }

    fn resolved_key(&self, configured: &Option<String>, env_var: &str) -> Option<String> {
        configured
            .clone()
            .filter(|k| !k.is_empty())
            .or_else(|| std::env::var(env_var).ok().filter(|k| !k.is_empty()))
    }
}

/// Helper struct for storing the location to read/write global settings
pub struct ConfigStore {
    path: PathBuf,
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore {
    pub fn new() -> Self {
        let mut path = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(".ghost");
        path.push("config.json");
        Self { path }
    }

    pub fn at(path: PathBuf) -> Self {
        Self { path }
    }

    /// Load the user's saved config, or fallback to Default
    pub fn load(&self) -> Config {
        if let Ok(content) = fs::read_to_string(&self.path) {
            if let Ok(config) = serde_json::from_str(&content) {
                return config;
            }
        }
        Config::default()
    }

    /// Save the user's config back to disk
    pub fn save(&self, config: &Config) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(config)?;
        fs::write(&self.path, content)
    }

    /// Export configured API keys to the process env when not already set.
    pub fn hydrate_env(&self) {
        let config = self.load();
        let pairs = [
            ("GEMINI_API_KEY", &config.gemini_api_key),
            ("OPENAI_API_KEY", &config.openai_api_key),
        ];
        for (env_var, key) in pairs {
            if let Some(key) = key {
                if !key.is_empty() && std::env::var(env_var).is_err() {
                    std::env::set_var(env_var, key);
                }
            }
        }
    }
}
