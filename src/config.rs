use std::path::PathBuf;

use directories::UserDirs;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::tools::websearch::Recency;

/// On-disk configuration, kept at `~/.weekendscout/config.toml`.
///
/// Every field has a default, so a partial (or missing) file works.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(skip)]
    pub config_path: PathBuf,
    #[serde(default = "default_city")]
    pub city: String,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub planner: PlannerConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub sources: SourcesConfig,
    #[serde(default)]
    pub executor: ExecutorConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_llm_provider")]
    pub provider: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    /// Provider endpoint override (Ollama host, OpenAI-compatible proxy).
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannerConfig {
    /// Repair rounds for plan generation.
    #[serde(default = "default_planner_retries")]
    pub max_retries: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Repair rounds per page during extraction.
    #[serde(default = "default_extraction_retries")]
    pub max_retries: u32,
    /// HTML handed to the model is cut at this many chars.
    #[serde(default = "default_max_page_chars")]
    pub max_page_chars: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_search_max_results")]
    pub max_results: usize,
    #[serde(default)]
    pub recency: Recency,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    #[serde(default = "default_fetch_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_crawl_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_crawl_delay_ms")]
    pub delay_ms: u64,
    /// Cap on how many search hits get crawled.
    #[serde(default = "default_crawl_max_pages")]
    pub max_pages: usize,
}

/// Listing pages the fetch tools download.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    #[serde(default = "default_sympla_url")]
    pub sympla: String,
    #[serde(default = "default_sesc_url")]
    pub sesc: String,
    #[serde(default = "default_eventim_url")]
    pub eventim: String,
    #[serde(default = "default_sao_paulo_secreto_url")]
    pub sao_paulo_secreto: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Hard wall-clock limit per plan step.
    #[serde(default = "default_step_timeout_secs")]
    pub step_timeout_secs: u64,
}

impl Config {
    /// Load `~/.weekendscout/config.toml`, writing defaults on first
    /// run, then overlay environment variables.
    pub fn load_or_init() -> Result<Self, ConfigError> {
        let home = UserDirs::new()
            .map(|dirs| dirs.home_dir().to_path_buf())
            .ok_or(ConfigError::NoHomeDir)?;
        let scout_dir = home.join(".weekendscout");
        let config_path = scout_dir.join("config.toml");

        if !scout_dir.exists() {
            std::fs::create_dir_all(&scout_dir)?;
        }

        let mut config = if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path)?;
            let mut config: Config = toml::from_str(&contents)?;
            config.config_path = config_path;
            config
        } else {
            let config = Self {
                config_path,
                ..Self::default()
            };
            config.save()?;
            config
        };

        config.apply_env_overlay();
        Ok(config)
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        let toml_str = toml::to_string_pretty(self)?;
        std::fs::write(&self.config_path, toml_str)?;
        Ok(())
    }

    /// Overlay `WEEKENDSCOUT_PROVIDER` / `WEEKENDSCOUT_MODEL` onto the
    /// loaded file. The file on disk is left as-is.
    pub fn apply_env_overlay(&mut self) {
        self.apply_env_overlay_with(|name| std::env::var(name).ok());
    }

    fn apply_env_overlay_with(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(provider) = var("WEEKENDSCOUT_PROVIDER").filter(|v| !v.trim().is_empty()) {
            self.llm.provider = provider.trim().to_string();
        }
        if let Some(model) = var("WEEKENDSCOUT_MODEL").filter(|v| !v.trim().is_empty()) {
            self.llm.model = model.trim().to_string();
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_path: PathBuf::new(),
            city: default_city(),
            llm: LlmConfig::default(),
            planner: PlannerConfig::default(),
            extraction: ExtractionConfig::default(),
            search: SearchConfig::default(),
            fetch: FetchConfig::default(),
            sources: SourcesConfig::default(),
            executor: ExecutorConfig::default(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            model: default_llm_model(),
            base_url: None,
            api_key: None,
            temperature: default_temperature(),
        }
    }
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            max_retries: default_planner_retries(),
        }
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            max_retries: default_extraction_retries(),
            max_page_chars: default_max_page_chars(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_results: default_search_max_results(),
            recency: Recency::default(),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_fetch_timeout_secs(),
            concurrency: default_crawl_concurrency(),
            delay_ms: default_crawl_delay_ms(),
            max_pages: default_crawl_max_pages(),
        }
    }
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            sympla: default_sympla_url(),
            sesc: default_sesc_url(),
            eventim: default_eventim_url(),
            sao_paulo_secreto: default_sao_paulo_secreto_url(),
        }
    }
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            step_timeout_secs: default_step_timeout_secs(),
        }
    }
}

fn default_city() -> String {
    "São Paulo".to_string()
}

fn default_llm_provider() -> String {
    "ollama".to_string()
}

fn default_llm_model() -> String {
    "llama3.1:8b-instruct".to_string()
}

fn default_temperature() -> f64 {
    0.2
}

fn default_planner_retries() -> u32 {
    2
}

fn default_extraction_retries() -> u32 {
    1
}

fn default_max_page_chars() -> usize {
    12_000
}

fn default_search_max_results() -> usize {
    12
}

fn default_fetch_timeout_secs() -> u64 {
    20
}

fn default_crawl_concurrency() -> usize {
    6
}

fn default_crawl_delay_ms() -> u64 {
    150
}

fn default_crawl_max_pages() -> usize {
    30
}

fn default_sympla_url() -> String {
    "https://www.sympla.com.br/eventos/sao-paulo-sp".to_string()
}

fn default_sesc_url() -> String {
    "https://www.sescsp.org.br/programacao/".to_string()
}

fn default_eventim_url() -> String {
    "https://www.eventim.com.br/city/sao-paulo-1/".to_string()
}

fn default_sao_paulo_secreto_url() -> String {
    "https://saopaulosecreto.com/o-que-fazer-fim-de-semana-sao-paulo/".to_string()
}

fn default_step_timeout_secs() -> u64 {
    120
}
