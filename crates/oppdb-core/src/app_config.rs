use crate::weights::ScoringWeights;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Thresholds applied before any paid analysis runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualityFilterConfig {
    pub enabled: bool,
    pub min_score: i64,
    pub min_comment_count: i64,
    pub min_text_length: usize,
}

impl Default for QualityFilterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_score: 5,
            min_comment_count: 3,
            min_text_length: 50,
        }
    }
}

/// Which analysis services the factory should construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct ServiceToggles {
    pub profiler: bool,
    pub opportunity_scoring: bool,
    pub monetization: bool,
    pub trust: bool,
    pub market_validation: bool,
}

impl Default for ServiceToggles {
    fn default() -> Self {
        Self {
            profiler: true,
            opportunity_scoring: true,
            monetization: true,
            trust: true,
            market_validation: false,
        }
    }
}

/// Evidence-reuse switches. `enabled = false` disables concept lookup entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReuseConfig {
    pub enabled: bool,
    pub monetization: bool,
    pub profile: bool,
}

impl Default for ReuseConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            monetization: true,
            profile: true,
        }
    }
}

/// Settings for one enrichment run.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub subreddits: Vec<String>,
    pub batch_limit: usize,
    pub concurrency: usize,
    pub deadline_secs: Option<u64>,
    pub cost_per_analysis_usd: f64,
    pub return_data: bool,
    pub dry_run: bool,
    pub quality: QualityFilterConfig,
    pub services: ServiceToggles,
    pub reuse: ReuseConfig,
    pub weights: ScoringWeights,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            subreddits: vec![
                "SaaS".to_string(),
                "smallbusiness".to_string(),
                "Entrepreneur".to_string(),
            ],
            batch_limit: 100,
            concurrency: 4,
            deadline_secs: None,
            cost_per_analysis_usd: 0.005,
            return_data: false,
            dry_run: false,
            quality: QualityFilterConfig::default(),
            services: ServiceToggles::default(),
            reuse: ReuseConfig::default(),
            weights: ScoringWeights::CANONICAL,
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: Option<String>,
    pub env: Environment,
    pub log_level: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub llm_api_url: String,
    pub llm_api_key: Option<String>,
    pub llm_model: String,
    pub llm_timeout_secs: u64,
    pub llm_max_retries: u32,
    pub reddit_client_id: Option<String>,
    pub reddit_client_secret: Option<String>,
    pub reddit_user_agent: Option<String>,
    pub pipeline: PipelineConfig,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field(
                "database_url",
                &self.database_url.as_ref().map(|_| "[redacted]"),
            )
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("llm_api_url", &self.llm_api_url)
            .field("llm_api_key", &self.llm_api_key.as_ref().map(|_| "[redacted]"))
            .field("llm_model", &self.llm_model)
            .field("llm_timeout_secs", &self.llm_timeout_secs)
            .field("llm_max_retries", &self.llm_max_retries)
            .field("reddit_client_id", &self.reddit_client_id)
            .field(
                "reddit_client_secret",
                &self.reddit_client_secret.as_ref().map(|_| "[redacted]"),
            )
            .field("reddit_user_agent", &self.reddit_user_agent)
            .field("pipeline", &self.pipeline)
            .finish()
    }
}
