use std::str::FromStr;

use crate::app_config::{
    AppConfig, Environment, PipelineConfig, QualityFilterConfig, ReuseConfig, ServiceToggles,
};
use crate::weights::ScoringWeights;
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is malformed or the scoring weights are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a value is malformed or the scoring weights are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so it can be tested with a plain
/// `HashMap` lookup.
#[allow(clippy::too_many_lines)]
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let optional =
        |var: &str| -> Option<String> { lookup(var).ok().filter(|v| !v.trim().is_empty()) };

    let or_default = |var: &str, default: &str| -> String {
        optional(var).unwrap_or_else(|| default.to_string())
    };

    let parse_bool = |var: &str, default: bool| -> Result<bool, ConfigError> {
        match optional(var) {
            None => Ok(default),
            Some(raw) => parse_flag(var, &raw),
        }
    };

    let defaults = PipelineConfig::default();

    let database_url = optional("DATABASE_URL");
    let env = parse_environment(&or_default("OPPDB_ENV", "development"))?;
    let log_level = or_default("OPPDB_LOG_LEVEL", "info");

    let db_max_connections = parse_num::<u32>(
        "OPPDB_DB_MAX_CONNECTIONS",
        &or_default("OPPDB_DB_MAX_CONNECTIONS", "10"),
    )?;
    let db_min_connections = parse_num::<u32>(
        "OPPDB_DB_MIN_CONNECTIONS",
        &or_default("OPPDB_DB_MIN_CONNECTIONS", "1"),
    )?;
    let db_acquire_timeout_secs = parse_num::<u64>(
        "OPPDB_DB_ACQUIRE_TIMEOUT_SECS",
        &or_default("OPPDB_DB_ACQUIRE_TIMEOUT_SECS", "10"),
    )?;

    let llm_api_url = or_default("OPPDB_LLM_API_URL", "https://openrouter.ai/api/v1");
    let llm_api_key = optional("OPPDB_LLM_API_KEY");
    let llm_model = or_default("OPPDB_LLM_MODEL", "anthropic/claude-3.5-haiku");
    let llm_timeout_secs =
        parse_num::<u64>("OPPDB_LLM_TIMEOUT_SECS", &or_default("OPPDB_LLM_TIMEOUT_SECS", "60"))?;
    let llm_max_retries =
        parse_num::<u32>("OPPDB_LLM_MAX_RETRIES", &or_default("OPPDB_LLM_MAX_RETRIES", "2"))?;

    let reddit_client_id = optional("REDDIT_CLIENT_ID");
    let reddit_client_secret = optional("REDDIT_CLIENT_SECRET");
    let reddit_user_agent = optional("REDDIT_USER_AGENT");

    let subreddits = match optional("OPPDB_SUBREDDITS") {
        Some(raw) => parse_list(&raw),
        None => defaults.subreddits.clone(),
    };
    let batch_limit =
        parse_num::<usize>("OPPDB_BATCH_LIMIT", &or_default("OPPDB_BATCH_LIMIT", "100"))?;
    let concurrency =
        parse_num::<usize>("OPPDB_CONCURRENCY", &or_default("OPPDB_CONCURRENCY", "4"))?.max(1);
    let deadline_secs = optional("OPPDB_DEADLINE_SECS")
        .map(|raw| parse_num::<u64>("OPPDB_DEADLINE_SECS", &raw))
        .transpose()?;
    let cost_per_analysis_usd = parse_num::<f64>(
        "OPPDB_COST_PER_ANALYSIS_USD",
        &or_default("OPPDB_COST_PER_ANALYSIS_USD", "0.005"),
    )?;
    if !cost_per_analysis_usd.is_finite() || cost_per_analysis_usd < 0.0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "OPPDB_COST_PER_ANALYSIS_USD".to_string(),
            reason: "must be a non-negative number".to_string(),
        });
    }
    let return_data = parse_bool("OPPDB_RETURN_DATA", false)?;

    let quality = QualityFilterConfig {
        enabled: parse_bool("OPPDB_QUALITY_FILTER_ENABLED", defaults.quality.enabled)?,
        min_score: parse_num::<i64>("OPPDB_MIN_SCORE", &or_default("OPPDB_MIN_SCORE", "5"))?,
        min_comment_count: parse_num::<i64>(
            "OPPDB_MIN_COMMENT_COUNT",
            &or_default("OPPDB_MIN_COMMENT_COUNT", "3"),
        )?,
        min_text_length: parse_num::<usize>(
            "OPPDB_MIN_TEXT_LENGTH",
            &or_default("OPPDB_MIN_TEXT_LENGTH", "50"),
        )?,
    };

    let services = ServiceToggles {
        profiler: parse_bool("OPPDB_ENABLE_PROFILER", defaults.services.profiler)?,
        opportunity_scoring: parse_bool(
            "OPPDB_ENABLE_OPPORTUNITY_SCORING",
            defaults.services.opportunity_scoring,
        )?,
        monetization: parse_bool("OPPDB_ENABLE_MONETIZATION", defaults.services.monetization)?,
        trust: parse_bool("OPPDB_ENABLE_TRUST", defaults.services.trust)?,
        market_validation: parse_bool(
            "OPPDB_ENABLE_MARKET_VALIDATION",
            defaults.services.market_validation,
        )?,
    };

    let reuse = ReuseConfig {
        enabled: parse_bool("OPPDB_DEDUP_ENABLED", defaults.reuse.enabled)?,
        monetization: parse_bool("OPPDB_REUSE_MONETIZATION", defaults.reuse.monetization)?,
        profile: parse_bool("OPPDB_REUSE_PROFILE", defaults.reuse.profile)?,
    };

    let weights = match optional("OPPDB_SCORING_WEIGHTS") {
        Some(raw) => ScoringWeights::parse("OPPDB_SCORING_WEIGHTS", &raw)?,
        None => ScoringWeights::CANONICAL,
    };

    Ok(AppConfig {
        database_url,
        env,
        log_level,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        llm_api_url,
        llm_api_key,
        llm_model,
        llm_timeout_secs,
        llm_max_retries,
        reddit_client_id,
        reddit_client_secret,
        reddit_user_agent,
        pipeline: PipelineConfig {
            subreddits,
            batch_limit,
            concurrency,
            deadline_secs,
            cost_per_analysis_usd,
            return_data,
            dry_run: false,
            quality,
            services,
            reuse,
            weights,
        },
    })
}

fn parse_num<T>(var: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
}

fn parse_flag(var: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        other => Err(ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: format!("expected a boolean, got '{other}'"),
        }),
    }
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "OPPDB_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
