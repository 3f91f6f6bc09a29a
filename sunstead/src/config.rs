use serde::Deserialize;
use std::env;

fn parse_env_or<T: std::str::FromStr>(var: &str, default: T) -> T
where
    T::Err: std::fmt::Display,
{
    match env::var(var) {
        Ok(val) => match val.parse() {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("Invalid value '{}' for {}: {}. Using default.", val, var, e);
                default
            }
        },
        Err(_) => default,
    }
}

/// Parse a comma-separated env var into a list, trimming blanks.
fn parse_env_list(var: &str) -> Vec<String> {
    match env::var(var) {
        Ok(val) if !val.trim().is_empty() => val
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        _ => Vec::new(),
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub cache: CacheConfig,
    pub embeddings: EmbeddingsConfig,
    pub llm: Option<LlmConfig>,
    pub drive: DriveConfig,
    pub telemetry: TelemetryConfig,
    pub context: ContextConfig,
    pub research: Option<ResearchConfig>,
    pub agents: AgentsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub auth_token: Option<String>,
    pub local_path: Option<String>,
}

/// Bundle cache settings. No `url` means the cache runs permanently in
/// passthrough mode; correctness never depends on it.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    pub url: Option<String>,
    pub bundle_ttl_secs: u64,
    pub probe_interval_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingsConfig {
    pub model: String,
    pub dimensions: usize,
    pub batch_size: usize,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub hourly_quota: u32,
}

/// LLM configuration for the reasoner agents. Absent when no model is
/// configured; the manager then answers from context without delegation.
#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    pub model: String,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

/// Document source (Drive-style tree) settings for the KB sync pipeline.
#[derive(Debug, Clone, Deserialize)]
pub struct DriveConfig {
    pub base_url: String,
    pub api_token: Option<String>,
    pub root_folder_id: String,
    /// Names matching any of these substrings are skipped during enumeration.
    pub ignore_patterns: Vec<String>,
    /// Folder prefix whose documents become tier-1 context files.
    pub context_folder: String,
    pub chunk_tokens: i64,
    pub max_document_tokens: i64,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    pub poll_interval_secs: u64,
    pub health_interval_secs: u64,
    pub inverter_url: Option<String>,
    pub battery_url: Option<String>,
    pub battery_api_key: Option<String>,
    pub battery_hourly_quota: u32,
    pub retention_hours: i64,
    pub min_points_for_analytics: u64,
    pub max_consecutive_failures: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContextConfig {
    /// Messages of recent conversation pulled into a bundle.
    pub conversation_window: u32,
    pub kb_top_k_research: u32,
    pub kb_top_k_planning: u32,
}

/// Web-search and URL-extract collaborators used by the research agent.
#[derive(Debug, Clone, Deserialize)]
pub struct ResearchConfig {
    pub search_base_url: String,
    pub search_api_key: Option<String>,
    pub extract_base_url: Option<String>,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AgentsConfig {
    pub max_iterations: u32,
    pub manager_max_iterations: u32,
    /// Extra fast-path keywords appended to the built-in set.
    pub extra_fastpath_keywords: Vec<String>,
    pub reasoner_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: env::var("SUNSTEAD_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: parse_env_or("SUNSTEAD_PORT", 8000),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").unwrap_or_else(|_| "file:sunstead.db".to_string()),
                auth_token: env::var("DATABASE_AUTH_TOKEN").ok(),
                local_path: env::var("DATABASE_LOCAL_PATH").ok(),
            },
            cache: CacheConfig {
                url: env::var("REDIS_URL").ok(),
                bundle_ttl_secs: parse_env_or("CONTEXT_CACHE_TTL_SECS", 300),
                probe_interval_secs: parse_env_or("CACHE_PROBE_INTERVAL_SECS", 30),
            },
            embeddings: EmbeddingsConfig {
                model: env::var("EMBEDDING_MODEL")
                    .unwrap_or_else(|_| "BAAI/bge-small-en-v1.5".to_string()),
                dimensions: parse_env_or("EMBEDDING_DIMENSIONS", 384),
                batch_size: parse_env_or("EMBEDDING_BATCH_SIZE", 64),
                api_key: env::var("EMBEDDING_API_KEY").ok(),
                base_url: env::var("EMBEDDING_BASE_URL").ok(),
                timeout_secs: parse_env_or("EMBEDDING_TIMEOUT", 30),
                max_retries: parse_env_or("EMBEDDING_MAX_RETRIES", 3),
                hourly_quota: parse_env_or("EMBEDDING_HOURLY_QUOTA", 3000),
            },
            llm: env::var("LLM_MODEL").ok().map(|model| LlmConfig {
                model,
                api_key: env::var("LLM_API_KEY").ok(),
                base_url: env::var("LLM_BASE_URL").ok(),
                timeout_secs: parse_env_or("LLM_TIMEOUT", 30),
                max_retries: parse_env_or("LLM_MAX_RETRIES", 3),
            }),
            drive: DriveConfig {
                base_url: env::var("DRIVE_BASE_URL")
                    .unwrap_or_else(|_| "https://www.googleapis.com/drive/v3".to_string()),
                api_token: env::var("DRIVE_API_TOKEN").ok(),
                root_folder_id: env::var("DRIVE_ROOT_FOLDER").unwrap_or_else(|_| "root".to_string()),
                ignore_patterns: {
                    let mut patterns = vec![
                        "~$".to_string(),
                        ".tmp".to_string(),
                        "archive/".to_string(),
                    ];
                    patterns.extend(parse_env_list("DRIVE_IGNORE_PATTERNS"));
                    patterns
                },
                context_folder: env::var("DRIVE_CONTEXT_FOLDER")
                    .unwrap_or_else(|_| "context".to_string()),
                chunk_tokens: parse_env_or("KB_CHUNK_TOKENS", 512),
                max_document_tokens: parse_env_or("KB_MAX_DOCUMENT_TOKENS", 50_000),
                timeout_secs: parse_env_or("DRIVE_TIMEOUT", 60),
            },
            telemetry: TelemetryConfig {
                poll_interval_secs: parse_env_or("TELEMETRY_POLL_INTERVAL_SECS", 180),
                health_interval_secs: parse_env_or("HEALTH_INTERVAL_SECS", 300),
                inverter_url: env::var("INVERTER_URL").ok(),
                battery_url: env::var("BATTERY_MONITOR_URL").ok(),
                battery_api_key: env::var("BATTERY_MONITOR_API_KEY").ok(),
                battery_hourly_quota: parse_env_or("BATTERY_MONITOR_HOURLY_QUOTA", 20),
                retention_hours: parse_env_or("TELEMETRY_RETENTION_HOURS", 72).max(72),
                min_points_for_analytics: parse_env_or("TELEMETRY_MIN_POINTS", 100),
                max_consecutive_failures: parse_env_or("POLLER_MAX_CONSECUTIVE_FAILURES", 10),
            },
            context: ContextConfig {
                conversation_window: parse_env_or("CONTEXT_CONVERSATION_WINDOW", 6),
                kb_top_k_research: parse_env_or("CONTEXT_KB_TOP_K_RESEARCH", 5),
                kb_top_k_planning: parse_env_or("CONTEXT_KB_TOP_K_PLANNING", 3),
            },
            research: env::var("SEARCH_BASE_URL").ok().map(|search_base_url| {
                ResearchConfig {
                    search_base_url,
                    search_api_key: env::var("SEARCH_API_KEY").ok(),
                    extract_base_url: env::var("EXTRACT_BASE_URL").ok(),
                    timeout_secs: parse_env_or("SEARCH_TIMEOUT", 20),
                }
            }),
            agents: AgentsConfig {
                max_iterations: parse_env_or("AGENT_MAX_ITERATIONS", 10),
                manager_max_iterations: parse_env_or("MANAGER_MAX_ITERATIONS", 3),
                extra_fastpath_keywords: parse_env_list("SUNSTEAD_FASTPATH_KEYWORDS"),
                reasoner_timeout_secs: parse_env_or("AGENT_TIMEOUT_SECS", 90),
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::default()
    }
}

/// Known embedding providers that use OpenAI-compatible APIs.
const KNOWN_PROVIDERS: &[&str] = &["openai", "openrouter", "ollama", "lmstudio", "local"];

/// Parse a model name into (provider, model) tuple.
pub fn parse_provider_model(model: &str) -> (&str, &str) {
    if let Some((prefix, rest)) = model.split_once('/') {
        let prefix_lower = prefix.to_lowercase();
        if KNOWN_PROVIDERS.contains(&prefix_lower.as_str()) {
            return (prefix, rest);
        }
    }
    // Default to local provider
    ("local", model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn defaults_without_env() {
        env::remove_var("SUNSTEAD_PORT");
        env::remove_var("LLM_MODEL");
        env::remove_var("REDIS_URL");
        env::remove_var("SEARCH_BASE_URL");

        let config = Config::from_env();
        assert_eq!(config.server.port, 8000);
        assert!(config.llm.is_none());
        assert!(config.cache.url.is_none());
        assert!(config.research.is_none());
        assert_eq!(config.telemetry.poll_interval_secs, 180);
        assert_eq!(config.telemetry.health_interval_secs, 300);
        assert_eq!(config.cache.bundle_ttl_secs, 300);
        assert_eq!(config.drive.chunk_tokens, 512);
    }

    #[test]
    #[serial]
    fn llm_config_from_env() {
        env::set_var("LLM_MODEL", "openai/gpt-4o-mini");
        env::set_var("LLM_TIMEOUT", "12");

        let config = Config::from_env();
        let llm = config.llm.expect("LLM should be configured");
        assert_eq!(llm.model, "openai/gpt-4o-mini");
        assert_eq!(llm.timeout_secs, 12);

        env::remove_var("LLM_MODEL");
        env::remove_var("LLM_TIMEOUT");
    }

    #[test]
    #[serial]
    fn retention_never_below_72_hours() {
        env::set_var("TELEMETRY_RETENTION_HOURS", "24");
        let config = Config::from_env();
        assert_eq!(config.telemetry.retention_hours, 72);
        env::remove_var("TELEMETRY_RETENTION_HOURS");
    }

    #[test]
    #[serial]
    fn fastpath_keywords_from_env() {
        env::set_var("SUNSTEAD_FASTPATH_KEYWORDS", "datasheet, wiring diagram");
        let config = Config::from_env();
        assert_eq!(
            config.agents.extra_fastpath_keywords,
            vec!["datasheet".to_string(), "wiring diagram".to_string()]
        );
        env::remove_var("SUNSTEAD_FASTPATH_KEYWORDS");
    }

    #[test]
    #[serial]
    fn invalid_numeric_env_falls_back() {
        env::set_var("SUNSTEAD_PORT", "not-a-port");
        let config = Config::from_env();
        assert_eq!(config.server.port, 8000);
        env::remove_var("SUNSTEAD_PORT");
    }

    #[test]
    fn parse_provider_model_splits_known_prefixes() {
        assert_eq!(
            parse_provider_model("openai/text-embedding-3-small"),
            ("openai", "text-embedding-3-small")
        );
        assert_eq!(
            parse_provider_model("BAAI/bge-small-en-v1.5"),
            ("local", "BAAI/bge-small-en-v1.5")
        );
    }
}
