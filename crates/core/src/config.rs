use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub memory: MemoryConfig,
    pub retrieval: RetrievalConfig,
    pub server: ServerConfig,
    pub capture: CaptureConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub api_key: Option<SecretString>,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

#[derive(Clone, Debug)]
pub struct MemoryConfig {
    pub max_sessions: usize,
    pub session_timeout_secs: u64,
    pub max_turns: usize,
}

#[derive(Clone, Debug)]
pub struct RetrievalConfig {
    pub knowledge_path: PathBuf,
    pub top_k: usize,
    pub chunk_size: usize,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct CaptureConfig {
    pub webhook_url: Option<String>,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub llm_api_key: Option<String>,
    pub llm_model: Option<String>,
    pub max_sessions: Option<usize>,
    pub session_timeout_secs: Option<u64>,
    pub max_turns: Option<usize>,
    pub knowledge_path: Option<PathBuf>,
    pub bind_address: Option<String>,
    pub port: Option<u16>,
    pub capture_webhook_url: Option<String>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            llm: LlmConfig {
                api_key: None,
                base_url: "https://api.groq.com/openai/v1".to_string(),
                model: "llama-3.3-70b-versatile".to_string(),
                temperature: 0.4,
                max_tokens: 1024,
                timeout_secs: 30,
                max_retries: 2,
            },
            memory: MemoryConfig { max_sessions: 100, session_timeout_secs: 3600, max_turns: 6 },
            retrieval: RetrievalConfig {
                knowledge_path: PathBuf::from("data/knowledge.md"),
                top_k: 3,
                chunk_size: 500,
            },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 8000,
                graceful_shutdown_secs: 15,
            },
            capture: CaptureConfig { webhook_url: None },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    /// Layering: defaults, then an optional `autostream.toml` file, then
    /// `AUTOSTREAM_*` environment variables, then programmatic overrides.
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("autostream.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(llm) = patch.llm {
            if let Some(api_key_value) = llm.api_key {
                self.llm.api_key = Some(api_key_value.into());
            }
            if let Some(base_url) = llm.base_url {
                self.llm.base_url = base_url;
            }
            if let Some(model) = llm.model {
                self.llm.model = model;
            }
            if let Some(temperature) = llm.temperature {
                self.llm.temperature = temperature;
            }
            if let Some(max_tokens) = llm.max_tokens {
                self.llm.max_tokens = max_tokens;
            }
            if let Some(timeout_secs) = llm.timeout_secs {
                self.llm.timeout_secs = timeout_secs;
            }
            if let Some(max_retries) = llm.max_retries {
                self.llm.max_retries = max_retries;
            }
        }

        if let Some(memory) = patch.memory {
            if let Some(max_sessions) = memory.max_sessions {
                self.memory.max_sessions = max_sessions;
            }
            if let Some(session_timeout_secs) = memory.session_timeout_secs {
                self.memory.session_timeout_secs = session_timeout_secs;
            }
            if let Some(max_turns) = memory.max_turns {
                self.memory.max_turns = max_turns;
            }
        }

        if let Some(retrieval) = patch.retrieval {
            if let Some(knowledge_path) = retrieval.knowledge_path {
                self.retrieval.knowledge_path = knowledge_path;
            }
            if let Some(top_k) = retrieval.top_k {
                self.retrieval.top_k = top_k;
            }
            if let Some(chunk_size) = retrieval.chunk_size {
                self.retrieval.chunk_size = chunk_size;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
        }

        if let Some(capture) = patch.capture {
            if let Some(webhook_url) = capture.webhook_url {
                self.capture.webhook_url = Some(webhook_url);
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("AUTOSTREAM_LLM_API_KEY") {
            self.llm.api_key = Some(value.into());
        }
        if let Some(value) = read_env("AUTOSTREAM_LLM_BASE_URL") {
            self.llm.base_url = value;
        }
        if let Some(value) = read_env("AUTOSTREAM_LLM_MODEL") {
            self.llm.model = value;
        }
        if let Some(value) = read_env("AUTOSTREAM_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_u64("AUTOSTREAM_LLM_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("AUTOSTREAM_LLM_MAX_RETRIES") {
            self.llm.max_retries = parse_u32("AUTOSTREAM_LLM_MAX_RETRIES", &value)?;
        }

        if let Some(value) = read_env("AUTOSTREAM_MEMORY_MAX_SESSIONS") {
            self.memory.max_sessions = parse_usize("AUTOSTREAM_MEMORY_MAX_SESSIONS", &value)?;
        }
        if let Some(value) = read_env("AUTOSTREAM_MEMORY_SESSION_TIMEOUT_SECS") {
            self.memory.session_timeout_secs =
                parse_u64("AUTOSTREAM_MEMORY_SESSION_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("AUTOSTREAM_MEMORY_MAX_TURNS") {
            self.memory.max_turns = parse_usize("AUTOSTREAM_MEMORY_MAX_TURNS", &value)?;
        }

        if let Some(value) = read_env("AUTOSTREAM_RETRIEVAL_KNOWLEDGE_PATH") {
            self.retrieval.knowledge_path = PathBuf::from(value);
        }
        if let Some(value) = read_env("AUTOSTREAM_RETRIEVAL_TOP_K") {
            self.retrieval.top_k = parse_usize("AUTOSTREAM_RETRIEVAL_TOP_K", &value)?;
        }

        if let Some(value) = read_env("AUTOSTREAM_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("AUTOSTREAM_SERVER_PORT") {
            self.server.port = parse_u16("AUTOSTREAM_SERVER_PORT", &value)?;
        }

        if let Some(value) = read_env("AUTOSTREAM_CAPTURE_WEBHOOK_URL") {
            self.capture.webhook_url = Some(value);
        }

        let log_level =
            read_env("AUTOSTREAM_LOGGING_LEVEL").or_else(|| read_env("AUTOSTREAM_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("AUTOSTREAM_LOGGING_FORMAT").or_else(|| read_env("AUTOSTREAM_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(llm_api_key) = overrides.llm_api_key {
            self.llm.api_key = Some(llm_api_key.into());
        }
        if let Some(llm_model) = overrides.llm_model {
            self.llm.model = llm_model;
        }
        if let Some(max_sessions) = overrides.max_sessions {
            self.memory.max_sessions = max_sessions;
        }
        if let Some(session_timeout_secs) = overrides.session_timeout_secs {
            self.memory.session_timeout_secs = session_timeout_secs;
        }
        if let Some(max_turns) = overrides.max_turns {
            self.memory.max_turns = max_turns;
        }
        if let Some(knowledge_path) = overrides.knowledge_path {
            self.retrieval.knowledge_path = knowledge_path;
        }
        if let Some(bind_address) = overrides.bind_address {
            self.server.bind_address = bind_address;
        }
        if let Some(port) = overrides.port {
            self.server.port = port;
        }
        if let Some(capture_webhook_url) = overrides.capture_webhook_url {
            self.capture.webhook_url = Some(capture_webhook_url);
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_llm(&self.llm)?;
        validate_memory(&self.memory)?;
        validate_retrieval(&self.retrieval)?;
        validate_server(&self.server)?;
        validate_capture(&self.capture)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("autostream.toml"), PathBuf::from("config/autostream.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    toml::from_str::<ConfigPatch>(&raw)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn validate_llm(llm: &LlmConfig) -> Result<(), ConfigError> {
    if llm.base_url.trim().is_empty() {
        return Err(ConfigError::Validation("llm.base_url must not be empty".to_string()));
    }
    if llm.model.trim().is_empty() {
        return Err(ConfigError::Validation("llm.model must not be empty".to_string()));
    }
    if !(0.0..=2.0).contains(&llm.temperature) {
        return Err(ConfigError::Validation(
            "llm.temperature must be in range 0.0..=2.0".to_string(),
        ));
    }
    if llm.max_tokens == 0 {
        return Err(ConfigError::Validation(
            "llm.max_tokens must be greater than zero".to_string(),
        ));
    }
    if llm.timeout_secs == 0 || llm.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "llm.timeout_secs must be in range 1..=300".to_string(),
        ));
    }
    if let Some(api_key) = &llm.api_key {
        if api_key.expose_secret().trim().is_empty() {
            return Err(ConfigError::Validation(
                "llm.api_key must not be blank when set".to_string(),
            ));
        }
    }
    Ok(())
}

fn validate_memory(memory: &MemoryConfig) -> Result<(), ConfigError> {
    if memory.max_sessions == 0 {
        return Err(ConfigError::Validation(
            "memory.max_sessions must be greater than zero".to_string(),
        ));
    }
    if memory.session_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "memory.session_timeout_secs must be greater than zero".to_string(),
        ));
    }
    if memory.max_turns == 0 {
        return Err(ConfigError::Validation(
            "memory.max_turns must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

fn validate_retrieval(retrieval: &RetrievalConfig) -> Result<(), ConfigError> {
    if retrieval.top_k == 0 {
        return Err(ConfigError::Validation(
            "retrieval.top_k must be greater than zero".to_string(),
        ));
    }
    if retrieval.chunk_size == 0 {
        return Err(ConfigError::Validation(
            "retrieval.chunk_size must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }
    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

fn validate_capture(capture: &CaptureConfig) -> Result<(), ConfigError> {
    if let Some(webhook_url) = &capture.webhook_url {
        if !webhook_url.starts_with("http://") && !webhook_url.starts_with("https://") {
            return Err(ConfigError::Validation(
                "capture.webhook_url must start with http:// or https://".to_string(),
            ));
        }
    }
    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.parse::<usize>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    llm: Option<LlmPatch>,
    memory: Option<MemoryPatch>,
    retrieval: Option<RetrievalPatch>,
    server: Option<ServerPatch>,
    capture: Option<CapturePatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    timeout_secs: Option<u64>,
    max_retries: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct MemoryPatch {
    max_sessions: Option<usize>,
    session_timeout_secs: Option<u64>,
    max_turns: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct RetrievalPatch {
    knowledge_path: Option<PathBuf>,
    top_k: Option<usize>,
    chunk_size: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct CapturePatch {
    webhook_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
