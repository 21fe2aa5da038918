//! Configuration types.

use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;

/// Upper bound on message length, in characters.
pub const DEFAULT_MAX_MESSAGE_CHARS: usize = 1000;

/// Simulated latency of the local reply backend.
pub const DEFAULT_REPLY_LATENCY: Duration = Duration::from_millis(1500);

/// Which outer surface the binary drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceMode {
    /// Interactive stdin/stdout REPL.
    Cli,
    /// REST API over HTTP.
    Http,
}

impl FromStr for SurfaceMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cli" => Ok(Self::Cli),
            "http" => Ok(Self::Http),
            other => Err(ConfigError::InvalidValue {
                key: "CAREER_ASSIST_MODE".to_string(),
                message: format!("expected 'cli' or 'http', got '{other}'"),
            }),
        }
    }
}

/// Assistant configuration.
#[derive(Debug, Clone)]
pub struct AssistantConfig {
    /// Longest accepted message (trimmed), in characters.
    pub max_message_chars: usize,
    /// Simulated latency of the local reply backend.
    pub reply_latency: Duration,
    /// Upper bound on a single reply call before it counts as a timeout.
    pub reply_timeout: Duration,
    /// HTTP sessions with no activity for this long are closed.
    pub session_idle_timeout: Duration,
    /// Port for the HTTP surface.
    pub http_port: u16,
    /// CORS allow-list for the HTTP surface.
    pub allowed_origins: Vec<String>,
    /// Surface started by the binary.
    pub mode: SurfaceMode,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            max_message_chars: DEFAULT_MAX_MESSAGE_CHARS,
            reply_latency: DEFAULT_REPLY_LATENCY,
            reply_timeout: Duration::from_secs(30),
            session_idle_timeout: Duration::from_secs(3600), // 1 hour
            http_port: 8000,
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
                "http://localhost:8000".to_string(),
            ],
            mode: SurfaceMode::Cli,
        }
    }
}

impl AssistantConfig {
    /// Build config from `CAREER_ASSIST_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup. Unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let max_message_chars = parse_or(
            &lookup,
            "CAREER_ASSIST_MAX_MESSAGE_CHARS",
            defaults.max_message_chars,
        )?;
        if max_message_chars == 0 || max_message_chars > DEFAULT_MAX_MESSAGE_CHARS {
            return Err(ConfigError::InvalidValue {
                key: "CAREER_ASSIST_MAX_MESSAGE_CHARS".to_string(),
                message: format!(
                    "must be between 1 and {DEFAULT_MAX_MESSAGE_CHARS}, got {max_message_chars}"
                ),
            });
        }

        let latency_ms: u64 = parse_or(
            &lookup,
            "CAREER_ASSIST_REPLY_LATENCY_MS",
            defaults.reply_latency.as_millis() as u64,
        )?;
        let timeout_secs: u64 = parse_or(
            &lookup,
            "CAREER_ASSIST_REPLY_TIMEOUT_SECS",
            defaults.reply_timeout.as_secs(),
        )?;
        let idle_secs: u64 = parse_or(
            &lookup,
            "CAREER_ASSIST_SESSION_IDLE_TIMEOUT_SECS",
            defaults.session_idle_timeout.as_secs(),
        )?;
        if idle_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "CAREER_ASSIST_SESSION_IDLE_TIMEOUT_SECS".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        let http_port = parse_or(&lookup, "CAREER_ASSIST_HTTP_PORT", defaults.http_port)?;

        let allowed_origins = match lookup("CAREER_ASSIST_ALLOWED_ORIGINS") {
            Some(raw) => raw
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            None => defaults.allowed_origins,
        };

        let mode = match lookup("CAREER_ASSIST_MODE") {
            Some(raw) => raw.parse()?,
            None => defaults.mode,
        };

        Ok(Self {
            max_message_chars,
            reply_latency: Duration::from_millis(latency_ms),
            reply_timeout: Duration::from_secs(timeout_secs),
            session_idle_timeout: Duration::from_secs(idle_secs),
            http_port,
            allowed_origins,
            mode,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        }),
        None => Ok(default),
    }
}
