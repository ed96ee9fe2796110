//! Environment-driven configuration for the relays and their servers.
//!
//! Every loader has a `from_lookup` form taking a key lookup closure so the
//! defaults can be exercised without touching the process environment.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_INFERENCE_URL: &str = "https://api-inference.huggingface.co/models";
pub const DEFAULT_OUTPUT_DIR: &str = "static/generated";
pub const DEFAULT_IMAGE_TIMEOUT: Duration = Duration::from_secs(120);

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
pub const DEFAULT_CHAT_MODEL: &str = "deepseek-r1:7b";
pub const DEFAULT_CHAT_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

fn lookup_or<F>(
    lookup: &F,
    key: &str,
    default: &str,
) -> String
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn lookup_secs<F>(
    lookup: &F,
    key: &str,
    default: Duration,
) -> Duration
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => match raw.trim().parse::<u64>() {
            Ok(secs) if secs > 0 => Duration::from_secs(secs),
            _ => {
                tracing::warn!("Ignoring invalid {key}={raw:?}, using {}s", default.as_secs());
                default
            }
        },
        None => default,
    }
}

/// Settings for the image-generation relay.
#[derive(Clone)]
pub struct ImageRelayConfig {
    pub api_key: Option<String>,
    pub inference_url: String,
    pub output_dir: PathBuf,
    pub timeout: Duration,
}

impl Default for ImageRelayConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            inference_url: DEFAULT_INFERENCE_URL.to_string(),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            timeout: DEFAULT_IMAGE_TIMEOUT,
        }
    }
}

// The bearer token never reaches logs.
impl fmt::Debug for ImageRelayConfig {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("ImageRelayConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("inference_url", &self.inference_url)
            .field("output_dir", &self.output_dir)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ImageRelayConfig {
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            api_key: lookup("HUGGINGFACE_API_KEY").filter(|k| !k.trim().is_empty()),
            inference_url: lookup_or(&lookup, "HF_INFERENCE_URL", DEFAULT_INFERENCE_URL),
            output_dir: PathBuf::from(lookup_or(&lookup, "IMAGE_OUTPUT_DIR", DEFAULT_OUTPUT_DIR)),
            timeout: lookup_secs(&lookup, "IMAGE_TIMEOUT_SECS", DEFAULT_IMAGE_TIMEOUT),
        }
    }
}

/// Settings for the chat relay.
#[derive(Debug, Clone)]
pub struct ChatRelayConfig {
    pub base_url: String,
    pub default_model: String,
    pub timeout: Duration,
    pub health_timeout: Duration,
}

impl Default for ChatRelayConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_OLLAMA_URL.to_string(),
            default_model: DEFAULT_CHAT_MODEL.to_string(),
            timeout: DEFAULT_CHAT_TIMEOUT,
            health_timeout: DEFAULT_HEALTH_TIMEOUT,
        }
    }
}

impl ChatRelayConfig {
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            base_url: lookup_or(&lookup, "OLLAMA_BASE_URL", DEFAULT_OLLAMA_URL),
            default_model: lookup_or(&lookup, "OLLAMA_DEFAULT_MODEL", DEFAULT_CHAT_MODEL),
            timeout: lookup_secs(&lookup, "CHAT_TIMEOUT_SECS", DEFAULT_CHAT_TIMEOUT),
            health_timeout: DEFAULT_HEALTH_TIMEOUT,
        }
    }
}

/// Bind address for a relay server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    #[must_use]
    pub fn from_env(default_port: u16) -> Self {
        Self::from_lookup(default_port, |key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(
        default_port: u16,
        lookup: F,
    ) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = match lookup("PORT") {
            Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                tracing::warn!("Ignoring invalid PORT={raw:?}, using {default_port}");
                default_port
            }),
            None => default_port,
        };

        Self {
            host: lookup_or(&lookup, "HOST", "0.0.0.0"),
            port,
        }
    }
}
