//! Runtime configuration: API secrets from the environment plus optional
//! tuning from a TOML file.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, info};

use crate::error::ConfigError;
use crate::generation::{ClassificationMode, DEFAULT_CHAR_INTERVAL, GenerationSettings};
use crate::provider::{DEFAULT_GEMINI_MODEL, DEFAULT_OPENAI_MODEL, SamplingParams};

pub const OPENAI_KEY_VAR: &str = "OPENAI_API_KEY";
pub const GOOGLE_KEY_VAR: &str = "GOOGLE_API_KEY";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Gemini,
    OpenAi,
}

/// Tunables read from `config.toml`. Every field is optional in the file.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub provider: ProviderKind,
    pub gemini_model: String,
    pub openai_model: String,
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
    pub max_output_tokens: u32,
    /// Milliseconds between revealed characters.
    pub stream_interval_ms: u64,
    /// Zero disables the timeout.
    pub request_timeout_secs: u64,
    pub classification: ClassificationMode,
}

impl Default for Settings {
    fn default() -> Self {
        let sampling = SamplingParams::default();
        Self {
            provider: ProviderKind::default(),
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
            openai_model: DEFAULT_OPENAI_MODEL.to_string(),
            temperature: sampling.temperature,
            top_k: sampling.top_k,
            top_p: sampling.top_p,
            max_output_tokens: sampling.max_output_tokens,
            stream_interval_ms: DEFAULT_CHAR_INTERVAL.as_millis() as u64,
            request_timeout_secs: 30,
            classification: ClassificationMode::default(),
        }
    }
}

impl Settings {
    /// Read `path`, or the default location when `path` is `None`. A missing
    /// default file yields the defaults; a missing explicit file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => match default_config_path() {
                Some(path) if path.exists() => Self::from_file(&path),
                _ => {
                    debug!("no config file, using defaults");
                    Ok(Self::default())
                }
            },
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let settings = Self::from_toml_str(&raw, path)?;
        info!(path = %path.display(), "loaded settings");
        Ok(settings)
    }

    pub fn from_toml_str(raw: &str, origin: &Path) -> Result<Self, ConfigError> {
        toml::from_str(raw).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })
    }

    pub fn sampling(&self) -> SamplingParams {
        SamplingParams {
            temperature: self.temperature,
            top_k: self.top_k,
            top_p: self.top_p,
            max_output_tokens: self.max_output_tokens,
        }
    }

    pub fn generation(&self) -> GenerationSettings {
        GenerationSettings {
            char_interval: Duration::from_millis(self.stream_interval_ms),
            request_timeout: (self.request_timeout_secs > 0)
                .then(|| Duration::from_secs(self.request_timeout_secs)),
            classification: self.classification,
        }
    }
}

/// `$CONFIG_DIR/noteme/config.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("noteme").join("config.toml"))
}

/// Both provider keys. Each is required at startup even though only the
/// selected provider uses its own.
#[derive(Clone)]
pub struct Secrets {
    pub openai_api_key: String,
    pub google_api_key: String,
}

impl fmt::Debug for Secrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secrets")
            .field("openai_api_key", &"<redacted>")
            .field("google_api_key", &"<redacted>")
            .finish()
    }
}

impl Secrets {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let require = |name: &'static str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .ok_or(ConfigError::MissingSecret(name))
        };
        Ok(Self {
            openai_api_key: require(OPENAI_KEY_VAR)?,
            google_api_key: require(GOOGLE_KEY_VAR)?,
        })
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub settings: Settings,
    pub secrets: Secrets,
}

impl Config {
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let secrets = Secrets::from_env()?;
        let settings = Settings::load(path)?;
        Ok(Self { settings, secrets })
    }
}
