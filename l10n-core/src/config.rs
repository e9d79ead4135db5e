use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_CONFIG_FILE: &str = "l10n.toml";
pub const CACHE_SCHEMA: &str = "v1";

/// Cache namespace for `model`; a new model or cache schema invalidates the
/// cache.
pub fn model_version(model: &str) -> String {
    format!("{model}:{CACHE_SCHEMA}")
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_model() -> String {
    "gpt-4.1-mini".to_string()
}

fn default_max_attempts() -> u32 {
    5
}

fn default_base_delay_ms() -> u64 {
    800
}

fn default_max_delay_ms() -> u64 {
    30_000
}

fn default_jitter_ms() -> u64 {
    200
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_locale() -> String {
    "ru".to_string()
}

fn default_source_locale() -> String {
    "en".to_string()
}

fn default_workers() -> usize {
    4
}

fn default_max_length_ratio() -> f64 {
    3.0
}

fn default_flush_every() -> usize {
    16
}

fn default_cache_file() -> PathBuf {
    PathBuf::from(".translation_cache.json")
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ProviderSettings {
    #[serde(default = "default_provider")]
    pub provider: String,

    #[serde(default = "default_model")]
    pub model: String,

    /// Never read from the config file; only from `OPENAI_API_KEY`.
    #[serde(skip)]
    pub api_key: String,

    #[serde(default)]
    pub base_url: Option<String>,

    #[serde(default)]
    pub temperature: Option<f32>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    #[serde(default = "default_jitter_ms")]
    pub jitter_ms: u64,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            api_key: String::new(),
            base_url: None,
            temperature: None,
            timeout_secs: default_timeout_secs(),
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            jitter_ms: default_jitter_ms(),
        }
    }
}

impl ProviderSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PipelineSettings {
    #[serde(default = "default_locale")]
    pub locale: String,

    #[serde(default = "default_source_locale")]
    pub source_locale: String,

    #[serde(default = "default_workers")]
    pub workers: usize,

    #[serde(default = "default_max_length_ratio")]
    pub max_length_ratio: f64,

    #[serde(default = "default_cache_file")]
    pub cache_file: PathBuf,

    #[serde(default = "default_flush_every")]
    pub cache_flush_every: usize,

    #[serde(default)]
    pub glossary_path: Option<PathBuf>,

    #[serde(default)]
    pub fewshot_path: Option<PathBuf>,

    #[serde(default)]
    pub system_prompt_path: Option<PathBuf>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            locale: default_locale(),
            source_locale: default_source_locale(),
            workers: default_workers(),
            max_length_ratio: default_max_length_ratio(),
            cache_file: default_cache_file(),
            cache_flush_every: default_flush_every(),
            glossary_path: None,
            fewshot_path: None,
            system_prompt_path: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct Settings {
    #[serde(default)]
    pub provider: ProviderSettings,

    #[serde(default)]
    pub pipeline: PipelineSettings,
}

impl Settings {
    /// Defaults, then the TOML file (explicit path, `L10N_CONFIG`, or
    /// `l10n.toml` in the working directory), then the environment.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let file = explicit.map(Path::to_path_buf).or_else(|| {
            std::env::var("L10N_CONFIG")
                .ok()
                .map(PathBuf::from)
                .or_else(|| {
                    let p = PathBuf::from(DEFAULT_CONFIG_FILE);
                    p.exists().then_some(p)
                })
        });

        let mut settings = match file {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };

        settings.apply_env(|name| std::env::var(name).ok())?;
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Overrides from environment variables; `lookup` is injectable for tests.
    pub fn apply_env(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(v) = non_empty("OPENAI_API_KEY") {
            self.provider.api_key = v;
        }
        if let Some(v) = non_empty("OPENAI_MODEL") {
            self.provider.model = v;
        }
        if let Some(v) = non_empty("OPENAI_BASE_URL") {
            self.provider.base_url = Some(v);
        }
        if let Some(v) = non_empty("OPENAI_MAX_RETRIES") {
            self.provider.max_attempts = parse("OPENAI_MAX_RETRIES", "an integer", &v)?;
        }
        if let Some(v) = non_empty("OPENAI_TIMEOUT_SECONDS") {
            self.provider.timeout_secs = parse("OPENAI_TIMEOUT_SECONDS", "an integer", &v)?;
        }
        if let Some(v) = non_empty("OPENAI_TEMPERATURE") {
            self.provider.temperature = Some(parse("OPENAI_TEMPERATURE", "a float", &v)?);
        }
        if let Some(v) = non_empty("TRANSLATION_LOCALE") {
            self.pipeline.locale = v;
        }
        if let Some(v) = non_empty("TRANSLATION_WORKERS") {
            self.pipeline.workers = parse("TRANSLATION_WORKERS", "an integer", &v)?;
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pipeline.workers == 0 {
            return Err(ConfigError::Invalid("workers must be at least 1".into()));
        }
        if self.provider.max_attempts == 0 {
            return Err(ConfigError::Invalid("max_attempts must be at least 1".into()));
        }
        if self.pipeline.max_length_ratio <= 1.0 {
            return Err(ConfigError::Invalid(
                "max_length_ratio must be greater than 1.0".into(),
            ));
        }
        Ok(())
    }
}

fn parse<T: std::str::FromStr>(
    name: &'static str,
    expected: &'static str,
    value: &str,
) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Env {
        name,
        expected,
        value: value.to_string(),
    })
}

/// Display name used in prompts; unknown codes fall back to the code.
pub fn language_name(locale: &str) -> String {
    let name = match locale.to_lowercase().as_str() {
        "ru" => "Russian",
        "en" => "English",
        "es" => "Spanish",
        "de" => "German",
        "fr" => "French",
        "it" => "Italian",
        "pt" => "Portuguese",
        "pt-br" => "Brazilian Portuguese",
        "tr" => "Turkish",
        "uk" => "Ukrainian",
        "pl" => "Polish",
        "ja" => "Japanese",
        "ko" => "Korean",
        "zh-cn" => "Simplified Chinese",
        "zh-tw" => "Traditional Chinese",
        "vi" => "Vietnamese",
        "id" => "Indonesian",
        _ => return locale.to_string(),
    };
    name.to_string()
}
