use std::{path::PathBuf, str::FromStr, time::Duration};

use crate::services::local_model::CheckpointError;

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_MAX_TOKENS: u32 = 1000;
const DEFAULT_TEMPERATURE: f32 = 0.7;
const DEFAULT_KEEP_ALIVE_SECS: u64 = 600;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value {value:?} for {name}")]
    Invalid { name: &'static str, value: String },

    #[error("unknown model backend {0:?} (expected \"openai\" or \"local\")")]
    UnknownBackend(String),

    #[error("failed to load checkpoint {path}: {source}")]
    Checkpoint {
        path: PathBuf,
        #[source]
        source: CheckpointError,
    },

    #[error("failed to build http client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BackendKind {
    OpenAi,
    Local,
}

impl FromStr for BackendKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(BackendKind::OpenAi),
            "local" => Ok(BackendKind::Local),
            _ => Err(ConfigError::UnknownBackend(s.to_string())),
        }
    }
}

/// Process-wide settings, read once at startup.
#[derive(Clone)]
pub struct Settings {
    pub backend: BackendKind,
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub openai_model: String,
    pub local_model_path: PathBuf,
    /// `None` leaves the output length up to the backend.
    pub max_tokens: Option<u32>,
    pub temperature: f32,
    pub port: u16,
    pub static_dir: PathBuf,
    pub prompt_field: String,
    pub self_url: Option<String>,
    pub keep_alive_interval: Duration,
    /// Empty means any origin.
    pub cors_origins: Vec<String>,
    pub log_file: PathBuf,
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("backend", &self.backend)
            .field("openai_api_key", &self.openai_api_key.as_ref().map(|_| "<redacted>"))
            .field("openai_base_url", &self.openai_base_url)
            .field("openai_model", &self.openai_model)
            .field("local_model_path", &self.local_model_path)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("port", &self.port)
            .field("static_dir", &self.static_dir)
            .field("prompt_field", &self.prompt_field)
            .field("self_url", &self.self_url)
            .field("keep_alive_interval", &self.keep_alive_interval)
            .field("cors_origins", &self.cors_origins)
            .field("log_file", &self.log_file)
            .finish()
    }
}

impl Settings {
    /// Load settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load settings from an arbitrary variable source. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let backend = match get("MODEL_BACKEND") {
            Some(v) => v.parse()?,
            None => BackendKind::OpenAi,
        };

        let openai_api_key = get("OPENAI_API_KEY");
        if backend == BackendKind::OpenAi && openai_api_key.is_none() {
            return Err(ConfigError::Missing("OPENAI_API_KEY"));
        }

        let max_tokens = match parse_var(&get, "MAX_TOKENS")?.unwrap_or(DEFAULT_MAX_TOKENS) {
            0 => None,
            n => Some(n),
        };

        let temperature: f32 = parse_var(&get, "TEMPERATURE")?.unwrap_or(DEFAULT_TEMPERATURE);
        if !temperature.is_finite() || temperature < 0.0 {
            return Err(ConfigError::Invalid {
                name: "TEMPERATURE",
                value: temperature.to_string(),
            });
        }

        let keep_alive_secs: u64 =
            parse_var(&get, "KEEP_ALIVE_INTERVAL_SECS")?.unwrap_or(DEFAULT_KEEP_ALIVE_SECS);
        if keep_alive_secs == 0 {
            return Err(ConfigError::Invalid {
                name: "KEEP_ALIVE_INTERVAL_SECS",
                value: "0".to_string(),
            });
        }

        let cors_origins: Vec<String> = get("CORS_ALLOWED_ORIGINS")
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|o| !o.is_empty() && *o != "*")
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            backend,
            openai_api_key,
            openai_base_url: get("OPENAI_BASE_URL")
                .unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
            openai_model: get("OPENAI_MODEL").unwrap_or_else(|| "gpt-3.5-turbo".to_string()),
            local_model_path: get("LOCAL_MODEL_PATH")
                .unwrap_or_else(|| "model.json".to_string())
                .into(),
            max_tokens,
            temperature,
            port: parse_var(&get, "PORT")?.unwrap_or(DEFAULT_PORT),
            static_dir: get("STATIC_DIR")
                .unwrap_or_else(|| "frontend/build".to_string())
                .into(),
            prompt_field: get("PROMPT_FIELD").unwrap_or_else(|| "prompt".to_string()),
            self_url: get("SELF_URL"),
            keep_alive_interval: Duration::from_secs(keep_alive_secs),
            cors_origins,
            log_file: get("LOG_FILE")
                .unwrap_or_else(|| "chat-relay.log".to_string())
                .into(),
        })
    }
}

fn parse_var<T, G>(get: &G, name: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    get(name)
        .map(|value| {
            value.trim().parse().map_err(|_| ConfigError::Invalid { name, value })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn defaults_with_only_api_key() {
        let settings = Settings::from_lookup(lookup(&[("OPENAI_API_KEY", "sk-test")])).unwrap();
        assert_eq!(settings.backend, BackendKind::OpenAi);
        assert_eq!(settings.port, 8080);
        assert_eq!(settings.max_tokens, Some(1000));
        assert_eq!(settings.prompt_field, "prompt");
        assert_eq!(settings.keep_alive_interval, Duration::from_secs(600));
        assert!(settings.self_url.is_none());
        assert!(settings.cors_origins.is_empty());
    }

    #[test]
    fn missing_api_key_is_fatal() {
        let err = Settings::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("OPENAI_API_KEY")));

        let err = Settings::from_lookup(lookup(&[("OPENAI_API_KEY", "  ")])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("OPENAI_API_KEY")));
    }

    #[test]
    fn local_backend_needs_no_api_key() {
        let settings = Settings::from_lookup(lookup(&[("MODEL_BACKEND", "Local")])).unwrap();
        assert_eq!(settings.backend, BackendKind::Local);
    }

    #[test]
    fn rejects_bad_numbers() {
        let err = Settings::from_lookup(lookup(&[("OPENAI_API_KEY", "k"), ("PORT", "eighty")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "PORT", .. }));

        let err = Settings::from_lookup(lookup(&[("OPENAI_API_KEY", "k"), ("TEMPERATURE", "-1")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "TEMPERATURE", .. }));
    }

    #[test]
    fn zero_max_tokens_means_unbounded() {
        let settings =
            Settings::from_lookup(lookup(&[("OPENAI_API_KEY", "k"), ("MAX_TOKENS", "0")])).unwrap();
        assert_eq!(settings.max_tokens, None);
    }

    #[test]
    fn parses_cors_origins() {
        let settings = Settings::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "k"),
            ("CORS_ALLOWED_ORIGINS", "https://a.example, https://b.example,"),
        ]))
        .unwrap();
        assert_eq!(settings.cors_origins, vec!["https://a.example", "https://b.example"]);
    }

    #[test]
    fn debug_output_hides_api_key() {
        let settings = Settings::from_lookup(lookup(&[("OPENAI_API_KEY", "sk-secret")])).unwrap();
        let printed = format!("{settings:?}");
        assert!(!printed.contains("sk-secret"));
    }
}
