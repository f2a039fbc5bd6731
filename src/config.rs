//! Analyzer configuration loader - parses analyzer.toml
//!
//! Keeps directories, the model preference list, and retry/pacing timings
//! out of the code. Every field has a default, so the file is optional;
//! a file that exists but does not parse is a startup error.
//!
//! The API credential is never read from this file. It comes from the
//! `OPENAI_API_KEY` environment variable or, failing that, from the
//! `env_file` (default `backend/.env`).

use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::invoker::RetryPolicy;

pub const DEFAULT_CONFIG_PATH: &str = "analyzer.toml";
pub const API_KEY_VAR: &str = "OPENAI_API_KEY";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(
        "OPENAI_API_KEY not found. Set the environment variable or add OPENAI_API_KEY=... to {}",
        env_file.display()
    )]
    MissingApiKey { env_file: PathBuf },

    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Settings for one analyzer run.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalyzerConfig {
    pub images_dir: PathBuf,
    pub fewshot_dir: PathBuf,
    pub output_file: PathBuf,

    /// Candidate models, highest preference first.
    pub models: Vec<String>,

    pub max_rounds: u32,
    pub backoff_unit_ms: u64,
    /// Delay between successive images.
    pub pacing_ms: u64,

    pub max_completion_tokens: u32,
    pub api_base: String,
    pub request_timeout_secs: u64,

    /// Fallback file for the API credential.
    pub env_file: PathBuf,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            images_dir: PathBuf::from("data/test_images"),
            fewshot_dir: PathBuf::from("data/fewshot_examples"),
            output_file: PathBuf::from("data/results/analysis_results.json"),
            models: vec!["gpt-4o".to_string(), "gpt-4o-mini".to_string()],
            max_rounds: 3,
            backoff_unit_ms: 1000,
            pacing_ms: 500,
            max_completion_tokens: 2000,
            api_base: "https://api.openai.com/v1".to_string(),
            request_timeout_secs: 120,
            env_file: PathBuf::from("backend/.env"),
        }
    }
}

impl AnalyzerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.models.is_empty() || self.models.iter().any(|m| m.trim().is_empty()) {
            return Err(ConfigError::Invalid("models must list at least one non-empty model id".to_string()));
        }
        if self.max_rounds == 0 {
            return Err(ConfigError::Invalid("max_rounds must be at least 1".to_string()));
        }
        if self.max_completion_tokens == 0 {
            return Err(ConfigError::Invalid("max_completion_tokens must be positive".to_string()));
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_rounds: self.max_rounds,
            backoff_unit: Duration::from_millis(self.backoff_unit_ms),
        }
    }

    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Parses and validates configuration text. `path` is only used in errors.
pub fn parse_config(contents: &str, path: &Path) -> Result<AnalyzerConfig, ConfigError> {
    let config: AnalyzerConfig = toml::from_str(contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    config.validate()?;
    Ok(config)
}

/// Loads configuration from `path`, or the defaults if the file does not
/// exist.
pub fn load_config(path: &Path) -> Result<AnalyzerConfig, ConfigError> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no config file, using defaults");
        return Ok(AnalyzerConfig::default());
    }

    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&contents, path)
}

// ---------------------------------------------------------------------------
// Credential resolution
// ---------------------------------------------------------------------------

/// Resolves the API key from the environment, then from `env_file`.
///
/// # Errors
/// `ConfigError::MissingApiKey` if neither source has a non-blank value.
pub fn resolve_api_key(env_file: &Path) -> Result<String, ConfigError> {
    resolve_api_key_from(env::var(API_KEY_VAR).ok(), env_file)
}

/// `resolve_api_key` with the environment value supplied by the caller.
pub fn resolve_api_key_from(env_value: Option<String>, env_file: &Path) -> Result<String, ConfigError> {
    env_value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .or_else(|| api_key_from_env_file(env_file))
        .ok_or_else(|| ConfigError::MissingApiKey {
            env_file: env_file.to_path_buf(),
        })
}

/// First `OPENAI_API_KEY=value` entry in a dotenv-style file, with
/// surrounding quotes removed. The value is taken literally: `$` is not
/// expanded, so keys containing it survive intact.
pub fn api_key_from_env_file(path: &Path) -> Option<String> {
    let contents = fs::read_to_string(path).ok()?;

    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.starts_with('#'))
        .filter_map(|line| {
            let line = line.strip_prefix("export ").unwrap_or(line);
            let (key, value) = line.split_once('=')?;
            (key.trim() == API_KEY_VAR).then(|| strip_quotes(value.trim()).to_string())
        })
        .find(|v| !v.is_empty())
}

fn strip_quotes(value: &str) -> &str {
    value.trim_matches(|c| c == '"' || c == '\'')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AnalyzerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.models, vec!["gpt-4o", "gpt-4o-mini"]);
        assert_eq!(config.max_rounds, 3);
        assert_eq!(config.pacing(), Duration::from_millis(500));
        assert_eq!(config.output_file, PathBuf::from("data/results/analysis_results.json"));
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let config = parse_config(
            r#"
            images_dir = "photos/storm"
            models = ["gpt-4.1", "gpt-4o"]
            max_rounds = 5
            "#,
            Path::new("analyzer.toml"),
        )
        .unwrap();

        assert_eq!(config.images_dir, PathBuf::from("photos/storm"));
        assert_eq!(config.models, vec!["gpt-4.1", "gpt-4o"]);
        assert_eq!(config.retry_policy().max_rounds, 5);
        assert_eq!(config.fewshot_dir, PathBuf::from("data/fewshot_examples"));
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let err = parse_config("max_rounds = \"three\"", Path::new("analyzer.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));

        let err = parse_config("unknown_key = 1", Path::new("analyzer.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            parse_config("models = []", Path::new("a.toml")),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            parse_config("max_rounds = 0", Path::new("a.toml")),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_missing_config_file_uses_defaults() {
        let config = load_config(Path::new("/no/such/analyzer.toml")).unwrap();
        assert_eq!(config, AnalyzerConfig::default());
    }

    #[test]
    fn test_env_value_wins() {
        let key = resolve_api_key_from(Some("sk-env".to_string()), Path::new("/no/such/.env")).unwrap();
        assert_eq!(key, "sk-env");
    }

    #[test]
    fn test_env_file_fallback_strips_quotes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");

        fs::write(&path, "DATABASE_URL=postgres://x\nOPENAI_API_KEY='sk-single'\n").unwrap();
        assert_eq!(resolve_api_key_from(None, &path).unwrap(), "sk-single");

        fs::write(&path, "OPENAI_API_KEY=\"sk-double\"\n").unwrap();
        assert_eq!(resolve_api_key_from(Some("  ".to_string()), &path).unwrap(), "sk-double");

        fs::write(&path, "OPENAI_API_KEY=sk-bare\n").unwrap();
        assert_eq!(api_key_from_env_file(&path).as_deref(), Some("sk-bare"));
    }

    #[test]
    fn test_missing_key_everywhere_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        fs::write(&path, "OTHER=1\n").unwrap();

        let err = resolve_api_key_from(None, &path).unwrap_err();
        assert!(matches!(err, ConfigError::MissingApiKey { .. }));
        assert!(err.to_string().contains("OPENAI_API_KEY"));

        assert!(resolve_api_key_from(None, Path::new("/no/such/.env")).is_err());
    }

    #[test]
    fn test_env_file_value_is_literal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");

        fs::write(&path, "# comment\nOPENAI_API_KEY=sk-ab$cd\n").unwrap();
        assert_eq!(api_key_from_env_file(&path).as_deref(), Some("sk-ab$cd"));

        fs::write(&path, "export OPENAI_API_KEY = \"sk-${HOME}x\"\n").unwrap();
        assert_eq!(api_key_from_env_file(&path).as_deref(), Some("sk-${HOME}x"));
    }
}
