//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.triage/config.json`) and environment.
//! Every section is optional; a missing file yields the defaults.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Classification service endpoint and model.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Boilerplate markers for the message filter.
    #[serde(default)]
    pub filter: FilterConfig,

    /// Media reference policy.
    #[serde(default)]
    pub media: MediaConfig,

    /// Ranking, fallback and throttling knobs.
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

/// OpenAI-compatible chat completion endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceConfig {
    /// Base URL up to and including the version segment (default "https://api.openai.com/v1").
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model id passed as-is to the service (default "gpt-4o-mini").
    #[serde(default = "default_model")]
    pub model: String,

    /// Bearer token. Overridden by TRIAGE_API_KEY env.
    pub api_key: Option<String>,

    /// Sampling temperature; omitted from the request when unset.
    #[serde(default)]
    pub temperature: Option<f32>,

    /// Per-request timeout in seconds (default 120).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Refuse to run without an API key. Unset: required only for api.openai.com.
    #[serde(default)]
    pub require_api_key: Option<bool>,
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            api_key: None,
            temperature: None,
            timeout_secs: default_timeout_secs(),
            require_api_key: None,
        }
    }
}

impl ServiceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Whether requests must carry a bearer token. Local compatible servers usually take none.
    pub fn requires_api_key(&self) -> bool {
        self.require_api_key
            .unwrap_or_else(|| self.base_url.contains("api.openai.com"))
    }
}

/// Markers identifying automated or boilerplate lines. A line containing any marker is discarded.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterConfig {
    /// Literal substrings (case-sensitive).
    #[serde(default)]
    pub substrings: Vec<String>,
    /// Regular expressions, searched anywhere in the line. Use `(?i)` for case-insensitive markers.
    #[serde(default)]
    pub patterns: Vec<String>,
}

/// Which media references survive aggregation, and the text used for media-only tickets.
///
/// Origins are substring patterns matched against the reference (e.g. `"cdn.example.com"`).
/// A reference is kept when it matches no denied origin and either the allow list is empty
/// or it matches at least one allowed origin.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaConfig {
    #[serde(default)]
    pub allowed_origins: Vec<String>,
    #[serde(default)]
    pub denied_origins: Vec<String>,
    /// Line synthesized when a ticket has media but no usable text.
    #[serde(default = "default_placeholder")]
    pub placeholder: String,
}

fn default_placeholder() -> String {
    "[cliente enviou apenas imagens]".to_string()
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            allowed_origins: Vec::new(),
            denied_origins: Vec::new(),
            placeholder: default_placeholder(),
        }
    }
}

impl MediaConfig {
    /// True if the reference passes the deny and allow lists. Blank references never pass.
    pub fn allows(&self, reference: &str) -> bool {
        let r = reference.trim();
        if r.is_empty() {
            return false;
        }
        if self.denied_origins.iter().any(|d| r.contains(d.as_str())) {
            return false;
        }
        self.allowed_origins.is_empty() || self.allowed_origins.iter().any(|a| r.contains(a.as_str()))
    }
}

/// Ranking, fallback classification and throttling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineConfig {
    /// How many canned responses are offered to the model (default 50).
    #[serde(default = "default_top_responses")]
    pub top_responses: usize,

    /// Minimum similarity for the local subject fallback (default 0.70).
    #[serde(default = "default_subject_threshold")]
    pub subject_threshold: f64,

    /// Label used when no catalog subject is close enough (default "Outro").
    #[serde(default = "default_fallback_subject")]
    pub fallback_subject: String,

    /// Minimum seconds between consecutive classification calls (default 7).
    #[serde(default = "default_throttle_secs")]
    pub throttle_secs: f64,
}

fn default_top_responses() -> usize {
    50
}

fn default_subject_threshold() -> f64 {
    0.70
}

fn default_fallback_subject() -> String {
    "Outro".to_string()
}

fn default_throttle_secs() -> f64 {
    7.0
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            top_responses: default_top_responses(),
            subject_threshold: default_subject_threshold(),
            fallback_subject: default_fallback_subject(),
            throttle_secs: default_throttle_secs(),
        }
    }
}

/// Upper bound for `throttleSecs`.
pub const MAX_THROTTLE_SECS: f64 = 3600.0;

impl PipelineConfig {
    /// Throttle interval; negative or non-finite values mean no delay, values above
    /// [`MAX_THROTTLE_SECS`] are clamped.
    pub fn throttle_interval(&self) -> Duration {
        if !(self.throttle_secs.is_finite() && self.throttle_secs > 0.0) {
            return Duration::ZERO;
        }
        if self.throttle_secs > MAX_THROTTLE_SECS {
            log::warn!(
                "throttleSecs {} exceeds {}s, clamping",
                self.throttle_secs,
                MAX_THROTTLE_SECS
            );
        }
        Duration::from_secs_f64(self.throttle_secs.min(MAX_THROTTLE_SECS))
    }
}

/// Resolve the service API key: env TRIAGE_API_KEY overrides config.
pub fn resolve_api_key(config: &Config) -> Option<String> {
    std::env::var("TRIAGE_API_KEY")
        .ok()
        .and_then(|s| {
            let t = s.trim();
            if t.is_empty() {
                None
            } else {
                Some(t.to_string())
            }
        })
        .or_else(|| {
            config
                .service
                .api_key
                .as_ref()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        })
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("TRIAGE_CONFIG_PATH").map(PathBuf::from).unwrap_or_else(|_| {
        dirs::home_dir()
            .map(|h| h.join(".triage").join("config.json"))
            .unwrap_or_else(|| PathBuf::from("config.json"))
    })
}

/// Load config from the given path, or the default path (or TRIAGE_CONFIG_PATH). Missing file => default config.
/// Returns the config and the path that was used.
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    Ok((config, path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_behaviour() {
        let c = Config::default();
        assert_eq!(c.pipeline.top_responses, 50);
        assert_eq!(c.pipeline.subject_threshold, 0.70);
        assert_eq!(c.pipeline.fallback_subject, "Outro");
        assert_eq!(c.pipeline.throttle_interval(), Duration::from_secs(7));
        assert_eq!(c.service.timeout(), Duration::from_secs(120));
        assert!(c.filter.substrings.is_empty());
    }

    #[test]
    fn partial_json_keeps_other_defaults() {
        let c: Config = serde_json::from_str(
            r#"{"pipeline":{"throttleSecs":0},"media":{"deniedOrigins":["lookaside"]}}"#,
        )
        .unwrap();
        assert_eq!(c.pipeline.throttle_interval(), Duration::ZERO);
        assert_eq!(c.pipeline.top_responses, 50);
        assert_eq!(c.media.denied_origins, vec!["lookaside".to_string()]);
        assert_eq!(c.media.placeholder, default_placeholder());
    }

    #[test]
    fn huge_throttle_is_clamped() {
        let p = PipelineConfig {
            throttle_secs: 1e30,
            ..PipelineConfig::default()
        };
        assert_eq!(p.throttle_interval(), Duration::from_secs(3600));
        let p = PipelineConfig {
            throttle_secs: f64::INFINITY,
            ..PipelineConfig::default()
        };
        assert_eq!(p.throttle_interval(), Duration::ZERO);
    }

    #[test]
    fn api_key_required_only_for_hosted_endpoint_by_default() {
        let hosted = ServiceConfig::default();
        assert!(hosted.requires_api_key());
        let local: ServiceConfig =
            serde_json::from_str(r#"{"baseUrl":"http://127.0.0.1:1234/v1"}"#).unwrap();
        assert!(!local.requires_api_key());
        let forced: ServiceConfig =
            serde_json::from_str(r#"{"baseUrl":"http://127.0.0.1:1234/v1","requireApiKey":true}"#)
                .unwrap();
        assert!(forced.requires_api_key());
    }

    #[test]
    fn media_policy_unrestricted_by_default() {
        let m = MediaConfig::default();
        assert!(m.allows("https://anything.example/img.png"));
        assert!(!m.allows("   "));
    }

    #[test]
    fn media_policy_deny_wins_over_allow() {
        let m = MediaConfig {
            allowed_origins: vec!["cdn.example.com".into()],
            denied_origins: vec!["/private/".into()],
            ..MediaConfig::default()
        };
        assert!(m.allows("https://cdn.example.com/a.png"));
        assert!(!m.allows("https://other.example.com/a.png"));
        assert!(!m.allows("https://cdn.example.com/private/a.png"));
    }

    #[test]
    fn missing_config_file_yields_defaults() {
        let path = std::env::temp_dir().join("triage-config-test-does-not-exist.json");
        let (config, used) = load_config(Some(path.clone())).unwrap();
        assert_eq!(used, path);
        assert_eq!(config.service.model, "gpt-4o-mini");
    }
}
