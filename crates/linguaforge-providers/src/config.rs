//! Service configuration and factory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use linguaforge_core::traits::{SpeechTranscriber, TextJudge};

use crate::judge::ChatJudge;
use crate::mock::MockJudge;
use crate::speech::PollingTranscriber;

/// Judge service configuration.
///
/// Note: Custom Debug impl masks the API key to prevent accidental exposure
/// in logs.
#[derive(Clone, Serialize, Deserialize)]
pub struct JudgeConfig {
    pub api_key: String,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
}

impl std::fmt::Debug for JudgeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JudgeConfig")
            .field("api_key", &"***")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

/// Speech service configuration. Same key-masking treatment as the judge.
#[derive(Clone, Serialize, Deserialize)]
pub struct SpeechConfig {
    pub api_key: String,
    #[serde(default)]
    pub base_url: Option<String>,
}

impl std::fmt::Debug for SpeechConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpeechConfig")
            .field("api_key", &"***")
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Top-level linguaforge configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinguaforgeConfig {
    #[serde(default)]
    pub judge: Option<JudgeConfig>,
    #[serde(default)]
    pub speech: Option<SpeechConfig>,
    /// Where the CLI persists its knowledge-store snapshot.
    #[serde(default = "default_state_path")]
    pub state_path: PathBuf,
}

fn default_state_path() -> PathBuf {
    PathBuf::from("./linguaforge-state.json")
}

impl Default for LinguaforgeConfig {
    fn default() -> Self {
        Self {
            judge: None,
            speech: None,
            state_path: default_state_path(),
        }
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    while let Some(start) = result.find("${") {
        if let Some(end) = result[start..].find('}') {
            let var_name = &result[start + 2..start + end];
            let value = std::env::var(var_name).unwrap_or_default();
            result = format!(
                "{}{}{}",
                &result[..start],
                value,
                &result[start + end + 1..]
            );
        } else {
            break;
        }
    }
    result
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `linguaforge.toml` in the current directory
/// 2. `~/.config/linguaforge/config.toml`
///
/// Environment variable overrides: `LINGUAFORGE_JUDGE_KEY`,
/// `LINGUAFORGE_SPEECH_KEY`.
pub fn load_config() -> Result<LinguaforgeConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<LinguaforgeConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("linguaforge.toml");
        if local.exists() {
            Some(local)
        } else if let Some(home) = dirs_path() {
            let global = home.join("config.toml");
            if global.exists() {
                Some(global)
            } else {
                None
            }
        } else {
            None
        }
    };

    let mut config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            toml::from_str::<LinguaforgeConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => LinguaforgeConfig::default(),
    };

    // Apply env var overrides
    if let Ok(key) = std::env::var("LINGUAFORGE_JUDGE_KEY") {
        match &mut config.judge {
            Some(judge) => judge.api_key = key,
            None => {
                config.judge = Some(JudgeConfig {
                    api_key: key,
                    base_url: None,
                    model: None,
                });
            }
        }
    }
    if let Ok(key) = std::env::var("LINGUAFORGE_SPEECH_KEY") {
        match &mut config.speech {
            Some(speech) => speech.api_key = key,
            None => {
                config.speech = Some(SpeechConfig {
                    api_key: key,
                    base_url: None,
                });
            }
        }
    }

    // Resolve env vars in all credential fields
    if let Some(judge) = &mut config.judge {
        judge.api_key = resolve_env_vars(&judge.api_key);
        judge.base_url = judge.base_url.as_ref().map(|u| resolve_env_vars(u));
    }
    if let Some(speech) = &mut config.speech {
        speech.api_key = resolve_env_vars(&speech.api_key);
        speech.base_url = speech.base_url.as_ref().map(|u| resolve_env_vars(u));
    }

    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("linguaforge"))
}

/// Create a judge from the configuration, falling back to the deterministic
/// mock when no judge is configured. The mock judges everything clean, which
/// keeps the CLI usable offline.
pub fn create_judge(config: &LinguaforgeConfig) -> Arc<dyn TextJudge> {
    match &config.judge {
        Some(judge) if !judge.api_key.trim().is_empty() => Arc::new(ChatJudge::new(
            &judge.api_key,
            judge.base_url.clone(),
            judge.model.clone(),
        )),
        _ => {
            tracing::info!("no judge configured, using offline mock judge");
            Arc::new(MockJudge::new())
        }
    }
}

/// Create a transcriber from the configuration, if one is configured.
pub fn create_transcriber(config: &LinguaforgeConfig) -> Option<Arc<dyn SpeechTranscriber>> {
    match &config.speech {
        Some(speech) if !speech.api_key.trim().is_empty() => Some(Arc::new(
            PollingTranscriber::new(&speech.api_key, speech.base_url.clone()),
        )),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_env_vars_basic() {
        std::env::set_var("_LINGUAFORGE_TEST_VAR", "hello");
        assert_eq!(resolve_env_vars("${_LINGUAFORGE_TEST_VAR}"), "hello");
        assert_eq!(
            resolve_env_vars("prefix_${_LINGUAFORGE_TEST_VAR}_suffix"),
            "prefix_hello_suffix"
        );
        std::env::remove_var("_LINGUAFORGE_TEST_VAR");
    }

    #[test]
    fn parse_full_config() {
        let toml_str = r#"
state_path = "/tmp/lf-state.json"

[judge]
api_key = "sk-test"
model = "gpt-4.1-mini"

[speech]
api_key = "aa-test"
"#;
        let config: LinguaforgeConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.state_path, PathBuf::from("/tmp/lf-state.json"));
        assert_eq!(config.judge.as_ref().unwrap().api_key, "sk-test");
        assert_eq!(config.speech.as_ref().unwrap().api_key, "aa-test");
    }

    #[test]
    fn debug_masks_api_keys() {
        let judge = JudgeConfig {
            api_key: "sk-very-secret".into(),
            base_url: None,
            model: None,
        };
        let rendered = format!("{judge:?}");
        assert!(!rendered.contains("sk-very-secret"));
        assert!(rendered.contains("***"));
    }

    #[test]
    fn missing_judge_falls_back_to_mock() {
        let config = LinguaforgeConfig::default();
        let judge = create_judge(&config);
        assert_eq!(judge.name(), "mock");
        assert!(create_transcriber(&config).is_none());
    }

    #[test]
    fn explicit_missing_path_is_an_error() {
        let err = load_config_from(Some(Path::new("/nonexistent/linguaforge.toml"))).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }
}
