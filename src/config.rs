//! Application-level configuration loading: round timing, catalog locations,
//! and cosmetic fallbacks.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "DOPPLER_BACK_CONFIG_PATH";

/// Answer window before a round is evaluated with whatever answers arrived.
const DEFAULT_ANSWER_WINDOW_MS: u64 = 15_000;
/// Reveal window before the next round starts without host action.
const DEFAULT_REVEAL_WINDOW_MS: u64 = 10_000;
/// Image used when a player's skin cannot be resolved.
const DEFAULT_PLACEHOLDER_SKIN: &str = "/skins/clashRoyale/skeleton.png";
/// Times a colliding lobby code is re-rolled before giving up.
const DEFAULT_CODE_RETRY_BUDGET: u32 = 5;

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// How long players get to answer each round.
    pub answer_window: Duration,
    /// How long the reveal stays up before auto-advancing.
    pub reveal_window: Duration,
    /// Fallback skin image for unresolvable skins.
    pub placeholder_skin_image: String,
    /// JSON file holding the quiz set catalog.
    pub sets_path: PathBuf,
    /// JSON file holding the skin catalog.
    pub skins_path: PathBuf,
    /// Lobby code re-roll budget on collision.
    pub code_retry_budget: u32,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to the
    /// baked-in defaults when the file is absent or unreadable.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        answer_window_ms = config.answer_window.as_millis() as u64,
                        reveal_window_ms = config.reveal_window.as_millis() as u64,
                        "loaded configuration"
                    );
                    config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            answer_window: Duration::from_millis(DEFAULT_ANSWER_WINDOW_MS),
            reveal_window: Duration::from_millis(DEFAULT_REVEAL_WINDOW_MS),
            placeholder_skin_image: DEFAULT_PLACEHOLDER_SKIN.into(),
            sets_path: PathBuf::from("config/sets.json"),
            skins_path: PathBuf::from("config/skins.json"),
            code_retry_budget: DEFAULT_CODE_RETRY_BUDGET,
        }
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of the configuration file.
struct RawConfig {
    answer_window_ms: Option<u64>,
    reveal_window_ms: Option<u64>,
    placeholder_skin_image: Option<String>,
    sets_file: Option<PathBuf>,
    skins_file: Option<PathBuf>,
    code_retry_budget: Option<u32>,
}

impl From<RawConfig> for AppConfig {
    fn from(raw: RawConfig) -> Self {
        let defaults = AppConfig::default();
        Self {
            answer_window: raw
                .answer_window_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.answer_window),
            reveal_window: raw
                .reveal_window_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.reveal_window),
            placeholder_skin_image: raw
                .placeholder_skin_image
                .unwrap_or(defaults.placeholder_skin_image),
            sets_path: raw.sets_file.unwrap_or(defaults.sets_path),
            skins_path: raw.skins_file.unwrap_or(defaults.skins_path),
            code_retry_budget: raw.code_retry_budget.unwrap_or(defaults.code_retry_budget),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_config_overrides_only_present_fields() {
        let raw: RawConfig =
            serde_json::from_str(r#"{"answer_window_ms": 5000, "code_retry_budget": 2}"#).unwrap();
        let config: AppConfig = raw.into();
        assert_eq!(config.answer_window, Duration::from_secs(5));
        assert_eq!(config.reveal_window, Duration::from_millis(DEFAULT_REVEAL_WINDOW_MS));
        assert_eq!(config.code_retry_budget, 2);
    }
}
