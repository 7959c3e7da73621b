use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use super::error::ConfigError;
use super::state::ProgressOverflow;
use super::state::ProgressPolicy;

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub realtime: RealtimeConfig,
    pub progress: ProgressConfig,
    pub storage: StorageConfig,
    pub layout: LayoutConfig,
}

impl Config {
    pub fn from_toml_str(raw: &str, path: &Path) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Missing file means defaults; anything else unreadable is an error.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(raw) => Self::from_toml_str(&raw, path),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    pub fn channel_url(&self) -> String {
        self.realtime
            .url
            .clone()
            .unwrap_or_else(|| self.server.ws_url())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=100).contains(&self.progress.step) {
            return Err(ConfigError::Invalid(format!(
                "progress.step must be within 1..=100, got {}",
                self.progress.step
            )));
        }
        if !self.server.base_url.starts_with("http://") && !self.server.base_url.starts_with("https://")
        {
            return Err(ConfigError::Invalid(format!(
                "server.base_url must be an http(s) URL, got {}",
                self.server.base_url
            )));
        }
        if let Some(url) = &self.realtime.url {
            if !url.starts_with("ws://") && !url.starts_with("wss://") {
                return Err(ConfigError::Invalid(format!(
                    "realtime.url must be a ws(s) URL, got {url}"
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub base_url: String,
    pub ws_path: String,
    pub request_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:9000".to_string(),
            ws_path: "/ws".to_string(),
            request_timeout_ms: 10_000,
        }
    }
}

impl ServerConfig {
    pub fn ws_url(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        let base = if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            base.to_string()
        };
        format!("{base}/{}", self.ws_path.trim_start_matches('/'))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct RealtimeConfig {
    /// Relay address when it is not served next to the HTTP API.
    pub url: Option<String>,
    pub reconnect_delay_ms: u64,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            url: None,
            reconnect_delay_ms: 5_000,
        }
    }
}

impl RealtimeConfig {
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct ProgressConfig {
    pub step: u8,
    pub overflow: ProgressOverflow,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        let policy = ProgressPolicy::default();
        Self {
            step: policy.step,
            overflow: policy.overflow,
        }
    }
}

impl ProgressConfig {
    pub fn policy(&self) -> ProgressPolicy {
        ProgressPolicy {
            step: self.step,
            overflow: self.overflow,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct StorageConfig {
    pub preferences_path: Option<PathBuf>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct LayoutConfig {
    pub dir: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let config = Config::from_toml_str("", Path::new("config.toml")).expect("config");
        assert_eq!(config.server.ws_url(), "ws://localhost:9000/ws");
        assert_eq!(config.progress.policy(), ProgressPolicy::default());
        assert_eq!(config.realtime.reconnect_delay(), Duration::from_secs(5));
    }

    #[test]
    fn partial_sections_override_only_named_keys() {
        let raw = r#"
[server]
base_url = "https://chores.example/"

[progress]
step = 20
overflow = "wrap"
"#;
        let config = Config::from_toml_str(raw, Path::new("config.toml")).expect("config");
        assert_eq!(config.server.ws_url(), "wss://chores.example/ws");
        assert_eq!(config.server.request_timeout_ms, 10_000);
        assert_eq!(
            config.progress.policy(),
            ProgressPolicy {
                step: 20,
                overflow: ProgressOverflow::Wrap,
            }
        );
    }

    #[test]
    fn rejects_out_of_range_step() {
        let err = Config::from_toml_str("[progress]\nstep = 0\n", Path::new("c.toml"))
            .expect_err("invalid");
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn realtime_url_overrides_derived_channel_url() {
        let config = Config::from_toml_str(
            "[realtime]\nurl = \"ws://relay.local:9001/ws\"\n",
            Path::new("c.toml"),
        )
        .expect("config");
        assert_eq!(config.channel_url(), "ws://relay.local:9001/ws");
        assert_eq!(Config::default().channel_url(), "ws://localhost:9000/ws");

        let err = Config::from_toml_str("[realtime]\nurl = \"http://x\"\n", Path::new("c.toml"))
            .expect_err("invalid");
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn missing_file_is_default() {
        let dir = tempfile::tempdir().expect("tmpdir");
        let config = Config::load(&dir.path().join("absent.toml")).expect("defaults");
        assert_eq!(config.server.base_url, "http://localhost:9000");
    }
}
