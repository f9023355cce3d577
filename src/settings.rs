use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::entry::DEFAULT_MAX_NOTES_CHARS;
use crate::store::StorageBackend;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub debug: bool,
    pub remote: RemoteSettings,
    pub storage: StorageSettings,
    pub limits: LimitSettings,
    pub log: LogSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RemoteSettings {
    pub base_url: String,
    /// Bearer token; requests go out unauthenticated without one.
    #[serde(default)]
    pub token: Option<String>,
    pub timeout_secs: u64,
    pub probe_interval_secs: u64,
}

impl RemoteSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    pub fn probe_interval(&self) -> Duration {
        Duration::from_secs(self.probe_interval_secs.max(1))
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageSettings {
    pub backend: StorageBackend,
    pub data_dir: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LimitSettings {
    pub max_notes_chars: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LogSettings {
    pub dir: PathBuf,
}

pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "development" => Ok(Self::Development),
            "production" => Ok(Self::Production),
            other => Err(format!(
                "{} is not a supported environment. Use either 'development' or 'production'.",
                other
            )),
        }
    }
}

/// Settings from `./settings`, see [`get_settings_from`].
pub fn get_settings() -> Result<Settings, config::ConfigError> {
    let base_path = std::env::current_dir().map_err(|e| config::ConfigError::Foreign(Box::new(e)))?;
    get_settings_from(&base_path.join("settings"))
}

/// Layered settings: built-in defaults, `base.yaml`, `<environment>.yaml`
/// (both optional), then `APP_*` environment variables.
pub fn get_settings_from(settings_directory: &Path) -> Result<Settings, config::ConfigError> {
    let environment: Environment = std::env::var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "development".into())
        .try_into()
        .map_err(config::ConfigError::Message)?;
    let environment_filename = format!("{}.yaml", environment.as_str());

    let settings = config::Config::builder()
        .set_default("debug", false)?
        .set_default("remote.base_url", "http://localhost:3001")?
        .set_default("remote.timeout_secs", 10_i64)?
        .set_default("remote.probe_interval_secs", 30_i64)?
        .set_default("storage.backend", "auto")?
        .set_default("storage.data_dir", "./data")?
        .set_default("limits.max_notes_chars", DEFAULT_MAX_NOTES_CHARS as i64)?
        .set_default("log.dir", "./logs")?
        .add_source(config::File::from(settings_directory.join("base.yaml")).required(false))
        .add_source(config::File::from(settings_directory.join(environment_filename)).required(false))
        // E.g. 'APP_REMOTE__BASE_URL=http://10.0.2.2:3001' sets 'Settings.remote.base_url'
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    settings.try_deserialize::<Settings>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_without_files() {
        let dir = tempfile::tempdir().unwrap();
        let settings = get_settings_from(dir.path()).unwrap();
        assert_eq!(settings.storage.backend, StorageBackend::Auto);
        assert_eq!(settings.limits.max_notes_chars, DEFAULT_MAX_NOTES_CHARS);
        assert!(settings.remote.base_url.starts_with("http://"));
    }

    #[test]
    fn yaml_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("base.yaml"),
            "remote:\n  base_url: https://diary.example.com\n  token: abc\nstorage:\n  backend: json\n",
        )
        .unwrap();
        let settings = get_settings_from(dir.path()).unwrap();
        assert_eq!(settings.remote.base_url, "https://diary.example.com");
        assert_eq!(settings.remote.token.as_deref(), Some("abc"));
        assert_eq!(settings.storage.backend, StorageBackend::Json);
        assert_eq!(settings.remote.timeout(), Duration::from_secs(10));
    }
}
