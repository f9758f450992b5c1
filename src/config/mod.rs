use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ConfigPathError {
    MissingHomeDirectory,
}

pub(crate) const APP_DIR: &str = "smartfarm";
const APP_CONFIG_FILE: &str = "config.json";
const DEVICE_URL_ENV: &str = "SMARTFARM_PI_URL";

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(5_000);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("device url is not configured (set {DEVICE_URL_ENV}, --device-url or config.json)")]
    MissingDeviceUrl,
    #[error("poll interval must be positive")]
    ZeroPollInterval,
}

/// Application-level settings from `config.json`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub device_url: Option<String>,
    #[serde(default)]
    pub poll_interval_ms: Option<u64>,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    #[serde(default)]
    pub preview_dir: Option<PathBuf>,
}

/// Fully resolved settings used to build the device client and poller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceSettings {
    pub base_url: String,
    pub poll_interval: Duration,
    pub request_timeout: Duration,
    pub preview_dir: Option<PathBuf>,
}

impl AppConfig {
    /// Layers the environment and an explicit override on top of the file.
    /// Precedence: `url_override`, then `SMARTFARM_PI_URL`, then `device_url`.
    pub fn resolve(
        &self,
        url_override: Option<&str>,
        env_url: Option<&str>,
    ) -> Result<DeviceSettings, ConfigError> {
        let base_url = [url_override, env_url, self.device_url.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|url| !url.is_empty())
            .map(|url| url.trim_end_matches('/').to_string())
            .ok_or(ConfigError::MissingDeviceUrl)?;

        let poll_interval = match self.poll_interval_ms {
            Some(0) => return Err(ConfigError::ZeroPollInterval),
            Some(ms) => Duration::from_millis(ms),
            None => DEFAULT_POLL_INTERVAL,
        };
        let request_timeout = self
            .request_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT);

        Ok(DeviceSettings {
            base_url,
            poll_interval,
            request_timeout,
            preview_dir: self.preview_dir.clone(),
        })
    }
}

pub fn device_url_from_env() -> Option<String> {
    std::env::var(DEVICE_URL_ENV).ok()
}

pub fn load_app_config() -> AppConfig {
    let (xdg_config_home, home) = config_env_dirs();
    load_app_config_with(xdg_config_home.as_deref(), home.as_deref())
}

fn load_app_config_with(xdg_config_home: Option<&Path>, home: Option<&Path>) -> AppConfig {
    let path = match app_config_path(APP_DIR, APP_CONFIG_FILE, xdg_config_home, home) {
        Ok(p) => p,
        Err(_) => return AppConfig::default(),
    };
    if !path.exists() {
        return AppConfig::default();
    }
    match std::fs::read_to_string(&path) {
        Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|err| {
            tracing::warn!(?err, ?path, "failed to parse config.json; using defaults");
            AppConfig::default()
        }),
        Err(err) => {
            tracing::warn!(?err, ?path, "failed to read config.json; using defaults");
            AppConfig::default()
        }
    }
}

pub(crate) fn config_env_dirs() -> (Option<PathBuf>, Option<PathBuf>) {
    (
        std::env::var_os("XDG_CONFIG_HOME").map(PathBuf::from),
        std::env::var_os("HOME").map(PathBuf::from),
    )
}

pub(crate) fn app_config_path(
    app_dir: &str,
    file_name: &str,
    xdg_config_home: Option<&Path>,
    home: Option<&Path>,
) -> Result<PathBuf, ConfigPathError> {
    let mut path = config_root(xdg_config_home, home)?;
    path.push(app_dir);
    path.push(file_name);
    Ok(path)
}

fn config_root(
    xdg_config_home: Option<&Path>,
    home: Option<&Path>,
) -> Result<PathBuf, ConfigPathError> {
    if let Some(xdg) = xdg_config_home.filter(|path| !path.as_os_str().is_empty()) {
        return Ok(xdg.to_path_buf());
    }

    let home = home.ok_or(ConfigPathError::MissingHomeDirectory)?;
    Ok(home.join(".config"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_config_path_prefers_xdg_config_home() {
        let path = app_config_path(
            "smartfarm",
            "config.json",
            Some(Path::new("/tmp/config-root")),
            Some(Path::new("/tmp/home")),
        )
        .expect("path should resolve");

        assert_eq!(path, PathBuf::from("/tmp/config-root/smartfarm/config.json"));
    }

    #[test]
    fn app_config_path_falls_back_to_home_dot_config() {
        let path = app_config_path("smartfarm", "config.json", None, Some(Path::new("/tmp/home")))
            .expect("path should resolve");

        assert_eq!(path, PathBuf::from("/tmp/home/.config/smartfarm/config.json"));
    }

    #[test]
    fn app_config_path_errors_when_home_missing_and_xdg_unset() {
        let error = app_config_path("smartfarm", "config.json", None, None).unwrap_err();
        assert_eq!(error, ConfigPathError::MissingHomeDirectory);
    }

    #[test]
    fn load_app_config_reads_device_settings() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("smartfarm");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("config.json"),
            r#"{"device_url":"http://192.168.100.61:8000","poll_interval_ms":2000}"#,
        )
        .unwrap();

        let config = load_app_config_with(Some(root.path()), None);
        assert_eq!(config.device_url.as_deref(), Some("http://192.168.100.61:8000"));
        assert_eq!(config.poll_interval_ms, Some(2000));
        assert!(config.request_timeout_secs.is_none());
    }

    #[test]
    fn load_app_config_falls_back_to_defaults_on_invalid_json() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("smartfarm");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("config.json"), "{not json").unwrap();

        let config = load_app_config_with(Some(root.path()), None);
        assert!(config.device_url.is_none());
    }

    #[test]
    fn resolve_prefers_override_then_env_then_file() {
        let config = AppConfig {
            device_url: Some("http://file:8000".to_string()),
            ..AppConfig::default()
        };

        let settings = config
            .resolve(Some("http://flag:8000/"), Some("http://env:8000"))
            .unwrap();
        assert_eq!(settings.base_url, "http://flag:8000");

        let settings = config.resolve(None, Some("http://env:8000")).unwrap();
        assert_eq!(settings.base_url, "http://env:8000");

        let settings = config.resolve(None, Some("  ")).unwrap();
        assert_eq!(settings.base_url, "http://file:8000");
        assert_eq!(settings.poll_interval, DEFAULT_POLL_INTERVAL);
        assert_eq!(settings.request_timeout, DEFAULT_REQUEST_TIMEOUT);
    }

    #[test]
    fn resolve_rejects_missing_url_and_zero_interval() {
        let config = AppConfig::default();
        assert_eq!(
            config.resolve(None, None).unwrap_err(),
            ConfigError::MissingDeviceUrl
        );

        let config = AppConfig {
            device_url: Some("http://pi:8000".to_string()),
            poll_interval_ms: Some(0),
            ..AppConfig::default()
        };
        assert_eq!(
            config.resolve(None, None).unwrap_err(),
            ConfigError::ZeroPollInterval
        );
    }
}
