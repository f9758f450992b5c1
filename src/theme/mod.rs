use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{app_config_path, config_env_dirs, ConfigPathError, APP_DIR};

const PREFERENCES_FILE: &str = "preferences.json";
pub const ACCENT_KEY: &str = "smartfarm-accent";
pub const THEME_KEY: &str = "theme";

/// CSS custom properties that follow the accent color.
pub const ACCENT_PRIMARY_PROPERTIES: [&str; 3] = ["--primary", "--sidebar-primary", "--chart-1"];
pub const ACCENT_RING_PROPERTIES: [&str; 2] = ["--ring", "--sidebar-ring"];

pub type ThemeResult<T> = std::result::Result<T, ThemeError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    #[default]
    System,
    Light,
    Dark,
}

impl ThemeMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }
}

impl FromStr for ThemeMode {
    type Err = ThemeError;

    fn from_str(value: &str) -> ThemeResult<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "system" => Ok(Self::System),
            "light" => Ok(Self::Light),
            "dark" => Ok(Self::Dark),
            _ => Err(ThemeError::UnknownValue {
                key: THEME_KEY,
                value: value.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AccentColor {
    #[default]
    Green,
    Blue,
    Purple,
    Orange,
    Rose,
}

/// Resolved color values for an accent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccentTokens {
    pub primary: &'static str,
    pub ring: &'static str,
}

impl AccentColor {
    pub const ALL: [AccentColor; 5] = [
        Self::Green,
        Self::Blue,
        Self::Purple,
        Self::Orange,
        Self::Rose,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Green => "green",
            Self::Blue => "blue",
            Self::Purple => "purple",
            Self::Orange => "orange",
            Self::Rose => "rose",
        }
    }

    pub fn tokens(self) -> AccentTokens {
        let value = match self {
            Self::Green => "oklch(0.55 0.15 145)",
            Self::Blue => "oklch(0.55 0.15 240)",
            Self::Purple => "oklch(0.55 0.15 300)",
            Self::Orange => "oklch(0.65 0.18 50)",
            Self::Rose => "oklch(0.55 0.18 10)",
        };
        AccentTokens {
            primary: value,
            ring: value,
        }
    }
}

impl FromStr for AccentColor {
    type Err = ThemeError;

    fn from_str(value: &str) -> ThemeResult<Self> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|color| color.as_str() == normalized)
            .ok_or_else(|| ThemeError::UnknownValue {
                key: ACCENT_KEY,
                value: value.to_string(),
            })
    }
}

#[derive(Debug, Error)]
pub enum ThemeError {
    #[error("missing HOME environment variable")]
    MissingHomeDirectory,
    #[error("failed to read preferences: {path}")]
    ReadConfig { path: PathBuf, source: io::Error },
    #[error("failed to write preferences: {path}")]
    WriteConfig { path: PathBuf, source: io::Error },
    #[error("failed to parse preferences")]
    ParseConfig(#[from] serde_json::Error),
    #[error("unknown value {value:?} for `{key}`")]
    UnknownValue { key: &'static str, value: String },
}

/// String key-value persistence for UI preferences.
pub trait PreferenceStore {
    fn get(&self, key: &str) -> ThemeResult<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> ThemeResult<()>;
}

/// Preferences kept as a flat JSON object in the config directory.
#[derive(Debug, Clone)]
pub struct FilePreferenceStore {
    path: PathBuf,
}

impl FilePreferenceStore {
    pub fn open_default() -> ThemeResult<Self> {
        let (xdg_config_home, home) = config_env_dirs();
        Self::open_with(xdg_config_home.as_deref(), home.as_deref())
    }

    fn open_with(xdg_config_home: Option<&Path>, home: Option<&Path>) -> ThemeResult<Self> {
        let path = app_config_path(APP_DIR, PREFERENCES_FILE, xdg_config_home, home).map_err(
            |error| match error {
                ConfigPathError::MissingHomeDirectory => ThemeError::MissingHomeDirectory,
            },
        )?;
        Ok(Self { path })
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> ThemeResult<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let serialized = fs::read_to_string(&self.path).map_err(|source| ThemeError::ReadConfig {
            path: self.path.clone(),
            source,
        })?;
        Ok(serde_json::from_str(&serialized)?)
    }
}

impl PreferenceStore for FilePreferenceStore {
    fn get(&self, key: &str) -> ThemeResult<Option<String>> {
        Ok(self.read_all()?.remove(key))
    }

    fn set(&mut self, key: &str, value: &str) -> ThemeResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| ThemeError::WriteConfig {
                path: self.path.clone(),
                source,
            })?;
        }

        // Keep other keys; an unreadable file is replaced.
        let mut entries = self.read_all().unwrap_or_default();
        entries.insert(key.to_string(), value.to_string());
        let serialized = serde_json::to_string_pretty(&entries)?;
        fs::write(&self.path, serialized).map_err(|source| ThemeError::WriteConfig {
            path: self.path.clone(),
            source,
        })?;
        Ok(())
    }
}

/// Application-scoped accent and theme-mode preference.
///
/// Reads storage once in `init`; every setter persists immediately.
#[derive(Debug)]
pub struct AccentStore<S: PreferenceStore> {
    storage: S,
    accent: AccentColor,
    mode: ThemeMode,
}

impl<S: PreferenceStore> AccentStore<S> {
    pub fn init(storage: S) -> Self {
        let accent: AccentColor = load_preference(&storage, ACCENT_KEY);
        let mode: ThemeMode = load_preference(&storage, THEME_KEY);
        tracing::debug!(accent = accent.as_str(), mode = mode.as_str(), "preferences loaded");
        Self {
            storage,
            accent,
            mode,
        }
    }

    pub fn accent(&self) -> AccentColor {
        self.accent
    }

    pub fn mode(&self) -> ThemeMode {
        self.mode
    }

    pub fn set_accent(&mut self, accent: AccentColor) -> ThemeResult<()> {
        self.accent = accent;
        self.storage.set(ACCENT_KEY, accent.as_str())?;
        tracing::info!(accent = accent.as_str(), "accent color saved");
        Ok(())
    }

    pub fn set_mode(&mut self, mode: ThemeMode) -> ThemeResult<()> {
        self.mode = mode;
        self.storage.set(THEME_KEY, mode.as_str())?;
        tracing::info!(mode = mode.as_str(), "theme mode saved");
        Ok(())
    }

    /// Custom property assignments for the current accent.
    pub fn css_properties(&self) -> Vec<(&'static str, &'static str)> {
        let tokens = self.accent.tokens();
        let mut properties = Vec::with_capacity(5);
        properties.extend(ACCENT_PRIMARY_PROPERTIES.map(|name| (name, tokens.primary)));
        properties.extend(ACCENT_RING_PROPERTIES.map(|name| (name, tokens.ring)));
        properties
    }
}

fn load_preference<T, S>(storage: &S, key: &str) -> T
where
    T: FromStr<Err = ThemeError> + Default,
    S: PreferenceStore,
{
    match storage.get(key) {
        Ok(Some(raw)) => raw.parse().unwrap_or_else(|err| {
            tracing::warn!("ignoring stored preference: {err}");
            T::default()
        }),
        Ok(None) => T::default(),
        Err(err) => {
            tracing::warn!(key, "failed to read preferences: {err}");
            T::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture_root() -> PathBuf {
        let mut path = std::env::temp_dir();
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::SystemTime::UNIX_EPOCH)
            .map_or(0, |d| d.as_nanos());
        let pid = std::process::id();
        path.push(format!("smartfarm-theme-{pid}-{nanos}"));
        path
    }

    fn with_temp_root<F: FnOnce(&Path)>(f: F) {
        let root = fixture_root();
        fs::create_dir_all(&root).unwrap();
        f(&root);
        let _ = fs::remove_dir_all(&root);
    }

    fn store_in(root: &Path) -> FilePreferenceStore {
        FilePreferenceStore::open_with(Some(root), None).unwrap()
    }

    #[test]
    fn accent_defaults_to_green_when_missing() {
        with_temp_root(|root| {
            let store = AccentStore::init(store_in(root));
            assert_eq!(store.accent(), AccentColor::Green);
            assert_eq!(store.mode(), ThemeMode::System);
        });
    }

    #[test]
    fn accent_persists_across_init() {
        with_temp_root(|root| {
            let mut store = AccentStore::init(store_in(root));
            store.set_accent(AccentColor::Purple).unwrap();
            store.set_mode(ThemeMode::Dark).unwrap();

            let reloaded = AccentStore::init(store_in(root));
            assert_eq!(reloaded.accent(), AccentColor::Purple);
            assert_eq!(reloaded.mode(), ThemeMode::Dark);

            let raw = fs::read_to_string(root.join("smartfarm/preferences.json")).unwrap();
            let entries: BTreeMap<String, String> = serde_json::from_str(&raw).unwrap();
            assert_eq!(entries.get("smartfarm-accent").map(String::as_str), Some("purple"));
            assert_eq!(entries.get("theme").map(String::as_str), Some("dark"));
        });
    }

    #[test]
    fn unknown_stored_accent_falls_back_to_green() {
        with_temp_root(|root| {
            let mut preferences = store_in(root);
            preferences.set(ACCENT_KEY, "chartreuse").unwrap();
            preferences.set(THEME_KEY, "light").unwrap();

            let store = AccentStore::init(preferences);
            assert_eq!(store.accent(), AccentColor::Green);
            assert_eq!(store.mode(), ThemeMode::Light);
        });
    }

    #[test]
    fn corrupt_preferences_file_falls_back_to_defaults() {
        with_temp_root(|root| {
            let preferences = store_in(root);
            fs::create_dir_all(preferences.path().parent().unwrap()).unwrap();
            fs::write(preferences.path(), "{broken").unwrap();

            let mut store = AccentStore::init(preferences);
            assert_eq!(store.accent(), AccentColor::Green);

            store.set_accent(AccentColor::Rose).unwrap();
            assert_eq!(AccentStore::init(store_in(root)).accent(), AccentColor::Rose);
        });
    }

    #[test]
    fn css_properties_follow_accent() {
        with_temp_root(|root| {
            let mut store = AccentStore::init(store_in(root));
            store.set_accent(AccentColor::Orange).unwrap();

            let properties = store.css_properties();
            assert_eq!(properties.len(), 5);
            for name in ["--primary", "--ring", "--sidebar-primary", "--sidebar-ring", "--chart-1"] {
                assert!(properties.contains(&(name, "oklch(0.65 0.18 50)")), "{name}");
            }
        });
    }

    #[test]
    fn accent_names_parse_case_insensitively() {
        assert_eq!("Blue".parse::<AccentColor>().unwrap(), AccentColor::Blue);
        assert!(matches!(
            "teal".parse::<AccentColor>(),
            Err(ThemeError::UnknownValue { key: ACCENT_KEY, .. })
        ));
    }

    #[test]
    fn preferences_path_falls_back_to_home() {
        let store = FilePreferenceStore::open_with(None, Some(Path::new("/tmp/home"))).unwrap();
        assert_eq!(
            store.path(),
            Path::new("/tmp/home/.config/smartfarm/preferences.json")
        );
        assert!(matches!(
            FilePreferenceStore::open_with(None, None),
            Err(ThemeError::MissingHomeDirectory)
        ));
    }
}
