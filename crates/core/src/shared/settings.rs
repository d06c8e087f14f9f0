use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::shared::constants::{
    APP_DIR_NAME, DEFAULT_COOLDOWN_SECS, DEFAULT_DETECTION_CONFIDENCE, DEFAULT_NOTIFY_TIMEOUT_SECS,
    DEFAULT_SIMILARITY_THRESHOLD, SETTINGS_FILENAME, STORE_FILENAME,
};

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("failed to read settings from {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse settings in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid setting: {0}")]
    Invalid(String),
    #[error("could not determine {0} directory")]
    NoDirectory(&'static str),
}

/// Recognition settings persisted as JSON.
///
/// Every field has a default so partial files are accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Minimum cosine similarity for a face to count as a match.
    pub threshold: f32,
    /// Minimum seconds between two notifications for the same identity.
    pub cooldown_secs: u64,
    /// Embedding store file; defaults to the platform data directory.
    pub store_path: Option<PathBuf>,
    /// HTTP(S) endpoint receiving recognition events.
    pub notify_url: Option<String>,
    pub notify_timeout_secs: u64,
    /// Whether the similarity score is sent with each event.
    pub include_score: bool,
    pub detection_confidence: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_SIMILARITY_THRESHOLD,
            cooldown_secs: DEFAULT_COOLDOWN_SECS,
            store_path: None,
            notify_url: None,
            notify_timeout_secs: DEFAULT_NOTIFY_TIMEOUT_SECS,
            include_score: true,
            detection_confidence: DEFAULT_DETECTION_CONFIDENCE,
        }
    }
}

impl Settings {
    /// `<config_dir>/FaceWatch/settings.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(APP_DIR_NAME).join(SETTINGS_FILENAME))
    }

    /// Loads settings from `path`. A missing file yields defaults; a file
    /// that exists but cannot be read or parsed is an error.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let json = fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let settings: Settings =
            serde_json::from_str(&json).map_err(|source| SettingsError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if !(-1.0..=1.0).contains(&self.threshold) {
            return Err(SettingsError::Invalid(format!(
                "threshold must be between -1.0 and 1.0, got {}",
                self.threshold
            )));
        }
        if self.notify_timeout_secs == 0 {
            return Err(SettingsError::Invalid(
                "notify_timeout_secs must be positive".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.detection_confidence) {
            return Err(SettingsError::Invalid(format!(
                "detection_confidence must be between 0.0 and 1.0, got {}",
                self.detection_confidence
            )));
        }
        if let Some(url) = &self.notify_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(SettingsError::Invalid(format!(
                    "notify_url must start with http:// or https://, got '{url}'"
                )));
            }
        }
        Ok(())
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }

    pub fn notify_timeout(&self) -> Duration {
        Duration::from_secs(self.notify_timeout_secs)
    }

    /// Configured store path, or `<data_dir>/FaceWatch/faces_db.json`.
    pub fn resolved_store_path(&self) -> Result<PathBuf, SettingsError> {
        if let Some(path) = &self.store_path {
            return Ok(path.clone());
        }
        dirs::data_dir()
            .map(|d| d.join(APP_DIR_NAME).join(STORE_FILENAME))
            .ok_or(SettingsError::NoDirectory("data"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_defaults() {
        let s = Settings::default();
        assert_eq!(s.threshold, 0.5);
        assert_eq!(s.cooldown(), Duration::from_secs(5));
        assert!(s.notify_url.is_none());
        assert!(s.include_score);
        assert!(s.validate().is_ok());
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let s = Settings::load(&dir.path().join("absent.json")).unwrap();
        assert_eq!(s, Settings::default());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(
            &path,
            r#"{"threshold": 0.6, "notify_url": "http://localhost:8080/events"}"#,
        )
        .unwrap();

        let s = Settings::load(&path).unwrap();

        assert_eq!(s.threshold, 0.6);
        assert_eq!(s.notify_url.as_deref(), Some("http://localhost:8080/events"));
        assert_eq!(s.cooldown_secs, DEFAULT_COOLDOWN_SECS);
    }

    #[test]
    fn test_malformed_file_is_error_not_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ threshold: ").unwrap();

        assert!(matches!(
            Settings::load(&path),
            Err(SettingsError::Parse { .. })
        ));
    }

    #[test]
    fn test_invalid_value_in_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"threshold": 3.0}"#).unwrap();

        assert!(matches!(
            Settings::load(&path),
            Err(SettingsError::Invalid(_))
        ));
    }

    #[test]
    fn test_round_trip_through_json() {
        let s = Settings {
            store_path: Some(PathBuf::from("/tmp/faces.json")),
            include_score: false,
            ..Settings::default()
        };
        let json = serde_json::to_string_pretty(&s).unwrap();
        let back: Settings = serde_json::from_str(&json).unwrap();
        assert_eq!(back, s);
    }

    #[rstest]
    #[case::threshold_low(Settings { threshold: -1.5, ..Settings::default() })]
    #[case::zero_timeout(Settings { notify_timeout_secs: 0, ..Settings::default() })]
    #[case::confidence(Settings { detection_confidence: 1.5, ..Settings::default() })]
    #[case::bad_scheme(Settings { notify_url: Some("ftp://host/x".into()), ..Settings::default() })]
    fn test_validate_rejects(#[case] settings: Settings) {
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_explicit_store_path_wins() {
        let s = Settings {
            store_path: Some(PathBuf::from("/srv/faces.json")),
            ..Settings::default()
        };
        assert_eq!(
            s.resolved_store_path().unwrap(),
            PathBuf::from("/srv/faces.json")
        );
    }
}
