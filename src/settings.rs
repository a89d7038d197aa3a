use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::bank::detect::{default_rules, DetectionRule, DEFAULT_PREVIEW_ROWS};
use crate::error::{Result, SitebookError};
use crate::schedule::ScheduleVocabulary;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankSettings {
    #[serde(default = "default_preview_rows")]
    pub preview_rows: usize,
    /// Evaluated in order, first match wins.
    #[serde(default = "default_rules")]
    pub detection_rules: Vec<DetectionRule>,
}

fn default_preview_rows() -> usize {
    DEFAULT_PREVIEW_ROWS
}

impl Default for BankSettings {
    fn default() -> Self {
        Self {
            preview_rows: default_preview_rows(),
            detection_rules: default_rules(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub bank: BankSettings,
    #[serde(default)]
    pub schedule: ScheduleVocabulary,
}

fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("sitebook")
}

pub fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

/// Missing file means built-in defaults; a file that does not parse is an
/// error rather than a silent fallback.
pub fn load_settings(path: &Path) -> Result<Settings> {
    if !path.exists() {
        return Ok(Settings::default());
    }
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content)
        .map_err(|e| SitebookError::Settings(format!("{}: {e}", path.display())))
}

pub fn save_settings(settings: &Settings, path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let json = serde_json::to_string_pretty(settings)?;
    std::fs::write(path, format!("{json}\n"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::ScheduleField;

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let mut settings = Settings::default();
        settings.bank.preview_rows = 15;
        settings
            .schedule
            .aliases
            .insert(ScheduleField::WorkItem, vec!["Item".to_string()]);
        save_settings(&settings, &path).unwrap();
        let loaded = load_settings(&path).unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_load_returns_defaults_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let s = load_settings(&dir.path().join("nope.json")).unwrap();
        assert_eq!(s, Settings::default());
        assert_eq!(s.bank.preview_rows, 10);
        assert_eq!(s.bank.detection_rules.len(), 8);
    }

    #[test]
    fn test_load_merges_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"bank": {"preview_rows": 12}}"#).unwrap();
        let s = load_settings(&path).unwrap();
        assert_eq!(s.bank.preview_rows, 12);
        assert_eq!(s.bank.detection_rules, default_rules());
        assert_eq!(s.schedule, ScheduleVocabulary::default());
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = load_settings(&path).unwrap_err();
        assert!(matches!(err, SitebookError::Settings(_)));
    }

    #[test]
    fn test_save_creates_config_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deep").join("nested").join("settings.json");
        save_settings(&Settings::default(), &path).unwrap();
        assert!(path.exists());
    }
}
