use crate::domain::preferences::Preferences;
use anyhow::Context;
use std::io::ErrorKind;
use std::path::PathBuf;

/// Preferences as a small JSON file: `{"language": "ko", "ai_model": "gemini"}`.
#[derive(Debug, Clone)]
pub struct PreferenceStore {
    path: PathBuf,
}

impl PreferenceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// A missing or unreadable file yields the defaults; only I/O failures other than
    /// "not found" are errors.
    pub fn load(&self) -> anyhow::Result<Preferences> {
        let body = match std::fs::read_to_string(&self.path) {
            Ok(body) => body,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "no saved preferences; using defaults");
                return Ok(Preferences::default());
            }
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("failed to read {}", self.path.display()));
            }
        };

        match serde_json::from_str(&body) {
            Ok(prefs) => Ok(prefs),
            Err(err) => {
                tracing::warn!(path = %self.path.display(), error = %err, "ignoring malformed preferences file");
                Ok(Preferences::default())
            }
        }
    }

    pub fn save(&self, prefs: &Preferences) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let body = serde_json::to_string_pretty(prefs).context("failed to serialize preferences")?;
        std::fs::write(&self.path, body)
            .with_context(|| format!("failed to write {}", self.path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::preferences::{AiModel, Language};
    use tempfile::{tempdir, TempDir};

    fn prefs_path(dir: &TempDir) -> PathBuf {
        dir.path().join("nested").join("preferences.json")
    }

    #[test]
    fn absent_file_loads_defaults() {
        let dir = tempdir().unwrap();
        let store = PreferenceStore::new(prefs_path(&dir));
        assert_eq!(store.load().unwrap(), Preferences::default());
    }

    #[test]
    fn save_creates_directories_and_round_trips() {
        let dir = tempdir().unwrap();
        let path = prefs_path(&dir);
        let store = PreferenceStore::new(&path);
        let prefs = Preferences {
            language: Language::En,
            ai_model: AiModel::Gpt,
        };
        store.save(&prefs).unwrap();
        assert_eq!(store.load().unwrap(), prefs);

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["language"], "en");
        assert_eq!(raw["ai_model"], "gpt");
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let dir = tempdir().unwrap();
        let path = prefs_path(&dir);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{not json").unwrap();
        assert_eq!(PreferenceStore::new(&path).load().unwrap(), Preferences::default());
    }
}
