use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use vidscribe_core::recognition::domain::decoding_policy::DecodingChoices;
use vidscribe_core::recognition::domain::model_size::{ModelSize, UnknownModelSize};

/// Persisted transcription defaults. Missing fields fall back to defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub model: String,
    pub language: String,
    pub vad: bool,
    pub suppress_singing: bool,
    pub high_accuracy: bool,
    pub strict: bool,
}

impl Default for Settings {
    fn default() -> Self {
        let choices = DecodingChoices::default();
        Self {
            model: choices.model_size.to_string(),
            language: choices.language,
            vad: choices.vad_enabled,
            suppress_singing: choices.suppress_singing,
            high_accuracy: choices.high_accuracy,
            strict: choices.strict_mode,
        }
    }
}

impl Settings {
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("Vidscribe").join("settings.json"))
    }

    pub fn load() -> Self {
        Self::config_path()
            .map(|path| Self::load_from(&path))
            .unwrap_or_default()
    }

    /// Unreadable or malformed files yield the defaults.
    pub fn load_from(path: &Path) -> Self {
        fs::read_to_string(path)
            .ok()
            .and_then(|json| serde_json::from_str(&json).ok())
            .unwrap_or_default()
    }

    pub fn save(&self) -> io::Result<PathBuf> {
        let path = Self::config_path()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no config directory"))?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(io::Error::other)?;
        fs::write(path, json)
    }

    pub fn to_choices(&self, prompt_hint: &str) -> Result<DecodingChoices, UnknownModelSize> {
        Ok(DecodingChoices {
            model_size: self.model.parse::<ModelSize>()?,
            language: self.language.clone(),
            prompt_hint: prompt_hint.to_string(),
            vad_enabled: self.vad,
            suppress_singing: self.suppress_singing,
            high_accuracy: self.high_accuracy,
            strict_mode: self.strict,
        })
    }
}
