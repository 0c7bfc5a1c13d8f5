//! Points balance and per-user settings storage.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Points and settings errors.
#[derive(Debug, Error)]
pub enum PointsError {
    #[error("Not enough points: have {balance}, need {cost}")]
    InsufficientPoints { balance: i64, cost: i64 },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid settings file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Could not write settings: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// UI language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Fr,
}

impl Language {
    /// Language code as stored.
    pub fn code(&self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Fr => "fr",
        }
    }

    /// Next language, wrapping around.
    pub fn next(&self) -> Self {
        match self {
            Self::En => Self::Fr,
            Self::Fr => Self::En,
        }
    }
}

/// Key-value settings persisted between runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub points: i64,
    #[serde(default)]
    pub language: Language,
}

/// Points balance backed by the settings file.
#[derive(Debug)]
pub struct PointsLedger {
    settings: Settings,
    path: Option<PathBuf>,
}

impl PointsLedger {
    /// Load from `path`. A missing file starts at zero.
    pub fn load(path: &Path) -> Result<Self, PointsError> {
        let settings = match std::fs::read_to_string(path) {
            Ok(s) => toml::from_str(&s)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Settings::default(),
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            settings,
            path: Some(path.to_path_buf()),
        })
    }

    /// Unpersisted ledger starting at `points`.
    pub fn in_memory(points: i64) -> Self {
        Self {
            settings: Settings {
                points,
                ..Settings::default()
            },
            path: None,
        }
    }

    /// Current balance.
    pub fn balance(&self) -> i64 {
        self.settings.points
    }

    /// Current language preference.
    pub fn language(&self) -> Language {
        self.settings.language
    }

    /// Change the language preference.
    pub fn set_language(&mut self, language: Language) -> Result<(), PointsError> {
        self.settings.language = language;
        self.save()
    }

    /// Add points and persist.
    pub fn award(&mut self, amount: i64) -> Result<(), PointsError> {
        self.settings.points = self.settings.points.saturating_add(amount.max(0));
        tracing::info!(amount, balance = self.settings.points, "points awarded");
        self.save()
    }

    /// Deduct `cost`. Rejected without any change when the balance is short.
    pub fn spend(&mut self, cost: i64) -> Result<(), PointsError> {
        if self.settings.points < cost {
            return Err(PointsError::InsufficientPoints {
                balance: self.settings.points,
                cost,
            });
        }
        self.settings.points -= cost;
        tracing::debug!(cost, balance = self.settings.points, "points spent");
        self.save()
    }

    fn save(&self) -> Result<(), PointsError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, toml::to_string_pretty(&self.settings)?)?;
        Ok(())
    }
}
