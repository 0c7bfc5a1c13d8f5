//! Configuration for quest tracker.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const APP_NAME: &str = "quest-tracker";

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Display settings.
    #[serde(default)]
    pub display: DisplayConfig,
    /// Point values.
    #[serde(default)]
    pub rewards: RewardConfig,
    /// Challenge thresholds.
    #[serde(default)]
    pub challenges: ChallengeConfig,
}

impl Config {
    /// Load configuration from default path.
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };

        match std::fs::read_to_string(&path) {
            Ok(s) => toml::from_str(&s).unwrap_or_else(|e| {
                tracing::warn!(path = %path.display(), error = %e, "invalid config, using defaults");
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Save configuration to default path.
    pub fn save(&self) -> anyhow::Result<()> {
        if let Some(path) = Self::config_path() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let content = toml::to_string_pretty(self)?;
            std::fs::write(path, content)?;
        }
        Ok(())
    }

    /// Get configuration file path.
    pub fn config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", APP_NAME)
            .map(|d| d.config_dir().join("config.toml"))
    }

    /// Get database path.
    pub fn db_path() -> Option<PathBuf> {
        Self::data_file("quests.db")
    }

    /// Get settings (points, language) path.
    pub fn settings_path() -> Option<PathBuf> {
        Self::data_file("settings.toml")
    }

    /// Get log file path.
    pub fn log_path() -> Option<PathBuf> {
        Self::data_file("quest-tracker.log")
    }

    fn data_file(name: &str) -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", APP_NAME).map(|d| d.data_dir().join(name))
    }
}

/// Display settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// First day of week in the calendar.
    #[serde(default)]
    pub week_start: WeekStart,
    /// Date format string.
    #[serde(default = "default_date_format")]
    pub date_format: String,
    /// Show completed quests at bottom.
    #[serde(default = "default_true")]
    pub completed_at_bottom: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            week_start: WeekStart::Monday,
            date_format: default_date_format(),
            completed_at_bottom: true,
        }
    }
}

fn default_date_format() -> String {
    "%Y-%m-%d".to_string()
}

fn default_true() -> bool {
    true
}

/// First day of week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum WeekStart {
    #[default]
    Monday,
    Sunday,
}

/// Point values for every reward and cost.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardConfig {
    /// Awarded when a quest is completed.
    pub quest_completed: i64,
    /// Cost of one roll.
    pub roll_cost: i64,
    /// Awarded when all three slots match.
    pub roll_win: i64,
    /// "Complete a quest today" challenge.
    pub today_challenge: i64,
    /// Consecutive days challenge.
    pub streak_challenge: i64,
    /// Total completed challenge.
    pub total_challenge: i64,
    /// Daily prize, available once any challenge is met.
    pub prize: i64,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            quest_completed: 100,
            roll_cost: 3,
            roll_win: 30,
            today_challenge: 50,
            streak_challenge: 100,
            total_challenge: 200,
            prize: 50,
        }
    }
}

/// Challenge thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChallengeConfig {
    /// Length of the consecutive-days run.
    pub consecutive_days: u32,
    /// Completed quests needed for the total challenge.
    pub total_quests: usize,
}

impl Default for ChallengeConfig {
    fn default() -> Self {
        Self {
            consecutive_days: 5,
            total_quests: 20,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [rewards]
            roll_cost = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.rewards.roll_cost, 5);
        assert_eq!(config.rewards.quest_completed, 100);
        assert_eq!(config.challenges.consecutive_days, 5);
        assert_eq!(config.display.week_start, WeekStart::Monday);
    }

    #[test]
    fn test_week_start_lowercase() {
        let config: Config = toml::from_str(
            r#"
            [display]
            week_start = "sunday"
            "#,
        )
        .unwrap();
        assert_eq!(config.display.week_start, WeekStart::Sunday);
        assert!(config.display.completed_at_bottom);
    }
}
