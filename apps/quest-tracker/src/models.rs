//! Data models for quest tracking.

use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// Unique quest identifier.
pub type QuestId = Uuid;

/// A quest to complete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quest {
    /// Unique identifier.
    pub id: QuestId,
    /// Short label shown in lists.
    pub title: String,
    /// Grouping used for the prizes table.
    pub category: Category,
    /// Evidence file supporting completion.
    pub document: Option<PathBuf>,
    /// When the quest was completed. `Some` exactly when the quest is done.
    pub completion_date: Option<DateTime<Utc>>,
    /// When the quest was created.
    pub created_at: DateTime<Utc>,
}

impl Quest {
    /// Create a new open quest.
    pub fn new(title: impl Into<String>, category: Category) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            category,
            document: None,
            completion_date: None,
            created_at: Utc::now(),
        }
    }

    /// Whether the quest has been completed.
    pub fn is_completed(&self) -> bool {
        self.completion_date.is_some()
    }

    /// Mark the quest completed at `at`.
    pub fn complete(&mut self, at: DateTime<Utc>) {
        self.completion_date = Some(at);
    }

    /// Mark the quest open again.
    pub fn reopen(&mut self) {
        self.completion_date = None;
    }

    /// Local calendar day the quest was completed on.
    pub fn completion_day(&self) -> Option<NaiveDate> {
        self.completion_date
            .map(|at| at.with_timezone(&Local).date_naive())
    }
}

/// Quest category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Category {
    #[default]
    Study,
    Dev,
    Work,
    Health,
    Home,
}

impl Category {
    /// All categories in display order.
    pub const ALL: [Category; 5] = [
        Category::Study,
        Category::Dev,
        Category::Work,
        Category::Health,
        Category::Home,
    ];

    /// Stored and displayed name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Study => "Study",
            Self::Dev => "Dev",
            Self::Work => "Work",
            Self::Health => "Health",
            Self::Home => "Home",
        }
    }

    /// Parse a stored name. Unknown names fall back to `Study`.
    pub fn from_str_lossy(s: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s))
            .unwrap_or_default()
    }

    /// Next category, wrapping around.
    pub fn next(&self) -> Self {
        let idx = Self::ALL.iter().position(|c| c == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_quest_is_open() {
        let quest = Quest::new("Read chapter 3", Category::Study);
        assert!(!quest.is_completed());
        assert!(quest.completion_date.is_none());
        assert!(quest.document.is_none());
    }

    #[test]
    fn test_complete_and_reopen() {
        let mut quest = Quest::new("Ship release", Category::Dev);
        let now = Utc::now();
        quest.complete(now);
        assert!(quest.is_completed());
        assert_eq!(quest.completion_date, Some(now));

        quest.reopen();
        assert!(!quest.is_completed());
        assert!(quest.completion_day().is_none());
    }

    #[test]
    fn test_category_parsing() {
        assert_eq!(Category::from_str_lossy("Dev"), Category::Dev);
        assert_eq!(Category::from_str_lossy("health"), Category::Health);
        assert_eq!(Category::from_str_lossy("Gardening"), Category::Study);
    }

    #[test]
    fn test_category_cycle_wraps() {
        assert_eq!(Category::Study.next(), Category::Dev);
        assert_eq!(Category::Home.next(), Category::Study);
    }
}
