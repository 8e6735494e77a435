//! Review note model

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Period a review note covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReviewPeriod {
    Day,
    Week,
    Month,
    Year,
}

/// A retrospective note anchored to a day/week/month/year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewNote {
    pub id: String,
    pub period: ReviewPeriod,
    /// Date anchor; any date inside the period identifies it
    pub date: NaiveDate,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub reflection: Option<String>,
    #[serde(default)]
    pub next_plan: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ReviewNote {
    #[must_use]
    pub fn new(period: ReviewPeriod, date: NaiveDate, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            period,
            date,
            title: title.into(),
            content: String::new(),
            reflection: None,
            next_plan: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether this note covers the period containing `date`.
    #[must_use]
    pub fn covers(&self, date: NaiveDate) -> bool {
        match self.period {
            ReviewPeriod::Day => self.date == date,
            ReviewPeriod::Week => week_start(self.date) == week_start(date),
            ReviewPeriod::Month => {
                self.date.year() == date.year() && self.date.month() == date.month()
            }
            ReviewPeriod::Year => self.date.year() == date.year(),
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Monday of the week containing `date`.
#[must_use]
pub fn week_start(date: NaiveDate) -> NaiveDate {
    let days_from_monday = date.weekday().num_days_from_monday();
    date - Duration::days(i64::from(days_from_monday))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn week_start_is_monday() {
        let sunday = date(2024, 3, 10);
        let monday = week_start(sunday);
        assert_eq!(monday, date(2024, 3, 4));
        assert_eq!(monday.weekday(), Weekday::Mon);
        assert_eq!(week_start(monday), monday);
    }

    #[test]
    fn weekly_review_covers_same_week() {
        let note = ReviewNote::new(ReviewPeriod::Week, date(2024, 3, 6), "w10");
        assert!(note.covers(date(2024, 3, 4)));
        assert!(note.covers(date(2024, 3, 10)));
        assert!(!note.covers(date(2024, 3, 11)));
    }

    #[test]
    fn monthly_review_distinguishes_years() {
        let note = ReviewNote::new(ReviewPeriod::Month, date(2024, 3, 1), "march");
        assert!(note.covers(date(2024, 3, 31)));
        assert!(!note.covers(date(2023, 3, 15)));
    }
}
