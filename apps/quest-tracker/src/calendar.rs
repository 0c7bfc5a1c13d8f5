//! Month grid for the completion calendar.

use crate::config::WeekStart;
use chrono::{Datelike, Duration, Months, NaiveDate, Weekday};

/// First day of the month containing `date`.
pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Shift a month start by `delta` months.
pub fn add_months(start: NaiveDate, delta: i32) -> NaiveDate {
    let shifted = if delta >= 0 {
        start.checked_add_months(Months::new(delta as u32))
    } else {
        start.checked_sub_months(Months::new(delta.unsigned_abs()))
    };
    shifted.unwrap_or(start)
}

/// Last day of the month containing `date`.
pub fn month_end(date: NaiveDate) -> NaiveDate {
    add_months(month_start(date), 1)
        .pred_opt()
        .unwrap_or(date)
}

/// Weeks covering the month of `date`, each seven days starting on
/// `week_start`. Leading and trailing cells belong to adjacent months.
pub fn month_grid(date: NaiveDate, week_start: WeekStart) -> Vec<[NaiveDate; 7]> {
    let first = month_start(date);
    let last = month_end(date);

    let first_weekday = match week_start {
        WeekStart::Monday => Weekday::Mon,
        WeekStart::Sunday => Weekday::Sun,
    };
    let offset = (first.weekday().num_days_from_monday() + 7
        - first_weekday.num_days_from_monday())
        % 7;
    let offset = offset as i64;
    let mut cursor = first - Duration::days(offset);

    let mut weeks = Vec::new();
    while cursor <= last {
        let week: [NaiveDate; 7] = std::array::from_fn(|i| cursor + Duration::days(i as i64));
        weeks.push(week);
        cursor += Duration::days(7);
    }
    weeks
}

/// Short weekday labels in grid order.
pub fn weekday_labels(week_start: WeekStart) -> [&'static str; 7] {
    match week_start {
        WeekStart::Monday => ["Mo", "Tu", "We", "Th", "Fr", "Sa", "Su"],
        WeekStart::Sunday => ["Su", "Mo", "Tu", "We", "Th", "Fr", "Sa"],
    }
}
