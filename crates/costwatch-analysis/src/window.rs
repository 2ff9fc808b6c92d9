use chrono::{DateTime, Datelike, Days, NaiveDate, Utc};

/// The two periods compared by a month-over-month analysis, in UTC.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthWindows {
    /// First day of the current calendar month.
    pub current_start: NaiveDate,
    /// Today.
    pub current_end: NaiveDate,
    pub previous_start: NaiveDate,
    /// Last day of the previous calendar month.
    pub previous_end: NaiveDate,
}

impl MonthWindows {
    /// `YYYY-MM` of the current period.
    pub fn current_month(&self) -> String {
        self.current_start.format("%Y-%m").to_string()
    }

    pub fn previous_month(&self) -> String {
        self.previous_start.format("%Y-%m").to_string()
    }
}

/// Windows for the month containing `now` and the month before it.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use costwatch_analysis::window::month_windows;
///
/// let w = month_windows(Utc.with_ymd_and_hms(2024, 3, 15, 9, 0, 0).unwrap());
/// assert_eq!(w.current_month(), "2024-03");
/// assert_eq!(w.previous_month(), "2024-02");
/// assert_eq!(w.previous_end.to_string(), "2024-02-29");
/// ```
pub fn month_windows(now: DateTime<Utc>) -> MonthWindows {
    let today = now.date_naive();
    // Day 1 always exists, so `with_day(1)` cannot fail.
    let current_start = today.with_day(1).unwrap_or(today);
    let previous_end = current_start
        .checked_sub_days(Days::new(1))
        .unwrap_or(current_start);
    let previous_start = previous_end.with_day(1).unwrap_or(previous_end);
    MonthWindows {
        current_start,
        current_end: today,
        previous_start,
        previous_end,
    }
}
