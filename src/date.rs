//! Invoice date parsing and period labels.

use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate};
use regex::Regex;

static RE_US_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?P<month>\d{1,2})/(?P<day>\d{1,2})/(?P<year>\d{4})")
        .expect("Failed to create regex pattern for mm/dd/yyyy date")
});

/// Parse an invoice date in the formats the Crystal export uses.
///
/// Tries `mm/dd/yyyy` and `yyyy-mm-dd` first, then falls back to searching
/// for a US-style date anywhere in the text.
#[must_use]
pub fn parse_invoice_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    for format in ["%m/%d/%Y", "%Y-%m-%d"] {
        // chrono's %Y also accepts short years, but the export always carries four digits
        if let Ok(date) = NaiveDate::parse_from_str(text, format)
            && date.year() >= 1000
        {
            return Some(date);
        }
    }
    let caps = RE_US_DATE.captures(text)?;
    let month: u32 = caps.name("month")?.as_str().parse().ok()?;
    let day: u32 = caps.name("day")?.as_str().parse().ok()?;
    let year: i32 = caps.name("year")?.as_str().parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Latest date from the given dates, if any.
pub fn latest_date(dates: impl IntoIterator<Item = NaiveDate>) -> Option<NaiveDate> {
    dates.into_iter().max()
}

/// Format the min and max of the given dates as a range for chart subtitles.
pub fn date_range_text(dates: impl IntoIterator<Item = NaiveDate>) -> Option<String> {
    let mut iter = dates.into_iter();
    let first = iter.next()?;
    let (min, max) = iter.fold((first, first), |(min, max), date| (min.min(date), max.max(date)));
    Some(format!("{} to {}", min.format("%Y-%m-%d"), max.format("%Y-%m-%d")))
}

/// Label for monthly report folders: `YYYY-MM`.
#[must_use]
pub fn month_label(date: NaiveDate) -> String {
    date.format("%Y-%m").to_string()
}

/// Label for quarterly report folders: `YYYY-Qn`.
#[must_use]
pub fn quarter_label(date: NaiveDate) -> String {
    format!("{}-Q{}", date.year(), date.month0() / 3 + 1)
}


#[cfg(test)]
mod test_date_ranges {
    use super::*;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
    }

    #[test]
    fn latest_date_returns_max() {
        let dates = [date(2025, 1, 5), date(2025, 1, 20), date(2025, 1, 12)];
        assert_eq!(latest_date(dates), Some(date(2025, 1, 20)));
    }

    #[test]
    fn latest_date_empty_is_none() {
        assert_eq!(latest_date(std::iter::empty()), None);
    }

    #[test]
    fn date_range_text_formats_min_and_max() {
        let dates = [date(2025, 1, 20), date(2025, 1, 5)];
        assert_eq!(date_range_text(dates), Some("2025-01-05 to 2025-01-20".to_string()));
    }

    #[test]
    fn date_range_text_single_date() {
        let dates = [date(2025, 1, 5)];
        assert_eq!(date_range_text(dates), Some("2025-01-05 to 2025-01-05".to_string()));
    }

    #[test]
    fn date_range_text_empty_is_none() {
        assert_eq!(date_range_text(std::iter::empty()), None);
    }
}
