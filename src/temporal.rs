//! Resolving when a transaction actually happened.
//!
//! Users log entries after the fact ("yesterday's coffee", "dinner 180"
//! typed at 23:00), so the event time is not the send time. Precedence is
//! strict: an explicit date or clock time in the message wins; failing that,
//! a meal keyword logged outside its usual hours is backfilled to the meal's
//! canonical hour on the send date; otherwise the send time is used as-is.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Weekday};

/// Hour a backfilled meal entry lands on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MealKeyword {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
}

impl MealKeyword {
    pub fn canonical_hour(self) -> u32 {
        match self {
            MealKeyword::Breakfast => 8,
            MealKeyword::Lunch => 12,
            MealKeyword::Dinner => 18,
            MealKeyword::Snack => 23,
        }
    }

    /// Typical eating window. Snack wraps past midnight.
    pub fn window_contains(self, hour: u32) -> bool {
        match self {
            MealKeyword::Breakfast => (5..=10).contains(&hour),
            MealKeyword::Lunch => (11..=14).contains(&hour),
            MealKeyword::Dinner => (17..=20).contains(&hour),
            MealKeyword::Snack => hour >= 21 || hour <= 2,
        }
    }

    pub fn detect(text: &str) -> Option<MealKeyword> {
        let lower = text.to_lowercase();
        for (needle, keyword) in [
            ("breakfast", MealKeyword::Breakfast),
            ("lunch", MealKeyword::Lunch),
            ("dinner", MealKeyword::Dinner),
            ("supper", MealKeyword::Dinner),
            ("snack", MealKeyword::Snack),
        ] {
            if lower.contains(needle) {
                return Some(keyword);
            }
        }
        None
    }
}

fn weekday_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "monday",
        Weekday::Tue => "tuesday",
        Weekday::Wed => "wednesday",
        Weekday::Thu => "thursday",
        Weekday::Fri => "friday",
        Weekday::Sat => "saturday",
        Weekday::Sun => "sunday",
    }
}

/// Seven-day lookback table: phrase -> date, built from the send time.
/// Weekday names refer to the most recent such day strictly before today.
pub fn lookback_table(send_time: NaiveDateTime) -> Vec<(String, NaiveDate)> {
    let today = send_time.date();
    let mut table = vec![
        ("today".to_string(), today),
        ("yesterday".to_string(), today - Duration::days(1)),
        ("day before yesterday".to_string(), today - Duration::days(2)),
    ];
    for back in 1..=7 {
        let date = today - Duration::days(back);
        let name = weekday_name(date.weekday());
        table.push((name.to_string(), date));
        table.push((format!("last {name}"), date));
    }
    table
}

/// Resolve a date phrase ("2025-11-10", "yesterday", "last monday") against
/// the send time. Query and delete criteria go through the same rules as
/// extraction dates.
pub fn resolve_date(raw: &str, send_time: NaiveDateTime) -> Option<NaiveDate> {
    parse_explicit_date(raw, send_time)
}

fn parse_explicit_date(raw: &str, send_time: NaiveDateTime) -> Option<NaiveDate> {
    let trimmed = raw.trim().to_lowercase();
    if let Ok(date) = NaiveDate::parse_from_str(&trimmed, "%Y-%m-%d") {
        return Some(date);
    }
    // Month-day shorthand resolves within the send year.
    if let Ok(date) = NaiveDate::parse_from_str(
        &format!("{}-{}", send_time.year(), trimmed),
        "%Y-%m-%d",
    ) {
        return Some(date);
    }
    lookback_table(send_time)
        .into_iter()
        .find(|(phrase, _)| *phrase == trimmed)
        .map(|(_, date)| date)
}

fn parse_explicit_time(raw: &str) -> Option<NaiveTime> {
    let trimmed = raw.trim();
    NaiveTime::parse_from_str(trimmed, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M"))
        .ok()
}

/// Resolve one draft's event time.
///
/// `explicit_date` / `explicit_time` are whatever date or clock phrases the
/// oracle pulled out of the message (may be relative, like "yesterday").
pub fn resolve(
    note: &str,
    explicit_date: Option<&str>,
    explicit_time: Option<&str>,
    send_time: NaiveDateTime,
) -> NaiveDateTime {
    let date = explicit_date.and_then(|raw| parse_explicit_date(raw, send_time));
    let time = explicit_time.and_then(parse_explicit_time);

    if date.is_some() || time.is_some() {
        let date = date.unwrap_or_else(|| send_time.date());
        // A date with no clock lands on noon rather than a misleading
        // send-time clock reading.
        let time = time.unwrap_or_else(|| {
            if explicit_date.is_some() && explicit_time.is_none() {
                NaiveTime::from_hms_opt(12, 0, 0).unwrap_or_default()
            } else {
                send_time.time()
            }
        });
        return date.and_time(time);
    }

    if let Some(keyword) = MealKeyword::detect(note) {
        if !keyword.window_contains(send_time.hour()) {
            let backfilled = NaiveTime::from_hms_opt(keyword.canonical_hour(), 0, 0)
                .unwrap_or_else(|| send_time.time());
            return send_time.date().and_time(backfilled);
        }
    }

    send_time
}

#[cfg(test)]
mod tests {
    use super::*;

    fn send(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
    }

    #[test]
    fn test_no_keyword_uses_send_time() {
        let st = send("2025-11-12 19:36");
        assert_eq!(resolve("afternoon tea 100", None, None, st), st);
    }

    #[test]
    fn test_meal_outside_window_backfills() {
        let st = send("2025-11-12 19:36");
        let resolved = resolve("lunch 100", None, None, st);
        assert_eq!(resolved, send("2025-11-12 12:00"));
    }

    #[test]
    fn test_meal_inside_window_keeps_send_time() {
        let st = send("2025-11-12 12:30");
        assert_eq!(resolve("lunch 100", None, None, st), st);
    }

    #[test]
    fn test_snack_window_wraps_midnight() {
        let st = send("2025-11-13 01:30");
        assert_eq!(resolve("snack 60", None, None, st), st);
        let st = send("2025-11-12 15:00");
        assert_eq!(resolve("snack 60", None, None, st), send("2025-11-12 23:00"));
    }

    #[test]
    fn test_explicit_date_beats_keyword() {
        let st = send("2025-11-12 19:36");
        let resolved = resolve("lunch 100", Some("2025-11-10"), None, st);
        assert_eq!(resolved, send("2025-11-10 12:00"));
    }

    #[test]
    fn test_explicit_clock_time() {
        let st = send("2025-11-12 19:36");
        let resolved = resolve("coffee 60", None, Some("15:30"), st);
        assert_eq!(resolved, send("2025-11-12 15:30"));
    }

    #[test]
    fn test_yesterday_phrase() {
        let st = send("2025-11-12 19:36");
        let resolved = resolve("coffee 60", Some("yesterday"), None, st);
        assert_eq!(resolved, send("2025-11-11 12:00"));
    }

    #[test]
    fn test_weekday_phrase_resolves_within_lookback() {
        // 2025-11-12 is a Wednesday; "monday" means 2025-11-10.
        let st = send("2025-11-12 19:36");
        let resolved = resolve("coffee 60", Some("last monday"), None, st);
        assert_eq!(resolved, send("2025-11-10 12:00"));
        let resolved = resolve("coffee 60", Some("Monday"), None, st);
        assert_eq!(resolved, send("2025-11-10 12:00"));
    }

    #[test]
    fn test_lookback_table_spans_seven_days() {
        let table = lookback_table(send("2025-11-12 19:36"));
        // today/yesterday/day-before plus 7 weekdays with a "last" variant.
        assert_eq!(table.len(), 3 + 14);
        let (_, yesterday) = table.iter().find(|(p, _)| p == "yesterday").unwrap();
        assert_eq!(*yesterday, NaiveDate::from_ymd_opt(2025, 11, 11).unwrap());
    }
}
