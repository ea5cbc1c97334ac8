use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, Utc, Weekday};

/// The campus runs on a single fixed offset, UTC+5:30. Day and week
/// boundaries are taken in this zone no matter where the server runs or
/// whether daylight saving applies locally.
pub const CAMPUS_OFFSET_SECS: i32 = 5 * 3600 + 30 * 60;

pub fn campus_offset() -> FixedOffset {
    FixedOffset::east_opt(CAMPUS_OFFSET_SECS).expect("offset within +/-24h")
}

pub fn campus_now() -> DateTime<FixedOffset> {
    Utc::now().with_timezone(&campus_offset())
}

pub fn campus_today() -> NaiveDate {
    campus_now().date_naive()
}

/// English weekday name matching the recurrence tags stored on lectures.
pub fn weekday_name(date: NaiveDate) -> &'static str {
    match date.weekday() {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

pub fn iso_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}
