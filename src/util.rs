use std::time::SystemTime;

use chrono::{DateTime, NaiveDateTime, Utc};

pub fn get_time_utc() -> DateTime<Utc> {
    SystemTime::now().into()
}

// IMF-fixdate, the mandatory HTTP date format: `Sun, 06 Nov 1994 08:49:37 GMT`.
pub fn parse_time_imf(time: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(time, "%a, %d %b %Y %T GMT")
        .ok()
        .map(|t| DateTime::from_utc(t, Utc))
}

pub fn format_time_imf(time: &DateTime<Utc>) -> String {
    time.format("%a, %d %b %Y %T GMT").to_string()
}

pub fn is_visible_char(ch: char) -> bool {
    ('!'..='~').contains(&ch)
}
