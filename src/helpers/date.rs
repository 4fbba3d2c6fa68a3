//! Date helper functions

use chrono::{DateTime, Datelike, Local, NaiveDate, NaiveDateTime, Offset, TimeZone, Utc};
use std::fmt::Write;
use chrono_tz::Tz;

use crate::template::Value;

/// Source of "now" for `current_date` and the `now` helper
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;

    fn today(&self) -> NaiveDate {
        self.now().date()
    }
}

/// Wall-clock time in the local zone
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// A clock stuck at one instant, for previews and tests
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

/// Interpret a context value as a point in time
///
/// Accepts RFC 3339 strings, `YYYY-MM-DD[ HH:MM[:SS]]`, `YYYY-MM-DDTHH:MM:SS`,
/// `MM/DD/YYYY`, epoch milliseconds and `{seconds, nanoseconds}` timestamp
/// objects. Values carrying an offset are shifted into `tz` when given.
pub fn parse_timestamp(value: &Value, tz: Option<Tz>) -> Option<NaiveDateTime> {
    match value {
        Value::String(s) => parse_datetime_str(s, tz),
        Value::Number(ms) => from_utc(DateTime::from_timestamp_millis(*ms as i64)?, tz),
        Value::Object(_) => {
            let seconds = value
                .get_property("seconds")
                .or_else(|| value.get_property("_seconds"))?
                .to_number()?;
            let nanos = value
                .get_property("nanoseconds")
                .or_else(|| value.get_property("_nanoseconds"))
                .and_then(Value::to_number)
                .unwrap_or(0.0);
            from_utc(DateTime::from_timestamp(seconds as i64, nanos as u32)?, tz)
        }
        _ => None,
    }
}

fn from_utc(dt: DateTime<Utc>, tz: Option<Tz>) -> Option<NaiveDateTime> {
    Some(match tz {
        Some(tz) => dt.with_timezone(&tz).naive_local(),
        None => dt.naive_utc(),
    })
}

fn parse_datetime_str(s: &str, tz: Option<Tz>) -> Option<NaiveDateTime> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    // Try parsing as ISO 8601 with timezone
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(match tz {
            Some(tz) => tz.from_utc_datetime(&dt.naive_utc()).naive_local(),
            None => dt.naive_local(),
        });
    }

    const DATETIME_FORMATS: [&str; 5] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
        "%m/%d/%Y %H:%M",
    ];
    for format in DATETIME_FORMATS {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(s, format) {
            return Some(ndt);
        }
    }

    for format in ["%Y-%m-%d", "%m/%d/%Y"] {
        if let Ok(nd) = NaiveDate::parse_from_str(s, format) {
            return nd.and_hms_opt(0, 0, 0);
        }
    }

    None
}

/// Format a context value with a Moment.js-style pattern; unparseable input gives ""
pub fn format_timestamp(value: &Value, pattern: &str, tz: Option<Tz>) -> String {
    match parse_timestamp(value, tz) {
        Some(dt) => format_moment_in(&dt, pattern, tz),
        None => String::new(),
    }
}

enum Piece {
    Chrono(&'static str),
    Ordinal,
    Lower(&'static str),
    /// UTC offset, `+05:00` when the flag is set, else `+0500`
    Offset(bool),
    Literal(String),
}

/// Moment.js tokens, longest first within each letter
const MOMENT_TOKENS: [(&str, &str); 25] = [
    ("YYYY", "%Y"),
    ("YY", "%y"),
    ("MMMM", "%B"),
    ("MMM", "%b"),
    ("MM", "%m"),
    ("M", "%-m"),
    ("DDDD", "%j"),
    ("Do", ""),
    ("DD", "%d"),
    ("D", "%-d"),
    ("dddd", "%A"),
    ("ddd", "%a"),
    ("HH", "%H"),
    ("H", "%-H"),
    ("hh", "%I"),
    ("h", "%-I"),
    ("mm", "%M"),
    ("m", "%-M"),
    ("ss", "%S"),
    ("s", "%-S"),
    ("SSS", "%3f"),
    ("A", "%p"),
    ("a", "%p"),
    ("ZZ", ""),
    ("Z", ""),
];

/// Split a Moment.js format into chrono specifiers and literal text
fn tokenize_moment(format: &str) -> Vec<Piece> {
    let mut pieces = Vec::new();
    let mut literal = String::new();
    let mut rest = format;

    'outer: while let Some(c) = rest.chars().next() {
        // [escaped text]
        if c == '[' {
            if let Some(end) = rest.find(']') {
                literal.push_str(&rest[1..end]);
                rest = &rest[end + 1..];
                continue;
            }
        }

        for (token, spec) in MOMENT_TOKENS {
            if rest.starts_with(token) {
                if !literal.is_empty() {
                    pieces.push(Piece::Literal(std::mem::take(&mut literal)));
                }
                pieces.push(match token {
                    "Do" => Piece::Ordinal,
                    "a" => Piece::Lower(spec),
                    "ZZ" => Piece::Offset(false),
                    "Z" => Piece::Offset(true),
                    _ => Piece::Chrono(spec),
                });
                rest = &rest[token.len()..];
                continue 'outer;
            }
        }

        literal.push(c);
        rest = &rest[c.len_utf8()..];
    }

    if !literal.is_empty() {
        pieces.push(Piece::Literal(literal));
    }
    pieces
}

/// Format a date using Moment.js-compatible format string
///
/// # Examples
/// ```ignore
/// format_moment(&date, "MMMM Do, YYYY") // -> "March 15th, 2024"
/// ```
pub fn format_moment(date: &NaiveDateTime, format: &str) -> String {
    format_moment_in(date, format, None)
}

/// Like [`format_moment`], with `Z`/`ZZ` showing the offset of `tz` (UTC when none)
///
/// A pattern chrono cannot render gives "".
pub fn format_moment_in(date: &NaiveDateTime, format: &str, tz: Option<Tz>) -> String {
    let mut out = String::new();
    for piece in tokenize_moment(format) {
        let written = match piece {
            Piece::Chrono(spec) => write!(out, "{}", date.format(spec)),
            Piece::Lower(spec) => {
                let mut text = String::new();
                write!(text, "{}", date.format(spec)).map(|_| out.push_str(&text.to_lowercase()))
            }
            Piece::Ordinal => write!(out, "{}", ordinal(date.day())),
            Piece::Offset(colon) => write!(out, "{}", utc_offset(date, tz, colon)),
            Piece::Literal(text) => write!(out, "{}", text),
        };
        if written.is_err() {
            tracing::debug!("Unrenderable date pattern {:?}", format);
            return String::new();
        }
    }
    out
}

fn utc_offset(date: &NaiveDateTime, tz: Option<Tz>, colon: bool) -> String {
    let seconds = tz
        .and_then(|tz| tz.offset_from_local_datetime(date).earliest())
        .map(|offset| offset.fix().local_minus_utc())
        .unwrap_or(0);
    let sign = if seconds < 0 { '-' } else { '+' };
    let minutes = seconds.abs() / 60;
    let separator = if colon { ":" } else { "" };
    format!("{}{:02}{}{:02}", sign, minutes / 60, separator, minutes % 60)
}

/// 1 -> "1st", 12 -> "12th", 23 -> "23rd"
pub fn ordinal(n: u32) -> String {
    let suffix = match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{}{}", n, suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn dt(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    #[test]
    fn test_format_moment() {
        let date = dt(2024, 3, 15, 14, 5);
        assert_eq!(format_moment(&date, "MM/DD/YYYY"), "03/15/2024");
        assert_eq!(format_moment(&date, "MMMM D, YYYY"), "March 15, 2024");
        assert_eq!(format_moment(&date, "h:mm A"), "2:05 PM");
        assert_eq!(format_moment(&date, "h:mm a"), "2:05 pm");
        assert_eq!(format_moment(&date, "dddd"), "Friday");
    }

    #[test]
    fn test_offset_tokens() {
        let date = dt(2024, 3, 15, 14, 5);
        assert_eq!(format_moment(&date, "YYYY ZZ"), "2024 +0000");
        assert_eq!(format_moment(&date, "HH:mm Z"), "14:05 +00:00");
        let eastern = Some(chrono_tz::America::New_York);
        assert_eq!(format_moment_in(&date, "YYYY ZZ", eastern), "2024 -0400");
        assert_eq!(format_moment_in(&dt(2024, 1, 15, 9, 0), "Z", eastern), "-05:00");
        assert_eq!(format_moment_in(&date, "ZZ", Some(chrono_tz::Asia::Kolkata)), "+0530");
    }

    #[test]
    fn test_ordinal_and_escapes() {
        let date = dt(2024, 3, 1, 9, 0);
        assert_eq!(
            format_moment(&date, "Do [day of] MMMM, YYYY"),
            "1st day of March, 2024"
        );
        assert_eq!(ordinal(11), "11th");
        assert_eq!(ordinal(22), "22nd");
        assert_eq!(ordinal(103), "103rd");
    }

    #[test]
    fn test_parse_timestamp_variants() {
        let expected = dt(2024, 3, 15, 0, 0);
        assert_eq!(parse_timestamp(&Value::from("2024-03-15"), None), Some(expected));
        assert_eq!(parse_timestamp(&Value::from("03/15/2024"), None), Some(expected));
        assert_eq!(
            parse_timestamp(&Value::from("2024-03-15T14:05:00"), None),
            Some(dt(2024, 3, 15, 14, 5))
        );
        assert_eq!(
            parse_timestamp(&Value::from("2024-03-15T14:05:00Z"), Some(chrono_tz::America::New_York)),
            Some(dt(2024, 3, 15, 10, 5))
        );
        let firestore = Value::from_json(&json!({"seconds": 1710511500, "nanoseconds": 0}));
        assert_eq!(parse_timestamp(&firestore, None), Some(dt(2024, 3, 15, 14, 5)));
        assert_eq!(
            parse_timestamp(&Value::Number(1_710_511_500_000.0), None),
            Some(dt(2024, 3, 15, 14, 5))
        );
    }

    #[test]
    fn test_invalid_input_formats_empty() {
        assert_eq!(format_timestamp(&Value::from("not a date"), "MM/DD/YYYY", None), "");
        assert_eq!(format_timestamp(&Value::Undefined, "MM/DD/YYYY", None), "");
        assert_eq!(format_timestamp(&Value::Bool(true), "MM/DD/YYYY", None), "");
    }

    #[test]
    fn test_fixed_clock() {
        let clock = FixedClock(dt(2024, 3, 15, 8, 0));
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2024, 3, 15).unwrap());
    }
}
