//! Component B (timestamp half): the three fixed, ordered log line formats
//! spec.md §4.B recognizes — log4j, syslog, and JVM GC logs.

use chrono::{Datelike, Local, NaiveDateTime, Timelike};
use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TimestampError {
    #[error("failed to parse timestamp '{value}' with format '{format}': {source}")]
    ParseError {
        value: String,
        format: &'static str,
        #[source]
        source: chrono::ParseError,
    },
}

/// Which of the three line formats matched, and the extracted groups.
pub struct Match {
    pub ts: String,
    pub level: Option<String>,
    pub body: String,
}

struct LineFormat {
    re: Regex,
    time_format: &'static str,
    /// Rewrites the raw timestamp capture before it's handed to `chrono`.
    transform: fn(&str) -> String,
    #[allow(dead_code)]
    comment: &'static str,
}

fn syslog_transform(s: &str) -> String {
    // Pad single-digit days, collapse duplicate spaces, then prepend the
    // current year — syslog lines don't carry one.
    let single_digit_day = Regex::new(r" (\d) ").unwrap();
    let padded = single_digit_day.replace(s, " 0$1 ");
    let collapsed_re = Regex::new(r" +").unwrap();
    let collapsed = collapsed_re.replace_all(&padded, " ");
    format!("{} {}", Local::now().year(), collapsed)
}

fn gclog_transform(s: &str) -> String {
    let tz_suffix = Regex::new(r"-?\d{4}$").unwrap();
    tz_suffix.replace(s, "").into_owned()
}

fn identity_transform(s: &str) -> String {
    s.to_string()
}

fn formats() -> &'static [LineFormat] {
    static FORMATS: OnceLock<Vec<LineFormat>> = OnceLock::new();
    FORMATS.get_or_init(|| {
        vec![
            LineFormat {
                re: Regex::new(
                    r"^(\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2},\d+) +(\[.*?\])? *(\w+) +(.+)$",
                )
                .unwrap(),
                time_format: "%Y-%m-%d %H:%M:%S,%f",
                transform: identity_transform,
                comment: r#"log4j format. E.g. "2013-12-30 23:50:50,121""#,
            },
            LineFormat {
                re: Regex::new(r"^([A-Za-z]{3} +\d{1,2} +\d\d:\d\d:\d\d) *()()(.+)$").unwrap(),
                time_format: "%Y %b %d %H:%M:%S",
                transform: syslog_transform,
                comment: r#"typical syslog format. E.g. "Oct  1 13:57:31""#,
            },
            LineFormat {
                re: Regex::new(
                    r"^(\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}\.\d+-?\d*): *()()(.+)$",
                )
                .unwrap(),
                time_format: "%Y-%m-%dT%H:%M:%S%.f",
                transform: gclog_transform,
                comment: r#"java GC log format. E.g. "2013-09-30T23:12:58.800-0700: ...""#,
            },
        ]
    })
}

/// Try every line format in order, first match wins. Returns `None` for an
/// unrecognized continuation line.
pub fn match_line(line: &str) -> Option<Match> {
    for fmt in formats() {
        if let Some(caps) = fmt.re.captures(line) {
            let raw_ts = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
            let level = caps.get(3).map(|m| m.as_str()).filter(|s| !s.is_empty());
            let body = caps.get(4).map(|m| m.as_str()).unwrap_or_default();
            let transformed = (fmt.transform)(raw_ts);
            if let Ok(ts) = parse_with_format(&transformed, fmt.time_format) {
                return Some(Match {
                    ts,
                    level: level.map(str::to_string),
                    body: body.to_string(),
                });
            }
        }
    }
    None
}

/// Parse `value` with `format` and render it in the wire format
/// `YYYY-MM-DD HH:MM:SS,ffffff`.
fn parse_with_format(value: &str, format: &'static str) -> Result<String, TimestampError> {
    let dt = NaiveDateTime::parse_from_str(value, format).map_err(|source| {
        TimestampError::ParseError {
            value: value.to_string(),
            format,
            source,
        }
    })?;
    Ok(format_ts(&dt))
}

/// Render a parsed timestamp in the wire/sort-key format spec.md §3 defines.
pub fn format_ts(dt: &NaiveDateTime) -> String {
    format!(
        "{:04}-{:02}-{:02} {:02}:{:02}:{:02},{:06}",
        dt.year(),
        dt.month(),
        dt.day(),
        dt.hour(),
        dt.minute(),
        dt.second(),
        dt.and_utc().timestamp_subsec_micros()
    )
}
