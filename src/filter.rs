//! Component D: the ordered filter chain applied to every record a
//! [`MultiFileReader`](crate::source::multi::MultiFileReader) produces,
//! plus summary aggregation (delegated to [`crate::model::Summary`]).

use crate::model::{Level, LogRecord};
use regex::{Regex, RegexBuilder};

/// What to do with one record after running it through the filter chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Emit,
    Drop,
    /// A recognized line crossed `end_time`; the whole stream ends here.
    Stop,
}

/// A parsed, ready-to-apply request: the query-string parameters of
/// `/log/stream` and `/log/summary` reduced to their filtering effect.
///
/// `levels` carries the already-expanded "every level >= the requested
/// minimum" list the client computes before sending the request (wire
/// format matches `original_source/bin/hblog.py`'s `options['levels-list']`);
/// the agent only ever does membership checks against it.
pub struct FilterRequest {
    pub levels: Vec<Level>,
    pub fp: Vec<String>,
    pub fp_exclude: Vec<String>,
    pub re_include: Vec<Regex>,
    pub re_exclude: Vec<Regex>,
    pub end_time: Option<String>,
    pub has_universal_offset: bool,
}

#[derive(Debug, thiserror::Error)]
#[error("invalid regular expression {pattern:?}: {source}")]
pub struct InvalidPattern {
    pattern: String,
    #[source]
    source: regex::Error,
}

/// Case-insensitive, matching the original's `re.search(r, text, re.IGNORECASE)`.
pub fn compile_pattern(pattern: &str) -> Result<Regex, InvalidPattern> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|source| InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })
}

impl FilterRequest {
    /// Apply the chain described in spec.md §4.D, in order:
    /// end-time cutoff (only meaningful without a universal-offset), level,
    /// then fp/fp-exclude/re/re-exclude.
    pub fn apply(&self, rec: &LogRecord) -> Decision {
        if !self.has_universal_offset {
            if let Some(end) = &self.end_time {
                if !rec.unrecognized_line && rec.ts.as_str() > end.as_str() {
                    return Decision::Stop;
                }
            }
        }

        if !self.levels.contains(&rec.level) {
            return Decision::Drop;
        }

        if !self.fp.is_empty() {
            return if self.fp.iter().any(|f| rec.fp.starts_with(f.as_str())) {
                Decision::Emit
            } else {
                Decision::Drop
            };
        }

        if self.fp_exclude.iter().any(|f| rec.fp.starts_with(f.as_str())) {
            return Decision::Drop;
        }
        if !self.re_include.is_empty() && !self.re_include.iter().any(|r| r.is_match(&rec.text)) {
            return Decision::Drop;
        }
        if self.re_exclude.iter().any(|r| r.is_match(&rec.text)) {
            return Decision::Drop;
        }

        Decision::Emit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(ts: &str, level: Level, text: &str, fp: &str) -> LogRecord {
        LogRecord {
            ts: ts.to_string(),
            level,
            text: text.to_string(),
            norm_text: text.to_string(),
            fp: fp.to_string(),
            unrecognized_line: false,
            host: None,
        }
    }

    fn base_request() -> FilterRequest {
        FilterRequest {
            levels: Level::ORDER.to_vec(),
            fp: vec![],
            fp_exclude: vec![],
            re_include: vec![],
            re_exclude: vec![],
            end_time: Some("2013-12-30 23:59:59,000000".to_string()),
            has_universal_offset: false,
        }
    }

    #[test]
    fn recognized_line_past_end_time_stops_the_stream() {
        let req = base_request();
        let r = rec("2014-01-01 00:00:00,000000", Level::Info, "late", "abc");
        assert_eq!(req.apply(&r), Decision::Stop);
    }

    #[test]
    fn unrecognized_line_never_stops_the_stream_even_past_end_time() {
        let req = base_request();
        let mut r = rec("2014-01-01 00:00:00,000000", Level::Info, "late", "abc");
        r.unrecognized_line = true;
        assert_eq!(req.apply(&r), Decision::Emit);
    }

    #[test]
    fn universal_offset_requests_never_stop_on_end_time() {
        let mut req = base_request();
        req.has_universal_offset = true;
        let r = rec("2099-01-01 00:00:00,000000", Level::Info, "late", "abc");
        assert_eq!(req.apply(&r), Decision::Emit);
    }

    #[test]
    fn level_not_in_the_requested_list_is_dropped() {
        let mut req = base_request();
        req.levels = vec![Level::Warn, Level::Error, Level::Fatal];
        let r = rec("2013-12-30 00:00:00,000000", Level::Debug, "msg", "abc");
        assert_eq!(req.apply(&r), Decision::Drop);
    }

    #[test]
    fn fp_include_bypasses_fp_exclude_and_re_filters() {
        let mut req = base_request();
        req.fp = vec!["abc".to_string()];
        req.fp_exclude = vec!["abc".to_string()];
        req.re_include = vec![compile_pattern("nomatch").unwrap()];
        let r = rec("2013-12-30 00:00:00,000000", Level::Info, "msg", "abcdef");
        assert_eq!(req.apply(&r), Decision::Emit);
    }

    #[test]
    fn fp_exclude_drops_when_fp_include_is_empty() {
        let mut req = base_request();
        req.fp_exclude = vec!["abc".to_string()];
        let r = rec("2013-12-30 00:00:00,000000", Level::Info, "msg", "abcdef");
        assert_eq!(req.apply(&r), Decision::Drop);
    }

    #[test]
    fn re_include_requires_a_case_insensitive_match() {
        let mut req = base_request();
        req.re_include = vec![compile_pattern("ERROR").unwrap()];
        let miss = rec("2013-12-30 00:00:00,000000", Level::Info, "all good", "abc");
        assert_eq!(req.apply(&miss), Decision::Drop);
        let hit = rec("2013-12-30 00:00:00,000000", Level::Info, "an error occurred", "abc");
        assert_eq!(req.apply(&hit), Decision::Emit);
    }

    #[test]
    fn re_exclude_drops_even_after_re_include_matches() {
        let mut req = base_request();
        req.re_include = vec![compile_pattern("error").unwrap()];
        req.re_exclude = vec![compile_pattern("ignorable").unwrap()];
        let r = rec(
            "2013-12-30 00:00:00,000000",
            Level::Info,
            "an ignorable error occurred",
            "abc",
        );
        assert_eq!(req.apply(&r), Decision::Drop);
    }
}
