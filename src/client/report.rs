//! Plain-text presentation, grounded on `original_source/bin/hblog.py`'s
//! `print_details_event`/`print_summary_event`/`report_blacklisted_hosts`.
//! Terminal-width wrapping is not implemented (spec.md §6: CLI presentation
//! is out of scope beyond a usable plain-text rendering).

use crate::model::{FingerprintSummary, LogRecord, Summary};

pub fn render_details(records: &[LogRecord]) -> String {
    let mut sorted: Vec<&LogRecord> = records.iter().collect();
    sorted.sort_by(|a, b| a.ts.cmp(&b.ts));

    let mut out = String::new();
    for rec in sorted {
        let text = rec.text.replace('\t', "\\t");
        let host = rec.host.as_deref().unwrap_or("-");
        out.push_str(&format!(
            "{} {} {:<5} {} {}\n",
            rec.ts,
            rec.fp,
            rec.level.as_str(),
            host,
            text
        ));
    }
    out
}

/// Longest fp-prefix width the host matrix displays (spec.md §4.F: "first 7
/// chars used as display/prefix key, matched by `startswith` against each
/// host's full 8-char fps").
const MATRIX_FP_PREFIX_LEN: usize = 7;
/// Cap on how many fingerprint columns the host matrix prints, mirroring the
/// original's terminal-width-derived `how_many_fps_will_fit` (`print_summary_event`,
/// `original_source/bin/hblog.py:262-287`) without depending on an actual tty width.
const MATRIX_MAX_COLUMNS: usize = 10;

pub fn render_summary(per_host: &[(String, Summary)]) -> String {
    let mut total = Summary::empty();
    for (_, s) in per_host {
        total.merge(s);
    }

    let mut out = String::new();
    out.push_str("Fingerprint summary:\n");
    if total.fp.is_empty() {
        out.push_str("No matching lines found\n");
        return out;
    }

    out.push_str(&format!(
        "{:>7}  {:<12}  {:<6}  {}\n",
        "count", "fingerprint", "level", "text"
    ));
    let mut entries: Vec<&FingerprintSummary> = total.fp.values().collect();
    entries.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.fp.cmp(&b.fp)));
    for e in &entries {
        let text = e.norm_text.replace('\t', "\\t");
        out.push_str(&format!(
            "{:>7}  {:<12}  {:<6}  {}\n",
            e.count,
            e.fp,
            e.level.as_str(),
            text
        ));
    }

    out.push_str("\nHost summary:\n");
    let columns: Vec<&str> = entries
        .iter()
        .map(|e| &e.fp[..MATRIX_FP_PREFIX_LEN.min(e.fp.len())])
        .take(MATRIX_MAX_COLUMNS)
        .collect();
    if columns.is_empty() {
        return out;
    }

    out.push_str(&format!("{:16.16}  ", ""));
    for col in &columns {
        out.push_str(&format!("{:<10}", col));
    }
    out.push('\n');

    let mut hosts: Vec<&String> = per_host.iter().map(|(h, _)| h).collect();
    hosts.sort();
    for host in hosts {
        let summary = per_host.iter().find(|(h, _)| h == host).map(|(_, s)| s);
        let Some(summary) = summary else { continue };
        if summary.fp.is_empty() {
            continue;
        }
        out.push_str(&format!("{:>16.16}  ", host));
        for prefix in &columns {
            let count: u64 = summary
                .fp
                .values()
                .filter(|fp_summary| fp_summary.fp.starts_with(*prefix))
                .map(|fp_summary| fp_summary.count)
                .sum();
            if count > 0 {
                out.push_str(&format!("{:<10}", count));
            } else {
                out.push_str(&format!("{:<10}", ""));
            }
        }
        out.push('\n');
    }
    out
}

pub fn render_blacklist_report(initial_hosts: &[String], blacklisted: &[String]) -> Option<String> {
    if blacklisted.is_empty() {
        return None;
    }
    Some(format!(
        "BLACKL01 WARN  - blacklisted {} of {} hosts in this session: {} \
         - consider adding filters or lowering the sampling rate\n",
        blacklisted.len(),
        initial_hosts.len(),
        blacklisted.join(", ")
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Level;

    fn rec(ts: &str, host: &str, text: &str) -> LogRecord {
        LogRecord {
            ts: ts.to_string(),
            level: Level::Info,
            text: text.to_string(),
            norm_text: text.to_string(),
            fp: "abcd1234".to_string(),
            unrecognized_line: false,
            host: Some(host.to_string()),
        }
    }

    #[test]
    fn render_details_sorts_across_hosts_by_timestamp() {
        let records = vec![
            rec("2013-12-30 23:51:00,000000", "host-b", "second"),
            rec("2013-12-30 23:50:00,000000", "host-a", "first"),
        ];
        let out = render_details(&records);
        let first_line_idx = out.find("first").unwrap();
        let second_line_idx = out.find("second").unwrap();
        assert!(first_line_idx < second_line_idx);
    }

    #[test]
    fn render_summary_reports_no_matches() {
        let out = render_summary(&[]);
        assert!(out.contains("No matching lines found"));
    }

    #[test]
    fn render_summary_merges_counts_across_hosts() {
        let mut s1 = Summary::empty();
        s1.record(&rec("2013-12-30 23:50:00,000000", "host-a", "boom"));
        let mut s2 = Summary::empty();
        s2.record(&rec("2013-12-30 23:50:00,000000", "host-b", "boom"));
        let out = render_summary(&[("host-a".to_string(), s1), ("host-b".to_string(), s2)]);
        assert!(out.contains("2"));
    }

    #[test]
    fn render_summary_breaks_global_counts_down_per_host() {
        let mut s1 = Summary::empty();
        s1.record(&rec("2013-12-30 23:50:00,000000", "host-a", "boom"));
        s1.record(&rec("2013-12-30 23:50:01,000000", "host-a", "boom"));
        let mut s2 = Summary::empty();
        s2.record(&rec("2013-12-30 23:50:00,000000", "host-b", "boom"));
        let out = render_summary(&[("host-a".to_string(), s1), ("host-b".to_string(), s2)]);
        assert!(out.contains("Host summary:"));
        assert!(out.contains("host-a"));
        assert!(out.contains("host-b"));
        let host_a_line = out.lines().find(|l| l.trim_start().ends_with("host-a") || l.contains("host-a")).unwrap();
        assert!(host_a_line.contains('2'));
    }

    #[test]
    fn blacklist_report_is_absent_when_nothing_was_blacklisted() {
        assert!(render_blacklist_report(&["h1".to_string()], &[]).is_none());
    }

    #[test]
    fn blacklist_report_names_the_blacklisted_hosts() {
        let out = render_blacklist_report(
            &["h1".to_string(), "h2".to_string()],
            &["h2".to_string()],
        )
        .unwrap();
        assert!(out.contains("h2"));
        assert!(out.contains("1 of 2"));
    }
}
