use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// One parsed (or unrecognized-continuation) log line.
///
/// `ts` is kept as a fixed-width string (`YYYY-MM-DD HH:MM:SS,ffffff`) rather
/// than a parsed timestamp: the wire format, the sort key, and the `start`/
/// `end` filter comparisons all operate on this string directly, and the
/// fixed width means lexical order already agrees with chronological order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    pub ts: String,
    pub level: Level,
    pub text: String,
    pub norm_text: String,
    pub fp: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub unrecognized_line: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Level {
    #[serde(rename = "INFO")]
    Info,
    #[serde(rename = "DEBUG")]
    Debug,
    #[serde(rename = "WARN")]
    Warn,
    #[serde(rename = "ERROR")]
    Error,
    #[serde(rename = "FATAL")]
    Fatal,
}

impl Level {
    /// Ordering used by spec.md §4.D's "every level >= the requested minimum":
    /// INFO < DEBUG < WARN < ERROR < FATAL, in that exact (non-alphabetical) order.
    pub const ORDER: [Level; 5] = [
        Level::Info,
        Level::Debug,
        Level::Warn,
        Level::Error,
        Level::Fatal,
    ];

    pub fn rank(self) -> usize {
        Self::ORDER.iter().position(|l| *l == self).unwrap()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Level::Info => "INFO",
            Level::Debug => "DEBUG",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
            Level::Fatal => "FATAL",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "INFO" => Ok(Level::Info),
            "DEBUG" => Ok(Level::Debug),
            "WARN" => Ok(Level::Warn),
            "ERROR" => Ok(Level::Error),
            "FATAL" => Ok(Level::Fatal),
            _ => Err(()),
        }
    }
}

/// A resumable cursor within a `MultiFileReader`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniversalOffset {
    pub filename: String,
    pub byte_offset: u64,
}

impl fmt::Display for UniversalOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.filename, self.byte_offset)
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid universal offset string: {0:?}")]
pub struct ParseUniversalOffsetError(String);

impl FromStr for UniversalOffset {
    type Err = ParseUniversalOffsetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (filename, byte_offset) = s
            .rsplit_once(':')
            .ok_or_else(|| ParseUniversalOffsetError(s.to_string()))?;
        let byte_offset = byte_offset
            .parse()
            .map_err(|_| ParseUniversalOffsetError(s.to_string()))?;
        Ok(UniversalOffset {
            filename: filename.to_string(),
            byte_offset,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FingerprintSummary {
    pub fp: String,
    pub count: u64,
    pub level: Level,
    pub norm_text: String,
}

/// Per-host aggregate emitted by the agent's `/log/summary` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Summary {
    pub level: HashMap<String, u64>,
    pub fp: HashMap<String, FingerprintSummary>,
    /// Reserved: always empty. Spec.md §3 documents this field but no
    /// operation ever populates it.
    #[serde(default)]
    pub regex: HashMap<String, u64>,
}

impl Summary {
    pub fn empty() -> Self {
        let level = Level::ORDER
            .iter()
            .map(|l| (l.as_str().to_string(), 0))
            .collect();
        Summary {
            level,
            fp: HashMap::new(),
            regex: HashMap::new(),
        }
    }

    pub fn record(&mut self, rec: &LogRecord) {
        *self.level.entry(rec.level.as_str().to_string()).or_insert(0) += 1;
        let entry = self.fp.entry(rec.fp.clone()).or_insert_with(|| FingerprintSummary {
            fp: rec.fp.clone(),
            count: 0,
            level: rec.level,
            norm_text: rec.norm_text.clone(),
        });
        entry.count += 1;
    }

    /// Fold another host/response's summary into this one, as the fan-out
    /// client does across multiple rounds worth of per-host summaries.
    pub fn merge(&mut self, other: &Summary) {
        for (level, count) in &other.level {
            *self.level.entry(level.clone()).or_insert(0) += count;
        }
        for (fp, entry) in &other.fp {
            let slot = self.fp.entry(fp.clone()).or_insert_with(|| FingerprintSummary {
                fp: entry.fp.clone(),
                count: 0,
                level: entry.level,
                norm_text: entry.norm_text.clone(),
            });
            slot.count += entry.count;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExitStatus {
    pub status: String,
    #[serde(rename = "universal-offset", skip_serializing_if = "Option::is_none", default)]
    pub universal_offset: Option<UniversalOffset>,
}

impl ExitStatus {
    pub fn success(universal_offset: Option<UniversalOffset>) -> Self {
        ExitStatus {
            status: "success".to_string(),
            universal_offset,
        }
    }
}

/// The NDJSON wire frame the agent writes and the client reads, one per line.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "pkg-cls", content = "pkg-obj")]
pub enum Envelope {
    #[serde(rename = "log-accessor-line")]
    LogAccessorLine(serde_json::Value),
    #[serde(rename = "exit-status")]
    ExitStatus(ExitStatus),
}
