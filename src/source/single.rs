//! Component B (file half): a flat log file as a lazy sequence of
//! [`LogRecord`]s, with byte-offset seeking and a time-targeted binary
//! search used by the multi-file reader to align files before merging.

use crate::fingerprint::squeeze;
use crate::model::{Level, LogRecord};
use crate::source::timestamp::match_line;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use thiserror::Error;

const FIRST_REC_MAX_BYTES: u64 = 10_000;
const FIRST_REC_MAX_LINES: u64 = 100;
const MAX_LINE_LEN: usize = 100_000;
const MAX_BYTES: u64 = 5 * 1024 * 1024 * 1024;
const SEEK_TIME_WINDOW: u64 = 32_768;

#[derive(Debug, Error)]
pub enum SingleFileError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("i/o error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{path}: no parseable first record within 10000 bytes / 100 lines")]
    NoFirstRecord { path: PathBuf },
    #[error("{path}: line at offset {offset} exceeds the 100000-byte limit")]
    LineTooLong { path: PathBuf, offset: u64 },
    #[error("{path}: exceeded the {cap}-line cap")]
    LineCapExceeded { path: PathBuf, cap: u64 },
    #[error("{path}: exceeded the 5 GiB read cap")]
    ByteCapExceeded { path: PathBuf },
    #[error("{path}: read past end of stream")]
    EndOfStream { path: PathBuf },
}

impl SingleFileError {
    pub fn path(&self) -> &Path {
        match self {
            SingleFileError::Open { path, .. }
            | SingleFileError::Io { path, .. }
            | SingleFileError::NoFirstRecord { path }
            | SingleFileError::LineTooLong { path, .. }
            | SingleFileError::LineCapExceeded { path, .. }
            | SingleFileError::ByteCapExceeded { path }
            | SingleFileError::EndOfStream { path } => path,
        }
    }
}

fn parse_level_or_warn(level: Option<&str>) -> Level {
    level.and_then(|s| s.parse::<Level>().ok()).unwrap_or(Level::Warn)
}

fn sample_keep(rate: f64) -> bool {
    rand::random::<f64>() <= rate
}

/// One file's worth of [`LogRecord`]s, read on demand.
///
/// Owns a `BufReader<File>` plus a one-record lookahead (`peeked`), mirroring
/// the teacher's `SourceReader` shape, but with no follow/rotation machinery:
/// this reader always operates on a snapshot of the file at open time.
#[derive(Debug)]
pub struct SingleFileReader {
    path: PathBuf,
    file: BufReader<File>,
    pos: u64,
    current_offset: u64,
    peeked: Option<(LogRecord, u64)>,
    last_ctx: Option<(String, Level)>,
    max_lines: u64,
    lines_read: u64,
    bytes_read: u64,
    sampling_rate: Option<f64>,
    seeking: bool,
    first_record: LogRecord,
    #[allow(dead_code)]
    verbose: bool,
    #[allow(dead_code)]
    debug: bool,
}

impl SingleFileReader {
    pub fn open(
        path: impl AsRef<Path>,
        max_klines: u64,
        sampling_rate: Option<f64>,
        verbose: bool,
        debug: bool,
    ) -> Result<Self, SingleFileError> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|source| SingleFileError::Open {
            path: path.clone(),
            source,
        })?;
        let dummy_first = LogRecord {
            ts: String::new(),
            level: Level::Warn,
            text: String::new(),
            norm_text: String::new(),
            fp: String::new(),
            unrecognized_line: false,
            host: None,
        };
        let mut reader = SingleFileReader {
            path,
            file: BufReader::new(file),
            pos: 0,
            current_offset: 0,
            peeked: None,
            last_ctx: None,
            max_lines: max_klines.saturating_mul(1000),
            lines_read: 0,
            bytes_read: 0,
            sampling_rate,
            seeking: false,
            first_record: dummy_first,
            verbose,
            debug,
        };

        let mut scanned_bytes = 0u64;
        let mut scanned_lines = 0u64;
        loop {
            if scanned_bytes > FIRST_REC_MAX_BYTES || scanned_lines > FIRST_REC_MAX_LINES {
                return Err(SingleFileError::NoFirstRecord {
                    path: reader.path.clone(),
                });
            }
            match reader.read_raw_line()? {
                None => {
                    return Err(SingleFileError::NoFirstRecord {
                        path: reader.path.clone(),
                    })
                }
                Some((line, offset_before, raw_len)) => {
                    reader.count_raw_line(raw_len)?;
                    scanned_lines += 1;
                    scanned_bytes += line.len() as u64 + 1;
                    if line.is_empty() {
                        continue;
                    }
                    if let Some(m) = match_line(&line) {
                        let level = parse_level_or_warn(m.level.as_deref());
                        let (norm_text, fp) = squeeze(&m.body);
                        let rec = LogRecord {
                            ts: m.ts,
                            level,
                            text: m.body,
                            norm_text,
                            fp,
                            unrecognized_line: false,
                            host: None,
                        };
                        reader.last_ctx = Some((rec.ts.clone(), rec.level));
                        reader.first_record = rec.clone();
                        reader.peeked = Some((rec, offset_before));
                        break;
                    }
                    // Unrecognized line before any parsed record: dropped.
                }
            }
        }
        Ok(reader)
    }

    /// Read one raw line off disk. Only checks the per-line length limit;
    /// the cumulative line/byte caps are the caller's job, applied once it
    /// knows whether this line is actually going to be kept (spec.md's
    /// sampling paragraph, read together with the safety-limits paragraph
    /// right after it).
    fn read_raw_line(&mut self) -> Result<Option<(String, u64, u64)>, SingleFileError> {
        let offset_before = self.pos;
        let mut buf = Vec::new();
        let n = self
            .file
            .read_until(b'\n', &mut buf)
            .map_err(|source| SingleFileError::Io {
                path: self.path.clone(),
                source,
            })?;
        if n == 0 {
            return Ok(None);
        }
        self.pos += n as u64;
        if buf.len() > MAX_LINE_LEN {
            return Err(SingleFileError::LineTooLong {
                path: self.path.clone(),
                offset: offset_before,
            });
        }
        while matches!(buf.last(), Some(b'\n') | Some(b'\r')) {
            buf.pop();
        }
        Ok(Some((
            String::from_utf8_lossy(&buf).into_owned(),
            offset_before,
            n as u64,
        )))
    }

    /// Count a raw line against the cumulative caps. Called once a line is
    /// known to be kept (always true while priming the first record or
    /// seeking; gated on the sampling decision everywhere else).
    fn count_raw_line(&mut self, raw_len: u64) -> Result<(), SingleFileError> {
        self.lines_read += 1;
        self.bytes_read += raw_len;
        if self.lines_read > self.max_lines {
            return Err(SingleFileError::LineCapExceeded {
                path: self.path.clone(),
                cap: self.max_lines,
            });
        }
        if self.bytes_read > MAX_BYTES {
            return Err(SingleFileError::ByteCapExceeded {
                path: self.path.clone(),
            });
        }
        Ok(())
    }

    /// Produce the next candidate record, applying continuation-line
    /// attribution and sampling. Returns `Ok(None)` at end of file.
    fn advance(&mut self) -> Result<Option<(LogRecord, u64)>, SingleFileError> {
        loop {
            let (line, offset_before, raw_len) = match self.read_raw_line()? {
                None => return Ok(None),
                Some(x) => x,
            };

            // The sampling decision gates a raw line before it counts against
            // the cumulative caps at all, so a low --sample rate can scan far
            // beyond where an unsampled read would have hit MAX_KLINES/MAXGB.
            let keep = self.seeking
                || self
                    .sampling_rate
                    .map_or(true, |rate| rate >= 1.0 || sample_keep(rate));
            if !keep {
                continue;
            }
            self.count_raw_line(raw_len)?;

            if line.is_empty() {
                continue;
            }
            if let Some(m) = match_line(&line) {
                let level = parse_level_or_warn(m.level.as_deref());
                let (norm_text, fp) = squeeze(&m.body);
                let rec = LogRecord {
                    ts: m.ts,
                    level,
                    text: m.body,
                    norm_text,
                    fp,
                    unrecognized_line: false,
                    host: None,
                };
                self.last_ctx = Some((rec.ts.clone(), rec.level));
                return Ok(Some((rec, offset_before)));
            }
            match self.last_ctx.clone() {
                None => continue,
                Some((ts, level)) => {
                    if self.seeking {
                        continue;
                    }
                    let (norm_text, fp) = squeeze(&line);
                    let rec = LogRecord {
                        ts,
                        level,
                        text: line,
                        norm_text,
                        fp,
                        unrecognized_line: true,
                        host: None,
                    };
                    return Ok(Some((rec, offset_before)));
                }
            }
        }
    }

    pub fn peek(&mut self) -> Result<Option<&LogRecord>, SingleFileError> {
        if self.peeked.is_none() {
            if let Some(found) = self.advance()? {
                self.peeked = Some(found);
            }
        }
        Ok(self.peeked.as_ref().map(|(r, _)| r))
    }

    pub fn next(&mut self) -> Result<LogRecord, SingleFileError> {
        if self.peeked.is_none() {
            self.peek()?;
        }
        match self.peeked.take() {
            Some((rec, offset)) => {
                self.current_offset = offset;
                Ok(rec)
            }
            None => Err(SingleFileError::EndOfStream {
                path: self.path.clone(),
            }),
        }
    }

    pub fn byte_offset(&self) -> u64 {
        self.current_offset
    }

    /// Seek to `off`, discard the lookahead, and read one priming record in
    /// "seeking" mode: sampling is disabled and unrecognized lines are
    /// dropped for this read.
    pub fn seek_offset(&mut self, off: u64) -> Result<(), SingleFileError> {
        self.file
            .seek(SeekFrom::Start(off))
            .map_err(|source| SingleFileError::Io {
                path: self.path.clone(),
                source,
            })?;
        self.pos = off;
        self.peeked = None;
        self.seeking = true;
        let result = self.advance();
        self.seeking = false;
        self.peeked = result?;
        Ok(())
    }

    /// Position the reader so the next returned record has `ts >= target_ts`.
    pub fn seek_time(&mut self, target_ts: &str) -> Result<(), SingleFileError> {
        let file_size = self
            .file
            .get_ref()
            .metadata()
            .map_err(|source| SingleFileError::Io {
                path: self.path.clone(),
                source,
            })?
            .len();
        let mut start = 0u64;
        let mut end = file_size;

        self.seek_offset(start)?;
        match self.peek()? {
            Some(r) if r.ts.as_str() >= target_ts => return Ok(()),
            None => return Ok(()),
            _ => {}
        }

        while end - start > SEEK_TIME_WINDOW {
            if self.peek()?.is_none() {
                break;
            }
            let mid = start + (end - start) / 2;
            self.seek_offset(mid)?;
            let before_target = matches!(self.peek()?, Some(r) if r.ts.as_str() < target_ts);
            if before_target {
                start = mid;
            } else {
                end = mid;
            }
        }

        self.seek_offset(start)?;
        while matches!(self.peek()?, Some(r) if r.ts.as_str() < target_ts) {
            self.next()?;
        }
        Ok(())
    }

    pub fn first_record(&self) -> &LogRecord {
        &self.first_record
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
