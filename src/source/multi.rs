//! Component C: concatenates every file a glob resolves to into one ordered
//! cursor, tracked by a [`UniversalOffset`] that survives across files.

use crate::model::UniversalOffset;
use crate::source::single::{SingleFileError, SingleFileReader};
use std::fs;
use thiserror::Error;
use tracing::warn;

const MAX_FILES: usize = 1000;
const MIN_FILE_SIZE: u64 = 10;

#[derive(Debug, Error)]
pub enum MultiFileError {
    #[error("no log files matched glob {glob:?}")]
    NoFilesMatched { glob: String },
    #[error("more than {MAX_FILES} log files matched glob {glob:?} ({count} found)")]
    TooManyFiles { glob: String, count: usize },
    #[error("could not read a first record from any file matching glob {glob:?}")]
    NoUsableFile { glob: String },
    #[error("unknown file in universal offset: {filename:?}")]
    UnknownFile { filename: String },
    #[error(transparent)]
    File(#[from] SingleFileError),
}

/// The concatenation of every [`SingleFileReader`] a glob resolves to,
/// ordered by each file's first record timestamp.
#[derive(Debug)]
pub struct MultiFileReader {
    glob: String,
    files: Vec<SingleFileReader>,
    current: usize,
    universal_offset: Option<UniversalOffset>,
}

impl MultiFileReader {
    pub fn open(
        glob_pattern: &str,
        max_klines: u64,
        sampling_rate: Option<f64>,
        verbose: bool,
        debug: bool,
    ) -> Result<Self, MultiFileError> {
        let paths: Vec<_> = glob::glob(glob_pattern)
            .map_err(|_| MultiFileError::NoFilesMatched {
                glob: glob_pattern.to_string(),
            })?
            .filter_map(|entry| match entry {
                Ok(p) => Some(p),
                Err(e) => {
                    warn!("glob entry error for {glob_pattern}: {e}");
                    None
                }
            })
            .collect();

        if paths.is_empty() {
            return Err(MultiFileError::NoFilesMatched {
                glob: glob_pattern.to_string(),
            });
        }
        if paths.len() > MAX_FILES {
            return Err(MultiFileError::TooManyFiles {
                glob: glob_pattern.to_string(),
                count: paths.len(),
            });
        }

        let mut files = Vec::new();
        for path in paths {
            if path.extension().is_some_and(|ext| ext == "gz") {
                continue;
            }
            let size = match fs::metadata(&path) {
                Ok(meta) => meta.len(),
                Err(e) => {
                    warn!("skipping {}: {e}", path.display());
                    continue;
                }
            };
            if size <= MIN_FILE_SIZE {
                continue;
            }
            match SingleFileReader::open(&path, max_klines, sampling_rate, verbose, debug) {
                Ok(reader) => files.push(reader),
                Err(e) => {
                    warn!("skipping {}: {e}", path.display());
                }
            }
        }

        if files.is_empty() {
            return Err(MultiFileError::NoUsableFile {
                glob: glob_pattern.to_string(),
            });
        }

        files.sort_by(|a, b| a.first_record().ts.cmp(&b.first_record().ts));

        let universal_offset = Some(UniversalOffset {
            filename: files[0].path().to_string_lossy().into_owned(),
            byte_offset: files[0].byte_offset(),
        });

        Ok(MultiFileReader {
            glob: glob_pattern.to_string(),
            files,
            current: 0,
            universal_offset,
        })
    }

    fn advance_to_readable(&mut self) -> Result<(), MultiFileError> {
        while self.current < self.files.len() {
            if self.files[self.current].peek()?.is_some() {
                return Ok(());
            }
            self.current += 1;
        }
        Ok(())
    }

    pub fn peek(&mut self) -> Result<Option<crate::model::LogRecord>, MultiFileError> {
        self.advance_to_readable()?;
        match self.files.get_mut(self.current) {
            Some(f) => Ok(f.peek()?.cloned()),
            None => Ok(None),
        }
    }

    pub fn next(&mut self) -> Result<Option<crate::model::LogRecord>, MultiFileError> {
        self.advance_to_readable()?;
        if self.current >= self.files.len() {
            return Ok(None);
        }
        let rec = self.files[self.current].next()?;
        self.universal_offset = Some(UniversalOffset {
            filename: self.files[self.current].path().to_string_lossy().into_owned(),
            byte_offset: self.files[self.current].byte_offset(),
        });
        Ok(Some(rec))
    }

    pub fn universal_offset(&self) -> Option<&UniversalOffset> {
        self.universal_offset.as_ref()
    }

    pub fn seek_offset(&mut self, target: &UniversalOffset) -> Result<(), MultiFileError> {
        let idx = self
            .files
            .iter()
            .position(|f| f.path().to_string_lossy() == target.filename)
            .ok_or_else(|| MultiFileError::UnknownFile {
                filename: target.filename.clone(),
            })?;
        self.files[idx].seek_offset(target.byte_offset)?;
        self.current = idx;
        self.universal_offset = Some(target.clone());
        Ok(())
    }

    pub fn seek_time(&mut self, target_ts: &str) -> Result<(), MultiFileError> {
        let mut found_idx = self.files.len() - 1;
        for i in 0..self.files.len() {
            let next_is_still_before = self
                .files
                .get(i + 1)
                .is_some_and(|nf| nf.first_record().ts.as_str() < target_ts);
            if !next_is_still_before {
                found_idx = i;
                break;
            }
        }
        self.files[found_idx].seek_time(target_ts)?;
        self.current = found_idx;
        self.universal_offset = Some(UniversalOffset {
            filename: self.files[found_idx].path().to_string_lossy().into_owned(),
            byte_offset: self.files[found_idx].byte_offset(),
        });
        Ok(())
    }

    pub fn close(&mut self) {
        self.files.clear();
        self.current = 0;
    }

    pub fn glob(&self) -> &str {
        &self.glob
    }
}
