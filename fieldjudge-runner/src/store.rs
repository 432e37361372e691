//! JSONL attempt store: the on-disk persistence collaborator.
//!
//! Every save, clear, and bar move is appended as one JSON object per line.
//! Loading replays the file in order with last-writer-wins per natural key,
//! so duplicate or retried writes converge on the same log. A line that fails
//! to parse (a torn write, say) is skipped with a warning.

use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use chrono::{NaiveDateTime, Utc};
use fieldjudge_core::domain::{EventId, Height};
use fieldjudge_core::persistence::{
    AttemptKey, AttemptRow, AttemptStore, RecordedOutcome, SaveError,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("attempt store {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("encode store line: {0}")]
    Encode(#[from] serde_json::Error),
}

impl From<StoreError> for SaveError {
    fn from(err: StoreError) -> Self {
        match err {
            // Disk trouble may clear up; a value that cannot be encoded will not.
            StoreError::Io { .. } => SaveError::transient(err.to_string()),
            StoreError::Encode(_) => SaveError::fatal(err.to_string()),
        }
    }
}

/// One line of the store file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum StoreLine {
    Save {
        at: NaiveDateTime,
        row: AttemptRow,
    },
    Clear {
        at: NaiveDateTime,
        key: AttemptKey,
    },
    Bar {
        at: NaiveDateTime,
        event_id: EventId,
        height: Height,
    },
}

#[derive(Debug, Default)]
struct Replayed {
    rows: BTreeMap<AttemptKey, RecordedOutcome>,
    bars: BTreeMap<EventId, Height>,
    lines: usize,
    skipped: usize,
}

/// Append-only JSONL store.
#[derive(Debug, Clone)]
pub struct JsonlAttemptStore {
    path: PathBuf,
}

impl JsonlAttemptStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one line, creating the file and its parent directory if needed.
    pub fn append(&self, line: &StoreLine) -> Result<(), StoreError> {
        let json = serde_json::to_string(line)?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| self.io_err(e))?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.io_err(e))?;

        writeln!(file, "{json}").map_err(|e| self.io_err(e))?;
        file.flush().map_err(|e| self.io_err(e))?;
        Ok(())
    }

    /// Read every line of the file. A missing file is an empty store.
    pub fn read_lines(&self) -> Result<Vec<StoreLine>, StoreError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let file = fs::File::open(&self.path).map_err(|e| self.io_err(e))?;
        let reader = io::BufReader::new(file);
        let mut lines = Vec::new();

        for (number, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| self.io_err(e))?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<StoreLine>(&line) {
                Ok(parsed) => lines.push(parsed),
                Err(e) => {
                    warn!(
                        path = %self.path.display(),
                        line = number + 1,
                        error = %e,
                        "skipping malformed store line"
                    );
                }
            }
        }
        Ok(lines)
    }

    /// Rewrite the file with only the live rows and the latest bar per event.
    ///
    /// Returns the number of lines dropped.
    pub fn compact(&self) -> Result<usize, StoreError> {
        let replayed = self.replay()?;
        let before = replayed.lines + replayed.skipped;
        let at = now();
        let mut out = String::new();
        for (key, outcome) in &replayed.rows {
            let line = StoreLine::Save {
                at,
                row: AttemptRow {
                    key: key.clone(),
                    outcome: *outcome,
                },
            };
            out.push_str(&serde_json::to_string(&line)?);
            out.push('\n');
        }
        for (event_id, height) in &replayed.bars {
            let line = StoreLine::Bar {
                at,
                event_id: event_id.clone(),
                height: *height,
            };
            out.push_str(&serde_json::to_string(&line)?);
            out.push('\n');
        }

        let tmp = self.path.with_extension("jsonl.tmp");
        fs::write(&tmp, out).map_err(|e| self.io_err(e))?;
        fs::rename(&tmp, &self.path).map_err(|e| self.io_err(e))?;

        let kept = replayed.rows.len() + replayed.bars.len();
        let dropped = before.saturating_sub(kept);
        debug!(path = %self.path.display(), kept, dropped, "store compacted");
        Ok(dropped)
    }

    fn replay(&self) -> Result<Replayed, StoreError> {
        let lines = self.read_lines()?;
        let mut replayed = Replayed {
            lines: lines.len(),
            skipped: self.count_raw_lines()?.saturating_sub(lines.len()),
            ..Replayed::default()
        };
        for line in lines {
            match line {
                StoreLine::Save { row, .. } => {
                    replayed.rows.insert(row.key, row.outcome);
                }
                StoreLine::Clear { key, .. } => {
                    replayed.rows.remove(&key);
                }
                StoreLine::Bar {
                    event_id, height, ..
                } => {
                    replayed.bars.insert(event_id, height);
                }
            }
        }
        Ok(replayed)
    }

    fn count_raw_lines(&self) -> Result<usize, StoreError> {
        if !self.path.exists() {
            return Ok(0);
        }
        let content = fs::read_to_string(&self.path).map_err(|e| self.io_err(e))?;
        Ok(content.lines().filter(|l| !l.trim().is_empty()).count())
    }

    fn io_err(&self, source: io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

impl AttemptStore for JsonlAttemptStore {
    fn save_attempt(&mut self, row: &AttemptRow) -> Result<(), SaveError> {
        self.append(&StoreLine::Save {
            at: now(),
            row: row.clone(),
        })?;
        Ok(())
    }

    fn clear_attempt(&mut self, key: &AttemptKey) -> Result<(), SaveError> {
        self.append(&StoreLine::Clear {
            at: now(),
            key: key.clone(),
        })?;
        Ok(())
    }

    fn load_attempts(&self, event_id: &EventId) -> Result<Vec<AttemptRow>, SaveError> {
        let replayed = self.replay()?;
        Ok(replayed
            .rows
            .into_iter()
            .filter(|(key, _)| &key.event_id == event_id)
            .map(|(key, outcome)| AttemptRow { key, outcome })
            .collect())
    }

    fn save_bar(&mut self, event_id: &EventId, height: Height) -> Result<(), SaveError> {
        self.append(&StoreLine::Bar {
            at: now(),
            event_id: event_id.clone(),
            height,
        })?;
        Ok(())
    }

    fn load_bar(&self, event_id: &EventId) -> Result<Option<Height>, SaveError> {
        Ok(self.replay()?.bars.get(event_id).copied())
    }
}
