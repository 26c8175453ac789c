use thiserror::Error;

use crate::models::{Status, StudentEntry};
use crate::record::{self, MalformedRecord};

/// A line that could not be parsed during a load. `line_number` is 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedLine {
    pub line_number: usize,
    pub raw: String,
    pub reason: MalformedRecord,
}

/// Some lines failed to parse. The lines that did parse are still loaded;
/// the caller decides whether to proceed with `store` or treat the load as
/// fatal. This is deliberately more tolerant than the original behavior,
/// which discarded the whole roster on the first bad line.
#[derive(Debug, Error)]
#[error("{} roster line(s) could not be parsed", .skipped.len())]
pub struct PartialLoadFailure {
    pub store: RosterStore,
    pub skipped: Vec<SkippedLine>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("row {index} is out of range for a roster of {len} students")]
pub struct IndexOutOfRange {
    pub index: usize,
    pub len: usize,
}

/// The authoritative in-memory mirror of the remote roster file for the
/// current session. Entry order is file line order and is preserved on
/// round-trip. Replaced wholesale on every fetch; mutated only through
/// [`RosterStore::set_status`].
#[derive(Debug, Clone)]
pub struct RosterStore {
    entries: Vec<StudentEntry>,
    raw_remote_text: String,
    dirty: bool,
}

impl RosterStore {
    /// Parse `text` into a store, one entry per non-empty line.
    ///
    /// Malformed lines are collected rather than aborting the load; the
    /// error still carries the store built from every line that parsed.
    pub fn load_from_text(text: &str) -> Result<RosterStore, PartialLoadFailure> {
        let mut entries = Vec::new();
        let mut skipped = Vec::new();

        for (number, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match record::parse_line(line) {
                Ok(entry) => entries.push(entry),
                Err(reason) => skipped.push(SkippedLine {
                    line_number: number + 1,
                    raw: line.to_string(),
                    reason,
                }),
            }
        }

        let store = RosterStore {
            entries,
            raw_remote_text: text.to_string(),
            dirty: false,
        };

        if skipped.is_empty() {
            Ok(store)
        } else {
            Err(PartialLoadFailure { store, skipped })
        }
    }

    pub fn entries(&self) -> &[StudentEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Change one student's status. Marks the store dirty only when the
    /// value actually changes, matching the original UI where the change
    /// signal fired only on a real edit.
    pub fn set_status(&mut self, index: usize, status: Status) -> Result<(), IndexOutOfRange> {
        let len = self.entries.len();
        let entry = self
            .entries
            .get_mut(index)
            .ok_or(IndexOutOfRange { index, len })?;
        if entry.status != status {
            entry.status = status;
            self.dirty = true;
        }
        Ok(())
    }

    /// Re-render the ENTIRE roster in stored order, one line per entry.
    ///
    /// This always walks the full unfiltered set: saving while a filter is
    /// displayed must never drop the students the filter hides.
    pub fn serialize(&self) -> String {
        let mut output = String::new();
        for entry in &self.entries {
            output.push_str(&record::serialize_line(entry));
            output.push('\n');
        }
        output
    }

    /// The raw remote text captured at load time, kept as the merge base.
    pub fn raw_remote_text(&self) -> &str {
        &self.raw_remote_text
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Call only after a confirmed successful remote commit.
    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }
}
