//! Per-compilation staging state.
//!
//! A [`StagingContext`] holds everything staged code can observe or change outside
//! its own frames: the call site being executed, the text written by `WriteLine`,
//! the assertion latch, open files and static local storage. One context belongs
//! to one compilation; [`StagingContext::reset`] clears it for the next run.

use std::{collections::HashMap, fs, path::Path};

use crate::{ir::TacId, symbols::LiteralValue, Error, Result};

/// The instruction whose execution is in progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSite {
    /// Function holding the instruction
    pub function: String,
    /// The build call or region start mark
    pub instruction: TacId,
}

/// A text file read line by line.
#[derive(Debug, Clone, Default)]
pub struct FileCursor {
    lines: Vec<String>,
    index: usize,
}

impl FileCursor {
    /// Reads `path` into memory.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FileError`] if the file cannot be read.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(Self::from_text(&text))
    }

    /// Creates a cursor over `text`.
    #[must_use]
    pub fn from_text(text: &str) -> Self {
        FileCursor {
            lines: text.lines().map(str::to_string).collect(),
            index: 0,
        }
    }

    /// Returns `true` while unread lines remain.
    #[must_use]
    pub fn has_line(&self) -> bool {
        self.index < self.lines.len()
    }

    /// Returns the next line and advances.
    pub fn read_line(&mut self) -> Option<String> {
        let line = self.lines.get(self.index).cloned()?;
        self.index += 1;
        Some(line)
    }
}

/// Mutable state shared by staged code during one compilation.
#[derive(Debug, Clone, Default)]
pub struct StagingContext {
    /// The instruction being executed, if any
    pub call_site: Option<CallSite>,
    output: String,
    assert_failed: bool,
    files: Vec<FileCursor>,
    statics: HashMap<String, LiteralValue>,
}

impl StagingContext {
    /// Creates an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears all state.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Returns the text written so far.
    #[must_use]
    pub fn output(&self) -> &str {
        &self.output
    }

    /// Appends `text` and a newline to the output.
    pub fn write_line(&mut self, text: &str) {
        self.output.push_str(text);
        self.output.push('\n');
    }

    /// Latches a failed assertion; a passing one changes nothing.
    pub fn assert(&mut self, condition: bool) {
        if !condition {
            self.assert_failed = true;
        }
    }

    /// Returns `true` once any assertion has failed.
    #[must_use]
    pub fn assert_failed(&self) -> bool {
        self.assert_failed
    }

    /// Opens `path` and returns a file handle value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FileError`] if the file cannot be read.
    pub fn open_file(&mut self, path: &str) -> Result<LiteralValue> {
        let cursor = FileCursor::open(path)?;
        self.files.push(cursor);
        Ok(LiteralValue::File(self.files.len() - 1))
    }

    /// Resolves a file handle value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StagingFault`] if `handle` is not an open file.
    pub fn file_mut(&mut self, handle: &LiteralValue) -> Result<&mut FileCursor> {
        let LiteralValue::File(index) = handle else {
            return Err(Error::StagingFault {
                function: "File".to_string(),
                message: format!("{handle} is not a file handle"),
            });
        };
        self.files.get_mut(*index).ok_or_else(|| Error::StagingFault {
            function: "File".to_string(),
            message: format!("Unknown file handle {index}"),
        })
    }

    /// Returns the stored value of a static local, keyed `{function}_{name}`.
    #[must_use]
    pub fn static_value(&self, key: &str) -> Option<&LiteralValue> {
        self.statics.get(key)
    }

    /// Stores the value of a static local.
    pub fn set_static(&mut self, key: impl Into<String>, value: LiteralValue) {
        self.statics.insert(key.into(), value);
    }

    /// Returns `true` if a static local has been initialized.
    #[must_use]
    pub fn has_static(&self, key: &str) -> bool {
        self.statics.contains_key(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_and_latch() {
        let mut context = StagingContext::new();
        context.write_line("a");
        context.write_line("b");
        context.assert(true);
        assert!(!context.assert_failed());
        context.assert(false);
        context.assert(true);

        assert_eq!(context.output(), "a\nb\n");
        assert!(context.assert_failed());

        context.reset();
        assert!(context.output().is_empty());
        assert!(!context.assert_failed());
    }

    #[test]
    fn test_file_cursor() {
        let mut cursor = FileCursor::from_text("one\ntwo\n");
        assert!(cursor.has_line());
        assert_eq!(cursor.read_line().as_deref(), Some("one"));
        assert_eq!(cursor.read_line().as_deref(), Some("two"));
        assert!(!cursor.has_line());
        assert_eq!(cursor.read_line(), None);
    }

    #[test]
    fn test_unknown_file_handle() {
        let mut context = StagingContext::new();
        assert!(context.file_mut(&LiteralValue::File(3)).is_err());
        assert!(context.file_mut(&LiteralValue::I32(0)).is_err());
    }
}
