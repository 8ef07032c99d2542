//! User-facing compilation messages.
//!
//! Every compilation phase returns a [`Diagnostics`] value: an ordered list of
//! [`Message`]s, each tagged with a [`MessageType`] and optionally pinned to an
//! [`InputRegion`] of the source text. A phase succeeded when it produced no
//! message above [`MessageType::Info`].
//!
//! Diagnostics are for the user. Internal defects travel as [`crate::Error`].

use std::fmt;

use strum::{Display, EnumIter};

/// Severity of a [`Message`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumIter)]
pub enum MessageType {
    /// Progress output, never a failure
    Info,
    /// Suspicious but not fatal
    Warning,
    /// The phase failed
    Error,
}

/// A line/column position in the source text, both 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Position {
    /// Line number
    pub line: usize,
    /// Column number
    pub column: usize,
}

impl Position {
    /// Creates a position.
    #[must_use]
    pub fn new(line: usize, column: usize) -> Self {
        Position { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A span of source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct InputRegion {
    /// First position
    pub start: Position,
    /// Last position
    pub stop: Position,
}

impl InputRegion {
    /// The absent region, for messages with no source location.
    pub const NONE: InputRegion = InputRegion {
        start: Position { line: 0, column: 0 },
        stop: Position { line: 0, column: 0 },
    };

    /// Creates a region.
    #[must_use]
    pub fn new(start: Position, stop: Position) -> Self {
        InputRegion { start, stop }
    }

    /// Returns `true` for [`InputRegion::NONE`].
    #[must_use]
    pub fn is_none(&self) -> bool {
        *self == InputRegion::NONE
    }

    /// Number of source lines the region spans.
    #[must_use]
    pub fn lines(&self) -> usize {
        if self.is_none() {
            0
        } else {
            self.stop.line.saturating_sub(self.start.line) + 1
        }
    }
}

/// One user-facing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Text
    pub text: String,
    /// Source location, [`InputRegion::NONE`] if unknown
    pub region: InputRegion,
    /// Severity
    pub kind: MessageType,
}

impl Message {
    /// Creates a message without a source location.
    #[must_use]
    pub fn new(kind: MessageType, text: impl Into<String>) -> Self {
        Message {
            text: text.into(),
            region: InputRegion::NONE,
            kind,
        }
    }

    /// Attaches a source location.
    #[must_use]
    pub fn at(mut self, region: InputRegion) -> Self {
        self.region = region;
        self
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.region.is_none() {
            write!(f, "{}: {}", self.kind, self.text)
        } else {
            write!(f, "{} ({}): {}", self.kind, self.region.start, self.text)
        }
    }
}

/// The result object of one compilation phase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    messages: Vec<Message>,
}

impl Diagnostics {
    /// Creates an empty, successful result.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if no message is a warning or an error.
    #[must_use]
    pub fn success(&self) -> bool {
        self.messages.iter().all(|m| m.kind == MessageType::Info)
    }

    /// Returns `true` if an error was reported.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.messages.iter().any(|m| m.kind == MessageType::Error)
    }

    /// Appends a message.
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Appends an [`MessageType::Info`] message.
    pub fn info(&mut self, text: impl Into<String>) {
        self.push(Message::new(MessageType::Info, text));
    }

    /// Appends a [`MessageType::Warning`] message.
    pub fn warning(&mut self, text: impl Into<String>) {
        self.push(Message::new(MessageType::Warning, text));
    }

    /// Appends a [`MessageType::Error`] message.
    pub fn error(&mut self, text: impl Into<String>) {
        self.push(Message::new(MessageType::Error, text));
    }

    /// Moves all messages of `other` to the end of this result.
    pub fn merge(&mut self, other: Diagnostics) {
        self.messages.extend(other.messages);
    }

    /// Returns all messages in report order.
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Returns the messages of one severity.
    pub fn of_kind(&self, kind: MessageType) -> impl Iterator<Item = &Message> + '_ {
        self.messages.iter().filter(move |m| m.kind == kind)
    }

    /// Returns the number of messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Returns `true` if nothing was reported.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl Extend<Message> for Diagnostics {
    fn extend<I: IntoIterator<Item = Message>>(&mut self, iter: I) {
        self.messages.extend(iter);
    }
}

impl IntoIterator for Diagnostics {
    type Item = Message;
    type IntoIter = std::vec::IntoIter<Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.into_iter()
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for message in &self.messages {
            writeln!(f, "{message}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_ignores_info() {
        let mut result = Diagnostics::new();
        assert!(result.success());

        result.info("Executed build call f from main");
        assert!(result.success());

        result.warning("unused");
        assert!(!result.success());
        assert!(!result.has_errors());

        result.error("Build Assert Failed.");
        assert!(result.has_errors());
        assert_eq!(result.of_kind(MessageType::Info).count(), 1);
    }

    #[test]
    fn test_merge_keeps_order() {
        let mut a = Diagnostics::new();
        a.info("first");
        let mut b = Diagnostics::new();
        b.error("second");
        a.merge(b);

        let texts: Vec<&str> = a.messages().iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second"]);
    }

    #[test]
    fn test_message_display() {
        let plain = Message::new(MessageType::Error, "File contains build calls: f");
        assert_eq!(plain.to_string(), "Error: File contains build calls: f");

        let located = Message::new(MessageType::Warning, "shadowed")
            .at(InputRegion::new(Position::new(3, 5), Position::new(4, 1)));
        assert_eq!(located.to_string(), "Warning (3:5): shadowed");
        assert_eq!(located.region.lines(), 2);
        assert_eq!(InputRegion::NONE.lines(), 0);
    }
}
