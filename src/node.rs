//! Tree-node contract and the engine's built-in synthetic/error values.

use std::any::Any;
use std::fmt;

use crate::position::{Position, Positioned};

/// The object-safe interface every tree value implements.
///
/// Grammar authors implement this for their parsed statement values and for
/// any custom error payloads they declare (see §4.A/§4.D). The engine's own
/// built-in values ([`UnknownStatement`], [`UnexpectedEndOfStream`],
/// [`BeginOfStream`], [`EndOfStream`]) implement it below.
pub trait StatementNode: fmt::Debug {
    /// The value's committed position.
    fn position(&self) -> Position;

    /// Stamps the committed position onto the value. Called exactly once,
    /// by the engine, when the value is committed from the iterator.
    fn set_position(&mut self, position: Position);

    /// Whether this value is tagged as an error for the purposes of a
    /// block's `has_errors`/error view.
    fn is_error(&self) -> bool {
        false
    }

    /// If this value is an include directive, the accessor onto its
    /// [`IncludeTarget`] view; `None` for every other value.
    fn as_include(&self) -> Option<&dyn IncludeTarget> {
        None
    }

    /// Downcasting hook for callers that need the concrete type back.
    fn as_any(&self) -> &dyn Any;
}

/// Accessor exposed by statement values that name another source to splice
/// in (§4.H, §6 "Grammar-author surface").
pub trait IncludeTarget {
    /// The raw include target string, as written in the source.
    fn target(&self) -> &str;
}

/// A body position that no declared body shape claimed.
///
/// Produced by the engine (not a grammar author) when a block's body
/// classes all return `NotMine` for the next statement text. Parsing
/// continues past it.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UnknownStatement {
    text: String,
    position: Position,
}

impl UnknownStatement {
    /// Builds an unclaimed-statement value from its raw text.
    pub fn new(text: impl Into<String>) -> Self {
        UnknownStatement {
            text: text.into(),
            position: Position::SENTINEL,
        }
    }

    /// The raw statement text that no shape claimed.
    pub fn text(&self) -> &str {
        &self.text
    }
}

impl fmt::Display for UnknownStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "could not parse '{}' {}",
            self.text,
            self.position
        )
    }
}

impl std::error::Error for UnknownStatement {}

impl Positioned for UnknownStatement {
    fn position(&self) -> Position {
        self.position
    }
    fn set_position(&mut self, position: Position) {
        self.position = position;
    }
}

impl StatementNode for UnknownStatement {
    fn position(&self) -> Position {
        Positioned::position(self)
    }
    fn set_position(&mut self, position: Position) {
        Positioned::set_position(self, position)
    }
    fn is_error(&self) -> bool {
        true
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// End of the iterator was reached while a block was still open.
///
/// Always carries the synthetic sentinel position `(-1, -1)`, since it is
/// never associated with a specific committed triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UnexpectedEndOfStream {
    position: Position,
}

impl fmt::Display for UnexpectedEndOfStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unexpected end of stream within an open block")
    }
}

impl std::error::Error for UnexpectedEndOfStream {}

impl Positioned for UnexpectedEndOfStream {
    fn position(&self) -> Position {
        self.position
    }
    fn set_position(&mut self, position: Position) {
        self.position = position;
    }
}

impl StatementNode for UnexpectedEndOfStream {
    fn position(&self) -> Position {
        Positioned::position(self)
    }
    fn set_position(&mut self, position: Position) {
        Positioned::set_position(self, position)
    }
    fn is_error(&self) -> bool {
        true
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// The synthetic opening of a [`crate::shape::RootBlock`], always at `(0, 0)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BeginOfStream {
    position: Position,
}

impl Default for BeginOfStream {
    fn default() -> Self {
        BeginOfStream {
            position: Position::BEGIN,
        }
    }
}

impl fmt::Display for BeginOfStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "beginning of stream")
    }
}

impl Positioned for BeginOfStream {
    fn position(&self) -> Position {
        self.position
    }
    fn set_position(&mut self, position: Position) {
        self.position = position;
    }
}

impl StatementNode for BeginOfStream {
    fn position(&self) -> Position {
        Positioned::position(self)
    }
    fn set_position(&mut self, position: Position) {
        Positioned::set_position(self, position)
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// The synthetic closing of a [`crate::shape::RootBlock`] on clean exhaustion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EndOfStream {
    position: Position,
}

impl fmt::Display for EndOfStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "end of stream")
    }
}

impl Positioned for EndOfStream {
    fn position(&self) -> Position {
        self.position
    }
    fn set_position(&mut self, position: Position) {
        self.position = position;
    }
}

impl StatementNode for EndOfStream {
    fn position(&self) -> Position {
        Positioned::position(self)
    }
    fn set_position(&mut self, position: Position) {
        Positioned::set_position(self, position)
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_statement_is_error() {
        let u = UnknownStatement::new("x<>1.0");
        assert!(u.is_error());
        assert_eq!(u.text(), "x<>1.0");
    }

    #[test]
    fn begin_of_stream_defaults_to_origin() {
        assert_eq!(BeginOfStream::default().position(), Position::BEGIN);
        assert!(!BeginOfStream::default().is_error());
    }

    #[test]
    fn unexpected_eof_defaults_to_sentinel() {
        let e = UnexpectedEndOfStream::default();
        assert_eq!(StatementNode::position(&e), Position::SENTINEL);
        assert!(e.is_error());
    }
}
