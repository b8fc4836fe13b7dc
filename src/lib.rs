#![deny(missing_docs)]
#![allow(clippy::type_complexity)]

//! A declarative line-oriented parsing framework.
//!
//! A grammar author declares a set of *statement* shapes and hierarchically
//! nested *block* shapes; this crate drives a source (a file, a packaged
//! resource, or an include graph of either) through that grammar and
//! returns a strongly-typed, position-annotated syntax tree together with a
//! recoverable error list and a content hash of what was consumed.
//!
//! Parsing one source is strictly sequential and committed-choice: there is
//! no backtracking, and each statement shape parses its own line in full
//! (token-level parsing within a statement is left to the grammar author).
//!
//! # Example
//!
//! ```rust
//! use flexparse::node::StatementNode;
//! use flexparse::position::{Position, Positioned};
//! use flexparse::shape::{BodyMember, ParseOutcome, RootBlock, StatementShape};
//! use std::any::Any;
//! use std::rc::Rc;
//!
//! #[derive(Debug, Clone)]
//! struct Comment {
//!     text: String,
//!     position: Position,
//! }
//!
//! impl Positioned for Comment {
//!     fn position(&self) -> Position { self.position }
//!     fn set_position(&mut self, position: Position) { self.position = position; }
//! }
//!
//! impl StatementNode for Comment {
//!     fn position(&self) -> Position { Positioned::position(self) }
//!     fn set_position(&mut self, position: Position) { Positioned::set_position(self, position) }
//!     fn as_any(&self) -> &dyn Any { self }
//! }
//!
//! struct CommentShape;
//!
//! impl StatementShape<()> for CommentShape {
//!     fn try_parse(&self, text: &str, _config: &()) -> ParseOutcome {
//!         match text.strip_prefix('#') {
//!             Some(rest) => ParseOutcome::Accept(Box::new(Comment {
//!                 text: format!("#{rest}"),
//!                 position: Position::SENTINEL,
//!             })),
//!             None => ParseOutcome::NotMine,
//!         }
//!     }
//! }
//!
//! let root = RootBlock::new(vec![BodyMember::Statement(Rc::new(CommentShape))]);
//! ```

pub mod iter;
pub mod node;
pub mod parser;
pub mod position;
pub mod project;
pub mod shape;
pub mod source;
pub mod splitter;

pub use node::{BeginOfStream, EndOfStream, IncludeTarget, StatementNode, UnexpectedEndOfStream, UnknownStatement};
pub use parser::{GrammarSpec, Parser, ParserOptions};
pub use position::{Position, Positioned};
pub use project::{DefaultLocator, EntryKey, Fatal, LocateError, Locator, Project};
pub use shape::{BlockNode, BlockShape, BodyElement, BodyMember, ParseOutcome, RootBlock, StatementShape};
pub use source::{ParsedSource, ResourceLoader, SourceError, SourceId};
pub use splitter::{DelimiterSpec, Delimiters, Retention, Splitter};

#[cfg(feature = "derive")]
pub use flexparse_derive::{IncludeTarget, StatementNode};
