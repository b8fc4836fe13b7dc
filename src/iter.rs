//! Peekable and hashing iterators over `(line, column, statement)` triples.

use sha1::{Digest, Sha1};

use crate::splitter::Splitter;

/// One `(line, column, statement_text)` element yielded by a source's
/// sequence iterator (§4.C, GLOSSARY "Triple").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Triple {
    /// 0-based line index.
    pub line: i64,
    /// 0-based byte offset into the original, pre-strip line.
    pub col: i64,
    /// The statement text, already split and (optionally) stripped.
    pub text: String,
}

impl Triple {
    /// Builds a triple from a line index, column, and statement text.
    pub fn new(line: i64, col: i64, text: impl Into<String>) -> Self {
        Triple {
            line,
            col,
            text: text.into(),
        }
    }
}

/// An object-safe source of triples with at-most-one lookahead.
///
/// Object-safety lets [`crate::shape::StatementShape::consume`] and
/// [`crate::shape::BlockShape::consume`] take `&mut dyn TripleSource` rather
/// than being generic over the concrete iterator, so shapes can be stored as
/// `Rc<dyn ...>` (§4.C supplement in `SPEC_FULL.md`).
pub trait TripleSource {
    /// Returns the next triple without advancing, or `None` at end of input.
    fn peek(&mut self) -> Option<&Triple>;

    /// Advances past the peeked triple and returns it.
    fn next_triple(&mut self) -> Option<Triple>;
}

/// Splits an iterator of raw lines (newline already stripped) into the
/// flattened triple stream, dropping statements that are empty after
/// stripping (§4.B edge cases, §4.C).
pub fn split_into_lines<'a, I>(
    lines: I,
    splitter: &'a Splitter,
    strip_spaces: bool,
) -> impl Iterator<Item = Triple> + 'a
where
    I: IntoIterator<Item = String> + 'a,
{
    lines
        .into_iter()
        .enumerate()
        .flat_map(move |(lineno, line)| {
            splitter
                .split(&line, strip_spaces)
                .into_iter()
                .filter(|(_, text)| !text.is_empty())
                .map(move |(col, text)| Triple::new(lineno as i64, col, text))
                .collect::<Vec<_>>()
        })
}

/// Single-element-lookahead wrapper over any `Iterator<Item = Triple>`.
///
/// Matches the Design Note "Peek-one iterator": a two-field buffer, no
/// unbounded lookahead.
pub struct PeekableTriples<I: Iterator<Item = Triple>> {
    inner: I,
    peeked: Option<Option<Triple>>,
}

impl<I: Iterator<Item = Triple>> PeekableTriples<I> {
    /// Wraps `inner` with an empty lookahead buffer.
    pub fn new(inner: I) -> Self {
        PeekableTriples {
            inner,
            peeked: None,
        }
    }
}

impl<I: Iterator<Item = Triple>> TripleSource for PeekableTriples<I> {
    fn peek(&mut self) -> Option<&Triple> {
        if self.peeked.is_none() {
            self.peeked = Some(self.inner.next());
        }
        self.peeked.as_ref().unwrap().as_ref()
    }

    fn next_triple(&mut self) -> Option<Triple> {
        match self.peeked.take() {
            Some(v) => v,
            None => self.inner.next(),
        }
    }
}

/// Wraps a [`TripleSource`] and feeds every triple returned by `next_triple`
/// into a running SHA-1 accumulator, in canonical `(line, col, text)` binary
/// form. `peek` never touches the hash (§4.C contract).
pub struct HashingTriples<S: TripleSource> {
    inner: S,
    hasher: Sha1,
}

impl<S: TripleSource> HashingTriples<S> {
    /// Wraps `inner` with a fresh SHA-1 accumulator.
    pub fn new(inner: S) -> Self {
        HashingTriples {
            inner,
            hasher: Sha1::new(),
        }
    }

    /// The hex-encoded digest of every triple consumed so far.
    pub fn hexdigest(&self) -> String {
        let result = self.hasher.clone().finalize();
        result.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

impl<S: TripleSource> TripleSource for HashingTriples<S> {
    fn peek(&mut self) -> Option<&Triple> {
        self.inner.peek()
    }

    fn next_triple(&mut self) -> Option<Triple> {
        let triple = self.inner.next_triple();
        if let Some(t) = &triple {
            self.hasher.update(t.line.to_be_bytes());
            self.hasher.update(t.col.to_be_bytes());
            self.hasher.update(t.text.as_bytes());
        }
        triple
    }
}
