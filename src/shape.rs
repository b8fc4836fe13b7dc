//! Statement/block shape contracts and the block-consumption algorithm
//! (components D, E, F).

use std::rc::Rc;

use crate::iter::TripleSource;
use crate::node::{BeginOfStream, EndOfStream, StatementNode, UnexpectedEndOfStream, UnknownStatement};
use crate::position::{Position, Positioned};

/// The result of trying a statement shape against one piece of text (§4.D).
pub enum ParseOutcome {
    /// Syntactically mine and well-formed.
    Accept(Box<dyn StatementNode>),
    /// Syntactically mine but semantically invalid; `node` is a typed error
    /// value. Parsing continues past it.
    Reject(Box<dyn StatementNode>),
    /// Not claimed by this shape; another shape may try.
    NotMine,
}

/// A grammar author's contract for turning one statement's text into a
/// parsed value, a typed error, or "not mine" (§4.D, §6 "Grammar-author
/// surface").
///
/// `C` is the opaque configuration value threaded to every call (§4.I
/// `config` option; settles Open Question 1 in `spec.md` §9 by always
/// taking `config`, using `()` when a grammar needs none).
pub trait StatementShape<C> {
    /// Parses `text` into `Accept`, `Reject`, or `NotMine`.
    fn try_parse(&self, text: &str, config: &C) -> ParseOutcome;

    /// Peeks the source, calls [`Self::try_parse`], and on a non-`NotMine`
    /// result advances the source and stamps `(line, col)` on the value.
    /// Leaves the source untouched on `NotMine` or end of input.
    fn consume(&self, source: &mut dyn TripleSource, config: &C) -> Option<Box<dyn StatementNode>> {
        let text = source.peek()?.text.clone();
        match self.try_parse(&text, config) {
            ParseOutcome::NotMine => None,
            ParseOutcome::Accept(node) | ParseOutcome::Reject(node) => {
                let triple = source
                    .next_triple()
                    .expect("a peeked triple is still present to commit");
                let mut node = node;
                node.set_position(Position::new(triple.line, triple.col));
                Some(node)
            }
        }
    }
}

/// One element of a block's declared body: either a statement shape or a
/// nested block shape (§4.E "Shape discovery" — blocks are body members
/// too, and drive their own subtree).
pub enum BodyMember<C> {
    /// A statement shape tried at this body position.
    Statement(Rc<dyn StatementShape<C>>),
    /// A nested block shape tried at this body position.
    Block(Rc<dyn BlockShape<C>>),
}

/// A committed body position: either a statement value or a nested block.
pub enum BodyElement {
    /// A committed statement value.
    Statement(Box<dyn StatementNode>),
    /// A committed nested block.
    Block(BlockNode),
}

impl BodyElement {
    fn flatten_into<'a>(&'a self, out: &mut Vec<&'a dyn StatementNode>) {
        match self {
            BodyElement::Statement(s) => out.push(s.as_ref()),
            BodyElement::Block(b) => b.flatten_into(out),
        }
    }
}

/// A committed block: `(opening, body, closing)` per §3 "Block value".
pub struct BlockNode {
    /// The committed opening statement.
    pub opening: Box<dyn StatementNode>,
    /// The committed body, in source order.
    pub body: Vec<BodyElement>,
    /// The committed closing statement.
    pub closing: Box<dyn StatementNode>,
}

impl BlockNode {
    /// Depth-first flattening: opening, then each body element (nested
    /// blocks flatten recursively inline), then closing (§3 "Traversal").
    pub fn flatten(&self) -> Vec<&dyn StatementNode> {
        let mut out = Vec::new();
        self.flatten_into(&mut out);
        out
    }

    fn flatten_into<'a>(&'a self, out: &mut Vec<&'a dyn StatementNode>) {
        out.push(self.opening.as_ref());
        for el in &self.body {
            el.flatten_into(out);
        }
        out.push(self.closing.as_ref());
    }

    /// The subset of this block's recursive traversal tagged as an error
    /// (§4.A "errors view").
    pub fn errors(&self) -> Vec<&dyn StatementNode> {
        self.flatten().into_iter().filter(|n| n.is_error()).collect()
    }

    /// Whether any node in this block's subtree is tagged as an error.
    pub fn has_errors(&self) -> bool {
        self.flatten().iter().any(|n| n.is_error())
    }
}

/// The §4.E body step shared by [`BlockShape::consume_body`] and
/// [`RootBlock::consume`]: try each declared body class in order, committing
/// the first non-`NotMine` result; if none claims the position, consume one
/// triple unconditionally as [`UnknownStatement`]. The sole implementation
/// of this step, so a future change to it (e.g. the position-stamping of
/// the `UnknownStatement` fallback) cannot silently diverge between a
/// user-declared block and the root block.
fn scan_body<C>(
    body_classes: &[BodyMember<C>],
    source: &mut dyn TripleSource,
    config: &C,
) -> BodyElement {
    for member in body_classes {
        match member {
            BodyMember::Statement(s) => {
                if let Some(node) = s.consume(source, config) {
                    return BodyElement::Statement(node);
                }
            }
            BodyMember::Block(b) => {
                if let Some(block) = b.consume(source, config) {
                    return BodyElement::Block(block);
                }
            }
        }
    }
    let triple = source
        .next_triple()
        .expect("caller confirmed the source is not exhausted");
    let mut node: Box<dyn StatementNode> = Box::new(UnknownStatement::new(triple.text));
    node.set_position(Position::new(triple.line, triple.col));
    BodyElement::Statement(node)
}

/// A declared region with an opening, a repeated body, and a closing
/// (§4.E). `opening_classes`/`body_classes`/`closing_classes` are
/// constructor-time registration lists (Design Note option (a) — no
/// run-time type reflection), populated once, in declaration order.
pub trait BlockShape<C> {
    /// The shapes tried, in declaration order, to open this block.
    fn opening_classes(&self) -> &[Rc<dyn StatementShape<C>>];
    /// The shapes (statements or nested blocks) tried, in declaration
    /// order, at each body position.
    fn body_classes(&self) -> &[BodyMember<C>];
    /// The shapes tried, in declaration order, to close this block.
    fn closing_classes(&self) -> &[Rc<dyn StatementShape<C>>];

    /// Tries each opening class in declared order; the first to claim the
    /// position wins.
    fn consume_opening(
        &self,
        source: &mut dyn TripleSource,
        config: &C,
    ) -> Option<Box<dyn StatementNode>> {
        for c in self.opening_classes() {
            if let Some(node) = c.consume(source, config) {
                return Some(node);
            }
        }
        None
    }

    /// Tries each closing class in declared order; the first to claim the
    /// position wins.
    fn consume_closing(
        &self,
        source: &mut dyn TripleSource,
        config: &C,
    ) -> Option<Box<dyn StatementNode>> {
        for c in self.closing_classes() {
            if let Some(node) = c.consume(source, config) {
                return Some(node);
            }
        }
        None
    }

    /// Tries each body class in declared order; an earlier shape's `Reject`
    /// wins over a later shape's would-be `Accept` (§4.E "Tie-breaks").
    /// Assumes the caller has already confirmed the source is not exhausted.
    fn consume_body(&self, source: &mut dyn TripleSource, config: &C) -> BodyElement {
        scan_body(self.body_classes(), source, config)
    }

    /// Runs the consume algorithm of §4.E: match an opening class, then
    /// loop trying closing classes before body classes on every iteration
    /// (closing-before-body is how nested blocks of the same shape
    /// terminate correctly), falling back to `UnknownStatement` for
    /// unclaimed positions and `UnexpectedEndOfStream` on exhaustion.
    fn consume(&self, source: &mut dyn TripleSource, config: &C) -> Option<BlockNode> {
        let opening = self.consume_opening(source, config)?;
        let mut body = Vec::new();
        loop {
            if source.peek().is_none() {
                let closing: Box<dyn StatementNode> = Box::new(UnexpectedEndOfStream::default());
                return Some(BlockNode {
                    opening,
                    body,
                    closing,
                });
            }
            if let Some(closing) = self.consume_closing(source, config) {
                return Some(BlockNode {
                    opening,
                    body,
                    closing,
                });
            }
            body.push(self.consume_body(source, config));
        }
    }
}

/// The degenerate outermost block of any source (§3 "Root block", §4.F).
///
/// Its opening is the synthetic `BeginOfStream` at `(0, 0)`, produced
/// unconditionally without consulting the iterator. Its closing is
/// `EndOfStream` on natural exhaustion; if a nested block was left open
/// when the stream ran out, that nested block (not the root) carries
/// `UnexpectedEndOfStream`.
pub struct RootBlock<C> {
    body: Vec<BodyMember<C>>,
}

impl<C> RootBlock<C> {
    /// Builds a root block whose body repeats the given members zero or
    /// more times, tried in declaration order.
    pub fn new(body: Vec<BodyMember<C>>) -> Self {
        RootBlock { body }
    }

    /// Runs the root consume algorithm: no opening/closing classes are
    /// ever consulted, so every body position is tried (via the same
    /// [`scan_body`] step a declared block uses) until the source is
    /// exhausted, at which point `EndOfStream` is synthesized.
    pub fn consume(&self, source: &mut dyn TripleSource, config: &C) -> BlockNode {
        let opening: Box<dyn StatementNode> = Box::new(BeginOfStream::default());
        let mut body = Vec::new();
        loop {
            if source.peek().is_none() {
                let closing: Box<dyn StatementNode> = Box::new(EndOfStream::default());
                return BlockNode {
                    opening,
                    body,
                    closing,
                };
            }
            body.push(scan_body(&self.body, source, config));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iter::{split_into_lines, HashingTriples, PeekableTriples};
    use crate::splitter::{Delimiters, Splitter};
    use std::any::Any;
    use std::fmt;

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Comment {
        text: String,
        position: Position,
    }

    impl fmt::Display for Comment {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{}", self.text)
        }
    }

    impl Positioned for Comment {
        fn position(&self) -> Position {
            self.position
        }
        fn set_position(&mut self, position: Position) {
            self.position = position;
        }
    }

    impl StatementNode for Comment {
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

    struct CommentShape;

    impl StatementShape<()> for CommentShape {
        fn try_parse(&self, text: &str, _config: &()) -> ParseOutcome {
            if let Some(rest) = text.strip_prefix('#') {
                ParseOutcome::Accept(Box::new(Comment {
                    text: format!("#{rest}"),
                    position: Position::SENTINEL,
                }))
            } else {
                ParseOutcome::NotMine
            }
        }
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct EqualFloat {
        ident: String,
        value_text: String,
        position: Position,
    }

    impl Positioned for EqualFloat {
        fn position(&self) -> Position {
            self.position
        }
        fn set_position(&mut self, position: Position) {
            self.position = position;
        }
    }

    impl StatementNode for EqualFloat {
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

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct NotAValidIdentifier {
        text: String,
        position: Position,
    }

    impl Positioned for NotAValidIdentifier {
        fn position(&self) -> Position {
            self.position
        }
        fn set_position(&mut self, position: Position) {
            self.position = position;
        }
    }

    impl StatementNode for NotAValidIdentifier {
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

    struct EqualFloatShape;

    impl StatementShape<()> for EqualFloatShape {
        fn try_parse(&self, text: &str, _config: &()) -> ParseOutcome {
            let Some((ident, value)) = text.split_once('=') else {
                return ParseOutcome::NotMine;
            };
            let ident = ident.trim();
            let value = value.trim();
            if ident.is_empty() || !ident.chars().next().unwrap().is_alphabetic() {
                return ParseOutcome::Reject(Box::new(NotAValidIdentifier {
                    text: ident.to_string(),
                    position: Position::SENTINEL,
                }));
            }
            if value.parse::<f64>().is_err() {
                return ParseOutcome::NotMine;
            }
            ParseOutcome::Accept(Box::new(EqualFloat {
                ident: ident.to_string(),
                value_text: value.to_string(),
                position: Position::SENTINEL,
            }))
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct Open {
        position: Position,
    }

    impl Positioned for Open {
        fn position(&self) -> Position {
            self.position
        }
        fn set_position(&mut self, position: Position) {
            self.position = position;
        }
    }

    impl StatementNode for Open {
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

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct Close {
        position: Position,
    }

    impl Positioned for Close {
        fn position(&self) -> Position {
            self.position
        }
        fn set_position(&mut self, position: Position) {
            Positioned::set_position(self, position)
        }
    }

    impl StatementNode for Close {
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

    struct OpenShape;
    impl StatementShape<()> for OpenShape {
        fn try_parse(&self, text: &str, _config: &()) -> ParseOutcome {
            if text == "@begin" {
                ParseOutcome::Accept(Box::new(Open {
                    position: Position::SENTINEL,
                }))
            } else {
                ParseOutcome::NotMine
            }
        }
    }

    struct CloseShape;
    impl StatementShape<()> for CloseShape {
        fn try_parse(&self, text: &str, _config: &()) -> ParseOutcome {
            if text == "@end" {
                ParseOutcome::Accept(Box::new(Close {
                    position: Position::SENTINEL,
                }))
            } else {
                ParseOutcome::NotMine
            }
        }
    }

    struct SectionBlock {
        opening: Vec<Rc<dyn StatementShape<()>>>,
        body: Vec<BodyMember<()>>,
        closing: Vec<Rc<dyn StatementShape<()>>>,
    }

    impl SectionBlock {
        fn new() -> Self {
            SectionBlock {
                opening: vec![Rc::new(OpenShape)],
                body: vec![
                    BodyMember::Statement(Rc::new(CommentShape)),
                    BodyMember::Statement(Rc::new(EqualFloatShape)),
                ],
                closing: vec![Rc::new(CloseShape)],
            }
        }
    }

    impl BlockShape<()> for SectionBlock {
        fn opening_classes(&self) -> &[Rc<dyn StatementShape<()>>] {
            &self.opening
        }
        fn body_classes(&self) -> &[BodyMember<()>] {
            &self.body
        }
        fn closing_classes(&self) -> &[Rc<dyn StatementShape<()>>] {
            &self.closing
        }
    }

    fn hashing_source(lines: &[&str]) -> HashingTriples<PeekableTriples<std::vec::IntoIter<crate::iter::Triple>>> {
        let splitter = Splitter::new(Delimiters::new());
        let triples: Vec<_> =
            split_into_lines(lines.iter().map(|s| s.to_string()), &splitter, true).collect();
        HashingTriples::new(PeekableTriples::new(triples.into_iter()))
    }

    #[test]
    fn scenario_1_comment_and_statement() {
        let mut source = hashing_source(&["# hi", "x = 1.0"]);
        let root = RootBlock::new(vec![
            BodyMember::Statement(Rc::new(CommentShape)),
            BodyMember::Statement(Rc::new(EqualFloatShape)),
        ]);
        let block = root.consume(&mut source, &());
        assert_eq!(block.body.len(), 2);
        assert!(!block.has_errors());
        match &block.body[0] {
            BodyElement::Statement(s) => assert_eq!(s.position(), Position::new(0, 0)),
            _ => panic!("expected statement"),
        }
        match &block.body[1] {
            BodyElement::Statement(s) => assert_eq!(s.position(), Position::new(1, 0)),
            _ => panic!("expected statement"),
        }
    }

    #[test]
    fn scenario_2_unknown_statement() {
        let mut source = hashing_source(&["x<>1.0"]);
        let root = RootBlock::new(vec![
            BodyMember::Statement(Rc::new(CommentShape)),
            BodyMember::Statement(Rc::new(EqualFloatShape)),
        ]);
        let block = root.consume(&mut source, &());
        assert_eq!(block.body.len(), 1);
        assert!(block.has_errors());
        match &block.body[0] {
            BodyElement::Statement(s) => {
                assert!(s.as_any().downcast_ref::<UnknownStatement>().is_some());
            }
            _ => panic!("expected statement"),
        }
    }

    #[test]
    fn scenario_3_reject_continues_past_bad_statement() {
        let mut source = hashing_source(&["%a = 3.1"]);
        let root = RootBlock::new(vec![BodyMember::Statement(Rc::new(EqualFloatShape))]);
        let block = root.consume(&mut source, &());
        assert_eq!(block.body.len(), 1);
        assert!(block.has_errors());
        match &block.body[0] {
            BodyElement::Statement(s) => {
                assert!(s
                    .as_any()
                    .downcast_ref::<NotAValidIdentifier>()
                    .is_some());
            }
            _ => panic!("expected statement"),
        }
    }

    #[test]
    fn scenario_4_balanced_block() {
        let mut source = hashing_source(&["@begin", "# h", "x=1.0", "@end"]);
        let section: Rc<dyn BlockShape<()>> = Rc::new(SectionBlock::new());
        let root = RootBlock::new(vec![BodyMember::Block(section)]);
        let block = root.consume(&mut source, &());
        assert_eq!(block.body.len(), 1);
        match &block.body[0] {
            BodyElement::Block(inner) => {
                assert_eq!(inner.opening.position(), Position::new(0, 0));
                assert_eq!(inner.closing.position(), Position::new(3, 0));
                assert_eq!(inner.body.len(), 2);
                assert!(!inner.has_errors());
            }
            _ => panic!("expected block"),
        }
        assert!(!block.has_errors());
    }

    #[test]
    fn scenario_5_unterminated_block_closes_root_cleanly() {
        let mut source = hashing_source(&["@begin", "# h", "x=1.0"]);
        let section: Rc<dyn BlockShape<()>> = Rc::new(SectionBlock::new());
        let root = RootBlock::new(vec![BodyMember::Block(section)]);
        let block = root.consume(&mut source, &());
        assert!(block.closing.as_any().downcast_ref::<EndOfStream>().is_some());
        match &block.body[0] {
            BodyElement::Block(inner) => {
                assert!(inner
                    .closing
                    .as_any()
                    .downcast_ref::<UnexpectedEndOfStream>()
                    .is_some());
            }
            _ => panic!("expected block"),
        }
    }

    #[test]
    fn flatten_is_source_order() {
        let mut source = hashing_source(&["# a", "# b"]);
        let root = RootBlock::new(vec![BodyMember::Statement(Rc::new(CommentShape))]);
        let block = root.consume(&mut source, &());
        let flat = block.flatten();
        assert_eq!(flat.len(), 4);
        assert!(flat[0].as_any().downcast_ref::<BeginOfStream>().is_some());
        assert!(flat[3].as_any().downcast_ref::<EndOfStream>().is_some());
    }

    #[test]
    fn empty_input_closes_cleanly() {
        let mut source = hashing_source(&[]);
        let root: RootBlock<()> = RootBlock::new(vec![]);
        let block = root.consume(&mut source, &());
        assert!(block.body.is_empty());
        assert!(block.closing.as_any().downcast_ref::<EndOfStream>().is_some());
        assert_eq!(source.hexdigest(), "da39a3ee5e6b4b0d3255bfef95601890afd80709");
    }

    #[test]
    fn whitespace_only_input_closes_cleanly() {
        let mut source = hashing_source(&["   ", "\t"]);
        let root: RootBlock<()> = RootBlock::new(vec![]);
        let block = root.consume(&mut source, &());
        assert!(block.body.is_empty());
    }
}
