//! Public entry point (component I): normalizes a grammar spec into a
//! root block, threads configuration options, and runs project parsing.

use std::rc::Rc;

use crate::project::{self, DefaultLocator, Fatal, Locator, Project};
use crate::shape::{BlockShape, BodyMember, RootBlock, StatementShape};
use crate::source::{ResourceLoader, SourceId};
use crate::splitter::{Delimiters, Splitter};

/// The several shapes a grammar may be declared as (§4.I): a single
/// statement or block shape (wrapped as a zero-or-more root body), an
/// ordered set of shapes (wrapped as a disjunction), or an already-built
/// root block. §4.I's fourth accepted shape, "already a parser class, use
/// it", has no variant here: a caller that already holds a built [`Parser`]
/// just uses it directly rather than re-wrapping it into a new one.
pub enum GrammarSpec<C> {
    /// A single statement shape, wrapped as a zero-or-more root body.
    Statement(Rc<dyn StatementShape<C>>),
    /// A single block shape, wrapped as a zero-or-more root body.
    Block(Rc<dyn BlockShape<C>>),
    /// An ordered set of body members, tried in declaration order.
    Many(Vec<BodyMember<C>>),
    /// An already-built root block, used as-is.
    Root(RootBlock<C>),
}

impl<C> GrammarSpec<C> {
    fn into_root(self) -> RootBlock<C> {
        match self {
            GrammarSpec::Statement(s) => RootBlock::new(vec![BodyMember::Statement(s)]),
            GrammarSpec::Block(b) => RootBlock::new(vec![BodyMember::Block(b)]),
            GrammarSpec::Many(members) => RootBlock::new(members),
            GrammarSpec::Root(root) => root,
        }
    }
}

/// Configuration options recognized by the public entry point (§4.I table).
pub struct ParserOptions<C> {
    config: C,
    strip_spaces: bool,
    delimiters: Delimiters,
    locator: Box<dyn Locator>,
    prefer_resource_as_file: bool,
    include_only_once: bool,
    resource_loader: Option<Box<dyn ResourceLoader>>,
}

impl<C> ParserOptions<C> {
    /// Defaults: `strip_spaces = true`, end-of-line-only delimiters,
    /// [`DefaultLocator`], `prefer_resource_as_file = true`,
    /// `include_only_once = true`, no resource loader.
    pub fn new(config: C) -> Self {
        ParserOptions {
            config,
            strip_spaces: true,
            delimiters: Delimiters::end_of_line_only(),
            locator: Box::new(DefaultLocator),
            prefer_resource_as_file: true,
            include_only_once: true,
            resource_loader: None,
        }
    }

    /// Whether each statement's text is trimmed of leading/trailing
    /// whitespace before being offered to a shape's `try_parse`.
    pub fn strip_spaces(mut self, value: bool) -> Self {
        self.strip_spaces = value;
        self
    }

    /// The delimiter table the line splitter compiles its pattern from.
    pub fn delimiters(mut self, value: Delimiters) -> Self {
        self.delimiters = value;
        self
    }

    /// The locator used to resolve include targets to new source ids.
    pub fn locator(mut self, value: Box<dyn Locator>) -> Self {
        self.locator = value;
        self
    }

    /// Whether a packaged resource is opened as a file when the locator can
    /// resolve it to one, instead of always going through `read_to_string`.
    pub fn prefer_resource_as_file(mut self, value: bool) -> Self {
        self.prefer_resource_as_file = value;
        self
    }

    /// Settles `spec.md` §9 Open Question 2 ("fatal by default,
    /// configurable off").
    pub fn include_only_once(mut self, value: bool) -> Self {
        self.include_only_once = value;
        self
    }

    /// The loader used to resolve and read packaged resources.
    pub fn resource_loader(mut self, value: Box<dyn ResourceLoader>) -> Self {
        self.resource_loader = Some(value);
        self
    }
}

/// A built parser: a root block plus the options needed to drive a source
/// or a project through it.
pub struct Parser<C> {
    root: RootBlock<C>,
    options: ParserOptions<C>,
    splitter: Splitter,
}

impl<C: Clone> Parser<C> {
    /// Normalizes `spec` into a root block and compiles `options.delimiters`
    /// into a splitter once, up front.
    pub fn new(spec: GrammarSpec<C>, options: ParserOptions<C>) -> Self {
        let splitter = Splitter::new(options.delimiters.clone());
        Parser {
            root: spec.into_root(),
            options,
            splitter,
        }
    }

    /// Parses `entry` and every source it transitively includes into a
    /// [`Project`] (§4.I, §4.H).
    pub fn parse_project(&self, entry: SourceId) -> Result<Project<C>, Fatal> {
        project::parse_project(
            entry,
            &self.root,
            self.options.config.clone(),
            &self.splitter,
            self.options.strip_spaces,
            self.options.resource_loader.as_deref(),
            self.options.prefer_resource_as_file,
            self.options.locator.as_ref(),
            self.options.include_only_once,
        )
    }
}
