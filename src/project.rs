//! Project and include driver: composes parsed sources into a project,
//! resolving include directives via a pluggable locator (component H).

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;

use crate::node::StatementNode;
use crate::shape::RootBlock;
use crate::source::{parse_source, ParsedSource, ResourceLoader, SourceError, SourceId};
use crate::splitter::Splitter;

/// A key into a [`Project`]: the entry point, or an include edge
/// identified by the including source's origin and the raw target string
/// it named (§3 "Project").
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EntryKey {
    /// The project's entry point.
    Root,
    /// An include edge: the including source's origin and the raw target
    /// string it named.
    Include(SourceId, String),
}

impl fmt::Display for EntryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryKey::Root => write!(f, "ROOT"),
            EntryKey::Include(origin, target) => write!(f, "{origin} -> {target}"),
        }
    }
}

/// Fatal locator errors (§7 "Locator / include-graph errors").
#[derive(Debug)]
pub enum LocateError {
    /// The include target was an absolute path.
    AbsoluteTarget(String),
    /// The include target's `..` components escaped the including
    /// directory (or, for a root, its own directory).
    EscapesRoot(String),
}

impl fmt::Display for LocateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocateError::AbsoluteTarget(t) => {
                write!(f, "cannot refer to absolute paths in include statements ({t})")
            }
            LocateError::EscapesRoot(t) => {
                write!(f, "cannot refer to locations above the including directory ({t})")
            }
        }
    }
}

impl std::error::Error for LocateError {}

/// Maps `(including_source_id, target)` to a new [`SourceId`] (§4.H
/// "Locator", GLOSSARY "Locator").
pub trait Locator {
    /// Resolves `target`, as named by an include directive in `including`,
    /// to the [`SourceId`] it refers to.
    fn locate(&self, including: &SourceId, target: &str) -> Result<SourceId, LocateError>;
}

/// The default locator (§4.H "Default locator", settling `spec.md` §9's
/// "escape" wording inconsistency as: relative to the including file's
/// directory, `..` escapes above that directory rejected).
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultLocator;

impl DefaultLocator {
    fn target_escapes(target: &Path) -> bool {
        let mut depth: i32 = 0;
        for comp in target.components() {
            match comp {
                std::path::Component::ParentDir => {
                    depth -= 1;
                    if depth < 0 {
                        return true;
                    }
                }
                std::path::Component::Normal(_) => depth += 1,
                _ => {}
            }
        }
        false
    }

    fn resolve_within(base_dir: &Path, target: &Path) -> PathBuf {
        let mut out = base_dir.to_path_buf();
        for comp in target.components() {
            match comp {
                std::path::Component::ParentDir => {
                    out.pop();
                }
                std::path::Component::CurDir => {}
                other => out.push(other.as_os_str()),
            }
        }
        out
    }
}

impl Locator for DefaultLocator {
    fn locate(&self, including: &SourceId, target: &str) -> Result<SourceId, LocateError> {
        match including {
            SourceId::Path(path) => {
                let target_path = Path::new(target);
                if target_path.is_absolute() {
                    return Err(LocateError::AbsoluteTarget(target.to_string()));
                }
                if Self::target_escapes(target_path) {
                    return Err(LocateError::EscapesRoot(target.to_string()));
                }
                let base_dir = if path.is_dir() {
                    path.clone()
                } else {
                    path.parent()
                        .map(|p| p.to_path_buf())
                        .unwrap_or_else(|| PathBuf::from("."))
                };
                Ok(SourceId::Path(Self::resolve_within(&base_dir, target_path)))
            }
            SourceId::Resource(package, _name) => {
                Ok(SourceId::Resource(package.clone(), target.to_string()))
            }
        }
    }
}

/// Fatal errors that escape the public entry point (§7, unifying all three
/// include-graph/I/O failure kinds).
#[derive(Debug)]
pub enum Fatal {
    /// An include target could not be resolved to a [`SourceId`].
    Locate(LocateError),
    /// A resolved include key was already present in the project and
    /// `include_only_once` was in effect.
    DuplicateInclude(EntryKey),
    /// A source could not be read.
    Io(SourceError),
}

impl fmt::Display for Fatal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fatal::Locate(e) => write!(f, "{e}"),
            Fatal::DuplicateInclude(key) => write!(f, "{key} was already included"),
            Fatal::Io(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for Fatal {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Fatal::Locate(e) => Some(e),
            Fatal::Io(e) => Some(e),
            Fatal::DuplicateInclude(_) => None,
        }
    }
}

/// An ordered mapping from entry key to parsed-source record (§3
/// "Project"). Insertion order equals discovery order: depth-first by
/// include position within the including source.
pub struct Project<C> {
    entries: IndexMap<EntryKey, ParsedSource<C>>,
}

impl<C> Project<C> {
    /// The parsed-source record for `key`, if it was discovered.
    pub fn get(&self, key: &EntryKey) -> Option<&ParsedSource<C>> {
        self.entries.get(key)
    }

    /// Every discovered entry, in discovery (insertion) order.
    pub fn entries(&self) -> impl Iterator<Item = (&EntryKey, &ParsedSource<C>)> {
        self.entries.iter()
    }

    /// Whether any entry's tree carries an error node.
    pub fn has_errors(&self) -> bool {
        self.entries.values().any(|p| p.has_errors())
    }

    /// Every error in the project, augmented with its originating source.
    pub fn localized_errors(&self) -> impl Iterator<Item = (&SourceId, &dyn StatementNode)> {
        self.entries.values().flat_map(|p| p.localized_errors())
    }

    /// Flat, in-order stream of every non-include parsed value across the
    /// include graph, recursing into includes at the point of the include
    /// directive so the reader sees an inlined stream (§4.H, §6 "Output
    /// surface").
    pub fn iter_statements(
        &self,
        include_only_once: bool,
    ) -> Result<Vec<&dyn StatementNode>, Fatal> {
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        seen.insert(EntryKey::Root);
        self.walk(&EntryKey::Root, &mut out, &mut seen, include_only_once)?;
        Ok(out)
    }

    fn walk<'a>(
        &'a self,
        key: &EntryKey,
        out: &mut Vec<&'a dyn StatementNode>,
        seen: &mut HashSet<EntryKey>,
        include_only_once: bool,
    ) -> Result<(), Fatal> {
        let parsed = self
            .entries
            .get(key)
            .expect("walk is only called with keys discovered during parsing");
        for node in parsed.tree.flatten() {
            if let Some(inc) = node.as_include() {
                let child_key = EntryKey::Include(parsed.origin.clone(), inc.target().to_string());
                if include_only_once && seen.contains(&child_key) {
                    return Err(Fatal::DuplicateInclude(child_key));
                }
                seen.insert(child_key.clone());
                self.walk(&child_key, out, seen, include_only_once)?;
            } else {
                out.push(node);
            }
        }
        Ok(())
    }
}

/// Parses an entry source and every source it transitively includes
/// (§4.H steps 1-6): parse the entry point under `ROOT`, walk its tree for
/// include directives, resolve each via `locator`, parse transitively,
/// enforcing `include_only_once` as a fatal duplicate-include error when a
/// resolved key recurs.
///
/// Recursion (rather than a FIFO work queue) is what makes the project
/// mapping's insertion order match §3's invariant: "depth-first by include
/// position within the including source". A level-order queue would instead
/// finish every sibling of a source before descending into any of their
/// includes, which is breadth-first, not depth-first.
#[allow(clippy::too_many_arguments)]
pub fn parse_project<C: Clone>(
    entry: SourceId,
    root: &RootBlock<C>,
    config: C,
    splitter: &Splitter,
    strip_spaces: bool,
    loader: Option<&dyn ResourceLoader>,
    prefer_resource_as_file: bool,
    locator: &dyn Locator,
    include_only_once: bool,
) -> Result<Project<C>, Fatal> {
    let mut entries: IndexMap<EntryKey, ParsedSource<C>> = IndexMap::new();
    parse_into(
        EntryKey::Root,
        entry,
        root,
        &config,
        splitter,
        strip_spaces,
        loader,
        prefer_resource_as_file,
        locator,
        include_only_once,
        &mut entries,
    )?;
    Ok(Project { entries })
}

#[allow(clippy::too_many_arguments)]
fn parse_into<C: Clone>(
    key: EntryKey,
    source_id: SourceId,
    root: &RootBlock<C>,
    config: &C,
    splitter: &Splitter,
    strip_spaces: bool,
    loader: Option<&dyn ResourceLoader>,
    prefer_resource_as_file: bool,
    locator: &dyn Locator,
    include_only_once: bool,
    entries: &mut IndexMap<EntryKey, ParsedSource<C>>,
) -> Result<(), Fatal> {
    if entries.contains_key(&key) {
        if include_only_once {
            return Err(Fatal::DuplicateInclude(key));
        }
        return Ok(());
    }

    let parsed = parse_source(
        &source_id,
        root,
        config.clone(),
        splitter,
        strip_spaces,
        loader,
        prefer_resource_as_file,
    )
    .map_err(Fatal::Io)?;

    let targets: Vec<String> = parsed
        .tree
        .flatten()
        .into_iter()
        .filter_map(|n| n.as_include().map(|inc| inc.target().to_string()))
        .collect();
    let origin = parsed.origin.clone();
    entries.insert(key, parsed);

    for target in targets {
        let located = locator.locate(&origin, &target).map_err(Fatal::Locate)?;
        let child_key = EntryKey::Include(origin.clone(), target);
        parse_into(
            child_key,
            located,
            root,
            config,
            splitter,
            strip_spaces,
            loader,
            prefer_resource_as_file,
            locator,
            include_only_once,
            entries,
        )?;
    }

    Ok(())
}
