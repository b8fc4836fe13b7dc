//! Source parser: drives the splitter/iterator/block algorithm over one
//! file or packaged resource and assembles a parsed-source record (§4.G).

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::iter::{split_into_lines, HashingTriples, PeekableTriples};
use crate::shape::{BlockNode, RootBlock};
use crate::splitter::Splitter;

/// Identifies a source: an absolute filesystem path, or a packaged
/// resource addressed by `(package, resource_name)` (§3 "Source
/// identifier").
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SourceId {
    /// An absolute (or otherwise directly openable) filesystem path.
    Path(PathBuf),
    /// A packaged resource addressed by `(package, resource_name)`.
    Resource(String, String),
}

impl SourceId {
    /// Builds a path-backed source id.
    pub fn path(p: impl Into<PathBuf>) -> Self {
        SourceId::Path(p.into())
    }

    /// Builds a packaged-resource source id.
    pub fn resource(package: impl Into<String>, name: impl Into<String>) -> Self {
        SourceId::Resource(package.into(), name.into())
    }

    /// The filesystem path, if this is a path-backed source id.
    pub fn as_path(&self) -> Option<&Path> {
        match self {
            SourceId::Path(p) => Some(p),
            SourceId::Resource(..) => None,
        }
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceId::Path(p) => write!(f, "{}", p.display()),
            SourceId::Resource(pkg, name) => write!(f, "resource (package: {pkg}, name: {name})"),
        }
    }
}

/// Injected access to packaged resources (§4.G supplement): a host
/// application supplies an impl backed by whatever asset mechanism it
/// uses, rather than the crate hardcoding one.
pub trait ResourceLoader {
    /// If the resource can be materialized as a filesystem path, return it.
    fn resolve_path(&self, package: &str, name: &str) -> Option<PathBuf>;

    /// Reads the resource's full text, for when it cannot (or should not)
    /// be opened as a file.
    fn read_to_string(&self, package: &str, name: &str) -> std::io::Result<String>;
}

/// Fatal I/O-taxonomy errors (§7 "I/O errors").
#[derive(Debug)]
pub enum SourceError {
    /// Reading the source (or its metadata) from disk failed.
    Io(std::io::Error),
    /// A resource loader was configured but could not resolve or read the
    /// named resource.
    ResourceNotResolvable { package: String, name: String },
    /// The source is a packaged resource but no loader was configured.
    NoResourceLoader { package: String, name: String },
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceError::Io(e) => write!(f, "I/O error: {e}"),
            SourceError::ResourceNotResolvable { package, name } => write!(
                f,
                "resource (package: {package}, name: {name}) could not be located as a file or read as text"
            ),
            SourceError::NoResourceLoader { package, name } => write!(
                f,
                "no resource loader configured to resolve (package: {package}, name: {name})"
            ),
        }
    }
}

impl std::error::Error for SourceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SourceError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for SourceError {
    fn from(e: std::io::Error) -> Self {
        SourceError::Io(e)
    }
}

/// The immutable result of parsing one source (§3 "Parsed source record").
pub struct ParsedSource<C> {
    /// The parsed root block.
    pub tree: BlockNode,
    /// The SHA-1 hex digest of every triple the iterator consumed.
    pub content_hash: String,
    /// The configuration value this source was parsed with.
    pub config: C,
    /// The source's own identifier.
    pub origin: SourceId,
    /// The source's last-modified time, if it could be determined (always
    /// `None` for a resource read via [`ResourceLoader::read_to_string`]).
    pub mtime: Option<SystemTime>,
}

impl<C> ParsedSource<C> {
    /// Whether this source's tree carries an error node.
    pub fn has_errors(&self) -> bool {
        self.tree.has_errors()
    }

    /// Every error node in this source's tree, paired with its origin.
    pub fn localized_errors(&self) -> impl Iterator<Item = (&SourceId, &dyn crate::node::StatementNode)> {
        self.tree
            .errors()
            .into_iter()
            .map(move |node| (&self.origin, node))
    }
}

/// Splits raw text into the line sequence the splitter expects, recognizing
/// `\n`, `\r\n`, and `\r` as line terminators (§4.G "Encoding is UTF-8").
/// An empty input yields zero lines; a single trailing terminator does not
/// produce a spurious final empty line, matching how a line-at-a-time file
/// reader behaves.
pub(crate) fn split_universal_newlines(text: &str) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    let re = regex::Regex::new(r"\r\n|\r|\n").expect("fixed newline pattern is well-formed");
    let mut lines: Vec<String> = re.split(text).map(|s| s.to_string()).collect();
    if lines.last().map(|s| s.is_empty()).unwrap_or(false) {
        lines.pop();
    }
    lines
}

fn read_lines_from_path(path: &Path) -> Result<(Vec<String>, Option<SystemTime>), SourceError> {
    let content = fs::read_to_string(path)?;
    let mtime = fs::metadata(path)?.modified().ok();
    Ok((split_universal_newlines(&content), mtime))
}

fn read_lines(
    origin: &SourceId,
    loader: Option<&dyn ResourceLoader>,
    prefer_resource_as_file: bool,
) -> Result<(Vec<String>, Option<SystemTime>), SourceError> {
    match origin {
        SourceId::Path(path) => read_lines_from_path(path),
        SourceId::Resource(package, name) => {
            let Some(loader) = loader else {
                return Err(SourceError::NoResourceLoader {
                    package: package.clone(),
                    name: name.clone(),
                });
            };
            if prefer_resource_as_file {
                if let Some(path) = loader.resolve_path(package, name) {
                    if path.exists() {
                        return read_lines_from_path(&path);
                    }
                }
            }
            match loader.read_to_string(package, name) {
                Ok(text) => Ok((split_universal_newlines(&text), None)),
                Err(_) => Err(SourceError::ResourceNotResolvable {
                    package: package.clone(),
                    name: name.clone(),
                }),
            }
        }
    }
}

/// Drives splitter → peekable iterator → hashing iterator → root-block
/// consume over one source, and assembles the parsed-source record.
pub fn parse_source<C>(
    origin: &SourceId,
    root: &RootBlock<C>,
    config: C,
    splitter: &Splitter,
    strip_spaces: bool,
    loader: Option<&dyn ResourceLoader>,
    prefer_resource_as_file: bool,
) -> Result<ParsedSource<C>, SourceError> {
    let (lines, mtime) = read_lines(origin, loader, prefer_resource_as_file)?;
    let triples = split_into_lines(lines, splitter, strip_spaces);
    let peekable = PeekableTriples::new(triples);
    let mut hashing = HashingTriples::new(peekable);
    let tree = root.consume(&mut hashing, &config);
    Ok(ParsedSource {
        tree,
        content_hash: hashing.hexdigest(),
        config,
        origin: origin.clone(),
        mtime,
    })
}
