//! Structural path addressing
//!
//! A path names an element by walking from a stable root:
//!
//! ```text
//! id("intro")/P[2]/EM[1]
//! │           │    └── first EM among its parent's EM children
//! │           └─────── second P child
//! └─────────────────── element carrying id="intro"
//!
//! BODY/DIV[1]/P[3]     rooted at the body element
//! /HTML[1]/BODY[1]     rooted at the document itself
//! ```
//!
//! Grammar:
//! ```text
//! path  = root step*
//! root  = 'id(' quote text quote ')' | 'BODY' | ε
//! step  = '/' name ['[' number ']']
//! ```
//!
//! An empty root is only valid when at least one step follows.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::dom::{Document, NodeId, Transparent};

/// Path parsing errors
#[derive(Debug, Error)]
pub enum PathParseError {
    #[error("Empty path")]
    Empty,

    #[error("Unterminated id() at position {0}")]
    UnterminatedId(usize),

    #[error("Expected '/' at position {0}")]
    ExpectedStep(usize),

    #[error("Expected element name at position {0}")]
    ExpectedName(usize),

    #[error("Expected number at position {0}")]
    ExpectedNumber(usize),

    #[error("Unclosed bracket at position {0}")]
    UnclosedBracket(usize),

    #[error("Step index must be at least 1 (position {0})")]
    ZeroIndex(usize),
}

/// Where a path starts
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathRoot {
    /// Element with this `id` attribute
    Id(String),
    /// The body element
    Body,
    /// The document node
    Document,
}

/// One `TAG[n]` step, `n` counting same-tag element siblings from 1
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathStep {
    pub tag: String,
    pub index: usize,
}

/// A parsed path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathExpression {
    pub root: PathRoot,
    pub steps: Vec<PathStep>,
}

impl PathExpression {
    /// Find the element this path names; `None` when nothing matches
    pub fn resolve(&self, doc: &Document) -> Option<NodeId> {
        let mut current = match &self.root {
            PathRoot::Id(id) => doc.element_by_id(id)?,
            PathRoot::Body => doc.body()?,
            PathRoot::Document => {
                if self.steps.is_empty() {
                    return None;
                }
                doc.root()
            }
        };

        for step in &self.steps {
            current = doc
                .children(current)
                .iter()
                .copied()
                .filter(|&child| {
                    doc.tag_name(child)
                        .map(|tag| tag.eq_ignore_ascii_case(&step.tag))
                        .unwrap_or(false)
                })
                .nth(step.index.checked_sub(1)?)?;
        }

        Some(current)
    }
}

impl fmt::Display for PathExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.root {
            PathRoot::Id(id) => write!(f, "id(\"{}\")", id)?,
            PathRoot::Body => f.write_str("BODY")?,
            PathRoot::Document => {}
        }
        for step in &self.steps {
            write!(f, "/{}[{}]", step.tag, step.index)?;
        }
        Ok(())
    }
}

impl FromStr for PathExpression {
    type Err = PathParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse(s)
    }
}

/// Builder for constructing paths programmatically
#[derive(Debug, Clone)]
pub struct PathBuilder {
    path: PathExpression,
}

impl PathBuilder {
    pub fn from_id(id: impl Into<String>) -> Self {
        Self::with_root(PathRoot::Id(id.into()))
    }

    pub fn from_body() -> Self {
        Self::with_root(PathRoot::Body)
    }

    pub fn from_document() -> Self {
        Self::with_root(PathRoot::Document)
    }

    fn with_root(root: PathRoot) -> Self {
        Self {
            path: PathExpression {
                root,
                steps: Vec::new(),
            },
        }
    }

    /// Add a step; `index` is 1-based and tag names are upper-cased
    pub fn step(mut self, tag: &str, index: usize) -> Self {
        self.path.steps.push(PathStep {
            tag: tag.to_ascii_uppercase(),
            index,
        });
        self
    }

    pub fn build(self) -> PathExpression {
        self.path
    }
}

/// Compute the path of an element
///
/// Prefers the nearest ancestor-or-self carrying a non-empty `id`, then the
/// body element, then the document root. Returns `None` for non-elements and
/// detached nodes.
pub fn compute_path(doc: &Document, node: NodeId) -> Option<PathExpression> {
    compute_path_skipping(doc, node, &|_, _| false)
}

/// Compute the path an element will have once every element matching
/// `transparent` is replaced by its children
///
/// Returns `None` when `node` itself is transparent.
pub fn compute_path_skipping(
    doc: &Document,
    node: NodeId,
    transparent: Transparent<'_>,
) -> Option<PathExpression> {
    let body = doc.body();
    let mut steps = Vec::new();
    let mut current = node;

    if doc.is_element(node) && transparent(doc, node) {
        return None;
    }

    loop {
        if !doc.is_element(current) {
            return None;
        }

        let root = if let Some(id) = doc.element_id(current) {
            Some(PathRoot::Id(id.to_string()))
        } else if Some(current) == body {
            Some(PathRoot::Body)
        } else {
            None
        };
        if let Some(root) = root {
            steps.reverse();
            return Some(PathExpression { root, steps });
        }

        let mut parent = doc.parent(current)?;
        while parent != doc.root() && transparent(doc, parent) {
            parent = doc.parent(parent)?;
        }
        let tag = doc.tag_name(current)?;
        steps.push(PathStep {
            tag: tag.to_ascii_uppercase(),
            index: sibling_index(doc, parent, current, tag, transparent),
        });

        if parent == doc.root() {
            steps.reverse();
            return Some(PathExpression {
                root: PathRoot::Document,
                steps,
            });
        }
        current = parent;
    }
}

/// 1 + number of preceding element siblings with the same tag, looking
/// through transparent wrappers
fn sibling_index(
    doc: &Document,
    parent: NodeId,
    node: NodeId,
    tag: &str,
    transparent: Transparent<'_>,
) -> usize {
    1 + visible_children(doc, parent, transparent)
        .into_iter()
        .take_while(|&child| child != node)
        .filter(|&child| {
            doc.tag_name(child)
                .map(|other| other.eq_ignore_ascii_case(tag))
                .unwrap_or(false)
        })
        .count()
}

fn visible_children(doc: &Document, parent: NodeId, transparent: Transparent<'_>) -> Vec<NodeId> {
    let mut out = Vec::new();
    for &child in doc.children(parent) {
        if doc.is_element(child) && transparent(doc, child) {
            out.extend(visible_children(doc, child, transparent));
        } else {
            out.push(child);
        }
    }
    out
}

/// Resolve a path string; malformed paths resolve to nothing
pub fn resolve_path(doc: &Document, path: &str) -> Option<NodeId> {
    match parse(path) {
        Ok(expression) => expression.resolve(doc),
        Err(e) => {
            tracing::debug!(path = %path, error = %e, "Unparseable highlight path");
            None
        }
    }
}

/// Parser state
struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn skip_if(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn remaining(&self) -> &str {
        &self.input[self.pos..]
    }

    fn parse_root(&mut self) -> Result<PathRoot, PathParseError> {
        if self.remaining().starts_with("id(") {
            let start = self.pos;
            self.pos += 3;
            let quote = match self.advance() {
                Some(q @ ('"' | '\'')) => q,
                _ => return Err(PathParseError::UnterminatedId(start)),
            };
            let terminator = format!("{})", quote);
            let len = self
                .remaining()
                .find(&terminator)
                .ok_or(PathParseError::UnterminatedId(start))?;
            let id = self.remaining()[..len].to_string();
            self.pos += len + terminator.len();
            return Ok(PathRoot::Id(id));
        }

        let rest = self.remaining();
        if rest.get(..4).map_or(false, |head| head.eq_ignore_ascii_case("body")) {
            let next = rest[4..].chars().next();
            if matches!(next, None | Some('/')) {
                self.pos += 4;
                return Ok(PathRoot::Body);
            }
        }

        Ok(PathRoot::Document)
    }

    fn parse_number(&mut self) -> Result<usize, PathParseError> {
        let start = self.pos;
        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                self.advance();
            } else {
                break;
            }
        }

        if self.pos == start {
            return Err(PathParseError::ExpectedNumber(start));
        }

        self.input[start..self.pos]
            .parse()
            .map_err(|_| PathParseError::ExpectedNumber(start))
    }

    fn parse_step(&mut self) -> Result<PathStep, PathParseError> {
        if !self.skip_if('/') {
            return Err(PathParseError::ExpectedStep(self.pos));
        }

        let start = self.pos;
        while let Some(ch) = self.peek() {
            if ch.is_alphanumeric() || matches!(ch, '-' | '_' | ':' | '.') {
                self.advance();
            } else {
                break;
            }
        }
        if self.pos == start {
            return Err(PathParseError::ExpectedName(start));
        }
        let tag = self.input[start..self.pos].to_string();

        let index = if self.skip_if('[') {
            let bracket = self.pos - 1;
            let index = self.parse_number()?;
            if !self.skip_if(']') {
                return Err(PathParseError::UnclosedBracket(bracket));
            }
            if index == 0 {
                return Err(PathParseError::ZeroIndex(bracket));
            }
            index
        } else {
            1
        };

        Ok(PathStep { tag, index })
    }
}

/// Parse a path string
pub fn parse(input: &str) -> Result<PathExpression, PathParseError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(PathParseError::Empty);
    }

    let mut parser = Parser::new(input);
    let root = parser.parse_root()?;

    let mut steps = Vec::new();
    while !parser.at_end() {
        steps.push(parser.parse_step()?);
    }

    if root == PathRoot::Document && steps.is_empty() {
        return Err(PathParseError::ExpectedStep(0));
    }

    Ok(PathExpression { root, steps })
}
