//! Route pattern compiler.
//!
//! A pattern is a `/`-separated template:
//!
//! | Token | Segment | Matches |
//! |---|---|---|
//! | `users` | [`Segment::Literal`] | exactly `users` |
//! | `:id` | [`Segment::Variable`] | any single path segment, captured as `id` |
//! | `*rest` | [`Segment::Wildcard`] | every remaining segment, captured as `rest` |
//!
//! Whitespace around the pattern and a leading `/` are ignored, as are empty
//! segments, so `"/a//b/"` compiles to the same segments as `"a/b"`. The
//! pattern `"/"` compiles to no segments at all and maps to the tree root.

use std::fmt;
use std::str::FromStr;

use crate::error::RouteError;

/// One compiled pattern segment.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum Segment {
    Literal(String),
    Variable(String),
    Wildcard(String),
}

impl Segment {
    /// The capture name, if this segment captures anything.
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Literal(_) => None,
            Self::Variable(name) | Self::Wildcard(name) => Some(name),
        }
    }
}

/// A parsed route pattern.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Pattern {
    source: String,
    segments: Vec<Segment>,
}

impl Pattern {
    /// Compiles a registration pattern.
    ///
    /// Wildcard placement is checked against the position in the original
    /// token sequence: `*name` anywhere but last is rejected.
    pub fn parse(raw: &str) -> Result<Self, RouteError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(RouteError::EmptyPattern);
        }

        let body = trimmed.strip_prefix('/').unwrap_or(trimmed);
        let tokens: Vec<&str> = body.split('/').filter(|t| !t.is_empty()).collect();
        let source = tokens.join("/");
        let last = tokens.len().saturating_sub(1);

        let mut segments = Vec::with_capacity(tokens.len());
        for (i, token) in tokens.iter().enumerate() {
            let segment = if let Some(name) = token.strip_prefix(':') {
                if name.is_empty() {
                    return Err(RouteError::UnnamedVariable { pattern: source });
                }
                Segment::Variable(name.to_owned())
            } else if let Some(name) = token.strip_prefix('*') {
                if name.is_empty() {
                    return Err(RouteError::UnnamedVariable { pattern: source });
                }
                if i != last {
                    return Err(RouteError::MisplacedWildcard { pattern: source });
                }
                Segment::Wildcard(name.to_owned())
            } else {
                Segment::Literal((*token).to_owned())
            };
            segments.push(segment);
        }

        Ok(Self { source, segments })
    }

    /// The normalized pattern text, without the leading `/`.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// `true` for `"/"`, which maps to the tree root.
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }
}

impl FromStr for Pattern {
    type Err = RouteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.source)
    }
}
