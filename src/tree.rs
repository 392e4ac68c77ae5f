//! Per-method prefix tree.
//!
//! Each node stands for one path segment. Literal children are keyed by
//! their exact text; a node has at most one *variable* child, which is either
//! a single-segment capture (`:name`) or a trailing wildcard (`*name`).
//!
//! Lookup walks one segment at a time and never backtracks:
//!
//! 1. an exact literal child wins,
//! 2. otherwise the variable child is taken,
//! 3. a wildcard child swallows every remaining segment and ends the walk.
//!
//! Only nodes that had a value registered on them match. Intermediate nodes
//! created while inserting a longer pattern are structural and fail closed.

use std::collections::HashMap;

use http::Method;
use percent_encoding::percent_decode_str;

use crate::error::RouteError;
use crate::metadata::Metadata;
use crate::pattern::{Pattern, Segment};

/// Captured path variables, keyed by name.
pub type Params = HashMap<String, String>;

#[derive(Debug)]
enum NodeKind {
    Root,
    Literal,
    Variable(String),
    Wildcard(String),
}

/// One segment of the tree.
#[derive(Debug)]
pub struct RouteNode<T> {
    kind: NodeKind,
    value: Option<T>,
    metadata: Metadata,
    children: HashMap<String, RouteNode<T>>,
    variable: Option<Box<RouteNode<T>>>,
}

impl<T> RouteNode<T> {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            value: None,
            metadata: Metadata::new(),
            children: HashMap::new(),
            variable: None,
        }
    }

    fn for_capture(segment: &Segment) -> Self {
        match segment {
            Segment::Wildcard(name) => Self::new(NodeKind::Wildcard(name.clone())),
            Segment::Variable(name) => Self::new(NodeKind::Variable(name.clone())),
            Segment::Literal(_) => Self::new(NodeKind::Literal),
        }
    }

    /// Whether a value was registered on exactly this node.
    pub fn is_mapped(&self) -> bool {
        self.value.is_some()
    }

    pub fn is_wildcard(&self) -> bool {
        matches!(self.kind, NodeKind::Wildcard(_))
    }

    fn capture_name(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Variable(name) | NodeKind::Wildcard(name) => Some(name),
            NodeKind::Root | NodeKind::Literal => None,
        }
    }
}

/// A successful lookup.
#[derive(Debug)]
pub struct Match<'t, T> {
    pub value: &'t T,
    pub metadata: &'t Metadata,
    pub params: Params,
}

/// The prefix tree for a single HTTP method.
#[derive(Debug)]
pub struct RouteTree<T> {
    method: Method,
    root: RouteNode<T>,
}

impl<T> RouteTree<T> {
    pub fn new(method: Method) -> Self {
        Self { method, root: RouteNode::new(NodeKind::Root) }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Registers `value` at `pattern`.
    ///
    /// The whole pattern is validated against the existing tree before any
    /// node is created, so a rejected insert leaves the tree untouched.
    pub fn insert(
        &mut self,
        pattern: &Pattern,
        value: T,
        metadata: Metadata,
    ) -> Result<(), RouteError> {
        self.check(pattern)?;

        let mut node = &mut self.root;
        for segment in pattern.segments() {
            node = match segment {
                Segment::Literal(text) => node
                    .children
                    .entry(text.clone())
                    .or_insert_with(|| RouteNode::new(NodeKind::Literal)),
                Segment::Variable(_) | Segment::Wildcard(_) => node
                    .variable
                    .get_or_insert_with(|| Box::new(RouteNode::for_capture(segment)))
                    .as_mut(),
            };
        }

        node.value = Some(value);
        node.metadata = metadata;
        Ok(())
    }

    fn check(&self, pattern: &Pattern) -> Result<(), RouteError> {
        let ambiguous = || RouteError::Ambiguous {
            method: self.method.clone(),
            pattern: pattern.as_str().to_owned(),
        };

        let mut node = &self.root;
        for segment in pattern.segments() {
            if node.is_wildcard() {
                return Err(ambiguous());
            }
            // a wildcard would shadow the handler already mapped on its parent
            if matches!(segment, Segment::Wildcard(_)) && node.is_mapped() {
                return Err(ambiguous());
            }

            let next = match segment {
                Segment::Literal(text) => node.children.get(text),
                Segment::Variable(name) | Segment::Wildcard(name) => {
                    match node.variable.as_deref() {
                        None => None,
                        Some(existing) => {
                            let wants_wildcard = matches!(segment, Segment::Wildcard(_));
                            if existing.is_wildcard() != wants_wildcard {
                                return Err(ambiguous());
                            }
                            let existing_name = existing.capture_name().unwrap_or_default();
                            if existing_name != name.as_str() {
                                return Err(RouteError::VariableConflict {
                                    pattern: pattern.as_str().to_owned(),
                                    existing: existing_name.to_owned(),
                                    requested: name.clone(),
                                });
                            }
                            Some(existing)
                        }
                    }
                }
            };

            match next {
                Some(child) => node = child,
                // everything below this point is new
                None => return Ok(()),
            }
        }

        if node.is_mapped() || node.variable.as_deref().is_some_and(RouteNode::is_wildcard) {
            return Err(ambiguous());
        }
        Ok(())
    }

    /// Resolves a raw request path.
    pub fn at(&self, path: &str) -> Option<Match<'_, T>> {
        let segments = path_segments(path);
        let mut params = Params::new();
        let mut node = &self.root;

        for (i, segment) in segments.iter().enumerate() {
            if let Some(child) = node.children.get(segment) {
                node = child;
                continue;
            }

            let child = node.variable.as_deref()?;
            match &child.kind {
                NodeKind::Wildcard(name) => {
                    params.insert(name.clone(), segments[i..].join("/"));
                    node = child;
                    break;
                }
                NodeKind::Variable(name) => {
                    params.insert(name.clone(), segment.clone());
                }
                NodeKind::Root | NodeKind::Literal => return None,
            }
            node = child;
        }

        let value = node.value.as_ref()?;
        Some(Match { value, metadata: &node.metadata, params })
    }
}

/// Splits a request path into segments after decoding and cleaning it.
///
/// The path is percent-decoded first (invalid UTF-8 is replaced), so an
/// encoded `%2F` separates segments and `%2E%2E` is a traversal segment.
/// Empty segments (repeated separators) and segments made only of dots
/// (`.`, `..`) are dropped, so `//a///b`, `/a/./b` and `/a/../b` all resolve
/// like `/a/b`.
pub fn path_segments(path: &str) -> Vec<String> {
    percent_decode_str(path)
        .decode_utf8_lossy()
        .split('/')
        .filter(|s| !s.is_empty() && !s.bytes().all(|b| b == b'.'))
        .map(str::to_owned)
        .collect()
}

/// The cleaned form of `path`, always starting with `/`.
pub fn normalize_path(path: &str) -> String {
    format!("/{}", path_segments(path).join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree(patterns: &[&'static str]) -> RouteTree<&'static str> {
        let mut tree = RouteTree::new(Method::GET);
        for p in patterns {
            tree.insert(&Pattern::parse(p).unwrap(), *p, Metadata::new()).unwrap();
        }
        tree
    }

    #[test]
    fn normalization() {
        assert_eq!(normalize_path("//a///b"), "/a/b");
        assert_eq!(normalize_path("/a/./b"), "/a/b");
        assert_eq!(normalize_path("/a/../b/"), "/a/b");
        assert_eq!(normalize_path(""), "/");
        assert_eq!(normalize_path("/a/%2E%2E/b"), "/a/b");
        assert_eq!(normalize_path("/a%2Fb/%20c"), "/a/b/ c");
    }

    #[test]
    fn captures_are_percent_decoded() {
        let t = tree(&["/u/:name", "/caf\u{e9}", "/files/*rest"]);
        assert_eq!(t.at("/u/hello%20world").unwrap().params["name"], "hello world");
        assert_eq!(*t.at("/caf%C3%A9").unwrap().value, "/caf\u{e9}");
        assert_eq!(t.at("/files/a%20b/c").unwrap().params["rest"], "a b/c");
    }

    #[test]
    fn literal_match_has_no_captures() {
        let t = tree(&["/", "/a", "/a/b", "/c/d/e"]);
        for (path, want) in [("/", "/"), ("/a", "/a"), ("/a/b", "/a/b"), ("/c/d/e", "/c/d/e")] {
            let m = t.at(path).unwrap();
            assert_eq!(*m.value, want);
            assert!(m.params.is_empty());
        }
    }

    #[test]
    fn structural_nodes_fail_closed() {
        let t = tree(&["/c/d/e"]);
        assert!(t.at("/c").is_none());
        assert!(t.at("/c/d").is_none());
    }

    #[test]
    fn variable_captures_one_segment() {
        let t = tree(&["/a/:id"]);
        let m = t.at("/a/42").unwrap();
        assert_eq!(m.params["id"], "42");
        assert!(t.at("/a").is_none());
        assert!(t.at("/a/42/x").is_none());
    }

    #[test]
    fn wildcard_captures_the_rest() {
        let t = tree(&["/files/*rest"]);
        let m = t.at("/files/x/y/z").unwrap();
        assert_eq!(m.params["rest"], "x/y/z");
        let m = t.at("/files//x//y").unwrap();
        assert_eq!(m.params["rest"], "x/y");
        assert!(t.at("/files").is_none());
    }

    #[test]
    fn literal_beats_variable() {
        let t = tree(&["/users/:id", "/users/me", "/users/:id/posts"]);
        assert_eq!(*t.at("/users/me").unwrap().value, "/users/me");
        assert_eq!(*t.at("/users/7").unwrap().value, "/users/:id");
        let m = t.at("/users/7/posts").unwrap();
        assert_eq!(*m.value, "/users/:id/posts");
        assert_eq!(m.params["id"], "7");
    }

    #[test]
    fn no_backtracking_out_of_a_literal_branch() {
        let t = tree(&["/a/b/c", "/a/:x/d"]);
        assert!(t.at("/a/b/d").is_none());
        assert_eq!(*t.at("/a/q/d").unwrap().value, "/a/:x/d");
    }

    #[test]
    fn duplicate_registration_is_ambiguous() {
        let mut t = tree(&["/a/:id"]);
        let err = t.insert(&Pattern::parse("/a/:id").unwrap(), "again", Metadata::new());
        assert!(matches!(err, Err(RouteError::Ambiguous { .. })));
        assert_eq!(*t.at("/a/1").unwrap().value, "/a/:id");
    }

    #[test]
    fn wildcard_collisions_are_ambiguous() {
        let mut t = tree(&["/files/*rest"]);
        for p in ["/files/*other", "/files/:id"] {
            let err = t.insert(&Pattern::parse(p).unwrap(), p, Metadata::new());
            assert!(matches!(err, Err(RouteError::Ambiguous { .. })), "{p}");
        }
        // the parent of a wildcard cannot carry its own handler
        let err = t.insert(&Pattern::parse("/files").unwrap(), "list", Metadata::new());
        assert!(matches!(err, Err(RouteError::Ambiguous { .. })));
        assert!(t.at("/files").is_none());

        // a literal sibling is fine
        t.insert(&Pattern::parse("/files/index").unwrap(), "idx", Metadata::new()).unwrap();
        assert_eq!(*t.at("/files/index").unwrap().value, "idx");
        assert_eq!(*t.at("/files/other").unwrap().value, "/files/*rest");
    }

    #[test]
    fn wildcard_under_a_mapped_parent_is_ambiguous() {
        let mut t = tree(&["/", "/docs"]);
        for p in ["/docs/*page", "/*all"] {
            let err = t.insert(&Pattern::parse(p).unwrap(), p, Metadata::new());
            assert!(matches!(err, Err(RouteError::Ambiguous { .. })), "{p}");
        }
        // a single-segment variable below a mapped node is still allowed
        t.insert(&Pattern::parse("/docs/:page").unwrap(), "page", Metadata::new()).unwrap();
        assert_eq!(*t.at("/docs/intro").unwrap().value, "page");
    }

    #[test]
    fn differently_named_variables_conflict() {
        let mut t = tree(&["/a/:id"]);
        let err = t.insert(&Pattern::parse("/a/:name/x").unwrap(), "x", Metadata::new());
        assert!(matches!(err, Err(RouteError::VariableConflict { .. })));
        // rejected inserts leave no structural residue behind
        assert!(t.root.children["a"].variable.as_ref().unwrap().children.is_empty());
    }

    #[test]
    fn metadata_is_returned_with_the_match() {
        let mut t = RouteTree::new(Method::POST);
        let meta = Metadata::new().with("auth", true);
        t.insert(&Pattern::parse("/admin").unwrap(), 1, meta).unwrap();
        assert_eq!(t.at("/admin").unwrap().metadata.get_bool("auth"), Some(true));
    }
}
