//! # Pointer Module
//!
//! Addressing primitives over a configuration tree.
//!
//! A `Pointer` is a sequence of segments, serialized in the canonical
//! slash-delimited form with `~0`/`~1` escaping. Bare keys are rooted:
//! `"x"` parses to the same pointer as `"/x"`.
//!
//! Composition (`join`) of two valid pointers is itself a valid address into
//! the composed tree, and `parse(p.to_string()) == p` for every pointer.

use crate::KernqlError;
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// A path to a location inside a nested document.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Pointer {
    segments: Vec<String>,
}

impl Pointer {
    /// The pointer addressing the whole document.
    #[must_use]
    pub const fn root() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    /// Parse a pointer string. A missing leading slash is implied.
    pub fn parse(s: &str) -> Result<Self, KernqlError> {
        if s.is_empty() {
            return Ok(Self::root());
        }
        let body = s.strip_prefix('/').unwrap_or(s);
        let segments = body
            .split('/')
            .map(unescape)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { segments })
    }

    /// Build a pointer from raw (unescaped) segments.
    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// The last segment, if any.
    #[must_use]
    pub fn back(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// The pointer one level up. The root is its own parent.
    #[must_use]
    pub fn parent(&self) -> Self {
        let mut parent = self.clone();
        parent.segments.pop();
        parent
    }

    pub fn push(&mut self, segment: impl Into<String>) {
        self.segments.push(segment.into());
    }

    /// Remove and return the last segment.
    pub fn pop(&mut self) -> Result<String, KernqlError> {
        self.segments
            .pop()
            .ok_or_else(|| KernqlError::OutOfRange("cannot pop the root pointer".to_string()))
    }

    /// A new pointer with one more segment.
    #[must_use]
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut child = self.clone();
        child.push(segment);
        child
    }

    /// Compose `other` below `self`.
    #[must_use]
    pub fn join(&self, other: &Pointer) -> Self {
        let mut joined = self.clone();
        joined.segments.extend(other.segments.iter().cloned());
        joined
    }

    /// The first `len` segments, or `None` when the pointer is shorter.
    #[must_use]
    pub fn prefix(&self, len: usize) -> Option<Self> {
        self.segments.get(..len).map(|s| Self {
            segments: s.to_vec(),
        })
    }

    // =========================================================================
    // TREE ACCESS
    // =========================================================================

    pub fn get<'a>(&self, doc: &'a Value) -> Option<&'a Value> {
        self.segments.iter().try_fold(doc, |node, seg| match node {
            Value::Object(map) => map.get(seg.as_str()),
            Value::Array(items) => parse_index(seg).ok().and_then(|i| items.get(i)),
            _ => None,
        })
    }

    pub fn get_mut<'a>(&self, doc: &'a mut Value) -> Option<&'a mut Value> {
        self.segments.iter().try_fold(doc, |node, seg| match node {
            Value::Object(map) => map.get_mut(seg.as_str()),
            Value::Array(items) => parse_index(seg).ok().and_then(|i| items.get_mut(i)),
            _ => None,
        })
    }

    pub fn contains(&self, doc: &Value) -> bool {
        self.get(doc).is_some()
    }

    /// Write `value` at this location, creating missing objects on the way.
    pub fn set(&self, doc: &mut Value, value: Value) -> Result<(), KernqlError> {
        set_in(doc, &self.segments, value)
    }

    /// Remove the value at this location; returns how many values were removed.
    ///
    /// A missing parent is not an error, it just removes nothing.
    pub fn erase(&self, doc: &mut Value) -> usize {
        let Some(last) = self.segments.last() else {
            return 0;
        };
        match self.parent().get_mut(doc) {
            Some(Value::Object(map)) => usize::from(map.shift_remove(last.as_str()).is_some()),
            Some(Value::Array(items)) => match parse_index(last) {
                Ok(i) if i < items.len() => {
                    items.remove(i);
                    1
                }
                _ => 0,
            },
            _ => 0,
        }
    }

    /// Push `value` onto the sequence at this location.
    ///
    /// A missing or null location becomes a new sequence.
    pub fn append(&self, doc: &mut Value, value: Value) -> Result<(), KernqlError> {
        match self.get_mut(doc) {
            Some(Value::Array(items)) => {
                items.push(value);
                Ok(())
            }
            Some(Value::Null) | None => self.set(doc, Value::Array(vec![value])),
            Some(_) => Err(KernqlError::TypeMismatch(format!(
                "cannot append to non-array at {}",
                self
            ))),
        }
    }
}

impl fmt::Display for Pointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for seg in &self.segments {
            write!(f, "/{}", seg.replace('~', "~0").replace('/', "~1"))?;
        }
        Ok(())
    }
}

impl FromStr for Pointer {
    type Err = KernqlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn unescape(raw: &str) -> Result<String, KernqlError> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '~' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('0') => out.push('~'),
            Some('1') => out.push('/'),
            _ => {
                return Err(KernqlError::InvalidArgument(format!(
                    "invalid escape in pointer segment '{}'",
                    raw
                )));
            }
        }
    }
    Ok(out)
}

fn parse_index(seg: &str) -> Result<usize, KernqlError> {
    let well_formed = seg == "0"
        || (!seg.is_empty() && !seg.starts_with('0') && seg.bytes().all(|b| b.is_ascii_digit()));
    if !well_formed {
        return Err(KernqlError::InvalidArgument(format!(
            "'{}' is not an array index",
            seg
        )));
    }
    seg.parse()
        .map_err(|e| KernqlError::InvalidArgument(format!("array index '{}': {}", seg, e)))
}

fn set_in(node: &mut Value, segments: &[String], value: Value) -> Result<(), KernqlError> {
    let Some((head, rest)) = segments.split_first() else {
        *node = value;
        return Ok(());
    };
    if node.is_null() {
        *node = Value::Object(Map::new());
    }
    match node {
        Value::Object(map) => {
            let child = map.entry(head.clone()).or_insert(Value::Null);
            set_in(child, rest, value)
        }
        Value::Array(items) => {
            let index = if head == "-" {
                items.len()
            } else {
                parse_index(head)?
            };
            if index == items.len() {
                items.push(Value::Null);
            }
            let child = items.get_mut(index).ok_or_else(|| {
                KernqlError::OutOfRange(format!("array index {} past the end", index))
            })?;
            set_in(child, rest, value)
        }
        _ => Err(KernqlError::InvalidArgument(format!(
            "cannot descend into a scalar at '{}'",
            head
        ))),
    }
}

// =============================================================================
// KEY SEARCH
// =============================================================================

/// Every location whose final segment is `key`.
///
/// Pre-order, depth-first, in document order. When `recursive` is false only
/// the top level is searched.
pub fn find_pointers_by_key(doc: &Value, key: &str, recursive: bool) -> Vec<Pointer> {
    let mut found = Vec::new();
    collect_key(doc, &Pointer::root(), key, recursive, &mut found);
    found
}

fn collect_key(node: &Value, at: &Pointer, key: &str, recursive: bool, found: &mut Vec<Pointer>) {
    match node {
        Value::Object(map) => {
            for (k, v) in map {
                let here = at.child(k.as_str());
                if k == key {
                    found.push(here.clone());
                }
                if recursive {
                    collect_key(v, &here, key, recursive, found);
                }
            }
        }
        Value::Array(items) if recursive => {
            for (i, v) in items.iter().enumerate() {
                collect_key(v, &at.child(i.to_string()), key, recursive, found);
            }
        }
        _ => {}
    }
}

// =============================================================================
// TESTS
// =============================================================================
