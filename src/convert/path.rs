//! Materialized tag paths.
//!
//! A tag's `path` column holds its ancestor ids root first, then its own id,
//! joined by `;` with no trailing separator: a root tag 4 is `"4"`, its child
//! 9 is `"4;9"`. Descendants of a tag are exactly the rows whose path starts
//! with the tag's path followed by `;`.

use std::fmt;
use std::str::FromStr;

use crate::error::AppError;

pub const SEPARATOR: char = ';';

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TagPath {
    ancestors: Vec<i64>,
    id: i64,
}

impl TagPath {
    pub fn root(id: i64) -> Self {
        Self {
            ancestors: Vec::new(),
            id,
        }
    }

    pub fn new(ancestors: Vec<i64>, id: i64) -> Self {
        Self { ancestors, id }
    }

    pub fn parse(text: &str) -> Result<Self, AppError> {
        let mut ids = text
            .split(SEPARATOR)
            .map(|part| {
                part.parse::<i64>().map_err(|_| {
                    AppError::Conversion(format!("Malformed tag path '{}'", text))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        // split always yields at least one part
        let id = ids
            .pop()
            .ok_or_else(|| AppError::Conversion(format!("Malformed tag path '{}'", text)))?;
        Ok(Self { ancestors: ids, id })
    }

    /// The tag this path belongs to.
    pub fn own_id(&self) -> i64 {
        self.id
    }

    /// Ancestor ids, root first.
    pub fn ancestors(&self) -> &[i64] {
        &self.ancestors
    }

    pub fn parent(&self) -> Option<i64> {
        self.ancestors.last().copied()
    }

    /// Same ancestry, different own id.
    pub fn with_id(&self, id: i64) -> Self {
        Self {
            ancestors: self.ancestors.clone(),
            id,
        }
    }

    /// Path of a direct child `id` of this tag.
    pub fn child(&self, id: i64) -> Self {
        let mut ancestors = self.ancestors.clone();
        ancestors.push(self.id);
        Self { ancestors, id }
    }

    /// True when `id` is this tag or one of its ancestors.
    pub fn contains(&self, id: i64) -> bool {
        self.id == id || self.ancestors.contains(&id)
    }

    pub fn is_ancestor_of(&self, other: &TagPath) -> bool {
        other.ancestors.len() > self.ancestors.len()
            && other.ancestors.starts_with(&self.ancestors)
            && other.ancestors[self.ancestors.len()] == self.id
    }

    pub fn is_parent_of(&self, other: &TagPath) -> bool {
        other.ancestors.len() == self.ancestors.len() + 1 && self.is_ancestor_of(other)
    }

    /// Moves a descendant of `from` under `to`, keeping the ids between.
    ///
    /// Returns `None` when `self` does not lie below `from`.
    pub fn rebase(&self, from: &TagPath, to: &TagPath) -> Option<TagPath> {
        if !from.is_ancestor_of(self) {
            return None;
        }
        let below = &self.ancestors[from.ancestors.len() + 1..];
        let mut ancestors = to.ancestors.clone();
        ancestors.push(to.id);
        ancestors.extend_from_slice(below);
        Some(Self {
            ancestors,
            id: self.id,
        })
    }

    /// Number of ancestors; 0 for a root.
    pub fn depth(&self) -> usize {
        self.ancestors.len()
    }

    /// `LIKE` pattern matching the paths of every descendant.
    pub fn descendant_pattern(&self) -> String {
        format!("{}{}%", self, SEPARATOR)
    }
}

impl fmt::Display for TagPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for ancestor in &self.ancestors {
            write!(f, "{}{}", ancestor, SEPARATOR)?;
        }
        write!(f, "{}", self.id)
    }
}

impl FromStr for TagPath {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
