//! Directed segments and canonical edge keys.
//!
//! A [`Segment`] is an ordered pair of point indices; direction matters while
//! walking boundaries. An [`EdgeKey`] is the canonical, sorted form of the same
//! pair and is what deduplication and set membership operate on, so `(a, b)`
//! and `(b, a)` collapse to one key.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Directed pair of point indices.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Segment {
    pub start: usize,
    pub end: usize,
}

impl Segment {
    #[inline]
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// The same segment walked the other way.
    #[inline]
    pub const fn reversed(self) -> Self {
        Self {
            start: self.end,
            end: self.start,
        }
    }

    #[inline]
    pub fn key(self) -> EdgeKey {
        EdgeKey::new(self.start, self.end)
    }

    #[inline]
    pub fn contains(self, node: usize) -> bool {
        self.start == node || self.end == node
    }

    /// Applies an index map to both endpoints.
    #[inline]
    pub fn map<F: Fn(usize) -> usize>(self, f: F) -> Self {
        Self {
            start: f(self.start),
            end: f(self.end),
        }
    }
}

impl From<(usize, usize)> for Segment {
    fn from((start, end): (usize, usize)) -> Self {
        Self { start, end }
    }
}

impl From<[usize; 2]> for Segment {
    fn from([start, end]: [usize; 2]) -> Self {
        Self { start, end }
    }
}

impl fmt::Debug for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}->{})", self.start, self.end)
    }
}

/// Canonical undirected edge, `lo <= hi`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EdgeKey {
    lo: usize,
    hi: usize,
}

impl EdgeKey {
    #[inline]
    pub fn new(a: usize, b: usize) -> Self {
        if a <= b {
            Self { lo: a, hi: b }
        } else {
            Self { lo: b, hi: a }
        }
    }

    #[inline]
    pub const fn lo(self) -> usize {
        self.lo
    }

    #[inline]
    pub const fn hi(self) -> usize {
        self.hi
    }

    #[inline]
    pub const fn as_tuple(self) -> (usize, usize) {
        (self.lo, self.hi)
    }

    /// The key as a segment running from `lo` to `hi`.
    #[inline]
    pub const fn as_segment(self) -> Segment {
        Segment::new(self.lo, self.hi)
    }
}

impl From<Segment> for EdgeKey {
    fn from(s: Segment) -> Self {
        s.key()
    }
}

/// Builds directed segments from index pairs.
pub fn segments_from_pairs<I, P>(pairs: I) -> Vec<Segment>
where
    I: IntoIterator<Item = P>,
    P: Into<Segment>,
{
    pairs.into_iter().map(Into::into).collect()
}

/// Reverses the walking direction of a polyline: order and each segment.
pub fn reverse_path(segments: &[Segment]) -> Vec<Segment> {
    segments.iter().rev().map(|s| s.reversed()).collect()
}
