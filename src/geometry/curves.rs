//! Planar polylines for mesher input.
//!
//! A [`Curve`] is a 2D point list plus the segments chaining it. The
//! primitives below build lines, arcs, rectangles and resampled point lists;
//! [`Curve::add_segments`] and [`Curve::add_curves`] combine them.
//!
//! Coincidence while chaining is tolerance based. The tolerance is one tenth
//! of the smallest point spacing found in either curve, so two endpoints merge
//! only when they are much closer than any intended vertex pair. A curve whose
//! free ends coincide is closed automatically.

use std::f64::consts::PI;

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::algs::closest::ClosestNodeIndex;
use crate::mesh_error::MeshSeamError;
use crate::topology::point::PointSet;
use crate::topology::segment::{Segment, reverse_path};
use crate::topology::validation::validate_segments;

/// Point density of a generated polyline.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Resolution {
    /// Fixed number of points.
    Points(usize),
    /// Target edge length; the point count follows from the curve length.
    EdgeLength(f64),
}

impl Default for Resolution {
    fn default() -> Self {
        Resolution::Points(10)
    }
}

/// Points of one curve that should be merged into another by
/// [`Curve::add_curves`].
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Connect {
    #[default]
    None,
    /// Try every point of the appended curve.
    All,
    /// Only the appended-curve points nearest these coordinates.
    Points(Vec<[f64; 2]>),
}

/// Planar polyline: points plus the segments joining them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCurve")]
pub struct Curve {
    pub points: PointSet,
    pub segments: Vec<Segment>,
}

#[derive(Deserialize)]
struct RawCurve {
    points: PointSet,
    segments: Vec<Segment>,
}

impl TryFrom<RawCurve> for Curve {
    type Error = MeshSeamError;

    fn try_from(raw: RawCurve) -> Result<Self, Self::Error> {
        if raw.points.dimension() != 2 {
            return Err(MeshSeamError::InvalidGeometry(format!(
                "curve points must be planar, got dimension {}",
                raw.points.dimension()
            )));
        }
        validate_segments(&raw.segments, raw.points.len(), "curve segments")?;
        Ok(Self {
            points: raw.points,
            segments: raw.segments,
        })
    }
}

impl Default for Curve {
    fn default() -> Self {
        Self {
            points: PointSet::from_2d(std::iter::empty()),
            segments: Vec::new(),
        }
    }
}

fn same_point(a: [f64; 2], b: [f64; 2], delta: f64) -> bool {
    distance(a, b) < delta
}

fn distance(a: [f64; 2], b: [f64; 2]) -> f64 {
    ((a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2)).sqrt()
}

fn linspace(a: f64, b: f64, n: usize, endpoint: bool) -> impl Iterator<Item = f64> {
    let div = if endpoint { n.saturating_sub(1) } else { n }.max(1) as f64;
    let step = (b - a) / div;
    (0..n).map(move |i| a + step * i as f64)
}

impl Curve {
    /// Chains `points` in order, adding a closing segment when `closed`.
    pub fn polyline<I>(points: I, closed: bool) -> Self
    where
        I: IntoIterator<Item = [f64; 2]>,
    {
        let points = PointSet::from_2d(points);
        let n = points.len();
        let mut segments: Vec<Segment> = (1..n).map(|j| Segment::new(j - 1, j)).collect();
        if closed && n > 1 {
            segments.push(Segment::new(n - 1, 0));
        }
        Self { points, segments }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn point(&self, i: usize) -> [f64; 2] {
        self.points.xy(i)
    }

    fn xy(&self) -> Vec<[f64; 2]> {
        (0..self.points.len()).map(|i| self.points.xy(i)).collect()
    }

    /// Whether the last segment returns to the first point.
    pub fn is_closed(&self) -> bool {
        match (self.segments.first(), self.segments.last()) {
            (Some(first), Some(last)) => first.start == last.end,
            _ => false,
        }
    }

    /// Smallest distance between consecutive points, `None` below two points.
    pub fn min_spacing(&self) -> Option<f64> {
        let pts = self.xy();
        pts.windows(2)
            .map(|w| distance(w[0], w[1]))
            .min_by(f64::total_cmp)
    }

    /// Appends `other` to this curve's point chain.
    ///
    /// `other`'s first point is dropped when it coincides with this curve's
    /// last point. If the result then ends where it starts, the duplicate end
    /// point is dropped and the chain closed; `closed` forces the closing
    /// segment. Segments are rebuilt as a simple chain and interior points are
    /// never reordered.
    pub fn add_segments(&self, other: &Curve, closed: bool) -> Curve {
        let p1 = self.xy();
        let p2 = other.xy();
        let delta = match (self.min_spacing(), other.min_spacing()) {
            (Some(a), Some(b)) => a.min(b) / 10.0,
            (Some(a), None) | (None, Some(a)) => a / 10.0,
            (None, None) => 0.0,
        };

        let mut all = p1.clone();
        match (p1.last(), p2.first()) {
            (Some(&end), Some(&start)) if same_point(end, start, delta) => {
                all.extend_from_slice(&p2[1..]);
            }
            (Some(&end), Some(&start)) => {
                let gap = distance(end, start);
                if gap < 10.0 * delta {
                    log::warn!("curve ends {gap:e} apart were not merged (tolerance {delta:e})");
                }
                all.extend_from_slice(&p2);
            }
            _ => all.extend_from_slice(&p2),
        }

        let mut close = closed;
        if let (Some(&first), Some(&last)) = (p1.first(), all.last()) {
            if all.len() > 1 && same_point(last, first, delta) {
                all.pop();
                close = true;
            }
        }
        Curve::polyline(all, close)
    }

    /// Concatenates `other` after this curve, offsetting its segment indices.
    ///
    /// With [`Connect::All`] or [`Connect::Points`], every selected point of
    /// `other` whose nearest point in `self` lies closer than `eps` is removed
    /// and its segments are rewired to that point.
    pub fn add_curves(
        &self,
        other: &Curve,
        connect: &Connect,
        eps: f64,
    ) -> Result<Curve, MeshSeamError> {
        let n1 = self.points.len();
        let mut points = self.points.clone();

        let selected: Vec<(usize, [f64; 2])> = match connect {
            Connect::None => Vec::new(),
            Connect::All => (0..other.len()).map(|i| (i, other.point(i))).collect(),
            Connect::Points(targets) => {
                let index = ClosestNodeIndex::from_points(&other.points);
                let mut picked = Vec::with_capacity(targets.len());
                for t in targets {
                    if let Some(node) = index.query(t)?.node {
                        picked.push((node, *t));
                    }
                }
                picked
            }
        };

        let mut replaced: HashMap<usize, usize> = HashMap::new();
        if !selected.is_empty() && n1 > 0 {
            let index = ClosestNodeIndex::from_points(&self.points);
            for (node2, at) in selected {
                let m = index.query(&at)?;
                if let (Some(node1), true) = (m.node, m.distance < eps) {
                    replaced.entry(node2).or_insert(node1);
                }
            }
        }

        let mut table = Vec::with_capacity(other.len());
        let mut next = n1;
        for i in 0..other.len() {
            match replaced.get(&i) {
                Some(&target) => table.push(target),
                None => {
                    points.push(other.points.get(i))?;
                    table.push(next);
                    next += 1;
                }
            }
        }

        let mut segments = self.segments.clone();
        for s in &other.segments {
            if s.start >= table.len() || s.end >= table.len() {
                return Err(MeshSeamError::InvalidIndex {
                    context: "curve segments",
                    index: s.start.max(s.end),
                    len: table.len(),
                });
            }
            segments.push(s.map(|v| table[v]));
        }
        if !replaced.is_empty() {
            log::debug!("connected {} coincident curve points", replaced.len());
        }
        Ok(Curve { points, segments })
    }

    /// The same curve walked in the opposite direction.
    pub fn reversed(&self) -> Curve {
        Curve {
            points: self.points.clone(),
            segments: reverse_path(&self.segments),
        }
    }
}

fn count_for_length(length: f64, resolution: Resolution) -> Result<usize, MeshSeamError> {
    match resolution {
        Resolution::Points(n) if n >= 2 => Ok(n),
        Resolution::Points(n) => Err(MeshSeamError::InvalidArgument(format!(
            "a polyline needs at least 2 points, got {n}"
        ))),
        Resolution::EdgeLength(h) if h > 0.0 => {
            let n = (length / h).floor() as usize + 1;
            Ok(if n <= 1 { 5 } else { n })
        }
        Resolution::EdgeLength(h) => Err(MeshSeamError::InvalidArgument(format!(
            "edge length must be positive, got {h}"
        ))),
    }
}

/// Straight line from `p1` to `p2`, both included.
pub fn line_segments(
    p1: [f64; 2],
    p2: [f64; 2],
    resolution: Resolution,
) -> Result<Curve, MeshSeamError> {
    let n = count_for_length(distance(p1, p2), resolution)?;
    let points = linspace(0.0, 1.0, n, true)
        .map(|t| [p1[0] + t * (p2[0] - p1[0]), p1[1] + t * (p2[1] - p1[1])]);
    Ok(Curve::polyline(points, false))
}

/// Circular arc from angle `a_min` to `a_max` (radians).
///
/// An arc spanning a full turn is closed and does not repeat its first point.
pub fn circle_segments(
    center: [f64; 2],
    radius: f64,
    a_min: f64,
    a_max: f64,
    resolution: Resolution,
) -> Result<Curve, MeshSeamError> {
    let span = a_max - a_min;
    let n = match resolution {
        Resolution::EdgeLength(h) if h > 0.0 => {
            ((radius / h * span).abs().floor() as usize + 1).max(5)
        }
        other => count_for_length(0.0, other)?,
    };
    let delta = span / n as f64;
    let closed = (span.abs() - 2.0 * PI).abs() < 0.1 * delta.abs();
    let points = linspace(a_min, a_max, n, !closed)
        .map(|a| [center[0] + radius * a.cos(), center[1] + radius * a.sin()]);
    Ok(Curve::polyline(points, closed))
}

/// Closed axis-aligned rectangle with corners `p1` (lower left) and `p2`
/// (upper right), walked counter-clockwise from `p1`.
///
/// `x` and `y` give the resolution of the horizontal and vertical sides.
pub fn rectangle_segments(
    p1: [f64; 2],
    p2: [f64; 2],
    x: Resolution,
    y: Resolution,
) -> Result<Curve, MeshSeamError> {
    let p11 = [p2[0], p1[1]];
    let p22 = [p1[0], p2[1]];
    let sides = [
        line_segments(p1, p11, x)?,
        line_segments(p11, p2, y)?,
        line_segments(p2, p22, x)?,
        line_segments(p22, p1, y)?,
    ];
    add_multiple_segments(&sides, false)
}

/// Rectangle with corners rounded by quarter circles of radius `rho`.
///
/// # Errors
/// [`MeshSeamError::InvalidGeometry`] if `rho` exceeds a third of either side.
pub fn rounded_rectangle_segments(
    p1: [f64; 2],
    p2: [f64; 2],
    rho: f64,
    x: Resolution,
    y: Resolution,
    corner: Resolution,
) -> Result<Curve, MeshSeamError> {
    let (dx, dy) = (p2[0] - p1[0], p2[1] - p1[1]);
    if rho <= 0.0 || rho > dx / 3.0 || rho > dy / 3.0 {
        return Err(MeshSeamError::InvalidGeometry(format!(
            "corner radius {rho} does not fit a {dx} x {dy} rectangle"
        )));
    }
    let (x1l, x2l, x1r, x2r) = (p1[0], p2[0] - rho, p1[0] + rho, p2[0]);
    let (y1l, y3l, y1r, y3r) = (p1[1] + rho, p2[1], p1[1], p2[1] - rho);
    let half = PI / 2.0;
    let parts = [
        line_segments([x1r, y1r], [x2l, y1r], x)?,
        circle_segments([x2l, y1l], rho, -half, 0.0, corner)?,
        line_segments([x2r, y1l], [x2r, y3r], y)?,
        circle_segments([x2l, y3r], rho, 0.0, half, corner)?,
        line_segments([x2l, y3l], [x1r, y3l], x)?,
        circle_segments([x1r, y3r], rho, half, PI, corner)?,
        line_segments([x1l, y3r], [x1l, y1l], y)?,
        circle_segments([x1r, y1l], rho, PI, 3.0 * half, corner)?,
    ];
    add_multiple_segments(&parts, false)
}

/// Chains a list of points, optionally resampled to `edge_length`.
///
/// Closes the curve when the last point coincides with the first.
pub fn point_segments(
    points: &[[f64; 2]],
    edge_length: Option<f64>,
) -> Result<Curve, MeshSeamError> {
    let Some(&first) = points.first() else {
        return Err(MeshSeamError::InvalidGeometry("empty point list".into()));
    };
    let mut all = vec![first];
    match edge_length {
        Some(h) if h > 0.0 => {
            for w in points.windows(2) {
                let n = ((distance(w[0], w[1]) / h) as usize + 1).max(2);
                for t in linspace(0.0, 1.0, n, true).skip(1) {
                    all.push([
                        w[0][0] + t * (w[1][0] - w[0][0]),
                        w[0][1] + t * (w[1][1] - w[0][1]),
                    ]);
                }
            }
        }
        Some(h) => {
            return Err(MeshSeamError::InvalidArgument(format!(
                "edge length must be positive, got {h}"
            )));
        }
        None => all.extend_from_slice(&points[1..]),
    }

    let delta = all
        .windows(2)
        .map(|w| distance(w[0], w[1]))
        .min_by(f64::total_cmp)
        .unwrap_or(0.0)
        / 10.0;
    let mut closed = false;
    if all.len() > 1 {
        if let Some(&last) = all.last() {
            if same_point(first, last, delta) {
                all.pop();
                closed = true;
            }
        }
    }
    Ok(Curve::polyline(all, closed))
}

/// Chains curves with [`Curve::add_segments`]; `closed` applies to the final
/// join.
pub fn add_multiple_segments(curves: &[Curve], closed: bool) -> Result<Curve, MeshSeamError> {
    let Some((first, rest)) = curves.split_first() else {
        return Err(MeshSeamError::InvalidArgument("no curves to join".into()));
    };
    let Some((last, middle)) = rest.split_last() else {
        return Ok(first.clone());
    };
    let mut acc = first.clone();
    for c in middle {
        acc = acc.add_segments(c, false);
    }
    Ok(acc.add_segments(last, closed))
}

/// Concatenates independent curves and returns the point offset of each.
pub fn add_multiple_curves(curves: &[Curve]) -> Result<(Curve, Vec<usize>), MeshSeamError> {
    let mut acc = Curve::default();
    let mut offsets = Vec::with_capacity(curves.len());
    for c in curves {
        offsets.push(acc.len());
        acc = acc.add_curves(c, &Connect::None, 0.0)?;
    }
    Ok((acc, offsets))
}
