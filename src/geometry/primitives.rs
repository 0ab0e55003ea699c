//! Marker-tagged geometry assembly for mesher input.
//!
//! A [`Geometry`] is a self-contained unit of points and facets (segments in
//! 2D, polygons in 3D), optionally carrying per-facet and per-point
//! [`Marker`]s. A [`GeometryBuilder`] concatenates such units with index
//! offsets and renders the result as [`MeshInput`] or [`TetInput`].

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::algs::refine::{MeshInput, Region, TetInput};
use crate::mesh_error::MeshSeamError;
use crate::topology::point::PointSet;
use crate::topology::segment::Segment;

/// Integer boundary tag carried by facets and points through the mesher.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Marker(pub i32);

impl Marker {
    pub const NONE: Marker = Marker(0);
    pub const MINUS_X: Marker = Marker(1);
    pub const PLUS_X: Marker = Marker(2);
    pub const MINUS_Y: Marker = Marker(3);
    pub const PLUS_Y: Marker = Marker(4);
    pub const MINUS_Z: Marker = Marker(5);
    pub const PLUS_Z: Marker = Marker(6);
    pub const SHELL: Marker = Marker(100);
    /// First value free for application markers.
    pub const FIRST_USER_MARKER: Marker = Marker(1000);
}

/// One facet: a segment in 2D, or planar polygons (plus facet holes) in 3D.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Facet {
    pub polygons: Vec<Vec<usize>>,
    pub holes: Vec<[f64; 3]>,
}

impl Facet {
    pub fn polygon(nodes: Vec<usize>) -> Self {
        Self {
            polygons: vec![nodes],
            holes: Vec::new(),
        }
    }

    pub fn segment(a: usize, b: usize) -> Self {
        Self::polygon(vec![a, b])
    }

    /// The facet as a segment, if it is a single two-node polygon.
    pub fn as_segment(&self) -> Option<Segment> {
        match self.polygons.as_slice() {
            [p] => match p.as_slice() {
                &[a, b] => Some(Segment::new(a, b)),
                _ => None,
            },
            _ => None,
        }
    }

    fn offset(&self, by: usize) -> Facet {
        Facet {
            polygons: self
                .polygons
                .iter()
                .map(|p| p.iter().map(|&v| v + by).collect())
                .collect(),
            holes: self.holes.clone(),
        }
    }

    /// Checks that the facet has at least one polygon, each with at least two
    /// nodes, all below `point_count`.
    pub fn validate(&self, point_count: usize) -> Result<(), MeshSeamError> {
        if self.polygons.is_empty() {
            return Err(MeshSeamError::InvalidGeometry("facet without polygons".into()));
        }
        for polygon in &self.polygons {
            if polygon.len() < 2 {
                return Err(MeshSeamError::InvalidGeometry(format!(
                    "facet polygon with {} nodes",
                    polygon.len()
                )));
            }
            if let Some(&v) = polygon.iter().find(|&&v| v >= point_count) {
                return Err(MeshSeamError::InvalidIndex {
                    context: "facet",
                    index: v,
                    len: point_count,
                });
            }
        }
        Ok(())
    }
}

/// A self-contained geometry unit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    pub points: PointSet,
    pub facets: Vec<Facet>,
    pub facet_markers: Option<Vec<Marker>>,
    pub point_markers: Option<Vec<Marker>>,
}

impl Geometry {
    pub fn new(points: PointSet, facets: Vec<Facet>) -> Self {
        Self {
            points,
            facets,
            facet_markers: None,
            point_markers: None,
        }
    }

    pub fn with_facet_markers(mut self, markers: Vec<Marker>) -> Self {
        self.facet_markers = Some(markers);
        self
    }

    pub fn with_point_markers(mut self, markers: Vec<Marker>) -> Self {
        self.point_markers = Some(markers);
        self
    }

    /// Index and marker-length checks.
    pub fn validate(&self) -> Result<(), MeshSeamError> {
        for facet in &self.facets {
            facet.validate(self.points.len())?;
        }
        if let Some(m) = &self.facet_markers {
            marker_len("facet", m.len(), self.facets.len())?;
        }
        if let Some(m) = &self.point_markers {
            marker_len("point", m.len(), self.points.len())?;
        }
        Ok(())
    }
}

fn marker_len(what: &str, got: usize, expected: usize) -> Result<(), MeshSeamError> {
    if got != expected {
        return Err(MeshSeamError::InvalidArgument(format!(
            "{got} {what} markers for {expected} {what}s"
        )));
    }
    Ok(())
}

/// Appends `incoming` markers to `target`, padding whichever side has none
/// with [`Marker::NONE`].
fn merge_markers(
    target: &mut Option<Vec<Marker>>,
    existing: usize,
    incoming: Option<&[Marker]>,
    added: usize,
) {
    match (target.as_mut(), incoming) {
        (Some(t), Some(m)) => t.extend_from_slice(m),
        (Some(t), None) => t.resize(existing + added, Marker::NONE),
        (None, Some(m)) => {
            let mut t = vec![Marker::NONE; existing];
            t.extend_from_slice(m);
            *target = Some(t);
        }
        (None, None) => {}
    }
}

/// Accumulates geometry units into one mesher input.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeometryBuilder {
    points: PointSet,
    facets: Vec<Facet>,
    facet_markers: Option<Vec<Marker>>,
    point_markers: Option<Vec<Marker>>,
    pub holes: Vec<[f64; 3]>,
    pub regions: Vec<Region>,
}

impl GeometryBuilder {
    pub fn new(dimension: usize) -> Result<Self, MeshSeamError> {
        Ok(Self {
            points: PointSet::new(dimension)?,
            facets: Vec::new(),
            facet_markers: None,
            point_markers: None,
            holes: Vec::new(),
            regions: Vec::new(),
        })
    }

    pub fn dimension(&self) -> usize {
        self.points.dimension()
    }

    pub fn points(&self) -> &PointSet {
        &self.points
    }

    pub fn facets(&self) -> &[Facet] {
        &self.facets
    }

    pub fn facet_markers(&self) -> Option<&[Marker]> {
        self.facet_markers.as_deref()
    }

    pub fn point_markers(&self) -> Option<&[Marker]> {
        self.point_markers.as_deref()
    }

    /// Appends a geometry unit, offsetting its facet indices past the
    /// points already present.
    pub fn add_geometry(&mut self, geometry: &Geometry) -> Result<(), MeshSeamError> {
        geometry.validate()?;
        let offset = self.points.len();
        let facet_count = self.facets.len();
        self.points.extend_from(&geometry.points)?;
        self.facets
            .extend(geometry.facets.iter().map(|f| f.offset(offset)));
        merge_markers(
            &mut self.facet_markers,
            facet_count,
            geometry.facet_markers.as_deref(),
            geometry.facets.len(),
        );
        merge_markers(
            &mut self.point_markers,
            offset,
            geometry.point_markers.as_deref(),
            geometry.points.len(),
        );
        Ok(())
    }

    /// Appends a closed polygon `p0 -> p1 -> ... -> p0` of segment facets.
    pub fn add_cycle(&mut self, points: PointSet, marker: Option<Marker>) -> Result<(), MeshSeamError> {
        let n = points.len();
        if n < 2 {
            return Err(MeshSeamError::InvalidGeometry(format!(
                "a cycle needs at least 2 points, got {n}"
            )));
        }
        let facets = (0..n).map(|i| Facet::segment(i, (i + 1) % n)).collect();
        let mut geometry = Geometry::new(points, facets);
        geometry.facet_markers = marker.map(|m| vec![m; n]);
        self.add_geometry(&geometry)
    }

    pub fn bounding_box(&self) -> Option<([f64; 3], [f64; 3])> {
        self.points.bounding_box()
    }

    /// Center of the bounding box.
    pub fn center(&self) -> Option<[f64; 3]> {
        let (lo, hi) = self.bounding_box()?;
        Some([0, 1, 2].map(|k| 0.5 * (lo[k] + hi[k])))
    }

    /// Surrounds everything added so far with a box `distance` away from the
    /// bounding box. Subdivisions apply to 2D boxes only.
    pub fn wrap_in_box(
        &mut self,
        distance: f64,
        subdivisions: Option<[usize; 2]>,
    ) -> Result<(), MeshSeamError> {
        let (lo, hi) = self.bounding_box().ok_or_else(|| {
            MeshSeamError::InvalidGeometry("cannot wrap an empty geometry".into())
        })?;
        let dim = self.dimension();
        let a: Vec<f64> = lo[..dim].iter().map(|x| x - distance).collect();
        let b: Vec<f64> = hi[..dim].iter().map(|x| x + distance).collect();
        let shell = make_box(&a, &b, subdivisions)?;
        self.add_geometry(&shell)
    }

    /// Applies `f` to every point coordinate.
    pub fn apply_transform<F>(&mut self, f: F)
    where
        F: FnMut(&mut [f64]),
    {
        self.points.map_in_place(f);
    }

    /// Renders a planar straight-line graph for a triangle mesher.
    pub fn triangle_input(&self) -> Result<MeshInput, MeshSeamError> {
        if self.dimension() != 2 {
            return Err(MeshSeamError::InvalidGeometry(
                "triangle input requires 2D geometry".into(),
            ));
        }
        let segments = self
            .facets
            .iter()
            .map(|f| {
                f.as_segment().ok_or_else(|| {
                    MeshSeamError::InvalidGeometry("2D facets must be single segments".into())
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let mut input = MeshInput::new(self.points.clone(), segments);
        input.segment_markers = self.facet_markers.clone().unwrap_or_default();
        input.point_markers = self.point_markers.clone().unwrap_or_default();
        input.holes = self.holes.iter().map(|h| [h[0], h[1]]).collect();
        input.regions = self.regions.clone();
        Ok(input)
    }

    /// Renders a piecewise linear complex for a tetrahedral mesher.
    pub fn tet_input(&self) -> Result<TetInput, MeshSeamError> {
        if self.dimension() != 3 {
            return Err(MeshSeamError::InvalidGeometry(
                "tetrahedral input requires 3D geometry".into(),
            ));
        }
        Ok(TetInput {
            points: self.points.clone(),
            point_markers: self.point_markers.clone().unwrap_or_default(),
            facets: self.facets.clone(),
            facet_markers: self.facet_markers.clone().unwrap_or_default(),
            holes: self.holes.clone(),
            regions: self.regions.clone(),
        })
    }
}

/// Axis-aligned box between corners `a` and `b` (2D rectangle or 3D box).
///
/// 2D facets run `-y, +x, +y, -x`; 3D facets `-z, -y, +x, +y, -x, +z`, each
/// marked with the matching side marker.
pub fn make_box(
    a: &[f64],
    b: &[f64],
    subdivisions: Option<[usize; 2]>,
) -> Result<Geometry, MeshSeamError> {
    if a.len() != b.len() {
        return Err(MeshSeamError::InvalidGeometry(format!(
            "box corners of different dimension: {} and {}",
            a.len(),
            b.len()
        )));
    }
    match (a, b) {
        (&[ax, ay], &[bx, by]) => {
            let points = PointSet::from_2d([[ax, ay], [bx, ay], [bx, by], [ax, by]]);
            let facets = (0..4).map(|i| Facet::segment(i, (i + 1) % 4)).collect();
            let geometry = Geometry::new(points, facets).with_facet_markers(vec![
                Marker::MINUS_Y,
                Marker::PLUS_X,
                Marker::PLUS_Y,
                Marker::MINUS_X,
            ]);
            match subdivisions {
                Some([sx, sy]) => subdivide_facets(&geometry, &[sx, sy, sx, sy]),
                None => Ok(geometry),
            }
        }
        (&[ax, ay, az], &[bx, by, bz]) => {
            if subdivisions.is_some() {
                return Err(MeshSeamError::InvalidArgument(
                    "box subdivision is only supported in 2D".into(),
                ));
            }
            let points = PointSet::from_3d([
                [ax, ay, az],
                [bx, ay, az],
                [bx, by, az],
                [ax, by, az],
                [ax, ay, bz],
                [bx, ay, bz],
                [bx, by, bz],
                [ax, by, bz],
            ]);
            let facets = [
                [0, 1, 2, 3],
                [0, 1, 5, 4],
                [1, 2, 6, 5],
                [7, 6, 2, 3],
                [7, 3, 0, 4],
                [4, 5, 6, 7],
            ]
            .into_iter()
            .map(|f| Facet::polygon(f.to_vec()))
            .collect();
            Ok(Geometry::new(points, facets).with_facet_markers(vec![
                Marker::MINUS_Z,
                Marker::MINUS_Y,
                Marker::PLUS_X,
                Marker::PLUS_Y,
                Marker::MINUS_X,
                Marker::PLUS_Z,
            ]))
        }
        _ => Err(MeshSeamError::InvalidGeometry(format!(
            "unsupported box dimension: {}",
            a.len()
        ))),
    }
}

/// Closed polygon of `subdivisions` points on a circle, every facet marked
/// with `marker`.
pub fn make_circle(
    radius: f64,
    center: [f64; 2],
    subdivisions: usize,
    marker: Marker,
) -> Result<Geometry, MeshSeamError> {
    if subdivisions < 3 {
        return Err(MeshSeamError::InvalidArgument(format!(
            "a circle needs at least 3 subdivisions, got {subdivisions}"
        )));
    }
    let step = 2.0 * PI / subdivisions as f64;
    let points = PointSet::from_2d((0..subdivisions).map(|i| {
        let phi = step * i as f64;
        [center[0] + radius * phi.cos(), center[1] + radius * phi.sin()]
    }));
    let facets = (0..subdivisions)
        .map(|i| Facet::segment(i, (i + 1) % subdivisions))
        .collect();
    Ok(Geometry::new(points, facets).with_facet_markers(vec![marker; subdivisions]))
}

/// Splits segment facet `i` into `counts[i]` equal pieces. Counts of 0 or 1
/// leave the facet as is; new points are appended after the existing ones
/// and inherit no point marker.
pub fn subdivide_facets(geometry: &Geometry, counts: &[usize]) -> Result<Geometry, MeshSeamError> {
    geometry.validate()?;
    if counts.len() != geometry.facets.len() {
        return Err(MeshSeamError::InvalidArgument(format!(
            "{} subdivision counts for {} facets",
            counts.len(),
            geometry.facets.len()
        )));
    }
    let mut points = geometry.points.clone();
    let mut facets = Vec::new();
    let mut facet_markers = geometry.facet_markers.as_ref().map(|_| Vec::new());
    for (f, (facet, &n)) in geometry.facets.iter().zip(counts).enumerate() {
        let seg = facet.as_segment().ok_or_else(|| {
            MeshSeamError::InvalidGeometry("only segment facets can be subdivided".into())
        })?;
        let n = n.max(1);
        let (pa, pb) = (points.get(seg.start).to_vec(), points.get(seg.end).to_vec());
        let mut prev = seg.start;
        for i in 1..n {
            let t = i as f64 / n as f64;
            let p: Vec<f64> = pa.iter().zip(&pb).map(|(a, b)| a + t * (b - a)).collect();
            let next = points.push(&p)?;
            facets.push(Facet::segment(prev, next));
            prev = next;
        }
        facets.push(Facet::segment(prev, seg.end));
        if let (Some(out), Some(src)) = (facet_markers.as_mut(), geometry.facet_markers.as_ref()) {
            out.extend(std::iter::repeat_n(src[f], n));
        }
    }
    let added = points.len() - geometry.points.len();
    let point_markers = geometry.point_markers.as_ref().map(|m| {
        let mut m = m.clone();
        m.resize(m.len() + added, Marker::NONE);
        m
    });
    Ok(Geometry {
        points,
        facets,
        facet_markers,
        point_markers,
    })
}
