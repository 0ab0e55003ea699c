//! External mesher seam and the local refinement driver.
//!
//! Triangulation and tetrahedralization are done by external engines. This
//! module defines the narrow contract they are reached through
//! ([`TriangleMesher`], [`TetMesher`]), renders the engines' option strings
//! from typed configuration, and drives predicate-based and forced local
//! refinement on top of them.
//!
//! # Predicate contract
//! A [`RefinementPredicate`] must be a pure function of the triangle it is
//! handed. The engine may call it any number of times per element, in any
//! order, and from any thread, so it is required to be `Sync` and must not
//! rely on shared mutable state.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::primitives::{Facet, Marker};
use crate::geometry::quality::triangle_area;
use crate::mesh_error::MeshSeamError;
use crate::topology::mesh::{TetMesh, TriMesh};
use crate::topology::point::PointSet;
use crate::topology::segment::Segment;
use crate::topology::validation::{validate_elements, validate_segments};

/// Failure reported by an external mesher. Surfaced verbatim.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MesherError {
    /// The engine rejected its input geometry (self-intersections, inverted
    /// facets, ...).
    #[error("mesher rejected input: {0}")]
    InvalidInput(String),
    /// The engine aborted with an internal status code.
    #[error("mesher failed with status {code}: {message}")]
    Failed { code: i32, message: String },
}

/// Decides whether a triangle must be refined further.
pub trait RefinementPredicate: Sync {
    fn needs_refinement(&self, vertices: &[[f64; 2]; 3], area: f64) -> bool;
}

impl<F> RefinementPredicate for F
where
    F: Fn(&[[f64; 2]; 3], f64) -> bool + Sync,
{
    fn needs_refinement(&self, vertices: &[[f64; 2]; 3], area: f64) -> bool {
        self(vertices, area)
    }
}

/// Refine every triangle larger than the given area.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MaxArea(pub f64);

impl RefinementPredicate for MaxArea {
    fn needs_refinement(&self, _vertices: &[[f64; 2]; 3], area: f64) -> bool {
        area > self.0
    }
}

/// Seed point, attribute and volume limit of a mesh region.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Region {
    /// Any point strictly inside the region (z ignored in 2D).
    pub seed: [f64; 3],
    pub tag: i32,
    /// Largest allowed element area (2D) or volume (3D).
    pub max_volume: Option<f64>,
}

/// Planar input handed to a [`TriangleMesher`].
#[derive(Clone, Debug, PartialEq)]
pub struct MeshInput {
    pub points: PointSet,
    pub point_markers: Vec<Marker>,
    pub segments: Vec<Segment>,
    pub segment_markers: Vec<Marker>,
    pub holes: Vec<[f64; 2]>,
    pub regions: Vec<Region>,
    /// Existing triangles, used in refine mode.
    pub elements: Vec<[usize; 3]>,
    /// Per-element area limits in refine mode; negative means unconstrained.
    pub element_max_areas: Vec<f64>,
}

impl MeshInput {
    pub fn new(points: PointSet, segments: Vec<Segment>) -> Self {
        Self {
            points,
            point_markers: Vec::new(),
            segments,
            segment_markers: Vec::new(),
            holes: Vec::new(),
            regions: Vec::new(),
            elements: Vec::new(),
            element_max_areas: Vec::new(),
        }
    }

    /// Checks indices and that every optional per-item list is either empty
    /// or has one entry per item.
    pub fn validate(&self) -> Result<(), MeshSeamError> {
        if self.points.dimension() != 2 {
            return Err(MeshSeamError::InvalidGeometry(format!(
                "triangulation input must be 2D, got {}D",
                self.points.dimension()
            )));
        }
        validate_segments(&self.segments, self.points.len(), "mesher segments")?;
        validate_elements(&self.elements, self.points.len(), "mesher elements")?;
        check_len("point markers", self.point_markers.len(), self.points.len())?;
        check_len("segment markers", self.segment_markers.len(), self.segments.len())?;
        check_len(
            "element area limits",
            self.element_max_areas.len(),
            self.elements.len(),
        )
    }
}

fn check_len(what: &str, got: usize, expected: usize) -> Result<(), MeshSeamError> {
    if got != 0 && got != expected {
        return Err(MeshSeamError::InvalidArgument(format!(
            "{got} {what} for {expected} items"
        )));
    }
    Ok(())
}

/// Triangulation returned by a [`TriangleMesher`].
#[derive(Clone, Debug, PartialEq)]
pub struct MeshOutput {
    pub points: PointSet,
    pub point_markers: Vec<Marker>,
    pub elements: Vec<[usize; 3]>,
    /// Boundary and constraint segments of the result.
    pub segments: Vec<Segment>,
    pub segment_markers: Vec<Marker>,
}

impl MeshOutput {
    pub fn to_mesh(&self) -> Result<TriMesh, MeshSeamError> {
        TriMesh::new(self.points.clone(), self.elements.clone())
    }

    /// Input for a refine-mode call on this triangulation.
    pub fn refine_input(&self) -> MeshInput {
        MeshInput {
            points: self.points.clone(),
            point_markers: self.point_markers.clone(),
            segments: self.segments.clone(),
            segment_markers: self.segment_markers.clone(),
            holes: Vec::new(),
            regions: Vec::new(),
            elements: self.elements.clone(),
            element_max_areas: Vec::new(),
        }
    }

    /// Vertices and area of element `e`.
    pub fn triangle(&self, e: usize) -> ([[f64; 2]; 3], f64) {
        let tri = self.elements[e].map(|v| self.points.xy(v));
        let area = triangle_area(&tri);
        (tri, area)
    }
}

/// Piecewise linear complex handed to a [`TetMesher`].
#[derive(Clone, Debug, PartialEq)]
pub struct TetInput {
    pub points: PointSet,
    pub point_markers: Vec<Marker>,
    pub facets: Vec<Facet>,
    pub facet_markers: Vec<Marker>,
    pub holes: Vec<[f64; 3]>,
    pub regions: Vec<Region>,
}

/// Tetrahedralization returned by a [`TetMesher`].
#[derive(Clone, Debug, PartialEq)]
pub struct TetOutput {
    pub points: PointSet,
    pub elements: Vec<[usize; 4]>,
    pub faces: Vec<[usize; 3]>,
    pub face_markers: Vec<Marker>,
    /// Region tag of each element when region attributes were requested.
    pub element_attributes: Vec<f64>,
}

impl TetOutput {
    pub fn to_mesh(&self) -> Result<TetMesh, MeshSeamError> {
        TetMesh::new(self.points.clone(), self.elements.clone())
    }
}

/// A constrained Delaunay triangulator.
pub trait TriangleMesher {
    fn triangulate(
        &self,
        switches: &str,
        input: &MeshInput,
        predicate: Option<&dyn RefinementPredicate>,
    ) -> Result<MeshOutput, MesherError>;
}

/// A Delaunay tetrahedralizer.
pub trait TetMesher {
    fn tetrahedralize(&self, switches: &str, input: &TetInput) -> Result<TetOutput, MesherError>;
}

/// Typed switches of a triangulation run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriangulateOptions {
    pub quality_meshing: bool,
    /// Minimum angle in degrees for quality meshing.
    pub min_angle: Option<f64>,
    pub mesh_order: Option<u32>,
    pub verbose: bool,
    /// Propagate region attributes to elements.
    pub attributes: bool,
    /// Honour per-region area limits.
    pub volume_constraints: bool,
    /// Global area limit; non-positive values impose none.
    pub max_area: Option<f64>,
    pub allow_boundary_steiner: bool,
    pub allow_volume_steiner: bool,
    pub generate_faces: bool,
    pub generate_neighbor_lists: bool,
}

impl Default for TriangulateOptions {
    fn default() -> Self {
        Self {
            quality_meshing: true,
            min_angle: None,
            mesh_order: None,
            verbose: false,
            attributes: false,
            volume_constraints: false,
            max_area: None,
            allow_boundary_steiner: true,
            allow_volume_steiner: true,
            generate_faces: false,
            generate_neighbor_lists: false,
        }
    }
}

impl TriangulateOptions {
    fn quality_switch(&self, out: &mut String) {
        if self.quality_meshing {
            match self.min_angle {
                Some(angle) => out.push_str(&format!("q{angle:.6}")),
                None => out.push('q'),
            }
        }
    }

    fn verbosity_switch(&self, out: &mut String) {
        out.push_str(if self.verbose { "VV" } else { "Q" });
    }

    /// Switch string of an initial triangulation.
    ///
    /// # Errors
    /// Forbidding Steiner points in the interior while allowing them on the
    /// boundary is contradictory and rejected.
    pub fn build_switches(&self, with_predicate: bool) -> Result<String, MeshSeamError> {
        let mut s = String::from("pzj");
        self.quality_switch(&mut s);
        if let Some(order) = self.mesh_order {
            s.push_str(&format!("o{order}"));
        }
        self.verbosity_switch(&mut s);
        if self.attributes {
            s.push('A');
        }
        if self.volume_constraints {
            s.push('a');
        }
        if let Some(area) = self.max_area.filter(|a| *a > 0.0) {
            s.push_str(&format!("a{area:.20}"));
        }
        if with_predicate {
            s.push('u');
        }
        if self.generate_neighbor_lists {
            s.push('n');
        }
        if self.generate_faces {
            s.push('e');
        }
        if !self.allow_volume_steiner {
            if self.allow_boundary_steiner {
                return Err(MeshSeamError::InvalidArgument(
                    "cannot allow boundary Steiner points when volume Steiner points are forbidden"
                        .into(),
                ));
            }
            s.push_str("YY");
        } else if !self.allow_boundary_steiner {
            s.push('Y');
        }
        Ok(s)
    }

    /// Switch string of a refinement run on an existing triangulation.
    ///
    /// `r` reads the input triangles and `a` their per-element area limits.
    pub fn refine_switches(&self, has_segments: bool, with_predicate: bool) -> String {
        let mut s = String::from("razj");
        self.quality_switch(&mut s);
        if has_segments {
            s.push('p');
        }
        self.verbosity_switch(&mut s);
        if with_predicate {
            s.push('u');
        }
        if self.generate_neighbor_lists {
            s.push('n');
        }
        s
    }
}

/// Typed switches of a tetrahedralization run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TetOptions {
    /// Leading switches, `"pq"` for a quality PLC tetrahedralization.
    pub base: String,
    pub verbose: bool,
    /// Propagate region attributes to elements.
    pub attributes: bool,
    /// Honour per-region volume limits.
    pub volume_constraints: bool,
    /// Global volume limit; non-positive values impose none.
    pub max_volume: Option<f64>,
    pub diagnose: bool,
    pub insert_points: bool,
}

impl Default for TetOptions {
    fn default() -> Self {
        Self {
            base: "pq".into(),
            verbose: false,
            attributes: false,
            volume_constraints: false,
            max_volume: None,
            diagnose: false,
            insert_points: false,
        }
    }
}

impl TetOptions {
    pub fn switches(&self) -> String {
        let mut s = self.base.clone();
        if self.attributes {
            s.push('A');
        }
        if self.volume_constraints {
            s.push('a');
        }
        if let Some(v) = self.max_volume.filter(|v| *v > 0.0) {
            s.push_str(&format!("a{v}"));
        }
        if self.diagnose {
            s.push('d');
        }
        if self.insert_points {
            s.push('i');
        }
        if !self.verbose {
            s.push('Q');
        }
        s
    }
}

/// Runs a tetrahedralization with the rendered switches.
pub fn tetrahedralize<M: TetMesher>(
    mesher: &M,
    options: &TetOptions,
    input: &TetInput,
) -> Result<TetOutput, MeshSeamError> {
    for facet in &input.facets {
        facet.validate(input.points.len())?;
    }
    check_len("facet markers", input.facet_markers.len(), input.facets.len())?;
    let out = mesher.tetrahedralize(&options.switches(), input)?;
    validate_elements(&out.elements, out.points.len(), "tetrahedralization")?;
    Ok(out)
}

/// Outcome of [`RefinementDriver::refine_passes`].
#[derive(Clone, Debug)]
pub struct RefinementReport {
    pub mesh: MeshOutput,
    /// Refinement calls actually made.
    pub passes: usize,
    /// Elements still satisfying the predicate when the loop stopped.
    pub remaining: usize,
}

/// Builds and locally refines triangulations through a [`TriangleMesher`].
#[derive(Clone, Debug, Default)]
pub struct RefinementDriver<M> {
    mesher: M,
    options: TriangulateOptions,
}

impl<M: TriangleMesher> RefinementDriver<M> {
    pub fn new(mesher: M, options: TriangulateOptions) -> Self {
        Self { mesher, options }
    }

    pub fn mesher(&self) -> &M {
        &self.mesher
    }

    pub fn options(&self) -> &TriangulateOptions {
        &self.options
    }

    fn run(
        &self,
        switches: &str,
        input: &MeshInput,
        predicate: Option<&dyn RefinementPredicate>,
    ) -> Result<MeshOutput, MeshSeamError> {
        input.validate()?;
        log::debug!("triangulate -{switches}");
        let out = self.mesher.triangulate(switches, input, predicate)?;
        validate_elements(&out.elements, out.points.len(), "triangulation")?;
        Ok(out)
    }

    /// Initial triangulation of `input`, optionally steered by a predicate.
    pub fn build(
        &self,
        input: &MeshInput,
        predicate: Option<&dyn RefinementPredicate>,
    ) -> Result<MeshOutput, MeshSeamError> {
        let switches = self.options.build_switches(predicate.is_some())?;
        self.run(&switches, input, predicate)
    }

    /// Refines `mesh` wherever `predicate` holds.
    pub fn refine(
        &self,
        mesh: &MeshOutput,
        predicate: &dyn RefinementPredicate,
    ) -> Result<MeshOutput, MeshSeamError> {
        let switches = self
            .options
            .refine_switches(!mesh.segments.is_empty(), true);
        self.run(&switches, &mesh.refine_input(), Some(predicate))
    }

    /// Refines `mesh` with explicit per-element area limits; a negative limit
    /// leaves that element unconstrained.
    pub fn refine_elements(
        &self,
        mesh: &MeshOutput,
        max_areas: &[f64],
    ) -> Result<MeshOutput, MeshSeamError> {
        if max_areas.len() != mesh.elements.len() {
            return Err(MeshSeamError::InvalidArgument(format!(
                "{} area limits for {} elements",
                max_areas.len(),
                mesh.elements.len()
            )));
        }
        let mut input = mesh.refine_input();
        input.element_max_areas = max_areas.to_vec();
        let switches = self
            .options
            .refine_switches(!mesh.segments.is_empty(), false);
        self.run(&switches, &input, None)
    }

    /// Repeatedly halves the area limit of every element satisfying
    /// `predicate` until none does or `max_passes` refinements were made.
    pub fn refine_passes(
        &self,
        mesh: MeshOutput,
        predicate: &dyn RefinementPredicate,
        max_passes: usize,
    ) -> Result<RefinementReport, MeshSeamError> {
        let mut mesh = mesh;
        let mut passes = 0;
        loop {
            let limits: Vec<f64> = (0..mesh.elements.len())
                .map(|e| {
                    let (tri, area) = mesh.triangle(e);
                    if predicate.needs_refinement(&tri, area) {
                        0.5 * area
                    } else {
                        -1.0
                    }
                })
                .collect();
            let remaining = limits.iter().filter(|&&l| l >= 0.0).count();
            if remaining == 0 || passes == max_passes {
                log::info!(
                    "refinement stopped after {passes} passes: {} elements, {remaining} still marked",
                    mesh.elements.len()
                );
                return Ok(RefinementReport {
                    mesh,
                    passes,
                    remaining,
                });
            }
            mesh = self.refine_elements(&mesh, &limits)?;
            passes += 1;
            log::info!(
                "refinement pass {passes}: {remaining} elements marked, {} elements now",
                mesh.elements.len()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Splits every triangle that is flagged (by predicate or area limit)
    /// at its centroid; in build mode fans the input points.
    #[derive(Default)]
    struct CentroidMesher {
        calls: Mutex<Vec<String>>,
    }

    impl TriangleMesher for CentroidMesher {
        fn triangulate(
            &self,
            switches: &str,
            input: &MeshInput,
            predicate: Option<&dyn RefinementPredicate>,
        ) -> Result<MeshOutput, MesherError> {
            if let Ok(mut calls) = self.calls.lock() {
                calls.push(switches.to_string());
            }
            if input.points.len() < 3 {
                return Err(MesherError::InvalidInput("need at least 3 points".into()));
            }
            let mut points = input.points.clone();
            let elements = if switches.starts_with('r') {
                let mut out = Vec::new();
                for (e, tri) in input.elements.iter().enumerate() {
                    let xy = tri.map(|v| input.points.xy(v));
                    let area = triangle_area(&xy);
                    let limit = input.element_max_areas.get(e).copied().unwrap_or(-1.0);
                    let split = predicate.is_some_and(|p| p.needs_refinement(&xy, area))
                        || (limit >= 0.0 && area > limit);
                    if split {
                        let c = [
                            (xy[0][0] + xy[1][0] + xy[2][0]) / 3.0,
                            (xy[0][1] + xy[1][1] + xy[2][1]) / 3.0,
                        ];
                        let m = points.push(&c).map_err(|e| MesherError::Failed {
                            code: 1,
                            message: e.to_string(),
                        })?;
                        out.extend([[tri[0], tri[1], m], [tri[1], tri[2], m], [tri[2], tri[0], m]]);
                    } else {
                        out.push(*tri);
                    }
                }
                out
            } else {
                (1..input.points.len() - 1).map(|i| [0, i, i + 1]).collect()
            };
            Ok(MeshOutput {
                points,
                point_markers: Vec::new(),
                elements,
                segments: input.segments.clone(),
                segment_markers: input.segment_markers.clone(),
            })
        }
    }

    fn unit_square() -> MeshInput {
        let points = PointSet::from_2d([[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]]);
        let segments = vec![
            Segment::new(0, 1),
            Segment::new(1, 2),
            Segment::new(2, 3),
            Segment::new(3, 0),
        ];
        MeshInput::new(points, segments)
    }

    #[test]
    fn build_switches_follow_options() {
        assert_eq!(TriangulateOptions::default().build_switches(false).unwrap(), "pzjqQ");
        let opts = TriangulateOptions {
            min_angle: Some(30.0),
            max_area: Some(0.5),
            attributes: true,
            allow_boundary_steiner: false,
            ..Default::default()
        };
        assert_eq!(
            opts.build_switches(true).unwrap(),
            "pzjq30.000000QAa0.50000000000000000000uY"
        );
        let contradictory = TriangulateOptions {
            allow_volume_steiner: false,
            ..Default::default()
        };
        assert!(contradictory.build_switches(false).is_err());
        let strict = TriangulateOptions {
            allow_volume_steiner: false,
            allow_boundary_steiner: false,
            quality_meshing: false,
            verbose: true,
            ..Default::default()
        };
        assert_eq!(strict.build_switches(false).unwrap(), "pzjVVYY");
    }

    #[test]
    fn refine_and_tet_switches() {
        let opts = TriangulateOptions::default();
        assert_eq!(opts.refine_switches(true, true), "razjqpQu");
        assert_eq!(opts.refine_switches(false, false), "razjqQ");
        let tet = TetOptions {
            attributes: true,
            max_volume: Some(0.25),
            ..Default::default()
        };
        assert_eq!(tet.switches(), "pqAa0.25Q");
    }

    #[test]
    fn non_positive_limits_are_not_rendered() {
        for limit in [0.0, -1.0, f64::NAN] {
            let tri = TriangulateOptions {
                max_area: Some(limit),
                ..Default::default()
            };
            assert_eq!(tri.build_switches(false).unwrap(), "pzjqQ");
            let tet = TetOptions {
                max_volume: Some(limit),
                ..Default::default()
            };
            assert_eq!(tet.switches(), "pqQ");
        }
    }

    #[test]
    fn predicate_refinement_splits_large_triangles() {
        let driver = RefinementDriver::new(CentroidMesher::default(), TriangulateOptions::default());
        let built = driver.build(&unit_square(), None).unwrap();
        assert_eq!(built.elements.len(), 2);

        let refined = driver.refine(&built, &MaxArea(0.4)).unwrap();
        assert_eq!(refined.elements.len(), 6);
        assert_eq!(refined.points.len(), 6);

        let calls = driver.mesher.calls.lock().unwrap();
        assert_eq!(calls.as_slice(), ["pzjqQ", "razjqpQu"]);
    }

    #[test]
    fn closure_predicates_are_accepted() {
        let driver = RefinementDriver::new(CentroidMesher::default(), TriangulateOptions::default());
        let built = driver.build(&unit_square(), None).unwrap();
        let left_half = |tri: &[[f64; 2]; 3], _area: f64| tri.iter().all(|p| p[0] <= 0.5 || p[1] >= 0.5);
        let refined = driver.refine(&built, &left_half).unwrap();
        assert_eq!(refined.elements.len(), 4);
    }

    #[test]
    fn forced_refinement_uses_area_limits() {
        let driver = RefinementDriver::new(CentroidMesher::default(), TriangulateOptions::default());
        let built = driver.build(&unit_square(), None).unwrap();
        let refined = driver.refine_elements(&built, &[0.1, -1.0]).unwrap();
        assert_eq!(refined.elements.len(), 4);
        assert!(driver.refine_elements(&built, &[0.1]).is_err());
    }

    #[test]
    fn passes_stop_when_nothing_is_marked() {
        let driver = RefinementDriver::new(CentroidMesher::default(), TriangulateOptions::default());
        let built = driver.build(&unit_square(), None).unwrap();
        let report = driver.refine_passes(built.clone(), &MaxArea(0.1), 10).unwrap();
        // 0.5 -> 1/6 -> 1/18
        assert_eq!(report.passes, 2);
        assert_eq!(report.remaining, 0);
        assert_eq!(report.mesh.elements.len(), 18);

        let capped = driver.refine_passes(built, &MaxArea(0.1), 1).unwrap();
        assert_eq!(capped.passes, 1);
        assert_eq!(capped.remaining, 6);
    }

    #[test]
    fn mesher_errors_surface_verbatim() {
        let driver = RefinementDriver::new(CentroidMesher::default(), TriangulateOptions::default());
        let tiny = MeshInput::new(PointSet::from_2d([[0.0, 0.0], [1.0, 0.0]]), vec![]);
        assert_eq!(
            driver.build(&tiny, None).unwrap_err(),
            MeshSeamError::Mesher(MesherError::InvalidInput("need at least 3 points".into()))
        );
    }

    #[test]
    fn inconsistent_input_is_rejected_before_meshing() {
        let driver = RefinementDriver::new(CentroidMesher::default(), TriangulateOptions::default());
        let mut input = unit_square();
        input.segment_markers = vec![Marker::SHELL];
        assert!(matches!(
            driver.build(&input, None),
            Err(MeshSeamError::InvalidArgument(_))
        ));
        assert!(driver.mesher.calls.lock().unwrap().is_empty());
    }
}
