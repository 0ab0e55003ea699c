//! Gmsh `.msh` reader.
//!
//! # Supported format
//! - ASCII `.msh` version **2.2**.
//! - Element types 1 (line), 2 (triangle) and 4 (tet) are kept; 3 (quad),
//!   5 (hex), 6 (prism), 7 (pyramid) and 15 (point) are skipped.
//!
//! # Limitations
//! - Binary files are not supported.
//! - `.msh` v4.x (block-based) is not supported.
//! - Higher-order elements are not supported.
//!
//! Gmsh node ids are arbitrary positive integers (usually 1-based). They are
//! renumbered to dense 0-based indices in file order; the original ids stay
//! available in [`GmshMesh::node_ids`]. The first element tag (the physical
//! group) becomes the element's [`Marker`].

use std::io::Read;

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::geometry::primitives::Marker;
use crate::mesh_error::MeshSeamError;
use crate::topology::mesh::{TetMesh, TriMesh};
use crate::topology::point::PointSet;
use crate::topology::segment::Segment;

/// Reader configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GmshReadOptions {
    /// Store points as 2D when every z coordinate is zero.
    pub planar: bool,
}

impl Default for GmshReadOptions {
    fn default() -> Self {
        Self { planar: true }
    }
}

/// Mesh content of a `.msh` file, grouped by element kind.
#[derive(Clone, Debug, PartialEq)]
pub struct GmshMesh {
    pub points: PointSet,
    /// External id of each point.
    pub node_ids: Vec<u64>,
    pub lines: Vec<Segment>,
    pub line_markers: Vec<Marker>,
    pub triangles: Vec<[usize; 3]>,
    pub triangle_markers: Vec<Marker>,
    pub tetrahedra: Vec<[usize; 4]>,
    pub tetrahedron_markers: Vec<Marker>,
}

impl GmshMesh {
    pub fn triangle_mesh(&self) -> Result<TriMesh, MeshSeamError> {
        TriMesh::new(self.points.clone(), self.triangles.clone())
    }

    pub fn tet_mesh(&self) -> Result<TetMesh, MeshSeamError> {
        TetMesh::new(self.points.clone(), self.tetrahedra.clone())
    }

    /// Line elements carrying `marker`.
    pub fn lines_with_marker(&self, marker: Marker) -> Vec<Segment> {
        self.lines
            .iter()
            .zip(&self.line_markers)
            .filter_map(|(s, &m)| (m == marker).then_some(*s))
            .collect()
    }
}

/// Gmsh `.msh` reader for ASCII v2.2 meshes.
#[derive(Debug, Default, Clone)]
pub struct GmshReader;

fn parse_err(message: impl Into<String>) -> MeshSeamError {
    MeshSeamError::MeshIoParse(message.into())
}

impl GmshReader {
    fn parse_version(line: &str) -> Result<&str, MeshSeamError> {
        let mut parts = line.split_whitespace();
        let version = parts
            .next()
            .ok_or_else(|| parse_err("missing mesh format version"))?;
        let file_type = parts
            .next()
            .ok_or_else(|| parse_err("missing mesh format type"))?;
        if file_type != "0" {
            return Err(parse_err("binary .msh files are not supported"));
        }
        Ok(version)
    }

    fn element_node_count(elem_type: u32) -> Option<usize> {
        match elem_type {
            1 => Some(2),  // line
            2 => Some(3),  // triangle
            3 => Some(4),  // quad
            4 => Some(4),  // tet
            5 => Some(8),  // hex
            6 => Some(6),  // prism
            7 => Some(5),  // pyramid
            15 => Some(1), // point
            _ => None,
        }
    }

    fn parse_count(raw: &str, what: &str) -> Result<usize, MeshSeamError> {
        raw.trim()
            .parse::<usize>()
            .map_err(|_| parse_err(format!("invalid {what}: {raw}")))
    }

    fn parse_id(raw: Option<&str>, what: &str) -> Result<u64, MeshSeamError> {
        let raw = raw.ok_or_else(|| parse_err(format!("missing {what}")))?;
        raw.parse::<u64>()
            .map_err(|_| parse_err(format!("invalid {what}: {raw}")))
    }

    fn parse_coord(raw: Option<&str>, axis: char) -> Result<f64, MeshSeamError> {
        let raw = raw.ok_or_else(|| parse_err(format!("missing {axis} coordinate")))?;
        raw.parse::<f64>()
            .map_err(|_| parse_err(format!("invalid coordinate: {raw}")))
    }

    fn expect_end<'a, I>(lines: &mut I, tag: &str) -> Result<(), MeshSeamError>
    where
        I: Iterator<Item = &'a str>,
    {
        match lines.next() {
            Some(end) if end.trim() == tag => Ok(()),
            _ => Err(parse_err(format!("missing {tag}"))),
        }
    }

    /// Parse a mesh with default options.
    pub fn read<R: Read>(&self, reader: R) -> Result<GmshMesh, MeshSeamError> {
        self.read_with_options(reader, GmshReadOptions::default())
    }

    pub fn read_with_options<R: Read>(
        &self,
        mut reader: R,
        options: GmshReadOptions,
    ) -> Result<GmshMesh, MeshSeamError> {
        let mut contents = String::new();
        reader.read_to_string(&mut contents)?;
        let mut lines = contents.lines();

        let mut version: Option<String> = None;
        let mut coords: Vec<[f64; 3]> = Vec::new();
        let mut node_ids: Vec<u64> = Vec::new();
        let mut index_of: HashMap<u64, usize> = HashMap::new();
        let mut raw_elements: Vec<(u32, Marker, Vec<u64>)> = Vec::new();

        while let Some(line) = lines.next() {
            match line.trim() {
                "$MeshFormat" => {
                    let format_line = lines.next().ok_or_else(|| parse_err("missing MeshFormat"))?;
                    version = Some(Self::parse_version(format_line)?.to_string());
                    Self::expect_end(&mut lines, "$EndMeshFormat")?;
                }
                "$Nodes" => {
                    let count_line = lines.next().ok_or_else(|| parse_err("missing node count"))?;
                    let node_count = Self::parse_count(count_line, "node count")?;
                    for _ in 0..node_count {
                        let node_line = lines
                            .next()
                            .ok_or_else(|| parse_err("unexpected end of node list"))?;
                        let mut parts = node_line.split_whitespace();
                        let id = Self::parse_id(parts.next(), "node id")?;
                        let x = Self::parse_coord(parts.next(), 'x')?;
                        let y = Self::parse_coord(parts.next(), 'y')?;
                        let z = Self::parse_coord(parts.next(), 'z')?;
                        if index_of.insert(id, coords.len()).is_some() {
                            return Err(parse_err(format!("duplicate node id: {id}")));
                        }
                        node_ids.push(id);
                        coords.push([x, y, z]);
                    }
                    Self::expect_end(&mut lines, "$EndNodes")?;
                }
                "$Elements" => {
                    let count_line = lines
                        .next()
                        .ok_or_else(|| parse_err("missing element count"))?;
                    let elem_count = Self::parse_count(count_line, "element count")?;
                    for _ in 0..elem_count {
                        let elem_line = lines
                            .next()
                            .ok_or_else(|| parse_err("unexpected end of element list"))?;
                        let mut parts = elem_line.split_whitespace();
                        Self::parse_id(parts.next(), "element id")?;
                        let elem_type = parts
                            .next()
                            .ok_or_else(|| parse_err("missing element type"))?
                            .parse::<u32>()
                            .map_err(|_| parse_err("invalid element type"))?;
                        let node_count = Self::element_node_count(elem_type)
                            .ok_or_else(|| parse_err(format!("unsupported element type: {elem_type}")))?;
                        let num_tags = Self::parse_count(
                            parts.next().ok_or_else(|| parse_err("missing element tag count"))?,
                            "element tag count",
                        )?;
                        let mut marker = Marker::NONE;
                        for t in 0..num_tags {
                            let tag = parts.next().ok_or_else(|| parse_err("missing element tag"))?;
                            if t == 0 {
                                marker = Marker(
                                    tag.parse::<i32>()
                                        .map_err(|_| parse_err(format!("invalid element tag: {tag}")))?,
                                );
                            }
                        }
                        let conn = (0..node_count)
                            .map(|_| Self::parse_id(parts.next(), "element node id"))
                            .collect::<Result<Vec<_>, _>>()?;
                        raw_elements.push((elem_type, marker, conn));
                    }
                    Self::expect_end(&mut lines, "$EndElements")?;
                }
                _ => {
                    // ignore other sections
                }
            }
        }

        let version = version.unwrap_or_else(|| "2.2".to_string());
        if version != "2.2" {
            return Err(parse_err(format!("unsupported gmsh version: {version}")));
        }

        let points = if options.planar && coords.iter().all(|p| p[2] == 0.0) {
            PointSet::from_2d(coords.iter().map(|&[x, y, _]| [x, y]))
        } else {
            PointSet::from_3d(coords)
        };
        let mut mesh = GmshMesh {
            points,
            node_ids,
            lines: Vec::new(),
            line_markers: Vec::new(),
            triangles: Vec::new(),
            triangle_markers: Vec::new(),
            tetrahedra: Vec::new(),
            tetrahedron_markers: Vec::new(),
        };

        let mut skipped = 0usize;
        for (elem_type, marker, conn) in raw_elements {
            let local = conn
                .iter()
                .map(|id| {
                    index_of
                        .get(id)
                        .copied()
                        .ok_or_else(|| parse_err(format!("element references unknown node {id}")))
                })
                .collect::<Result<Vec<_>, _>>()?;
            match (elem_type, local.as_slice()) {
                (1, &[a, b]) => {
                    mesh.lines.push(Segment::new(a, b));
                    mesh.line_markers.push(marker);
                }
                (2, &[a, b, c]) => {
                    mesh.triangles.push([a, b, c]);
                    mesh.triangle_markers.push(marker);
                }
                (4, &[a, b, c, d]) => {
                    mesh.tetrahedra.push([a, b, c, d]);
                    mesh.tetrahedron_markers.push(marker);
                }
                _ => skipped += 1,
            }
        }
        if skipped > 0 {
            log::debug!("gmsh: skipped {skipped} elements of unsupported kind");
        }
        Ok(mesh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_TRIANGLES: &str = r#"$MeshFormat
2.2 0 8
$EndMeshFormat
$Nodes
4
10 0 0 0
11 1 0 0
12 1 1 0
13 0 1 0
$EndNodes
$Elements
5
1 15 2 0 1 10
2 1 2 7 1 10 11
3 1 2 8 1 11 12
4 2 2 1 1 10 11 12
5 2 2 1 1 10 12 13
$EndElements
"#;

    #[test]
    fn ids_are_renumbered_and_tags_kept() {
        let mesh = GmshReader.read(TWO_TRIANGLES.as_bytes()).unwrap();
        assert_eq!(mesh.points.dimension(), 2);
        assert_eq!(mesh.node_ids, vec![10, 11, 12, 13]);
        assert_eq!(mesh.triangles, vec![[0, 1, 2], [0, 2, 3]]);
        assert_eq!(mesh.triangle_markers, vec![Marker(1), Marker(1)]);
        assert_eq!(mesh.lines_with_marker(Marker(8)), vec![Segment::new(1, 2)]);
        assert_eq!(mesh.triangle_mesh().unwrap().element_count(), 2);
    }

    #[test]
    fn planar_detection_can_be_disabled() {
        let mesh = GmshReader
            .read_with_options(TWO_TRIANGLES.as_bytes(), GmshReadOptions { planar: false })
            .unwrap();
        assert_eq!(mesh.points.dimension(), 3);
    }

    #[test]
    fn unknown_node_reference_is_a_parse_error() {
        let broken = TWO_TRIANGLES.replace("1 10 12 13", "1 10 12 99");
        assert!(matches!(
            GmshReader.read(broken.as_bytes()),
            Err(MeshSeamError::MeshIoParse(_))
        ));
    }

    #[test]
    fn binary_and_v4_are_rejected() {
        let binary = TWO_TRIANGLES.replace("2.2 0 8", "2.2 1 8");
        assert!(GmshReader.read(binary.as_bytes()).is_err());
        let v4 = TWO_TRIANGLES.replace("2.2 0 8", "4.1 0 8");
        assert!(matches!(
            GmshReader.read(v4.as_bytes()),
            Err(MeshSeamError::MeshIoParse(_))
        ));
    }
}
