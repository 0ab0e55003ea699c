//! `PointSet`: dense, insertion-ordered mesh coordinates
//!
//! Points are stored once and referenced everywhere by `usize` index. A set
//! has a fixed embedding dimension of **2** or **3**. Internally every point
//! is padded to `[f64; 3]` (z = 0 for planar sets) so spatial queries can
//! treat both cases uniformly, while [`PointSet::get`] exposes exactly
//! `dimension` coordinates.

use serde::{Deserialize, Serialize};

use crate::mesh_error::MeshSeamError;

/// Dense coordinate storage for mesh points.
///
/// Deserialized sets are checked like constructed ones: the dimension must be
/// 2 or 3 and planar points must have a zero z coordinate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPointSet")]
pub struct PointSet {
    dimension: usize,
    coords: Vec<[f64; 3]>,
}

#[derive(Deserialize)]
struct RawPointSet {
    dimension: usize,
    coords: Vec<[f64; 3]>,
}

impl TryFrom<RawPointSet> for PointSet {
    type Error = MeshSeamError;

    fn try_from(raw: RawPointSet) -> Result<Self, Self::Error> {
        let mut set = PointSet::new(raw.dimension)?;
        if set.dimension == 2 {
            if let Some(idx) = raw.coords.iter().position(|p| p[2] != 0.0) {
                return Err(MeshSeamError::InvalidGeometry(format!(
                    "planar point {idx} has non-zero z"
                )));
            }
        }
        set.coords = raw.coords;
        Ok(set)
    }
}

impl PointSet {
    /// Creates an empty set with the given embedding dimension.
    pub fn new(dimension: usize) -> Result<Self, MeshSeamError> {
        if dimension != 2 && dimension != 3 {
            return Err(MeshSeamError::InvalidGeometry(format!(
                "unsupported point dimension: {dimension}"
            )));
        }
        Ok(Self {
            dimension,
            coords: Vec::new(),
        })
    }

    /// Builds a planar point set.
    pub fn from_2d<I>(points: I) -> Self
    where
        I: IntoIterator<Item = [f64; 2]>,
    {
        Self {
            dimension: 2,
            coords: points.into_iter().map(|[x, y]| [x, y, 0.0]).collect(),
        }
    }

    /// Builds a point set embedded in 3D.
    pub fn from_3d<I>(points: I) -> Self
    where
        I: IntoIterator<Item = [f64; 3]>,
    {
        Self {
            dimension: 3,
            coords: points.into_iter().collect(),
        }
    }

    /// Builds a point set from coordinate slices, checking each has `dimension`
    /// entries.
    pub fn from_slices<'a, I>(dimension: usize, points: I) -> Result<Self, MeshSeamError>
    where
        I: IntoIterator<Item = &'a [f64]>,
    {
        let mut set = Self::new(dimension)?;
        for (idx, p) in points.into_iter().enumerate() {
            if p.len() != dimension {
                return Err(MeshSeamError::InvalidGeometry(format!(
                    "point {idx} has dimension {}, expected {dimension}",
                    p.len()
                )));
            }
            set.push(p)?;
        }
        Ok(set)
    }

    /// Appends a point and returns its index.
    pub fn push(&mut self, point: &[f64]) -> Result<usize, MeshSeamError> {
        if point.len() != self.dimension {
            return Err(MeshSeamError::InvalidGeometry(format!(
                "point has dimension {}, expected {}",
                point.len(),
                self.dimension
            )));
        }
        let mut xyz = [0.0; 3];
        xyz[..self.dimension].copy_from_slice(point);
        self.coords.push(xyz);
        Ok(self.coords.len() - 1)
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.coords.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    /// Coordinates of point `idx`, `dimension` entries long.
    ///
    /// # Panics
    ///
    /// Panics if `idx` is out of range. Use [`PointSet::try_get`] for a
    /// checked lookup.
    #[inline]
    pub fn get(&self, idx: usize) -> &[f64] {
        &self.coords[idx][..self.dimension]
    }

    /// Checked variant of [`PointSet::get`].
    pub fn try_get(&self, idx: usize) -> Result<&[f64], MeshSeamError> {
        self.coords
            .get(idx)
            .map(|p| &p[..self.dimension])
            .ok_or(MeshSeamError::InvalidIndex {
                context: "point lookup",
                index: idx,
                len: self.coords.len(),
            })
    }

    /// Padded coordinates of point `idx`.
    #[inline]
    pub fn xyz(&self, idx: usize) -> [f64; 3] {
        self.coords[idx]
    }

    /// Planar coordinates of point `idx` (z is dropped).
    #[inline]
    pub fn xy(&self, idx: usize) -> [f64; 2] {
        let [x, y, _] = self.coords[idx];
        [x, y]
    }

    /// Iterates over padded coordinates in index order.
    pub fn iter(&self) -> impl Iterator<Item = &[f64; 3]> + '_ {
        self.coords.iter()
    }

    /// Squared Euclidean distance between two stored points.
    #[inline]
    pub fn distance_squared(&self, a: usize, b: usize) -> f64 {
        distance_squared(&self.coords[a], &self.coords[b])
    }

    /// Appends every point of `other`, which must share this set's dimension.
    pub fn extend_from(&mut self, other: &PointSet) -> Result<(), MeshSeamError> {
        if other.dimension != self.dimension {
            return Err(MeshSeamError::InvalidGeometry(format!(
                "cannot append {}D points to a {}D set",
                other.dimension, self.dimension
            )));
        }
        self.coords.extend_from_slice(&other.coords);
        Ok(())
    }

    /// Returns a new set keeping only the points whose index satisfies `keep`,
    /// in their original order.
    pub fn retain_indices<F>(&self, mut keep: F) -> PointSet
    where
        F: FnMut(usize) -> bool,
    {
        PointSet {
            dimension: self.dimension,
            coords: self
                .coords
                .iter()
                .enumerate()
                .filter_map(|(i, p)| keep(i).then_some(*p))
                .collect(),
        }
    }

    /// Applies `f` to every point in place.
    pub fn map_in_place<F>(&mut self, mut f: F)
    where
        F: FnMut(&mut [f64]),
    {
        let dim = self.dimension;
        for p in &mut self.coords {
            f(&mut p[..dim]);
        }
    }

    /// Axis-aligned bounding box `(min, max)`, or `None` for an empty set.
    pub fn bounding_box(&self) -> Option<([f64; 3], [f64; 3])> {
        let first = *self.coords.first()?;
        let mut lo = first;
        let mut hi = first;
        for p in &self.coords[1..] {
            for k in 0..3 {
                lo[k] = lo[k].min(p[k]);
                hi[k] = hi[k].max(p[k]);
            }
        }
        Some((lo, hi))
    }
}

/// Squared Euclidean distance between padded coordinates.
#[inline]
pub fn distance_squared(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    let dz = a[2] - b[2];
    dx * dx + dy * dy + dz * dz
}

/// Pads a 2- or 3-entry coordinate slice to `[f64; 3]`.
pub fn pad(point: &[f64]) -> Result<[f64; 3], MeshSeamError> {
    match *point {
        [x, y] => Ok([x, y, 0.0]),
        [x, y, z] => Ok([x, y, z]),
        _ => Err(MeshSeamError::InvalidGeometry(format!(
            "unsupported point dimension: {}",
            point.len()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_bad_dimension() {
        assert!(PointSet::new(1).is_err());
        assert!(PointSet::new(4).is_err());
        let mut set = PointSet::new(2).unwrap();
        assert!(set.push(&[1.0, 2.0, 3.0]).is_err());
        assert_eq!(set.push(&[1.0, 2.0]).unwrap(), 0);
        assert_eq!(set.get(0), &[1.0, 2.0]);
    }

    #[test]
    fn retain_keeps_order() {
        let set = PointSet::from_2d([[0.0, 0.0], [1.0, 0.0], [2.0, 0.0], [3.0, 0.0]]);
        let kept = set.retain_indices(|i| i % 2 == 1);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept.get(0), &[1.0, 0.0]);
        assert_eq!(kept.get(1), &[3.0, 0.0]);
    }

    #[test]
    fn bounding_box_of_planar_set() {
        let set = PointSet::from_2d([[1.0, -1.0], [-2.0, 4.0], [0.5, 0.5]]);
        let (lo, hi) = set.bounding_box().unwrap();
        assert_eq!(lo, [-2.0, -1.0, 0.0]);
        assert_eq!(hi, [1.0, 4.0, 0.0]);
        assert!(PointSet::new(3).unwrap().bounding_box().is_none());
    }

    #[test]
    fn deserialization_checks_dimension() {
        let set = PointSet::from_2d([[1.0, 2.0]]);
        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(serde_json::from_str::<PointSet>(&json).unwrap(), set);

        let four = r#"{"dimension":4,"coords":[[0.0,0.0,0.0]]}"#;
        assert!(serde_json::from_str::<PointSet>(four).is_err());
        let lifted = r#"{"dimension":2,"coords":[[0.0,0.0,1.0]]}"#;
        assert!(serde_json::from_str::<PointSet>(lifted).is_err());
    }
}
