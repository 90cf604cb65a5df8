//! The dart store, i.e. the combinatorial map itself.

/// Small hand-built maps used in tests throughout the crate.
#[doc(hidden)]
pub mod fixtures;

//

use fixedbitset as fb;
use nalgebra as na;

use std::cell::RefCell;

use crate::{
    mark::{Mark, MarkPool},
    CmapError,
};

/// Handle to a dart in a [`CombinatorialMap`].
///
/// This is just the index of the dart's slot in the map.
/// Slots of removed darts are never reused,
/// so a handle to a removed dart is reliably reported as dangling.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DartId(pub(crate) usize);

impl DartId {
    /// The index of the dart's slot in its map.
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

/// Map from relation index `i` to the index of its inverse relation.
///
/// `β_0` and `β_1` are inverses of each other,
/// every higher relation is an involution and thus its own inverse.
#[inline]
pub fn inverse(i: usize) -> usize {
    if i > 1 {
        i
    } else {
        1 - i
    }
}

/// A `DIM`-dimensional combinatorial map
/// with optional points in `EMB`-dimensional space attached to its vertices.
///
/// Every dart has one link per relation `β_0..=β_DIM`.
/// `β_1` takes a dart to the next dart of its face and `β_0` back to the previous one,
/// while `β_i` for `i >= 2` links a dart to the dart of the neighbouring `i`-cell
/// that shares its `(i-1)`-cell. A link may be free, which marks a boundary.
///
/// Queries take `&self`; the only state they touch is the pool of marks,
/// which lives behind a `RefCell`. Consequently a map cannot be shared between threads.
#[derive(Debug)]
pub struct CombinatorialMap<const DIM: usize, const EMB: usize> {
    /// links of every dart stored in a flat Vec to avoid generics for dimension,
    /// `DIM + 1` entries per dart
    links: Vec<Option<DartId>>,
    /// slots still holding a dart
    alive: fb::FixedBitSet,
    /// index into `points` for the vertex of each dart.
    /// all darts of a 0-cell share the same index
    vertex_points: Vec<Option<usize>>,
    points: Vec<na::SVector<f64, EMB>>,
    marks: RefCell<MarkPool>,
}

/// A 2-map with vertices in 3D space, i.e. a surface.
pub type SurfaceMap = CombinatorialMap<2, 3>;
/// A 3-map with vertices in 3D space, i.e. a volume mesh.
pub type VolumeMap = CombinatorialMap<3, 3>;

impl<const DIM: usize, const EMB: usize> Clone for CombinatorialMap<DIM, EMB> {
    /// Marks held on the original don't carry over; the copy starts with every mark free.
    fn clone(&self) -> Self {
        Self {
            links: self.links.clone(),
            alive: self.alive.clone(),
            vertex_points: self.vertex_points.clone(),
            points: self.points.clone(),
            marks: RefCell::new(MarkPool::default()),
        }
    }
}

impl<const DIM: usize, const EMB: usize> Default for CombinatorialMap<DIM, EMB> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const DIM: usize, const EMB: usize> CombinatorialMap<DIM, EMB> {
    /// Create an empty map.
    pub fn new() -> Self {
        Self {
            links: Vec::new(),
            alive: fb::FixedBitSet::new(),
            vertex_points: Vec::new(),
            points: Vec::new(),
            marks: RefCell::new(MarkPool::default()),
        }
    }

    /// The dimension of the map.
    #[inline]
    pub fn dimension(&self) -> usize {
        DIM
    }

    /// The dimension of the space vertex points live in.
    #[inline]
    pub fn ambient_dimension(&self) -> usize {
        EMB
    }

    /// Number of live darts.
    #[inline]
    pub fn dart_count(&self) -> usize {
        self.alive.count_ones(..)
    }

    /// Number of dart slots ever created, including removed ones.
    #[inline]
    pub(crate) fn slot_count(&self) -> usize {
        self.vertex_points.len()
    }

    /// Iterate over all live darts in slot order.
    pub fn darts(&self) -> impl Iterator<Item = DartId> + '_ {
        self.alive.ones().map(DartId)
    }

    /// Check whether a handle refers to a live dart of this map.
    #[inline]
    pub fn contains(&self, dart: DartId) -> bool {
        self.alive.contains(dart.0)
    }

    #[inline]
    pub(crate) fn check_dart(&self, dart: DartId) -> Result<(), CmapError> {
        if self.contains(dart) {
            Ok(())
        } else {
            Err(CmapError::DanglingHandle(dart))
        }
    }

    #[inline]
    pub(crate) fn check_dimension(&self, dim: usize) -> Result<(), CmapError> {
        if dim <= DIM {
            Ok(())
        } else {
            Err(CmapError::InvalidDimension { dim, max: DIM })
        }
    }

    /// Reserve a mark from the map's pool.
    ///
    /// The mark is released when the returned guard is dropped.
    /// Up to [`MAX_MARKS`][crate::mark::MAX_MARKS] marks can be held at once,
    /// including the ones queries reserve internally.
    #[inline]
    pub fn reserve_mark(&self) -> Result<Mark<'_>, CmapError> {
        Mark::reserve(&self.marks)
    }

    /// Number of marks currently reserved.
    #[inline]
    pub fn reserved_marks(&self) -> usize {
        self.marks.borrow().reserved_count()
    }

    //
    // links
    //

    /// Follow relation `i` from a dart. `None` means the link is free.
    pub fn beta(&self, i: usize, dart: DartId) -> Result<Option<DartId>, CmapError> {
        self.check_dimension(i)?;
        self.check_dart(dart)?;
        Ok(self.beta_raw(i, dart))
    }

    /// Check whether the link of a dart for relation `i` is free.
    pub fn is_free(&self, i: usize, dart: DartId) -> Result<bool, CmapError> {
        Ok(self.beta(i, dart)?.is_none())
    }

    /// Link lookup without validation, for use after handles have been checked.
    #[inline]
    pub(crate) fn beta_raw(&self, i: usize, dart: DartId) -> Option<DartId> {
        self.links[dart.0 * (DIM + 1) + i]
    }

    #[inline]
    fn set_link(&mut self, i: usize, dart: DartId, target: Option<DartId>) {
        self.links[dart.0 * (DIM + 1) + i] = target;
    }

    //
    // construction
    //

    /// Create a new dart with every link free.
    pub fn create_dart(&mut self) -> DartId {
        let dart = DartId(self.vertex_points.len());
        self.links.extend(std::iter::repeat(None).take(DIM + 1));
        self.vertex_points.push(None);
        self.alive.grow(dart.0 + 1);
        self.alive.insert(dart.0);
        dart
    }

    /// Create `n` darts linked into a single face by `β_1`.
    /// Returns the first one; the rest follow it along `β_1`.
    ///
    /// A face needs at least one dart, so `n = 0` fails with
    /// [`IncompatibleSew`][CmapError::IncompatibleSew].
    pub fn make_polygon(&mut self, n: usize) -> Result<DartId, CmapError> {
        self.check_dimension(1)?;
        let darts: Vec<DartId> = (0..n).map(|_| self.create_dart()).collect();
        let Some(&first) = darts.first() else {
            return Err(CmapError::IncompatibleSew { left: 0, right: 0 });
        };
        for (i, &dart) in darts.iter().enumerate() {
            self.link(1, dart, darts[(i + 1) % n])?;
        }
        Ok(first)
    }

    /// Link two single darts along relation `i`.
    ///
    /// For `i = 1` this makes `b` follow `a` in their face (and `a` precede `b`),
    /// `i = 0` is the same with the roles swapped,
    /// and for `i >= 2` the darts become each other's `β_i`.
    /// Vertex points are merged as described in [`sew`][Self::sew].
    pub fn link(&mut self, i: usize, a: DartId, b: DartId) -> Result<(), CmapError> {
        self.check_dimension(i)?;
        // a 0-map has no β_1 to pair β_0 with
        self.check_dimension(inverse(i))?;
        self.check_dart(a)?;
        self.check_dart(b)?;
        if self.beta_raw(i, a).is_some() {
            return Err(CmapError::AlreadySewn { relation: i, dart: a });
        }
        if self.beta_raw(inverse(i), b).is_some() {
            return Err(CmapError::AlreadySewn {
                relation: inverse(i),
                dart: b,
            });
        }

        self.set_link(i, a, Some(b));
        self.set_link(inverse(i), b, Some(a));
        self.merge_vertex_points(&[a, b])
    }

    /// Sew two darts together along relation `i`.
    ///
    /// For `i <= 2` this is the same as [`link`][Self::link].
    /// For `i >= 3` whole faces are sewn:
    /// the face of `a` walked forwards along `β_1`
    /// is paired dart by dart with the face of `b` walked backwards along `β_0`,
    /// so that the two faces meet with opposite orientations.
    ///
    /// Sewing merges vertices. A merged vertex keeps the first point
    /// found when walking it from the sewn darts;
    /// a vertex without a point adopts the point of the vertex it was merged with.
    pub fn sew(&mut self, i: usize, a: DartId, b: DartId) -> Result<(), CmapError> {
        self.check_dimension(i)?;
        if i <= 2 {
            return self.link(i, a, b);
        }
        self.check_dart(a)?;
        self.check_dart(b)?;

        let left = self.face_walk(a, 1);
        let right = self.face_walk(b, 0);
        if left.len() != right.len() {
            return Err(CmapError::IncompatibleSew {
                left: left.len(),
                right: right.len(),
            });
        }
        // check everything before touching anything so a failed sew changes nothing
        for (&l, &r) in left.iter().zip(&right) {
            if self.beta_raw(i, l).is_some() {
                return Err(CmapError::AlreadySewn { relation: i, dart: l });
            }
            if self.beta_raw(i, r).is_some() {
                return Err(CmapError::AlreadySewn { relation: i, dart: r });
            }
        }
        for (&l, &r) in left.iter().zip(&right) {
            self.set_link(i, l, Some(r));
            self.set_link(i, r, Some(l));
        }
        let touched: Vec<DartId> = left.into_iter().chain(right).collect();
        self.merge_vertex_points(&touched)
    }

    /// Darts of a face in the order reached by repeatedly following relation `dir`
    /// (1 for forwards, 0 for backwards), stopping at a free link or back at the start.
    fn face_walk(&self, start: DartId, dir: usize) -> Vec<DartId> {
        let mut face = vec![start];
        let mut curr = start;
        while let Some(next) = self.beta_raw(dir, curr) {
            if next == start {
                break;
            }
            face.push(next);
            curr = next;
        }
        face
    }

    /// Free the link of `dart` along relation `i`, along with the link pointing back to it.
    /// Does nothing if the link is already free.
    ///
    /// Vertex points are left as they were,
    /// so both halves of a split vertex keep the point.
    pub fn unsew(&mut self, i: usize, dart: DartId) -> Result<(), CmapError> {
        self.check_dimension(i)?;
        self.check_dart(dart)?;
        if let Some(other) = self.beta_raw(i, dart) {
            self.set_link(i, dart, None);
            self.set_link(inverse(i), other, None);
        }
        Ok(())
    }

    /// Remove a dart from the map, freeing every link that points to it.
    pub fn remove_dart(&mut self, dart: DartId) -> Result<(), CmapError> {
        self.check_dart(dart)?;
        for i in 0..=DIM {
            if let Some(other) = self.beta_raw(i, dart) {
                if other != dart {
                    self.set_link(inverse(i), other, None);
                }
                self.set_link(i, dart, None);
            }
        }
        self.vertex_points[dart.0] = None;
        self.alive.set(dart.0, false);
        self.marks.get_mut().forget(dart);
        Ok(())
    }

    //
    // vertex points
    //

    /// Attach a point to the vertex (0-cell) of a dart.
    ///
    /// Every dart of the vertex sees the same point,
    /// regardless of which one is used to look it up.
    ///
    /// A point already owned by this vertex alone is overwritten in place.
    /// Halves of a vertex split by [`unsew`][Self::unsew] share their point
    /// until one of them is given a new one.
    /// Points dropped when sewing merges two vertices are not reclaimed.
    pub fn set_point(
        &mut self,
        dart: DartId,
        point: na::SVector<f64, EMB>,
    ) -> Result<(), CmapError> {
        let vertex = self.darts_of_cell(0, dart)?;
        let owned = self.vertex_points[dart.0].filter(|&idx| {
            let users = self.vertex_points.iter().filter(|p| **p == Some(idx)).count();
            let own_users = vertex
                .iter()
                .filter(|d| self.vertex_points[d.0] == Some(idx))
                .count();
            users == own_users
        });
        let point_idx = match owned {
            Some(idx) => {
                self.points[idx] = point;
                idx
            }
            None => {
                self.points.push(point);
                self.points.len() - 1
            }
        };
        for d in vertex {
            self.vertex_points[d.0] = Some(point_idx);
        }
        Ok(())
    }

    /// Get the point attached to the vertex of a dart, if any.
    pub fn point(&self, dart: DartId) -> Result<Option<&na::SVector<f64, EMB>>, CmapError> {
        self.check_dart(dart)?;
        Ok(self.vertex_points[dart.0].map(|idx| &self.points[idx]))
    }

    /// After sewing, make every vertex touching the given darts agree on one point.
    fn merge_vertex_points(&mut self, touched: &[DartId]) -> Result<(), CmapError> {
        // neighbours along β_1 and β_0 have their origins at the ends of the sewn edges
        let mut seeds = Vec::with_capacity(touched.len() * 3);
        for &d in touched {
            seeds.push(d);
            seeds.extend(self.beta_raw(1, d));
            seeds.extend(self.beta_raw(0, d));
        }

        for seed in seeds {
            let vertex = self.darts_of_cell(0, seed)?;
            let Some(kept) = vertex.iter().find_map(|d| self.vertex_points[d.0]) else {
                continue;
            };
            for d in vertex {
                match self.vertex_points[d.0] {
                    Some(p) if p == kept => {}
                    Some(p) => {
                        if self.points[p] != self.points[kept] {
                            log::warn!(
                                "sewing merged vertices with different points {:?} and {:?}, keeping the first",
                                self.points[kept].as_slice(),
                                self.points[p].as_slice(),
                            );
                        }
                        self.vertex_points[d.0] = Some(kept);
                    }
                    None => {
                        log::trace!("dart {} adopts point {kept}", d.0);
                        self.vertex_points[d.0] = Some(kept);
                    }
                }
            }
        }
        Ok(())
    }
}
