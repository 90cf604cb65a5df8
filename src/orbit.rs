//! Walking the darts of cells.
//!
//! An `i`-cell is the orbit of a dart under the relations that don't leave the cell:
//! for `i >= 2` that's every `β_k` with `k != i`,
//! for edges it's every `β_k` with `k >= 2`
//! (`β_0` is the inverse of `β_1`, so both of them are excluded),
//! and for vertices it's the compositions of two relations that keep the origin of a dart fixed,
//! namely `β_1 ∘ β_k`, `β_k ∘ β_0` and `β_j ∘ β_k` for `j, k >= 2`.
//! Free links are skipped, so cells on the boundary of an open map are walked as far as they go.

use crate::{
    map::{CombinatorialMap, DartId},
    mark::Mark,
    CmapError,
};

/// One generator of a cell's orbit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Step {
    /// Follow a single relation.
    Beta(usize),
    /// Follow the first relation, then the second.
    Then(usize, usize),
}

/// The generators of an `dim`-cell's orbit in a `map_dim`-dimensional map.
fn cell_steps(map_dim: usize, dim: usize) -> Vec<Step> {
    match dim {
        0 => {
            let mut steps = Vec::new();
            for k in 2..=map_dim {
                steps.push(Step::Then(k, 1));
                steps.push(Step::Then(0, k));
            }
            for k in 2..=map_dim {
                for j in 2..=map_dim {
                    if j != k {
                        steps.push(Step::Then(k, j));
                    }
                }
            }
            steps
        }
        1 => (2..=map_dim).map(Step::Beta).collect(),
        _ => (0..=map_dim)
            .filter(|&k| k != dim)
            .map(Step::Beta)
            .collect(),
    }
}

impl<const DIM: usize, const EMB: usize> CombinatorialMap<DIM, EMB> {
    #[inline]
    fn take_step(&self, step: Step, dart: DartId) -> Option<DartId> {
        match step {
            Step::Beta(k) => self.beta_raw(k, dart),
            Step::Then(first, second) => self
                .beta_raw(first, dart)
                .and_then(|d| self.beta_raw(second, d)),
        }
    }

    /// Mark and enqueue every not yet visited neighbour of `dart` along the given steps.
    fn expand(&self, steps: &[Step], dart: DartId, visited: &Mark, queue: &mut Vec<DartId>) {
        for &step in steps {
            if let Some(next) = self.take_step(step, dart) {
                if !visited.set(next) {
                    queue.push(next);
                }
            }
        }
    }

    /// Iterate over the darts of the `dim`-cell containing `dart`,
    /// in breadth-first order starting from `dart` itself.
    ///
    /// The iterator holds a mark for bookkeeping until it's dropped,
    /// so stopping early (e.g. with `any`) is cheap and leaves no marks behind.
    pub fn cell_darts(&self, dim: usize, dart: DartId) -> Result<CellDarts<'_, DIM, EMB>, CmapError> {
        self.check_dimension(dim)?;
        self.check_dart(dart)?;
        let visited = self.reserve_mark()?;
        visited.set(dart);
        Ok(CellDarts {
            map: self,
            steps: cell_steps(DIM, dim),
            visited,
            queue: vec![dart],
            head: 0,
        })
    }

    /// Collect the darts of the `dim`-cell containing `dart`.
    pub fn darts_of_cell(&self, dim: usize, dart: DartId) -> Result<Vec<DartId>, CmapError> {
        Ok(self.cell_darts(dim, dart)?.collect())
    }

    /// Check whether two darts belong to the same `dim`-cell.
    pub fn same_cell(&self, dim: usize, a: DartId, b: DartId) -> Result<bool, CmapError> {
        self.check_dart(b)?;
        Ok(self.cell_darts(dim, a)?.any(|d| d == b))
    }

    /// Set a mark on every dart of the `dim`-cell containing `dart`.
    /// Returns the number of darts that weren't already marked.
    pub fn mark_cell(&self, dim: usize, dart: DartId, mark: &Mark) -> Result<usize, CmapError> {
        Ok(self.cell_darts(dim, dart)?.filter(|&d| !mark.set(d)).count())
    }

    /// Clear a mark from every dart of the `dim`-cell containing `dart`.
    /// Returns the number of darts that were marked.
    pub fn unmark_cell(&self, dim: usize, dart: DartId, mark: &Mark) -> Result<usize, CmapError> {
        Ok(self.cell_darts(dim, dart)?.filter(|&d| mark.clear(d)).count())
    }

    /// Enumerate the `dim`-cells of the map.
    ///
    /// Live darts are visited in slot order,
    /// and each cell gets the next free index the first time one of its darts is seen.
    /// The enumeration is therefore stable as long as the map isn't mutated.
    pub fn cell_table(&self, dim: usize) -> Result<CellTable, CmapError> {
        self.check_dimension(dim)?;
        let steps = cell_steps(DIM, dim);
        let visited = self.reserve_mark()?;

        let mut representatives = Vec::new();
        let mut cell_of_dart = vec![None; self.slot_count()];
        let mut orbit = Vec::new();
        for start in self.darts() {
            if visited.set(start) {
                continue;
            }
            let cell_idx = representatives.len();
            representatives.push(start);

            orbit.clear();
            orbit.push(start);
            let mut head = 0;
            while let Some(&d) = orbit.get(head) {
                head += 1;
                cell_of_dart[d.index()] = Some(cell_idx);
                self.expand(&steps, d, &visited, &mut orbit);
            }
        }

        for d in self.darts() {
            visited.clear(d);
        }

        Ok(CellTable {
            dim,
            representatives,
            cell_of_dart,
        })
    }

    /// Get one dart from each `dim`-cell, in [`cell_table`][Self::cell_table] order.
    pub fn one_dart_per_cell(&self, dim: usize) -> Result<Vec<DartId>, CmapError> {
        Ok(self.cell_table(dim)?.representatives)
    }

    /// Count the `dim`-cells of the map.
    pub fn cell_count(&self, dim: usize) -> Result<usize, CmapError> {
        Ok(self.cell_table(dim)?.len())
    }
}

/// Iterator over the darts of one cell, see [`CombinatorialMap::cell_darts`].
#[derive(Debug)]
pub struct CellDarts<'a, const DIM: usize, const EMB: usize> {
    map: &'a CombinatorialMap<DIM, EMB>,
    steps: Vec<Step>,
    visited: Mark<'a>,
    /// every dart seen so far; the ones before `head` have been yielded
    queue: Vec<DartId>,
    head: usize,
}

impl<'a, const DIM: usize, const EMB: usize> Iterator for CellDarts<'a, DIM, EMB> {
    type Item = DartId;

    fn next(&mut self) -> Option<Self::Item> {
        let dart = *self.queue.get(self.head)?;
        self.head += 1;
        self.map
            .expand(&self.steps, dart, &self.visited, &mut self.queue);
        Some(dart)
    }
}

impl<const DIM: usize, const EMB: usize> Drop for CellDarts<'_, DIM, EMB> {
    fn drop(&mut self) {
        for &d in &self.queue {
            self.visited.clear(d);
        }
    }
}

/// Enumeration of the cells of one dimension,
/// produced by [`CombinatorialMap::cell_table`].
#[derive(Clone, Debug)]
pub struct CellTable {
    dim: usize,
    representatives: Vec<DartId>,
    /// index of the cell each dart slot belongs to, `None` for removed darts
    cell_of_dart: Vec<Option<usize>>,
}

impl CellTable {
    /// Dimension of the enumerated cells.
    #[inline]
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of cells.
    #[inline]
    pub fn len(&self) -> usize {
        self.representatives.len()
    }

    /// Whether there are no cells at all.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.representatives.is_empty()
    }

    /// One dart per cell, indexed by cell.
    #[inline]
    pub fn representatives(&self) -> &[DartId] {
        &self.representatives
    }

    /// Index of the cell a dart belongs to.
    #[inline]
    pub fn cell_of(&self, dart: DartId) -> Option<usize> {
        self.cell_of_dart.get(dart.index()).copied().flatten()
    }
}
