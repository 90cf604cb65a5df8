//! Incidence and adjacency between cells.
//!
//! Both queries work the same way:
//! the darts of one cell are marked,
//! the other cell is walked looking for a marked dart (or a dart one step away from one),
//! and the first cell is unmarked again before returning.

use crate::{
    map::{inverse, CombinatorialMap, DartId},
    mark::Mark,
    CmapError,
};

impl<const DIM: usize, const EMB: usize> CombinatorialMap<DIM, EMB> {
    /// Check whether the `i`-cell of `dart_i` and the `j`-cell of `dart_j` share a dart.
    ///
    /// The result doesn't depend on the order of the arguments,
    /// but marking the cell with fewer darts (i.e. passing it first) is faster.
    pub fn incident(
        &self,
        i: usize,
        dart_i: DartId,
        j: usize,
        dart_j: DartId,
    ) -> Result<bool, CmapError> {
        self.check_dimension(i)?;
        self.check_dimension(j)?;
        self.check_dart(dart_i)?;
        self.check_dart(dart_j)?;

        let mark = self.reserve_mark()?;
        let marked = self.darts_of_cell(i, dart_i)?;
        for &d in &marked {
            mark.set(d);
        }

        let result = self
            .cell_darts(j, dart_j)
            .map(|mut other| other.any(|d| mark.test(d)));

        unmark_all(&mark, &marked);
        result
    }

    /// Check whether the `i`-cells of `dart_1` and `dart_2` are adjacent,
    /// i.e. connected by a single step along a relation.
    ///
    /// - Vertices are adjacent if any relation takes a dart of one
    ///   to a dart of the other (which means they share an edge).
    /// - Edges are adjacent if `β_1` or `β_0` does,
    ///   making them consecutive in some face.
    /// - Higher cells are adjacent if `β_i` does,
    ///   making them neighbours across an `(i-1)`-cell.
    ///
    /// A cell is never considered adjacent to itself:
    /// if both darts are in the same cell, the result is `false`
    /// even when the cell wraps around to touch itself.
    pub fn adjacent(&self, i: usize, dart_1: DartId, dart_2: DartId) -> Result<bool, CmapError> {
        self.check_dimension(i)?;
        self.check_dart(dart_1)?;
        self.check_dart(dart_2)?;

        let mark = self.reserve_mark()?;
        let marked = self.darts_of_cell(i, dart_1)?;
        for &d in &marked {
            mark.set(d);
        }

        let result = if mark.test(dart_2) {
            log::trace!("{i}-cell of {dart_2:?} tested for adjacency with itself");
            Ok(false)
        } else {
            self.steps_into_marked(i, dart_2, &mark)
        };

        unmark_all(&mark, &marked);
        result
    }

    /// Walk the `i`-cell of `dart` and check whether
    /// one of the relations witnessing `i`-adjacency leads to a marked dart.
    fn steps_into_marked(&self, i: usize, dart: DartId, mark: &Mark) -> Result<bool, CmapError> {
        let relations = adjacency_relations(DIM, i);
        Ok(self.cell_darts(i, dart)?.any(|d| {
            relations
                .iter()
                .any(|&k| self.beta_raw(k, d).is_some_and(|next| mark.test(next)))
        }))
    }

    /// Get one dart from every `i`-cell adjacent to the `i`-cell of `dart`,
    /// in [`cell_table`][Self::cell_table] order.
    pub fn neighbours(&self, i: usize, dart: DartId) -> Result<Vec<DartId>, CmapError> {
        self.check_dart(dart)?;
        let table = self.cell_table(i)?;
        let own_cell = table.cell_of(dart);

        let mut neighbours = Vec::new();
        for (cell_idx, &rep) in table.representatives().iter().enumerate() {
            if Some(cell_idx) != own_cell && self.adjacent(i, dart, rep)? {
                neighbours.push(rep);
            }
        }
        Ok(neighbours)
    }
}

/// The relations that connect adjacent `i`-cells.
fn adjacency_relations(map_dim: usize, i: usize) -> Vec<usize> {
    match i {
        0 => (0..=map_dim).collect(),
        1 => vec![1, inverse(1)],
        _ => vec![i],
    }
}

fn unmark_all(mark: &Mark, darts: &[DartId]) {
    for &d in darts {
        mark.clear(d);
    }
}
