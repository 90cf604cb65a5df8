//! Exporting the topology of a map as a layered incidence graph.
//!
//! Every cell gets a label `"<dim>_<index>"`,
//! where the index is its position in the [`cell_table`][CombinatorialMap::cell_table]
//! enumeration of its dimension.
//! The graph connects each `(d+1)`-cell to the `d`-cells it is incident to.
//!
//! # File formats
//!
//! The incidence graph file starts with a line of cell counts per dimension,
//! followed by one `"<higher label>, <lower label>"` line per incident pair:
//! ```text
//! 3, 3, 1
//! 1_0, 0_0
//! 1_1, 0_1
//! 1_2, 0_2
//! 2_0, 1_0
//! 2_0, 1_1
//! 2_0, 1_2
//! ```
//! The vertex file has one line of comma-separated coordinates per vertex,
//! in the same order as the vertex labels,
//! so line `k` holds the point of vertex `0_k`.
//! Neither file ends in a newline.

use itertools::Itertools;
use nalgebra as na;
use nalgebra_sparse as nas;

use std::{
    ffi::OsString,
    fmt, fs,
    io::{self, Write},
    path::{Path, PathBuf},
    str::FromStr,
};

use crate::{map::CombinatorialMap, orbit::CellTable, CmapError};

/// Label of a cell in an exported incidence graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellLabel {
    /// Dimension of the cell.
    pub dim: usize,
    /// Index of the cell among the cells of its dimension.
    pub index: usize,
}

impl CellLabel {
    /// Create a label.
    #[inline]
    pub fn new(dim: usize, index: usize) -> Self {
        Self { dim, index }
    }
}

impl fmt::Display for CellLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.dim, self.index)
    }
}

impl FromStr for CellLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (dim, index) = s
            .split_once('_')
            .ok_or_else(|| format!("expected a label like `1_0`, got `{s}`"))?;
        let dim = dim
            .parse()
            .map_err(|e| format!("invalid dimension in label `{s}`: {e}"))?;
        let index = index
            .parse()
            .map_err(|e| format!("invalid index in label `{s}`: {e}"))?;
        Ok(Self { dim, index })
    }
}

/// Options for [`CombinatorialMap::export`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExportSettings {
    /// Highest dimension of cells to include in the incidence graph.
    /// `None` means the dimension of the map.
    pub max_dimension: Option<usize>,
    /// Number of decimals to write vertex coordinates with.
    /// `None` uses the shortest representation that reads back to the same value.
    pub coordinate_precision: Option<usize>,
}

/// The cells of a map and the incidences between consecutive dimensions.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IncidenceGraph {
    /// Number of cells of each dimension, starting from vertices.
    pub counts: Vec<usize>,
    /// Incident pairs as `(higher, lower)`, where `higher.dim == lower.dim + 1`.
    ///
    /// Ordered by dimension first, then by the index of the higher cell,
    /// then by the index of the lower cell.
    pub edges: Vec<(CellLabel, CellLabel)>,
}

impl IncidenceGraph {
    /// Highest dimension of cells in the graph.
    #[inline]
    pub fn max_dimension(&self) -> usize {
        self.counts.len().saturating_sub(1)
    }

    /// Iterate over the labels of the cells on the boundary of a cell.
    pub fn boundary_of(&self, cell: CellLabel) -> impl Iterator<Item = CellLabel> + '_ {
        self.edges
            .iter()
            .filter(move |(higher, _)| *higher == cell)
            .map(|(_, lower)| *lower)
    }

    /// For every `high_dim`-cell, collect the indices of the `low_dim`-cells
    /// reachable by following incidences downwards,
    /// e.g. the vertices of every face for `closure(2, 0)`.
    ///
    /// Each list is sorted and free of duplicates.
    /// An edge that doesn't fit the cell counts is reported as a [`Parse`][CmapError::Parse] error
    /// on the line it would have in the file format.
    pub fn closure(&self, high_dim: usize, low_dim: usize) -> Result<Vec<Vec<usize>>, CmapError> {
        let max = self.max_dimension();
        if high_dim > max || self.counts.is_empty() {
            return Err(CmapError::InvalidDimension { dim: high_dim, max });
        }
        if low_dim > high_dim {
            return Err(CmapError::InvalidDimension {
                dim: low_dim,
                max: high_dim,
            });
        }

        // boundaries[d] lists the (d-1)-cells of each d-cell
        let mut boundaries: Vec<Vec<Vec<usize>>> = self
            .counts
            .iter()
            .map(|&count| vec![Vec::new(); count])
            .collect();
        for (i, &(higher, lower)) in self.edges.iter().enumerate() {
            check_edge(&self.counts, higher, lower)
                .map_err(|message| CmapError::Parse { line: i + 2, message })?;
            boundaries[higher.dim][higher.index].push(lower.index);
        }

        let mut reached: Vec<Vec<usize>> = (0..self.counts[high_dim]).map(|i| vec![i]).collect();
        for dim in (low_dim + 1..=high_dim).rev() {
            for cells in &mut reached {
                *cells = cells
                    .iter()
                    .flat_map(|&c| boundaries[dim][c].iter().copied())
                    .sorted_unstable()
                    .dedup()
                    .collect();
            }
        }
        Ok(reached)
    }

    /// Write the graph in the incidence graph file format.
    pub fn write_to(&self, mut w: impl Write) -> io::Result<()> {
        write!(w, "{self}")
    }

    /// Write the graph to a file.
    ///
    /// The file is replaced atomically, so it's never left half-written.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), CmapError> {
        write_atomically(path.as_ref(), |w| self.write_to(w))
    }

    /// Read a graph from a file written by [`save`][Self::save].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CmapError> {
        fs::read_to_string(path)?.parse()
    }
}

impl fmt::Display for IncidenceGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.counts.iter().format(", "))?;
        for (higher, lower) in &self.edges {
            write!(f, "\n{higher}, {lower}")?;
        }
        Ok(())
    }
}

impl FromStr for IncidenceGraph {
    type Err = CmapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse_err = |line: usize, message: String| CmapError::Parse { line, message };

        let mut lines = s.lines().enumerate().map(|(i, l)| (i + 1, l.trim()));
        let counts = match lines.next() {
            Some((line, counts)) if !counts.is_empty() => counts
                .split(',')
                .map(|c| {
                    c.trim()
                        .parse::<usize>()
                        .map_err(|e| parse_err(line, format!("invalid cell count `{}`: {e}", c.trim())))
                })
                .collect::<Result<Vec<_>, _>>()?,
            _ => return Err(parse_err(1, "missing cell counts".to_string())),
        };

        let mut edges = Vec::new();
        for (line, text) in lines {
            if text.is_empty() {
                continue;
            }
            let (higher, lower) = text
                .split_once(',')
                .ok_or_else(|| parse_err(line, format!("expected two labels, got `{text}`")))?;
            let higher: CellLabel = higher.parse().map_err(|m| parse_err(line, m))?;
            let lower: CellLabel = lower.parse().map_err(|m| parse_err(line, m))?;

            check_edge(&counts, higher, lower).map_err(|m| parse_err(line, m))?;
            edges.push((higher, lower));
        }

        Ok(Self { counts, edges })
    }
}

/// Check that an edge connects consecutive dimensions within the cell counts.
fn check_edge(counts: &[usize], higher: CellLabel, lower: CellLabel) -> Result<(), String> {
    if lower.dim.checked_add(1) != Some(higher.dim) {
        return Err(format!("{higher} and {lower} are not in consecutive dimensions"));
    }
    for label in [higher, lower] {
        if counts.get(label.dim).map_or(true, |&count| label.index >= count) {
            return Err(format!("{label} is out of range of the cell counts"));
        }
    }
    Ok(())
}

impl<const DIM: usize, const EMB: usize> CombinatorialMap<DIM, EMB> {
    /// For each cell of `upper`, list the cells of `lower` that own one of its darts.
    ///
    /// This is the same as testing every pair with [`incident`][Self::incident],
    /// but walks every upper cell only once.
    fn incidence_layer(
        &self,
        upper: &CellTable,
        lower: &CellTable,
    ) -> Result<Vec<Vec<usize>>, CmapError> {
        upper
            .representatives()
            .iter()
            .map(|&rep| -> Result<Vec<usize>, CmapError> {
                Ok(self
                    .cell_darts(upper.dim(), rep)?
                    .filter_map(|d| lower.cell_of(d))
                    .sorted_unstable()
                    .dedup()
                    .collect())
            })
            .collect()
    }

    fn cell_tables(&self, max_dimension: usize) -> Result<Vec<CellTable>, CmapError> {
        self.check_dimension(max_dimension)?;
        (0..=max_dimension).map(|dim| self.cell_table(dim)).collect()
    }

    /// Label every cell up to `max_dimension` and compute the incidences
    /// between cells of consecutive dimensions.
    ///
    /// The result only depends on the topology of the map and the order of its darts,
    /// so exporting an unchanged map twice gives identical graphs.
    pub fn incidence_graph(&self, max_dimension: usize) -> Result<IncidenceGraph, CmapError> {
        let tables = self.cell_tables(max_dimension)?;
        let counts: Vec<usize> = tables.iter().map(|t| t.len()).collect();
        log::debug!("exporting incidence graph with cell counts {counts:?}");

        let mut edges = Vec::new();
        for (lower, upper) in tables.iter().tuple_windows() {
            let layer = self.incidence_layer(upper, lower)?;
            for (upper_idx, lower_cells) in layer.into_iter().enumerate() {
                edges.extend(lower_cells.into_iter().map(|lower_idx| {
                    (
                        CellLabel::new(upper.dim(), upper_idx),
                        CellLabel::new(lower.dim(), lower_idx),
                    )
                }));
            }
        }
        log::debug!("found {} incident pairs", edges.len());

        Ok(IncidenceGraph { counts, edges })
    }

    /// Build the incidence matrix between `(dim+1)`-cells and `dim`-cells.
    ///
    /// Rows correspond to `(dim+1)`-cells and columns to `dim`-cells,
    /// both in [`cell_table`][Self::cell_table] order,
    /// with a 1 wherever the cells are incident.
    pub fn incidence_matrix(&self, dim: usize) -> Result<nas::CsrMatrix<i8>, CmapError> {
        self.check_dimension(dim)?;
        let tables = self.cell_tables(dim + 1)?;
        let (lower, upper) = (&tables[dim], &tables[dim + 1]);

        let mut coo = nas::CooMatrix::new(upper.len(), lower.len());
        for (row, cols) in self.incidence_layer(upper, lower)?.into_iter().enumerate() {
            for col in cols {
                coo.push(row, col, 1);
            }
        }
        Ok(nas::CsrMatrix::from(&coo))
    }

    /// Get the point of every vertex, in vertex label order.
    pub fn vertex_points(&self) -> Result<Vec<na::SVector<f64, EMB>>, CmapError> {
        let vertices = self.cell_table(0)?;
        vertices
            .representatives()
            .iter()
            .enumerate()
            .map(|(vertex, &rep)| {
                self.point(rep)?
                    .copied()
                    .ok_or(CmapError::MissingPoint { vertex })
            })
            .collect()
    }

    /// Write the vertex file, see the [module-level docs][self].
    pub fn write_vertices(&self, w: impl Write, precision: Option<usize>) -> Result<(), CmapError> {
        let points = self.vertex_points()?;
        write_points(w, &points, precision)?;
        Ok(())
    }

    /// Write the vertex file to disk.
    ///
    /// The file is replaced atomically, so it's never left half-written.
    pub fn save_vertices(
        &self,
        path: impl AsRef<Path>,
        precision: Option<usize>,
    ) -> Result<(), CmapError> {
        let points = self.vertex_points()?;
        write_atomically(path.as_ref(), |w| write_points(w, &points, precision))
    }

    /// Write both the incidence graph and the vertex file.
    ///
    /// Everything is computed and both files are fully written to temporary files
    /// before either destination is replaced,
    /// so a vertex missing its point or a failed write leaves both files untouched.
    /// Only a failure of the final rename of the vertex file
    /// can leave a new graph file next to an old vertex file.
    pub fn export(
        &self,
        settings: &ExportSettings,
        graph_path: impl AsRef<Path>,
        vertex_path: impl AsRef<Path>,
    ) -> Result<IncidenceGraph, CmapError> {
        let graph = self.incidence_graph(settings.max_dimension.unwrap_or(DIM))?;
        let points = self.vertex_points()?;

        let graph_file = StagedFile::write(graph_path.as_ref(), |w| graph.write_to(w))?;
        let vertex_file = StagedFile::write(vertex_path.as_ref(), |w| {
            write_points(w, &points, settings.coordinate_precision)
        })?;
        graph_file.commit()?;
        vertex_file.commit()?;
        log::debug!(
            "wrote {} and {}",
            graph_path.as_ref().display(),
            vertex_path.as_ref().display()
        );
        Ok(graph)
    }
}

fn write_points<const EMB: usize>(
    mut w: impl Write,
    points: &[na::SVector<f64, EMB>],
    precision: Option<usize>,
) -> io::Result<()> {
    for (i, p) in points.iter().enumerate() {
        if i > 0 {
            writeln!(w)?;
        }
        let row = p.iter().map(|x| match precision {
            Some(prec) => format!("{x:.prec$}"),
            None => format!("{x}"),
        });
        write!(w, "{}", row.format(", "))?;
    }
    Ok(())
}

/// Parse the contents of a vertex file written by
/// [`save_vertices`][CombinatorialMap::save_vertices].
pub fn read_vertices<const EMB: usize>(s: &str) -> Result<Vec<na::SVector<f64, EMB>>, CmapError> {
    s.lines()
        .enumerate()
        .filter(|(_, l)| !l.trim().is_empty())
        .map(|(i, l)| -> Result<na::SVector<f64, EMB>, CmapError> {
            let line = i + 1;
            let coords = l
                .split(',')
                .map(|c| {
                    c.trim().parse::<f64>().map_err(|e| CmapError::Parse {
                        line,
                        message: format!("invalid coordinate `{}`: {e}", c.trim()),
                    })
                })
                .collect::<Result<Vec<f64>, _>>()?;
            if coords.len() != EMB {
                return Err(CmapError::Parse {
                    line,
                    message: format!("expected {EMB} coordinates, got {}", coords.len()),
                });
            }
            Ok(na::SVector::from_column_slice(&coords))
        })
        .collect()
}

/// Path of the temporary file a write to `path` goes through.
fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// A fully written temporary file next to its destination.
///
/// The temporary file is removed when this is dropped without being committed.
struct StagedFile {
    tmp: PathBuf,
    dest: PathBuf,
}

impl StagedFile {
    fn write(
        dest: &Path,
        write: impl FnOnce(&mut io::BufWriter<fs::File>) -> io::Result<()>,
    ) -> Result<Self, CmapError> {
        let staged = Self {
            tmp: temp_path(dest),
            dest: dest.to_path_buf(),
        };
        let mut w = io::BufWriter::new(fs::File::create(&staged.tmp)?);
        write(&mut w)?;
        w.flush()?;
        w.get_ref().sync_all()?;
        Ok(staged)
    }

    /// Move the temporary file over the destination.
    fn commit(self) -> Result<(), CmapError> {
        fs::rename(&self.tmp, &self.dest)?;
        Ok(())
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        // nothing is left to remove after a successful commit
        if self.tmp.exists() {
            let _ = fs::remove_file(&self.tmp);
        }
    }
}

/// Write to a temporary file next to `path` and move it in place once complete.
fn write_atomically(
    path: &Path,
    write: impl FnOnce(&mut io::BufWriter<fs::File>) -> io::Result<()>,
) -> Result<(), CmapError> {
    StagedFile::write(path, write)?.commit()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::{fixtures, DartId};
    use approx::relative_eq;
    use std::collections::HashSet;

    /// Unique path in the system temp directory for a test to write to.
    fn temp_file(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("combimap-{}-{name}", std::process::id()))
    }

    #[test]
    fn triangle_loop_graph() {
        let map = fixtures::triangle_loop();
        let graph = map.incidence_graph(2).unwrap();
        assert_eq!(graph.counts, vec![3, 3, 1]);
        assert_eq!(graph.edges.len(), 6);

        let expected = "3, 3, 1\n\
                        1_0, 0_0\n\
                        1_1, 0_1\n\
                        1_2, 0_2\n\
                        2_0, 1_0\n\
                        2_0, 1_1\n\
                        2_0, 1_2";
        assert_eq!(graph.to_string(), expected);
    }

    #[test]
    fn tetrahedron_graph() {
        let map = fixtures::closed_tetrahedron();
        let graph = map.incidence_graph(3).unwrap();
        assert_eq!(graph.counts, vec![4, 6, 4, 1]);
        assert_eq!(graph.edges.len(), 6 * 2 + 4 * 3 + 4);

        for (dim, count, boundary_size) in [(1, 6, 2), (2, 4, 3), (3, 1, 4)] {
            for index in 0..count {
                assert_eq!(
                    graph.boundary_of(CellLabel::new(dim, index)).count(),
                    boundary_size,
                    "{dim}_{index} has the wrong number of boundary cells"
                );
            }
        }

        // restricting the dimension drops the upper layers
        let surface = map.incidence_graph(2).unwrap();
        assert_eq!(surface.counts, vec![4, 6, 4]);
        assert_eq!(surface.edges[..], graph.edges[..24]);

        assert!(matches!(
            map.incidence_graph(4),
            Err(CmapError::InvalidDimension { dim: 4, max: 3 })
        ));
    }

    #[test]
    fn two_tetrahedra_graph() {
        let map = fixtures::two_tetrahedra();
        let graph = map.incidence_graph(3).unwrap();
        assert_eq!(graph.counts, vec![5, 9, 7, 2]);
        assert_eq!(graph.edges.len(), 9 * 2 + 7 * 3 + 2 * 4);
    }

    /// The layered computation agrees with testing every pair with `incident`.
    #[test]
    fn graph_matches_pairwise_incidence() {
        fn check<const DIM: usize, const EMB: usize>(map: &CombinatorialMap<DIM, EMB>) {
            let graph = map.incidence_graph(DIM).unwrap();
            let mut expected = Vec::new();
            for dim in 0..DIM {
                let lower = map.one_dart_per_cell(dim).unwrap();
                let upper = map.one_dart_per_cell(dim + 1).unwrap();
                for (u_idx, &u) in upper.iter().enumerate() {
                    for (l_idx, &l) in lower.iter().enumerate() {
                        if map.incident(dim + 1, u, dim, l).unwrap() {
                            expected.push((CellLabel::new(dim + 1, u_idx), CellLabel::new(dim, l_idx)));
                        }
                    }
                }
            }
            assert_eq!(graph.edges, expected);
        }
        check(&fixtures::triangle_loop());
        check(&fixtures::split_square());
        check(&fixtures::tetrahedron_surface());
        check(&fixtures::two_tetrahedra());
    }

    /// Every higher cell has exactly as many edges
    /// as it has distinct lower cells among its darts.
    #[test]
    fn boundary_counts_are_conserved() {
        let map = fixtures::two_tetrahedra();
        let graph = map.incidence_graph(3).unwrap();
        for dim in 0..3 {
            for (idx, rep) in map.one_dart_per_cell(dim + 1).unwrap().into_iter().enumerate() {
                // group the cell's darts into lower cells without using cell tables
                let mut distinct: Vec<DartId> = Vec::new();
                for d in map.darts_of_cell(dim + 1, rep).unwrap() {
                    if !distinct.iter().any(|&o| map.same_cell(dim, o, d).unwrap()) {
                        distinct.push(d);
                    }
                }
                let label = CellLabel::new(dim + 1, idx);
                let boundary: Vec<CellLabel> = graph.boundary_of(label).collect();
                assert_eq!(boundary.len(), distinct.len(), "boundary of {label}");
                assert_eq!(
                    boundary.iter().collect::<HashSet<_>>().len(),
                    boundary.len(),
                    "duplicate edges from {label}"
                );
            }
        }
    }

    #[test]
    fn export_is_deterministic() {
        let map = fixtures::two_tetrahedra();
        let first = map.incidence_graph(3).unwrap().to_string();
        let second = map.incidence_graph(3).unwrap().to_string();
        assert_eq!(first, second);

        let mut a = Vec::new();
        let mut b = Vec::new();
        map.write_vertices(&mut a, None).unwrap();
        map.write_vertices(&mut b, None).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn parse_written_graph() {
        let map = fixtures::two_tetrahedra();
        let graph = map.incidence_graph(3).unwrap();
        let parsed: IncidenceGraph = graph.to_string().parse().unwrap();
        assert_eq!(parsed, graph);

        // whitespace and a trailing newline are tolerated
        let loose: IncidenceGraph = " 2,1 \n1_0 ,0_1\n\n".parse().unwrap();
        assert_eq!(loose.counts, vec![2, 1]);
        assert_eq!(loose.edges, vec![(CellLabel::new(1, 0), CellLabel::new(0, 1))]);
    }

    #[test]
    fn parse_errors() {
        let cases = [
            ("", 1),
            ("3, x, 1", 1),
            ("3, 3, 1\n1_0 0_0", 2),
            ("3, 3, 1\n1_0, 0_0\n1-1, 0_1", 3),
            ("3, 3, 1\n2_0, 0_0", 2),
            ("3, 3, 1\n1_3, 0_0", 2),
            ("3, 3, 1\n3_0, 2_0", 2),
            ("3, 3, 1\n1_0, -1_0", 2),
            ("3, 3, 1\n1_0, 18446744073709551615_0", 2),
        ];
        for (text, expected_line) in cases {
            match text.parse::<IncidenceGraph>() {
                Err(CmapError::Parse { line, .. }) => {
                    assert_eq!(line, expected_line, "wrong line reported for {text:?}")
                }
                other => panic!("expected a parse error for {text:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn closure_of_layers() {
        let graph = fixtures::triangle_loop().incidence_graph(2).unwrap();
        assert_eq!(graph.closure(2, 0).unwrap(), vec![vec![0, 1, 2]]);
        assert_eq!(graph.closure(1, 0).unwrap(), vec![vec![0], vec![1], vec![2]]);
        assert_eq!(graph.closure(1, 1).unwrap(), vec![vec![0], vec![1], vec![2]]);

        let graph = fixtures::two_tetrahedra().incidence_graph(3).unwrap();
        let face_vertices = graph.closure(2, 0).unwrap();
        assert_eq!(face_vertices.len(), 7);
        assert!(face_vertices.iter().all(|v| v.len() == 3));
        let volume_vertices = graph.closure(3, 0).unwrap();
        assert!(volume_vertices.iter().all(|v| v.len() == 4));
        // the two volumes share three vertices
        let shared = volume_vertices[0]
            .iter()
            .filter(|v| volume_vertices[1].contains(v))
            .count();
        assert_eq!(shared, 3);

        assert!(graph.closure(4, 0).is_err());
        assert!(graph.closure(1, 2).is_err());
    }

    #[test]
    fn incidence_matrices() {
        let map = fixtures::closed_tetrahedron();
        let face_edges = map.incidence_matrix(1).unwrap();
        assert_eq!((face_edges.nrows(), face_edges.ncols()), (4, 6));
        assert_eq!(face_edges.nnz(), 12);
        for row in face_edges.row_iter() {
            assert_eq!(row.values().iter().map(|&v| v as i32).sum::<i32>(), 3);
        }

        let volume_faces = map.incidence_matrix(2).unwrap();
        assert_eq!((volume_faces.nrows(), volume_faces.ncols()), (1, 4));
        itertools::assert_equal(volume_faces.row(0).col_indices().iter().copied(), 0..4);

        assert!(matches!(
            map.incidence_matrix(3),
            Err(CmapError::InvalidDimension { dim: 4, max: 3 })
        ));        assert!(matches!(
            map.incidence_matrix(usize::MAX),
            Err(CmapError::InvalidDimension { dim: usize::MAX, max: 3 })
        ));
    }

    #[test]
    fn closure_rejects_inconsistent_edges() {
        let mut graph = fixtures::triangle_loop().incidence_graph(2).unwrap();
        graph.edges.push((CellLabel::new(2, 5), CellLabel::new(1, 0)));
        assert!(matches!(graph.closure(2, 0), Err(CmapError::Parse { line: 8, .. })));
        graph.edges.pop();

        graph.edges.insert(0, (CellLabel::new(2, 0), CellLabel::new(0, 0)));
        assert!(matches!(graph.closure(1, 0), Err(CmapError::Parse { line: 2, .. })));
        graph.edges.remove(0);

        // face edges are left over after dropping the face count
        graph.counts.truncate(2);
        assert!(matches!(graph.closure(1, 0), Err(CmapError::Parse { line: 5, .. })));
    }

    #[test]
    fn vertex_rows() {
        let map = fixtures::closed_tetrahedron();
        // vertices are labeled in the order their first darts were created,
        // which for the reference faces is 0, 2, 1, 3
        let mut buf = Vec::new();
        map.write_vertices(&mut buf, None).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "0, 0, 0\n0, 1, 0\n1, 0, 0\n0, 0, 1"
        );

        let mut buf = Vec::new();
        map.write_vertices(&mut buf, Some(2)).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap().lines().nth(1),
            Some("0.00, 1.00, 0.00")
        );

        let points = map.vertex_points().unwrap();
        let mut buf = Vec::new();
        map.write_vertices(&mut buf, None).unwrap();
        let read = read_vertices::<3>(std::str::from_utf8(&buf).unwrap()).unwrap();
        assert_eq!(read.len(), points.len());
        for (a, b) in read.iter().zip(&points) {
            assert!(relative_eq!(a, b));
        }

        assert!(matches!(
            read_vertices::<2>("1, 2, 3"),
            Err(CmapError::Parse { line: 1, .. })
        ));
        assert!(matches!(
            read_vertices::<3>("1, 2, 3\n1, two, 3"),
            Err(CmapError::Parse { line: 2, .. })
        ));
    }

    #[test]
    fn missing_points() {
        let mut map = crate::SurfaceMap::new();
        map.make_polygon(3).unwrap();
        assert!(matches!(
            map.vertex_points(),
            Err(CmapError::MissingPoint { vertex: 0 })
        ));

        let graph_path = temp_file("missing-graph.txt");
        let vertex_path = temp_file("missing-vertices.txt");
        let res = map.export(&ExportSettings::default(), &graph_path, &vertex_path);
        assert!(matches!(res, Err(CmapError::MissingPoint { .. })));
        assert!(!graph_path.exists(), "nothing is written if export fails");
        assert!(!vertex_path.exists());
    }

    #[test]
    fn export_files() {
        let map = fixtures::two_tetrahedra();
        let graph_path = temp_file("two-tets-graph.txt");
        let vertex_path = temp_file("two-tets-vertices.txt");

        let settings = ExportSettings {
            max_dimension: Some(2),
            coordinate_precision: Some(3),
        };
        let graph = map.export(&settings, &graph_path, &vertex_path).unwrap();
        assert_eq!(graph.counts, vec![5, 9, 7]);

        let graph_text = fs::read_to_string(&graph_path).unwrap();
        assert!(!graph_text.ends_with('\n'));
        assert_eq!(graph_text.lines().count(), 1 + graph.edges.len());
        assert_eq!(IncidenceGraph::load(&graph_path).unwrap(), graph);

        let vertex_text = fs::read_to_string(&vertex_path).unwrap();
        assert_eq!(vertex_text.lines().count(), 5);
        assert!(vertex_text.lines().all(|l| l.split(", ").count() == 3));
        assert_eq!(vertex_text.lines().next(), Some("0.000, 0.000, 0.000"));

        // exporting again gives identical files
        map.export(&settings, &graph_path, &vertex_path).unwrap();
        assert_eq!(fs::read_to_string(&graph_path).unwrap(), graph_text);
        assert_eq!(fs::read_to_string(&vertex_path).unwrap(), vertex_text);
        assert!(!temp_path(&graph_path).exists());

        fs::remove_file(graph_path).unwrap();
        fs::remove_file(vertex_path).unwrap();
    }

    #[test]
    fn failed_export_keeps_previous_files() {
        let map = fixtures::triangle_loop();
        let graph_path = temp_file("kept-graph.txt");
        fs::write(&graph_path, "old graph").unwrap();
        let vertex_path = temp_file("no-such-export-dir").join("vertices.txt");

        let res = map.export(&ExportSettings::default(), &graph_path, &vertex_path);
        assert!(matches!(res, Err(CmapError::Io(_))));
        assert_eq!(fs::read_to_string(&graph_path).unwrap(), "old graph");
        assert!(!temp_path(&graph_path).exists());

        fs::remove_file(graph_path).unwrap();
    }

    #[test]
    fn unwritable_destination() {
        let map = fixtures::triangle_loop();
        let graph = map.incidence_graph(2).unwrap();
        let path = temp_file("no-such-dir").join("graph.txt");
        assert!(matches!(graph.save(&path), Err(CmapError::Io(_))));
        assert!(matches!(map.save_vertices(&path, None), Err(CmapError::Io(_))));
        assert!(!temp_path(&path).exists());
        assert!(matches!(IncidenceGraph::load(&path), Err(CmapError::Io(_))));
    }
}
