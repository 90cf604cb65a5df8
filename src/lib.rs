//! `combimap` is a dimension-generic combinatorial map:
//! a set of darts linked by the relations `β_0 ... β_n`
//! from which the cells of a subdivided space are recovered as orbits.
//!
//! The main type is [`CombinatorialMap`], parameterized by the dimension of the map
//! and the dimension of the space its vertex points live in.
//! Cells are never stored explicitly;
//! [`cell_darts`][CombinatorialMap::cell_darts] walks the darts of a cell on demand
//! and [`cell_table`][CombinatorialMap::cell_table] enumerates all cells of a dimension.
//! Walks and queries track visited darts with reusable [`Mark`]s
//! drawn from a fixed-size pool owned by the map.
//!
//! ```
//! use combimap::{SurfaceMap, Vec3};
//!
//! let mut map = SurfaceMap::new();
//! let first = map.make_polygon(3)?;
//! assert_eq!(map.cell_count(0)?, 3);
//! assert_eq!(map.cell_count(2)?, 1);
//!
//! map.set_point(first, Vec3::new(0.0, 0.0, 0.0))?;
//! assert_eq!(map.point(first)?, Some(&Vec3::zeros()));
//!
//! let graph = map.incidence_graph(2)?;
//! assert_eq!(graph.counts, vec![3, 3, 1]);
//! assert_eq!(graph.edges.len(), 6);
//! # Ok::<(), combimap::CmapError>(())
//! ```

#![warn(missing_docs)]

pub mod error;
#[doc(inline)]
pub use error::CmapError;

pub mod map;
#[doc(inline)]
pub use map::{inverse, CombinatorialMap, DartId, SurfaceMap, VolumeMap};

pub mod mark;
#[doc(inline)]
pub use mark::{Mark, MarkPool, MarkToken, MAX_MARKS};

pub mod orbit;
#[doc(inline)]
pub use orbit::{CellDarts, CellTable};

mod query;

pub mod export;
#[doc(inline)]
pub use export::{read_vertices, CellLabel, ExportSettings, IncidenceGraph};

// nalgebra re-exports of common types for convenience

pub use nalgebra as na;
/// Type alias for a 2D `nalgebra` vector.
pub type Vec2 = na::Vector2<f64>;
/// Type alias for a 3D `nalgebra` vector.
pub type Vec3 = na::Vector3<f64>;
