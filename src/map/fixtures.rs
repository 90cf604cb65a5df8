//! Small hand-built maps used in tests and documentation.

use nalgebra as na;
use std::collections::HashMap;

use super::{CombinatorialMap, DartId, SurfaceMap, VolumeMap};

/// Three darts linked into one face by `β_1`, with nothing else sewn.
///
/// ```text
/// 2
/// | \
/// |  \
/// 0 - 1
/// ```
/// Darts are created in order `0 -> 1`, `1 -> 2`, `2 -> 0`
/// and start at slot 0.
pub fn triangle_loop() -> SurfaceMap {
    let mut map = SurfaceMap::new();
    let d0 = map.make_polygon(3).expect("a 2-map can hold polygons");
    let d1 = map.beta_raw(1, d0).expect("polygon is a cycle");
    let d2 = map.beta_raw(1, d1).expect("polygon is a cycle");
    for (d, p) in [(d0, [0.0, 0.0, 0.0]), (d1, [1.0, 0.0, 0.0]), (d2, [0.0, 1.0, 0.0])] {
        map.set_point(d, na::Vector3::from(p))
            .expect("fixture darts are live");
    }
    map
}

/// A unit square split into two triangles along the diagonal `0 - 2`,
/// with the diagonal sewn and the outer edges left free.
///
/// ```text
/// 3 - 2
/// | / |
/// 0 - 1
/// ```
pub fn split_square() -> SurfaceMap {
    let mut map = SurfaceMap::new();
    let points = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]];
    add_triangulated_surface(&mut map, &points, &[[0, 1, 2], [0, 2, 3]]);
    map
}

/// Vertices of the reference tetrahedron.
pub const TETRAHEDRON_POINTS: [[f64; 3]; 4] = [
    [0.0, 0.0, 0.0],
    [1.0, 0.0, 0.0],
    [0.0, 1.0, 0.0],
    [0.0, 0.0, 1.0],
];

/// Faces of the reference tetrahedron, oriented outwards.
pub const TETRAHEDRON_FACES: [[usize; 3]; 4] = [[0, 2, 1], [0, 1, 3], [1, 2, 3], [0, 3, 2]];

/// The closed surface of a tetrahedron as a 2-map.
pub fn tetrahedron_surface() -> SurfaceMap {
    let mut map = SurfaceMap::new();
    add_triangulated_surface(&mut map, &TETRAHEDRON_POINTS, &TETRAHEDRON_FACES);
    map
}

/// A single tetrahedron as a 3-map, with its faces free along `β_3`.
pub fn closed_tetrahedron() -> VolumeMap {
    let mut map = VolumeMap::new();
    add_triangulated_surface(&mut map, &TETRAHEDRON_POINTS, &TETRAHEDRON_FACES);
    map
}

/// Two tetrahedra glued along the triangle `0 1 2`:
/// the reference tetrahedron and another one with its apex below the `z = 0` plane.
pub fn two_tetrahedra() -> VolumeMap {
    let mut map = VolumeMap::new();
    let upper = add_triangulated_surface(&mut map, &TETRAHEDRON_POINTS, &TETRAHEDRON_FACES);

    let lower_points = [
        TETRAHEDRON_POINTS[0],
        TETRAHEDRON_POINTS[1],
        TETRAHEDRON_POINTS[2],
        [0.25, 0.25, -1.0],
    ];
    let lower_faces = [[0, 1, 2], [0, 3, 1], [1, 3, 2], [2, 3, 0]];
    let lower = add_triangulated_surface(&mut map, &lower_points, &lower_faces);

    map.sew(3, upper[&(0, 2)], lower[&(2, 0)])
        .expect("shared faces are free along β_3");
    map
}

/// Create one triangle per face, sew shared edges along `β_2`
/// and attach the given points to the vertices.
///
/// Faces must be consistently oriented.
/// Returns the dart for every directed edge `(origin, target)`.
fn add_triangulated_surface<const DIM: usize, const EMB: usize>(
    map: &mut CombinatorialMap<DIM, EMB>,
    points: &[[f64; EMB]],
    faces: &[[usize; 3]],
) -> HashMap<(usize, usize), DartId> {
    let mut edges: HashMap<(usize, usize), DartId> = HashMap::new();
    for face in faces {
        let mut dart = map.make_polygon(3).expect("fixture maps have β_1");
        for k in 0..3 {
            edges.insert((face[k], face[(k + 1) % 3]), dart);
            dart = map.beta_raw(1, dart).expect("polygon is a cycle");
        }
    }

    // iterate in face order rather than hash order
    // so the resulting map doesn't depend on the hasher
    for face in faces {
        for k in 0..3 {
            let (from, to) = (face[k], face[(k + 1) % 3]);
            let (Some(&dart), Some(&twin)) = (edges.get(&(from, to)), edges.get(&(to, from)))
            else {
                continue;
            };
            if map.beta_raw(2, dart).is_none() {
                map.sew(2, dart, twin).expect("edges are sewn only once");
            }
        }
    }

    for face in faces {
        for k in 0..3 {
            let dart = edges[&(face[k], face[(k + 1) % 3])];
            if map.point(dart).expect("fixture darts are live").is_none() {
                map.set_point(dart, na::SVector::from(points[face[k]]))
                    .expect("fixture darts are live");
            }
        }
    }

    edges
}
