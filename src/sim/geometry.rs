//! Static table geometry: cushion walls, corner edges, pockets
//!
//! Built once at table setup and never mutated. Malformed walls are a
//! setup-time error; nothing here fails during stepping.

use glam::DVec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::TableSpec;
use crate::consts::GEOMETRY_EPSILON;
use crate::planar;

/// Setup-time geometry validation failures
#[derive(Debug, Error, PartialEq)]
pub enum GeometryError {
    #[error("wall {wall} has {count} vertices, at least 3 are required")]
    TooFewVertices { wall: usize, count: usize },

    #[error("wall {wall} has zero area")]
    Degenerate { wall: usize },

    #[error("wall {wall} is not planar (vertex {vertex} is {offset} off the plane)")]
    NonCoplanar { wall: usize, vertex: usize, offset: f64 },

    #[error("wall {wall} facing point lies on its plane")]
    AmbiguousFacing { wall: usize },
}

/// Raw wall description: a convex polygon and a point on the side balls occupy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WallSpec {
    pub vertices: Vec<DVec3>,
    pub facing: DVec3,
}

/// A validated convex planar polygon with a normal pointing into play.
///
/// Only `Wall::new` builds one, so there is no `Deserialize`; load a
/// `WallSpec` and validate it instead.
#[derive(Debug, Clone, Serialize)]
pub struct Wall {
    vertices: Vec<DVec3>,
    normal: DVec3,
}

impl Wall {
    /// Validate a wall and orient its normal toward `spec.facing`
    pub fn new(index: usize, spec: WallSpec) -> Result<Self, GeometryError> {
        let WallSpec { vertices, facing } = spec;
        if vertices.len() < 3 {
            return Err(GeometryError::TooFewVertices {
                wall: index,
                count: vertices.len(),
            });
        }

        // Newell's method: robust for any vertex ordering of a planar polygon
        let mut newell = DVec3::ZERO;
        for (i, a) in vertices.iter().enumerate() {
            let b = vertices[(i + 1) % vertices.len()];
            newell.x += (a.y - b.y) * (a.z + b.z);
            newell.y += (a.z - b.z) * (a.x + b.x);
            newell.z += (a.x - b.x) * (a.y + b.y);
        }
        let Some(mut normal) = newell.try_normalize() else {
            return Err(GeometryError::Degenerate { wall: index });
        };

        let origin = vertices[0];
        for (vertex, v) in vertices.iter().enumerate() {
            let offset = normal.dot(*v - origin);
            if offset.abs() > GEOMETRY_EPSILON {
                return Err(GeometryError::NonCoplanar {
                    wall: index,
                    vertex,
                    offset,
                });
            }
        }

        let side = normal.dot(facing - origin);
        if side.abs() <= GEOMETRY_EPSILON {
            return Err(GeometryError::AmbiguousFacing { wall: index });
        }
        if side < 0.0 {
            normal = -normal;
        }

        Ok(Self { vertices, normal })
    }

    /// Build a wall from already-consistent parts (synthetic edge planes)
    fn from_parts(vertices: Vec<DVec3>, normal: DVec3) -> Self {
        Self { vertices, normal }
    }

    pub fn vertices(&self) -> &[DVec3] {
        &self.vertices
    }

    /// Unit normal pointing toward the play side
    pub fn normal(&self) -> DVec3 {
        self.normal
    }

    /// Signed distance of `p` from the wall plane (positive on the play side)
    #[inline]
    pub fn signed_distance(&self, p: DVec3) -> f64 {
        self.normal.dot(p - self.vertices[0])
    }

    /// Whether `p` (assumed on the plane) lies inside the polygon.
    ///
    /// Every edge's cross product with the point must agree in sign.
    pub fn contains(&self, p: DVec3) -> bool {
        let n = self.vertices.len();
        let mut positive = false;
        let mut negative = false;
        for i in 0..n {
            let a = self.vertices[i];
            let b = self.vertices[(i + 1) % n];
            let side = self.normal.dot((b - a).cross(p - a));
            if side > GEOMETRY_EPSILON {
                positive = true;
            } else if side < -GEOMETRY_EPSILON {
                negative = true;
            }
            if positive && negative {
                return false;
            }
        }
        true
    }

    /// Vertical quad through `edge`, facing `normal`, spanning `half_width`
    /// either side. Used as a local cushion plane for corner hits.
    pub fn tangent_quad(edge: &Edge, normal: DVec3, half_width: f64) -> Self {
        let tangent = DVec3::Y.cross(normal).normalize_or_zero() * half_width;
        Self::from_parts(
            vec![
                edge.bottom - tangent,
                edge.bottom + tangent,
                edge.top + tangent,
                edge.top - tangent,
            ],
            normal,
        )
    }

    /// Vertical sides of this polygon as edges
    fn vertical_edges(&self) -> impl Iterator<Item = Edge> + '_ {
        let n = self.vertices.len();
        (0..n).filter_map(move |i| {
            let a = self.vertices[i];
            let b = self.vertices[(i + 1) % n];
            let same_column = planar(a - b).length() <= GEOMETRY_EPSILON;
            let has_height = (a.y - b.y).abs() > GEOMETRY_EPSILON;
            (same_column && has_height).then(|| Edge::new(a, b))
        })
    }
}

/// A vertical corner segment where a cushion ends
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub bottom: DVec3,
    pub top: DVec3,
}

impl Edge {
    pub fn new(a: DVec3, b: DVec3) -> Self {
        if a.y <= b.y {
            Self { bottom: a, top: b }
        } else {
            Self { bottom: b, top: a }
        }
    }

    /// Whether `height` is within the segment's vertical span
    pub fn spans(&self, height: f64) -> bool {
        height >= self.bottom.y - GEOMETRY_EPSILON && height <= self.top.y + GEOMETRY_EPSILON
    }

    fn same_as(&self, other: &Edge) -> bool {
        (self.bottom - other.bottom).length() <= GEOMETRY_EPSILON
            && (self.top - other.top).length() <= GEOMETRY_EPSILON
    }
}

/// Where a ball stands relative to a pocket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PocketStatus {
    Outside,
    /// Over the pocket but still at rim height
    Captured,
    /// Fallen below the capture height
    Removable,
}

/// Horizontal capture disc
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pocket {
    pub center: DVec3,
    pub radius: f64,
    /// Ball-center height below which the ball has fallen in
    pub fall_height: f64,
}

impl Pocket {
    pub fn new(center: DVec3, radius: f64, fall_height: f64) -> Self {
        Self {
            center,
            radius,
            fall_height,
        }
    }

    /// Whether `position` is horizontally within the capture radius
    #[inline]
    pub fn covers(&self, position: DVec3) -> bool {
        planar(position - self.center).length() <= self.radius
    }

    pub fn classify(&self, position: DVec3) -> PocketStatus {
        if !self.covers(position) {
            PocketStatus::Outside
        } else if position.y < self.fall_height {
            PocketStatus::Removable
        } else {
            PocketStatus::Captured
        }
    }
}

/// All table-fixed collision geometry
#[derive(Debug, Clone, Serialize)]
pub struct Table {
    walls: Vec<Wall>,
    edges: Vec<Edge>,
    pockets: Vec<Pocket>,
    surface_height: f64,
}

impl Table {
    /// Validate walls and derive deduplicated vertical edges
    pub fn new(
        walls: Vec<WallSpec>,
        pockets: Vec<Pocket>,
        surface_height: f64,
    ) -> Result<Self, GeometryError> {
        let walls = walls
            .into_iter()
            .enumerate()
            .map(|(i, spec)| Wall::new(i, spec))
            .collect::<Result<Vec<_>, _>>()?;

        let mut edges: Vec<Edge> = Vec::new();
        for edge in walls.iter().flat_map(Wall::vertical_edges) {
            if !edges.iter().any(|e| e.same_as(&edge)) {
                edges.push(edge);
            }
        }

        log::debug!(
            "Table built: {} walls, {} edges, {} pockets",
            walls.len(),
            edges.len(),
            pockets.len()
        );

        Ok(Self {
            walls,
            edges,
            pockets,
            surface_height,
        })
    }

    /// Six-pocket table: four rails split by pocket mouths, angled jaws at
    /// every cushion end, corner pockets on the diagonals and side pockets
    /// at the middle of the long rails.
    pub fn standard(spec: &TableSpec) -> Result<Self, GeometryError> {
        let hx = spec.length / 2.0;
        let hz = spec.width / 2.0;
        let y0 = spec.surface_height;
        let y1 = y0 + spec.cushion_height;
        let cm = spec.corner_mouth;
        let sm = spec.side_mouth;
        let jaw = spec.jaw_depth;
        let interior = DVec3::new(0.0, y0 + spec.cushion_height / 2.0, 0.0);

        let at = |x: f64, z: f64| DVec3::new(x, y0, z);
        let quad = |a: DVec3, b: DVec3, facing: DVec3| WallSpec {
            vertices: vec![
                a,
                b,
                DVec3::new(b.x, y1, b.z),
                DVec3::new(a.x, y1, a.z),
            ],
            facing,
        };

        let corner = |sx: f64, sz: f64| {
            at(sx * (hx + spec.corner_pocket_offset), sz * (hz + spec.corner_pocket_offset))
        };
        let side = |sz: f64| at(0.0, sz * (hz + spec.side_pocket_offset));

        let mut walls = Vec::new();
        let mut jaws = Vec::new();

        for sz in [-1.0, 1.0] {
            // Long rails, split at the side pocket
            for (from, to, corner_end) in [(-hx + cm, -sm, -1.0), (sm, hx - cm, 1.0)] {
                let a = at(from, sz * hz);
                let b = at(to, sz * hz);
                walls.push(quad(a, b, interior));

                let out = DVec3::new(0.0, 0.0, sz);
                // Corner-facing end
                let corner_tip = if corner_end > 0.0 { b } else { a };
                let along = DVec3::new(corner_end, 0.0, 0.0);
                jaws.push(quad(
                    corner_tip,
                    corner_tip + (along + out) * jaw,
                    corner(corner_end, sz) + DVec3::Y * spec.cushion_height / 2.0,
                ));
                // Side-pocket end
                let side_tip = if corner_end > 0.0 { a } else { b };
                let toward_side = DVec3::new(-corner_end, 0.0, 0.0);
                jaws.push(quad(
                    side_tip,
                    side_tip + (toward_side * spec.side_jaw_slant + out) * jaw,
                    side(sz) + DVec3::Y * spec.cushion_height / 2.0,
                ));
            }
        }

        for sx in [-1.0, 1.0] {
            // Short rails
            let a = at(sx * hx, -hz + cm);
            let b = at(sx * hx, hz - cm);
            walls.push(quad(a, b, interior));

            let out = DVec3::new(sx, 0.0, 0.0);
            for (tip, sz) in [(a, -1.0), (b, 1.0)] {
                let along = DVec3::new(0.0, 0.0, sz);
                jaws.push(quad(
                    tip,
                    tip + (along + out) * jaw,
                    corner(sx, sz) + DVec3::Y * spec.cushion_height / 2.0,
                ));
            }
        }

        walls.extend(jaws);

        let fall_height = y0 - spec.pocket_depth;
        let mut pockets = Vec::with_capacity(6);
        for sx in [-1.0, 1.0] {
            for sz in [-1.0, 1.0] {
                pockets.push(Pocket::new(corner(sx, sz), spec.corner_pocket_radius, fall_height));
            }
        }
        for sz in [-1.0, 1.0] {
            pockets.push(Pocket::new(side(sz), spec.side_pocket_radius, fall_height));
        }

        Self::new(walls, pockets, y0)
    }

    pub fn walls(&self) -> &[Wall] {
        &self.walls
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn pockets(&self) -> &[Pocket] {
        &self.pockets
    }

    pub fn surface_height(&self) -> f64 {
        self.surface_height
    }
}
