//! Ship structure as seen by NPCs: points and counter-clockwise triangles.
//!
//! Triangle edge `e` runs from vertex `e` to vertex `(e + 1) % 3`. Edges
//! flagged solid block constrained particles; a solid edge whose outward
//! normal points down is a floor.

use floatsand_logic::environment::HomeShip;
use floatsand_logic::npc::{TriangleBCoords, TriangleEdge, TriangleIndex};
use floatsand_logic::vec2::Vec2;
use serde::{Deserialize, Serialize};

/// Outward normal `y` below which a solid edge counts as floor.
const FLOOR_NORMAL_Y: f32 = -0.7;

/// Barycentric tolerance for points lying on a triangle edge.
const BCOORDS_EPSILON: f32 = 1e-4;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ShipPoint {
    pub position: Vec2,
    pub is_electrified: bool,
    pub is_near_bomb: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShipTriangle {
    pub points: [u32; 3],
    pub solid_edges: [bool; 3],
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShipMesh {
    pub points: Vec<ShipPoint>,
    pub triangles: Vec<ShipTriangle>,
}

impl ShipMesh {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rectangular hull of `decks` stacked decks, each split into `columns`
    /// cells. Every deck has a floor and a ceiling, except the top deck which
    /// is open; the outer side walls are solid.
    ///
    /// Each cell is split into two triangles so that the lower one owns the
    /// floor and the adjacent outer wall: the first column uses the rising
    /// diagonal mirrored.
    pub fn box_hull(origin: Vec2, cell_width: f32, deck_height: f32, columns: u32, decks: u32) -> Self {
        let mut mesh = Self::new();
        let row = columns + 1;

        for d in 0..=decks {
            for c in 0..=columns {
                mesh.points.push(ShipPoint {
                    position: origin + Vec2::new(c as f32 * cell_width, d as f32 * deck_height),
                    ..Default::default()
                });
            }
        }

        for d in 0..decks {
            let has_ceiling = d + 1 < decks;
            for c in 0..columns {
                let bl = d * row + c;
                let br = bl + 1;
                let tl = bl + row;
                let tr = tl + 1;
                let is_first = c == 0;
                let is_last = c + 1 == columns;

                if is_first {
                    // Lower half: floor, diagonal, left side
                    mesh.triangles.push(ShipTriangle {
                        points: [bl, br, tl],
                        solid_edges: [true, false, true],
                    });
                    // Upper half: right side, ceiling, diagonal
                    mesh.triangles.push(ShipTriangle {
                        points: [br, tr, tl],
                        solid_edges: [is_last, has_ceiling, false],
                    });
                } else {
                    // Lower half: floor, right side, diagonal
                    mesh.triangles.push(ShipTriangle {
                        points: [bl, br, tr],
                        solid_edges: [true, is_last, false],
                    });
                    // Upper half: diagonal, ceiling, left side
                    mesh.triangles.push(ShipTriangle {
                        points: [bl, tr, tl],
                        solid_edges: [false, has_ceiling, false],
                    });
                }
            }
        }

        mesh
    }

    fn vertex(&self, triangle: TriangleIndex, vertex: usize) -> Vec2 {
        self.triangles
            .get(triangle as usize)
            .and_then(|t| self.points.get(t.points[vertex % 3] as usize))
            .map(|p| p.position)
            .unwrap_or_default()
    }

    /// Endpoints of a triangle edge, in edge order.
    pub fn edge_endpoints(&self, edge: TriangleEdge) -> (Vec2, Vec2) {
        let e = edge.edge_ordinal as usize;
        (self.vertex(edge.triangle, e), self.vertex(edge.triangle, e + 1))
    }

    /// Unit normal of an edge pointing out of its triangle.
    pub fn edge_outward_normal(&self, edge: TriangleEdge) -> Vec2 {
        let (a, b) = self.edge_endpoints(edge);
        let d = b - a;
        Vec2::new(d.y, -d.x).normalize()
    }

    pub fn is_solid_edge(&self, edge: TriangleEdge) -> bool {
        self.triangles
            .get(edge.triangle as usize)
            .is_some_and(|t| t.solid_edges[edge.edge_ordinal as usize % 3])
    }

    pub fn is_floor_edge(&self, edge: TriangleEdge) -> bool {
        self.is_solid_edge(edge) && self.edge_outward_normal(edge).y < FLOOR_NORMAL_Y
    }

    /// Barycentric coordinates of `position` relative to a triangle.
    pub fn to_bcoords(&self, triangle: TriangleIndex, position: Vec2) -> [f32; 3] {
        let a = self.vertex(triangle, 0);
        let v0 = self.vertex(triangle, 1) - a;
        let v1 = self.vertex(triangle, 2) - a;
        let v2 = position - a;

        let det = v0.cross(v1);
        if det == 0.0 {
            return [-1.0, -1.0, -1.0];
        }

        let l1 = v2.cross(v1) / det;
        let l2 = v0.cross(v2) / det;
        [1.0 - l1 - l2, l1, l2]
    }

    pub fn from_bcoords(&self, bcoords: &TriangleBCoords) -> Vec2 {
        let [l0, l1, l2] = bcoords.bcoords;
        self.vertex(bcoords.triangle, 0) * l0
            + self.vertex(bcoords.triangle, 1) * l1
            + self.vertex(bcoords.triangle, 2) * l2
    }

    pub fn is_inside(bcoords: &[f32; 3]) -> bool {
        bcoords.iter().all(|l| *l >= -BCOORDS_EPSILON)
    }

    /// Triangle containing `position`, if any.
    pub fn find_triangle(&self, position: Vec2) -> Option<TriangleBCoords> {
        (0..self.triangles.len() as TriangleIndex).find_map(|t| {
            let bcoords = self.to_bcoords(t, position);
            Self::is_inside(&bcoords).then_some(TriangleBCoords { triangle: t, bcoords })
        })
    }

    /// Set the electrification of all points within `radius` of `center`.
    pub fn electrify(&mut self, center: Vec2, radius: f32, is_electrified: bool) {
        for p in self.points.iter_mut() {
            if p.position.distance(&center) <= radius {
                p.is_electrified = is_electrified;
            }
        }
    }

    /// Mark points within `radius` of a bomb at `center`.
    pub fn place_bomb(&mut self, center: Vec2, radius: f32) {
        for p in self.points.iter_mut() {
            if p.position.distance(&center) <= radius {
                p.is_near_bomb = true;
            }
        }
    }

    pub fn clear_bombs(&mut self) {
        for p in self.points.iter_mut() {
            p.is_near_bomb = false;
        }
    }

    fn any_point(&self, triangle: TriangleIndex, predicate: impl Fn(&ShipPoint) -> bool) -> bool {
        self.triangles.get(triangle as usize).is_some_and(|t| {
            t.points
                .iter()
                .filter_map(|p| self.points.get(*p as usize))
                .any(&predicate)
        })
    }
}

impl HomeShip for ShipMesh {
    fn sub_spring_vector(&self, edge: TriangleEdge) -> Vec2 {
        let (a, b) = self.edge_endpoints(edge);
        b - a
    }

    fn is_triangle_electrified(&self, triangle: TriangleIndex) -> bool {
        self.any_point(triangle, |p| p.is_electrified)
    }

    fn are_bombs_in_proximity(&self, triangle: TriangleIndex) -> bool {
        self.any_point(triangle, |p| p.is_near_bomb)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one_deck() -> ShipMesh {
        ShipMesh::box_hull(Vec2::ZERO, 2.0, 2.5, 3, 1)
    }

    #[test]
    fn test_box_hull_counts() {
        let mesh = ShipMesh::box_hull(Vec2::ZERO, 2.0, 2.5, 4, 2);
        assert_eq!(mesh.points.len(), 5 * 3);
        assert_eq!(mesh.triangles.len(), 4 * 2 * 2);
    }

    #[test]
    fn test_floor_edge_points_down() {
        let mesh = one_deck();
        let floor = TriangleEdge {
            triangle: 0,
            edge_ordinal: 0,
        };
        assert!(mesh.is_floor_edge(floor));
        let n = mesh.edge_outward_normal(floor);
        assert!((n.y + 1.0).abs() < 1e-6);
        assert_eq!(mesh.sub_spring_vector(floor), Vec2::new(2.0, 0.0));

        let diagonal = TriangleEdge {
            triangle: 2,
            edge_ordinal: 2,
        };
        assert!(!mesh.is_solid_edge(diagonal));
    }

    #[test]
    fn test_outer_walls_are_solid() {
        let mesh = one_deck();
        // Left wall: lower half of the first cell, edge 2
        let left = TriangleEdge {
            triangle: 0,
            edge_ordinal: 2,
        };
        assert!(mesh.is_solid_edge(left));
        assert!(!mesh.is_floor_edge(left));
        assert!((mesh.edge_outward_normal(left).x + 1.0).abs() < 1e-6);
        // Right wall: lower half of the last cell, edge 1
        let right = TriangleEdge {
            triangle: 4,
            edge_ordinal: 1,
        };
        assert!(mesh.is_solid_edge(right));
        assert!((mesh.edge_outward_normal(right).x - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_corners_near_floor_own_their_wall() {
        let mesh = one_deck();
        let left_corner = mesh.find_triangle(Vec2::new(0.05, 0.02)).map(|tb| tb.triangle);
        let right_corner = mesh.find_triangle(Vec2::new(5.95, 0.02)).map(|tb| tb.triangle);
        assert_eq!(left_corner, Some(0));
        assert_eq!(right_corner, Some(4));
    }

    #[test]
    fn test_lower_decks_have_ceilings() {
        let mesh = ShipMesh::box_hull(Vec2::ZERO, 2.0, 2.5, 2, 2);
        // Upper half of the second cell on the lower deck
        let ceiling = TriangleEdge {
            triangle: 3,
            edge_ordinal: 1,
        };
        assert!(mesh.is_solid_edge(ceiling));
        assert!(mesh.edge_outward_normal(ceiling).y > 0.99);
        // The top deck is open
        let top = TriangleEdge {
            triangle: 7,
            edge_ordinal: 1,
        };
        assert!(!mesh.is_solid_edge(top));
    }

    #[test]
    fn test_find_triangle_and_back() {
        let mesh = one_deck();
        let p = Vec2::new(3.1, 0.4);
        let tb = mesh.find_triangle(p).map(|tb| (tb.triangle, mesh.from_bcoords(&tb)));
        let (triangle, back) = tb.unwrap_or((u32::MAX, Vec2::ZERO));
        assert_eq!(triangle, 2);
        assert!(back.distance(&p) < 1e-5);

        assert!(mesh.find_triangle(Vec2::new(3.0, 3.0)).is_none());
        assert!(mesh.find_triangle(Vec2::new(-0.1, 1.0)).is_none());
    }

    #[test]
    fn test_electrify_and_bomb() {
        let mut mesh = one_deck();
        mesh.electrify(Vec2::new(0.0, 0.0), 0.1, true);
        assert!(mesh.is_triangle_electrified(0));
        assert!(!mesh.is_triangle_electrified(4));

        mesh.place_bomb(Vec2::new(6.0, 0.0), 0.1);
        assert!(mesh.are_bombs_in_proximity(4));
        mesh.clear_bombs();
        assert!(!mesh.are_bombs_in_proximity(4));
    }
}
