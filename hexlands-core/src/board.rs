//! Hex board geometry with odd-row offset and cube coordinates
//!
//! Map tiles are addressed by `GridPosition` (row, col) in a pointy-top
//! layout where odd rows are shifted half a hex to the right ("odd-r").
//! All distance and neighbor arithmetic happens in cube space.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Offset (row, col) position on the map
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridPosition {
    pub row: i32,
    pub col: i32,
}

impl GridPosition {
    pub const fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    /// Convert to cube coordinates (exact)
    pub fn to_cube(self) -> Cube {
        let x = self.col - (self.row - (self.row & 1)) / 2;
        let z = self.row;
        Cube::new(x, -x - z, z)
    }

    /// Distance between two positions in hex steps
    pub fn distance_to(self, other: GridPosition) -> u32 {
        self.to_cube().distance_to(other.to_cube())
    }

    /// The six adjacent positions, in direction order
    pub fn neighbors(self) -> [GridPosition; 6] {
        let cube = self.to_cube();
        CUBE_DIRECTIONS.map(|d| (cube + d).to_offset())
    }

    /// Whether `other` lies within [min, max] hex steps
    pub fn within_range(self, other: GridPosition, min: u32, max: u32) -> bool {
        let d = self.distance_to(other);
        d >= min && d <= max
    }
}

impl fmt::Display for GridPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// Cube coordinates, always satisfying x + y + z = 0
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cube {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Cube {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Convert back to odd-r offset coordinates (exact)
    pub fn to_offset(self) -> GridPosition {
        let col = self.x + (self.z - (self.z & 1)) / 2;
        GridPosition::new(self.z, col)
    }

    pub fn distance_to(self, other: Cube) -> u32 {
        ((self.x - other.x).unsigned_abs()
            + (self.y - other.y).unsigned_abs()
            + (self.z - other.z).unsigned_abs())
            / 2
    }

    /// Round fractional cube coordinates to the nearest hex
    ///
    /// The axis with the largest rounding error is recomputed from the
    /// other two so the result stays on the x + y + z = 0 plane.
    pub fn round(x: f64, y: f64, z: f64) -> Cube {
        let mut rx = x.round();
        let mut ry = y.round();
        let mut rz = z.round();

        let dx = (rx - x).abs();
        let dy = (ry - y).abs();
        let dz = (rz - z).abs();

        if dx > dy && dx > dz {
            rx = -ry - rz;
        } else if dy > dz {
            ry = -rx - rz;
        } else {
            rz = -rx - ry;
        }

        Cube::new(rx as i32, ry as i32, rz as i32)
    }
}

impl std::ops::Add for Cube {
    type Output = Cube;

    fn add(self, other: Cube) -> Cube {
        Cube::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }
}

/// Cube direction vectors
/// Index: 0=E, 1=NE, 2=NW, 3=W, 4=SW, 5=SE
pub const CUBE_DIRECTIONS: [Cube; 6] = [
    Cube::new(1, -1, 0),  // E
    Cube::new(1, 0, -1),  // NE
    Cube::new(0, 1, -1),  // NW
    Cube::new(-1, 1, 0),  // W
    Cube::new(-1, 0, 1),  // SW
    Cube::new(0, -1, 1),  // SE
];

const SQRT_3: f64 = 1.732_050_807_568_877_2;

/// Pixel centre of a hex for a pointy-top layout with the given hex size
pub fn offset_to_pixel(pos: GridPosition, size: f64) -> (f64, f64) {
    let cube = pos.to_cube();
    let q = cube.x as f64;
    let r = cube.z as f64;
    let px = size * SQRT_3 * (q + r / 2.0);
    let py = size * 1.5 * r;
    (px, py)
}

/// Hex containing the given pixel (approximate, via cube rounding)
pub fn pixel_to_offset(px: f64, py: f64, size: f64) -> GridPosition {
    let q = (SQRT_3 / 3.0 * px - py / 3.0) / size;
    let r = (2.0 / 3.0 * py) / size;
    Cube::round(q, -q - r, r).to_offset()
}

/// Rectangular board bounds
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    pub rows: i32,
    pub cols: i32,
}

impl Board {
    pub const fn new(rows: i32, cols: i32) -> Self {
        Self { rows, cols }
    }

    /// Check if a position is on the board
    pub fn contains(&self, pos: GridPosition) -> bool {
        pos.row >= 0 && pos.col >= 0 && pos.row < self.rows && pos.col < self.cols
    }

    /// Iterate every position in row-major order
    pub fn positions(&self) -> impl Iterator<Item = GridPosition> + '_ {
        (0..self.rows).flat_map(move |row| (0..self.cols).map(move |col| GridPosition::new(row, col)))
    }

    /// In-bounds neighbors of a position
    pub fn neighbors(&self, pos: GridPosition) -> impl Iterator<Item = GridPosition> + '_ {
        pos.neighbors().into_iter().filter(move |n| self.contains(*n))
    }

    /// In-bounds positions within `radius` steps of `center` (center included)
    pub fn hexes_within(&self, center: GridPosition, radius: u32) -> Vec<GridPosition> {
        let r = radius as i32;
        let c = center.to_cube();
        let mut out = Vec::new();
        for dx in -r..=r {
            for dy in (-r).max(-dx - r)..=r.min(-dx + r) {
                let pos = (c + Cube::new(dx, dy, -dx - dy)).to_offset();
                if self.contains(pos) {
                    out.push(pos);
                }
            }
        }
        out.sort();
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    fn random_pos(rng: &mut ChaCha8Rng) -> GridPosition {
        GridPosition::new(rng.gen_range(-50..50), rng.gen_range(-50..50))
    }

    #[test]
    fn test_distance_identity_and_symmetry() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..500 {
            let a = random_pos(&mut rng);
            let b = random_pos(&mut rng);
            assert_eq!(a.distance_to(a), 0);
            assert_eq!(a.distance_to(b), b.distance_to(a));
            if a != b {
                assert!(a.distance_to(b) > 0);
            }
        }
    }

    #[test]
    fn test_triangle_inequality() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        for _ in 0..500 {
            let a = random_pos(&mut rng);
            let b = random_pos(&mut rng);
            let c = random_pos(&mut rng);
            assert!(a.distance_to(c) <= a.distance_to(b) + b.distance_to(c));
        }
    }

    #[test]
    fn test_offset_cube_roundtrip() {
        for row in -20..20 {
            for col in -20..20 {
                let pos = GridPosition::new(row, col);
                let cube = pos.to_cube();
                assert_eq!(cube.x + cube.y + cube.z, 0);
                assert_eq!(cube.to_offset(), pos);
            }
        }
    }

    #[test]
    fn test_neighbors() {
        for pos in [GridPosition::new(4, 4), GridPosition::new(5, 4), GridPosition::new(-3, 2)] {
            let neighbors = pos.neighbors();
            let mut unique = neighbors.to_vec();
            unique.sort();
            unique.dedup();
            assert_eq!(unique.len(), 6);
            for n in neighbors {
                assert_eq!(pos.distance_to(n), 1);
                assert!(n.neighbors().contains(&pos), "neighbor relation must be symmetric");
            }
        }
    }

    #[test]
    fn test_same_row_distance() {
        assert_eq!(GridPosition::new(5, 5).distance_to(GridPosition::new(5, 8)), 3);
        assert_eq!(GridPosition::new(5, 5).distance_to(GridPosition::new(5, 6)), 1);
    }

    #[test]
    fn test_pixel_roundtrip() {
        let board = Board::new(15, 20);
        for pos in board.positions() {
            let (px, py) = offset_to_pixel(pos, 32.0);
            assert_eq!(pixel_to_offset(px, py, 32.0), pos);
            // Nudged off-centre still lands in the same hex
            assert_eq!(pixel_to_offset(px + 5.0, py - 5.0, 32.0), pos);
        }
    }

    #[test]
    fn test_hexes_within() {
        let board = Board::new(30, 30);
        let center = GridPosition::new(10, 10);
        for radius in 0..=3u32 {
            let hexes = board.hexes_within(center, radius);
            let expected = 1 + 3 * radius * (radius + 1);
            assert_eq!(hexes.len() as u32, expected);
            assert!(hexes.iter().all(|h| center.distance_to(*h) <= radius));
        }
        // Corner clips to the board
        assert_eq!(board.hexes_within(GridPosition::new(0, 0), 1).len(), 3);
    }

    #[test]
    fn test_board_contains() {
        let board = Board::new(15, 20);
        assert!(board.contains(GridPosition::new(0, 0)));
        assert!(board.contains(GridPosition::new(14, 19)));
        assert!(!board.contains(GridPosition::new(15, 0)));
        assert!(!board.contains(GridPosition::new(0, 20)));
        assert!(!board.contains(GridPosition::new(-1, 3)));
    }
}
