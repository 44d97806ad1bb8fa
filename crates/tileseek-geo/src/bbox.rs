//! Axis-aligned bounding boxes and the containment test.

use crate::{Crs, Point};
use serde::{Deserialize, Serialize};

/// Geographic bounds of a tile.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Minimum x (west edge).
    pub west: f64,
    /// Maximum x (east edge).
    pub east: f64,
    /// Maximum y (north edge).
    pub north: f64,
    /// Minimum y (south edge).
    pub south: f64,
    /// Reference system of the four edges.
    pub crs: Crs,
}

impl BoundingBox {
    /// Create a bounding box. Edges are stored as given; see [`is_well_formed`](Self::is_well_formed).
    pub fn new(west: f64, east: f64, north: f64, south: f64, crs: Crs) -> Self {
        Self {
            west,
            east,
            north,
            south,
            crs,
        }
    }

    /// Edges are finite and ordered (`west <= east`, `south <= north`).
    ///
    /// A box that is not well formed contains no point.
    pub fn is_well_formed(&self) -> bool {
        let finite = self.west.is_finite()
            && self.east.is_finite()
            && self.north.is_finite()
            && self.south.is_finite();
        finite && self.west <= self.east && self.south <= self.north
    }

    /// Check if a point is within the bounds. Edges are inclusive.
    ///
    /// Only coordinates are compared; the caller is responsible for making
    /// sure `point` is expressed in `self.crs`.
    pub fn contains(&self, point: &Point) -> bool {
        point.x >= self.west && point.x <= self.east && point.y >= self.south && point.y <= self.north
    }
}

/// Does `point` lie inside the closed box `bbox`?
pub fn contains(point: &Point, bbox: &BoundingBox) -> bool {
    bbox.contains(point)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ohio_tile() -> BoundingBox {
        BoundingBox::new(-83.0, -82.0, 41.0, 40.0, Crs::WGS84)
    }

    #[test]
    fn test_contains_interior() {
        assert!(contains(&Point::lon_lat(-82.5, 40.5), &ohio_tile()));
    }

    #[test]
    fn test_contains_edges_and_corners() {
        let tile = ohio_tile();
        let on_edge = [
            Point::lon_lat(-83.0, 40.5), // west
            Point::lon_lat(-82.0, 40.5), // east
            Point::lon_lat(-82.5, 41.0), // north
            Point::lon_lat(-82.5, 40.0), // south
            Point::lon_lat(-83.0, 41.0),
            Point::lon_lat(-82.0, 40.0),
        ];
        for p in on_edge {
            assert!(contains(&p, &tile), "{} should be on the tile boundary", p);
        }
    }

    #[test]
    fn test_contains_outside() {
        let tile = ohio_tile();
        let outside = [
            Point::lon_lat(-83.000001, 40.5),
            Point::lon_lat(-81.999999, 40.5),
            Point::lon_lat(-82.5, 41.000001),
            Point::lon_lat(-82.5, 39.999999),
        ];
        for p in outside {
            assert!(!contains(&p, &tile), "{} should be outside", p);
        }
    }

    #[test]
    fn test_contains_matches_definition_over_grid() {
        let tile = ohio_tile();
        for i in 0..=40 {
            for j in 0..=40 {
                let x = -83.5 + i as f64 * 0.05;
                let y = 39.5 + j as f64 * 0.05;
                let expected = (-83.0..=-82.0).contains(&x) && (40.0..=41.0).contains(&y);
                assert_eq!(contains(&Point::lon_lat(x, y), &tile), expected, "x={} y={}", x, y);
            }
        }
    }

    #[test]
    fn test_inverted_box_contains_nothing() {
        let inverted = BoundingBox::new(-82.0, -83.0, 41.0, 40.0, Crs::WGS84);
        assert!(!inverted.is_well_formed());
        assert!(!contains(&Point::lon_lat(-82.5, 40.5), &inverted));

        let upside_down = BoundingBox::new(-83.0, -82.0, 40.0, 41.0, Crs::WGS84);
        assert!(!upside_down.is_well_formed());
        assert!(!contains(&Point::lon_lat(-82.5, 40.5), &upside_down));
    }

    #[test]
    fn test_nan_edges() {
        let tile = BoundingBox::new(f64::NAN, -82.0, 41.0, 40.0, Crs::WGS84);
        assert!(!tile.is_well_formed());
        assert!(!contains(&Point::lon_lat(-82.5, 40.5), &tile));
    }

    #[test]
    fn test_degenerate_box() {
        let tile = BoundingBox::new(-82.5, -82.5, 40.5, 40.5, Crs::WGS84);
        assert!(tile.is_well_formed());
        assert!(contains(&Point::lon_lat(-82.5, 40.5), &tile));
        assert!(!contains(&Point::lon_lat(-82.5, 40.500001), &tile));
    }
}
