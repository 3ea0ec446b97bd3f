//! Collision queries over pixel boxes
//!
//! Everything here is a total predicate on integers. Boxes are inclusive on
//! both ends: a box at `x` with width `w` covers columns `x ..= x + w - 1`,
//! so two boxes sharing a single pixel column already overlap.

use serde::{Deserialize, Serialize};

use super::entity::{Entity, EntityId, Kind};
use super::grid::TileGrid;
use super::material::Material;

/// Axis-aligned pixel rectangle anchored at its bottom-left pixel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelBox {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl PixelBox {
    pub const fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }

    /// Rightmost covered column
    #[inline]
    pub fn right(&self) -> i32 {
        self.x + self.w - 1
    }

    /// Topmost covered row
    #[inline]
    pub fn top(&self) -> i32 {
        self.y + self.h - 1
    }

    #[inline]
    pub fn overlaps(&self, other: &PixelBox) -> bool {
        boxes_overlap(*self, *other)
    }

    pub fn at(&self, x: i32, y: i32) -> Self {
        Self { x, y, ..*self }
    }

    /// Same box extended by `margin` pixels on every side
    pub fn grown(&self, margin: i32) -> Self {
        Self::new(self.x - margin, self.y - margin, self.w + 2 * margin, self.h + 2 * margin)
    }
}

/// True unless the two boxes are strictly separated on some axis
#[inline]
pub fn boxes_overlap(a: PixelBox, b: PixelBox) -> bool {
    !(a.right() < b.x || b.right() < a.x || a.top() < b.y || b.top() < a.y)
}

// === Terrain probes ===

#[inline]
fn impassable(grid: &TileGrid, px: i32, py: i32) -> bool {
    !grid.is_passable_at(px, py)
}

/// Impassable terrain in the column just right of the box, ignoring its
/// bottom row
pub fn bumps_right(grid: &TileGrid, b: PixelBox) -> bool {
    (1..b.h).any(|i| impassable(grid, b.x + b.w, b.y + i))
}

/// Impassable terrain in the column just left of the box, ignoring its
/// bottom row
pub fn bumps_left(grid: &TileGrid, b: PixelBox) -> bool {
    (1..b.h).any(|i| impassable(grid, b.x - 1, b.y + i))
}

/// Impassable terrain in the row just above the box, ignoring its leftmost
/// column
pub fn bumps_above(grid: &TileGrid, b: PixelBox) -> bool {
    (1..b.w).any(|i| impassable(grid, b.x + i, b.y + b.h))
}

/// Bottom edge straddles a passable/impassable boundary
///
/// Either the bottom row is passable with impassable terrain right under it,
/// or the bottom row has sunk one pixel into an impassable surface.
pub fn stands_on_impassable(grid: &TileGrid, b: PixelBox) -> bool {
    (0..b.w).any(|i| {
        let col = b.x + i;
        let here = impassable(grid, col, b.y);
        (!here && impassable(grid, col, b.y - 1)) || (here && !impassable(grid, col, b.y + 1))
    })
}

/// Bottom row embedded in the top pixel row of an impassable surface
///
/// Such a placement is accepted when an entity is added to a world even
/// though it technically overlaps terrain.
pub fn rests_in_surface(grid: &TileGrid, b: PixelBox) -> bool {
    (0..b.w).any(|i| impassable(grid, b.x + i, b.y) && !impassable(grid, b.x + i, b.y + 1))
}

/// Box overlaps at least one tile carrying `material`
pub fn overlaps_material(grid: &TileGrid, b: PixelBox, material: Material) -> bool {
    grid.tiles_under(b)
        .any(|(col, row)| grid.tile(col, row) == material && grid.tile_box(col, row).overlaps(&b))
}

/// Box overlaps at least one tile carrying any of `materials`
pub fn overlaps_any_material(grid: &TileGrid, b: PixelBox, materials: &[Material]) -> bool {
    grid.tiles_under(b).any(|(col, row)| {
        materials.contains(&grid.tile(col, row)) && grid.tile_box(col, row).overlaps(&b)
    })
}

pub fn overlaps_impassable(grid: &TileGrid, b: PixelBox) -> bool {
    grid.tiles_under(b)
        .any(|(col, row)| !grid.tile(col, row).is_passable() && grid.tile_box(col, row).overlaps(&b))
}

/// Water in the row just above the box (a shark's notion of being submerged)
pub fn submerged(grid: &TileGrid, b: PixelBox) -> bool {
    (0..=b.w).any(|i| grid.material_at(b.x + i, b.y + b.h) == Material::Water)
}

// === Entity probes ===

/// Entities that block movement; plants are walked through
#[inline]
pub fn is_solid(kind: Kind) -> bool {
    !kind.is_plant()
}

fn live(others: &[Entity]) -> impl Iterator<Item = &Entity> {
    others.iter().filter(|e| !e.is_terminated())
}

/// First solid entity whose box overlaps `b`
pub fn solid_overlapping(others: &[Entity], b: PixelBox) -> Option<EntityId> {
    live(others)
        .filter(|e| is_solid(e.kind()))
        .find(|e| e.bbox().overlaps(&b))
        .and_then(Entity::id)
}

/// Some solid entity's top edge is exactly this box's bottom edge and the
/// two share at least one column
pub fn stands_on_entity(others: &[Entity], b: PixelBox) -> bool {
    live(others).filter(|e| is_solid(e.kind())).any(|e| {
        let o = e.bbox();
        o.y + o.h == b.y && o.x <= b.right() && b.x <= o.right()
    })
}

/// Ids of entities of `kind` overlapping `b`
pub fn overlapping_kind(others: &[Entity], b: PixelBox, kind: Kind) -> Vec<EntityId> {
    live(others)
        .filter(|e| e.kind() == kind && e.bbox().overlaps(&b))
        .filter_map(Entity::id)
        .collect()
}

/// World size in pixels; detached entities use [`WorldBounds::UNBOUNDED`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldBounds {
    pub width: i32,
    pub height: i32,
}

impl WorldBounds {
    pub const UNBOUNDED: WorldBounds = WorldBounds {
        width: i32::MAX,
        height: i32::MAX,
    };

    pub fn of(grid: &TileGrid) -> Self {
        Self {
            width: grid.width_pixels(),
            height: grid.height_pixels(),
        }
    }

    /// Pixel position lies outside `[0, width] x [0, height]`
    pub fn excludes(&self, px: i32, py: i32) -> bool {
        px < 0 || py < 0 || px > self.width || py > self.height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 10 tiles wide, 4 high, 10px tiles; floor row solid, a wall at column 5
    /// on row 1, ice on column 9 row 3
    fn terrain() -> TileGrid {
        let mut ids = vec![0u8; 40];
        ids[..10].fill(1);
        ids[15] = 1;
        ids[39] = 4;
        TileGrid::from_ids(10, 10, 4, &ids).unwrap()
    }

    #[test]
    fn test_touching_edges_overlap() {
        let a = PixelBox::new(0, 0, 10, 10);
        assert!(boxes_overlap(a, PixelBox::new(9, 0, 10, 10)));
        assert!(boxes_overlap(a, PixelBox::new(0, 9, 10, 10)));
        assert!(!boxes_overlap(a, PixelBox::new(10, 0, 10, 10)));
        assert!(!boxes_overlap(a, PixelBox::new(0, -10, 10, 10)));
    }

    #[test]
    fn test_stands_on_floor() {
        let grid = terrain();
        // Resting on top of the floor row
        assert!(stands_on_impassable(&grid, PixelBox::new(0, 10, 5, 5)));
        // Sunk one pixel into it
        assert!(stands_on_impassable(&grid, PixelBox::new(0, 9, 5, 5)));
        // Floating
        assert!(!stands_on_impassable(&grid, PixelBox::new(0, 12, 5, 5)));
        // Two pixels deep
        assert!(!stands_on_impassable(&grid, PixelBox::new(0, 8, 5, 5)));
    }

    #[test]
    fn test_side_bumps() {
        let grid = terrain();
        // Wall tile covers x 50..=59, y 10..=19
        let left_of_wall = PixelBox::new(40, 10, 10, 8);
        assert!(bumps_right(&grid, left_of_wall));
        assert!(!bumps_left(&grid, left_of_wall));
        let right_of_wall = PixelBox::new(60, 10, 10, 8);
        assert!(bumps_left(&grid, right_of_wall));
        assert!(!bumps_right(&grid, right_of_wall));
        // Only the bottom row touches the wall height band: ignored
        assert!(!bumps_right(&grid, PixelBox::new(40, 19, 10, 8)));
    }

    #[test]
    fn test_bumps_above() {
        let grid = terrain();
        // Box directly under the wall tile
        assert!(bumps_above(&grid, PixelBox::new(48, 0, 6, 10)));
        // Only the leftmost column reaches under the wall
        assert!(!bumps_above(&grid, PixelBox::new(59, 0, 6, 10)));
    }

    #[test]
    fn test_material_zone_overlap() {
        let grid = terrain();
        assert!(overlaps_material(&grid, PixelBox::new(95, 35, 3, 3), Material::Ice));
        assert!(!overlaps_material(&grid, PixelBox::new(80, 35, 10, 3), Material::Ice));
        // No water anywhere: never overlapping
        assert!(!overlaps_material(&grid, PixelBox::new(0, 0, 100, 40), Material::Water));
        assert!(overlaps_any_material(
            &grid,
            PixelBox::new(95, 35, 3, 3),
            &[Material::Water, Material::Ice]
        ));
        assert!(overlaps_impassable(&grid, PixelBox::new(0, 5, 3, 3)));
        assert!(!overlaps_impassable(&grid, PixelBox::new(0, 10, 3, 3)));
    }

    #[test]
    fn test_rests_in_surface() {
        let grid = terrain();
        assert!(rests_in_surface(&grid, PixelBox::new(0, 9, 5, 5)));
        assert!(!rests_in_surface(&grid, PixelBox::new(0, 8, 5, 5)));
        assert!(!rests_in_surface(&grid, PixelBox::new(0, 10, 5, 5)));
    }

    #[test]
    fn test_world_bounds() {
        let bounds = WorldBounds::of(&terrain());
        assert_eq!(bounds, WorldBounds { width: 100, height: 40 });
        assert!(!bounds.excludes(100, 40));
        assert!(bounds.excludes(101, 0));
        assert!(bounds.excludes(0, -1));
        assert!(!WorldBounds::UNBOUNDED.excludes(1_000_000, 1_000_000));
    }
}
