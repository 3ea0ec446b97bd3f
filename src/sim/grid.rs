//! Tile grid: fixed-size square tiles, each carrying one material
//!
//! Tiles are stored row-major from the bottom-left corner, so tile (col, row)
//! covers pixels `[col * L, col * L + L - 1] x [row * L, row * L + L - 1]`.

use glam::IVec2;
use serde::{Deserialize, Serialize};

use super::collision::PixelBox;
use super::material::Material;
use crate::error::{SimError, SimResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileGrid {
    tile_length: i32,
    tiles_x: i32,
    tiles_y: i32,
    tiles: Vec<Material>,
}

impl TileGrid {
    /// Build a grid from row-major tile materials
    ///
    /// A short `features` list is padded with air; a list longer than
    /// `tiles_x * tiles_y` is rejected.
    pub fn new(
        tile_length: i32,
        tiles_x: i32,
        tiles_y: i32,
        mut features: Vec<Material>,
    ) -> SimResult<Self> {
        if tile_length <= 0 || tiles_x <= 0 || tiles_y <= 0 {
            return Err(SimError::InvalidGrid(format!(
                "dimensions must be positive, got length {tile_length} and {tiles_x}x{tiles_y} tiles"
            )));
        }
        let count = (tiles_x as usize)
            .checked_mul(tiles_y as usize)
            .ok_or_else(|| SimError::InvalidGrid("tile count overflows".into()))?;
        if features.len() > count {
            return Err(SimError::InvalidGrid(format!(
                "{} features for {count} tiles",
                features.len()
            )));
        }
        features.resize(count, Material::Air);
        Ok(Self {
            tile_length,
            tiles_x,
            tiles_y,
            tiles: features,
        })
    }

    /// Like [`TileGrid::new`] but from numeric material ids
    pub fn from_ids(tile_length: i32, tiles_x: i32, tiles_y: i32, ids: &[u8]) -> SimResult<Self> {
        let features = ids
            .iter()
            .map(|&id| Material::from_id(id))
            .collect::<SimResult<Vec<_>>>()?;
        Self::new(tile_length, tiles_x, tiles_y, features)
    }

    /// A grid without tiles; every query answers air
    pub fn empty() -> Self {
        Self {
            tile_length: 1,
            tiles_x: 0,
            tiles_y: 0,
            tiles: Vec::new(),
        }
    }

    pub fn tile_length(&self) -> i32 {
        self.tile_length
    }

    pub fn tiles_x(&self) -> i32 {
        self.tiles_x
    }

    pub fn tiles_y(&self) -> i32 {
        self.tiles_y
    }

    pub fn width_pixels(&self) -> i32 {
        self.tiles_x * self.tile_length
    }

    pub fn height_pixels(&self) -> i32 {
        self.tiles_y * self.tile_length
    }

    /// Bottom-left pixel of the tile at row-major `index`
    pub fn tile_origin(&self, index: usize) -> IVec2 {
        let cols = self.tiles_x.max(1) as usize;
        IVec2::new(
            self.tile_length * (index % cols) as i32,
            self.tile_length * (index / cols) as i32,
        )
    }

    /// Tile column/row containing a pixel; `None` outside the grid
    pub fn tile_of(&self, px: i32, py: i32) -> Option<(i32, i32)> {
        if px < 0 || py < 0 {
            return None;
        }
        let (col, row) = (px / self.tile_length, py / self.tile_length);
        (col < self.tiles_x && row < self.tiles_y).then_some((col, row))
    }

    #[inline]
    pub fn tile(&self, col: i32, row: i32) -> Material {
        if col < 0 || row < 0 || col >= self.tiles_x || row >= self.tiles_y {
            return Material::Air;
        }
        self.tiles[(row * self.tiles_x + col) as usize]
    }

    /// Material at a pixel; air outside the grid
    #[inline]
    pub fn material_at(&self, px: i32, py: i32) -> Material {
        match self.tile_of(px, py) {
            Some((col, row)) => self.tile(col, row),
            None => Material::Air,
        }
    }

    #[inline]
    pub fn is_passable_at(&self, px: i32, py: i32) -> bool {
        self.material_at(px, py).is_passable()
    }

    /// Replace the material of the tile containing a pixel
    pub fn set_material_at(&mut self, px: i32, py: i32, material: Material) -> SimResult<()> {
        let (col, row) = self
            .tile_of(px, py)
            .ok_or_else(|| SimError::InvalidGrid(format!("pixel ({px}, {py}) is outside the grid")))?;
        self.tiles[(row * self.tiles_x + col) as usize] = material;
        Ok(())
    }

    /// Unit box of the tile at (col, row)
    pub fn tile_box(&self, col: i32, row: i32) -> PixelBox {
        PixelBox::new(
            col * self.tile_length,
            row * self.tile_length,
            self.tile_length,
            self.tile_length,
        )
    }

    /// Tiles whose box can overlap `bbox`, clipped to the grid
    pub fn tiles_under(&self, bbox: PixelBox) -> impl Iterator<Item = (i32, i32)> + '_ {
        let lo_col = (bbox.x.max(0) / self.tile_length).min(self.tiles_x);
        let lo_row = (bbox.y.max(0) / self.tile_length).min(self.tiles_y);
        let hi_col = if bbox.right() < 0 {
            -1
        } else {
            (bbox.right() / self.tile_length).min(self.tiles_x - 1)
        };
        let hi_row = if bbox.top() < 0 {
            -1
        } else {
            (bbox.top() / self.tile_length).min(self.tiles_y - 1)
        };
        (lo_row..=hi_row).flat_map(move |row| (lo_col..=hi_col).map(move |col| (col, row)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> TileGrid {
        // 3x2 tiles of 10px: bottom row solid/water/magma, top row air/ice/gas
        TileGrid::from_ids(10, 3, 2, &[1, 2, 3, 0, 4, 5]).unwrap()
    }

    #[test]
    fn test_material_lookup() {
        let grid = grid();
        assert_eq!(grid.material_at(0, 0), Material::Solid);
        assert_eq!(grid.material_at(9, 9), Material::Solid);
        assert_eq!(grid.material_at(10, 0), Material::Water);
        assert_eq!(grid.material_at(25, 5), Material::Magma);
        assert_eq!(grid.material_at(15, 15), Material::Ice);
        assert_eq!(grid.material_at(29, 19), Material::Gas);
    }

    #[test]
    fn test_out_of_range_is_air() {
        let grid = grid();
        assert_eq!(grid.material_at(-1, 0), Material::Air);
        assert_eq!(grid.material_at(30, 0), Material::Air);
        assert_eq!(grid.material_at(0, 20), Material::Air);
        assert_eq!(TileGrid::empty().material_at(0, 0), Material::Air);
    }

    #[test]
    fn test_short_features_are_padded() {
        let grid = TileGrid::from_ids(5, 2, 2, &[1]).unwrap();
        assert_eq!(grid.material_at(0, 0), Material::Solid);
        assert_eq!(grid.material_at(5, 0), Material::Air);
        assert_eq!(grid.material_at(9, 9), Material::Air);
    }

    #[test]
    fn test_oversized_features_rejected() {
        assert!(TileGrid::from_ids(5, 1, 1, &[1, 1]).is_err());
        assert!(TileGrid::new(0, 1, 1, vec![]).is_err());
        assert!(TileGrid::from_ids(5, 1, 1, &[9]).is_err());
    }

    #[test]
    fn test_tile_origin_and_size() {
        let grid = grid();
        assert_eq!(grid.tile_origin(0), IVec2::new(0, 0));
        assert_eq!(grid.tile_origin(2), IVec2::new(20, 0));
        assert_eq!(grid.tile_origin(4), IVec2::new(10, 10));
        assert_eq!(grid.width_pixels(), 30);
        assert_eq!(grid.height_pixels(), 20);
    }

    #[test]
    fn test_set_material() {
        let mut grid = grid();
        grid.set_material_at(12, 3, Material::Air).unwrap();
        assert_eq!(grid.material_at(10, 0), Material::Air);
        assert!(grid.set_material_at(31, 0, Material::Air).is_err());
    }

    #[test]
    fn test_tiles_under_clips_to_grid() {
        let grid = grid();
        let tiles: Vec<_> = grid.tiles_under(PixelBox::new(8, 8, 5, 5)).collect();
        assert_eq!(tiles, vec![(0, 0), (1, 0), (0, 1), (1, 1)]);
        let outside: Vec<_> = grid.tiles_under(PixelBox::new(-20, -20, 5, 5)).collect();
        assert!(outside.is_empty());
        let edge: Vec<_> = grid.tiles_under(PixelBox::new(25, 15, 40, 40)).collect();
        assert_eq!(edge, vec![(2, 1)]);
    }
}
