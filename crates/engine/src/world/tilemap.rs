use std::collections::BTreeMap;

use thiserror::Error;

use crate::geometry::Vec2;

use super::nav::NavGrid;
use super::{MoveResolution, WorldGeometry};

/// Tile id that blocks movement and pathfinding.
pub const WALL_TILE_ID: u16 = 2;

#[derive(Debug, Clone)]
pub struct Tilemap {
    width: u32,
    height: u32,
    origin: Vec2,
    tiles: Vec<u16>,
}

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum TilemapError {
    #[error("tile count mismatch: expected {expected}, got {actual}")]
    TileCountMismatch { expected: usize, actual: usize },
    #[error("ground height count mismatch: expected {expected}, got {actual}")]
    HeightCountMismatch { expected: usize, actual: usize },
    #[error("tile size must be finite and > 0, got {0}")]
    InvalidTileSize(f32),
}

impl Tilemap {
    pub fn new(
        width: u32,
        height: u32,
        origin: Vec2,
        tiles: Vec<u16>,
    ) -> Result<Self, TilemapError> {
        let expected = width as usize * height as usize;
        let actual = tiles.len();
        if expected != actual {
            return Err(TilemapError::TileCountMismatch { expected, actual });
        }
        Ok(Self {
            width,
            height,
            origin,
            tiles,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn origin(&self) -> Vec2 {
        self.origin
    }

    pub fn index_of(&self, x: u32, y: u32) -> Option<usize> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(y as usize * self.width as usize + x as usize)
    }

    pub fn tile_at(&self, x: u32, y: u32) -> Option<u16> {
        self.index_of(x, y)
            .and_then(|index| self.tiles.get(index).copied())
    }
}

/// Tile-based area geometry: walls, per-tile ground height and hazard tiles.
#[derive(Debug, Clone)]
pub struct AreaGeometry {
    tilemap: Tilemap,
    tile_size: f32,
    ground_heights: Vec<f32>,
    tile_hazards: BTreeMap<u16, String>,
    nav: NavGrid,
}

impl AreaGeometry {
    pub fn new(
        tilemap: Tilemap,
        tile_size: f32,
        ground_heights: Option<Vec<f32>>,
        tile_hazards: BTreeMap<u16, String>,
    ) -> Result<Self, TilemapError> {
        if !tile_size.is_finite() || tile_size <= 0.0 {
            return Err(TilemapError::InvalidTileSize(tile_size));
        }
        let expected = tilemap.width() as usize * tilemap.height() as usize;
        let ground_heights = match ground_heights {
            Some(heights) if heights.len() != expected => {
                return Err(TilemapError::HeightCountMismatch {
                    expected,
                    actual: heights.len(),
                })
            }
            Some(heights) => heights,
            None => vec![0.0; expected],
        };
        let nav = NavGrid::from_tilemap(&tilemap, tile_size);
        Ok(Self {
            tilemap,
            tile_size,
            ground_heights,
            tile_hazards,
            nav,
        })
    }

    /// Open floor of `width` x `height` tiles anchored at the world origin.
    pub fn flat(width: u32, height: u32, tile_size: f32) -> Result<Self, TilemapError> {
        let tiles = vec![0u16; width as usize * height as usize];
        let tilemap = Tilemap::new(width, height, Vec2::ZERO, tiles)?;
        Self::new(tilemap, tile_size, None, BTreeMap::new())
    }

    pub fn tilemap(&self) -> &Tilemap {
        &self.tilemap
    }

    pub fn tile_size(&self) -> f32 {
        self.tile_size
    }

    fn tile_coords(&self, pos: Vec2) -> Option<(u32, u32)> {
        let origin = self.tilemap.origin();
        let tx = ((pos.x - origin.x) / self.tile_size).floor();
        let ty = ((pos.y - origin.y) / self.tile_size).floor();
        if tx < 0.0 || ty < 0.0 {
            return None;
        }
        let (tx, ty) = (tx as u32, ty as u32);
        self.tilemap.index_of(tx, ty)?;
        Some((tx, ty))
    }

    fn is_blocked_tile(&self, x: i64, y: i64) -> bool {
        if x < 0 || y < 0 {
            return true;
        }
        match self.tilemap.tile_at(x as u32, y as u32) {
            Some(tile) => tile == WALL_TILE_ID,
            None => true,
        }
    }

    fn circle_hits_wall(&self, center: Vec2, radius: f32) -> bool {
        let origin = self.tilemap.origin();
        let min_x = ((center.x - radius - origin.x) / self.tile_size).floor() as i64;
        let max_x = ((center.x + radius - origin.x) / self.tile_size).floor() as i64;
        let min_y = ((center.y - radius - origin.y) / self.tile_size).floor() as i64;
        let max_y = ((center.y + radius - origin.y) / self.tile_size).floor() as i64;

        for ty in min_y..=max_y {
            for tx in min_x..=max_x {
                if !self.is_blocked_tile(tx, ty) {
                    continue;
                }
                let left = origin.x + tx as f32 * self.tile_size;
                let bottom = origin.y + ty as f32 * self.tile_size;
                let closest = Vec2::new(
                    center.x.clamp(left, left + self.tile_size),
                    center.y.clamp(bottom, bottom + self.tile_size),
                );
                if closest.distance(center) < radius {
                    return true;
                }
            }
        }
        false
    }
}

impl WorldGeometry for AreaGeometry {
    fn resolve_horizontal(&self, from: Vec2, to: Vec2, radius: f32) -> MoveResolution {
        if !self.circle_hits_wall(to, radius) {
            return MoveResolution {
                position: to,
                touched_wall: false,
            };
        }

        // Slide along whichever axis is still free.
        let slide_x = Vec2::new(to.x, from.y);
        let slide_y = Vec2::new(from.x, to.y);
        let position = if to.x != from.x && !self.circle_hits_wall(slide_x, radius) {
            slide_x
        } else if to.y != from.y && !self.circle_hits_wall(slide_y, radius) {
            slide_y
        } else {
            from
        };
        MoveResolution {
            position,
            touched_wall: true,
        }
    }

    fn ground_z_at(&self, pos: Vec2) -> f32 {
        self.tile_coords(pos)
            .and_then(|(x, y)| self.tilemap.index_of(x, y))
            .and_then(|index| self.ground_heights.get(index).copied())
            .unwrap_or(0.0)
    }

    fn hazard_at(&self, pos: Vec2) -> Option<&str> {
        let (x, y) = self.tile_coords(pos)?;
        let tile = self.tilemap.tile_at(x, y)?;
        self.tile_hazards.get(&tile).map(String::as_str)
    }

    fn find_path(&self, start: Vec2, end: Vec2) -> Option<Vec<Vec2>> {
        self.nav.find_path_world(start, end)
    }
}
