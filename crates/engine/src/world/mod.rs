//! World collaborators consumed by the mob tick: movement resolution against
//! walls, ground height, hazard lookup and pathfinding.

mod nav;
mod tilemap;

use crate::geometry::Vec2;

pub use tilemap::{AreaGeometry, Tilemap, TilemapError, WALL_TILE_ID};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoveResolution {
    pub position: Vec2,
    pub touched_wall: bool,
}

pub trait WorldGeometry {
    /// Corrected end position of a horizontal move of a circle of `radius`.
    fn resolve_horizontal(&self, from: Vec2, to: Vec2, radius: f32) -> MoveResolution;

    fn ground_z_at(&self, pos: Vec2) -> f32;

    fn hazard_at(&self, pos: Vec2) -> Option<&str>;

    /// Ordered waypoints ending at `end`, or `None` when unreachable.
    fn find_path(&self, start: Vec2, end: Vec2) -> Option<Vec<Vec2>>;
}
