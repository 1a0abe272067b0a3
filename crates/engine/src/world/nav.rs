use std::cmp::Reverse;
use std::collections::BinaryHeap;

use crate::geometry::Vec2;

use super::tilemap::{Tilemap, WALL_TILE_ID};

const STRAIGHT_COST: u32 = 10;
const DIAGONAL_COST: u32 = 14;

/// Fractions of a tile between line-of-sight samples.
const SIGHT_SAMPLES_PER_TILE: f32 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct TileCoord {
    pub x: u32,
    pub y: u32,
}

/// Walkability grid derived from a tilemap. Searches run over eight
/// directions without cutting wall corners, and the resulting tile chain is
/// pulled tight so mobs walk straight wherever the way is clear.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct NavGrid {
    width: u32,
    height: u32,
    origin: Vec2,
    tile_size: f32,
    walkable: Vec<bool>,
}

impl NavGrid {
    pub(crate) fn from_tilemap(tilemap: &Tilemap, tile_size: f32) -> Self {
        let walkable = (0..tilemap.height())
            .flat_map(|y| (0..tilemap.width()).map(move |x| (x, y)))
            .map(|(x, y)| tilemap.tile_at(x, y).is_some_and(|tile| tile != WALL_TILE_ID))
            .collect();
        Self {
            width: tilemap.width(),
            height: tilemap.height(),
            origin: tilemap.origin(),
            tile_size,
            walkable,
        }
    }

    fn tile_of(&self, pos: Vec2) -> Option<TileCoord> {
        let x = ((pos.x - self.origin.x) / self.tile_size).floor();
        let y = ((pos.y - self.origin.y) / self.tile_size).floor();
        if x < 0.0 || y < 0.0 || x >= self.width as f32 || y >= self.height as f32 {
            return None;
        }
        Some(TileCoord {
            x: x as u32,
            y: y as u32,
        })
    }

    fn center_of(&self, tile: TileCoord) -> Vec2 {
        Vec2::new(
            self.origin.x + (tile.x as f32 + 0.5) * self.tile_size,
            self.origin.y + (tile.y as f32 + 0.5) * self.tile_size,
        )
    }

    fn slot(&self, tile: TileCoord) -> Option<usize> {
        (tile.x < self.width && tile.y < self.height)
            .then(|| tile.y as usize * self.width as usize + tile.x as usize)
    }

    fn is_open(&self, tile: TileCoord) -> bool {
        self.slot(tile)
            .is_some_and(|slot| self.walkable.get(slot).copied().unwrap_or(false))
    }

    fn is_open_at(&self, pos: Vec2) -> bool {
        self.tile_of(pos).is_some_and(|tile| self.is_open(tile))
    }

    /// Waypoints after `start`, ending exactly at `goal`. Corners are kept
    /// only where a straight walk would cross a wall tile.
    pub(crate) fn find_path_world(&self, start: Vec2, goal: Vec2) -> Option<Vec<Vec2>> {
        let start_tile = self.tile_of(start)?;
        let goal_tile = self.tile_of(goal)?;
        let tiles = self.search(start_tile, goal_tile)?;

        let mut waypoints = Vec::new();
        let mut anchor = start;
        let mut previous = start;
        let corners = tiles
            .iter()
            .skip(1)
            .take(tiles.len().saturating_sub(2))
            .map(|tile| self.center_of(*tile))
            .chain(std::iter::once(goal));
        for point in corners {
            if previous != anchor && !self.has_line_of_sight(anchor, point) {
                waypoints.push(previous);
                anchor = previous;
            }
            previous = point;
        }
        waypoints.push(goal);
        Some(waypoints)
    }

    fn has_line_of_sight(&self, from: Vec2, to: Vec2) -> bool {
        let steps = (from.distance(to) / self.tile_size * SIGHT_SAMPLES_PER_TILE).ceil() as u32;
        (0..=steps.max(1)).all(|step| {
            let t = step as f32 / steps.max(1) as f32;
            self.is_open_at(Vec2::new(
                from.x + (to.x - from.x) * t,
                from.y + (to.y - from.y) * t,
            ))
        })
    }

    /// A* over tiles with octile costs. Ties resolve by heuristic, then row,
    /// then column, then insertion order, so equal maps give equal paths.
    pub(crate) fn search(&self, start: TileCoord, goal: TileCoord) -> Option<Vec<TileCoord>> {
        let start_slot = self.slot(start)?;
        let goal_slot = self.slot(goal)?;
        if !self.is_open(start) || !self.is_open(goal) {
            return None;
        }

        let node_count = self.walkable.len();
        let mut closed = vec![false; node_count];
        let mut best_cost = vec![u32::MAX; node_count];
        let mut came_from = vec![None::<usize>; node_count];
        let mut open = BinaryHeap::new();
        let mut inserted = 0u64;

        best_cost[start_slot] = 0;
        let start_h = octile_distance(start, goal);
        open.push(Reverse((start_h, start_h, start.y, start.x, inserted)));

        while let Some(Reverse((_, _, y, x, _))) = open.pop() {
            let current = TileCoord { x, y };
            let Some(current_slot) = self.slot(current) else {
                continue;
            };
            if std::mem::replace(&mut closed[current_slot], true) {
                continue;
            }
            if current_slot == goal_slot {
                return self.walk_back(&came_from, start_slot, goal_slot);
            }

            for (next, step_cost) in self.steps_from(current) {
                let Some(next_slot) = self.slot(next) else {
                    continue;
                };
                let cost = best_cost[current_slot].saturating_add(step_cost);
                if closed[next_slot] || cost >= best_cost[next_slot] {
                    continue;
                }
                best_cost[next_slot] = cost;
                came_from[next_slot] = Some(current_slot);
                let h = octile_distance(next, goal);
                inserted += 1;
                open.push(Reverse((cost.saturating_add(h), h, next.y, next.x, inserted)));
            }
        }

        None
    }

    /// Open neighbours with their step cost. A diagonal needs both of the
    /// straight tiles it passes between to be open.
    fn steps_from(&self, tile: TileCoord) -> Vec<(TileCoord, u32)> {
        let offset = |dx: i32, dy: i32| {
            let x = tile.x.checked_add_signed(dx)?;
            let y = tile.y.checked_add_signed(dy)?;
            let next = TileCoord { x, y };
            self.is_open(next).then_some(next)
        };

        let mut steps = Vec::with_capacity(8);
        for (dx, dy) in [(0, 1), (1, 0), (0, -1), (-1, 0)] {
            if let Some(next) = offset(dx, dy) {
                steps.push((next, STRAIGHT_COST));
            }
        }
        for (dx, dy) in [(1, 1), (1, -1), (-1, -1), (-1, 1)] {
            let corners_open = offset(dx, 0).is_some() && offset(0, dy).is_some();
            if let Some(next) = offset(dx, dy).filter(|_| corners_open) {
                steps.push((next, DIAGONAL_COST));
            }
        }
        steps
    }

    fn walk_back(
        &self,
        came_from: &[Option<usize>],
        start_slot: usize,
        goal_slot: usize,
    ) -> Option<Vec<TileCoord>> {
        let width = self.width as usize;
        let mut slots = vec![goal_slot];
        let mut cursor = goal_slot;
        while cursor != start_slot {
            cursor = came_from.get(cursor).copied().flatten()?;
            slots.push(cursor);
        }
        Some(
            slots
                .into_iter()
                .rev()
                .map(|slot| TileCoord {
                    x: (slot % width) as u32,
                    y: (slot / width) as u32,
                })
                .collect(),
        )
    }
}

fn octile_distance(a: TileCoord, b: TileCoord) -> u32 {
    let dx = a.x.abs_diff(b.x);
    let dy = a.y.abs_diff(b.y);
    STRAIGHT_COST * dx.max(dy) + (DIAGONAL_COST - STRAIGHT_COST) * dx.min(dy)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(width: u32, height: u32, tiles: Vec<u16>) -> NavGrid {
        let tilemap = Tilemap::new(width, height, Vec2::ZERO, tiles).expect("tilemap");
        NavGrid::from_tilemap(&tilemap, 1.0)
    }

    /// 7x5 with a wall column at x = 3 open only on the top row.
    fn walled() -> NavGrid {
        let mut tiles = vec![0u16; 35];
        for y in 0..4 {
            tiles[y * 7 + 3] = WALL_TILE_ID;
        }
        grid(7, 5, tiles)
    }

    #[test]
    fn open_field_path_is_a_straight_line() {
        let nav = grid(8, 8, vec![0; 64]);
        let goal = Vec2::new(7.5, 6.5);
        let path = nav.find_path_world(Vec2::new(0.5, 0.5), goal).expect("path");
        assert_eq!(path, vec![goal]);
    }

    #[test]
    fn path_detours_around_walls_without_crossing_them() {
        let nav = walled();
        let start = Vec2::new(1.5, 1.5);
        let goal = Vec2::new(5.5, 1.5);
        let path = nav.find_path_world(start, goal).expect("path");

        assert_eq!(path.last().copied(), Some(goal));
        assert!(path.len() > 1);
        let mut from = start;
        for waypoint in path {
            assert!(nav.has_line_of_sight(from, waypoint), "leg crosses a wall");
            from = waypoint;
        }
    }

    #[test]
    fn diagonals_do_not_cut_wall_corners() {
        #[rustfmt::skip]
        let nav = grid(2, 2, vec![
            0, 2,
            2, 0,
        ]);
        assert!(nav
            .search(TileCoord { x: 0, y: 0 }, TileCoord { x: 1, y: 1 })
            .is_none());
    }

    #[test]
    fn diagonal_steps_are_preferred_over_staircases() {
        let nav = grid(4, 4, vec![0; 16]);
        let tiles = nav
            .search(TileCoord { x: 0, y: 0 }, TileCoord { x: 3, y: 3 })
            .expect("tiles");
        assert_eq!(tiles.len(), 4);
    }

    #[test]
    fn equal_maps_give_equal_paths() {
        let mut tiles = vec![0u16; 25];
        tiles[12] = WALL_TILE_ID;
        let nav = grid(5, 5, tiles);
        let start = Vec2::new(0.5, 2.5);
        let goal = Vec2::new(4.5, 2.5);
        assert_eq!(nav.find_path_world(start, goal), nav.find_path_world(start, goal));
    }

    #[test]
    fn unreachable_or_outside_goals_have_no_path() {
        #[rustfmt::skip]
        let nav = grid(3, 3, vec![
            0, 2, 0,
            0, 2, 0,
            0, 2, 0,
        ]);
        assert!(nav
            .find_path_world(Vec2::new(0.5, 0.5), Vec2::new(2.5, 2.5))
            .is_none());
        assert!(nav
            .find_path_world(Vec2::new(0.5, 0.5), Vec2::new(-1.0, 0.5))
            .is_none());
    }
}
