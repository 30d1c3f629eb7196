use std::cmp::Reverse;
use std::collections::BinaryHeap;

use crate::geom::{TileCoord, Vec2, WorldBounds, TILE_SIZE};
use crate::obstacle::{Hazard, Obstacle};

pub const FLOW_REBUILD_THROTTLE_MS: f64 = 200.0;
pub const ORTHOGONAL_STEP_COST: u32 = 10;
pub const DIAGONAL_STEP_COST: u32 = 14;
pub const UNREACHABLE: u32 = u32::MAX;

const NEIGHBOR_OFFSETS: [(i32, i32); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// Tile-resolution passability and hazard grids derived from obstacles.
#[derive(Debug, Clone, PartialEq)]
pub struct NavGrid {
    bounds: WorldBounds,
    blocked: Vec<bool>,
    hazard: Vec<Hazard>,
}

impl NavGrid {
    pub fn open(bounds: WorldBounds) -> Self {
        Self {
            bounds,
            blocked: vec![false; bounds.tile_count()],
            hazard: vec![Hazard::None; bounds.tile_count()],
        }
    }

    pub fn from_obstacles(bounds: WorldBounds, obstacles: &[Obstacle]) -> Self {
        let mut grid = Self::open(bounds);
        for obstacle in obstacles {
            let blocks = obstacle.blocks_movement();
            let hazard = obstacle.hazard();
            if !blocks && hazard == Hazard::None {
                continue;
            }
            for tile in covered_tiles(bounds, obstacle) {
                if blocks {
                    grid.set_blocked(tile, true);
                }
                grid.raise_hazard(tile, hazard);
            }
        }
        grid
    }

    pub fn bounds(&self) -> WorldBounds {
        self.bounds
    }

    pub fn set_blocked(&mut self, tile: TileCoord, blocked: bool) {
        if let Some(index) = self.bounds.index_of(tile) {
            self.blocked[index] = blocked;
        }
    }

    pub fn raise_hazard(&mut self, tile: TileCoord, hazard: Hazard) {
        if let Some(index) = self.bounds.index_of(tile) {
            if hazard > self.hazard[index] {
                self.hazard[index] = hazard;
            }
        }
    }

    /// Out-of-bounds tiles report as blocked.
    pub fn is_blocked(&self, tile: TileCoord) -> bool {
        self.bounds
            .index_of(tile)
            .map(|index| self.blocked[index])
            .unwrap_or(true)
    }

    pub fn hazard_at(&self, tile: TileCoord) -> Hazard {
        self.bounds
            .index_of(tile)
            .map(|index| self.hazard[index])
            .unwrap_or_default()
    }

    fn offset(&self, tile: TileCoord, dx: i32, dy: i32) -> Option<TileCoord> {
        let x = tile.x as i64 + dx as i64;
        let y = tile.y as i64 + dy as i64;
        if x < 0 || y < 0 || x >= self.bounds.tile_w as i64 || y >= self.bounds.tile_h as i64 {
            return None;
        }
        Some(TileCoord {
            x: x as u32,
            y: y as u32,
        })
    }
}

fn covered_tiles(bounds: WorldBounds, obstacle: &Obstacle) -> impl Iterator<Item = TileCoord> {
    let rect = obstacle.rect;
    let valid = rect.x.is_finite()
        && rect.y.is_finite()
        && rect.w.is_finite()
        && rect.h.is_finite()
        && rect.w > 0.0
        && rect.h > 0.0
        && rect.right() > 0.0
        && rect.bottom() > 0.0
        && bounds.tile_w > 0
        && bounds.tile_h > 0;
    let (min_x, min_y, max_x, max_y) = if valid {
        let min_x = (rect.x / TILE_SIZE).floor().max(0.0) as u32;
        let min_y = (rect.y / TILE_SIZE).floor().max(0.0) as u32;
        let max_x = ((rect.right() / TILE_SIZE).ceil() - 1.0).max(0.0) as u32;
        let max_y = ((rect.bottom() / TILE_SIZE).ceil() - 1.0).max(0.0) as u32;
        (
            min_x,
            min_y,
            max_x.min(bounds.tile_w - 1),
            max_y.min(bounds.tile_h - 1),
        )
    } else {
        (1, 1, 0, 0)
    };
    (min_y..=max_y).flat_map(move |y| (min_x..=max_x).map(move |x| TileCoord { x, y }))
}

/// Distance-to-player field sampled by agents for steering.
#[derive(Debug, Clone)]
pub struct FlowField {
    bounds: WorldBounds,
    distances: Vec<u32>,
    dirty: bool,
    last_build_tile: Option<TileCoord>,
    last_build_ms: Option<f64>,
    throttle_ms: f64,
    build_count: u64,
}

impl Default for FlowField {
    fn default() -> Self {
        Self {
            bounds: WorldBounds::new(0, 0),
            distances: Vec::new(),
            dirty: true,
            last_build_tile: None,
            last_build_ms: None,
            throttle_ms: FLOW_REBUILD_THROTTLE_MS,
            build_count: 0,
        }
    }
}

impl FlowField {
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn build_count(&self) -> u64 {
        self.build_count
    }

    pub fn last_build_tile(&self) -> Option<TileCoord> {
        self.last_build_tile
    }

    pub fn needs_rebuild(&self, player_tile: TileCoord, now_ms: f64) -> bool {
        if self.dirty || self.last_build_tile != Some(player_tile) {
            return true;
        }
        match self.last_build_ms {
            Some(last) => now_ms - last >= self.throttle_ms,
            None => true,
        }
    }

    /// Rebuilds the field from `obstacles` when dirty, when the player changed
    /// tile, or when the throttle interval elapsed. Returns whether it rebuilt.
    pub fn refresh(
        &mut self,
        bounds: WorldBounds,
        obstacles: &[Obstacle],
        player: Vec2,
        now_ms: f64,
    ) -> bool {
        if bounds != self.bounds {
            self.dirty = true;
        }
        let Some(player_tile) = bounds.tile_at_world(player) else {
            return false;
        };
        if !self.needs_rebuild(player_tile, now_ms) {
            return false;
        }
        let grid = NavGrid::from_obstacles(bounds, obstacles);
        self.build(&grid, player_tile);
        self.last_build_ms = Some(now_ms);
        true
    }

    /// Single-source Dijkstra from `start` over 8-connected tiles.
    pub fn build(&mut self, grid: &NavGrid, start: TileCoord) {
        let bounds = grid.bounds();
        self.bounds = bounds;
        self.distances.clear();
        self.distances.resize(bounds.tile_count(), UNREACHABLE);
        self.dirty = false;
        self.last_build_tile = Some(start);
        self.build_count = self.build_count.saturating_add(1);

        let Some(start_index) = bounds.index_of(start) else {
            return;
        };
        self.distances[start_index] = 0;
        let mut frontier = BinaryHeap::new();
        frontier.push(Reverse((0u32, start_index)));

        while let Some(Reverse((distance, index))) = frontier.pop() {
            if distance > self.distances[index] {
                continue;
            }
            let current = tile_of(bounds, index);
            for (dx, dy) in NEIGHBOR_OFFSETS {
                let Some(next) = grid.offset(current, dx, dy) else {
                    continue;
                };
                if grid.is_blocked(next) {
                    continue;
                }
                let diagonal = dx != 0 && dy != 0;
                if diagonal {
                    let side_a = grid.offset(current, dx, 0);
                    let side_b = grid.offset(current, 0, dy);
                    let a_blocked = side_a.map_or(true, |tile| grid.is_blocked(tile));
                    let b_blocked = side_b.map_or(true, |tile| grid.is_blocked(tile));
                    if a_blocked && b_blocked {
                        continue;
                    }
                }
                let base = if diagonal {
                    DIAGONAL_STEP_COST
                } else {
                    ORTHOGONAL_STEP_COST
                };
                let step = base.saturating_mul(grid.hazard_at(next).cost_multiplier());
                let candidate = distance.saturating_add(step);
                let Some(next_index) = bounds.index_of(next) else {
                    continue;
                };
                if candidate < self.distances[next_index] {
                    self.distances[next_index] = candidate;
                    frontier.push(Reverse((candidate, next_index)));
                }
            }
        }
    }

    pub fn distance_at(&self, tile: TileCoord) -> Option<u32> {
        let index = self.bounds.index_of(tile)?;
        self.distances
            .get(index)
            .copied()
            .filter(|distance| *distance != UNREACHABLE)
    }

    /// Unit vector toward the strictly-closest neighbouring tile, or `None` when
    /// the position is unreachable, already on the player's tile, or stuck.
    pub fn sample_dir_at(&self, world: Vec2) -> Option<Vec2> {
        let tile = self.bounds.tile_at_world(world)?;
        let here = self.distance_at(tile)?;
        if here == 0 {
            return None;
        }
        let mut best: Option<(u32, i32, i32)> = None;
        for (dx, dy) in NEIGHBOR_OFFSETS {
            let x = tile.x as i64 + dx as i64;
            let y = tile.y as i64 + dy as i64;
            if x < 0 || y < 0 {
                continue;
            }
            let Some(distance) = self.distance_at(TileCoord {
                x: x as u32,
                y: y as u32,
            }) else {
                continue;
            };
            if distance >= here {
                continue;
            }
            if best.map_or(true, |(best_distance, _, _)| distance < best_distance) {
                best = Some((distance, dx, dy));
            }
        }
        let (_, dx, dy) = best?;
        Vec2::new(dx as f32, dy as f32).normalized()
    }
}

fn tile_of(bounds: WorldBounds, index: usize) -> TileCoord {
    let width = bounds.tile_w.max(1) as usize;
    TileCoord {
        x: (index % width) as u32,
        y: (index / width) as u32,
    }
}
