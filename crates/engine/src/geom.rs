use serde::{Deserialize, Serialize};

/// Edge length of one world tile in pixels.
pub const TILE_SIZE: f32 = 32.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn length(self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn distance_sq(self, other: Vec2) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    pub fn normalized(self) -> Option<Vec2> {
        let length = self.length();
        if !length.is_finite() || length <= f32::EPSILON {
            return None;
        }
        Some(Vec2 {
            x: self.x / length,
            y: self.y / length,
        })
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Axis-aligned rectangle in world pixels; `(x, y)` is the top-left corner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    pub fn from_tiles(tile_x: u32, tile_y: u32, tiles_w: u32, tiles_h: u32) -> Self {
        Self {
            x: tile_x as f32 * TILE_SIZE,
            y: tile_y as f32 * TILE_SIZE,
            w: tiles_w as f32 * TILE_SIZE,
            h: tiles_h as f32 * TILE_SIZE,
        }
    }

    pub fn centered_at(center: Vec2, w: f32, h: f32) -> Self {
        Self {
            x: center.x - w * 0.5,
            y: center.y - h * 0.5,
            w,
            h,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.w
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.h
    }

    pub fn center(&self) -> Vec2 {
        Vec2 {
            x: self.x + self.w * 0.5,
            y: self.y + self.h * 0.5,
        }
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    pub fn contains_point(&self, point: Vec2) -> bool {
        point.x >= self.x && point.x < self.right() && point.y >= self.y && point.y < self.bottom()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileCoord {
    pub x: u32,
    pub y: u32,
}

/// World size in tiles. Pixel extents derive from [`TILE_SIZE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldBounds {
    pub tile_w: u32,
    pub tile_h: u32,
}

impl Default for WorldBounds {
    fn default() -> Self {
        Self {
            tile_w: 64,
            tile_h: 48,
        }
    }
}

impl WorldBounds {
    pub fn new(tile_w: u32, tile_h: u32) -> Self {
        Self { tile_w, tile_h }
    }

    pub fn pixel_w(&self) -> f32 {
        self.tile_w as f32 * TILE_SIZE
    }

    pub fn pixel_h(&self) -> f32 {
        self.tile_h as f32 * TILE_SIZE
    }

    pub fn tile_count(&self) -> usize {
        self.tile_w as usize * self.tile_h as usize
    }

    pub fn index_of(&self, tile: TileCoord) -> Option<usize> {
        if tile.x >= self.tile_w || tile.y >= self.tile_h {
            return None;
        }
        Some(tile.y as usize * self.tile_w as usize + tile.x as usize)
    }

    pub fn tile_at_world(&self, world: Vec2) -> Option<TileCoord> {
        if !world.is_finite() || world.x < 0.0 || world.y < 0.0 {
            return None;
        }
        let tile_x = (world.x / TILE_SIZE).floor() as u32;
        let tile_y = (world.y / TILE_SIZE).floor() as u32;
        if tile_x >= self.tile_w || tile_y >= self.tile_h {
            return None;
        }
        Some(TileCoord {
            x: tile_x,
            y: tile_y,
        })
    }

    pub fn tile_center_world(&self, tile: TileCoord) -> Vec2 {
        Vec2 {
            x: (tile.x as f32 + 0.5) * TILE_SIZE,
            y: (tile.y as f32 + 0.5) * TILE_SIZE,
        }
    }

    /// Clamps a pixel coordinate pair into `[0, dim - 1]` on both axes.
    /// Non-finite input collapses to the origin.
    pub fn clamp_point(&self, x: f32, y: f32) -> (f32, f32) {
        (
            clamp_axis(x, self.pixel_w()),
            clamp_axis(y, self.pixel_h()),
        )
    }
}

fn clamp_axis(value: f32, extent: f32) -> f32 {
    if !value.is_finite() {
        return 0.0;
    }
    let max = (extent - 1.0).max(0.0);
    value.clamp(0.0, max)
}

/// Cardinal facing shared by every actor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Facing {
    Up,
    #[default]
    Down,
    Left,
    Right,
}

impl Facing {
    pub fn from_vector(dir: Vec2) -> Option<Self> {
        if !dir.is_finite() || (dir.x == 0.0 && dir.y == 0.0) {
            return None;
        }
        if dir.x.abs() > dir.y.abs() {
            Some(if dir.x > 0.0 { Self::Right } else { Self::Left })
        } else {
            Some(if dir.y > 0.0 { Self::Down } else { Self::Up })
        }
    }
}
