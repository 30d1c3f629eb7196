use crate::geom::WorldBounds;
use crate::obstacle::ObstacleKind;

use super::spawns::EnemyMarker;

#[derive(Debug, Clone, PartialEq)]
pub enum MapTile {
    Floor,
    Obstacle(ObstacleKind),
    PlayerStart,
    Npc,
    Enemy(EnemyMarker),
    Light,
    Spawner,
    /// A legend type this ingester does not recognise.
    Unknown(String),
    /// Pixel color missing from the legend.
    Unmapped,
}

impl MapTile {
    pub fn from_type_name(name: &str) -> Self {
        let lowered = name.trim().to_ascii_lowercase();
        match lowered.as_str() {
            "floor" | "grass" | "path" | "sand" | "dirt" => Self::Floor,
            "player" | "player_start" => Self::PlayerStart,
            "npc" => Self::Npc,
            "enemy" | "mook" => Self::Enemy(EnemyMarker::Mook),
            "featured" => Self::Enemy(EnemyMarker::Featured),
            "boss" => Self::Enemy(EnemyMarker::Boss),
            "guardian" => Self::Enemy(EnemyMarker::Guardian),
            "light" => Self::Light,
            "spawner" => Self::Spawner,
            other => match ObstacleKind::from_type_name(other) {
                Some(kind) => Self::Obstacle(kind),
                None => Self::Unknown(lowered),
            },
        }
    }

    pub fn obstacle_kind(&self) -> Option<ObstacleKind> {
        match self {
            Self::Obstacle(kind) => Some(*kind),
            _ => None,
        }
    }
}

/// Tile-type grid produced by a single pass over the map raster.
#[derive(Debug, Clone, PartialEq)]
pub struct TileGrid {
    width: u32,
    height: u32,
    tiles: Vec<MapTile>,
}

impl TileGrid {
    pub fn filled(width: u32, height: u32, tile: MapTile) -> Self {
        Self {
            width,
            height,
            tiles: vec![tile; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn bounds(&self) -> WorldBounds {
        WorldBounds::new(self.width, self.height)
    }

    pub fn get(&self, x: u32, y: u32) -> Option<&MapTile> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.tiles.get(y as usize * self.width as usize + x as usize)
    }

    pub fn set(&mut self, x: u32, y: u32, tile: MapTile) {
        if x >= self.width || y >= self.height {
            return;
        }
        let index = y as usize * self.width as usize + x as usize;
        self.tiles[index] = tile;
    }

    pub fn obstacle_kind_at(&self, x: u32, y: u32) -> Option<ObstacleKind> {
        self.get(x, y).and_then(MapTile::obstacle_kind)
    }
}
