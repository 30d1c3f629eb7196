use serde::{Deserialize, Serialize};

use crate::geom::{TileCoord, Vec2};
use crate::obstacle::Hazard;

use super::legend::{SpawnTemplate, SpawnerMarker};

/// Enemy tier. Carried explicitly on every enemy and every persisted record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnemyKind {
    #[default]
    Mook,
    Featured,
    Boss,
}

impl EnemyKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "mook" => Some(Self::Mook),
            "featured" => Some(Self::Featured),
            "boss" => Some(Self::Boss),
            _ => None,
        }
    }
}

/// Enemy marker as authored on the map. `Guardian` is resolved to a concrete
/// kind by whoever materializes the spawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnemyMarker {
    Mook,
    Featured,
    Boss,
    Guardian,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnemySpawn {
    pub marker: EnemyMarker,
    pub tile: TileCoord,
    pub position: Vec2,
    pub name: Option<String>,
    pub template: Option<SpawnTemplate>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NpcSpawn {
    pub key: String,
    pub tile: TileCoord,
    pub position: Vec2,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropSpawn {
    pub id: String,
    pub tile: TileCoord,
    pub position: Vec2,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightSpawn {
    pub position: Vec2,
    pub radius: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HazardSpawn {
    pub tile: TileCoord,
    pub hazard: Hazard,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpawnerSpawn {
    pub id: String,
    pub tile: TileCoord,
    pub position: Vec2,
    pub marker: SpawnerMarker,
}

/// Everything a map scan wants materialized as entities.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpawnPoints {
    pub player: Option<Vec2>,
    pub npcs: Vec<NpcSpawn>,
    pub enemies: Vec<EnemySpawn>,
    pub chests: Vec<PropSpawn>,
    pub breakables: Vec<PropSpawn>,
    pub lights: Vec<LightSpawn>,
    pub hazards: Vec<HazardSpawn>,
    pub spawners: Vec<SpawnerSpawn>,
}
