use crate::geom::{Rect, TileCoord, WorldBounds, TILE_SIZE};
use crate::obstacle::{Obstacle, ObstacleKind};

use super::legend::{Legend, LegendEntry};
use super::merge::{merge_vertical_runs, pack_rectangles, row_runs, TileRect};
use super::raster::RgbRaster;
use super::spawns::{
    EnemySpawn, HazardSpawn, LightSpawn, NpcSpawn, PropSpawn, SpawnPoints, SpawnerSpawn,
};
use super::tiles::{MapTile, TileGrid};
use super::MapError;

pub const DEFAULT_LIGHT_RADIUS: f32 = 3.0 * TILE_SIZE;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestOptions {
    /// Pack water with the greedy rectangle packer instead of run merging.
    pub pack_water: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapIngestResult {
    pub bounds: WorldBounds,
    pub tiles: TileGrid,
    pub obstacles: Vec<Obstacle>,
    pub spawns: SpawnPoints,
}

pub fn ingest_map(
    raster: &RgbRaster,
    legend: &Legend,
    options: IngestOptions,
) -> Result<MapIngestResult, MapError> {
    let (width, height) = (raster.width(), raster.height());
    if width == 0 || height == 0 {
        return Err(MapError::EmptyRaster { width, height });
    }
    let bounds = WorldBounds::new(width, height);
    let mut tiles = TileGrid::filled(width, height, MapTile::Unmapped);
    let mut props = Vec::<Obstacle>::new();
    let mut spawns = SpawnPoints::default();

    for y in 0..height {
        for x in 0..width {
            let Some(entry) = raster
                .pixel(x, y)
                .and_then(|rgb| legend.entry_for_rgb(rgb))
            else {
                continue;
            };
            let tile = MapTile::from_type_name(&entry.tile_type);
            scan_tile(bounds, TileCoord { x, y }, &tile, entry, &mut props, &mut spawns);
            tiles.set(x, y, tile);
        }
    }

    let runs = (0..height)
        .flat_map(|y| {
            row_runs(&tiles, y, |kind| {
                !(options.pack_water && kind == ObstacleKind::Water)
            })
        })
        .collect::<Vec<_>>();
    let mut obstacles = merge_vertical_runs(&runs)
        .into_iter()
        .map(TileRect::into_obstacle)
        .collect::<Vec<_>>();
    if options.pack_water {
        obstacles.extend(
            pack_rectangles(&tiles, ObstacleKind::Water)
                .into_iter()
                .map(TileRect::into_obstacle),
        );
    }
    obstacles.extend(props);
    obstacles.sort_by_key(|obstacle| obstacle.kind.draw_priority());

    Ok(MapIngestResult {
        bounds,
        tiles,
        obstacles,
        spawns,
    })
}

fn scan_tile(
    bounds: WorldBounds,
    tile: TileCoord,
    map_tile: &MapTile,
    entry: &LegendEntry,
    props: &mut Vec<Obstacle>,
    spawns: &mut SpawnPoints,
) {
    let position = bounds.tile_center_world(tile);
    let rect = Rect::from_tiles(tile.x, tile.y, 1, 1);
    let default_id = |prefix: &str| format!("{prefix}_{}_{}", tile.x, tile.y);

    match map_tile {
        MapTile::Obstacle(kind) => match kind {
            ObstacleKind::Gate => {
                let id = entry.id.clone().unwrap_or_else(|| default_id("gate"));
                let mut gate = Obstacle::gate(id, rect, entry.locked.unwrap_or(true));
                gate.key_id = entry.key_id.clone();
                props.push(gate);
            }
            ObstacleKind::Chest => {
                let id = entry.id.clone().unwrap_or_else(|| default_id("chest"));
                props.push(Obstacle::new(ObstacleKind::Chest, rect).with_id(id.clone()));
                spawns.chests.push(PropSpawn { id, tile, position });
            }
            kind if kind.is_breakable() => {
                let id = entry
                    .id
                    .clone()
                    .unwrap_or_else(|| default_id(kind.type_name()));
                props.push(Obstacle::new(*kind, rect).with_id(id.clone()));
                spawns.breakables.push(PropSpawn { id, tile, position });
            }
            ObstacleKind::TorchNode => {
                let mut torch = Obstacle::new(ObstacleKind::TorchNode, rect);
                torch.id = entry.id.clone();
                props.push(torch);
                spawns.lights.push(LightSpawn {
                    position,
                    radius: light_radius(entry),
                });
            }
            kind => {
                let hazard = kind.hazard();
                if hazard.code() > 0 {
                    spawns.hazards.push(HazardSpawn { tile, hazard });
                }
            }
        },
        MapTile::PlayerStart => {
            if spawns.player.is_none() {
                spawns.player = Some(position);
            }
        }
        MapTile::Npc => spawns.npcs.push(NpcSpawn {
            key: entry.name.clone().unwrap_or_else(|| default_id("npc")),
            tile,
            position,
        }),
        MapTile::Enemy(marker) => spawns.enemies.push(EnemySpawn {
            marker: *marker,
            tile,
            position,
            name: entry.name.clone(),
            template: entry.template.clone(),
        }),
        MapTile::Light => spawns.lights.push(LightSpawn {
            position,
            radius: light_radius(entry),
        }),
        MapTile::Spawner => {
            let marker = entry.spawner.clone().unwrap_or_default();
            let id = marker
                .id
                .clone()
                .or_else(|| entry.id.clone())
                .unwrap_or_else(|| default_id("spawner"));
            spawns.spawners.push(SpawnerSpawn {
                id,
                tile,
                position,
                marker,
            });
        }
        MapTile::Floor | MapTile::Unknown(_) | MapTile::Unmapped => {}
    }
}

fn light_radius(entry: &LegendEntry) -> f32 {
    entry
        .radius
        .filter(|radius| radius.is_finite() && *radius > 0.0)
        .unwrap_or(DEFAULT_LIGHT_RADIUS)
}
