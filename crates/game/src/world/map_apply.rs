use engine::map::{EnemyKind, EnemyMarker, EnemySpawn, MapIngestResult, SpawnerSpawn};
use engine::{ingest_map, FlowField, IngestOptions, Legend, MapError, Rect, RgbRaster, TILE_SIZE};
use tracing::{info, warn};

use crate::ports::NarrativeAttachment;
use crate::session::SessionContext;

use super::factories::{add_spawner, spawn_enemy, spawn_npc, EnemySpec, NpcSpec};
use super::spawners::{
    EnemyTemplate, ProximityMode, SpawnerConfig, DEFAULT_PROXIMITY_RADIUS_PX,
    DEFAULT_SPAWN_INTERVAL_SEC,
};
use super::{Light, World};

/// Levels from this number up promote unmarked guardians to bosses.
pub const BOSS_GUARDIAN_MIN_LEVEL: u32 = 3;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MapSummary {
    pub obstacles: usize,
    pub enemies: usize,
    pub npcs: usize,
    pub lights: usize,
    pub spawners: usize,
    pub hazards: usize,
}

/// Ingests a map and materializes it into the world. On failure the world
/// is left exactly as it was and `None` comes back.
pub fn apply_map_to_world(
    world: &mut World,
    session: &mut SessionContext,
    narrative: &mut dyn NarrativeAttachment,
    raster: &RgbRaster,
    legend: &Legend,
    options: IngestOptions,
) -> Option<MapSummary> {
    match ingest_map(raster, legend, options) {
        Ok(result) => Some(materialize(world, session, narrative, result)),
        Err(err) => {
            log_ingest_failure(&err);
            None
        }
    }
}

pub fn apply_png_map_to_world(
    world: &mut World,
    session: &mut SessionContext,
    narrative: &mut dyn NarrativeAttachment,
    png: &[u8],
    legend: &Legend,
    options: IngestOptions,
) -> Option<MapSummary> {
    match RgbRaster::from_png_bytes(png) {
        Ok(raster) => apply_map_to_world(world, session, narrative, &raster, legend, options),
        Err(err) => {
            log_ingest_failure(&err);
            None
        }
    }
}

fn log_ingest_failure(err: &MapError) {
    warn!(error = %err, "map_ingest_failed");
}

fn materialize(
    world: &mut World,
    session: &mut SessionContext,
    narrative: &mut dyn NarrativeAttachment,
    result: MapIngestResult,
) -> MapSummary {
    let MapIngestResult {
        bounds,
        obstacles,
        spawns,
        ..
    } = result;

    world.bounds = bounds;
    world.obstacles = obstacles;
    world.flow = FlowField::default();
    world.lights = spawns
        .lights
        .iter()
        .map(|light| Light {
            pos: light.position,
            radius: light.radius,
        })
        .collect();
    if let Some(start) = spawns.player {
        world.player.pos = start;
    }

    if !spawns.enemies.is_empty() {
        world.enemies.clear();
        for spawn in &spawns.enemies {
            let spec = enemy_spec_for(spawn, session.current_level);
            spawn_enemy(world, session, spec);
        }
    }
    if !spawns.npcs.is_empty() {
        world.npcs.clear();
        for spawn in &spawns.npcs {
            spawn_npc(
                world,
                narrative,
                NpcSpec {
                    dialog_id: Some(spawn.key.clone()),
                    ..NpcSpec::new(spawn.key.clone(), spawn.position)
                },
            );
        }
    }
    for spawn in &spawns.spawners {
        add_spawner(world, session, spawner_config_for(spawn));
    }
    world.rebuild_obstacle_index();

    let summary = MapSummary {
        obstacles: world.obstacles.len(),
        enemies: spawns.enemies.len(),
        npcs: spawns.npcs.len(),
        lights: world.lights.len(),
        spawners: spawns.spawners.len(),
        hazards: spawns.hazards.len(),
    };
    info!(
        tile_w = bounds.tile_w,
        tile_h = bounds.tile_h,
        obstacles = summary.obstacles,
        enemies = summary.enemies,
        npcs = summary.npcs,
        spawners = summary.spawners,
        "map_applied"
    );
    summary
}

fn resolve_kind(spawn: &EnemySpawn, level: u32) -> EnemyKind {
    let explicit = spawn
        .template
        .as_ref()
        .and_then(|template| template.kind.as_deref())
        .and_then(EnemyKind::from_name);
    match spawn.marker {
        EnemyMarker::Mook => explicit.unwrap_or(EnemyKind::Mook),
        EnemyMarker::Featured => explicit.unwrap_or(EnemyKind::Featured),
        EnemyMarker::Boss => explicit.unwrap_or(EnemyKind::Boss),
        EnemyMarker::Guardian => explicit.unwrap_or(if level >= BOSS_GUARDIAN_MIN_LEVEL {
            EnemyKind::Boss
        } else {
            EnemyKind::Featured
        }),
    }
}

fn enemy_spec_for(spawn: &EnemySpawn, level: u32) -> EnemySpec {
    let kind = resolve_kind(spawn, level);
    let template = spawn
        .template
        .as_ref()
        .map(EnemyTemplate::from_map_template)
        .unwrap_or_default();
    let vn_id = spawn
        .template
        .as_ref()
        .and_then(|template| template.vn_id.clone());
    let base = EnemyTemplate {
        kind: Some(kind),
        name: spawn.name.clone().or(template.name.clone()),
        guardian: template.guardian || spawn.marker == EnemyMarker::Guardian,
        ..template
    };
    EnemySpec {
        vn_id,
        ..base.spec_at(spawn.position)
    }
}

fn spawner_config_for(spawn: &SpawnerSpawn) -> SpawnerConfig {
    let marker = &spawn.marker;
    let extent = marker.extent_tiles.unwrap_or(1).max(1) as f32 * TILE_SIZE;
    SpawnerConfig {
        template: marker
            .template
            .as_ref()
            .map(EnemyTemplate::from_map_template)
            .unwrap_or_default(),
        batch_size: marker.batch_size.unwrap_or(1).max(1),
        interval_sec: marker.interval_sec.unwrap_or(DEFAULT_SPAWN_INTERVAL_SEC),
        jitter_sec: marker.jitter_sec.unwrap_or(0.0).max(0.0),
        max_total: marker.max_total,
        max_alive: marker.max_alive,
        proximity: marker
            .proximity
            .as_deref()
            .and_then(ProximityMode::from_name)
            .unwrap_or_default(),
        radius_px: marker.radius_px.unwrap_or(DEFAULT_PROXIMITY_RADIUS_PX),
        ..SpawnerConfig::new(
            spawn.id.clone(),
            Rect::centered_at(spawn.position, extent, extent),
        )
    }
}
