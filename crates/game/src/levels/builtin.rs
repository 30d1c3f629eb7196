use engine::map::EnemyKind;
use engine::{
    IngestOptions, Legend, Obstacle, ObstacleKind, Rect, RgbRaster, Vec2, WorldBounds, TILE_SIZE,
};
use tracing::warn;

use crate::ports::NarrativeAttachment;
use crate::session::SessionContext;
use crate::world::factories::{
    add_spawner, spawn_companion, spawn_enemy, spawn_npc, EnemySpec, NpcSpec,
};
use crate::world::map_apply::apply_map_to_world;
use crate::world::{
    EnemyTemplate, EquipSlot, Item, Light, ProximityMode, SpawnerConfig, World,
};

use super::LevelError;

const LEVEL2_LEGEND: &str = include_str!("../../assets/level2_legend.json");

const LEVEL2_ROWS: [&str; 10] = [
    "################",
    "#P....#~~~....t#",
    "#.n...#~~~..m..#",
    "#.....G........#",
    "#..C..#~~~..V..#",
    "#.....#~~~.....#",
    "#uu...#~~~.BB..#",
    "#uu...#~~~..S..#",
    "#.....#~~~.m...#",
    "################",
];

const LEVEL2_PALETTE: [(char, [u8; 3]); 13] = [
    ('.', [40, 120, 40]),
    ('#', [90, 90, 90]),
    ('~', [30, 60, 200]),
    ('G', [160, 110, 40]),
    ('C', [220, 180, 0]),
    ('B', [140, 80, 20]),
    ('P', [255, 255, 255]),
    ('V', [200, 0, 0]),
    ('m', [180, 60, 60]),
    ('n', [0, 200, 200]),
    ('S', [120, 0, 160]),
    ('u', [100, 70, 40]),
    ('t', [255, 140, 0]),
];

const DEFAULT_COMPANION: &str = "Ayla";

fn tile_center(x: u32, y: u32) -> Vec2 {
    Vec2::new((x as f32 + 0.5) * TILE_SIZE, (y as f32 + 0.5) * TILE_SIZE)
}

fn border_walls(bounds: WorldBounds, kind: ObstacleKind) -> Vec<Obstacle> {
    let (w, h) = (bounds.tile_w, bounds.tile_h);
    vec![
        Obstacle::new(kind, Rect::from_tiles(0, 0, w, 1)),
        Obstacle::new(kind, Rect::from_tiles(0, h - 1, w, 1)),
        Obstacle::new(kind, Rect::from_tiles(0, 1, 1, h - 2)),
        Obstacle::new(kind, Rect::from_tiles(w - 1, 1, 1, h - 2)),
    ]
}

fn torch(world: &mut World, x: u32, y: u32) {
    world.obstacles.push(Obstacle::new(
        ObstacleKind::TorchNode,
        Rect::from_tiles(x, y, 1, 1),
    ));
    world.lights.push(Light {
        pos: tile_center(x, y),
        radius: 3.0 * TILE_SIZE,
    });
}

fn chest(world: &mut World, id: &str, x: u32, y: u32, loot: Vec<Item>) {
    world.obstacles.push(
        Obstacle::new(ObstacleKind::Chest, Rect::from_tiles(x, y, 1, 1)).with_id(id),
    );
    world.chest_loot.insert(id.to_string(), loot);
}

/// Puts the player on the level's start point with the party trailing
/// behind.
fn place_party(world: &mut World, start: Vec2) {
    let bounds = world.bounds;
    world.player.pos = world.clamp_to_bounds(start);
    for (slot, companion) in world.companions.iter_mut().enumerate() {
        let (x, y) = bounds.clamp_point(
            start.x - (slot + 1) as f32 * TILE_SIZE * 0.75,
            start.y + TILE_SIZE * 0.5,
        );
        companion.pos = Vec2::new(x, y);
    }
}

pub(super) fn load_level_1(
    world: &mut World,
    session: &mut SessionContext,
    narrative: &mut dyn NarrativeAttachment,
) -> Result<(), LevelError> {
    let bounds = WorldBounds::new(40, 30);
    world.reset_for_level(bounds);
    world.obstacles = border_walls(bounds, ObstacleKind::Wall);
    world.obstacles.extend([
        Obstacle::new(ObstacleKind::Wall, Rect::from_tiles(20, 1, 1, 13)),
        Obstacle::new(ObstacleKind::Wall, Rect::from_tiles(20, 15, 1, 14)),
        Obstacle::gate("castle_gate", Rect::from_tiles(20, 14, 1, 1), true),
        Obstacle::new(ObstacleKind::Water, Rect::from_tiles(26, 4, 4, 3)),
        Obstacle::new(ObstacleKind::Mud, Rect::from_tiles(9, 14, 3, 2)),
        Obstacle::new(ObstacleKind::Lava, Rect::from_tiles(15, 18, 2, 2)),
        Obstacle::new(ObstacleKind::Tree, Rect::from_tiles(3, 10, 1, 1)),
        Obstacle::new(ObstacleKind::Tree, Rect::from_tiles(4, 18, 1, 1)),
        Obstacle::new(ObstacleKind::Barrel, Rect::from_tiles(12, 8, 1, 1)).with_id("barrel_l1_a"),
        Obstacle::new(ObstacleKind::Barrel, Rect::from_tiles(13, 8, 1, 1)).with_id("barrel_l1_b"),
    ]);
    chest(
        world,
        "chest_l1_weapon",
        5,
        5,
        vec![Item::equipment("iron_sword", "Iron Sword", EquipSlot::RightHand, 6, 0)],
    );
    chest(
        world,
        "chest_l1_supplies",
        8,
        24,
        vec![Item::stackable("herb", "Healing Herb", 3, 10)],
    );
    torch(world, 19, 13);
    torch(world, 19, 15);

    if world.companions.is_empty() {
        spawn_companion(world, DEFAULT_COMPANION, tile_center(2, 4));
    }
    place_party(world, tile_center(3, 3));

    spawn_enemy(
        world,
        session,
        EnemySpec {
            name: Some("Gorg".to_string()),
            vn_id: Some("enemy:gorg".to_string()),
            guardian: true,
            leashed: true,
            aggro_radius: Some(6.0 * TILE_SIZE),
            ..EnemySpec::new(EnemyKind::Featured, tile_center(24, 14))
        },
    );
    for (x, y) in [(30, 6), (33, 20), (28, 25)] {
        spawn_enemy(
            world,
            session,
            EnemySpec {
                name: Some("Goblin".to_string()),
                ..EnemySpec::new(EnemyKind::Mook, tile_center(x, y))
            },
        );
    }
    spawn_npc(
        world,
        narrative,
        NpcSpec {
            dialog_id: Some("villager_intro".to_string()),
            ..NpcSpec::new("villager", tile_center(6, 12))
        },
    );
    add_spawner(
        world,
        session,
        SpawnerConfig {
            template: EnemyTemplate {
                kind: Some(EnemyKind::Mook),
                name: Some("Wolf".to_string()),
                ..EnemyTemplate::default()
            },
            batch_size: 2,
            interval_sec: 8.0,
            jitter_sec: 2.0,
            max_alive: Some(4),
            proximity: ProximityMode::Near,
            radius_px: 10.0 * TILE_SIZE,
            ..SpawnerConfig::new("l1_woods_spawner", Rect::from_tiles(30, 22, 3, 3))
        },
    );
    Ok(())
}

pub(super) fn load_level_2(
    world: &mut World,
    session: &mut SessionContext,
    narrative: &mut dyn NarrativeAttachment,
) -> Result<(), LevelError> {
    let bounds = WorldBounds::new(LEVEL2_ROWS[0].len() as u32, LEVEL2_ROWS.len() as u32);
    world.reset_for_level(bounds);
    let legend = Legend::from_json_str(LEVEL2_LEGEND).map_err(engine::MapError::from)?;

    let applied = match RgbRaster::from_text_art(&LEVEL2_ROWS, &LEVEL2_PALETTE) {
        Ok(raster) => apply_map_to_world(
            world,
            session,
            narrative,
            &raster,
            &legend,
            IngestOptions { pack_water: true },
        ),
        Err(err) => {
            warn!(level = 2, error = %err, "map_ingest_failed");
            None
        }
    };
    if applied.is_none() {
        world.obstacles = border_walls(bounds, ObstacleKind::Wall);
        world.player.pos = tile_center(1, 1);
    }
    let start = world.player.pos;
    place_party(world, start);
    Ok(())
}

pub(super) fn load_level_3(
    world: &mut World,
    session: &mut SessionContext,
    _narrative: &mut dyn NarrativeAttachment,
) -> Result<(), LevelError> {
    let bounds = WorldBounds::new(24, 24);
    world.reset_for_level(bounds);
    world.obstacles = border_walls(bounds, ObstacleKind::Marble);
    world.obstacles.extend([
        Obstacle::new(ObstacleKind::Marble, Rect::from_tiles(1, 18, 10, 1)),
        Obstacle::new(ObstacleKind::Marble, Rect::from_tiles(13, 18, 10, 1)),
        Obstacle::gate("arena_gate", Rect::from_tiles(11, 18, 2, 1), true),
        Obstacle::new(ObstacleKind::Lava, Rect::from_tiles(5, 5, 3, 3)),
        Obstacle::new(ObstacleKind::Lava, Rect::from_tiles(16, 5, 3, 3)),
        Obstacle::new(ObstacleKind::Fire, Rect::from_tiles(11, 4, 2, 1)),
        Obstacle::new(ObstacleKind::Rock, Rect::from_tiles(4, 12, 1, 1)),
        Obstacle::new(ObstacleKind::Rock, Rect::from_tiles(19, 12, 1, 1)),
    ]);
    chest(
        world,
        "chest_l3_relic",
        20,
        2,
        vec![Item::equipment("ember_crown", "Ember Crown", EquipSlot::Head, 1, 5)],
    );
    torch(world, 10, 17);
    torch(world, 13, 17);
    place_party(world, tile_center(12, 20));

    spawn_enemy(
        world,
        session,
        EnemySpec {
            name: Some("Malgrath".to_string()),
            vn_id: Some("enemy:malgrath".to_string()),
            guardian: true,
            aggro_radius: Some(9.0 * TILE_SIZE),
            ..EnemySpec::new(EnemyKind::Boss, tile_center(12, 9))
        },
    );
    add_spawner(
        world,
        session,
        SpawnerConfig {
            template: EnemyTemplate {
                kind: Some(EnemyKind::Mook),
                name: Some("Cinder Wisp".to_string()),
                ..EnemyTemplate::default()
            },
            interval_sec: 5.0,
            jitter_sec: 1.0,
            max_alive: Some(3),
            max_total: Some(12),
            proximity: ProximityMode::Near,
            radius_px: 8.0 * TILE_SIZE,
            ..SpawnerConfig::new("l3_brood", Rect::from_tiles(2, 2, 2, 2))
        },
    );
    Ok(())
}
