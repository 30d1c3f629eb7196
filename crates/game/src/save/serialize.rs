use std::cmp::Ordering;

use engine::{LevelDescriptor, Vec2};
use tracing::info;

use crate::session::SessionContext;
use crate::world::{Enemy, World};

use super::normalize::{normalize_payload, DYNAMIC_ENEMY_CAP};
use super::payload::{
    CompanionRecord, EnemyRecord, GroundItemRecord, NpcRecord, PlayerRecord, SavePayload,
    SpawnerRecord, UniqueActorRecord, UniqueState,
};

fn truthy_keys(flags: &std::collections::BTreeMap<String, bool>) -> Vec<String> {
    flags
        .iter()
        .filter(|(_, set)| **set)
        .map(|(key, _)| key.clone())
        .collect()
}

fn unique_record(world: &World, session: &SessionContext, vn_id: &str) -> UniqueActorRecord {
    match world.enemy_by_vn_id(vn_id) {
        Some(enemy) if enemy.is_alive() => UniqueActorRecord::alive(EnemyRecord::from_enemy(enemy)),
        Some(_) => UniqueActorRecord::without_actor(UniqueState::Defeated),
        None if session.defeated_uniques.contains(vn_id) => {
            UniqueActorRecord::without_actor(UniqueState::Defeated)
        }
        None => UniqueActorRecord::without_actor(UniqueState::Unspawned),
    }
}

/// Distance from `pos` to whichever anchor is closest.
fn nearest_anchor_sq(pos: Vec2, anchors: &[Vec2]) -> f32 {
    anchors
        .iter()
        .map(|anchor| pos.distance_sq(*anchor))
        .fold(f32::INFINITY, f32::min)
}

/// Alive non-unique enemies, nearest to the player or a living unique first,
/// cut to the dynamic cap. Ties fall back to id so output is stable.
fn dynamic_snapshot(world: &World, descriptor: &LevelDescriptor) -> Vec<EnemyRecord> {
    let is_unique = |enemy: &Enemy| {
        enemy
            .vn_id
            .as_deref()
            .is_some_and(|vn_id| descriptor.is_unique_actor(vn_id))
    };
    let mut anchors = vec![world.player.pos];
    anchors.extend(
        world
            .enemies
            .values()
            .filter(|enemy| enemy.is_alive() && is_unique(enemy))
            .map(|enemy| enemy.pos),
    );

    let mut candidates = world
        .enemies
        .values()
        .filter(|enemy| enemy.is_alive() && !is_unique(enemy))
        .map(|enemy| (nearest_anchor_sq(enemy.pos, &anchors), enemy))
        .collect::<Vec<_>>();
    candidates.sort_by(|(da, a), (db, b)| match da.total_cmp(db) {
        Ordering::Equal => a.id.cmp(&b.id),
        other => other,
    });
    candidates.truncate(DYNAMIC_ENEMY_CAP);
    candidates
        .into_iter()
        .map(|(_, enemy)| EnemyRecord::from_enemy(enemy))
        .collect()
}

/// Captures the live world as a normalized payload stamped `at_ms`.
pub fn serialize_save(
    world: &World,
    session: &SessionContext,
    descriptor: &LevelDescriptor,
    at_ms: u64,
) -> SavePayload {
    let player = &world.player;
    let unique_actors = descriptor
        .unique_actors
        .iter()
        .map(|vn_id| (vn_id.clone(), unique_record(world, session, vn_id)))
        .collect();

    let mut payload = SavePayload {
        at: at_ms,
        current_level: session.current_level,
        world: world.bounds,
        player: PlayerRecord {
            x: player.pos.x,
            y: player.pos.y,
            dir: player.dir,
            hp: player.hp,
            max_hp: player.max_hp,
            speed: player.speed,
            level: player.progress.level,
            xp: player.progress.xp,
            inventory: player.inventory.clone(),
        },
        companions: world
            .companions
            .iter()
            .map(CompanionRecord::from_companion)
            .collect(),
        npcs: world.npcs.iter().map(NpcRecord::from_npc).collect(),
        gate_states: session.gate_states.clone(),
        opened_chests: session.opened_chests.iter().cloned().collect(),
        broken_breakables: session.broken_breakables.iter().cloned().collect(),
        ground_items: world
            .ground_items
            .iter()
            .map(|ground| GroundItemRecord {
                item: ground.item.clone(),
                x: ground.pos.x,
                y: ground.pos.y,
            })
            .collect(),
        vn_seen: truthy_keys(&session.vn_seen),
        affinity_flags: truthy_keys(&session.affinity_flags),
        quest_flags: truthy_keys(&session.quest_flags),
        quest_counters: session.quest_counters.clone(),
        quest_meta: session.quest_meta.clone(),
        unique_actors,
        defeated_uniques: session.defeated_uniques.iter().cloned().collect(),
        dynamic_enemies: dynamic_snapshot(world, descriptor),
        spawners: world
            .spawners
            .values()
            .map(|spawner| SpawnerRecord::from_spawner(spawner, session.now_sec))
            .collect(),
        loadouts: Some(session.loadouts.clone()),
        torch: Some(session.torch.clone()),
        snake_mode: session.snake_mode,
        rng: Some(session.rng_state()),
        ..SavePayload::default()
    };
    normalize_payload(&mut payload, world.bounds);

    info!(
        level = payload.current_level,
        uniques = payload.unique_actors.len(),
        dynamic_enemies = payload.dynamic_enemies.len(),
        spawners = payload.spawners.len(),
        "save_serialized"
    );
    payload
}
