use std::collections::BTreeMap;

use engine::map::EnemyKind;
use engine::WorldBounds;

use crate::session::{Loadouts, TorchState, MAX_PERSISTED_ENEMY_ID};
use crate::world::factories::kind_defaults;
use crate::world::spawners::{
    DEFAULT_PROXIMITY_RADIUS_PX, MAX_SPAWN_INTERVAL_SEC, MIN_SPAWN_INTERVAL_SEC,
};
use crate::world::{EnemyTemplate, Inventory};

use super::payload::{
    EnemyRecord, SavePayload, SpawnerRecord, UniqueActorRecord, UniqueState, SAVE_SCHEMA,
    SAVE_VERSION,
};

/// Upper bound on dynamic enemies carried by one save.
pub const DYNAMIC_ENEMY_CAP: usize = 300;

fn finite_or(value: f32, fallback: f32) -> f32 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}

fn non_negative(value: f32) -> f32 {
    finite_or(value, 0.0).max(0.0)
}

fn positive_option(value: Option<f32>) -> Option<f32> {
    value.filter(|value| value.is_finite() && *value > 0.0)
}

fn clamp_xy(bounds: WorldBounds, x: &mut f32, y: &mut f32) {
    let (cx, cy) = bounds.clamp_point(*x, *y);
    *x = cx;
    *y = cy;
}

fn normalize_id_set(ids: &mut Vec<String>) {
    ids.retain(|id| !id.trim().is_empty());
    ids.sort();
    ids.dedup();
}

fn normalize_inventory(inventory: &mut Inventory) {
    inventory.items.retain(|item| !item.id.is_empty());
    for item in inventory
        .items
        .iter_mut()
        .chain(inventory.equipped.values_mut())
    {
        item.max_qty = item.max_qty.max(1);
        item.qty = item.qty.clamp(1, item.max_qty);
    }
}

fn normalize_hp(hp: &mut f32, max_hp: &mut f32, fallback_max: f32) {
    *max_hp = finite_or(*max_hp, fallback_max).max(1.0);
    *hp = non_negative(*hp).min(*max_hp);
}

fn normalize_template(template: &mut EnemyTemplate) {
    template.hp = positive_option(template.hp);
    template.touch_damage = template.touch_damage.filter(|v| v.is_finite() && *v >= 0.0);
    template.speed = template.speed.filter(|v| v.is_finite() && *v >= 0.0);
    template.aggro_radius = positive_option(template.aggro_radius);
    template.leash_radius = positive_option(template.leash_radius);
    template.sprite_scale = positive_option(template.sprite_scale);
    template.name = template.name.take().filter(|name| !name.trim().is_empty());
}

/// Fills and clamps one enemy record. `default_kind` applies when the record
/// does not say what it is.
pub fn normalize_enemy_record(record: &mut EnemyRecord, bounds: WorldBounds, default_kind: EnemyKind) {
    let kind = *record.kind.get_or_insert(default_kind);
    let defaults = kind_defaults(kind);
    record.id = record.id.filter(|id| *id < MAX_PERSISTED_ENEMY_ID);

    clamp_xy(bounds, &mut record.x, &mut record.y);
    match (record.home_x, record.home_y) {
        (Some(mut x), Some(mut y)) => {
            clamp_xy(bounds, &mut x, &mut y);
            record.home_x = Some(x);
            record.home_y = Some(y);
        }
        _ => {
            record.home_x = None;
            record.home_y = None;
        }
    }

    let max_hp = positive_option(record.max_hp)
        .or(positive_option(record.hp))
        .unwrap_or(defaults.hp);
    let hp = record
        .hp
        .filter(|hp| hp.is_finite())
        .map_or(max_hp, |hp| hp.max(0.0))
        .min(max_hp);
    record.max_hp = Some(max_hp);
    record.hp = Some(hp);
    record.touch_damage = Some(
        record
            .touch_damage
            .filter(|v| v.is_finite() && *v >= 0.0)
            .unwrap_or(defaults.touch_damage),
    );
    record.speed = Some(
        record
            .speed
            .filter(|v| v.is_finite() && *v >= 0.0)
            .unwrap_or(defaults.speed),
    );
    record.aggro_radius = positive_option(record.aggro_radius);
    record.leash_radius = positive_option(record.leash_radius);
    if !(record.sprite_scale.is_finite() && record.sprite_scale > 0.0) {
        record.sprite_scale = 1.0;
    }
    record.vn_id = record.vn_id.take().filter(|vn_id| !vn_id.is_empty());
    record.spawner_id = record.spawner_id.take().filter(|id| !id.is_empty());
}

fn normalize_spawner(record: &mut SpawnerRecord, bounds: WorldBounds) {
    clamp_xy(bounds, &mut record.x, &mut record.y);
    // The spawn rectangle stays inside the world.
    let room_w = (bounds.pixel_w() - record.x).max(1.0);
    let room_h = (bounds.pixel_h() - record.y).max(1.0);
    record.w = finite_or(record.w, 1.0).clamp(1.0, room_w);
    record.h = finite_or(record.h, 1.0).clamp(1.0, room_h);
    record.batch_size = record.batch_size.max(1);
    record.interval_sec = finite_or(record.interval_sec, MIN_SPAWN_INTERVAL_SEC)
        .clamp(MIN_SPAWN_INTERVAL_SEC, MAX_SPAWN_INTERVAL_SEC);
    record.jitter_sec = non_negative(record.jitter_sec).min(record.interval_sec);
    record.radius_px = finite_or(record.radius_px, DEFAULT_PROXIMITY_RADIUS_PX).max(1.0);
    record.next_at_delay = non_negative(record.next_at_delay);
    record.max_alive = record.max_alive.map(|cap| cap.max(1));
    record.alive_ids.retain(|id| *id < MAX_PERSISTED_ENEMY_ID);
    record.alive_ids.sort_unstable();
    record.alive_ids.dedup();
    normalize_template(&mut record.template);
}

/// Last record wins for a repeated id; output is sorted by id.
fn dedup_spawners(spawners: &mut Vec<SpawnerRecord>) {
    let by_id = spawners
        .drain(..)
        .filter(|record| !record.id.trim().is_empty())
        .map(|record| (record.id.clone(), record))
        .collect::<BTreeMap<_, _>>();
    spawners.extend(by_id.into_values());
}

/// Coerces a payload into canonical form against `bounds`. Pure and
/// idempotent: running it twice changes nothing the second time.
pub fn normalize_payload(payload: &mut SavePayload, bounds: WorldBounds) {
    payload.schema = SAVE_SCHEMA.to_string();
    payload.version = SAVE_VERSION;
    payload.current_level = payload.current_level.max(1);
    if payload.world.tile_w == 0 || payload.world.tile_h == 0 {
        payload.world = bounds;
    }

    let player = &mut payload.player;
    clamp_xy(bounds, &mut player.x, &mut player.y);
    normalize_hp(&mut player.hp, &mut player.max_hp, 100.0);
    player.speed = non_negative(player.speed);
    player.level = player.level.max(1);
    normalize_inventory(&mut player.inventory);

    for companion in &mut payload.companions {
        clamp_xy(bounds, &mut companion.x, &mut companion.y);
        normalize_hp(&mut companion.hp, &mut companion.max_hp, 60.0);
        companion.speed = non_negative(companion.speed);
        companion.affinity = finite_or(companion.affinity, 0.0);
        companion.level = companion.level.max(1);
        normalize_inventory(&mut companion.inventory);
    }
    for npc in &mut payload.npcs {
        clamp_xy(bounds, &mut npc.x, &mut npc.y);
        npc.affinity = finite_or(npc.affinity, 0.0);
        npc.level = npc.level.max(1);
        npc.dialog_id = npc.dialog_id.take().filter(|id| !id.is_empty());
        normalize_inventory(&mut npc.inventory);
    }
    for ground in &mut payload.ground_items {
        clamp_xy(bounds, &mut ground.x, &mut ground.y);
        ground.item.max_qty = ground.item.max_qty.max(1);
        ground.item.qty = ground.item.qty.clamp(1, ground.item.max_qty);
    }
    payload.ground_items.retain(|ground| !ground.item.id.is_empty());

    payload.gate_states.retain(|id, _| !id.trim().is_empty());
    payload.quest_counters.retain(|key, _| !key.trim().is_empty());
    payload.quest_meta.retain(|key, _| !key.trim().is_empty());
    for ids in [
        &mut payload.opened_chests,
        &mut payload.broken_breakables,
        &mut payload.vn_seen,
        &mut payload.affinity_flags,
        &mut payload.quest_flags,
        &mut payload.defeated_uniques,
    ] {
        normalize_id_set(ids);
    }

    payload.unique_actors.retain(|vn_id, _| !vn_id.trim().is_empty());
    for (vn_id, entry) in &mut payload.unique_actors {
        normalize_unique(vn_id, entry, bounds);
    }

    for record in &mut payload.dynamic_enemies {
        normalize_enemy_record(record, bounds, EnemyKind::Mook);
    }
    payload.dynamic_enemies.truncate(DYNAMIC_ENEMY_CAP);

    dedup_spawners(&mut payload.spawners);
    for spawner in &mut payload.spawners {
        normalize_spawner(spawner, bounds);
    }

    payload.loadouts.get_or_insert_with(Loadouts::default);
    let companion_count = payload.companions.len() as u32;
    let torch = payload.torch.get_or_insert_with(TorchState::default);
    if torch.bearer_index.is_some_and(|index| index > companion_count) {
        torch.bearer_index = None;
    }
    if !(torch.burn_ms.is_finite() && torch.burn_ms >= 0.0) {
        torch.burn_ms = 0.0;
    }
}

fn normalize_unique(vn_id: &str, entry: &mut UniqueActorRecord, bounds: WorldBounds) {
    if entry.state != UniqueState::Alive {
        entry.actor = None;
        return;
    }
    let record = entry.actor.get_or_insert_with(EnemyRecord::default);
    record.vn_id = Some(vn_id.to_string());
    normalize_enemy_record(record, bounds, EnemyKind::Featured);
}
