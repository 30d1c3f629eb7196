use std::collections::{BTreeMap, BTreeSet};

use engine::map::EnemyKind;
use engine::{LevelDescriptor, Rect, Vec2};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::levels::{LevelError, LevelRegistry};
use crate::ports::Ports;
use crate::session::{RestorePhase, SessionContext};
use crate::world::factories::{
    spawn_companion, spawn_enemy, spawn_npc, spawn_pickup, EnemySpec, NpcSpec,
};
use crate::world::interactions::apply_obstacle_deltas;
use crate::world::{EnemyId, Spawner, SpawnerConfig, World};

use super::normalize::normalize_payload;
use super::payload::{
    EnemyRecord, SavePayload, SpawnerRecord, UniqueState, SAVE_SCHEMA, SAVE_VERSION,
};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PayloadParseError {
    #[error("parse save json: {message}")]
    Json { message: String },
    #[error("parse save json at {path}: {message}")]
    JsonAt { path: String, message: String },
    #[error("unsupported save schema {found:?}")]
    WrongSchema { found: String },
    #[error("save version {found} is newer than supported version {supported}")]
    FutureVersion { found: u32, supported: u32 },
}

#[derive(Debug, Error)]
pub enum RestoreError {
    #[error(transparent)]
    Parse(#[from] PayloadParseError),
    #[error("restore could not load its level: {0}")]
    Level(#[from] LevelError),
    #[error("pending restore targets level {pending} but level {loaded} is loaded")]
    LevelMismatch { pending: u32, loaded: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The payload has been applied on top of a fresh baseline.
    Applied { level: u32 },
    /// The payload is parked until `level` finishes loading.
    Deferred { level: u32 },
    NothingPending,
}

/// Parses raw save JSON. Structural problems report the JSON path; anything
/// that deserializes is left for normalization to coerce.
pub fn parse_payload(raw: &str) -> Result<SavePayload, PayloadParseError> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    let payload: SavePayload =
        serde_path_to_error::deserialize(&mut deserializer).map_err(|error| {
            let path = error.path().to_string();
            let message = error.into_inner().to_string();
            if path.is_empty() || path == "." {
                PayloadParseError::Json { message }
            } else {
                PayloadParseError::JsonAt { path, message }
            }
        })?;
    deserializer
        .end()
        .map_err(|error| PayloadParseError::Json {
            message: error.to_string(),
        })?;

    if payload.schema != SAVE_SCHEMA {
        return Err(PayloadParseError::WrongSchema {
            found: payload.schema,
        });
    }
    if payload.version > SAVE_VERSION {
        return Err(PayloadParseError::FutureVersion {
            found: payload.version,
            supported: SAVE_VERSION,
        });
    }
    Ok(payload)
}

/// Entry point for raw save data from the transport.
pub fn load_data_payload(
    levels: &LevelRegistry,
    world: &mut World,
    session: &mut SessionContext,
    ports: &mut Ports<'_>,
    raw: &str,
) -> Result<LoadOutcome, RestoreError> {
    match parse_payload(raw) {
        Ok(payload) => load_payload(levels, world, session, ports, payload),
        Err(err) => Err(fail_restore(session, ports, err.into())),
    }
}

/// Stashes `payload` and either applies it now or requests a level switch
/// and defers it.
pub fn load_payload(
    levels: &LevelRegistry,
    world: &mut World,
    session: &mut SessionContext,
    ports: &mut Ports<'_>,
    payload: SavePayload,
) -> Result<LoadOutcome, RestoreError> {
    begin_restore(levels, world, session, ports, payload)
        .map_err(|err| fail_restore(session, ports, err))
}

fn begin_restore(
    levels: &LevelRegistry,
    world: &mut World,
    session: &mut SessionContext,
    ports: &mut Ports<'_>,
    payload: SavePayload,
) -> Result<LoadOutcome, RestoreError> {
    let level = payload.current_level.max(1);
    if !levels.contains(level) {
        return Err(LevelError::UnknownLevel { level }.into());
    }

    session.suspend_for_restore();
    session.pending_level = Some(level);
    session.pending_restore = Some(payload);
    if session.current_level != level {
        session.restore_phase = RestorePhase::PendingLevelSwitch;
        session.requested_level_switch = Some(level);
        info!(from = session.current_level, to = level, "restore_deferred");
        return Ok(LoadOutcome::Deferred { level });
    }
    load_baseline_and_apply(levels, world, session, ports, level)
}

/// Finishes a deferred restore once the host acts on the requested level
/// switch.
pub fn complete_level_switch(
    levels: &LevelRegistry,
    world: &mut World,
    session: &mut SessionContext,
    ports: &mut Ports<'_>,
) -> Result<LoadOutcome, RestoreError> {
    let Some(level) = session
        .pending_level
        .filter(|_| session.pending_restore.is_some())
    else {
        return Ok(LoadOutcome::NothingPending);
    };
    session.requested_level_switch = None;
    load_baseline_and_apply(levels, world, session, ports, level)
        .map_err(|err| fail_restore(session, ports, err))
}

fn load_baseline_and_apply(
    levels: &LevelRegistry,
    world: &mut World,
    session: &mut SessionContext,
    ports: &mut Ports<'_>,
    level: u32,
) -> Result<LoadOutcome, RestoreError> {
    session.restore_phase = RestorePhase::BaselineLoading;
    levels.load(level, world, session, &mut *ports.narrative)?;
    let descriptor = levels.descriptor_for_level(level);
    apply_pending_restore(world, session, ports, &descriptor)
}

/// Replays the stashed payload over the baseline that is currently loaded.
pub fn apply_pending_restore(
    world: &mut World,
    session: &mut SessionContext,
    ports: &mut Ports<'_>,
    descriptor: &LevelDescriptor,
) -> Result<LoadOutcome, RestoreError> {
    let Some(mut payload) = session.pending_restore.take() else {
        return Ok(LoadOutcome::NothingPending);
    };
    let level = payload.current_level.max(1);
    if session.current_level != level {
        return Err(RestoreError::LevelMismatch {
            pending: level,
            loaded: session.current_level,
        });
    }

    session.suspend_for_restore();
    session.restore_phase = RestorePhase::Restoring;
    normalize_payload(&mut payload, world.bounds);

    restore_session_state(world, session, &payload);
    restore_party(world, ports, &payload);
    let deltas = apply_obstacle_deltas(
        world,
        &session.gate_states,
        &session.opened_chests,
        &session.broken_breakables,
    );
    let mut id_map = restore_dynamic_enemies(world, session, descriptor, &payload);
    reconcile_unique_actors(world, session, &payload, &mut id_map);
    restore_spawners(world, session, &payload, &id_map);
    attach_intros(world, session, ports);
    world.rebuild_obstacle_index();
    session.resume_after_restore();

    info!(
        level,
        gates = deltas.gates_touched,
        chests_removed = deltas.chests_removed,
        breakables_removed = deltas.breakables_removed,
        enemies = world.enemies.len(),
        spawners = world.spawners.len(),
        "restore_applied"
    );
    Ok(LoadOutcome::Applied { level })
}

/// Logs and surfaces a failure, then releases every hold so play continues.
fn fail_restore(
    session: &mut SessionContext,
    ports: &mut Ports<'_>,
    err: RestoreError,
) -> RestoreError {
    error!(error = %err, "restore_failed");
    ports.notifier.report_load_failure(&err.to_string());
    session.requested_level_switch = None;
    session.resume_after_restore();
    err
}

fn flag_map(keys: &[String]) -> BTreeMap<String, bool> {
    keys.iter().map(|key| (key.clone(), true)).collect()
}

fn restore_session_state(world: &mut World, session: &mut SessionContext, payload: &SavePayload) {
    let record = &payload.player;
    let player = &mut world.player;
    player.pos = Vec2::new(record.x, record.y);
    player.dir = record.dir;
    player.hp = record.hp;
    player.max_hp = record.max_hp;
    player.speed = record.speed;
    player.progress.level = record.level;
    player.progress.xp = record.xp;
    player.inventory = record.inventory.clone();

    if let Some(rng) = payload.rng {
        session.restore_rng(rng);
    }
    session.vn_seen = flag_map(&payload.vn_seen);
    session.affinity_flags = flag_map(&payload.affinity_flags);
    session.quest_flags = flag_map(&payload.quest_flags);
    session.quest_counters = payload.quest_counters.clone();
    session.quest_meta = payload.quest_meta.clone();
    session.gate_states = payload.gate_states.clone();
    session.opened_chests = payload.opened_chests.iter().cloned().collect();
    session.broken_breakables = payload.broken_breakables.iter().cloned().collect();
    session.defeated_uniques = payload
        .defeated_uniques
        .iter()
        .cloned()
        .chain(
            payload
                .unique_actors
                .iter()
                .filter(|(_, entry)| entry.state == UniqueState::Defeated)
                .map(|(vn_id, _)| vn_id.clone()),
        )
        .collect();
    session.loadouts = payload.loadouts.clone().unwrap_or_default();
    session.torch = payload.torch.clone().unwrap_or_default();
    session.snake_mode = payload.snake_mode;
}

/// Companions, NPCs and ground items are rebuilt wholesale; whatever the
/// loader placed is only a placeholder.
fn restore_party(world: &mut World, ports: &mut Ports<'_>, payload: &SavePayload) {
    world.companions.clear();
    for record in &payload.companions {
        let companion = spawn_companion(world, record.name.clone(), Vec2::new(record.x, record.y));
        companion.dir = record.dir;
        companion.hp = record.hp;
        companion.max_hp = record.max_hp;
        companion.speed = record.speed;
        companion.affinity = record.affinity;
        companion.progress.level = record.level;
        companion.progress.xp = record.xp;
        companion.inventory = record.inventory.clone();
    }

    world.npcs.clear();
    for record in &payload.npcs {
        let index = spawn_npc(
            world,
            &mut *ports.narrative,
            NpcSpec {
                dir: record.dir,
                dialog_id: record.dialog_id.clone(),
                ..NpcSpec::new(record.key.clone(), Vec2::new(record.x, record.y))
            },
        );
        let npc = &mut world.npcs[index];
        npc.affinity = record.affinity;
        npc.progress.level = record.level;
        npc.progress.xp = record.xp;
        npc.inventory = record.inventory.clone();
    }

    world.ground_items.clear();
    for ground in &payload.ground_items {
        spawn_pickup(world, ground.item.clone(), Vec2::new(ground.x, ground.y));
    }
}

fn is_unique(descriptor: &LevelDescriptor, vn_id: Option<&str>) -> bool {
    vn_id.is_some_and(|vn_id| descriptor.is_unique_actor(vn_id))
}

/// Drops every non-unique baseline enemy and materializes the saved ones.
/// Returns saved id -> live id for spawner alive sets.
fn restore_dynamic_enemies(
    world: &mut World,
    session: &mut SessionContext,
    descriptor: &LevelDescriptor,
    payload: &SavePayload,
) -> BTreeMap<u64, EnemyId> {
    world
        .enemies
        .retain(|_, enemy| is_unique(descriptor, enemy.vn_id.as_deref()));

    let mut id_map = BTreeMap::new();
    for record in &payload.dynamic_enemies {
        if is_unique(descriptor, record.vn_id.as_deref()) {
            continue;
        }
        let live = spawn_enemy(world, session, record.to_spec(EnemyKind::Mook));
        if let Some(saved) = record.id {
            id_map.insert(saved, live);
        }
    }
    id_map
}

fn reconcile_unique_actors(
    world: &mut World,
    session: &mut SessionContext,
    payload: &SavePayload,
    id_map: &mut BTreeMap<u64, EnemyId>,
) {
    for vn_id in &session.defeated_uniques {
        world.remove_enemies_by_vn_id(vn_id);
    }
    for (vn_id, entry) in &payload.unique_actors {
        match (entry.state, &entry.actor) {
            (UniqueState::Alive, Some(record)) => {
                let live = overwrite_unique(world, session, vn_id, record);
                if let Some(saved) = record.id {
                    id_map.insert(saved, live);
                }
            }
            _ => {
                world.remove_enemies_by_vn_id(vn_id);
            }
        }
    }
}

/// Keeps the baseline instance's id when there is one so anything holding
/// it stays valid; otherwise the saved record is synthesized fresh.
fn overwrite_unique(
    world: &mut World,
    session: &mut SessionContext,
    vn_id: &str,
    record: &EnemyRecord,
) -> EnemyId {
    let existing = world.enemy_id_by_vn_id(vn_id);
    world.remove_enemies_by_vn_id(vn_id);
    let spec = EnemySpec {
        id: existing.or(record.id.map(EnemyId)),
        vn_id: Some(vn_id.to_string()),
        ..record.to_spec(EnemyKind::Featured)
    };
    spawn_enemy(world, session, spec)
}

fn spawner_from_record(
    record: &SpawnerRecord,
    now_sec: f64,
    world: &World,
    id_map: &BTreeMap<u64, EnemyId>,
) -> Spawner {
    let alive = record
        .alive_ids
        .iter()
        .filter_map(|saved| id_map.get(saved).copied())
        .filter(|id| world.enemies.contains_key(id))
        .collect::<BTreeSet<_>>();
    Spawner {
        config: SpawnerConfig {
            template: record.template.clone(),
            batch_size: record.batch_size,
            interval_sec: record.interval_sec,
            jitter_sec: record.jitter_sec,
            max_total: record.max_total,
            max_alive: record.max_alive,
            proximity: record.proximity,
            radius_px: record.radius_px,
            ..SpawnerConfig::new(
                record.id.clone(),
                Rect::new(record.x, record.y, record.w, record.h),
            )
        },
        next_at_sec: now_sec + f64::from(record.next_at_delay),
        total_spawned: record.total_spawned,
        alive,
        enabled: record.enabled,
    }
}

fn restore_spawners(
    world: &mut World,
    session: &SessionContext,
    payload: &SavePayload,
    id_map: &BTreeMap<u64, EnemyId>,
) {
    let spawners = payload
        .spawners
        .iter()
        .map(|record| spawner_from_record(record, session.now_sec, world, id_map))
        .map(|spawner| (spawner.config.id.clone(), spawner))
        .collect();
    world.spawners = spawners;
}

/// Intros re-arm for every unique the player has not seen yet.
fn attach_intros(world: &mut World, session: &SessionContext, ports: &mut Ports<'_>) {
    for enemy in world.enemies.values_mut() {
        let Some(vn_id) = enemy.vn_id.clone() else {
            continue;
        };
        enemy.intro_shown = session.has_seen(&vn_id);
        enemy.intro_attached = false;
        if enemy.intro_shown {
            continue;
        }
        match ports.narrative.attach_intro(enemy) {
            Ok(()) => enemy.intro_attached = true,
            Err(err) => warn!(vn_id = %vn_id, error = %err, "intro_attach_failed"),
        }
    }
}
