use std::collections::BTreeSet;

use engine::map::EnemyKind;
use engine::{Facing, Vec2};
use tracing::warn;

use crate::ports::NarrativeAttachment;
use crate::session::{SessionContext, MAX_PERSISTED_ENEMY_ID};

use super::actors::{
    Companion, Enemy, EnemyId, GroundItem, Inventory, Item, Npc, Progress, COMPANION_SIZE,
    NPC_SIZE,
};
use super::spawners::{schedule_next, Spawner, SpawnerConfig};
use super::World;

pub const DEFAULT_AGGRO_RADIUS: f32 = 160.0;
pub const DEFAULT_LEASH_RADIUS: f32 = 320.0;

/// Baseline stats per tier, used wherever an `EnemySpec` leaves a value out.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KindDefaults {
    pub hp: f32,
    pub touch_damage: f32,
    pub speed: f32,
    pub size: f32,
}

pub fn kind_defaults(kind: EnemyKind) -> KindDefaults {
    match kind {
        EnemyKind::Mook => KindDefaults {
            hp: 30.0,
            touch_damage: 4.0,
            speed: 60.0,
            size: 24.0,
        },
        EnemyKind::Featured => KindDefaults {
            hp: 80.0,
            touch_damage: 8.0,
            speed: 70.0,
            size: 28.0,
        },
        EnemyKind::Boss => KindDefaults {
            hp: 240.0,
            touch_damage: 14.0,
            speed: 55.0,
            size: 40.0,
        },
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnemySpec {
    pub id: Option<EnemyId>,
    pub kind: EnemyKind,
    pub name: Option<String>,
    pub pos: Vec2,
    pub dir: Option<Facing>,
    pub hp: Option<f32>,
    pub max_hp: Option<f32>,
    pub touch_damage: Option<f32>,
    pub speed: Option<f32>,
    pub vn_id: Option<String>,
    pub guardian: bool,
    pub leashed: bool,
    pub home: Option<Vec2>,
    pub aggro_radius: Option<f32>,
    pub leash_radius: Option<f32>,
    pub spawner_id: Option<String>,
    pub sprite_scale: Option<f32>,
}

impl EnemySpec {
    pub fn new(kind: EnemyKind, pos: Vec2) -> Self {
        Self {
            id: None,
            kind,
            name: None,
            pos,
            dir: None,
            hp: None,
            max_hp: None,
            touch_damage: None,
            speed: None,
            vn_id: None,
            guardian: false,
            leashed: false,
            home: None,
            aggro_radius: None,
            leash_radius: None,
            spawner_id: None,
            sprite_scale: None,
        }
    }
}

fn non_negative_or(value: Option<f32>, fallback: f32) -> f32 {
    value
        .filter(|value| value.is_finite() && *value >= 0.0)
        .unwrap_or(fallback)
}

fn positive_or(value: Option<f32>, fallback: f32) -> f32 {
    value
        .filter(|value| value.is_finite() && *value > 0.0)
        .unwrap_or(fallback)
}

/// Builds a fully defaulted enemy and inserts it. A requested id is honoured
/// when it is free and in range; otherwise a fresh one is allocated.
pub fn spawn_enemy(world: &mut World, session: &mut SessionContext, spec: EnemySpec) -> EnemyId {
    let defaults = kind_defaults(spec.kind);
    let id = match spec.id {
        Some(id) if id.0 < MAX_PERSISTED_ENEMY_ID && !world.enemies.contains_key(&id) => {
            session.reserve_enemy_id(id);
            id
        }
        _ => loop {
            let id = session.alloc_enemy_id();
            if !world.enemies.contains_key(&id) {
                break id;
            }
        },
    };

    let pos = world.clamp_to_bounds(spec.pos);
    let max_hp = positive_or(spec.max_hp.or(spec.hp), defaults.hp);
    let hp = non_negative_or(spec.hp, max_hp).min(max_hp);
    let home = spec.home.map_or(pos, |home| world.clamp_to_bounds(home));
    let sprite_scale = positive_or(spec.sprite_scale, 1.0);
    let size = defaults.size * sprite_scale;
    let name = spec
        .name
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| format!("{:?}", spec.kind).to_ascii_lowercase());

    world.enemies.insert(
        id,
        Enemy {
            id,
            kind: spec.kind,
            name,
            pos,
            w: size,
            h: size,
            dir: spec.dir.unwrap_or_default(),
            anim_phase: 0.0,
            speed: non_negative_or(spec.speed, defaults.speed),
            hp,
            max_hp,
            touch_damage: non_negative_or(spec.touch_damage, defaults.touch_damage),
            vn_id: spec.vn_id.filter(|vn_id| !vn_id.is_empty()),
            guardian: spec.guardian,
            leashed: spec.leashed,
            home,
            aggro_radius: positive_or(spec.aggro_radius, DEFAULT_AGGRO_RADIUS),
            leash_radius: positive_or(spec.leash_radius, DEFAULT_LEASH_RADIUS),
            returning: false,
            spawner_id: spec.spawner_id,
            sprite_scale,
            intro_attached: false,
            intro_shown: false,
        },
    );
    id
}

pub fn spawn_companion(world: &mut World, name: impl Into<String>, pos: Vec2) -> &mut Companion {
    let pos = world.clamp_to_bounds(pos);
    world.companions.push(Companion {
        name: name.into(),
        pos,
        w: COMPANION_SIZE,
        h: COMPANION_SIZE,
        dir: Facing::Down,
        anim_phase: 0.0,
        speed: 110.0,
        hp: 60.0,
        max_hp: 60.0,
        affinity: 0.0,
        progress: Progress::default(),
        inventory: Inventory::default(),
    });
    let last = world.companions.len() - 1;
    &mut world.companions[last]
}

#[derive(Debug, Clone, PartialEq)]
pub struct NpcSpec {
    pub key: String,
    pub pos: Vec2,
    pub dir: Facing,
    pub dialog_id: Option<String>,
}

impl NpcSpec {
    pub fn new(key: impl Into<String>, pos: Vec2) -> Self {
        Self {
            key: key.into(),
            pos,
            dir: Facing::Down,
            dialog_id: None,
        }
    }
}

/// Adds an NPC and asks the narrative port for its dialog. A failed attach
/// leaves the NPC in place without dialog.
pub fn spawn_npc(
    world: &mut World,
    narrative: &mut dyn NarrativeAttachment,
    spec: NpcSpec,
) -> usize {
    let mut npc = Npc {
        key: spec.key,
        pos: world.clamp_to_bounds(spec.pos),
        w: NPC_SIZE,
        h: NPC_SIZE,
        dir: spec.dir,
        anim_phase: 0.0,
        affinity: 0.0,
        progress: Progress::default(),
        inventory: Inventory::default(),
        dialog_id: spec.dialog_id,
        dialog_attached: false,
    };
    attach_npc_dialog(&mut npc, narrative);
    world.npcs.push(npc);
    world.npcs.len() - 1
}

pub(crate) fn attach_npc_dialog(npc: &mut Npc, narrative: &mut dyn NarrativeAttachment) {
    let Some(dialog_id) = npc.dialog_id.clone() else {
        return;
    };
    match narrative.attach_dialog(npc, &dialog_id) {
        Ok(()) => npc.dialog_attached = true,
        Err(err) => {
            npc.dialog_attached = false;
            warn!(npc = %npc.key, dialog = %dialog_id, error = %err, "dialog_attach_failed");
        }
    }
}

pub fn spawn_pickup(world: &mut World, item: Item, pos: Vec2) {
    let pos = world.clamp_to_bounds(pos);
    world.ground_items.push(GroundItem { item, pos });
}

/// Registers a spawner, replacing any existing one with the same id.
pub fn add_spawner(world: &mut World, session: &mut SessionContext, config: SpawnerConfig) {
    let next_at_sec = schedule_next(&config, session.now_sec, session);
    let spawner = Spawner {
        config,
        next_at_sec,
        total_spawned: 0,
        alive: BTreeSet::new(),
        enabled: true,
    };
    world.spawners.insert(spawner.config.id.clone(), spawner);
}

#[cfg(test)]
mod tests {
    use engine::{Rect, WorldBounds};

    use super::*;
    use crate::testing::RecordingNarrative;

    fn world() -> World {
        let mut world = World::new();
        world.reset_for_level(WorldBounds::new(20, 20));
        world
    }

    #[test]
    fn missing_and_invalid_stats_fall_back_to_kind_defaults() {
        let mut world = world();
        let mut session = SessionContext::default();
        let id = spawn_enemy(
            &mut world,
            &mut session,
            EnemySpec {
                hp: Some(f32::NAN),
                speed: Some(-3.0),
                ..EnemySpec::new(EnemyKind::Boss, Vec2::new(5000.0, -20.0))
            },
        );
        let enemy = &world.enemies[&id];
        assert_eq!(enemy.hp, 240.0);
        assert_eq!(enemy.max_hp, 240.0);
        assert_eq!(enemy.speed, 55.0);
        assert_eq!(enemy.pos, Vec2::new(20.0 * 32.0 - 1.0, 0.0));
        assert_eq!(enemy.home, enemy.pos);
        assert_eq!(enemy.name, "boss");
    }

    #[test]
    fn requested_ids_are_kept_when_free() {
        let mut world = world();
        let mut session = SessionContext::default();
        let spec = EnemySpec {
            id: Some(EnemyId(9)),
            ..EnemySpec::new(EnemyKind::Mook, Vec2::new(10.0, 10.0))
        };
        assert_eq!(spawn_enemy(&mut world, &mut session, spec.clone()), EnemyId(9));
        assert_eq!(spawn_enemy(&mut world, &mut session, spec), EnemyId(10));
        assert_eq!(world.enemies.len(), 2);
    }

    #[test]
    fn out_of_range_ids_are_reassigned_and_taken_ids_skipped() {
        let mut world = world();
        let mut session = SessionContext::default();
        let huge = spawn_enemy(
            &mut world,
            &mut session,
            EnemySpec {
                id: Some(EnemyId(u64::MAX)),
                ..EnemySpec::new(EnemyKind::Mook, Vec2::new(10.0, 10.0))
            },
        );
        assert_eq!(huge, EnemyId(1));

        let mut spec = EnemySpec::new(EnemyKind::Mook, Vec2::new(10.0, 10.0));
        spec.id = Some(EnemyId(2));
        let taken = spawn_enemy(&mut world, &mut session, spec);
        let mut stale = SessionContext::default();
        let fresh = (0..3)
            .map(|_| {
                spawn_enemy(
                    &mut world,
                    &mut stale,
                    EnemySpec::new(EnemyKind::Mook, Vec2::new(10.0, 10.0)),
                )
            })
            .collect::<Vec<_>>();
        assert_eq!(taken, EnemyId(2));
        assert_eq!(fresh, vec![EnemyId(3), EnemyId(4), EnemyId(5)]);
        assert_eq!(world.enemies.len(), 5);
    }

    #[test]
    fn npc_dialog_failure_keeps_the_npc() {
        let mut world = world();
        let mut narrative = RecordingNarrative::failing_dialogs();
        let index = spawn_npc(
            &mut world,
            &mut narrative,
            NpcSpec {
                dialog_id: Some("villager_intro".to_string()),
                ..NpcSpec::new("villager", Vec2::new(40.0, 40.0))
            },
        );
        assert_eq!(world.npcs.len(), 1);
        assert!(!world.npcs[index].dialog_attached);
        assert_eq!(narrative.dialog_attempts, vec!["villager_intro".to_string()]);
    }

    #[test]
    fn add_spawner_replaces_by_id() {
        let mut world = world();
        let mut session = SessionContext::default();
        let rect = Rect::from_tiles(1, 1, 1, 1);
        add_spawner(&mut world, &mut session, SpawnerConfig::new("den", rect));
        world
            .spawners
            .get_mut("den")
            .expect("spawner")
            .alive
            .insert(EnemyId(3));
        add_spawner(
            &mut world,
            &mut session,
            SpawnerConfig {
                batch_size: 4,
                ..SpawnerConfig::new("den", rect)
            },
        );
        assert_eq!(world.spawners.len(), 1);
        assert_eq!(world.spawners["den"].config.batch_size, 4);
        assert!(world.spawners["den"].alive.is_empty());
    }
}
