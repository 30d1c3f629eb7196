use std::collections::BTreeMap;

use engine::map::EnemyKind;
use engine::{Facing, Vec2, WorldBounds, TILE_SIZE};
use serde::{Deserialize, Deserializer, Serialize};

use crate::session::{GateState, Loadouts, RngState, TorchState};
use crate::world::factories::EnemySpec;
use crate::world::spawners::{DEFAULT_PROXIMITY_RADIUS_PX, DEFAULT_SPAWN_INTERVAL_SEC};
use crate::world::{
    Companion, Enemy, EnemyId, EnemyTemplate, Inventory, Item, Npc, ProximityMode, Spawner,
};

pub const SAVE_SCHEMA: &str = "save";
pub const SAVE_VERSION: u32 = 3;

fn lenient_facing<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Facing, D::Error> {
    let raw = Option::<String>::deserialize(deserializer)?;
    let facing = match raw.as_deref().map(str::trim) {
        Some("up") => Facing::Up,
        Some("left") => Facing::Left,
        Some("right") => Facing::Right,
        _ => Facing::Down,
    };
    Ok(facing)
}

fn lenient_kind<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<EnemyKind>, D::Error> {
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(EnemyKind::from_name))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlayerRecord {
    pub x: f32,
    pub y: f32,
    #[serde(deserialize_with = "lenient_facing")]
    pub dir: Facing,
    pub hp: f32,
    pub max_hp: f32,
    pub speed: f32,
    pub level: u32,
    pub xp: u32,
    pub inventory: Inventory,
}

impl Default for PlayerRecord {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            dir: Facing::Down,
            hp: 100.0,
            max_hp: 100.0,
            speed: 120.0,
            level: 1,
            xp: 0,
            inventory: Inventory::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompanionRecord {
    pub name: String,
    pub x: f32,
    pub y: f32,
    #[serde(deserialize_with = "lenient_facing")]
    pub dir: Facing,
    pub hp: f32,
    pub max_hp: f32,
    pub speed: f32,
    pub affinity: f32,
    pub level: u32,
    pub xp: u32,
    pub inventory: Inventory,
}

impl Default for CompanionRecord {
    fn default() -> Self {
        Self {
            name: String::new(),
            x: 0.0,
            y: 0.0,
            dir: Facing::Down,
            hp: 60.0,
            max_hp: 60.0,
            speed: 110.0,
            affinity: 0.0,
            level: 1,
            xp: 0,
            inventory: Inventory::default(),
        }
    }
}

impl CompanionRecord {
    pub fn from_companion(companion: &Companion) -> Self {
        Self {
            name: companion.name.clone(),
            x: companion.pos.x,
            y: companion.pos.y,
            dir: companion.dir,
            hp: companion.hp,
            max_hp: companion.max_hp,
            speed: companion.speed,
            affinity: companion.affinity,
            level: companion.progress.level,
            xp: companion.progress.xp,
            inventory: companion.inventory.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NpcRecord {
    pub key: String,
    pub x: f32,
    pub y: f32,
    #[serde(deserialize_with = "lenient_facing")]
    pub dir: Facing,
    pub affinity: f32,
    pub level: u32,
    pub xp: u32,
    pub inventory: Inventory,
    pub dialog_id: Option<String>,
}

impl Default for NpcRecord {
    fn default() -> Self {
        Self {
            key: String::new(),
            x: 0.0,
            y: 0.0,
            dir: Facing::Down,
            affinity: 0.0,
            level: 1,
            xp: 0,
            inventory: Inventory::default(),
            dialog_id: None,
        }
    }
}

impl NpcRecord {
    pub fn from_npc(npc: &Npc) -> Self {
        Self {
            key: npc.key.clone(),
            x: npc.pos.x,
            y: npc.pos.y,
            dir: npc.dir,
            affinity: npc.affinity,
            level: npc.progress.level,
            xp: npc.progress.xp,
            inventory: npc.inventory.clone(),
            dialog_id: npc.dialog_id.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GroundItemRecord {
    pub item: Item,
    pub x: f32,
    pub y: f32,
}

/// Full pose and stats of one enemy. Shared by unique actors and the
/// dynamic snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EnemyRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(deserialize_with = "lenient_kind")]
    pub kind: Option<EnemyKind>,
    pub name: String,
    pub x: f32,
    pub y: f32,
    #[serde(deserialize_with = "lenient_facing")]
    pub dir: Facing,
    pub hp: Option<f32>,
    pub max_hp: Option<f32>,
    pub touch_damage: Option<f32>,
    pub speed: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vn_id: Option<String>,
    pub guardian: bool,
    pub leashed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub home_x: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub home_y: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggro_radius: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub leash_radius: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spawner_id: Option<String>,
    pub sprite_scale: f32,
}

impl Default for EnemyRecord {
    fn default() -> Self {
        Self {
            id: None,
            kind: None,
            name: String::new(),
            x: 0.0,
            y: 0.0,
            dir: Facing::Down,
            hp: None,
            max_hp: None,
            touch_damage: None,
            speed: None,
            vn_id: None,
            guardian: false,
            leashed: false,
            home_x: None,
            home_y: None,
            aggro_radius: None,
            leash_radius: None,
            spawner_id: None,
            sprite_scale: 1.0,
        }
    }
}

impl EnemyRecord {
    pub fn from_enemy(enemy: &Enemy) -> Self {
        Self {
            id: Some(enemy.id.0),
            kind: Some(enemy.kind),
            name: enemy.name.clone(),
            x: enemy.pos.x,
            y: enemy.pos.y,
            dir: enemy.dir,
            hp: Some(enemy.hp),
            max_hp: Some(enemy.max_hp),
            touch_damage: Some(enemy.touch_damage),
            speed: Some(enemy.speed),
            vn_id: enemy.vn_id.clone(),
            guardian: enemy.guardian,
            leashed: enemy.leashed,
            home_x: Some(enemy.home.x),
            home_y: Some(enemy.home.y),
            aggro_radius: Some(enemy.aggro_radius),
            leash_radius: Some(enemy.leash_radius),
            spawner_id: enemy.spawner_id.clone(),
            sprite_scale: enemy.sprite_scale,
        }
    }

    pub fn pos(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    pub fn home(&self) -> Option<Vec2> {
        match (self.home_x, self.home_y) {
            (Some(x), Some(y)) => Some(Vec2::new(x, y)),
            _ => None,
        }
    }

    /// Factory input for re-materializing this record. Missing stats fall
    /// through to the factory's kind defaults.
    pub fn to_spec(&self, fallback_kind: EnemyKind) -> EnemySpec {
        EnemySpec {
            id: self.id.map(EnemyId),
            name: Some(self.name.clone()),
            dir: Some(self.dir),
            hp: self.hp,
            max_hp: self.max_hp,
            touch_damage: self.touch_damage,
            speed: self.speed,
            vn_id: self.vn_id.clone(),
            guardian: self.guardian,
            leashed: self.leashed,
            home: self.home(),
            aggro_radius: self.aggro_radius,
            leash_radius: self.leash_radius,
            spawner_id: self.spawner_id.clone(),
            sprite_scale: Some(self.sprite_scale),
            ..EnemySpec::new(self.kind.unwrap_or(fallback_kind), self.pos())
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UniqueState {
    Alive,
    Defeated,
    Unspawned,
}

/// `actor` is present only for `Alive`; on the wire its fields sit beside
/// `state`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "UniqueActorWire")]
pub struct UniqueActorRecord {
    pub state: UniqueState,
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub actor: Option<EnemyRecord>,
}

#[derive(Deserialize)]
struct UniqueActorWire {
    state: UniqueState,
    #[serde(flatten)]
    actor: EnemyRecord,
}

impl From<UniqueActorWire> for UniqueActorRecord {
    fn from(wire: UniqueActorWire) -> Self {
        Self {
            state: wire.state,
            actor: (wire.state == UniqueState::Alive).then_some(wire.actor),
        }
    }
}

impl UniqueActorRecord {
    pub fn alive(record: EnemyRecord) -> Self {
        Self {
            state: UniqueState::Alive,
            actor: Some(record),
        }
    }

    pub fn without_actor(state: UniqueState) -> Self {
        Self { state, actor: None }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SpawnerRecord {
    pub id: String,
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
    pub template: EnemyTemplate,
    pub batch_size: u32,
    pub interval_sec: f32,
    pub jitter_sec: f32,
    pub max_total: Option<u32>,
    pub max_alive: Option<u32>,
    pub proximity: ProximityMode,
    pub radius_px: f32,
    /// Seconds until the next fire, relative to the moment of saving.
    pub next_at_delay: f32,
    pub total_spawned: u32,
    pub alive_ids: Vec<u64>,
    pub enabled: bool,
}

impl Default for SpawnerRecord {
    fn default() -> Self {
        Self {
            id: String::new(),
            x: 0.0,
            y: 0.0,
            w: TILE_SIZE,
            h: TILE_SIZE,
            template: EnemyTemplate::default(),
            batch_size: 1,
            interval_sec: DEFAULT_SPAWN_INTERVAL_SEC,
            jitter_sec: 0.0,
            max_total: None,
            max_alive: None,
            proximity: ProximityMode::Ignore,
            radius_px: DEFAULT_PROXIMITY_RADIUS_PX,
            next_at_delay: 0.0,
            total_spawned: 0,
            alive_ids: Vec::new(),
            enabled: true,
        }
    }
}

impl SpawnerRecord {
    pub fn from_spawner(spawner: &Spawner, now_sec: f64) -> Self {
        let rect = spawner.config.rect;
        Self {
            id: spawner.config.id.clone(),
            x: rect.x,
            y: rect.y,
            w: rect.w,
            h: rect.h,
            template: spawner.config.template.clone(),
            batch_size: spawner.config.batch_size,
            interval_sec: spawner.config.interval_sec,
            jitter_sec: spawner.config.jitter_sec,
            max_total: spawner.config.max_total,
            max_alive: spawner.config.max_alive,
            proximity: spawner.config.proximity,
            radius_px: spawner.config.radius_px,
            next_at_delay: spawner.next_at_delay(now_sec),
            total_spawned: spawner.total_spawned,
            alive_ids: spawner.alive.iter().map(|id| id.0).collect(),
            enabled: spawner.enabled,
        }
    }
}

/// Versioned snapshot. Everything is optional on the way in: missing
/// fields take defaults and normalization coerces the rest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SavePayload {
    pub schema: String,
    pub version: u32,
    pub at: u64,
    pub current_level: u32,
    pub world: WorldBounds,
    pub player: PlayerRecord,
    pub companions: Vec<CompanionRecord>,
    pub npcs: Vec<NpcRecord>,
    pub gate_states: BTreeMap<String, GateState>,
    pub opened_chests: Vec<String>,
    pub broken_breakables: Vec<String>,
    pub ground_items: Vec<GroundItemRecord>,
    pub vn_seen: Vec<String>,
    pub affinity_flags: Vec<String>,
    pub quest_flags: Vec<String>,
    pub quest_counters: BTreeMap<String, i64>,
    pub quest_meta: BTreeMap<String, serde_json::Value>,
    pub unique_actors: BTreeMap<String, UniqueActorRecord>,
    pub defeated_uniques: Vec<String>,
    pub dynamic_enemies: Vec<EnemyRecord>,
    pub spawners: Vec<SpawnerRecord>,
    pub loadouts: Option<Loadouts>,
    pub torch: Option<TorchState>,
    pub snake_mode: bool,
    pub rng: Option<RngState>,
}

impl Default for SavePayload {
    fn default() -> Self {
        Self {
            schema: SAVE_SCHEMA.to_string(),
            version: SAVE_VERSION,
            at: 0,
            current_level: 1,
            world: WorldBounds::default(),
            player: PlayerRecord::default(),
            companions: Vec::new(),
            npcs: Vec::new(),
            gate_states: BTreeMap::new(),
            opened_chests: Vec::new(),
            broken_breakables: Vec::new(),
            ground_items: Vec::new(),
            vn_seen: Vec::new(),
            affinity_flags: Vec::new(),
            quest_flags: Vec::new(),
            quest_counters: BTreeMap::new(),
            quest_meta: BTreeMap::new(),
            unique_actors: BTreeMap::new(),
            defeated_uniques: Vec::new(),
            dynamic_enemies: Vec::new(),
            spawners: Vec::new(),
            loadouts: None,
            torch: None,
            snake_mode: false,
            rng: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sparse_hand_edited_payload_deserializes_with_defaults() {
        let payload: SavePayload = serde_json::from_str(
            r#"{
                "currentLevel": 2,
                "player": { "x": 10, "y": 20, "dir": "sideways" },
                "uniqueActors": {
                    "enemy:vorth": { "state": "alive", "x": 64, "y": 96, "hp": 12, "kind": "weird" },
                    "enemy:gone": { "state": "defeated" }
                },
                "dynamicEnemies": [ { "id": 7, "x": 1, "y": 2, "kind": "BOSS" } ]
            }"#,
        )
        .expect("parse");
        assert_eq!(payload.schema, SAVE_SCHEMA);
        assert_eq!(payload.version, SAVE_VERSION);
        assert_eq!(payload.player.dir, Facing::Down);
        assert_eq!(payload.player.hp, 100.0);
        assert_eq!(payload.dynamic_enemies[0].speed, None);

        let vorth = &payload.unique_actors["enemy:vorth"];
        assert_eq!(vorth.state, UniqueState::Alive);
        let record = vorth.actor.as_ref().expect("alive record");
        assert_eq!(record.pos(), Vec2::new(64.0, 96.0));
        assert_eq!(record.kind, None);
        assert!(payload.unique_actors["enemy:gone"].actor.is_none());
        assert_eq!(payload.dynamic_enemies[0].kind, Some(EnemyKind::Boss));
        assert_eq!(payload.dynamic_enemies[0].id, Some(7));
    }

    #[test]
    fn non_alive_unique_serializes_as_bare_state() {
        let record = UniqueActorRecord::without_actor(UniqueState::Unspawned);
        let json = serde_json::to_value(&record).expect("encode");
        assert_eq!(json, serde_json::json!({ "state": "unspawned" }));
        let back: UniqueActorRecord = serde_json::from_value(json).expect("decode");
        assert_eq!(back, record);
    }
}
