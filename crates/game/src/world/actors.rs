use std::collections::BTreeMap;
use std::fmt;

use engine::map::EnemyKind;
use engine::{Facing, Rect, Vec2};
use serde::{Deserialize, Serialize};

pub const PLAYER_SIZE: f32 = 24.0;
pub const COMPANION_SIZE: f32 = 24.0;
pub const NPC_SIZE: f32 = 24.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnemyId(pub u64);

impl fmt::Display for EnemyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EquipSlot {
    Head,
    Torso,
    Legs,
    Feet,
    LeftHand,
    RightHand,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Item {
    pub id: String,
    pub name: String,
    pub slot: Option<EquipSlot>,
    pub qty: u32,
    pub max_qty: u32,
    pub atk: i32,
    pub def: i32,
}

impl Default for Item {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            slot: None,
            qty: 1,
            max_qty: 1,
            atk: 0,
            def: 0,
        }
    }
}

impl Item {
    pub fn stackable(id: impl Into<String>, name: impl Into<String>, qty: u32, max_qty: u32) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            qty,
            max_qty: max_qty.max(1),
            ..Self::default()
        }
    }

    pub fn equipment(
        id: impl Into<String>,
        name: impl Into<String>,
        slot: EquipSlot,
        atk: i32,
        def: i32,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            slot: Some(slot),
            atk,
            def,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Inventory {
    pub items: Vec<Item>,
    pub equipped: BTreeMap<EquipSlot, Item>,
}

/// Level and experience carried by every actor that can grow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub level: u32,
    pub xp: u32,
}

impl Default for Progress {
    fn default() -> Self {
        Self { level: 1, xp: 0 }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    pub pos: Vec2,
    pub w: f32,
    pub h: f32,
    pub dir: Facing,
    pub anim_phase: f32,
    pub speed: f32,
    pub hp: f32,
    pub max_hp: f32,
    pub progress: Progress,
    pub inventory: Inventory,
}

impl Default for Player {
    fn default() -> Self {
        Self {
            pos: Vec2::ZERO,
            w: PLAYER_SIZE,
            h: PLAYER_SIZE,
            dir: Facing::Down,
            anim_phase: 0.0,
            speed: 120.0,
            hp: 100.0,
            max_hp: 100.0,
            progress: Progress::default(),
            inventory: Inventory::default(),
        }
    }
}

impl Player {
    pub fn rect(&self) -> Rect {
        Rect::centered_at(self.pos, self.w, self.h)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Companion {
    pub name: String,
    pub pos: Vec2,
    pub w: f32,
    pub h: f32,
    pub dir: Facing,
    pub anim_phase: f32,
    pub speed: f32,
    pub hp: f32,
    pub max_hp: f32,
    pub affinity: f32,
    pub progress: Progress,
    pub inventory: Inventory,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Npc {
    pub key: String,
    pub pos: Vec2,
    pub w: f32,
    pub h: f32,
    pub dir: Facing,
    pub anim_phase: f32,
    pub affinity: f32,
    pub progress: Progress,
    pub inventory: Inventory,
    pub dialog_id: Option<String>,
    pub dialog_attached: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Enemy {
    pub id: EnemyId,
    pub kind: EnemyKind,
    pub name: String,
    pub pos: Vec2,
    pub w: f32,
    pub h: f32,
    pub dir: Facing,
    pub anim_phase: f32,
    pub speed: f32,
    pub hp: f32,
    pub max_hp: f32,
    pub touch_damage: f32,
    pub vn_id: Option<String>,
    pub guardian: bool,
    pub leashed: bool,
    pub home: Vec2,
    pub aggro_radius: f32,
    pub leash_radius: f32,
    pub returning: bool,
    pub spawner_id: Option<String>,
    pub sprite_scale: f32,
    pub intro_attached: bool,
    pub intro_shown: bool,
}

impl Enemy {
    pub fn rect(&self) -> Rect {
        Rect::centered_at(self.pos, self.w, self.h)
    }

    pub fn is_alive(&self) -> bool {
        self.hp > 0.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroundItem {
    pub item: Item,
    pub pos: Vec2,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Light {
    pub pos: Vec2,
    pub radius: f32,
}
