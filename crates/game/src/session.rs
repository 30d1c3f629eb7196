use std::collections::{BTreeMap, BTreeSet};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::save::SavePayload;
use crate::world::EnemyId;

pub const DEFAULT_SEED: u64 = 0x5eed_e4be;

/// Enemy ids a save may carry. Larger ids are reassigned on load.
pub const MAX_PERSISTED_ENEMY_ID: u64 = u32::MAX as u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GateState {
    Locked,
    Unlocked,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RestorePhase {
    #[default]
    Idle,
    PendingLevelSwitch,
    BaselineLoading,
    Restoring,
    Active,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MeleeLoadout {
    pub right_hand_id: Option<String>,
    pub left_hand_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RangedLoadout {
    pub right_hand_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Loadouts {
    pub melee: MeleeLoadout,
    pub ranged: RangedLoadout,
}

/// Who carries the torch (0 = player, n = companion n-1) and how long it
/// has burned.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TorchState {
    pub bearer_index: Option<u32>,
    pub burn_ms: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RngState {
    pub seed: u64,
    pub word_pos: u64,
}

/// Process-wide session state: clock, flags, deltas and the pause switches
/// the restore path uses to hold simulation and narrative triggers.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub current_level: u32,
    pub now_sec: f64,
    pub paused: bool,
    pub disable_vn: bool,
    pub render_suspended: bool,
    pub restore_phase: RestorePhase,
    pub pending_restore: Option<SavePayload>,
    pub pending_level: Option<u32>,
    pub requested_level_switch: Option<u32>,
    pub vn_seen: BTreeMap<String, bool>,
    pub affinity_flags: BTreeMap<String, bool>,
    pub quest_flags: BTreeMap<String, bool>,
    pub quest_counters: BTreeMap<String, i64>,
    pub quest_meta: BTreeMap<String, serde_json::Value>,
    pub gate_states: BTreeMap<String, GateState>,
    pub opened_chests: BTreeSet<String>,
    pub broken_breakables: BTreeSet<String>,
    pub defeated_uniques: BTreeSet<String>,
    pub loadouts: Loadouts,
    pub torch: TorchState,
    pub snake_mode: bool,
    next_enemy_id: u64,
    rng_seed: u64,
    rng: ChaCha8Rng,
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new(DEFAULT_SEED)
    }
}

impl SessionContext {
    pub fn new(seed: u64) -> Self {
        Self {
            current_level: 0,
            now_sec: 0.0,
            paused: false,
            disable_vn: false,
            render_suspended: false,
            restore_phase: RestorePhase::Idle,
            pending_restore: None,
            pending_level: None,
            requested_level_switch: None,
            vn_seen: BTreeMap::new(),
            affinity_flags: BTreeMap::new(),
            quest_flags: BTreeMap::new(),
            quest_counters: BTreeMap::new(),
            quest_meta: BTreeMap::new(),
            gate_states: BTreeMap::new(),
            opened_chests: BTreeSet::new(),
            broken_breakables: BTreeSet::new(),
            defeated_uniques: BTreeSet::new(),
            loadouts: Loadouts::default(),
            torch: TorchState::default(),
            snake_mode: false,
            next_enemy_id: 1,
            rng_seed: seed,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn now_ms(&self) -> f64 {
        self.now_sec * 1000.0
    }

    pub fn rng(&mut self) -> &mut ChaCha8Rng {
        &mut self.rng
    }

    pub fn rng_state(&self) -> RngState {
        RngState {
            seed: self.rng_seed,
            word_pos: u64::try_from(self.rng.get_word_pos()).unwrap_or(u64::MAX),
        }
    }

    pub fn restore_rng(&mut self, state: RngState) {
        let mut rng = ChaCha8Rng::seed_from_u64(state.seed);
        rng.set_word_pos(u128::from(state.word_pos));
        self.rng_seed = state.seed;
        self.rng = rng;
    }

    /// Hands out the next id. The counter restarts at 1 instead of
    /// overflowing; callers skip ids that are still in use.
    pub fn alloc_enemy_id(&mut self) -> EnemyId {
        let id = EnemyId(self.next_enemy_id);
        self.next_enemy_id = self.next_enemy_id.checked_add(1).unwrap_or(1);
        id
    }

    /// Keeps the allocator ahead of an id that entered the world from
    /// outside it. Ids at or above `MAX_PERSISTED_ENEMY_ID` are ignored.
    pub fn reserve_enemy_id(&mut self, id: EnemyId) {
        if id.0 < MAX_PERSISTED_ENEMY_ID {
            self.next_enemy_id = self.next_enemy_id.max(id.0 + 1);
        }
    }

    pub fn has_seen(&self, vn_id: &str) -> bool {
        self.vn_seen.get(vn_id).copied().unwrap_or(false)
    }

    pub fn suspend_for_restore(&mut self) {
        self.paused = true;
        self.disable_vn = true;
        self.render_suspended = true;
    }

    pub fn resume_after_restore(&mut self) {
        self.paused = false;
        self.disable_vn = false;
        self.render_suspended = false;
        self.pending_restore = None;
        self.pending_level = None;
        self.restore_phase = RestorePhase::Active;
    }
}
