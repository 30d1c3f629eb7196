//! Versioned save payloads: capture, normalization and baseline-plus-delta
//! restore.

mod normalize;
mod payload;
mod restore;
mod serialize;

pub use normalize::{normalize_enemy_record, normalize_payload, DYNAMIC_ENEMY_CAP};
pub use payload::{
    CompanionRecord, EnemyRecord, GroundItemRecord, NpcRecord, PlayerRecord, SavePayload,
    SpawnerRecord, UniqueActorRecord, UniqueState, SAVE_SCHEMA, SAVE_VERSION,
};
pub use restore::{
    apply_pending_restore, complete_level_switch, load_data_payload, load_payload, parse_payload,
    LoadOutcome, PayloadParseError, RestoreError,
};
pub use serialize::serialize_save;
