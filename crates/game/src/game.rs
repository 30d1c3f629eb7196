use engine::LevelDescriptor;
use tracing::info;

use crate::levels::{LevelError, LevelRegistry};
use crate::ports::{NarrativeAttachment, Ports};
use crate::save::{self, LoadOutcome, RestoreError, SavePayload};
use crate::session::SessionContext;
use crate::world::sim::step_simulation;
use crate::world::World;

/// One play session: the live world, its session context and the levels it
/// can load.
pub struct Game {
    pub world: World,
    pub session: SessionContext,
    pub levels: LevelRegistry,
}

impl Game {
    pub fn new(levels: LevelRegistry, seed: u64) -> Self {
        Self {
            world: World::new(),
            session: SessionContext::new(seed),
            levels,
        }
    }

    pub fn with_builtin_levels(seed: u64) -> Result<Self, LevelError> {
        Ok(Self::new(LevelRegistry::builtin()?, seed))
    }

    /// Loads `level` from its baseline, replaying whatever deltas the
    /// session already carries.
    pub fn start(
        &mut self,
        level: u32,
        narrative: &mut dyn NarrativeAttachment,
    ) -> Result<(), LevelError> {
        self.levels
            .load(level, &mut self.world, &mut self.session, narrative)
    }

    pub fn step(&mut self, dt: f32) -> bool {
        step_simulation(&mut self.world, &mut self.session, dt)
    }

    pub fn descriptor(&self) -> LevelDescriptor {
        self.levels.descriptor_for_level(self.session.current_level)
    }

    pub fn serialize_save(&self, at_ms: u64) -> SavePayload {
        save::serialize_save(&self.world, &self.session, &self.descriptor(), at_ms)
    }

    pub fn save_json(&self, at_ms: u64) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.serialize_save(at_ms))
    }

    pub fn load_data_payload(
        &mut self,
        ports: &mut Ports<'_>,
        raw: &str,
    ) -> Result<LoadOutcome, RestoreError> {
        save::load_data_payload(
            &self.levels,
            &mut self.world,
            &mut self.session,
            ports,
            raw,
        )
    }

    pub fn load_payload(
        &mut self,
        ports: &mut Ports<'_>,
        payload: SavePayload,
    ) -> Result<LoadOutcome, RestoreError> {
        save::load_payload(
            &self.levels,
            &mut self.world,
            &mut self.session,
            ports,
            payload,
        )
    }

    /// Acts on a requested level switch. A parked restore is applied once the
    /// new baseline is in; a plain switch just loads the level.
    pub fn process_level_switch(
        &mut self,
        ports: &mut Ports<'_>,
    ) -> Result<LoadOutcome, RestoreError> {
        let Some(level) = self.session.requested_level_switch else {
            return Ok(LoadOutcome::NothingPending);
        };
        if self.session.pending_restore.is_some() {
            return save::complete_level_switch(
                &self.levels,
                &mut self.world,
                &mut self.session,
                ports,
            );
        }

        self.session.requested_level_switch = None;
        info!(from = self.session.current_level, to = level, "level_switch");
        self.levels
            .load(level, &mut self.world, &mut self.session, &mut *ports.narrative)?;
        Ok(LoadOutcome::NothingPending)
    }
}
