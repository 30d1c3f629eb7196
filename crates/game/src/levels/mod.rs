use std::collections::BTreeMap;
use std::path::Path;

use engine::{
    compile_level_descriptors, ContentCompileError, LevelDescriptor, LevelDescriptorDatabase,
    MapError,
};
use thiserror::Error;
use tracing::info;

use crate::ports::NarrativeAttachment;
use crate::session::SessionContext;
use crate::world::interactions::apply_session_deltas;
use crate::world::World;

mod builtin;

const BUILTIN_DESCRIPTORS: &str = include_str!("../../assets/level_descriptors.xml");
const BUILTIN_DESCRIPTORS_LABEL: &str = "assets/level_descriptors.xml";

#[derive(Debug, Error)]
pub enum LevelError {
    #[error("no loader is registered for level {level}")]
    UnknownLevel { level: u32 },
    #[error("level descriptors failed to compile: {0}")]
    Content(#[from] ContentCompileError),
    #[error("level map failed to load: {0}")]
    Map(#[from] MapError),
}

/// Which ids each level owns. Unknown levels get an empty descriptor so a
/// save from a removed level still serializes and restores.
#[derive(Debug, Clone, Default)]
pub struct LevelDescriptors {
    database: LevelDescriptorDatabase,
}

impl LevelDescriptors {
    pub fn new(database: LevelDescriptorDatabase) -> Self {
        Self { database }
    }

    pub fn from_xml(label: &Path, raw: &str) -> Result<Self, ContentCompileError> {
        compile_level_descriptors(label, raw).map(Self::new)
    }

    pub fn builtin() -> Result<Self, ContentCompileError> {
        Self::from_xml(Path::new(BUILTIN_DESCRIPTORS_LABEL), BUILTIN_DESCRIPTORS)
    }

    pub fn descriptor_for_level(&self, level: u32) -> LevelDescriptor {
        self.database
            .descriptor(level)
            .cloned()
            .unwrap_or_else(|| LevelDescriptor::empty(level))
    }

    pub fn is_unique_actor(&self, level: u32, vn_id: &str) -> bool {
        self.database.is_unique_actor(level, vn_id)
    }
}

pub type LevelLoader = fn(
    &mut World,
    &mut SessionContext,
    &mut dyn NarrativeAttachment,
) -> Result<(), LevelError>;

pub struct LevelRegistry {
    loaders: BTreeMap<u32, LevelLoader>,
    descriptors: LevelDescriptors,
}

impl LevelRegistry {
    pub fn new(descriptors: LevelDescriptors) -> Self {
        Self {
            loaders: BTreeMap::new(),
            descriptors,
        }
    }

    pub fn builtin() -> Result<Self, LevelError> {
        let mut registry = Self::new(LevelDescriptors::builtin()?);
        registry.register(1, builtin::load_level_1);
        registry.register(2, builtin::load_level_2);
        registry.register(3, builtin::load_level_3);
        Ok(registry)
    }

    pub fn register(&mut self, level: u32, loader: LevelLoader) {
        self.loaders.insert(level, loader);
    }

    pub fn contains(&self, level: u32) -> bool {
        self.loaders.contains_key(&level)
    }

    pub fn levels(&self) -> impl Iterator<Item = u32> + '_ {
        self.loaders.keys().copied()
    }

    pub fn descriptors(&self) -> &LevelDescriptors {
        &self.descriptors
    }

    pub fn descriptor_for_level(&self, level: u32) -> LevelDescriptor {
        self.descriptors.descriptor_for_level(level)
    }

    /// Rebuilds `level` from scratch. Session deltas are replayed on top
    /// unless a save is waiting to supply its own.
    pub fn load(
        &self,
        level: u32,
        world: &mut World,
        session: &mut SessionContext,
        narrative: &mut dyn NarrativeAttachment,
    ) -> Result<(), LevelError> {
        let loader = self
            .loaders
            .get(&level)
            .ok_or(LevelError::UnknownLevel { level })?;
        session.current_level = level;
        loader(world, session, narrative)?;
        world.rebuild_obstacle_index();
        if session.pending_restore.is_none() {
            apply_session_deltas(world, session);
        }
        info!(
            level,
            obstacles = world.obstacles.len(),
            enemies = world.enemies.len(),
            npcs = world.npcs.len(),
            spawners = world.spawners.len(),
            "level_loaded"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use engine::ObstacleKind;

    use super::*;
    use crate::ports::NoopNarrative;
    use crate::session::GateState;

    fn load(level: u32, session: &mut SessionContext) -> World {
        let registry = LevelRegistry::builtin().expect("builtin levels");
        let mut world = World::new();
        registry
            .load(level, &mut world, session, &mut NoopNarrative)
            .expect("level loads");
        world
    }

    #[test]
    fn builtin_descriptors_cover_every_builtin_level() {
        let registry = LevelRegistry::builtin().expect("builtin levels");
        for level in registry.levels().collect::<Vec<_>>() {
            let descriptor = registry.descriptor_for_level(level);
            assert_eq!(descriptor.level, level);
            assert_eq!(descriptor.unique_actors.len(), 1, "level {level}");
        }
        assert!(registry.descriptor_for_level(99).unique_actors.is_empty());
    }

    #[test]
    fn descriptor_ids_exist_in_each_baseline() {
        let registry = LevelRegistry::builtin().expect("builtin levels");
        for level in registry.levels().collect::<Vec<_>>() {
            let mut session = SessionContext::new(1);
            let world = load(level, &mut session);
            let descriptor = registry.descriptor_for_level(level);
            for id in descriptor
                .gates
                .iter()
                .chain(&descriptor.chests)
                .chain(&descriptor.breakables)
            {
                assert!(
                    world.obstacles.iter().any(|obstacle| obstacle.id_matches(id)),
                    "level {level} is missing obstacle {id}"
                );
            }
            for vn_id in &descriptor.unique_actors {
                assert!(world.enemy_by_vn_id(vn_id).is_some(), "level {level} lacks {vn_id}");
            }
        }
    }

    #[test]
    fn unknown_level_is_an_error() {
        let registry = LevelRegistry::builtin().expect("builtin levels");
        let mut world = World::new();
        let mut session = SessionContext::default();
        let err = registry
            .load(42, &mut world, &mut session, &mut NoopNarrative)
            .expect_err("no loader");
        assert!(matches!(err, LevelError::UnknownLevel { level: 42 }));
    }

    #[test]
    fn reentering_a_level_replays_session_deltas() {
        let mut session = SessionContext::new(1);
        session
            .gate_states
            .insert("castle_gate".to_string(), GateState::Unlocked);
        session.opened_chests.insert("chest_l1_weapon".to_string());
        session.defeated_uniques.insert("enemy:gorg".to_string());
        let world = load(1, &mut session);

        let gate = world
            .obstacles
            .iter()
            .find(|obstacle| obstacle.id_matches("castle_gate"))
            .expect("gate");
        assert!(!gate.locked);
        assert!(!world
            .obstacles
            .iter()
            .any(|obstacle| obstacle.kind == ObstacleKind::Chest
                && obstacle.id_matches("chest_l1_weapon")));
        assert!(world.enemy_by_vn_id("enemy:gorg").is_none());
        assert_eq!(session.current_level, 1);
    }

    #[test]
    fn text_art_level_comes_from_the_legend() {
        let mut session = SessionContext::new(1);
        let world = load(2, &mut session);
        assert_eq!(world.bounds.tile_w, 16);
        let vorth = world.enemy_by_vn_id("enemy:vorth").expect("vorth");
        assert_eq!(vorth.kind, engine::map::EnemyKind::Featured);
        assert!(world.spawners.contains_key("l2_marsh_spawner"));
        assert_eq!(world.npcs[0].key, "ferryman");
        assert_eq!(world.companions.len(), 0);
    }
}
