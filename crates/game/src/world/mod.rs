use std::collections::BTreeMap;

use engine::spatial::DEFAULT_CELL_SIZE;
use engine::{
    query_obstacles_aabb, query_obstacles_segment, FlowField, Obstacle, ObstacleIndex, Rect,
    Vec2, WorldBounds,
};

mod actors;
pub mod factories;
pub mod interactions;
pub mod inventory;
pub mod leveling;
pub mod map_apply;
pub mod sim;
pub mod spawners;

pub use actors::{
    Companion, Enemy, EnemyId, EquipSlot, GroundItem, Inventory, Item, Light, Npc, Player,
    Progress, COMPANION_SIZE, NPC_SIZE, PLAYER_SIZE,
};
pub use spawners::{EnemyTemplate, ProximityMode, Spawner, SpawnerConfig};

/// Step used when sampling a segment for line-of-sight checks.
const LOS_SAMPLE_STEP: f32 = 8.0;

/// Canonical in-memory world. Enemies and spawners are keyed by id so
/// removal never shifts anyone else's identity.
#[derive(Debug, Clone, Default)]
pub struct World {
    pub bounds: WorldBounds,
    pub player: Player,
    pub companions: Vec<Companion>,
    pub npcs: Vec<Npc>,
    pub enemies: BTreeMap<EnemyId, Enemy>,
    pub obstacles: Vec<Obstacle>,
    pub obstacle_index: Option<ObstacleIndex>,
    pub flow: FlowField,
    pub ground_items: Vec<GroundItem>,
    pub spawners: BTreeMap<String, Spawner>,
    pub lights: Vec<Light>,
    pub chest_loot: BTreeMap<String, Vec<Item>>,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops everything a level loader owns. The player and companions
    /// survive and are repositioned by the loader.
    pub fn reset_for_level(&mut self, bounds: WorldBounds) {
        self.bounds = bounds;
        self.npcs.clear();
        self.enemies.clear();
        self.obstacles.clear();
        self.obstacle_index = None;
        self.ground_items.clear();
        self.spawners.clear();
        self.lights.clear();
        self.chest_loot.clear();
        self.flow = FlowField::default();
    }

    /// Must run after any change to obstacle geometry or blocking state.
    pub fn rebuild_obstacle_index(&mut self) {
        self.obstacle_index = Some(ObstacleIndex::rebuild(&self.obstacles, DEFAULT_CELL_SIZE));
        self.flow.mark_dirty();
    }

    pub fn obstacles_near(&self, rect: Rect) -> Vec<usize> {
        query_obstacles_aabb(self.obstacle_index.as_ref(), &self.obstacles, rect)
    }

    pub fn is_blocked(&self, rect: Rect) -> bool {
        self.obstacles_near(rect).into_iter().any(|index| {
            let obstacle = &self.obstacles[index];
            obstacle.blocks_movement() && obstacle.rect.intersects(&rect)
        })
    }

    /// Coarse line-of-sight: candidates come from the padded segment query,
    /// then the segment is sampled against attack-blocking obstacles.
    pub fn has_line_of_sight(&self, from: Vec2, to: Vec2) -> bool {
        let candidates = query_obstacles_segment(
            self.obstacle_index.as_ref(),
            &self.obstacles,
            from,
            to,
            engine::spatial::SEGMENT_QUERY_PADDING,
        );
        let blockers = candidates
            .into_iter()
            .map(|index| &self.obstacles[index])
            .filter(|obstacle| obstacle.blocks_attacks)
            .collect::<Vec<_>>();
        if blockers.is_empty() {
            return true;
        }

        let length = from.distance_sq(to).sqrt();
        let steps = (length / LOS_SAMPLE_STEP).ceil().max(1.0) as u32;
        (0..=steps).all(|step| {
            let t = step as f32 / steps as f32;
            let point = Vec2::new(from.x + (to.x - from.x) * t, from.y + (to.y - from.y) * t);
            !blockers
                .iter()
                .any(|obstacle| obstacle.rect.contains_point(point))
        })
    }

    pub fn enemy_by_vn_id(&self, vn_id: &str) -> Option<&Enemy> {
        self.enemies
            .values()
            .find(|enemy| enemy.vn_id.as_deref() == Some(vn_id))
    }

    pub fn enemy_id_by_vn_id(&self, vn_id: &str) -> Option<EnemyId> {
        self.enemy_by_vn_id(vn_id).map(|enemy| enemy.id)
    }

    /// Removes every live instance carrying `vn_id`. Returns how many went.
    pub fn remove_enemies_by_vn_id(&mut self, vn_id: &str) -> usize {
        let before = self.enemies.len();
        self.enemies
            .retain(|_, enemy| enemy.vn_id.as_deref() != Some(vn_id));
        before - self.enemies.len()
    }

    pub fn clamp_to_bounds(&self, pos: Vec2) -> Vec2 {
        let (x, y) = self.bounds.clamp_point(pos.x, pos.y);
        Vec2::new(x, y)
    }
}

#[cfg(test)]
mod tests {
    use engine::{ObstacleKind, TILE_SIZE};

    use super::*;

    fn walled_world() -> World {
        let mut world = World::new();
        world.reset_for_level(WorldBounds::new(10, 10));
        world
            .obstacles
            .push(Obstacle::new(ObstacleKind::Wall, Rect::from_tiles(5, 0, 1, 10)));
        world.obstacles.push(
            Obstacle::gate("g1", Rect::from_tiles(2, 2, 1, 1), false),
        );
        world.rebuild_obstacle_index();
        world
    }

    #[test]
    fn walls_block_movement_and_sight() {
        let world = walled_world();
        let wall_probe = Rect::centered_at(Vec2::new(5.5 * TILE_SIZE, 3.0 * TILE_SIZE), 8.0, 8.0);
        assert!(world.is_blocked(wall_probe));
        assert!(!world.is_blocked(Rect::centered_at(Vec2::new(40.0, 40.0), 8.0, 8.0)));

        let left = Vec2::new(1.0 * TILE_SIZE, 6.0 * TILE_SIZE);
        let right = Vec2::new(8.0 * TILE_SIZE, 6.0 * TILE_SIZE);
        assert!(!world.has_line_of_sight(left, right));
        let below = Vec2::new(1.0 * TILE_SIZE, 8.0 * TILE_SIZE);
        assert!(world.has_line_of_sight(left, below));
    }

    #[test]
    fn unlocked_gate_neither_blocks_movement_nor_sight() {
        let world = walled_world();
        let gate_center = Vec2::new(2.5 * TILE_SIZE, 2.5 * TILE_SIZE);
        assert!(!world.is_blocked(Rect::centered_at(gate_center, 8.0, 8.0)));
        assert!(world.has_line_of_sight(
            Vec2::new(0.5 * TILE_SIZE, 2.5 * TILE_SIZE),
            Vec2::new(4.5 * TILE_SIZE, 2.5 * TILE_SIZE)
        ));
    }

    #[test]
    fn missing_index_falls_back_to_full_scan() {
        let mut world = walled_world();
        world.obstacle_index = None;
        let wall_probe = Rect::centered_at(Vec2::new(5.5 * TILE_SIZE, 3.0 * TILE_SIZE), 8.0, 8.0);
        assert!(world.is_blocked(wall_probe));
    }
}
