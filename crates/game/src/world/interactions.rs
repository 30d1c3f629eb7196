use std::collections::{BTreeMap, BTreeSet};

use engine::map::EnemyKind;
use engine::ObstacleKind;
use tracing::debug;

use crate::session::{GateState, SessionContext};

use super::actors::{Enemy, EnemyId};
use super::factories::spawn_pickup;
use super::leveling::grant_xp_to_actor;
use super::World;

pub fn xp_reward(kind: EnemyKind) -> u32 {
    match kind {
        EnemyKind::Mook => 10,
        EnemyKind::Featured => 40,
        EnemyKind::Boss => 150,
    }
}

fn set_gate_locked(world: &mut World, id: &str, locked: bool) -> bool {
    let mut changed = false;
    for obstacle in world
        .obstacles
        .iter_mut()
        .filter(|obstacle| obstacle.kind == ObstacleKind::Gate && obstacle.id_matches(id))
    {
        obstacle.set_locked(locked);
        changed = true;
    }
    changed
}

pub fn unlock_gate(world: &mut World, session: &mut SessionContext, id: &str) -> bool {
    if !set_gate_locked(world, id, false) {
        return false;
    }
    session
        .gate_states
        .insert(id.to_string(), GateState::Unlocked);
    world.rebuild_obstacle_index();
    debug!(gate = id, "gate_unlocked");
    true
}

fn remove_obstacles_where(world: &mut World, keep: impl Fn(&engine::Obstacle) -> bool) -> usize {
    let before = world.obstacles.len();
    world.obstacles.retain(keep);
    before - world.obstacles.len()
}

/// Opens a chest: its obstacle goes away and any loot registered for it
/// lands on the ground where it stood.
pub fn open_chest(world: &mut World, session: &mut SessionContext, id: &str) -> bool {
    let Some(center) = world
        .obstacles
        .iter()
        .find(|obstacle| obstacle.kind == ObstacleKind::Chest && obstacle.id_matches(id))
        .map(|obstacle| obstacle.rect.center())
    else {
        return false;
    };
    remove_obstacles_where(world, |obstacle| {
        !(obstacle.kind == ObstacleKind::Chest && obstacle.id_matches(id))
    });
    let loot = world.chest_loot.remove(id).unwrap_or_default();
    for item in loot {
        spawn_pickup(world, item, center);
    }
    session.opened_chests.insert(id.to_string());
    world.rebuild_obstacle_index();
    debug!(chest = id, "chest_opened");
    true
}

pub fn break_breakable(world: &mut World, session: &mut SessionContext, id: &str) -> bool {
    let removed = remove_obstacles_where(world, |obstacle| {
        !(obstacle.kind.is_breakable() && obstacle.id_matches(id))
    });
    if removed == 0 {
        return false;
    }
    session.broken_breakables.insert(id.to_string());
    world.rebuild_obstacle_index();
    debug!(breakable = id, "breakable_broken");
    true
}

/// Removes a defeated enemy. Enemies with a narrative identity are
/// remembered so the save records them as defeated rather than unspawned.
pub fn defeat_enemy(world: &mut World, session: &mut SessionContext, id: EnemyId) -> Option<Enemy> {
    let enemy = world.enemies.remove(&id)?;
    if let Some(vn_id) = &enemy.vn_id {
        session.defeated_uniques.insert(vn_id.clone());
    }
    for spawner in world.spawners.values_mut() {
        spawner.alive.remove(&id);
    }
    let levels = grant_xp_to_actor(&mut world.player.progress, xp_reward(enemy.kind));
    debug!(
        enemy = %id,
        kind = ?enemy.kind,
        levels_gained = levels,
        "enemy_defeated"
    );
    Some(enemy)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeltaReport {
    pub gates_touched: usize,
    pub chests_removed: usize,
    pub breakables_removed: usize,
}

/// Replays obstacle deltas onto a freshly built baseline. Ids with no
/// matching obstacle are ignored; baseline obstacles nobody mentions stay.
pub fn apply_obstacle_deltas(
    world: &mut World,
    gate_states: &BTreeMap<String, GateState>,
    opened_chests: &BTreeSet<String>,
    broken_breakables: &BTreeSet<String>,
) -> DeltaReport {
    let mut report = DeltaReport::default();
    for (id, state) in gate_states {
        if set_gate_locked(world, id, *state == GateState::Locked) {
            report.gates_touched += 1;
        }
    }
    report.chests_removed = remove_obstacles_where(world, |obstacle| {
        !(obstacle.kind == ObstacleKind::Chest
            && obstacle
                .id
                .as_ref()
                .is_some_and(|id| opened_chests.contains(id)))
    });
    for id in opened_chests {
        world.chest_loot.remove(id);
    }
    report.breakables_removed = remove_obstacles_where(world, |obstacle| {
        !(obstacle.kind.is_breakable()
            && obstacle
                .id
                .as_ref()
                .is_some_and(|id| broken_breakables.contains(id)))
    });
    world.rebuild_obstacle_index();
    report
}

/// Reapplies the session's own deltas, used when a level is re-entered
/// during play without a save in flight.
pub fn apply_session_deltas(world: &mut World, session: &SessionContext) -> DeltaReport {
    let report = apply_obstacle_deltas(
        world,
        &session.gate_states,
        &session.opened_chests,
        &session.broken_breakables,
    );
    for vn_id in &session.defeated_uniques {
        world.remove_enemies_by_vn_id(vn_id);
    }
    report
}

#[cfg(test)]
mod tests {
    use engine::{Obstacle, Rect, Vec2, WorldBounds};

    use super::*;
    use crate::world::factories::{spawn_enemy, EnemySpec};
    use crate::world::Item;

    fn baseline() -> World {
        let mut world = World::new();
        world.reset_for_level(WorldBounds::new(16, 16));
        world.obstacles = vec![
            Obstacle::gate("g1", Rect::from_tiles(4, 4, 1, 1), true),
            Obstacle::gate("g2", Rect::from_tiles(6, 4, 1, 1), true),
            Obstacle::new(ObstacleKind::Chest, Rect::from_tiles(2, 2, 1, 1)).with_id("c1"),
            Obstacle::new(ObstacleKind::Chest, Rect::from_tiles(3, 2, 1, 1)).with_id("c_new"),
            Obstacle::new(ObstacleKind::Barrel, Rect::from_tiles(8, 8, 1, 1)).with_id("b1"),
        ];
        world
            .chest_loot
            .insert("c1".to_string(), vec![Item::stackable("coin", "Coin", 5, 99)]);
        world.rebuild_obstacle_index();
        world
    }

    fn gate<'a>(world: &'a World, id: &str) -> &'a Obstacle {
        world
            .obstacles
            .iter()
            .find(|obstacle| obstacle.id_matches(id))
            .expect("gate present")
    }

    #[test]
    fn gate_delta_unlocks_only_named_gates() {
        let mut world = baseline();
        let gates = BTreeMap::from([("g1".to_string(), GateState::Unlocked)]);
        let report = apply_obstacle_deltas(&mut world, &gates, &BTreeSet::new(), &BTreeSet::new());
        assert_eq!(report.gates_touched, 1);
        assert!(!gate(&world, "g1").locked);
        assert!(!gate(&world, "g1").blocks_attacks);
        assert!(gate(&world, "g2").locked);
        assert!(gate(&world, "g2").blocks_attacks);
    }

    #[test]
    fn baseline_content_missing_from_old_deltas_survives() {
        let mut world = baseline();
        let opened = BTreeSet::from(["c1".to_string(), "gone_chest".to_string()]);
        let report = apply_obstacle_deltas(&mut world, &BTreeMap::new(), &opened, &BTreeSet::new());
        assert_eq!(report.chests_removed, 1);
        assert!(world.obstacles.iter().any(|obstacle| obstacle.id_matches("c_new")));
        assert!(world.obstacles.iter().any(|obstacle| obstacle.id_matches("b1")));
        assert!(!world.obstacles.iter().any(|obstacle| obstacle.id_matches("c1")));
        assert!(world.chest_loot.is_empty());
    }

    #[test]
    fn opening_a_chest_drops_loot_and_records_the_delta() {
        let mut world = baseline();
        let mut session = SessionContext::default();
        assert!(open_chest(&mut world, &mut session, "c1"));
        assert!(!open_chest(&mut world, &mut session, "c1"));
        assert_eq!(world.ground_items.len(), 1);
        assert_eq!(world.ground_items[0].item.qty, 5);
        assert!(session.opened_chests.contains("c1"));

        assert!(break_breakable(&mut world, &mut session, "b1"));
        assert!(session.broken_breakables.contains("b1"));
        assert!(unlock_gate(&mut world, &mut session, "g2"));
        assert_eq!(session.gate_states["g2"], GateState::Unlocked);
        assert!(!unlock_gate(&mut world, &mut session, "nope"));
    }

    #[test]
    fn defeating_a_unique_records_it_and_grants_xp() {
        let mut world = baseline();
        let mut session = SessionContext::default();
        let id = spawn_enemy(
            &mut world,
            &mut session,
            EnemySpec {
                vn_id: Some("enemy:gorg".to_string()),
                ..EnemySpec::new(EnemyKind::Featured, Vec2::new(100.0, 100.0))
            },
        );
        let defeated = defeat_enemy(&mut world, &mut session, id).expect("enemy");
        assert_eq!(defeated.vn_id.as_deref(), Some("enemy:gorg"));
        assert!(session.defeated_uniques.contains("enemy:gorg"));
        assert_eq!(world.player.progress.xp, 40);
        assert!(defeat_enemy(&mut world, &mut session, id).is_none());
    }
}
