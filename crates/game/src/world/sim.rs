use engine::{Facing, Rect, Vec2};

use crate::session::SessionContext;

use super::actors::{Enemy, EnemyId};
use super::spawners::tick_spawners;
use super::World;

pub const MAX_STEP_SEC: f32 = 0.25;
const HOME_ARRIVAL_PX: f32 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Intent {
    Hold,
    Chase,
    ReturnHome,
}

fn decide(world: &World, enemy: &Enemy) -> Intent {
    let player = world.player.pos;
    let to_player_sq = enemy.pos.distance_sq(player);
    let aggro_sq = enemy.aggro_radius * enemy.aggro_radius;

    if enemy.leashed && enemy.home.distance_sq(enemy.pos) > enemy.leash_radius * enemy.leash_radius {
        return Intent::ReturnHome;
    }
    if enemy.returning && enemy.home.distance_sq(enemy.pos) > HOME_ARRIVAL_PX * HOME_ARRIVAL_PX {
        return Intent::ReturnHome;
    }
    if !enemy.guardian && !enemy.leashed {
        return Intent::Chase;
    }

    let engaged =
        to_player_sq <= aggro_sq && (!enemy.guardian || world.has_line_of_sight(enemy.pos, player));
    if engaged {
        Intent::Chase
    } else if enemy.home.distance_sq(enemy.pos) > HOME_ARRIVAL_PX * HOME_ARRIVAL_PX {
        Intent::ReturnHome
    } else {
        Intent::Hold
    }
}

fn steering(world: &World, enemy: &Enemy, intent: Intent) -> Option<Vec2> {
    match intent {
        Intent::Hold => None,
        Intent::ReturnHome => Vec2::new(enemy.home.x - enemy.pos.x, enemy.home.y - enemy.pos.y)
            .normalized(),
        Intent::Chase => world.flow.sample_dir_at(enemy.pos),
    }
}

/// Moves one axis at a time so an enemy slides along walls instead of
/// sticking to them.
fn slide(world: &World, enemy: &Enemy, delta: Vec2) -> Vec2 {
    let mut pos = enemy.pos;
    let try_x = Vec2::new(pos.x + delta.x, pos.y);
    if !world.is_blocked(Rect::centered_at(try_x, enemy.w, enemy.h)) {
        pos = try_x;
    }
    let try_y = Vec2::new(pos.x, pos.y + delta.y);
    if !world.is_blocked(Rect::centered_at(try_y, enemy.w, enemy.h)) {
        pos = try_y;
    }
    world.clamp_to_bounds(pos)
}

fn step_enemy(world: &mut World, id: EnemyId, dt: f32) {
    let Some(enemy) = world.enemies.get(&id) else {
        return;
    };
    if !enemy.is_alive() {
        return;
    }
    let intent = decide(world, enemy);
    let direction = steering(world, enemy, intent);
    let next = direction.map(|dir| {
        let delta = Vec2::new(dir.x * enemy.speed * dt, dir.y * enemy.speed * dt);
        (slide(world, enemy, delta), dir)
    });

    let Some(enemy) = world.enemies.get_mut(&id) else {
        return;
    };
    enemy.returning = intent == Intent::ReturnHome;
    if let Some((pos, dir)) = next {
        enemy.pos = pos;
        enemy.dir = Facing::from_vector(dir).unwrap_or(enemy.dir);
        enemy.anim_phase = (enemy.anim_phase + dt * 8.0) % 4.0;
    }
}

/// Advances the world by `dt` seconds. Returns false when the session is
/// paused and nothing moved.
pub fn step_simulation(world: &mut World, session: &mut SessionContext, dt: f32) -> bool {
    if session.paused {
        return false;
    }
    let dt = if dt.is_finite() { dt.clamp(0.0, MAX_STEP_SEC) } else { 0.0 };
    session.now_sec += f64::from(dt);
    if session.torch.bearer_index.is_some() {
        session.torch.burn_ms += f64::from(dt) * 1000.0;
    }

    let now_ms = session.now_ms();
    world
        .flow
        .refresh(world.bounds, &world.obstacles, world.player.pos, now_ms);

    let ids = world.enemies.keys().copied().collect::<Vec<_>>();
    for id in ids {
        step_enemy(world, id, dt);
    }
    tick_spawners(world, session);
    true
}

#[cfg(test)]
mod tests {
    use engine::map::EnemyKind;
    use engine::{Obstacle, ObstacleKind, WorldBounds, TILE_SIZE};

    use super::*;
    use crate::world::factories::{spawn_enemy, EnemySpec};

    fn open_world() -> (World, SessionContext) {
        let mut world = World::new();
        world.reset_for_level(WorldBounds::new(20, 20));
        world.player.pos = Vec2::new(2.5 * TILE_SIZE, 2.5 * TILE_SIZE);
        world.rebuild_obstacle_index();
        (world, SessionContext::new(5))
    }

    #[test]
    fn paused_session_does_not_advance() {
        let (mut world, mut session) = open_world();
        session.paused = true;
        assert!(!step_simulation(&mut world, &mut session, 0.1));
        assert_eq!(session.now_sec, 0.0);
    }

    #[test]
    fn chasers_close_distance_along_the_flow_field() {
        let (mut world, mut session) = open_world();
        let id = spawn_enemy(
            &mut world,
            &mut session,
            EnemySpec::new(EnemyKind::Mook, Vec2::new(10.5 * TILE_SIZE, 2.5 * TILE_SIZE)),
        );
        let start = world.enemies[&id].pos.distance_sq(world.player.pos);
        for _ in 0..10 {
            step_simulation(&mut world, &mut session, 0.1);
        }
        let end = world.enemies[&id].pos.distance_sq(world.player.pos);
        assert!(end < start);
        assert_eq!(world.enemies[&id].dir, Facing::Left);
    }

    #[test]
    fn guardian_without_sight_holds_its_post() {
        let (mut world, mut session) = open_world();
        world.obstacles.push(Obstacle::new(
            ObstacleKind::Wall,
            Rect::from_tiles(5, 0, 1, 20),
        ));
        world.rebuild_obstacle_index();
        let home = Vec2::new(7.5 * TILE_SIZE, 2.5 * TILE_SIZE);
        let id = spawn_enemy(
            &mut world,
            &mut session,
            EnemySpec {
                guardian: true,
                aggro_radius: Some(10.0 * TILE_SIZE),
                ..EnemySpec::new(EnemyKind::Featured, home)
            },
        );
        for _ in 0..5 {
            step_simulation(&mut world, &mut session, 0.1);
        }
        assert_eq!(world.enemies[&id].pos, home);
    }

    #[test]
    fn leashed_enemy_turns_back_past_its_leash() {
        let (mut world, mut session) = open_world();
        let home = Vec2::new(12.5 * TILE_SIZE, 2.5 * TILE_SIZE);
        let id = spawn_enemy(
            &mut world,
            &mut session,
            EnemySpec {
                leashed: true,
                home: Some(home),
                leash_radius: Some(2.0 * TILE_SIZE),
                ..EnemySpec::new(EnemyKind::Mook, Vec2::new(8.5 * TILE_SIZE, 2.5 * TILE_SIZE))
            },
        );
        step_simulation(&mut world, &mut session, 0.1);
        let enemy = &world.enemies[&id];
        assert!(enemy.returning);
        assert!(enemy.pos.x > 8.5 * TILE_SIZE);
    }
}
