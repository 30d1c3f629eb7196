use ember_game::save::{
    normalize_payload, EnemyRecord, SavePayload, SpawnerRecord, UniqueActorRecord, UniqueState,
    DYNAMIC_ENEMY_CAP,
};
use ember_game::session::{TorchState, MAX_PERSISTED_ENEMY_ID};
use engine::map::EnemyKind;
use engine::WorldBounds;
use proptest::prelude::*;

fn any_coord() -> impl Strategy<Value = f32> {
    prop_oneof![
        -5_000.0f32..5_000.0,
        Just(f32::NAN),
        Just(f32::INFINITY),
        Just(f32::NEG_INFINITY),
    ]
}

fn any_stat() -> impl Strategy<Value = Option<f32>> {
    prop_oneof![
        Just(None),
        (-50.0f32..500.0).prop_map(Some),
        Just(Some(f32::NAN)),
    ]
}

fn any_enemy_id() -> impl Strategy<Value = Option<u64>> {
    prop_oneof![
        Just(None),
        (0u64..1_000).prop_map(Some),
        (MAX_PERSISTED_ENEMY_ID..=u64::MAX).prop_map(Some),
        Just(Some(u64::MAX)),
    ]
}

fn any_extent() -> impl Strategy<Value = f32> {
    prop_oneof![
        -10.0f32..2_000.0,
        Just(f32::MAX),
        Just(f32::INFINITY),
        Just(f32::NAN),
    ]
}

fn any_kind() -> impl Strategy<Value = Option<EnemyKind>> {
    prop_oneof![
        Just(None),
        Just(Some(EnemyKind::Mook)),
        Just(Some(EnemyKind::Featured)),
        Just(Some(EnemyKind::Boss)),
    ]
}

fn any_enemy() -> impl Strategy<Value = EnemyRecord> {
    (
        any_enemy_id(),
        any_kind(),
        any_coord(),
        any_coord(),
        any_stat(),
        any_stat(),
        any_stat(),
        prop_oneof![Just(1.0f32), Just(0.0), Just(-2.0), Just(f32::NAN), 0.1f32..4.0],
    )
        .prop_map(|(id, kind, x, y, hp, max_hp, speed, sprite_scale)| EnemyRecord {
            id,
            kind,
            x,
            y,
            hp,
            max_hp,
            speed,
            sprite_scale,
            ..EnemyRecord::default()
        })
}

fn any_spawner() -> impl Strategy<Value = SpawnerRecord> {
    (
        prop_oneof![Just(String::new()), "[a-c]{1,2}"],
        any_coord(),
        any_coord(),
        any_extent(),
        any_extent(),
        0u32..4,
        prop_oneof![Just(0.0f32), Just(f32::NAN), Just(1.0e30f32), -1.0f32..20.0],
        prop_oneof![Just(3.0e38f32), Just(f32::INFINITY), Just(-1.0f32), 0.0f32..10.0],
        prop_oneof![Just(-3.0f32), Just(f32::INFINITY), 0.0f32..30.0],
        proptest::option::of(0u32..5),
        proptest::option::of(any::<u32>()),
        proptest::collection::vec(
            prop_oneof![0u64..20, MAX_PERSISTED_ENEMY_ID..=u64::MAX],
            0..6
        ),
    )
        .prop_map(
            |(
                id,
                x,
                y,
                w,
                h,
                batch_size,
                interval_sec,
                jitter_sec,
                next_at_delay,
                max_alive,
                max_total,
                alive_ids,
            )| {
                SpawnerRecord {
                    id,
                    x,
                    y,
                    w,
                    h,
                    batch_size,
                    interval_sec,
                    jitter_sec,
                    next_at_delay,
                    max_alive,
                    max_total,
                    alive_ids,
                    ..SpawnerRecord::default()
                }
            },
        )
}

fn any_unique() -> impl Strategy<Value = UniqueActorRecord> {
    (
        prop_oneof![
            Just(UniqueState::Alive),
            Just(UniqueState::Defeated),
            Just(UniqueState::Unspawned),
        ],
        proptest::option::of(any_enemy()),
    )
        .prop_map(|(state, actor)| UniqueActorRecord { state, actor })
}

fn any_payload() -> impl Strategy<Value = SavePayload> {
    (
        0u32..5,
        any_coord(),
        any_coord(),
        -20.0f32..200.0,
        proptest::collection::vec("[a-d]{0,2}", 0..8),
        proptest::collection::btree_map("enemy:[a-c]", any_unique(), 0..3),
        proptest::collection::vec(any_enemy(), 0..(DYNAMIC_ENEMY_CAP + 20)),
        proptest::collection::vec(any_spawner(), 0..4),
        proptest::option::of((proptest::option::of(0u32..4), -10.0f64..10.0)),
    )
        .prop_map(
            |(level, px, py, hp, chests, uniques, dynamic, spawners, torch)| {
                let mut payload = SavePayload {
                    current_level: level,
                    opened_chests: chests,
                    unique_actors: uniques,
                    dynamic_enemies: dynamic,
                    spawners,
                    torch: torch.map(|(bearer_index, burn_ms)| TorchState {
                        bearer_index,
                        burn_ms,
                    }),
                    ..SavePayload::default()
                };
                payload.player.x = px;
                payload.player.y = py;
                payload.player.hp = hp;
                payload
            },
        )
}

fn bounds() -> WorldBounds {
    WorldBounds::new(40, 30)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn normalization_is_idempotent(mut payload in any_payload()) {
        normalize_payload(&mut payload, bounds());
        let mut again = payload.clone();
        normalize_payload(&mut again, bounds());
        prop_assert_eq!(again, payload);
    }

    #[test]
    fn normalized_payload_is_in_bounds(mut payload in any_payload()) {
        normalize_payload(&mut payload, bounds());
        let (max_x, max_y) = (bounds().pixel_w() - 1.0, bounds().pixel_h() - 1.0);
        let in_bounds = |x: f32, y: f32| (0.0..=max_x).contains(&x) && (0.0..=max_y).contains(&y);

        prop_assert!(payload.current_level >= 1);
        prop_assert!(in_bounds(payload.player.x, payload.player.y));
        prop_assert!(payload.player.hp >= 0.0);
        prop_assert!(payload.dynamic_enemies.len() <= DYNAMIC_ENEMY_CAP);
        for record in &payload.dynamic_enemies {
            prop_assert!(in_bounds(record.x, record.y));
            prop_assert!(record.id.map_or(true, |id| id < MAX_PERSISTED_ENEMY_ID));
            prop_assert!(record.hp.is_some_and(|hp| hp >= 0.0));
            prop_assert!(record.sprite_scale > 0.0);
            prop_assert!(record.kind.is_some());
        }
        for entry in payload.unique_actors.values() {
            prop_assert_eq!(entry.actor.is_some(), entry.state == UniqueState::Alive);
        }
        for spawner in &payload.spawners {
            prop_assert!(!spawner.id.is_empty());
            prop_assert!(spawner.interval_sec >= 0.1);
            prop_assert!(spawner.batch_size >= 1);
            prop_assert!(spawner.radius_px >= 1.0);
            prop_assert!(spawner.next_at_delay >= 0.0 && spawner.next_at_delay.is_finite());
            prop_assert!(spawner.w >= 1.0 && spawner.x + spawner.w <= bounds().pixel_w() + 1e-3);
            prop_assert!(spawner.h >= 1.0 && spawner.y + spawner.h <= bounds().pixel_h() + 1e-3);
            prop_assert!(spawner.jitter_sec >= 0.0 && spawner.jitter_sec <= spawner.interval_sec);
            prop_assert!((2.0 * spawner.jitter_sec).is_finite());
            prop_assert!(spawner.alive_ids.iter().all(|id| *id < MAX_PERSISTED_ENEMY_ID));
        }
        let chests = &payload.opened_chests;
        prop_assert!(chests.windows(2).all(|pair| pair[0] < pair[1]));
        prop_assert!(payload.loadouts.is_some() && payload.torch.is_some());
    }
}
