use std::collections::BTreeSet;

use engine::map::{EnemyKind, SpawnTemplate};
use engine::{Rect, Vec2};
use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use crate::session::SessionContext;

use super::factories::{spawn_enemy, EnemySpec};
use super::{EnemyId, World};

pub const MIN_SPAWN_INTERVAL_SEC: f32 = 0.1;
pub const MAX_SPAWN_INTERVAL_SEC: f32 = 86_400.0;
pub const DEFAULT_SPAWN_INTERVAL_SEC: f32 = 6.0;
pub const DEFAULT_PROXIMITY_RADIUS_PX: f32 = 320.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProximityMode {
    /// Fires only while the player is within the radius.
    Near,
    /// Fires only while the player is outside the radius.
    Far,
    #[default]
    Ignore,
}

impl ProximityMode {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "near" => Some(Self::Near),
            "far" => Some(Self::Far),
            "ignore" | "none" => Some(Self::Ignore),
            _ => None,
        }
    }
}

impl<'de> Deserialize<'de> for ProximityMode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw
            .as_deref()
            .and_then(Self::from_name)
            .unwrap_or_default())
    }
}

/// Stats every enemy a spawner produces starts from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EnemyTemplate {
    pub kind: Option<EnemyKind>,
    pub name: Option<String>,
    pub hp: Option<f32>,
    pub touch_damage: Option<f32>,
    pub speed: Option<f32>,
    pub guardian: bool,
    pub leashed: bool,
    pub aggro_radius: Option<f32>,
    pub leash_radius: Option<f32>,
    pub sprite_scale: Option<f32>,
}

impl EnemyTemplate {
    pub fn from_map_template(template: &SpawnTemplate) -> Self {
        Self {
            kind: template.kind.as_deref().and_then(EnemyKind::from_name),
            name: template.name.clone(),
            hp: template.hp,
            touch_damage: template.touch_damage,
            speed: template.speed,
            guardian: template.guardian.unwrap_or(false),
            leashed: template.leashed.unwrap_or(false),
            aggro_radius: template.aggro_radius,
            leash_radius: template.leash_radius,
            sprite_scale: template.sprite_scale,
        }
    }

    pub fn spec_at(&self, pos: Vec2) -> EnemySpec {
        EnemySpec {
            name: self.name.clone(),
            hp: self.hp,
            max_hp: self.hp,
            touch_damage: self.touch_damage,
            speed: self.speed,
            guardian: self.guardian,
            leashed: self.leashed,
            aggro_radius: self.aggro_radius,
            leash_radius: self.leash_radius,
            sprite_scale: self.sprite_scale,
            ..EnemySpec::new(self.kind.unwrap_or_default(), pos)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpawnerConfig {
    pub id: String,
    pub rect: Rect,
    pub template: EnemyTemplate,
    pub batch_size: u32,
    pub interval_sec: f32,
    pub jitter_sec: f32,
    pub max_total: Option<u32>,
    pub max_alive: Option<u32>,
    pub proximity: ProximityMode,
    pub radius_px: f32,
}

impl SpawnerConfig {
    pub fn new(id: impl Into<String>, rect: Rect) -> Self {
        Self {
            id: id.into(),
            rect,
            template: EnemyTemplate::default(),
            batch_size: 1,
            interval_sec: DEFAULT_SPAWN_INTERVAL_SEC,
            jitter_sec: 0.0,
            max_total: None,
            max_alive: None,
            proximity: ProximityMode::Ignore,
            radius_px: DEFAULT_PROXIMITY_RADIUS_PX,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Spawner {
    pub config: SpawnerConfig,
    /// Absolute session time of the next allowed fire.
    pub next_at_sec: f64,
    pub total_spawned: u32,
    pub alive: BTreeSet<EnemyId>,
    pub enabled: bool,
}

impl Spawner {
    pub fn id(&self) -> &str {
        &self.config.id
    }

    pub fn next_at_delay(&self, now_sec: f64) -> f32 {
        (self.next_at_sec - now_sec).max(0.0) as f32
    }

    fn gate_allows(&self, player: Vec2) -> bool {
        let radius = self.config.radius_px.max(1.0);
        let distance_sq = self.config.rect.center().distance_sq(player);
        match self.config.proximity {
            ProximityMode::Near => distance_sq <= radius * radius,
            ProximityMode::Far => distance_sq >= radius * radius,
            ProximityMode::Ignore => true,
        }
    }

    fn room(&self) -> u32 {
        let alive = self.alive.len() as u32;
        let alive_room = self
            .config
            .max_alive
            .map_or(u32::MAX, |cap| cap.saturating_sub(alive));
        let total_room = self
            .config
            .max_total
            .map_or(u32::MAX, |cap| cap.saturating_sub(self.total_spawned));
        alive_room.min(total_room)
    }
}

/// Schedules the next fire `interval ± jitter` from `now`, never sooner
/// than the minimum interval.
pub(crate) fn schedule_next(config: &SpawnerConfig, now_sec: f64, session: &mut SessionContext) -> f64 {
    let jitter = config.jitter_sec.max(0.0);
    // A span that overflows f32 cannot be sampled.
    let offset = if jitter > 0.0 && (jitter * 2.0).is_finite() {
        session.rng().gen_range(-jitter..=jitter)
    } else {
        0.0
    };
    let delay = (config.interval_sec + offset).max(MIN_SPAWN_INTERVAL_SEC);
    now_sec + f64::from(delay)
}

/// Runs every due spawner once. Returns how many enemies were spawned.
pub fn tick_spawners(world: &mut World, session: &mut SessionContext) -> usize {
    let now = session.now_sec;
    let player = world.player.pos;
    let ids = world.spawners.keys().cloned().collect::<Vec<_>>();
    let mut spawned_total = 0;

    for id in ids {
        let Some(mut spawner) = world.spawners.remove(&id) else {
            continue;
        };
        spawner
            .alive
            .retain(|enemy_id| world.enemies.get(enemy_id).is_some_and(|enemy| enemy.is_alive()));

        let due = spawner.enabled && now >= spawner.next_at_sec && spawner.gate_allows(player);
        if due {
            let batch = spawner.config.batch_size.max(1).min(spawner.room());
            for _ in 0..batch {
                let pos = random_point_in(spawner.config.rect, session);
                let spec = EnemySpec {
                    spawner_id: Some(spawner.config.id.clone()),
                    ..spawner.config.template.spec_at(pos)
                };
                let enemy_id = spawn_enemy(world, session, spec);
                spawner.alive.insert(enemy_id);
                spawner.total_spawned += 1;
            }
            spawner.next_at_sec = schedule_next(&spawner.config, now, session);
            if batch > 0 {
                debug!(
                    spawner = %spawner.config.id,
                    count = batch,
                    alive = spawner.alive.len(),
                    total = spawner.total_spawned,
                    "spawner_fired"
                );
            }
            spawned_total += batch as usize;
        }
        world.spawners.insert(id, spawner);
    }
    spawned_total
}

fn random_point_in(rect: Rect, session: &mut SessionContext) -> Vec2 {
    let rng = session.rng();
    let x = sample_span(rng, rect.x, rect.right());
    let y = sample_span(rng, rect.y, rect.bottom());
    Vec2::new(x, y)
}

/// Uniform in `[start, end)`, or `start` when that range is empty or too
/// wide to sample.
fn sample_span<R: Rng>(rng: &mut R, start: f32, end: f32) -> f32 {
    if end > start && (end - start).is_finite() {
        rng.gen_range(start..end)
    } else {
        start
    }
}
