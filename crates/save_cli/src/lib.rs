use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use engine::{FileSaveStore, SaveTransport, WorldBounds};
use game::save::{normalize_payload, parse_payload, SavePayload, UniqueState};

pub const DEFAULT_STORE_DIR: &str = "cache/saves";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommonOptions {
    pub store_dir: PathBuf,
}

impl Default for CommonOptions {
    fn default() -> Self {
        Self {
            store_dir: PathBuf::from(DEFAULT_STORE_DIR),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandKind {
    Normalize { path: PathBuf, out: Option<PathBuf> },
    Inspect { path: PathBuf },
    Get { user: String, slot: String },
    Put { user: String, slot: String, path: PathBuf },
}

pub fn run<W: Write>(kind: CommandKind, opts: &CommonOptions, stdout: &mut W) -> Result<(), String> {
    match kind {
        CommandKind::Normalize { path, out } => {
            let json = to_json(&load_normalized(&path)?)?;
            match out {
                Some(out) => fs::write(&out, format!("{json}\n"))
                    .map_err(|err| format!("failed to write {}: {err}", out.display())),
                None => emit(stdout, &json),
            }
        }
        CommandKind::Inspect { path } => {
            let payload = load_normalized(&path)?;
            for line in summary_lines(&payload) {
                emit(stdout, &line)?;
            }
            Ok(())
        }
        CommandKind::Get { user, slot } => {
            let store = FileSaveStore::new(opts.store_dir.clone());
            match store.get(&user, &slot).map_err(|err| err.to_string())? {
                Some(payload) => emit(stdout, payload.trim_end()),
                None => Err(format!("slot {user}/{slot} not found")),
            }
        }
        CommandKind::Put { user, slot, path } => {
            let json = to_json(&load_normalized(&path)?)?;
            let mut store = FileSaveStore::new(opts.store_dir.clone());
            store
                .put(&user, &slot, &json)
                .map_err(|err| err.to_string())?;
            emit(stdout, &format!("ok: {user}/{slot} ({} bytes)", json.len()))
        }
    }
}

/// The payload's own world dimensions, or the default map size when it has
/// none.
pub fn bounds_for(payload: &SavePayload) -> WorldBounds {
    if payload.world.tile_w == 0 || payload.world.tile_h == 0 {
        WorldBounds::default()
    } else {
        payload.world
    }
}

pub fn load_normalized(path: &Path) -> Result<SavePayload, String> {
    let raw = fs::read_to_string(path)
        .map_err(|err| format!("failed to read {}: {err}", path.display()))?;
    let mut payload = parse_payload(&raw).map_err(|err| err.to_string())?;
    let bounds = bounds_for(&payload);
    normalize_payload(&mut payload, bounds);
    Ok(payload)
}

pub fn summary_lines(payload: &SavePayload) -> Vec<String> {
    let count = |state: UniqueState| {
        payload
            .unique_actors
            .values()
            .filter(|entry| entry.state == state)
            .count()
    };
    vec![
        format!(
            "schema: {} v{} at {}",
            payload.schema, payload.version, payload.at
        ),
        format!(
            "level: {} ({}x{} tiles)",
            payload.current_level, payload.world.tile_w, payload.world.tile_h
        ),
        format!(
            "player: ({:.1}, {:.1}) hp {:.1}/{:.1} level {}",
            payload.player.x,
            payload.player.y,
            payload.player.hp,
            payload.player.max_hp,
            payload.player.level
        ),
        format!(
            "uniques: {} alive, {} defeated, {} unspawned",
            count(UniqueState::Alive),
            count(UniqueState::Defeated),
            count(UniqueState::Unspawned)
        ),
        format!("dynamic enemies: {}", payload.dynamic_enemies.len()),
        format!("spawners: {}", payload.spawners.len()),
        format!(
            "deltas: {} gates, {} chests opened, {} breakables broken",
            payload.gate_states.len(),
            payload.opened_chests.len(),
            payload.broken_breakables.len()
        ),
    ]
}

fn to_json(payload: &SavePayload) -> Result<String, String> {
    serde_json::to_string_pretty(payload).map_err(|err| format!("failed to encode payload: {err}"))
}

fn emit<W: Write>(stdout: &mut W, line: &str) -> Result<(), String> {
    writeln!(stdout, "{line}").map_err(|err| format!("failed to write output: {err}"))
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    const HAND_EDITED: &str = r#"{
        "currentLevel": 0,
        "world": { "tileW": 10, "tileH": 10 },
        "player": { "x": -40, "y": 9000, "hp": -1 },
        "openedChests": ["c2", "c1", "c2"],
        "uniqueActors": { "enemy:gorg": { "state": "defeated", "x": 4 } }
    }"#;

    fn write_save(dir: &TempDir, name: &str, body: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, body).expect("write save");
        path
    }

    #[test]
    fn normalize_writes_clamped_payload() {
        let temp = TempDir::new().expect("temp");
        let input = write_save(&temp, "in.json", HAND_EDITED);
        let out = temp.path().join("out.json");
        let mut stdout = Vec::new();
        run(
            CommandKind::Normalize {
                path: input,
                out: Some(out.clone()),
            },
            &CommonOptions::default(),
            &mut stdout,
        )
        .expect("normalize");
        assert!(stdout.is_empty());

        let payload = parse_payload(&fs::read_to_string(out).expect("read")).expect("parse");
        assert_eq!(payload.current_level, 1);
        assert_eq!((payload.player.x, payload.player.y), (0.0, 319.0));
        assert_eq!(payload.player.hp, 0.0);
        assert_eq!(payload.opened_chests, vec!["c1".to_string(), "c2".to_string()]);
        assert!(payload.unique_actors["enemy:gorg"].actor.is_none());
    }

    #[test]
    fn inspect_summarizes() {
        let temp = TempDir::new().expect("temp");
        let input = write_save(&temp, "in.json", HAND_EDITED);
        let mut stdout = Vec::new();
        run(
            CommandKind::Inspect { path: input },
            &CommonOptions::default(),
            &mut stdout,
        )
        .expect("inspect");
        let text = String::from_utf8(stdout).expect("utf8");
        assert!(text.contains("level: 1 (10x10 tiles)"));
        assert!(text.contains("uniques: 0 alive, 1 defeated, 0 unspawned"));
    }

    #[test]
    fn put_then_get_round_trips_through_the_store() {
        let temp = TempDir::new().expect("temp");
        let input = write_save(&temp, "in.json", HAND_EDITED);
        let opts = CommonOptions {
            store_dir: temp.path().join("store"),
        };
        let mut stdout = Vec::new();
        run(
            CommandKind::Put {
                user: "tester".to_string(),
                slot: "slot1".to_string(),
                path: input,
            },
            &opts,
            &mut stdout,
        )
        .expect("put");

        let mut fetched = Vec::new();
        run(
            CommandKind::Get {
                user: "tester".to_string(),
                slot: "slot1".to_string(),
            },
            &opts,
            &mut fetched,
        )
        .expect("get");
        let payload = parse_payload(&String::from_utf8(fetched).expect("utf8")).expect("parse");
        assert_eq!(payload.opened_chests.len(), 2);

        let err = run(
            CommandKind::Get {
                user: "tester".to_string(),
                slot: "empty".to_string(),
            },
            &opts,
            &mut Vec::new(),
        )
        .expect_err("missing slot");
        assert!(err.contains("not found"));
    }

    #[test]
    fn invalid_json_is_rejected_with_its_path() {
        let temp = TempDir::new().expect("temp");
        let input = write_save(&temp, "bad.json", r#"{ "player": { "level": "ten" } }"#);
        let err = run(
            CommandKind::Inspect { path: input },
            &CommonOptions::default(),
            &mut Vec::new(),
        )
        .expect_err("bad level");
        assert!(err.contains("player.level"), "{err}");
    }
}
