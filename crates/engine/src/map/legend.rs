use std::collections::BTreeMap;

use serde::Deserialize;

use super::raster::rgb_to_hex;
use super::LegendError;

/// Stat overrides a map can attach to an enemy or spawner marker.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SpawnTemplate {
    pub kind: Option<String>,
    pub name: Option<String>,
    pub vn_id: Option<String>,
    pub hp: Option<f32>,
    pub touch_damage: Option<f32>,
    pub speed: Option<f32>,
    pub guardian: Option<bool>,
    pub leashed: Option<bool>,
    pub aggro_radius: Option<f32>,
    pub leash_radius: Option<f32>,
    pub sprite_scale: Option<f32>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SpawnerMarker {
    pub id: Option<String>,
    pub interval_sec: Option<f32>,
    pub jitter_sec: Option<f32>,
    pub batch_size: Option<u32>,
    pub max_total: Option<u32>,
    pub max_alive: Option<u32>,
    pub proximity: Option<String>,
    pub radius_px: Option<f32>,
    pub extent_tiles: Option<u32>,
    pub template: Option<SpawnTemplate>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegendEntry {
    #[serde(rename = "type")]
    pub tile_type: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub key_id: Option<String>,
    #[serde(default)]
    pub locked: Option<bool>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub radius: Option<f32>,
    #[serde(default)]
    pub template: Option<SpawnTemplate>,
    #[serde(default)]
    pub spawner: Option<SpawnerMarker>,
}

/// Color to semantic-type mapping keyed by lowercase `rrggbb`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Legend {
    entries: BTreeMap<String, LegendEntry>,
}

impl Legend {
    pub fn from_json_str(raw: &str) -> Result<Self, LegendError> {
        let parsed = serde_json::from_str::<BTreeMap<String, LegendEntry>>(raw)?;
        let mut legend = Self::default();
        for (key, entry) in parsed {
            legend.insert(&key, entry)?;
        }
        Ok(legend)
    }

    pub fn insert(&mut self, color: &str, entry: LegendEntry) -> Result<(), LegendError> {
        let key = normalize_color_key(color)?;
        self.entries.insert(key, entry);
        Ok(())
    }

    pub fn entry_for_rgb(&self, rgb: [u8; 3]) -> Option<&LegendEntry> {
        self.entries.get(&rgb_to_hex(rgb))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn normalize_color_key(raw: &str) -> Result<String, LegendError> {
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_prefix('#').unwrap_or(trimmed);
    if trimmed.len() != 6 || !trimmed.chars().all(|ch| ch.is_ascii_hexdigit()) {
        return Err(LegendError::InvalidColorKey {
            key: raw.to_string(),
        });
    }
    Ok(trimmed.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_lowercased_and_hash_prefix_tolerated() {
        let legend = Legend::from_json_str(
            r##"{
                "#FF0000": { "type": "wall" },
                "00ff00": { "type": "gate", "id": "castle_gate", "keyId": "key_castle" }
            }"##,
        )
        .expect("legend");
        assert_eq!(legend.len(), 2);
        assert_eq!(
            legend.entry_for_rgb([255, 0, 0]).map(|e| e.tile_type.as_str()),
            Some("wall")
        );
        let gate = legend.entry_for_rgb([0, 255, 0]).expect("gate");
        assert_eq!(gate.id.as_deref(), Some("castle_gate"));
        assert_eq!(gate.key_id.as_deref(), Some("key_castle"));
    }

    #[test]
    fn malformed_color_key_is_rejected() {
        let err = Legend::from_json_str(r#"{ "fff": { "type": "wall" } }"#).expect_err("bad key");
        assert!(matches!(err, LegendError::InvalidColorKey { .. }));
    }

    #[test]
    fn templates_parse_camel_case_fields() {
        let legend = Legend::from_json_str(
            r#"{ "880000": { "type": "guardian", "template": { "kind": "boss", "touchDamage": 5, "vnId": "enemy:vorth" } } }"#,
        )
        .expect("legend");
        let template = legend
            .entry_for_rgb([0x88, 0, 0])
            .and_then(|entry| entry.template.as_ref())
            .expect("template");
        assert_eq!(template.kind.as_deref(), Some("boss"));
        assert_eq!(template.touch_damage, Some(5.0));
        assert_eq!(template.vn_id.as_deref(), Some("enemy:vorth"));
    }
}
