use thiserror::Error;

mod ingest;
mod legend;
mod merge;
mod raster;
mod spawns;
mod tiles;

pub use ingest::{ingest_map, IngestOptions, MapIngestResult, DEFAULT_LIGHT_RADIUS};
pub use legend::{Legend, LegendEntry, SpawnTemplate, SpawnerMarker};
pub use merge::{is_mergeable, merge_vertical_runs, pack_rectangles, row_runs, Run, TileRect};
pub use raster::{rgb_to_hex, RgbRaster};
pub use spawns::{
    EnemyKind, EnemyMarker, EnemySpawn, HazardSpawn, LightSpawn, NpcSpawn, PropSpawn,
    SpawnPoints, SpawnerSpawn,
};
pub use tiles::{MapTile, TileGrid};

#[derive(Debug, Error)]
pub enum MapError {
    #[error("map raster is empty ({width}x{height})")]
    EmptyRaster { width: u32, height: u32 },
    #[error("map raster has {actual} pixels, expected {expected}")]
    PixelCountMismatch { expected: usize, actual: usize },
    #[error("text map row {row} has width {actual}, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: u32,
        actual: u32,
    },
    #[error("text map glyph {glyph:?} at ({x}, {y}) has no palette color")]
    UnknownGlyph { glyph: char, x: usize, y: usize },
    #[error("failed to read map image: {source}")]
    Io {
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode map image: {0}")]
    Decode(String),
    #[error(transparent)]
    Legend(#[from] LegendError),
}

#[derive(Debug, Error)]
pub enum LegendError {
    #[error("legend is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("legend color key {key:?} is not a 6-digit hex color")]
    InvalidColorKey { key: String },
}
