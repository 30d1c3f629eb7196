use std::collections::BTreeMap;

use crate::geom::Rect;
use crate::obstacle::{Obstacle, ObstacleKind};

use super::tiles::TileGrid;

/// Horizontal run of identical tiles, in tile units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Run {
    pub kind: ObstacleKind,
    pub x: u32,
    pub y: u32,
    pub len: u32,
}

/// Rectangle of identical tiles, in tile units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TileRect {
    pub kind: ObstacleKind,
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl TileRect {
    pub fn into_obstacle(self) -> Obstacle {
        Obstacle::new(self.kind, Rect::from_tiles(self.x, self.y, self.w, self.h))
    }
}

/// Per-tile props keep their own identity and never merge.
pub fn is_mergeable(kind: ObstacleKind) -> bool {
    !matches!(
        kind,
        ObstacleKind::Gate
            | ObstacleKind::Chest
            | ObstacleKind::Barrel
            | ObstacleKind::Crate
            | ObstacleKind::TorchNode
    )
}

/// Maximal runs of identical mergeable kinds on `row` that `accept` admits.
pub fn row_runs(grid: &TileGrid, row: u32, accept: impl Fn(ObstacleKind) -> bool) -> Vec<Run> {
    let mut runs = Vec::new();
    let mut current: Option<Run> = None;
    for x in 0..grid.width() {
        let kind = grid
            .obstacle_kind_at(x, row)
            .filter(|kind| is_mergeable(*kind) && accept(*kind));
        match (current.as_mut(), kind) {
            (Some(run), Some(kind)) if run.kind == kind => {
                run.len += 1;
            }
            (_, kind) => {
                if let Some(run) = current.take() {
                    runs.push(run);
                }
                current = kind.map(|kind| Run {
                    kind,
                    x,
                    y: row,
                    len: 1,
                });
            }
        }
    }
    if let Some(run) = current {
        runs.push(run);
    }
    runs
}

/// Stacks runs with the same kind, x and width that sit on consecutive rows.
pub fn merge_vertical_runs(runs: &[Run]) -> Vec<TileRect> {
    let mut columns = BTreeMap::<(ObstacleKind, u32, u32), Vec<u32>>::new();
    for run in runs {
        columns
            .entry((run.kind, run.x, run.len))
            .or_default()
            .push(run.y);
    }

    let mut rects = Vec::new();
    for ((kind, x, w), mut rows) in columns {
        rows.sort_unstable();
        rows.dedup();
        let mut open: Option<TileRect> = None;
        for y in rows {
            match open.as_mut() {
                Some(rect) if rect.y + rect.h == y => rect.h += 1,
                _ => {
                    if let Some(rect) = open.take() {
                        rects.push(rect);
                    }
                    open = Some(TileRect { kind, x, y, w, h: 1 });
                }
            }
        }
        if let Some(rect) = open {
            rects.push(rect);
        }
    }
    rects.sort_by_key(|rect| (rect.y, rect.x, rect.kind));
    rects
}

/// Greedy maximal-rectangle decomposition of every `kind` tile: scan unclaimed
/// cells row by row, grow right as far as possible, then grow down while the
/// whole span stays available.
pub fn pack_rectangles(grid: &TileGrid, kind: ObstacleKind) -> Vec<TileRect> {
    let width = grid.width();
    let height = grid.height();
    let mut claimed = vec![false; width as usize * height as usize];
    let index = |x: u32, y: u32| y as usize * width as usize + x as usize;
    let available = |claimed: &[bool], x: u32, y: u32| {
        grid.obstacle_kind_at(x, y) == Some(kind) && !claimed[index(x, y)]
    };

    let mut rects = Vec::new();
    for y in 0..height {
        for x in 0..width {
            if !available(&claimed, x, y) {
                continue;
            }
            let mut w = 1;
            while x + w < width && available(&claimed, x + w, y) {
                w += 1;
            }
            let mut h = 1;
            while y + h < height && (x..x + w).all(|cx| available(&claimed, cx, y + h)) {
                h += 1;
            }
            for cy in y..y + h {
                for cx in x..x + w {
                    claimed[index(cx, cy)] = true;
                }
            }
            rects.push(TileRect { kind, x, y, w, h });
        }
    }
    rects
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::tiles::MapTile;

    fn grid_from(rows: &[&str]) -> TileGrid {
        let height = rows.len() as u32;
        let width = rows[0].len() as u32;
        let mut grid = TileGrid::filled(width, height, MapTile::Floor);
        for (y, row) in rows.iter().enumerate() {
            for (x, glyph) in row.chars().enumerate() {
                let tile = match glyph {
                    '#' => MapTile::Obstacle(ObstacleKind::Wall),
                    '~' => MapTile::Obstacle(ObstacleKind::Water),
                    'G' => MapTile::Obstacle(ObstacleKind::Gate),
                    _ => MapTile::Floor,
                };
                grid.set(x as u32, y as u32, tile);
            }
        }
        grid
    }

    #[test]
    fn row_runs_split_on_kind_change_and_skip_props() {
        let grid = grid_from(&["##~~G#"]);
        let runs = row_runs(&grid, 0, |_| true);
        assert_eq!(
            runs,
            vec![
                Run { kind: ObstacleKind::Wall, x: 0, y: 0, len: 2 },
                Run { kind: ObstacleKind::Water, x: 2, y: 0, len: 2 },
                Run { kind: ObstacleKind::Wall, x: 5, y: 0, len: 1 },
            ]
        );
    }

    #[test]
    fn vertical_merge_only_joins_matching_width_on_adjacent_rows() {
        let grid = grid_from(&["###.", "###.", "##..", "###."]);
        let runs = (0..grid.height())
            .flat_map(|y| row_runs(&grid, y, |_| true))
            .collect::<Vec<_>>();
        let rects = merge_vertical_runs(&runs);
        assert_eq!(
            rects,
            vec![
                TileRect { kind: ObstacleKind::Wall, x: 0, y: 0, w: 3, h: 2 },
                TileRect { kind: ObstacleKind::Wall, x: 0, y: 2, w: 2, h: 1 },
                TileRect { kind: ObstacleKind::Wall, x: 0, y: 3, w: 3, h: 1 },
            ]
        );
    }

    #[test]
    fn packer_covers_lake_with_few_rectangles_and_no_overlap() {
        let grid = grid_from(&[".~~~~.", "~~~~~~", "~~~~~~", ".~~~~."]);
        let rects = pack_rectangles(&grid, ObstacleKind::Water);
        assert_eq!(rects.len(), 3);

        let mut covered = vec![0u8; 24];
        for rect in &rects {
            for y in rect.y..rect.y + rect.h {
                for x in rect.x..rect.x + rect.w {
                    covered[(y * 6 + x) as usize] += 1;
                }
            }
        }
        for y in 0..4 {
            for x in 0..6 {
                let expected = u8::from(grid.obstacle_kind_at(x, y) == Some(ObstacleKind::Water));
                assert_eq!(covered[(y * 6 + x) as usize], expected, "tile {x},{y}");
            }
        }
    }
}
