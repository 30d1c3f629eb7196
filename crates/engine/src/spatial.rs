use std::collections::{BTreeSet, HashMap};

use crate::geom::{Rect, Vec2};
use crate::obstacle::Obstacle;

pub const DEFAULT_CELL_SIZE: f32 = 64.0;
pub const MIN_CELL_SIZE: f32 = 8.0;
pub const SEGMENT_QUERY_PADDING: f32 = 4.0;

type CellKey = (i32, i32);

/// Uniform-grid bucket index over obstacle array indices.
///
/// The index stores positions into the obstacle slice it was built from, so it
/// must be rebuilt whenever that slice changes shape. A stale index under-reports
/// rather than failing.
#[derive(Debug, Clone, Default)]
pub struct ObstacleIndex {
    cell_size: f32,
    cells: HashMap<CellKey, Vec<usize>>,
    obstacle_count: usize,
}

impl ObstacleIndex {
    pub fn rebuild(obstacles: &[Obstacle], cell_size: f32) -> Self {
        let cell_size = if cell_size.is_finite() {
            cell_size.max(MIN_CELL_SIZE)
        } else {
            DEFAULT_CELL_SIZE
        };
        let mut cells = HashMap::<CellKey, Vec<usize>>::new();
        for (index, obstacle) in obstacles.iter().enumerate() {
            let Some((min, max)) = cell_span(&obstacle.rect, cell_size) else {
                continue;
            };
            for cy in min.1..=max.1 {
                for cx in min.0..=max.0 {
                    cells.entry((cx, cy)).or_default().push(index);
                }
            }
        }
        Self {
            cell_size,
            cells,
            obstacle_count: obstacles.len(),
        }
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    pub fn obstacle_count(&self) -> usize {
        self.obstacle_count
    }

    /// Sorted, de-duplicated indices registered in every cell the query touches.
    pub fn query_aabb(&self, query: Rect) -> Vec<usize> {
        let Some((min, max)) = cell_span(&query, self.cell_size) else {
            return Vec::new();
        };
        let mut hits = BTreeSet::new();
        for cy in min.1..=max.1 {
            for cx in min.0..=max.0 {
                if let Some(bucket) = self.cells.get(&(cx, cy)) {
                    hits.extend(bucket.iter().copied());
                }
            }
        }
        hits.into_iter().collect()
    }
}

fn cell_span(rect: &Rect, cell_size: f32) -> Option<(CellKey, CellKey)> {
    if !(rect.x.is_finite() && rect.y.is_finite() && rect.w.is_finite() && rect.h.is_finite()) {
        return None;
    }
    let w = rect.w.max(0.0);
    let h = rect.h.max(0.0);
    let min_x = (rect.x / cell_size).floor() as i32;
    let min_y = (rect.y / cell_size).floor() as i32;
    // Zero-area rects still occupy the cell holding their corner.
    let max_x = (((rect.x + w) / cell_size).ceil() as i32 - 1).max(min_x);
    let max_y = (((rect.y + h) / cell_size).ceil() as i32 - 1).max(min_y);
    Some(((min_x, min_y), (max_x, max_y)))
}

/// Candidate obstacles for `query`. Without an index every obstacle is a candidate.
pub fn query_obstacles_aabb(
    index: Option<&ObstacleIndex>,
    obstacles: &[Obstacle],
    query: Rect,
) -> Vec<usize> {
    match index {
        Some(index) => index
            .query_aabb(query)
            .into_iter()
            .filter(|candidate| *candidate < obstacles.len())
            .collect(),
        None => (0..obstacles.len()).collect(),
    }
}

/// Approximates a segment query with the padded bounding box of the segment.
pub fn query_obstacles_segment(
    index: Option<&ObstacleIndex>,
    obstacles: &[Obstacle],
    from: Vec2,
    to: Vec2,
    padding: f32,
) -> Vec<usize> {
    let padding = if padding.is_finite() { padding.max(0.0) } else { 0.0 };
    let min_x = from.x.min(to.x) - padding;
    let min_y = from.y.min(to.y) - padding;
    let max_x = from.x.max(to.x) + padding;
    let max_y = from.y.max(to.y) + padding;
    query_obstacles_aabb(
        index,
        obstacles,
        Rect::new(min_x, min_y, max_x - min_x, max_y - min_y),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::obstacle::ObstacleKind;

    fn wall(x: f32, y: f32, w: f32, h: f32) -> Obstacle {
        Obstacle::new(ObstacleKind::Wall, Rect::new(x, y, w, h))
    }

    #[test]
    fn obstacle_spanning_cells_is_reported_once() {
        let obstacles = vec![wall(10.0, 10.0, 200.0, 20.0), wall(500.0, 500.0, 10.0, 10.0)];
        let index = ObstacleIndex::rebuild(&obstacles, 64.0);
        let hits = index.query_aabb(Rect::new(0.0, 0.0, 256.0, 64.0));
        assert_eq!(hits, vec![0]);
    }

    #[test]
    fn cell_size_never_drops_below_minimum() {
        let index = ObstacleIndex::rebuild(&[], 1.0);
        assert_eq!(index.cell_size(), MIN_CELL_SIZE);
        let index = ObstacleIndex::rebuild(&[], f32::NAN);
        assert_eq!(index.cell_size(), DEFAULT_CELL_SIZE);
    }

    #[test]
    fn missing_index_falls_back_to_full_scan() {
        let obstacles = vec![wall(0.0, 0.0, 8.0, 8.0), wall(900.0, 900.0, 8.0, 8.0)];
        let hits = query_obstacles_aabb(None, &obstacles, Rect::new(0.0, 0.0, 1.0, 1.0));
        assert_eq!(hits, vec![0, 1]);
    }

    #[test]
    fn query_far_from_everything_is_empty() {
        let obstacles = vec![wall(0.0, 0.0, 32.0, 32.0)];
        let index = ObstacleIndex::rebuild(&obstacles, 32.0);
        assert!(index.query_aabb(Rect::new(320.0, 320.0, 10.0, 10.0)).is_empty());
    }

    #[test]
    fn segment_query_uses_padded_bounding_box() {
        let obstacles = vec![wall(100.0, 36.0, 8.0, 8.0), wall(100.0, 300.0, 8.0, 8.0)];
        let index = ObstacleIndex::rebuild(&obstacles, 16.0);
        let hits = query_obstacles_segment(
            Some(&index),
            &obstacles,
            Vec2::new(0.0, 30.0),
            Vec2::new(200.0, 30.0),
            SEGMENT_QUERY_PADDING,
        );
        assert_eq!(hits, vec![0]);
    }

    #[test]
    fn stale_index_entries_beyond_slice_are_dropped() {
        let obstacles = vec![wall(0.0, 0.0, 8.0, 8.0), wall(0.0, 0.0, 8.0, 8.0)];
        let index = ObstacleIndex::rebuild(&obstacles, 16.0);
        let hits = query_obstacles_aabb(Some(&index), &obstacles[..1], Rect::new(0.0, 0.0, 4.0, 4.0));
        assert_eq!(hits, vec![0]);
    }
}
