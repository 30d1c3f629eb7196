use tracing::warn;

use super::actors::Progress;

pub const LEVEL_UP_SAFETY_VALVE: u32 = 50;

/// XP needed to advance from `level` to `level + 1`.
pub fn xp_to_next(level: u32) -> u32 {
    let exponent = level.max(1) - 1;
    let raw = (50.0_f64 * 1.6_f64.powi(exponent.min(i32::MAX as u32) as i32)).round();
    if raw >= u32::MAX as f64 {
        u32::MAX
    } else {
        raw as u32
    }
}

/// Adds `amount` XP and applies every level-up it pays for. Returns the
/// number of levels gained.
pub fn grant_xp_to_actor(progress: &mut Progress, amount: u32) -> u32 {
    progress.level = progress.level.max(1);
    progress.xp = progress.xp.saturating_add(amount);

    let mut gained = 0;
    while progress.xp >= xp_to_next(progress.level) {
        if gained == LEVEL_UP_SAFETY_VALVE {
            warn!(
                level = progress.level,
                xp = progress.xp,
                "level_up_safety_valve_hit"
            );
            break;
        }
        progress.xp -= xp_to_next(progress.level);
        progress.level += 1;
        gained += 1;
    }
    gained
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn curve_is_exponential_and_rounded() {
        assert_eq!(xp_to_next(0), 50);
        assert_eq!(xp_to_next(1), 50);
        assert_eq!(xp_to_next(2), 80);
        assert_eq!(xp_to_next(3), 128);
        assert_eq!(xp_to_next(4), 205);
    }

    #[test]
    fn grant_carries_remainder_across_multiple_levels() {
        let mut progress = Progress::default();
        let gained = grant_xp_to_actor(&mut progress, 50 + 80 + 10);
        assert_eq!(gained, 2);
        assert_eq!(progress, Progress { level: 3, xp: 10 });
    }

    #[test]
    fn pathological_grant_stops_at_safety_valve() {
        let mut progress = Progress::default();
        let gained = grant_xp_to_actor(&mut progress, u32::MAX);
        assert!(gained <= LEVEL_UP_SAFETY_VALVE);
        assert!(progress.level <= 1 + LEVEL_UP_SAFETY_VALVE);
    }
}
