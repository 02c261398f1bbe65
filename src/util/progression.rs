//! Fixed XP rank tiers shown on the dashboard.

pub const BEGINNER_THRESHOLD: i32 = 1000;
pub const INTERMEDIATE_THRESHOLD: i32 = 3000;
// Placeholder cap for the top tier.
pub const ADVANCED_THRESHOLD: i32 = 10000;

pub struct RankInfo {
    pub rank: &'static str,
    pub next_xp_threshold: i32,
}

pub fn rank_info(xp: i32) -> RankInfo {
    if xp < BEGINNER_THRESHOLD {
        RankInfo {
            rank: "Beginner",
            next_xp_threshold: BEGINNER_THRESHOLD,
        }
    } else if xp < INTERMEDIATE_THRESHOLD {
        RankInfo {
            rank: "Intermediate",
            next_xp_threshold: INTERMEDIATE_THRESHOLD,
        }
    } else {
        RankInfo {
            rank: "Advanced",
            next_xp_threshold: ADVANCED_THRESHOLD,
        }
    }
}

pub fn progress_percent(xp: i32, next_xp_threshold: i32) -> f64 {
    if next_xp_threshold <= 0 {
        return 100.0;
    }
    (f64::from(xp) / f64::from(next_xp_threshold) * 100.0).min(100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_boundaries() {
        assert_eq!(rank_info(0).rank, "Beginner");
        assert_eq!(rank_info(999).rank, "Beginner");
        assert_eq!(rank_info(1000).rank, "Intermediate");
        assert_eq!(rank_info(2999).rank, "Intermediate");
        assert_eq!(rank_info(3000).rank, "Advanced");
        assert_eq!(rank_info(3000).next_xp_threshold, ADVANCED_THRESHOLD);
    }

    #[test]
    fn progress_is_capped_at_100() {
        assert_eq!(progress_percent(500, 1000), 50.0);
        assert_eq!(progress_percent(20000, 10000), 100.0);
        assert_eq!(progress_percent(0, 1000), 0.0);
    }
}
