//! Pure experience-to-rank mapping shared by the profile and results views.

/// Display attributes and threshold for one rank tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankInfo {
    /// Rank name shown to players.
    pub name: &'static str,
    /// Minimum experience required to hold the rank.
    pub min_xp: u32,
    /// Emoji badge rendered next to the rank name.
    pub icon: &'static str,
    /// UI color token associated with the rank.
    pub color: &'static str,
}

/// Rank tiers in ascending threshold order.
pub const RANKS: [RankInfo; 7] = [
    RankInfo {
        name: "Bronze",
        min_xp: 0,
        icon: "🥉",
        color: "amber-700",
    },
    RankInfo {
        name: "Silver",
        min_xp: 300,
        icon: "🥈",
        color: "gray-400",
    },
    RankInfo {
        name: "Gold",
        min_xp: 800,
        icon: "🥇",
        color: "yellow-500",
    },
    RankInfo {
        name: "Platinum",
        min_xp: 1500,
        icon: "💎",
        color: "cyan-400",
    },
    RankInfo {
        name: "Diamond",
        min_xp: 3000,
        icon: "💠",
        color: "blue-500",
    },
    RankInfo {
        name: "Heroic",
        min_xp: 5000,
        icon: "👑",
        color: "purple-500",
    },
    RankInfo {
        name: "Master",
        min_xp: 10000,
        icon: "🏆",
        color: "red-500",
    },
];

/// Highest rank whose threshold the experience reaches; Bronze for any input.
pub fn rank_of(xp: u32) -> &'static RankInfo {
    RANKS
        .iter()
        .rev()
        .find(|rank| xp >= rank.min_xp)
        .unwrap_or(&RANKS[0])
}

/// The next tier above the current one, or `None` at the top rank.
pub fn next_rank(xp: u32) -> Option<&'static RankInfo> {
    let current = rank_of(xp);
    let index = RANKS.iter().position(|rank| rank.name == current.name)?;
    RANKS.get(index + 1)
}

/// Progress through the current rank band, clamped to `0..=100`.
///
/// Returns 100 at the top rank.
pub fn progress_percent(xp: u32) -> u32 {
    let current = rank_of(xp);
    let Some(next) = next_rank(xp) else {
        return 100;
    };

    let gained = xp - current.min_xp;
    let needed = next.min_xp - current.min_xp;
    (gained * 100 / needed).min(100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rank_boundaries_match_the_threshold_table() {
        assert_eq!(rank_of(0).name, "Bronze");
        assert_eq!(rank_of(299).name, "Bronze");
        assert_eq!(rank_of(300).name, "Silver");
        assert_eq!(rank_of(799).name, "Silver");
        assert_eq!(rank_of(800).name, "Gold");
        assert_eq!(rank_of(1500).name, "Platinum");
        assert_eq!(rank_of(3000).name, "Diamond");
        assert_eq!(rank_of(5000).name, "Heroic");
        assert_eq!(rank_of(10000).name, "Master");
        assert_eq!(rank_of(u32::MAX).name, "Master");
    }

    #[test]
    fn next_rank_walks_the_table_and_stops_at_the_top() {
        assert_eq!(next_rank(0).map(|r| r.name), Some("Silver"));
        assert_eq!(next_rank(299).map(|r| r.name), Some("Silver"));
        assert_eq!(next_rank(300).map(|r| r.name), Some("Gold"));
        assert_eq!(next_rank(9999).map(|r| r.name), Some("Master"));
        assert_eq!(next_rank(10000), None);
        assert_eq!(next_rank(20000), None);
    }

    #[test]
    fn progress_is_clamped_and_tops_out_at_100() {
        assert_eq!(progress_percent(0), 0);
        assert_eq!(progress_percent(150), 50);
        assert_eq!(progress_percent(299), 99);
        assert_eq!(progress_percent(300), 0);
        assert_eq!(progress_percent(10000), 100);
        assert_eq!(progress_percent(u32::MAX), 100);
    }

    #[test]
    fn progress_is_monotone_within_a_band() {
        let mut last = 0;
        for xp in 300..800 {
            let progress = progress_percent(xp);
            assert!(progress >= last, "progress dropped at {xp}");
            assert!(progress <= 100);
            last = progress;
        }
    }
}
