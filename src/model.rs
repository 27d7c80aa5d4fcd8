use chrono::Duration;

pub(crate) const INTERACTIONS_PER_STAGE: u64 = 3;
pub(crate) const FERTILIZER_CADENCE: u32 = 4;

pub(crate) const SCORE_ACCEPTED: i64 = 2;
pub(crate) const SCORE_REPEATED: i64 = -1;
pub(crate) const SCORE_FERTILIZER_TOO_SOON: i64 = -5;

pub(crate) fn time_to_sadness() -> Duration {
    Duration::seconds(10)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum CareAction {
    Water,
    Sun,
    Fertilizer,
    Talk,
}

impl CareAction {
    pub(crate) fn messages(self) -> &'static [&'static str] {
        match self {
            CareAction::Water => &[
                "Water helps carry nutrients and gives strength.",
                "Too much water can be harmful. Watch its little leaves.",
                "Some plants need water only when the soil is dry.",
            ],
            CareAction::Sun => &[
                "Sunlight activates photosynthesis.",
                "Some plants prefer indirect sun.",
                "Sunrays bring life to its leaves.",
            ],
            CareAction::Fertilizer => &[
                "Fertilizer provides nutrients for growth.",
                "Use only when needed.",
                "A good fertilizer helps roots and leaves.",
            ],
            CareAction::Talk => &[
                "You spoke kindly!",
                "Your voice is energy.",
                "Attention and care help plants thrive!",
            ],
        }
    }
}

#[derive(Debug)]
pub(crate) struct Stage {
    pub(crate) name: &'static str,
    pub(crate) art_id: &'static str,
}

pub(crate) const STAGES: &[Stage] = &[
    Stage { name: "Seed", art_id: "seed" },
    Stage { name: "Sprout", art_id: "sprout" },
    Stage { name: "Tiny Plant", art_id: "tiny" },
    Stage { name: "Young Plant", art_id: "young" },
    Stage { name: "Growing Tree", art_id: "growing" },
    Stage { name: "Big Tree", art_id: "big" },
    Stage { name: "Mature Tree", art_id: "mature" },
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct StageView {
    pub(crate) index: usize,
    pub(crate) name: &'static str,
    pub(crate) art_id: &'static str,
}

pub(crate) fn stage_for(count: u64) -> StageView {
    let index = ((count / INTERACTIONS_PER_STAGE) as usize).min(STAGES.len() - 1);
    let stage = &STAGES[index];
    StageView {
        index,
        name: stage.name,
        art_id: stage.art_id,
    }
}

/// Percent of the way through the current stage, always in [0, 100).
pub(crate) fn progress_within_stage(count: u64) -> u8 {
    ((count % INTERACTIONS_PER_STAGE) * 100 / INTERACTIONS_PER_STAGE) as u8
}

#[derive(Debug)]
pub(crate) struct Badge {
    pub(crate) threshold: u64,
    pub(crate) icon: &'static str,
    pub(crate) text: &'static str,
}

pub(crate) const BADGES: &[Badge] = &[
    Badge {
        threshold: 5,
        icon: "*",
        text: "Novice Gardener - First steps caring!",
    },
    Badge {
        threshold: 10,
        icon: "+",
        text: "Passionate Gardener - Your plant loves you!",
    },
    Badge {
        threshold: 15,
        icon: "#",
        text: "Expert Gardener - You're growing a forest!",
    },
    Badge {
        threshold: 20,
        icon: "@",
        text: "Master of Growth - Plant master level unlocked!",
    },
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum NeglectSeverity {
    Sprout,
    Juvenile,
    Mature,
    FullyGrown,
}

pub(crate) fn neglect_severity(count: u64) -> NeglectSeverity {
    if stage_for(count).index >= STAGES.len() - 1 {
        NeglectSeverity::FullyGrown
    } else if count < 3 {
        NeglectSeverity::Sprout
    } else if count < 9 {
        NeglectSeverity::Juvenile
    } else {
        NeglectSeverity::Mature
    }
}

impl NeglectSeverity {
    pub(crate) fn message(self) -> &'static str {
        match self {
            NeglectSeverity::FullyGrown => "Your fully grown plant is feeling down...",
            _ => "Your plant feels a bit lonely...",
        }
    }
}

pub(crate) fn welcome_message_for_age(age: u32) -> &'static str {
    if age <= 10 {
        "You're a kind-hearted child! This plant will grow with you."
    } else if age <= 17 {
        "You're a responsible and creative teenager! Your plant will witness your journey."
    } else {
        "You're a capable adult! This plant will be your companion in peace and achievements."
    }
}

#[derive(Clone, Debug)]
pub(crate) struct RngState {
    pub(crate) seed: u64,
    pub(crate) event_counter: u64,
}

impl RngState {
    pub(crate) fn new(seed: u64) -> Self {
        Self {
            seed,
            event_counter: 0,
        }
    }

    pub(crate) fn next_u64(&mut self) -> u64 {
        // Counter-based SplitMix64: deterministic and cheap.
        let mut z = self
            .seed
            .wrapping_add(self.event_counter.wrapping_mul(0x9E3779B97F4A7C15));
        self.event_counter = self.event_counter.wrapping_add(1);

        z = z.wrapping_add(0x9E3779B97F4A7C15);
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
        z ^ (z >> 31)
    }

    pub(crate) fn pick(&mut self, options: &[&'static str]) -> &'static str {
        options[(self.next_u64() % options.len() as u64) as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_index_follows_count_in_threes() {
        assert_eq!(stage_for(0).index, 0);
        assert_eq!(stage_for(2).index, 0);
        assert_eq!(stage_for(3).index, 1);
        assert_eq!(stage_for(8).index, 2);
        assert_eq!(stage_for(18).index, 6);
    }

    #[test]
    fn stage_index_saturates_at_last_stage() {
        let last = STAGES.len() - 1;
        assert_eq!(stage_for(1000).index, last);
        assert_eq!(stage_for(u64::MAX).index, last);
    }

    #[test]
    fn stage_index_is_monotonic() {
        let mut prev = 0;
        for c in 0..50u64 {
            let idx = stage_for(c).index;
            assert!(idx >= prev);
            prev = idx;
        }
    }

    #[test]
    fn progress_cycles_below_one_hundred() {
        assert_eq!(progress_within_stage(0), 0);
        assert_eq!(progress_within_stage(1), 33);
        assert_eq!(progress_within_stage(2), 66);
        assert_eq!(progress_within_stage(3), 0);
        for c in 0..50u64 {
            assert!(progress_within_stage(c) < 100);
        }
    }

    #[test]
    fn badge_thresholds_strictly_increase() {
        for pair in BADGES.windows(2) {
            assert!(pair[0].threshold < pair[1].threshold);
        }
    }

    #[test]
    fn severity_tiers_by_count() {
        assert_eq!(neglect_severity(0), NeglectSeverity::Sprout);
        assert_eq!(neglect_severity(2), NeglectSeverity::Sprout);
        assert_eq!(neglect_severity(3), NeglectSeverity::Juvenile);
        assert_eq!(neglect_severity(8), NeglectSeverity::Juvenile);
        assert_eq!(neglect_severity(9), NeglectSeverity::Mature);
        assert_eq!(neglect_severity(17), NeglectSeverity::Mature);
        assert_eq!(neglect_severity(18), NeglectSeverity::FullyGrown);
    }

    #[test]
    fn rng_is_deterministic_for_a_seed() {
        let mut a = RngState::new(7);
        let mut b = RngState::new(7);
        for _ in 0..16 {
            assert_eq!(a.next_u64(), b.next_u64());
        }
    }
}
