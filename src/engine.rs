use crate::model::{
    neglect_severity, progress_within_stage, stage_for, time_to_sadness, Badge, CareAction,
    NeglectSeverity, RngState, StageView, BADGES, FERTILIZER_CADENCE, SCORE_ACCEPTED,
    SCORE_FERTILIZER_TOO_SOON, SCORE_REPEATED,
};
use crate::store::Store;
use anyhow::Result;
use chrono::{DateTime, Utc};

const KEY_OWNER_NAME: &str = "ownerName";
const KEY_OWNER_AGE: &str = "ownerAge";
const KEY_PLANT_NAME: &str = "plantName";
const KEY_INTERACTIONS: &str = "interactions";
const KEY_SCORE: &str = "score";
const KEY_UNLOCKED_BADGES: &str = "unlockedBadges";
const KEY_SESSION_COUNT: &str = "sessionInteractionCount";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum RejectReason {
    RepeatedAction,
    FertilizerTooSoon,
}

impl RejectReason {
    pub(crate) fn feedback(self) -> &'static str {
        match self {
            RejectReason::RepeatedAction => "You can't repeat the same care action twice!",
            RejectReason::FertilizerTooSoon => {
                "You must care for the plant more before fertilizing!"
            }
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) struct BadgeStatus {
    pub(crate) badge: &'static Badge,
    pub(crate) unlocked: bool,
    pub(crate) progress: u8,
}

#[derive(Clone, Debug)]
pub(crate) struct Accepted {
    pub(crate) count: u64,
    pub(crate) stage: StageView,
    pub(crate) progress: u8,
    pub(crate) score: i64,
    pub(crate) message: &'static str,
    pub(crate) new_badge: Option<&'static Badge>,
    pub(crate) badge_progress: Vec<BadgeStatus>,
}

#[derive(Clone, Debug)]
pub(crate) enum InteractionOutcome {
    Accepted(Accepted),
    Rejected {
        reason: RejectReason,
        score: i64,
    },
}

#[derive(Clone, Debug)]
pub(crate) struct ProfileSnapshot {
    pub(crate) owner_name: String,
    pub(crate) owner_age: String,
    pub(crate) plant_name: String,
    pub(crate) count: u64,
    pub(crate) score: i64,
    pub(crate) stage: StageView,
    pub(crate) progress: u8,
    pub(crate) badge_progress: Vec<BadgeStatus>,
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct Neglect {
    pub(crate) severity: NeglectSeverity,
    pub(crate) message: &'static str,
}

/// Short-term history of accepted actions. In-memory only; a fresh process
/// starts with no last action and fertilizer ineligible (counter at 0).
#[derive(Clone, Copy, Debug, Default)]
struct History {
    last_action: Option<CareAction>,
    actions_since_fertilizer: u32,
}

pub(crate) struct Engine<P: Store, S: Store> {
    persistent: P,
    session: S,
    history: History,
    rng: RngState,
    sadness_deadline: Option<DateTime<Utc>>,
}

impl<P: Store, S: Store> Engine<P, S> {
    pub(crate) fn new(persistent: P, session: S, rng: RngState) -> Self {
        Self {
            persistent,
            session,
            history: History::default(),
            rng,
            sadness_deadline: None,
        }
    }

    /// Returns a snapshot if a profile exists, re-arming the sadness deadline.
    /// Absent or unparsable stored values decode to their defaults.
    pub(crate) fn load_profile(&mut self, now: DateTime<Utc>) -> Option<ProfileSnapshot> {
        let owner_name = self.persistent.get(KEY_OWNER_NAME)?;
        let count = self.read_u64(KEY_INTERACTIONS);
        let snapshot = ProfileSnapshot {
            owner_name,
            owner_age: self.persistent.get(KEY_OWNER_AGE).unwrap_or_default(),
            plant_name: self.persistent.get(KEY_PLANT_NAME).unwrap_or_default(),
            count,
            score: self.read_i64(KEY_SCORE),
            stage: stage_for(count),
            progress: progress_within_stage(count),
            badge_progress: self.badge_progress(count),
        };
        self.rearm_sadness(now);
        Some(snapshot)
    }

    pub(crate) fn create_profile(
        &mut self,
        owner_name: &str,
        owner_age: &str,
        plant_name: &str,
        now: DateTime<Utc>,
    ) -> Result<ProfileSnapshot> {
        self.persistent.set(KEY_OWNER_NAME, owner_name)?;
        self.persistent.set(KEY_OWNER_AGE, owner_age)?;
        self.persistent.set(KEY_PLANT_NAME, plant_name)?;
        self.persistent.set(KEY_INTERACTIONS, "0")?;
        self.persistent.set(KEY_UNLOCKED_BADGES, "[]")?;
        self.persistent.set(KEY_SCORE, "0")?;
        self.load_profile(now)
            .ok_or_else(|| anyhow::anyhow!("profile missing right after creation"))
    }

    /// Applies one care action. Validation failures are normal outcomes, not
    /// errors; only store write failures propagate.
    pub(crate) fn handle(
        &mut self,
        action: CareAction,
        now: DateTime<Utc>,
    ) -> Result<InteractionOutcome> {
        // Rule: no repeating the same care action (talk excepted).
        if self.history.last_action == Some(action) && action != CareAction::Talk {
            let score = self.apply_score_delta(SCORE_REPEATED)?;
            return Ok(InteractionOutcome::Rejected {
                reason: RejectReason::RepeatedAction,
                score,
            });
        }

        // Rule: fertilizer only after enough other care in between.
        if action == CareAction::Fertilizer
            && self.history.actions_since_fertilizer < FERTILIZER_CADENCE
        {
            let score = self.apply_score_delta(SCORE_FERTILIZER_TOO_SOON)?;
            return Ok(InteractionOutcome::Rejected {
                reason: RejectReason::FertilizerTooSoon,
                score,
            });
        }

        let count = self.read_u64(KEY_INTERACTIONS) + 1;
        self.persistent.set(KEY_INTERACTIONS, &count.to_string())?;

        let stage = stage_for(count);
        let progress = progress_within_stage(count);
        let message = self.rng.pick(action.messages());
        let new_badge = self.check_and_unlock(count)?;
        self.bump_session_count()?;
        let score = self.apply_score_delta(SCORE_ACCEPTED)?;

        if action == CareAction::Fertilizer {
            self.history.actions_since_fertilizer = 0;
        } else {
            self.history.actions_since_fertilizer += 1;
        }
        self.history.last_action = Some(action);
        self.rearm_sadness(now);

        Ok(InteractionOutcome::Accepted(Accepted {
            count,
            stage,
            progress,
            score,
            message,
            new_badge,
            badge_progress: self.badge_progress(count),
        }))
    }

    /// Fires at most once per arming; any accepted interaction or profile
    /// (re)load arms a fresh deadline.
    pub(crate) fn poll_sadness(&mut self, now: DateTime<Utc>) -> Option<Neglect> {
        let deadline = self.sadness_deadline?;
        if now < deadline {
            return None;
        }
        self.sadness_deadline = None;
        let severity = neglect_severity(self.read_u64(KEY_INTERACTIONS));
        Some(Neglect {
            severity,
            message: severity.message(),
        })
    }

    pub(crate) fn reset(&mut self) -> Result<()> {
        self.persistent.clear()?;
        self.session.clear()?;
        self.history = History::default();
        self.sadness_deadline = None;
        Ok(())
    }

    pub(crate) fn session_count(&self) -> u64 {
        self.session
            .get(KEY_SESSION_COUNT)
            .and_then(|v| v.parse().ok())
            .unwrap_or(0)
    }

    fn rearm_sadness(&mut self, now: DateTime<Utc>) {
        // Replaces any pending deadline; only one is ever armed.
        self.sadness_deadline = Some(now + time_to_sadness());
    }

    fn apply_score_delta(&mut self, delta: i64) -> Result<i64> {
        let score = self.read_i64(KEY_SCORE) + delta;
        self.persistent.set(KEY_SCORE, &score.to_string())?;
        Ok(score)
    }

    fn bump_session_count(&mut self) -> Result<()> {
        let next = self.session_count() + 1;
        self.session.set(KEY_SESSION_COUNT, &next.to_string())
    }

    /// Unlocks the badge whose threshold the count has just hit, if any.
    /// Thresholds match on equality, so a badge fires exactly once.
    fn check_and_unlock(&mut self, count: u64) -> Result<Option<&'static Badge>> {
        let mut unlocked = self.unlocked_badges();
        let badge = BADGES
            .iter()
            .find(|b| b.threshold == count && !unlocked.contains(&b.threshold));
        if let Some(badge) = badge {
            unlocked.push(badge.threshold);
            self.persistent
                .set(KEY_UNLOCKED_BADGES, &serde_json::to_string(&unlocked)?)?;
        }
        Ok(badge)
    }

    fn badge_progress(&self, count: u64) -> Vec<BadgeStatus> {
        let unlocked = self.unlocked_badges();
        BADGES
            .iter()
            .map(|badge| BadgeStatus {
                badge,
                unlocked: unlocked.contains(&badge.threshold),
                progress: (count * 100 / badge.threshold).min(100) as u8,
            })
            .collect()
    }

    fn unlocked_badges(&self) -> Vec<u64> {
        self.persistent
            .get(KEY_UNLOCKED_BADGES)
            .and_then(|v| serde_json::from_str(&v).ok())
            .unwrap_or_default()
    }

    fn read_u64(&self, key: &str) -> u64 {
        self.persistent
            .get(key)
            .and_then(|v| v.parse().ok())
            .unwrap_or(0)
    }

    fn read_i64(&self, key: &str) -> i64 {
        self.persistent
            .get(key)
            .and_then(|v| v.parse().ok())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemStore;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap()
    }

    fn fresh_engine() -> Engine<MemStore, MemStore> {
        let mut engine = Engine::new(MemStore::new(), MemStore::new(), RngState::new(42));
        engine
            .create_profile("Vera", "28", "Fern", t0())
            .unwrap();
        engine
    }

    fn accept(engine: &mut Engine<MemStore, MemStore>, action: CareAction) -> Accepted {
        match engine.handle(action, t0()).unwrap() {
            InteractionOutcome::Accepted(a) => a,
            InteractionOutcome::Rejected { reason, .. } => {
                panic!("expected {:?} to be accepted, got {:?}", action, reason)
            }
        }
    }

    #[test]
    fn alternating_actions_accumulate_count_and_score() {
        let mut engine = fresh_engine();
        let a = accept(&mut engine, CareAction::Water);
        assert_eq!((a.count, a.score), (1, 2));
        let a = accept(&mut engine, CareAction::Sun);
        assert_eq!((a.count, a.score), (2, 4));
        let a = accept(&mut engine, CareAction::Water);
        assert_eq!((a.count, a.score), (3, 6));
        assert_eq!(a.stage.index, 1);
        assert_eq!(engine.session_count(), 3);
    }

    #[test]
    fn repeating_an_action_is_rejected_with_penalty() {
        let mut engine = fresh_engine();
        accept(&mut engine, CareAction::Water);
        match engine.handle(CareAction::Water, t0()).unwrap() {
            InteractionOutcome::Rejected { reason, score } => {
                assert_eq!(reason, RejectReason::RepeatedAction);
                assert_eq!(score, 1);
            }
            other => panic!("expected rejection, got {:?}", other),
        }
        // no mutation beyond the penalty
        let snap = engine.load_profile(t0()).unwrap();
        assert_eq!(snap.count, 1);
        assert_eq!(engine.session_count(), 1);
    }

    #[test]
    fn talk_may_repeat_freely() {
        let mut engine = fresh_engine();
        for i in 1..=4 {
            let a = accept(&mut engine, CareAction::Talk);
            assert_eq!(a.count, i);
        }
    }

    #[test]
    fn first_fertilizer_is_always_too_soon() {
        let mut engine = fresh_engine();
        match engine.handle(CareAction::Fertilizer, t0()).unwrap() {
            InteractionOutcome::Rejected { reason, score } => {
                assert_eq!(reason, RejectReason::FertilizerTooSoon);
                assert_eq!(score, -5);
            }
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[test]
    fn fertilizer_allowed_after_four_other_actions() {
        let mut engine = fresh_engine();
        accept(&mut engine, CareAction::Water);
        accept(&mut engine, CareAction::Sun);
        accept(&mut engine, CareAction::Water);
        accept(&mut engine, CareAction::Talk);
        let a = accept(&mut engine, CareAction::Fertilizer);
        assert_eq!(a.count, 5);

        // cadence counter restarted: three more actions are not enough
        accept(&mut engine, CareAction::Sun);
        accept(&mut engine, CareAction::Water);
        accept(&mut engine, CareAction::Talk);
        match engine.handle(CareAction::Fertilizer, t0()).unwrap() {
            InteractionOutcome::Rejected { reason, .. } => {
                assert_eq!(reason, RejectReason::FertilizerTooSoon)
            }
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[test]
    fn repeat_rule_is_checked_before_cadence_rule() {
        let mut engine = fresh_engine();
        accept(&mut engine, CareAction::Water);
        accept(&mut engine, CareAction::Sun);
        accept(&mut engine, CareAction::Water);
        accept(&mut engine, CareAction::Talk);
        accept(&mut engine, CareAction::Fertilizer);
        match engine.handle(CareAction::Fertilizer, t0()).unwrap() {
            InteractionOutcome::Rejected { reason, .. } => {
                assert_eq!(reason, RejectReason::RepeatedAction)
            }
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[test]
    fn badge_unlocks_exactly_once_at_its_threshold() {
        let mut engine = fresh_engine();
        let actions = [
            CareAction::Water,
            CareAction::Sun,
            CareAction::Water,
            CareAction::Talk,
        ];
        for i in 0..4 {
            let a = accept(&mut engine, actions[i]);
            assert!(a.new_badge.is_none(), "no badge before threshold");
        }
        let a = accept(&mut engine, CareAction::Sun);
        let badge = a.new_badge.expect("badge at count 5");
        assert_eq!(badge.threshold, 5);
        assert!(a.badge_progress[0].unlocked);
        assert_eq!(a.badge_progress[1].progress, 50);

        // counts 6..9 pass without re-firing
        for i in 0..4 {
            let a = accept(&mut engine, actions[i]);
            if a.count < 10 {
                assert!(a.new_badge.is_none());
            }
        }
    }

    #[test]
    fn rejections_do_not_advance_badges() {
        let mut engine = fresh_engine();
        accept(&mut engine, CareAction::Water);
        for _ in 0..10 {
            engine.handle(CareAction::Water, t0()).unwrap();
        }
        let snap = engine.load_profile(t0()).unwrap();
        assert_eq!(snap.count, 1);
        assert!(snap.badge_progress.iter().all(|b| !b.unlocked));
    }

    #[test]
    fn message_choice_is_deterministic_for_a_seed() {
        let mut expected_rng = RngState::new(42);
        let expected = expected_rng.pick(CareAction::Water.messages());

        let mut engine = fresh_engine();
        let a = accept(&mut engine, CareAction::Water);
        assert_eq!(a.message, expected);
    }

    #[test]
    fn reset_clears_everything() {
        let mut engine = fresh_engine();
        accept(&mut engine, CareAction::Water);
        accept(&mut engine, CareAction::Sun);
        engine.reset().unwrap();

        assert!(engine.load_profile(t0()).is_none());
        assert_eq!(engine.session_count(), 0);

        let snap = engine
            .create_profile("Vera", "28", "Fern", t0())
            .unwrap();
        assert_eq!(snap.count, 0);
        assert_eq!(snap.score, 0);
        assert!(snap.badge_progress.iter().all(|b| !b.unlocked));

        // history cleared too: water right after reset is accepted
        let a = accept(&mut engine, CareAction::Water);
        assert_eq!(a.count, 1);
    }

    #[test]
    fn malformed_stored_values_decode_to_defaults() {
        let mut persistent = MemStore::new();
        persistent.set("ownerName", "Vera").unwrap();
        persistent.set("interactions", "garbage").unwrap();
        persistent.set("score", "NaN").unwrap();
        persistent.set("unlockedBadges", "{broken").unwrap();

        let mut engine = Engine::new(persistent, MemStore::new(), RngState::new(1));
        let snap = engine.load_profile(t0()).unwrap();
        assert_eq!(snap.count, 0);
        assert_eq!(snap.score, 0);
        assert!(snap.badge_progress.iter().all(|b| !b.unlocked));
    }

    #[test]
    fn sadness_fires_once_after_the_idle_window() {
        let mut engine = fresh_engine();
        assert!(engine.poll_sadness(t0() + Duration::seconds(9)).is_none());

        let neglect = engine
            .poll_sadness(t0() + Duration::seconds(10))
            .expect("deadline elapsed");
        assert_eq!(neglect.severity, NeglectSeverity::Sprout);

        // disarmed until the next accepted interaction
        assert!(engine.poll_sadness(t0() + Duration::seconds(60)).is_none());
    }

    #[test]
    fn accepted_interaction_rearms_sadness() {
        let mut engine = fresh_engine();
        let later = t0() + Duration::seconds(8);
        engine.handle(CareAction::Water, later).unwrap();

        assert!(engine.poll_sadness(t0() + Duration::seconds(10)).is_none());
        assert!(engine
            .poll_sadness(later + Duration::seconds(10))
            .is_some());
    }

    #[test]
    fn neglect_severity_tracks_growth() {
        let mut persistent = MemStore::new();
        persistent.set("ownerName", "Vera").unwrap();
        persistent.set("interactions", "18").unwrap();

        let mut engine = Engine::new(persistent, MemStore::new(), RngState::new(1));
        engine.load_profile(t0()).unwrap();
        let neglect = engine
            .poll_sadness(t0() + Duration::seconds(10))
            .expect("deadline elapsed");
        assert_eq!(neglect.severity, NeglectSeverity::FullyGrown);
    }

    struct FailingStore;

    impl Store for FailingStore {
        fn get(&self, _key: &str) -> Option<String> {
            None
        }
        fn set(&mut self, _key: &str, _value: &str) -> Result<()> {
            anyhow::bail!("storage unavailable")
        }
        fn clear(&mut self) -> Result<()> {
            anyhow::bail!("storage unavailable")
        }
    }

    #[test]
    fn store_write_failure_propagates() {
        let mut engine = Engine::new(FailingStore, MemStore::new(), RngState::new(1));
        assert!(engine.handle(CareAction::Water, t0()).is_err());
    }
}
