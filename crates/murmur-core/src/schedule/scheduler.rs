//! Staggered delivery planning.
//!
//! Turns generated in one cycle are released at different times instead of
//! all at once. Two modes:
//!
//! - **Interest-weighted**: eager (High) personas answer sooner than reluctant
//!   (Low) ones. `delay_i = base(level) + U(jitter) * i` over the batch sorted
//!   High first.
//! - **Uniform**: `delay_i = base + U(step) * (i + 1)`, or `base + U(step) * i`
//!   when the first turn goes out right at `base`; optionally ranked by
//!   interest first.
//!
//! In both modes each delay is raised to at least the previous delay plus
//! `min_gap`, so the plan is strictly increasing and keeps its sort order.

use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{MurmurError, Result};
use crate::interest::InterestLevel;
use crate::turn::Turn;

/// Upper bound for any configured delay, one day.
pub const MAX_DELAY_SECS: f64 = 86_400.0;

/// A closed range of seconds sampled uniformly.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct StaggerRange {
    pub min_secs: f64,
    pub max_secs: f64,
}

impl StaggerRange {
    pub fn new(min_secs: f64, max_secs: f64) -> Self {
        Self { min_secs, max_secs }
    }

    pub fn fixed(secs: f64) -> Self {
        Self::new(secs, secs)
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        if self.max_secs > self.min_secs {
            rng.gen_range(self.min_secs..=self.max_secs)
        } else {
            self.min_secs
        }
    }

    pub fn validate(&self, name: &str) -> Result<()> {
        check_delay(name, self.min_secs)?;
        check_delay(name, self.max_secs)?;
        if self.min_secs > self.max_secs {
            return Err(MurmurError::config(format!(
                "{name} range {}..{} is inverted",
                self.min_secs, self.max_secs
            )));
        }
        Ok(())
    }
}

fn check_delay(name: &str, secs: f64) -> Result<()> {
    if secs.is_finite() && (0.0..=MAX_DELAY_SECS).contains(&secs) {
        Ok(())
    } else {
        Err(MurmurError::config(format!(
            "{name} delay {secs} must be between 0 and {MAX_DELAY_SECS} seconds"
        )))
    }
}

/// Delay tunables.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct SchedulerConfig {
    pub high_delay_secs: f64,
    pub medium_delay_secs: f64,
    pub low_delay_secs: f64,
    /// Per-position jitter for interest-weighted plans
    pub jitter: StaggerRange,
    /// Smallest distance between two releases of the same batch
    pub min_gap_secs: f64,
    pub discussion: StaggerRange,
    pub spontaneous: StaggerRange,
    pub drill_step_secs: f64,
    /// First release of a batch-generated cycle
    pub batch_base_secs: f64,
    /// Gap between consecutive releases of a batch-generated cycle
    pub batch: StaggerRange,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            high_delay_secs: 2.0,
            medium_delay_secs: 4.0,
            low_delay_secs: 6.0,
            jitter: StaggerRange::new(0.5, 1.5),
            min_gap_secs: 0.1,
            discussion: StaggerRange::new(1.0, 3.0),
            spontaneous: StaggerRange::new(2.0, 5.0),
            drill_step_secs: 3.0,
            batch_base_secs: 2.0,
            batch: StaggerRange::new(1.5, 3.0),
        }
    }
}

impl SchedulerConfig {
    pub fn base_delay(&self, level: InterestLevel) -> f64 {
        match level {
            InterestLevel::High => self.high_delay_secs,
            InterestLevel::Medium => self.medium_delay_secs,
            InterestLevel::Low => self.low_delay_secs,
        }
    }

    pub fn discussion_mode(&self) -> ScheduleMode {
        ScheduleMode::Uniform {
            base_secs: 0.0,
            step: self.discussion,
            rank_by_interest: true,
            step_first: true,
        }
    }

    pub fn spontaneous_mode(&self) -> ScheduleMode {
        ScheduleMode::Uniform {
            base_secs: 0.0,
            step: self.spontaneous,
            rank_by_interest: true,
            step_first: true,
        }
    }

    /// Fixed steps that keep the asker before the responder.
    pub fn drill_mode(&self) -> ScheduleMode {
        ScheduleMode::Uniform {
            base_secs: 0.0,
            step: StaggerRange::fixed(self.drill_step_secs),
            rank_by_interest: false,
            step_first: true,
        }
    }

    /// Plain batch pacing: the first turn at the base, then random gaps.
    pub fn batch_mode(&self) -> ScheduleMode {
        ScheduleMode::Uniform {
            base_secs: self.batch_base_secs,
            step: self.batch,
            rank_by_interest: false,
            step_first: false,
        }
    }

    pub fn validate(&self) -> Result<()> {
        check_delay("high", self.high_delay_secs)?;
        check_delay("medium", self.medium_delay_secs)?;
        check_delay("low", self.low_delay_secs)?;
        check_delay("min_gap", self.min_gap_secs)?;
        check_delay("drill_step", self.drill_step_secs)?;
        check_delay("batch_base", self.batch_base_secs)?;
        if self.min_gap_secs <= 0.0 {
            return Err(MurmurError::config("scheduler min_gap_secs must be positive"));
        }
        self.jitter.validate("jitter")?;
        self.discussion.validate("discussion")?;
        self.spontaneous.validate("spontaneous")?;
        self.batch.validate("batch")?;
        Ok(())
    }
}

/// How a batch is spread out in time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScheduleMode {
    InterestWeighted,
    Uniform {
        base_secs: f64,
        step: StaggerRange,
        rank_by_interest: bool,
        /// Wait one step before the first turn too
        step_first: bool,
    },
}

impl ScheduleMode {
    fn validate(&self) -> Result<()> {
        match self {
            ScheduleMode::InterestWeighted => Ok(()),
            ScheduleMode::Uniform {
                base_secs, step, ..
            } => {
                check_delay("base", *base_secs)?;
                step.validate("step")
            }
        }
    }
}

/// A turn together with its release delay, relative to the end of the cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledTurn {
    pub turn: Turn,
    pub delay: Duration,
}

/// A batch of turns ordered by strictly increasing delay.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeliveryPlan {
    items: Vec<ScheduledTurn>,
}

impl DeliveryPlan {
    pub fn items(&self) -> &[ScheduledTurn] {
        &self.items
    }

    pub fn into_items(self) -> Vec<ScheduledTurn> {
        self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn turns(&self) -> impl Iterator<Item = &Turn> {
        self.items.iter().map(|s| &s.turn)
    }

    /// Sets every turn's timestamp to its release time counted from `now`.
    pub fn stamp(&mut self, now: DateTime<Utc>) {
        for item in &mut self.items {
            let offset =
                chrono::Duration::from_std(item.delay).unwrap_or_else(|_| chrono::Duration::zero());
            item.turn.timestamp = now + offset;
        }
    }
}

/// Computes delivery plans.
#[derive(Debug, Clone, Default)]
pub struct ResponseScheduler {
    config: SchedulerConfig,
}

impl ResponseScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Orders `batch` and assigns each turn a distinct, increasing delay.
    ///
    /// Sorting is stable, so turns of equal interest keep their batch order.
    /// Fails on delays that are negative, non-finite or longer than
    /// [`MAX_DELAY_SECS`], so a bad configuration never panics or collapses
    /// the plan.
    pub fn schedule<R: Rng + ?Sized>(
        &self,
        mut batch: Vec<Turn>,
        mode: &ScheduleMode,
        rng: &mut R,
    ) -> Result<DeliveryPlan> {
        self.config.validate()?;
        mode.validate()?;

        let rank = match mode {
            ScheduleMode::InterestWeighted => true,
            ScheduleMode::Uniform {
                rank_by_interest, ..
            } => *rank_by_interest,
        };
        if rank {
            batch.sort_by_key(|turn| turn.interest.rank());
        }

        let mut items = Vec::with_capacity(batch.len());
        let mut previous: Option<f64> = None;
        for (i, turn) in batch.into_iter().enumerate() {
            let raw = match mode {
                ScheduleMode::InterestWeighted => {
                    self.config.base_delay(turn.interest)
                        + self.config.jitter.sample(rng) * i as f64
                }
                ScheduleMode::Uniform {
                    base_secs,
                    step,
                    step_first,
                    ..
                } => {
                    let steps = if *step_first { i + 1 } else { i };
                    base_secs + step.sample(rng) * steps as f64
                }
            };
            let secs = match previous {
                Some(prev) => raw.max(prev + self.config.min_gap_secs),
                None => raw.max(0.0),
            };
            previous = Some(secs);

            let delay = Duration::try_from_secs_f64(secs).map_err(|e| {
                MurmurError::config(format!("delay of {secs}s for {}: {e}", turn.persona_id))
            })?;
            tracing::debug!(
                "[Scheduler] {} ({}) at +{:.2}s",
                turn.persona_id,
                turn.interest,
                secs
            );
            items.push(ScheduledTurn { turn, delay });
        }

        Ok(DeliveryPlan { items })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn turn(id: &str, interest: InterestLevel) -> Turn {
        Turn::spoken(id, id, "text", interest, "m")
    }

    fn ids(plan: &DeliveryPlan) -> Vec<&str> {
        plan.turns().map(|t| t.persona_id.as_str()).collect()
    }

    fn assert_strictly_increasing(plan: &DeliveryPlan) {
        for pair in plan.items().windows(2) {
            assert!(pair[0].delay < pair[1].delay, "{:?}", plan);
        }
    }

    #[test]
    fn test_high_before_low_and_distinct_delays() {
        let scheduler = ResponseScheduler::default();
        for seed in 0..100 {
            let batch = vec![
                turn("a", InterestLevel::High),
                turn("b", InterestLevel::Low),
                turn("c", InterestLevel::High),
            ];
            let plan = scheduler.schedule(
                batch,
                &ScheduleMode::InterestWeighted,
                &mut StdRng::seed_from_u64(seed),
            ).unwrap();
            assert_eq!(ids(&plan), vec!["a", "c", "b"]);
            assert_strictly_increasing(&plan);
        }
    }

    #[test]
    fn test_equal_bases_are_still_separated() {
        let config = SchedulerConfig {
            high_delay_secs: 1.0,
            medium_delay_secs: 1.0,
            low_delay_secs: 1.0,
            jitter: StaggerRange::fixed(0.0),
            ..SchedulerConfig::default()
        };
        let plan = ResponseScheduler::new(config).schedule(
            vec![
                turn("a", InterestLevel::Low),
                turn("b", InterestLevel::Medium),
                turn("c", InterestLevel::High),
            ],
            &ScheduleMode::InterestWeighted,
            &mut StdRng::seed_from_u64(0),
        ).unwrap();
        assert_eq!(ids(&plan), vec!["c", "b", "a"]);
        assert_strictly_increasing(&plan);
        assert_eq!(plan.items()[0].delay, Duration::from_secs(1));
    }

    #[test]
    fn test_uniform_without_ranking_keeps_batch_order() {
        let scheduler = ResponseScheduler::default();
        let mode = scheduler.config().drill_mode();
        let plan = scheduler.schedule(
            vec![turn("asker", InterestLevel::Low), turn("responder", InterestLevel::High)],
            &mode,
            &mut StdRng::seed_from_u64(9),
        ).unwrap();
        assert_eq!(ids(&plan), vec!["asker", "responder"]);
        assert_eq!(plan.items()[0].delay, Duration::from_secs(3));
        assert_eq!(plan.items()[1].delay, Duration::from_secs(6));
    }

    #[test]
    fn test_uniform_ranked_discussion() {
        let scheduler = ResponseScheduler::default();
        let mode = scheduler.config().discussion_mode();
        let plan = scheduler.schedule(
            vec![
                turn("a", InterestLevel::Low),
                turn("b", InterestLevel::High),
                turn("c", InterestLevel::Medium),
                turn("d", InterestLevel::High),
            ],
            &mode,
            &mut StdRng::seed_from_u64(4),
        ).unwrap();
        assert_eq!(ids(&plan), vec!["b", "d", "c", "a"]);
        assert_strictly_increasing(&plan);
        assert!(plan.items()[0].delay >= Duration::from_secs(1));
    }

    #[test]
    fn test_stamp_gives_increasing_timestamps() {
        let scheduler = ResponseScheduler::default();
        let mut plan = scheduler.schedule(
            vec![turn("a", InterestLevel::Medium), turn("b", InterestLevel::Medium)],
            &ScheduleMode::InterestWeighted,
            &mut StdRng::seed_from_u64(1),
        ).unwrap();
        let now = Utc::now();
        plan.stamp(now);
        let stamps: Vec<_> = plan.turns().map(|t| t.timestamp).collect();
        assert!(stamps[0] >= now);
        assert!(stamps[0] < stamps[1]);
    }

    #[test]
    fn test_config_validation() {
        assert!(SchedulerConfig::default().validate().is_ok());
        let bad = SchedulerConfig {
            jitter: StaggerRange::new(2.0, 1.0),
            ..SchedulerConfig::default()
        };
        assert!(bad.validate().is_err());
        let bad = SchedulerConfig {
            min_gap_secs: 0.0,
            ..SchedulerConfig::default()
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_unbounded_delays_are_rejected() {
        let infinite = SchedulerConfig {
            discussion: StaggerRange::new(1.0, f64::INFINITY),
            ..SchedulerConfig::default()
        };
        assert!(infinite.validate().unwrap_err().is_config());

        let huge = SchedulerConfig {
            high_delay_secs: 1e20,
            ..SchedulerConfig::default()
        };
        assert!(huge.validate().unwrap_err().is_config());

        let nan = SchedulerConfig {
            jitter: StaggerRange::new(f64::NAN, 1.0),
            ..SchedulerConfig::default()
        };
        assert!(nan.validate().is_err());
    }

    #[test]
    fn test_schedule_errors_instead_of_panicking() {
        let scheduler = ResponseScheduler::new(SchedulerConfig {
            high_delay_secs: 1e20,
            ..SchedulerConfig::default()
        });
        let err = scheduler
            .schedule(
                vec![turn("a", InterestLevel::High), turn("b", InterestLevel::High)],
                &ScheduleMode::InterestWeighted,
                &mut StdRng::seed_from_u64(0),
            )
            .unwrap_err();
        assert!(err.is_config());

        let mode = ScheduleMode::Uniform {
            base_secs: 0.0,
            step: StaggerRange::new(1.0, f64::INFINITY),
            rank_by_interest: false,
            step_first: true,
        };
        let err = ResponseScheduler::default()
            .schedule(
                vec![turn("a", InterestLevel::Low)],
                &mode,
                &mut StdRng::seed_from_u64(0),
            )
            .unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_batch_mode_releases_first_turn_at_base() {
        let scheduler = ResponseScheduler::default();
        let mode = scheduler.config().batch_mode();
        for seed in 0..50 {
            let plan = scheduler
                .schedule(
                    vec![
                        turn("a", InterestLevel::Low),
                        turn("b", InterestLevel::High),
                        turn("c", InterestLevel::Medium),
                    ],
                    &mode,
                    &mut StdRng::seed_from_u64(seed),
                )
                .unwrap();
            assert_eq!(ids(&plan), vec!["a", "b", "c"]);
            assert_eq!(plan.items()[0].delay, Duration::from_secs(2));
            let second = plan.items()[1].delay.as_secs_f64();
            assert!((3.5..=5.0).contains(&second), "{second}");
            let third = plan.items()[2].delay.as_secs_f64();
            assert!((5.0..=8.0).contains(&third), "{third}");
            assert_strictly_increasing(&plan);
        }
    }
}
