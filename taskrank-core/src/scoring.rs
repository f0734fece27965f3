//! Composite priority score.
//!
//! total = urgency 40% + importance 35% + duration 15% + dependency 10%
//!
//! Every sub-score lives in 0..=100 and the weights sum to 1.0, so the total
//! does too. The curves are total functions: out-of-range inputs (importance
//! outside 1..=5, zero estimates) are the caller's problem and simply produce
//! out-of-range scores.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const URGENCY_WEIGHT: f64 = 0.40;
pub const IMPORTANCE_WEIGHT: f64 = 0.35;
pub const DURATION_WEIGHT: f64 = 0.15;
pub const DEPENDENCY_WEIGHT: f64 = 0.10;

/// Level thresholds (inclusive lower bounds).
pub const RED_THRESHOLD: f64 = 65.0;
pub const YELLOW_THRESHOLD: f64 = 40.0;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Round half away from zero to 2 decimals.
pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Fractional days between `now` and `due`. Negative once past due.
pub fn days_until(due: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    (due - now).num_milliseconds() as f64 / 1000.0 / SECONDS_PER_DAY
}

/// Urgency (0-100) against an explicit `now`.
///
/// - past due: 100
/// - 0..=3 days: 100 -> 70
/// - 3..=7 days: 70 -> 45
/// - 7..=14 days: 45 -> 25
/// - beyond: 25 decaying exponentially, floored at 10
pub fn urgency_score_at(due: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let days_left = days_until(due, now);

    let score = if days_left <= 0.0 {
        100.0
    } else if days_left <= 3.0 {
        100.0 - 30.0 * (days_left / 3.0)
    } else if days_left <= 7.0 {
        70.0 - 25.0 * ((days_left - 3.0) / 4.0)
    } else if days_left <= 14.0 {
        45.0 - 20.0 * ((days_left - 7.0) / 7.0)
    } else {
        (25.0 * (-0.05 * (days_left - 14.0)).exp()).max(10.0)
    };

    round2(score)
}

/// Urgency against the real clock.
pub fn urgency_score(due: DateTime<Utc>) -> f64 {
    urgency_score_at(due, Utc::now())
}

/// 1 -> 20 ... 5 -> 100.
pub fn importance_score(importance: u8) -> f64 {
    f64::from(importance) * 20.0
}

/// Shorter work scores higher. No estimate is neutral (50).
pub fn duration_score(estimated_minutes: Option<u32>) -> f64 {
    let Some(minutes) = estimated_minutes else {
        return 50.0;
    };

    match minutes {
        m if m <= 15 => 100.0,
        m if m <= 30 => 90.0,
        m if m <= 60 => 80.0,
        m if m <= 120 => 65.0,
        m if m <= 240 => 45.0,
        m if m <= 480 => 30.0,
        _ => 20.0,
    }
}

/// 10 when an unfinished blocker exists, otherwise 100.
pub fn dependency_score(has_incomplete_blocker: bool) -> f64 {
    if has_incomplete_blocker { 10.0 } else { 100.0 }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriorityLevel {
    Red,
    Yellow,
    Green,
}

impl PriorityLevel {
    pub fn from_score(total: f64) -> Self {
        if total >= RED_THRESHOLD {
            PriorityLevel::Red
        } else if total >= YELLOW_THRESHOLD {
            PriorityLevel::Yellow
        } else {
            PriorityLevel::Green
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PriorityLevel::Red => "red",
            PriorityLevel::Yellow => "yellow",
            PriorityLevel::Green => "green",
        }
    }
}

impl fmt::Display for PriorityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Traffic-light classification of an already computed total.
pub fn priority_level(total: f64) -> PriorityLevel {
    PriorityLevel::from_score(total)
}

/// Per-factor scores for display. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub urgency: f64,
    pub importance: f64,
    pub duration: f64,
    pub dependency: f64,
    pub total: f64,
}

impl ScoreBreakdown {
    pub fn level(&self) -> PriorityLevel {
        PriorityLevel::from_score(self.total)
    }
}

/// Composite score against an explicit `now`. Returns `(total, breakdown)`.
pub fn calculate_priority_score_at(
    due: DateTime<Utc>,
    importance: u8,
    estimated_minutes: Option<u32>,
    has_incomplete_blocker: bool,
    now: DateTime<Utc>,
) -> (f64, ScoreBreakdown) {
    let urgency = urgency_score_at(due, now);
    let importance = importance_score(importance);
    let duration = duration_score(estimated_minutes);
    let dependency = dependency_score(has_incomplete_blocker);

    let total = round2(
        urgency * URGENCY_WEIGHT
            + importance * IMPORTANCE_WEIGHT
            + duration * DURATION_WEIGHT
            + dependency * DEPENDENCY_WEIGHT,
    );

    let breakdown = ScoreBreakdown {
        urgency: round2(urgency),
        importance: round2(importance),
        duration: round2(duration),
        dependency: round2(dependency),
        total,
    };

    (total, breakdown)
}

/// Composite score against the real clock.
pub fn calculate_priority_score(
    due: DateTime<Utc>,
    importance: u8,
    estimated_minutes: Option<u32>,
    has_incomplete_blocker: bool,
) -> (f64, ScoreBreakdown) {
    calculate_priority_score_at(
        due,
        importance,
        estimated_minutes,
        has_incomplete_blocker,
        Utc::now(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap()
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn urgency_saturates_at_or_past_due() {
        let now = now();
        assert_eq!(urgency_score_at(now, now), 100.0);
        assert_eq!(urgency_score_at(now - Duration::days(30), now), 100.0);
    }

    #[test]
    fn urgency_hits_each_boundary() {
        let now = now();
        assert!(close(urgency_score_at(now + Duration::days(2), now), 80.0));
        assert!(close(urgency_score_at(now + Duration::days(3), now), 70.0));
        assert!(close(urgency_score_at(now + Duration::days(5), now), 57.5));
        assert!(close(urgency_score_at(now + Duration::days(7), now), 45.0));
        assert!(close(urgency_score_at(now + Duration::days(14), now), 25.0));
    }

    #[test]
    fn urgency_is_continuous_around_boundaries() {
        let now = now();
        for day in [3, 7, 14] {
            let before = urgency_score_at(now + Duration::days(day) - Duration::seconds(1), now);
            let after = urgency_score_at(now + Duration::days(day) + Duration::seconds(1), now);
            assert!((before - after).abs() <= 0.02, "jump at {day}: {before} vs {after}");
        }
        let just_due = urgency_score_at(now + Duration::seconds(1), now);
        assert!((100.0 - just_due).abs() <= 0.01);
    }

    #[test]
    fn urgency_is_monotonic_and_bounded() {
        let now = now();
        let mut prev = f64::INFINITY;
        for hours in (-48..=24 * 120).step_by(7) {
            let u = urgency_score_at(now + Duration::hours(hours), now);
            assert!((0.0..=100.0).contains(&u));
            assert!(u <= prev, "urgency rose at {hours}h: {prev} -> {u}");
            prev = u;
        }
    }

    #[test]
    fn urgency_floor_is_ten() {
        let now = now();
        assert_eq!(urgency_score_at(now + Duration::days(365), now), 10.0);
    }

    #[test]
    fn importance_mapping_is_linear() {
        let got: Vec<f64> = (1..=5).map(importance_score).collect();
        assert_eq!(got, vec![20.0, 40.0, 60.0, 80.0, 100.0]);
    }

    #[test]
    fn duration_steps() {
        assert_eq!(duration_score(None), 50.0);
        assert_eq!(duration_score(Some(15)), 100.0);
        assert_eq!(duration_score(Some(16)), 90.0);
        assert_eq!(duration_score(Some(60)), 80.0);
        assert_eq!(duration_score(Some(120)), 65.0);
        assert_eq!(duration_score(Some(240)), 45.0);
        assert_eq!(duration_score(Some(480)), 30.0);
        assert_eq!(duration_score(Some(481)), 20.0);

        let mut prev = f64::INFINITY;
        for m in 1..=600 {
            let d = duration_score(Some(m));
            assert!(d <= prev);
            prev = d;
        }
    }

    #[test]
    fn dependency_penalty() {
        assert_eq!(dependency_score(true), 10.0);
        assert_eq!(dependency_score(false), 100.0);
    }

    #[test]
    fn level_thresholds() {
        assert_eq!(priority_level(65.0), PriorityLevel::Red);
        assert_eq!(priority_level(64.99), PriorityLevel::Yellow);
        assert_eq!(priority_level(40.0), PriorityLevel::Yellow);
        assert_eq!(priority_level(39.99), PriorityLevel::Green);
        assert_eq!(PriorityLevel::Red.as_str(), "red");
    }

    #[test]
    fn two_days_out_quick_important_task_is_red() {
        let now = now();
        let (total, b) =
            calculate_priority_score_at(now + Duration::days(2), 5, Some(20), false, now);

        assert!(close(b.urgency, 80.0));
        assert!(close(b.importance, 100.0));
        assert!(close(b.duration, 90.0));
        assert!(close(b.dependency, 100.0));
        assert!(close(total, 90.5));
        assert_eq!(b.total, total);
        assert_eq!(b.level(), PriorityLevel::Red);
    }

    #[test]
    fn blocked_far_off_task_is_green() {
        let now = now();
        let (total, b) =
            calculate_priority_score_at(now + Duration::days(60), 1, Some(600), true, now);
        // 10*.4 + 20*.35 + 20*.15 + 10*.1
        assert!(close(total, 15.0));
        assert_eq!(b.level(), PriorityLevel::Green);
    }

    #[test]
    fn total_is_weighted_sum_and_bounded() {
        let now = now();
        for days in [-1, 0, 1, 4, 9, 20, 90] {
            for importance in 1..=5u8 {
                for estimate in [None, Some(10), Some(45), Some(500)] {
                    for blocked in [false, true] {
                        let (total, b) = calculate_priority_score_at(
                            now + Duration::days(days),
                            importance,
                            estimate,
                            blocked,
                            now,
                        );
                        let expected = round2(
                            b.urgency * URGENCY_WEIGHT
                                + b.importance * IMPORTANCE_WEIGHT
                                + b.duration * DURATION_WEIGHT
                                + b.dependency * DEPENDENCY_WEIGHT,
                        );
                        assert!(close(total, expected));
                        assert!((0.0..=100.0).contains(&total));
                    }
                }
            }
        }
    }

    #[test]
    fn breakdown_serializes_with_plain_names() {
        let now = now();
        let (_, b) = calculate_priority_score_at(now, 3, None, false, now);
        let v = serde_json::to_value(b).unwrap();
        assert_eq!(v["urgency"], 100.0);
        assert_eq!(v["duration"], 50.0);
        assert!(v.get("total").is_some());
    }
}
