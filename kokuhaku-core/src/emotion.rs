//! Emotion engine — applies deltas, derives the relationship stage, and
//! judges confessions.
//!
//! All functions are pure: they take the current vector by value and return
//! a new one, so a failed turn can simply discard the result.

use crate::character::{CharacterProfile, EmotionalProfile};
use crate::config::ConfessionConfig;
use crate::types::{Axis, EmotionDelta, EmotionVector, RelationshipStage};

/// The state every session starts from.
#[must_use]
pub fn initial() -> EmotionVector {
    EmotionVector::INITIAL
}

/// Multiplier the character's profile applies to changes on `axis`.
#[must_use]
pub fn axis_multiplier(axis: Axis, profile: &EmotionalProfile) -> f64 {
    match axis {
        Axis::Mood => 0.5 + profile.moodiness,
        Axis::Trust => profile.trustingness,
        Axis::Tension => 0.5 + profile.shyness,
        Axis::Affection => profile.openness,
        Axis::Interest => 1.0,
    }
}

/// Apply `delta` through the character's emotional profile.
///
/// Each present axis is scaled by [`axis_multiplier`], rounded to the
/// nearest integer (halves away from zero), added, then clamped.
#[must_use]
pub fn apply(
    current: EmotionVector,
    delta: &EmotionDelta,
    profile: &CharacterProfile,
) -> EmotionVector {
    let mut next = current;
    for (axis, value) in delta.iter() {
        let scaled = (f64::from(value) * axis_multiplier(axis, &profile.emotional_profile)).round();
        // Multipliers are at most 1.5, so the scaled value fits in i64.
        #[allow(clippy::cast_possible_truncation)]
        let scaled = scaled as i64;
        next.set(axis, i64::from(current.get(axis)) + scaled);
    }
    next
}

/// Apply `delta` verbatim (no profile scaling), clamping the result.
#[must_use]
pub fn apply_unscaled(current: EmotionVector, delta: &EmotionDelta) -> EmotionVector {
    let mut next = current;
    for (axis, value) in delta.iter() {
        next.set(axis, i64::from(current.get(axis)) + i64::from(value));
    }
    next
}

/// Derive the relationship stage; the first matching rung wins.
#[must_use]
pub fn stage(vector: &EmotionVector) -> RelationshipStage {
    let (aff, trust) = (vector.affection, vector.trust);
    if aff >= 80 && trust >= 70 {
        RelationshipStage::Lover
    } else if aff >= 60 && trust >= 60 {
        RelationshipStage::RomanticInterest
    } else if aff >= 40 && trust >= 50 {
        RelationshipStage::CloseFriend
    } else if aff >= 20 && trust >= 30 {
        RelationshipStage::Friend
    } else if trust >= 15 {
        RelationshipStage::Acquaintance
    } else {
        RelationshipStage::Stranger
    }
}

/// Whether a confession made now would be accepted, with default tuning.
#[must_use]
pub fn confession_successful(vector: &EmotionVector, profile: &CharacterProfile) -> bool {
    confession_successful_with(vector, profile, &ConfessionConfig::default())
}

/// Whether a confession made now would be accepted.
///
/// Requires affection at the character's threshold, trust at
/// `trust_ratio` × threshold, and tension no higher than the ceiling.
#[must_use]
pub fn confession_successful_with(
    vector: &EmotionVector,
    profile: &CharacterProfile,
    config: &ConfessionConfig,
) -> bool {
    let threshold = profile.success_threshold;
    vector.affection >= threshold
        && f64::from(vector.trust) >= f64::from(threshold) * config.trust_ratio
        && vector.tension <= config.tension_ceiling
}

/// Render one ten-cell bar per axis, mood mapped from `[-100, 100]`.
///
/// Bar length rounds to the nearest cell, halves up.
#[must_use]
pub fn visualize(vector: &EmotionVector) -> String {
    Axis::ALL
        .iter()
        .map(|&axis| {
            let value = vector.get(axis);
            let (min, max) = axis.bounds();
            let span = max - min;
            let filled = usize::try_from(((value - min) * 20 + span) / (2 * span)).unwrap_or(0);
            format!(
                "{}: {}{} {value}",
                axis.label(),
                "█".repeat(filled),
                "░".repeat(10 - filled.min(10))
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::Roster;
    use crate::types::Difficulty;
    use std::sync::Arc;

    fn sakura() -> Arc<CharacterProfile> {
        Roster::builtin().get(Difficulty::Easy).expect("easy")
    }

    fn vector(mood: i32, trust: i32, tension: i32, affection: i32, interest: i32) -> EmotionVector {
        EmotionVector {
            mood,
            trust,
            tension,
            affection,
            interest,
        }
    }

    #[test]
    fn apply_scales_by_profile() {
        // さくら: moodiness 0.3, trustingness 0.8, shyness 0.4, openness 0.7.
        let delta = EmotionDelta::new()
            .with(Axis::Mood, 10)
            .with(Axis::Trust, 10)
            .with(Axis::Tension, 10)
            .with(Axis::Affection, 10)
            .with(Axis::Interest, 10);
        let next = apply(initial(), &delta, &sakura());
        assert_eq!(next.mood, 8);
        assert_eq!(next.trust, 18);
        assert_eq!(next.tension, 29);
        assert_eq!(next.affection, 7);
        assert_eq!(next.interest, 40);
    }

    #[test]
    fn apply_rounds_halves_away_from_zero() {
        // 5 × 0.7 = 3.5 → 4; -5 × 0.7 = -3.5 → -4.
        let profile = sakura();
        let up = apply(vector(0, 50, 50, 50, 50), &EmotionDelta::new().with(Axis::Affection, 5), &profile);
        let down = apply(vector(0, 50, 50, 50, 50), &EmotionDelta::new().with(Axis::Affection, -5), &profile);
        assert_eq!(up.affection, 54);
        assert_eq!(down.affection, 46);
    }

    #[test]
    fn apply_clamps_and_leaves_absent_axes() {
        let next = apply(
            initial(),
            &EmotionDelta::new().with(Axis::Affection, -50),
            &sakura(),
        );
        assert_eq!(next.affection, 0);
        assert_eq!(next.trust, initial().trust);
        assert_eq!(next.mood, initial().mood);
    }

    #[test]
    fn apply_unscaled_adds_verbatim() {
        let next = apply_unscaled(initial(), &EmotionDelta::new().with(Axis::Affection, 70));
        assert_eq!(next.affection, 70);
        let capped = apply_unscaled(next, &EmotionDelta::new().with(Axis::Affection, 70));
        assert_eq!(capped.affection, 100);
    }

    #[test]
    fn stage_ladder_first_match_wins() {
        assert_eq!(stage(&initial()), RelationshipStage::Stranger);
        assert_eq!(stage(&vector(0, 15, 0, 0, 0)), RelationshipStage::Acquaintance);
        assert_eq!(stage(&vector(0, 30, 0, 20, 0)), RelationshipStage::Friend);
        assert_eq!(stage(&vector(0, 50, 0, 40, 0)), RelationshipStage::CloseFriend);
        assert_eq!(stage(&vector(0, 60, 0, 60, 0)), RelationshipStage::RomanticInterest);
        assert_eq!(stage(&vector(0, 70, 0, 80, 0)), RelationshipStage::Lover);
        // High affection alone is not enough.
        assert_eq!(stage(&vector(0, 10, 0, 100, 0)), RelationshipStage::Stranger);
    }

    #[test]
    fn confession_gate_boundaries() {
        let profile = sakura();
        // threshold 60 → trust ≥ 36, tension ≤ 70.
        assert!(confession_successful(&vector(0, 36, 70, 60, 0), &profile));
        assert!(!confession_successful(&vector(0, 36, 70, 59, 0), &profile));
        assert!(!confession_successful(&vector(0, 35, 70, 60, 0), &profile));
        assert!(!confession_successful(&vector(0, 36, 71, 60, 0), &profile));
    }

    #[test]
    fn confession_tuning_is_configurable() {
        let profile = sakura();
        let strict = ConfessionConfig {
            tension_ceiling: 30,
            trust_ratio: 1.0,
            ..ConfessionConfig::default()
        };
        let v = vector(0, 50, 20, 70, 0);
        assert!(confession_successful(&v, &profile));
        assert!(!confession_successful_with(&v, &profile, &strict));
    }

    #[test]
    fn visualize_draws_one_bar_per_axis() {
        let out = visualize(&vector(-100, 100, 50, 0, 30));
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 5);
        assert!(lines[0].starts_with("気分: ░░░░░░░░░░"));
        assert!(lines[1].contains("██████████"));
        assert!(lines[2].contains("█████░░░░░"));
        assert!(lines[4].contains("███░░░░░░░ 30"));
    }

    #[test]
    fn visualize_rounds_bar_length() {
        let bar = |v: EmotionVector, row: usize| visualize(&v).lines().nth(row).map(str::to_string);
        assert_eq!(bar(vector(0, 10, 20, 5, 30), 3).as_deref(), Some("好感度: █░░░░░░░░░ 5"));
        assert_eq!(bar(vector(0, 10, 20, 4, 30), 3).as_deref(), Some("好感度: ░░░░░░░░░░ 4"));
        assert_eq!(bar(vector(-90, 10, 20, 0, 30), 0).as_deref(), Some("気分: █░░░░░░░░░ -90"));
        assert_eq!(bar(vector(-91, 10, 20, 0, 30), 0).as_deref(), Some("気分: ░░░░░░░░░░ -91"));
        assert_eq!(bar(vector(0, 10, 20, 95, 30), 3).as_deref(), Some("好感度: ██████████ 95"));
    }
}
