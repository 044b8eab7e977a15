//! Core type definitions for the confession-game state machine.
//!
//! All types are serializable so front ends can ship snapshots as JSON.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Emotion Axes
// ---------------------------------------------------------------------------

/// One of the five independent emotion axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    /// Momentary mood, the only signed axis.
    Mood,
    /// How much the character trusts the user.
    Trust,
    /// Nervousness; high tension blocks a confession.
    Tension,
    /// Romantic fondness, the axis a confession is judged on.
    Affection,
    /// Curiosity about the user and the conversation.
    Interest,
}

impl Axis {
    /// All axes in canonical order (the order tags are emitted in).
    pub const ALL: [Self; 5] = [
        Self::Mood,
        Self::Trust,
        Self::Tension,
        Self::Affection,
        Self::Interest,
    ];

    /// Inclusive `(min, max)` bounds of this axis.
    #[must_use]
    pub fn bounds(self) -> (i32, i32) {
        match self {
            Self::Mood => (-100, 100),
            Self::Trust | Self::Tension | Self::Affection | Self::Interest => (0, 100),
        }
    }

    /// Upper-case name used in `[AXIS:±N]` tags.
    #[must_use]
    pub fn tag_name(self) -> &'static str {
        match self {
            Self::Mood => "MOOD",
            Self::Trust => "TRUST",
            Self::Tension => "TENSION",
            Self::Affection => "AFFECTION",
            Self::Interest => "INTEREST",
        }
    }

    /// Japanese label shown in prompts and status views.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Mood => "気分",
            Self::Trust => "信頼度",
            Self::Tension => "緊張度",
            Self::Affection => "好感度",
            Self::Interest => "興味度",
        }
    }

    /// Clamp a raw value into this axis' bounds.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn clamp(self, value: i64) -> i32 {
        let (min, max) = self.bounds();
        // Bounds fit in i32, so the narrowing after the clamp is lossless.
        value.clamp(i64::from(min), i64::from(max)) as i32
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Mood => "mood",
            Self::Trust => "trust",
            Self::Tension => "tension",
            Self::Affection => "affection",
            Self::Interest => "interest",
        };
        write!(f, "{name}")
    }
}

// ---------------------------------------------------------------------------
// Emotion Vector
// ---------------------------------------------------------------------------

/// The character's five-axis emotional state toward the user.
///
/// Every field always lies within its [`Axis::bounds`]; the only way to change
/// it is through the engine functions in [`crate::emotion`], which clamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EmotionVector {
    /// Mood, -100 (awful) to 100 (elated).
    pub mood: i32,
    /// Trust, 0 (wary) to 100 (complete trust).
    pub trust: i32,
    /// Tension, 0 (relaxed) to 100 (very nervous).
    pub tension: i32,
    /// Affection, 0 (indifferent) to 100 (deeply in love).
    pub affection: i32,
    /// Interest, 0 (bored) to 100 (fascinated).
    pub interest: i32,
}

impl EmotionVector {
    /// The state every session starts from.
    pub const INITIAL: Self = Self {
        mood: 0,
        trust: 10,
        tension: 20,
        affection: 0,
        interest: 30,
    };

    /// Read one axis.
    #[must_use]
    pub fn get(&self, axis: Axis) -> i32 {
        match axis {
            Axis::Mood => self.mood,
            Axis::Trust => self.trust,
            Axis::Tension => self.tension,
            Axis::Affection => self.affection,
            Axis::Interest => self.interest,
        }
    }

    /// Write one axis, clamping into bounds.
    pub fn set(&mut self, axis: Axis, value: i64) {
        let value = axis.clamp(value);
        match axis {
            Axis::Mood => self.mood = value,
            Axis::Trust => self.trust = value,
            Axis::Tension => self.tension = value,
            Axis::Affection => self.affection = value,
            Axis::Interest => self.interest = value,
        }
    }

    /// A copy with every axis clamped into bounds.
    #[must_use]
    pub fn clamped(&self) -> Self {
        let mut out = *self;
        for axis in Axis::ALL {
            out.set(axis, i64::from(self.get(axis)));
        }
        out
    }

    /// Whether every axis lies within its bounds.
    #[must_use]
    pub fn is_within_bounds(&self) -> bool {
        Axis::ALL.iter().all(|&axis| {
            let (min, max) = axis.bounds();
            (min..=max).contains(&self.get(axis))
        })
    }
}

impl Default for EmotionVector {
    fn default() -> Self {
        Self::INITIAL
    }
}

// ---------------------------------------------------------------------------
// Emotion Delta
// ---------------------------------------------------------------------------

/// A partial set of signed per-axis changes.
///
/// Absent axes are distinct from zero-valued ones only for bookkeeping (the
/// ledger's trend analysis counts turns that carried an affection key); when
/// applied, both leave the axis untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EmotionDelta {
    /// Mood change.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mood: Option<i32>,
    /// Trust change.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trust: Option<i32>,
    /// Tension change.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tension: Option<i32>,
    /// Affection change.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affection: Option<i32>,
    /// Interest change.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interest: Option<i32>,
}

impl EmotionDelta {
    /// An empty delta.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: set one axis.
    #[must_use]
    pub fn with(mut self, axis: Axis, value: i32) -> Self {
        self.set(axis, value);
        self
    }

    /// Read one axis, `None` when absent.
    #[must_use]
    pub fn get(&self, axis: Axis) -> Option<i32> {
        match axis {
            Axis::Mood => self.mood,
            Axis::Trust => self.trust,
            Axis::Tension => self.tension,
            Axis::Affection => self.affection,
            Axis::Interest => self.interest,
        }
    }

    fn slot(&mut self, axis: Axis) -> &mut Option<i32> {
        match axis {
            Axis::Mood => &mut self.mood,
            Axis::Trust => &mut self.trust,
            Axis::Tension => &mut self.tension,
            Axis::Affection => &mut self.affection,
            Axis::Interest => &mut self.interest,
        }
    }

    /// Overwrite one axis.
    pub fn set(&mut self, axis: Axis, value: i32) {
        *self.slot(axis) = Some(value);
    }

    /// Add to one axis, treating an absent axis as zero.
    pub fn add(&mut self, axis: Axis, value: i32) {
        let slot = self.slot(axis);
        *slot = Some(slot.unwrap_or(0).saturating_add(value));
    }

    /// Whether no axis is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        Axis::ALL.iter().all(|&axis| self.get(axis).is_none())
    }

    /// Present axes in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (Axis, i32)> + '_ {
        Axis::ALL
            .into_iter()
            .filter_map(|axis| self.get(axis).map(|v| (axis, v)))
    }

    /// Axis-wise sum over the union of present axes (missing = 0).
    ///
    /// Commutative and associative: both influences compound rather than
    /// average.
    #[must_use]
    pub fn merge(&self, other: &Self) -> Self {
        let mut out = *self;
        for (axis, value) in other.iter() {
            out.add(axis, value);
        }
        out
    }

    /// Scale every present axis by `factor`, rounding toward zero.
    #[must_use]
    pub fn scaled(&self, factor: f64) -> Self {
        let mut out = Self::new();
        for (axis, value) in self.iter() {
            // Factors used by the game are in [0, 1]; the product stays in range.
            #[allow(clippy::cast_possible_truncation)]
            let scaled = (f64::from(value) * factor).trunc() as i32;
            out.set(axis, scaled);
        }
        out
    }

    /// Sum of absolute values over present axes.
    #[must_use]
    pub fn magnitude(&self) -> i64 {
        self.iter().map(|(_, v)| i64::from(v).abs()).sum()
    }

    /// Render as `[AXIS:±N]` tags in canonical order, space separated.
    #[must_use]
    pub fn to_tags(&self) -> String {
        self.iter()
            .map(|(axis, v)| format!("[{}:{v:+}]", axis.tag_name()))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

// ---------------------------------------------------------------------------
// Relationship Stage
// ---------------------------------------------------------------------------

/// Discrete classification of the emotion vector, least to most advanced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipStage {
    /// First meeting, guarded.
    Stranger,
    /// Knows the user a little.
    Acquaintance,
    /// Comfortable, casual friendship.
    Friend,
    /// Shares personal matters.
    CloseFriend,
    /// Has started to see the user romantically.
    RomanticInterest,
    /// A couple.
    Lover,
}

impl RelationshipStage {
    /// All stages in ascending order.
    pub const ALL: [Self; 6] = [
        Self::Stranger,
        Self::Acquaintance,
        Self::Friend,
        Self::CloseFriend,
        Self::RomanticInterest,
        Self::Lover,
    ];

    /// Machine name (`close_friend`, …).
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stranger => "stranger",
            Self::Acquaintance => "acquaintance",
            Self::Friend => "friend",
            Self::CloseFriend => "close_friend",
            Self::RomanticInterest => "romantic_interest",
            Self::Lover => "lover",
        }
    }

    /// Short Japanese label for status displays.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Stranger => "初対面",
            Self::Acquaintance => "知り合い",
            Self::Friend => "友達",
            Self::CloseFriend => "親友",
            Self::RomanticInterest => "特別な人",
            Self::Lover => "恋人",
        }
    }
}

impl fmt::Display for RelationshipStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Difficulty
// ---------------------------------------------------------------------------

/// Difficulty tier; each tier maps to exactly one character in a roster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    /// Beginner character.
    Easy,
    /// Intermediate character.
    Medium,
    /// Expert character.
    Hard,
}

impl Difficulty {
    /// All tiers, easiest first.
    pub const ALL: [Self; 3] = [Self::Easy, Self::Medium, Self::Hard];

    /// Lower-case name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" | "1" => Ok(Self::Easy),
            "medium" | "2" => Ok(Self::Medium),
            "hard" | "3" => Ok(Self::Hard),
            _ => Err(CoreError::UnknownDifficulty(s.to_string())),
        }
    }
}
