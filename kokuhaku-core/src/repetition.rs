//! Repetition detection — damp the reward for saying the same thing again.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::config::RepetitionConfig;
use crate::ledger::ConversationLedger;
use crate::types::EmotionDelta;

/// How closely the current input echoes recent ones.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Repetition {
    /// Highest similarity to any input in the window, `0.0..=1.0`.
    pub score: f64,
    /// Whether `score` reached the configured threshold.
    pub is_repetitive: bool,
}

impl Repetition {
    /// No repetition at all.
    pub const NONE: Self = Self {
        score: 0.0,
        is_repetitive: false,
    };
}

/// Compare `input` against the last `config.window` user inputs.
///
/// Exact matches after normalisation score 1.0; anything else scores its
/// character-bigram Dice coefficient.
#[must_use]
pub fn detect(input: &str, ledger: &ConversationLedger, config: &RepetitionConfig) -> Repetition {
    let current = normalize(input);
    if current.is_empty() {
        return Repetition::NONE;
    }
    let score = ledger
        .recent(config.window)
        .map(|entry| similarity(&current, &normalize(&entry.user_input)))
        .fold(0.0_f64, f64::max);
    Repetition {
        score,
        is_repetitive: score >= config.threshold,
    }
}

/// Scale every axis of `delta` by `1 - score`, rounding toward zero.
///
/// Non-repetitive turns pass through untouched.
#[must_use]
pub fn dampen(delta: &EmotionDelta, repetition: &Repetition) -> EmotionDelta {
    if !repetition.is_repetitive {
        return *delta;
    }
    delta.scaled((1.0 - repetition.score).clamp(0.0, 1.0))
}

/// Lowercase and drop whitespace and punctuation (ASCII and CJK alike).
#[must_use]
pub fn normalize(input: &str) -> String {
    input
        .chars()
        .filter(|c| !c.is_whitespace() && !is_punctuation(*c))
        .flat_map(char::to_lowercase)
        .collect()
}

fn is_punctuation(c: char) -> bool {
    c.is_ascii_punctuation()
        || matches!(
            c,
            '、' | '。' | '，' | '．' | '！' | '？' | '「' | '」' | '『' | '』' | '（' | '）'
                | '・' | '…' | '〜' | '～' | '♪' | '☆' | '★'
        )
}

/// Similarity of two normalised strings.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return 1.0;
    }
    let a_grams = bigrams(a);
    let b_grams = bigrams(b);
    let total: usize = a_grams.values().sum::<usize>() + b_grams.values().sum::<usize>();
    if total == 0 {
        return 0.0;
    }
    let shared: usize = a_grams
        .iter()
        .map(|(gram, &n)| n.min(b_grams.get(gram).copied().unwrap_or(0)))
        .sum();
    (2 * shared) as f64 / total as f64
}

fn bigrams(s: &str) -> HashMap<(char, char), usize> {
    let chars: Vec<char> = s.chars().collect();
    let mut grams = HashMap::new();
    for pair in chars.windows(2) {
        *grams.entry((pair[0], pair[1])).or_insert(0) += 1;
    }
    grams
}
