//! Shared fixtures for the kokuhaku benchmark suite.

#![warn(missing_docs)]

use kokuhaku_core::ledger::{ConversationEntry, ConversationLedger};
use kokuhaku_core::{EmotionDelta, EmotionVector};

/// User lines cycled through when filling a ledger.
pub const SAMPLE_INPUTS: &[&str] = &[
    "家族と実家に帰ったよ",
    "手作りのお菓子のレシピを教えて",
    "散歩の途中で花を見つけた",
    "今日は勉強を頑張った",
    "将来の夢について話そう",
];

/// A model reply with tags, leaked prompt text, and stray blank lines.
pub const NOISY_REPLY: &str = "えへへ、嬉しいな♪ [MOOD:+5] [AFFECTION:+3]\n\n\n\
# 現在の感情状態\nシステム: 設定に従ってください\n[TRUST:+2] また話そうね  ";

/// A ledger filled to `len` entries with mild positive deltas.
#[must_use]
pub fn filled_ledger(len: usize) -> ConversationLedger {
    let mut ledger = ConversationLedger::new(len.max(1));
    for (i, input) in SAMPLE_INPUTS.iter().cycle().take(len).enumerate() {
        let turn = u32::try_from(i + 1).unwrap_or(u32::MAX);
        let delta = EmotionDelta {
            mood: Some(2),
            affection: Some(3),
            ..EmotionDelta::new()
        };
        ledger.push(ConversationEntry::new(turn, *input, "うんうん、それで？", delta));
    }
    ledger
}

/// A mid-game emotion vector.
#[must_use]
pub fn warm_vector() -> EmotionVector {
    EmotionVector {
        mood: 30,
        trust: 45,
        tension: 25,
        affection: 40,
        interest: 55,
    }
}
