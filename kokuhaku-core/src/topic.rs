//! Topic reactor — keyword-driven emotion deltas from the user's words.
//!
//! Two keyword tables live here. A character's own [`TopicReaction`]s decide
//! how the input moves the emotion vector; the fixed [`TopicCatalogue`] only
//! tags ledger entries so conversation flow can be analysed afterwards.

use serde::{Deserialize, Serialize};

use crate::character::{CharacterProfile, TopicReaction, TopicRouting};
use crate::types::{Axis, EmotionDelta};

/// Result of scoring one input against a character's topic reactions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicScore {
    /// Summed, rounded emotion change.
    pub delta: EmotionDelta,
    /// Categories with at least one keyword hit, in profile order.
    pub categories: Vec<String>,
}

/// Score `input` against every topic reaction of `profile`.
///
/// A category fires when at least one keyword appears (case-insensitive
/// substring). Its base value is the positive response when more than half
/// of its keywords matched, otherwise the negative one. Contributions are
/// accumulated per axis as floats and rounded once at the end.
#[must_use]
pub fn score(input: &str, profile: &CharacterProfile) -> TopicScore {
    let lowered = input.to_lowercase();
    let mut totals = [0.0_f64; Axis::ALL.len()];
    let mut touched = [false; Axis::ALL.len()];
    let mut categories = Vec::new();

    for reaction in &profile.topic_reactions {
        let Some(base) = reaction_base(reaction, &lowered) else {
            continue;
        };
        categories.push(reaction.category.clone());
        let base = f64::from(base);
        let mut add = |axis: Axis, value: f64| {
            let idx = axis_index(axis);
            totals[idx] += value;
            touched[idx] = true;
        };
        match reaction.routing() {
            TopicRouting::Relational => {
                add(Axis::Affection, base);
                add(Axis::Trust, (base * 0.5).max(0.0));
            }
            TopicRouting::Intellectual => {
                add(Axis::Interest, base);
                add(Axis::Affection, base * 0.7);
            }
            TopicRouting::Conflict => {
                add(Axis::Mood, base);
                add(Axis::Tension, base.abs());
            }
            TopicRouting::General => add(Axis::Affection, base),
        }
    }

    let mut delta = EmotionDelta::new();
    for axis in Axis::ALL {
        let idx = axis_index(axis);
        if touched[idx] {
            // Per-turn sums are bounded by the handful of configured reactions.
            #[allow(clippy::cast_possible_truncation)]
            delta.set(axis, totals[idx].round() as i32);
        }
    }
    TopicScore { delta, categories }
}

fn reaction_base(reaction: &TopicReaction, lowered_input: &str) -> Option<i32> {
    if reaction.keywords.is_empty() {
        return None;
    }
    let matched = reaction
        .keywords
        .iter()
        .filter(|k| lowered_input.contains(&k.to_lowercase()))
        .count();
    if matched == 0 {
        return None;
    }
    // matched / total > 0.5, kept in integers.
    if matched * 2 > reaction.keywords.len() {
        Some(reaction.positive_response)
    } else {
        Some(reaction.negative_response)
    }
}

fn axis_index(axis: Axis) -> usize {
    Axis::ALL.iter().position(|&a| a == axis).unwrap_or(0)
}

// ---------------------------------------------------------------------------
// Topic catalogue
// ---------------------------------------------------------------------------

/// Fixed catalogue of conversation categories used to tag ledger entries.
pub struct TopicCatalogue;

impl TopicCatalogue {
    /// `(category, keywords)` in detection order.
    pub const CATEGORIES: &'static [(&'static str, &'static [&'static str])] = &[
        ("料理・食べ物", &["料理", "食べ物", "レシピ", "美味しい", "手作り", "食事", "食べる", "ご飯", "お菓子"]),
        ("家族", &["家族", "兄弟", "姉妹", "両親", "実家", "お母さん", "お父さん", "家"]),
        ("自然・動物", &["自然", "動物", "花", "散歩", "ペット", "犬", "猫", "鳥", "植物"]),
        ("学習・知識", &["勉強", "本", "知識", "学習", "成績", "学校", "授業", "テスト"]),
        ("芸術・文化", &["音楽", "美術", "文学", "クラシック", "芸術", "映画", "絵画"]),
        ("科学・学術", &["科学", "研究", "論文", "実験", "理論", "数学", "物理", "化学"]),
        ("哲学・思想", &["哲学", "思想", "倫理", "論理", "合理的", "考える", "意味"]),
        ("感情・気持ち", &["嬉しい", "悲しい", "楽しい", "つらい", "好き", "嫌い", "感動"]),
        ("将来・夢", &["将来", "夢", "目標", "希望", "計画", "やりたい", "なりたい"]),
        ("友人関係", &["友達", "友人", "仲間", "一緒", "みんな", "クラス", "同級生"]),
        ("恋愛", &["恋愛", "好き", "愛", "付き合う", "デート", "恋人", "気持ち", "告白"]),
        ("趣味・娯楽", &["趣味", "楽しい", "ゲーム", "スポーツ", "読書", "映画鑑賞", "音楽鑑賞"]),
        ("日常生活", &["毎日", "普段", "生活", "日常", "いつも", "習慣", "ルーティン"]),
    ];

    /// Interest fragments mapped onto catalogue categories, first hit wins.
    pub const INTEREST_TOPICS: &'static [(&'static str, &'static str)] = &[
        ("料理", "料理・食べ物"),
        ("散歩", "自然・動物"),
        ("動物", "自然・動物"),
        ("読書", "学習・知識"),
        ("ガーデニング", "自然・動物"),
        ("クラシック音楽", "芸術・文化"),
        ("美術館", "芸術・文化"),
        ("科学", "科学・学術"),
        ("哲学", "哲学・思想"),
        ("チェス", "趣味・娯楽"),
    ];

    /// Categories mentioned in `input`, in catalogue order.
    #[must_use]
    pub fn detect(input: &str) -> Vec<String> {
        let lowered = input.to_lowercase();
        Self::CATEGORIES
            .iter()
            .filter(|(_, keywords)| keywords.iter().any(|k| lowered.contains(k)))
            .map(|(category, _)| (*category).to_string())
            .collect()
    }

    /// Catalogue category an interest description belongs to, if any.
    #[must_use]
    pub fn topic_for_interest(interest: &str) -> Option<&'static str> {
        Self::INTEREST_TOPICS
            .iter()
            .find(|(fragment, _)| interest.contains(fragment))
            .map(|(_, topic)| *topic)
    }
}
