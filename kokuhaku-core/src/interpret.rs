//! Response interpreter — reads the emotion side channel out of a model reply
//! and cleans the reply for display.
//!
//! The model is asked to embed `[AXIS:±N]` tags and, on a confession, the
//! `[CONFESSION_DETECTED]` marker. Nothing here trusts that it did so
//! correctly: malformed tags are ignored, leaked prompt fragments are
//! removed, and an empty result is replaced with a neutral filler line.

use std::sync::LazyLock;

use rand::Rng;
use rand::seq::SliceRandom;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::types::{Axis, EmotionDelta};

/// Literal marker the model emits when the user confessed.
pub const CONFESSION_MARKER: &str = "[CONFESSION_DETECTED]";

/// Neutral lines shown when a reply is empty after cleaning.
pub const FILLER_REPLIES: &[&str] = &["うん…", "そっか", "えっと…", "なるほどね", "ふふっ"];

static EMOTION_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\[(MOOD|TRUST|TENSION|AFFECTION|INTEREST):([+-]?\d+)\]")
        .expect("emotion tag pattern is valid")
});

static CONFESSION_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\[CONFESSION_DETECTED\]").expect("confession tag pattern is valid")
});

/// Prompt fragments a model sometimes echoes back, removed to end of line.
static LEAKAGE: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?m)システム[:：].*$",
        r"(?im)^[ \t]*system[:：].*$",
        r"(?m)# (?:キャラクター設定|現在の|会話履歴|行動指針|感情表現ルール|応答の長さ|重要な指示).*$",
        r"(?m)^.*として.*応答してください.*$",
        r"(?m)^\*.*\*$",
        r"(?m)^##.*$",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("leakage pattern is valid"))
    .collect()
});

static TRAILING_SPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)[ \t\x{3000}]+$").expect("trailing space pattern is valid"));

static BLANK_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("blank run pattern is valid"));

/// Everything the orchestrator needs from one reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interpretation {
    /// Emotion change the model asked for.
    pub delta: EmotionDelta,
    /// Whether the confession marker was present.
    pub confession: bool,
    /// Cleaned text for display.
    pub display: String,
}

/// Extract, detect, and clean in one pass.
pub fn interpret<R: Rng + ?Sized>(text: &str, rng: &mut R) -> Interpretation {
    Interpretation {
        delta: extract_delta(text),
        confession: detect_confession(text),
        display: clean(text, rng),
    }
}

/// Read `[AXIS:±N]` tags, first valid occurrence per axis.
///
/// A bare `[MOOD:N]` also sets affection when no affection tag is present,
/// for models prompted with the older single-tag format.
#[must_use]
pub fn extract_delta(text: &str) -> EmotionDelta {
    let mut delta = EmotionDelta::new();
    for caps in EMOTION_TAG.captures_iter(text) {
        let Some(axis) = axis_from_tag(&caps[1]) else {
            continue;
        };
        if delta.get(axis).is_some() {
            continue;
        }
        match caps[2].parse::<i32>() {
            Ok(value) => delta.set(axis, value),
            Err(_) => trace!(tag = &caps[0], "Ignoring out-of-range emotion tag"),
        }
    }
    if delta.affection.is_none() {
        delta.affection = delta.mood;
    }
    delta
}

fn axis_from_tag(tag: &str) -> Option<Axis> {
    Axis::ALL
        .into_iter()
        .find(|axis| axis.tag_name().eq_ignore_ascii_case(tag))
}

/// Whether the reply carries the confession marker (exact, case-sensitive).
#[must_use]
pub fn detect_confession(text: &str) -> bool {
    text.contains(CONFESSION_MARKER)
}

/// Remove tags and leaked prompt text, collapse blank runs, and trim.
///
/// Applied until nothing changes, so removing one fragment can never expose
/// another that survives.
#[must_use]
pub fn strip(text: &str) -> String {
    let mut current = text.to_string();
    loop {
        let next = strip_once(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn strip_once(text: &str) -> String {
    let mut out = EMOTION_TAG.replace_all(text, "").into_owned();
    out = CONFESSION_TAG.replace_all(&out, "").into_owned();
    for pattern in LEAKAGE.iter() {
        out = pattern.replace_all(&out, "").into_owned();
    }
    out = TRAILING_SPACE.replace_all(&out, "").into_owned();
    out = BLANK_RUN.replace_all(&out, "\n\n").into_owned();
    out.trim().to_string()
}

/// [`strip`], substituting a random filler line when fewer than two
/// characters survive. Idempotent.
pub fn clean<R: Rng + ?Sized>(text: &str, rng: &mut R) -> String {
    let stripped = strip(text);
    if stripped.chars().count() >= 2 {
        return stripped;
    }
    FILLER_REPLIES
        .choose(rng)
        .copied()
        .unwrap_or("うん…")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    #[test]
    fn extracts_signed_and_unsigned_values() {
        let d = extract_delta("そうなんだ [MOOD:+3] [trust:2] [TENSION:-4]");
        assert_eq!(d.mood, Some(3));
        assert_eq!(d.trust, Some(2));
        assert_eq!(d.tension, Some(-4));
        assert_eq!(d.interest, None);
    }

    #[test]
    fn first_occurrence_per_axis_wins() {
        let d = extract_delta("[AFFECTION:+1] [AFFECTION:+9]");
        assert_eq!(d.affection, Some(1));
    }

    #[test]
    fn legacy_mood_fills_missing_affection() {
        let d = extract_delta("[MOOD:+5]");
        assert_eq!(d.mood, Some(5));
        assert_eq!(d.affection, Some(5));

        let d = extract_delta("[MOOD:+5] [AFFECTION:-2]");
        assert_eq!(d.affection, Some(-2));
    }

    #[test]
    fn malformed_tags_are_ignored() {
        let d = extract_delta("[MOOD:+] [TRUST:abc] [LOVE:+5] [INTEREST:99999999999] [INTEREST:+2]");
        assert_eq!(d.mood, None);
        assert_eq!(d.trust, None);
        assert_eq!(d.interest, Some(2));
        assert_eq!(d.affection, None);
    }

    #[test]
    fn confession_marker_is_case_sensitive() {
        assert!(detect_confession("え…！[CONFESSION_DETECTED]"));
        assert!(!detect_confession("[confession_detected]"));
        assert!(!detect_confession("CONFESSION_DETECTED"));
    }

    #[test]
    fn strip_removes_tags_and_leakage() {
        let raw = "システム: 応答します\n# 現在の状況\n## 関係性\n*微笑む*\n\n\n\nそうなんだ…すごいね [MOOD:+3] [INTEREST:+2]\n[CONFESSION_DETECTED]";
        assert_eq!(strip(raw), "そうなんだ…すごいね");
    }

    #[test]
    fn strip_removes_meta_instructions() {
        let raw = "さくらとして、上記の発言に応答してください:\nうん、いいよ！";
        assert_eq!(strip(raw), "うん、いいよ！");
    }

    #[test]
    fn english_system_prefix_only_matches_at_line_start() {
        assert_eq!(strip("System: be kind\nうん"), "うん");
        assert_eq!(strip("  system：hidden\nうん"), "うん");
        assert_eq!(
            strip("the solar system: so big [INTEREST:+2]"),
            "the solar system: so big"
        );
    }

    #[test]
    fn strip_reaches_a_fixpoint_on_nested_tags() {
        assert_eq!(strip("ね[MO[MOOD:+1]OD:+2]"), "ね");
        assert_eq!(strip("*a*システム: 漏れ"), "");
    }

    #[test]
    fn clean_substitutes_filler_for_empty_replies() {
        let mut r = rng();
        let out = clean("[MOOD:+1] [AFFECTION:+2]", &mut r);
        assert!(FILLER_REPLIES.contains(&out.as_str()));
        assert_eq!(clean(&out, &mut r), out);
    }

    #[test]
    fn fillers_survive_stripping() {
        for filler in FILLER_REPLIES {
            assert_eq!(strip(filler), *filler);
            assert!(filler.chars().count() >= 2);
        }
    }

    #[test]
    fn interpret_bundles_everything() {
        let i = interpret("え…！今、なんて…？[CONFESSION_DETECTED] [TENSION:+5] [AFFECTION:+3]", &mut rng());
        assert!(i.confession);
        assert_eq!(i.delta.tension, Some(5));
        assert_eq!(i.delta.affection, Some(3));
        assert_eq!(i.display, "え…！今、なんて…？");
    }
}
