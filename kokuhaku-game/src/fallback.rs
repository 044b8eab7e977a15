//! Canned lines used when the model cannot supply one.

use rand::Rng;
use rand::seq::SliceRandom;

/// Shown when the model call fails; the turn changes nothing else.
pub const FALLBACK_REPLIES: &[&str] = &[
    "ごめんね、ちょっとぼーっとしてた…もう一回言ってくれる？",
    "あれ？今なんて言ったの？",
    "えっと…ちょっと考えごとしてたみたい。もう一度お願い！",
    "ごめん、うまく聞き取れなかったかも…",
];

/// Scripted confession answers for one character.
#[derive(Debug, Clone, Copy)]
pub struct ConfessionLines {
    /// Accepting a confession.
    pub success: &'static [&'static str],
    /// Turning one down.
    pub failure: &'static [&'static str],
}

const SAKURA: ConfessionLines = ConfessionLines {
    success: &[
        "私も...ずっとそう思ってたの！嬉しいです♪",
        "えへへ...実は私もあなたのこと、好きだったんです",
        "わあ...夢みたい！私たち、お付き合いできるんですね♪",
    ],
    failure: &[
        "ごめんなさい...まだ心の準備ができていなくて...",
        "えっと...嬉しいんですが、もう少し時間をください",
        "すみません...今はまだ、お返事できません...",
    ],
};

const AYA: ConfessionLines = ConfessionLines {
    success: &[
        "ば...バカね！そんなの...当然でしょ？ずっと待ってたんだから",
        "ふん！やっと気づいたのね...べ、別に嬉しくなんか...嘘よ、すっごく嬉しい",
        "遅すぎるのよ！でも...まあ、付き合ってあげるわ",
    ],
    failure: &[
        "は...？何よ突然...まだそんな気持ちには...",
        "バカじゃないの？私がそんな簡単に...",
        "ちょっと...まだ早いわよ。そんなに簡単じゃないの",
    ],
};

const MISAKI: ConfessionLines = ConfessionLines {
    success: &[
        "これが恋愛感情の相互作用というものですね...はい、お受けします",
        "論理的に考えて、私たちは相性が良いと思います...はい",
        "あなたとなら...感情的な体験も悪くないかもしれません",
    ],
    failure: &[
        "申し訳ありませんが、まだその段階には至っていないと分析します",
        "論理的に考えて、時期尚早だと思われます",
        "その感情は理解しますが、私にはまだ対応する準備が...",
    ],
};

const GENERIC: ConfessionLines = ConfessionLines {
    success: &["私も同じ気持ちです...よろしくお願いします"],
    failure: &["ごめんなさい...まだそういう気持ちには..."],
};

impl ConfessionLines {
    /// Lines for the character called `name`; unknown names get neutral ones.
    #[must_use]
    pub fn for_character(name: &str) -> &'static Self {
        match name {
            "さくら" => &SAKURA,
            "あや" => &AYA,
            "みさき" => &MISAKI,
            _ => &GENERIC,
        }
    }

    /// Draw one line for the given result.
    pub fn pick<R: Rng + ?Sized>(&self, accepted: bool, rng: &mut R) -> &'static str {
        let lines = if accepted { self.success } else { self.failure };
        lines.choose(rng).copied().unwrap_or_default()
    }
}

/// Draw one of [`FALLBACK_REPLIES`].
pub fn fallback_reply<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
    FALLBACK_REPLIES.choose(rng).copied().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    #[test]
    fn known_characters_have_their_own_lines() {
        let mut rng = StdRng::seed_from_u64(7);
        let line = ConfessionLines::for_character("あや").pick(false, &mut rng);
        assert!(AYA.failure.contains(&line));
        assert!(!line.contains('['));
    }

    #[test]
    fn unknown_characters_fall_back_to_generic_lines() {
        let mut rng = StdRng::seed_from_u64(7);
        let line = ConfessionLines::for_character("だれか").pick(true, &mut rng);
        assert_eq!(line, GENERIC.success[0]);
    }

    #[test]
    fn fallback_reply_is_deterministic_under_a_seed() {
        let a = fallback_reply(&mut StdRng::seed_from_u64(42));
        let b = fallback_reply(&mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
        assert!(FALLBACK_REPLIES.contains(&a));
    }
}
