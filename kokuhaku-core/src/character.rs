//! Character profiles — static personality data driving one generic engine.
//!
//! Characters are parameterisations, not subclasses: every behavioural
//! difference between them lives in a [`CharacterProfile`] record, and the
//! [`Roster`] is the lookup table from difficulty tier to profile.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CoreError, Result};
use crate::types::Difficulty;

// ---------------------------------------------------------------------------
// Profile records
// ---------------------------------------------------------------------------

/// Multipliers that shape how strongly a character absorbs emotion changes.
/// Each ranges 0.0–1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EmotionalProfile {
    /// How volatile the mood is (0 = steady, 1 = swings wildly).
    pub moodiness: f64,
    /// How readily trust is granted (0 = suspicious, 1 = trusting).
    pub trustingness: f64,
    /// How quickly tension spikes (0 = composed, 1 = very shy).
    pub shyness: f64,
    /// How readily affection is absorbed (0 = closed off, 1 = open).
    pub openness: f64,
}

impl Default for EmotionalProfile {
    fn default() -> Self {
        Self {
            moodiness: 0.5,
            trustingness: 0.5,
            shyness: 0.5,
            openness: 0.5,
        }
    }
}

impl EmotionalProfile {
    fn clamped(self) -> Self {
        Self {
            moodiness: self.moodiness.clamp(0.0, 1.0),
            trustingness: self.trustingness.clamp(0.0, 1.0),
            shyness: self.shyness.clamp(0.0, 1.0),
            openness: self.openness.clamp(0.0, 1.0),
        }
    }
}

/// Which emotion axes a topic reaction feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TopicRouting {
    /// Family, kindness: affection, plus half as much (non-negative) trust.
    Relational,
    /// Study, science: interest, plus 0.7× affection.
    Intellectual,
    /// Rivalry, emotionalism: mood, plus |value| tension.
    Conflict,
    /// Everything else: affection only.
    General,
}

impl TopicRouting {
    /// Routing implied by a category name when none is configured.
    #[must_use]
    pub fn for_category(category: &str) -> Self {
        match category {
            "家族" | "優しさ・思いやり" => Self::Relational,
            "学習・知識" | "科学・学術" => Self::Intellectual,
            "競争・対立" | "感情論" => Self::Conflict,
            _ => Self::General,
        }
    }
}

/// A keyword-tagged topic and the character's reaction strength to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicReaction {
    /// Category name (also the label shown in suggested topics).
    pub category: String,
    /// Keywords matched case-insensitively as substrings of the input.
    pub keywords: Vec<String>,
    /// Reaction when more than half of the keywords match.
    pub positive_response: i32,
    /// Reaction when at least one, but at most half, of the keywords match.
    pub negative_response: i32,
    /// Axis routing; derived from the category name when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub routing: Option<TopicRouting>,
}

impl TopicReaction {
    /// Create a reaction whose routing is derived from its category.
    #[must_use]
    pub fn new(
        category: impl Into<String>,
        keywords: &[&str],
        positive_response: i32,
        negative_response: i32,
    ) -> Self {
        Self {
            category: category.into(),
            keywords: keywords.iter().map(|k| (*k).to_string()).collect(),
            positive_response,
            negative_response,
            routing: None,
        }
    }

    /// Effective routing for this reaction.
    #[must_use]
    pub fn routing(&self) -> TopicRouting {
        self.routing
            .unwrap_or_else(|| TopicRouting::for_category(&self.category))
    }
}

/// Immutable personality record for one character.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterProfile {
    /// Display name (also the key of the stage-directive table).
    pub name: String,
    /// Age in years.
    pub age: u32,
    /// Difficulty tier this character is offered at.
    pub difficulty: Difficulty,
    /// Personality traits.
    pub traits: Vec<String>,
    /// Values and beliefs.
    pub values: Vec<String>,
    /// Free-text backstory.
    pub background: String,
    /// Free-text speech style descriptor.
    pub speech_style: String,
    /// Things the character likes.
    pub interests: Vec<String>,
    /// Things the character dislikes.
    pub dislikes: Vec<String>,
    /// Hobbies.
    #[serde(default)]
    pub hobbies: Vec<String>,
    /// Affection required for a confession to succeed.
    pub success_threshold: i32,
    /// Emotion-absorption multipliers.
    pub emotional_profile: EmotionalProfile,
    /// Ordered topic reactions.
    #[serde(default)]
    pub topic_reactions: Vec<TopicReaction>,
}

impl CharacterProfile {
    /// Check invariants and clamp the emotional multipliers into `[0, 1]`.
    ///
    /// # Errors
    /// Returns [`CoreError::InvalidProfile`] for an empty name, a threshold
    /// outside `1..=100`, or a topic reaction without keywords.
    pub fn validated(mut self) -> Result<Self> {
        let invalid = |reason: String| CoreError::InvalidProfile {
            name: self.name.clone(),
            reason,
        };
        if self.name.trim().is_empty() {
            return Err(invalid("name is empty".into()));
        }
        if !(1..=100).contains(&self.success_threshold) {
            return Err(invalid(format!(
                "success_threshold {} outside 1..=100",
                self.success_threshold
            )));
        }
        if let Some(topic) = self.topic_reactions.iter().find(|t| t.keywords.is_empty()) {
            return Err(invalid(format!("topic '{}' has no keywords", topic.category)));
        }
        self.emotional_profile = self.emotional_profile.clamped();
        Ok(self)
    }
}

// ---------------------------------------------------------------------------
// Roster
// ---------------------------------------------------------------------------

/// Lookup table from difficulty tier to a shared character profile.
#[derive(Debug, Clone)]
pub struct Roster {
    characters: BTreeMap<Difficulty, Arc<CharacterProfile>>,
}

#[derive(Debug, Deserialize)]
struct RosterFile {
    #[serde(default)]
    characters: Vec<CharacterProfile>,
}

impl Roster {
    /// The three built-in characters.
    #[must_use]
    pub fn builtin() -> Self {
        let characters = [sakura(), aya(), misaki()]
            .into_iter()
            .map(|c| (c.difficulty, Arc::new(c)))
            .collect();
        Self { characters }
    }

    /// Built-in roster with entries overridden by a TOML document of
    /// `[[characters]]` tables.
    ///
    /// # Errors
    /// Returns [`CoreError::Config`] on malformed TOML and
    /// [`CoreError::InvalidProfile`] when a profile fails validation.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let file: RosterFile =
            toml::from_str(toml_str).map_err(|e| CoreError::Config(e.to_string()))?;
        let mut roster = Self::builtin();
        for profile in file.characters {
            let profile = profile.validated()?;
            debug!(
                character = %profile.name,
                difficulty = %profile.difficulty,
                "Roster entry overridden"
            );
            roster.characters.insert(profile.difficulty, Arc::new(profile));
        }
        Ok(roster)
    }

    /// Load overrides from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// The profile offered at `difficulty`.
    ///
    /// # Errors
    /// Returns [`CoreError::UnknownDifficulty`] if the tier has no character.
    pub fn get(&self, difficulty: Difficulty) -> Result<Arc<CharacterProfile>> {
        self.characters
            .get(&difficulty)
            .cloned()
            .ok_or_else(|| CoreError::UnknownDifficulty(difficulty.to_string()))
    }

    /// All profiles, easiest first.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<CharacterProfile>> {
        self.characters.values()
    }
}

impl Default for Roster {
    fn default() -> Self {
        Self::builtin()
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

fn sakura() -> CharacterProfile {
    CharacterProfile {
        name: "さくら".into(),
        age: 18,
        difficulty: Difficulty::Easy,
        traits: strings(&["素直で明るい", "少し天然", "優しくて思いやりがある", "家族思い", "前向きな性格"]),
        values: strings(&[
            "家族を何よりも大切にする",
            "素直な気持ちを伝えることの大切さ",
            "みんなで一緒にいる時間を大切にしたい",
            "小さな幸せに感謝する心",
        ]),
        background: "田舎の大家族の長女として生まれ育ちました。小さい頃から弟や妹の面倒を見ることが多く、自然と思いやりのある性格になりました。\
家族みんなで過ごす時間が一番好きで、特に母親の手料理を囲んでの団欒を大切にしています。\
都市部の学校に通うようになって新しい環境に少し緊張していますが、持ち前の明るさで少しずつ友達を作っています。"
            .into(),
        speech_style: "丁寧だけど親しみやすい話し方。「〜だよね」「〜かな」「〜だと思うよ」などを使う。感情が高ぶると方言が少し出る。".into(),
        interests: strings(&["料理（特に家庭料理）", "散歩・自然観察", "動物（特に犬や猫）", "読書（少女小説）", "ガーデニング"]),
        dislikes: strings(&["人を傷つけること", "嘘をつくこと", "大きな音や騒音", "複雑な人間関係", "競争や対立"]),
        hobbies: strings(&["家庭菜園", "写真撮影（風景や動物）", "手紙を書くこと", "散歩", "料理のレシピ研究"]),
        success_threshold: 60,
        emotional_profile: EmotionalProfile {
            moodiness: 0.3,
            trustingness: 0.8,
            shyness: 0.4,
            openness: 0.7,
        },
        topic_reactions: vec![
            TopicReaction::new("料理・食べ物", &["料理", "食べ物", "レシピ", "美味しい", "手作り"], 8, -2),
            TopicReaction::new("家族", &["家族", "兄弟", "姉妹", "両親", "実家"], 10, -1),
            TopicReaction::new("自然・動物", &["自然", "動物", "花", "散歩", "ペット"], 7, -1),
            TopicReaction::new("優しさ・思いやり", &["優しい", "思いやり", "助ける", "ありがとう"], 6, 0),
            TopicReaction::new("競争・対立", &["競争", "勝負", "対立", "喧嘩", "争い"], -3, -8),
        ],
    }
}

fn aya() -> CharacterProfile {
    CharacterProfile {
        name: "あや".into(),
        age: 17,
        difficulty: Difficulty::Medium,
        traits: strings(&["ツンデレ", "プライドが高い", "実は寂しがり", "努力家", "責任感が強い"]),
        values: strings(&[
            "努力すれば必ず報われる",
            "弱みを見せるのは負け",
            "自分に厳しく、他人にも厳しく",
            "本当の気持ちは隠すべきもの",
        ]),
        background: "成績優秀で学級委員なども務める優等生ですが、完璧主義すぎて友人が少ないのが悩みです。\
小さい頃から両親に高い期待をかけられて育ち、「完璧でなければ愛されない」と思い込んでいます。\
本当は仲良くしたい気持ちがあるのに、プライドが邪魔をして素直になれません。\
一人でいることに慣れていますが、実は孤独を感じています。"
            .into(),
        speech_style: "ツンデレ特有の話し方。「べ、別に〜」「〜なんだから」「〜よ」「〜なのよ」などを多用。照れると早口になる。".into(),
        interests: strings(&["読書（特に文学作品）", "クラシック音楽", "美術館・博物館巡り", "勉強・学習", "一人カフェ"]),
        dislikes: strings(&["自分の弱さを見せること", "いい加減な人", "騒がしい場所", "群れること", "同情されること"]),
        hobbies: strings(&["ピアノ演奏", "読書", "日記を書くこと", "美術鑑賞", "一人で映画鑑賞"]),
        success_threshold: 75,
        emotional_profile: EmotionalProfile {
            moodiness: 0.7,
            trustingness: 0.2,
            shyness: 0.8,
            openness: 0.3,
        },
        topic_reactions: vec![
            TopicReaction::new("学習・知識", &["勉強", "本", "知識", "学習", "成績"], 5, -3),
            TopicReaction::new("芸術・文化", &["音楽", "美術", "文学", "クラシック", "芸術"], 7, -1),
            TopicReaction::new("理解・共感", &["理解", "共感", "分かる", "気持ち"], 8, 0),
            TopicReaction::new("同情・哀れみ", &["可哀想", "大変", "同情", "哀れ"], -5, -10),
            TopicReaction::new("いい加減・適当", &["適当", "いい加減", "まあいいや", "テキトー"], -8, -12),
        ],
    }
}

fn misaki() -> CharacterProfile {
    CharacterProfile {
        name: "みさき".into(),
        age: 19,
        difficulty: Difficulty::Hard,
        traits: strings(&["クールで知的", "論理的思考", "観察眼が鋭い", "感情表現が苦手", "完璧主義"]),
        values: strings(&[
            "論理と理性が最も重要",
            "知識の探求こそが人生の意義",
            "感情に流されるのは愚かなこと",
            "効率性と合理性を重視する",
        ]),
        background: "研究者の両親を持ち、幼い頃から学問的な環境で育ちました。\
IQが非常に高く、論理的思考に優れていますが、感情的なコミュニケーションが苦手です。\
多くの人との表面的な関係よりも、深い理解を共有できる少数の人との関係を好みます。\
恋愛についても論理的に分析しようとしますが、実際の感情が伴うと混乱してしまいます。"
            .into(),
        speech_style: "丁寧で知的な話し方。敬語を基調とし、「〜ですね」「〜と思われます」「〜という観点から」などを使用。".into(),
        interests: strings(&["科学・研究", "哲学・思想", "チェス・戦略ゲーム", "美術館・博物館", "クラシック文学"]),
        dislikes: strings(&["非論理的な行動", "感情論", "無駄な時間", "騒がしい環境", "表面的な関係"]),
        hobbies: strings(&["学術論文の執筆", "チェス", "美術鑑賞", "哲学書の読書", "天体観測"]),
        success_threshold: 90,
        emotional_profile: EmotionalProfile {
            moodiness: 0.1,
            trustingness: 0.3,
            shyness: 0.2,
            openness: 0.1,
        },
        topic_reactions: vec![
            TopicReaction::new("科学・学術", &["科学", "研究", "論文", "実験", "理論"], 10, -1),
            TopicReaction::new("哲学・思想", &["哲学", "思想", "倫理", "論理", "合理的"], 8, 0),
            TopicReaction::new("深い理解", &["理解", "深く", "本質", "真実", "洞察"], 9, 0),
            TopicReaction::new("感情論", &["感情的", "気持ち", "ムード", "直感"], -2, -8),
            TopicReaction::new("非論理的", &["適当", "運任せ", "感覚的", "なんとなく"], -10, -15),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_roster_has_one_character_per_tier() {
        let roster = Roster::builtin();
        let easy = roster.get(Difficulty::Easy).expect("easy");
        let medium = roster.get(Difficulty::Medium).expect("medium");
        let hard = roster.get(Difficulty::Hard).expect("hard");
        assert_eq!(easy.name, "さくら");
        assert_eq!(easy.success_threshold, 60);
        assert_eq!(medium.success_threshold, 75);
        assert_eq!(hard.success_threshold, 90);
    }

    #[test]
    fn builtin_profiles_pass_validation() {
        for profile in Roster::builtin().iter() {
            let validated = (**profile).clone().validated().expect("valid");
            assert_eq!(&validated, profile.as_ref());
        }
    }

    #[test]
    fn routing_is_derived_from_category_names() {
        assert_eq!(TopicRouting::for_category("家族"), TopicRouting::Relational);
        assert_eq!(TopicRouting::for_category("科学・学術"), TopicRouting::Intellectual);
        assert_eq!(TopicRouting::for_category("感情論"), TopicRouting::Conflict);
        assert_eq!(TopicRouting::for_category("料理・食べ物"), TopicRouting::General);
    }

    #[test]
    fn explicit_routing_wins_over_category_name() {
        let mut topic = TopicReaction::new("家族", &["家族"], 5, 0);
        topic.routing = Some(TopicRouting::General);
        assert_eq!(topic.routing(), TopicRouting::General);
    }

    #[test]
    fn toml_overrides_a_tier_and_clamps_multipliers() {
        let toml = r#"
            [[characters]]
            name = "ゆい"
            age = 16
            difficulty = "easy"
            traits = ["元気"]
            values = ["友情"]
            background = "テスト用"
            speech_style = "元気な話し方"
            interests = ["料理"]
            dislikes = ["嘘"]
            success_threshold = 50
            emotional_profile = { moodiness = 1.5, trustingness = 0.5, shyness = -0.2, openness = 0.9 }

            [[characters.topic_reactions]]
            category = "料理・食べ物"
            keywords = ["料理"]
            positive_response = 6
            negative_response = -1
        "#;
        let roster = Roster::from_toml(toml).expect("parse");
        let easy = roster.get(Difficulty::Easy).expect("easy");
        assert_eq!(easy.name, "ゆい");
        assert!((easy.emotional_profile.moodiness - 1.0).abs() < f64::EPSILON);
        assert!(easy.emotional_profile.shyness.abs() < f64::EPSILON);
        assert_eq!(roster.get(Difficulty::Hard).expect("hard").name, "みさき");
    }

    #[test]
    fn invalid_threshold_is_rejected() {
        let mut profile = sakura();
        profile.success_threshold = 0;
        assert!(matches!(
            profile.validated(),
            Err(CoreError::InvalidProfile { .. })
        ));
    }
}
