//! Prompt composer — renders the full system prompt for one turn.
//!
//! Pure string building: nothing here talks to the model. Section order is
//! fixed (character, situation, history, guidance, tag rules, length, final
//! instructions) because the response interpreter relies on the model having
//! seen the tag rules in exactly this framing.

use crate::character::{CharacterProfile, EmotionalProfile};
use crate::ledger::ConversationLedger;
use crate::types::{Axis, EmotionVector, RelationshipStage};

/// Everything the composer needs for one turn.
#[derive(Debug, Clone, Copy)]
pub struct PromptContext<'a> {
    /// Who the model plays.
    pub profile: &'a CharacterProfile,
    /// Current emotion vector.
    pub emotions: &'a EmotionVector,
    /// Current relationship stage.
    pub stage: RelationshipStage,
    /// Conversation so far (this turn not yet included).
    pub ledger: &'a ConversationLedger,
    /// What the user just said.
    pub user_input: &'a str,
    /// 1-based number of this turn.
    pub turn: u32,
    /// Ledger entries quoted verbatim.
    pub history_len: usize,
}

/// Render the complete prompt.
#[must_use]
pub fn render(ctx: &PromptContext<'_>) -> String {
    let name = &ctx.profile.name;
    let sections = [
        character_section(ctx.profile),
        situation_section(ctx.emotions, ctx.stage, ctx.turn),
        history_section(ctx.ledger, ctx.history_len),
        guidance_section(ctx.stage, ctx.profile),
        EMOTION_RULES.to_string(),
        length_guidance(ctx.user_input),
        closing_section(name, ctx.user_input),
    ];
    sections.join("\n\n")
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

fn character_section(p: &CharacterProfile) -> String {
    let values = p
        .values
        .iter()
        .map(|v| format!("- {v}"))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "# キャラクター設定\n\
         ## 基本情報\n\
         - 名前: {name}\n\
         - 年齢: {age}歳\n\
         - 性格特性: {traits}\n\
         \n\
         ## 人物像\n\
         {background}\n\
         \n\
         ## 価値観・信念\n\
         {values}\n\
         \n\
         ## 話し方の特徴\n\
         {speech}\n\
         \n\
         ## 興味・関心\n\
         好きなもの: {interests}\n\
         苦手なもの: {dislikes}\n\
         趣味: {hobbies}",
        name = p.name,
        age = p.age,
        traits = p.traits.join("、"),
        background = p.background,
        speech = p.speech_style,
        interests = p.interests.join("、"),
        dislikes = p.dislikes.join("、"),
        hobbies = p.hobbies.join("、"),
    )
}

fn situation_section(v: &EmotionVector, stage: RelationshipStage, turn: u32) -> String {
    let emotions = Axis::ALL
        .iter()
        .map(|&axis| format!("- {}: {}", axis.label(), describe(axis, v.get(axis))))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "# 現在の状況\n## 関係性\n{}\n\n## 現在の感情状態\n{emotions}\n\n## 会話の進行\nこれは{turn}回目の発言です。",
        stage_description(stage)
    )
}

fn history_section(ledger: &ConversationLedger, history_len: usize) -> String {
    if ledger.is_empty() {
        return "# 会話履歴\nこれが最初の会話です。初対面としての反応を心がけてください。".to_string();
    }
    let recent = ledger
        .recent(history_len)
        .map(|e| format!("ユーザー: \"{}\"\nあなたの返答: \"{}\"", e.user_input, e.reply))
        .collect::<Vec<_>>()
        .join("\n\n");
    let topics = ledger.topics_seen();
    let topics = if topics.is_empty() {
        "まだ特定の話題は出ていません".to_string()
    } else {
        topics.join("、")
    };
    format!(
        "# 会話履歴\n\
         ## 最近の会話 (最新{history_len}回分)\n\
         {recent}\n\
         \n\
         ## これまでに話題に上がったこと\n\
         {topics}\n\
         \n\
         ## 継続性への注意\n\
         これまでの会話内容と矛盾しないように気をつけてください。"
    )
}

fn guidance_section(stage: RelationshipStage, p: &CharacterProfile) -> String {
    let interests: Vec<&str> = p.interests.iter().take(3).map(String::as_str).collect();
    let dislikes: Vec<&str> = p.dislikes.iter().take(2).map(String::as_str).collect();
    format!(
        "# 行動指針\n\
         ## 現在の関係性段階での振る舞い\n\
         {base}\n\
         \n\
         {name}の性格を考慮した振る舞い:\n\
         {directive}\n\
         \n\
         ## {name}としての反応パターン\n\
         - {name}の口調: {speech}\n\
         - 興味を示す話題: {interests}\n\
         - 避ける傾向の話題: {dislikes}\n\
         - 感情の変動パターン: {pattern}",
        base = base_guidance(stage),
        name = p.name,
        directive = stage_directive(stage, &p.name).unwrap_or(""),
        speech = p.speech_style,
        interests = interests.join("、"),
        dislikes = dislikes.join("、"),
        pattern = emotional_pattern(&p.emotional_profile),
    )
}

const EMOTION_RULES: &str = "# 感情表現ルール
## 必須タグ
返答の中に以下のタグを自然に含めてください（複数可）:
- [MOOD:±数値] - 気分の変化 (-10〜+10)
- [TRUST:±数値] - 信頼度の変化 (0〜+10)
- [TENSION:±数値] - 緊張度の変化 (-10〜+10、マイナスはリラックス)
- [AFFECTION:±数値] - 好感度の変化 (-5〜+10)
- [INTEREST:±数値] - 興味度の変化 (-5〜+10)

## 特殊イベントタグ
- [CONFESSION_DETECTED] - ユーザーから明確な告白を受けた場合のみ使用

## 告白の判定基準
以下のような明確な恋愛感情の表現があった場合にのみ[CONFESSION_DETECTED]タグを使用:
- 「君が好き」「あなたが好き」などの直接的な好意の表明
- 「付き合って」「恋人になって」などの交際の申し込み
- 「愛してる」などの愛の告白

以下は告白として扱わない:
- 「料理が好き」「音楽が好き」など対象物への好意
- 「好きかも」「気になる」などの曖昧な表現
- 友人としての好意の表現

## タグの使用例
\"そうなんだ…すごいね [MOOD:+3] [INTEREST:+2]\"
\"え、そんなことないよ！[TENSION:+2] [AFFECTION:+1]\"
\"え…！今、なんて…？[CONFESSION_DETECTED] [TENSION:+5] [AFFECTION:+3]\"";

fn length_guidance(user_input: &str) -> String {
    let body = match user_input.chars().count() {
        0..=10 => {
            "- ユーザーの入力が短いため、1-2文で簡潔に応答してください\n\
             - 自然な相槌や短い反応を心がけてください"
        }
        11..=30 => {
            "- 2-3文程度の標準的な長さで応答してください\n\
             - 会話のキャッチボールを意識してください"
        }
        _ => {
            "- ユーザーが詳しく話しているため、3-4文で丁寧に応答してください\n\
             - 相手の話題に深く共感し、会話を発展させてください"
        }
    };
    format!("# 応答の長さ\n{body}")
}

fn closing_section(name: &str, input: &str) -> String {
    format!(
        "# 重要な指示\n\
         - あなたは{name}として一貫して振る舞ってください\n\
         - {name}の性格、価値観、口調を必ず反映してください\n\
         - 返答には必ず感情変化タグを含めてください\n\
         - 自然で魅力的な会話を心がけてください\n\
         - 相手の発言に対して{name}らしい反応を示してください\n\
         \n\
         ユーザーの発言: \"{input}\"\n\
         \n\
         {name}として、上記の発言に応答してください:"
    )
}

// ---------------------------------------------------------------------------
// Band helpers
// ---------------------------------------------------------------------------

/// Qualitative band label for one axis value, with the number appended.
#[must_use]
pub fn describe(axis: Axis, value: i32) -> String {
    format!("{} ({value})", band(axis, value))
}

/// Qualitative band label for one axis value.
#[must_use]
pub fn band(axis: Axis, value: i32) -> &'static str {
    let pick = |labels: [&'static str; 5], cuts: [i32; 4]| {
        cuts.iter()
            .position(|&cut| value > cut)
            .map_or(labels[4], |i| labels[i])
    };
    match axis {
        Axis::Mood => pick(["とても良い", "良い", "普通", "少し悪い", "悪い"], [50, 20, -20, -50]),
        Axis::Trust => pick(
            ["深く信頼している", "信頼している", "ある程度信頼", "様子見", "警戒している"],
            [80, 60, 40, 20],
        ),
        Axis::Tension => pick(
            ["とても緊張", "緊張している", "少し緊張", "リラックス", "とてもリラックス"],
            [80, 60, 40, 20],
        ),
        Axis::Affection => pick(
            ["とても好き", "好き", "親しみを感じる", "好印象", "普通"],
            [80, 60, 40, 20],
        ),
        Axis::Interest => pick(
            ["とても興味深い", "興味がある", "関心がある", "少し興味", "あまり興味なし"],
            [80, 60, 40, 20],
        ),
    }
}

/// One-line description of what a stage means for the relationship.
#[must_use]
pub fn stage_description(stage: RelationshipStage) -> &'static str {
    match stage {
        RelationshipStage::Stranger => "初対面または最初の段階。警戒心があり、距離を置いた態度。",
        RelationshipStage::Acquaintance => "知り合い程度。少し打ち解けてきたが、まだ表面的な関係。",
        RelationshipStage::Friend => "友達として認識。ある程度の信頼関係があり、自然に会話できる。",
        RelationshipStage::CloseFriend => "親しい友人。お互いを理解し合い、個人的な話もできる関係。",
        RelationshipStage::RomanticInterest => "恋愛感情を意識し始めた段階。特別な存在として見ている。",
        RelationshipStage::Lover => "恋人関係。深い愛情と信頼で結ばれた特別な関係。",
    }
}

fn base_guidance(stage: RelationshipStage) -> &'static str {
    match stage {
        RelationshipStage::Stranger => {
            "- 丁寧で少し距離のある態度\n- 個人的な情報は控えめに\n- 相手を探るような質問や反応"
        }
        RelationshipStage::Acquaintance => {
            "- 徐々に打ち解けた態度\n- 基本的な個人情報は共有OK\n- まだ深い話題は避ける傾向"
        }
        RelationshipStage::Friend => {
            "- 自然で親しみやすい態度\n- ある程度の個人的な話もOK\n- 相手のことを気にかける反応"
        }
        RelationshipStage::CloseFriend => {
            "- 親密で信頼できる関係性を表現\n- 個人的な悩みや秘密も共有\n- 相手のことを深く理解しようとする"
        }
        RelationshipStage::RomanticInterest => {
            "- 特別感のある態度\n- 恋愛的な緊張や意識を表現\n- 相手の気持ちを確かめるような発言"
        }
        RelationshipStage::Lover => {
            "- 愛情深く特別な関係性を表現\n- 深い絆と理解を示す\n- 将来的な話題も自然に出る"
        }
    }
}

/// Per-character behaviour notes, keyed by `(stage, character name)`.
const STAGE_DIRECTIVES: &[(RelationshipStage, &str, &str)] = &[
    (RelationshipStage::Stranger, "さくら", "さくらは人見知りしつつも、持ち前の優しさで温かく接する"),
    (RelationshipStage::Friend, "さくら", "さくらは家族のような親しみやすさを見せ、料理や家庭的な話題を好む"),
    (RelationshipStage::RomanticInterest, "さくら", "さくらは恥ずかしがりながらも素直に気持ちを表現し、将来への憧れを示す"),
    (RelationshipStage::Stranger, "あや", "あやはツンデレを発揮し、興味があっても素直になれない"),
    (RelationshipStage::Friend, "あや", "あやは時々デレを見せるようになり、知的な話題で打ち解ける"),
    (RelationshipStage::RomanticInterest, "あや", "あやのツンデレが激しくなり、「別に」「たまたま」などの言い訳が増える"),
    (RelationshipStage::Stranger, "みさき", "みさきは論理的で冷静な態度を保ち、相手を観察・分析する"),
    (RelationshipStage::Friend, "みさき", "みさきは知的な議論を楽しみ、相手の思考力に興味を示す"),
    (RelationshipStage::RomanticInterest, "みさき", "みさきは感情と論理の間で混乱し、普段とは違う一面を少し見せる"),
];

/// Behaviour note for `name` at `stage`, if one is written.
#[must_use]
pub fn stage_directive(stage: RelationshipStage, name: &str) -> Option<&'static str> {
    STAGE_DIRECTIVES
        .iter()
        .find(|(s, n, _)| *s == stage && *n == name)
        .map(|(_, _, text)| *text)
}

/// Summary of how the profile's multipliers show up in conversation.
#[must_use]
pub fn emotional_pattern(profile: &EmotionalProfile) -> String {
    let mut patterns = Vec::new();
    if profile.moodiness > 0.6 {
        patterns.push("気分の変動が大きい");
    }
    if profile.trustingness > 0.6 {
        patterns.push("人を信頼しやすい");
    }
    if profile.shyness > 0.6 {
        patterns.push("恥ずかしがりやすい");
    }
    if profile.openness < 0.4 {
        patterns.push("心を開くのに時間がかかる");
    }
    if patterns.is_empty() {
        "感情が安定している".to_string()
    } else {
        patterns.join("、")
    }
}
