//! Conversation ledger — bounded per-session turn history and the analyses
//! built on top of it.
//!
//! The ledger is the only record of what was said. The prompt composer quotes
//! its tail, the repetition detector compares against it, and front ends read
//! its statistics.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::character::CharacterProfile;
use crate::config::LedgerConfig;
use crate::topic::TopicCatalogue;
use crate::types::EmotionDelta;

/// Entries inspected by trend and mood analysis.
const RECENT_WINDOW: usize = 5;

/// One completed turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationEntry {
    /// 1-based turn number.
    pub turn: u32,
    /// What the user said.
    pub user_input: String,
    /// The cleaned reply shown to the user.
    pub reply: String,
    /// The merged delta that was fed to the emotion engine.
    pub delta: EmotionDelta,
    /// When the turn completed.
    pub timestamp: DateTime<Utc>,
    /// Catalogue categories detected in the user input.
    pub topics: Vec<String>,
}

impl ConversationEntry {
    /// Build an entry stamped now, tagging topics from the user input.
    #[must_use]
    pub fn new(
        turn: u32,
        user_input: impl Into<String>,
        reply: impl Into<String>,
        delta: EmotionDelta,
    ) -> Self {
        let user_input = user_input.into();
        let topics = TopicCatalogue::detect(&user_input);
        Self {
            turn,
            user_input,
            reply: reply.into(),
            delta,
            timestamp: Utc::now(),
            topics,
        }
    }
}

/// Direction affection has been moving in lately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    /// Mean recent affection change above +1.
    Improving,
    /// Mean recent affection change below -1.
    Declining,
    /// Anything in between.
    Stable,
}

/// Sign of recent mood changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecentMood {
    /// Mean non-zero mood change above +1.
    Positive,
    /// Mean non-zero mood change below -1.
    Negative,
    /// Anything in between.
    Neutral,
}

/// Running totals after one turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JourneyPoint {
    /// Turn number.
    pub turn: u32,
    /// Sum of affection deltas up to and including this turn.
    pub affection: i64,
    /// Sum of mood deltas up to and including this turn.
    pub mood: i64,
}

/// Aggregate statistics over the retained history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversationStats {
    /// Entries currently retained.
    pub total_turns: usize,
    /// Mean reply length in characters.
    pub average_response_length: f64,
    /// Up to five categories, most frequent first.
    pub most_discussed_topics: Vec<String>,
    /// Running affection and mood per retained turn.
    pub emotional_journey: Vec<JourneyPoint>,
}

/// Qualitative read of where the conversation is heading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowAnalysis {
    /// Up to three categories, most frequent first.
    pub dominant_topics: Vec<String>,
    /// Affection trend over the last few turns.
    pub trend: Trend,
    /// `min(100, unique_topics × 10 + turns × 2)`.
    pub engagement_level: u32,
    /// Mood over the last few turns.
    pub recent_mood: RecentMood,
}

impl Default for FlowAnalysis {
    fn default() -> Self {
        Self {
            dominant_topics: Vec::new(),
            trend: Trend::Stable,
            engagement_level: 0,
            recent_mood: RecentMood::Neutral,
        }
    }
}

/// Bounded FIFO of conversation entries, oldest first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationLedger {
    entries: VecDeque<ConversationEntry>,
    capacity: usize,
}

impl ConversationLedger {
    /// Create an empty ledger holding at most `capacity` entries (minimum 1).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Create an empty ledger sized from configuration.
    #[must_use]
    pub fn from_config(config: &LedgerConfig) -> Self {
        Self::new(config.max_entries)
    }

    /// Append an entry, evicting the oldest ones beyond capacity.
    pub fn push(&mut self, entry: ConversationEntry) {
        self.entries.push_back(entry);
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    /// Number of retained entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the ledger holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of retained entries.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// All entries, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &ConversationEntry> {
        self.entries.iter()
    }

    /// The last `n` entries, oldest first.
    pub fn recent(&self, n: usize) -> impl Iterator<Item = &ConversationEntry> {
        self.entries.iter().skip(self.entries.len().saturating_sub(n))
    }

    /// Every detected topic, deduplicated in first-seen order.
    #[must_use]
    pub fn topics_seen(&self) -> Vec<String> {
        topic_counts(self.iter())
            .into_iter()
            .map(|(topic, _)| topic)
            .collect()
    }

    /// Aggregate statistics over the retained entries.
    #[must_use]
    pub fn stats(&self) -> ConversationStats {
        if self.is_empty() {
            return ConversationStats::default();
        }
        let total_chars: usize = self.iter().map(|e| e.reply.chars().count()).sum();
        // Lengths are far below f64's exact-integer range.
        #[allow(clippy::cast_precision_loss)]
        let average_response_length = total_chars as f64 / self.len() as f64;

        let mut running_affection = 0_i64;
        let mut running_mood = 0_i64;
        let emotional_journey = self
            .iter()
            .map(|e| {
                running_affection += i64::from(e.delta.affection.unwrap_or(0));
                running_mood += i64::from(e.delta.mood.unwrap_or(0));
                JourneyPoint {
                    turn: e.turn,
                    affection: running_affection,
                    mood: running_mood,
                }
            })
            .collect();

        ConversationStats {
            total_turns: self.len(),
            average_response_length,
            most_discussed_topics: top_topics(self.iter(), 5),
            emotional_journey,
        }
    }

    /// Dominant topics, affection trend, engagement, and recent mood.
    #[must_use]
    pub fn analyze_flow(&self) -> FlowAnalysis {
        if self.is_empty() {
            return FlowAnalysis::default();
        }

        let affection: Vec<i32> = self
            .recent(RECENT_WINDOW)
            .filter_map(|e| e.delta.affection)
            .collect();
        let trend = match mean(&affection) {
            m if m > 1.0 => Trend::Improving,
            m if m < -1.0 => Trend::Declining,
            _ => Trend::Stable,
        };

        let moods: Vec<i32> = self
            .recent(RECENT_WINDOW)
            .map(|e| e.delta.mood.unwrap_or(0))
            .filter(|&m| m != 0)
            .collect();
        let recent_mood = match mean(&moods) {
            m if m > 1.0 => RecentMood::Positive,
            m if m < -1.0 => RecentMood::Negative,
            _ => RecentMood::Neutral,
        };

        let unique = self.topics_seen().len();
        let engagement = (unique * 10 + self.len() * 2).min(100);

        FlowAnalysis {
            dominant_topics: top_topics(self.iter(), 3),
            trend,
            engagement_level: u32::try_from(engagement).unwrap_or(100),
            recent_mood,
        }
    }

    /// Up to four topics worth raising next with `profile`.
    ///
    /// Starts from the character's interests mapped onto catalogue
    /// categories, adds ones not yet dominant, and once the conversation is
    /// past five turns, nudges toward deeper subjects.
    #[must_use]
    pub fn suggested_topics(&self, profile: &CharacterProfile) -> Vec<String> {
        let character_topics: Vec<&str> = profile
            .interests
            .iter()
            .filter_map(|interest| TopicCatalogue::topic_for_interest(interest))
            .collect();
        let discussed = self.analyze_flow().dominant_topics;

        let mut candidates: Vec<&str> = character_topics.iter().take(2).copied().collect();
        candidates.extend(
            character_topics
                .iter()
                .filter(|t| !discussed.iter().any(|d| d == *t))
                .take(2),
        );
        if self.len() > RECENT_WINDOW {
            candidates.extend(["将来・夢", "感情・気持ち"]);
        }

        let mut out: Vec<String> = Vec::new();
        for topic in candidates {
            if !out.iter().any(|t| t == topic) {
                out.push(topic.to_string());
            }
        }
        out.truncate(4);
        out
    }
}

impl Default for ConversationLedger {
    fn default() -> Self {
        Self::from_config(&LedgerConfig::default())
    }
}

/// Topic occurrence counts in first-seen order.
fn topic_counts<'a>(entries: impl Iterator<Item = &'a ConversationEntry>) -> Vec<(String, usize)> {
    let mut counts: Vec<(String, usize)> = Vec::new();
    for topic in entries.flat_map(|e| e.topics.iter()) {
        match counts.iter_mut().find(|(t, _)| t == topic) {
            Some((_, n)) => *n += 1,
            None => counts.push((topic.clone(), 1)),
        }
    }
    counts
}

/// Most frequent topics; the stable sort keeps first appearance on ties.
fn top_topics<'a>(entries: impl Iterator<Item = &'a ConversationEntry>, n: usize) -> Vec<String> {
    let mut counts = topic_counts(entries);
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts.into_iter().take(n).map(|(t, _)| t).collect()
}

// Small samples of bounded integers.
#[allow(clippy::cast_precision_loss)]
fn mean(values: &[i32]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let sum: i64 = values.iter().map(|&v| i64::from(v)).sum();
    sum as f64 / values.len() as f64
}
