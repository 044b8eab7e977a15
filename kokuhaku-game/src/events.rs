//! One-shot special events fired when a session crosses a milestone.
//!
//! Each event fires at most once per session. The session keeps the set of
//! events already fired and passes it back in on every check.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use kokuhaku_core::config::EventsConfig;
use kokuhaku_core::EmotionVector;

/// A milestone worth telling the front end about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpecialEvent {
    /// Affection reached the configured high mark.
    HighAffection,
    /// Trust reached the configured high mark.
    HighTrust,
    /// The conversation ran for the configured number of turns.
    LongConversation,
}

impl SpecialEvent {
    /// Stable tag (`high_affection`, …).
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::HighAffection => "high_affection",
            Self::HighTrust => "high_trust",
            Self::LongConversation => "long_conversation",
        }
    }
}

impl fmt::Display for SpecialEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Events whose condition holds now and that are not in `fired` yet.
///
/// Returned in declaration order. The caller records them.
#[must_use]
pub fn check(
    vector: &EmotionVector,
    turn: u32,
    config: &EventsConfig,
    fired: &BTreeSet<SpecialEvent>,
) -> Vec<SpecialEvent> {
    [
        (SpecialEvent::HighAffection, vector.affection >= config.high_affection),
        (SpecialEvent::HighTrust, vector.trust >= config.high_trust),
        (SpecialEvent::LongConversation, turn >= config.long_conversation_turns),
    ]
    .into_iter()
    .filter(|(event, reached)| *reached && !fired.contains(event))
    .map(|(event, _)| event)
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thresholds_are_inclusive() {
        let config = EventsConfig::default();
        let vector = EmotionVector {
            affection: 80,
            trust: 84,
            ..EmotionVector::INITIAL
        };
        let events = check(&vector, 1, &config, &BTreeSet::new());
        assert_eq!(events, vec![SpecialEvent::HighAffection]);
    }

    #[test]
    fn fired_events_do_not_repeat() {
        let config = EventsConfig::default();
        let vector = EmotionVector {
            affection: 100,
            trust: 100,
            ..EmotionVector::INITIAL
        };
        let fired: BTreeSet<_> = [SpecialEvent::HighAffection].into_iter().collect();
        let events = check(&vector, 25, &config, &fired);
        assert_eq!(
            events,
            vec![SpecialEvent::HighTrust, SpecialEvent::LongConversation]
        );
    }

    #[test]
    fn tags_serialize_as_snake_case() {
        let json = serde_json::to_string(&SpecialEvent::LongConversation).expect("serialize");
        assert_eq!(json, "\"long_conversation\"");
        assert_eq!(SpecialEvent::HighTrust.to_string(), "high_trust");
    }
}
