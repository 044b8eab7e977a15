//! Game session — the per-user turn state machine.
//!
//! A session moves through `Uninitialized → Active → Ended(outcome)`. Each
//! call to [`GameSession::process_turn`] runs the whole pipeline for one
//! user message:
//!
//! 1. bump the turn counter
//! 2. score topics and damp them if the user is repeating themselves
//! 3. render the prompt and ask the model for a reply
//! 4. read tags and the confession marker out of the reply
//! 5. apply the merged delta, resolve any confession, log the turn, and
//!    check special events
//!
//! A failed model call stops after step 3 with a fallback reply. Nothing but
//! the turn counter has changed at that point.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use kokuhaku_core::ledger::{ConversationEntry, ConversationLedger, ConversationStats, FlowAnalysis};
use kokuhaku_core::prompt::{self, PromptContext};
use kokuhaku_core::{
    emotion, interpret, repetition, topic, CharacterProfile, Difficulty, EmotionDelta,
    EmotionVector, GameConfig, RelationshipStage, Repetition, Roster,
};
use kokuhaku_llm::{ChatMessage, ChatOptions, ChatProvider};

use crate::error::{GameError, Result};
use crate::events::{self, SpecialEvent};
use crate::fallback::{self, ConfessionLines};

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

/// How a finished game ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// The confession was accepted.
    Success,
    /// Too many confessions were turned down.
    Failure,
}

/// Lifecycle phase of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// No character chosen yet.
    Uninitialized,
    /// Conversation in progress.
    Active,
    /// Game over; only read-only views and `reset` remain.
    Ended(Outcome),
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uninitialized => f.write_str("uninitialized"),
            Self::Active => f.write_str("active"),
            Self::Ended(Outcome::Success) => f.write_str("ended (success)"),
            Self::Ended(Outcome::Failure) => f.write_str("ended (failure)"),
        }
    }
}

// ---------------------------------------------------------------------------
// Progress and results
// ---------------------------------------------------------------------------

/// Counters and flags the orchestrator maintains across turns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameProgress {
    /// Turns attempted, including ones that fell back.
    pub turn_count: u32,
    /// When `initialize` was called.
    pub started_at: DateTime<Utc>,
    /// Special events already fired.
    pub special_events: BTreeSet<SpecialEvent>,
    /// Whether any confession was made.
    pub confession_attempted: bool,
    /// Whether a confession was accepted.
    pub confession_successful: bool,
    /// Confessions turned down so far.
    pub failed_confessions: u32,
}

impl GameProgress {
    fn new() -> Self {
        Self {
            turn_count: 0,
            started_at: Utc::now(),
            special_events: BTreeSet::new(),
            confession_attempted: false,
            confession_successful: false,
            failed_confessions: 0,
        }
    }
}

/// What one turn produced, for the front end.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TurnOutcome {
    /// Cleaned reply to show the user.
    pub display_reply: String,
    /// Delta fed to the emotion engine, before temperament scaling.
    pub applied_delta: EmotionDelta,
    /// Relationship stage after the turn.
    pub stage: RelationshipStage,
    /// Whether this turn ended the game.
    pub ended: bool,
    /// How the game ended, when it did.
    pub outcome: Option<Outcome>,
    /// Special events fired by this turn.
    pub new_events: Vec<SpecialEvent>,
    /// Repetition verdict for the user's input.
    pub repetition: Repetition,
    /// Whether the model call failed and a canned reply was used.
    pub fallback: bool,
}

/// Read-only copy of a session's state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    /// Session identifier.
    pub session_id: Uuid,
    /// Lifecycle phase.
    pub phase: Phase,
    /// Character name.
    pub character: String,
    /// Difficulty tier.
    pub difficulty: Difficulty,
    /// Current emotion vector.
    pub emotions: EmotionVector,
    /// Current relationship stage.
    pub stage: RelationshipStage,
    /// Counters and flags.
    pub progress: GameProgress,
    /// Entries currently held by the ledger.
    pub history_len: usize,
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct Live {
    profile: Arc<CharacterProfile>,
    emotions: EmotionVector,
    stage: RelationshipStage,
    ledger: ConversationLedger,
    progress: GameProgress,
}

/// Extra push applied when a confession is accepted.
fn success_bonus() -> EmotionDelta {
    EmotionDelta {
        mood: Some(10),
        trust: Some(5),
        tension: Some(-5),
        affection: Some(10),
        interest: Some(5),
    }
}

/// Sting of a declined confession that still leaves room to try again.
fn partial_penalty() -> EmotionDelta {
    EmotionDelta {
        mood: Some(-3),
        tension: Some(3),
        affection: Some(-2),
        ..EmotionDelta::new()
    }
}

/// Sting of the last allowed confession being declined.
fn final_penalty() -> EmotionDelta {
    EmotionDelta {
        mood: Some(-5),
        tension: Some(5),
        affection: Some(-5),
        ..EmotionDelta::new()
    }
}

/// One user's game.
///
/// Not internally synchronised: callers serialise turns, which
/// [`crate::SessionRegistry`] does with a per-session mutex.
#[derive(Debug)]
pub struct GameSession {
    id: Uuid,
    config: Arc<GameConfig>,
    roster: Arc<Roster>,
    phase: Phase,
    live: Option<Live>,
}

impl GameSession {
    /// A fresh, uninitialized session.
    #[must_use]
    pub fn new(config: Arc<GameConfig>, roster: Arc<Roster>) -> Self {
        Self {
            id: Uuid::new_v4(),
            config,
            roster,
            phase: Phase::Uninitialized,
            live: None,
        }
    }

    /// Session identifier, stable across `initialize` and `reset`.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Current lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The character being talked to, once initialized.
    #[must_use]
    pub fn profile(&self) -> Option<&Arc<CharacterProfile>> {
        self.live.as_ref().map(|live| &live.profile)
    }

    /// Start a game with the character at `difficulty`.
    ///
    /// Allowed from any phase; an existing game is discarded.
    ///
    /// # Errors
    /// Returns [`GameError::Core`] if the roster has no character for the tier.
    pub fn initialize(&mut self, difficulty: Difficulty) -> Result<()> {
        let profile = self.roster.get(difficulty)?;
        let emotions = emotion::initial();
        info!(
            session = %self.id,
            character = %profile.name,
            %difficulty,
            threshold = profile.success_threshold,
            "Game session initialized"
        );
        self.live = Some(Live {
            profile,
            stage: emotion::stage(&emotions),
            emotions,
            ledger: ConversationLedger::from_config(&self.config.ledger),
            progress: GameProgress::new(),
        });
        self.phase = Phase::Active;
        Ok(())
    }

    /// Drop the current game and return to `Uninitialized`.
    pub fn reset(&mut self) {
        if self.live.take().is_some() {
            info!(session = %self.id, "Game session reset");
        }
        self.phase = Phase::Uninitialized;
    }

    /// Run one conversational turn.
    ///
    /// Provider errors never escape: they produce a fallback outcome and
    /// leave everything except the turn counter untouched.
    ///
    /// # Errors
    /// Returns [`GameError::InvalidState`] unless the session is active.
    #[allow(clippy::too_many_lines)]
    pub async fn process_turn<R: Rng + ?Sized>(
        &mut self,
        input: &str,
        provider: &dyn ChatProvider,
        rng: &mut R,
    ) -> Result<TurnOutcome> {
        let phase = self.phase;
        let live = match (phase, self.live.as_mut()) {
            (Phase::Active, Some(live)) => live,
            _ => {
                return Err(GameError::InvalidState {
                    operation: "process a turn",
                    phase,
                });
            }
        };
        let config = &self.config;

        live.progress.turn_count += 1;
        let turn = live.progress.turn_count;

        let repetition = repetition::detect(input, &live.ledger, &config.repetition);
        let scored = topic::score(input, &live.profile);
        let topic_delta = repetition::dampen(&scored.delta, &repetition);
        debug!(
            session = %self.id,
            turn,
            categories = ?scored.categories,
            repetition = repetition.score,
            damped = repetition.is_repetitive,
            "Scored user input"
        );

        let rendered = prompt::render(&PromptContext {
            profile: &live.profile,
            emotions: &live.emotions,
            stage: live.stage,
            ledger: &live.ledger,
            user_input: input,
            turn,
            history_len: config.ledger.prompt_history,
        });
        trace!(session = %self.id, prompt = %rendered, "Rendered prompt");

        let messages = [
            ChatMessage::system(rendered),
            ChatMessage::user(config.session.placeholder_user_message.clone()),
        ];
        let options = ChatOptions {
            temperature: config.llm.temperature,
            max_tokens: config.llm.max_tokens,
        };

        let response = match provider.chat(&messages, &options).await {
            Ok(response) => response,
            Err(e) => {
                warn!(
                    session = %self.id,
                    turn,
                    provider = provider.name(),
                    error = %e,
                    "Chat provider failed, using fallback reply"
                );
                return Ok(TurnOutcome {
                    display_reply: fallback::fallback_reply(rng).to_string(),
                    applied_delta: EmotionDelta::new(),
                    stage: live.stage,
                    ended: false,
                    outcome: None,
                    new_events: Vec::new(),
                    repetition,
                    fallback: true,
                });
            }
        };
        debug!(
            session = %self.id,
            turn,
            provider = provider.name(),
            latency_ms = response.latency_ms,
            "Received reply"
        );

        let reading = interpret::interpret(&response.content, rng);
        let merged = topic_delta.merge(&reading.delta);
        let after = emotion::apply(live.emotions, &merged, &live.profile);

        let (applied, display, outcome) = if reading.confession {
            live.progress.confession_attempted = true;
            let accepted =
                emotion::confession_successful_with(&after, &live.profile, &config.confession);
            let (adjustment, outcome) = if accepted {
                live.progress.confession_successful = true;
                (success_bonus(), Some(Outcome::Success))
            } else {
                live.progress.failed_confessions += 1;
                if live.progress.failed_confessions >= config.confession.max_failures {
                    (final_penalty(), Some(Outcome::Failure))
                } else {
                    (partial_penalty(), None)
                }
            };
            live.emotions = emotion::apply(after, &adjustment, &live.profile);
            live.stage = if accepted {
                RelationshipStage::Lover
            } else {
                emotion::stage(&live.emotions)
            };

            // A reply that was nothing but tags gets a scripted answer.
            let display = if interpret::strip(&response.content).chars().count() < 2 {
                ConfessionLines::for_character(&live.profile.name)
                    .pick(accepted, rng)
                    .to_string()
            } else {
                reading.display
            };
            info!(
                session = %self.id,
                turn,
                accepted,
                failed = live.progress.failed_confessions,
                affection = live.emotions.affection,
                trust = live.emotions.trust,
                tension = live.emotions.tension,
                "Confession resolved"
            );
            (merged.merge(&adjustment), display, outcome)
        } else {
            live.emotions = after;
            live.stage = emotion::stage(&live.emotions);
            (merged, reading.display, None)
        };

        live.ledger
            .push(ConversationEntry::new(turn, input, display.clone(), applied));

        let new_events = if outcome.is_none() {
            let fired =
                events::check(&live.emotions, turn, &config.events, &live.progress.special_events);
            for event in &fired {
                info!(session = %self.id, turn, event = %event, "Special event");
                live.progress.special_events.insert(*event);
            }
            fired
        } else {
            Vec::new()
        };

        if let Some(outcome) = outcome {
            self.phase = Phase::Ended(outcome);
            info!(session = %self.id, turn, ?outcome, "Game ended");
        }

        debug!(
            session = %self.id,
            turn,
            stage = %live.stage,
            mood = live.emotions.mood,
            affection = live.emotions.affection,
            trust = live.emotions.trust,
            "Turn complete"
        );

        Ok(TurnOutcome {
            display_reply: display,
            applied_delta: applied,
            stage: live.stage,
            ended: outcome.is_some(),
            outcome,
            new_events,
            repetition,
            fallback: false,
        })
    }

    // -----------------------------------------------------------------------
    // Views
    // -----------------------------------------------------------------------

    fn view(&self, operation: &'static str) -> Result<&Live> {
        self.live.as_ref().ok_or(GameError::InvalidState {
            operation,
            phase: self.phase,
        })
    }

    /// Snapshot of the whole session.
    ///
    /// # Errors
    /// Returns [`GameError::InvalidState`] before `initialize`.
    pub fn state(&self) -> Result<SessionSnapshot> {
        let live = self.view("read the state")?;
        Ok(SessionSnapshot {
            session_id: self.id,
            phase: self.phase,
            character: live.profile.name.clone(),
            difficulty: live.profile.difficulty,
            emotions: live.emotions,
            stage: live.stage,
            progress: live.progress.clone(),
            history_len: live.ledger.len(),
        })
    }

    /// Ledger statistics.
    ///
    /// # Errors
    /// Returns [`GameError::InvalidState`] before `initialize`.
    pub fn stats(&self) -> Result<ConversationStats> {
        Ok(self.view("read statistics")?.ledger.stats())
    }

    /// Trend and engagement analysis of recent turns.
    ///
    /// # Errors
    /// Returns [`GameError::InvalidState`] before `initialize`.
    pub fn flow(&self) -> Result<FlowAnalysis> {
        Ok(self.view("analyze the flow")?.ledger.analyze_flow())
    }

    /// Up to four topics worth raising next.
    ///
    /// # Errors
    /// Returns [`GameError::InvalidState`] before `initialize`.
    pub fn suggested_topics(&self) -> Result<Vec<String>> {
        let live = self.view("suggest topics")?;
        Ok(live.ledger.suggested_topics(&live.profile))
    }

    /// Text bars for the current emotion vector.
    ///
    /// # Errors
    /// Returns [`GameError::InvalidState`] before `initialize`.
    pub fn visualize(&self) -> Result<String> {
        Ok(emotion::visualize(&self.view("visualize emotions")?.emotions))
    }

    /// Add `delta` to the vector verbatim, bypassing temperament.
    ///
    /// Meant for tooling and tests that need a specific state.
    ///
    /// # Errors
    /// Returns [`GameError::InvalidState`] unless the session is active.
    pub fn apply_unscaled(&mut self, delta: &EmotionDelta) -> Result<EmotionVector> {
        let phase = self.phase;
        let live = match (phase, self.live.as_mut()) {
            (Phase::Active, Some(live)) => live,
            _ => {
                return Err(GameError::InvalidState {
                    operation: "adjust emotions",
                    phase,
                });
            }
        };
        live.emotions = emotion::apply_unscaled(live.emotions, delta);
        live.stage = emotion::stage(&live.emotions);
        debug!(session = %self.id, ?delta, "Applied unscaled delta");
        Ok(live.emotions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> GameSession {
        GameSession::new(Arc::new(GameConfig::default()), Arc::new(Roster::builtin()))
    }

    #[test]
    fn views_are_rejected_before_initialize() {
        let s = session();
        assert!(matches!(
            s.state(),
            Err(GameError::InvalidState {
                phase: Phase::Uninitialized,
                ..
            })
        ));
        assert!(s.stats().is_err());
        assert!(s.flow().is_err());
        assert!(s.suggested_topics().is_err());
        assert!(s.visualize().is_err());
    }

    #[test]
    fn initialize_loads_the_tier_and_resets_state() {
        let mut s = session();
        s.initialize(Difficulty::Medium).expect("init");
        let snap = s.state().expect("state");
        assert_eq!(snap.phase, Phase::Active);
        assert_eq!(snap.character, "あや");
        assert_eq!(snap.emotions, EmotionVector::INITIAL);
        assert_eq!(snap.stage, RelationshipStage::Stranger);
        assert_eq!(snap.progress.turn_count, 0);
        assert_eq!(snap.history_len, 0);
    }

    #[test]
    fn reset_returns_to_uninitialized_and_keeps_the_id() {
        let mut s = session();
        let id = s.id();
        s.initialize(Difficulty::Easy).expect("init");
        s.reset();
        assert_eq!(s.phase(), Phase::Uninitialized);
        assert!(s.profile().is_none());
        assert_eq!(s.id(), id);
    }

    #[test]
    fn apply_unscaled_updates_the_stage() {
        let mut s = session();
        s.initialize(Difficulty::Easy).expect("init");
        let v = s
            .apply_unscaled(&EmotionDelta {
                affection: Some(45),
                trust: Some(45),
                ..EmotionDelta::new()
            })
            .expect("apply");
        assert_eq!(v.affection, 45);
        assert_eq!(v.trust, 55);
        assert_eq!(s.state().expect("state").stage, RelationshipStage::CloseFriend);
    }

    #[test]
    fn penalties_have_the_documented_shape() {
        assert_eq!(success_bonus().magnitude(), 35);
        assert_eq!(partial_penalty().magnitude(), 8);
        assert_eq!(final_penalty().magnitude(), 15);
        assert!(partial_penalty().trust.is_none());
    }

    #[test]
    fn phase_display_names_the_outcome() {
        assert_eq!(Phase::Ended(Outcome::Failure).to_string(), "ended (failure)");
        assert_eq!(Phase::Active.to_string(), "active");
    }
}
