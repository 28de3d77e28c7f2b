use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use super::{FollowUp, Intent, RefundFields};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub text: String,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
        }
    }
}

/// States of the conversation machine.
///
/// Only the first three are ever stored between turns. A music query runs
/// in `ResolvingMusicQuery`, and a turn that completes its work parks in
/// `TerminalTurn` until [`SessionState::end_turn`] returns it to
/// `AwaitingIntent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConversationPhase {
    #[default]
    AwaitingIntent,
    CollectingRefundInfo,
    ConfirmingRefund,
    ResolvingMusicQuery,
    TerminalTurn,
}

impl ConversationPhase {
    pub fn is_resting(&self) -> bool {
        matches!(
            self,
            ConversationPhase::AwaitingIntent
                | ConversationPhase::CollectingRefundInfo
                | ConversationPhase::ConfirmingRefund
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConversationPhase::AwaitingIntent => "AWAITING_INTENT",
            ConversationPhase::CollectingRefundInfo => "COLLECTING_REFUND_INFO",
            ConversationPhase::ConfirmingRefund => "CONFIRMING_REFUND",
            ConversationPhase::ResolvingMusicQuery => "RESOLVING_MUSIC_QUERY",
            ConversationPhase::TerminalTurn => "TERMINAL_TURN",
        }
    }
}

/// Everything the assistant remembers about one conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    id: String,
    history: Vec<Turn>,
    pending_intent: Option<Intent>,
    collected_fields: RefundFields,
    last_reply: Option<String>,
    phase: ConversationPhase,
    follow_ups: VecDeque<FollowUp>,
}

impl SessionState {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            history: Vec::new(),
            pending_intent: None,
            collected_fields: RefundFields::default(),
            last_reply: None,
            phase: ConversationPhase::AwaitingIntent,
            follow_ups: VecDeque::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn history(&self) -> &[Turn] {
        &self.history
    }

    /// The last `window` turns, oldest first.
    pub fn trailing_history(&self, window: usize) -> &[Turn] {
        let start = self.history.len().saturating_sub(window);
        &self.history[start..]
    }

    pub fn pending_intent(&self) -> Option<Intent> {
        self.pending_intent
    }

    pub fn collected_fields(&self) -> &RefundFields {
        &self.collected_fields
    }

    pub fn fields_mut(&mut self) -> &mut RefundFields {
        &mut self.collected_fields
    }

    pub fn last_reply(&self) -> Option<&str> {
        self.last_reply.as_deref()
    }

    pub fn phase(&self) -> ConversationPhase {
        self.phase
    }

    pub fn set_phase(&mut self, phase: ConversationPhase) {
        self.phase = phase;
    }

    /// Settles a finished turn back into `AwaitingIntent`.
    pub fn end_turn(&mut self) {
        if self.phase == ConversationPhase::TerminalTurn {
            self.phase = ConversationPhase::AwaitingIntent;
        }
    }

    pub fn follow_ups(&self) -> &VecDeque<FollowUp> {
        &self.follow_ups
    }

    pub fn queue_follow_up(&mut self, follow_up: FollowUp) {
        self.follow_ups.push_back(follow_up);
    }

    pub fn pop_follow_up(&mut self) -> Option<FollowUp> {
        self.follow_ups.pop_front()
    }

    /// Starts (or continues) a refund with `fields` merged in.
    pub fn begin_refund(&mut self, fields: RefundFields) {
        self.pending_intent = Some(Intent::Refund);
        self.collected_fields.merge(fields);
    }

    /// Drops the pending intent together with everything collected for it.
    pub fn clear_pending(&mut self) {
        self.pending_intent = None;
        self.collected_fields = RefundFields::default();
    }

    pub fn record_exchange(&mut self, utterance: &str, reply: &str) {
        self.history.push(Turn::user(utterance));
        self.history.push(Turn::assistant(reply));
        self.last_reply = Some(reply.to_string());
    }

    /// `pending_intent == None` implies nothing is collected, and the stored
    /// phase is a resting one.
    pub fn invariant_holds(&self) -> bool {
        (self.pending_intent.is_some() || self.collected_fields.is_empty()) && self.phase.is_resting()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_history_keeps_the_latest_turns() {
        let mut state = SessionState::new("s1");
        state.record_exchange("hi", "hello");
        state.record_exchange("I need a refund", "Sure");

        let window = state.trailing_history(3);
        assert_eq!(window.len(), 3);
        assert_eq!(window[0].text, "hello");
        assert_eq!(state.trailing_history(10).len(), 4);
        assert_eq!(state.last_reply(), Some("Sure"));
    }

    #[test]
    fn clearing_pending_empties_collected_fields() {
        let mut state = SessionState::new("s1");
        state.begin_refund(RefundFields::new().with_customer_name("Aaron Mitchell"));
        assert!(state.invariant_holds());

        state.clear_pending();
        assert_eq!(state.pending_intent(), None);
        assert!(state.collected_fields().is_empty());
        assert!(state.invariant_holds());
    }

    #[test]
    fn transient_phase_breaks_invariant() {
        let mut state = SessionState::new("s1");
        state.set_phase(ConversationPhase::ResolvingMusicQuery);
        assert!(!state.invariant_holds());
    }

    #[test]
    fn ending_a_turn_leaves_open_phases_alone() {
        let mut state = SessionState::new("s1");
        state.set_phase(ConversationPhase::TerminalTurn);
        assert!(!state.invariant_holds());
        state.end_turn();
        assert_eq!(state.phase(), ConversationPhase::AwaitingIntent);
        assert!(state.invariant_holds());

        state.begin_refund(RefundFields::new().with_invoice_id(256));
        state.set_phase(ConversationPhase::ConfirmingRefund);
        state.end_turn();
        assert_eq!(state.phase(), ConversationPhase::ConfirmingRefund);
    }

    #[test]
    fn follow_ups_are_first_in_first_out() {
        let mut state = SessionState::new("s1");
        state.queue_follow_up(FollowUp::new(Intent::MusicQuery, "jazz"));
        state.queue_follow_up(FollowUp::new(Intent::General, "thanks"));

        assert_eq!(state.pop_follow_up().map(|f| f.text), Some("jazz".to_string()));
        assert_eq!(state.pop_follow_up().map(|f| f.intent), Some(Intent::General));
        assert!(state.pop_follow_up().is_none());
    }
}
