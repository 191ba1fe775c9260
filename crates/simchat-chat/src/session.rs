//! Session state machine: conversation, pending override, request lifecycle.
//!
//! Status transitions:
//! - Idle -> Pending (send dispatched)
//! - Error -> Pending (send dispatched after a failure)
//! - Pending -> Idle (gateway success)
//! - Pending -> Error (gateway failure)
//!
//! Every mutation goes through [`SessionStateMachine::apply`]. The machine
//! never talks to the gateway itself: an accepted send yields a
//! [`DispatchTicket`] and the caller feeds the outcome back as an event.
//! Each ticket carries the epoch and request id it was issued under, so a
//! response that arrives after a reset, or for a request that is no longer in
//! flight, is discarded instead of being attributed to the wrong message.

use std::sync::Arc;

use simchat_core::config::ChatConfig;
use simchat_core::error::GatewayError;
use simchat_core::types::{ConversationEntry, SessionStatus, SimulationResult};
use uuid::Uuid;

use crate::breakdown::EnergyBreakdown;
use crate::error::{ChatError, InvalidInput};
use crate::formatter::format_result;

/// Identity of one dispatched simulation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestTag {
    /// Session generation the request belongs to.
    pub epoch: u64,
    /// Monotonic per-session request counter.
    pub request_id: u64,
}

/// Everything the caller needs to issue the gateway call for an accepted send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchTicket {
    pub tag: RequestTag,
    pub message: String,
    pub override_payload: Option<String>,
}

/// Where a send came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendSource {
    /// Typed by the user; consumes the pending override.
    Manual,
    /// Replayed from a history entry; never carries an override.
    Rerun,
}

/// Discrete inputs to the state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    SendMessage { text: String, source: SendSource },
    UploadOverride(String),
    ClearCurrentResult,
    Reset,
    SendSucceeded {
        tag: RequestTag,
        result: SimulationResult,
    },
    SendFailed {
        tag: RequestTag,
        error: GatewayError,
    },
}

/// Why an intent was not applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// A request is already in flight.
    Busy,
    Invalid(InvalidInput),
}

/// Result of applying one event.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// A send was accepted; the caller must issue the gateway call.
    Dispatch(DispatchTicket),
    /// State changed; nothing else to do.
    Applied,
    /// The intent was a no-op.
    Rejected(RejectReason),
    /// A response for a superseded request was discarded.
    Stale(RequestTag),
}

/// Snapshot the presentation layer renders from.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderModel {
    pub session_id: Uuid,
    pub entries: Vec<ConversationEntry>,
    pub status: SessionStatus,
    /// Progress indicator; only while a request is pending.
    pub show_progress: bool,
    pub override_pending: bool,
    pub current_result: Option<Arc<SimulationResult>>,
    pub breakdown: Option<EnergyBreakdown>,
}

/// Whether the session status may move from `from` to `to` on a request
/// lifecycle event. Resets are not lifecycle events and bypass this check.
pub fn status_transition_allowed(from: SessionStatus, to: SessionStatus) -> bool {
    matches!(
        (from, to),
        (SessionStatus::Idle, SessionStatus::Pending)
            | (SessionStatus::Error, SessionStatus::Pending)
            | (SessionStatus::Pending, SessionStatus::Idle)
            | (SessionStatus::Pending, SessionStatus::Error)
    )
}

/// In-memory state of one chat session.
#[derive(Debug, Clone)]
pub struct SessionStateMachine {
    id: Uuid,
    epoch: u64,
    next_request_id: u64,
    in_flight: Option<RequestTag>,
    status: SessionStatus,
    entries: Vec<ConversationEntry>,
    pending_override: Option<String>,
    current_result: Option<Arc<SimulationResult>>,
    last_error: Option<ChatError>,
    config: ChatConfig,
}

impl Default for SessionStateMachine {
    fn default() -> Self {
        Self::new(ChatConfig::default())
    }
}

impl SessionStateMachine {
    /// A fresh session: Idle, empty transcript, no override, no result.
    pub fn new(config: ChatConfig) -> Self {
        Self {
            id: Uuid::new_v4(),
            epoch: 0,
            next_request_id: 0,
            in_flight: None,
            status: SessionStatus::Idle,
            entries: Vec::new(),
            pending_override: None,
            current_result: None,
            last_error: None,
            config,
        }
    }

    // -- Accessors --

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    /// Transcript in append order.
    pub fn entries(&self) -> &[ConversationEntry] {
        &self.entries
    }

    pub fn pending_override(&self) -> Option<&str> {
        self.pending_override.as_deref()
    }

    /// Result of the most recently completed successful send.
    pub fn current_result(&self) -> Option<&Arc<SimulationResult>> {
        self.current_result.as_ref()
    }

    pub fn in_flight(&self) -> Option<RequestTag> {
        self.in_flight
    }

    /// The failure behind the `Error` status, cleared on the next dispatch.
    pub fn last_error(&self) -> Option<&ChatError> {
        self.last_error.as_ref()
    }

    // -- Intents --

    pub fn send_message(&mut self, text: &str) -> Transition {
        self.apply(SessionEvent::SendMessage {
            text: text.to_string(),
            source: SendSource::Manual,
        })
    }

    /// Send a replayed history message without any override.
    pub fn rerun(&mut self, message: &str) -> Transition {
        self.apply(SessionEvent::SendMessage {
            text: message.to_string(),
            source: SendSource::Rerun,
        })
    }

    pub fn upload_override(&mut self, content: &str) -> Transition {
        self.apply(SessionEvent::UploadOverride(content.to_string()))
    }

    pub fn clear_current_result(&mut self) -> Transition {
        self.apply(SessionEvent::ClearCurrentResult)
    }

    pub fn reset(&mut self) -> Transition {
        self.apply(SessionEvent::Reset)
    }

    /// Feed a gateway outcome for a previously dispatched ticket.
    pub fn complete(
        &mut self,
        tag: RequestTag,
        outcome: Result<SimulationResult, GatewayError>,
    ) -> Transition {
        match outcome {
            Ok(result) => self.apply(SessionEvent::SendSucceeded { tag, result }),
            Err(error) => self.apply(SessionEvent::SendFailed { tag, error }),
        }
    }

    /// The single transition function.
    pub fn apply(&mut self, event: SessionEvent) -> Transition {
        match event {
            SessionEvent::SendMessage { text, source } => self.on_send(text, source),
            SessionEvent::UploadOverride(content) => self.on_upload(content),
            SessionEvent::ClearCurrentResult => {
                self.current_result = None;
                Transition::Applied
            }
            SessionEvent::Reset => self.on_reset(),
            SessionEvent::SendSucceeded { tag, result } => self.on_success(tag, result),
            SessionEvent::SendFailed { tag, error } => self.on_failure(tag, error),
        }
    }

    /// Snapshot for rendering.
    pub fn render(&self) -> RenderModel {
        RenderModel {
            session_id: self.id,
            entries: self.entries.clone(),
            status: self.status,
            show_progress: self.status == SessionStatus::Pending,
            override_pending: self.pending_override.is_some(),
            current_result: self.current_result.clone(),
            breakdown: self
                .current_result
                .as_deref()
                .map(EnergyBreakdown::from_result),
        }
    }

    // -- Transition handlers --

    fn on_send(&mut self, text: String, source: SendSource) -> Transition {
        if !self.status.accepts_input() {
            tracing::debug!(session_id = %self.id, "Send rejected: request already in flight");
            return Transition::Rejected(RejectReason::Busy);
        }
        if text.trim().is_empty() {
            return Transition::Rejected(RejectReason::Invalid(InvalidInput::EmptyMessage));
        }

        self.entries.push(ConversationEntry::user(text.as_str()));
        self.set_status(SessionStatus::Pending);
        self.last_error = None;

        // Detached on every dispatch so an override never outlives one send.
        let detached = self.pending_override.take();
        let override_payload = match source {
            SendSource::Manual => detached,
            SendSource::Rerun => {
                if detached.is_some() {
                    tracing::info!(
                        session_id = %self.id,
                        "Pending override discarded: re-runs replay the message only"
                    );
                }
                None
            }
        };

        let tag = RequestTag {
            epoch: self.epoch,
            request_id: self.next_request_id,
        };
        self.next_request_id += 1;
        self.in_flight = Some(tag);

        tracing::info!(
            session_id = %self.id,
            epoch = tag.epoch,
            request_id = tag.request_id,
            has_override = override_payload.is_some(),
            rerun = source == SendSource::Rerun,
            "Simulation request dispatched"
        );

        Transition::Dispatch(DispatchTicket {
            tag,
            message: text,
            override_payload,
        })
    }

    fn on_upload(&mut self, content: String) -> Transition {
        if content.trim().is_empty() {
            return Transition::Rejected(RejectReason::Invalid(InvalidInput::EmptyOverride));
        }
        if self.pending_override.is_some() {
            tracing::debug!(session_id = %self.id, "Replacing pending override");
        }
        self.pending_override = Some(content);
        self.entries
            .push(ConversationEntry::user(self.config.override_notice.as_str()));
        Transition::Applied
    }

    fn on_reset(&mut self) -> Transition {
        self.epoch += 1;
        self.in_flight = None;
        self.status = SessionStatus::Idle;
        self.entries.clear();
        self.pending_override = None;
        self.current_result = None;
        self.last_error = None;
        tracing::info!(session_id = %self.id, epoch = self.epoch, "Session reset");
        Transition::Applied
    }

    fn on_success(&mut self, tag: RequestTag, result: SimulationResult) -> Transition {
        if !self.take_in_flight(tag) {
            return Transition::Stale(tag);
        }
        let result = Arc::new(result);
        self.entries.push(ConversationEntry::assistant(
            format_result(&result),
            Some(Arc::clone(&result)),
        ));
        self.current_result = Some(result);
        self.set_status(SessionStatus::Idle);
        tracing::info!(
            session_id = %self.id,
            request_id = tag.request_id,
            "Simulation completed"
        );
        Transition::Applied
    }

    fn on_failure(&mut self, tag: RequestTag, error: GatewayError) -> Transition {
        if !self.take_in_flight(tag) {
            return Transition::Stale(tag);
        }
        tracing::warn!(
            session_id = %self.id,
            request_id = tag.request_id,
            error_kind = error.kind(),
            error = %error,
            "Simulation request failed"
        );
        self.entries.push(ConversationEntry::assistant(
            self.config.failure_message.as_str(),
            None,
        ));
        self.last_error = Some(ChatError::SendFailure(error));
        self.set_status(SessionStatus::Error);
        Transition::Applied
    }

    /// Clear the in-flight slot if `tag` is the request it holds.
    fn take_in_flight(&mut self, tag: RequestTag) -> bool {
        if self.in_flight == Some(tag) {
            self.in_flight = None;
            true
        } else {
            tracing::debug!(
                session_id = %self.id,
                epoch = tag.epoch,
                current_epoch = self.epoch,
                request_id = tag.request_id,
                "Discarding stale simulation response"
            );
            false
        }
    }

    fn set_status(&mut self, target: SessionStatus) {
        if !status_transition_allowed(self.status, target) {
            tracing::warn!("Unexpected session status change: {} -> {}", self.status, target);
        }
        tracing::debug!("Session status: {} -> {}", self.status, target);
        self.status = target;
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use simchat_core::types::{EnergyByCategory, Role};

    fn result(total: f64) -> SimulationResult {
        SimulationResult::from_categories(EnergyByCategory {
            cooling: total,
            ..EnergyByCategory::default()
        })
    }

    fn dispatch(sm: &mut SessionStateMachine, text: &str) -> DispatchTicket {
        match sm.send_message(text) {
            Transition::Dispatch(ticket) => ticket,
            other => panic!("expected dispatch, got {:?}", other),
        }
    }

    // ---- Initial state ----

    #[test]
    fn test_initial_state() {
        let sm = SessionStateMachine::default();
        assert_eq!(sm.status(), SessionStatus::Idle);
        assert!(sm.entries().is_empty());
        assert!(sm.pending_override().is_none());
        assert!(sm.current_result().is_none());
        assert!(sm.in_flight().is_none());
        assert_eq!(sm.epoch(), 0);
    }

    // ---- Status transition table ----

    #[test]
    fn test_status_transition_table() {
        use SessionStatus::*;
        assert!(status_transition_allowed(Idle, Pending));
        assert!(status_transition_allowed(Error, Pending));
        assert!(status_transition_allowed(Pending, Idle));
        assert!(status_transition_allowed(Pending, Error));

        assert!(!status_transition_allowed(Pending, Pending));
        assert!(!status_transition_allowed(Idle, Error));
        assert!(!status_transition_allowed(Error, Idle));
        assert!(!status_transition_allowed(Idle, Idle));
    }

    // ---- Input validation ----

    #[test]
    fn test_empty_message_is_noop() {
        let mut sm = SessionStateMachine::default();
        for text in ["", "   ", "\n\t"] {
            assert_eq!(
                sm.send_message(text),
                Transition::Rejected(RejectReason::Invalid(InvalidInput::EmptyMessage))
            );
        }
        assert!(sm.entries().is_empty());
        assert_eq!(sm.status(), SessionStatus::Idle);
    }

    #[test]
    fn test_empty_override_is_noop() {
        let mut sm = SessionStateMachine::default();
        assert_eq!(
            sm.upload_override("  \n"),
            Transition::Rejected(RejectReason::Invalid(InvalidInput::EmptyOverride))
        );
        assert!(sm.entries().is_empty());
        assert!(sm.pending_override().is_none());
    }

    // ---- Send lifecycle ----

    #[test]
    fn test_send_appends_user_entry_and_goes_pending() {
        let mut sm = SessionStateMachine::default();
        let ticket = dispatch(&mut sm, "simulate a 2-story office");

        assert_eq!(ticket.message, "simulate a 2-story office");
        assert!(ticket.override_payload.is_none());
        assert_eq!(sm.status(), SessionStatus::Pending);
        assert_eq!(sm.in_flight(), Some(ticket.tag));
        assert_eq!(sm.entries().len(), 1);
        assert_eq!(sm.entries()[0].role, Role::User);
        assert_eq!(sm.entries()[0].content, "simulate a 2-story office");
    }

    #[test]
    fn test_send_while_pending_is_rejected() {
        let mut sm = SessionStateMachine::default();
        dispatch(&mut sm, "first");
        assert_eq!(
            sm.send_message("second"),
            Transition::Rejected(RejectReason::Busy)
        );
        assert_eq!(sm.entries().len(), 1);
        assert_eq!(sm.status(), SessionStatus::Pending);
    }

    #[test]
    fn test_success_appends_formatted_reply_and_sets_result() {
        let mut sm = SessionStateMachine::default();
        let ticket = dispatch(&mut sm, "run");
        assert_eq!(sm.complete(ticket.tag, Ok(result(200.0))), Transition::Applied);

        assert_eq!(sm.status(), SessionStatus::Idle);
        assert!(sm.in_flight().is_none());
        assert_eq!(sm.entries().len(), 2);

        let reply = &sm.entries()[1];
        assert_eq!(reply.role, Role::Assistant);
        assert_eq!(reply.content, format_result(&result(200.0)));

        let current = sm.current_result().unwrap();
        assert_eq!(current.total_energy, 200.0);
        assert!(Arc::ptr_eq(reply.result.as_ref().unwrap(), current));
    }

    #[test]
    fn test_failure_keeps_previous_result() {
        let mut sm = SessionStateMachine::default();
        let first = dispatch(&mut sm, "first");
        sm.complete(first.tag, Ok(result(100.0)));

        let second = dispatch(&mut sm, "second");
        let transition = sm.complete(
            second.tag,
            Err(GatewayError::Transport("connection refused".into())),
        );
        assert_eq!(transition, Transition::Applied);

        assert_eq!(sm.status(), SessionStatus::Error);
        assert_eq!(sm.entries().len(), 4);
        assert_eq!(sm.entries()[2].role, Role::User);
        let reply = &sm.entries()[3];
        assert_eq!(reply.role, Role::Assistant);
        assert_eq!(reply.content, ChatConfig::default().failure_message);
        assert!(reply.result.is_none());
        assert_eq!(sm.current_result().unwrap().total_energy, 100.0);
        assert!(matches!(sm.last_error(), Some(ChatError::SendFailure(_))));
    }

    #[test]
    fn test_failure_without_prior_result_leaves_slot_empty() {
        let mut sm = SessionStateMachine::default();
        let ticket = dispatch(&mut sm, "run");
        sm.complete(ticket.tag, Err(GatewayError::Engine("bad".into())));
        assert!(sm.current_result().is_none());
    }

    #[test]
    fn test_error_status_accepts_new_send() {
        let mut sm = SessionStateMachine::default();
        let ticket = dispatch(&mut sm, "run");
        sm.complete(ticket.tag, Err(GatewayError::Engine("bad".into())));
        assert_eq!(sm.status(), SessionStatus::Error);

        let retry = dispatch(&mut sm, "run again");
        assert_eq!(sm.status(), SessionStatus::Pending);
        assert!(sm.last_error().is_none());
        assert_ne!(retry.tag, ticket.tag);
    }

    // ---- Override handling ----

    #[test]
    fn test_upload_appends_notice_without_sending() {
        let mut sm = SessionStateMachine::default();
        assert_eq!(sm.upload_override("Version,24.1;"), Transition::Applied);
        assert_eq!(sm.pending_override(), Some("Version,24.1;"));
        assert_eq!(sm.status(), SessionStatus::Idle);
        assert_eq!(sm.entries().len(), 1);
        assert_eq!(sm.entries()[0].role, Role::User);
        assert_eq!(
            sm.entries()[0].content,
            ChatConfig::default().override_notice
        );
    }

    #[test]
    fn test_override_last_write_wins() {
        let mut sm = SessionStateMachine::default();
        sm.upload_override("A");
        sm.upload_override("B");
        let ticket = dispatch(&mut sm, "m");
        assert_eq!(ticket.override_payload.as_deref(), Some("B"));
    }

    #[test]
    fn test_override_cleared_after_success() {
        let mut sm = SessionStateMachine::default();
        sm.upload_override("A");
        let ticket = dispatch(&mut sm, "m");
        assert!(sm.pending_override().is_none());
        sm.complete(ticket.tag, Ok(result(1.0)));
        assert!(sm.pending_override().is_none());

        let next = dispatch(&mut sm, "m2");
        assert!(next.override_payload.is_none());
    }

    #[test]
    fn test_override_cleared_after_failure() {
        let mut sm = SessionStateMachine::default();
        sm.upload_override("A");
        let ticket = dispatch(&mut sm, "m");
        sm.complete(ticket.tag, Err(GatewayError::Engine("malformed IDF".into())));
        assert!(sm.pending_override().is_none());

        let next = dispatch(&mut sm, "m2");
        assert!(next.override_payload.is_none());
    }

    #[test]
    fn test_rejected_send_keeps_override() {
        let mut sm = SessionStateMachine::default();
        sm.upload_override("A");
        sm.send_message("   ");
        assert_eq!(sm.pending_override(), Some("A"));
    }

    #[test]
    fn test_rerun_never_attaches_override() {
        let mut sm = SessionStateMachine::default();
        sm.upload_override("A");
        let ticket = match sm.rerun("simulate a 2-story office") {
            Transition::Dispatch(t) => t,
            other => panic!("expected dispatch, got {:?}", other),
        };
        assert_eq!(ticket.message, "simulate a 2-story office");
        assert!(ticket.override_payload.is_none());
        assert!(sm.pending_override().is_none());
    }

    // ---- Stale responses ----

    #[test]
    fn test_response_after_reset_is_stale() {
        let mut sm = SessionStateMachine::default();
        let ticket = dispatch(&mut sm, "run");
        sm.reset();

        assert_eq!(sm.complete(ticket.tag, Ok(result(5.0))), Transition::Stale(ticket.tag));
        assert!(sm.entries().is_empty());
        assert!(sm.current_result().is_none());
        assert_eq!(sm.status(), SessionStatus::Idle);
    }

    #[test]
    fn test_old_response_does_not_complete_new_request() {
        let mut sm = SessionStateMachine::default();
        let old = dispatch(&mut sm, "old");
        sm.reset();
        let new = dispatch(&mut sm, "new");
        assert_eq!(old.tag.request_id + 1, new.tag.request_id);
        assert_eq!(new.tag.epoch, 1);

        assert_eq!(
            sm.complete(old.tag, Err(GatewayError::Transport("late".into()))),
            Transition::Stale(old.tag)
        );
        assert_eq!(sm.status(), SessionStatus::Pending);
        assert_eq!(sm.in_flight(), Some(new.tag));

        assert_eq!(sm.complete(new.tag, Ok(result(9.0))), Transition::Applied);
        assert_eq!(sm.current_result().unwrap().total_energy, 9.0);
    }

    #[test]
    fn test_duplicate_completion_is_stale() {
        let mut sm = SessionStateMachine::default();
        let ticket = dispatch(&mut sm, "run");
        sm.complete(ticket.tag, Ok(result(1.0)));
        assert_eq!(
            sm.complete(ticket.tag, Ok(result(2.0))),
            Transition::Stale(ticket.tag)
        );
        assert_eq!(sm.entries().len(), 2);
        assert_eq!(sm.current_result().unwrap().total_energy, 1.0);
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut sm = SessionStateMachine::default();
        let ticket = dispatch(&mut sm, "run");
        sm.complete(ticket.tag, Ok(result(1.0)));
        sm.upload_override("A");
        sm.reset();

        assert_eq!(sm.epoch(), 1);
        assert!(sm.entries().is_empty());
        assert!(sm.pending_override().is_none());
        assert!(sm.current_result().is_none());
    }

    // ---- Ordering ----

    #[test]
    fn test_entries_alternate_user_assistant() {
        let mut sm = SessionStateMachine::default();
        for i in 0..5 {
            let ticket = dispatch(&mut sm, &format!("message {}", i));
            let outcome = if i % 2 == 0 {
                Ok(result(i as f64))
            } else {
                Err(GatewayError::Engine("fail".into()))
            };
            sm.complete(ticket.tag, outcome);
        }

        assert_eq!(sm.entries().len(), 10);
        for (i, pair) in sm.entries().chunks(2).enumerate() {
            assert_eq!(pair[0].role, Role::User);
            assert_eq!(pair[0].content, format!("message {}", i));
            assert_eq!(pair[1].role, Role::Assistant);
        }
        assert_eq!(sm.current_result().unwrap().total_energy, 4.0);
    }

    // ---- Results panel ----

    #[test]
    fn test_clear_current_result_keeps_history() {
        let mut sm = SessionStateMachine::default();
        let ticket = dispatch(&mut sm, "run");
        sm.complete(ticket.tag, Ok(result(1.0)));

        assert_eq!(sm.clear_current_result(), Transition::Applied);
        assert!(sm.current_result().is_none());
        assert_eq!(sm.entries().len(), 2);
        assert!(sm.entries()[1].result.is_some());
    }

    #[test]
    fn test_render_model() {
        let mut sm = SessionStateMachine::default();
        sm.upload_override("A");
        let ticket = dispatch(&mut sm, "run");

        let pending = sm.render();
        assert!(pending.show_progress);
        assert!(!pending.override_pending);
        assert!(pending.breakdown.is_none());
        assert_eq!(pending.entries.len(), 2);

        sm.complete(ticket.tag, Ok(result(10.0)));
        let done = sm.render();
        assert!(!done.show_progress);
        assert_eq!(done.status, SessionStatus::Idle);
        assert_eq!(done.breakdown.unwrap().total_energy, 10.0);

        let ticket = dispatch(&mut sm, "again");
        sm.complete(ticket.tag, Err(GatewayError::Transport("down".into())));
        let failed = sm.render();
        assert!(!failed.show_progress);
        assert_eq!(failed.status, SessionStatus::Error);
        assert!(failed.current_result.is_some());
    }
}
