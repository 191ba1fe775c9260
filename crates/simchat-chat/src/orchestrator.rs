//! Chat orchestrator: wires the session and history state machines to a
//! simulation gateway.
//!
//! State locks are never held across a gateway call; the state machines'
//! single-flight checks and request tags keep overlapping calls honest.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use simchat_core::config::ChatConfig;
use simchat_core::error::GatewayError;
use simchat_core::gateway::SimulationGateway;
use simchat_core::types::{HistoryEntry, SimulationResult};

use crate::breakdown::ResultComparison;
use crate::error::ChatError;
use crate::history::{HistoryReconciler, RefreshStatus, RefreshTicket};
use crate::session::{
    DispatchTicket, RejectReason, RenderModel, RequestTag, SessionEvent, SessionStateMachine,
    Transition,
};

/// Error recorded for a request whose caller stopped waiting on it.
const ABANDONED: &str = "request abandoned";

/// How a send ended, from the caller's point of view.
#[derive(Debug, Clone, PartialEq)]
pub enum SendOutcome {
    /// The gateway returned a result, now the current result.
    Completed(Arc<SimulationResult>),
    /// The gateway failed; an error reply was appended.
    Failed(ChatError),
    /// The intent was not accepted; nothing was sent.
    Rejected(RejectReason),
    /// The response arrived after the session moved on and was dropped.
    Discarded,
}

/// Read-only view of the history cache.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryView {
    pub entries: Vec<HistoryEntry>,
    pub loading: bool,
    pub error: Option<ChatError>,
}

/// Central coordinator for one chat session.
pub struct ChatOrchestrator {
    gateway: Arc<dyn SimulationGateway>,
    session: Mutex<SessionStateMachine>,
    history: Mutex<HistoryReconciler>,
}

impl ChatOrchestrator {
    pub fn new(gateway: Arc<dyn SimulationGateway>, config: ChatConfig) -> Self {
        let session = SessionStateMachine::new(config);
        tracing::debug!(session_id = %session.id(), "Chat session created");
        Self {
            gateway,
            session: Mutex::new(session),
            history: Mutex::new(HistoryReconciler::new()),
        }
    }

    /// Send a user message, attaching the pending override if any.
    pub async fn send_message(&self, text: &str) -> SendOutcome {
        let transition = self.session().send_message(text);
        self.drive(transition).await
    }

    /// Replay a past run's message. The original override is not replayed.
    pub async fn rerun(&self, entry: &HistoryEntry) -> SendOutcome {
        let event = self.history().select_for_rerun(entry);
        let transition = self.session().apply(event);
        self.drive(transition).await
    }

    /// Attach a configuration override to the next send.
    pub fn upload_override(&self, content: &str) -> Transition {
        self.session().upload_override(content)
    }

    /// Dismiss the results panel.
    pub fn clear_current_result(&self) {
        self.session().clear_current_result();
    }

    /// Start over: empty transcript, new epoch. In-flight replies are dropped.
    pub fn reset(&self) {
        self.session().apply(SessionEvent::Reset);
    }

    pub fn render(&self) -> RenderModel {
        self.session().render()
    }

    /// Refresh the history cache. Returns `None` when a refresh was already
    /// running and this call was coalesced into it.
    pub async fn refresh_history(&self) -> Option<RefreshStatus> {
        let ticket = self.history().begin_refresh()?;
        let mut guard = RefreshGuard {
            chat: self,
            ticket: Some(ticket),
        };
        let outcome = self.gateway.list_history().await;
        guard.ticket = None;
        Some(self.history().complete_refresh(ticket, outcome))
    }

    pub fn history_view(&self) -> HistoryView {
        let history = self.history();
        HistoryView {
            entries: history.entries().to_vec(),
            loading: history.is_loading(),
            error: history.last_error().cloned(),
        }
    }

    /// A cached history entry by id.
    pub fn history_entry(&self, id: &str) -> Option<HistoryEntry> {
        self.history().find(id).cloned()
    }

    /// Compare the displayed result with a cached past run.
    pub fn compare_with(&self, history_id: &str) -> Option<ResultComparison> {
        let baseline = self.history_entry(history_id)?;
        let current = self.session().current_result().cloned()?;
        Some(ResultComparison::against(&baseline, &current))
    }

    // -- Private helpers --

    fn session(&self) -> MutexGuard<'_, SessionStateMachine> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn history(&self) -> MutexGuard<'_, HistoryReconciler> {
        self.history.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn drive(&self, transition: Transition) -> SendOutcome {
        match transition {
            Transition::Dispatch(ticket) => self.dispatch(ticket).await,
            Transition::Rejected(reason) => SendOutcome::Rejected(reason),
            Transition::Stale(_) | Transition::Applied => SendOutcome::Discarded,
        }
    }

    async fn dispatch(&self, ticket: DispatchTicket) -> SendOutcome {
        let mut guard = SendGuard {
            chat: self,
            tag: Some(ticket.tag),
        };
        let outcome = self
            .gateway
            .run(&ticket.message, ticket.override_payload.as_deref())
            .await;
        guard.tag = None;
        let failure = outcome.as_ref().err().cloned();

        let mut session = self.session();
        match (session.complete(ticket.tag, outcome), failure) {
            (Transition::Stale(_), _) => SendOutcome::Discarded,
            (_, Some(error)) => SendOutcome::Failed(ChatError::SendFailure(error)),
            (_, None) => match session.current_result() {
                Some(result) => SendOutcome::Completed(Arc::clone(result)),
                None => SendOutcome::Discarded,
            },
        }
    }
}

/// Fails the in-flight send if the future awaiting it is dropped.
struct SendGuard<'a> {
    chat: &'a ChatOrchestrator,
    tag: Option<RequestTag>,
}

impl Drop for SendGuard<'_> {
    fn drop(&mut self) {
        if let Some(tag) = self.tag.take() {
            tracing::warn!(
                epoch = tag.epoch,
                request_id = tag.request_id,
                "Send abandoned before the gateway replied"
            );
            self.chat
                .session()
                .complete(tag, Err(GatewayError::Transport(ABANDONED.to_string())));
        }
    }
}

/// Fails the in-flight refresh if the future awaiting it is dropped.
struct RefreshGuard<'a> {
    chat: &'a ChatOrchestrator,
    ticket: Option<RefreshTicket>,
}

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        if let Some(ticket) = self.ticket.take() {
            self.chat
                .history()
                .complete_refresh(ticket, Err(GatewayError::Transport(ABANDONED.to_string())));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use simchat_core::gateway::MockGateway;
    use simchat_core::types::SessionStatus;

    fn orchestrator(gateway: Arc<MockGateway>) -> ChatOrchestrator {
        ChatOrchestrator::new(gateway, ChatConfig::default())
    }

    #[tokio::test]
    async fn test_send_success() {
        let gateway = Arc::new(MockGateway::new());
        let chat = orchestrator(Arc::clone(&gateway));

        let outcome = chat.send_message("simulate an office").await;
        assert_eq!(
            outcome,
            SendOutcome::Completed(Arc::new(MockGateway::default_result()))
        );

        let view = chat.render();
        assert_eq!(view.status, SessionStatus::Idle);
        assert_eq!(view.entries.len(), 2);
        assert_eq!(
            view.current_result.as_deref(),
            Some(&MockGateway::default_result())
        );
    }

    #[tokio::test]
    async fn test_send_failure_is_recovered() {
        let gateway = Arc::new(MockGateway::new());
        gateway.push_run(Err(GatewayError::Engine("malformed IDF".into())));
        let chat = orchestrator(Arc::clone(&gateway));

        let outcome = chat.send_message("run").await;
        assert_eq!(
            outcome,
            SendOutcome::Failed(ChatError::SendFailure(GatewayError::Engine(
                "malformed IDF".into()
            )))
        );
        assert_eq!(chat.render().status, SessionStatus::Error);

        assert!(matches!(
            chat.send_message("again").await,
            SendOutcome::Completed(_)
        ));
    }

    #[tokio::test]
    async fn test_empty_message_never_reaches_gateway() {
        let gateway = Arc::new(MockGateway::new());
        let chat = orchestrator(Arc::clone(&gateway));

        assert!(matches!(
            chat.send_message("  ").await,
            SendOutcome::Rejected(RejectReason::Invalid(_))
        ));
        assert!(gateway.calls().is_empty());
        assert!(chat.render().entries.is_empty());
    }

    #[tokio::test]
    async fn test_compare_with_history_entry() {
        let gateway = Arc::new(MockGateway::new());
        let chat = orchestrator(Arc::clone(&gateway));
        assert!(chat.compare_with("sim_1").is_none());

        gateway.push_history(Ok(vec![HistoryEntry {
            id: "sim_1".to_string(),
            message: "baseline".to_string(),
            created_at: chrono::Utc::now(),
            total_energy: 29_000.0,
            energy_by_category: Default::default(),
            config_file_name: None,
            used_fallback_data: true,
        }]));
        chat.refresh_history().await;
        chat.send_message("current").await;

        let cmp = chat.compare_with("sim_1").unwrap();
        assert_eq!(cmp.total.baseline, 29_000.0);
        assert_eq!(cmp.total.current, 58_000.0);
        assert_eq!(cmp.total.percent, Some(100.0));
        assert!(chat.compare_with("sim_missing").is_none());
    }

    #[tokio::test]
    async fn test_clear_current_result() {
        let chat = orchestrator(Arc::new(MockGateway::new()));
        chat.send_message("run").await;
        chat.clear_current_result();
        let view = chat.render();
        assert!(view.current_result.is_none());
        assert_eq!(view.entries.len(), 2);
    }
}
