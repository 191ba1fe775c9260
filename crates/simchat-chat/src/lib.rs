//! Conversational core for SimChat.
//!
//! Owns the chat transcript and request lifecycle, folds one-shot
//! configuration overrides into the next simulation request, formats results,
//! and keeps the run history cache that re-runs are replayed from.

pub mod breakdown;
pub mod error;
pub mod formatter;
pub mod history;
pub mod orchestrator;
pub mod session;

pub use breakdown::{CategoryShare, Delta, EnergyBreakdown, ResultComparison};
pub use error::{ChatError, InvalidInput};
pub use formatter::{format_energy, format_result, group_thousands};
pub use history::{HistoryReconciler, RefreshStatus, RefreshTicket};
pub use orchestrator::{ChatOrchestrator, HistoryView, SendOutcome};
pub use session::{
    DispatchTicket, RejectReason, RenderModel, RequestTag, SendSource, SessionEvent,
    SessionStateMachine, Transition,
};
