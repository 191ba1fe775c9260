//! Client-side cache of past simulation runs.
//!
//! The server's listing is the source of truth: a successful refresh replaces
//! the cache wholesale, a failed one keeps the last good snapshot and raises a
//! transient error flag. Only one refresh may be in flight; further requests
//! while it runs are coalesced into it.

use chrono::{DateTime, Utc};
use simchat_core::error::GatewayError;
use simchat_core::types::HistoryEntry;

use crate::error::ChatError;
use crate::session::{SendSource, SessionEvent};

/// Identity of one dispatched history refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RefreshTicket {
    pub epoch: u64,
    pub refresh_id: u64,
}

/// What a completed refresh did to the cache.
#[derive(Debug, Clone, PartialEq)]
pub enum RefreshStatus {
    /// Cache replaced; holds the new entry count.
    Updated(usize),
    /// Listing failed; previous cache kept.
    Failed(ChatError),
    /// Not the refresh currently in flight; ignored.
    Stale(RefreshTicket),
}

/// Order entries newest first, breaking timestamp ties by id descending.
pub fn sort_newest_first(entries: &mut [HistoryEntry]) {
    entries.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.id.cmp(&a.id))
    });
}

/// Fetched history plus refresh bookkeeping.
#[derive(Debug, Clone, Default)]
pub struct HistoryReconciler {
    entries: Vec<HistoryEntry>,
    in_flight: Option<RefreshTicket>,
    next_refresh_id: u64,
    epoch: u64,
    last_error: Option<ChatError>,
    refreshed_at: Option<DateTime<Utc>>,
}

impl HistoryReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached entries, newest first.
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Failure of the last refresh, until dismissed or a refresh succeeds.
    pub fn last_error(&self) -> Option<&ChatError> {
        self.last_error.as_ref()
    }

    pub fn dismiss_error(&mut self) {
        self.last_error = None;
    }

    /// When the cache was last replaced.
    pub fn refreshed_at(&self) -> Option<DateTime<Utc>> {
        self.refreshed_at
    }

    pub fn find(&self, id: &str) -> Option<&HistoryEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Start a refresh, or return `None` when one is already running.
    pub fn begin_refresh(&mut self) -> Option<RefreshTicket> {
        if let Some(running) = self.in_flight {
            tracing::debug!(
                refresh_id = running.refresh_id,
                "History refresh already in flight; coalescing"
            );
            return None;
        }
        let ticket = RefreshTicket {
            epoch: self.epoch,
            refresh_id: self.next_refresh_id,
        };
        self.next_refresh_id += 1;
        self.in_flight = Some(ticket);
        Some(ticket)
    }

    /// Fold a listing outcome into the cache.
    pub fn complete_refresh(
        &mut self,
        ticket: RefreshTicket,
        outcome: Result<Vec<HistoryEntry>, GatewayError>,
    ) -> RefreshStatus {
        if self.in_flight != Some(ticket) {
            tracing::debug!(
                refresh_id = ticket.refresh_id,
                epoch = ticket.epoch,
                "Discarding stale history listing"
            );
            return RefreshStatus::Stale(ticket);
        }
        self.in_flight = None;

        match outcome {
            Ok(mut entries) => {
                sort_newest_first(&mut entries);
                let count = entries.len();
                self.entries = entries;
                self.last_error = None;
                self.refreshed_at = Some(Utc::now());
                tracing::debug!(count, "History cache replaced");
                RefreshStatus::Updated(count)
            }
            Err(error) => {
                tracing::warn!(
                    error_kind = error.kind(),
                    error = %error,
                    cached = self.entries.len(),
                    "History refresh failed; keeping cached entries"
                );
                let error = ChatError::HistoryFetchFailure(error);
                self.last_error = Some(error.clone());
                RefreshStatus::Failed(error)
            }
        }
    }

    /// Drop the cache and orphan any refresh in flight.
    pub fn clear(&mut self) {
        self.epoch += 1;
        self.in_flight = None;
        self.entries.clear();
        self.last_error = None;
        self.refreshed_at = None;
    }

    /// Map a history entry to the send it replays: the message text only.
    pub fn select_for_rerun(&self, entry: &HistoryEntry) -> SessionEvent {
        SessionEvent::SendMessage {
            text: entry.message.clone(),
            source: SendSource::Rerun,
        }
    }
}
