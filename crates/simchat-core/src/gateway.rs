//! The remote simulation capability and an in-memory stand-in for tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::sync::Semaphore;

use crate::error::GatewayError;
use crate::types::{EnergyByCategory, HistoryEntry, SimulationResult};

/// Issues simulation and history requests against the simulation backend.
///
/// The override payload is passed through untouched; validating it is the
/// engine's job and a bad payload comes back as [`GatewayError::Engine`].
#[async_trait]
pub trait SimulationGateway: Send + Sync {
    /// Run one simulation for a natural-language message.
    async fn run(
        &self,
        message: &str,
        override_payload: Option<&str>,
    ) -> Result<SimulationResult, GatewayError>;

    /// List past runs as the server currently knows them.
    async fn list_history(&self) -> Result<Vec<HistoryEntry>, GatewayError>;
}

/// One recorded `run` call on a [`MockGateway`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunCall {
    pub message: String,
    pub override_payload: Option<String>,
}

/// Scripted gateway for tests.
///
/// Replies are popped from per-operation queues; an empty queue yields a fixed
/// default result (or an empty history). Calls can be held open with
/// [`MockGateway::pause_runs`] / [`MockGateway::pause_history`] until permits
/// are released, which lets tests observe the pending state.
#[derive(Debug, Default)]
pub struct MockGateway {
    run_replies: Mutex<VecDeque<Result<SimulationResult, GatewayError>>>,
    history_replies: Mutex<VecDeque<Result<Vec<HistoryEntry>, GatewayError>>>,
    calls: Mutex<Vec<RunCall>>,
    history_calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    run_gate: Option<Semaphore>,
    history_gate: Option<Semaphore>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold every `run` call until [`MockGateway::release_runs`] is called.
    pub fn pause_runs(mut self) -> Self {
        self.run_gate = Some(Semaphore::new(0));
        self
    }

    /// Hold every `list_history` call until [`MockGateway::release_history`].
    pub fn pause_history(mut self) -> Self {
        self.history_gate = Some(Semaphore::new(0));
        self
    }

    /// Let `n` held `run` calls complete.
    pub fn release_runs(&self, n: usize) {
        if let Some(gate) = &self.run_gate {
            gate.add_permits(n);
        }
    }

    /// Let `n` held `list_history` calls complete.
    pub fn release_history(&self, n: usize) {
        if let Some(gate) = &self.history_gate {
            gate.add_permits(n);
        }
    }

    /// Queue the reply for the next `run` call.
    pub fn push_run(&self, reply: Result<SimulationResult, GatewayError>) {
        lock(&self.run_replies).push_back(reply);
    }

    /// Queue the reply for the next `list_history` call.
    pub fn push_history(&self, reply: Result<Vec<HistoryEntry>, GatewayError>) {
        lock(&self.history_replies).push_back(reply);
    }

    /// All `run` calls seen so far, in order.
    pub fn calls(&self) -> Vec<RunCall> {
        lock(&self.calls).clone()
    }

    pub fn history_calls(&self) -> usize {
        self.history_calls.load(Ordering::SeqCst)
    }

    /// Highest number of `run` calls that were open at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// The reply used when no `run` reply is queued.
    pub fn default_result() -> SimulationResult {
        SimulationResult::from_categories(EnergyByCategory {
            cooling: 20_000.0,
            heating: 15_000.0,
            lighting: 10_000.0,
            equipment: 8_000.0,
            ventilation: 5_000.0,
        })
    }
}

#[async_trait]
impl SimulationGateway for MockGateway {
    async fn run(
        &self,
        message: &str,
        override_payload: Option<&str>,
    ) -> Result<SimulationResult, GatewayError> {
        lock(&self.calls).push(RunCall {
            message: message.to_string(),
            override_payload: override_payload.map(str::to_string),
        });
        let open = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(open, Ordering::SeqCst);

        let gated = wait(self.run_gate.as_ref()).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        gated?;

        lock(&self.run_replies)
            .pop_front()
            .unwrap_or_else(|| Ok(Self::default_result()))
    }

    async fn list_history(&self) -> Result<Vec<HistoryEntry>, GatewayError> {
        self.history_calls.fetch_add(1, Ordering::SeqCst);
        wait(self.history_gate.as_ref()).await?;
        lock(&self.history_replies)
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

async fn wait(gate: Option<&Semaphore>) -> Result<(), GatewayError> {
    if let Some(gate) = gate {
        let permit = gate
            .acquire()
            .await
            .map_err(|e| GatewayError::Transport(format!("mock gate closed: {}", e)))?;
        permit.forget();
    }
    Ok(())
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
