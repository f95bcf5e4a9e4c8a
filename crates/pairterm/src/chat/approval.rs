//! Single-outstanding approval rendezvous.
//!
//! The conversation worker opens the slot, announces the request, then
//! blocks until the event loop calls `approve` or `reject`. At most one
//! request may be outstanding; there is no timeout.

use std::sync::mpsc::{self, Receiver, SyncSender};
use std::sync::{Arc, Mutex, MutexGuard};

use thiserror::Error;

use crate::tools::ToolCall;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Approved,
    Rejected,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ApprovalError {
    #[error("approval already pending for tool call {0}")]
    AlreadyPending(String),
    #[error("approval gate closed before a decision")]
    Closed,
}

enum GateState {
    Idle,
    Pending {
        request_id: String,
        decision_tx: SyncSender<Decision>,
    },
}

#[derive(Clone)]
pub struct ApprovalGate {
    state: Arc<Mutex<GateState>>,
}

impl Default for ApprovalGate {
    fn default() -> Self {
        Self::new()
    }
}

impl ApprovalGate {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(GateState::Idle)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, GateState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Claim the slot for `call`.
    ///
    /// Decisions made after this returns reach the caller, so announce the
    /// request only once the slot is held.
    pub fn open(&self, call: &ToolCall) -> Result<PendingApproval, ApprovalError> {
        let (decision_tx, decision_rx) = mpsc::sync_channel(1);
        let mut state = self.lock();
        if let GateState::Pending { request_id, .. } = &*state {
            tracing::error!(
                pending = %request_id,
                refused = %call.id,
                "approval requested while another is pending"
            );
            return Err(ApprovalError::AlreadyPending(request_id.clone()));
        }
        *state = GateState::Pending {
            request_id: call.id.clone(),
            decision_tx,
        };
        tracing::info!(tool = %call.name, call_id = %call.id, "approval PENDING");
        Ok(PendingApproval { decision_rx })
    }

    /// Block until a decision is made for `call`.
    pub fn request(&self, call: &ToolCall) -> Result<Decision, ApprovalError> {
        self.open(call)?.wait()
    }

    pub fn approve(&self) {
        self.resolve(Decision::Approved);
    }

    pub fn reject(&self) {
        self.resolve(Decision::Rejected);
    }

    pub fn is_pending(&self) -> bool {
        matches!(*self.lock(), GateState::Pending { .. })
    }

    /// Drop any outstanding request; its caller sees `ApprovalError::Closed`.
    pub fn cancel(&self) {
        *self.lock() = GateState::Idle;
    }

    fn resolve(&self, decision: Decision) {
        let previous = std::mem::replace(&mut *self.lock(), GateState::Idle);
        let GateState::Pending {
            request_id,
            decision_tx,
        } = previous
        else {
            return;
        };
        match decision {
            Decision::Approved => tracing::info!(call_id = %request_id, "approval GRANTED"),
            Decision::Rejected => tracing::info!(call_id = %request_id, "approval DENIED"),
        }
        let _ = decision_tx.send(decision);
    }
}

/// A claimed slot awaiting its decision.
pub struct PendingApproval {
    decision_rx: Receiver<Decision>,
}

impl PendingApproval {
    pub fn wait(self) -> Result<Decision, ApprovalError> {
        // The sender only drops after the slot went back to Idle.
        self.decision_rx.recv().map_err(|_| ApprovalError::Closed)
    }
}
