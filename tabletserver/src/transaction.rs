//! Transaction id bookkeeping for the query service.
//!
//! Each session moves through `NoTransaction -> Active(id) -> Consumed`.
//! `Begin` issues a fresh id, and `Commit` or `Rollback` consumes it exactly
//! once. After that the session may begin again, but the consumed id stays
//! dead: presenting it again is a protocol violation, as is presenting an id
//! that was never issued.
//!
//! # Invariants
//!
//! - Ids are issued from one counter starting at 1, so no id is ever issued
//!   twice and `TransactionId::NONE` is never issued. Every id below the
//!   counter has been issued.
//! - A session has at most one active transaction, and only active
//!   transactions are remembered.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::queryservice::QueryServiceError;
use crate::types::{Session, SessionId, TransactionId};

/// Issues and validates transaction ids per session.
#[derive(Debug)]
pub struct TransactionCoordinator {
    state: Mutex<CoordinatorState>,
}

#[derive(Debug)]
struct CoordinatorState {
    next_id: i64,
    /// The active transaction of each session that has one.
    active: HashMap<SessionId, TransactionId>,
}

impl CoordinatorState {
    const fn was_issued(&self, tx_id: TransactionId) -> bool {
        tx_id.0 > 0 && tx_id.0 < self.next_id
    }
}

impl Default for TransactionCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl TransactionCoordinator {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(CoordinatorState {
                next_id: 1,
                active: HashMap::new(),
            }),
        }
    }

    fn state(&self) -> Result<MutexGuard<'_, CoordinatorState>, QueryServiceError> {
        self.state
            .lock()
            .map_err(|_| QueryServiceError::LockPoisoned)
    }

    /// Start a transaction in `session`.
    ///
    /// # Errors
    ///
    /// Returns `QueryServiceError::ProtocolViolation` if the request already
    /// names a transaction or the session has one active.
    pub fn begin(&self, session: &Session) -> Result<TransactionId, QueryServiceError> {
        if !session.transaction_id.is_none() {
            return Err(QueryServiceError::ProtocolViolation(format!(
                "Begin: invalid transaction id: got {} expected 0",
                session.transaction_id
            )));
        }

        let mut state = self.state()?;
        if let Some(active) = state.active.get(&session.session_id) {
            return Err(QueryServiceError::ProtocolViolation(format!(
                "Begin: transaction {active} is already active in session {}",
                session.session_id
            )));
        }
        let tx_id = TransactionId(state.next_id);
        state.next_id += 1;
        state.active.insert(session.session_id, tx_id);
        drop(state);

        tracing::debug!(
            "began transaction {} in session {}",
            tx_id,
            session.session_id
        );
        Ok(tx_id)
    }

    /// Consume the session's active transaction by committing it.
    ///
    /// # Errors
    ///
    /// Returns `QueryServiceError::ProtocolViolation` unless
    /// `session.transaction_id` is the session's active transaction.
    pub fn commit(&self, session: &Session) -> Result<(), QueryServiceError> {
        self.consume("Commit", session)
    }

    /// Consume the session's active transaction by rolling it back.
    ///
    /// # Errors
    ///
    /// Same contract as [`commit`](TransactionCoordinator::commit).
    pub fn rollback(&self, session: &Session) -> Result<(), QueryServiceError> {
        self.consume("Rollback", session)
    }

    fn consume(&self, operation: &str, session: &Session) -> Result<(), QueryServiceError> {
        let tx_id = session.transaction_id;
        let mut state = self.state()?;

        if state.active.get(&session.session_id) == Some(&tx_id) {
            state.active.remove(&session.session_id);
            drop(state);
            tracing::debug!(
                "{} consumed transaction {} in session {}",
                operation,
                tx_id,
                session.session_id
            );
            return Ok(());
        }

        let message = if state.was_issued(tx_id) {
            format!(
                "{operation}: transaction {tx_id} is not active in session {}",
                session.session_id
            )
        } else {
            format!("{operation}: transaction {tx_id} was never issued")
        };
        Err(QueryServiceError::ProtocolViolation(message))
    }

    /// Check that a query may run under `tx_id` in `session_id`.
    ///
    /// `TransactionId::NONE` always passes; any other id must be the
    /// session's active transaction.
    ///
    /// # Errors
    ///
    /// Returns `QueryServiceError::ProtocolViolation` otherwise.
    pub fn validate(
        &self,
        session_id: SessionId,
        tx_id: TransactionId,
    ) -> Result<(), QueryServiceError> {
        if tx_id.is_none() {
            return Ok(());
        }
        let active = self.active(session_id)?;
        if active != Some(tx_id) {
            return Err(QueryServiceError::ProtocolViolation(format!(
                "transaction {tx_id} is not active in session {session_id}"
            )));
        }
        Ok(())
    }

    /// The session's active transaction, if any.
    pub fn active(
        &self,
        session_id: SessionId,
    ) -> Result<Option<TransactionId>, QueryServiceError> {
        Ok(self.state()?.active.get(&session_id).copied())
    }
}
