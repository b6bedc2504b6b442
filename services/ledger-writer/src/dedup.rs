//! Duplicate-submission guard
//!
//! Idempotency token → id of the transaction accepted with it. A token is
//! reserved before anything is persisted and confirmed once the insert
//! succeeded; a second submission finds the reservation and is rejected
//! without touching the ledger. Dropping an unconfirmed [`Reservation`]
//! frees the token again so a failed attempt can be retried.
//!
//! Accepted tokens are remembered for `window` after they were confirmed.

use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use thiserror::Error;
use tokio::time::Instant;
use tracing::debug;
use types::ids::TransactionId;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DuplicateError {
    /// Another submission with this token is still in flight
    #[error("transaction with token {token} is already being processed")]
    InFlight { token: String },

    #[error("transaction with token {token} already accepted as {id}")]
    Accepted { token: String, id: TransactionId },
}

#[derive(Debug, Clone, Copy)]
enum TokenState {
    Pending,
    Accepted { id: TransactionId, at: Instant },
}

pub struct DuplicateGuard {
    tokens: DashMap<String, TokenState>,
    window: Duration,
}

impl DuplicateGuard {
    pub fn new(window: Duration) -> Self {
        Self {
            tokens: DashMap::new(),
            window,
        }
    }

    /// Claim `token` for one submission.
    pub fn reserve(&self, token: &str) -> Result<Reservation<'_>, DuplicateError> {
        match self.tokens.entry(token.to_string()) {
            Entry::Occupied(mut occupied) => {
                let state = *occupied.get();
                match state {
                    TokenState::Pending => Err(DuplicateError::InFlight {
                        token: token.to_string(),
                    }),
                    TokenState::Accepted { id, at } if at.elapsed() < self.window => Err(DuplicateError::Accepted {
                        token: token.to_string(),
                        id,
                    }),
                    TokenState::Accepted { .. } => {
                        // Expired but not yet purged
                        occupied.insert(TokenState::Pending);
                        Ok(Reservation::new(self, token))
                    }
                }
            }
            Entry::Vacant(vacant) => {
                vacant.insert(TokenState::Pending);
                Ok(Reservation::new(self, token))
            }
        }
    }

    /// Id accepted under `token`, if still within the window
    pub fn accepted_id(&self, token: &str) -> Option<TransactionId> {
        match self.tokens.get(token).map(|state| *state.value()) {
            Some(TokenState::Accepted { id, at }) if at.elapsed() < self.window => Some(id),
            _ => None,
        }
    }

    /// Forget accepted tokens older than the window. Returns how many went.
    pub fn purge_expired(&self) -> usize {
        let before = self.tokens.len();
        let window = self.window;
        self.tokens.retain(|_, state| match state {
            TokenState::Pending => true,
            TokenState::Accepted { at, .. } => at.elapsed() < window,
        });
        let purged = before.saturating_sub(self.tokens.len());
        if purged > 0 {
            debug!(purged, "Purged expired idempotency tokens");
        }
        purged
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// A claimed token. Released on drop unless confirmed.
pub struct Reservation<'a> {
    guard: &'a DuplicateGuard,
    token: String,
    confirmed: bool,
}

impl<'a> Reservation<'a> {
    fn new(guard: &'a DuplicateGuard, token: &str) -> Self {
        Self {
            guard,
            token: token.to_string(),
            confirmed: false,
        }
    }

    /// Record that the submission was persisted as `id`.
    pub fn confirm(mut self, id: TransactionId) {
        self.guard.tokens.insert(
            self.token.clone(),
            TokenState::Accepted {
                id,
                at: Instant::now(),
            },
        );
        self.confirmed = true;
    }
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        if !self.confirmed {
            self.guard
                .tokens
                .remove_if(&self.token, |_, state| matches!(state, TokenState::Pending));
        }
    }
}
