use ahash::AHashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

/// What an introspection request is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestPurpose {
    UpstreamColumns,
    TableColumns,
}

/// Requests for the same key supersede each other.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TargetKey {
    pub node_id: String,
    pub purpose: RequestPurpose,
}

impl TargetKey {
    pub fn new(node_id: impl Into<String>, purpose: RequestPurpose) -> Self {
        Self {
            node_id: node_id.into(),
            purpose,
        }
    }
}

/// Proof of issue for one request; compared against the latest token on completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    key: TargetKey,
    token: u64,
}

impl Ticket {
    pub fn key(&self) -> &TargetKey {
        &self.key
    }

    pub fn token(&self) -> u64 {
        self.token
    }
}

/// Latest-request bookkeeping for every target.
///
/// Tokens come from a single monotonic counter, so a token is never reused
/// even after a target is invalidated.
#[derive(Debug, Default)]
pub struct RequestTokens {
    counter: AtomicU64,
    latest: Mutex<AHashMap<TargetKey, u64>>,
}

impl RequestTokens {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues a new ticket for `key`, superseding every earlier ticket for it.
    pub fn issue(&self, key: TargetKey) -> Ticket {
        let token = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        self.latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.clone(), token);
        Ticket { key, token }
    }

    pub fn is_current(&self, ticket: &Ticket) -> bool {
        self.latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&ticket.key)
            .is_some_and(|latest| *latest == ticket.token)
    }

    /// Supersedes every outstanding ticket for `node_id`, e.g. when the node is deleted.
    pub fn invalidate_node(&self, node_id: &str) -> usize {
        let mut latest = self.latest.lock().unwrap_or_else(PoisonError::into_inner);
        let before = latest.len();
        latest.retain(|key, _| key.node_id != node_id);
        before - latest.len()
    }
}
