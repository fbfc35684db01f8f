//! Token Revocation List
//! Mission: Reject logged-out tokens until they would have expired anyway
//!
//! Entries are purged lazily: every access pops the expired front of a
//! min-heap keyed by expiry, so there is no background timer and no full-map
//! scan. Lookups run under the shared lock; the exclusive lock is taken only
//! when there is something to purge or insert.

use crate::auth::{clock::Clock, errors::RevocationError};
use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::sync::Arc;
use tracing::debug;

/// Revoked-but-not-yet-expired token identifiers
pub struct RevocationList {
    inner: RwLock<Inner>,
    skew: Duration,
    clock: Arc<dyn Clock>,
}

#[derive(Default)]
struct Inner {
    /// jti -> token expiry
    entries: HashMap<String, DateTime<Utc>>,
    /// Exactly one heap item per map entry
    expiry_queue: BinaryHeap<Reverse<(DateTime<Utc>, String)>>,
}

/// `now > exp + skew`; an unrepresentable deadline never expires.
fn is_dead(exp: DateTime<Utc>, now: DateTime<Utc>, skew: Duration) -> bool {
    exp.checked_add_signed(skew)
        .map_or(false, |deadline| now > deadline)
}

impl Inner {
    fn needs_sweep(&self, now: DateTime<Utc>, skew: Duration) -> bool {
        self.expiry_queue
            .peek()
            .is_some_and(|Reverse((exp, _))| is_dead(*exp, now, skew))
    }

    fn sweep(&mut self, now: DateTime<Utc>, skew: Duration) -> usize {
        let mut purged = 0;
        while self.needs_sweep(now, skew) {
            let Some(Reverse((exp, jti))) = self.expiry_queue.pop() else {
                break;
            };
            if self.entries.get(&jti) == Some(&exp) {
                self.entries.remove(&jti);
                purged += 1;
            }
        }
        purged
    }
}

impl RevocationList {
    /// `skew` must be the same tolerance the token verifier uses.
    pub fn new(skew: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            skew,
            clock,
        }
    }

    /// True iff `jti` is revoked and its token has not expired yet.
    pub fn contains(&self, jti: &str) -> bool {
        let now = self.clock.now();

        {
            let inner = self.inner.read();
            if !inner.needs_sweep(now, self.skew) {
                return inner.entries.contains_key(jti);
            }
        }

        let mut inner = self.inner.write();
        let purged = inner.sweep(now, self.skew);
        if purged > 0 {
            debug!(purged, remaining = inner.entries.len(), "Purged expired revocations");
        }
        inner.entries.contains_key(jti)
    }

    /// Revoke `jti` until `exp + skew`.
    pub fn add(&self, jti: &str, exp: DateTime<Utc>) -> Result<(), RevocationError> {
        let now = self.clock.now();
        if is_dead(exp, now, self.skew) {
            return Err(RevocationError::Expired {
                jti: jti.to_string(),
            });
        }

        let mut inner = self.inner.write();
        inner.sweep(now, self.skew);

        if inner.entries.contains_key(jti) {
            return Err(RevocationError::AlreadyExists {
                jti: jti.to_string(),
            });
        }

        inner.entries.insert(jti.to_string(), exp);
        inner.expiry_queue.push(Reverse((exp, jti.to_string())));
        Ok(())
    }

    /// Stored entries, including expired ones not yet purged
    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn skew(&self) -> Duration {
        self.skew
    }
}
