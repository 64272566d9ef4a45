//! Cross-batch duplicate suppression
//!
//! Scrolling re-presents rows that were already read, so every inspected row is
//! recorded under an identity and reported as new only the first time. Seen
//! state only grows during a session; `reset` starts a new one.
//!
//! With a reference strategy the same row can turn up with and without its
//! reference, e.g. when the attribute read fails in one batch only. Each
//! admitted row leaves its tuple key in a pool for its kind; a row of the other
//! kind with the same key consumes one entry instead of being reported new.
//! Twins that both carry references never meet in a pool and stay distinct.

use std::collections::{HashMap, HashSet};

use crate::domain::TransactionKey;

/// What a row is recognised by
///
/// A reference number is authoritative. The tuple fallback collapses genuinely
/// distinct transactions that share date, description, amount and currency.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Identity {
    Reference(String),
    Tuple(TransactionKey),
}

impl Identity {
    pub fn reference(&self) -> Option<&str> {
        match self {
            Self::Reference(reference) => Some(reference),
            Self::Tuple(_) => None,
        }
    }
}

/// Result of comparing a batch's last row with the previous batch's
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    /// The view moved (or the boundary could not be judged)
    Advanced,
    /// Same last reference as the previous batch: the scroll did not advance
    Overlap,
}

#[derive(Debug, Default)]
pub struct DeduplicationTracker {
    seen: HashSet<Identity>,
    last_reference: Option<String>,
    /// Tuple keys admitted under a reference, not yet matched by a bare row
    referenced: HashMap<TransactionKey, usize>,
    /// Tuple keys admitted without a reference, not yet matched by a referenced row
    unreferenced: HashMap<TransactionKey, usize>,
}

impl DeduplicationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_new(&self, identity: &Identity) -> bool {
        !self.seen.contains(identity)
    }

    pub fn mark_seen(&mut self, identity: Identity) {
        self.seen.insert(identity);
    }

    /// Mark `identity` seen and report whether the row is new.
    ///
    /// `key` is the row's tuple key; for a `Tuple` identity it is the identity
    /// itself. A row whose counterpart of the other kind was already admitted
    /// is not new.
    pub fn admit(&mut self, identity: Identity, key: Option<&TransactionKey>) -> bool {
        if !self.is_new(&identity) {
            return false;
        }

        let novel = match (&identity, key) {
            (Identity::Reference(_), Some(key)) => {
                pair(&mut self.unreferenced, &mut self.referenced, key)
            }
            (Identity::Tuple(key), _) => pair(&mut self.referenced, &mut self.unreferenced, key),
            (Identity::Reference(_), None) => true,
        };

        self.mark_seen(identity);
        novel
    }

    /// Record `last` as this batch's boundary and compare it with the previous
    /// one. Only reference identities can signal an overlap.
    pub fn check_boundary(&mut self, last: &Identity) -> Boundary {
        let Some(reference) = last.reference() else {
            return Boundary::Advanced;
        };

        if self.last_reference.as_deref() == Some(reference) {
            return Boundary::Overlap;
        }

        self.last_reference = Some(reference.to_string());
        Boundary::Advanced
    }

    pub fn seen_count(&self) -> usize {
        self.seen.len()
    }

    pub fn reset(&mut self) {
        self.seen.clear();
        self.last_reference = None;
        self.referenced.clear();
        self.unreferenced.clear();
    }
}

/// Consume a counterpart entry for `key`, or pool `key` as a new row
fn pair(
    counterparts: &mut HashMap<TransactionKey, usize>,
    own: &mut HashMap<TransactionKey, usize>,
    key: &TransactionKey,
) -> bool {
    match counterparts.get_mut(key) {
        Some(count) if *count > 1 => {
            *count -= 1;
            false
        }
        Some(_) => {
            counterparts.remove(key);
            false
        }
        None => {
            *own.entry(key.clone()).or_default() += 1;
            true
        }
    }
}
