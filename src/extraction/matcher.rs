// src/extraction/matcher.rs
//! Pair Matcher
//!
//! Binds every metadata event to the reply it describes.
//!
//! ## Matching rule
//!
//! Among the assistant events that precede a metadata event and have not
//! been bound yet, the closest one (largest line index) wins and is
//! consumed. A metadata event with no such candidate is a pairing miss.
//!
//! Walking the log once in order and keeping unconsumed replies on a stack
//! gives exactly that rule: the top of the stack is always the nearest
//! unconsumed reply before the current position.

use tracing::debug;

use super::events::{Event, Role};

/// A metadata event bound to the reply it describes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedPair<'a> {
    pub assistant: &'a Event,
    pub metadata: &'a Event,
}

/// Result of one matching pass.
#[derive(Debug, Clone, Default)]
pub struct PairingOutcome<'a> {
    pub pairs: Vec<MatchedPair<'a>>,
    /// Metadata events that found no eligible reply.
    pub unmatched_metadata: Vec<&'a Event>,
    /// Replies never bound to any metadata event, in log order.
    pub orphaned_replies: Vec<&'a Event>,
    pub assistant_count: usize,
    pub metadata_count: usize,
}

/// Matches metadata events to replies. `events` must be in log order.
pub fn match_pairs(events: &[Event]) -> PairingOutcome<'_> {
    let mut outcome = PairingOutcome::default();
    let mut pending: Vec<&Event> = Vec::new();
    let mut consumed_any: Vec<bool> = Vec::new();
    let mut replies: Vec<&Event> = Vec::new();
    let mut stack: Vec<usize> = Vec::new();

    for event in events {
        match event.role {
            Role::Assistant => {
                stack.push(replies.len());
                replies.push(event);
                consumed_any.push(false);
                outcome.assistant_count += 1;
            }
            Role::Metadata => {
                outcome.metadata_count += 1;
                match stack.pop() {
                    Some(reply_idx) => {
                        consumed_any[reply_idx] = true;
                        outcome.pairs.push(MatchedPair {
                            assistant: replies[reply_idx],
                            metadata: event,
                        });
                    }
                    None => pending.push(event),
                }
            }
            Role::System | Role::User => {}
        }
    }

    outcome.unmatched_metadata = pending;
    outcome.orphaned_replies = replies
        .iter()
        .zip(consumed_any.iter())
        .filter(|(_, consumed)| !**consumed)
        .map(|(reply, _)| *reply)
        .collect();
    debug!(
        "Matcher: {} pairs from {} replies and {} metadata events ({} unmatched, {} orphaned)",
        outcome.pairs.len(),
        outcome.assistant_count,
        outcome.metadata_count,
        outcome.unmatched_metadata.len(),
        outcome.orphaned_replies.len()
    );
    outcome
}
