//! Contract events and the append-only event log
//!
//! Events are immutable records emitted by successful ledger operations.
//! Off-ledger consumers (indexers, minting bridges) read them by polling the
//! log with a sequence cursor, or by draining it.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use types::ids::{Address, ReceiverId, TokenId};
use types::numeric::{Amount, Nonce};

/// A token became eligible for deposit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenAdded {
    pub token: TokenId,
}

/// A token stopped being eligible for deposit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRemoved {
    pub token: TokenId,
}

/// Tokens pulled into custody on behalf of an external receiver
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokensWrapped {
    pub token: TokenId,
    pub receiver: ReceiverId,
    pub amount: Amount,
}

/// Tokens released from custody against a custodian authorization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokensUnwrapped {
    pub token: TokenId,
    pub requester: Address,
    pub amount: Amount,
    pub nonce: Nonce,
}

/// Custodian role handed over
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustodianTransferred {
    pub previous: Address,
    pub new: Address,
}

/// Enum wrapper for all contract events, enabling uniform handling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ContractEvent {
    TokenAdded(TokenAdded),
    TokenRemoved(TokenRemoved),
    TokensWrapped(TokensWrapped),
    TokensUnwrapped(TokensUnwrapped),
    CustodianTransferred(CustodianTransferred),
}

impl ContractEvent {
    /// Short name used in log lines
    pub fn name(&self) -> &'static str {
        match self {
            ContractEvent::TokenAdded(_) => "TokenAdded",
            ContractEvent::TokenRemoved(_) => "TokenRemoved",
            ContractEvent::TokensWrapped(_) => "TokensWrapped",
            ContractEvent::TokensUnwrapped(_) => "TokensUnwrapped",
            ContractEvent::CustodianTransferred(_) => "CustodianTransferred",
        }
    }
}

/// An event together with its position in the log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Strictly increasing, starting at 1. Never reused, even after drains.
    pub sequence: u64,
    pub event: ContractEvent,
}

/// Append-only event log.
///
/// Sequence numbers survive draining and trimming, so a consumer holding a
/// cursor never sees an event twice.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    records: VecDeque<EventRecord>,
    last_sequence: u64,
    /// Oldest records beyond this length are dropped.
    max_len: Option<usize>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a log that retains at most `max_len` records.
    pub fn with_capacity_limit(max_len: usize) -> Self {
        Self {
            max_len: Some(max_len),
            ..Self::default()
        }
    }

    /// Append an event, returning its sequence number.
    pub fn append(&mut self, event: ContractEvent) -> u64 {
        self.last_sequence += 1;
        self.records.push_back(EventRecord {
            sequence: self.last_sequence,
            event,
        });
        if let Some(max_len) = self.max_len {
            while self.records.len() > max_len {
                self.records.pop_front();
            }
        }
        self.last_sequence
    }

    /// Sequence number of the most recent event, 0 if none was ever emitted.
    pub fn last_sequence(&self) -> u64 {
        self.last_sequence
    }

    /// Records with a sequence number strictly greater than `cursor`.
    pub fn since(&self, cursor: u64) -> Vec<EventRecord> {
        self.records
            .iter()
            .filter(|r| r.sequence > cursor)
            .cloned()
            .collect()
    }

    /// Drain all retained records (consume and clear).
    pub fn drain(&mut self) -> Vec<EventRecord> {
        self.records.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
