// Classification engine.
//
// Pure function from message text to either a complete record or a
// structured failure reason. No shared mutable state: the catalog and
// the extractor patterns are immutable compiled statics, so classify is
// safe to call from any number of parallel workers.

use thiserror::Error;

use crate::catalog::CATALOG;
use crate::extract::{extract_fee, extract_occurred_at, extract_transaction_id};
use crate::model::TransactionRecord;

/// Why a message could not be classified. Each variant's message is the
/// reason string persisted in the failure log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ClassifyError {
    #[error("empty message")]
    EmptyMessage,
    #[error("no pattern matched")]
    NoPatternMatch,
    #[error("invalid amount")]
    InvalidAmount,
}

/// Classify one message.
///
/// Walks the catalog in declared order, patterns in declared order; the
/// first match anywhere fixes the transaction type. The shared extractors
/// then run against the full text (they are independent of which type
/// matched), and the type's binder maps the captured groups onto amount
/// and party fields.
pub fn classify(raw_message: &str) -> Result<TransactionRecord, ClassifyError> {
    let message = raw_message.trim();
    if message.is_empty() {
        return Err(ClassifyError::EmptyMessage);
    }

    for rule in CATALOG.iter() {
        for pattern in &rule.patterns {
            if let Some(caps) = pattern.captures(message) {
                let mut record =
                    TransactionRecord::new(rule.transaction_type, message.to_string());
                record.transaction_id = extract_transaction_id(message);
                record.occurred_at = extract_occurred_at(message);
                record.fee = extract_fee(message);
                rule.binder.bind(&caps, &mut record)?;
                return Ok(record);
            }
        }
    }

    Err(ClassifyError::NoPatternMatch)
}
