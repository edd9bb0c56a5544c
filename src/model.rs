// Core record types shared by the classifier, the sink and the API.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Closed set of transaction types the catalog can assign.
///
/// Extending this set means adding a new catalog entry in `catalog.rs`,
/// never conditional logic elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionType {
    IncomingMoney,
    PaymentCompleted,
    AirtimePayment,
    AgentWithdrawal,
    InternetBundle,
    BankTransfer,
}

impl TransactionType {
    /// All types, in catalog declaration order.
    pub const ALL: [TransactionType; 6] = [
        TransactionType::IncomingMoney,
        TransactionType::PaymentCompleted,
        TransactionType::AirtimePayment,
        TransactionType::AgentWithdrawal,
        TransactionType::InternetBundle,
        TransactionType::BankTransfer,
    ];

    /// Human-readable label, also the value stored in the database.
    pub fn label(&self) -> &'static str {
        match self {
            TransactionType::IncomingMoney => "Incoming Money",
            TransactionType::PaymentCompleted => "Payment Completed",
            TransactionType::AirtimePayment => "Airtime Payment",
            TransactionType::AgentWithdrawal => "Agent Withdrawal",
            TransactionType::InternetBundle => "Internet Bundle",
            TransactionType::BankTransfer => "Bank Transfer",
        }
    }

    /// Reverse of `label()`, for reading rows back out of the store.
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.label() == label)
    }
}

/// A fully classified mobile-money transaction.
///
/// Created once per input message and never mutated afterwards; the sink
/// may overwrite a stored row by `transaction_id` on replay, but that is
/// sink policy, not engine behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Provider-assigned identifier; unique key at the sink when present.
    pub transaction_id: Option<String>,
    pub transaction_type: TransactionType,
    /// Non-negative; the classifier rejects anything else.
    pub amount: f64,
    /// 0 when the message carries no fee marker (deliberate default).
    pub fee: f64,
    pub sender_name: Option<String>,
    pub receiver_name: Option<String>,
    pub phone_number: Option<String>,
    pub agent_name: Option<String>,
    pub agent_phone: Option<String>,
    pub occurred_at: Option<NaiveDateTime>,
    /// Full original message text.
    pub raw_message: String,
}

impl TransactionRecord {
    /// New record with only the type and raw text set; extractors and the
    /// type's binder fill in the rest.
    pub fn new(transaction_type: TransactionType, raw_message: String) -> Self {
        TransactionRecord {
            transaction_id: None,
            transaction_type,
            amount: 0.0,
            fee: 0.0,
            sender_name: None,
            receiver_name: None,
            phone_number: None,
            agent_name: None,
            agent_phone: None,
            occurred_at: None,
            raw_message,
        }
    }
}

/// A message the pipeline could not turn into a record, plus why.
/// Persisted append-only; never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureRecord {
    pub raw_message: String,
    pub error_reason: String,
}

impl FailureRecord {
    pub fn new(raw_message: impl Into<String>, error_reason: impl Into<String>) -> Self {
        FailureRecord {
            raw_message: raw_message.into(),
            error_reason: error_reason.into(),
        }
    }
}
