// momo-ledger - Core Library
// Exposes all modules for use in the CLI, the API server, and tests

pub mod model;
pub mod extract;
pub mod catalog;
pub mod classify;
pub mod db;
pub mod ingest;

// Re-export commonly used types
pub use model::{FailureRecord, TransactionRecord, TransactionType};
pub use extract::{extract_fee, extract_occurred_at, extract_transaction_id, DATETIME_FORMAT};
pub use catalog::{Binder, PatternRule, CATALOG};
pub use classify::{classify, ClassifyError};
pub use db::{
    count_transactions, get_all_transactions, get_failures, log_failure, query_transactions,
    setup_database, store, summary_stats, transaction_types, SinkError, SummaryStats,
    TransactionFilter,
};
pub use ingest::{process_messages, process_xml_file, read_sms_bodies, IngestReport};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
