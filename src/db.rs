// Record sink - SQLite persistence for classified records and failures.
//
// Upsert is keyed by transaction_id: replaying the same dump converges
// to the same stored set, with the later write's field values winning.
// Records without an id always insert as new rows (SQLite UNIQUE treats
// NULLs as distinct), so they are never deduplicated here.

use anyhow::Result;
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, Row};
use serde::Serialize;
use thiserror::Error;

use crate::extract::DATETIME_FORMAT;
use crate::model::{FailureRecord, TransactionRecord, TransactionType};

/// Sink-level failure: the store itself could not persist a record.
/// Unlike classification failures, these escalate to the caller.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}

pub fn setup_database(conn: &Connection) -> Result<()> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS transactions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            transaction_id TEXT UNIQUE,
            transaction_type TEXT NOT NULL,
            amount REAL NOT NULL,
            fee REAL NOT NULL DEFAULT 0,
            sender_name TEXT,
            receiver_name TEXT,
            phone_number TEXT,
            agent_name TEXT,
            agent_phone TEXT,
            occurred_at TEXT,
            raw_message TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    // Append-only log of messages the pipeline could not process
    conn.execute(
        "CREATE TABLE IF NOT EXISTS failures (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            raw_message TEXT NOT NULL,
            error_reason TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_transaction_id ON transactions(transaction_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_transaction_type ON transactions(transaction_type)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_occurred_at ON transactions(occurred_at)",
        [],
    )?;

    Ok(())
}

/// Upsert one record, keyed by transaction_id when present.
///
/// Single statement, so each upsert is atomic per record.
pub fn store(conn: &Connection, record: &TransactionRecord) -> Result<(), SinkError> {
    let occurred_at = record
        .occurred_at
        .map(|dt| dt.format(DATETIME_FORMAT).to_string());

    conn.execute(
        "INSERT OR REPLACE INTO transactions (
            transaction_id, transaction_type, amount, fee, sender_name,
            receiver_name, phone_number, agent_name, agent_phone,
            occurred_at, raw_message
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            record.transaction_id,
            record.transaction_type.label(),
            record.amount,
            record.fee,
            record.sender_name,
            record.receiver_name,
            record.phone_number,
            record.agent_name,
            record.agent_phone,
            occurred_at,
            record.raw_message,
        ],
    )?;

    Ok(())
}

/// Append one failure record. Errors surface to the caller; a failure
/// log that fails silently would lose the only trace of bad input.
pub fn log_failure(conn: &Connection, failure: &FailureRecord) -> Result<(), SinkError> {
    conn.execute(
        "INSERT INTO failures (raw_message, error_reason) VALUES (?1, ?2)",
        params![failure.raw_message, failure.error_reason],
    )?;

    Ok(())
}

/// Query shape for the reporting API: filter by type, free-text search
/// over raw_message, and time range. All fields optional and combinable.
#[derive(Debug, Default, Clone)]
pub struct TransactionFilter {
    pub transaction_type: Option<TransactionType>,
    pub search: Option<String>,
    pub from: Option<NaiveDateTime>,
    pub to: Option<NaiveDateTime>,
}

pub fn query_transactions(
    conn: &Connection,
    filter: &TransactionFilter,
) -> Result<Vec<TransactionRecord>, SinkError> {
    let mut sql = String::from(
        "SELECT transaction_id, transaction_type, amount, fee, sender_name,
                receiver_name, phone_number, agent_name, agent_phone,
                occurred_at, raw_message
         FROM transactions WHERE 1=1",
    );
    let mut args: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

    if let Some(t) = filter.transaction_type {
        sql.push_str(" AND transaction_type = ?");
        args.push(Box::new(t.label().to_string()));
    }
    if let Some(search) = &filter.search {
        sql.push_str(" AND raw_message LIKE ?");
        args.push(Box::new(format!("%{search}%")));
    }
    if let Some(from) = filter.from {
        sql.push_str(" AND occurred_at >= ?");
        args.push(Box::new(from.format(DATETIME_FORMAT).to_string()));
    }
    if let Some(to) = filter.to {
        sql.push_str(" AND occurred_at <= ?");
        args.push(Box::new(to.format(DATETIME_FORMAT).to_string()));
    }

    sql.push_str(" ORDER BY occurred_at DESC");

    let mut stmt = conn.prepare(&sql)?;
    let records = stmt
        .query_map(
            rusqlite::params_from_iter(args.iter().map(|a| a.as_ref())),
            row_to_record,
        )?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(records)
}

pub fn get_all_transactions(conn: &Connection) -> Result<Vec<TransactionRecord>, SinkError> {
    query_transactions(conn, &TransactionFilter::default())
}

pub fn get_failures(conn: &Connection) -> Result<Vec<FailureRecord>, SinkError> {
    let mut stmt =
        conn.prepare("SELECT raw_message, error_reason FROM failures ORDER BY id")?;

    let failures = stmt
        .query_map([], |row| {
            Ok(FailureRecord {
                raw_message: row.get(0)?,
                error_reason: row.get(1)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(failures)
}

pub fn count_transactions(conn: &Connection) -> Result<i64, SinkError> {
    let count: i64 =
        conn.query_row("SELECT COUNT(*) FROM transactions", [], |row| row.get(0))?;

    Ok(count)
}

/// Distinct transaction type labels present in the store.
pub fn transaction_types(conn: &Connection) -> Result<Vec<String>, SinkError> {
    let mut stmt = conn.prepare(
        "SELECT DISTINCT transaction_type FROM transactions ORDER BY transaction_type",
    )?;

    let types = stmt
        .query_map([], |row| row.get(0))?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(types)
}

#[derive(Debug, Clone, Serialize)]
pub struct TypeStat {
    pub transaction_type: String,
    pub count: i64,
    pub total_amount: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MonthStat {
    pub month: String,
    pub count: i64,
    pub total_amount: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SummaryStats {
    pub by_type: Vec<TypeStat>,
    pub by_month: Vec<MonthStat>,
}

/// Summary statistics for the reporting API: totals per type and per
/// calendar month (rows without a timestamp are left out of the monthly
/// breakdown).
pub fn summary_stats(conn: &Connection) -> Result<SummaryStats, SinkError> {
    let mut stmt = conn.prepare(
        "SELECT transaction_type, COUNT(*), SUM(amount)
         FROM transactions
         GROUP BY transaction_type
         ORDER BY transaction_type",
    )?;
    let by_type = stmt
        .query_map([], |row| {
            Ok(TypeStat {
                transaction_type: row.get(0)?,
                count: row.get(1)?,
                total_amount: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut stmt = conn.prepare(
        "SELECT strftime('%Y-%m', occurred_at), COUNT(*), SUM(amount)
         FROM transactions
         WHERE occurred_at IS NOT NULL
         GROUP BY strftime('%Y-%m', occurred_at)
         ORDER BY strftime('%Y-%m', occurred_at)",
    )?;
    let by_month = stmt
        .query_map([], |row| {
            Ok(MonthStat {
                month: row.get(0)?,
                count: row.get(1)?,
                total_amount: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(SummaryStats { by_type, by_month })
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<TransactionRecord> {
    let type_label: String = row.get(1)?;
    let transaction_type = TransactionType::from_label(&type_label).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            1,
            rusqlite::types::Type::Text,
            format!("unknown transaction type: {type_label}").into(),
        )
    })?;

    let occurred_at_str: Option<String> = row.get(9)?;
    let occurred_at =
        occurred_at_str.and_then(|s| NaiveDateTime::parse_from_str(&s, DATETIME_FORMAT).ok());

    Ok(TransactionRecord {
        transaction_id: row.get(0)?,
        transaction_type,
        amount: row.get(2)?,
        fee: row.get(3)?,
        sender_name: row.get(4)?,
        receiver_name: row.get(5)?,
        phone_number: row.get(6)?,
        agent_name: row.get(7)?,
        agent_phone: row.get(8)?,
        occurred_at,
        raw_message: row.get(10)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        conn
    }

    fn test_record(id: Option<&str>, amount: f64) -> TransactionRecord {
        let mut rec = TransactionRecord::new(
            TransactionType::IncomingMoney,
            format!("You have received {amount} RWF from Test Sender."),
        );
        rec.transaction_id = id.map(str::to_string);
        rec.amount = amount;
        rec.sender_name = Some("Test Sender".to_string());
        rec
    }

    #[test]
    fn test_upsert_same_id_later_write_wins() {
        let conn = test_conn();

        store(&conn, &test_record(Some("X1"), 1000.0)).unwrap();
        store(&conn, &test_record(Some("X1"), 2500.0)).unwrap();

        assert_eq!(count_transactions(&conn).unwrap(), 1);
        let records = get_all_transactions(&conn).unwrap();
        assert_eq!(records[0].transaction_id.as_deref(), Some("X1"));
        assert_eq!(records[0].amount, 2500.0);
    }

    #[test]
    fn test_records_without_id_are_never_deduplicated() {
        let conn = test_conn();

        store(&conn, &test_record(None, 1000.0)).unwrap();
        store(&conn, &test_record(None, 1000.0)).unwrap();

        assert_eq!(count_transactions(&conn).unwrap(), 2);
    }

    #[test]
    fn test_store_round_trips_all_fields() {
        let conn = test_conn();

        let mut rec = test_record(Some("FT123"), 5000.0);
        rec.fee = 100.0;
        rec.occurred_at = NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(9, 30, 0);
        store(&conn, &rec).unwrap();

        let stored = &get_all_transactions(&conn).unwrap()[0];
        assert_eq!(stored, &rec);
    }

    #[test]
    fn test_failure_log_is_append_only() {
        let conn = test_conn();

        let failure = FailureRecord::new("Random unrelated text", "no pattern matched");
        log_failure(&conn, &failure).unwrap();
        log_failure(&conn, &failure).unwrap();

        let failures = get_failures(&conn).unwrap();
        assert_eq!(failures.len(), 2);
        assert_eq!(failures[0].raw_message, "Random unrelated text");
        assert_eq!(failures[0].error_reason, "no pattern matched");
    }

    #[test]
    fn test_query_by_type() {
        let conn = test_conn();
        store(&conn, &test_record(Some("A"), 100.0)).unwrap();

        let mut other = test_record(Some("B"), 200.0);
        other.transaction_type = TransactionType::BankTransfer;
        other.sender_name = None;
        store(&conn, &other).unwrap();

        let filter = TransactionFilter {
            transaction_type: Some(TransactionType::BankTransfer),
            ..Default::default()
        };
        let records = query_transactions(&conn, &filter).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].transaction_id.as_deref(), Some("B"));
    }

    #[test]
    fn test_query_by_search_term() {
        let conn = test_conn();
        store(&conn, &test_record(Some("A"), 100.0)).unwrap();

        let mut other = test_record(Some("B"), 200.0);
        other.raw_message = "You have received 200 RWF from Umurava Ltd.".to_string();
        store(&conn, &other).unwrap();

        let filter = TransactionFilter {
            search: Some("Umurava".to_string()),
            ..Default::default()
        };
        let records = query_transactions(&conn, &filter).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].transaction_id.as_deref(), Some("B"));
    }

    #[test]
    fn test_query_by_time_range() {
        let conn = test_conn();

        for (id, day) in [("A", 10), ("B", 15), ("C", 20)] {
            let mut rec = test_record(Some(id), 100.0);
            rec.occurred_at = NaiveDate::from_ymd_opt(2024, 1, day)
                .unwrap()
                .and_hms_opt(12, 0, 0);
            store(&conn, &rec).unwrap();
        }

        let filter = TransactionFilter {
            from: NaiveDate::from_ymd_opt(2024, 1, 12)
                .unwrap()
                .and_hms_opt(0, 0, 0),
            to: NaiveDate::from_ymd_opt(2024, 1, 18)
                .unwrap()
                .and_hms_opt(0, 0, 0),
            ..Default::default()
        };
        let records = query_transactions(&conn, &filter).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].transaction_id.as_deref(), Some("B"));
    }

    #[test]
    fn test_transaction_types_distinct() {
        let conn = test_conn();
        store(&conn, &test_record(Some("A"), 100.0)).unwrap();
        store(&conn, &test_record(Some("B"), 200.0)).unwrap();

        let types = transaction_types(&conn).unwrap();
        assert_eq!(types, vec!["Incoming Money".to_string()]);
    }

    #[test]
    fn test_summary_stats() {
        let conn = test_conn();

        let mut jan = test_record(Some("A"), 100.0);
        jan.occurred_at = NaiveDate::from_ymd_opt(2024, 1, 5)
            .unwrap()
            .and_hms_opt(8, 0, 0);
        store(&conn, &jan).unwrap();

        let mut feb = test_record(Some("B"), 200.0);
        feb.occurred_at = NaiveDate::from_ymd_opt(2024, 2, 5)
            .unwrap()
            .and_hms_opt(8, 0, 0);
        store(&conn, &feb).unwrap();

        let stats = summary_stats(&conn).unwrap();
        assert_eq!(stats.by_type.len(), 1);
        assert_eq!(stats.by_type[0].transaction_type, "Incoming Money");
        assert_eq!(stats.by_type[0].count, 2);
        assert_eq!(stats.by_type[0].total_amount, 300.0);

        assert_eq!(stats.by_month.len(), 2);
        assert_eq!(stats.by_month[0].month, "2024-01");
        assert_eq!(stats.by_month[1].month, "2024-02");
        assert_eq!(stats.by_month[1].total_amount, 200.0);
    }
}
