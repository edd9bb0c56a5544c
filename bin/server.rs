// momo-ledger - Reporting API server
// Read-only REST API over the transaction store with Axum

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use chrono::NaiveDateTime;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tower_http::cors::CorsLayer;

use momo_ledger::{
    db, FailureRecord, TransactionFilter, TransactionRecord, TransactionType, DATETIME_FORMAT,
};

/// Shared application state
#[derive(Clone)]
struct AppState {
    db: Arc<Mutex<Connection>>,
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }
}

/// Query parameters for GET /api/transactions
#[derive(Deserialize, Default)]
struct TransactionsQuery {
    #[serde(rename = "type")]
    transaction_type: Option<String>,
    search: Option<String>,
    from: Option<String>,
    to: Option<String>,
}

impl TransactionsQuery {
    /// Map URL parameters to a store filter. Unknown type labels and
    /// unparseable timestamps are ignored rather than rejected.
    fn to_filter(&self) -> TransactionFilter {
        TransactionFilter {
            transaction_type: self
                .transaction_type
                .as_deref()
                .and_then(TransactionType::from_label),
            search: self.search.clone(),
            from: self.from.as_deref().and_then(parse_timestamp),
            to: self.to.as_deref().and_then(parse_timestamp),
        }
    }
}

fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, DATETIME_FORMAT).ok()
}

/// Transaction response (flattened for API consumers)
#[derive(Serialize)]
struct TransactionResponse {
    transaction_id: Option<String>,
    transaction_type: &'static str,
    amount: f64,
    fee: f64,
    sender_name: Option<String>,
    receiver_name: Option<String>,
    phone_number: Option<String>,
    agent_name: Option<String>,
    agent_phone: Option<String>,
    occurred_at: Option<String>,
    raw_message: String,
}

impl From<TransactionRecord> for TransactionResponse {
    fn from(rec: TransactionRecord) -> Self {
        Self {
            transaction_id: rec.transaction_id,
            transaction_type: rec.transaction_type.label(),
            amount: rec.amount,
            fee: rec.fee,
            sender_name: rec.sender_name,
            receiver_name: rec.receiver_name,
            phone_number: rec.phone_number,
            agent_name: rec.agent_name,
            agent_phone: rec.agent_phone,
            occurred_at: rec
                .occurred_at
                .map(|dt| dt.format(DATETIME_FORMAT).to_string()),
            raw_message: rec.raw_message,
        }
    }
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/transactions - List transactions, with optional type / search /
/// time-range filters
async fn get_transactions(
    State(state): State<AppState>,
    Query(query): Query<TransactionsQuery>,
) -> impl IntoResponse {
    let conn = state.db.lock().unwrap();

    match db::query_transactions(&conn, &query.to_filter()) {
        Ok(records) => {
            let response: Vec<TransactionResponse> =
                records.into_iter().map(|rec| rec.into()).collect();

            (StatusCode::OK, Json(ApiResponse::ok(response))).into_response()
        }
        Err(e) => {
            eprintln!("Error getting transactions: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::ok(Vec::<TransactionResponse>::new())),
            )
                .into_response()
        }
    }
}

/// GET /api/transaction-types - Distinct types present in the store
async fn get_transaction_types(State(state): State<AppState>) -> impl IntoResponse {
    let conn = state.db.lock().unwrap();

    match db::transaction_types(&conn) {
        Ok(types) => (StatusCode::OK, Json(ApiResponse::ok(types))).into_response(),
        Err(e) => {
            eprintln!("Error getting transaction types: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::ok(Vec::<String>::new())),
            )
                .into_response()
        }
    }
}

/// GET /api/summary - Totals per type and per month
async fn get_summary(State(state): State<AppState>) -> impl IntoResponse {
    let conn = state.db.lock().unwrap();

    match db::summary_stats(&conn) {
        Ok(stats) => (StatusCode::OK, Json(ApiResponse::ok(stats))).into_response(),
        Err(e) => {
            eprintln!("Error getting summary stats: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, Json(ApiResponse::ok(()))).into_response()
        }
    }
}

/// GET /api/failures - Messages the pipeline could not process
async fn get_failures(State(state): State<AppState>) -> impl IntoResponse {
    let conn = state.db.lock().unwrap();

    match db::get_failures(&conn) {
        Ok(failures) => (StatusCode::OK, Json(ApiResponse::ok(failures))).into_response(),
        Err(e) => {
            eprintln!("Error getting failures: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::ok(Vec::<FailureRecord>::new())),
            )
                .into_response()
        }
    }
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() {
    env_logger::init();

    println!("🌐 momo-ledger - Reporting API Server");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let db_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "momo-ledger.db".to_string());
    let db_path = std::path::Path::new(&db_path);

    if !db_path.exists() {
        eprintln!("❌ Database not found at {:?}", db_path);
        eprintln!("   Run: momo-ledger ingest <sms-dump.xml>");
        eprintln!("   to import transactions first.");
        std::process::exit(1);
    }

    let conn = Connection::open(db_path).expect("Failed to open database");
    println!("✓ Database opened: {:?}", db_path);

    // Create shared state
    let state = AppState {
        db: Arc::new(Mutex::new(conn)),
    };

    // Build API routes
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/transactions", get(get_transactions))
        .route("/transaction-types", get(get_transaction_types))
        .route("/summary", get(get_summary))
        .route("/failures", get(get_failures))
        .with_state(state.clone());

    let app = Router::new()
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive());

    // Start server
    let addr = "0.0.0.0:3000";
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    println!("\n🚀 Server running on http://localhost:3000");
    println!("   API: http://localhost:3000/api/transactions");
    println!("\n   Press Ctrl+C to stop\n");

    axum::serve(listener, app)
        .await
        .expect("Failed to start server");
}
