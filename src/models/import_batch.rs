use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ImportBatchModel {
    pub id: i32,
    pub batch_ref: String,
    pub submitted_by_name: Option<String>,
    pub submitted_by_email: Option<String>,
    pub submitted_by_type: Option<String>,
    pub submitted_by_company: Option<String>,
    pub filename: Option<String>,
    pub total_rows: Option<i32>,
    pub success_count: Option<i32>,
    pub error_count: Option<i32>,
    pub errors: Option<serde_json::Value>,
    pub submission_ids: Option<serde_json::Value>,
    pub status: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// One failed row in a batch, kept in the batch's `errors` JSON list.
#[derive(Debug, Clone, Serialize)]
pub struct RowError {
    pub row: usize,
    pub vin: String,
    pub error: String,
}
