use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct OdometerReadingModel {
    pub id: i32,
    pub vin: String,
    pub submission_id: Option<i32>,
    pub reading_date: chrono::NaiveDate,
    pub km: i32,
    pub unit: Option<String>,
    pub source: Option<String>,
    pub ecu_km: Option<i32>,
    pub fraud_flag: Option<bool>,
    pub fraud_reason: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}
