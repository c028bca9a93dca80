use serde_json::{json, Map, Value};
use sqlx::PgPool;

use crate::error::{AppError, AppResult};
use crate::models::{validate_vin, OdometerReadingModel, ReportType};
use crate::services::report_details;

#[derive(sqlx::FromRow)]
struct SubmissionHead {
    id: i32,
    report_type: String,
    submitted_at: chrono::DateTime<chrono::Utc>,
    integrity_hash: Option<String>,
    submitted_by_type: Option<String>,
}

/// Read-only assembly of everything known about a VIN.
#[derive(Clone)]
pub struct LookupService {
    pool: PgPool,
}

impl LookupService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn lookup(&self, vin: &str) -> AppResult<Value> {
        let vin = vin.trim().to_uppercase();
        if !validate_vin(&vin) {
            return Err(AppError::InvalidInput(
                "VIN invalide (17 caractères alphanumériques).".to_string(),
            ));
        }

        let vehicle: Option<Value> = sqlx::query_scalar(
            "SELECT jsonb_build_object(
                'vin', vin, 'make', make, 'model', model, 'year', year,
                'body', body_class, 'engine', engine, 'fuel', fuel_type,
                'transmission', transmission, 'drive', drive_type,
                'plant_country', plant_country)
             FROM vehicles WHERE vin = $1",
        )
        .bind(&vin)
        .fetch_optional(&self.pool)
        .await?;

        let vehicle =
            vehicle.ok_or_else(|| AppError::NotFound("Véhicule inconnu.".to_string()))?;

        let submissions = sqlx::query_as::<_, SubmissionHead>(
            "SELECT id, report_type, submitted_at, integrity_hash, submitted_by_type \
             FROM submissions WHERE vin = $1 ORDER BY id ASC",
        )
        .bind(&vin)
        .fetch_all(&self.pool)
        .await?;

        // Fourteen buckets, present even when empty.
        let mut records = Map::new();
        for t in ReportType::ALL {
            records.insert(t.bucket().to_string(), Value::Array(Vec::new()));
        }

        let total_records = submissions.len();
        for head in submissions {
            let Some(report_type) = ReportType::parse(&head.report_type) else {
                tracing::warn!("Submission {} has unknown type {}", head.id, head.report_type);
                continue;
            };

            let mut entry = Map::new();
            entry.insert("submission_id".to_string(), json!(head.id));
            entry.insert("submitted_at".to_string(), json!(head.submitted_at.to_rfc3339()));
            entry.insert("integrity_hash".to_string(), json!(head.integrity_hash));
            entry.insert("submitter_type".to_string(), json!(head.submitted_by_type));

            if let Some(Value::Object(detail)) =
                report_details::fetch_detail(&self.pool, report_type, head.id).await?
            {
                for (k, v) in detail {
                    entry.insert(k, v);
                }
            }

            if let Some(Value::Array(bucket)) = records.get_mut(report_type.bucket()) {
                bucket.push(Value::Object(entry));
            }
        }

        let odometer_history = sqlx::query_as::<_, OdometerReadingModel>(
            "SELECT * FROM odometer_readings WHERE vin = $1 \
             ORDER BY reading_date ASC, id ASC",
        )
        .bind(&vin)
        .fetch_all(&self.pool)
        .await?;

        let odometer_history: Vec<Value> = odometer_history
            .into_iter()
            .map(|r| {
                json!({
                    "reading_date": r.reading_date.to_string(),
                    "km": r.km,
                    "unit": r.unit,
                    "source": r.source,
                    "ecu_km": r.ecu_km,
                    "fraud_flag": r.fraud_flag.unwrap_or(false),
                    "fraud_reason": r.fraud_reason,
                })
            })
            .collect();

        Ok(json!({
            "vin": vin,
            "vehicle": vehicle,
            "records": records,
            "odometer_history": odometer_history,
            "total_records": total_records,
        }))
    }

    pub async fn stats(&self) -> AppResult<Value> {
        let row: (i64, i64, i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT
                (SELECT COUNT(*) FROM submissions),
                (SELECT COUNT(DISTINCT vin) FROM submissions),
                (SELECT COUNT(*) FROM submissions WHERE report_type = 'accident'),
                (SELECT COUNT(*) FROM submissions WHERE report_type = 'service'),
                (SELECT COUNT(DISTINCT submitted_by_email) FROM submissions
                    WHERE submitted_by_email IS NOT NULL AND submitted_by_email != '')
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(json!({
            "total_submissions": row.0,
            "total_vehicles": row.1,
            "total_accidents": row.2,
            "total_services": row.3,
            "total_contributors": row.4,
        }))
    }
}
