use chrono::Utc;
use serde_json::{json, Value};
use sqlx::PgPool;

use crate::error::{AppError, AppResult};
use crate::models::{validate_vin, ReportType, Submitter};
use crate::services::vehicle_registry::VehicleRegistry;
use crate::services::{audit_log, hash_chain, odometer_tracker, report_details};

#[derive(Debug, Clone)]
pub struct SubmitOutcome {
    pub submission_id: i32,
    pub integrity_hash: String,
}

/// Orchestrates one contribution end to end: validate, vehicle upsert,
/// chained submission insert, typed detail row, odometer side-effect, audit.
#[derive(Clone)]
pub struct SubmissionService {
    pool: PgPool,
    registry: VehicleRegistry,
}

impl SubmissionService {
    pub fn new(pool: PgPool, registry: VehicleRegistry) -> Self {
        Self { pool, registry }
    }

    pub async fn submit(
        &self,
        vin: &str,
        report_type: &str,
        submitter: &Submitter,
        data: &Value,
        ip: Option<&str>,
    ) -> AppResult<SubmitOutcome> {
        let vin = vin.trim().to_uppercase();
        if !validate_vin(&vin) {
            return Err(AppError::InvalidInput(
                "VIN invalide (17 caractères alphanumériques).".to_string(),
            ));
        }

        let report_type = ReportType::parse(report_type).ok_or_else(|| {
            AppError::InvalidInput(format!(
                "Type invalide: {}. Valides: {}",
                report_type,
                ReportType::ALL.map(|t| t.as_str()).join(", ")
            ))
        })?;

        // Vehicle upsert commits on its own connection: the decoder call can
        // take up to 10 s and must not hold the submission transaction open.
        let vehicle = self
            .registry
            .get_or_create(&vin)
            .await?
            .ok_or(AppError::CannotDecode)?;

        // Captured once; the row, the snapshot and the hash all use this
        // instant. A second now() for the hash would break verification.
        let submitted_at = Utc::now();
        let submitted_at_str = submitted_at.to_rfc3339();

        let snapshot = json!({
            "vin": vin,
            "report_type": report_type.as_str(),
            "submitter": submitter,
            "data": data,
            "submitted_at": submitted_at_str,
            "ip": ip,
        });

        let mut tx = self.pool.begin().await?;

        hash_chain::lock_chain(&mut tx).await?;
        let tip = hash_chain::tip(&mut tx).await?;

        let submission_id: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO submissions (vehicle_id, vin, report_type, submitted_by_name,
                submitted_by_email, submitted_by_type, submitted_by_company, ip_address,
                submitted_at, previous_hash, data_snapshot)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING id
            "#,
        )
        .bind(vehicle.id)
        .bind(&vin)
        .bind(report_type.as_str())
        .bind(&submitter.name)
        .bind(&submitter.email)
        .bind(&submitter.submitter_type)
        .bind(&submitter.company)
        .bind(ip)
        .bind(submitted_at)
        .bind(&tip)
        .bind(&snapshot)
        .fetch_one(&mut *tx)
        .await?;

        let integrity_hash = hash_chain::compute_hash(
            submission_id,
            &vin,
            report_type.as_str(),
            &snapshot,
            tip.as_deref(),
            &submitted_at_str,
        )?;

        sqlx::query("UPDATE submissions SET integrity_hash = $1 WHERE id = $2")
            .bind(&integrity_hash)
            .bind(submission_id)
            .execute(&mut *tx)
            .await?;

        report_details::insert_detail(&mut tx, submission_id, report_type, data).await?;

        let (km, reading_date, ecu_km) = report_details::odometer_fields(data);
        odometer_tracker::maybe_record(
            &mut tx,
            &vin,
            submission_id,
            km,
            reading_date,
            ecu_km,
            report_type.as_str(),
            ip,
        )
        .await?;

        audit_log::append(
            &mut tx,
            "submission_created",
            "submissions",
            Some(submission_id),
            json!({
                "vin": vin,
                "report_type": report_type.as_str(),
                "integrity_hash": integrity_hash,
            }),
            ip,
        )
        .await?;

        tx.commit().await?;

        tracing::info!(
            "Submission {} recorded for {} ({})",
            submission_id,
            vin,
            report_type
        );

        hash_chain::maybe_anchor(&self.pool, submission_id, &integrity_hash).await;

        Ok(SubmitOutcome {
            submission_id,
            integrity_hash,
        })
    }
}
