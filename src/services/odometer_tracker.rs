use chrono::{NaiveDate, Utc};
use serde_json::json;
use sqlx::PgConnection;

use crate::error::AppResult;
use crate::services::audit_log;

/// Declared-vs-ECU divergence beyond this many km is flagged.
const ECU_TOLERANCE_KM: i64 = 5000;

#[derive(Debug, PartialEq)]
pub struct FraudCheck {
    pub flag: bool,
    pub reason: Option<String>,
}

/// Rollback and ECU-mismatch rules. Both may fire; reasons are concatenated.
pub fn evaluate(km: i64, prior_km: Option<i64>, ecu_km: Option<i64>) -> FraudCheck {
    let mut reasons: Vec<String> = Vec::new();

    if let Some(prior) = prior_km {
        if km < prior {
            reasons.push(format!("Rollback suspect: {} km < precedent {} km", km, prior));
        }
    }

    if let Some(ecu) = ecu_km {
        if (ecu - km).abs() > ECU_TOLERANCE_KM {
            reasons.push(format!("ECU mismatch: ECU={} vs declared={}", ecu, km));
        }
    }

    if reasons.is_empty() {
        FraudCheck { flag: false, reason: None }
    } else {
        FraudCheck { flag: true, reason: Some(reasons.join(" ")) }
    }
}

/// Record an odometer reading for a submission, flagging anomalies.
/// Advisory: a flagged reading is still persisted and the parent submission
/// is never rejected. No-op when km is absent or non-positive.
pub async fn maybe_record(
    conn: &mut PgConnection,
    vin: &str,
    submission_id: i32,
    km: Option<i64>,
    reading_date: Option<NaiveDate>,
    ecu_km: Option<i64>,
    source: &str,
    ip: Option<&str>,
) -> AppResult<()> {
    let km = match km {
        Some(km) if km > 0 => km,
        _ => return Ok(()),
    };

    // Latest prior reading; same-day ties resolve by insertion order.
    let prior_km: Option<i64> = sqlx::query_scalar(
        "SELECT km::BIGINT FROM odometer_readings WHERE vin = $1 \
         ORDER BY reading_date DESC, id DESC LIMIT 1",
    )
    .bind(vin)
    .fetch_optional(&mut *conn)
    .await?;

    let check = evaluate(km, prior_km, ecu_km);
    let reading_date = reading_date.unwrap_or_else(|| Utc::now().date_naive());

    let reading_id: i32 = sqlx::query_scalar(
        r#"
        INSERT INTO odometer_readings (vin, submission_id, reading_date, km, unit, source, ecu_km, fraud_flag, fraud_reason)
        VALUES ($1, $2, $3, $4, 'km', $5, $6, $7, $8)
        RETURNING id
        "#,
    )
    .bind(vin)
    .bind(submission_id)
    .bind(reading_date)
    .bind(km as i32)
    .bind(source)
    .bind(ecu_km.map(|v| v as i32))
    .bind(check.flag)
    .bind(&check.reason)
    .fetch_one(&mut *conn)
    .await?;

    if check.flag {
        let reason = check.reason.as_deref().unwrap_or_default();
        tracing::warn!("Odometer anomaly on {}: {}", vin, reason);
        audit_log::append(
            conn,
            "odometer_fraud_alert",
            "odometer_readings",
            Some(reading_id),
            json!({ "vin": vin, "km": km, "reason": reason }),
            ip,
        )
        .await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_prior_no_ecu_is_clean() {
        let check = evaluate(45000, None, None);
        assert!(!check.flag);
        assert_eq!(check.reason, None);
    }

    #[test]
    fn test_increasing_reading_is_clean() {
        let check = evaluate(50000, Some(45000), None);
        assert!(!check.flag);
    }

    #[test]
    fn test_equal_reading_is_clean() {
        let check = evaluate(50000, Some(50000), None);
        assert!(!check.flag);
    }

    #[test]
    fn test_rollback_flagged() {
        let check = evaluate(30000, Some(50000), None);
        assert!(check.flag);
        assert_eq!(
            check.reason.as_deref(),
            Some("Rollback suspect: 30000 km < precedent 50000 km")
        );
    }

    #[test]
    fn test_ecu_mismatch_flagged() {
        let check = evaluate(60000, None, Some(72000));
        assert!(check.flag);
        assert_eq!(
            check.reason.as_deref(),
            Some("ECU mismatch: ECU=72000 vs declared=60000")
        );
    }

    #[test]
    fn test_ecu_within_tolerance_is_clean() {
        assert!(!evaluate(60000, None, Some(65000)).flag);
        assert!(!evaluate(60000, None, Some(55000)).flag);
    }

    #[test]
    fn test_ecu_mismatch_is_symmetric() {
        assert!(evaluate(72000, None, Some(60000)).flag);
    }

    #[test]
    fn test_both_rules_concatenate() {
        let check = evaluate(30000, Some(50000), Some(90000));
        assert!(check.flag);
        let reason = check.reason.unwrap();
        assert!(reason.contains("Rollback suspect: 30000 km < precedent 50000 km"));
        assert!(reason.contains("ECU mismatch: ECU=90000 vs declared=30000"));
    }
}
