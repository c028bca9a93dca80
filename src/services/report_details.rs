use chrono::NaiveDate;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde_json::Value;
use sqlx::{PgConnection, PgPool};
use std::str::FromStr;

use crate::error::{AppError, AppResult};
use crate::models::ReportType;

// === Lenient field extraction ===
//
// Contribution `data` arrives from JSON bodies and normalised CSV rows, so
// every getter accepts both native JSON types and their string spellings.

pub fn get_str(data: &Value, key: &str) -> Option<String> {
    match data.get(key)? {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn get_str_or(data: &Value, key: &str, default: &str) -> String {
    get_str(data, key).unwrap_or_else(|| default.to_string())
}

pub fn get_i64(data: &Value, key: &str) -> Option<i64> {
    match data.get(key)? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().map(|f| f as i64))
        }
        _ => None,
    }
}

fn get_i32(data: &Value, key: &str) -> Option<i32> {
    get_i64(data, key).map(|v| v as i32)
}

fn get_decimal(data: &Value, key: &str) -> Option<Decimal> {
    match data.get(key)? {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(Decimal::from(i))
            } else {
                n.as_f64().and_then(Decimal::from_f64)
            }
        }
        Value::String(s) => Decimal::from_str(s.trim()).ok(),
        _ => None,
    }
}

pub fn get_bool(data: &Value, key: &str) -> Option<bool> {
    match data.get(key)? {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => Some(n.as_i64().unwrap_or(0) != 0),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "1" | "oui" | "yes" => Some(true),
            "false" | "0" | "non" | "no" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn get_bool_or(data: &Value, key: &str, default: bool) -> bool {
    get_bool(data, key).unwrap_or(default)
}

pub fn get_date(data: &Value, key: &str) -> Option<NaiveDate> {
    let s = data.get(key)?.as_str()?.trim();
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(date);
    }
    // Accept a full timestamp by reading its date part.
    let prefix = s.get(..10)?;
    NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok()
}

fn require_date(data: &Value, key: &str) -> AppResult<NaiveDate> {
    get_date(data, key)
        .ok_or_else(|| AppError::InvalidInput(format!("Champ requis manquant ou invalide: {}", key)))
}

fn require_str(data: &Value, key: &str) -> AppResult<String> {
    get_str(data, key)
        .ok_or_else(|| AppError::InvalidInput(format!("Champ requis manquant: {}", key)))
}

fn one_of(value: String, allowed: &[&str], key: &str) -> AppResult<String> {
    if allowed.contains(&value.as_str()) {
        Ok(value)
    } else {
        Err(AppError::InvalidInput(format!(
            "Valeur invalide pour {}: {}. Valides: {}",
            key,
            value,
            allowed.join(", ")
        )))
    }
}

/// Odometer-bearing fields shared across report types, consumed by the
/// odometer side-effect of a submission: (km, reading date, ECU km).
pub fn odometer_fields(data: &Value) -> (Option<i64>, Option<NaiveDate>, Option<i64>) {
    let km = get_i64(data, "odometer_km").or_else(|| get_i64(data, "odometer_at_import"));
    let date = get_date(data, "date");
    let ecu = get_i64(data, "ecu_odometer_km");
    (km, date, ecu)
}

/// Insert the 1:1 detail row for a submission. Closed dispatch: exactly one
/// arm per report type. Runs on the submission's transaction.
pub async fn insert_detail(
    conn: &mut PgConnection,
    submission_id: i32,
    report_type: ReportType,
    data: &Value,
) -> AppResult<()> {
    match report_type {
        ReportType::Accident => insert_accident(conn, submission_id, data).await,
        ReportType::Service => insert_service(conn, submission_id, data).await,
        ReportType::Ownership => insert_ownership(conn, submission_id, data).await,
        ReportType::Inspection => insert_inspection(conn, submission_id, data).await,
        ReportType::RecallCompletion => insert_recall_completion(conn, submission_id, data).await,
        ReportType::TitleBrand => insert_title_brand(conn, submission_id, data).await,
        ReportType::Lien => insert_lien(conn, submission_id, data).await,
        ReportType::Theft => insert_theft(conn, submission_id, data).await,
        ReportType::ObdDiagnostic => insert_obd_diagnostic(conn, submission_id, data).await,
        ReportType::Auction => insert_auction(conn, submission_id, data).await,
        ReportType::FleetHistory => insert_fleet_history(conn, submission_id, data).await,
        ReportType::ImportExport => insert_import_export(conn, submission_id, data).await,
        ReportType::Emissions => insert_emissions(conn, submission_id, data).await,
        ReportType::Modification => insert_modification(conn, submission_id, data).await,
    }
}

async fn insert_accident(conn: &mut PgConnection, id: i32, data: &Value) -> AppResult<()> {
    let date = require_date(data, "date")?;
    let severity = one_of(
        require_str(data, "severity")?,
        &["minor", "moderate", "severe", "total_loss"],
        "severity",
    )?;
    let impact_point = require_str(data, "impact_point")?;

    sqlx::query(
        r#"
        INSERT INTO accident_reports (submission_id, accident_date, severity, impact_point,
            airbag_deployed, structural_damage, flood_damage, fire_damage, theft_vandalism,
            towing_required, drivable, total_loss, rollover, hail_damage,
            estimated_cost, police_report_number, insurance_claim_number, insurance_company,
            accident_location, description, odometer_km)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20, $21)
        "#,
    )
    .bind(id)
    .bind(date)
    .bind(severity)
    .bind(impact_point)
    .bind(get_bool_or(data, "airbag_deployed", false))
    .bind(get_bool_or(data, "structural_damage", false))
    .bind(get_bool_or(data, "flood_damage", false))
    .bind(get_bool_or(data, "fire_damage", false))
    .bind(get_bool_or(data, "theft_vandalism", false))
    .bind(get_bool_or(data, "towing_required", false))
    .bind(get_bool_or(data, "drivable", true))
    .bind(get_bool_or(data, "total_loss", false))
    .bind(get_bool_or(data, "rollover", false))
    .bind(get_bool_or(data, "hail_damage", false))
    .bind(get_decimal(data, "estimated_cost"))
    .bind(get_str(data, "police_report_number"))
    .bind(get_str(data, "insurance_claim_number"))
    .bind(get_str(data, "insurance_company"))
    .bind(get_str(data, "accident_location"))
    .bind(get_str(data, "description"))
    .bind(get_i32(data, "odometer_km"))
    .execute(conn)
    .await?;
    Ok(())
}

async fn insert_service(conn: &mut PgConnection, id: i32, data: &Value) -> AppResult<()> {
    let date = require_date(data, "date")?;
    let parts_type = one_of(
        get_str_or(data, "parts_type", "na"),
        &["oem", "aftermarket", "na"],
        "parts_type",
    )?;

    sqlx::query(
        r#"
        INSERT INTO service_records (submission_id, service_date, odometer_km, service_type,
            facility_name, description, cost, parts_type, ev_battery_soh, ev_battery_kwh, ev_service_type)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        "#,
    )
    .bind(id)
    .bind(date)
    .bind(get_i32(data, "odometer_km"))
    .bind(get_str_or(data, "service_type", "other"))
    .bind(get_str(data, "facility_name"))
    .bind(get_str(data, "description"))
    .bind(get_decimal(data, "cost"))
    .bind(parts_type)
    .bind(get_decimal(data, "ev_battery_soh"))
    .bind(get_decimal(data, "ev_battery_kwh"))
    .bind(get_str(data, "ev_service_type"))
    .execute(conn)
    .await?;
    Ok(())
}

async fn insert_ownership(conn: &mut PgConnection, id: i32, data: &Value) -> AppResult<()> {
    let date = require_date(data, "date")?;

    sqlx::query(
        r#"
        INSERT INTO ownership_changes (submission_id, change_date, previous_owner_type,
            new_owner_type, province, sale_price, odometer_km, title_brand, usage_type)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#,
    )
    .bind(id)
    .bind(date)
    .bind(get_str_or(data, "previous_owner_type", "unknown"))
    .bind(get_str_or(data, "new_owner_type", "unknown"))
    .bind(get_str_or(data, "province", "QC"))
    .bind(get_decimal(data, "sale_price"))
    .bind(get_i32(data, "odometer_km"))
    .bind(get_str(data, "title_brand"))
    .bind(get_str(data, "usage_type"))
    .execute(conn)
    .await?;
    Ok(())
}

async fn insert_inspection(conn: &mut PgConnection, id: i32, data: &Value) -> AppResult<()> {
    let date = require_date(data, "date")?;
    let result = one_of(require_str(data, "result")?, &["pass", "fail"], "result")?;

    sqlx::query(
        r#"
        INSERT INTO inspections (submission_id, inspection_date, result, odometer_km,
            inspection_type, inspector_name, facility_name, facility_permit, notes)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#,
    )
    .bind(id)
    .bind(date)
    .bind(result)
    .bind(get_i32(data, "odometer_km"))
    .bind(get_str_or(data, "inspection_type", "saaq_mecanique"))
    .bind(get_str(data, "inspector_name"))
    .bind(get_str(data, "facility_name"))
    .bind(get_str(data, "facility_permit"))
    .bind(get_str(data, "notes"))
    .execute(conn)
    .await?;
    Ok(())
}

async fn insert_recall_completion(conn: &mut PgConnection, id: i32, data: &Value) -> AppResult<()> {
    let recall_number = require_str(data, "recall_number")?;
    let date = require_date(data, "date")?;

    sqlx::query(
        r#"
        INSERT INTO recall_completions (submission_id, recall_number, completion_date,
            facility_name, recall_description, component, remedy_type, odometer_km)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(id)
    .bind(recall_number)
    .bind(date)
    .bind(get_str(data, "facility_name"))
    .bind(get_str(data, "recall_description"))
    .bind(get_str(data, "component"))
    .bind(get_str(data, "remedy_type"))
    .bind(get_i32(data, "odometer_km"))
    .execute(conn)
    .await?;
    Ok(())
}

async fn insert_title_brand(conn: &mut PgConnection, id: i32, data: &Value) -> AppResult<()> {
    let date = require_date(data, "date")?;
    let brand_type = require_str(data, "brand_type")?;

    sqlx::query(
        r#"
        INSERT INTO title_brands (submission_id, brand_date, brand_type, province,
            previous_brand, insurance_company, total_loss_amount, source, notes)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#,
    )
    .bind(id)
    .bind(date)
    .bind(brand_type)
    .bind(get_str_or(data, "province", "QC"))
    .bind(get_str(data, "previous_brand"))
    .bind(get_str(data, "insurance_company"))
    .bind(get_decimal(data, "total_loss_amount"))
    .bind(get_str(data, "source"))
    .bind(get_str(data, "notes"))
    .execute(conn)
    .await?;
    Ok(())
}

async fn insert_lien(conn: &mut PgConnection, id: i32, data: &Value) -> AppResult<()> {
    let lien_holder = require_str(data, "lien_holder")?;

    sqlx::query(
        r#"
        INSERT INTO liens (submission_id, lien_holder, lien_type, lien_amount,
            registration_date, discharge_date, lien_status, province, registration_number, notes)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        "#,
    )
    .bind(id)
    .bind(lien_holder)
    .bind(get_str(data, "lien_type"))
    .bind(get_decimal(data, "lien_amount"))
    .bind(get_date(data, "registration_date"))
    .bind(get_date(data, "discharge_date"))
    .bind(get_str_or(data, "lien_status", "active"))
    .bind(get_str_or(data, "province", "QC"))
    .bind(get_str(data, "registration_number"))
    .bind(get_str(data, "notes"))
    .execute(conn)
    .await?;
    Ok(())
}

async fn insert_theft(conn: &mut PgConnection, id: i32, data: &Value) -> AppResult<()> {
    let date_stolen = require_date(data, "date_stolen")?;

    sqlx::query(
        r#"
        INSERT INTO theft_records (submission_id, date_stolen, police_report_number,
            police_jurisdiction, date_recovered, recovery_location, condition_at_recovery,
            parts_missing, insurance_claim, notes)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        "#,
    )
    .bind(id)
    .bind(date_stolen)
    .bind(get_str(data, "police_report_number"))
    .bind(get_str(data, "police_jurisdiction"))
    .bind(get_date(data, "date_recovered"))
    .bind(get_str(data, "recovery_location"))
    .bind(get_str(data, "condition_at_recovery"))
    .bind(get_str(data, "parts_missing"))
    .bind(get_str(data, "insurance_claim"))
    .bind(get_str(data, "notes"))
    .execute(conn)
    .await?;
    Ok(())
}

async fn insert_obd_diagnostic(conn: &mut PgConnection, id: i32, data: &Value) -> AppResult<()> {
    let date = require_date(data, "date")?;

    sqlx::query(
        r#"
        INSERT INTO obd_diagnostics (submission_id, scan_date, odometer_km, scan_tool,
            mil_status, dtc_active, dtc_pending, dtc_permanent, readiness_monitors,
            ecu_odometer_km, freeze_frame, notes)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        "#,
    )
    .bind(id)
    .bind(date)
    .bind(get_i32(data, "odometer_km"))
    .bind(get_str(data, "scan_tool"))
    .bind(get_str(data, "mil_status"))
    .bind(get_str(data, "dtc_active"))
    .bind(get_str(data, "dtc_pending"))
    .bind(get_str(data, "dtc_permanent"))
    .bind(data.get("readiness_monitors").cloned())
    .bind(get_i32(data, "ecu_odometer_km"))
    .bind(data.get("freeze_frame").cloned())
    .bind(get_str(data, "notes"))
    .execute(conn)
    .await?;
    Ok(())
}

async fn insert_auction(conn: &mut PgConnection, id: i32, data: &Value) -> AppResult<()> {
    let date = require_date(data, "date")?;

    sqlx::query(
        r#"
        INSERT INTO auction_records (submission_id, sale_date, auction_house, auction_location,
            lot_number, sale_type, seller_type, naaa_grade, exterior_grade, interior_grade,
            mechanical_grade, tire_tread_fl, tire_tread_fr, tire_tread_rl, tire_tread_rr,
            odor, keys_count, run_drive, sale_price, damage_announcements, notes)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20, $21)
        "#,
    )
    .bind(id)
    .bind(date)
    .bind(get_str(data, "auction_house"))
    .bind(get_str(data, "auction_location"))
    .bind(get_str(data, "lot_number"))
    .bind(get_str(data, "sale_type"))
    .bind(get_str(data, "seller_type"))
    .bind(get_decimal(data, "naaa_grade"))
    .bind(get_str(data, "exterior_grade"))
    .bind(get_str(data, "interior_grade"))
    .bind(get_str(data, "mechanical_grade"))
    .bind(get_decimal(data, "tire_tread_fl"))
    .bind(get_decimal(data, "tire_tread_fr"))
    .bind(get_decimal(data, "tire_tread_rl"))
    .bind(get_decimal(data, "tire_tread_rr"))
    .bind(get_str(data, "odor"))
    .bind(get_i32(data, "keys_count"))
    .bind(get_bool(data, "run_drive"))
    .bind(get_decimal(data, "sale_price"))
    .bind(get_str(data, "damage_announcements"))
    .bind(get_str(data, "notes"))
    .execute(conn)
    .await?;
    Ok(())
}

async fn insert_fleet_history(conn: &mut PgConnection, id: i32, data: &Value) -> AppResult<()> {
    let usage_type = require_str(data, "usage_type")?;

    sqlx::query(
        r#"
        INSERT INTO fleet_history (submission_id, usage_type, company_name, date_entered,
            date_left, mileage_during, estimated_drivers, province, notes)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#,
    )
    .bind(id)
    .bind(usage_type)
    .bind(get_str(data, "company_name"))
    .bind(get_date(data, "date_entered"))
    .bind(get_date(data, "date_left"))
    .bind(get_i32(data, "mileage_during"))
    .bind(get_i32(data, "estimated_drivers"))
    .bind(get_str_or(data, "province", "QC"))
    .bind(get_str(data, "notes"))
    .execute(conn)
    .await?;
    Ok(())
}

async fn insert_import_export(conn: &mut PgConnection, id: i32, data: &Value) -> AppResult<()> {
    let direction = one_of(require_str(data, "direction")?, &["import", "export"], "direction")?;

    sqlx::query(
        r#"
        INSERT INTO import_export_records (submission_id, direction, country_origin,
            country_destination, record_date, riv_number, customs_declaration,
            odometer_at_import, odometer_unit, tc_compliance, recalls_cleared, notes)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        "#,
    )
    .bind(id)
    .bind(direction)
    .bind(get_str(data, "country_origin"))
    .bind(get_str(data, "country_destination"))
    .bind(get_date(data, "date"))
    .bind(get_str(data, "riv_number"))
    .bind(get_str(data, "customs_declaration"))
    .bind(get_i32(data, "odometer_at_import"))
    .bind(get_str_or(data, "odometer_unit", "km"))
    .bind(get_bool(data, "tc_compliance"))
    .bind(get_bool(data, "recalls_cleared"))
    .bind(get_str(data, "notes"))
    .execute(conn)
    .await?;
    Ok(())
}

async fn insert_emissions(conn: &mut PgConnection, id: i32, data: &Value) -> AppResult<()> {
    let date = require_date(data, "date")?;

    sqlx::query(
        r#"
        INSERT INTO emissions_tests (submission_id, test_date, test_type, result,
            station_name, station_number, inspector_id, hc_ppm, co_percent, nox_ppm,
            co2_percent, o2_percent, certificate_number, certificate_expiry, exemption_reason, notes)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
        "#,
    )
    .bind(id)
    .bind(date)
    .bind(get_str(data, "test_type"))
    .bind(get_str(data, "result"))
    .bind(get_str(data, "station_name"))
    .bind(get_str(data, "station_number"))
    .bind(get_str(data, "inspector_id"))
    .bind(get_decimal(data, "hc_ppm"))
    .bind(get_decimal(data, "co_percent"))
    .bind(get_decimal(data, "nox_ppm"))
    .bind(get_decimal(data, "co2_percent"))
    .bind(get_decimal(data, "o2_percent"))
    .bind(get_str(data, "certificate_number"))
    .bind(get_date(data, "certificate_expiry"))
    .bind(get_str(data, "exemption_reason"))
    .bind(get_str(data, "notes"))
    .execute(conn)
    .await?;
    Ok(())
}

async fn insert_modification(conn: &mut PgConnection, id: i32, data: &Value) -> AppResult<()> {
    let date = require_date(data, "date")?;
    let mod_type = require_str(data, "mod_type")?;

    sqlx::query(
        r#"
        INSERT INTO modifications (submission_id, mod_date, mod_type, description,
            part_brand, part_number, installed_by, homologated, saaq_approved,
            insurance_notified, notes)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        "#,
    )
    .bind(id)
    .bind(date)
    .bind(mod_type)
    .bind(get_str(data, "description"))
    .bind(get_str(data, "part_brand"))
    .bind(get_str(data, "part_number"))
    .bind(get_str(data, "installed_by"))
    .bind(get_bool_or(data, "homologated", false))
    .bind(get_bool_or(data, "saaq_approved", false))
    .bind(get_bool_or(data, "insurance_notified", false))
    .bind(get_str(data, "notes"))
    .execute(conn)
    .await?;
    Ok(())
}

/// Detail row projected as JSON for lookup responses. Table names come from
/// the closed ReportType set, never from request input. `to_jsonb` surfaces
/// dates as ISO-8601 strings and numerics as JSON numbers.
pub async fn fetch_detail(
    pool: &PgPool,
    report_type: ReportType,
    submission_id: i32,
) -> AppResult<Option<Value>> {
    let sql = format!(
        "SELECT to_jsonb(t) - 'id' - 'submission_id' - 'created_at' FROM {} t WHERE submission_id = $1",
        report_type.detail_table()
    );
    let detail: Option<Value> = sqlx::query_scalar(&sql)
        .bind(submission_id)
        .fetch_optional(pool)
        .await?;
    Ok(detail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_get_str_trims_and_rejects_empty() {
        let data = json!({"a": "  x  ", "b": "   ", "c": 42});
        assert_eq!(get_str(&data, "a").as_deref(), Some("x"));
        assert_eq!(get_str(&data, "b"), None);
        assert_eq!(get_str(&data, "c").as_deref(), Some("42"));
        assert_eq!(get_str(&data, "missing"), None);
    }

    #[test]
    fn test_get_i64_from_number_and_string() {
        let data = json!({"a": 45000, "b": "45000", "c": "45000.7", "d": 45000.7, "e": "abc"});
        assert_eq!(get_i64(&data, "a"), Some(45000));
        assert_eq!(get_i64(&data, "b"), Some(45000));
        assert_eq!(get_i64(&data, "c"), Some(45000));
        assert_eq!(get_i64(&data, "d"), Some(45000));
        assert_eq!(get_i64(&data, "e"), None);
    }

    #[test]
    fn test_get_decimal_parses_both_forms() {
        let data = json!({"a": 89.99, "b": "89.99", "c": 90});
        assert_eq!(get_decimal(&data, "a"), Decimal::from_str("89.99").ok());
        assert_eq!(get_decimal(&data, "b"), Decimal::from_str("89.99").ok());
        assert_eq!(get_decimal(&data, "c"), Some(Decimal::from(90)));
    }

    #[test]
    fn test_get_bool_accepts_french_synonyms() {
        let data = json!({
            "a": true, "b": "oui", "c": "YES", "d": "1", "e": 1,
            "f": "non", "g": "false", "h": 0, "i": "peut-être"
        });
        assert_eq!(get_bool(&data, "a"), Some(true));
        assert_eq!(get_bool(&data, "b"), Some(true));
        assert_eq!(get_bool(&data, "c"), Some(true));
        assert_eq!(get_bool(&data, "d"), Some(true));
        assert_eq!(get_bool(&data, "e"), Some(true));
        assert_eq!(get_bool(&data, "f"), Some(false));
        assert_eq!(get_bool(&data, "g"), Some(false));
        assert_eq!(get_bool(&data, "h"), Some(false));
        assert_eq!(get_bool(&data, "i"), None);
    }

    #[test]
    fn test_get_date_accepts_date_and_timestamp() {
        let data = json!({"a": "2025-06-15", "b": "2025-06-15T10:30:00Z", "c": "15/06/2025"});
        let expected = NaiveDate::from_ymd_opt(2025, 6, 15).unwrap();
        assert_eq!(get_date(&data, "a"), Some(expected));
        assert_eq!(get_date(&data, "b"), Some(expected));
        assert_eq!(get_date(&data, "c"), None);
    }

    #[test]
    fn test_odometer_fields_prefers_odometer_km() {
        let data = json!({"odometer_km": 45000, "date": "2025-06-15", "ecu_odometer_km": 72000});
        let (km, date, ecu) = odometer_fields(&data);
        assert_eq!(km, Some(45000));
        assert_eq!(date, NaiveDate::from_ymd_opt(2025, 6, 15));
        assert_eq!(ecu, Some(72000));
    }

    #[test]
    fn test_odometer_fields_falls_back_to_import_reading() {
        let data = json!({"odometer_at_import": 62000});
        let (km, date, ecu) = odometer_fields(&data);
        assert_eq!(km, Some(62000));
        assert_eq!(date, None);
        assert_eq!(ecu, None);
    }

    #[test]
    fn test_one_of_validation() {
        assert!(one_of("minor".to_string(), &["minor", "severe"], "severity").is_ok());
        assert!(one_of("huge".to_string(), &["minor", "severe"], "severity").is_err());
    }
}
