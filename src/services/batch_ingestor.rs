use serde::Deserialize;
use serde_json::{json, Map, Value};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{ImportBatchModel, RowError, Submitter};
use crate::services::audit_log;
use crate::services::submission_service::SubmissionService;

const MAX_CSV_BYTES: usize = 2 * 1024 * 1024;
const MAX_CSV_ROWS: usize = 500;
const MAX_JSON_RECORDS: usize = 100;

#[derive(Debug, Deserialize)]
pub struct BatchRecord {
    #[serde(default)]
    pub vin: String,
    #[serde(default)]
    pub report_type: Option<String>,
    #[serde(default)]
    pub data: Value,
}

#[derive(Debug)]
pub struct BatchOutcome {
    pub batch_ref: String,
    pub total_rows: usize,
    pub success_count: usize,
    pub errors: Vec<RowError>,
    pub submission_ids: Vec<i32>,
}

/// Drives the submission service once per row. Rows fail independently:
/// a bad VIN or detail error lands in the error list and the batch goes on.
#[derive(Clone)]
pub struct BatchIngestor {
    pool: PgPool,
    submissions: SubmissionService,
}

impl BatchIngestor {
    pub fn new(pool: PgPool, submissions: SubmissionService) -> Self {
        Self { pool, submissions }
    }

    pub async fn ingest_csv(
        &self,
        bytes: &[u8],
        filename: &str,
        submitter: &Submitter,
        ip: Option<&str>,
    ) -> AppResult<BatchOutcome> {
        if bytes.len() > MAX_CSV_BYTES {
            return Err(AppError::InvalidInput(
                "Fichier CSV trop volumineux (max 2 Mo).".to_string(),
            ));
        }

        let text = decode_text(bytes);
        let rows = parse_csv(&text)?;

        let batch_ref = new_batch_ref("CSV");
        let batch_id = self
            .create_batch(&batch_ref, submitter, Some(filename), rows.len())
            .await?;

        let mut errors = Vec::new();
        let mut submission_ids = Vec::new();

        for (i, mut row) in rows.into_iter().enumerate() {
            let vin = row
                .remove("vin")
                .and_then(|v| match v {
                    Value::String(s) => Some(s),
                    other => Some(other.to_string()),
                })
                .unwrap_or_default()
                .trim()
                .to_uppercase();

            let report_type = match row.remove("report_type") {
                Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_lowercase(),
                _ => detect_report_type(&row).to_string(),
            };

            let data = Value::Object(row);
            match self
                .submissions
                .submit(&vin, &report_type, submitter, &data, ip)
                .await
            {
                Ok(outcome) => submission_ids.push(outcome.submission_id),
                Err(e) => {
                    let error = row_error_message(&vin, &e);
                    errors.push(RowError { row: i + 1, vin, error });
                }
            }
        }

        let outcome = self.finalize_batch(batch_id, errors, submission_ids).await?;
        self.audit_batch("csv_import", batch_id, &outcome, ip).await?;
        Ok(outcome)
    }

    pub async fn ingest_json(
        &self,
        records: &[BatchRecord],
        submitter: &Submitter,
        ip: Option<&str>,
    ) -> AppResult<BatchOutcome> {
        if records.len() > MAX_JSON_RECORDS {
            return Err(AppError::InvalidInput(
                "Maximum 100 enregistrements par lot.".to_string(),
            ));
        }

        let batch_ref = new_batch_ref("API");
        let batch_id = self
            .create_batch(&batch_ref, submitter, None, records.len())
            .await?;

        let mut errors = Vec::new();
        let mut submission_ids = Vec::new();

        for (i, record) in records.iter().enumerate() {
            let report_type = match &record.report_type {
                Some(t) if !t.trim().is_empty() => t.trim().to_lowercase(),
                _ => {
                    let map = record.data.as_object().cloned().unwrap_or_default();
                    detect_report_type(&map).to_string()
                }
            };

            match self
                .submissions
                .submit(&record.vin, &report_type, submitter, &record.data, ip)
                .await
            {
                Ok(outcome) => submission_ids.push(outcome.submission_id),
                Err(e) => errors.push(RowError {
                    row: i,
                    vin: record.vin.clone(),
                    error: row_error_message(&record.vin, &e),
                }),
            }
        }

        let outcome = self.finalize_batch(batch_id, errors, submission_ids).await?;
        self.audit_batch("batch_import", batch_id, &outcome, ip).await?;
        Ok(outcome)
    }

    async fn create_batch(
        &self,
        batch_ref: &str,
        submitter: &Submitter,
        filename: Option<&str>,
        total_rows: usize,
    ) -> AppResult<i32> {
        let id: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO import_batches (batch_ref, submitted_by_name, submitted_by_email,
                submitted_by_type, submitted_by_company, filename, total_rows, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, 'processing')
            RETURNING id
            "#,
        )
        .bind(batch_ref)
        .bind(&submitter.name)
        .bind(&submitter.email)
        .bind(&submitter.submitter_type)
        .bind(&submitter.company)
        .bind(filename)
        .bind(total_rows as i32)
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    async fn finalize_batch(
        &self,
        batch_id: i32,
        errors: Vec<RowError>,
        submission_ids: Vec<i32>,
    ) -> AppResult<BatchOutcome> {
        let batch = sqlx::query_as::<_, ImportBatchModel>(
            "UPDATE import_batches SET status = 'completed', success_count = $1, \
             error_count = $2, errors = $3, submission_ids = $4, completed_at = NOW() \
             WHERE id = $5 RETURNING *",
        )
        .bind(submission_ids.len() as i32)
        .bind(errors.len() as i32)
        .bind(serde_json::to_value(&errors).unwrap_or_default())
        .bind(serde_json::to_value(&submission_ids).unwrap_or_default())
        .bind(batch_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(BatchOutcome {
            batch_ref: batch.batch_ref,
            total_rows: batch.total_rows.unwrap_or_default() as usize,
            success_count: submission_ids.len(),
            errors,
            submission_ids,
        })
    }

    async fn audit_batch(
        &self,
        action: &str,
        batch_id: i32,
        outcome: &BatchOutcome,
        ip: Option<&str>,
    ) -> AppResult<()> {
        let mut conn = self.pool.acquire().await?;
        audit_log::append(
            &mut conn,
            action,
            "import_batches",
            Some(batch_id),
            json!({
                "batch_ref": outcome.batch_ref,
                "total_rows": outcome.total_rows,
                "success_count": outcome.success_count,
                "error_count": outcome.errors.len(),
            }),
            ip,
        )
        .await?;
        Ok(())
    }
}

/// Per-row failures go back in the batch result, so user-caused errors keep
/// their message while operational ones are logged and genericized, same
/// policy as the single-submission responses.
fn row_error_message(vin: &str, e: &AppError) -> String {
    match e {
        AppError::InvalidInput(_) | AppError::NotFound(_) | AppError::CannotDecode => {
            e.to_string()
        }
        AppError::Database(_) | AppError::Internal(_) | AppError::Storage(_) => {
            tracing::error!("Batch row failed for {}: {}", vin, e);
            "Erreur serveur.".to_string()
        }
    }
}

/// `CSV-XXXXXXXX` / `API-XXXXXXXX`, 8 uppercase hex.
fn new_batch_ref(prefix: &str) -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("{}-{}", prefix, hex[..8].to_uppercase())
}

/// UTF-8 with optional BOM; single-byte fallback when the bytes are not
/// valid UTF-8 (exported spreadsheets are routinely Latin-1).
fn decode_text(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

fn detect_delimiter(text: &str) -> u8 {
    let first_line = text.lines().next().unwrap_or("");
    let commas = first_line.matches(',').count();
    let semicolons = first_line.matches(';').count();
    if semicolons > commas {
        b';'
    } else {
        b','
    }
}

/// Rows as JSON objects keyed by lowercased trimmed headers, with values
/// coerced (numbers, oui/yes booleans). Empty cells are dropped.
fn parse_csv(text: &str) -> AppResult<Vec<Map<String, Value>>> {
    let delimiter = detect_delimiter(text);
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| AppError::InvalidInput(format!("En-tête CSV illisible: {}", e)))?
        .iter()
        .map(|h| h.trim().to_lowercase())
        .collect();

    if !headers.iter().any(|h| h == "vin") {
        return Err(AppError::InvalidInput("Colonne 'vin' requise.".to_string()));
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record =
            record.map_err(|e| AppError::InvalidInput(format!("Ligne CSV illisible: {}", e)))?;
        let mut row = Map::new();
        for (header, cell) in headers.iter().zip(record.iter()) {
            if header.is_empty() {
                continue;
            }
            if let Some(value) = normalize_cell(cell) {
                row.insert(header.clone(), value);
            }
        }
        if !row.is_empty() {
            rows.push(row);
        }
        if rows.len() > MAX_CSV_ROWS {
            return Err(AppError::InvalidInput(
                "Maximum 500 lignes par fichier CSV.".to_string(),
            ));
        }
    }
    Ok(rows)
}

fn normalize_cell(cell: &str) -> Option<Value> {
    let cell = cell.trim();
    if cell.is_empty() {
        return None;
    }
    if let Ok(i) = cell.parse::<i64>() {
        return Some(Value::from(i));
    }
    if let Ok(f) = cell.parse::<f64>() {
        return Some(Value::from(f));
    }
    match cell.to_lowercase().as_str() {
        "true" | "oui" | "yes" => Some(Value::Bool(true)),
        "false" | "non" | "no" => Some(Value::Bool(false)),
        _ => Some(Value::String(cell.to_string())),
    }
}

/// Report-type auto-detection for rows without an explicit type, checked
/// in a fixed order.
fn detect_report_type(row: &Map<String, Value>) -> &'static str {
    let has = |key: &str| row.contains_key(key);

    if has("severity") || has("impact_point") || has("airbag_deployed") {
        return "accident";
    }
    if has("service_type") || (has("facility_name") && has("cost")) {
        return "service";
    }
    if has("previous_owner_type") || has("new_owner_type") || has("sale_price") {
        return "ownership";
    }
    if let Some(result) = row.get("result").and_then(Value::as_str) {
        if matches!(result, "pass" | "fail") {
            return "inspection";
        }
    }
    if has("recall_number") {
        return "recall_completion";
    }
    if has("date") && has("odometer_km") {
        return "service";
    }
    "service"
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, Value)]) -> Map<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_detect_accident_by_severity() {
        let r = row(&[("severity", Value::from("minor")), ("date", Value::from("2025-01-01"))]);
        assert_eq!(detect_report_type(&r), "accident");
    }

    #[test]
    fn test_detect_service_by_type_or_facility_cost() {
        let r = row(&[("service_type", Value::from("oil_change"))]);
        assert_eq!(detect_report_type(&r), "service");

        let r = row(&[("facility_name", Value::from("G")), ("cost", Value::from(89.99))]);
        assert_eq!(detect_report_type(&r), "service");

        // facility_name alone is not enough
        let r = row(&[("facility_name", Value::from("G"))]);
        assert_eq!(detect_report_type(&r), "service"); // falls through to default
    }

    #[test]
    fn test_detect_ownership() {
        let r = row(&[("sale_price", Value::from(15000))]);
        assert_eq!(detect_report_type(&r), "ownership");
    }

    #[test]
    fn test_detect_inspection_requires_pass_fail() {
        let r = row(&[("result", Value::from("pass"))]);
        assert_eq!(detect_report_type(&r), "inspection");

        let r = row(&[("result", Value::from("ok"))]);
        assert_eq!(detect_report_type(&r), "service");
    }

    #[test]
    fn test_detect_recall() {
        let r = row(&[("recall_number", Value::from("21V-123"))]);
        assert_eq!(detect_report_type(&r), "recall_completion");
    }

    #[test]
    fn test_detect_date_odometer_falls_to_service() {
        let r = row(&[("date", Value::from("2025-01-01")), ("odometer_km", Value::from(45000))]);
        assert_eq!(detect_report_type(&r), "service");
    }

    #[test]
    fn test_detect_order_accident_wins_over_service() {
        let r = row(&[
            ("severity", Value::from("severe")),
            ("service_type", Value::from("repair")),
        ]);
        assert_eq!(detect_report_type(&r), "accident");
    }

    #[test]
    fn test_decode_text_strips_bom() {
        let bytes = [0xEF, 0xBB, 0xBF, b'v', b'i', b'n'];
        assert_eq!(decode_text(&bytes), "vin");
    }

    #[test]
    fn test_decode_text_latin1_fallback() {
        // "café" in Latin-1
        let bytes = [b'c', b'a', b'f', 0xE9];
        assert_eq!(decode_text(&bytes), "café");
    }

    #[test]
    fn test_detect_delimiter() {
        assert_eq!(detect_delimiter("vin,date,cost\n"), b',');
        assert_eq!(detect_delimiter("vin;date;cost\n"), b';');
        assert_eq!(detect_delimiter("vin\n"), b',');
    }

    #[test]
    fn test_parse_csv_lowercases_headers_and_coerces() {
        let text = "VIN , Date ,odometer_km,airbag_deployed\n2HGFC2F59MH528491,2025-06-15,45000,oui\n";
        let rows = parse_csv(text).unwrap();
        assert_eq!(rows.len(), 1);
        let r = &rows[0];
        assert_eq!(r["vin"], Value::from("2HGFC2F59MH528491"));
        assert_eq!(r["date"], Value::from("2025-06-15"));
        assert_eq!(r["odometer_km"], Value::from(45000));
        assert_eq!(r["airbag_deployed"], Value::Bool(true));
    }

    #[test]
    fn test_parse_csv_semicolon_delimiter() {
        let text = "vin;date\n2HGFC2F59MH528491;2025-06-15\n";
        let rows = parse_csv(text).unwrap();
        assert_eq!(rows[0]["date"], Value::from("2025-06-15"));
    }

    #[test]
    fn test_parse_csv_requires_vin_column() {
        let text = "date,cost\n2025-06-15,10\n";
        let err = parse_csv(text).unwrap_err();
        assert!(err.to_string().contains("vin"));
    }

    #[test]
    fn test_parse_csv_drops_empty_cells() {
        let text = "vin,date,cost\n2HGFC2F59MH528491,,\n";
        let rows = parse_csv(text).unwrap();
        assert!(rows[0].contains_key("vin"));
        assert!(!rows[0].contains_key("date"));
        assert!(!rows[0].contains_key("cost"));
    }

    #[test]
    fn test_batch_ref_format() {
        let r = new_batch_ref("CSV");
        assert_eq!(r.len(), 12);
        assert!(r.starts_with("CSV-"));
        assert!(r[4..].chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
    }
}
