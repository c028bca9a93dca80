use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Multipart, Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{AppError, AppResult};
use crate::models::{validate_vin, Submitter};
use crate::services::batch_ingestor::{BatchOutcome, BatchRecord};
use crate::services::{hash_chain, templates};
use crate::storage::MAX_FILES_PER_UPLOAD;

use super::AppState;

fn bad_vin() -> AppError {
    AppError::InvalidInput("VIN invalide (17 caractères alphanumériques).".to_string())
}

/// GET /api/collecte/vin-check/{vin} — decode + "already tracked?" probe.
pub async fn vin_check(
    State(state): State<AppState>,
    Path(vin): Path<String>,
) -> AppResult<Json<Value>> {
    let vin = vin.trim().to_uppercase();
    if !validate_vin(&vin) {
        return Err(bad_vin());
    }

    let existing = state.registry.find(&vin).await?;
    let existing_records = if existing.is_some() {
        state.registry.submission_count(&vin).await?
    } else {
        0
    };

    let decoded = state.registry.decoder().decode(&vin).await;
    if decoded.is_empty() {
        return Err(AppError::CannotDecode);
    }

    let attr = |key: &str| decoded.get(key).map(String::as_str).unwrap_or("");

    Ok(Json(json!({
        "found": existing.is_some(),
        "vehicle": {
            "make": attr("Make"),
            "model": attr("Model"),
            "year": attr("Model Year"),
            "body": attr("Body Class"),
            "engine": attr("Displacement (L)"),
            "fuel": attr("Fuel Type - Primary"),
            "drive": attr("Drive Type"),
            "transmission": attr("Transmission Style"),
            "plant_country": attr("Plant Country"),
        },
        "existing_records": existing_records,
    })))
}

#[derive(Deserialize)]
pub struct SubmitRequest {
    #[serde(default)]
    vin: String,
    #[serde(default)]
    report_type: String,
    #[serde(default)]
    submitter: Submitter,
    #[serde(default)]
    data: Value,
}

/// POST /api/collecte/submit — one contribution.
pub async fn submit(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(req): Json<SubmitRequest>,
) -> AppResult<Json<Value>> {
    let ip = addr.ip().to_string();
    let outcome = state
        .submissions
        .submit(&req.vin, &req.report_type, &req.submitter, &req.data, Some(&ip))
        .await?;

    Ok(Json(json!({
        "success": true,
        "submission_id": outcome.submission_id,
        "integrity_hash": outcome.integrity_hash,
        "message": "Contribution enregistrée avec succès.",
    })))
}

#[derive(Deserialize)]
pub struct BatchRequest {
    #[serde(default)]
    submitter: Submitter,
    #[serde(default)]
    records: Vec<BatchRecord>,
}

fn batch_response(outcome: &BatchOutcome) -> Json<Value> {
    Json(json!({
        "success": true,
        "batch_ref": outcome.batch_ref,
        "total_rows": outcome.total_rows,
        "success_count": outcome.success_count,
        "error_count": outcome.errors.len(),
        "errors": outcome.errors,
        "submission_ids": outcome.submission_ids,
    }))
}

/// POST /api/collecte/batch — up to 100 contributions, row-isolated.
pub async fn batch(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(req): Json<BatchRequest>,
) -> AppResult<Json<Value>> {
    let ip = addr.ip().to_string();
    let outcome = state
        .batches
        .ingest_json(&req.records, &req.submitter, Some(&ip))
        .await?;
    Ok(batch_response(&outcome))
}

/// POST /api/collecte/import-csv — multipart CSV plus submitter fields.
pub async fn import_csv(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    mut multipart: Multipart,
) -> AppResult<Json<Value>> {
    let ip = addr.ip().to_string();
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut submitter = Submitter::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidInput(format!("Multipart invalide: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" | "csv" => {
                let filename = field.file_name().unwrap_or("import.csv").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::InvalidInput(format!("Lecture du fichier: {}", e)))?;
                file = Some((filename, bytes.to_vec()));
            }
            "name" => submitter.name = field.text().await.unwrap_or_default(),
            "email" => submitter.email = field.text().await.unwrap_or_default(),
            "type" => submitter.submitter_type = field.text().await.unwrap_or_default(),
            "company" => submitter.company = field.text().await.unwrap_or_default(),
            _ => {}
        }
    }

    let (filename, bytes) =
        file.ok_or_else(|| AppError::InvalidInput("Aucun fichier envoyé.".to_string()))?;

    let outcome = state
        .batches
        .ingest_csv(&bytes, &filename, &submitter, Some(&ip))
        .await?;
    Ok(batch_response(&outcome))
}

/// POST /api/collecte/upload — up to 5 photos, stored under random names.
pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<Json<Value>> {
    // Drain the whole form before writing anything so an oversized batch
    // leaves no stray files behind.
    let mut files: Vec<(String, bytes::Bytes)> = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidInput(format!("Multipart invalide: {}", e)))?
    {
        let name = field.name().unwrap_or("");
        if name != "photos" && name != "files" {
            continue;
        }

        let original = field.file_name().unwrap_or("").to_string();
        if original.is_empty() {
            continue;
        }

        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::InvalidInput(format!("Lecture du fichier: {}", e)))?;
        files.push((original, bytes));
    }

    if files.is_empty() {
        return Err(AppError::InvalidInput("Aucun fichier envoyé.".to_string()));
    }
    if files.len() > MAX_FILES_PER_UPLOAD {
        return Err(AppError::InvalidInput(
            "Maximum 5 fichiers par soumission.".to_string(),
        ));
    }

    let mut uploaded = Vec::new();
    for (original, bytes) in &files {
        let stored = state.photos.save(original, bytes).await?;

        let mime = match stored.filename.rsplit('.').next() {
            Some("jpg") | Some("jpeg") => "image/jpeg",
            Some("png") => "image/png",
            Some("webp") => "image/webp",
            _ => "application/octet-stream",
        };

        sqlx::query(
            "INSERT INTO submission_photos (filename, original_name, mime_type, file_size) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(&stored.filename)
        .bind(&stored.original)
        .bind(mime)
        .bind(stored.size as i32)
        .execute(&state.pool)
        .await?;

        uploaded.push(stored);
    }

    Ok(Json(json!({ "files": uploaded })))
}

/// GET /api/collecte/stats
pub async fn stats(State(state): State<AppState>) -> AppResult<Json<Value>> {
    Ok(Json(state.lookups.stats().await?))
}

/// GET /api/collecte/verify — full-chain verification.
pub async fn verify_chain(State(state): State<AppState>) -> AppResult<Json<Value>> {
    let report = hash_chain::verify_all(&state.pool).await?;
    Ok(Json(serde_json::to_value(report).map_err(|e| {
        AppError::Internal(format!("verification report: {}", e))
    })?))
}

/// GET /api/collecte/verify/{id}
pub async fn verify_submission(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<Value>> {
    let report = hash_chain::verify_one(&state.pool, id).await?;
    Ok(Json(serde_json::to_value(report).map_err(|e| {
        AppError::Internal(format!("verification report: {}", e))
    })?))
}

/// GET /api/collecte/lookup/{vin} — assembled history.
pub async fn lookup(
    State(state): State<AppState>,
    Path(vin): Path<String>,
) -> AppResult<Json<Value>> {
    Ok(Json(state.lookups.lookup(&vin).await?))
}

/// GET /api/collecte/templates
pub async fn templates_index() -> Json<Value> {
    let list: Vec<Value> = templates::TEMPLATES
        .iter()
        .map(|t| {
            json!({
                "name": t.name,
                "description": t.description,
                "url": format!("/api/collecte/templates/{}", t.name),
            })
        })
        .collect();
    Json(json!({ "templates": list }))
}

/// GET /api/collecte/templates/{name} — CSV download.
pub async fn template_download(Path(name): Path<String>) -> Result<Response, AppError> {
    let template = templates::get(&name)
        .ok_or_else(|| AppError::NotFound("Modèle inconnu.".to_string()))?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"autoverif_{}.csv\"", template.name),
            ),
        ],
        template.content,
    )
        .into_response())
}
