use serde::Serialize;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use sqlx::{PgConnection, PgPool};

use crate::error::{AppError, AppResult};

/// Sentinel used as `prev` in the hashed payload when the chain is empty.
pub const GENESIS: &str = "GENESIS";

/// Advisory-lock key serialising all appends. A `FOR UPDATE` on the tip row
/// cannot cover the empty-chain case (there is no row to lock), so every
/// append takes this transaction-scoped lock before reading the tip.
const CHAIN_LOCK_KEY: i64 = 0x5649_4e43_4841_494e;

/// Anchor the chain tip every this many submissions.
const ANCHOR_INTERVAL: i32 = 100;

/// Canonical payload committed to by a submission's integrity hash.
/// Serialized with JCS: lexicographically ordered keys, no whitespace,
/// non-ASCII preserved. Any deviation breaks cross-version verification.
pub fn canonical_payload(
    id: i32,
    vin: &str,
    report_type: &str,
    data_snapshot: &Value,
    previous_hash: Option<&str>,
    submitted_at: &str,
) -> Value {
    json!({
        "data": data_snapshot,
        "id": id,
        "prev": previous_hash.unwrap_or(GENESIS),
        "ts": submitted_at,
        "type": report_type,
        "vin": vin,
    })
}

/// Lowercase-hex SHA-256 over the canonical payload bytes.
pub fn compute_hash(
    id: i32,
    vin: &str,
    report_type: &str,
    data_snapshot: &Value,
    previous_hash: Option<&str>,
    submitted_at: &str,
) -> AppResult<String> {
    let payload = canonical_payload(id, vin, report_type, data_snapshot, previous_hash, submitted_at);
    let canonical = serde_jcs::to_string(&payload)
        .map_err(|e| AppError::Internal(format!("canonical encoding failed: {}", e)))?;
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

/// Serialise with all other appenders for the rest of the transaction.
pub async fn lock_chain(conn: &mut PgConnection) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .bind(CHAIN_LOCK_KEY)
        .execute(conn)
        .await?;
    Ok(())
}

/// Integrity hash of the latest submission, or `None` on an empty chain.
pub async fn tip(conn: &mut PgConnection) -> Result<Option<String>, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT integrity_hash FROM submissions \
         WHERE integrity_hash IS NOT NULL ORDER BY id DESC LIMIT 1",
    )
    .fetch_optional(conn)
    .await
}

#[derive(Debug, Serialize)]
pub struct BrokenLink {
    pub id: i32,
    pub error: String,
    pub detail: String,
}

#[derive(Debug, Serialize)]
pub struct ChainVerification {
    pub valid: bool,
    pub chain_length: usize,
    pub last_hash: Option<String>,
    pub broken_links: Vec<BrokenLink>,
}

#[derive(Debug, Serialize)]
pub struct SingleVerification {
    pub valid: bool,
    pub submission_id: i32,
    pub integrity_hash: String,
    pub computed_hash: String,
    pub previous_hash: Option<String>,
}

#[derive(sqlx::FromRow)]
struct ChainRow {
    id: i32,
    vin: String,
    report_type: String,
    previous_hash: Option<String>,
    integrity_hash: String,
    data_snapshot: Option<Value>,
}

fn recompute_row(row: &ChainRow) -> Result<String, String> {
    let snapshot = row
        .data_snapshot
        .as_ref()
        .ok_or_else(|| "missing data_snapshot".to_string())?;
    let submitted_at = snapshot
        .get("submitted_at")
        .and_then(Value::as_str)
        .ok_or_else(|| "snapshot missing submitted_at".to_string())?
        .to_string();
    compute_hash(
        row.id,
        &row.vin,
        &row.report_type,
        snapshot,
        row.previous_hash.as_deref(),
        &submitted_at,
    )
    .map_err(|e| e.to_string())
}

/// Scan every hash-bearing submission in id order and report rows whose
/// stored hash does not recompute (`hash_mismatch`) and rows whose stored
/// previous_hash does not match the recomputed hash of their predecessor
/// (`chain_break`). Rows predating the chain columns are skipped; the chain
/// begins at the first row with a hash. Read-only.
pub async fn verify_all(pool: &PgPool) -> AppResult<ChainVerification> {
    let rows = sqlx::query_as::<_, ChainRow>(
        "SELECT id, vin, report_type, previous_hash, integrity_hash, data_snapshot \
         FROM submissions WHERE integrity_hash IS NOT NULL ORDER BY id ASC",
    )
    .fetch_all(pool)
    .await?;

    let mut broken_links = Vec::new();
    let mut expected_prev: Option<String> = None;
    let mut first = true;

    for row in &rows {
        if first {
            // The genesis row carries no predecessor.
            if row.previous_hash.is_some() {
                broken_links.push(BrokenLink {
                    id: row.id,
                    error: "chain_break".to_string(),
                    detail: format!(
                        "first chained row has previous_hash {:?}",
                        row.previous_hash
                    ),
                });
            }
        } else if row.previous_hash != expected_prev {
            broken_links.push(BrokenLink {
                id: row.id,
                error: "chain_break".to_string(),
                detail: format!(
                    "previous_hash {:?} does not match predecessor hash {:?}",
                    row.previous_hash, expected_prev
                ),
            });
        }

        match recompute_row(row) {
            Ok(computed) => {
                if computed != row.integrity_hash {
                    broken_links.push(BrokenLink {
                        id: row.id,
                        error: "hash_mismatch".to_string(),
                        detail: format!("stored {} computed {}", row.integrity_hash, computed),
                    });
                }
                expected_prev = Some(computed);
            }
            Err(reason) => {
                broken_links.push(BrokenLink {
                    id: row.id,
                    error: "unreadable".to_string(),
                    detail: reason,
                });
                expected_prev = Some(row.integrity_hash.clone());
            }
        }
        first = false;
    }

    Ok(ChainVerification {
        valid: broken_links.is_empty(),
        chain_length: rows.len(),
        last_hash: rows.last().map(|r| r.integrity_hash.clone()),
        broken_links,
    })
}

pub async fn verify_one(pool: &PgPool, id: i32) -> AppResult<SingleVerification> {
    let row = sqlx::query_as::<_, ChainRow>(
        "SELECT id, vin, report_type, previous_hash, integrity_hash, data_snapshot \
         FROM submissions WHERE id = $1 AND integrity_hash IS NOT NULL",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Soumission inconnue.".to_string()))?;

    let computed = recompute_row(&row)
        .map_err(|reason| AppError::Internal(format!("submission {} unreadable: {}", id, reason)))?;

    Ok(SingleVerification {
        valid: computed == row.integrity_hash,
        submission_id: row.id,
        integrity_hash: row.integrity_hash,
        computed_hash: computed,
        previous_hash: row.previous_hash,
    })
}

/// Snapshot the chain tip into chain_anchors every ANCHOR_INTERVAL
/// submissions. Best effort, runs outside the submit transaction.
pub async fn maybe_anchor(pool: &PgPool, submission_id: i32, tip_hash: &str) {
    if submission_id % ANCHOR_INTERVAL != 0 {
        return;
    }
    let result = sqlx::query(
        r#"
        INSERT INTO chain_anchors (anchor_hash, submission_count, first_submission_id, last_submission_id)
        SELECT $1, COUNT(*), MIN(id), MAX(id)
        FROM submissions WHERE integrity_hash IS NOT NULL
        "#,
    )
    .bind(tip_hash)
    .execute(pool)
    .await;

    match result {
        Ok(_) => tracing::info!("Chain anchored at submission {}", submission_id),
        Err(e) => tracing::warn!("Chain anchor failed at submission {}: {}", submission_id, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_payload_key_order_and_whitespace() {
        let data = json!({"vin": "2HGFC2F59MH528491", "report_type": "service"});
        let payload = canonical_payload(
            1,
            "2HGFC2F59MH528491",
            "service",
            &data,
            None,
            "2025-06-15T12:00:00+00:00",
        );
        let canonical = serde_jcs::to_string(&payload).unwrap();
        assert!(canonical.starts_with(r#"{"data":{"#));
        let data_pos = canonical.find(r#""data""#).unwrap();
        let id_pos = canonical.find(r#""id""#).unwrap();
        let prev_pos = canonical.find(r#""prev""#).unwrap();
        let ts_pos = canonical.find(r#""ts""#).unwrap();
        let type_pos = canonical.find(r#""type""#).unwrap();
        let vin_pos = canonical.rfind(r#""vin""#).unwrap();
        assert!(data_pos < id_pos && id_pos < prev_pos && prev_pos < ts_pos);
        assert!(ts_pos < type_pos && type_pos < vin_pos);
        assert!(!canonical.contains(": "));
        assert!(!canonical.contains(", "));
    }

    #[test]
    fn test_genesis_sentinel_in_payload() {
        let payload = canonical_payload(1, "2HGFC2F59MH528491", "service", &json!({}), None, "t");
        assert_eq!(payload["prev"], "GENESIS");
        let payload =
            canonical_payload(2, "2HGFC2F59MH528491", "service", &json!({}), Some("abc"), "t");
        assert_eq!(payload["prev"], "abc");
    }

    #[test]
    fn test_non_ascii_preserved() {
        let data = json!({"description": "pare-brise cassé à Montréal"});
        let payload = canonical_payload(1, "2HGFC2F59MH528491", "accident", &data, None, "t");
        let canonical = serde_jcs::to_string(&payload).unwrap();
        assert!(canonical.contains("pare-brise cassé à Montréal"));
        assert!(!canonical.contains("\\u"));
    }

    #[test]
    fn test_compute_hash_is_lowercase_hex_sha256() {
        let hash = compute_hash(
            1,
            "2HGFC2F59MH528491",
            "service",
            &json!({"data": {"odometer_km": 45000}}),
            None,
            "2025-06-15T12:00:00+00:00",
        )
        .unwrap();
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_compute_hash_deterministic_and_sensitive() {
        let data = json!({"data": {"cost": 89.99}});
        let a = compute_hash(1, "2HGFC2F59MH528491", "service", &data, None, "t").unwrap();
        let b = compute_hash(1, "2HGFC2F59MH528491", "service", &data, None, "t").unwrap();
        assert_eq!(a, b);

        let tampered = json!({"data": {"cost": 1.00}});
        let c = compute_hash(1, "2HGFC2F59MH528491", "service", &tampered, None, "t").unwrap();
        assert_ne!(a, c);

        let relinked = compute_hash(1, "2HGFC2F59MH528491", "service", &data, Some("x"), "t").unwrap();
        assert_ne!(a, relinked);
    }

    #[test]
    fn test_compute_hash_matches_manual_encoding() {
        // Pin the exact bytes hashed so an encoder change cannot slip through.
        let data = json!({"a": 1});
        let hash = compute_hash(7, "2HGFC2F59MH528491", "service", &data, None, "T").unwrap();

        let manual = r#"{"data":{"a":1},"id":7,"prev":"GENESIS","ts":"T","type":"service","vin":"2HGFC2F59MH528491"}"#;
        let mut hasher = Sha256::new();
        hasher.update(manual.as_bytes());
        assert_eq!(hash, hex::encode(hasher.finalize()));
    }
}
