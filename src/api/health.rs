use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use super::AppState;

/// GET /api/health — liveness plus a database probe.
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let (database, total_submissions) =
        match sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM submissions")
            .fetch_one(&state.pool)
            .await
        {
            Ok(count) => ("ok".to_string(), count),
            Err(e) => (format!("error: {}", e), 0),
        };

    Json(json!({
        "status": "ok",
        "service": "AutoVerif QC",
        "version": env!("CARGO_PKG_VERSION"),
        "database": database,
        "total_submissions": total_submissions,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}
