use serde_json::Value;
use sqlx::PgConnection;

/// Append-only audit writer. Runs on the caller's connection so entries
/// commit or roll back with the operation they describe.
pub async fn append(
    conn: &mut PgConnection,
    action: &str,
    target_table: &str,
    target_id: Option<i32>,
    details: Value,
    ip: Option<&str>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO audit_log (action, target_table, target_id, details, ip_address)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(action)
    .bind(target_table)
    .bind(target_id)
    .bind(details)
    .bind(ip)
    .execute(conn)
    .await?;
    Ok(())
}
