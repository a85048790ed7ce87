use serde_json::Value;
use uuid::Uuid;

use crate::{db::DbPool, error::AppResult};

/// One row of the audit trail.
#[derive(Debug)]
pub struct AuditEntry<'a> {
    pub customer_id: Option<Uuid>,
    pub action: &'a str,
    pub resource: &'a str,
    pub metadata: Value,
}

pub async fn log_audit(pool: &DbPool, entry: &AuditEntry<'_>) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO audit_logs (id, customer_id, action, resource, metadata)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(entry.customer_id)
    .bind(entry.action)
    .bind(entry.resource)
    .bind(&entry.metadata)
    .execute(pool)
    .await?;

    Ok(())
}

/// Audit writes never fail the request that triggered them.
pub async fn record(pool: &DbPool, entry: AuditEntry<'_>) {
    if let Err(err) = log_audit(pool, &entry).await {
        tracing::warn!(error = %err, action = entry.action, "audit log failed");
    }
}
