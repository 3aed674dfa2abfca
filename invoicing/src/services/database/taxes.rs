//! Tax queries.

use super::Database;
use crate::models::{CreateTax, Tax};
use crate::services::metrics::DB_QUERY_DURATION;
use invoicing_core::error::AppError;
use sqlx::PgConnection;
use std::collections::HashMap;
use tracing::{info, instrument};
use uuid::Uuid;

impl Database {
    /// Create a new tax.
    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_tax(&self, input: &CreateTax) -> Result<Tax, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_tax"])
            .start_timer();

        let tax = sqlx::query_as::<_, Tax>(
            r#"
            INSERT INTO taxes (tax_id, name, percentage)
            VALUES ($1, $2, $3)
            RETURNING tax_id, name, percentage, created_utc
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&input.name)
        .bind(input.percentage)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                AppError::Conflict(anyhow::anyhow!(
                    "Tax '{} {}%' already exists",
                    input.name,
                    input.percentage
                ))
            }
            _ => AppError::DatabaseError(anyhow::anyhow!("Failed to create tax: {}", e)),
        })?;

        timer.observe_duration();

        info!(tax_id = %tax.tax_id, label = %tax.label(), "Tax created");

        Ok(tax)
    }

    /// Get a tax by ID.
    #[instrument(skip(self), fields(tax_id = %tax_id))]
    pub async fn get_tax(&self, tax_id: Uuid) -> Result<Option<Tax>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_tax"])
            .start_timer();

        let tax = sqlx::query_as::<_, Tax>(
            "SELECT tax_id, name, percentage, created_utc FROM taxes WHERE tax_id = $1",
        )
        .bind(tax_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get tax: {}", e)))?;

        timer.observe_duration();

        Ok(tax)
    }

    /// List every tax ordered by name.
    #[instrument(skip(self))]
    pub async fn list_taxes(&self) -> Result<Vec<Tax>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_taxes"])
            .start_timer();

        let taxes = sqlx::query_as::<_, Tax>(
            "SELECT tax_id, name, percentage, created_utc FROM taxes ORDER BY name, percentage",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list taxes: {}", e)))?;

        timer.observe_duration();

        Ok(taxes)
    }
}

/// Taxes with the given IDs keyed by ID. Unknown IDs are absent from the map.
pub(crate) async fn taxes_by_id(
    conn: &mut PgConnection,
    tax_ids: &[Uuid],
) -> Result<HashMap<Uuid, Tax>, AppError> {
    if tax_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let taxes = sqlx::query_as::<_, Tax>(
        "SELECT tax_id, name, percentage, created_utc FROM taxes WHERE tax_id = ANY($1)",
    )
    .bind(tax_ids)
    .fetch_all(&mut *conn)
    .await
    .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to load taxes: {}", e)))?;

    Ok(taxes.into_iter().map(|t| (t.tax_id, t)).collect())
}
