//! Report queries. Rows are folded by [`crate::reports`].

use super::Database;
use crate::reports::{
    AgedAccountsReceivable, AgedInvoice, MonthlyRevenue, PaymentCollected, PaymentsCollected,
    RevenueByClient,
};
use crate::services::metrics::DB_QUERY_DURATION;
use chrono::NaiveDate;
use invoicing_core::error::AppError;
use tracing::instrument;
use uuid::Uuid;

impl Database {
    /// Outstanding amounts of unpaid invoices as of `as_of`, bucketed by age.
    #[instrument(skip(self))]
    pub async fn aged_accounts_receivable(
        &self,
        as_of: NaiveDate,
    ) -> Result<AgedAccountsReceivable, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["aged_accounts_receivable"])
            .start_timer();

        let invoices = sqlx::query_as::<_, AgedInvoice>(
            r#"
            SELECT
                i.client_id,
                c.organization_name AS client_name,
                i.invoice_total,
                COALESCE((
                    SELECT SUM(p.payment_amount) FROM payments p
                    WHERE p.invoice_id = i.invoice_id
                      AND p.deleted_at IS NULL
                      AND (p.payment_type IS NULL OR p.payment_type <> 'credit')
                      AND p.payment_date <= $1
                ), 0) AS payment_received,
                ($1::date - i.invoice_date) AS age_days
            FROM invoices i
            INNER JOIN clients c ON c.client_id = i.client_id
            WHERE i.status <> 'paid'
              AND i.deleted_at IS NULL
              AND i.invoice_date <= $1
            ORDER BY c.organization_name, i.invoice_date
            "#,
        )
        .bind(as_of)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to load aged receivables: {}", e))
        })?;

        timer.observe_duration();

        Ok(AgedAccountsReceivable::build(as_of, invoices))
    }

    /// Monthly payment totals per client for `year`.
    #[instrument(skip(self))]
    pub async fn revenue_by_client(
        &self,
        year: i32,
        client_id: Option<Uuid>,
    ) -> Result<RevenueByClient, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["revenue_by_client"])
            .start_timer();

        let monthly = sqlx::query_as::<_, MonthlyRevenue>(
            r#"
            SELECT
                c.client_id,
                c.organization_name AS client_name,
                EXTRACT(MONTH FROM p.payment_date)::int4 AS month,
                SUM(p.payment_amount) AS amount
            FROM payments p
            INNER JOIN invoices i ON i.invoice_id = p.invoice_id
            INNER JOIN clients c ON c.client_id = i.client_id
            WHERE EXTRACT(YEAR FROM p.payment_date)::int4 = $1
              AND p.deleted_at IS NULL
              AND (p.payment_type IS NULL OR p.payment_type <> 'credit')
              AND ($2::uuid IS NULL OR i.client_id = $2)
            GROUP BY c.client_id, c.organization_name, EXTRACT(MONTH FROM p.payment_date)
            ORDER BY c.organization_name, month
            "#,
        )
        .bind(year)
        .bind(client_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to load revenue by client: {}", e))
        })?;

        let client_name = self.report_client_name(client_id).await?;

        timer.observe_duration();

        Ok(RevenueByClient::build(year, client_name, monthly))
    }

    /// Payments dated between `from_date` and `to_date`, both inclusive.
    #[instrument(skip(self))]
    pub async fn payments_collected(
        &self,
        from_date: NaiveDate,
        to_date: NaiveDate,
        client_id: Option<Uuid>,
        payment_method: Option<String>,
    ) -> Result<PaymentsCollected, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["payments_collected"])
            .start_timer();

        let rows = sqlx::query_as::<_, PaymentCollected>(
            r#"
            SELECT
                p.payment_id,
                i.invoice_id,
                i.invoice_number,
                c.organization_name AS client_name,
                p.payment_type,
                p.payment_method,
                p.notes,
                p.payment_amount,
                p.payment_date
            FROM payments p
            INNER JOIN invoices i ON i.invoice_id = p.invoice_id
            INNER JOIN clients c ON c.client_id = i.client_id
            WHERE p.payment_date BETWEEN $1 AND $2
              AND p.deleted_at IS NULL
              AND ($3::uuid IS NULL OR c.client_id = $3)
              AND ($4::varchar IS NULL OR p.payment_method = $4)
            ORDER BY p.payment_date, i.invoice_number
            "#,
        )
        .bind(from_date)
        .bind(to_date)
        .bind(client_id)
        .bind(payment_method.filter(|m| !m.is_empty()))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to load payments collected: {}", e))
        })?;

        let client_name = self.report_client_name(client_id).await?;

        timer.observe_duration();

        Ok(PaymentsCollected::build(from_date, to_date, client_name, rows))
    }

    async fn report_client_name(&self, client_id: Option<Uuid>) -> Result<Option<String>, AppError> {
        let Some(client_id) = client_id else {
            return Ok(None);
        };
        let client = self
            .get_client(client_id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Client {} not found", client_id)))?;
        Ok(Some(client.organization_name))
    }
}
