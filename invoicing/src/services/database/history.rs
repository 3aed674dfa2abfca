//! Status writes and the audit trail.

use crate::models::Invoice;
use crate::services::metrics::DB_QUERY_DURATION;
use crate::status::{
    InvoiceStatus, InvoiceStatusEngine, StatusEvent, StatusHistory, TransitionOutcome,
};
use async_trait::async_trait;
use invoicing_core::error::AppError;
use rust_decimal::Decimal;
use sqlx::PgConnection;
use tracing::{debug, info};
use uuid::Uuid;

/// Outcome of one engine event for one invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppliedEvent {
    pub invoice_id: Uuid,
    pub outcome: TransitionOutcome,
}

#[async_trait]
impl StatusHistory for PgConnection {
    async fn has_payments(&mut self, invoice_id: Uuid) -> Result<bool, AppError> {
        sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM payments
                WHERE invoice_id = $1
                  AND deleted_at IS NULL
                  AND (payment_type IS NULL OR payment_type <> 'credit')
            )
            "#,
        )
        .bind(invoice_id)
        .fetch_one(&mut *self)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to check payments: {}", e)))
    }

    async fn previous_audited_status(
        &mut self,
        invoice_id: Uuid,
    ) -> Result<Option<InvoiceStatus>, AppError> {
        let status = sqlx::query_scalar::<_, String>(
            r#"
            SELECT status FROM invoice_status_versions
            WHERE invoice_id = $1 AND status = 'disputed'
            ORDER BY created_utc DESC
            LIMIT 1
            "#,
        )
        .bind(invoice_id)
        .fetch_optional(&mut *self)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to read status history: {}", e))
        })?;

        Ok(status.map(|s| s.parse::<InvoiceStatus>()).transpose()?)
    }
}

/// Load an invoice and lock its row until the transaction ends.
pub(crate) async fn lock_invoice(
    conn: &mut PgConnection,
    invoice_id: Uuid,
) -> Result<Invoice, AppError> {
    sqlx::query_as::<_, Invoice>(concat!(
        "SELECT ",
        invoice_columns!(),
        " FROM invoices WHERE invoice_id = $1 FOR UPDATE"
    ))
    .bind(invoice_id)
    .fetch_optional(&mut *conn)
    .await
    .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to lock invoice: {}", e)))?
    .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Invoice {} not found", invoice_id)))
}

/// Sum of every live non-credit payment on an invoice.
pub(crate) async fn non_credit_payment_total(
    conn: &mut PgConnection,
    invoice_id: Uuid,
) -> Result<Decimal, AppError> {
    sqlx::query_scalar::<_, Decimal>(
        r#"
        SELECT COALESCE(SUM(payment_amount), 0) FROM payments
        WHERE invoice_id = $1
          AND deleted_at IS NULL
          AND (payment_type IS NULL OR payment_type <> 'credit')
        "#,
    )
    .bind(invoice_id)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to sum payments: {}", e)))
}

/// `invoice_total` minus every live non-credit payment.
pub(crate) async fn unpaid_amount(
    conn: &mut PgConnection,
    invoice: &Invoice,
) -> Result<Decimal, AppError> {
    let paid = non_credit_payment_total(conn, invoice.invoice_id).await?;
    Ok(invoice.invoice_total - paid)
}

/// Run `event` through the engine and persist the result.
///
/// Ignored events leave the row untouched. A transition out of `disputed`
/// also writes an audit row holding the pre-transition fields.
pub(crate) async fn apply_status_event(
    conn: &mut PgConnection,
    invoice: &Invoice,
    event: StatusEvent,
) -> Result<AppliedEvent, AppError> {
    let fields = invoice.status_fields()?;
    let outcome = InvoiceStatusEngine::apply(fields, event);

    let transition = match outcome {
        TransitionOutcome::Applied(t) if t.changed() => t,
        TransitionOutcome::Applied(_) => {
            return Ok(AppliedEvent {
                invoice_id: invoice.invoice_id,
                outcome,
            })
        }
        TransitionOutcome::Ignored(ignored) => {
            debug!(
                invoice_id = %invoice.invoice_id,
                event = ignored.event.name(),
                status = %ignored.fields.status,
                reason = ignored.reason,
                "Status event ignored"
            );
            return Ok(AppliedEvent {
                invoice_id: invoice.invoice_id,
                outcome,
            });
        }
    };

    let timer = DB_QUERY_DURATION
        .with_label_values(&["apply_status_event"])
        .start_timer();

    sqlx::query(
        r#"
        UPDATE invoices
        SET status = $2,
            last_invoice_status = $3,
            updated_utc = NOW()
        WHERE invoice_id = $1
        "#,
    )
    .bind(invoice.invoice_id)
    .bind(transition.to.status.as_str())
    .bind(transition.to.last_invoice_status.map(|s| s.as_str()))
    .execute(&mut *conn)
    .await
    .map_err(|e| {
        AppError::DatabaseError(anyhow::anyhow!("Failed to update invoice status: {}", e))
    })?;

    if transition.leaves_dispute() {
        sqlx::query(
            r#"
            INSERT INTO invoice_status_versions (version_id, invoice_id, status, last_invoice_status)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(invoice.invoice_id)
        .bind(transition.from.status.as_str())
        .bind(transition.from.last_invoice_status.map(|s| s.as_str()))
        .execute(&mut *conn)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to write status version: {}", e))
        })?;
    }

    timer.observe_duration();

    info!(
        invoice_id = %invoice.invoice_id,
        event = transition.event.name(),
        from = %transition.from.status,
        to = %transition.to.status,
        "Invoice status changed"
    );

    Ok(AppliedEvent {
        invoice_id: invoice.invoice_id,
        outcome,
    })
}
