//! Payment queries. Every payment write that moves money also feeds the
//! owning invoice's status engine in the same transaction.

use super::history::{apply_status_event, lock_invoice, unpaid_amount, AppliedEvent};
use super::{archive_batch_number, commit, Database};
use crate::models::{CreatePayment, ListPaymentsFilter, Payment, PaymentType, UpdatePayment};
use crate::services::metrics::DB_QUERY_DURATION;
use crate::status::{payment_deletion_event, InvoiceStatus, StatusEvent};
use chrono::NaiveDate;
use invoicing_core::error::AppError;
use rust_decimal::Decimal;
use sqlx::PgConnection;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// A payment together with the status event it caused, if any.
/// Credit payments never touch the invoice status.
pub type PaymentChange = (Payment, Option<AppliedEvent>);

impl Database {
    /// Record a payment against an invoice.
    ///
    /// The amount is capped at what is still owed. The engine receives a full
    /// payment when nothing is left to pay, otherwise a partial one.
    #[instrument(skip(self, input), fields(invoice_id = %input.invoice_id))]
    pub async fn record_payment(
        &self,
        input: &CreatePayment,
    ) -> Result<(Payment, AppliedEvent), AppError> {
        if input.payment_amount <= Decimal::ZERO {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Payment amount must be positive"
            )));
        }

        let timer = DB_QUERY_DURATION
            .with_label_values(&["record_payment"])
            .start_timer();

        let mut tx = self.begin().await?;
        let invoice = lock_invoice(&mut tx, input.invoice_id).await?;
        if invoice.is_deleted() {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Cannot record payments on a deleted invoice"
            )));
        }

        let unpaid_before = unpaid_amount(&mut tx, &invoice).await?;
        if unpaid_before <= Decimal::ZERO {
            return Err(AppError::Conflict(anyhow::anyhow!(
                "Invoice {} has nothing left to pay",
                invoice.invoice_number
            )));
        }

        let applied_amount = input.payment_amount.min(unpaid_before);
        if applied_amount < input.payment_amount {
            warn!(
                invoice_id = %invoice.invoice_id,
                requested = %input.payment_amount,
                applied = %applied_amount,
                "Payment capped at unpaid amount"
            );
        }

        let paid_full = input.paid_full || applied_amount >= unpaid_before;
        let payment = insert_payment(
            &mut tx,
            input,
            applied_amount,
            PaymentType::Payment,
            paid_full,
        )
        .await?;

        let event = StatusEvent::for_payment(unpaid_before, applied_amount);
        let applied = apply_status_event(&mut tx, &invoice, event).await?;

        commit(tx).await?;
        timer.observe_duration();

        info!(
            payment_id = %payment.payment_id,
            invoice_id = %invoice.invoice_id,
            amount = %payment.payment_amount,
            "Payment recorded"
        );

        Ok((payment, applied))
    }

    /// Record a credit on an invoice. Credits do not reduce the unpaid amount.
    #[instrument(skip(self, notes), fields(invoice_id = %invoice_id))]
    pub async fn record_credit(
        &self,
        invoice_id: Uuid,
        amount: Decimal,
        payment_date: NaiveDate,
        notes: Option<String>,
    ) -> Result<Payment, AppError> {
        if amount <= Decimal::ZERO {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Credit amount must be positive"
            )));
        }

        let mut tx = self.begin().await?;
        let invoice = lock_invoice(&mut tx, invoice_id).await?;

        let input = CreatePayment {
            invoice_id,
            payment_amount: amount,
            payment_method: None,
            payment_date,
            notes: notes.or_else(|| {
                Some(format!(
                    "Converted from payments for invoice# {}",
                    invoice.invoice_number
                ))
            }),
            paid_full: false,
        };
        let payment = insert_payment(&mut tx, &input, amount, PaymentType::Credit, false).await?;

        commit(tx).await?;

        info!(payment_id = %payment.payment_id, amount = %amount, "Credit recorded");

        Ok(payment)
    }

    /// Get a payment by ID, including archived and deleted ones.
    #[instrument(skip(self), fields(payment_id = %payment_id))]
    pub async fn get_payment(&self, payment_id: Uuid) -> Result<Option<Payment>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_payment"])
            .start_timer();

        let payment = sqlx::query_as::<_, Payment>(concat!(
            "SELECT ",
            payment_columns!(),
            " FROM payments WHERE payment_id = $1"
        ))
        .bind(payment_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get payment: {}", e)))?;

        timer.observe_duration();

        Ok(payment)
    }

    /// List payments, newest first.
    #[instrument(skip(self, filter), fields(view = filter.view.as_str()))]
    pub async fn list_payments(
        &self,
        filter: &ListPaymentsFilter,
    ) -> Result<Vec<Payment>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_payments"])
            .start_timer();

        let payments = sqlx::query_as::<_, Payment>(concat!(
            "SELECT ",
            payment_columns!(),
            " FROM payments WHERE ",
            view_filter!(),
            r#"
              AND ($2::uuid IS NULL OR invoice_id = $2)
            ORDER BY created_utc DESC
            LIMIT $3 OFFSET $4
            "#
        ))
        .bind(filter.view.as_str())
        .bind(filter.invoice_id)
        .bind(filter.page.limit())
        .bind(filter.page.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list payments: {}", e)))?;

        timer.observe_duration();

        Ok(payments)
    }

    /// Update the descriptive fields of a payment.
    #[instrument(skip(self, input), fields(payment_id = %payment_id))]
    pub async fn update_payment(
        &self,
        payment_id: Uuid,
        input: &UpdatePayment,
    ) -> Result<Option<Payment>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_payment"])
            .start_timer();

        let payment = sqlx::query_as::<_, Payment>(concat!(
            r#"
            UPDATE payments
            SET payment_method = COALESCE($2, payment_method),
                payment_date = COALESCE($3, payment_date),
                notes = COALESCE($4, notes)
            WHERE payment_id = $1 AND deleted_at IS NULL
            RETURNING "#,
            payment_columns!()
        ))
        .bind(payment_id)
        .bind(&input.payment_method)
        .bind(input.payment_date)
        .bind(&input.notes)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to update payment: {}", e)))?;

        timer.observe_duration();

        Ok(payment)
    }

    /// Archive payments. Archived payments still count toward the invoice.
    #[instrument(skip(self, payment_ids), fields(count = payment_ids.len()))]
    pub async fn archive_payments(&self, payment_ids: &[Uuid]) -> Result<u64, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["archive_payments"])
            .start_timer();

        let result = sqlx::query(
            r#"
            UPDATE payments
            SET archived_at = NOW(), archive_number = $2
            WHERE payment_id = ANY($1) AND archived_at IS NULL AND deleted_at IS NULL
            "#,
        )
        .bind(payment_ids)
        .bind(archive_batch_number())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to archive payments: {}", e))
        })?;

        timer.observe_duration();

        Ok(result.rows_affected())
    }

    /// Unarchive payments.
    #[instrument(skip(self, payment_ids), fields(count = payment_ids.len()))]
    pub async fn recover_archived_payments(&self, payment_ids: &[Uuid]) -> Result<u64, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["recover_archived_payments"])
            .start_timer();

        let result = sqlx::query(
            r#"
            UPDATE payments
            SET archived_at = NULL, archive_number = NULL
            WHERE payment_id = ANY($1) AND archived_at IS NOT NULL AND deleted_at IS NULL
            "#,
        )
        .bind(payment_ids)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to recover archived payments: {}", e))
        })?;

        timer.observe_duration();

        Ok(result.rows_affected())
    }

    /// Soft-delete payments and revert the status of each owning invoice.
    ///
    /// Each deletion and its reversal share one transaction, so the reversal
    /// sees the payment history without the deleted row.
    #[instrument(skip(self, payment_ids), fields(count = payment_ids.len()))]
    pub async fn delete_payments(
        &self,
        payment_ids: &[Uuid],
    ) -> Result<Vec<PaymentChange>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["delete_payments"])
            .start_timer();

        let mut tx = self.begin().await?;
        let targets = find_payments(&mut tx, payment_ids, true).await?;
        lock_invoices_in_order(&mut tx, targets.iter().map(|p| p.invoice_id)).await?;
        let mut changes = Vec::with_capacity(targets.len());

        for existing in targets {
            let payment_id = existing.payment_id;
            let invoice = lock_invoice(&mut tx, existing.invoice_id).await?;
            let payment = set_payment_deleted(&mut tx, payment_id, true).await?;

            let applied = if payment.is_credit() {
                None
            } else {
                let event = payment_deletion_event(&mut *tx, invoice.invoice_id).await?;
                Some(apply_status_event(&mut tx, &invoice, event).await?)
            };

            info!(
                payment_id = %payment_id,
                invoice_id = %invoice.invoice_id,
                "Payment deleted"
            );
            changes.push((payment, applied));
        }

        commit(tx).await?;
        timer.observe_duration();

        Ok(changes)
    }

    /// Restore deleted payments and re-apply each one to its invoice.
    ///
    /// A payment is only restored when its invoice still owes at least the
    /// payment amount; otherwise the whole batch fails with `Conflict`.
    #[instrument(skip(self, payment_ids), fields(count = payment_ids.len()))]
    pub async fn recover_deleted_payments(
        &self,
        payment_ids: &[Uuid],
    ) -> Result<Vec<PaymentChange>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["recover_deleted_payments"])
            .start_timer();

        let mut tx = self.begin().await?;
        let targets = find_payments(&mut tx, payment_ids, false).await?;
        lock_invoices_in_order(&mut tx, targets.iter().map(|p| p.invoice_id)).await?;
        let mut changes = Vec::with_capacity(targets.len());

        for existing in targets {
            let payment_id = existing.payment_id;
            let invoice = lock_invoice(&mut tx, existing.invoice_id).await?;
            if invoice.is_deleted() {
                return Err(AppError::BadRequest(anyhow::anyhow!(
                    "Cannot recover payments on deleted invoice {}",
                    invoice.invoice_number
                )));
            }

            let unpaid_before = unpaid_amount(&mut tx, &invoice).await?;
            if !existing.is_credit() {
                if unpaid_before <= Decimal::ZERO {
                    return Err(AppError::Conflict(anyhow::anyhow!(
                        "Invoice {} has nothing left to pay",
                        invoice.invoice_number
                    )));
                }
                if existing.payment_amount > unpaid_before {
                    return Err(AppError::Conflict(anyhow::anyhow!(
                        "Payment of {} exceeds the {} still owed on invoice {}",
                        existing.payment_amount,
                        unpaid_before,
                        invoice.invoice_number
                    )));
                }
            }

            let payment = set_payment_deleted(&mut tx, payment_id, false).await?;
            let applied = if payment.is_credit() {
                None
            } else {
                let event = StatusEvent::for_payment(unpaid_before, payment.payment_amount);
                Some(apply_status_event(&mut tx, &invoice, event).await?)
            };

            info!(
                payment_id = %payment_id,
                invoice_id = %invoice.invoice_id,
                "Payment recovered"
            );
            changes.push((payment, applied));
        }

        commit(tx).await?;
        timer.observe_duration();

        Ok(changes)
    }

    /// Pay each invoice's unpaid amount in full.
    ///
    /// Fails without recording anything if any selected invoice is already
    /// `paid` or deleted. Invoices with nothing left to pay are skipped.
    #[instrument(skip(self, invoice_ids), fields(count = invoice_ids.len()))]
    pub async fn pay_invoices_in_full(
        &self,
        invoice_ids: &[Uuid],
        payment_date: NaiveDate,
        payment_method: Option<String>,
    ) -> Result<Vec<(Payment, AppliedEvent)>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["pay_invoices_in_full"])
            .start_timer();

        let mut selected: Vec<Uuid> = Vec::with_capacity(invoice_ids.len());
        for &invoice_id in invoice_ids {
            if !selected.contains(&invoice_id) {
                selected.push(invoice_id);
            }
        }

        let mut tx = self.begin().await?;
        lock_invoices_in_order(&mut tx, selected.iter().copied()).await?;
        let mut invoices = Vec::with_capacity(selected.len());
        for invoice_id in selected {
            let invoice = lock_invoice(&mut tx, invoice_id).await?;
            if invoice.is_deleted() {
                return Err(AppError::BadRequest(anyhow::anyhow!(
                    "Cannot pay deleted invoice {}",
                    invoice.invoice_number
                )));
            }
            if invoice.status()? == InvoiceStatus::Paid {
                return Err(AppError::Conflict(anyhow::anyhow!(
                    "Invoice {} is already paid",
                    invoice.invoice_number
                )));
            }
            invoices.push(invoice);
        }

        let mut payments = Vec::with_capacity(invoices.len());
        for invoice in invoices {
            let unpaid = unpaid_amount(&mut tx, &invoice).await?;
            if unpaid <= Decimal::ZERO {
                continue;
            }

            let input = CreatePayment {
                invoice_id: invoice.invoice_id,
                payment_amount: unpaid,
                payment_method: payment_method.clone(),
                payment_date,
                notes: None,
                paid_full: true,
            };
            let payment =
                insert_payment(&mut tx, &input, unpaid, PaymentType::Payment, true).await?;
            let applied = apply_status_event(
                &mut tx,
                &invoice,
                StatusEvent::for_payment(unpaid, unpaid),
            )
            .await?;
            payments.push((payment, applied));
        }

        commit(tx).await?;
        timer.observe_duration();

        info!(paid = payments.len(), "Invoices paid in full");

        Ok(payments)
    }
}

/// Lock each distinct invoice row in id order. Batches touching the same
/// invoices then always lock them in the same order.
async fn lock_invoices_in_order(
    conn: &mut PgConnection,
    invoice_ids: impl Iterator<Item = Uuid>,
) -> Result<(), AppError> {
    let mut ids: Vec<Uuid> = invoice_ids.collect();
    ids.sort();
    ids.dedup();
    for invoice_id in ids {
        lock_invoice(conn, invoice_id).await?;
    }
    Ok(())
}

/// Existing payments among `payment_ids` whose deleted flag equals `!deleted`,
/// in caller order without repeats.
async fn find_payments(
    conn: &mut PgConnection,
    payment_ids: &[Uuid],
    deleted: bool,
) -> Result<Vec<Payment>, AppError> {
    let mut found: Vec<Payment> = Vec::with_capacity(payment_ids.len());
    for &payment_id in payment_ids {
        if found.iter().any(|p| p.payment_id == payment_id) {
            continue;
        }
        if let Some(payment) = find_payment(conn, payment_id).await? {
            if payment.deleted_at.is_some() != deleted {
                found.push(payment);
            }
        }
    }
    Ok(found)
}

async fn insert_payment(
    conn: &mut PgConnection,
    input: &CreatePayment,
    amount: Decimal,
    payment_type: PaymentType,
    paid_full: bool,
) -> Result<Payment, AppError> {
    sqlx::query_as::<_, Payment>(concat!(
        r#"
        INSERT INTO payments (
            payment_id, invoice_id, payment_amount, payment_type, payment_method,
            payment_date, notes, paid_full, credit_applied
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 0)
        RETURNING "#,
        payment_columns!()
    ))
    .bind(Uuid::new_v4())
    .bind(input.invoice_id)
    .bind(amount)
    .bind(payment_type.as_db())
    .bind(&input.payment_method)
    .bind(input.payment_date)
    .bind(&input.notes)
    .bind(paid_full)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to record payment: {}", e)))
}

async fn find_payment(
    conn: &mut PgConnection,
    payment_id: Uuid,
) -> Result<Option<Payment>, AppError> {
    sqlx::query_as::<_, Payment>(concat!(
        "SELECT ",
        payment_columns!(),
        " FROM payments WHERE payment_id = $1"
    ))
    .bind(payment_id)
    .fetch_optional(&mut *conn)
    .await
    .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get payment: {}", e)))
}

async fn set_payment_deleted(
    conn: &mut PgConnection,
    payment_id: Uuid,
    deleted: bool,
) -> Result<Payment, AppError> {
    sqlx::query_as::<_, Payment>(concat!(
        r#"
        UPDATE payments
        SET deleted_at = CASE WHEN $2 THEN NOW() ELSE NULL END
        WHERE payment_id = $1
        RETURNING "#,
        payment_columns!()
    ))
    .bind(payment_id)
    .bind(deleted)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to update payment: {}", e)))
}
