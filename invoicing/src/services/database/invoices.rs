//! Invoice queries, line items, and the dispute history.

use super::history::{
    apply_status_event, lock_invoice, non_credit_payment_total, unpaid_amount, AppliedEvent,
};
use super::taxes::taxes_by_id;
use super::{archive_batch_number, commit, Database};
use crate::models::{
    CreateInvoice, CreateLineItem, Discount, DisputeNote, Invoice, InvoiceDetail, LineItem,
    ListInvoicesFilter, NewDisputeNote, StatusVersion, UpdateInvoice,
};
use crate::services::metrics::DB_QUERY_DURATION;
use crate::status::{InvoiceStatus, StatusEvent, StatusHistory};
use crate::totals::{tax_details, InvoiceTotals, TaxDetail};
use invoicing_core::error::AppError;
use rust_decimal::Decimal;
use sqlx::PgConnection;
use tracing::{info, instrument, warn};
use uuid::Uuid;

impl Database {
    /// Create an invoice with its line items and computed totals.
    #[instrument(skip(self, input), fields(client_id = %input.client_id))]
    pub async fn create_invoice(&self, input: &CreateInvoice) -> Result<InvoiceDetail, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_invoice"])
            .start_timer();

        let lines = non_blank_lines(&input.line_items);
        let mut tx = self.begin().await?;

        let taxes = taxes_by_id(&mut tx, &referenced_tax_ids(&lines)).await?;
        let totals = InvoiceTotals::compute(&lines, &taxes, input.discount);

        let invoice = sqlx::query_as::<_, Invoice>(concat!(
            r#"
            INSERT INTO invoices (
                invoice_id, invoice_number, client_id, invoice_date, due_date, po_number,
                discount_type, discount_percentage, discount_amount, sub_total, tax_amount,
                invoice_total, notes, terms, status
            )
            VALUES ($1, next_invoice_number(), $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING "#,
            invoice_columns!()
        ))
        .bind(Uuid::new_v4())
        .bind(input.client_id)
        .bind(input.invoice_date)
        .bind(input.due_date)
        .bind(&input.po_number)
        .bind(input.discount.type_str())
        .bind(input.discount.percentage())
        .bind(totals.discount_amount)
        .bind(totals.sub_total)
        .bind(totals.tax_amount)
        .bind(totals.invoice_total)
        .bind(&input.notes)
        .bind(&input.terms)
        .bind(input.initial_status().as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
                AppError::NotFound(anyhow::anyhow!("Client {} not found", input.client_id))
            }
            _ => AppError::DatabaseError(anyhow::anyhow!("Failed to create invoice: {}", e)),
        })?;

        let line_items = insert_line_items(&mut tx, invoice.invoice_id, &lines).await?;

        commit(tx).await?;
        timer.observe_duration();

        info!(
            invoice_id = %invoice.invoice_id,
            invoice_number = %invoice.invoice_number,
            status = %invoice.status,
            total = %invoice.invoice_total,
            "Invoice created"
        );

        Ok(InvoiceDetail {
            invoice,
            line_items,
        })
    }

    /// Get an invoice by ID, including archived and deleted ones.
    #[instrument(skip(self), fields(invoice_id = %invoice_id))]
    pub async fn get_invoice(&self, invoice_id: Uuid) -> Result<Option<Invoice>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_invoice"])
            .start_timer();

        let invoice = sqlx::query_as::<_, Invoice>(concat!(
            "SELECT ",
            invoice_columns!(),
            " FROM invoices WHERE invoice_id = $1"
        ))
        .bind(invoice_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get invoice: {}", e)))?;

        timer.observe_duration();

        Ok(invoice)
    }

    /// Get line items for an invoice.
    #[instrument(skip(self), fields(invoice_id = %invoice_id))]
    pub async fn get_line_items(&self, invoice_id: Uuid) -> Result<Vec<LineItem>, AppError> {
        let mut conn = self.acquire().await?;
        load_line_items(&mut conn, invoice_id).await
    }

    /// Get an invoice together with its line items.
    pub async fn get_invoice_detail(
        &self,
        invoice_id: Uuid,
    ) -> Result<Option<InvoiceDetail>, AppError> {
        let Some(invoice) = self.get_invoice(invoice_id).await? else {
            return Ok(None);
        };
        let line_items = self.get_line_items(invoice_id).await?;
        Ok(Some(InvoiceDetail {
            invoice,
            line_items,
        }))
    }

    /// Update an invoice. Line items are replaced when given; totals are
    /// recomputed either way. Status fields are left alone.
    #[instrument(skip(self, input), fields(invoice_id = %invoice_id))]
    pub async fn update_invoice(
        &self,
        invoice_id: Uuid,
        input: &UpdateInvoice,
    ) -> Result<InvoiceDetail, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_invoice"])
            .start_timer();

        let mut tx = self.begin().await?;
        let existing = lock_invoice(&mut tx, invoice_id).await?;
        if existing.is_deleted() {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Deleted invoices cannot be updated"
            )));
        }

        if let Some(ref items) = input.line_items {
            sqlx::query("DELETE FROM invoice_line_items WHERE invoice_id = $1")
                .bind(invoice_id)
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    AppError::DatabaseError(anyhow::anyhow!("Failed to replace line items: {}", e))
                })?;
            insert_line_items(&mut tx, invoice_id, &non_blank_lines(items)).await?;
        }

        let line_items = load_line_items(&mut tx, invoice_id).await?;
        let discount: Discount = input.discount.unwrap_or_else(|| existing.discount());
        let tax_ids: Vec<Uuid> = line_items
            .iter()
            .flat_map(|l| [l.tax1_id, l.tax2_id])
            .flatten()
            .collect();
        let taxes = taxes_by_id(&mut tx, &tax_ids).await?;
        let totals = InvoiceTotals::compute(&line_items, &taxes, discount);

        let invoice = sqlx::query_as::<_, Invoice>(concat!(
            r#"
            UPDATE invoices
            SET client_id = COALESCE($2, client_id),
                invoice_date = COALESCE($3, invoice_date),
                due_date = COALESCE($4, due_date),
                po_number = COALESCE($5, po_number),
                discount_type = $6,
                discount_percentage = $7,
                discount_amount = $8,
                sub_total = $9,
                tax_amount = $10,
                invoice_total = $11,
                notes = COALESCE($12, notes),
                terms = COALESCE($13, terms),
                updated_utc = NOW()
            WHERE invoice_id = $1
            RETURNING "#,
            invoice_columns!()
        ))
        .bind(invoice_id)
        .bind(input.client_id)
        .bind(input.invoice_date)
        .bind(input.due_date)
        .bind(&input.po_number)
        .bind(discount.type_str())
        .bind(discount.percentage())
        .bind(totals.discount_amount)
        .bind(totals.sub_total)
        .bind(totals.tax_amount)
        .bind(totals.invoice_total)
        .bind(&input.notes)
        .bind(&input.terms)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to update invoice: {}", e)))?;

        commit(tx).await?;
        timer.observe_duration();

        info!(invoice_id = %invoice_id, total = %invoice.invoice_total, "Invoice updated");

        Ok(InvoiceDetail {
            invoice,
            line_items,
        })
    }

    /// List invoices, newest first.
    #[instrument(skip(self, filter), fields(view = filter.view.as_str()))]
    pub async fn list_invoices(
        &self,
        filter: &ListInvoicesFilter,
    ) -> Result<Vec<Invoice>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_invoices"])
            .start_timer();

        let invoices = sqlx::query_as::<_, Invoice>(concat!(
            "SELECT ",
            invoice_columns!(),
            " FROM invoices WHERE ",
            view_filter!(),
            r#"
              AND ($2::uuid IS NULL OR client_id = $2)
              AND ($3::varchar IS NULL OR status = $3)
            ORDER BY created_utc DESC
            LIMIT $4 OFFSET $5
            "#
        ))
        .bind(filter.view.as_str())
        .bind(filter.client_id)
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.page.limit())
        .bind(filter.page.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list invoices: {}", e)))?;

        timer.observe_duration();

        Ok(invoices)
    }

    /// Active invoices that are not `paid`, oldest first.
    #[instrument(skip(self))]
    pub async fn unpaid_invoices(&self, client_id: Option<Uuid>) -> Result<Vec<Invoice>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["unpaid_invoices"])
            .start_timer();

        let invoices = sqlx::query_as::<_, Invoice>(concat!(
            "SELECT ",
            invoice_columns!(),
            r#"
            FROM invoices
            WHERE status <> 'paid'
              AND archived_at IS NULL
              AND deleted_at IS NULL
              AND ($1::uuid IS NULL OR client_id = $1)
            ORDER BY invoice_date, invoice_number
            "#
        ))
        .bind(client_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to list unpaid invoices: {}", e))
        })?;

        timer.observe_duration();

        Ok(invoices)
    }

    /// Archive invoices.
    #[instrument(skip(self, invoice_ids), fields(count = invoice_ids.len()))]
    pub async fn archive_invoices(&self, invoice_ids: &[Uuid]) -> Result<u64, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["archive_invoices"])
            .start_timer();

        let result = sqlx::query(
            r#"
            UPDATE invoices
            SET archived_at = NOW(), archive_number = $2, updated_utc = NOW()
            WHERE invoice_id = ANY($1) AND archived_at IS NULL AND deleted_at IS NULL
            "#,
        )
        .bind(invoice_ids)
        .bind(archive_batch_number())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to archive invoices: {}", e))
        })?;

        timer.observe_duration();

        info!(archived = result.rows_affected(), "Invoices archived");

        Ok(result.rows_affected())
    }

    /// Soft-delete invoices. Their credit payments are deleted with them.
    #[instrument(skip(self, invoice_ids), fields(count = invoice_ids.len()))]
    pub async fn delete_invoices(&self, invoice_ids: &[Uuid]) -> Result<u64, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["delete_invoices"])
            .start_timer();

        let mut tx = self.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE invoices
            SET deleted_at = NOW(), updated_utc = NOW()
            WHERE invoice_id = ANY($1) AND deleted_at IS NULL
            "#,
        )
        .bind(invoice_ids)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to delete invoices: {}", e)))?;

        sqlx::query(
            r#"
            UPDATE payments
            SET deleted_at = NOW()
            WHERE invoice_id = ANY($1) AND payment_type = 'credit' AND deleted_at IS NULL
            "#,
        )
        .bind(invoice_ids)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to delete credit payments: {}", e))
        })?;

        commit(tx).await?;
        timer.observe_duration();

        info!(deleted = result.rows_affected(), "Invoices deleted");

        Ok(result.rows_affected())
    }

    /// Unarchive invoices. The status is not touched.
    #[instrument(skip(self, invoice_ids), fields(count = invoice_ids.len()))]
    pub async fn recover_archived_invoices(&self, invoice_ids: &[Uuid]) -> Result<u64, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["recover_archived_invoices"])
            .start_timer();

        let result = sqlx::query(
            r#"
            UPDATE invoices
            SET archived_at = NULL, archive_number = NULL, updated_utc = NOW()
            WHERE invoice_id = ANY($1) AND archived_at IS NOT NULL AND deleted_at IS NULL
            "#,
        )
        .bind(invoice_ids)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to recover archived invoices: {}", e))
        })?;

        timer.observe_duration();

        Ok(result.rows_affected())
    }

    /// Restore deleted invoices, unarchive them, and apply the recovery event.
    /// IDs that are not deleted are skipped.
    #[instrument(skip(self, invoice_ids), fields(count = invoice_ids.len()))]
    pub async fn recover_deleted_invoices(
        &self,
        invoice_ids: &[Uuid],
    ) -> Result<Vec<AppliedEvent>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["recover_deleted_invoices"])
            .start_timer();

        let mut tx = self.begin().await?;
        let mut applied = Vec::with_capacity(invoice_ids.len());

        for &invoice_id in invoice_ids {
            let invoice = match lock_invoice(&mut tx, invoice_id).await {
                Ok(invoice) if invoice.is_deleted() => invoice,
                Ok(_) | Err(AppError::NotFound(_)) => continue,
                Err(e) => return Err(e),
            };

            sqlx::query(
                r#"
                UPDATE invoices
                SET deleted_at = NULL, archived_at = NULL, archive_number = NULL, updated_utc = NOW()
                WHERE invoice_id = $1
                "#,
            )
            .bind(invoice_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to recover invoice: {}", e))
            })?;

            applied.push(
                apply_status_event(&mut tx, &invoice, StatusEvent::RecoverFromArchiveOrTrash)
                    .await?,
            );
        }

        commit(tx).await?;
        timer.observe_duration();

        info!(recovered = applied.len(), "Deleted invoices recovered");

        Ok(applied)
    }

    /// Copy an invoice and its line items under a new number. The copy starts as `draft`.
    #[instrument(skip(self), fields(invoice_id = %invoice_id))]
    pub async fn duplicate_invoice(&self, invoice_id: Uuid) -> Result<InvoiceDetail, AppError> {
        let source = self
            .get_invoice_detail(invoice_id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Invoice {} not found", invoice_id)))?;

        let copy = self
            .create_invoice(&source.as_template(source.invoice.invoice_date))
            .await?;

        info!(
            source_invoice_id = %invoice_id,
            invoice_id = %copy.invoice.invoice_id,
            "Invoice duplicated"
        );

        Ok(copy)
    }

    /// Lock the invoice, feed `event` to the engine, and persist the outcome.
    #[instrument(skip(self), fields(invoice_id = %invoice_id, event = event.name()))]
    pub async fn transition_invoice(
        &self,
        invoice_id: Uuid,
        event: StatusEvent,
    ) -> Result<AppliedEvent, AppError> {
        let mut tx = self.begin().await?;
        let invoice = lock_invoice(&mut tx, invoice_id).await?;
        let applied = apply_status_event(&mut tx, &invoice, event).await?;
        commit(tx).await?;
        Ok(applied)
    }

    /// Mark an invoice disputed and record the client's reason.
    #[instrument(skip(self, note), fields(invoice_id = %invoice_id))]
    pub async fn dispute_invoice(
        &self,
        invoice_id: Uuid,
        note: &NewDisputeNote,
    ) -> Result<(AppliedEvent, DisputeNote), AppError> {
        let mut tx = self.begin().await?;
        let invoice = lock_invoice(&mut tx, invoice_id).await?;
        let applied = apply_status_event(&mut tx, &invoice, StatusEvent::Dispute).await?;
        let stored = insert_dispute_note(&mut tx, invoice_id, note).await?;
        commit(tx).await?;
        Ok((applied, stored))
    }

    /// Answer a dispute: the invoice is sent again and the reply is recorded.
    #[instrument(skip(self, note), fields(invoice_id = %invoice_id))]
    pub async fn respond_to_dispute(
        &self,
        invoice_id: Uuid,
        note: &NewDisputeNote,
    ) -> Result<(AppliedEvent, DisputeNote), AppError> {
        let mut tx = self.begin().await?;
        let invoice = lock_invoice(&mut tx, invoice_id).await?;
        if invoice.status()? != InvoiceStatus::Disputed {
            warn!(invoice_id = %invoice_id, status = %invoice.status, "Invoice is not disputed");
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Invoice {} is not disputed",
                invoice.invoice_number
            )));
        }
        let applied = apply_status_event(&mut tx, &invoice, StatusEvent::Send).await?;
        let stored = insert_dispute_note(&mut tx, invoice_id, note).await?;
        commit(tx).await?;
        Ok((applied, stored))
    }

    /// Dispute history of an invoice, oldest first.
    #[instrument(skip(self), fields(invoice_id = %invoice_id))]
    pub async fn dispute_history(&self, invoice_id: Uuid) -> Result<Vec<DisputeNote>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["dispute_history"])
            .start_timer();

        let notes = sqlx::query_as::<_, DisputeNote>(
            r#"
            SELECT note_id, invoice_id, kind, content, sender, recipient, subject, created_utc
            FROM invoice_dispute_notes
            WHERE invoice_id = $1
            ORDER BY created_utc
            "#,
        )
        .bind(invoice_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to get dispute history: {}", e))
        })?;

        timer.observe_duration();

        Ok(notes)
    }

    /// Audit trail of an invoice, newest first.
    #[instrument(skip(self), fields(invoice_id = %invoice_id))]
    pub async fn status_versions(&self, invoice_id: Uuid) -> Result<Vec<StatusVersion>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["status_versions"])
            .start_timer();

        let versions = sqlx::query_as::<_, StatusVersion>(
            r#"
            SELECT version_id, invoice_id, status, last_invoice_status, created_utc
            FROM invoice_status_versions
            WHERE invoice_id = $1
            ORDER BY created_utc DESC
            "#,
        )
        .bind(invoice_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to get status versions: {}", e))
        })?;

        timer.observe_duration();

        Ok(versions)
    }

    /// Amount still owed on an invoice.
    #[instrument(skip(self), fields(invoice_id = %invoice_id))]
    pub async fn invoice_unpaid_amount(&self, invoice_id: Uuid) -> Result<Decimal, AppError> {
        let invoice = self
            .get_invoice(invoice_id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Invoice {} not found", invoice_id)))?;
        let mut conn = self.acquire().await?;
        unpaid_amount(&mut conn, &invoice).await
    }

    /// Total of the live non-credit payments on an invoice.
    pub async fn invoice_payment_total(&self, invoice_id: Uuid) -> Result<Decimal, AppError> {
        let mut conn = self.acquire().await?;
        non_credit_payment_total(&mut conn, invoice_id).await
    }

    /// Whether any live non-credit payment is recorded on an invoice.
    pub async fn invoice_has_payments(&self, invoice_id: Uuid) -> Result<bool, AppError> {
        let mut conn = self.acquire().await?;
        conn.has_payments(invoice_id).await
    }

    /// Tax amounts of an invoice grouped by tax label.
    #[instrument(skip(self), fields(invoice_id = %invoice_id))]
    pub async fn invoice_tax_details(&self, invoice_id: Uuid) -> Result<Vec<TaxDetail>, AppError> {
        let mut conn = self.acquire().await?;
        let line_items = load_line_items(&mut conn, invoice_id).await?;
        let tax_ids: Vec<Uuid> = line_items
            .iter()
            .flat_map(|l| [l.tax1_id, l.tax2_id])
            .flatten()
            .collect();
        let taxes = taxes_by_id(&mut conn, &tax_ids).await?;
        Ok(tax_details(&line_items, &taxes))
    }
}

fn non_blank_lines(lines: &[CreateLineItem]) -> Vec<CreateLineItem> {
    lines.iter().filter(|l| !l.is_blank()).cloned().collect()
}

fn referenced_tax_ids(lines: &[CreateLineItem]) -> Vec<Uuid> {
    lines
        .iter()
        .flat_map(|l| [l.tax1_id, l.tax2_id])
        .flatten()
        .collect()
}

async fn insert_line_items(
    conn: &mut PgConnection,
    invoice_id: Uuid,
    lines: &[CreateLineItem],
) -> Result<Vec<LineItem>, AppError> {
    let mut inserted = Vec::with_capacity(lines.len());
    for (sort_order, line) in lines.iter().enumerate() {
        let item = sqlx::query_as::<_, LineItem>(concat!(
            r#"
            INSERT INTO invoice_line_items (
                line_item_id, invoice_id, item_name, item_description, item_unit_cost,
                item_quantity, tax1_id, tax2_id, sort_order
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING "#,
            line_item_columns!()
        ))
        .bind(Uuid::new_v4())
        .bind(invoice_id)
        .bind(line.item_name.trim())
        .bind(&line.item_description)
        .bind(line.item_unit_cost)
        .bind(line.item_quantity)
        .bind(line.tax1_id)
        .bind(line.tax2_id)
        .bind(sort_order as i32)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
                AppError::BadRequest(anyhow::anyhow!("Unknown tax on line '{}'", line.item_name))
            }
            _ => AppError::DatabaseError(anyhow::anyhow!("Failed to add line item: {}", e)),
        })?;
        inserted.push(item);
    }
    Ok(inserted)
}

async fn load_line_items(
    conn: &mut PgConnection,
    invoice_id: Uuid,
) -> Result<Vec<LineItem>, AppError> {
    let timer = DB_QUERY_DURATION
        .with_label_values(&["get_line_items"])
        .start_timer();

    let line_items = sqlx::query_as::<_, LineItem>(concat!(
        "SELECT ",
        line_item_columns!(),
        " FROM invoice_line_items WHERE invoice_id = $1 ORDER BY sort_order, created_utc"
    ))
    .bind(invoice_id)
    .fetch_all(&mut *conn)
    .await
    .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get line items: {}", e)))?;

    timer.observe_duration();

    Ok(line_items)
}

async fn insert_dispute_note(
    conn: &mut PgConnection,
    invoice_id: Uuid,
    note: &NewDisputeNote,
) -> Result<DisputeNote, AppError> {
    sqlx::query_as::<_, DisputeNote>(
        r#"
        INSERT INTO invoice_dispute_notes (note_id, invoice_id, kind, content, sender, recipient, subject)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING note_id, invoice_id, kind, content, sender, recipient, subject, created_utc
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(invoice_id)
    .bind(note.kind.as_str())
    .bind(&note.content)
    .bind(&note.sender)
    .bind(&note.recipient)
    .bind(note.kind.subject())
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to record dispute note: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(name: &str, tax: Option<Uuid>) -> CreateLineItem {
        CreateLineItem {
            item_name: name.to_string(),
            item_description: None,
            item_unit_cost: Decimal::ONE,
            item_quantity: Decimal::ONE,
            tax1_id: tax,
            tax2_id: None,
        }
    }

    #[test]
    fn test_blank_lines_are_dropped() {
        let lines = vec![line("Hosting", None), line("   ", None), line("", None)];
        let kept = non_blank_lines(&lines);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].item_name, "Hosting");
    }

    #[test]
    fn test_referenced_tax_ids() {
        let tax = Uuid::new_v4();
        let ids = referenced_tax_ids(&[line("A", Some(tax)), line("B", None)]);
        assert_eq!(ids, vec![tax]);
    }
}
