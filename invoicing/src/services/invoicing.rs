//! Invoicing operations: repository calls plus validation, metrics, and
//! client notifications.

use crate::config::CurrencyConfig;
use crate::models::{
    Client, CreateClient, CreateInvoice, CreatePayment, DisputeNote, DisputeNoteKind, Invoice,
    InvoiceDetail, NewDisputeNote, Payment, UpdateClient,
};
use crate::services::database::{AppliedEvent, Database, PaymentChange};
use crate::services::mailer::{deliver, InvoiceMailer, MailComposer, OutgoingMail};
use crate::services::metrics::{
    ERRORS_TOTAL, IGNORED_TRANSITIONS_TOTAL, PAYMENTS_TOTAL, PAYMENT_AMOUNT_TOTAL,
    STATUS_TRANSITIONS_TOTAL,
};
use crate::services::preview::PreviewTokens;
use crate::status::{StatusEvent, TransitionOutcome};
use chrono::NaiveDate;
use invoicing_core::error::AppError;
use rust_decimal::prelude::ToPrimitive;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

#[derive(Clone)]
pub struct InvoicingService {
    db: Arc<Database>,
    mailer: Arc<dyn InvoiceMailer>,
    previews: PreviewTokens,
    composer: MailComposer,
    currency_code: String,
}

impl InvoicingService {
    pub fn new(
        db: Arc<Database>,
        mailer: Arc<dyn InvoiceMailer>,
        previews: PreviewTokens,
        currency: &CurrencyConfig,
    ) -> Self {
        Self {
            db,
            mailer,
            previews,
            composer: MailComposer {
                currency_symbol: currency.symbol.clone(),
            },
            currency_code: currency.code.clone(),
        }
    }

    /// Repository for plain reads and bulk archive operations.
    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn previews(&self) -> &PreviewTokens {
        &self.previews
    }

    // -------------------------------------------------------------------------
    // Clients
    // -------------------------------------------------------------------------

    pub async fn create_client(&self, input: CreateClient) -> Result<Client, AppError> {
        input.validate()?;
        track(self.db.create_client(&input).await)
    }

    pub async fn update_client(
        &self,
        client_id: Uuid,
        input: UpdateClient,
    ) -> Result<Client, AppError> {
        input.validate()?;
        track(self.db.update_client(client_id, &input).await)?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Client {} not found", client_id)))
    }

    // -------------------------------------------------------------------------
    // Invoices
    // -------------------------------------------------------------------------

    /// Create an invoice. Invoices not saved as draft go out to the client.
    #[instrument(skip(self, input), fields(client_id = %input.client_id))]
    pub async fn create_invoice(&self, input: CreateInvoice) -> Result<InvoiceDetail, AppError> {
        let detail = track(self.db.create_invoice(&input).await)?;
        if !input.save_as_draft {
            self.notify_new_invoice(&detail.invoice).await;
        }
        Ok(detail)
    }

    /// Unsaved copy of an invoice dated `today`.
    pub async fn use_as_template(
        &self,
        invoice_id: Uuid,
        today: NaiveDate,
    ) -> Result<CreateInvoice, AppError> {
        let detail = self.invoice_detail(invoice_id).await?;
        Ok(detail.as_template(today))
    }

    /// Send an invoice to its client.
    #[instrument(skip(self), fields(invoice_id = %invoice_id))]
    pub async fn send_invoice(&self, invoice_id: Uuid) -> Result<AppliedEvent, AppError> {
        let applied = self.transition(invoice_id, StatusEvent::Send).await?;
        if !applied.outcome.is_ignored() {
            match self.invoice(invoice_id).await {
                Ok(invoice) => self.notify_new_invoice(&invoice).await,
                Err(e) => notification_failed(invoice_id, &e),
            }
        }
        Ok(applied)
    }

    #[instrument(skip(self), fields(invoice_id = %invoice_id))]
    pub async fn mark_viewed(&self, invoice_id: Uuid) -> Result<AppliedEvent, AppError> {
        self.transition(invoice_id, StatusEvent::View).await
    }

    /// Resolve a preview link: the invoice is marked viewed and returned.
    #[instrument(skip(self, token))]
    pub async fn open_preview(&self, token: &str) -> Result<InvoiceDetail, AppError> {
        let invoice_id = track(self.previews.decode(token))?;
        self.mark_viewed(invoice_id).await?;
        self.invoice_detail(invoice_id).await
    }

    /// The client disputes an invoice.
    #[instrument(skip(self, reason), fields(invoice_id = %invoice_id))]
    pub async fn dispute_invoice(
        &self,
        invoice_id: Uuid,
        reason: &str,
    ) -> Result<(AppliedEvent, DisputeNote), AppError> {
        let invoice = self.invoice(invoice_id).await?;
        let client = self.db.get_client(invoice.client_id).await?;
        let note = NewDisputeNote {
            kind: DisputeNoteKind::Dispute,
            content: reason.to_string(),
            sender: client.and_then(|c| c.email),
            recipient: None,
        };

        let (applied, stored) = track(self.db.dispute_invoice(invoice_id, &note).await)?;
        self.record_outcome(&applied);

        info!(invoice_id = %invoice_id, "Invoice disputed");

        Ok((applied, stored))
    }

    /// Answer a dispute. The invoice is sent again together with the reply.
    #[instrument(skip(self, response, sender), fields(invoice_id = %invoice_id))]
    pub async fn respond_to_dispute(
        &self,
        invoice_id: Uuid,
        response: &str,
        sender: Option<String>,
    ) -> Result<(AppliedEvent, DisputeNote), AppError> {
        let invoice = self.invoice(invoice_id).await?;
        let client = self.db.get_client(invoice.client_id).await?;
        let note = NewDisputeNote {
            kind: DisputeNoteKind::Response,
            content: response.to_string(),
            sender,
            recipient: client.as_ref().and_then(|c| c.email.clone()),
        };

        let (applied, stored) = track(self.db.respond_to_dispute(invoice_id, &note).await)?;
        self.record_outcome(&applied);

        let mail = match client {
            Some(client) => self.previews.url(invoice_id).map(|url| {
                self.composer
                    .dispute_response(&client, &invoice, response, &url)
            }),
            None => Ok(None),
        };
        self.dispatch(invoice_id, mail);

        Ok((applied, stored))
    }

    /// Email a note to the client without touching the invoice.
    pub async fn send_note_only(&self, invoice_id: Uuid, note: &str) -> Result<(), AppError> {
        let invoice = self.invoice(invoice_id).await?;
        if let Some(client) = self.db.get_client(invoice.client_id).await? {
            self.send_mail(self.composer.note(&client, &invoice, note));
        }
        Ok(())
    }

    /// Restore deleted invoices and rewind their status.
    pub async fn recover_deleted_invoices(
        &self,
        invoice_ids: &[Uuid],
    ) -> Result<Vec<AppliedEvent>, AppError> {
        let applied = track(self.db.recover_deleted_invoices(invoice_ids).await)?;
        applied.iter().for_each(|a| self.record_outcome(a));
        Ok(applied)
    }

    // -------------------------------------------------------------------------
    // Payments
    // -------------------------------------------------------------------------

    #[instrument(skip(self, input), fields(invoice_id = %input.invoice_id))]
    pub async fn record_payment(
        &self,
        input: CreatePayment,
    ) -> Result<(Payment, AppliedEvent), AppError> {
        let (payment, applied) = track(self.db.record_payment(&input).await)?;
        self.record_outcome(&applied);
        self.record_payment_metrics(&payment);
        self.notify_payment(&payment).await;
        Ok((payment, applied))
    }

    /// Delete payments; each owning invoice is reverted in the same transaction.
    pub async fn delete_payments(&self, payment_ids: &[Uuid]) -> Result<Vec<PaymentChange>, AppError> {
        let changes = track(self.db.delete_payments(payment_ids).await)?;
        self.record_changes(&changes);
        Ok(changes)
    }

    pub async fn recover_deleted_payments(
        &self,
        payment_ids: &[Uuid],
    ) -> Result<Vec<PaymentChange>, AppError> {
        let changes = track(self.db.recover_deleted_payments(payment_ids).await)?;
        self.record_changes(&changes);
        Ok(changes)
    }

    /// Pay every selected invoice in full.
    pub async fn pay_invoices_in_full(
        &self,
        invoice_ids: &[Uuid],
        payment_date: NaiveDate,
        payment_method: Option<String>,
    ) -> Result<Vec<(Payment, AppliedEvent)>, AppError> {
        let paid = track(
            self.db
                .pay_invoices_in_full(invoice_ids, payment_date, payment_method)
                .await,
        )?;
        for (payment, applied) in &paid {
            self.record_outcome(applied);
            self.record_payment_metrics(payment);
            self.notify_payment(payment).await;
        }
        Ok(paid)
    }

    // -------------------------------------------------------------------------
    // Helpers
    // -------------------------------------------------------------------------

    async fn transition(
        &self,
        invoice_id: Uuid,
        event: StatusEvent,
    ) -> Result<AppliedEvent, AppError> {
        let applied = track(self.db.transition_invoice(invoice_id, event).await)?;
        self.record_outcome(&applied);
        Ok(applied)
    }

    async fn invoice(&self, invoice_id: Uuid) -> Result<Invoice, AppError> {
        self.db
            .get_invoice(invoice_id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Invoice {} not found", invoice_id)))
    }

    async fn invoice_detail(&self, invoice_id: Uuid) -> Result<InvoiceDetail, AppError> {
        self.db
            .get_invoice_detail(invoice_id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Invoice {} not found", invoice_id)))
    }

    fn record_outcome(&self, applied: &AppliedEvent) {
        match applied.outcome {
            TransitionOutcome::Applied(t) if t.changed() => {
                STATUS_TRANSITIONS_TOTAL
                    .with_label_values(&[t.event.name(), t.from.status.as_str(), t.to.status.as_str()])
                    .inc();
            }
            TransitionOutcome::Applied(_) => {}
            TransitionOutcome::Ignored(i) => {
                IGNORED_TRANSITIONS_TOTAL
                    .with_label_values(&[i.event.name(), i.fields.status.as_str()])
                    .inc();
            }
        }
    }

    fn record_changes(&self, changes: &[PaymentChange]) {
        for applied in changes.iter().filter_map(|(_, a)| a.as_ref()) {
            self.record_outcome(applied);
        }
    }

    fn record_payment_metrics(&self, payment: &Payment) {
        PAYMENTS_TOTAL
            .with_label_values(&[payment.payment_method.as_deref().unwrap_or("unspecified")])
            .inc();
        PAYMENT_AMOUNT_TOTAL
            .with_label_values(&[&self.currency_code])
            .inc_by(payment.payment_amount.to_f64().unwrap_or(0.0));
    }

    // Notifications run after the commit. Lookup failures are logged and
    // counted, never returned.

    async fn notify_new_invoice(&self, invoice: &Invoice) {
        let mail = self.new_invoice_mail(invoice).await;
        self.dispatch(invoice.invoice_id, mail);
    }

    async fn notify_payment(&self, payment: &Payment) {
        let mail = self.payment_mail(payment).await;
        self.dispatch(payment.invoice_id, mail);
    }

    async fn new_invoice_mail(&self, invoice: &Invoice) -> Result<Option<OutgoingMail>, AppError> {
        let Some(client) = self.db.get_client(invoice.client_id).await? else {
            return Ok(None);
        };
        let url = self.previews.url(invoice.invoice_id)?;
        Ok(self.composer.new_invoice(&client, invoice, &url))
    }

    async fn payment_mail(&self, payment: &Payment) -> Result<Option<OutgoingMail>, AppError> {
        let invoice = self.invoice(payment.invoice_id).await?;
        let Some(client) = self.db.get_client(invoice.client_id).await? else {
            return Ok(None);
        };
        Ok(self.composer.payment_received(&client, &invoice, payment))
    }

    fn dispatch(&self, invoice_id: Uuid, mail: Result<Option<OutgoingMail>, AppError>) {
        match mail {
            Ok(mail) => self.send_mail(mail),
            Err(e) => notification_failed(invoice_id, &e),
        }
    }

    fn send_mail(&self, mail: Option<OutgoingMail>) {
        match mail {
            Some(mail) => deliver(Arc::clone(&self.mailer), mail),
            None => tracing::debug!("Client has no email address, skipping notification"),
        }
    }
}

fn notification_failed(invoice_id: Uuid, error: &AppError) {
    ERRORS_TOTAL.with_label_values(&["notification"]).inc();
    warn!(invoice_id = %invoice_id, error = %error, "Client notification skipped");
}

/// Count failures by kind before handing them back.
fn track<T>(result: Result<T, AppError>) -> Result<T, AppError> {
    if let Err(ref e) = result {
        ERRORS_TOTAL.with_label_values(&[e.kind()]).inc();
    }
    result
}
