//! Payment-history capability consulted by the payment-deletion reversal.

use super::{InvoiceStatus, PaymentFacts, StatusEvent};
use async_trait::async_trait;
use invoicing_core::error::AppError;
use uuid::Uuid;

/// Read access to the payment facts of an invoice.
///
/// Implemented for a Postgres connection so the facts can be read inside
/// the same transaction that removed the payment.
#[async_trait]
pub trait StatusHistory: Send {
    /// Whether any non-credit, non-deleted payment remains on the invoice.
    async fn has_payments(&mut self, invoice_id: Uuid) -> Result<bool, AppError>;

    /// Status held by the most recent audit-trail entry of the invoice.
    async fn previous_audited_status(
        &mut self,
        invoice_id: Uuid,
    ) -> Result<Option<InvoiceStatus>, AppError>;
}

/// Build the `DeleteLastPayment` event for an invoice whose payment was just removed.
pub async fn payment_deletion_event<H>(
    history: &mut H,
    invoice_id: Uuid,
) -> Result<StatusEvent, AppError>
where
    H: StatusHistory + ?Sized,
{
    let has_payments = history.has_payments(invoice_id).await?;
    let previous_audited_status = history.previous_audited_status(invoice_id).await?;

    Ok(StatusEvent::DeleteLastPayment(PaymentFacts {
        has_payments,
        previous_audited_status,
    }))
}
