//! Outgoing client notifications.
//!
//! Mail is fire-and-forget: [`deliver`] spawns the send and only logs
//! failures, so a broken SMTP relay never fails an invoice operation.

use crate::config::MailConfig;
use crate::models::{Client, Invoice, Payment};
use async_trait::async_trait;
use invoicing_core::error::AppError;
use lettre::{
    message::header::ContentType, transport::smtp::authentication::Credentials, Message,
    SmtpTransport, Transport,
};
use secrecy::ExposeSecret;
use std::sync::Arc;
use std::time::Duration;

/// A rendered plain-text email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait InvoiceMailer: Send + Sync {
    async fn send(&self, mail: OutgoingMail) -> Result<(), AppError>;
}

/// SMTP delivery through `lettre`.
#[derive(Clone)]
pub struct SmtpMailer {
    transport: SmtpTransport,
    from: String,
}

impl SmtpMailer {
    pub fn new(config: &MailConfig) -> Result<Self, AppError> {
        let creds = Credentials::new(
            config.smtp_user.clone(),
            config.smtp_password.expose_secret().clone(),
        );

        let transport = SmtpTransport::starttls_relay(&config.smtp_host)
            .map_err(|e| AppError::EmailError(e.to_string()))?
            .credentials(creds)
            .timeout(Some(Duration::from_secs(10)))
            .build();

        tracing::info!(smtp_host = %config.smtp_host, "SMTP mailer initialized");

        Ok(Self {
            transport,
            from: config.from.clone(),
        })
    }
}

#[async_trait]
impl InvoiceMailer for SmtpMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<(), AppError> {
        let message = Message::builder()
            .from(
                self.from
                    .parse()
                    .map_err(|e: lettre::address::AddressError| AppError::EmailError(e.to_string()))?,
            )
            .to(mail
                .to
                .parse()
                .map_err(|e: lettre::address::AddressError| AppError::EmailError(e.to_string()))?)
            .subject(mail.subject.clone())
            .header(ContentType::TEXT_PLAIN)
            .body(mail.body)?;

        // SmtpTransport blocks; keep it off the runtime threads.
        let transport = self.transport.clone();
        tokio::task::spawn_blocking(move || transport.send(&message))
            .await
            .map_err(|e| AppError::InternalError(e.into()))?
            .map_err(|e| AppError::EmailError(e.to_string()))?;

        tracing::info!(to = %mail.to, subject = %mail.subject, "Email sent");
        Ok(())
    }
}

/// Logs mail instead of sending it. Used when SMTP is not configured.
#[derive(Debug, Clone, Default)]
pub struct LogMailer;

#[async_trait]
impl InvoiceMailer for LogMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<(), AppError> {
        tracing::info!(to = %mail.to, subject = %mail.subject, "Email delivery disabled, not sent");
        Ok(())
    }
}

/// Send `mail` in the background. Failures are logged, never returned.
pub fn deliver(mailer: Arc<dyn InvoiceMailer>, mail: OutgoingMail) {
    tokio::spawn(async move {
        let to = mail.to.clone();
        if let Err(e) = mailer.send(mail).await {
            crate::services::metrics::ERRORS_TOTAL
                .with_label_values(&[e.kind()])
                .inc();
            tracing::error!(error = %e, to = %to, "Failed to deliver email");
        }
    });
}

/// Renders the notifications the service sends to clients.
#[derive(Debug, Clone)]
pub struct MailComposer {
    pub currency_symbol: String,
}

impl MailComposer {
    pub fn new_invoice(&self, client: &Client, invoice: &Invoice, preview_url: &str) -> Option<OutgoingMail> {
        Some(OutgoingMail {
            to: client.email.clone()?,
            subject: format!("New invoice {}", invoice.invoice_number),
            body: format!(
                "Hello {},\n\nInvoice {} for {}{} is ready.\n\nView it online: {}\n",
                greeting_name(client),
                invoice.invoice_number,
                self.currency_symbol,
                invoice.invoice_total,
                preview_url
            ),
        })
    }

    pub fn payment_received(
        &self,
        client: &Client,
        invoice: &Invoice,
        payment: &Payment,
    ) -> Option<OutgoingMail> {
        Some(OutgoingMail {
            to: client.email.clone()?,
            subject: format!("Payment received for invoice {}", invoice.invoice_number),
            body: format!(
                "Hello {},\n\nWe received your payment of {}{} on {} for invoice {}.\n\nThank you.\n",
                greeting_name(client),
                self.currency_symbol,
                payment.payment_amount,
                payment.payment_date,
                invoice.invoice_number
            ),
        })
    }

    pub fn dispute_response(
        &self,
        client: &Client,
        invoice: &Invoice,
        response: &str,
        preview_url: &str,
    ) -> Option<OutgoingMail> {
        Some(OutgoingMail {
            to: client.email.clone()?,
            subject: format!("Response to your dispute of invoice {}", invoice.invoice_number),
            body: format!(
                "Hello {},\n\n{}\n\nView the invoice: {}\n",
                greeting_name(client),
                response,
                preview_url
            ),
        })
    }

    pub fn note(&self, client: &Client, invoice: &Invoice, note: &str) -> Option<OutgoingMail> {
        Some(OutgoingMail {
            to: client.email.clone()?,
            subject: format!("Note about invoice {}", invoice.invoice_number),
            body: format!("Hello {},\n\n{}\n", greeting_name(client), note),
        })
    }
}

fn greeting_name(client: &Client) -> String {
    let contact = client.contact_name();
    if contact.is_empty() {
        client.organization_name.clone()
    } else {
        contact
    }
}
