//! Services module for the invoicing service.

pub mod database;
pub mod invoicing;
pub mod mailer;
pub mod metrics;
pub mod preview;

pub use database::{AppliedEvent, Database, PaymentChange};
pub use invoicing::InvoicingService;
pub use mailer::{InvoiceMailer, LogMailer, MailComposer, OutgoingMail, SmtpMailer};
pub use metrics::{get_metrics, init_metrics};
pub use preview::PreviewTokens;
