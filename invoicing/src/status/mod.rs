//! Invoice status state machine.
//!
//! [`InvoiceStatusEngine::apply`] is the single transition function: it takes
//! the two status fields of an invoice and a [`StatusEvent`] and returns a
//! [`TransitionOutcome`]. It never touches the database. Facts about payment
//! history that the payment-deletion reversal needs are gathered through the
//! [`StatusHistory`] capability before the event is built.

mod engine;
mod error;
mod history;
mod state;

pub use engine::{
    status_after_payment_deleted, status_after_recover, IgnoredTransition, InvoiceStatusEngine,
    PaymentAmounts, PaymentFacts, StatusEvent, StatusFields, Transition, TransitionOutcome,
};
pub use error::StatusError;
pub use history::{payment_deletion_event, StatusHistory};
pub use state::InvoiceStatus;
