//! Domain models for the invoicing crate.

mod audit;
mod client;
mod invoice;
mod line_item;
mod listing;
mod payment;
mod tax;

pub use audit::{DisputeNote, DisputeNoteKind, NewDisputeNote, StatusVersion};
pub use client::{Client, CreateClient, ListClientsFilter, UpdateClient};
pub use invoice::{
    CreateInvoice, Discount, Invoice, InvoiceDetail, ListInvoicesFilter, UpdateInvoice,
};
pub use line_item::{CreateLineItem, LineItem};
pub use listing::{Page, RecordView};
pub use payment::{
    CreatePayment, ListPaymentsFilter, Payment, PaymentType, UpdatePayment,
};
pub use tax::{CreateTax, Tax};
