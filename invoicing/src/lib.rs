//! Invoicing - clients, invoices, payments, and the invoice status engine.

pub mod config;
pub mod models;
pub mod reports;
pub mod services;
pub mod startup;
pub mod status;
pub mod totals;
