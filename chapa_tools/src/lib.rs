//! A thin client for the Chapa payment processor REST API.
//!
//! The client covers the three calls the payment gateway makes against the processor:
//! initialising a checkout session, verifying the status of a transaction, and requesting a
//! refund. All calls run with a bounded timeout and never touch gateway state; mapping processor
//! responses onto stored transactions is the reconciliation engine's job.

mod api;
mod config;
mod data_objects;
mod error;
pub mod helpers;

pub use api::ChapaApi;
pub use config::ChapaConfig;
pub use data_objects::{ChapaConfirmation, CheckoutSession, InitializeRequest};
pub use error::ChapaApiError;
