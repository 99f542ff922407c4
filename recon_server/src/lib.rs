//! # HPG server
//!
//! This crate hosts the HTTP surface of the Homa Payment Gateway. It is responsible for:
//! * Accepting payment initialization requests and handing the caller a hosted checkout URL.
//! * Listening for incoming webhook notifications from the Chapa processor.
//! * Serving on-demand verification polls that reconcile against the processor.
//! * Processing refund requests.
//!
//! All state transitions are delegated to the reconciliation engine; the server never writes to
//! the database directly.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more
//! information.
//!
//! ## Routes
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/payments/initialize`: Create a transaction and open a checkout session.
//! * `/payments/verify/{tx_ref}`: Poll the processor and reconcile the result.
//! * `/payments/{id}/refund`: Refund a settled transaction.
//! * `/webhook/chapa`: The webhook route for receiving confirmation events from Chapa.

pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod helpers;
pub mod integrations;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod sweep_worker;

#[cfg(test)]
mod endpoint_tests;
