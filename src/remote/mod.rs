//! Remote unit execution
//!
//! Instead of running unit bodies on a local worker pool, each unit can be
//! sent to a test endpoint that lives inside another process (for example a
//! deployed application server) and report back pass or failure.

mod client;
mod runner;

pub use client::{
    FailurePayload, HttpDispatcher, RemoteDispatcher, RemoteError, RemoteOutcome,
    SUCCESS_SENTINEL,
};
pub use runner::RemoteClassRunner;
