//! Client for the Easee EV-charger cloud API.
//!
//! The crate covers three concerns for one configured account:
//!
//! - keeping a valid bearer token around ([`auth::TokenManager`]), including
//!   proactive renewal, retry/backoff and a terminal give-up state;
//! - dispatching named REST commands ([`client::EaseeClient`]);
//! - subscribing to the push telemetry stream and decoding its numbered
//!   observations into typed values ([`stream::StreamSubscriber`],
//!   [`observations`]).
//!
//! The pieces share one [`auth::TokenManager`] handle, so concurrent REST
//! and streaming use never race each other into duplicate logins.

pub mod auth;
pub mod client;
pub mod config;
pub mod credentials;
pub mod error;
pub mod observations;
pub mod stream;

pub use error::{EaseeError, Result};
