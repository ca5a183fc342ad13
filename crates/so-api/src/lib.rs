//! # so-api
//!
//! JSON HTTP API for the service-order backend.
//!
//! Every response body is an [`Envelope`]: `{success, data?, error?, message?}`.
//! Handlers decode requests, call the services held in [`AppState`] and map
//! failures through [`ApiError`].

pub mod envelope;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod routes;

#[cfg(test)]
pub(crate) mod testing;

pub use envelope::Envelope;
pub use error::{ApiError, ApiResult};
pub use extractors::AppState;
pub use routes::router;
