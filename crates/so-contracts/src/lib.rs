//! # so-contracts
//!
//! Contracts validate decoded requests before any write reaches the store.
//! Each returns every problem it finds as [`so_core::ValidationErrors`].

pub mod base;
pub mod catalog;
pub mod observations;
pub mod orders;
pub mod procedures;

pub use base::*;
pub use catalog::{CreateRowContract, PatchRowContract};
pub use observations::ObservationContract;
pub use orders::{CreateOrderContract, UpdateOrderContract};
pub use procedures::ProcedureContract;
