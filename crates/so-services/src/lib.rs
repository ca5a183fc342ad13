//! # so-services
//!
//! Business logic for the service-order backend.
//!
//! Services take decoded requests, run them through their contract and then
//! talk to the [`RecordStore`](so_db::RecordStore). Writes that span several
//! collections (orders with their associations, procedures with their bill of
//! materials) are sequenced here, including the compensating deletes when a
//! load-bearing step fails.

pub mod associations;
pub mod catalog;
pub mod error;
pub mod observations;
pub mod orders;
pub mod procedures;

#[cfg(test)]
pub(crate) mod testing;

pub use associations::{AssociationGroup, AssociationWriter};
pub use catalog::CatalogService;
pub use error::{ServiceError, ServiceResult};
pub use observations::ObservationService;
pub use orders::{CreatedOrder, OrderComposer};
pub use procedures::ProcedureService;
