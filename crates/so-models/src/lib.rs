//! # so-models
//!
//! Domain models for the service-order backend.
//!
//! Request-side payloads (`New*`, entries, [`OrderFields`]) live next to the
//! records they produce.

pub use so_core::traits::Id;

pub mod aggregate;
pub mod catalog;
pub mod collection;
pub mod links;
pub mod observation;
pub mod order;
pub mod procedure;
pub mod request;

pub use aggregate::{
    EquipmentUsage, MaterialUsage, ObservationView, OrderAggregate, PpeUsage,
    ScheduledProcedure, TeamAssignment, TeamSummary,
};
pub use catalog::{
    Equipment, Material, NewEquipment, NewMaterial, NewPpeItem, NewTeamMember, PpeItem,
    UnitOfMeasure,
};
pub use collection::Collection;
pub use links::{EquipmentEntry, MaterialEntry, PpeEntry, ProcedureEntry, TeamEntry};
pub use observation::{NewObservation, Observation};
pub use order::{parse_order_date, Order, OrderFields};
pub use procedure::{
    BomItem, NewProcedure, Procedure, ProcedureWithMaterials,
};
pub use request::{
    parse_id, Channel, DeliveryRequest, NewOrder, OrderAssociations, OrderChanges,
    RowPatch,
};
