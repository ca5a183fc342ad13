//! Service order contracts

mod base;
mod create;
mod update;

pub use base::OrderBaseContract;
pub use create::CreateOrderContract;
pub use update::UpdateOrderContract;
