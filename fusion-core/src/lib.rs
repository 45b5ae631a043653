//! Fusion Core - Entity Types
//!
//! Plain records, identity aliases, alert priorities and error types shared by
//! every other crate of the console data layer. No I/O lives here.

mod entities;
mod enums;
mod error;
mod identity;
pub mod maintenance;

pub use entities::*;
pub use enums::*;
pub use error::*;
pub use identity::*;
pub use maintenance::{needs_maintenance_soon, MaintenanceType, MAINTENANCE_DAYS, MAINTENANCE_HOURS};
