//! Core domain logic for the warehouse stowage tracker.
//! This crate is the single source of truth for occupancy and history
//! invariants; web or bot frontends are thin adapters over these services.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use logging::{default_log_level, init_logging};
pub use model::action::{
    ActionDetail, ActionId, ActionKind, ActionRecord, OccupantSnapshot,
};
pub use model::occupant::{
    Floor, Occupant, OccupantDetails, OccupantId, OccupantValidationError,
};
pub use model::slot::{GridSchema, Slot, SlotAddress, SlotAddressError, SlotKind};
pub use repo::history_repo::{HistoryQuery, HistoryRepository, SqliteHistoryRepository};
pub use repo::occupant_repo::{OccupantRepository, SqliteOccupantRepository, StockStats};
pub use repo::slot_repo::{SlotRepository, SqliteSlotRepository};
pub use repo::{RepoError, RepoResult};
pub use service::grid_service::{GridService, SlotStatus};
pub use service::history_service::HistoryService;
pub use service::occupancy_service::{FindQuery, OccupancyService, PlaceRequest};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
