//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts.
//! - Isolate SQLite query details from service orchestration.
//! - Carry the shared, user-displayable error taxonomy.
//!
//! # Invariants
//! - Write paths validate model invariants before SQL mutations.
//! - Read paths reject invalid persisted state instead of masking it.
//! - The at-most-one-occupant-per-(slot, floor) rule is enforced here, not
//!   by callers.

use crate::db::DbError;
use crate::model::occupant::{Floor, OccupantValidationError};
use crate::model::slot::{SlotAddress, SlotAddressError};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod history_repo;
pub mod occupant_repo;
pub mod slot_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Shared error taxonomy for persistence and engine operations.
///
/// Every variant renders as a message fit for direct user display.
#[derive(Debug)]
pub enum RepoError {
    /// Occupant attributes failed validation.
    Validation(OccupantValidationError),
    /// Text could not be read as a grid address.
    Address(SlotAddressError),
    /// A request mixed or omitted mutually exclusive filters.
    BadQuery(&'static str),
    /// The addressed slot is not part of the initialized grid.
    SlotUnknown(SlotAddress),
    /// The referenced occupant or record is gone.
    NotFound(String),
    /// The target (slot, floor) already holds a live occupant.
    FloorOccupied { slot: SlotAddress, floor: Floor },
    /// Undo requested with no active action in the log.
    NothingToUndo,
    /// Redo requested with no undone action in the log.
    NothingToRedo,
    Db(DbError),
    /// Persisted state violates the engine's own invariants.
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Address(err) => write!(f, "{err}"),
            Self::BadQuery(message) => write!(f, "{message}"),
            Self::SlotUnknown(slot) => write!(f, "slot {slot} does not exist"),
            Self::NotFound(what) => write!(f, "{what} not found"),
            Self::FloorOccupied { slot, floor } => {
                write!(f, "slot {slot} floor {floor} is already occupied")
            }
            Self::NothingToUndo => write!(f, "nothing to undo"),
            Self::NothingToRedo => write!(f, "nothing to redo"),
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Address(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<OccupantValidationError> for RepoError {
    fn from(value: OccupantValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<SlotAddressError> for RepoError {
    fn from(value: SlotAddressError) -> Self {
        Self::Address(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}
