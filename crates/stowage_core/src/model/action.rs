//! Logged mutation records.
//!
//! # Responsibility
//! - Define the append-only action record and its kind-tagged payloads.
//! - Keep enough value-copied state in each record to reverse or reapply it.
//!
//! # Invariants
//! - Records are immutable once appended, except the `undone` flag.
//! - `id` is assigned in append order and never reused; it is the only
//!   ordering undo/redo decisions rely on.
//! - Snapshots stay valid after the occupant they describe is deleted or
//!   recreated under a new id; consumers must treat the stored id as a hint,
//!   not a guarantee.

use crate::model::occupant::{Floor, Occupant, OccupantDetails, OccupantId};
use crate::model::slot::SlotAddress;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Monotonic sequence number of a logged action.
pub type ActionId = i64;

/// Discriminant for logged mutations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Create,
    Update,
    Delete,
    Move,
}

impl ActionKind {
    pub fn as_db(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Move => "move",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "create" => Some(Self::Create),
            "update" => Some(Self::Update),
            "delete" => Some(Self::Delete),
            "move" => Some(Self::Move),
            _ => None,
        }
    }
}

impl Display for ActionKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_db())
    }
}

/// Value copy of a full occupant, embedded in action payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OccupantSnapshot {
    pub id: OccupantId,
    pub slot: SlotAddress,
    pub floor: Floor,
    #[serde(flatten)]
    pub details: OccupantDetails,
}

impl From<&Occupant> for OccupantSnapshot {
    fn from(occupant: &Occupant) -> Self {
        Self {
            id: occupant.id,
            slot: occupant.slot.clone(),
            floor: occupant.floor,
            details: occupant.details.clone(),
        }
    }
}

/// Kind-specific payload of one logged mutation.
///
/// Each variant carries exactly the snapshots its inverse and forward
/// replays need; there is no untyped before/after blob.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionDetail {
    Create { after: OccupantSnapshot },
    Update { before: OccupantSnapshot, after: OccupantSnapshot },
    Delete { before: OccupantSnapshot },
    Move { before: OccupantSnapshot, after: OccupantSnapshot },
}

impl ActionDetail {
    pub fn kind(&self) -> ActionKind {
        match self {
            Self::Create { .. } => ActionKind::Create,
            Self::Update { .. } => ActionKind::Update,
            Self::Delete { .. } => ActionKind::Delete,
            Self::Move { .. } => ActionKind::Move,
        }
    }

    pub fn before(&self) -> Option<&OccupantSnapshot> {
        match self {
            Self::Create { .. } => None,
            Self::Update { before, .. } | Self::Delete { before } | Self::Move { before, .. } => {
                Some(before)
            }
        }
    }

    pub fn after(&self) -> Option<&OccupantSnapshot> {
        match self {
            Self::Delete { .. } => None,
            Self::Create { after } | Self::Update { after, .. } | Self::Move { after, .. } => {
                Some(after)
            }
        }
    }

    /// The (slot, floor) a record is filed under.
    ///
    /// Moves are filed under their source placement, matching how history is
    /// browsed per slot.
    pub fn logged_placement(&self) -> (&SlotAddress, Floor) {
        match self {
            Self::Create { after } => (&after.slot, after.floor),
            Self::Update { before, .. } | Self::Delete { before } | Self::Move { before, .. } => {
                (&before.slot, before.floor)
            }
        }
    }
}

/// One appended entry of the action log.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionRecord {
    pub id: ActionId,
    pub slot: SlotAddress,
    /// Raw persisted floor column. 1 or 2 for engine-written records; 0 is
    /// admitted when reading legacy "both floors" rows.
    pub floor_raw: u8,
    pub detail: ActionDetail,
    /// Unix epoch milliseconds at append time.
    pub recorded_at_ms: i64,
    pub undone: bool,
}

impl ActionRecord {
    pub fn kind(&self) -> ActionKind {
        self.detail.kind()
    }
}
