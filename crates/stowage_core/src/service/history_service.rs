//! Undo/redo engine and history browsing.
//!
//! # Responsibility
//! - Replay inverse or forward effects of logged actions against the
//!   occupancy store, using the action log as the sole source of truth.
//!
//! # Invariants
//! - Compensating writes bypass action logging; undo/redo never append.
//! - The `is_undone` flag flips only after the compensating mutation fully
//!   succeeds, inside the same transaction.
//! - Snapshot ids may be stale after a delete/undo cycle recreated the
//!   occupant; replays re-resolve by placement (and order number) instead of
//!   trusting the stored id.

use crate::model::action::{ActionDetail, ActionRecord};
use crate::model::occupant::{Floor, Occupant, OccupantId};
use crate::model::slot::SlotAddress;
use crate::repo::history_repo::{HistoryQuery, HistoryRepository, SqliteHistoryRepository};
use crate::repo::occupant_repo::{OccupantRepository, SqliteOccupantRepository};
use crate::repo::{RepoError, RepoResult};
use log::{info, warn};
use rusqlite::Connection;

/// Use-case service over the action log.
pub struct HistoryService<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> HistoryService<'conn> {
    pub fn new(conn: &'conn mut Connection) -> Self {
        Self { conn }
    }

    /// Browses logged actions, newest first.
    pub fn list(&self, query: &HistoryQuery) -> RepoResult<Vec<ActionRecord>> {
        SqliteHistoryRepository::new(&*self.conn).list(query)
    }

    /// Reverses the most recently applied active action.
    pub fn undo(&mut self) -> RepoResult<ActionRecord> {
        let tx = self.conn.transaction()?;
        let mut record = {
            let history = SqliteHistoryRepository::new(&tx);
            let occupants = SqliteOccupantRepository::new(&tx);

            let record = history.most_recent_active()?.ok_or(RepoError::NothingToUndo)?;
            apply_inverse(&occupants, &record.detail)?;
            history.set_undone(record.id, true)?;
            record
        };
        tx.commit()?;
        record.undone = true;

        info!(
            "event=undo module=history status=ok action_id={} kind={}",
            record.id,
            record.kind()
        );
        Ok(record)
    }

    /// Reapplies the oldest undone action.
    pub fn redo(&mut self) -> RepoResult<ActionRecord> {
        let tx = self.conn.transaction()?;
        let mut record = {
            let history = SqliteHistoryRepository::new(&tx);
            let occupants = SqliteOccupantRepository::new(&tx);

            let record = history.earliest_undone()?.ok_or(RepoError::NothingToRedo)?;
            apply_forward(&occupants, &record.detail)?;
            history.set_undone(record.id, false)?;
            record
        };
        tx.commit()?;
        record.undone = false;

        info!(
            "event=redo module=history status=ok action_id={} kind={}",
            record.id,
            record.kind()
        );
        Ok(record)
    }
}

fn apply_inverse<R: OccupantRepository>(occupants: &R, detail: &ActionDetail) -> RepoResult<()> {
    match detail {
        ActionDetail::Create { after } => {
            if !occupants.delete(after.id)? {
                // The id is stale when an undone delete recreated this
                // occupant; fall back to its placement and order number.
                match occupants.get(&after.slot, after.floor)? {
                    Some(current)
                        if current.details.order_num == after.details.order_num =>
                    {
                        occupants.delete(current.id)?;
                    }
                    // Tolerated no-op: the occupant was already removed by
                    // hand.
                    _ => warn!(
                        "event=undo module=history status=noop reason=create_target_gone slot={} floor={}",
                        after.slot, after.floor
                    ),
                }
            }
        }
        ActionDetail::Delete { before } => {
            ensure_floor_free(occupants, &before.slot, before.floor)?;
            // Recreation assigns a fresh surrogate id; the snapshot id is
            // retired for good.
            occupants.insert(&before.slot, before.floor, &before.details)?;
        }
        ActionDetail::Update { before, .. } => {
            let current = resolve_occupant(occupants, before.id, &before.slot, before.floor)?
                .ok_or_else(|| {
                    RepoError::NotFound(format!(
                        "occupant at {} floor {}",
                        before.slot, before.floor
                    ))
                })?;
            occupants.update_details(current.id, &before.details)?;
        }
        ActionDetail::Move { before, after } => {
            let current = resolve_occupant(occupants, after.id, &after.slot, after.floor)?
                .ok_or_else(|| {
                    RepoError::NotFound(format!("occupant at {} floor {}", after.slot, after.floor))
                })?;
            ensure_floor_free(occupants, &before.slot, before.floor)?;
            occupants.relocate(current.id, &before.slot, before.floor)?;
        }
    }
    Ok(())
}

fn apply_forward<R: OccupantRepository>(occupants: &R, detail: &ActionDetail) -> RepoResult<()> {
    match detail {
        ActionDetail::Create { after } => {
            ensure_floor_free(occupants, &after.slot, after.floor)?;
            occupants.insert(&after.slot, after.floor, &after.details)?;
        }
        ActionDetail::Delete { before } => {
            // The undo of this delete recreated the occupant under a new id,
            // so resolve by placement and order number instead.
            match occupants.get(&before.slot, before.floor)? {
                Some(current) if current.details.order_num == before.details.order_num => {
                    occupants.delete(current.id)?;
                }
                _ => {
                    warn!(
                        "event=redo module=history status=noop reason=delete_target_gone slot={} floor={}",
                        before.slot, before.floor
                    );
                }
            }
        }
        ActionDetail::Update { after, .. } => {
            let current = resolve_occupant(occupants, after.id, &after.slot, after.floor)?
                .ok_or_else(|| {
                    RepoError::NotFound(format!("occupant at {} floor {}", after.slot, after.floor))
                })?;
            occupants.update_details(current.id, &after.details)?;
        }
        ActionDetail::Move { before, after } => {
            let current = resolve_occupant(occupants, after.id, &before.slot, before.floor)?
                .ok_or_else(|| {
                    RepoError::NotFound(format!(
                        "occupant at {} floor {}",
                        before.slot, before.floor
                    ))
                })?;
            ensure_floor_free(occupants, &after.slot, after.floor)?;
            occupants.relocate(current.id, &after.slot, after.floor)?;
        }
    }
    Ok(())
}

/// Looks an occupant up by snapshot id, falling back to the given placement
/// when the id went stale.
fn resolve_occupant<R: OccupantRepository>(
    occupants: &R,
    id: OccupantId,
    slot: &SlotAddress,
    floor: Floor,
) -> RepoResult<Option<Occupant>> {
    if let Some(found) = occupants.get_by_id(id)? {
        return Ok(Some(found));
    }
    occupants.get(slot, floor)
}

fn ensure_floor_free<R: OccupantRepository>(
    occupants: &R,
    slot: &SlotAddress,
    floor: Floor,
) -> RepoResult<()> {
    if occupants.get(slot, floor)?.is_some() {
        return Err(RepoError::FloorOccupied {
            slot: slot.clone(),
            floor,
        });
    }
    Ok(())
}
