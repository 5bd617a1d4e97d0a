//! Mutation engine over the occupancy store.
//!
//! # Responsibility
//! - Expose place / remove / relocate / find over occupants.
//! - Pair every successful mutation with exactly one action-log append,
//!   inside one transaction.
//!
//! # Invariants
//! - Preconditions (slot exists, target floor free, source occupied) are
//!   validated before any write; failures roll the transaction back.
//! - Clearing a slot logs one delete record per occupant so each removal is
//!   independently undoable.

use crate::model::action::ActionDetail;
use crate::model::occupant::{Floor, Occupant, OccupantDetails};
use crate::model::slot::SlotAddress;
use crate::repo::history_repo::{HistoryRepository, SqliteHistoryRepository};
use crate::repo::occupant_repo::{OccupantRepository, SqliteOccupantRepository, StockStats};
use crate::repo::slot_repo::{SlotRepository, SqliteSlotRepository};
use crate::repo::{RepoError, RepoResult};
use log::info;
use rusqlite::Connection;

/// Create-or-update request for one (slot, floor).
#[derive(Debug, Clone, PartialEq)]
pub struct PlaceRequest {
    pub slot: SlotAddress,
    pub floor: Floor,
    pub details: OccupantDetails,
}

/// Lookup filter: exactly one of `slot` / `order_num` must be set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindQuery {
    pub slot: Option<SlotAddress>,
    pub order_num: Option<String>,
}

/// Use-case service applying occupant mutations.
pub struct OccupancyService<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> OccupancyService<'conn> {
    pub fn new(conn: &'conn mut Connection) -> Self {
        Self { conn }
    }

    /// Places an order at (slot, floor) with create-or-update semantics.
    ///
    /// An occupied floor is overwritten (logged as an update); a free floor
    /// gets a new occupant (logged as a create).
    pub fn place(&mut self, request: &PlaceRequest) -> RepoResult<Occupant> {
        request.details.validate()?;

        let tx = self.conn.transaction()?;
        let placed = {
            let slots = SqliteSlotRepository::new(&tx);
            let occupants = SqliteOccupantRepository::new(&tx);
            let history = SqliteHistoryRepository::new(&tx);

            if slots.kind_of(&request.slot)?.is_none() {
                return Err(RepoError::SlotUnknown(request.slot.clone()));
            }

            match occupants.get(&request.slot, request.floor)? {
                Some(existing) => {
                    occupants.update_details(existing.id, &request.details)?;
                    let updated = Occupant {
                        id: existing.id,
                        slot: existing.slot.clone(),
                        floor: existing.floor,
                        details: request.details.clone(),
                    };
                    history.append(&ActionDetail::Update {
                        before: (&existing).into(),
                        after: (&updated).into(),
                    })?;
                    updated
                }
                None => {
                    let created =
                        occupants.insert(&request.slot, request.floor, &request.details)?;
                    history.append(&ActionDetail::Create {
                        after: (&created).into(),
                    })?;
                    created
                }
            }
        };
        tx.commit()?;

        info!(
            "event=place module=occupancy status=ok slot={} floor={} order={}",
            placed.slot, placed.floor, placed.details.order_num
        );
        Ok(placed)
    }

    /// Removes occupants at a slot; `floor = None` clears both floors.
    ///
    /// Returns the number of removed occupants. An already-empty slot is a
    /// successful zero-count no-op, and each removal gets its own log
    /// record.
    pub fn remove(&mut self, slot: &SlotAddress, floor: Option<Floor>) -> RepoResult<usize> {
        let tx = self.conn.transaction()?;
        let removed = {
            let occupants = SqliteOccupantRepository::new(&tx);
            let history = SqliteHistoryRepository::new(&tx);

            let victims = match floor {
                Some(floor) => occupants.get(slot, floor)?.into_iter().collect(),
                None => occupants.list_in_slot(slot)?,
            };

            for victim in &victims {
                occupants.delete(victim.id)?;
                history.append(&ActionDetail::Delete {
                    before: victim.into(),
                })?;
            }
            victims.len()
        };
        tx.commit()?;

        info!("event=remove module=occupancy status=ok slot={slot} removed={removed}");
        Ok(removed)
    }

    /// Moves the occupant at the source placement to the target placement.
    pub fn relocate(
        &mut self,
        source_slot: &SlotAddress,
        source_floor: Floor,
        target_slot: &SlotAddress,
        target_floor: Floor,
    ) -> RepoResult<Occupant> {
        let tx = self.conn.transaction()?;
        let moved = {
            let slots = SqliteSlotRepository::new(&tx);
            let occupants = SqliteOccupantRepository::new(&tx);
            let history = SqliteHistoryRepository::new(&tx);

            if slots.kind_of(target_slot)?.is_none() {
                return Err(RepoError::SlotUnknown(target_slot.clone()));
            }
            if occupants.get(target_slot, target_floor)?.is_some() {
                return Err(RepoError::FloorOccupied {
                    slot: target_slot.clone(),
                    floor: target_floor,
                });
            }

            let source = occupants.get(source_slot, source_floor)?.ok_or_else(|| {
                RepoError::NotFound(format!("occupant at {source_slot} floor {source_floor}"))
            })?;

            occupants.relocate(source.id, target_slot, target_floor)?;
            let moved = Occupant {
                id: source.id,
                slot: target_slot.clone(),
                floor: target_floor,
                details: source.details.clone(),
            };
            history.append(&ActionDetail::Move {
                before: (&source).into(),
                after: (&moved).into(),
            })?;
            moved
        };
        tx.commit()?;

        info!(
            "event=move module=occupancy status=ok from={source_slot}/{source_floor} to={}/{}",
            moved.slot, moved.floor
        );
        Ok(moved)
    }

    /// Finds occupants by slot or by order number (exactly one filter).
    pub fn find(&self, query: &FindQuery) -> RepoResult<Vec<Occupant>> {
        let occupants = SqliteOccupantRepository::new(&*self.conn);
        match (&query.slot, &query.order_num) {
            (Some(slot), None) => occupants.list_in_slot(slot),
            (None, Some(order_num)) => occupants.find_by_order(order_num),
            _ => Err(RepoError::BadQuery(
                "specify exactly one of slot or order number",
            )),
        }
    }

    /// Floor-1-first placement probe: the lowest free floor of a slot, or
    /// `None` when the slot is full. Placement policy on top of this (e.g.
    /// confirm-gated rebalancing when a lower floor frees up) belongs to
    /// callers.
    pub fn first_free_floor(&self, slot: &SlotAddress) -> RepoResult<Option<Floor>> {
        let conn: &Connection = &*self.conn;
        if SqliteSlotRepository::new(conn).kind_of(slot)?.is_none() {
            return Err(RepoError::SlotUnknown(slot.clone()));
        }
        let occupants = SqliteOccupantRepository::new(conn);
        for floor in [Floor::One, Floor::Two] {
            if occupants.get(slot, floor)?.is_none() {
                return Ok(Some(floor));
            }
        }
        Ok(None)
    }

    /// Warehouse-wide stock summary.
    pub fn stats(&self) -> RepoResult<StockStats> {
        SqliteOccupantRepository::new(&*self.conn).stats()
    }
}
