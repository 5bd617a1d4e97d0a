//! Grid initialization and read-out.
//!
//! # Responsibility
//! - Materialize a `GridSchema` into the slot registry, idempotently.
//! - Produce the per-slot occupancy snapshot used for rendering.
//!
//! # Invariants
//! - Re-running initialization redefines slot kinds in place; it never
//!   deletes slots or occupant rows, so a schema revision is safe on a
//!   populated warehouse.

use crate::model::occupant::{Floor, Occupant};
use crate::model::slot::{GridSchema, Slot, SlotAddress, SlotKind};
use crate::repo::occupant_repo::{OccupantRepository, SqliteOccupantRepository};
use crate::repo::slot_repo::{SlotRepository, SqliteSlotRepository};
use crate::repo::RepoResult;
use log::info;
use rusqlite::Connection;
use std::collections::HashMap;

/// One slot with its occupancy state on both floors.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotStatus {
    pub slot: SlotAddress,
    pub kind: SlotKind,
    pub floor1: Option<Occupant>,
    pub floor2: Option<Occupant>,
}

impl SlotStatus {
    pub fn floor1_busy(&self) -> bool {
        self.floor1.is_some()
    }

    pub fn floor2_busy(&self) -> bool {
        self.floor2.is_some()
    }
}

/// Use-case service for the slot registry.
pub struct GridService<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> GridService<'conn> {
    pub fn new(conn: &'conn mut Connection) -> Self {
        Self { conn }
    }

    /// Upserts every address the schema defines. Returns the address count.
    ///
    /// Safe to call at startup and to apply layout revisions; existing slots
    /// keep their occupants and only have `kind` redefined.
    pub fn initialize(&mut self, schema: &GridSchema) -> RepoResult<usize> {
        let tx = self.conn.transaction()?;
        let count = {
            let slots = SqliteSlotRepository::new(&tx);
            let mut upserted = 0;
            for row in schema.rows.clone() {
                for (index, column) in schema.columns.chars().enumerate() {
                    let address = SlotAddress::new(&column.to_string(), row)?;
                    slots.upsert(&address, schema.kind_for(index, row))?;
                    upserted += 1;
                }
            }
            upserted
        };
        tx.commit()?;

        info!("event=grid_init module=grid status=ok slots={count}");
        Ok(count)
    }

    /// Full grid ordered by address.
    pub fn list_slots(&self) -> RepoResult<Vec<Slot>> {
        SqliteSlotRepository::new(&*self.conn).list()
    }

    /// Grid with occupancy data for both floors of every slot.
    pub fn snapshot(&self) -> RepoResult<Vec<SlotStatus>> {
        let conn: &Connection = &*self.conn;
        let slots = SqliteSlotRepository::new(conn).list()?;
        let occupants = SqliteOccupantRepository::new(conn).list_all()?;

        let mut by_placement: HashMap<(SlotAddress, Floor), Occupant> = occupants
            .into_iter()
            .map(|occupant| ((occupant.slot.clone(), occupant.floor), occupant))
            .collect();

        Ok(slots
            .into_iter()
            .map(|slot| {
                let floor1 = by_placement.remove(&(slot.address.clone(), Floor::One));
                let floor2 = by_placement.remove(&(slot.address.clone(), Floor::Two));
                SlotStatus {
                    slot: slot.address,
                    kind: slot.kind,
                    floor1,
                    floor2,
                }
            })
            .collect())
    }
}
