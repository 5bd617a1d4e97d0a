//! Occupancy store persistence.
//!
//! # Responsibility
//! - Provide CRUD over occupant rows keyed by surrogate id or (slot, floor).
//! - Enforce the at-most-one-occupant-per-(slot, floor) invariant.
//!
//! # Invariants
//! - Write paths validate `OccupantDetails` before SQL mutations.
//! - The UNIQUE(slot_id, floor) constraint is the last line of defense for
//!   concurrent placements; violations surface as `FloorOccupied`, never as
//!   raw SQL errors.

use crate::model::occupant::{Floor, Occupant, OccupantDetails, OccupantId};
use crate::model::slot::SlotAddress;
use crate::repo::{RepoError, RepoResult};
use rusqlite::{params, Connection, Row};
use std::str::FromStr;

const OCCUPANT_SELECT_SQL: &str = "SELECT
    id,
    slot_id,
    floor,
    order_num,
    rolls,
    meterage,
    density,
    roll_weight,
    comment
FROM occupants";

/// Aggregate stock figures over all occupants.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StockStats {
    pub occupants: u64,
    pub total_roll_weight: f64,
}

/// Repository contract for the occupancy store.
pub trait OccupantRepository {
    fn get(&self, slot: &SlotAddress, floor: Floor) -> RepoResult<Option<Occupant>>;
    fn get_by_id(&self, id: OccupantId) -> RepoResult<Option<Occupant>>;
    fn find_by_order(&self, order_num: &str) -> RepoResult<Vec<Occupant>>;
    fn list_in_slot(&self, slot: &SlotAddress) -> RepoResult<Vec<Occupant>>;
    fn list_all(&self) -> RepoResult<Vec<Occupant>>;
    fn insert(
        &self,
        slot: &SlotAddress,
        floor: Floor,
        details: &OccupantDetails,
    ) -> RepoResult<Occupant>;
    fn update_details(&self, id: OccupantId, details: &OccupantDetails) -> RepoResult<()>;
    fn relocate(&self, id: OccupantId, slot: &SlotAddress, floor: Floor) -> RepoResult<()>;
    /// Removes one occupant. Returns `false` when the id no longer exists;
    /// absence is not an error at this layer.
    fn delete(&self, id: OccupantId) -> RepoResult<bool>;
    fn stats(&self) -> RepoResult<StockStats>;
}

/// SQLite-backed occupancy store.
pub struct SqliteOccupantRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteOccupantRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn query_one(&self, sql: &str, binds: &[&dyn rusqlite::ToSql]) -> RepoResult<Option<Occupant>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(binds)?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_occupant_row(row)?));
        }
        Ok(None)
    }

    fn query_many(&self, sql: &str, binds: &[&dyn rusqlite::ToSql]) -> RepoResult<Vec<Occupant>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(binds)?;
        let mut occupants = Vec::new();
        while let Some(row) = rows.next()? {
            occupants.push(parse_occupant_row(row)?);
        }
        Ok(occupants)
    }
}

impl OccupantRepository for SqliteOccupantRepository<'_> {
    fn get(&self, slot: &SlotAddress, floor: Floor) -> RepoResult<Option<Occupant>> {
        self.query_one(
            &format!("{OCCUPANT_SELECT_SQL} WHERE slot_id = ?1 AND floor = ?2;"),
            &[&slot.to_string(), &floor.as_db()],
        )
    }

    fn get_by_id(&self, id: OccupantId) -> RepoResult<Option<Occupant>> {
        self.query_one(&format!("{OCCUPANT_SELECT_SQL} WHERE id = ?1;"), &[&id])
    }

    fn find_by_order(&self, order_num: &str) -> RepoResult<Vec<Occupant>> {
        self.query_many(
            &format!("{OCCUPANT_SELECT_SQL} WHERE order_num = ?1 ORDER BY slot_id, floor;"),
            &[&order_num],
        )
    }

    fn list_in_slot(&self, slot: &SlotAddress) -> RepoResult<Vec<Occupant>> {
        self.query_many(
            &format!("{OCCUPANT_SELECT_SQL} WHERE slot_id = ?1 ORDER BY floor;"),
            &[&slot.to_string()],
        )
    }

    fn list_all(&self) -> RepoResult<Vec<Occupant>> {
        self.query_many(&format!("{OCCUPANT_SELECT_SQL};"), &[])
    }

    fn insert(
        &self,
        slot: &SlotAddress,
        floor: Floor,
        details: &OccupantDetails,
    ) -> RepoResult<Occupant> {
        details.validate()?;

        self.conn
            .execute(
                "INSERT INTO occupants (
                    slot_id,
                    floor,
                    order_num,
                    rolls,
                    meterage,
                    density,
                    roll_weight,
                    comment
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
                params![
                    slot.to_string(),
                    floor.as_db(),
                    details.order_num.as_str(),
                    details.rolls,
                    details.meterage,
                    details.density.as_deref(),
                    details.roll_weight,
                    details.comment.as_deref(),
                ],
            )
            .map_err(|err| map_placement_error(err, slot, floor))?;

        Ok(Occupant {
            id: self.conn.last_insert_rowid(),
            slot: slot.clone(),
            floor,
            details: details.clone(),
        })
    }

    fn update_details(&self, id: OccupantId, details: &OccupantDetails) -> RepoResult<()> {
        details.validate()?;

        let changed = self.conn.execute(
            "UPDATE occupants
             SET
                order_num = ?1,
                rolls = ?2,
                meterage = ?3,
                density = ?4,
                roll_weight = ?5,
                comment = ?6,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?7;",
            params![
                details.order_num.as_str(),
                details.rolls,
                details.meterage,
                details.density.as_deref(),
                details.roll_weight,
                details.comment.as_deref(),
                id,
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(format!("occupant {id}")));
        }
        Ok(())
    }

    fn relocate(&self, id: OccupantId, slot: &SlotAddress, floor: Floor) -> RepoResult<()> {
        let changed = self
            .conn
            .execute(
                "UPDATE occupants
                 SET
                    slot_id = ?1,
                    floor = ?2,
                    updated_at = (strftime('%s', 'now') * 1000)
                 WHERE id = ?3;",
                params![slot.to_string(), floor.as_db(), id],
            )
            .map_err(|err| map_placement_error(err, slot, floor))?;

        if changed == 0 {
            return Err(RepoError::NotFound(format!("occupant {id}")));
        }
        Ok(())
    }

    fn delete(&self, id: OccupantId) -> RepoResult<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM occupants WHERE id = ?1;", params![id])?;
        Ok(changed > 0)
    }

    fn stats(&self) -> RepoResult<StockStats> {
        let (occupants, total_roll_weight) = self.conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(roll_weight), 0.0) FROM occupants;",
            [],
            |row| Ok((row.get::<_, u64>(0)?, row.get::<_, f64>(1)?)),
        )?;
        Ok(StockStats {
            occupants,
            total_roll_weight,
        })
    }
}

fn parse_occupant_row(row: &Row<'_>) -> RepoResult<Occupant> {
    let slot_text: String = row.get("slot_id")?;
    let slot = SlotAddress::from_str(&slot_text).map_err(|_| {
        RepoError::InvalidData(format!(
            "invalid slot address `{slot_text}` in occupants.slot_id"
        ))
    })?;

    let floor_value: i64 = row.get("floor")?;
    let floor = Floor::from_db(floor_value).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid floor `{floor_value}` in occupants.floor"))
    })?;

    let details = OccupantDetails {
        order_num: row.get("order_num")?,
        rolls: row.get("rolls")?,
        meterage: row.get("meterage")?,
        density: row.get("density")?,
        roll_weight: row.get("roll_weight")?,
        comment: row.get("comment")?,
    };
    details.validate().map_err(|err| {
        RepoError::InvalidData(format!("occupant row failed validation: {err}"))
    })?;

    Ok(Occupant {
        id: row.get("id")?,
        slot,
        floor,
        details,
    })
}

fn map_placement_error(err: rusqlite::Error, slot: &SlotAddress, floor: Floor) -> RepoError {
    if let rusqlite::Error::SqliteFailure(ffi_err, _) = &err {
        match ffi_err.extended_code {
            rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE => {
                return RepoError::FloorOccupied {
                    slot: slot.clone(),
                    floor,
                };
            }
            rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY => {
                return RepoError::SlotUnknown(slot.clone());
            }
            _ => {}
        }
    }
    err.into()
}
