//! Slot registry persistence.
//!
//! # Responsibility
//! - Persist the fixed address space and its storage/walkway tagging.
//!
//! # Invariants
//! - Upserting an existing address only redefines `kind`; it never touches
//!   occupant rows.
//! - Listing returns addresses in grid order (parsed, not lexicographic).

use crate::model::slot::{Slot, SlotAddress, SlotKind};
use crate::repo::{RepoError, RepoResult};
use rusqlite::{params, Connection};
use std::str::FromStr;

/// Repository contract for the slot registry.
pub trait SlotRepository {
    fn upsert(&self, address: &SlotAddress, kind: SlotKind) -> RepoResult<()>;
    fn kind_of(&self, address: &SlotAddress) -> RepoResult<Option<SlotKind>>;
    fn list(&self) -> RepoResult<Vec<Slot>>;
    fn count(&self) -> RepoResult<u64>;
}

/// SQLite-backed slot registry.
pub struct SqliteSlotRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteSlotRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl SlotRepository for SqliteSlotRepository<'_> {
    fn upsert(&self, address: &SlotAddress, kind: SlotKind) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO slots (id, kind) VALUES (?1, ?2)
             ON CONFLICT (id) DO UPDATE SET kind = excluded.kind;",
            params![address.to_string(), kind_to_db(kind)],
        )?;
        Ok(())
    }

    fn kind_of(&self, address: &SlotAddress) -> RepoResult<Option<SlotKind>> {
        let mut stmt = self
            .conn
            .prepare("SELECT kind FROM slots WHERE id = ?1;")?;
        let mut rows = stmt.query(params![address.to_string()])?;
        if let Some(row) = rows.next()? {
            let kind_text: String = row.get(0)?;
            let kind = parse_kind(&kind_text).ok_or_else(|| {
                RepoError::InvalidData(format!("invalid slot kind `{kind_text}` in slots.kind"))
            })?;
            return Ok(Some(kind));
        }
        Ok(None)
    }

    fn list(&self) -> RepoResult<Vec<Slot>> {
        let mut stmt = self.conn.prepare("SELECT id, kind FROM slots;")?;
        let mut rows = stmt.query([])?;
        let mut slots = Vec::new();

        while let Some(row) = rows.next()? {
            let id_text: String = row.get("id")?;
            let kind_text: String = row.get("kind")?;
            let address = SlotAddress::from_str(&id_text).map_err(|_| {
                RepoError::InvalidData(format!("invalid slot address `{id_text}` in slots.id"))
            })?;
            let kind = parse_kind(&kind_text).ok_or_else(|| {
                RepoError::InvalidData(format!("invalid slot kind `{kind_text}` in slots.kind"))
            })?;
            slots.push(Slot { address, kind });
        }

        slots.sort_by(|a, b| a.address.cmp(&b.address));
        Ok(slots)
    }

    fn count(&self) -> RepoResult<u64> {
        let count: u64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM slots;", [], |row| row.get(0))?;
        Ok(count)
    }
}

fn kind_to_db(kind: SlotKind) -> &'static str {
    match kind {
        SlotKind::Storage => "storage",
        SlotKind::Walkway => "walkway",
    }
}

fn parse_kind(value: &str) -> Option<SlotKind> {
    match value {
        "storage" => Some(SlotKind::Storage),
        "walkway" => Some(SlotKind::Walkway),
        _ => None,
    }
}
