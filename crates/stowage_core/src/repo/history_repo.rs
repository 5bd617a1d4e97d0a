//! Action log persistence.
//!
//! # Responsibility
//! - Append logged mutations and read them back for undo/redo and browsing.
//! - Keep snapshot payloads as JSON text inside the persistence boundary.
//!
//! # Invariants
//! - Rows are append-only; `is_undone` is the only mutable column.
//! - Undo candidates come from the top of the active log (highest id with
//!   `is_undone = 0`).
//! - Redo candidates are the lowest id with `is_undone = 1`. Undo walks ids
//!   downward one record at a time, so the oldest undone entry is the next
//!   one to replay. (A most-recently-undone rule would differ once new
//!   actions land between undos; this store keeps the lowest-id rule.)

use crate::model::action::{ActionDetail, ActionId, ActionKind, ActionRecord, OccupantSnapshot};
use crate::model::slot::SlotAddress;
use crate::repo::{RepoError, RepoResult};
use rusqlite::{params, Connection, Row};
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

const RECORD_SELECT_SQL: &str = "SELECT
    id,
    action,
    slot_id,
    floor,
    before_json,
    after_json,
    created_at,
    is_undone
FROM action_log";

/// Filter and page options for browsing the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryQuery {
    /// Restrict to records filed under one slot.
    pub slot: Option<SlotAddress>,
    /// Maximum records returned, newest first.
    pub limit: u32,
}

impl Default for HistoryQuery {
    fn default() -> Self {
        Self {
            slot: None,
            limit: 50,
        }
    }
}

/// Repository contract for the action log.
pub trait HistoryRepository {
    fn append(&self, detail: &ActionDetail) -> RepoResult<ActionRecord>;
    /// Highest-id record with `is_undone = 0`: the undo candidate.
    fn most_recent_active(&self) -> RepoResult<Option<ActionRecord>>;
    /// Lowest-id record with `is_undone = 1`: the redo candidate.
    fn earliest_undone(&self) -> RepoResult<Option<ActionRecord>>;
    fn set_undone(&self, id: ActionId, undone: bool) -> RepoResult<()>;
    fn list(&self, query: &HistoryQuery) -> RepoResult<Vec<ActionRecord>>;
}

/// SQLite-backed action log.
pub struct SqliteHistoryRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteHistoryRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn query_candidate(&self, sql: &str) -> RepoResult<Option<ActionRecord>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query([])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_record_row(row)?));
        }
        Ok(None)
    }
}

impl HistoryRepository for SqliteHistoryRepository<'_> {
    fn append(&self, detail: &ActionDetail) -> RepoResult<ActionRecord> {
        let (slot, floor) = detail.logged_placement();
        let before_json = detail.before().map(encode_snapshot).transpose()?;
        let after_json = detail.after().map(encode_snapshot).transpose()?;
        let recorded_at_ms = epoch_ms();

        self.conn.execute(
            "INSERT INTO action_log (
                action,
                slot_id,
                floor,
                before_json,
                after_json,
                created_at,
                is_undone
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0);",
            params![
                detail.kind().as_db(),
                slot.to_string(),
                floor.as_db(),
                before_json.as_deref(),
                after_json.as_deref(),
                recorded_at_ms,
            ],
        )?;

        Ok(ActionRecord {
            id: self.conn.last_insert_rowid(),
            slot: slot.clone(),
            floor_raw: floor.as_db() as u8,
            detail: detail.clone(),
            recorded_at_ms,
            undone: false,
        })
    }

    fn most_recent_active(&self) -> RepoResult<Option<ActionRecord>> {
        self.query_candidate(&format!(
            "{RECORD_SELECT_SQL} WHERE is_undone = 0 ORDER BY id DESC LIMIT 1;"
        ))
    }

    fn earliest_undone(&self) -> RepoResult<Option<ActionRecord>> {
        self.query_candidate(&format!(
            "{RECORD_SELECT_SQL} WHERE is_undone = 1 ORDER BY id ASC LIMIT 1;"
        ))
    }

    fn set_undone(&self, id: ActionId, undone: bool) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE action_log SET is_undone = ?1 WHERE id = ?2;",
            params![i64::from(undone), id],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(format!("action record {id}")));
        }
        Ok(())
    }

    fn list(&self, query: &HistoryQuery) -> RepoResult<Vec<ActionRecord>> {
        // id DESC is append order reversed; created_at has collisions at
        // millisecond resolution.
        let mut records = Vec::new();
        match &query.slot {
            Some(slot) => {
                let mut stmt = self.conn.prepare(&format!(
                    "{RECORD_SELECT_SQL} WHERE slot_id = ?1 ORDER BY id DESC LIMIT ?2;"
                ))?;
                let mut rows = stmt.query(params![slot.to_string(), query.limit])?;
                while let Some(row) = rows.next()? {
                    records.push(parse_record_row(row)?);
                }
            }
            None => {
                let mut stmt = self.conn.prepare(&format!(
                    "{RECORD_SELECT_SQL} ORDER BY id DESC LIMIT ?1;"
                ))?;
                let mut rows = stmt.query(params![query.limit])?;
                while let Some(row) = rows.next()? {
                    records.push(parse_record_row(row)?);
                }
            }
        }
        Ok(records)
    }
}

fn encode_snapshot(snapshot: &OccupantSnapshot) -> RepoResult<String> {
    serde_json::to_string(snapshot)
        .map_err(|err| RepoError::InvalidData(format!("snapshot failed to serialize: {err}")))
}

fn decode_snapshot(id: ActionId, column: &str, json: Option<String>) -> RepoResult<OccupantSnapshot> {
    let text = json.ok_or_else(|| {
        RepoError::InvalidData(format!("action record {id} is missing {column}"))
    })?;
    serde_json::from_str(&text).map_err(|err| {
        RepoError::InvalidData(format!("action record {id} has malformed {column}: {err}"))
    })
}

fn parse_record_row(row: &Row<'_>) -> RepoResult<ActionRecord> {
    let id: ActionId = row.get("id")?;

    let action_text: String = row.get("action")?;
    let kind = ActionKind::parse(&action_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid action kind `{action_text}` in action_log.action"
        ))
    })?;

    let slot_text: String = row.get("slot_id")?;
    let slot = SlotAddress::from_str(&slot_text).map_err(|_| {
        RepoError::InvalidData(format!(
            "invalid slot address `{slot_text}` in action_log.slot_id"
        ))
    })?;

    let floor_raw = match row.get::<_, i64>("floor")? {
        raw @ 0..=2 => raw as u8,
        other => {
            return Err(RepoError::InvalidData(format!(
                "invalid floor `{other}` in action_log.floor"
            )));
        }
    };

    let before_json: Option<String> = row.get("before_json")?;
    let after_json: Option<String> = row.get("after_json")?;
    let detail = match kind {
        ActionKind::Create => ActionDetail::Create {
            after: decode_snapshot(id, "after_json", after_json)?,
        },
        ActionKind::Update => ActionDetail::Update {
            before: decode_snapshot(id, "before_json", before_json)?,
            after: decode_snapshot(id, "after_json", after_json)?,
        },
        ActionKind::Delete => ActionDetail::Delete {
            before: decode_snapshot(id, "before_json", before_json)?,
        },
        ActionKind::Move => ActionDetail::Move {
            before: decode_snapshot(id, "before_json", before_json)?,
            after: decode_snapshot(id, "after_json", after_json)?,
        },
    };

    let undone = match row.get::<_, i64>("is_undone")? {
        0 => false,
        1 => true,
        other => {
            return Err(RepoError::InvalidData(format!(
                "invalid is_undone value `{other}` in action_log.is_undone"
            )));
        }
    };

    Ok(ActionRecord {
        id,
        slot,
        floor_raw,
        detail,
        recorded_at_ms: row.get("created_at")?,
        undone,
    })
}

fn epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_millis() as i64)
}
