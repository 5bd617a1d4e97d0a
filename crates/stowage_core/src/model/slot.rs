//! Slot addresses and the fixed grid layout.
//!
//! # Responsibility
//! - Parse and order grid addresses (column letters + row number).
//! - Describe the deterministic storage/walkway layout rule.
//!
//! # Invariants
//! - Addresses are canonicalized to uppercase; `C4` and `c4` are the same
//!   slot.
//! - Slots are created once at grid initialization and never deleted;
//!   re-initialization may only redefine `kind`.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::ops::RangeInclusive;
use std::str::FromStr;

static ADDRESS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Z]+)([0-9]+)$").expect("slot address pattern must compile")
});

/// Error raised when text cannot be read as a grid address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotAddressError {
    input: String,
}

impl Display for SlotAddressError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "`{}` is not a valid slot address (expected column letters followed by a row number, e.g. C4)",
            self.input
        )
    }
}

impl Error for SlotAddressError {}

/// Parsed grid address: column letters plus a 1-based row number.
///
/// Ordering is by column (shorter columns first, then alphabetical), then by
/// row, so iteration yields `A1, A2, .. A13, B1, ..` rather than the
/// lexicographic `A1, A10, A11, ..`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SlotAddress {
    column: String,
    row: u32,
}

impl SlotAddress {
    /// Builds an address from a column label and row number.
    ///
    /// The column is canonicalized to uppercase. Rows are 1-based.
    pub fn new(column: &str, row: u32) -> Result<Self, SlotAddressError> {
        let column = column.trim().to_ascii_uppercase();
        if row == 0 || column.is_empty() || !column.bytes().all(|b| b.is_ascii_uppercase()) {
            return Err(SlotAddressError {
                input: format!("{column}{row}"),
            });
        }
        Ok(Self { column, row })
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn row(&self) -> u32 {
        self.row
    }
}

impl Display for SlotAddress {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.column, self.row)
    }
}

impl FromStr for SlotAddress {
    type Err = SlotAddressError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let canonical = value.trim().to_ascii_uppercase();
        let captures = ADDRESS_RE.captures(&canonical).ok_or_else(|| SlotAddressError {
            input: value.trim().to_string(),
        })?;
        let row: u32 = captures[2].parse().map_err(|_| SlotAddressError {
            input: value.trim().to_string(),
        })?;
        Self::new(&captures[1], row)
    }
}

impl TryFrom<String> for SlotAddress {
    type Error = SlotAddressError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SlotAddress> for String {
    fn from(value: SlotAddress) -> Self {
        value.to_string()
    }
}

impl Ord for SlotAddress {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.column.len(), &self.column, self.row).cmp(&(
            other.column.len(),
            &other.column,
            other.row,
        ))
    }
}

impl PartialOrd for SlotAddress {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Whether a grid location stores goods or is kept clear as a walkway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotKind {
    Storage,
    Walkway,
}

/// One registered grid location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    pub address: SlotAddress,
    pub kind: SlotKind,
}

/// Deterministic rule mapping (column, row) to a slot kind.
///
/// The default layout is the physical warehouse: columns `A..X`, rows 1-13,
/// where everything from the third column on is storage in rows 1-5 and
/// 8-12, and the rest (outer columns, rows 6-7 and 13) are walkways.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridSchema {
    /// Column labels, one character per column, in grid order.
    pub columns: String,
    /// Inclusive row range.
    pub rows: RangeInclusive<u32>,
    /// 0-based column index where storage columns begin.
    pub storage_from_column: usize,
    /// Inclusive row bands that are storage within storage columns.
    pub storage_row_bands: Vec<(u32, u32)>,
}

impl Default for GridSchema {
    fn default() -> Self {
        Self {
            columns: "ABCDEFGHIJKLMNOPQRSTUVWX".to_string(),
            rows: 1..=13,
            storage_from_column: 2,
            storage_row_bands: vec![(1, 5), (8, 12)],
        }
    }
}

impl GridSchema {
    /// Resolves the kind for a (column index, row) position.
    pub fn kind_for(&self, column_index: usize, row: u32) -> SlotKind {
        let in_storage_column = column_index >= self.storage_from_column;
        let in_storage_band = self
            .storage_row_bands
            .iter()
            .any(|&(low, high)| row >= low && row <= high);
        if in_storage_column && in_storage_band {
            SlotKind::Storage
        } else {
            SlotKind::Walkway
        }
    }

    /// Number of addresses this schema defines.
    pub fn slot_count(&self) -> usize {
        self.columns.chars().count() * self.rows.clone().count()
    }
}

#[cfg(test)]
mod tests {
    use super::{GridSchema, SlotAddress, SlotKind};

    #[test]
    fn parse_canonicalizes_case_and_whitespace() {
        let parsed: SlotAddress = " c4 ".parse().expect("c4 should parse");
        assert_eq!(parsed.to_string(), "C4");
        assert_eq!(parsed.column(), "C");
        assert_eq!(parsed.row(), 4);
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!("".parse::<SlotAddress>().is_err());
        assert!("4C".parse::<SlotAddress>().is_err());
        assert!("C".parse::<SlotAddress>().is_err());
        assert!("C0".parse::<SlotAddress>().is_err());
        assert!("C-4".parse::<SlotAddress>().is_err());
    }

    #[test]
    fn ordering_is_by_column_then_numeric_row() {
        let mut addresses: Vec<SlotAddress> = ["A10", "A2", "B1", "AA1", "A1"]
            .iter()
            .map(|raw| raw.parse().expect("fixture addresses parse"))
            .collect();
        addresses.sort();
        let rendered: Vec<String> = addresses.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, ["A1", "A2", "A10", "B1", "AA1"]);
    }

    #[test]
    fn default_schema_matches_warehouse_layout() {
        let schema = GridSchema::default();
        assert_eq!(schema.slot_count(), 24 * 13);
        // Outer columns A/B are walkway everywhere.
        assert_eq!(schema.kind_for(0, 3), SlotKind::Walkway);
        assert_eq!(schema.kind_for(1, 3), SlotKind::Walkway);
        // Storage bands.
        assert_eq!(schema.kind_for(2, 1), SlotKind::Storage);
        assert_eq!(schema.kind_for(2, 5), SlotKind::Storage);
        assert_eq!(schema.kind_for(23, 8), SlotKind::Storage);
        assert_eq!(schema.kind_for(23, 12), SlotKind::Storage);
        // Cross aisles and the last row.
        assert_eq!(schema.kind_for(5, 6), SlotKind::Walkway);
        assert_eq!(schema.kind_for(5, 7), SlotKind::Walkway);
        assert_eq!(schema.kind_for(5, 13), SlotKind::Walkway);
    }
}
