//! Occupant domain model.
//!
//! # Responsibility
//! - Define the inventory record placed at a (slot, floor).
//! - Validate occupant attributes before they reach persistence.
//!
//! # Invariants
//! - `id` is a surrogate key assigned by the store; it is NOT stable across
//!   delete/recreate cycles (undo of a delete yields a fresh id).
//! - `order_num` is required and non-empty; an order may span many slots.

use crate::model::slot::SlotAddress;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Surrogate occupant identifier assigned at insert time.
pub type OccupantId = i64;

/// One of the two vertical levels inside a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Floor {
    One,
    Two,
}

impl Floor {
    pub fn as_db(self) -> i64 {
        match self {
            Self::One => 1,
            Self::Two => 2,
        }
    }

    pub fn from_db(value: i64) -> Option<Self> {
        match value {
            1 => Some(Self::One),
            2 => Some(Self::Two),
            _ => None,
        }
    }
}

impl Display for Floor {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_db())
    }
}

impl From<Floor> for u8 {
    fn from(value: Floor) -> Self {
        value.as_db() as u8
    }
}

impl TryFrom<u8> for Floor {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_db(i64::from(value)).ok_or_else(|| format!("floor must be 1 or 2, got {value}"))
    }
}

/// Validation failures for occupant attributes.
#[derive(Debug, Clone, PartialEq)]
pub enum OccupantValidationError {
    EmptyOrderNumber,
    NegativeRolls(i64),
    NegativeMeterage(f64),
    NegativeRollWeight(f64),
}

impl Display for OccupantValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyOrderNumber => write!(f, "order number must not be empty"),
            Self::NegativeRolls(value) => write!(f, "roll count must not be negative, got {value}"),
            Self::NegativeMeterage(value) => {
                write!(f, "meterage must not be negative, got {value}")
            }
            Self::NegativeRollWeight(value) => {
                write!(f, "roll weight must not be negative, got {value}")
            }
        }
    }
}

impl Error for OccupantValidationError {}

/// Occupant attributes without identity or placement.
///
/// This is the payload callers provide for create/update requests; identity
/// and placement live on [`Occupant`] itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OccupantDetails {
    pub order_num: String,
    pub rolls: Option<i64>,
    pub meterage: Option<f64>,
    pub density: Option<String>,
    pub roll_weight: Option<f64>,
    pub comment: Option<String>,
}

impl OccupantDetails {
    /// Minimal details carrying only the required order number.
    pub fn for_order(order_num: impl Into<String>) -> Self {
        Self {
            order_num: order_num.into(),
            ..Self::default()
        }
    }

    /// Checks attribute-level invariants.
    pub fn validate(&self) -> Result<(), OccupantValidationError> {
        if self.order_num.trim().is_empty() {
            return Err(OccupantValidationError::EmptyOrderNumber);
        }
        if let Some(rolls) = self.rolls {
            if rolls < 0 {
                return Err(OccupantValidationError::NegativeRolls(rolls));
            }
        }
        if let Some(meterage) = self.meterage {
            if meterage < 0.0 {
                return Err(OccupantValidationError::NegativeMeterage(meterage));
            }
        }
        if let Some(weight) = self.roll_weight {
            if weight < 0.0 {
                return Err(OccupantValidationError::NegativeRollWeight(weight));
            }
        }
        Ok(())
    }
}

/// A live inventory record placed at one (slot, floor).
#[derive(Debug, Clone, PartialEq)]
pub struct Occupant {
    pub id: OccupantId,
    pub slot: SlotAddress,
    pub floor: Floor,
    pub details: OccupantDetails,
}

#[cfg(test)]
mod tests {
    use super::{Floor, OccupantDetails, OccupantValidationError};

    #[test]
    fn floor_round_trips_through_db_values() {
        assert_eq!(Floor::from_db(1), Some(Floor::One));
        assert_eq!(Floor::from_db(2), Some(Floor::Two));
        assert_eq!(Floor::from_db(0), None);
        assert_eq!(Floor::from_db(3), None);
        assert_eq!(Floor::One.as_db(), 1);
    }

    #[test]
    fn validate_rejects_blank_order_number() {
        let details = OccupantDetails::for_order("  ");
        assert_eq!(
            details.validate(),
            Err(OccupantValidationError::EmptyOrderNumber)
        );
    }

    #[test]
    fn validate_rejects_negative_quantities() {
        let mut details = OccupantDetails::for_order("Z-100");
        details.rolls = Some(-1);
        assert!(matches!(
            details.validate(),
            Err(OccupantValidationError::NegativeRolls(-1))
        ));

        details.rolls = Some(4);
        details.roll_weight = Some(-0.5);
        assert!(matches!(
            details.validate(),
            Err(OccupantValidationError::NegativeRollWeight(_))
        ));

        details.roll_weight = Some(120.0);
        assert!(details.validate().is_ok());
    }
}
