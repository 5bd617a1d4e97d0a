//! Domain model for the warehouse grid.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//! - Keep one typed shape per concept: addresses, occupants, logged actions.
//!
//! # Invariants
//! - A (slot, floor) pair holds at most one live occupant; the store layer
//!   enforces it, the model layer makes illegal states unrepresentable where
//!   it can (typed floors, parsed addresses).
//! - Action payloads are value snapshots, never live references.

pub mod action;
pub mod occupant;
pub mod slot;
