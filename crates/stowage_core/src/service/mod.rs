//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level operations.
//! - Run every externally-invoked mutation as one transaction spanning the
//!   occupancy write and its action-log append.
//!
//! # Invariants
//! - Undo/redo apply compensating effects directly against the occupancy
//!   store; they never append synthetic log entries.

pub mod grid_service;
pub mod history_service;
pub mod occupancy_service;
