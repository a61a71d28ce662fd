//! Unified domain model for hub cards.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//! - Keep a single item-centric shape for note/task/event/file projections.
//!
//! # Invariants
//! - Every domain object is identified by a stable `ItemId`.
//! - Deletion is represented by soft-delete tombstones, not hard delete.
//!
//! # See also
//! - docs/architecture/data-model.md

pub mod item;
