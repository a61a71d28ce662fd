//! Lane ordering: fractional position assignment and rebalancing plans.
//!
//! # Responsibility
//! - Compute a sort position for one moved card without rewriting siblings.
//! - Plan evenly spaced positions when fractional precision decays.
//!
//! # Invariants
//! - All computation here is pure; persistence stays in the repository layer.
//! - Within a lane, `(position ASC, created_at ASC)` is the display order.
//!
//! # See also
//! - docs/architecture/ordering.md

pub mod position;
pub mod rebalance;
