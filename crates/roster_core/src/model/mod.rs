//! Domain model for members and the teams they belong to.
//!
//! # Responsibility
//! - Define the persisted entities shared by repositories and services.
//! - Own entity-level validation and audit timestamp hooks.
//!
//! # Invariants
//! - Identifiers are assigned by storage on insert; `None` means unsaved.
//! - A member references at most one team; teams never own member rows.

pub mod audit;
pub mod member;
pub mod team;
