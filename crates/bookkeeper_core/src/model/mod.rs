//! Record model shared by every repository table.
//!
//! # Responsibility
//! - Define the trait a caller's record type implements to be persisted.
//! - Carry decoded column values between rows and record constructors.
//!
//! # Invariants
//! - Every persisted record is identified by a storage-assigned `PrimaryKey`.
//! - Deletion is a hard delete; there are no tombstones.

pub mod entity;
