//! Domain models for PerkPass.
//!
//! These are the core types shared across all crates.

pub mod agreement;
pub mod member;
pub mod partner;
pub mod transaction;
pub mod usage;
