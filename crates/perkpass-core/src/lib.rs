//! PerkPass Core — domain models, repository traits, and shared error
//! types for the membership-discount platform.

pub mod error;
pub mod models;
pub mod repository;

pub use error::{PerkpassError, PerkpassResult};
