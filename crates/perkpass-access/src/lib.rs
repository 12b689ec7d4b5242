//! PerkPass Access — credential minting/validation and the
//! verification & discount engine.
//!
//! Two components live here:
//!
//! - [`codec`] mints and validates the signed, time-limited QR payload
//!   that binds a member identity to an issuance time. It is pure: the
//!   only inputs are the shared secret and a clock value.
//! - [`service`] consumes a presented credential, cross-checks it
//!   against live member and agreement state, computes the discount,
//!   and records the outcome as an immutable ledger pair.

pub mod codec;
pub mod config;
pub mod discount;
pub mod error;
pub mod service;

pub use codec::Credential;
pub use config::AccessConfig;
pub use error::AccessError;
pub use service::{AccessService, ApplyDiscountInput, DiscountOutcome, IssuedCredential, Verification};
