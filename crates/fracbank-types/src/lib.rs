//! FracBank Types - Canonical domain types for fractional asset ownership
//!
//! This crate contains the foundational types shared by every FracBank crate,
//! with zero dependencies on other fracbank crates:
//!
//! - Identity types (`AccountId`, `AssetClassId`, `ItemId`)
//! - Unsigned share and payment amounts with checked arithmetic
//! - Marketplace listings and payment-asset transfer instructions
//! - Observable events and the error taxonomy
//!
//! # Invariants
//!
//! 1. Amounts never go negative; every arithmetic step is checked
//! 2. An empty `AssetClassId` only ever marks a tombstoned listing
//! 3. Listing ids are never reused

pub mod identity;
pub mod amount;
pub mod listing;
pub mod payment;
pub mod events;
pub mod error;

pub use identity::*;
pub use amount::*;
pub use listing::*;
pub use payment::*;
pub use events::*;
pub use error::*;

/// Version of the FracBank types schema
pub const TYPES_VERSION: &str = "0.1.0";
