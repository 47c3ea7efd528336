//! FracBank Marketplace - fixed-price, partial-fill trading of fractional shares
//!
//! - Listings: a seller offers part of their balance in one class at a unit price
//! - Oversell guard: active listings never exceed the seller's balance at listing time
//! - Partial fills: buyers take any amount up to what remains on a listing
//! - Slippage ceiling: buyers cap the total price they are willing to pay
//!
//! Shares stay with the seller until a purchase moves them, so every purchase
//! re-checks the seller's balance and allowance through the ledger.

pub use fracbank_types::{ItemId, Listing, PurchaseReceipt};

pub mod market;

pub use market::*;
