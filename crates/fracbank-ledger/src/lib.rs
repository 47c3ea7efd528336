//! FracBank Ledger - fractional ownership with revenue streams
//!
//! The ledger is:
//! - Class-scoped (every named asset class has its own cap, supply and balances)
//! - Allowance-aware (per class, per owner, per spender)
//! - Revenue-settling (every balance change pays out pending revenue first)
//! - Atomic (each public operation commits entirely or leaves no trace)
//!
//! # Invariants
//!
//! 1. `total_supply <= max_supply` for every class
//! 2. The sum of balances of a class equals its total supply
//! 3. A holder's checkpoint is advanced to the current revenue index
//!    whenever their balance changes or they collect
//! 4. Pending revenue is never negative
//!
//! # Revenue streams
//!
//! Each class carries a cumulative revenue index set by the administrator.
//! A holder is owed `(index - checkpoint) * balance`, paid from the
//! administrator's payment-asset balance through the allowance granted to
//! the ledger's own account. See [`streams`].

pub mod config;
pub mod ledger;
pub mod state;
pub mod streams;
pub mod txn;

pub use config::LedgerConfig;
pub use ledger::AssetLedger;
pub use state::AssetClass;
pub use streams::pending_revenue;
pub use txn::Transaction;

pub use fracbank_types::{FracBankError, Result};
