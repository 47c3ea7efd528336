//! Payment-asset transfer instructions
//!
//! Operations that move payment-asset funds collect `PaymentTransfer`s and
//! submit them as one batch, so the batch settles entirely or not at all.

use crate::{AccountId, Amount};
use serde::{Deserialize, Serialize};

/// One allowance-backed movement of payment-asset units
///
/// Equivalent to `spender` calling `transferFrom(from, to, amount)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentTransfer {
    pub spender: AccountId,
    pub from: AccountId,
    pub to: AccountId,
    pub amount: Amount,
}

impl PaymentTransfer {
    pub fn new(spender: AccountId, from: AccountId, to: AccountId, amount: Amount) -> Self {
        Self {
            spender,
            from,
            to,
            amount,
        }
    }
}
