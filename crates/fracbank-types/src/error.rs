//! Error types for FracBank
//!
//! Every failure aborts the whole enclosing operation, batch operations
//! included. Variants carry the offending parameters so callers can report
//! exactly what was requested against what was available.

use crate::{AccountId, Amount, AssetClassId, ItemId};
use thiserror::Error;

/// Result type for FracBank operations
pub type Result<T> = std::result::Result<T, FracBankError>;

/// FracBank error types
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FracBankError {
    // ========================================================================
    // Amount Errors
    // ========================================================================

    /// Zero where a positive amount is required
    #[error("{operation}: amount must be greater than zero")]
    ZeroAmount { operation: &'static str },

    /// Arithmetic overflow
    #[error("Amount overflow during {operation}")]
    AmountOverflow { operation: &'static str },

    // ========================================================================
    // Ledger Errors
    // ========================================================================

    /// Holder does not own enough shares
    #[error("Insufficient balance of {class_id} for {holder}: requested {requested}, available {available}")]
    InsufficientBalance {
        class_id: AssetClassId,
        holder: AccountId,
        requested: Amount,
        available: Amount,
    },

    /// Spender tried to move more than it was approved for
    #[error("Allowance exceeded on {class_id} for {spender} over {owner}: requested {requested}, allowed {allowed}")]
    AllowanceExceeded {
        class_id: AssetClassId,
        owner: AccountId,
        spender: AccountId,
        requested: Amount,
        allowed: Amount,
    },

    /// decreaseAllowance below zero
    #[error("Allowance on {class_id} for {spender} over {owner} is {current}, cannot decrease by {decrease}")]
    InsufficientAllowance {
        class_id: AssetClassId,
        owner: AccountId,
        spender: AccountId,
        current: Amount,
        decrease: Amount,
    },

    /// Mint would push total supply past the cap
    #[error("Max supply exceeded for {class_id}: minting {requested} onto {total_supply} exceeds cap {max_supply}")]
    MaxSupplyExceeded {
        class_id: AssetClassId,
        requested: Amount,
        total_supply: Amount,
        max_supply: Amount,
    },

    /// setMaxSupply below what already circulates
    #[error("Cap {cap} for {class_id} is below circulating supply {total_supply}")]
    CapBelowSupply {
        class_id: AssetClassId,
        cap: Amount,
        total_supply: Amount,
    },

    /// Asset class id was empty or never referenced
    #[error("Unknown asset class '{class_id}'")]
    UnknownAssetClass { class_id: AssetClassId },

    // ========================================================================
    // Batch & Access Errors
    // ========================================================================

    /// Parallel arrays of different lengths
    #[error("{operation}: arity mismatch ({left} vs {right})")]
    ArityMismatch {
        operation: &'static str,
        left: usize,
        right: usize,
    },

    /// Administrator-only operation called by someone else
    #[error("{operation} requires the administrator, called by {caller}")]
    NotAdministrator {
        operation: &'static str,
        caller: AccountId,
    },

    // ========================================================================
    // Marketplace Errors
    // ========================================================================

    /// Seller-only listing operation called by someone else
    #[error("{caller} is not the seller of {item_id}")]
    NotSeller { item_id: ItemId, caller: AccountId },

    /// Listing id was never issued
    #[error("Unknown item {item_id}")]
    UnknownItem { item_id: ItemId },

    /// Listing was filled or delisted
    #[error("Item {item_id} is no longer active")]
    InactiveItem { item_id: ItemId },

    /// Listing would commit more than the seller holds
    #[error("Oversell prevented on {class_id} for {seller}: {listed} already listed, {requested} requested, balance {balance}")]
    OversellPrevented {
        class_id: AssetClassId,
        seller: AccountId,
        listed: Amount,
        requested: Amount,
        balance: Amount,
    },

    /// Purchase larger than what remains on the listing
    #[error("Item {item_id} has {listed} listed, {requested} requested")]
    InsufficientListedAmount {
        item_id: ItemId,
        requested: Amount,
        listed: Amount,
    },

    /// Buyer's slippage ceiling is below the actual price
    #[error("Item {item_id} costs {total_price}, above the limit {max_total_price}")]
    PriceExceedsLimit {
        item_id: ItemId,
        total_price: Amount,
        max_total_price: Amount,
    },

    /// Seller tried to buy their own listing
    #[error("{buyer} cannot purchase own item {item_id}")]
    SelfPurchase { item_id: ItemId, buyer: AccountId },

    // ========================================================================
    // Payment Errors
    // ========================================================================

    /// The payment asset refused a transfer
    #[error("Payment failed: {reason}")]
    PaymentFailed { reason: String },
}

impl FracBankError {
    /// Create a payment failure
    pub fn payment(reason: impl Into<String>) -> Self {
        Self::PaymentFailed {
            reason: reason.into(),
        }
    }

    /// Get an error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ZeroAmount { .. } => "ZERO_AMOUNT",
            Self::AmountOverflow { .. } => "AMOUNT_OVERFLOW",
            Self::InsufficientBalance { .. } => "INSUFFICIENT_BALANCE",
            Self::AllowanceExceeded { .. } => "ALLOWANCE_EXCEEDED",
            Self::InsufficientAllowance { .. } => "INSUFFICIENT_ALLOWANCE",
            Self::MaxSupplyExceeded { .. } => "MAX_SUPPLY_EXCEEDED",
            Self::CapBelowSupply { .. } => "CAP_BELOW_SUPPLY",
            Self::UnknownAssetClass { .. } => "UNKNOWN_ASSET_CLASS",
            Self::ArityMismatch { .. } => "ARITY_MISMATCH",
            Self::NotAdministrator { .. } => "NOT_ADMINISTRATOR",
            Self::NotSeller { .. } => "NOT_SELLER",
            Self::UnknownItem { .. } => "UNKNOWN_ITEM",
            Self::InactiveItem { .. } => "INACTIVE_ITEM",
            Self::OversellPrevented { .. } => "OVERSELL_PREVENTED",
            Self::InsufficientListedAmount { .. } => "INSUFFICIENT_LISTED_AMOUNT",
            Self::PriceExceedsLimit { .. } => "PRICE_EXCEEDS_LIMIT",
            Self::SelfPurchase { .. } => "SELF_PURCHASE",
            Self::PaymentFailed { .. } => "PAYMENT_FAILED",
        }
    }
}
