//! Observable events
//!
//! Published by the ledger after an operation commits. Aborted operations
//! publish nothing.

use crate::{AccountId, Amount, AssetClassId, ItemId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum FracBankEvent {
    // ========================================================================
    // Ledger
    // ========================================================================
    MaxSupplySet {
        class_id: AssetClassId,
        max_supply: Amount,
        timestamp: DateTime<Utc>,
    },

    Minted {
        class_id: AssetClassId,
        to: AccountId,
        amount: Amount,
        total_supply: Amount,
        timestamp: DateTime<Utc>,
    },

    Transferred {
        class_id: AssetClassId,
        from: AccountId,
        to: AccountId,
        amount: Amount,
        timestamp: DateTime<Utc>,
    },

    Approval {
        class_id: AssetClassId,
        owner: AccountId,
        spender: AccountId,
        amount: Amount,
        timestamp: DateTime<Utc>,
    },

    // ========================================================================
    // Revenue streams
    // ========================================================================
    StreamsSet {
        class_ids: Vec<AssetClassId>,
        values: Vec<Amount>,
        timestamp: DateTime<Utc>,
    },

    StreamCostSet {
        stream_unit_cost: Amount,
        timestamp: DateTime<Utc>,
    },

    /// Pending revenue paid out because the holder's balance changed
    RevenueSettled {
        class_id: AssetClassId,
        holder: AccountId,
        payout: Amount,
        timestamp: DateTime<Utc>,
    },

    IncomeCollected {
        holder: AccountId,
        class_ids: Vec<AssetClassId>,
        total_payout: Amount,
        timestamp: DateTime<Utc>,
    },

    StreamsCharged {
        users: Vec<AccountId>,
        counts: Vec<Amount>,
        total_cost: Amount,
        timestamp: DateTime<Utc>,
    },

    // ========================================================================
    // Marketplace
    // ========================================================================
    ItemListed {
        item_id: ItemId,
        seller: AccountId,
        class_id: AssetClassId,
        amount: Amount,
        price: Amount,
        timestamp: DateTime<Utc>,
    },

    ItemPurchased {
        item_id: ItemId,
        buyer: AccountId,
        amount: Amount,
        total_price: Amount,
        timestamp: DateTime<Utc>,
    },

    ItemDelisted {
        item_id: ItemId,
        timestamp: DateTime<Utc>,
    },

    ItemPriceUpdated {
        item_id: ItemId,
        new_price: Amount,
        timestamp: DateTime<Utc>,
    },
}

impl FracBankEvent {
    /// Stable event name, matches the serde tag
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MaxSupplySet { .. } => "MaxSupplySet",
            Self::Minted { .. } => "Minted",
            Self::Transferred { .. } => "Transferred",
            Self::Approval { .. } => "Approval",
            Self::StreamsSet { .. } => "StreamsSet",
            Self::StreamCostSet { .. } => "StreamCostSet",
            Self::RevenueSettled { .. } => "RevenueSettled",
            Self::IncomeCollected { .. } => "IncomeCollected",
            Self::StreamsCharged { .. } => "StreamsCharged",
            Self::ItemListed { .. } => "ItemListed",
            Self::ItemPurchased { .. } => "ItemPurchased",
            Self::ItemDelisted { .. } => "ItemDelisted",
            Self::ItemPriceUpdated { .. } => "ItemPriceUpdated",
        }
    }
}
