//! Marketplace listing types
//!
//! A listing is an offer to sell part of a seller's balance in one asset class
//! at a fixed unit price. Shares stay with the seller until a purchase moves
//! them, so a listing is a promise checked against the live balance, not a lock.

use crate::{AccountId, Amount, AssetClassId, ItemId};
use serde::{Deserialize, Serialize};

/// A marketplace listing
///
/// While active, `amount > 0` and `class_id` is non-empty. A fully filled or
/// delisted listing is tombstoned: `class_id` cleared, `amount` zero, never
/// reactivated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing {
    pub id: ItemId,
    pub seller: Option<AccountId>,
    pub class_id: AssetClassId,
    /// Units still for sale
    pub amount: Amount,
    /// Price per unit in payment-asset units
    pub price: Amount,
}

impl Listing {
    pub fn new(
        id: ItemId,
        seller: AccountId,
        class_id: AssetClassId,
        amount: Amount,
        price: Amount,
    ) -> Self {
        Self {
            id,
            seller: Some(seller),
            class_id,
            amount,
            price,
        }
    }

    /// The canonical "does not exist" listing returned for unissued ids
    pub fn vacant(id: ItemId) -> Self {
        Self {
            id,
            seller: None,
            class_id: AssetClassId::empty(),
            amount: Amount::zero(),
            price: Amount::zero(),
        }
    }

    pub fn is_active(&self) -> bool {
        !self.class_id.is_empty() && !self.amount.is_zero()
    }

    pub fn is_seller(&self, account: &AccountId) -> bool {
        self.seller.as_ref() == Some(account)
    }

    /// Terminate the listing; the id is never reused
    pub fn tombstone(&mut self) {
        self.class_id = AssetClassId::empty();
        self.amount = Amount::zero();
    }
}

/// Outcome of a successful purchase
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseReceipt {
    pub item_id: ItemId,
    pub buyer: AccountId,
    pub seller: AccountId,
    pub class_id: AssetClassId,
    pub amount: Amount,
    pub total_price: Amount,
    /// Units left on the listing after this fill
    pub remaining: Amount,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tombstone_clears_class() {
        let seller = AccountId::new();
        let mut listing = Listing::new(
            ItemId::new(0),
            seller.clone(),
            AssetClassId::from("testNFT"),
            Amount::new(300),
            Amount::new(200),
        );
        assert!(listing.is_active());
        assert!(listing.is_seller(&seller));

        listing.tombstone();
        assert!(!listing.is_active());
        assert!(listing.class_id.is_empty());
        assert_eq!(listing.amount, Amount::zero());
        assert_eq!(listing.price, Amount::new(200));
    }

    #[test]
    fn test_vacant_listing_is_inactive() {
        let listing = Listing::vacant(ItemId::new(42));
        assert!(!listing.is_active());
        assert!(listing.seller.is_none());
    }
}
