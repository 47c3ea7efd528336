//! Share marketplace implementation

use std::sync::Arc;

use chrono::Utc;
use fracbank_ledger::AssetLedger;
use fracbank_types::*;
use tokio::sync::RwLock;
use tracing::info;

/// Share marketplace trait
#[async_trait::async_trait]
pub trait ShareMarket: Send + Sync {
    /// List `amount` of the caller's shares at `price` per unit
    async fn list_item(
        &self,
        caller: &AccountId,
        class_id: &AssetClassId,
        amount: Amount,
        price: Amount,
    ) -> Result<ItemId>;

    /// Buy `amount` units from a listing, paying at most `max_total_price`
    async fn purchase_item(
        &self,
        caller: &AccountId,
        item_id: ItemId,
        amount: Amount,
        max_total_price: Amount,
    ) -> Result<PurchaseReceipt>;

    /// Change the unit price of an active listing (seller only)
    async fn update_item_price(&self, caller: &AccountId, item_id: ItemId, new_price: Amount) -> Result<()>;

    /// Withdraw a listing (seller only)
    async fn delist_item(&self, caller: &AccountId, item_id: ItemId) -> Result<()>;

    /// Listing by id; a vacant listing for ids never issued
    async fn get_item(&self, item_id: ItemId) -> Listing;

    /// Units the seller has on active listings for the class
    async fn total_listed_amount(&self, class_id: &AssetClassId, seller: &AccountId) -> Result<Amount>;

    /// All listings still open for purchase
    async fn active_listings(&self) -> Vec<Listing>;
}

/// Marketplace over a shared [`AssetLedger`]
///
/// Sellers approve the marketplace's account for shares on the ledger, buyers
/// for funds on the payment asset. The marketplace never takes custody of
/// either; a purchase moves both directly between the parties.
#[derive(Clone)]
pub struct Marketplace {
    address: AccountId,
    ledger: Arc<AssetLedger>,
    /// Indexed by item id; ids are never reused
    listings: Arc<RwLock<Vec<Listing>>>,
}

impl Marketplace {
    pub fn new(ledger: Arc<AssetLedger>) -> Self {
        Self::with_address(AccountId::new(), ledger)
    }

    pub fn with_address(address: AccountId, ledger: Arc<AssetLedger>) -> Self {
        Self {
            address,
            ledger,
            listings: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Account sellers and buyers approve as spender
    pub fn address(&self) -> &AccountId {
        &self.address
    }

    pub fn ledger(&self) -> &Arc<AssetLedger> {
        &self.ledger
    }

    pub async fn listing_count(&self) -> usize {
        self.listings.read().await.len()
    }
}

/// Slot of an issued item id
fn slot(listings: &[Listing], item_id: ItemId) -> Result<usize> {
    usize::try_from(item_id.0)
        .ok()
        .filter(|index| *index < listings.len())
        .ok_or(FracBankError::UnknownItem { item_id })
}

/// Slot of an item that is still open; filled and delisted items read as unknown
fn active_slot(listings: &[Listing], item_id: ItemId) -> Result<usize> {
    let index = slot(listings, item_id)?;
    if !listings[index].is_active() {
        return Err(FracBankError::UnknownItem { item_id });
    }
    Ok(index)
}

fn listed_amount(listings: &[Listing], class_id: &AssetClassId, seller: &AccountId) -> Result<Amount> {
    listings
        .iter()
        .filter(|listing| listing.is_active() && &listing.class_id == class_id && listing.is_seller(seller))
        .try_fold(Amount::zero(), |total, listing| total.checked_add(listing.amount))
        .ok_or(FracBankError::AmountOverflow {
            operation: "total_listed_amount",
        })
}

#[async_trait::async_trait]
impl ShareMarket for Marketplace {
    async fn list_item(
        &self,
        caller: &AccountId,
        class_id: &AssetClassId,
        amount: Amount,
        price: Amount,
    ) -> Result<ItemId> {
        if amount.is_zero() {
            return Err(FracBankError::ZeroAmount { operation: "list_item" });
        }
        if class_id.is_empty() {
            return Err(FracBankError::UnknownAssetClass {
                class_id: class_id.clone(),
            });
        }

        let mut listings = self.listings.write().await;
        let listed = listed_amount(&listings, class_id, caller)?;
        let balance = self.ledger.balance_of(class_id, caller).await;
        let oversold = match listed.checked_add(amount) {
            Some(committed) => committed > balance,
            None => true,
        };
        if oversold {
            return Err(FracBankError::OversellPrevented {
                class_id: class_id.clone(),
                seller: caller.clone(),
                listed,
                requested: amount,
                balance,
            });
        }

        let item_id = ItemId::new(listings.len() as u64);
        listings.push(Listing::new(item_id, caller.clone(), class_id.clone(), amount, price));
        drop(listings);

        self.ledger.publish(FracBankEvent::ItemListed {
            item_id,
            seller: caller.clone(),
            class_id: class_id.clone(),
            amount,
            price,
            timestamp: Utc::now(),
        });
        info!(item = %item_id, seller = %caller.short(), class = %class_id, %amount, %price, "Item listed");
        Ok(item_id)
    }

    async fn purchase_item(
        &self,
        caller: &AccountId,
        item_id: ItemId,
        amount: Amount,
        max_total_price: Amount,
    ) -> Result<PurchaseReceipt> {
        let mut listings = self.listings.write().await;
        let index = active_slot(&listings, item_id)?;
        let listing = listings[index].clone();
        let seller = listing
            .seller
            .clone()
            .ok_or(FracBankError::UnknownItem { item_id })?;

        if &seller == caller {
            return Err(FracBankError::SelfPurchase {
                item_id,
                buyer: caller.clone(),
            });
        }
        if amount.is_zero() {
            return Err(FracBankError::ZeroAmount {
                operation: "purchase_item",
            });
        }
        let remaining = listing
            .amount
            .checked_sub(amount)
            .ok_or(FracBankError::InsufficientListedAmount {
                item_id,
                requested: amount,
                listed: listing.amount,
            })?;
        let total_price = listing
            .price
            .checked_mul(amount)
            .ok_or(FracBankError::AmountOverflow {
                operation: "purchase_item",
            })?;
        if total_price > max_total_price {
            return Err(FracBankError::PriceExceedsLimit {
                item_id,
                total_price,
                max_total_price,
            });
        }

        // Seller balance and allowance are re-checked by the ledger transfer.
        // The buyer's payment is queued ahead of the share move so revenue
        // settled to the buyer inside this call cannot fund the price.
        let market = &self.address;
        self.ledger
            .atomically("purchase_item", |tx| {
                if !total_price.is_zero() {
                    tx.queue_payment(PaymentTransfer::new(
                        market.clone(),
                        caller.clone(),
                        seller.clone(),
                        total_price,
                    ));
                }
                tx.transfer_from(&listing.class_id, market, &seller, caller, amount)?;
                tx.emit(FracBankEvent::ItemPurchased {
                    item_id,
                    buyer: caller.clone(),
                    amount,
                    total_price,
                    timestamp: Utc::now(),
                });
                Ok(())
            })
            .await?;

        let entry = &mut listings[index];
        entry.amount = remaining;
        if remaining.is_zero() {
            entry.tombstone();
        }
        drop(listings);

        info!(
            item = %item_id,
            buyer = %caller.short(),
            seller = %seller.short(),
            %amount,
            %total_price,
            %remaining,
            "Item purchased"
        );
        Ok(PurchaseReceipt {
            item_id,
            buyer: caller.clone(),
            seller,
            class_id: listing.class_id,
            amount,
            total_price,
            remaining,
        })
    }

    async fn update_item_price(&self, caller: &AccountId, item_id: ItemId, new_price: Amount) -> Result<()> {
        let mut listings = self.listings.write().await;
        let index = active_slot(&listings, item_id)?;
        let listing = &mut listings[index];
        if !listing.is_seller(caller) {
            return Err(FracBankError::NotSeller {
                item_id,
                caller: caller.clone(),
            });
        }
        listing.price = new_price;
        drop(listings);

        self.ledger.publish(FracBankEvent::ItemPriceUpdated {
            item_id,
            new_price,
            timestamp: Utc::now(),
        });
        info!(item = %item_id, %new_price, "Item price updated");
        Ok(())
    }

    async fn delist_item(&self, caller: &AccountId, item_id: ItemId) -> Result<()> {
        let mut listings = self.listings.write().await;
        let index = slot(&listings, item_id)?;
        let listing = &mut listings[index];
        if !listing.is_seller(caller) {
            return Err(FracBankError::NotSeller {
                item_id,
                caller: caller.clone(),
            });
        }
        if !listing.is_active() {
            return Err(FracBankError::InactiveItem { item_id });
        }
        listing.tombstone();
        drop(listings);

        self.ledger.publish(FracBankEvent::ItemDelisted {
            item_id,
            timestamp: Utc::now(),
        });
        info!(item = %item_id, "Item delisted");
        Ok(())
    }

    async fn get_item(&self, item_id: ItemId) -> Listing {
        let listings = self.listings.read().await;
        match slot(&listings, item_id) {
            Ok(index) => listings[index].clone(),
            Err(_) => Listing::vacant(item_id),
        }
    }

    async fn total_listed_amount(&self, class_id: &AssetClassId, seller: &AccountId) -> Result<Amount> {
        listed_amount(&self.listings.read().await, class_id, seller)
    }

    async fn active_listings(&self) -> Vec<Listing> {
        self.listings
            .read()
            .await
            .iter()
            .filter(|listing| listing.is_active())
            .cloned()
            .collect()
    }
}
