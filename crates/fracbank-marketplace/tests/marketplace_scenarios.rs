use std::sync::Arc;

use fracbank_ledger::{AssetLedger, LedgerConfig};
use fracbank_marketplace::{Marketplace, ShareMarket};
use fracbank_payment::{InMemoryStableCoin, PaymentAsset};
use fracbank_types::{AccountId, Amount, AssetClassId, FracBankError, FracBankEvent, ItemId};

struct World {
    ledger: Arc<AssetLedger>,
    market: Marketplace,
    coin: InMemoryStableCoin,
    admin: AccountId,
    user1: AccountId,
    user2: AccountId,
    nft: AssetClassId,
}

/// 1000 shares minted, 500 handed to user1
async fn world() -> World {
    let admin = AccountId::new();
    let coin = InMemoryStableCoin::new();
    let ledger = Arc::new(AssetLedger::new(
        LedgerConfig::default(),
        admin.clone(),
        Arc::new(coin.clone()),
    ));
    let market = Marketplace::new(ledger.clone());
    let user1 = AccountId::new();
    let nft = AssetClassId::from("testNFT");

    ledger.set_max_supply(&admin, &nft, Amount::new(1000)).await.unwrap();
    ledger.mint(&admin, &nft, Amount::new(1000)).await.unwrap();
    ledger.transfer(&admin, &nft, &user1, Amount::new(500)).await.unwrap();
    coin.mint(&admin, Amount::new(1_000_000_000)).await.unwrap();
    coin.approve(&admin, ledger.address(), Amount::new(1_000_000_000))
        .await
        .unwrap();

    World {
        ledger,
        market,
        coin,
        admin,
        user1,
        user2: AccountId::new(),
        nft,
    }
}

async fn fund_buyer(w: &World, funds: u128, allowance: u128) {
    w.coin.mint(&w.user2, Amount::new(funds)).await.unwrap();
    w.coin
        .approve(&w.user2, w.market.address(), Amount::new(allowance))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_listing_of_an_item() {
    let w = world().await;
    let item_id = w
        .market
        .list_item(&w.user1, &w.nft, Amount::new(300), Amount::new(200))
        .await
        .unwrap();
    assert_eq!(item_id, ItemId::new(0));

    let item = w.market.get_item(ItemId::new(0)).await;
    assert_eq!(item.seller.as_ref(), Some(&w.user1));
    assert_eq!(item.price, Amount::new(200));
    assert_eq!(item.amount, Amount::new(300));
    assert_eq!(item.class_id, w.nft);
    assert!(item.is_active());
}

#[tokio::test]
async fn test_cannot_list_more_than_held() {
    let w = world().await;

    let result = w
        .market
        .list_item(&w.user1, &w.nft, Amount::new(600), Amount::new(200))
        .await;
    assert!(matches!(result, Err(FracBankError::OversellPrevented { .. })));

    w.market
        .list_item(&w.user1, &w.nft, Amount::new(300), Amount::new(200))
        .await
        .unwrap();
    w.market
        .list_item(&w.user1, &w.nft, Amount::new(100), Amount::new(100))
        .await
        .unwrap();

    let result = w
        .market
        .list_item(&w.user1, &w.nft, Amount::new(200), Amount::new(100))
        .await;
    match result {
        Err(FracBankError::OversellPrevented {
            listed,
            requested,
            balance,
            ..
        }) => {
            assert_eq!(listed, Amount::new(400));
            assert_eq!(requested, Amount::new(200));
            assert_eq!(balance, Amount::new(500));
        }
        other => panic!("expected OversellPrevented, got {:?}", other),
    }
    assert_eq!(w.market.listing_count().await, 2);
}

#[tokio::test]
async fn test_delisting_frees_listed_amount() {
    let w = world().await;
    let item = w
        .market
        .list_item(&w.user1, &w.nft, Amount::new(500), Amount::new(1))
        .await
        .unwrap();
    w.market.delist_item(&w.user1, item).await.unwrap();

    assert_eq!(
        w.market.total_listed_amount(&w.nft, &w.user1).await.unwrap(),
        Amount::zero()
    );
    w.market
        .list_item(&w.user1, &w.nft, Amount::new(500), Amount::new(1))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_purchasing_the_item() {
    let w = world().await;
    w.market
        .list_item(&w.user1, &w.nft, Amount::new(300), Amount::new(200))
        .await
        .unwrap();
    fund_buyer(&w, 100_000, 60_000).await;
    let user2_before = w.coin.balance_of(&w.user2).await;
    let user1_before = w.coin.balance_of(&w.user1).await;
    w.ledger
        .approve(&w.user1, &w.nft, w.market.address(), Amount::new(300))
        .await
        .unwrap();

    let result = w
        .market
        .purchase_item(&w.user2, ItemId::new(0), Amount::new(300), Amount::new(50_000))
        .await;
    assert!(matches!(result, Err(FracBankError::PriceExceedsLimit { .. })));

    let receipt = w
        .market
        .purchase_item(&w.user2, ItemId::new(0), Amount::new(300), Amount::new(60_000))
        .await
        .unwrap();
    assert_eq!(receipt.total_price, Amount::new(60_000));
    assert_eq!(receipt.remaining, Amount::zero());

    assert_eq!(
        user2_before.checked_sub(w.coin.balance_of(&w.user2).await),
        Some(Amount::new(60_000))
    );
    assert_eq!(
        w.coin.balance_of(&w.user1).await.checked_sub(user1_before),
        Some(Amount::new(60_000))
    );
    assert_eq!(w.ledger.balance_of(&w.nft, &w.user1).await, Amount::new(200));
    assert_eq!(w.ledger.balance_of(&w.nft, &w.user2).await, Amount::new(300));

    let item = w.market.get_item(ItemId::new(0)).await;
    assert!(item.class_id.is_empty());
    assert!(!item.is_active());
}

#[tokio::test]
async fn test_partial_fill() {
    let w = world().await;
    let item = w
        .market
        .list_item(&w.user1, &w.nft, Amount::new(300), Amount::new(200))
        .await
        .unwrap();
    fund_buyer(&w, 100_000, 100_000).await;
    w.ledger
        .approve(&w.user1, &w.nft, w.market.address(), Amount::new(300))
        .await
        .unwrap();

    w.market
        .purchase_item(&w.user2, item, Amount::new(120), Amount::new(24_000))
        .await
        .unwrap();
    let listing = w.market.get_item(item).await;
    assert_eq!(listing.amount, Amount::new(180));
    assert_eq!(listing.class_id, w.nft);
    assert!(listing.is_active());

    let result = w
        .market
        .purchase_item(&w.user2, item, Amount::new(181), Amount::new(100_000))
        .await;
    assert!(matches!(
        result,
        Err(FracBankError::InsufficientListedAmount { .. })
    ));

    w.market
        .purchase_item(&w.user2, item, Amount::new(180), Amount::new(36_000))
        .await
        .unwrap();
    let listing = w.market.get_item(item).await;
    assert!(listing.class_id.is_empty());
    assert_eq!(listing.amount, Amount::zero());

    let result = w
        .market
        .purchase_item(&w.user2, item, Amount::new(1), Amount::new(200))
        .await;
    assert!(matches!(result, Err(FracBankError::UnknownItem { .. })));
}

#[tokio::test]
async fn test_purchase_rechecks_seller_balance() {
    let w = world().await;
    let item = w
        .market
        .list_item(&w.user1, &w.nft, Amount::new(300), Amount::new(10))
        .await
        .unwrap();
    fund_buyer(&w, 100_000, 100_000).await;
    w.ledger
        .approve(&w.user1, &w.nft, w.market.address(), Amount::new(300))
        .await
        .unwrap();
    // Seller moves shares away after listing
    let elsewhere = AccountId::new();
    w.ledger
        .transfer(&w.user1, &w.nft, &elsewhere, Amount::new(400))
        .await
        .unwrap();

    let result = w
        .market
        .purchase_item(&w.user2, item, Amount::new(300), Amount::new(3000))
        .await;

    assert!(matches!(result, Err(FracBankError::InsufficientBalance { .. })));
    assert_eq!(w.coin.balance_of(&w.user2).await, Amount::new(100_000));
    assert_eq!(w.market.get_item(item).await.amount, Amount::new(300));
    assert_eq!(
        w.ledger.allowance(&w.nft, &w.user1, w.market.address()).await,
        Amount::new(300)
    );
}

#[tokio::test]
async fn test_purchase_without_share_allowance() {
    let w = world().await;
    let item = w
        .market
        .list_item(&w.user1, &w.nft, Amount::new(300), Amount::new(10))
        .await
        .unwrap();
    fund_buyer(&w, 100_000, 100_000).await;

    let result = w
        .market
        .purchase_item(&w.user2, item, Amount::new(300), Amount::new(3000))
        .await;

    assert!(matches!(result, Err(FracBankError::AllowanceExceeded { .. })));
    assert_eq!(w.ledger.balance_of(&w.nft, &w.user2).await, Amount::zero());
}

#[tokio::test]
async fn test_purchase_without_funds_rolls_back() {
    let w = world().await;
    let item = w
        .market
        .list_item(&w.user1, &w.nft, Amount::new(300), Amount::new(200))
        .await
        .unwrap();
    fund_buyer(&w, 1000, 100_000).await;
    w.ledger
        .approve(&w.user1, &w.nft, w.market.address(), Amount::new(300))
        .await
        .unwrap();

    let result = w
        .market
        .purchase_item(&w.user2, item, Amount::new(100), Amount::new(20_000))
        .await;

    assert!(matches!(result, Err(FracBankError::PaymentFailed { .. })));
    assert_eq!(w.ledger.balance_of(&w.nft, &w.user1).await, Amount::new(500));
    assert_eq!(w.ledger.balance_of(&w.nft, &w.user2).await, Amount::zero());
    assert_eq!(
        w.ledger.allowance(&w.nft, &w.user1, w.market.address()).await,
        Amount::new(300)
    );
    assert_eq!(w.market.get_item(item).await.amount, Amount::new(300));
}

#[tokio::test]
async fn test_purchase_settles_pending_revenue() {
    let w = world().await;
    w.ledger
        .set_streams(&w.admin, &[w.nft.clone()], &[Amount::new(10)])
        .await
        .unwrap();
    let item = w
        .market
        .list_item(&w.user1, &w.nft, Amount::new(100), Amount::new(1))
        .await
        .unwrap();
    fund_buyer(&w, 1000, 1000).await;
    w.ledger
        .approve(&w.user1, &w.nft, w.market.address(), Amount::new(100))
        .await
        .unwrap();

    w.market
        .purchase_item(&w.user2, item, Amount::new(100), Amount::new(100))
        .await
        .unwrap();

    // Seller paid 500 shares * 10 index plus the 100 sale price
    assert_eq!(w.coin.balance_of(&w.user1).await, Amount::new(5000 + 100));
    assert_eq!(w.ledger.checkpoint(&w.nft, &w.user2).await, Amount::new(10));
    assert_eq!(
        w.ledger.pending_income(&w.nft, &w.user2).await.unwrap(),
        Amount::zero()
    );
}

#[tokio::test]
async fn test_buyer_revenue_cannot_fund_the_price() {
    let w = world().await;
    w.ledger
        .transfer(&w.admin, &w.nft, &w.user2, Amount::new(100))
        .await
        .unwrap();
    w.ledger
        .set_streams(&w.admin, &[w.nft.clone()], &[Amount::new(100)])
        .await
        .unwrap();
    let item = w
        .market
        .list_item(&w.user1, &w.nft, Amount::new(100), Amount::new(10))
        .await
        .unwrap();
    w.ledger
        .approve(&w.user1, &w.nft, w.market.address(), Amount::new(100))
        .await
        .unwrap();
    // Buyer has 10000 of unpaid revenue but no funds of their own
    fund_buyer(&w, 0, 1000).await;

    let result = w
        .market
        .purchase_item(&w.user2, item, Amount::new(100), Amount::new(1000))
        .await;
    assert!(matches!(result, Err(FracBankError::PaymentFailed { .. })));

    assert_eq!(w.coin.balance_of(&w.user2).await, Amount::zero());
    assert_eq!(w.ledger.balance_of(&w.nft, &w.user2).await, Amount::new(100));
    assert_eq!(w.ledger.checkpoint(&w.nft, &w.user2).await, Amount::zero());
    assert_eq!(w.market.get_item(item).await.amount, Amount::new(100));

    // Once collected, the revenue is the buyer's to spend
    let payout = w
        .ledger
        .collect_income(&w.user2, &[w.nft.clone()])
        .await
        .unwrap();
    assert_eq!(payout, Amount::new(10_000));
    w.market
        .purchase_item(&w.user2, item, Amount::new(100), Amount::new(1000))
        .await
        .unwrap();
    assert_eq!(w.coin.balance_of(&w.user2).await, Amount::new(9000));
    assert_eq!(w.ledger.balance_of(&w.nft, &w.user2).await, Amount::new(200));
}

#[tokio::test]
async fn test_updating_the_price_of_an_item() {
    let w = world().await;
    w.market
        .list_item(&w.user1, &w.nft, Amount::new(300), Amount::new(200))
        .await
        .unwrap();
    let item = w.market.get_item(ItemId::new(0)).await;
    assert_eq!(item.price, Amount::new(200));

    let result = w
        .market
        .update_item_price(&w.user2, ItemId::new(0), Amount::new(1))
        .await;
    assert!(matches!(result, Err(FracBankError::NotSeller { .. })));

    w.market
        .update_item_price(&w.user1, ItemId::new(0), Amount::new(300))
        .await
        .unwrap();
    let item = w.market.get_item(ItemId::new(0)).await;
    assert_eq!(item.price, Amount::new(300));
    assert_eq!(item.class_id, w.nft);
}

#[tokio::test]
async fn test_delisting_of_an_item() {
    let w = world().await;
    w.market
        .list_item(&w.user1, &w.nft, Amount::new(300), Amount::new(200))
        .await
        .unwrap();

    let result = w.market.delist_item(&w.user2, ItemId::new(0)).await;
    assert!(matches!(result, Err(FracBankError::NotSeller { .. })));

    w.market.delist_item(&w.user1, ItemId::new(0)).await.unwrap();
    let item = w.market.get_item(ItemId::new(0)).await;
    assert!(item.class_id.is_empty());
    assert!(w.market.active_listings().await.is_empty());
    // Nothing moved
    assert_eq!(w.ledger.balance_of(&w.nft, &w.user1).await, Amount::new(500));
}

#[tokio::test]
async fn test_marketplace_events() {
    let w = world().await;
    let mut events = w.ledger.subscribe();
    fund_buyer(&w, 10_000, 10_000).await;
    w.ledger
        .approve(&w.user1, &w.nft, w.market.address(), Amount::new(50))
        .await
        .unwrap();

    let item = w
        .market
        .list_item(&w.user1, &w.nft, Amount::new(50), Amount::new(2))
        .await
        .unwrap();
    w.market
        .update_item_price(&w.user1, item, Amount::new(3))
        .await
        .unwrap();
    w.market
        .purchase_item(&w.user2, item, Amount::new(10), Amount::new(30))
        .await
        .unwrap();
    w.market.delist_item(&w.user1, item).await.unwrap();

    let mut kinds = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let FracBankEvent::ItemPurchased { total_price, .. } = &event {
            assert_eq!(*total_price, Amount::new(30));
        }
        kinds.push(event.kind());
    }
    assert_eq!(
        kinds,
        vec![
            "Approval",
            "ItemListed",
            "ItemPriceUpdated",
            "Transferred",
            "ItemPurchased",
            "ItemDelisted",
        ]
    );
}
