//! Demo command - revenue accrual, settlement on transfer and a marketplace sale

use std::sync::Arc;

use colored::*;

use fracbank_ledger::{AssetLedger, LedgerConfig};
use fracbank_marketplace::{Marketplace, ShareMarket};
use fracbank_payment::{InMemoryStableCoin, PaymentAsset};
use fracbank_types::{AccountId, Amount, AssetClassId, FracBankError};

use crate::display;

const ADMIN_FUNDS: u128 = 1_000_000_000;

/// Run the scripted demo, checking every figure it prints
pub async fn run_demo(config: LedgerConfig) -> anyhow::Result<()> {
    println!("{}", "FracBank demo: fractional shares that pay".bright_white().bold());

    let admin = AccountId::new();
    let alice = AccountId::new();
    let bob = AccountId::new();
    let nft = AssetClassId::from("testNFT");

    let coin = InMemoryStableCoin::new();
    let ledger = Arc::new(AssetLedger::new(config, admin.clone(), Arc::new(coin.clone())));
    let market = Marketplace::new(ledger.clone());

    // =========================================================================
    display::section("Step 1: Issue shares");
    // =========================================================================
    coin.mint(&admin, Amount::new(ADMIN_FUNDS)).await?;
    coin.approve(&admin, ledger.address(), Amount::new(ADMIN_FUNDS)).await?;
    display::success("Administrator funded and approved the ledger for payouts");

    ledger.set_streams(&admin, &[nft.clone()], &[Amount::new(1000)]).await?;
    ledger.set_max_supply(&admin, &nft, Amount::new(1000)).await?;
    ledger.mint(&admin, &nft, Amount::new(500)).await?;
    ledger.transfer(&admin, &nft, &alice, Amount::new(500)).await?;
    display::success("Minted 500 shares of testNFT at revenue index 1000, all to Alice");
    display::kv("Alice", ledger.balance_of(&nft, &alice).await);
    display::kv("Alice checkpoint", ledger.checkpoint(&nft, &alice).await);

    match ledger.mint(&admin, &nft, Amount::new(501)).await {
        Err(FracBankError::MaxSupplyExceeded { max_supply, .. }) => {
            display::rejected(&format!("Minting 501 more refused, cap is {}", max_supply));
        }
        other => anyhow::bail!("expected the cap to hold, got {:?}", other),
    }

    // =========================================================================
    display::section("Step 2: Revenue accrues, Alice collects");
    // =========================================================================
    ledger.set_streams(&admin, &[nft.clone()], &[Amount::new(2000)]).await?;
    display::info("Revenue index raised to 2000");
    display::kv("Alice pending", ledger.pending_income(&nft, &alice).await?);

    let payout = ledger.collect_income(&alice, &[nft.clone()]).await?;
    anyhow::ensure!(payout == Amount::new(500_000), "unexpected payout {}", payout);
    display::success(&format!("Alice collected {}", payout));

    ledger.set_streams(&admin, &[nft.clone()], &[Amount::new(4000)]).await?;
    let payout = ledger.collect_income(&alice, &[nft.clone()]).await?;
    anyhow::ensure!(payout == Amount::new(1_000_000), "unexpected payout {}", payout);
    display::success(&format!("Index 4000: Alice collected {}", payout));
    display::kv("Alice funds", coin.balance_of(&alice).await);

    // =========================================================================
    display::section("Step 3: Transfer settles before balances move");
    // =========================================================================
    ledger.set_streams(&admin, &[nft.clone()], &[Amount::new(5000)]).await?;
    let before = coin.balance_of(&alice).await;
    ledger.transfer(&alice, &nft, &bob, Amount::new(250)).await?;
    let settled = coin
        .balance_of(&alice)
        .await
        .checked_sub(before)
        .unwrap_or_default();
    anyhow::ensure!(settled == Amount::new(500_000), "unexpected settlement {}", settled);
    display::success(&format!("Alice sent Bob 250 shares and was paid {} on the way", settled));

    ledger.set_streams(&admin, &[nft.clone()], &[Amount::new(6000)]).await?;
    let alice_payout = ledger.collect_income(&alice, &[nft.clone()]).await?;
    let bob_payout = ledger.collect_income(&bob, &[nft.clone()]).await?;
    anyhow::ensure!(alice_payout == bob_payout, "equal stakes must earn equally");
    display::success(&format!("Index 6000: Alice and Bob each collected {}", bob_payout));

    // =========================================================================
    display::section("Step 4: Marketplace sale");
    // =========================================================================
    let item = market
        .list_item(&bob, &nft, Amount::new(200), Amount::new(20))
        .await?;
    display::success(&format!("Bob listed 200 shares at 20 as {}", item));

    match market.list_item(&bob, &nft, Amount::new(100), Amount::new(20)).await {
        Err(FracBankError::OversellPrevented { listed, balance, .. }) => {
            display::rejected(&format!(
                "Listing 100 more refused: {} listed against a balance of {}",
                listed, balance
            ));
        }
        other => anyhow::bail!("expected the oversell guard, got {:?}", other),
    }

    ledger.approve(&bob, &nft, market.address(), Amount::new(200)).await?;
    coin.approve(&alice, market.address(), Amount::new(10_000)).await?;

    match market
        .purchase_item(&alice, item, Amount::new(150), Amount::new(2_000))
        .await
    {
        Err(FracBankError::PriceExceedsLimit { total_price, .. }) => {
            display::rejected(&format!("Alice's ceiling of 2000 is below the price {}", total_price));
        }
        other => anyhow::bail!("expected the slippage guard, got {:?}", other),
    }

    let receipt = market
        .purchase_item(&alice, item, Amount::new(150), Amount::new(3_000))
        .await?;
    display::success(&format!(
        "Alice bought {} shares for {}, {} left on the listing",
        receipt.amount, receipt.total_price, receipt.remaining
    ));
    display::kv("Alice shares", ledger.balance_of(&nft, &alice).await);
    display::kv("Bob shares", ledger.balance_of(&nft, &bob).await);

    market.delist_item(&bob, item).await?;
    display::success("Bob delisted the remainder");

    println!();
    println!("{}", "Demo complete".bright_green().bold());
    Ok(())
}
