//! Stress command - seeded random trading across many accounts and classes
//!
//! Every step is one of: list, purchase, update price, delist, raise a revenue
//! index or collect income. After each step the run checks that shares are
//! conserved per class, payment-asset funds are conserved overall and no
//! seller has more listed than they hold.

use std::sync::Arc;

use anyhow::ensure;
use colored::*;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::{debug, info};

use fracbank_ledger::{AssetLedger, LedgerConfig};
use fracbank_marketplace::{Marketplace, ShareMarket};
use fracbank_payment::{InMemoryStableCoin, PaymentAsset};
use fracbank_types::{AccountId, Amount, AssetClassId, FracBankError};

use crate::config::StressConfig;
use crate::display;

const MAX_LIST_AMOUNT: u128 = 60;
const MAX_UNIT_PRICE: u128 = 50;
const MAX_INDEX_STEP: u128 = 5;

/// Counters for a finished run
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct StressReport {
    pub listed: usize,
    pub oversell_rejected: usize,
    pub purchased: usize,
    pub purchase_rejected: usize,
    pub repriced: usize,
    pub delisted: usize,
    pub index_raised: usize,
    pub collected: usize,
    pub total_payout: u128,
}

struct Sim {
    ledger: Arc<AssetLedger>,
    market: Marketplace,
    coin: InMemoryStableCoin,
    admin: AccountId,
    accounts: Vec<AccountId>,
    classes: Vec<AssetClassId>,
    indexes: Vec<u128>,
    coin_supply: Amount,
}

impl Sim {
    async fn setup(ledger_config: LedgerConfig, config: &StressConfig) -> anyhow::Result<Self> {
        let admin = AccountId::new();
        let coin = InMemoryStableCoin::new();
        let ledger = Arc::new(AssetLedger::new(
            ledger_config,
            admin.clone(),
            Arc::new(coin.clone()),
        ));
        let market = Marketplace::new(ledger.clone());
        let accounts: Vec<AccountId> = (0..config.accounts).map(|_| AccountId::new()).collect();
        let classes: Vec<AssetClassId> = (0..config.classes)
            .map(|i| AssetClassId::new(i.to_string()))
            .collect();

        // Enough to fund every payout the run can trigger
        let payout_reserve = Amount::new(u128::from(u64::MAX));
        coin.mint(&admin, payout_reserve).await?;
        coin.approve(&admin, ledger.address(), payout_reserve).await?;

        let supply = Amount::new(u128::from(config.class_supply));
        for class_id in &classes {
            ledger.set_max_supply(&admin, class_id, supply).await?;
            ledger.mint(&admin, class_id, supply).await?;
        }

        let shares = Amount::new(u128::from(config.shares_per_account));
        for account in &accounts {
            coin.mint(account, Amount::new(u128::from(config.funds_per_account)))
                .await?;
            coin.approve(account, market.address(), Amount::new(u128::MAX))
                .await?;
            for class_id in &classes {
                ledger.transfer(&admin, class_id, account, shares).await?;
                ledger
                    .approve(account, class_id, market.address(), Amount::new(u128::MAX))
                    .await?;
            }
        }

        let coin_supply = coin.total_supply().await;
        Ok(Self {
            ledger,
            market,
            coin,
            admin,
            accounts,
            indexes: vec![0; classes.len()],
            classes,
            coin_supply,
        })
    }

    async fn list(&self, rng: &mut StdRng, report: &mut StressReport) -> anyhow::Result<()> {
        let seller = pick(&self.accounts, rng)?;
        let class_id = pick(&self.classes, rng)?;
        let amount = Amount::new(rng.gen_range(1..=MAX_LIST_AMOUNT));
        let price = Amount::new(rng.gen_range(1..=MAX_UNIT_PRICE));

        let listed = self.market.total_listed_amount(class_id, seller).await?;
        let balance = self.ledger.balance_of(class_id, seller).await;
        let fits = listed
            .checked_add(amount)
            .map_or(false, |committed| committed <= balance);

        match self.market.list_item(seller, class_id, amount, price).await {
            Ok(item_id) => {
                ensure!(fits, "{} accepted beyond the seller's balance", item_id);
                let item = self.market.get_item(item_id).await;
                ensure!(
                    item.is_seller(seller)
                        && &item.class_id == class_id
                        && item.amount == amount
                        && item.price == price,
                    "{} does not match what was listed",
                    item_id
                );
                report.listed += 1;
            }
            Err(FracBankError::OversellPrevented { .. }) if !fits => {
                report.oversell_rejected += 1;
            }
            Err(err) => return Err(err.into()),
        }
        Ok(())
    }

    async fn purchase(&self, rng: &mut StdRng, report: &mut StressReport) -> anyhow::Result<()> {
        let active = self.market.active_listings().await;
        let Some(listing) = active.choose(rng) else {
            return Ok(());
        };
        let buyer = pick(&self.accounts, rng)?;
        let amount = Amount::new(rng.gen_range(1..=listing.amount.value()));
        let total_price = listing
            .price
            .checked_mul(amount)
            .ok_or_else(|| anyhow::anyhow!("price overflow on {}", listing.id))?;

        match self
            .market
            .purchase_item(buyer, listing.id, amount, total_price)
            .await
        {
            Ok(receipt) => {
                ensure!(receipt.total_price == total_price, "{} charged the wrong price", listing.id);
                let after = self.market.get_item(listing.id).await;
                ensure!(
                    after.amount.checked_add(amount) == Some(listing.amount),
                    "{} not decremented by the fill",
                    listing.id
                );
                ensure!(
                    after.is_active() != receipt.remaining.is_zero(),
                    "{} tombstone state is wrong",
                    listing.id
                );
                report.purchased += 1;
            }
            Err(FracBankError::SelfPurchase { .. }) if listing.is_seller(buyer) => {
                report.purchase_rejected += 1;
            }
            Err(FracBankError::PaymentFailed { .. }) => {
                let after = self.market.get_item(listing.id).await;
                ensure!(after.amount == listing.amount, "{} changed by a failed purchase", listing.id);
                report.purchase_rejected += 1;
            }
            Err(err) => return Err(err.into()),
        }
        Ok(())
    }

    async fn reprice(&self, rng: &mut StdRng, report: &mut StressReport) -> anyhow::Result<()> {
        let active = self.market.active_listings().await;
        let Some(listing) = active.choose(rng) else {
            return Ok(());
        };
        let Some(seller) = listing.seller.as_ref() else {
            return Ok(());
        };
        let price = Amount::new(rng.gen_range(1..=MAX_UNIT_PRICE));
        self.market.update_item_price(seller, listing.id, price).await?;
        ensure!(
            self.market.get_item(listing.id).await.price == price,
            "{} kept its old price",
            listing.id
        );
        report.repriced += 1;
        Ok(())
    }

    async fn delist(&self, rng: &mut StdRng, report: &mut StressReport) -> anyhow::Result<()> {
        let active = self.market.active_listings().await;
        let Some(listing) = active.choose(rng) else {
            return Ok(());
        };
        let Some(seller) = listing.seller.as_ref() else {
            return Ok(());
        };
        self.market.delist_item(seller, listing.id).await?;
        ensure!(
            self.market.get_item(listing.id).await.class_id.is_empty(),
            "{} not tombstoned",
            listing.id
        );
        report.delisted += 1;
        Ok(())
    }

    async fn raise_index(&mut self, rng: &mut StdRng, report: &mut StressReport) -> anyhow::Result<()> {
        let slot = rng.gen_range(0..self.classes.len());
        self.indexes[slot] += rng.gen_range(1..=MAX_INDEX_STEP);
        self.ledger
            .set_streams(
                &self.admin,
                &self.classes[slot..=slot],
                &[Amount::new(self.indexes[slot])],
            )
            .await?;
        report.index_raised += 1;
        Ok(())
    }

    async fn collect(&self, rng: &mut StdRng, report: &mut StressReport) -> anyhow::Result<()> {
        let holder = pick(&self.accounts, rng)?;
        let payout = self.ledger.collect_income(holder, &self.classes).await?;
        for class_id in &self.classes {
            ensure!(
                self.ledger.pending_income(class_id, holder).await?.is_zero(),
                "income left pending after collection"
            );
        }
        report.collected += 1;
        report.total_payout += payout.value();
        Ok(())
    }

    async fn check_invariants(&self) -> anyhow::Result<()> {
        for class_id in &self.classes {
            let held = self
                .ledger
                .holdings(class_id)
                .await
                .into_iter()
                .try_fold(Amount::zero(), |total, (_, amount)| total.checked_add(amount))
                .ok_or_else(|| anyhow::anyhow!("holdings of {} overflow", class_id))?;
            let supply = self.ledger.total_supply(class_id).await;
            ensure!(held == supply, "{}: holdings {} != supply {}", class_id, held, supply);

            for account in &self.accounts {
                let listed = self.market.total_listed_amount(class_id, account).await?;
                let balance = self.ledger.balance_of(class_id, account).await;
                ensure!(listed <= balance, "{}: listed {} over balance {}", class_id, listed, balance);
            }
        }

        let mut holders = vec![
            self.admin.clone(),
            self.ledger.address().clone(),
            self.market.address().clone(),
        ];
        holders.extend(self.accounts.iter().cloned());
        let mut funds = Amount::zero();
        for holder in &holders {
            funds = funds
                .checked_add(self.coin.balance_of(holder).await)
                .ok_or_else(|| anyhow::anyhow!("funds overflow"))?;
        }
        ensure!(
            funds == self.coin_supply,
            "payment funds {} != supply {}",
            funds,
            self.coin_supply
        );
        Ok(())
    }
}

fn pick<'a, T>(items: &'a [T], rng: &mut StdRng) -> anyhow::Result<&'a T> {
    items
        .choose(rng)
        .ok_or_else(|| anyhow::anyhow!("nothing to choose from"))
}

/// Run the stress scenario and return what happened
pub async fn run_stress(ledger_config: LedgerConfig, config: &StressConfig) -> anyhow::Result<StressReport> {
    let mut sim = Sim::setup(ledger_config, config).await?;
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut report = StressReport::default();

    info!(
        iterations = config.iterations,
        accounts = config.accounts,
        classes = config.classes,
        seed = config.seed,
        "Starting stress run"
    );

    for step in 0..config.iterations {
        let action = rng.gen_range(0..6);
        match action {
            0 | 1 => sim.list(&mut rng, &mut report).await?,
            2 => sim.purchase(&mut rng, &mut report).await?,
            3 => sim.reprice(&mut rng, &mut report).await?,
            4 => sim.delist(&mut rng, &mut report).await?,
            _ if rng.gen_bool(0.5) => sim.raise_index(&mut rng, &mut report).await?,
            _ => sim.collect(&mut rng, &mut report).await?,
        }
        sim.check_invariants()
            .await
            .map_err(|err| err.context(format!("invariant broken after step {}", step)))?;
        debug!(step, action, "Stress step passed");
    }

    info!(
        listed = report.listed,
        purchased = report.purchased,
        collected = report.collected,
        "Stress run finished"
    );
    Ok(report)
}

/// CLI entry point: run and print the report
pub async fn run(ledger_config: LedgerConfig, config: &StressConfig, json: bool) -> anyhow::Result<()> {
    let report = run_stress(ledger_config, config).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    display::section(&format!("Stress run (seed {})", config.seed));
    display::kv("Steps", config.iterations);
    display::kv("Listed", report.listed);
    display::kv("Oversell rejected", report.oversell_rejected);
    display::kv("Purchased", report.purchased);
    display::kv("Purchase rejected", report.purchase_rejected);
    display::kv("Repriced", report.repriced);
    display::kv("Delisted", report.delisted);
    display::kv("Index raised", report.index_raised);
    display::kv("Collections", report.collected);
    display::kv("Total payout", report.total_payout);
    println!();
    println!("{}", "All invariants held".bright_green().bold());
    Ok(())
}
