//! Asset ledger
//!
//! Supply caps, balances and allowances for every asset class, behind one
//! writer at a time. Revenue stream operations live in [`crate::streams`] and
//! share the same store and transaction boundary.

use std::sync::Arc;

use chrono::Utc;
use fracbank_payment::PaymentAsset;
use fracbank_types::{AccountId, Amount, AssetClassId, FracBankError, FracBankEvent, Result};
use tokio::sync::{broadcast, RwLock};
use tracing::{info, warn};

use crate::config::LedgerConfig;
use crate::state::{AssetClass, LedgerState};
use crate::streams;
use crate::txn::{require_class_id, Transaction};

/// The FracBank asset ledger
///
/// Cloning shares the same store, payment handle and event bus.
#[derive(Clone)]
pub struct AssetLedger {
    config: LedgerConfig,
    /// Fixed privileged identity
    administrator: AccountId,
    /// The ledger's own account on the payment asset
    address: AccountId,
    pub(crate) payment: Arc<dyn PaymentAsset>,
    pub(crate) state: Arc<RwLock<LedgerState>>,
    events: broadcast::Sender<FracBankEvent>,
}

impl AssetLedger {
    /// Create an empty ledger administered by `administrator`
    pub fn new(config: LedgerConfig, administrator: AccountId, payment: Arc<dyn PaymentAsset>) -> Self {
        Self::with_address(config, administrator, AccountId::new(), payment)
    }

    /// Create with a known payment-asset account for the ledger
    pub fn with_address(
        config: LedgerConfig,
        administrator: AccountId,
        address: AccountId,
        payment: Arc<dyn PaymentAsset>,
    ) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        let state = LedgerState::new(config.stream_unit_cost);
        Self {
            config,
            administrator,
            address,
            payment,
            state: Arc::new(RwLock::new(state)),
            events,
        }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn administrator(&self) -> &AccountId {
        &self.administrator
    }

    /// Account the administrator approves for payouts and users approve for charges
    pub fn address(&self) -> &AccountId {
        &self.address
    }

    pub fn payment(&self) -> Arc<dyn PaymentAsset> {
        self.payment.clone()
    }

    /// Subscribe to committed events
    pub fn subscribe(&self) -> broadcast::Receiver<FracBankEvent> {
        self.events.subscribe()
    }

    /// Publish an event produced outside a ledger transaction
    pub fn publish(&self, event: FracBankEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    pub(crate) fn require_administrator(&self, caller: &AccountId, operation: &'static str) -> Result<()> {
        if caller != &self.administrator {
            return Err(FracBankError::NotAdministrator {
                operation,
                caller: caller.clone(),
            });
        }
        Ok(())
    }

    /// Run `f` as one atomic operation
    ///
    /// Holds the write lock for the whole call. On success the queued
    /// payments are settled as a single batch, then the writes are applied
    /// and the events published. Any failure, including a refused payment,
    /// leaves the store untouched.
    pub async fn atomically<T, F>(&self, operation: &'static str, f: F) -> Result<T>
    where
        F: FnOnce(&mut Transaction<'_>) -> Result<T>,
    {
        let mut state = self.state.write().await;

        let outcome = {
            let mut tx = Transaction::new(
                &state,
                &self.administrator,
                &self.address,
                self.config.default_max_supply,
            );
            match f(&mut tx) {
                Ok(value) => Ok((value, tx.into_changes())),
                Err(err) => Err(err),
            }
        };
        let (value, changes) = match outcome {
            Ok(committed) => committed,
            Err(err) => {
                warn!(operation, code = err.error_code(), error = %err, "Operation aborted");
                return Err(err);
            }
        };

        if !changes.payments.is_empty() {
            if let Err(err) = self.payment.transfer_from_batch(&changes.payments).await {
                warn!(operation, error = %err, "Operation aborted, payment refused");
                return Err(FracBankError::payment(err.to_string()));
            }
        }

        let events = state.apply(changes);
        drop(state);

        for event in events {
            self.publish(event);
        }
        Ok(value)
    }

    // ========================================================================
    // Administration
    // ========================================================================

    /// Set or overwrite the supply cap of a class
    ///
    /// A cap below what already circulates is rejected.
    pub async fn set_max_supply(&self, caller: &AccountId, class_id: &AssetClassId, cap: Amount) -> Result<()> {
        self.require_administrator(caller, "set_max_supply")?;
        self.atomically("set_max_supply", |tx| {
            require_class_id(class_id)?;
            let class = tx.class_mut(class_id);
            if cap < class.total_supply {
                return Err(FracBankError::CapBelowSupply {
                    class_id: class_id.clone(),
                    cap,
                    total_supply: class.total_supply,
                });
            }
            class.max_supply = cap;
            tx.emit(FracBankEvent::MaxSupplySet {
                class_id: class_id.clone(),
                max_supply: cap,
                timestamp: Utc::now(),
            });
            Ok(())
        })
        .await?;

        info!(class = %class_id, %cap, "Max supply set");
        Ok(())
    }

    /// Mint new shares to the administrator
    pub async fn mint(&self, caller: &AccountId, class_id: &AssetClassId, amount: Amount) -> Result<Amount> {
        self.require_administrator(caller, "mint")?;
        if amount.is_zero() {
            return Err(FracBankError::ZeroAmount { operation: "mint" });
        }

        let total_supply = self
            .atomically("mint", |tx| {
                require_class_id(class_id)?;
                let class = tx.class_mut(class_id).clone();
                let total_supply = class
                    .total_supply
                    .checked_add(amount)
                    .filter(|total| *total <= class.max_supply)
                    .ok_or_else(|| FracBankError::MaxSupplyExceeded {
                        class_id: class_id.clone(),
                        requested: amount,
                        total_supply: class.total_supply,
                        max_supply: class.max_supply,
                    })?;

                let administrator = tx.administrator();
                streams::settle_and_pay(tx, class_id, administrator)?;
                let credited = tx
                    .balance_of(class_id, administrator)
                    .checked_add(amount)
                    .ok_or(FracBankError::AmountOverflow { operation: "mint" })?;
                tx.set_balance(class_id, administrator, credited);
                tx.class_mut(class_id).total_supply = total_supply;

                tx.emit(FracBankEvent::Minted {
                    class_id: class_id.clone(),
                    to: administrator.clone(),
                    amount,
                    total_supply,
                    timestamp: Utc::now(),
                });
                Ok(total_supply)
            })
            .await?;

        info!(class = %class_id, %amount, %total_supply, "Minted shares");
        Ok(total_supply)
    }

    // ========================================================================
    // Transfers & allowances
    // ========================================================================

    /// Move the caller's shares to `to`
    pub async fn transfer(
        &self,
        caller: &AccountId,
        class_id: &AssetClassId,
        to: &AccountId,
        amount: Amount,
    ) -> Result<()> {
        self.atomically("transfer", |tx| tx.transfer(class_id, caller, to, amount))
            .await?;
        info!(class = %class_id, from = %caller.short(), to = %to.short(), %amount, "Transferred shares");
        Ok(())
    }

    /// Move `from`'s shares to `to` against the caller's allowance
    pub async fn transfer_from(
        &self,
        caller: &AccountId,
        class_id: &AssetClassId,
        from: &AccountId,
        to: &AccountId,
        amount: Amount,
    ) -> Result<()> {
        self.atomically("transfer_from", |tx| {
            tx.transfer_from(class_id, caller, from, to, amount)
        })
        .await?;
        info!(
            class = %class_id,
            spender = %caller.short(),
            from = %from.short(),
            to = %to.short(),
            %amount,
            "Transferred shares on allowance"
        );
        Ok(())
    }

    /// Set the spender's allowance over the caller's shares (last write wins)
    pub async fn approve(
        &self,
        caller: &AccountId,
        class_id: &AssetClassId,
        spender: &AccountId,
        amount: Amount,
    ) -> Result<()> {
        self.atomically("approve", |tx| {
            require_class_id(class_id)?;
            write_allowance(tx, class_id, caller, spender, amount);
            Ok(())
        })
        .await
    }

    pub async fn increase_allowance(
        &self,
        caller: &AccountId,
        class_id: &AssetClassId,
        spender: &AccountId,
        delta: Amount,
    ) -> Result<Amount> {
        self.atomically("increase_allowance", |tx| {
            require_class_id(class_id)?;
            let allowance = tx
                .allowance(class_id, caller, spender)
                .checked_add(delta)
                .ok_or(FracBankError::AmountOverflow {
                    operation: "increase_allowance",
                })?;
            write_allowance(tx, class_id, caller, spender, allowance);
            Ok(allowance)
        })
        .await
    }

    /// Fails rather than saturating when `delta` exceeds the allowance
    pub async fn decrease_allowance(
        &self,
        caller: &AccountId,
        class_id: &AssetClassId,
        spender: &AccountId,
        delta: Amount,
    ) -> Result<Amount> {
        self.atomically("decrease_allowance", |tx| {
            require_class_id(class_id)?;
            let current = tx.allowance(class_id, caller, spender);
            let allowance = current
                .checked_sub(delta)
                .ok_or_else(|| FracBankError::InsufficientAllowance {
                    class_id: class_id.clone(),
                    owner: caller.clone(),
                    spender: spender.clone(),
                    current,
                    decrease: delta,
                })?;
            write_allowance(tx, class_id, caller, spender, allowance);
            Ok(allowance)
        })
        .await
    }

    // ========================================================================
    // Reads
    // ========================================================================

    pub async fn balance_of(&self, class_id: &AssetClassId, holder: &AccountId) -> Amount {
        self.state.read().await.balance(class_id, holder)
    }

    pub async fn allowance(&self, class_id: &AssetClassId, owner: &AccountId, spender: &AccountId) -> Amount {
        self.state.read().await.allowance(class_id, owner, spender)
    }

    pub async fn total_supply(&self, class_id: &AssetClassId) -> Amount {
        self.state
            .read()
            .await
            .classes
            .get(class_id)
            .map(|class| class.total_supply)
            .unwrap_or_default()
    }

    pub async fn max_supply(&self, class_id: &AssetClassId) -> Amount {
        self.state
            .read()
            .await
            .classes
            .get(class_id)
            .map(|class| class.max_supply)
            .unwrap_or_default()
    }

    /// Snapshot of a class that has been referenced by an administrator call
    pub async fn asset_class(&self, class_id: &AssetClassId) -> Result<AssetClass> {
        self.state
            .read()
            .await
            .classes
            .get(class_id)
            .cloned()
            .ok_or_else(|| FracBankError::UnknownAssetClass {
                class_id: class_id.clone(),
            })
    }

    /// Holders with a non-zero balance in the class
    pub async fn holdings(&self, class_id: &AssetClassId) -> Vec<(AccountId, Amount)> {
        self.state.read().await.holdings(class_id)
    }
}

fn write_allowance(
    tx: &mut Transaction<'_>,
    class_id: &AssetClassId,
    owner: &AccountId,
    spender: &AccountId,
    amount: Amount,
) {
    tx.set_allowance(class_id, owner, spender, amount);
    tx.emit(FracBankEvent::Approval {
        class_id: class_id.clone(),
        owner: owner.clone(),
        spender: spender.clone(),
        amount,
        timestamp: Utc::now(),
    });
}
