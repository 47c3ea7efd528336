//! FracBank Payment - the payment asset the ledger and marketplace settle in
//!
//! The payment asset is an external collaborator: a conventional fungible
//! token with `balanceOf` / `approve` / `allowance` / `transfer` /
//! `transferFrom`. FracBank only consumes it through the [`PaymentAsset`]
//! trait. [`InMemoryStableCoin`] is the in-process implementation used by
//! tests, the CLI and demos.
//!
//! Every call is synchronous from the caller's point of view and fails
//! immediately; there are no retries. `transfer_from_batch` is the one
//! addition to the standard surface: it applies a list of allowance-backed
//! transfers all-or-nothing, which is what lets a multi-party ledger
//! operation commit as a single unit.

use std::collections::HashMap;
use std::sync::Arc;

use fracbank_types::{AccountId, Amount, PaymentTransfer};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Errors raised by the payment asset
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaymentError {
    #[error("Insufficient balance for {holder}: requested {requested}, available {available}")]
    InsufficientBalance {
        holder: AccountId,
        requested: Amount,
        available: Amount,
    },

    #[error("Insufficient allowance for {spender} over {owner}: requested {requested}, allowed {allowed}")]
    InsufficientAllowance {
        owner: AccountId,
        spender: AccountId,
        requested: Amount,
        allowed: Amount,
    },

    #[error("Balance overflow for {holder}")]
    Overflow { holder: AccountId },
}

pub type PaymentResult<T> = std::result::Result<T, PaymentError>;

/// Standard fungible-token surface, with the caller made explicit
#[async_trait::async_trait]
pub trait PaymentAsset: Send + Sync {
    async fn balance_of(&self, holder: &AccountId) -> Amount;

    async fn allowance(&self, owner: &AccountId, spender: &AccountId) -> Amount;

    /// `owner` sets `spender`'s allowance (overwrite)
    async fn approve(&self, owner: &AccountId, spender: &AccountId, amount: Amount)
        -> PaymentResult<()>;

    /// `from` moves its own funds
    async fn transfer(&self, from: &AccountId, to: &AccountId, amount: Amount)
        -> PaymentResult<()>;

    /// `spender` moves `owner`'s funds against its allowance
    async fn transfer_from(
        &self,
        spender: &AccountId,
        owner: &AccountId,
        to: &AccountId,
        amount: Amount,
    ) -> PaymentResult<()>;

    /// Apply every transfer or none of them
    async fn transfer_from_batch(&self, transfers: &[PaymentTransfer]) -> PaymentResult<()>;
}

/// Token metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StableCoinConfig {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

impl Default for StableCoinConfig {
    fn default() -> Self {
        Self {
            name: "Mock Stable Coin".to_string(),
            symbol: "MSC".to_string(),
            decimals: 0,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct StableCoinState {
    balances: HashMap<AccountId, Amount>,
    allowances: HashMap<(AccountId, AccountId), Amount>,
    total_supply: Amount,
}

impl StableCoinState {
    fn balance(&self, holder: &AccountId) -> Amount {
        self.balances.get(holder).copied().unwrap_or_default()
    }

    fn allowance(&self, owner: &AccountId, spender: &AccountId) -> Amount {
        self.allowances
            .get(&(owner.clone(), spender.clone()))
            .copied()
            .unwrap_or_default()
    }

    fn move_funds(&mut self, from: &AccountId, to: &AccountId, amount: Amount) -> PaymentResult<()> {
        let available = self.balance(from);
        let debited = available
            .checked_sub(amount)
            .ok_or_else(|| PaymentError::InsufficientBalance {
                holder: from.clone(),
                requested: amount,
                available,
            })?;
        self.balances.insert(from.clone(), debited);

        let credited = self
            .balance(to)
            .checked_add(amount)
            .ok_or_else(|| PaymentError::Overflow { holder: to.clone() })?;
        self.balances.insert(to.clone(), credited);
        Ok(())
    }

    fn spend_allowance(&mut self, transfer: &PaymentTransfer) -> PaymentResult<()> {
        let allowed = self.allowance(&transfer.from, &transfer.spender);
        let remaining = allowed
            .checked_sub(transfer.amount)
            .ok_or_else(|| PaymentError::InsufficientAllowance {
                owner: transfer.from.clone(),
                spender: transfer.spender.clone(),
                requested: transfer.amount,
                allowed,
            })?;
        self.allowances
            .insert((transfer.from.clone(), transfer.spender.clone()), remaining);
        self.move_funds(&transfer.from, &transfer.to, transfer.amount)
    }
}

/// In-memory stablecoin
///
/// Cloning shares the underlying balances.
#[derive(Clone, Default)]
pub struct InMemoryStableCoin {
    config: StableCoinConfig,
    state: Arc<RwLock<StableCoinState>>,
}

impl InMemoryStableCoin {
    pub fn new() -> Self {
        Self::with_config(StableCoinConfig::default())
    }

    pub fn with_config(config: StableCoinConfig) -> Self {
        Self {
            config,
            state: Arc::new(RwLock::new(StableCoinState::default())),
        }
    }

    pub fn config(&self) -> &StableCoinConfig {
        &self.config
    }

    /// Issue new units to `to`
    pub async fn mint(&self, to: &AccountId, amount: Amount) -> PaymentResult<()> {
        let mut state = self.state.write().await;
        let balance = state
            .balance(to)
            .checked_add(amount)
            .ok_or_else(|| PaymentError::Overflow { holder: to.clone() })?;
        let total_supply = state
            .total_supply
            .checked_add(amount)
            .ok_or_else(|| PaymentError::Overflow { holder: to.clone() })?;
        state.balances.insert(to.clone(), balance);
        state.total_supply = total_supply;
        info!(to = %to.short(), %amount, symbol = %self.config.symbol, "Minted payment asset");
        Ok(())
    }

    pub async fn total_supply(&self) -> Amount {
        self.state.read().await.total_supply
    }
}

#[async_trait::async_trait]
impl PaymentAsset for InMemoryStableCoin {
    async fn balance_of(&self, holder: &AccountId) -> Amount {
        self.state.read().await.balance(holder)
    }

    async fn allowance(&self, owner: &AccountId, spender: &AccountId) -> Amount {
        self.state.read().await.allowance(owner, spender)
    }

    async fn approve(
        &self,
        owner: &AccountId,
        spender: &AccountId,
        amount: Amount,
    ) -> PaymentResult<()> {
        self.state
            .write()
            .await
            .allowances
            .insert((owner.clone(), spender.clone()), amount);
        debug!(owner = %owner.short(), spender = %spender.short(), %amount, "Payment approval");
        Ok(())
    }

    async fn transfer(&self, from: &AccountId, to: &AccountId, amount: Amount) -> PaymentResult<()> {
        let mut state = self.state.write().await;
        let mut next = state.clone();
        next.move_funds(from, to, amount)?;
        *state = next;
        debug!(from = %from.short(), to = %to.short(), %amount, "Payment transfer");
        Ok(())
    }

    async fn transfer_from(
        &self,
        spender: &AccountId,
        owner: &AccountId,
        to: &AccountId,
        amount: Amount,
    ) -> PaymentResult<()> {
        let transfer = PaymentTransfer::new(spender.clone(), owner.clone(), to.clone(), amount);
        self.transfer_from_batch(std::slice::from_ref(&transfer)).await
    }

    async fn transfer_from_batch(&self, transfers: &[PaymentTransfer]) -> PaymentResult<()> {
        let mut state = self.state.write().await;
        let mut next = state.clone();
        for transfer in transfers {
            next.spend_allowance(transfer)?;
        }
        *state = next;
        debug!(count = transfers.len(), "Payment batch settled");
        Ok(())
    }
}
