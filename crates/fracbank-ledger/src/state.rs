//! Ledger store
//!
//! One logically centralized store holds classes, balances, allowances,
//! revenue checkpoints and the prepaid credit counter. It is only mutated by
//! applying the [`ChangeSet`] of a committed [`Transaction`](crate::Transaction).

use std::collections::HashMap;

use fracbank_types::{AccountId, Amount, AssetClassId, FracBankEvent, PaymentTransfer};
use serde::{Deserialize, Serialize};

pub(crate) type HoldingKey = (AssetClassId, AccountId);
pub(crate) type AllowanceKey = (AssetClassId, AccountId, AccountId);

/// A named pool of fractional shares
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetClass {
    pub id: AssetClassId,
    pub max_supply: Amount,
    pub total_supply: Amount,
    /// Cumulative revenue per share, set by the administrator
    pub revenue_index: Amount,
}

impl AssetClass {
    pub fn new(id: AssetClassId, max_supply: Amount) -> Self {
        Self {
            id,
            max_supply,
            total_supply: Amount::zero(),
            revenue_index: Amount::zero(),
        }
    }

    /// Units that can still be minted
    pub fn remaining_supply(&self) -> Amount {
        self.max_supply.saturating_sub(self.total_supply)
    }
}

#[derive(Debug, Clone)]
pub(crate) struct LedgerState {
    pub(crate) classes: HashMap<AssetClassId, AssetClass>,
    pub(crate) balances: HashMap<HoldingKey, Amount>,
    pub(crate) allowances: HashMap<AllowanceKey, Amount>,
    pub(crate) checkpoints: HashMap<HoldingKey, Amount>,
    pub(crate) charged_streams: Amount,
    pub(crate) stream_unit_cost: Amount,
}

impl LedgerState {
    pub(crate) fn new(stream_unit_cost: Amount) -> Self {
        Self {
            classes: HashMap::new(),
            balances: HashMap::new(),
            allowances: HashMap::new(),
            checkpoints: HashMap::new(),
            charged_streams: Amount::zero(),
            stream_unit_cost,
        }
    }

    pub(crate) fn balance(&self, class_id: &AssetClassId, holder: &AccountId) -> Amount {
        self.balances
            .get(&(class_id.clone(), holder.clone()))
            .copied()
            .unwrap_or_default()
    }

    pub(crate) fn allowance(
        &self,
        class_id: &AssetClassId,
        owner: &AccountId,
        spender: &AccountId,
    ) -> Amount {
        self.allowances
            .get(&(class_id.clone(), owner.clone(), spender.clone()))
            .copied()
            .unwrap_or_default()
    }

    pub(crate) fn checkpoint(&self, class_id: &AssetClassId, holder: &AccountId) -> Amount {
        self.checkpoints
            .get(&(class_id.clone(), holder.clone()))
            .copied()
            .unwrap_or_default()
    }

    pub(crate) fn revenue_index(&self, class_id: &AssetClassId) -> Amount {
        self.classes
            .get(class_id)
            .map(|class| class.revenue_index)
            .unwrap_or_default()
    }

    /// Non-zero holdings of a class
    pub(crate) fn holdings(&self, class_id: &AssetClassId) -> Vec<(AccountId, Amount)> {
        self.balances
            .iter()
            .filter(|((class, _), amount)| class == class_id && !amount.is_zero())
            .map(|((_, holder), amount)| (holder.clone(), *amount))
            .collect()
    }

    /// Commit a transaction's writes; returns the events to publish
    pub(crate) fn apply(&mut self, changes: ChangeSet) -> Vec<FracBankEvent> {
        self.classes.extend(changes.classes);
        self.balances.extend(changes.balances);
        self.allowances.extend(changes.allowances);
        self.checkpoints.extend(changes.checkpoints);
        if let Some(charged) = changes.charged_streams {
            self.charged_streams = charged;
        }
        if let Some(cost) = changes.stream_unit_cost {
            self.stream_unit_cost = cost;
        }
        changes.events
    }
}

/// Writes, payments and events collected by a transaction
#[derive(Debug, Default)]
pub(crate) struct ChangeSet {
    pub(crate) classes: HashMap<AssetClassId, AssetClass>,
    pub(crate) balances: HashMap<HoldingKey, Amount>,
    pub(crate) allowances: HashMap<AllowanceKey, Amount>,
    pub(crate) checkpoints: HashMap<HoldingKey, Amount>,
    pub(crate) charged_streams: Option<Amount>,
    pub(crate) stream_unit_cost: Option<Amount>,
    pub(crate) payments: Vec<PaymentTransfer>,
    pub(crate) events: Vec<FracBankEvent>,
}
