//! Per-operation transaction boundary
//!
//! A [`Transaction`] reads through to the committed store and keeps every
//! write in its own overlay, along with the payment-asset transfers and events
//! the operation produces. The owning [`AssetLedger`](crate::AssetLedger)
//! settles the queued payments as one batch and only then applies the
//! overlay. Dropping a transaction discards everything it did.

use std::collections::HashMap;

use chrono::Utc;
use fracbank_types::{
    AccountId, Amount, AssetClassId, FracBankError, FracBankEvent, PaymentTransfer, Result,
};

use crate::state::{AllowanceKey, AssetClass, ChangeSet, HoldingKey, LedgerState};
use crate::streams;

pub struct Transaction<'a> {
    base: &'a LedgerState,
    administrator: &'a AccountId,
    ledger_account: &'a AccountId,
    default_max_supply: Amount,
    classes: HashMap<AssetClassId, AssetClass>,
    balances: HashMap<HoldingKey, Amount>,
    allowances: HashMap<AllowanceKey, Amount>,
    checkpoints: HashMap<HoldingKey, Amount>,
    charged_streams: Option<Amount>,
    stream_unit_cost: Option<Amount>,
    payments: Vec<PaymentTransfer>,
    events: Vec<FracBankEvent>,
}

impl<'a> Transaction<'a> {
    pub(crate) fn new(
        base: &'a LedgerState,
        administrator: &'a AccountId,
        ledger_account: &'a AccountId,
        default_max_supply: Amount,
    ) -> Self {
        Self {
            base,
            administrator,
            ledger_account,
            default_max_supply,
            classes: HashMap::new(),
            balances: HashMap::new(),
            allowances: HashMap::new(),
            checkpoints: HashMap::new(),
            charged_streams: None,
            stream_unit_cost: None,
            payments: Vec::new(),
            events: Vec::new(),
        }
    }

    pub(crate) fn into_changes(self) -> ChangeSet {
        ChangeSet {
            classes: self.classes,
            balances: self.balances,
            allowances: self.allowances,
            checkpoints: self.checkpoints,
            charged_streams: self.charged_streams,
            stream_unit_cost: self.stream_unit_cost,
            payments: self.payments,
            events: self.events,
        }
    }

    pub fn administrator(&self) -> &'a AccountId {
        self.administrator
    }

    /// The ledger's own payment-asset account (payout spender, credit pool)
    pub fn ledger_account(&self) -> &'a AccountId {
        self.ledger_account
    }

    // ========================================================================
    // Reads (overlay first, then committed state)
    // ========================================================================

    pub fn class(&self, class_id: &AssetClassId) -> Option<AssetClass> {
        self.classes
            .get(class_id)
            .or_else(|| self.base.classes.get(class_id))
            .cloned()
    }

    pub fn balance_of(&self, class_id: &AssetClassId, holder: &AccountId) -> Amount {
        self.balances
            .get(&(class_id.clone(), holder.clone()))
            .copied()
            .unwrap_or_else(|| self.base.balance(class_id, holder))
    }

    pub fn allowance(&self, class_id: &AssetClassId, owner: &AccountId, spender: &AccountId) -> Amount {
        self.allowances
            .get(&(class_id.clone(), owner.clone(), spender.clone()))
            .copied()
            .unwrap_or_else(|| self.base.allowance(class_id, owner, spender))
    }

    pub fn checkpoint(&self, class_id: &AssetClassId, holder: &AccountId) -> Amount {
        self.checkpoints
            .get(&(class_id.clone(), holder.clone()))
            .copied()
            .unwrap_or_else(|| self.base.checkpoint(class_id, holder))
    }

    pub fn revenue_index(&self, class_id: &AssetClassId) -> Amount {
        match self.classes.get(class_id) {
            Some(class) => class.revenue_index,
            None => self.base.revenue_index(class_id),
        }
    }

    pub fn charged_streams(&self) -> Amount {
        self.charged_streams.unwrap_or(self.base.charged_streams)
    }

    pub fn stream_unit_cost(&self) -> Amount {
        self.stream_unit_cost.unwrap_or(self.base.stream_unit_cost)
    }

    // ========================================================================
    // Writes
    // ========================================================================

    /// Class for mutation, created with the default cap on first reference
    pub(crate) fn class_mut(&mut self, class_id: &AssetClassId) -> &mut AssetClass {
        let base = self.base;
        let default_max_supply = self.default_max_supply;
        self.classes.entry(class_id.clone()).or_insert_with(|| {
            base.classes
                .get(class_id)
                .cloned()
                .unwrap_or_else(|| AssetClass::new(class_id.clone(), default_max_supply))
        })
    }

    pub(crate) fn set_balance(&mut self, class_id: &AssetClassId, holder: &AccountId, amount: Amount) {
        self.balances
            .insert((class_id.clone(), holder.clone()), amount);
    }

    pub(crate) fn set_allowance(
        &mut self,
        class_id: &AssetClassId,
        owner: &AccountId,
        spender: &AccountId,
        amount: Amount,
    ) {
        self.allowances
            .insert((class_id.clone(), owner.clone(), spender.clone()), amount);
    }

    pub(crate) fn set_checkpoint(&mut self, class_id: &AssetClassId, holder: &AccountId, index: Amount) {
        self.checkpoints
            .insert((class_id.clone(), holder.clone()), index);
    }

    pub(crate) fn set_charged_streams(&mut self, charged: Amount) {
        self.charged_streams = Some(charged);
    }

    pub(crate) fn set_stream_unit_cost(&mut self, cost: Amount) {
        self.stream_unit_cost = Some(cost);
    }

    /// Queue a payment-asset transfer, settled with the rest of the batch
    pub fn queue_payment(&mut self, transfer: PaymentTransfer) {
        self.payments.push(transfer);
    }

    /// Queue an event, published only if the transaction commits
    pub fn emit(&mut self, event: FracBankEvent) {
        self.events.push(event);
    }

    // ========================================================================
    // Share movements
    // ========================================================================

    /// Move `amount` shares from `from` to `to`
    ///
    /// Both parties' pending revenue is paid out against their pre-transfer
    /// balances and their checkpoints move to the current index before the
    /// balances change.
    pub fn transfer(
        &mut self,
        class_id: &AssetClassId,
        from: &AccountId,
        to: &AccountId,
        amount: Amount,
    ) -> Result<()> {
        require_class_id(class_id)?;
        let available = self.balance_of(class_id, from);
        let remaining = available
            .checked_sub(amount)
            .ok_or_else(|| FracBankError::InsufficientBalance {
                class_id: class_id.clone(),
                holder: from.clone(),
                requested: amount,
                available,
            })?;

        streams::settle_and_pay(self, class_id, from)?;
        if to != from {
            streams::settle_and_pay(self, class_id, to)?;
        }

        self.set_balance(class_id, from, remaining);
        let credited = self
            .balance_of(class_id, to)
            .checked_add(amount)
            .ok_or(FracBankError::AmountOverflow {
                operation: "transfer",
            })?;
        self.set_balance(class_id, to, credited);

        self.emit(FracBankEvent::Transferred {
            class_id: class_id.clone(),
            from: from.clone(),
            to: to.clone(),
            amount,
            timestamp: Utc::now(),
        });
        Ok(())
    }

    /// `spender` moves `from`'s shares against its allowance
    pub fn transfer_from(
        &mut self,
        class_id: &AssetClassId,
        spender: &AccountId,
        from: &AccountId,
        to: &AccountId,
        amount: Amount,
    ) -> Result<()> {
        require_class_id(class_id)?;
        let allowed = self.allowance(class_id, from, spender);
        let remaining = allowed
            .checked_sub(amount)
            .ok_or_else(|| FracBankError::AllowanceExceeded {
                class_id: class_id.clone(),
                owner: from.clone(),
                spender: spender.clone(),
                requested: amount,
                allowed,
            })?;
        self.set_allowance(class_id, from, spender, remaining);
        self.transfer(class_id, from, to, amount)
    }
}

/// The empty id is reserved for tombstoned listings
pub(crate) fn require_class_id(class_id: &AssetClassId) -> Result<()> {
    if class_id.is_empty() {
        return Err(FracBankError::UnknownAssetClass {
            class_id: class_id.clone(),
        });
    }
    Ok(())
}
