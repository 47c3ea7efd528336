//! Revenue stream engine
//!
//! Pro-rata distribution without iterating holders: each class carries a
//! cumulative revenue index, each holder a checkpoint of the index at which
//! they were last settled. A holder is owed
//!
//! ```text
//! pending = max(0, index - checkpoint) * balance
//! ```
//!
//! which is only correct while the balance was constant since the checkpoint.
//! Every balance change therefore settles the holder first.
//!
//! Payouts come from the administrator's payment-asset balance through the
//! allowance the administrator granted to the ledger's account. Prepaid
//! stream charges flow the other way, from users into the ledger's account.

use chrono::Utc;
use fracbank_types::{
    AccountId, Amount, AssetClassId, FracBankError, FracBankEvent, PaymentTransfer, Result,
};
use tracing::{debug, info};

use crate::ledger::AssetLedger;
use crate::txn::{require_class_id, Transaction};

/// Revenue owed on `balance` shares held since `checkpoint`
///
/// An index moved below the checkpoint yields zero, never a negative payout.
pub fn pending_revenue(index: Amount, checkpoint: Amount, balance: Amount) -> Option<Amount> {
    index.saturating_sub(checkpoint).checked_mul(balance)
}

/// Compute the holder's pending revenue and advance their checkpoint
pub(crate) fn settle(
    tx: &mut Transaction<'_>,
    class_id: &AssetClassId,
    holder: &AccountId,
) -> Result<Amount> {
    let index = tx.revenue_index(class_id);
    let checkpoint = tx.checkpoint(class_id, holder);
    let balance = tx.balance_of(class_id, holder);
    let pending = pending_revenue(index, checkpoint, balance).ok_or(
        FracBankError::AmountOverflow {
            operation: "revenue settlement",
        },
    )?;
    tx.set_checkpoint(class_id, holder, index);
    Ok(pending)
}

/// Settle a holder ahead of a balance change and pay them what was pending
pub(crate) fn settle_and_pay(
    tx: &mut Transaction<'_>,
    class_id: &AssetClassId,
    holder: &AccountId,
) -> Result<Amount> {
    let payout = settle(tx, class_id, holder)?;
    if payout.is_zero() {
        return Ok(payout);
    }

    let administrator = tx.administrator();
    // The administrator funds payouts; paying itself moves nothing.
    if holder != administrator {
        tx.queue_payment(PaymentTransfer::new(
            tx.ledger_account().clone(),
            administrator.clone(),
            holder.clone(),
            payout,
        ));
    }
    debug!(class = %class_id, holder = %holder.short(), %payout, "Revenue settled on balance change");
    tx.emit(FracBankEvent::RevenueSettled {
        class_id: class_id.clone(),
        holder: holder.clone(),
        payout,
        timestamp: Utc::now(),
    });
    Ok(payout)
}

impl AssetLedger {
    /// Overwrite the revenue index of each class
    ///
    /// Parallel arrays. Monotonicity is not enforced; a lowered index just
    /// pays nothing to holders checkpointed above it.
    pub async fn set_streams(
        &self,
        caller: &AccountId,
        class_ids: &[AssetClassId],
        values: &[Amount],
    ) -> Result<()> {
        self.require_administrator(caller, "set_streams")?;
        if class_ids.len() != values.len() {
            return Err(FracBankError::ArityMismatch {
                operation: "set_streams",
                left: class_ids.len(),
                right: values.len(),
            });
        }

        self.atomically("set_streams", |tx| {
            for (class_id, value) in class_ids.iter().zip(values) {
                require_class_id(class_id)?;
                tx.class_mut(class_id).revenue_index = *value;
            }
            tx.emit(FracBankEvent::StreamsSet {
                class_ids: class_ids.to_vec(),
                values: values.to_vec(),
                timestamp: Utc::now(),
            });
            Ok(())
        })
        .await?;

        info!(classes = class_ids.len(), "Revenue streams updated");
        Ok(())
    }

    /// Collect the caller's pending revenue across `class_ids` in one payout
    ///
    /// All checkpoints advance and one aggregate payment is made, or the
    /// call fails and nothing moves. Returns the total payout.
    pub async fn collect_income(
        &self,
        caller: &AccountId,
        class_ids: &[AssetClassId],
    ) -> Result<Amount> {
        let total_payout = self
            .atomically("collect_income", |tx| {
                let mut total_payout = Amount::zero();
                for class_id in class_ids {
                    require_class_id(class_id)?;
                    let pending = settle(tx, class_id, caller)?;
                    total_payout = total_payout.checked_add(pending).ok_or(
                        FracBankError::AmountOverflow {
                            operation: "collect_income",
                        },
                    )?;
                }

                let administrator = tx.administrator();
                if !total_payout.is_zero() && caller != administrator {
                    tx.queue_payment(PaymentTransfer::new(
                        tx.ledger_account().clone(),
                        administrator.clone(),
                        caller.clone(),
                        total_payout,
                    ));
                }
                tx.emit(FracBankEvent::IncomeCollected {
                    holder: caller.clone(),
                    class_ids: class_ids.to_vec(),
                    total_payout,
                    timestamp: Utc::now(),
                });
                Ok(total_payout)
            })
            .await?;

        info!(holder = %caller.short(), classes = class_ids.len(), %total_payout, "Income collected");
        Ok(total_payout)
    }

    /// Set the payment-asset cost of one prepaid stream unit
    pub async fn set_stream_unit_cost(&self, caller: &AccountId, value: Amount) -> Result<()> {
        self.require_administrator(caller, "set_stream_unit_cost")?;
        self.atomically("set_stream_unit_cost", |tx| {
            tx.set_stream_unit_cost(value);
            tx.emit(FracBankEvent::StreamCostSet {
                stream_unit_cost: value,
                timestamp: Utc::now(),
            });
            Ok(())
        })
        .await
    }

    /// Pull `count * stream_unit_cost` from each user into the credit pool
    ///
    /// Every user must have approved the ledger's account. One user short of
    /// allowance or balance aborts the whole call. Returns the total charged.
    pub async fn charge_for_streams(
        &self,
        caller: &AccountId,
        users: &[AccountId],
        counts: &[Amount],
    ) -> Result<Amount> {
        self.require_administrator(caller, "charge_for_streams")?;
        if users.len() != counts.len() {
            return Err(FracBankError::ArityMismatch {
                operation: "charge_for_streams",
                left: users.len(),
                right: counts.len(),
            });
        }

        let total_cost = self
            .atomically("charge_for_streams", |tx| {
                let overflow = FracBankError::AmountOverflow {
                    operation: "charge_for_streams",
                };
                let unit_cost = tx.stream_unit_cost();
                let pool = tx.ledger_account();
                let mut total_cost = Amount::zero();
                let mut charged = tx.charged_streams();

                for (user, count) in users.iter().zip(counts) {
                    let cost = count.checked_mul(unit_cost).ok_or(overflow.clone())?;
                    if !cost.is_zero() {
                        tx.queue_payment(PaymentTransfer::new(
                            pool.clone(),
                            user.clone(),
                            pool.clone(),
                            cost,
                        ));
                    }
                    total_cost = total_cost.checked_add(cost).ok_or(overflow.clone())?;
                    charged = charged.checked_add(*count).ok_or(overflow.clone())?;
                }

                tx.set_charged_streams(charged);
                tx.emit(FracBankEvent::StreamsCharged {
                    users: users.to_vec(),
                    counts: counts.to_vec(),
                    total_cost,
                    timestamp: Utc::now(),
                });
                Ok(total_cost)
            })
            .await?;

        info!(users = users.len(), %total_cost, "Streams charged");
        Ok(total_cost)
    }

    /// What `collect_income` would pay the holder for one class right now
    pub async fn pending_income(&self, class_id: &AssetClassId, holder: &AccountId) -> Result<Amount> {
        let state = self.state.read().await;
        pending_revenue(
            state.revenue_index(class_id),
            state.checkpoint(class_id, holder),
            state.balance(class_id, holder),
        )
        .ok_or(FracBankError::AmountOverflow {
            operation: "pending_income",
        })
    }

    pub async fn revenue_index(&self, class_id: &AssetClassId) -> Amount {
        self.state.read().await.revenue_index(class_id)
    }

    pub async fn checkpoint(&self, class_id: &AssetClassId, holder: &AccountId) -> Amount {
        self.state.read().await.checkpoint(class_id, holder)
    }

    /// Units of revenue generation prepaid so far
    pub async fn charged_streams(&self) -> Amount {
        self.state.read().await.charged_streams
    }

    pub async fn stream_unit_cost(&self) -> Amount {
        self.state.read().await.stream_unit_cost
    }

    /// Payment-asset funds held in the prepaid credit pool
    pub async fn prepaid_pool_balance(&self) -> Amount {
        self.payment.balance_of(self.address()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_is_index_delta_times_stake() {
        let pending = pending_revenue(Amount::new(2000), Amount::new(1000), Amount::new(500));
        assert_eq!(pending, Some(Amount::new(500_000)));
    }

    #[test]
    fn test_pending_clamps_backward_index() {
        let pending = pending_revenue(Amount::new(1000), Amount::new(4000), Amount::new(500));
        assert_eq!(pending, Some(Amount::zero()));
    }

    #[test]
    fn test_pending_overflow_detected() {
        let pending = pending_revenue(Amount::new(u128::MAX), Amount::zero(), Amount::new(2));
        assert_eq!(pending, None);
    }
}
