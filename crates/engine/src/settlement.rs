//! Settlement solver.
//!
//! Turns net balances into point-to-point transfers with a greedy
//! largest-creditor / largest-debtor matching. Greedy matching does not
//! always reach the theoretical minimum number of transfers, but it
//! terminates within `N - 1` transfers for `N` nonzero balances, leaves
//! nothing unsettled and never emits a zero or negative transfer.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use serde::{Deserialize, Serialize};

use crate::{Balances, Currency, EngineError, MemberId, Money, ResultEngine};

/// A single payment from one member to another.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub from: MemberId,
    pub to: MemberId,
    pub amount: Money,
}

/// Remaining magnitude with the tie-break baked into the ordering: larger
/// magnitude first, then lower member id.
type HeapEntry = (u64, Reverse<MemberId>);

/// Computes transfers that bring every balance to zero.
///
/// All balances must share one currency and sum to exactly zero; otherwise
/// the ledger feeding the solver is corrupt and
/// [`EngineError::UnbalancedLedger`] is returned.
pub fn settle(balances: &Balances) -> ResultEngine<Vec<Transfer>> {
    let Some(currency) = balances.values().next().map(|b| b.currency()) else {
        return Ok(Vec::new());
    };
    ensure_balanced(balances, currency)?;

    let mut creditors: BinaryHeap<HeapEntry> = BinaryHeap::new();
    let mut debtors: BinaryHeap<HeapEntry> = BinaryHeap::new();
    for (member, balance) in balances {
        let magnitude = balance.minor().unsigned_abs();
        if balance.is_positive() {
            creditors.push((magnitude, Reverse(member.clone())));
        } else if balance.is_negative() {
            debtors.push((magnitude, Reverse(member.clone())));
        }
    }

    let mut transfers = Vec::new();
    loop {
        let (credit, debt) = match (creditors.pop(), debtors.pop()) {
            (None, None) => break,
            (Some(credit), Some(debt)) => (credit, debt),
            // Unreachable for a balanced input.
            _ => {
                return Err(EngineError::UnbalancedLedger {
                    currency,
                    residual: 0,
                });
            }
        };
        let (credit_left, Reverse(creditor)) = credit;
        let (debt_left, Reverse(debtor)) = debt;
        let paid = credit_left.min(debt_left);

        let amount = i64::try_from(paid).map_err(|_| EngineError::overflow())?;
        transfers.push(Transfer {
            from: debtor.clone(),
            to: creditor.clone(),
            amount: Money::new(amount, currency),
        });

        if credit_left > paid {
            creditors.push((credit_left - paid, Reverse(creditor)));
        }
        if debt_left > paid {
            debtors.push((debt_left - paid, Reverse(debtor)));
        }
    }

    tracing::debug!(
        members = balances.len(),
        transfers = transfers.len(),
        %currency,
        "settlement computed"
    );
    Ok(transfers)
}

/// Fails with `UnbalancedLedger` when balances span currencies or don't sum
/// to zero in `currency`.
fn ensure_balanced(balances: &Balances, currency: Currency) -> ResultEngine<()> {
    let mut residual: i128 = 0;
    let mut foreign = None;
    for (member, balance) in balances {
        if balance.currency() != currency {
            foreign.get_or_insert((member, balance.currency()));
            continue;
        }
        residual += i128::from(balance.minor());
    }
    if let Some((member, other)) = foreign {
        tracing::debug!(%member, %other, %currency, "balances span more than one currency");
    }
    if residual != 0 || foreign.is_some() {
        let residual = i64::try_from(residual).unwrap_or(if residual > 0 {
            i64::MAX
        } else {
            i64::MIN
        });
        return Err(EngineError::UnbalancedLedger { currency, residual });
    }
    Ok(())
}

/// Applies transfers to `balances`: each transfer credits `from` and debits
/// `to`. Settling a balanced map with [`settle`] and applying the result
/// leaves every balance at zero.
pub fn apply_transfers(balances: &Balances, transfers: &[Transfer]) -> ResultEngine<Balances> {
    let mut out = balances.clone();
    for transfer in transfers {
        let from = out
            .get_mut(&transfer.from)
            .ok_or_else(|| EngineError::UnknownMember(transfer.from.to_string()))?;
        *from = from.try_add(transfer.amount)?;
        let to = out
            .get_mut(&transfer.to)
            .ok_or_else(|| EngineError::UnknownMember(transfer.to.to_string()))?;
        *to = to.try_sub(transfer.amount)?;
    }
    Ok(out)
}
