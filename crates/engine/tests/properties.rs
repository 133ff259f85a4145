use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;

use engine::{
    Balances, Currency, Engine, Expense, MemberId, Money, Rate, RateTable, apply_transfers, settle,
};

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
}

fn rates() -> RateTable {
    let rate = |value: &str| Rate::new(Decimal::from_str(value).unwrap()).unwrap();
    RateTable::new()
        .with_rate(Currency::Eur, Currency::Usd, day(), rate("1.0837"))
        .with_rate(Currency::Jpy, Currency::Usd, day(), rate("0.0067"))
}

fn currency_strategy() -> impl Strategy<Value = Currency> {
    prop_oneof![Just(Currency::Usd), Just(Currency::Eur), Just(Currency::Jpy)]
}

#[derive(Debug, Clone)]
struct RawExpense {
    payer: usize,
    minor: i64,
    currency: Currency,
    weights: Vec<u64>,
}

fn expense_strategy(members: usize) -> impl Strategy<Value = RawExpense> {
    (
        0..members,
        1i64..5_000_000,
        currency_strategy(),
        prop::collection::vec(1u64..5, members),
    )
        .prop_map(|(payer, minor, currency, weights)| RawExpense {
            payer,
            minor,
            currency,
            weights,
        })
}

fn group_strategy() -> impl Strategy<Value = (usize, Vec<RawExpense>)> {
    (2usize..7).prop_flat_map(|members| {
        (
            Just(members),
            prop::collection::vec(expense_strategy(members), 0..20),
        )
    })
}

fn balanced_strategy() -> impl Strategy<Value = Balances> {
    prop::collection::vec(-1_000_000i64..1_000_000, 1..12).prop_map(|values| {
        let residual: i64 = values.iter().sum();
        values
            .into_iter()
            .chain(std::iter::once(-residual))
            .enumerate()
            .map(|(i, minor)| {
                (
                    MemberId::new(&format!("m{i:02}")).unwrap(),
                    Money::new(minor, Currency::Usd),
                )
            })
            .collect()
    })
}

fn populated_engine(members: usize, expenses: &[RawExpense]) -> (Engine, uuid::Uuid) {
    let mut engine = Engine::builder().rate_source(rates()).build();
    let names: Vec<String> = (0..members).map(|i| format!("m{i}")).collect();
    let group = engine
        .create_group("Prop", Currency::Usd, names.iter().map(String::as_str))
        .unwrap();
    let ids: Vec<MemberId> = names.iter().map(|n| MemberId::new(n).unwrap()).collect();

    for raw in expenses {
        let amount = Money::new(raw.minor, raw.currency);
        let parts = amount.allocate(&raw.weights).unwrap();
        let shares: BTreeMap<MemberId, Money> = ids.iter().cloned().zip(parts).collect();
        let expense = Expense::new(group, ids[raw.payer].clone(), amount, shares, day());
        engine.add_expense(group, expense).unwrap();
    }
    (engine, group)
}

proptest! {
    #[test]
    fn allocate_conserves_total(minor in -10_000_000i64..10_000_000, weights in prop::collection::vec(0u64..50, 1..10)) {
        prop_assume!(weights.iter().any(|w| *w > 0));
        let parts = Money::new(minor, Currency::Eur).allocate(&weights).unwrap();
        let total: i64 = parts.iter().map(|p| p.minor()).sum();
        prop_assert_eq!(total, minor);
        for (part, weight) in parts.iter().zip(&weights) {
            if *weight == 0 {
                prop_assert!(part.is_zero());
            }
        }
    }

    #[test]
    fn balances_always_sum_to_zero((members, expenses) in group_strategy()) {
        let (engine, group) = populated_engine(members, &expenses);
        let balances = engine.compute_balances(group).unwrap();
        let total: i64 = balances.values().map(|b| b.minor()).sum();
        prop_assert_eq!(total, 0);
        prop_assert_eq!(balances.len(), members);
    }

    #[test]
    fn settlement_zeroes_ledger_balances((members, expenses) in group_strategy()) {
        let (engine, group) = populated_engine(members, &expenses);
        let balances = engine.compute_balances(group).unwrap();
        let transfers = engine.settle(group, day()).unwrap();
        let after = apply_transfers(&balances, &transfers).unwrap();
        prop_assert!(after.values().all(|b| b.is_zero()));
    }

    #[test]
    fn settlement_is_bounded_and_positive(balances in balanced_strategy()) {
        let transfers = settle(&balances).unwrap();
        let nonzero = balances.values().filter(|b| !b.is_zero()).count();
        prop_assert!(transfers.len() <= nonzero.saturating_sub(1));

        let largest = balances.values().map(|b| b.minor().unsigned_abs()).max().unwrap_or(0);
        for transfer in &transfers {
            prop_assert!(transfer.amount.is_positive());
            prop_assert!(transfer.amount.minor().unsigned_abs() <= largest);
            prop_assert_ne!(&transfer.from, &transfer.to);
        }

        let after = apply_transfers(&balances, &transfers).unwrap();
        prop_assert!(after.values().all(|b| b.is_zero()));
        prop_assert_eq!(settle(&balances).unwrap(), transfers);
    }
}
