use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use engine::{
    Currency, Engine, EngineError, ExpenseDraft, MemberId, Money, Rate, RateTable, SplitRule,
    apply_transfers, settle,
};

fn date(m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, m, d).unwrap()
}

fn id(name: &str) -> MemberId {
    MemberId::new(name).unwrap()
}

fn rate(value: &str) -> Rate {
    Rate::new(Decimal::from_str(value).unwrap()).unwrap()
}

fn triples(transfers: &[engine::Transfer]) -> Vec<(&str, &str, i64)> {
    transfers
        .iter()
        .map(|t| (t.from.as_str(), t.to.as_str(), t.amount.minor()))
        .collect()
}

#[test]
fn equal_split_dinner_settles_to_payer() {
    let mut engine = Engine::builder().build();
    let group = engine
        .create_group("Flat", Currency::Usd, ["Alice", "Bob", "Carol"])
        .unwrap();
    engine
        .submit(group, ExpenseDraft::new("Dinner", "1.00", "Alice", date(1, 5)))
        .unwrap();

    let balances = engine.compute_balances(group).unwrap();
    assert_eq!(balances[&id("alice")], Money::new(66, Currency::Usd));
    assert_eq!(balances[&id("bob")], Money::new(-33, Currency::Usd));
    assert_eq!(balances[&id("carol")], Money::new(-33, Currency::Usd));

    let transfers = engine.settle(group, date(1, 5)).unwrap();
    assert_eq!(
        triples(&transfers),
        vec![("bob", "alice", 33), ("carol", "alice", 33)]
    );
}

#[test]
fn unbalanced_balances_are_an_integrity_violation() {
    let balances = [("a", 500), ("b", -300)]
        .into_iter()
        .map(|(name, minor)| (id(name), Money::new(minor, Currency::Usd)))
        .collect();
    let err = settle(&balances).unwrap_err();
    assert!(matches!(err, EngineError::UnbalancedLedger { residual: 200, .. }));
    assert!(err.is_integrity_violation());
}

#[test]
fn foreign_expense_without_rate_fails() {
    let mut engine = Engine::builder().build();
    let group = engine
        .create_group("Flat", Currency::Usd, ["Alice", "Bob"])
        .unwrap();
    let err = engine
        .submit(
            group,
            ExpenseDraft::new("Museum", "20.00", "Bob", date(2, 1)).currency(Currency::Eur),
        )
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::RateUnavailable {
            from: Currency::Eur,
            to: Currency::Usd,
            date: date(2, 1),
        }
    );
    assert!(engine.group(group).unwrap().expenses().is_empty());
}

#[test]
fn rate_published_after_expense_date_is_not_used() {
    let rates = RateTable::new().with_rate(Currency::Eur, Currency::Usd, date(3, 10), rate("1.08"));
    let mut engine = Engine::builder().rate_source(rates).build();
    let group = engine
        .create_group("Flat", Currency::Usd, ["Alice", "Bob"])
        .unwrap();
    let err = engine
        .submit(
            group,
            ExpenseDraft::new("Museum", "20.00", "Bob", date(3, 9)).currency(Currency::Eur),
        )
        .unwrap_err();
    assert!(matches!(err, EngineError::RateUnavailable { .. }));
}

#[test]
fn multi_currency_trip_settles_exactly() {
    let rates = RateTable::new()
        .with_rate(Currency::Eur, Currency::Usd, date(4, 1), rate("1.0837"))
        .with_rate(Currency::Usd, Currency::Jpy, date(4, 1), rate("151.25"));
    let mut engine = Engine::builder().rate_source(rates).build();
    let group = engine
        .create_group("Tour", Currency::Usd, ["Alice", "Bob", "Carol", "Dave"])
        .unwrap();

    let drafts = [
        ExpenseDraft::new("Hotel", "412.37", "Alice", date(4, 2)).currency(Currency::Eur),
        ExpenseDraft::new("Sushi", "18300", "Bob", date(4, 3))
            .currency(Currency::Jpy)
            .split(SplitRule::EqualAmong(vec!["Bob".into(), "Carol".into(), "Dave".into()])),
        ExpenseDraft::new("Train", "97.01", "Carol", date(4, 4)).split(SplitRule::Weighted(
            [("Alice".to_string(), 2), ("Dave".to_string(), 1)].into(),
        )),
        ExpenseDraft::new("Museum", "55.55", "Dave", date(4, 5)).currency(Currency::Eur),
    ];
    for draft in drafts {
        engine.submit(group, draft).unwrap();
    }

    let balances = engine.compute_balances(group).unwrap();
    let total: i64 = balances.values().map(|b| b.minor()).sum();
    assert_eq!(total, 0);
    assert!(balances.values().all(|b| b.currency() == Currency::Usd));

    let transfers = engine.settle(group, date(4, 30)).unwrap();
    assert!(transfers.len() <= 3);
    assert!(transfers.iter().all(|t| t.amount.is_positive()));
    let after = apply_transfers(&balances, &transfers).unwrap();
    assert!(after.values().all(|b| b.is_zero()));

    for transfer in &transfers {
        engine.record_settlement(group, transfer, date(4, 30)).unwrap();
    }
    assert!(engine.settle(group, date(4, 30)).unwrap().is_empty());
}

#[test]
fn settle_ignores_entries_after_as_of() {
    let mut engine = Engine::builder().build();
    let group = engine
        .create_group("Flat", Currency::Usd, ["Alice", "Bob"])
        .unwrap();
    engine
        .submit(group, ExpenseDraft::new("Rent", "1000.00", "Alice", date(5, 1)))
        .unwrap();
    engine
        .submit(group, ExpenseDraft::new("Power", "80.00", "Bob", date(5, 20)))
        .unwrap();

    let early = engine.settle(group, date(5, 10)).unwrap();
    assert_eq!(triples(&early), vec![("bob", "alice", 50_000)]);
    let late = engine.settle(group, date(5, 31)).unwrap();
    assert_eq!(triples(&late), vec![("bob", "alice", 46_000)]);
}

#[test]
fn reversed_foreign_expense_leaves_nothing_to_settle() {
    let rates = RateTable::new()
        .with_rate(Currency::Eur, Currency::Usd, date(1, 1), rate("1.10"))
        .with_rate(Currency::Eur, Currency::Usd, date(2, 1), rate("1.30"));
    let mut engine = Engine::builder().rate_source(rates).build();
    let group = engine
        .create_group("Flat", Currency::Usd, ["Alice", "Bob"])
        .unwrap();
    let expense = engine
        .submit(
            group,
            ExpenseDraft::new("Hotel", "100.00", "Alice", date(1, 10)).currency(Currency::Eur),
        )
        .unwrap();
    engine.reverse_expense(group, expense, date(2, 10)).unwrap();

    let balances = engine.compute_balances(group).unwrap();
    assert!(balances.values().all(|b| b.is_zero()));
    assert!(engine.settle(group, date(2, 28)).unwrap().is_empty());
    let totals = engine.category_totals(group, None).unwrap();
    assert!(totals.values().all(|t| t.is_zero()));
}

#[test]
fn reversal_dated_before_its_expense_is_rejected() {
    let mut engine = Engine::builder().build();
    let group = engine
        .create_group("Flat", Currency::Usd, ["Alice", "Bob"])
        .unwrap();
    let expense = engine
        .submit(group, ExpenseDraft::new("Rent", "10.00", "Bob", date(3, 10)))
        .unwrap();
    assert!(matches!(
        engine.reverse_expense(group, expense, date(1, 1)),
        Err(EngineError::InvalidSplit(_))
    ));
    let balances = engine.compute_balances_as_of(group, date(2, 1)).unwrap();
    assert!(balances.values().all(|b| b.is_zero()));
}

#[test]
fn engine_is_shareable_across_threads() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Engine>();
    assert_send_sync::<RateTable>();
}
