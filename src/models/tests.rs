#![allow(clippy::unwrap_used)]

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::*;

// ── Transaction ───────────────────────────────────────────────

#[test]
fn test_month_prefix() {
    let txn = Transaction::new(1, dec!(12.50), "2024-03-15".into());
    assert_eq!(txn.month(), "2024-03");
}

#[test]
fn test_month_short_date() {
    let txn = Transaction::new(1, Decimal::ZERO, "2024".into());
    assert_eq!(txn.month(), "2024");
}

#[test]
fn test_abs_amount() {
    assert_eq!(
        Transaction::new(1, dec!(-42.99), "2024-01-01".into()).abs_amount(),
        dec!(42.99)
    );
    assert_eq!(
        Transaction::new(1, dec!(42.99), "2024-01-01".into()).abs_amount(),
        dec!(42.99)
    );
    assert_eq!(
        Transaction::new(1, Decimal::ZERO, "2024-01-01".into()).abs_amount(),
        Decimal::ZERO
    );
}

#[test]
fn test_with_description() {
    let txn =
        Transaction::new(1, dec!(5), "2024-01-01".into()).with_description("coffee".into());
    assert_eq!(txn.description.as_deref(), Some("coffee"));
}

#[test]
fn test_new_leaves_legacy_link_unset() {
    let txn = Transaction::new(1, dec!(5), "2024-01-01".into());
    assert!(txn.category_id.is_none());
}

// ── Category ──────────────────────────────────────────────────

fn sample_categories() -> Vec<Category> {
    vec![
        Category {
            id: Some(1),
            name: "Groceries".into(),
            color: "#4caf50".into(),
        },
        Category {
            id: Some(2),
            name: "Rent".into(),
            color: String::new(),
        },
    ]
}

#[test]
fn test_category_find_by_name_case_insensitive() {
    let cats = sample_categories();
    assert!(Category::find_by_name(&cats, "groceries").is_some());
    assert!(Category::find_by_name(&cats, "GROCERIES").is_some());
    assert!(Category::find_by_name(&cats, "fuel").is_none());
}

#[test]
fn test_category_find_by_id() {
    let cats = sample_categories();
    assert_eq!(Category::find_by_id(&cats, 2).unwrap().name, "Rent");
    assert!(Category::find_by_id(&cats, 99).is_none());
}

#[test]
fn test_category_display() {
    let cats = sample_categories();
    assert_eq!(cats[0].to_string(), "Groceries");
}

// ── TransactionType ───────────────────────────────────────────

#[test]
fn test_type_find_by_name() {
    let types = vec![
        TransactionType {
            id: Some(1),
            name: "expense".into(),
        },
        TransactionType {
            id: Some(2),
            name: "income".into(),
        },
    ];
    assert_eq!(
        TransactionType::find_by_name(&types, "Income").unwrap().id,
        Some(2)
    );
    assert!(TransactionType::find_by_name(&types, "budget").is_none());
    assert_eq!(TransactionType::find_by_id(&types, 1).unwrap().name, "expense");
}
