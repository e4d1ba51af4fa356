#![allow(clippy::unwrap_used)]

use super::*;
use crate::models::{Category, Transaction, TransactionType};
use rust_decimal_macros::dec;

fn seeded_db_with_rows() -> Database {
    let mut db = Database::open_in_memory().unwrap();
    let types = db.get_transaction_types().unwrap();
    let expense = TransactionType::find_by_name(&types, "expense")
        .unwrap()
        .id
        .unwrap();
    let income = TransactionType::find_by_name(&types, "income")
        .unwrap()
        .id
        .unwrap();
    let cats = db.get_categories().unwrap();
    let groceries = Category::find_by_name(&cats, "Groceries")
        .unwrap()
        .id
        .unwrap();

    db.insert_transaction(
        &Transaction::new(expense, dec!(12.50), "2024-03-05".into())
            .with_description("milk".into()),
        &[groceries],
    )
    .unwrap();
    db.insert_transaction(
        &Transaction::new(income, dec!(3000.00), "2024-04-01".into())
            .with_description("salary".into()),
        &[],
    )
    .unwrap();
    db
}

fn temp_path(file: &tempfile::NamedTempFile) -> String {
    file.path().to_str().unwrap().to_string()
}

#[test]
fn test_export_all() {
    let db = seeded_db_with_rows();
    let file = tempfile::NamedTempFile::new().unwrap();

    let count = export_to_csv(&db, &temp_path(&file), None).unwrap();
    assert_eq!(count, 2);

    let contents = std::fs::read_to_string(file.path()).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines[0], "id,date,type,amount,description,categories");
    assert_eq!(lines.len(), 3);
    // Newest first, same as the list surface.
    assert!(lines[1].contains("2024-04-01"));
    assert!(lines[1].contains("income"));
    assert!(lines[2].contains("milk"));
    assert!(lines[2].contains("12.50"));
    assert!(lines[2].contains("Groceries"));
}

#[test]
fn test_export_single_month() {
    let db = seeded_db_with_rows();
    let file = tempfile::NamedTempFile::new().unwrap();

    let count = export_to_csv(&db, &temp_path(&file), Some("2024-03")).unwrap();
    assert_eq!(count, 1);

    let contents = std::fs::read_to_string(file.path()).unwrap();
    assert!(contents.contains("2024-03-05"));
    assert!(!contents.contains("2024-04-01"));
}

#[test]
fn test_export_empty() {
    let db = Database::open_in_memory().unwrap();
    let file = tempfile::NamedTempFile::new().unwrap();

    let count = export_to_csv(&db, &temp_path(&file), None).unwrap();
    assert_eq!(count, 0);

    let contents = std::fs::read_to_string(file.path()).unwrap();
    assert_eq!(contents.lines().count(), 1);
}
