use std::collections::HashMap;

use anyhow::{Context, Result};

use crate::db::Database;

/// Write transactions to a CSV file, all of them or a single "YYYY-MM"
/// month. Category names are joined with "; " in one column.
pub(crate) fn export_to_csv(db: &Database, path: &str, month: Option<&str>) -> Result<usize> {
    let txns = db.get_transactions(None, None, None, None, None, month)?;
    let type_names: HashMap<i64, String> = db
        .get_transaction_types()?
        .into_iter()
        .filter_map(|t| t.id.map(|id| (id, t.name)))
        .collect();

    let mut wtr =
        csv::Writer::from_path(path).with_context(|| format!("Failed to create {path}"))?;
    wtr.write_record(["id", "date", "type", "amount", "description", "categories"])?;

    for txn in &txns {
        let id = txn.id.unwrap_or(0);
        let categories = db.categories_for_transaction(id)?;
        let names: Vec<&str> = categories.iter().map(|c| c.name.as_str()).collect();
        wtr.write_record([
            id.to_string(),
            txn.date.clone(),
            type_names.get(&txn.type_id).cloned().unwrap_or_default(),
            txn.amount.to_string(),
            txn.description.clone().unwrap_or_default(),
            names.join("; "),
        ])?;
    }

    wtr.flush()?;
    Ok(txns.len())
}

#[cfg(test)]
#[path = "export_tests.rs"]
mod tests;
