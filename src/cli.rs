use anyhow::Result;
use rust_decimal::Decimal;
use std::str::FromStr;

use crate::db::{schema, Database};
use crate::models::{Category, Transaction, TransactionType};

pub(crate) fn run(args: &[String], db: &mut Database) -> Result<()> {
    if args.len() < 2 {
        return cli_summary(&[], db);
    }
    match args[1].as_str() {
        "add" => cli_add(&args[2..], db),
        "list" | "ls" => cli_list(&args[2..], db),
        "delete" | "rm" => cli_delete(&args[2..], db),
        "tag" => cli_tag(&args[2..], db),
        "categories" => cli_categories(db),
        "category-add" => cli_category_add(&args[2..], db),
        "types" => cli_types(db),
        "type-add" => cli_type_add(&args[2..], db),
        "summary" | "s" => cli_summary(&args[2..], db),
        "export" => cli_export(&args[2..], db),
        "sync-dump" => cli_sync_dump(&args[2..], db),
        "schema" => cli_schema(&args[2..]),
        "--help" | "-h" | "help" => {
            print_usage();
            Ok(())
        }
        "--version" | "-V" | "version" => {
            println!("spendbook {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        other => {
            print_usage();
            anyhow::bail!("Unknown command: {other}");
        }
    }
}

fn print_usage() {
    println!("spendbook — local-first personal expense tracker");
    println!();
    println!("Usage: spendbook [command]");
    println!();
    println!("Commands:");
    println!("  (none)                        Current-month summary");
    println!("  add <amount>                  Record a transaction");
    println!("    --type <name>               Transaction type (default: expense)");
    println!("    --date <YYYY-MM-DD>         Date (default: today)");
    println!("    --desc <text>               Description");
    println!("    --category <name>           Tag with a category (repeatable)");
    println!("  list                          List transactions");
    println!("    --month <YYYY-MM>           Restrict to a month");
    println!("    --type <name>               Restrict to a type");
    println!("    --category <name>           Restrict to a category");
    println!("    --search <text>             Search descriptions");
    println!("    --limit <n>                 At most n rows (default: 50)");
    println!("  delete <id>                   Delete a transaction");
    println!("  tag <id> <category>...        Replace a transaction's categories");
    println!("  categories                    List categories");
    println!("  category-add <name>           Add a category");
    println!("    --color <#hex>              Chart color");
    println!("  types                         List transaction types");
    println!("  type-add <name>               Add a transaction type");
    println!("  summary [YYYY-MM]             Print monthly summary");
    println!("  export [path]                 Export transactions to CSV");
    println!("    --month <YYYY-MM>           Single month only (default: all)");
    println!("  sync-dump                     Print the sync snapshot as JSON");
    println!("  schema [table]                Print the table registry DDL");
    println!("  --help, -h                    Show this help");
    println!("  --version, -V                 Show version");
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

fn flag_values<'a>(args: &'a [String], flag: &str) -> Vec<&'a str> {
    args.windows(2)
        .filter(|w| w[0] == flag)
        .map(|w| w[1].as_str())
        .collect()
}

fn resolve_type(db: &Database, name: &str) -> Result<i64> {
    let types = db.get_transaction_types()?;
    TransactionType::find_by_name(&types, name)
        .and_then(|t| t.id)
        .ok_or_else(|| anyhow::anyhow!("Unknown transaction type: {name}"))
}

fn resolve_categories(db: &Database, names: &[&str]) -> Result<Vec<i64>> {
    let categories = db.get_categories()?;
    names
        .iter()
        .map(|name| {
            Category::find_by_name(&categories, name)
                .and_then(|c| c.id)
                .ok_or_else(|| anyhow::anyhow!("Unknown category: {name}"))
        })
        .collect()
}

fn cli_add(args: &[String], db: &mut Database) -> Result<()> {
    let amount_arg = args
        .first()
        .filter(|a| !a.starts_with("--"))
        .ok_or_else(|| anyhow::anyhow!("Usage: spendbook add <amount> [flags]"))?;
    let amount = Decimal::from_str(amount_arg)
        .map_err(|_| anyhow::anyhow!("Not a valid amount: {amount_arg}"))?;

    let type_name = flag_value(args, "--type").unwrap_or("expense");
    let type_id = resolve_type(db, type_name)?;
    let date = flag_value(args, "--date")
        .map(str::to_string)
        .unwrap_or_else(|| chrono::Local::now().format("%Y-%m-%d").to_string());
    let category_ids = resolve_categories(db, &flag_values(args, "--category"))?;

    let mut txn = Transaction::new(type_id, amount, date);
    if let Some(desc) = flag_value(args, "--desc") {
        txn = txn.with_description(desc.to_string());
    }

    match db.insert_transaction(&txn, &category_ids) {
        Ok(id) => {
            println!("Added transaction {id} ({type_name} {amount} on {})", txn.date);
            Ok(())
        }
        // Recoverable: show it and let the user correct the input.
        Err(err) if err.is_constraint() => anyhow::bail!("Rejected: {err}"),
        Err(err) => Err(err.into()),
    }
}

fn cli_list(args: &[String], db: &mut Database) -> Result<()> {
    let type_id = match flag_value(args, "--type") {
        Some(name) => Some(resolve_type(db, name)?),
        None => None,
    };
    let category_id = match flag_value(args, "--category") {
        Some(name) => Some(resolve_categories(db, &[name])?[0]),
        None => None,
    };
    let limit = match flag_value(args, "--limit") {
        Some(n) => n
            .parse::<u32>()
            .map_err(|_| anyhow::anyhow!("Not a valid limit: {n}"))?,
        None => 50,
    };

    let txns = db.get_transactions(
        Some(limit),
        None,
        type_id,
        category_id,
        flag_value(args, "--search"),
        flag_value(args, "--month"),
    )?;
    if txns.is_empty() {
        println!("No transactions");
        return Ok(());
    }

    let types = db.get_transaction_types()?;
    println!(
        "{:<6} {:<12} {:<10} {:>12}  {:<28} Categories",
        "ID", "Date", "Type", "Amount", "Description"
    );
    println!("{}", "─".repeat(92));
    for txn in &txns {
        let id = txn.id.unwrap_or(0);
        let type_name = TransactionType::find_by_id(&types, txn.type_id)
            .map(|t| t.name.as_str())
            .unwrap_or("?");
        let categories = db.categories_for_transaction(id)?;
        let names: Vec<&str> = categories.iter().map(|c| c.name.as_str()).collect();
        println!(
            "{:<6} {:<12} {:<10} {:>12}  {:<28} {}",
            id,
            txn.date,
            type_name,
            txn.amount.to_string(),
            txn.description.as_deref().unwrap_or(""),
            names.join(", "),
        );
    }
    Ok(())
}

fn cli_delete(args: &[String], db: &mut Database) -> Result<()> {
    let id: i64 = args
        .first()
        .and_then(|a| a.parse().ok())
        .ok_or_else(|| anyhow::anyhow!("Usage: spendbook delete <id>"))?;
    match db.delete_transaction(id) {
        Ok(()) => {
            println!("Deleted transaction {id}");
            Ok(())
        }
        Err(err) if err.is_not_found() => {
            println!("Transaction {id} not found");
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}

fn cli_tag(args: &[String], db: &mut Database) -> Result<()> {
    let id: i64 = args
        .first()
        .and_then(|a| a.parse().ok())
        .ok_or_else(|| anyhow::anyhow!("Usage: spendbook tag <id> <category>..."))?;
    let names: Vec<&str> = args[1..].iter().map(String::as_str).collect();
    let category_ids = resolve_categories(db, &names)?;
    db.set_transaction_categories(id, &category_ids)?;
    println!("Tagged transaction {id} with {} categories", category_ids.len());
    Ok(())
}

fn cli_categories(db: &mut Database) -> Result<()> {
    let categories = db.get_categories()?;
    if categories.is_empty() {
        println!("No categories");
        return Ok(());
    }
    println!("{:<6} {:<24} Color", "ID", "Name");
    println!("{}", "─".repeat(40));
    for cat in &categories {
        println!("{:<6} {:<24} {}", cat.id.unwrap_or(0), cat.name, cat.color);
    }
    Ok(())
}

fn cli_category_add(args: &[String], db: &mut Database) -> Result<()> {
    let name = args
        .first()
        .filter(|a| !a.starts_with("--"))
        .ok_or_else(|| anyhow::anyhow!("Usage: spendbook category-add <name> [--color <#hex>]"))?;
    let color = flag_value(args, "--color").unwrap_or("");
    let id = db.insert_category(&Category::new(name.clone(), color.to_string()))?;
    println!("Added category {id} ({name})");
    Ok(())
}

fn cli_types(db: &mut Database) -> Result<()> {
    let types = db.get_transaction_types()?;
    println!("{:<6} Name", "ID");
    println!("{}", "─".repeat(20));
    for ty in &types {
        println!("{:<6} {}", ty.id.unwrap_or(0), ty.name);
    }
    Ok(())
}

fn cli_type_add(args: &[String], db: &mut Database) -> Result<()> {
    let name = args
        .first()
        .ok_or_else(|| anyhow::anyhow!("Usage: spendbook type-add <name>"))?;
    let id = db.insert_transaction_type(&TransactionType::new(name.clone()))?;
    println!("Added transaction type {id} ({name})");
    Ok(())
}

fn cli_summary(args: &[String], db: &mut Database) -> Result<()> {
    let month = args
        .first()
        .filter(|a| !a.starts_with('-'))
        .cloned()
        .unwrap_or_else(|| chrono::Local::now().format("%Y-%m").to_string());

    let totals = db.get_monthly_totals(&month)?;
    let txn_count = db.get_transaction_count()?;

    println!("spendbook — {month}");
    println!("{}", "─".repeat(40));
    if totals.is_empty() {
        println!("  No transactions this month");
    }
    for (type_name, total) in &totals {
        println!("  {type_name:<12} {total}");
    }
    println!("  Total Txns: {txn_count}");

    let types = db.get_transaction_types()?;
    if let Some(expense_id) =
        TransactionType::find_by_name(&types, "expense").and_then(|t| t.id)
    {
        let spending = db.get_spending_by_category(&month, expense_id)?;
        if !spending.is_empty() {
            println!();
            println!("Spending by Category:");
            for (name, amount) in &spending {
                println!("  {name:<24} {}", amount.abs());
            }
        }
    }
    Ok(())
}

fn cli_export(args: &[String], db: &mut Database) -> Result<()> {
    let month = flag_value(args, "--month");
    let output_path = args
        .first()
        .filter(|a| !a.starts_with('-'))
        .map(|a| shellexpand(a))
        .unwrap_or_else(|| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".into());
            match month {
                Some(m) => format!("{home}/spendbook-export-{m}.csv"),
                None => format!("{home}/spendbook-export.csv"),
            }
        });

    let count = crate::export::export_to_csv(db, &output_path, month)?;
    if count == 0 {
        println!("No transactions to export");
    } else {
        println!("Exported {count} transactions to {output_path}");
    }
    Ok(())
}

fn cli_sync_dump(args: &[String], db: &mut Database) -> Result<()> {
    let snapshot = crate::sync::snapshot(db)?;
    let json = serde_json::to_string_pretty(&snapshot)?;
    if let Some(path) = args.first().filter(|a| !a.starts_with('-')) {
        let path = shellexpand(path);
        std::fs::write(&path, &json)?;
        println!("Wrote snapshot to {path}");
    } else {
        println!("{json}");
    }
    Ok(())
}

fn cli_schema(args: &[String]) -> Result<()> {
    if let Some(name) = args.first() {
        let table = schema::table(name)
            .ok_or_else(|| anyhow::anyhow!("Unknown table: {name}"))?;
        print_table(table);
    } else {
        for table in schema::TABLES {
            print_table(table);
        }
    }
    Ok(())
}

fn print_table(table: &schema::Table) {
    println!("{};", table.create_sql());
    for col in table.columns {
        if col.legacy {
            println!(
                "-- {}.{} is legacy: reads go through the join table, nothing writes it",
                table.name, col.name
            );
        }
    }
    println!();
}

pub(crate) fn shellexpand(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".into());
        format!("{home}/{rest}")
    } else {
        path.to_string()
    }
}
