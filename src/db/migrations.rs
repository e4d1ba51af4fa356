//! Forward-only schema history.
//!
//! Every step runs inside one SQLite transaction together with its journal
//! row; a failed step rolls back whole and aborts the run. Pending steps are
//! computed by position in `SEQUENCE`, never by searching names, and an
//! already-applied prefix is re-checked name-by-name so a tampered or
//! foreign journal is rejected instead of silently reinterpreted.

use chrono::Utc;
use rusqlite::{params, Connection};

use super::schema;
use crate::error::MigrationError;

pub(crate) struct Migration {
    pub(crate) name: &'static str,
    up: fn(&rusqlite::Transaction) -> rusqlite::Result<()>,
}

pub(crate) static SEQUENCE: &[Migration] = &[
    Migration {
        name: "m0000_initial_schema",
        up: m0000_initial_schema,
    },
    Migration {
        name: "m0001_transaction_tables",
        up: m0001_transaction_tables,
    },
    Migration {
        name: "m0002_migrate_budgets",
        up: m0002_migrate_budgets,
    },
    Migration {
        name: "m0003_migrate_expenses",
        up: m0003_migrate_expenses,
    },
    Migration {
        name: "m0004_drop_legacy_tables",
        up: m0004_drop_legacy_tables,
    },
    Migration {
        name: "m0005_category_colors",
        up: m0005_category_colors,
    },
    Migration {
        name: "m0006_transaction_categories",
        up: m0006_transaction_categories,
    },
];

/// Apply all pending steps of the canonical sequence. Returns how many were
/// applied (0 on an already-migrated database).
pub(crate) fn run(conn: &mut Connection) -> Result<usize, MigrationError> {
    run_sequence(conn, SEQUENCE)
}

pub(crate) fn run_sequence(
    conn: &mut Connection,
    sequence: &[Migration],
) -> Result<usize, MigrationError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            position   INTEGER PRIMARY KEY,
            name       TEXT NOT NULL,
            applied_at TEXT NOT NULL
        )",
        [],
    )?;

    let recorded = recorded_names(conn)?;
    if recorded.len() > sequence.len() {
        return Err(MigrationError::JournalAhead {
            recorded: recorded.len(),
            known: sequence.len(),
        });
    }
    for (position, (name, migration)) in recorded.iter().zip(sequence).enumerate() {
        if name != migration.name {
            return Err(MigrationError::NameMismatch {
                position,
                recorded: name.clone(),
                expected: migration.name,
            });
        }
    }

    let mut applied = 0;
    for (position, migration) in sequence.iter().enumerate().skip(recorded.len()) {
        let tx = conn.transaction()?;
        let result = (migration.up)(&tx).and_then(|()| {
            tx.execute(
                "INSERT INTO schema_migrations (position, name, applied_at) VALUES (?1, ?2, ?3)",
                params![position as i64, migration.name, Utc::now().to_rfc3339()],
            )
            .map(|_| ())
        });
        match result {
            Ok(()) => tx.commit()?,
            // Dropping the transaction rolls the whole step back.
            Err(source) => {
                return Err(MigrationError::StepFailed {
                    position,
                    name: migration.name,
                    source,
                })
            }
        }
        tracing::info!(position, name = migration.name, "applied migration");
        applied += 1;
    }
    Ok(applied)
}

fn recorded_names(conn: &Connection) -> Result<Vec<String>, MigrationError> {
    let mut stmt = conn.prepare("SELECT name FROM schema_migrations ORDER BY position")?;
    let rows = stmt.query_map([], |row| row.get(0))?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

// ── Steps ─────────────────────────────────────────────────────

/// Baseline: categories plus the original expenses/budgets split. Historical
/// DDL, written out literally; the registry only describes the final shape.
fn m0000_initial_schema(tx: &rusqlite::Transaction) -> rusqlite::Result<()> {
    tx.execute_batch(
        "CREATE TABLE categories (
            id   INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE
        );
        CREATE TABLE expenses (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            amount      TEXT NOT NULL,
            date        TEXT NOT NULL,
            description TEXT,
            category_id INTEGER REFERENCES categories(id)
        );
        CREATE TABLE budgets (
            id     INTEGER PRIMARY KEY AUTOINCREMENT,
            month  INTEGER NOT NULL,
            year   INTEGER NOT NULL,
            amount TEXT NOT NULL
        );",
    )
}

/// The unified transactions model, independent of the expenses/budgets
/// split. Both tables are current-shape, so their DDL comes off the registry.
fn m0001_transaction_tables(tx: &rusqlite::Transaction) -> rusqlite::Result<()> {
    tx.execute_batch(&format!(
        "{};
        {};
        CREATE INDEX idx_transactions_date ON transactions(date);
        CREATE INDEX idx_transactions_type ON transactions(type_id);
        CREATE INDEX idx_transactions_category ON transactions(category_id);",
        schema::transaction_types::TABLE.create_sql(),
        schema::transactions::TABLE.create_sql(),
    ))
}

/// Every budget row becomes a transaction dated the first of its month. The
/// 'budget' type row is only created when there is actually something to tag.
fn m0002_migrate_budgets(tx: &rusqlite::Transaction) -> rusqlite::Result<()> {
    let count: i64 = tx.query_row("SELECT COUNT(*) FROM budgets", [], |row| row.get(0))?;
    if count == 0 {
        return Ok(());
    }
    tx.execute(
        "INSERT INTO transaction_types (name)
         SELECT 'budget'
         WHERE NOT EXISTS (SELECT 1 FROM transaction_types WHERE name = 'budget')",
        [],
    )?;
    tx.execute(
        "INSERT INTO transactions (type_id, amount, date, description)
         SELECT (SELECT id FROM transaction_types WHERE name = 'budget'),
                amount,
                printf('%04d-%02d-01', year, month),
                NULL
         FROM budgets",
        [],
    )?;
    Ok(())
}

/// Expense rows keep their amount, date, description, and single-category
/// link verbatim.
fn m0003_migrate_expenses(tx: &rusqlite::Transaction) -> rusqlite::Result<()> {
    let count: i64 = tx.query_row("SELECT COUNT(*) FROM expenses", [], |row| row.get(0))?;
    if count == 0 {
        return Ok(());
    }
    tx.execute(
        "INSERT INTO transaction_types (name)
         SELECT 'expense'
         WHERE NOT EXISTS (SELECT 1 FROM transaction_types WHERE name = 'expense')",
        [],
    )?;
    tx.execute(
        "INSERT INTO transactions (type_id, amount, date, description, category_id)
         SELECT (SELECT id FROM transaction_types WHERE name = 'expense'),
                amount, date, description, category_id
         FROM expenses",
        [],
    )?;
    Ok(())
}

fn m0004_drop_legacy_tables(tx: &rusqlite::Transaction) -> rusqlite::Result<()> {
    tx.execute_batch("DROP TABLE expenses; DROP TABLE budgets;")
}

fn m0005_category_colors(tx: &rusqlite::Transaction) -> rusqlite::Result<()> {
    tx.execute(
        "ALTER TABLE categories ADD COLUMN color TEXT NOT NULL DEFAULT ''",
        [],
    )?;
    Ok(())
}

/// Many-to-many category tagging. Backfills one join row per transaction
/// that carried a legacy single-category link; the legacy column itself
/// stays on disk, informational only from here on.
fn m0006_transaction_categories(tx: &rusqlite::Transaction) -> rusqlite::Result<()> {
    tx.execute_batch(&format!(
        "{};
        CREATE INDEX idx_transaction_categories_transaction
            ON transaction_categories(transaction_id);
        CREATE INDEX idx_transaction_categories_category
            ON transaction_categories(category_id);",
        schema::transaction_categories::TABLE.create_sql(),
    ))?;
    tx.execute(
        "INSERT INTO transaction_categories (transaction_id, category_id)
         SELECT id, category_id FROM transactions WHERE category_id IS NOT NULL",
        [],
    )?;
    Ok(())
}

#[cfg(test)]
pub(crate) fn test_migration(
    name: &'static str,
    up: fn(&rusqlite::Transaction) -> rusqlite::Result<()>,
) -> Migration {
    Migration { name, up }
}
