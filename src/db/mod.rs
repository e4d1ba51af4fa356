mod migrations;
pub(crate) mod schema;

use std::path::Path;
use std::str::FromStr;

use rusqlite::{params, Connection};
use rust_decimal::Decimal;

use crate::error::{StoreError, StoreResult};
use crate::models::*;

pub(crate) struct Database {
    conn: Connection,
}

impl Database {
    pub(crate) fn open(path: &Path) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        let mut db = Self { conn };
        let applied = migrations::run(&mut db.conn)?;
        if applied > 0 {
            tracing::info!(applied, path = %path.display(), "database migrated");
        }
        schema::verify(&db.conn)?;
        db.seed_defaults()?;
        Ok(db)
    }

    #[cfg(test)]
    pub(crate) fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        let mut db = Self { conn };
        migrations::run(&mut db.conn)?;
        schema::verify(&db.conn)?;
        db.seed_defaults()?;
        Ok(db)
    }

    /// Seeding happens at open, never inside a migration step, so the
    /// sequence itself stays data-free. Guarded by row counts: a reopened
    /// or migrated-from-legacy database is left alone.
    fn seed_defaults(&mut self) -> StoreResult<()> {
        let type_count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM transaction_types", [], |row| {
                    row.get(0)
                })?;
        if type_count == 0 {
            let tx = self.conn.transaction()?;
            for name in ["expense", "income"] {
                tx.execute(
                    "INSERT OR IGNORE INTO transaction_types (name) VALUES (?1)",
                    params![name],
                )?;
            }
            tx.commit()?;
        }

        let category_count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM categories", [], |row| row.get(0))?;
        if category_count == 0 {
            let defaults = [
                ("Entertainment", "#9c27b0"),
                ("Groceries", "#4caf50"),
                ("Health", "#f44336"),
                ("Housing", "#795548"),
                ("Restaurants", "#ff9800"),
                ("Salary", "#8bc34a"),
                ("Shopping", "#e91e63"),
                ("Transportation", "#2196f3"),
                ("Travel", "#00bcd4"),
                ("Uncategorized", ""),
                ("Utilities", "#607d8b"),
            ];
            let tx = self.conn.transaction()?;
            for (name, color) in &defaults {
                tx.execute(
                    "INSERT OR IGNORE INTO categories (name, color) VALUES (?1, ?2)",
                    params![name, color],
                )?;
            }
            tx.commit()?;
        }
        Ok(())
    }

    // ── Categories ────────────────────────────────────────────

    pub(crate) fn get_categories(&self) -> StoreResult<Vec<Category>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, color FROM categories ORDER BY name")?;
        let rows = stmt.query_map([], |row| {
            Ok(Category {
                id: Some(row.get(0)?),
                name: row.get(1)?,
                color: row.get(2)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub(crate) fn get_category_by_id(&self, id: i64) -> StoreResult<Option<Category>> {
        let result = self.conn.query_row(
            "SELECT id, name, color FROM categories WHERE id = ?1",
            params![id],
            |row| {
                Ok(Category {
                    id: Some(row.get(0)?),
                    name: row.get(1)?,
                    color: row.get(2)?,
                })
            },
        );
        match result {
            Ok(c) => Ok(Some(c)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub(crate) fn insert_category(&self, cat: &Category) -> StoreResult<i64> {
        self.conn.execute(
            "INSERT INTO categories (name, color) VALUES (?1, ?2)",
            params![cat.name, cat.color],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub(crate) fn update_category(&self, id: i64, cat: &Category) -> StoreResult<()> {
        let rows = self.conn.execute(
            "UPDATE categories SET name = ?1, color = ?2 WHERE id = ?3",
            params![cat.name, cat.color, id],
        )?;
        if rows == 0 {
            return Err(StoreError::NotFound {
                entity: "category",
                id,
            });
        }
        Ok(())
    }

    pub(crate) fn delete_category(&self, id: i64) -> StoreResult<()> {
        let rows = self
            .conn
            .execute("DELETE FROM categories WHERE id = ?1", params![id])?;
        if rows == 0 {
            return Err(StoreError::NotFound {
                entity: "category",
                id,
            });
        }
        Ok(())
    }

    // ── Transaction types ─────────────────────────────────────

    pub(crate) fn get_transaction_types(&self) -> StoreResult<Vec<TransactionType>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name FROM transaction_types ORDER BY name")?;
        let rows = stmt.query_map([], |row| {
            Ok(TransactionType {
                id: Some(row.get(0)?),
                name: row.get(1)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub(crate) fn get_transaction_type_by_id(
        &self,
        id: i64,
    ) -> StoreResult<Option<TransactionType>> {
        let result = self.conn.query_row(
            "SELECT id, name FROM transaction_types WHERE id = ?1",
            params![id],
            |row| {
                Ok(TransactionType {
                    id: Some(row.get(0)?),
                    name: row.get(1)?,
                })
            },
        );
        match result {
            Ok(t) => Ok(Some(t)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub(crate) fn insert_transaction_type(&self, ty: &TransactionType) -> StoreResult<i64> {
        self.conn.execute(
            "INSERT INTO transaction_types (name) VALUES (?1)",
            params![ty.name],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub(crate) fn update_transaction_type(&self, id: i64, ty: &TransactionType) -> StoreResult<()> {
        let rows = self.conn.execute(
            "UPDATE transaction_types SET name = ?1 WHERE id = ?2",
            params![ty.name, id],
        )?;
        if rows == 0 {
            return Err(StoreError::NotFound {
                entity: "transaction type",
                id,
            });
        }
        Ok(())
    }

    pub(crate) fn delete_transaction_type(&self, id: i64) -> StoreResult<()> {
        let rows = self
            .conn
            .execute("DELETE FROM transaction_types WHERE id = ?1", params![id])?;
        if rows == 0 {
            return Err(StoreError::NotFound {
                entity: "transaction type",
                id,
            });
        }
        Ok(())
    }

    // ── Transactions ──────────────────────────────────────────

    /// Writes the row and its category tags as one unit. Note the legacy
    /// `category_id` column is not in the column list: membership goes
    /// through the join table only.
    pub(crate) fn insert_transaction(
        &mut self,
        txn: &Transaction,
        category_ids: &[i64],
    ) -> StoreResult<i64> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO transactions (type_id, amount, date, description)
             VALUES (?1, ?2, ?3, ?4)",
            params![txn.type_id, txn.amount.to_string(), txn.date, txn.description],
        )?;
        let id = tx.last_insert_rowid();
        for cid in category_ids {
            tx.execute(
                "INSERT INTO transaction_categories (transaction_id, category_id) VALUES (?1, ?2)",
                params![id, cid],
            )?;
        }
        tx.commit()?;
        Ok(id)
    }

    pub(crate) fn update_transaction(
        &mut self,
        id: i64,
        txn: &Transaction,
        category_ids: &[i64],
    ) -> StoreResult<()> {
        let tx = self.conn.transaction()?;
        let rows = tx.execute(
            "UPDATE transactions SET type_id = ?1, amount = ?2, date = ?3, description = ?4
             WHERE id = ?5",
            params![txn.type_id, txn.amount.to_string(), txn.date, txn.description, id],
        )?;
        if rows == 0 {
            return Err(StoreError::NotFound {
                entity: "transaction",
                id,
            });
        }
        tx.execute(
            "DELETE FROM transaction_categories WHERE transaction_id = ?1",
            params![id],
        )?;
        for cid in category_ids {
            tx.execute(
                "INSERT INTO transaction_categories (transaction_id, category_id) VALUES (?1, ?2)",
                params![id, cid],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    pub(crate) fn get_transaction_by_id(&self, id: i64) -> StoreResult<Option<Transaction>> {
        let result = self.conn.query_row(
            "SELECT id, type_id, amount, date, description, category_id
             FROM transactions WHERE id = ?1",
            params![id],
            Self::map_transaction,
        );
        match result {
            Ok(t) => Ok(Some(t)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub(crate) fn get_transactions(
        &self,
        limit: Option<u32>,
        offset: Option<u32>,
        type_id: Option<i64>,
        category_id: Option<i64>,
        search: Option<&str>,
        month: Option<&str>,
    ) -> StoreResult<Vec<Transaction>> {
        let mut sql = String::from(
            "SELECT t.id, t.type_id, t.amount, t.date, t.description, t.category_id
             FROM transactions t WHERE 1=1",
        );
        let mut param_values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

        if let Some(tid) = type_id {
            sql.push_str(&format!(" AND t.type_id = ?{}", param_values.len() + 1));
            param_values.push(Box::new(tid));
        }
        if let Some(cid) = category_id {
            // Membership is read through the join table, never the legacy column.
            sql.push_str(&format!(
                " AND t.id IN (SELECT transaction_id FROM transaction_categories WHERE category_id = ?{})",
                param_values.len() + 1
            ));
            param_values.push(Box::new(cid));
        }
        if let Some(s) = search {
            sql.push_str(&format!(
                " AND t.description LIKE ?{}",
                param_values.len() + 1
            ));
            param_values.push(Box::new(format!("%{s}%")));
        }
        if let Some(m) = month {
            sql.push_str(&format!(" AND t.date LIKE ?{}", param_values.len() + 1));
            param_values.push(Box::new(format!("{m}%")));
        }

        sql.push_str(" ORDER BY t.date DESC, t.id DESC");

        if let Some(l) = limit {
            sql.push_str(&format!(" LIMIT {l}"));
        }
        if let Some(o) = offset {
            sql.push_str(&format!(" OFFSET {o}"));
        }

        let params_ref: Vec<&dyn rusqlite::types::ToSql> =
            param_values.iter().map(|p| p.as_ref()).collect();

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_ref.as_slice(), Self::map_transaction)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub(crate) fn delete_transaction(&self, id: i64) -> StoreResult<()> {
        // Join rows go with it (ON DELETE CASCADE).
        let rows = self
            .conn
            .execute("DELETE FROM transactions WHERE id = ?1", params![id])?;
        if rows == 0 {
            return Err(StoreError::NotFound {
                entity: "transaction",
                id,
            });
        }
        Ok(())
    }

    pub(crate) fn get_transaction_count(&self) -> StoreResult<i64> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM transactions", [], |row| row.get(0))?)
    }

    pub(crate) fn categories_for_transaction(&self, id: i64) -> StoreResult<Vec<Category>> {
        let mut stmt = self.conn.prepare(
            "SELECT c.id, c.name, c.color
             FROM categories c
             JOIN transaction_categories tc ON tc.category_id = c.id
             WHERE tc.transaction_id = ?1
             ORDER BY c.name",
        )?;
        let rows = stmt.query_map(params![id], |row| {
            Ok(Category {
                id: Some(row.get(0)?),
                name: row.get(1)?,
                color: row.get(2)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Replace a transaction's tag set wholesale.
    pub(crate) fn set_transaction_categories(
        &mut self,
        id: i64,
        category_ids: &[i64],
    ) -> StoreResult<()> {
        let tx = self.conn.transaction()?;
        let exists: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM transactions WHERE id = ?1)",
            params![id],
            |row| row.get(0),
        )?;
        if !exists {
            return Err(StoreError::NotFound {
                entity: "transaction",
                id,
            });
        }
        tx.execute(
            "DELETE FROM transaction_categories WHERE transaction_id = ?1",
            params![id],
        )?;
        for cid in category_ids {
            tx.execute(
                "INSERT INTO transaction_categories (transaction_id, category_id) VALUES (?1, ?2)",
                params![id, cid],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    fn map_transaction(row: &rusqlite::Row<'_>) -> rusqlite::Result<Transaction> {
        let amount_str: String = row.get(2)?;
        Ok(Transaction {
            id: Some(row.get(0)?),
            type_id: row.get(1)?,
            amount: Decimal::from_str(&amount_str).unwrap_or_default(),
            date: row.get(3)?,
            description: row.get(4)?,
            category_id: row.get(5)?,
        })
    }

    // ── Analytics ─────────────────────────────────────────────

    /// Per-type totals for a month, e.g. [("expense", 812.40), ("income", 3000)].
    pub(crate) fn get_monthly_totals(&self, month: &str) -> StoreResult<Vec<(String, Decimal)>> {
        let mut stmt = self.conn.prepare(
            "SELECT tt.name, CAST(SUM(t.amount) AS TEXT)
             FROM transactions t
             JOIN transaction_types tt ON t.type_id = tt.id
             WHERE t.date LIKE ?1
             GROUP BY tt.name
             ORDER BY tt.name",
        )?;
        let rows = stmt.query_map(params![format!("{month}%")], |row| {
            let name: String = row.get(0)?;
            let amt_str: String = row.get(1)?;
            Ok((name, Decimal::from_str(&amt_str).unwrap_or_default()))
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Per-category totals for a month, restricted to one transaction type,
    /// read through the join table. Untagged transactions do not appear.
    pub(crate) fn get_spending_by_category(
        &self,
        month: &str,
        type_id: i64,
    ) -> StoreResult<Vec<(String, Decimal)>> {
        let mut stmt = self.conn.prepare(
            "SELECT c.name, CAST(SUM(t.amount) AS TEXT)
             FROM transactions t
             JOIN transaction_categories tc ON tc.transaction_id = t.id
             JOIN categories c ON c.id = tc.category_id
             WHERE t.date LIKE ?1 AND t.type_id = ?2
             GROUP BY c.name
             ORDER BY SUM(CAST(t.amount AS REAL)) DESC",
        )?;
        let rows = stmt.query_map(params![format!("{month}%"), type_id], |row| {
            let name: String = row.get(0)?;
            let amt_str: String = row.get(1)?;
            Ok((name, Decimal::from_str(&amt_str).unwrap_or_default()))
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// (month, income, expenses) per month, oldest first.
    pub(crate) fn get_monthly_trend(
        &self,
        months: usize,
    ) -> StoreResult<Vec<(String, Decimal, Decimal)>> {
        let mut stmt = self.conn.prepare(
            "SELECT strftime('%Y-%m', t.date) AS month,
                    CAST(SUM(CASE WHEN tt.name = 'income' THEN t.amount ELSE 0 END) AS TEXT),
                    CAST(SUM(CASE WHEN tt.name = 'expense' THEN t.amount ELSE 0 END) AS TEXT)
             FROM transactions t
             JOIN transaction_types tt ON t.type_id = tt.id
             GROUP BY month
             ORDER BY month DESC
             LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![months as i64], |row| {
            let month: String = row.get(0)?;
            let inc_str: String = row.get(1)?;
            let exp_str: String = row.get(2)?;
            Ok((
                month,
                Decimal::from_str(&inc_str).unwrap_or_default(),
                Decimal::from_str(&exp_str).unwrap_or_default(),
            ))
        })?;
        let mut result: Vec<_> = rows.collect::<Result<Vec<_>, _>>()?;
        result.reverse();
        Ok(result)
    }
}
