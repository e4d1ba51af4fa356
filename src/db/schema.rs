//! Typed registry of the current-generation tables.
//!
//! Foreign keys are structural: a referencing column holds `&'static Column`
//! pointing at the target table's key column, so renaming a referenced key
//! breaks every referencing site at compile time instead of leaving a stale
//! string behind. The migration steps that create a current-shape table render
//! their DDL from this registry, and `verify` compares a migrated database
//! against it before the application is allowed to run.

use rusqlite::Connection;

use crate::error::MigrationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ColumnType {
    Integer,
    Text,
}

impl ColumnType {
    pub(crate) fn as_sql(self) -> &'static str {
        match self {
            ColumnType::Integer => "INTEGER",
            ColumnType::Text => "TEXT",
        }
    }
}

pub(crate) struct Column {
    pub(crate) table: &'static str,
    pub(crate) name: &'static str,
    pub(crate) ty: ColumnType,
    pub(crate) primary: bool,
    pub(crate) not_null: bool,
    pub(crate) default: Option<&'static str>,
    pub(crate) unique: bool,
    pub(crate) references: Option<&'static Column>,
    pub(crate) on_delete_cascade: bool,
    /// Kept on disk for backward compatibility; services never write it.
    pub(crate) legacy: bool,
}

impl Column {
    const fn new(table: &'static str, name: &'static str, ty: ColumnType) -> Self {
        Self {
            table,
            name,
            ty,
            primary: false,
            not_null: true,
            default: None,
            unique: false,
            references: None,
            on_delete_cascade: false,
            legacy: false,
        }
    }

    /// Auto-incrementing integer primary key, the shape every table uses.
    const fn key(table: &'static str) -> Self {
        let mut col = Self::new(table, "id", ColumnType::Integer);
        col.primary = true;
        col
    }

    const fn nullable(mut self) -> Self {
        self.not_null = false;
        self
    }

    const fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    const fn default_value(mut self, sql: &'static str) -> Self {
        self.default = Some(sql);
        self
    }

    const fn references(mut self, target: &'static Column) -> Self {
        self.references = Some(target);
        self
    }

    const fn cascade(mut self) -> Self {
        self.on_delete_cascade = true;
        self
    }

    const fn legacy(mut self) -> Self {
        self.legacy = true;
        self
    }

    fn render(&self) -> String {
        let mut sql = format!("{} {}", self.name, self.ty.as_sql());
        if self.primary {
            sql.push_str(" PRIMARY KEY AUTOINCREMENT");
            return sql;
        }
        if self.not_null {
            sql.push_str(" NOT NULL");
        }
        if let Some(default) = self.default {
            sql.push_str(" DEFAULT ");
            sql.push_str(default);
        }
        if self.unique {
            sql.push_str(" UNIQUE");
        }
        if let Some(target) = self.references {
            sql.push_str(&format!(" REFERENCES {}({})", target.table, target.name));
            if self.on_delete_cascade {
                sql.push_str(" ON DELETE CASCADE");
            }
        }
        sql
    }
}

pub(crate) struct Table {
    pub(crate) name: &'static str,
    pub(crate) columns: &'static [&'static Column],
    /// Table-level UNIQUE constraints, each a column-name tuple.
    pub(crate) unique: &'static [&'static [&'static str]],
}

impl Table {
    pub(crate) fn create_sql(&self) -> String {
        let mut parts: Vec<String> = self.columns.iter().map(|c| c.render()).collect();
        for cols in self.unique {
            parts.push(format!("UNIQUE({})", cols.join(", ")));
        }
        format!("CREATE TABLE {} (\n    {}\n)", self.name, parts.join(",\n    "))
    }
}

pub(crate) mod categories {
    use super::{Column, ColumnType, Table};

    pub(crate) static ID: Column = Column::key("categories");
    pub(crate) static NAME: Column =
        Column::new("categories", "name", ColumnType::Text).unique();
    pub(crate) static COLOR: Column =
        Column::new("categories", "color", ColumnType::Text).default_value("''");

    pub(crate) static TABLE: Table = Table {
        name: "categories",
        columns: &[&ID, &NAME, &COLOR],
        unique: &[],
    };
}

pub(crate) mod transaction_types {
    use super::{Column, ColumnType, Table};

    pub(crate) static ID: Column = Column::key("transaction_types");
    pub(crate) static NAME: Column =
        Column::new("transaction_types", "name", ColumnType::Text).unique();

    pub(crate) static TABLE: Table = Table {
        name: "transaction_types",
        columns: &[&ID, &NAME],
        unique: &[],
    };
}

pub(crate) mod transactions {
    use super::{categories, transaction_types, Column, ColumnType, Table};

    pub(crate) static ID: Column = Column::key("transactions");
    pub(crate) static TYPE_ID: Column =
        Column::new("transactions", "type_id", ColumnType::Integer)
            .references(&transaction_types::ID);
    pub(crate) static AMOUNT: Column = Column::new("transactions", "amount", ColumnType::Text);
    pub(crate) static DATE: Column = Column::new("transactions", "date", ColumnType::Text);
    pub(crate) static DESCRIPTION: Column =
        Column::new("transactions", "description", ColumnType::Text).nullable();
    /// Superseded by the join table in m0006; see the read/write policy
    /// on `models::Transaction::category_id`.
    pub(crate) static CATEGORY_ID: Column =
        Column::new("transactions", "category_id", ColumnType::Integer)
            .nullable()
            .references(&categories::ID)
            .legacy();

    pub(crate) static TABLE: Table = Table {
        name: "transactions",
        columns: &[&ID, &TYPE_ID, &AMOUNT, &DATE, &DESCRIPTION, &CATEGORY_ID],
        unique: &[],
    };
}

pub(crate) mod transaction_categories {
    use super::{categories, transactions, Column, ColumnType, Table};

    pub(crate) static ID: Column = Column::key("transaction_categories");
    pub(crate) static TRANSACTION_ID: Column =
        Column::new("transaction_categories", "transaction_id", ColumnType::Integer)
            .references(&transactions::ID)
            .cascade();
    pub(crate) static CATEGORY_ID: Column =
        Column::new("transaction_categories", "category_id", ColumnType::Integer)
            .references(&categories::ID);

    pub(crate) static TABLE: Table = Table {
        name: "transaction_categories",
        columns: &[&ID, &TRANSACTION_ID, &CATEGORY_ID],
        unique: &[&["transaction_id", "category_id"]],
    };
}

pub(crate) static TABLES: &[&Table] = &[
    &categories::TABLE,
    &transaction_types::TABLE,
    &transactions::TABLE,
    &transaction_categories::TABLE,
];

pub(crate) fn table(name: &str) -> Option<&'static Table> {
    TABLES.iter().find(|t| t.name == name).copied()
}

struct LiveColumn {
    name: String,
    ty: String,
    not_null: bool,
    default: Option<String>,
    primary: bool,
}

struct LiveForeignKey {
    from: String,
    table: String,
    to: Option<String>,
    on_delete: String,
}

/// Compare the live schema against the registry. Called after migrations by
/// `Database::open`; a mismatch is fatal, the application must not run
/// against a drifted schema.
pub(crate) fn verify(conn: &Connection) -> Result<(), MigrationError> {
    for table in TABLES {
        let live = live_columns(conn, table.name)?;
        if live.is_empty() {
            return Err(MigrationError::SchemaMismatch(format!(
                "table '{}' is missing",
                table.name
            )));
        }
        if live.len() != table.columns.len() {
            return Err(MigrationError::SchemaMismatch(format!(
                "table '{}' has {} columns, registry declares {}",
                table.name,
                live.len(),
                table.columns.len()
            )));
        }
        for (col, live_col) in table.columns.iter().zip(&live) {
            if live_col.name != col.name {
                return Err(MigrationError::SchemaMismatch(format!(
                    "table '{}': expected column '{}', found '{}'",
                    table.name, col.name, live_col.name
                )));
            }
            if !live_col.ty.eq_ignore_ascii_case(col.ty.as_sql()) {
                return Err(MigrationError::SchemaMismatch(format!(
                    "column '{}.{}': expected type {}, found {}",
                    table.name,
                    col.name,
                    col.ty.as_sql(),
                    live_col.ty
                )));
            }
            if live_col.primary != col.primary {
                return Err(MigrationError::SchemaMismatch(format!(
                    "column '{}.{}': primary key flag differs",
                    table.name, col.name
                )));
            }
            // table_info reports INTEGER PRIMARY KEY columns as nullable.
            if !col.primary && live_col.not_null != col.not_null {
                return Err(MigrationError::SchemaMismatch(format!(
                    "column '{}.{}': expected NOT NULL = {}, found {}",
                    table.name, col.name, col.not_null, live_col.not_null
                )));
            }
            if live_col.default.as_deref() != col.default {
                return Err(MigrationError::SchemaMismatch(format!(
                    "column '{}.{}': default differs (expected {:?}, found {:?})",
                    table.name, col.name, col.default, live_col.default
                )));
            }
        }
        verify_foreign_keys(conn, table)?;
    }
    Ok(())
}

fn verify_foreign_keys(conn: &Connection, table: &Table) -> Result<(), MigrationError> {
    let live = live_foreign_keys(conn, table.name)?;
    let declared: Vec<&&Column> = table
        .columns
        .iter()
        .filter(|c| c.references.is_some())
        .collect();

    if live.len() != declared.len() {
        return Err(MigrationError::SchemaMismatch(format!(
            "table '{}' has {} foreign keys, registry declares {}",
            table.name,
            live.len(),
            declared.len()
        )));
    }

    for col in declared {
        let target = match col.references {
            Some(t) => t,
            None => continue,
        };
        let fk = live.iter().find(|fk| fk.from == col.name).ok_or_else(|| {
            MigrationError::SchemaMismatch(format!(
                "column '{}.{}': foreign key missing",
                table.name, col.name
            ))
        })?;
        let live_to = fk.to.as_deref().unwrap_or("id");
        if fk.table != target.table || live_to != target.name {
            return Err(MigrationError::SchemaMismatch(format!(
                "column '{}.{}': references {}({}), registry declares {}({})",
                table.name, col.name, fk.table, live_to, target.table, target.name
            )));
        }
        let wants_cascade = col.on_delete_cascade;
        let has_cascade = fk.on_delete.eq_ignore_ascii_case("CASCADE");
        if wants_cascade != has_cascade {
            return Err(MigrationError::SchemaMismatch(format!(
                "column '{}.{}': ON DELETE differs (found {})",
                table.name, col.name, fk.on_delete
            )));
        }
    }
    Ok(())
}

fn live_columns(conn: &Connection, table: &str) -> Result<Vec<LiveColumn>, MigrationError> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
    let rows = stmt.query_map([], |row| {
        Ok(LiveColumn {
            name: row.get(1)?,
            ty: row.get(2)?,
            not_null: row.get::<_, i64>(3)? != 0,
            default: row.get(4)?,
            primary: row.get::<_, i64>(5)? != 0,
        })
    })?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

fn live_foreign_keys(conn: &Connection, table: &str) -> Result<Vec<LiveForeignKey>, MigrationError> {
    let mut stmt = conn.prepare(&format!("PRAGMA foreign_key_list({table})"))?;
    let rows = stmt.query_map([], |row| {
        Ok(LiveForeignKey {
            table: row.get(2)?,
            from: row.get(3)?,
            to: row.get(4)?,
            on_delete: row.get(6)?,
        })
    })?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}
