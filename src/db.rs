use std::path::Path;

use rusqlite::Connection;

use crate::error::{BurnwiseError, Result};

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS categories (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    category_type TEXT NOT NULL,
    description TEXT,
    is_active INTEGER DEFAULT 1,
    UNIQUE (name, category_type)
);

CREATE TABLE IF NOT EXISTS transactions (
    id INTEGER PRIMARY KEY,
    txn_type TEXT NOT NULL,
    amount REAL NOT NULL,
    currency TEXT NOT NULL DEFAULT 'USD',
    amount_usd REAL NOT NULL,
    category_id INTEGER NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    date TEXT NOT NULL,
    recurring_transaction_id INTEGER,
    created_at TEXT DEFAULT (datetime('now')),
    FOREIGN KEY (category_id) REFERENCES categories(id)
);

CREATE INDEX IF NOT EXISTS idx_transactions_recurring
    ON transactions (recurring_transaction_id);

CREATE TABLE IF NOT EXISTS recurring_transactions (
    id INTEGER PRIMARY KEY,
    txn_type TEXT NOT NULL,
    amount REAL NOT NULL,
    currency TEXT NOT NULL DEFAULT 'USD',
    category_id INTEGER NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    frequency TEXT NOT NULL,
    frequency_value INTEGER NOT NULL DEFAULT 1,
    start_date TEXT NOT NULL,
    end_date TEXT,
    last_processed TEXT,
    last_occurrence TEXT,
    next_due_date TEXT NOT NULL,
    is_active INTEGER DEFAULT 1,
    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now')),
    FOREIGN KEY (category_id) REFERENCES categories(id)
);

CREATE TABLE IF NOT EXISTS recurring_occurrences (
    id INTEGER PRIMARY KEY,
    recurring_transaction_id INTEGER NOT NULL,
    occurrence_date TEXT NOT NULL,
    action TEXT NOT NULL,
    modified_amount REAL,
    modified_description TEXT,
    skip_reason TEXT,
    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now')),
    UNIQUE (recurring_transaction_id, occurrence_date),
    FOREIGN KEY (recurring_transaction_id)
        REFERENCES recurring_transactions(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS exchange_rates (
    currency TEXT PRIMARY KEY,
    rate REAL NOT NULL,
    updated_at TEXT DEFAULT (datetime('now'))
);
";

// (name, category_type, description)
const DEFAULT_CATEGORIES: &[(&str, &str, &str)] = &[
    // Income
    ("Salary", "income", "Regular employment income"),
    ("Freelance", "income", "Contract and side work"),
    ("Investments", "income", "Dividends, interest, distributions"),
    ("Other Income", "income", "Anything else coming in"),
    // Expenses
    ("Housing", "expense", "Rent, mortgage, HOA"),
    ("Utilities", "expense", "Electricity, water, internet, phone"),
    ("Living", "expense", "Groceries and household"),
    ("Transportation", "expense", "Car payments, fuel, transit passes"),
    ("Technology", "expense", "Hardware and software"),
    ("AI Tools", "expense", "Model and assistant subscriptions"),
    ("Cloud Services", "expense", "Hosting, storage, domains"),
    ("Business", "expense", "Work-related costs"),
    ("Healthcare", "expense", "Insurance premiums, prescriptions"),
    ("Personal", "expense", "Gym, clothing, hobbies"),
    ("Other", "expense", "Needs a better home"),
];

pub fn get_connection(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;

    let count: i64 = conn.query_row("SELECT count(*) FROM categories", [], |row| row.get(0))?;
    if count == 0 {
        for cat in DEFAULT_CATEGORIES {
            conn.execute(
                "INSERT INTO categories (name, category_type, description) VALUES (?1, ?2, ?3)",
                rusqlite::params![cat.0, cat.1, cat.2],
            )?;
        }
    }
    Ok(())
}

/// Read a TEXT column into one of the string-backed enums (`txn_type`, `frequency`).
pub fn parse_text<T>(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: std::str::FromStr<Err = BurnwiseError>,
{
    let raw: String = row.get(idx)?;
    raw.parse().map_err(|e: BurnwiseError| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> (tempfile::TempDir, Connection) {
        let dir = tempfile::tempdir().unwrap();
        let conn = get_connection(&dir.path().join("test.db")).unwrap();
        init_db(&conn).unwrap();
        (dir, conn)
    }

    #[test]
    fn test_init_db_creates_tables() {
        let (_dir, conn) = test_db();
        let tables: Vec<String> = conn
            .prepare(
                "SELECT name FROM sqlite_master \
                 WHERE type = 'table' AND name NOT LIKE 'sqlite_%'",
            )
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();
        for expected in &[
            "categories",
            "transactions",
            "recurring_transactions",
            "recurring_occurrences",
            "exchange_rates",
        ] {
            assert!(tables.contains(&expected.to_string()), "missing table: {expected}");
        }
    }

    #[test]
    fn test_init_db_is_idempotent() {
        let (_dir, conn) = test_db();
        init_db(&conn).unwrap();
        let count: i64 = conn
            .query_row("SELECT count(*) FROM categories", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, DEFAULT_CATEGORIES.len() as i64);
    }

    fn count_of(conn: &Connection, category_type: &str) -> i64 {
        conn.query_row(
            "SELECT count(*) FROM categories WHERE category_type = ?1",
            [category_type],
            |r| r.get(0),
        )
        .unwrap()
    }

    #[test]
    fn test_income_and_expense_categories() {
        let (_dir, conn) = test_db();
        assert_eq!(count_of(&conn, "income"), 4);
        assert_eq!(count_of(&conn, "expense"), 11);
    }

    #[test]
    fn test_one_override_per_item_and_date() {
        let (_dir, conn) = test_db();
        let cat: i64 = conn
            .query_row("SELECT id FROM categories WHERE name = 'Housing'", [], |r| r.get(0))
            .unwrap();
        conn.execute(
            "INSERT INTO recurring_transactions \
             (txn_type, amount, category_id, frequency, start_date, next_due_date) \
             VALUES ('expense', 100.0, ?1, 'monthly', '2025-01-01', '2025-01-01')",
            [cat],
        )
        .unwrap();
        let id = conn.last_insert_rowid();
        let insert = "INSERT INTO recurring_occurrences \
                      (recurring_transaction_id, occurrence_date, action) \
                      VALUES (?1, '2025-02-01', 'skip')";
        conn.execute(insert, [id]).unwrap();
        assert!(conn.execute(insert, [id]).is_err());
    }
}
