use rusqlite::Connection;

use crate::db::parse_text;
use crate::error::{BurnwiseError, Result};
use crate::models::{Category, Transaction};

/// Where generated transactions go. The connection passed in may be an open
/// database transaction; implementations must write through it.
pub trait TransactionSink {
    fn create(&self, conn: &Connection, txn: &Transaction) -> Result<i64>;
}

pub trait CategoryLookup {
    fn exists(&self, category_id: i64) -> bool;
}

/// The `transactions` table.
pub struct SqliteLedger;

impl TransactionSink for SqliteLedger {
    fn create(&self, conn: &Connection, txn: &Transaction) -> Result<i64> {
        conn.execute(
            "INSERT INTO transactions \
             (txn_type, amount, currency, amount_usd, category_id, description, date, \
              recurring_transaction_id) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            rusqlite::params![
                txn.txn_type.as_str(),
                txn.amount,
                txn.currency,
                txn.amount_usd,
                txn.category_id,
                txn.description,
                txn.date,
                txn.recurring_transaction_id,
            ],
        )
        .map_err(|e| BurnwiseError::Persistence(e.to_string()))?;
        Ok(conn.last_insert_rowid())
    }
}

pub struct SqliteCategories<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteCategories<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl CategoryLookup for SqliteCategories<'_> {
    fn exists(&self, category_id: i64) -> bool {
        self.conn
            .query_row(
                "SELECT count(*) FROM categories WHERE id = ?1 AND is_active = 1",
                [category_id],
                |row| row.get::<_, i64>(0),
            )
            .map(|n| n > 0)
            .unwrap_or(false)
    }
}

/// Transactions generated from one recurring item, newest first.
pub fn generated_transactions(conn: &Connection, recurring_id: i64) -> Result<Vec<Transaction>> {
    let mut stmt = conn.prepare(
        "SELECT id, txn_type, amount, currency, amount_usd, category_id, description, date, \
         recurring_transaction_id \
         FROM transactions WHERE recurring_transaction_id = ?1 ORDER BY date DESC, id DESC",
    )?;
    let rows = stmt
        .query_map([recurring_id], |row| {
            Ok(Transaction {
                id: row.get(0)?,
                txn_type: parse_text(row, 1)?,
                amount: row.get(2)?,
                currency: row.get(3)?,
                amount_usd: row.get(4)?,
                category_id: row.get(5)?,
                description: row.get(6)?,
                date: row.get(7)?,
                recurring_transaction_id: row.get(8)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn count_generated(conn: &Connection, recurring_id: i64) -> Result<i64> {
    let count = conn.query_row(
        "SELECT count(*) FROM transactions WHERE recurring_transaction_id = ?1",
        [recurring_id],
        |row| row.get(0),
    )?;
    Ok(count)
}

pub fn list_categories(conn: &Connection) -> Result<Vec<Category>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, category_type, is_active FROM categories ORDER BY category_type, name",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok(Category {
                id: row.get(0)?,
                name: row.get(1)?,
                category_type: parse_text(row, 2)?,
                is_active: row.get(3)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Resolve a category by name (case-insensitive).
pub fn find_category(conn: &Connection, name: &str) -> Result<i64> {
    conn.query_row(
        "SELECT id FROM categories WHERE name = ?1 COLLATE NOCASE AND is_active = 1 \
         ORDER BY id LIMIT 1",
        [name],
        |row| row.get(0),
    )
    .map_err(|_| BurnwiseError::UnknownCategory(name.to_string()))
}
