use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, Row};

use crate::db::parse_text;
use crate::error::{BurnwiseError, Result};
use crate::models::RecurringTransaction;

const COLUMNS: &str = "id, txn_type, amount, currency, category_id, description, frequency, \
                       frequency_value, start_date, end_date, last_processed, last_occurrence, \
                       next_due_date, is_active";

fn from_row(row: &Row<'_>) -> rusqlite::Result<RecurringTransaction> {
    Ok(RecurringTransaction {
        id: row.get(0)?,
        txn_type: parse_text(row, 1)?,
        amount: row.get(2)?,
        currency: row.get(3)?,
        category_id: row.get(4)?,
        description: row.get(5)?,
        frequency: parse_text(row, 6)?,
        frequency_value: row.get(7)?,
        start_date: row.get(8)?,
        end_date: row.get(9)?,
        last_processed: row.get(10)?,
        last_occurrence: row.get(11)?,
        next_due_date: row.get(12)?,
        is_active: row.get(13)?,
    })
}

fn query(
    conn: &Connection,
    filter: &str,
    params: impl rusqlite::Params,
) -> Result<Vec<RecurringTransaction>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM recurring_transactions {filter} \
         ORDER BY next_due_date ASC, id ASC"
    ))?;
    let rows = stmt
        .query_map(params, from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn insert(conn: &Connection, rt: &RecurringTransaction) -> Result<i64> {
    conn.execute(
        "INSERT INTO recurring_transactions \
         (txn_type, amount, currency, category_id, description, frequency, frequency_value, \
          start_date, end_date, last_processed, last_occurrence, next_due_date, is_active) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        rusqlite::params![
            rt.txn_type.as_str(),
            rt.amount,
            rt.currency,
            rt.category_id,
            rt.description,
            rt.frequency.as_str(),
            rt.frequency_value,
            rt.start_date,
            rt.end_date,
            rt.last_processed,
            rt.last_occurrence,
            rt.next_due_date,
            rt.is_active,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Overwrite every user-editable column plus the schedule position.
pub fn update(conn: &Connection, id: i64, rt: &RecurringTransaction) -> Result<()> {
    let changed = conn.execute(
        "UPDATE recurring_transactions SET \
         txn_type = ?1, amount = ?2, currency = ?3, category_id = ?4, description = ?5, \
         frequency = ?6, frequency_value = ?7, start_date = ?8, end_date = ?9, \
         last_processed = ?10, last_occurrence = ?11, next_due_date = ?12, is_active = ?13, \
         updated_at = datetime('now') \
         WHERE id = ?14",
        rusqlite::params![
            rt.txn_type.as_str(),
            rt.amount,
            rt.currency,
            rt.category_id,
            rt.description,
            rt.frequency.as_str(),
            rt.frequency_value,
            rt.start_date,
            rt.end_date,
            rt.last_processed,
            rt.last_occurrence,
            rt.next_due_date,
            rt.is_active,
            id,
        ],
    )?;
    if changed == 0 {
        return Err(BurnwiseError::NotFound(id));
    }
    Ok(())
}

/// Persist only the columns catch-up moves.
pub fn save_schedule(conn: &Connection, id: i64, rt: &RecurringTransaction) -> Result<()> {
    let changed = conn.execute(
        "UPDATE recurring_transactions SET next_due_date = ?1, last_processed = ?2, \
         last_occurrence = ?3, is_active = ?4, updated_at = datetime('now') WHERE id = ?5",
        rusqlite::params![
            rt.next_due_date,
            rt.last_processed,
            rt.last_occurrence,
            rt.is_active,
            id
        ],
    )?;
    if changed == 0 {
        return Err(BurnwiseError::NotFound(id));
    }
    Ok(())
}

pub fn set_active(conn: &Connection, id: i64, active: bool) -> Result<()> {
    let changed = conn.execute(
        "UPDATE recurring_transactions SET is_active = ?1, updated_at = datetime('now') \
         WHERE id = ?2",
        rusqlite::params![active, id],
    )?;
    if changed == 0 {
        return Err(BurnwiseError::NotFound(id));
    }
    Ok(())
}

pub fn delete(conn: &Connection, id: i64) -> Result<()> {
    let changed = conn.execute("DELETE FROM recurring_transactions WHERE id = ?1", [id])?;
    if changed == 0 {
        return Err(BurnwiseError::NotFound(id));
    }
    Ok(())
}

pub fn get(conn: &Connection, id: i64) -> Result<RecurringTransaction> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM recurring_transactions WHERE id = ?1"),
        [id],
        from_row,
    )
    .optional()?
    .ok_or(BurnwiseError::NotFound(id))
}

pub fn list_all(conn: &Connection) -> Result<Vec<RecurringTransaction>> {
    query(conn, "", [])
}

pub fn list_active(conn: &Connection) -> Result<Vec<RecurringTransaction>> {
    query(conn, "WHERE is_active = 1", [])
}

pub fn list_due(conn: &Connection, as_of: NaiveDate) -> Result<Vec<RecurringTransaction>> {
    query(conn, "WHERE is_active = 1 AND next_due_date <= ?1", [as_of])
}

/// Active items whose next occurrence falls in `[from, to]`.
pub fn list_upcoming(
    conn: &Connection,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<RecurringTransaction>> {
    query(
        conn,
        "WHERE is_active = 1 AND next_due_date >= ?1 AND next_due_date <= ?2",
        [from, to],
    )
}

/// Active items whose end date falls in `[from, to]`.
pub fn list_expiring(
    conn: &Connection,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<RecurringTransaction>> {
    query(
        conn,
        "WHERE is_active = 1 AND end_date IS NOT NULL AND end_date >= ?1 AND end_date <= ?2",
        [from, to],
    )
}
