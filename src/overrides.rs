use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, Row};

use crate::error::{BurnwiseError, Result};
use crate::models::{OccurrenceAction, OccurrenceOverride};

const UPSERT: &str = "INSERT INTO recurring_occurrences \
    (recurring_transaction_id, occurrence_date, action, modified_amount, modified_description, \
    skip_reason) \
    VALUES (?1, ?2, ?3, ?4, ?5, ?6) \
    ON CONFLICT (recurring_transaction_id, occurrence_date) DO UPDATE SET \
    action = excluded.action, \
    modified_amount = excluded.modified_amount, \
    modified_description = excluded.modified_description, \
    skip_reason = excluded.skip_reason, \
    updated_at = datetime('now')";

const COLUMNS: &str = "recurring_transaction_id, occurrence_date, action, modified_amount, \
                       modified_description, skip_reason";

type OverrideRow = (i64, NaiveDate, String, Option<f64>, Option<String>, Option<String>);

fn from_row(row: &Row<'_>) -> rusqlite::Result<OverrideRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
    ))
}

fn build(row: OverrideRow) -> Result<OccurrenceOverride> {
    let (id, date, action, amount, description, reason) = row;
    let action = match action.as_str() {
        "skip" => OccurrenceAction::Skip {
            reason: reason.unwrap_or_default(),
        },
        "modify" => OccurrenceAction::Modify {
            amount,
            description,
        },
        other => {
            return Err(BurnwiseError::Other(format!(
                "unknown occurrence action '{other}' for recurring transaction {id}"
            )))
        }
    };
    Ok(OccurrenceOverride {
        recurring_transaction_id: id,
        occurrence_date: date,
        action,
    })
}

/// Skip the occurrence of `id` on `date`. Replaces any earlier override for that date.
pub fn record_skip(conn: &Connection, id: i64, date: NaiveDate, reason: &str) -> Result<()> {
    conn.execute(
        UPSERT,
        rusqlite::params![id, date, "skip", None::<f64>, None::<String>, reason],
    )?;
    Ok(())
}

/// Replace the amount and/or description of the occurrence of `id` on `date`.
pub fn record_modify(
    conn: &Connection,
    id: i64,
    date: NaiveDate,
    amount: Option<f64>,
    description: Option<&str>,
) -> Result<()> {
    if amount.is_none() && description.is_none() {
        return Err(BurnwiseError::Validation(
            "modify needs a replacement amount or description".to_string(),
        ));
    }
    if amount.is_some_and(|a| a <= 0.0 || !a.is_finite()) {
        return Err(BurnwiseError::Validation("amount must be greater than 0".to_string()));
    }
    conn.execute(
        UPSERT,
        rusqlite::params![id, date, "modify", amount, description, None::<String>],
    )?;
    Ok(())
}

pub fn lookup(conn: &Connection, id: i64, date: NaiveDate) -> Result<Option<OccurrenceOverride>> {
    let row = conn
        .query_row(
            &format!(
                "SELECT {COLUMNS} FROM recurring_occurrences \
                 WHERE recurring_transaction_id = ?1 AND occurrence_date = ?2"
            ),
            rusqlite::params![id, date],
            from_row,
        )
        .optional()?;
    row.map(build).transpose()
}

/// All overrides recorded for one item, latest occurrence date first.
pub fn list_for(conn: &Connection, id: i64) -> Result<Vec<OccurrenceOverride>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM recurring_occurrences \
         WHERE recurring_transaction_id = ?1 ORDER BY occurrence_date DESC"
    ))?;
    let rows = stmt
        .query_map([id], from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    rows.into_iter().map(build).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{get_connection, init_db};

    fn test_db() -> (tempfile::TempDir, Connection) {
        let dir = tempfile::tempdir().unwrap();
        let conn = get_connection(&dir.path().join("test.db")).unwrap();
        init_db(&conn).unwrap();
        (dir, conn)
    }

    fn add_item(conn: &Connection) -> i64 {
        conn.execute(
            "INSERT INTO recurring_transactions \
             (txn_type, amount, category_id, frequency, start_date, next_due_date) \
             VALUES ('expense', 9.99, \
             (SELECT id FROM categories WHERE name = 'Cloud Services'), \
             'monthly', '2025-01-05', '2025-01-05')",
            [],
        )
        .unwrap();
        conn.last_insert_rowid()
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_lookup_missing_is_none() {
        let (_dir, conn) = test_db();
        let id = add_item(&conn);
        assert!(lookup(&conn, id, d(2025, 1, 5)).unwrap().is_none());
    }

    #[test]
    fn test_skip_roundtrip() {
        let (_dir, conn) = test_db();
        let id = add_item(&conn);
        record_skip(&conn, id, d(2025, 2, 5), "vacation").unwrap();
        let ov = lookup(&conn, id, d(2025, 2, 5)).unwrap().unwrap();
        assert_eq!(
            ov.action,
            OccurrenceAction::Skip {
                reason: "vacation".to_string()
            }
        );
        assert!(lookup(&conn, id, d(2025, 3, 5)).unwrap().is_none());
    }

    #[test]
    fn test_later_write_replaces_earlier() {
        let (_dir, conn) = test_db();
        let id = add_item(&conn);
        record_skip(&conn, id, d(2025, 2, 5), "vacation").unwrap();
        record_modify(&conn, id, d(2025, 2, 5), Some(12.5), None).unwrap();
        let ov = lookup(&conn, id, d(2025, 2, 5)).unwrap().unwrap();
        assert_eq!(
            ov.action,
            OccurrenceAction::Modify {
                amount: Some(12.5),
                description: None
            }
        );
        let count: i64 = conn
            .query_row("SELECT count(*) FROM recurring_occurrences", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_modify_requires_a_change() {
        let (_dir, conn) = test_db();
        let id = add_item(&conn);
        assert!(matches!(
            record_modify(&conn, id, d(2025, 2, 5), None, None),
            Err(BurnwiseError::Validation(_))
        ));
        assert!(record_modify(&conn, id, d(2025, 2, 5), Some(-3.0), None).is_err());
    }

    #[test]
    fn test_list_newest_first() {
        let (_dir, conn) = test_db();
        let id = add_item(&conn);
        record_skip(&conn, id, d(2025, 2, 5), "a").unwrap();
        record_modify(&conn, id, d(2025, 4, 5), None, Some("annual bump")).unwrap();
        record_skip(&conn, id, d(2025, 3, 5), "b").unwrap();
        let dates: Vec<NaiveDate> = list_for(&conn, id)
            .unwrap()
            .iter()
            .map(|o| o.occurrence_date)
            .collect();
        assert_eq!(dates, vec![d(2025, 4, 5), d(2025, 3, 5), d(2025, 2, 5)]);
    }
}
