use chrono::NaiveDate;

use crate::currency::CurrencyConverter;
use crate::error::{BurnwiseError, Result};
use crate::models::{RecurringTransaction, TransactionType};
use crate::schedule::{advance_while, next_due_date};

/// One item's share of a projection window.
#[derive(Debug, Clone)]
pub struct ProjectedItem {
    pub id: i64,
    pub description: String,
    pub txn_type: TransactionType,
    pub occurrences: usize,
    /// USD value of a single occurrence.
    pub amount_usd: f64,
    /// Signed USD total: positive for income, negative for expenses.
    pub net_usd: f64,
}

/// Occurrences of `rt` that land in `[start, end]`, walking forward from its
/// current schedule position rather than its start date.
pub fn count_occurrences(
    rt: &RecurringTransaction,
    start: NaiveDate,
    end: NaiveDate,
    limit: usize,
) -> Result<usize> {
    let id = rt.id.unwrap_or_default();
    let walk = advance_while(
        rt.next_due_date,
        rt.frequency,
        rt.frequency_value,
        limit,
        id,
        |c| c < start,
    )?;
    let (mut cursor, mut steps) = (walk.next, walk.steps);

    let mut occurrences = 0usize;
    while cursor <= end && !rt.is_past_end(cursor) {
        if steps >= limit {
            return Err(BurnwiseError::IterationLimit { id, limit });
        }
        occurrences += 1;
        cursor = next_due_date(cursor, rt.frequency, rt.frequency_value)?;
        steps += 1;
    }
    Ok(occurrences)
}

/// Per-item breakdown of recurring cash flow in `[start, end]`.
///
/// Reads only the slice it is handed. Paused items and items starting after
/// `end` contribute nothing; items with zero occurrences are left out.
pub fn project(
    items: &[RecurringTransaction],
    start: NaiveDate,
    end: NaiveDate,
    converter: &dyn CurrencyConverter,
    limit: usize,
) -> Result<Vec<ProjectedItem>> {
    if start > end {
        return Err(BurnwiseError::Validation(format!(
            "projection start {start} is after end {end}"
        )));
    }

    let mut projected = Vec::new();
    for rt in items.iter().filter(|rt| rt.is_active && rt.start_date <= end) {
        let occurrences = count_occurrences(rt, start, end, limit)?;
        if occurrences == 0 {
            continue;
        }
        let amount_usd = converter.convert_to_usd(rt.amount, &rt.currency)?;
        projected.push(ProjectedItem {
            id: rt.id.unwrap_or_default(),
            description: rt.description.clone(),
            txn_type: rt.txn_type,
            occurrences,
            amount_usd,
            net_usd: rt.txn_type.sign() * amount_usd * occurrences as f64,
        });
    }
    Ok(projected)
}

pub fn calculate_projected_amount(
    items: &[RecurringTransaction],
    start: NaiveDate,
    end: NaiveDate,
    converter: &dyn CurrencyConverter,
    limit: usize,
) -> Result<f64> {
    Ok(project(items, start, end, converter, limit)?
        .iter()
        .map(|p| p.net_usd)
        .sum())
}
