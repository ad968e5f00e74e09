use chrono::{Days, Months, NaiveDate};

use crate::error::{BurnwiseError, Result};
use crate::models::Frequency;

/// Next occurrence after `from`.
///
/// Calendar months and years clamp to the last day of the target month:
/// Jan 31 + 1 month is Feb 28 (or 29), Feb 29 + 1 year is Feb 28. Once an
/// item has been clamped it keeps the shorter day-of-month from then on.
pub fn next_due_date(
    from: NaiveDate,
    frequency: Frequency,
    frequency_value: u32,
) -> Result<NaiveDate> {
    let n = frequency_value.max(1);
    let next = match frequency {
        Frequency::Daily => from.checked_add_days(Days::new(n as u64)),
        Frequency::Weekly => from.checked_add_days(Days::new(n as u64 * 7)),
        Frequency::Monthly => from.checked_add_months(Months::new(n)),
        Frequency::Yearly => n
            .checked_mul(12)
            .and_then(|months| from.checked_add_months(Months::new(months))),
    };
    next.ok_or(BurnwiseError::DateOverflow(from))
}

/// Where a walk along the schedule stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Walk {
    /// First date that stopped the walk.
    pub next: NaiveDate,
    /// Last date stepped over, if the walk moved at all.
    pub passed: Option<NaiveDate>,
    pub steps: usize,
}

/// Walk the schedule forward from `from` until `keep_going` is false.
/// Fails with `IterationLimit` after `limit` steps.
pub fn advance_while(
    from: NaiveDate,
    frequency: Frequency,
    frequency_value: u32,
    limit: usize,
    id: i64,
    keep_going: impl Fn(NaiveDate) -> bool,
) -> Result<Walk> {
    let mut cursor = from;
    let mut passed = None;
    let mut steps = 0usize;
    while keep_going(cursor) {
        if steps >= limit {
            return Err(BurnwiseError::IterationLimit { id, limit });
        }
        let next = next_due_date(cursor, frequency, frequency_value)?;
        if next <= cursor {
            return Err(BurnwiseError::Other(format!(
                "schedule for recurring transaction {id} did not advance past {cursor}"
            )));
        }
        passed = Some(cursor);
        cursor = next;
        steps += 1;
    }
    Ok(Walk {
        next: cursor,
        passed,
        steps,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_daily_and_weekly() {
        let next = |from, freq, n| next_due_date(from, freq, n).unwrap();
        assert_eq!(next(d(2025, 1, 30), Frequency::Daily, 3), d(2025, 2, 2));
        assert_eq!(next(d(2025, 1, 1), Frequency::Weekly, 2), d(2025, 1, 15));
    }

    #[test]
    fn test_monthly_and_yearly() {
        let next = |from, freq, n| next_due_date(from, freq, n).unwrap();
        assert_eq!(next(d(2025, 1, 15), Frequency::Monthly, 1), d(2025, 2, 15));
        assert_eq!(next(d(2025, 11, 15), Frequency::Monthly, 3), d(2026, 2, 15));
        assert_eq!(next(d(2025, 3, 1), Frequency::Yearly, 2), d(2027, 3, 1));
    }

    #[test]
    fn test_month_end_clamps() {
        let next = |from, freq| next_due_date(from, freq, 1).unwrap();
        assert_eq!(next(d(2025, 1, 31), Frequency::Monthly), d(2025, 2, 28));
        assert_eq!(next(d(2024, 1, 31), Frequency::Monthly), d(2024, 2, 29));
        assert_eq!(next(d(2025, 3, 31), Frequency::Monthly), d(2025, 4, 30));
        assert_eq!(next(d(2024, 2, 29), Frequency::Yearly), d(2025, 2, 28));
    }

    #[test]
    fn test_result_always_after_input() {
        let starts = [d(2024, 1, 31), d(2024, 2, 29), d(2025, 12, 31), d(2025, 6, 15)];
        for from in starts {
            for freq in Frequency::ALL {
                for n in 1..=13 {
                    let next = next_due_date(from, freq, n).unwrap();
                    assert!(next > from, "{freq} x{n} from {from} gave {next}");
                }
            }
        }
    }

    #[test]
    fn test_overflow_is_an_error() {
        let err = next_due_date(NaiveDate::MAX, Frequency::Daily, 1).unwrap_err();
        assert!(matches!(err, BurnwiseError::DateOverflow(_)));
    }

    #[test]
    fn test_advance_while_finds_first_date_past_bound() {
        let bound = d(2025, 4, 10);
        let walk = advance_while(d(2025, 1, 10), Frequency::Monthly, 1, 100, 1, |c| c <= bound)
            .unwrap();
        assert_eq!(walk.next, d(2025, 5, 10));
        assert_eq!(walk.passed, Some(d(2025, 4, 10)));
        assert_eq!(walk.steps, 4);

        let still = advance_while(d(2025, 6, 1), Frequency::Monthly, 1, 100, 1, |c| c <= bound)
            .unwrap();
        assert_eq!(still.next, d(2025, 6, 1));
        assert_eq!(still.passed, None);
    }

    #[test]
    fn test_advance_while_respects_limit() {
        let err = advance_while(d(2000, 1, 1), Frequency::Daily, 1, 10, 7, |c| c < d(2001, 1, 1))
            .unwrap_err();
        assert!(matches!(err, BurnwiseError::IterationLimit { id: 7, limit: 10 }));
    }
}
