use crate::currency::BASE_CURRENCY;
use crate::error::{BurnwiseError, Result};
use crate::ledger::CategoryLookup;
use crate::models::RecurringTransaction;

/// Fill in defaults a user may leave blank: currency falls back to USD and is upper-cased.
pub fn normalize(candidate: &mut RecurringTransaction) {
    let code = candidate.currency.trim().to_uppercase();
    candidate.currency = if code.is_empty() {
        BASE_CURRENCY.to_string()
    } else {
        code
    };
    candidate.description = candidate.description.trim().to_string();
}

/// Checks run before any insert or update of a recurring transaction.
pub fn validate(candidate: &RecurringTransaction, categories: &dyn CategoryLookup) -> Result<()> {
    if !candidate.amount.is_finite() || candidate.amount <= 0.0 {
        return Err(invalid("amount must be greater than 0"));
    }
    let code = &candidate.currency;
    if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(invalid(&format!(
            "currency must be a 3-letter code, got '{}'",
            candidate.currency
        )));
    }
    if candidate.frequency_value < 1 {
        return Err(invalid("frequency value must be at least 1"));
    }
    if let Some(end) = candidate.end_date {
        if end <= candidate.start_date {
            return Err(invalid("end date must be after start date"));
        }
    }
    if candidate.next_due_date < candidate.start_date {
        return Err(invalid("next due date cannot be before start date"));
    }
    if !categories.exists(candidate.category_id) {
        return Err(invalid(&format!("category {} does not exist", candidate.category_id)));
    }
    Ok(())
}

fn invalid(msg: &str) -> BurnwiseError {
    BurnwiseError::Validation(msg.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    use crate::models::{Frequency, TransactionType};

    struct Known(Vec<i64>);

    impl CategoryLookup for Known {
        fn exists(&self, category_id: i64) -> bool {
            self.0.contains(&category_id)
        }
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn candidate() -> RecurringTransaction {
        RecurringTransaction::new(
            TransactionType::Expense,
            50.0,
            " eur ",
            3,
            " Gym ",
            Frequency::Monthly,
            1,
            d(2025, 1, 1),
        )
    }

    fn rejects(rt: &RecurringTransaction) -> bool {
        matches!(validate(rt, &Known(vec![3])), Err(BurnwiseError::Validation(_)))
    }

    #[test]
    fn test_normalize_defaults() {
        let mut rt = candidate();
        normalize(&mut rt);
        assert_eq!(rt.currency, "EUR");
        assert_eq!(rt.description, "Gym");
        rt.currency = "  ".to_string();
        normalize(&mut rt);
        assert_eq!(rt.currency, "USD");
    }

    #[test]
    fn test_valid_candidate_passes() {
        let mut rt = candidate();
        normalize(&mut rt);
        rt.end_date = Some(d(2025, 12, 31));
        validate(&rt, &Known(vec![3])).unwrap();
    }

    #[test]
    fn test_rejects_bad_amounts() {
        let mut rt = candidate();
        normalize(&mut rt);
        rt.amount = 0.0;
        assert!(rejects(&rt));
        rt.amount = -10.0;
        assert!(rejects(&rt));
        rt.amount = f64::NAN;
        assert!(rejects(&rt));
    }

    #[test]
    fn test_rejects_zero_frequency() {
        let mut rt = candidate();
        normalize(&mut rt);
        rt.frequency_value = 0;
        assert!(rejects(&rt));
    }

    #[test]
    fn test_rejects_end_not_after_start() {
        let mut rt = candidate();
        normalize(&mut rt);
        rt.end_date = Some(rt.start_date);
        assert!(rejects(&rt));
    }

    #[test]
    fn test_rejects_unknown_category_and_currency() {
        let mut rt = candidate();
        normalize(&mut rt);
        rt.category_id = 4;
        assert!(rejects(&rt));
        rt.category_id = 3;
        rt.currency = "EURO".to_string();
        assert!(rejects(&rt));
    }

    #[test]
    fn test_rejects_next_due_before_start() {
        let mut rt = candidate();
        normalize(&mut rt);
        rt.next_due_date = d(2024, 12, 1);
        assert!(rejects(&rt));
    }
}
