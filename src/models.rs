use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};

use crate::error::BurnwiseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionType {
    Income,
    Expense,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Income => "income",
            TransactionType::Expense => "expense",
        }
    }

    /// +1 for money coming in, -1 for money going out.
    pub fn sign(&self) -> f64 {
        match self {
            TransactionType::Income => 1.0,
            TransactionType::Expense => -1.0,
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = BurnwiseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "income" => Ok(TransactionType::Income),
            "expense" => Ok(TransactionType::Expense),
            other => Err(BurnwiseError::Validation(format!("invalid transaction type: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Frequency {
    pub const ALL: [Frequency; 4] = [
        Frequency::Daily,
        Frequency::Weekly,
        Frequency::Monthly,
        Frequency::Yearly,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
            Frequency::Monthly => "monthly",
            Frequency::Yearly => "yearly",
        }
    }

    fn unit(&self) -> &'static str {
        match self {
            Frequency::Daily => "days",
            Frequency::Weekly => "weeks",
            Frequency::Monthly => "months",
            Frequency::Yearly => "years",
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Frequency {
    type Err = BurnwiseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        Frequency::ALL
            .into_iter()
            .find(|f| f.as_str() == lower)
            .ok_or_else(|| BurnwiseError::Validation(format!("invalid frequency: {s}")))
    }
}

/// Where an item sits in its schedule relative to an evaluation date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleState {
    ActivePending,
    ActiveDue,
    Paused,
    Ended,
}

/// A recipe for generating future transactions.
#[derive(Debug, Clone)]
pub struct RecurringTransaction {
    pub id: Option<i64>,
    pub txn_type: TransactionType,
    pub amount: f64,
    pub currency: String,
    pub category_id: i64,
    pub description: String,
    pub frequency: Frequency,
    pub frequency_value: u32,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub last_processed: Option<NaiveDateTime>,
    /// Date of the most recent occurrence catch-up consumed, skips included.
    pub last_occurrence: Option<NaiveDate>,
    pub next_due_date: NaiveDate,
    pub is_active: bool,
}

impl RecurringTransaction {
    /// New active item whose first occurrence is its start date.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        txn_type: TransactionType,
        amount: f64,
        currency: &str,
        category_id: i64,
        description: &str,
        frequency: Frequency,
        frequency_value: u32,
        start_date: NaiveDate,
    ) -> Self {
        Self {
            id: None,
            txn_type,
            amount,
            currency: currency.to_string(),
            category_id,
            description: description.to_string(),
            frequency,
            frequency_value,
            start_date,
            end_date: None,
            last_processed: None,
            last_occurrence: None,
            next_due_date: start_date,
            is_active: true,
        }
    }

    pub fn state(&self, as_of: NaiveDate) -> ScheduleState {
        if !self.is_active {
            return match self.end_date {
                Some(end) if as_of > end || self.next_due_date > end => ScheduleState::Ended,
                _ => ScheduleState::Paused,
            };
        }
        if self.next_due_date <= as_of {
            ScheduleState::ActiveDue
        } else {
            ScheduleState::ActivePending
        }
    }

    pub fn is_past_end(&self, date: NaiveDate) -> bool {
        self.end_date.is_some_and(|end| date > end)
    }

    pub fn frequency_display(&self) -> String {
        if self.frequency_value == 1 {
            let name = self.frequency.as_str();
            let mut chars = name.chars();
            return match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            };
        }
        format!("Every {} {}", self.frequency_value, self.frequency.unit())
    }

    /// The transaction this item produces on `date`, before any override.
    pub fn generate_transaction(&self, date: NaiveDate) -> Transaction {
        Transaction {
            id: None,
            txn_type: self.txn_type,
            amount: self.amount,
            currency: self.currency.clone(),
            amount_usd: 0.0,
            category_id: self.category_id,
            description: self.description.clone(),
            date,
            recurring_transaction_id: self.id,
        }
    }
}

/// A posted income or expense. Rows tagged with `recurring_transaction_id`
/// were generated by catch-up processing.
#[derive(Debug, Clone)]
pub struct Transaction {
    pub id: Option<i64>,
    pub txn_type: TransactionType,
    pub amount: f64,
    pub currency: String,
    pub amount_usd: f64,
    pub category_id: i64,
    pub description: String,
    pub date: NaiveDate,
    pub recurring_transaction_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum OccurrenceAction {
    Skip {
        reason: String,
    },
    Modify {
        amount: Option<f64>,
        description: Option<String>,
    },
}

impl OccurrenceAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            OccurrenceAction::Skip { .. } => "skip",
            OccurrenceAction::Modify { .. } => "modify",
        }
    }
}

/// A user exception for exactly one occurrence date of one item.
#[derive(Debug, Clone, PartialEq)]
pub struct OccurrenceOverride {
    pub recurring_transaction_id: i64,
    pub occurrence_date: NaiveDate,
    pub action: OccurrenceAction,
}

impl OccurrenceOverride {
    /// Apply replacement fields to a generated transaction. Skips leave it untouched.
    pub fn apply(&self, txn: &mut Transaction) {
        if let OccurrenceAction::Modify { amount, description } = &self.action {
            if let Some(amount) = amount {
                txn.amount = *amount;
            }
            if let Some(description) = description {
                txn.description = description.clone();
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub category_type: TransactionType,
    pub is_active: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn rent() -> RecurringTransaction {
        RecurringTransaction::new(
            TransactionType::Expense,
            1500.0,
            "USD",
            1,
            "Rent",
            Frequency::Monthly,
            1,
            d(2025, 1, 1),
        )
    }

    #[test]
    fn test_new_starts_due_on_start_date() {
        let rt = rent();
        assert_eq!(rt.next_due_date, rt.start_date);
        assert!(rt.is_active);
        assert!(rt.last_processed.is_none());
        assert!(rt.last_occurrence.is_none());
    }

    #[test]
    fn test_parse_frequency_and_type() {
        assert_eq!("Weekly".parse::<Frequency>().unwrap(), Frequency::Weekly);
        assert_eq!(" income ".parse::<TransactionType>().unwrap(), TransactionType::Income);
        assert!("fortnightly".parse::<Frequency>().is_err());
        assert!("transfer".parse::<TransactionType>().is_err());
    }

    #[test]
    fn test_frequency_display() {
        let mut rt = rent();
        assert_eq!(rt.frequency_display(), "Monthly");
        rt.frequency = Frequency::Weekly;
        rt.frequency_value = 2;
        assert_eq!(rt.frequency_display(), "Every 2 weeks");
    }

    #[test]
    fn test_state_transitions() {
        let mut rt = rent();
        assert_eq!(rt.state(d(2024, 12, 31)), ScheduleState::ActivePending);
        assert_eq!(rt.state(d(2025, 1, 1)), ScheduleState::ActiveDue);
        rt.is_active = false;
        assert_eq!(rt.state(d(2025, 1, 1)), ScheduleState::Paused);
        rt.end_date = Some(d(2025, 6, 30));
        assert_eq!(rt.state(d(2025, 7, 1)), ScheduleState::Ended);
    }

    #[test]
    fn test_modify_override_keeps_unset_fields() {
        let rt = rent();
        let mut txn = rt.generate_transaction(d(2025, 1, 1));
        let ov = OccurrenceOverride {
            recurring_transaction_id: 1,
            occurrence_date: d(2025, 1, 1),
            action: OccurrenceAction::Modify {
                amount: Some(1600.0),
                description: None,
            },
        };
        ov.apply(&mut txn);
        assert_eq!(txn.amount, 1600.0);
        assert_eq!(txn.description, "Rent");
        assert_eq!(txn.category_id, 1);
    }
}
