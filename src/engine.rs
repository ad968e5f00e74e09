use chrono::{Days, NaiveDate};
use rusqlite::Connection;

use crate::clock::Clock;
use crate::currency::CurrencyConverter;
use crate::error::{BurnwiseError, Result};
use crate::ledger::{self, CategoryLookup, TransactionSink};
use crate::models::{OccurrenceAction, OccurrenceOverride, RecurringTransaction, Transaction};
use crate::overrides;
use crate::projection::{self, ProjectedItem};
use crate::recurring;
use crate::schedule;
use crate::validation;

pub const DEFAULT_MAX_ITERATIONS: usize = 10_000;

#[derive(Debug)]
pub struct ItemError {
    pub recurring_transaction_id: i64,
    pub error: BurnwiseError,
}

/// Outcome of one catch-up batch.
#[derive(Debug, Default)]
pub struct ProcessReport {
    /// Occurrences consumed, skips included.
    pub processed: usize,
    /// Transactions actually written.
    pub generated: usize,
    pub errors: Vec<ItemError>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    /// Had generated history, so it was paused instead.
    Deactivated,
}

pub struct RecurrenceEngine<'a> {
    conn: &'a Connection,
    sink: &'a dyn TransactionSink,
    converter: &'a dyn CurrencyConverter,
    categories: &'a dyn CategoryLookup,
    clock: &'a dyn Clock,
    max_iterations: usize,
}

impl<'a> RecurrenceEngine<'a> {
    pub fn new(
        conn: &'a Connection,
        sink: &'a dyn TransactionSink,
        converter: &'a dyn CurrencyConverter,
        categories: &'a dyn CategoryLookup,
        clock: &'a dyn Clock,
    ) -> Self {
        Self {
            conn,
            sink,
            converter,
            categories,
            clock,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    pub fn create(&self, rt: &mut RecurringTransaction) -> Result<i64> {
        validation::normalize(rt);
        validation::validate(rt, self.categories)?;
        let id = recurring::insert(self.conn, rt)?;
        rt.id = Some(id);
        log::info!(
            "created recurring {} {} ({}), first due {}",
            rt.txn_type,
            id,
            rt.frequency_display(),
            rt.next_due_date
        );
        Ok(id)
    }

    /// Replace the user-editable fields of `id`. Schedule state is carried over.
    /// A cadence change restarts the schedule one step after the last consumed
    /// occurrence, or at `start_date` if nothing was consumed yet.
    pub fn update(
        &self,
        id: i64,
        mut changes: RecurringTransaction,
    ) -> Result<RecurringTransaction> {
        let existing = recurring::get(self.conn, id)?;
        validation::normalize(&mut changes);

        changes.id = Some(id);
        changes.last_processed = existing.last_processed;
        changes.last_occurrence = existing.last_occurrence;
        changes.is_active = existing.is_active;

        let cadence_changed = changes.frequency != existing.frequency
            || changes.frequency_value != existing.frequency_value;
        let start_moved = changes.start_date != existing.start_date;
        changes.next_due_date = match existing.last_occurrence {
            None if cadence_changed || start_moved => changes.start_date,
            Some(last) if cadence_changed => {
                schedule::next_due_date(last, changes.frequency, changes.frequency_value)?
            }
            _ => existing.next_due_date,
        };

        validation::validate(&changes, self.categories)?;
        recurring::update(self.conn, id, &changes)?;
        log::info!("updated recurring transaction {id}, next due {}", changes.next_due_date);
        Ok(changes)
    }

    /// Hard-delete when nothing was ever generated, otherwise pause so the
    /// history keeps a valid back-reference.
    pub fn delete(&self, id: i64) -> Result<DeleteOutcome> {
        recurring::get(self.conn, id)?;
        if ledger::count_generated(self.conn, id)? > 0 {
            recurring::set_active(self.conn, id, false)?;
            log::info!("recurring transaction {id} has history, deactivated instead of deleted");
            return Ok(DeleteOutcome::Deactivated);
        }
        recurring::delete(self.conn, id)?;
        log::info!("deleted recurring transaction {id}");
        Ok(DeleteOutcome::Deleted)
    }

    pub fn get_by_id(&self, id: i64) -> Result<RecurringTransaction> {
        recurring::get(self.conn, id)
    }

    pub fn get_all(&self) -> Result<Vec<RecurringTransaction>> {
        recurring::list_all(self.conn)
    }

    pub fn get_active(&self) -> Result<Vec<RecurringTransaction>> {
        recurring::list_active(self.conn)
    }

    pub fn get_due(&self, as_of: NaiveDate) -> Result<Vec<RecurringTransaction>> {
        recurring::list_due(self.conn, as_of)
    }

    /// Catch every due item up to `as_of`. A failing item keeps its schedule
    /// position at the failed occurrence; the rest of the batch still runs.
    pub fn process_due_transactions(&self, as_of: NaiveDate) -> Result<ProcessReport> {
        let mut report = ProcessReport::default();
        for mut rt in self.get_due(as_of)? {
            let Some(id) = rt.id else { continue };
            if let Err(error) = self.catch_up(id, &mut rt, as_of, &mut report) {
                log::warn!("recurring transaction {id} stopped at {}: {error}", rt.next_due_date);
                report.errors.push(ItemError {
                    recurring_transaction_id: id,
                    error,
                });
            }
        }
        log::info!(
            "processed {} occurrences through {as_of}: {} generated, {} failed",
            report.processed,
            report.generated,
            report.errors.len()
        );
        Ok(report)
    }

    fn catch_up(
        &self,
        id: i64,
        rt: &mut RecurringTransaction,
        as_of: NaiveDate,
        report: &mut ProcessReport,
    ) -> Result<()> {
        let mut steps = 0usize;
        while rt.is_active && rt.next_due_date <= as_of {
            if steps >= self.max_iterations {
                return Err(BurnwiseError::IterationLimit {
                    id,
                    limit: self.max_iterations,
                });
            }
            let occurrence = rt.next_due_date;

            if rt.is_past_end(occurrence) {
                rt.is_active = false;
                recurring::save_schedule(self.conn, id, rt)?;
                log::info!("recurring transaction {id} ended before {occurrence}");
                break;
            }

            let txn = match overrides::lookup(self.conn, id, occurrence)? {
                Some(OccurrenceOverride {
                    action: OccurrenceAction::Skip { reason },
                    ..
                }) => {
                    log::debug!("skipping {occurrence} for recurring transaction {id}: {reason}");
                    None
                }
                modify => Some(self.build_transaction(rt, occurrence, modify.as_ref())?),
            };

            let mut advanced = rt.clone();
            advanced.next_due_date =
                schedule::next_due_date(occurrence, rt.frequency, rt.frequency_value)?;
            advanced.last_processed = Some(self.clock.now());
            advanced.last_occurrence = Some(occurrence);
            if advanced.is_past_end(as_of) || advanced.is_past_end(advanced.next_due_date) {
                advanced.is_active = false;
            }

            let tx = self.conn.unchecked_transaction()?;
            if let Some(txn) = &txn {
                self.sink.create(&tx, txn)?;
            }
            recurring::save_schedule(&tx, id, &advanced)?;
            tx.commit()?;

            log::debug!(
                "recurring transaction {id} advanced {occurrence} -> {}",
                advanced.next_due_date
            );
            if !advanced.is_active {
                log::info!("recurring transaction {id} reached its end date");
            }
            *rt = advanced;
            report.processed += 1;
            if txn.is_some() {
                report.generated += 1;
            }
            steps += 1;
        }
        Ok(())
    }

    fn build_transaction(
        &self,
        rt: &RecurringTransaction,
        occurrence: NaiveDate,
        modify: Option<&OccurrenceOverride>,
    ) -> Result<Transaction> {
        let mut txn = rt.generate_transaction(occurrence);
        if let Some(ov) = modify {
            ov.apply(&mut txn);
        }
        txn.amount_usd = self.converter.convert_to_usd(txn.amount, &txn.currency)?;
        Ok(txn)
    }

    pub fn skip_occurrence(&self, id: i64, date: NaiveDate, reason: &str) -> Result<()> {
        recurring::get(self.conn, id)?;
        overrides::record_skip(self.conn, id, date, reason)?;
        log::info!("recurring transaction {id}: {date} will be skipped");
        Ok(())
    }

    pub fn modify_occurrence(
        &self,
        id: i64,
        date: NaiveDate,
        amount: Option<f64>,
        description: Option<&str>,
    ) -> Result<()> {
        recurring::get(self.conn, id)?;
        overrides::record_modify(self.conn, id, date, amount, description)?;
        log::info!("recurring transaction {id}: {date} will be modified");
        Ok(())
    }

    pub fn list_overrides(&self, id: i64) -> Result<Vec<OccurrenceOverride>> {
        recurring::get(self.conn, id)?;
        overrides::list_for(self.conn, id)
    }

    pub fn generated_transactions(&self, id: i64) -> Result<Vec<Transaction>> {
        ledger::generated_transactions(self.conn, id)
    }

    pub fn pause(&self, id: i64) -> Result<()> {
        recurring::set_active(self.conn, id, false)?;
        log::info!("paused recurring transaction {id}");
        Ok(())
    }

    /// Reactivate `id`, jumping its schedule past today without generating
    /// anything for the cycles missed while paused. The dropped cycles count
    /// as consumed. An item with no occurrence left before its end date stays
    /// paused and the call fails with a validation error.
    pub fn resume(&self, id: i64) -> Result<RecurringTransaction> {
        let mut rt = recurring::get(self.conn, id)?;
        let today = self.clock.today();
        let walk = schedule::advance_while(
            rt.next_due_date,
            rt.frequency,
            rt.frequency_value,
            self.max_iterations,
            id,
            |d| d <= today,
        )?;
        if let Some(end) = rt.end_date.filter(|end| walk.next > *end) {
            return Err(BurnwiseError::Validation(format!(
                "recurring transaction {id} ended on {end} and cannot be resumed"
            )));
        }

        rt.next_due_date = walk.next;
        rt.last_occurrence = walk.passed.or(rt.last_occurrence);
        rt.is_active = true;
        recurring::save_schedule(self.conn, id, &rt)?;

        log::info!(
            "resumed recurring transaction {id}, {} missed cycles dropped, next due {}",
            walk.steps,
            walk.next
        );
        Ok(rt)
    }

    /// Active items due in `[today, today + days]`.
    pub fn get_upcoming(&self, days: u64) -> Result<Vec<RecurringTransaction>> {
        let (from, to) = self.window(days)?;
        recurring::list_upcoming(self.conn, from, to)
    }

    /// Active items whose end date falls in `[today, today + days]`.
    pub fn get_expiring(&self, days: u64) -> Result<Vec<RecurringTransaction>> {
        let (from, to) = self.window(days)?;
        recurring::list_expiring(self.conn, from, to)
    }

    fn window(&self, days: u64) -> Result<(NaiveDate, NaiveDate)> {
        let today = self.clock.today();
        let to = today
            .checked_add_days(Days::new(days))
            .ok_or(BurnwiseError::DateOverflow(today))?;
        Ok((today, to))
    }

    pub fn calculate_projected_amount(&self, start: NaiveDate, end: NaiveDate) -> Result<f64> {
        let items = self.get_active()?;
        projection::calculate_projected_amount(
            &items,
            start,
            end,
            self.converter,
            self.max_iterations,
        )
    }

    pub fn project(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<ProjectedItem>> {
        let items = self.get_active()?;
        projection::project(&items, start, end, self.converter, self.max_iterations)
    }
}
