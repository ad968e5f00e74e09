use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::cli::{parse_date_opt, with_engine};
use crate::clock::{Clock, SystemClock};
use crate::error::Result;

pub fn run(as_of: Option<String>) -> Result<()> {
    let as_of = parse_date_opt(as_of.as_deref())?.unwrap_or_else(|| SystemClock.today());
    with_engine(|engine, _, _| {
        let report = engine.process_due_transactions(as_of)?;
        println!(
            "Processed {} occurrences through {as_of} ({} transactions posted)",
            report.processed, report.generated
        );
        if report.errors.is_empty() {
            return Ok(());
        }

        let mut table = Table::new();
        table.set_header(vec!["ID", "Error"]);
        for err in &report.errors {
            table.add_row(vec![
                Cell::new(err.recurring_transaction_id),
                Cell::new(err.error.to_string().red()),
            ]);
        }
        println!("{}\n{table}", "Failed".red().bold());
        Ok(())
    })
}
