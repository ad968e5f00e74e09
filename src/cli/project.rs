use chrono::Months;
use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::cli::{parse_date_opt, with_engine};
use crate::clock::{Clock, SystemClock};
use crate::error::{BurnwiseError, Result};
use crate::fmt::money;
use crate::models::TransactionType;

pub fn run(from: Option<String>, to: Option<String>, months: u32) -> Result<()> {
    let start = parse_date_opt(from.as_deref())?.unwrap_or_else(|| SystemClock.today());
    let end = match parse_date_opt(to.as_deref())? {
        Some(end) => end,
        None => start
            .checked_add_months(Months::new(months))
            .ok_or(BurnwiseError::DateOverflow(start))?,
    };

    with_engine(|engine, _, _| {
        let items = engine.project(start, end)?;

        let mut table = Table::new();
        table.set_header(vec!["ID", "Description", "Type", "Count", "Each (USD)", "Net (USD)"]);
        for item in &items {
            let net = match item.txn_type {
                TransactionType::Income => money(item.net_usd).green().to_string(),
                TransactionType::Expense => money(item.net_usd).red().to_string(),
            };
            table.add_row(vec![
                Cell::new(item.id),
                Cell::new(&item.description),
                Cell::new(item.txn_type),
                Cell::new(item.occurrences),
                Cell::new(money(item.amount_usd)),
                Cell::new(net),
            ]);
        }

        let total = engine.calculate_projected_amount(start, end)?;
        let total_label = if total >= 0.0 {
            money(total).green().bold()
        } else {
            money(total).red().bold()
        };
        table.add_row(vec![
            Cell::new(""),
            Cell::new("NET".bold()),
            Cell::new(""),
            Cell::new(""),
            Cell::new(""),
            Cell::new(total_label),
        ]);
        println!("Projection {start} to {end}\n{table}");
        Ok(())
    })
}
