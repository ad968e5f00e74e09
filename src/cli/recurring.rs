use std::collections::HashMap;

use colored::{ColoredString, Colorize};
use comfy_table::{Cell, Table};
use rusqlite::Connection;

use crate::cli::{parse_date, parse_date_opt, with_engine, AddArgs, RecurringCommands, UpdateArgs};
use crate::clock::{Clock, SystemClock};
use crate::engine::DeleteOutcome;
use crate::error::Result;
use crate::fmt::{amount, money};
use crate::ledger::{find_category, list_categories};
use crate::models::{
    Frequency, OccurrenceAction, OccurrenceOverride, RecurringTransaction, ScheduleState,
    Transaction, TransactionType,
};

pub fn run(command: RecurringCommands) -> Result<()> {
    match command {
        RecurringCommands::Add(args) => add(args),
        RecurringCommands::Update(args) => update(args),
        RecurringCommands::List { active } => with_engine(|engine, conn, _| {
            let items = if active { engine.get_active()? } else { engine.get_all()? };
            print_items(conn, "Recurring Transactions", &items)
        }),
        RecurringCommands::Show { id } => show(id),
        RecurringCommands::Due { as_of } => {
            let as_of = parse_date_opt(as_of.as_deref())?.unwrap_or_else(|| SystemClock.today());
            with_engine(|engine, conn, _| {
                print_items(conn, &format!("Due on or before {as_of}"), &engine.get_due(as_of)?)
            })
        }
        RecurringCommands::Upcoming { days } => with_engine(|engine, conn, _| {
            let items = engine.get_upcoming(days)?;
            print_items(conn, &format!("Due in the next {days} days"), &items)
        }),
        RecurringCommands::Expiring { days } => with_engine(|engine, conn, _| {
            let items = engine.get_expiring(days)?;
            print_items(conn, &format!("Ending in the next {days} days"), &items)
        }),
        RecurringCommands::History { id } => with_engine(|engine, _, _| {
            let rt = engine.get_by_id(id)?;
            let history = engine.generated_transactions(id)?;
            print_history(&format!("History: {}", rt.description), &history);
            Ok(())
        }),
        RecurringCommands::Pause { id } => with_engine(|engine, _, _| {
            engine.pause(id)?;
            println!("Paused recurring transaction {id}");
            Ok(())
        }),
        RecurringCommands::Resume { id } => with_engine(|engine, _, _| {
            let rt = engine.resume(id)?;
            println!("Resumed recurring transaction {id}, next due {}", rt.next_due_date);
            Ok(())
        }),
        RecurringCommands::Delete { id } => with_engine(|engine, _, _| {
            match engine.delete(id)? {
                DeleteOutcome::Deleted => println!("Deleted recurring transaction {id}"),
                DeleteOutcome::Deactivated => println!(
                    "Recurring transaction {id} has generated transactions; deactivated instead"
                ),
            }
            Ok(())
        }),
        RecurringCommands::Skip { id, date, reason } => {
            let date = parse_date(&date)?;
            with_engine(|engine, _, _| {
                engine.skip_occurrence(id, date, &reason)?;
                println!("Will skip {date} for recurring transaction {id}");
                Ok(())
            })
        }
        RecurringCommands::Modify {
            id,
            date,
            amount,
            description,
        } => {
            let date = parse_date(&date)?;
            with_engine(|engine, _, _| {
                engine.modify_occurrence(id, date, amount, description.as_deref())?;
                println!("Will modify {date} for recurring transaction {id}");
                Ok(())
            })
        }
        RecurringCommands::Overrides { id } => with_engine(|engine, _, _| {
            print_overrides(&engine.list_overrides(id)?);
            Ok(())
        }),
    }
}

fn add(args: AddArgs) -> Result<()> {
    let txn_type: TransactionType = args.txn_type.parse()?;
    let frequency: Frequency = args.frequency.parse()?;
    let start = parse_date_opt(args.start.as_deref())?.unwrap_or_else(|| SystemClock.today());
    let end = parse_date_opt(args.end.as_deref())?;

    with_engine(|engine, conn, settings| {
        let category_id = find_category(conn, &args.category)?;
        let currency = args.currency.as_deref().unwrap_or(&settings.default_currency);
        let mut rt = RecurringTransaction::new(
            txn_type,
            args.amount,
            currency,
            category_id,
            &args.description,
            frequency,
            args.every,
            start,
        );
        rt.end_date = end;
        let id = engine.create(&mut rt)?;
        println!(
            "Added recurring {txn_type} {id}: {} {} {}, first due {}",
            rt.description,
            amount(rt.amount, &rt.currency),
            rt.frequency_display().to_lowercase(),
            rt.next_due_date
        );
        Ok(())
    })
}

fn update(args: UpdateArgs) -> Result<()> {
    with_engine(|engine, conn, _| {
        let mut rt = engine.get_by_id(args.id)?;
        if let Some(description) = args.description {
            rt.description = description;
        }
        if let Some(value) = args.amount {
            rt.amount = value;
        }
        if let Some(category) = &args.category {
            rt.category_id = find_category(conn, category)?;
        }
        if let Some(txn_type) = &args.txn_type {
            rt.txn_type = txn_type.parse()?;
        }
        if let Some(currency) = args.currency {
            rt.currency = currency;
        }
        if let Some(frequency) = &args.frequency {
            rt.frequency = frequency.parse()?;
        }
        if let Some(every) = args.every {
            rt.frequency_value = every;
        }
        if let Some(start) = parse_date_opt(args.start.as_deref())? {
            rt.start_date = start;
        }
        if args.no_end {
            rt.end_date = None;
        } else if let Some(end) = parse_date_opt(args.end.as_deref())? {
            rt.end_date = Some(end);
        }

        let updated = engine.update(args.id, rt)?;
        println!(
            "Updated recurring transaction {}, next due {}",
            args.id, updated.next_due_date
        );
        Ok(())
    })
}

fn show(id: i64) -> Result<()> {
    with_engine(|engine, conn, _| {
        let rt = engine.get_by_id(id)?;
        let names = category_names(conn)?;
        let today = SystemClock.today();

        let mut table = Table::new();
        table.set_header(vec!["Field", "Value"]);
        let rows: Vec<(&str, String)> = vec![
            ("Description", rt.description.clone()),
            ("Type", rt.txn_type.to_string()),
            ("Amount", amount(rt.amount, &rt.currency)),
            ("Category", names.get(&rt.category_id).cloned().unwrap_or_default()),
            ("Frequency", rt.frequency_display()),
            ("Start", rt.start_date.to_string()),
            ("End", rt.end_date.map(|d| d.to_string()).unwrap_or_default()),
            ("Next due", rt.next_due_date.to_string()),
            (
                "Last processed",
                rt.last_processed
                    .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_default(),
            ),
            (
                "Last occurrence",
                rt.last_occurrence.map(|d| d.to_string()).unwrap_or_default(),
            ),
        ];
        for (field, value) in rows {
            table.add_row(vec![Cell::new(field), Cell::new(value)]);
        }
        table.add_row(vec![Cell::new("State"), Cell::new(state_label(rt.state(today)))]);
        println!("Recurring Transaction {id}\n{table}");

        let overrides = engine.list_overrides(id)?;
        if !overrides.is_empty() {
            print_overrides(&overrides);
        }
        let history = engine.generated_transactions(id)?;
        if !history.is_empty() {
            let recent = &history[..history.len().min(5)];
            print_history(&format!("Recent ({} total)", history.len()), recent);
        }
        Ok(())
    })
}

fn category_names(conn: &Connection) -> Result<HashMap<i64, String>> {
    Ok(list_categories(conn)?
        .into_iter()
        .map(|c| (c.id, c.name))
        .collect())
}

fn state_label(state: ScheduleState) -> ColoredString {
    match state {
        ScheduleState::ActiveDue => "due".yellow().bold(),
        ScheduleState::ActivePending => "active".green(),
        ScheduleState::Paused => "paused".dimmed(),
        ScheduleState::Ended => "ended".red(),
    }
}

fn signed(value: String, txn_type: TransactionType) -> String {
    match txn_type {
        TransactionType::Income => value.green().to_string(),
        TransactionType::Expense => value.red().to_string(),
    }
}

fn print_items(conn: &Connection, title: &str, items: &[RecurringTransaction]) -> Result<()> {
    if items.is_empty() {
        println!("{title}: none");
        return Ok(());
    }
    let names = category_names(conn)?;
    let today = SystemClock.today();

    let mut table = Table::new();
    table.set_header(vec![
        "ID", "Description", "Amount", "Category", "Frequency", "Next Due", "Ends", "State",
    ]);
    for rt in items {
        table.add_row(vec![
            Cell::new(rt.id.unwrap_or_default()),
            Cell::new(&rt.description),
            Cell::new(signed(amount(rt.amount, &rt.currency), rt.txn_type)),
            Cell::new(names.get(&rt.category_id).cloned().unwrap_or_default()),
            Cell::new(rt.frequency_display()),
            Cell::new(rt.next_due_date),
            Cell::new(rt.end_date.map(|d| d.to_string()).unwrap_or_default()),
            Cell::new(state_label(rt.state(today))),
        ]);
    }
    println!("{title}\n{table}");
    Ok(())
}

fn print_history(title: &str, history: &[Transaction]) {
    if history.is_empty() {
        println!("{title}: no transactions generated yet");
        return;
    }
    let mut table = Table::new();
    table.set_header(vec!["ID", "Date", "Description", "Amount", "USD"]);
    for txn in history {
        table.add_row(vec![
            Cell::new(txn.id.unwrap_or_default()),
            Cell::new(txn.date),
            Cell::new(&txn.description),
            Cell::new(amount(txn.amount, &txn.currency)),
            Cell::new(signed(money(txn.amount_usd), txn.txn_type)),
        ]);
    }
    println!("{title}\n{table}");
}

fn print_overrides(overrides: &[OccurrenceOverride]) {
    if overrides.is_empty() {
        println!("Overrides: none");
        return;
    }
    let mut table = Table::new();
    table.set_header(vec!["Date", "Action", "Details"]);
    for ov in overrides {
        let details = match &ov.action {
            OccurrenceAction::Skip { reason } => reason.clone(),
            OccurrenceAction::Modify { amount, description } => {
                let mut parts = Vec::new();
                if let Some(value) = amount {
                    parts.push(format!("amount {value:.2}"));
                }
                if let Some(text) = description {
                    parts.push(format!("description '{text}'"));
                }
                parts.join(", ")
            }
        };
        table.add_row(vec![
            Cell::new(ov.occurrence_date),
            Cell::new(ov.action.as_str()),
            Cell::new(details),
        ]);
    }
    println!("Overrides\n{table}");
}
