use comfy_table::{Cell, Table};

use crate::cli::open_db;
use crate::currency::{list_rates, set_rate};
use crate::error::Result;

pub fn set(currency: &str, rate: f64) -> Result<()> {
    let (settings, conn) = open_db()?;
    set_rate(&conn, currency, rate)?;
    let code = currency.to_uppercase();
    if settings.fixed_rates.contains_key(&code) {
        println!("Stored {code} = {rate} per USD (a fixed rate in settings takes precedence)");
    } else {
        println!("Stored {code} = {rate} per USD");
    }
    Ok(())
}

pub fn list() -> Result<()> {
    let (settings, conn) = open_db()?;

    let mut fixed: Vec<(&String, &f64)> = settings.fixed_rates.iter().collect();
    fixed.sort_by(|a, b| a.0.cmp(b.0));

    let mut table = Table::new();
    table.set_header(vec!["Currency", "Per USD", "Source", "Updated"]);
    for (code, rate) in fixed {
        table.add_row(vec![
            Cell::new(code),
            Cell::new(rate),
            Cell::new("fixed"),
            Cell::new(""),
        ]);
    }
    for (code, rate, updated_at) in list_rates(&conn)? {
        table.add_row(vec![
            Cell::new(code),
            Cell::new(rate),
            Cell::new("stored"),
            Cell::new(updated_at),
        ]);
    }
    println!("Exchange Rates\n{table}");
    Ok(())
}
