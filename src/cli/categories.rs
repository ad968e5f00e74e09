use comfy_table::{Cell, Table};

use crate::cli::open_db;
use crate::error::Result;
use crate::ledger::list_categories;

pub fn list() -> Result<()> {
    let (_, conn) = open_db()?;
    let categories = list_categories(&conn)?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", "Type", "Active"]);
    for cat in categories {
        table.add_row(vec![
            Cell::new(cat.id),
            Cell::new(cat.name),
            Cell::new(cat.category_type),
            Cell::new(if cat.is_active { "yes" } else { "no" }),
        ]);
    }
    println!("Categories\n{table}");
    Ok(())
}
