mod cli;
mod clock;
mod currency;
mod db;
mod engine;
mod error;
mod fmt;
mod ledger;
mod models;
mod overrides;
mod projection;
mod recurring;
mod schedule;
mod settings;
mod validation;

use clap::Parser;

use cli::{CategoriesCommands, Cli, Commands, RatesCommands};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init { data_dir } => cli::init::run(data_dir),
        Commands::Categories { command } => match command {
            CategoriesCommands::List => cli::categories::list(),
        },
        Commands::Recurring { command } => cli::recurring::run(command),
        Commands::Process { as_of } => cli::process::run(as_of),
        Commands::Project { from, to, months } => cli::project::run(from, to, months),
        Commands::Rates { command } => match command {
            RatesCommands::Set { currency, rate } => cli::rates::set(&currency, rate),
            RatesCommands::List => cli::rates::list(),
        },
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
