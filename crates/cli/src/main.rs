mod args;
mod commands;
mod context;
mod output;

use anyhow::Result;
use clap::Parser;

use stockbook_infra::AppConfig;

use crate::args::{Cli, Commands};
use crate::commands::{backup, inventory, query, settings, tables};
use crate::context::AppContext;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load(cli.config.as_deref())?;
    stockbook_observability::init(&config.log);

    let ctx = AppContext::new(config, cli.table, cli.json)?;
    let result = dispatch(&ctx, cli.command);
    ctx.flush_events();
    result
}

fn dispatch(ctx: &AppContext, command: Commands) -> Result<()> {
    match command {
        Commands::Inbound(args) => inventory::inbound(ctx, args),
        Commands::BulkInbound(args) => inventory::bulk_inbound(ctx, args),
        Commands::Withdraw(args) => inventory::withdraw(ctx, args),
        Commands::Ship(args) => inventory::ship(ctx, args),
        Commands::Modify(args) => inventory::modify(ctx, args),
        Commands::Delete(args) => inventory::delete(ctx, args),
        Commands::Show(args) => inventory::show(ctx, args),
        Commands::List(args) => inventory::list(ctx, args),
        Commands::Audit => inventory::audit(ctx),
        Commands::Query(command) => query::run(ctx, command),
        Commands::Tables(command) => tables::run(ctx, command),
        Commands::Settings(command) => settings::run(ctx, command),
        Commands::Backup(command) => backup::run(ctx, command),
    }
}
