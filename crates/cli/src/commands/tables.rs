use anyhow::Result;

use crate::args::TableCommands;
use crate::context::AppContext;
use crate::output::print_json;

pub fn run(ctx: &AppContext, command: TableCommands) -> Result<()> {
    let catalog = &ctx.catalog;
    match command {
        TableCommands::List => {
            let tables = catalog.list()?;
            let active = catalog.active()?;
            if ctx.json {
                return print_json(&serde_json::json!({ "tables": tables, "active": active }));
            }
            for table in tables {
                let marker = if table == active { "*" } else { " " };
                println!("{marker} {table}");
            }
        }
        TableCommands::Add { name } => {
            catalog.add(&name)?;
            println!("table {name:?} added");
        }
        TableCommands::Rename { old, new } => {
            catalog.rename(&old, &new)?;
            println!("table {old:?} renamed to {new:?}");
        }
        TableCommands::Delete { name } => {
            catalog.delete(&name)?;
            println!("table {name:?} removed (file kept)");
        }
        TableCommands::Switch { name } => {
            catalog.switch(&name)?;
            println!("active table is now {name:?}");
        }
    }
    Ok(())
}
