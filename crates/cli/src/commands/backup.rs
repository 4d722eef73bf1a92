use std::io::Read;
use std::time::Duration;

use anyhow::{Context, Result};

use stockbook_infra::workers::AutoBackupWorker;

use crate::args::BackupCommands;
use crate::context::AppContext;
use crate::output::{print_json, print_table};

pub fn run(ctx: &AppContext, command: BackupCommands) -> Result<()> {
    let backups = &ctx.backups;
    match command {
        BackupCommands::Create => {
            let table = ctx.table()?;
            let settings = ctx.load_settings()?;
            let info = backups.create_backup(&table, "manual", &settings.backup, ctx.now())?;
            if ctx.json {
                return print_json(&info);
            }
            println!("backup created: {}", info.file_name);
        }
        BackupCommands::List => {
            let list = backups.list()?;
            if ctx.json {
                return print_json(&list);
            }
            let body: Vec<Vec<String>> = list
                .iter()
                .map(|b| {
                    vec![
                        b.file_name.clone(),
                        b.table.clone(),
                        b.kind.clone(),
                        b.created_at.clone(),
                        b.size_bytes.to_string(),
                    ]
                })
                .collect();
            print_table(&["file", "table", "kind", "created_at", "bytes"], &body);
        }
        BackupCommands::Restore { file_name } => {
            let table = ctx.table()?;
            let settings = ctx.load_settings()?;
            backups.restore(&table, &file_name, &settings.backup, ctx.now())?;
            println!("table {table:?} restored from {file_name}");
        }
        BackupCommands::Delete { file_name } => {
            backups.delete(&file_name)?;
            println!("backup {file_name} deleted");
        }
        BackupCommands::Watch { interval_secs } => {
            let interval = match interval_secs {
                Some(secs) => Duration::from_secs(secs.max(1)),
                None => AutoBackupWorker::configured_interval(&ctx.settings),
            };
            let handle = AutoBackupWorker::spawn(backups.clone(), ctx.settings.clone(), interval)
                .context("failed to start the backup worker")?;
            eprintln!("backing up every {}s; close stdin to stop", interval.as_secs());

            let mut sink = Vec::new();
            let read = std::io::stdin().read_to_end(&mut sink);
            handle.shutdown();
            read.context("failed to read stdin")?;
        }
    }
    Ok(())
}
