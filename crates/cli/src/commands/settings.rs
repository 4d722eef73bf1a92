use anyhow::{Result, bail};

use stockbook_infra::settings::NameList;
use stockbook_infra::table::HEADER;

use crate::args::{NameListArg, SettingsCommands};
use crate::context::AppContext;
use crate::output::print_json;

impl From<NameListArg> for NameList {
    fn from(value: NameListArg) -> Self {
        match value {
            NameListArg::Suppliers => NameList::Suppliers,
            NameListArg::Counters => NameList::Counters,
        }
    }
}

pub fn run(ctx: &AppContext, command: SettingsCommands) -> Result<()> {
    let store = &ctx.settings;
    match command {
        SettingsCommands::Show => {
            let settings = ctx.load_settings()?;
            print_json(&settings)?;
        }
        SettingsCommands::AddName { list, name } => {
            if !store.update("name.add", |s| Ok(s.add_name(list.into(), &name)))? {
                bail!("{name:?} is blank or already listed");
            }
        }
        SettingsCommands::RenameName { list, old, new } => {
            if !store.update("name.rename", |s| Ok(s.rename_name(list.into(), &old, &new)))? {
                bail!("cannot rename {old:?} to {new:?}");
            }
        }
        SettingsCommands::RemoveName { list, name } => {
            if !store.update("name.remove", |s| Ok(s.remove_name(list.into(), &name)))? {
                bail!("{name:?} is not listed");
            }
        }
        SettingsCommands::Columns { page, columns } => {
            if let Some(unknown) = columns.iter().find(|c| !HEADER.contains(&c.as_str())) {
                bail!("unknown column {unknown:?}");
            }
            store.update("display_columns", |s| s.set_display_columns(page.into(), columns))?;
        }
        SettingsCommands::ResetColumns { page } => {
            store.update("display_columns", |s| {
                s.reset_display_columns(page.into());
                Ok(())
            })?;
        }
        SettingsCommands::Barcode { barcode, product } => {
            store.update("barcode_mapping", |s| s.set_barcode_mapping(&barcode, &product))?;
        }
        SettingsCommands::RemoveBarcode { barcode } => {
            if !store.update("barcode_mapping", |s| Ok(s.remove_barcode_mapping(&barcode)))? {
                bail!("no product bound to barcode {barcode:?}");
            }
        }
        SettingsCommands::Defaults {
            buy_price,
            commission,
            quantity,
        } => {
            store.update("defaults", |s| {
                s.defaults.buy_price = buy_price.or(s.defaults.buy_price);
                s.defaults.commission = commission.or(s.defaults.commission);
                s.defaults.quantity = quantity.or(s.defaults.quantity);
                Ok(())
            })?;
        }
        SettingsCommands::Backup {
            enabled,
            on_operation,
            interval_hours,
            max_backups,
        } => {
            store.update("backup", |s| {
                let backup = &mut s.backup;
                backup.enabled = enabled.unwrap_or(backup.enabled);
                backup.backup_on_operation = on_operation.unwrap_or(backup.backup_on_operation);
                backup.auto_backup_interval_hours = interval_hours.unwrap_or(backup.auto_backup_interval_hours);
                backup.max_backups = max_backups.unwrap_or(backup.max_backups);
                Ok(())
            })?;
        }
    }
    Ok(())
}
