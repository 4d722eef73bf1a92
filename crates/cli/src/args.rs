use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

use stockbook_core::{Money, OrderNumber};
use stockbook_infra::settings::Page;
use stockbook_inventory::parse_quantity;

#[derive(Parser)]
#[command(name = "stockbook", about = "Inventory book for inbound intake and partial outbound", version)]
pub struct Cli {
    /// Config file (defaults to ./stockbook.toml when present).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Table to operate on instead of the active one.
    #[arg(long, global = true)]
    pub table: Option<String>,

    #[arg(
        long,
        global = true,
        action = ArgAction::SetTrue,
        help = "Render command output as pretty JSON"
    )]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Register one inbound intake.
    Inbound(InboundArgs),
    /// Register several intakes from one delivery (CSV file of lines).
    BulkInbound(BulkInboundArgs),
    /// Ship part of a record's remaining quantity.
    Withdraw(WithdrawArgs),
    /// Ship everything a record has left.
    Ship(ShipArgs),
    /// Edit fields of a record.
    Modify(ModifyArgs),
    /// Delete a record.
    Delete(OrderArgs),
    /// Show one record and its outbound ledger.
    Show(OrderArgs),
    /// List rows of the table.
    List(ListArgs),
    #[command(subcommand)]
    Query(QueryCommands),
    /// Report rows whose ledger disagrees with their quantities.
    Audit,
    #[command(subcommand)]
    Tables(TableCommands),
    #[command(subcommand)]
    Settings(SettingsCommands),
    #[command(subcommand)]
    Backup(BackupCommands),
}

#[derive(Args)]
pub struct InboundArgs {
    #[arg(long)]
    pub supplier: String,
    /// Product name; filled from the barcode mapping when omitted.
    #[arg(long, default_value = "")]
    pub product: String,
    #[arg(long, default_value = "")]
    pub barcode: String,
    /// Falls back to the configured default.
    #[arg(long)]
    pub buy_price: Option<Money>,
    /// Falls back to the configured default, then zero.
    #[arg(long)]
    pub commission: Option<Money>,
    /// Falls back to the configured default.
    #[arg(long, value_parser = parse_quantity)]
    pub quantity: Option<u32>,
    #[arg(long, default_value = "")]
    pub unit: String,
    #[arg(long, default_value = "")]
    pub inbound_tracking: String,
    #[arg(long, default_value = "")]
    pub color: String,
    #[arg(long, default_value = "否")]
    pub settlement_status: String,
    /// Defaults to now.
    #[arg(long, default_value = "")]
    pub inbound_time: String,
}

#[derive(Args)]
pub struct BulkInboundArgs {
    #[arg(long)]
    pub supplier: String,
    #[arg(long)]
    pub inbound_tracking: String,
    #[arg(long, default_value = "")]
    pub inbound_time: String,
    /// CSV with header `barcode,product,buy_price,commission,quantity,unit,color`.
    #[arg(long)]
    pub file: PathBuf,
}

#[derive(Args)]
pub struct OrderArgs {
    pub order_number: OrderNumber,
}

#[derive(Args)]
pub struct WithdrawArgs {
    pub order_number: OrderNumber,
    #[arg(long, value_parser = parse_quantity)]
    pub quantity: u32,
    #[arg(long)]
    pub tracking: String,
    #[arg(long)]
    pub counter: String,
}

#[derive(Args)]
pub struct ShipArgs {
    pub order_number: OrderNumber,
    #[arg(long)]
    pub tracking: String,
    #[arg(long)]
    pub counter: String,
    #[arg(long)]
    pub shipping_price: Option<Money>,
}

#[derive(Args)]
pub struct ModifyArgs {
    pub order_number: OrderNumber,
    #[arg(long)]
    pub supplier: Option<String>,
    #[arg(long)]
    pub inbound_time: Option<String>,
    #[arg(long)]
    pub barcode: Option<String>,
    #[arg(long)]
    pub product: Option<String>,
    #[arg(long, value_parser = parse_quantity)]
    pub quantity: Option<u32>,
    #[arg(long)]
    pub unit: Option<String>,
    #[arg(long)]
    pub inbound_tracking: Option<String>,
    #[arg(long)]
    pub source: Option<String>,
    #[arg(long)]
    pub color: Option<String>,
    #[arg(long)]
    pub buy_price: Option<Money>,
    #[arg(long)]
    pub commission: Option<Money>,
    #[arg(long)]
    pub market_price: Option<Money>,
    #[arg(long)]
    pub settlement_status: Option<String>,
    #[arg(long)]
    pub shipping_price: Option<Money>,
    #[arg(long)]
    pub note: Option<String>,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum PageArg {
    Inbound,
    Outbound,
    DataQuery,
}

impl From<PageArg> for Page {
    fn from(value: PageArg) -> Self {
        match value {
            PageArg::Inbound => Page::Inbound,
            PageArg::Outbound => Page::Outbound,
            PageArg::DataQuery => Page::DataQuery,
        }
    }
}

#[derive(Args)]
pub struct ListArgs {
    /// Page whose display columns are used.
    #[arg(long, value_enum, default_value = "data-query")]
    pub page: PageArg,
    /// Print every column instead of the configured ones.
    #[arg(long)]
    pub all_columns: bool,
}

#[derive(Subcommand)]
pub enum QueryCommands {
    /// Market minus settlement price, per product.
    ProfitByProduct,
    /// Market minus settlement price, per supplier.
    ProfitBySupplier,
    /// Rows shipped under a tracking number.
    Tracking { tracking_number: String },
    /// Number of intakes per supplier.
    SupplierCounts,
    /// Summary figures.
    Metrics,
    /// Outbound ledger of one record.
    Outbound { order_number: OrderNumber },
}

#[derive(Subcommand)]
pub enum TableCommands {
    List,
    Add { name: String },
    Rename { old: String, new: String },
    /// Forget a table; its file is kept.
    Delete { name: String },
    Switch { name: String },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum NameListArg {
    Suppliers,
    Counters,
}

#[derive(Subcommand)]
pub enum SettingsCommands {
    Show,
    /// Add a supplier or counter name.
    AddName { list: NameListArg, name: String },
    RenameName { list: NameListArg, old: String, new: String },
    RemoveName { list: NameListArg, name: String },
    /// Set the columns shown on a page (in order).
    Columns {
        #[arg(value_enum)]
        page: PageArg,
        #[arg(required = true)]
        columns: Vec<String>,
    },
    ResetColumns {
        #[arg(value_enum)]
        page: PageArg,
    },
    Barcode { barcode: String, product: String },
    RemoveBarcode { barcode: String },
    Defaults {
        #[arg(long)]
        buy_price: Option<Money>,
        #[arg(long)]
        commission: Option<Money>,
        #[arg(long, value_parser = parse_quantity)]
        quantity: Option<u32>,
    },
    Backup {
        #[arg(long)]
        enabled: Option<bool>,
        #[arg(long)]
        on_operation: Option<bool>,
        #[arg(long)]
        interval_hours: Option<u64>,
        #[arg(long)]
        max_backups: Option<usize>,
    },
}

#[derive(Subcommand)]
pub enum BackupCommands {
    Create,
    List,
    Restore { file_name: String },
    Delete { file_name: String },
    /// Run periodic backups until stdin is closed.
    Watch {
        /// Override the configured interval, in seconds.
        #[arg(long)]
        interval_secs: Option<u64>,
    },
}
