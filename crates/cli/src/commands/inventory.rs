use anyhow::{Context, Result, anyhow};
use serde::Serialize;

use stockbook_core::Money;
use stockbook_infra::table::HEADER;
use stockbook_infra::{RecordRow, ServiceError};
use stockbook_inventory::{BulkInbound, BulkLine, InboundRegistration, InventoryRecord, RecordPatch};

use crate::args::{BulkInboundArgs, InboundArgs, ListArgs, ModifyArgs, OrderArgs, ShipArgs, WithdrawArgs};
use crate::context::AppContext;
use crate::output::{print_json, print_rows, print_table};

fn report(ctx: &AppContext, record: &InventoryRecord, message: &str) -> Result<()> {
    let row = RecordRow::from_record(record);
    if ctx.json {
        return print_json(&row);
    }
    println!(
        "{message}: {} {} remaining {}/{} value {} ({})",
        row.order_number,
        row.product,
        row.remaining_quantity,
        row.total_quantity,
        row.remaining_value,
        row.outbound_status
    );
    Ok(())
}

pub fn inbound(ctx: &AppContext, args: InboundArgs) -> Result<()> {
    let settings = ctx.load_settings()?;

    let mut product = args.product.trim().to_string();
    if product.is_empty() {
        product = settings
            .product_for_barcode(&args.barcode)
            .map(str::to_string)
            .ok_or_else(|| anyhow!("--product is required (no product bound to barcode {:?})", args.barcode))?;
    }
    let buy_price = args
        .buy_price
        .or(settings.defaults.buy_price)
        .ok_or_else(|| anyhow!("--buy-price is required (no default configured)"))?;
    let quantity = args
        .quantity
        .or(settings.defaults.quantity)
        .ok_or_else(|| anyhow!("--quantity is required (no default configured)"))?;

    let registration = InboundRegistration {
        supplier: args.supplier,
        inbound_time: args.inbound_time,
        barcode: args.barcode.trim().to_string(),
        product,
        unit: args.unit,
        inbound_tracking: args.inbound_tracking,
        color: args.color,
        settlement_status: args.settlement_status,
        buy_price,
        commission: args
            .commission
            .or(settings.defaults.commission)
            .unwrap_or(Money::ZERO),
        quantity,
    };

    let (table, service) = ctx.service()?;
    ctx.backup_before(&table, "inbound")?;
    let record = service
        .register(registration, ctx.now())
        .context("inbound registration failed")?;
    report(ctx, &record, "registered")
}

#[derive(Serialize)]
struct BulkReport {
    registered: Vec<RecordRow>,
    rejected: Vec<String>,
}

pub fn bulk_inbound(ctx: &AppContext, args: BulkInboundArgs) -> Result<()> {
    let settings = ctx.load_settings()?;
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(&args.file)
        .with_context(|| format!("failed to open {}", args.file.display()))?;

    let mut lines = Vec::new();
    for line in reader.deserialize::<BulkLine>() {
        let mut line = line.with_context(|| format!("failed to read {}", args.file.display()))?;
        if line.product.trim().is_empty() {
            if let Some(product) = settings.product_for_barcode(&line.barcode) {
                line.product = product.to_string();
            }
        }
        lines.push(line);
    }

    let bulk = BulkInbound {
        supplier: args.supplier,
        inbound_time: args.inbound_time,
        inbound_tracking: args.inbound_tracking,
        lines,
    };

    let (table, service) = ctx.service()?;
    ctx.backup_before(&table, "bulk_inbound")?;
    let outcome = service
        .register_bulk(bulk, ctx.now())
        .context("bulk inbound failed")?;

    let report = BulkReport {
        registered: outcome.registered.iter().map(RecordRow::from_record).collect(),
        rejected: outcome.rejected.iter().map(ToString::to_string).collect(),
    };
    if ctx.json {
        return print_json(&report);
    }
    for row in &report.registered {
        println!("registered: {} {} x{}", row.order_number, row.product, row.total_quantity);
    }
    for rejected in &report.rejected {
        eprintln!("rejected: {rejected}");
    }
    println!(
        "{} registered, {} rejected",
        report.registered.len(),
        report.rejected.len()
    );
    Ok(())
}

pub fn withdraw(ctx: &AppContext, args: WithdrawArgs) -> Result<()> {
    let (table, service) = ctx.service()?;
    ctx.backup_before(&table, "outbound")?;
    let record = service
        .withdraw(&args.order_number, args.quantity, &args.tracking, &args.counter, ctx.now())
        .map_err(explain)?;
    report(ctx, &record, "withdrawn")
}

pub fn ship(ctx: &AppContext, args: ShipArgs) -> Result<()> {
    let (table, service) = ctx.service()?;
    ctx.backup_before(&table, "outbound")?;
    let record = service
        .ship_all(
            &args.order_number,
            &args.tracking,
            &args.counter,
            args.shipping_price,
            ctx.now(),
        )
        .map_err(explain)?;
    report(ctx, &record, "shipped")
}

pub fn modify(ctx: &AppContext, args: ModifyArgs) -> Result<()> {
    let patch = RecordPatch {
        supplier: args.supplier,
        inbound_time: args.inbound_time,
        barcode: args.barcode,
        product: args.product,
        quantity: args.quantity,
        unit: args.unit,
        inbound_tracking: args.inbound_tracking,
        source: args.source,
        color: args.color,
        buy_price: args.buy_price,
        commission: args.commission,
        market_price: args.market_price,
        settlement_status: args.settlement_status,
        shipping_price: args.shipping_price,
        note: args.note,
    };

    let (table, service) = ctx.service()?;
    ctx.backup_before(&table, "modify")?;
    let record = service
        .modify(&args.order_number, patch, ctx.now())
        .map_err(explain)?;
    report(ctx, &record, "modified")
}

pub fn delete(ctx: &AppContext, args: OrderArgs) -> Result<()> {
    let (table, service) = ctx.service()?;
    ctx.backup_before(&table, "delete")?;
    let removed = service
        .delete(&args.order_number, ctx.now())
        .map_err(explain)?;
    if ctx.json {
        return print_json(&removed);
    }
    println!("deleted: {} {}", removed.order_number, removed.product);
    Ok(())
}

pub fn show(ctx: &AppContext, args: OrderArgs) -> Result<()> {
    let (_, service) = ctx.service()?;
    let record = service.get(&args.order_number).map_err(explain)?;
    let row = RecordRow::from_record(&record);
    if ctx.json {
        return print_json(&serde_json::json!({
            "record": row,
            "outbound_log": record.outbound_log(),
        }));
    }

    for column in HEADER.iter().filter(|c| **c != "出库记录") {
        println!("{column}\t{}", row.get(column).unwrap_or_default());
    }
    let entries: Vec<Vec<String>> = record
        .outbound_log()
        .entries()
        .iter()
        .map(|e| {
            vec![
                e.timestamp.format(stockbook_inventory::LEDGER_TIME_FORMAT).to_string(),
                e.counter.clone(),
                e.tracking_number.clone(),
                e.quantity.to_string(),
                e.unit_price.to_string(),
                e.value().to_string(),
            ]
        })
        .collect();
    if !entries.is_empty() {
        println!();
        print_table(&["time", "counter", "tracking", "quantity", "unit_price", "value"], &entries);
    }
    Ok(())
}

pub fn list(ctx: &AppContext, args: ListArgs) -> Result<()> {
    let (_, service) = ctx.service()?;
    let rows = service.list()?;
    let columns: Vec<String> = if args.all_columns {
        HEADER.iter().map(|c| c.to_string()).collect()
    } else {
        ctx.load_settings()?.display_columns(args.page.into())
    };
    print_rows(&rows, &columns, ctx.json)
}

pub fn audit(ctx: &AppContext) -> Result<()> {
    let (_, service) = ctx.service()?;
    let findings = service.audit()?;
    if ctx.json {
        let findings: Vec<_> = findings
            .iter()
            .map(|f| serde_json::json!({ "order_number": f.order_number, "problem": f.problem.to_string() }))
            .collect();
        return print_json(&findings);
    }
    if findings.is_empty() {
        println!("all records consistent");
        return Ok(());
    }
    for finding in &findings {
        println!("{}\t{}", finding.order_number, finding.problem);
    }
    Ok(())
}

/// Keep domain rejections readable on the command line.
fn explain(err: ServiceError) -> anyhow::Error {
    match err {
        ServiceError::Domain(domain) => anyhow!(domain),
        ServiceError::Store(store) => anyhow::Error::new(store).context("table file could not be updated"),
    }
}
