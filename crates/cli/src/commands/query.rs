use anyhow::Result;

use stockbook_infra::queries;
use stockbook_infra::table::HEADER;

use crate::args::QueryCommands;
use crate::context::AppContext;
use crate::output::{print_json, print_rows, print_table};

fn print_profit(ctx: &AppContext, label: &str, groups: &[queries::ProfitGroup]) -> Result<()> {
    if ctx.json {
        return print_json(groups);
    }
    let body: Vec<Vec<String>> = groups
        .iter()
        .map(|g| vec![g.key.clone(), g.profit.to_string()])
        .collect();
    print_table(&[label, "盈亏"], &body);
    Ok(())
}

pub fn run(ctx: &AppContext, command: QueryCommands) -> Result<()> {
    let (_, service) = ctx.service()?;
    let rows = service.list()?;

    match command {
        QueryCommands::ProfitByProduct => {
            print_profit(ctx, "商品名称", &queries::profit_by_product(&rows))?;
        }
        QueryCommands::ProfitBySupplier => {
            print_profit(ctx, "货商姓名", &queries::profit_by_supplier(&rows))?;
        }
        QueryCommands::Tracking { tracking_number } => {
            let found: Vec<_> = queries::by_tracking_number(&rows, &tracking_number)
                .into_iter()
                .cloned()
                .collect();
            let columns: Vec<String> = HEADER.iter().map(|c| c.to_string()).collect();
            print_rows(&found, &columns, ctx.json)?;
        }
        QueryCommands::SupplierCounts => {
            let counts = queries::inbound_count_by_supplier(&rows);
            if ctx.json {
                return print_json(&counts);
            }
            let body: Vec<Vec<String>> = counts
                .iter()
                .map(|c| vec![c.supplier.clone(), c.inbound_count.to_string()])
                .collect();
            print_table(&["货商姓名", "入库次数"], &body);
        }
        QueryCommands::Metrics => {
            let m = queries::metrics(&rows);
            if ctx.json {
                return print_json(&m);
            }
            let body = vec![
                vec!["卖出总利润".to_string(), m.sold_profit.to_string()],
                vec!["库存价值".to_string(), m.inventory_value.to_string()],
                vec!["快递总费用".to_string(), m.shipping_cost.to_string()],
                vec!["佣金总费用".to_string(), m.commission_cost.to_string()],
                vec!["未结清金额".to_string(), m.unsettled_amount.to_string()],
                vec!["行情价总和".to_string(), m.market_total.to_string()],
                vec!["总条数".to_string(), m.row_count.to_string()],
                vec!["商品数量总和".to_string(), m.quantity_total.to_string()],
            ];
            print_table(&["metric", "value"], &body);
            if m.skipped_cells > 0 {
                eprintln!("warning: {} unreadable cells counted as zero", m.skipped_cells);
            }
        }
        QueryCommands::Outbound { order_number } => {
            let entries = queries::outbound_details(&rows, &order_number)?;
            if ctx.json {
                return print_json(&entries);
            }
            let body: Vec<Vec<String>> = entries
                .iter()
                .map(|e| {
                    vec![
                        e.timestamp.format(stockbook_inventory::LEDGER_TIME_FORMAT).to_string(),
                        e.counter.clone(),
                        e.tracking_number.clone(),
                        e.quantity.to_string(),
                        e.unit_price.to_string(),
                    ]
                })
                .collect();
            print_table(&["time", "counter", "tracking", "quantity", "unit_price"], &body);
        }
    }
    Ok(())
}
