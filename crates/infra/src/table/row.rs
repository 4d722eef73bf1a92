//! Raw table row and its mapping to the typed record.

use serde::{Deserialize, Serialize};

use stockbook_core::{DomainError, DomainResult, Money, OrderNumber};
use stockbook_inventory::{
    InventoryRecord, OutboundLog, OutboundStatus, Pricing, RecordDetails, StockState,
};

/// Column names, in file order.
pub const HEADER: [&str; 25] = [
    "单号",
    "货商姓名",
    "入库时间",
    "数字条码",
    "商品名称",
    "商品数量",
    "商品数量单位",
    "入库快递单号",
    "货源",
    "颜色/配置",
    "买价",
    "佣金",
    "结算价",
    "单价",
    "剩余数量",
    "剩余价值",
    "行情价格",
    "结算状态",
    "出库状态",
    "出库档口",
    "快递单号",
    "快递价格",
    "利润",
    "备注",
    "出库记录",
];

const NOT_SHIPPED: &str = "未出库";
const PARTIALLY_SHIPPED: &str = "部分出库";
const FULLY_SHIPPED: &str = "已出库";
/// Full-outbound marker written by older versions.
const LEGACY_SOLD: &str = "卖出";

pub fn status_label(status: OutboundStatus) -> &'static str {
    match status {
        OutboundStatus::NotShipped => NOT_SHIPPED,
        OutboundStatus::PartiallyShipped => PARTIALLY_SHIPPED,
        OutboundStatus::FullyShipped => FULLY_SHIPPED,
    }
}

pub fn parse_status(label: &str) -> Option<OutboundStatus> {
    match label.trim() {
        NOT_SHIPPED => Some(OutboundStatus::NotShipped),
        PARTIALLY_SHIPPED => Some(OutboundStatus::PartiallyShipped),
        FULLY_SHIPPED | LEGACY_SOLD => Some(OutboundStatus::FullyShipped),
        _ => None,
    }
}

/// One table row exactly as stored: every cell is text.
///
/// Columns missing from older files deserialize as empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordRow {
    #[serde(rename = "单号")]
    pub order_number: String,
    #[serde(rename = "货商姓名")]
    pub supplier: String,
    #[serde(rename = "入库时间")]
    pub inbound_time: String,
    #[serde(rename = "数字条码")]
    pub barcode: String,
    #[serde(rename = "商品名称")]
    pub product: String,
    #[serde(rename = "商品数量")]
    pub total_quantity: String,
    #[serde(rename = "商品数量单位")]
    pub unit: String,
    #[serde(rename = "入库快递单号")]
    pub inbound_tracking: String,
    #[serde(rename = "货源")]
    pub source: String,
    #[serde(rename = "颜色/配置")]
    pub color: String,
    #[serde(rename = "买价")]
    pub buy_price: String,
    #[serde(rename = "佣金")]
    pub commission: String,
    #[serde(rename = "结算价")]
    pub settlement_price: String,
    #[serde(rename = "单价")]
    pub unit_price: String,
    #[serde(rename = "剩余数量")]
    pub remaining_quantity: String,
    #[serde(rename = "剩余价值")]
    pub remaining_value: String,
    #[serde(rename = "行情价格")]
    pub market_price: String,
    #[serde(rename = "结算状态")]
    pub settlement_status: String,
    #[serde(rename = "出库状态")]
    pub outbound_status: String,
    #[serde(rename = "出库档口")]
    pub counter: String,
    #[serde(rename = "快递单号")]
    pub tracking_number: String,
    #[serde(rename = "快递价格")]
    pub shipping_price: String,
    #[serde(rename = "利润")]
    pub profit: String,
    #[serde(rename = "备注")]
    pub note: String,
    #[serde(rename = "出库记录")]
    pub outbound_log: String,
}

impl RecordRow {
    /// Whether this row carries `order_number` (surrounding whitespace ignored).
    pub fn has_order_number(&self, order_number: &OrderNumber) -> bool {
        self.order_number.trim() == order_number.as_str()
    }

    /// Cell under a column name from [`HEADER`].
    pub fn get(&self, column: &str) -> Option<&str> {
        let cell = match column {
            "单号" => &self.order_number,
            "货商姓名" => &self.supplier,
            "入库时间" => &self.inbound_time,
            "数字条码" => &self.barcode,
            "商品名称" => &self.product,
            "商品数量" => &self.total_quantity,
            "商品数量单位" => &self.unit,
            "入库快递单号" => &self.inbound_tracking,
            "货源" => &self.source,
            "颜色/配置" => &self.color,
            "买价" => &self.buy_price,
            "佣金" => &self.commission,
            "结算价" => &self.settlement_price,
            "单价" => &self.unit_price,
            "剩余数量" => &self.remaining_quantity,
            "剩余价值" => &self.remaining_value,
            "行情价格" => &self.market_price,
            "结算状态" => &self.settlement_status,
            "出库状态" => &self.outbound_status,
            "出库档口" => &self.counter,
            "快递单号" => &self.tracking_number,
            "快递价格" => &self.shipping_price,
            "利润" => &self.profit,
            "备注" => &self.note,
            "出库记录" => &self.outbound_log,
            _ => return None,
        };
        Some(cell.as_str())
    }

    /// Stored status label, if it is one we know.
    pub fn status(&self) -> Option<OutboundStatus> {
        parse_status(&self.outbound_status)
    }

    /// Parse into a typed record, backfilling legacy gaps.
    ///
    /// - fully shipped label (`已出库` or legacy `卖出`): nothing remains,
    ///   whatever the remaining cells say
    /// - empty remaining quantity: the total
    /// - empty settlement price: buy price + commission when both are known
    /// - empty unit price: left uncached
    /// - empty remaining value: derived from remaining quantity and unit price
    ///
    /// Any other malformed numeric cell fails with `MalformedRecord`.
    pub fn to_record(&self) -> DomainResult<InventoryRecord> {
        let order_number: OrderNumber = self.order_number.parse()?;

        let total_quantity = parse_count("total_quantity", &self.total_quantity)?;
        // Older versions marked full outbound by label alone and left the
        // remaining cells as registered.
        let labelled_shipped = self.status() == Some(OutboundStatus::FullyShipped);
        let remaining_quantity = if labelled_shipped {
            0
        } else if self.remaining_quantity.trim().is_empty() {
            total_quantity
        } else {
            parse_count("remaining_quantity", &self.remaining_quantity)?
        };

        let buy_price = Money::parse_optional("buy_price", &self.buy_price)?;
        let commission = Money::parse_optional("commission", &self.commission)?;
        let settlement_price = match Money::parse_optional("settlement_price", &self.settlement_price)? {
            Some(price) => price,
            None => match (buy_price, commission) {
                (Some(buy), Some(commission)) => (buy + commission).to_cents(),
                _ => return Err(DomainError::malformed("settlement_price", "")),
            },
        };

        let unit_price = Money::parse_optional("unit_price", &self.unit_price)?;
        let stored_value = Money::parse_optional("remaining_value", &self.remaining_value)?;
        let remaining_value = match stored_value.filter(|_| !labelled_shipped) {
            Some(value) => value,
            None => unit_price
                .unwrap_or_else(|| settlement_price.per_unit(total_quantity))
                .times(remaining_quantity),
        };

        let details = RecordDetails {
            supplier: self.supplier.clone(),
            inbound_time: self.inbound_time.clone(),
            barcode: self.barcode.clone(),
            product: self.product.clone(),
            unit: self.unit.clone(),
            inbound_tracking: self.inbound_tracking.clone(),
            source: self.source.clone(),
            color: self.color.clone(),
            settlement_status: self.settlement_status.clone(),
            profit: self.profit.clone(),
            note: self.note.clone(),
        };
        let pricing = Pricing {
            buy_price,
            commission,
            settlement_price,
            market_price: Money::parse_optional("market_price", &self.market_price)?,
            shipping_price: Money::parse_optional("shipping_price", &self.shipping_price)?,
        };
        let stock = StockState {
            total_quantity,
            remaining_quantity,
            unit_price,
            remaining_value,
            counter: self.counter.clone(),
            tracking_number: self.tracking_number.clone(),
            outbound_log: OutboundLog::parse(&self.outbound_log)?,
        };

        InventoryRecord::restore(order_number, details, pricing, stock)
    }

    pub fn from_record(record: &InventoryRecord) -> Self {
        let details = record.details();
        let pricing = record.pricing();
        let stock = record.stock();
        let optional = |money: Option<Money>| money.map(|m| m.to_string()).unwrap_or_default();

        Self {
            order_number: record.order_number().to_string(),
            supplier: details.supplier.clone(),
            inbound_time: details.inbound_time.clone(),
            barcode: details.barcode.clone(),
            product: details.product.clone(),
            total_quantity: stock.total_quantity.to_string(),
            unit: details.unit.clone(),
            inbound_tracking: details.inbound_tracking.clone(),
            source: details.source.clone(),
            color: details.color.clone(),
            buy_price: optional(pricing.buy_price),
            commission: optional(pricing.commission),
            settlement_price: pricing.settlement_price.to_string(),
            unit_price: optional(stock.unit_price),
            remaining_quantity: stock.remaining_quantity.to_string(),
            remaining_value: stock.remaining_value.to_string(),
            market_price: optional(pricing.market_price),
            settlement_status: details.settlement_status.clone(),
            outbound_status: status_label(record.outbound_status()).to_string(),
            counter: stock.counter.clone(),
            tracking_number: stock.tracking_number.clone(),
            shipping_price: optional(pricing.shipping_price),
            profit: details.profit.clone(),
            note: details.note.clone(),
            outbound_log: stock.outbound_log.to_string(),
        }
    }
}

/// Quantities may have been written as `20.0` by older versions.
fn parse_count(field: &'static str, text: &str) -> DomainResult<u32> {
    let trimmed = text.trim();
    if let Ok(value) = trimmed.parse::<u32>() {
        return Ok(value);
    }
    match trimmed.split_once('.') {
        Some((whole, fraction)) if fraction.chars().all(|c| c == '0') => whole
            .parse::<u32>()
            .map_err(|_| DomainError::malformed(field, text)),
        _ => Err(DomainError::malformed(field, text)),
    }
}
