use serde::{Deserialize, Serialize};

use stockbook_core::Money;

use crate::record::RecordDetails;

/// Field edits for an existing record. `None` leaves a field untouched.
///
/// The order number, the outbound ledger, the pinned counter/tracking number
/// and the outbound status are not editable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordPatch {
    pub supplier: Option<String>,
    pub inbound_time: Option<String>,
    pub barcode: Option<String>,
    pub product: Option<String>,
    pub quantity: Option<u32>,
    pub unit: Option<String>,
    pub inbound_tracking: Option<String>,
    pub source: Option<String>,
    pub color: Option<String>,
    pub buy_price: Option<Money>,
    pub commission: Option<Money>,
    pub market_price: Option<Money>,
    pub settlement_status: Option<String>,
    pub shipping_price: Option<Money>,
    pub note: Option<String>,
}

impl RecordPatch {
    pub fn is_empty(&self) -> bool {
        self.changed_fields().is_empty()
    }

    /// Names of the fields this patch sets, in column order.
    pub fn changed_fields(&self) -> Vec<&'static str> {
        let flags = [
            ("supplier", self.supplier.is_some()),
            ("inbound_time", self.inbound_time.is_some()),
            ("barcode", self.barcode.is_some()),
            ("product", self.product.is_some()),
            ("quantity", self.quantity.is_some()),
            ("unit", self.unit.is_some()),
            ("inbound_tracking", self.inbound_tracking.is_some()),
            ("source", self.source.is_some()),
            ("color", self.color.is_some()),
            ("buy_price", self.buy_price.is_some()),
            ("commission", self.commission.is_some()),
            ("market_price", self.market_price.is_some()),
            ("settlement_status", self.settlement_status.is_some()),
            ("shipping_price", self.shipping_price.is_some()),
            ("note", self.note.is_some()),
        ];
        flags
            .into_iter()
            .filter_map(|(name, set)| set.then_some(name))
            .collect()
    }

    /// Overwrite the free-text fields this patch sets.
    pub fn apply_details(&self, details: &mut RecordDetails) {
        let text_fields = [
            (&self.supplier, &mut details.supplier),
            (&self.inbound_time, &mut details.inbound_time),
            (&self.barcode, &mut details.barcode),
            (&self.product, &mut details.product),
            (&self.unit, &mut details.unit),
            (&self.inbound_tracking, &mut details.inbound_tracking),
            (&self.source, &mut details.source),
            (&self.color, &mut details.color),
            (&self.settlement_status, &mut details.settlement_status),
            (&self.note, &mut details.note),
        ];
        for (patched, current) in text_fields {
            if let Some(value) = patched {
                *current = value.clone();
            }
        }
    }
}
