//! Inbound registration: single intakes and batches sharing one delivery.

use serde::{Deserialize, Serialize};

use stockbook_core::{DomainError, DomainResult, Money};

/// Settlement status of a record whose supplier has been paid.
pub const SETTLED: &str = "是";
/// Settlement status of a record still owed to its supplier.
pub const UNSETTLED: &str = "否";

/// Typed input of one inbound intake.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundRegistration {
    pub supplier: String,
    /// Blank means "now".
    pub inbound_time: String,
    pub barcode: String,
    pub product: String,
    pub unit: String,
    pub inbound_tracking: String,
    pub color: String,
    pub settlement_status: String,
    pub buy_price: Money,
    pub commission: Money,
    pub quantity: u32,
}

impl InboundRegistration {
    pub fn validate(&self) -> DomainResult<()> {
        if self.product.trim().is_empty() {
            return Err(DomainError::validation("product cannot be empty"));
        }
        if self.buy_price.is_negative() {
            return Err(DomainError::validation("buy price cannot be negative"));
        }
        if self.commission.is_negative() {
            return Err(DomainError::validation("commission cannot be negative"));
        }
        if self.quantity == 0 {
            return Err(DomainError::invalid_quantity("quantity must be a positive integer"));
        }
        Ok(())
    }

    pub fn settlement_price(&self) -> Money {
        (self.buy_price + self.commission).to_cents()
    }
}

/// Parse a user-entered quantity. Must be a positive integer.
pub fn parse_quantity(text: &str) -> DomainResult<u32> {
    match text.trim().parse::<u32>() {
        Ok(0) | Err(_) => Err(DomainError::invalid_quantity(format!(
            "expected a positive integer, got {:?}",
            text.trim()
        ))),
        Ok(quantity) => Ok(quantity),
    }
}

/// One line of a bulk intake, as typed by the user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BulkLine {
    pub barcode: String,
    pub product: String,
    pub buy_price: String,
    pub commission: String,
    pub quantity: String,
    pub unit: String,
    pub color: String,
}

impl BulkLine {
    fn is_blank(&self) -> bool {
        [
            &self.barcode,
            &self.product,
            &self.buy_price,
            &self.commission,
            &self.quantity,
            &self.unit,
            &self.color,
        ]
        .iter()
        .all(|field| field.trim().is_empty())
    }
}

/// A rejected bulk line. `line` is 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineError {
    pub line: usize,
    pub product: String,
    pub error: DomainError,
}

impl core::fmt::Display for LineError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "line {} ({}): {}", self.line, self.product, self.error)
    }
}

/// A batch of intakes delivered together.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkInbound {
    pub supplier: String,
    pub inbound_time: String,
    pub inbound_tracking: String,
    pub lines: Vec<BulkLine>,
}

impl BulkInbound {
    /// Split the batch into valid registrations and per-line errors.
    ///
    /// Fails as a whole when the shared header is incomplete or every line is blank.
    pub fn into_registrations(self) -> DomainResult<(Vec<InboundRegistration>, Vec<LineError>)> {
        if self.supplier.trim().is_empty() {
            return Err(DomainError::validation("supplier cannot be empty"));
        }
        if self.inbound_tracking.trim().is_empty() {
            return Err(DomainError::validation("inbound tracking number cannot be empty"));
        }

        let mut registrations = Vec::new();
        let mut errors = Vec::new();
        let mut seen = 0usize;

        for (index, line) in self.lines.into_iter().enumerate() {
            if line.is_blank() {
                continue;
            }
            seen += 1;

            let product = line.product.trim().to_string();
            match Self::parse_line(&line) {
                Ok((buy_price, commission, quantity)) => {
                    let registration = InboundRegistration {
                        supplier: self.supplier.clone(),
                        inbound_time: self.inbound_time.clone(),
                        barcode: line.barcode.trim().to_string(),
                        product: product.clone(),
                        unit: line.unit.trim().to_string(),
                        inbound_tracking: self.inbound_tracking.clone(),
                        color: line.color.trim().to_string(),
                        settlement_status: UNSETTLED.to_string(),
                        buy_price,
                        commission,
                        quantity,
                    };
                    match registration.validate() {
                        Ok(()) => registrations.push(registration),
                        Err(error) => errors.push(LineError {
                            line: index + 1,
                            product,
                            error,
                        }),
                    }
                }
                Err(error) => errors.push(LineError {
                    line: index + 1,
                    product,
                    error,
                }),
            }
        }

        if seen == 0 {
            return Err(DomainError::validation("bulk intake has no lines"));
        }
        Ok((registrations, errors))
    }

    fn parse_line(line: &BulkLine) -> DomainResult<(Money, Money, u32)> {
        let buy_price = line.buy_price.parse::<Money>()?;
        let commission = if line.commission.trim().is_empty() {
            Money::ZERO
        } else {
            line.commission.parse::<Money>()?
        };
        let quantity = parse_quantity(&line.quantity)?;
        Ok((buy_price, commission, quantity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn line(product: &str, buy: &str, commission: &str, quantity: &str) -> BulkLine {
        BulkLine {
            product: product.to_string(),
            buy_price: buy.to_string(),
            commission: commission.to_string(),
            quantity: quantity.to_string(),
            ..BulkLine::default()
        }
    }

    #[test]
    fn parse_quantity_requires_positive_integer() {
        assert_eq!(parse_quantity(" 12 ").unwrap(), 12);
        for bad in ["0", "-3", "1.5", "", "ten"] {
            assert!(
                matches!(parse_quantity(bad), Err(DomainError::InvalidQuantity(_))),
                "{bad}"
            );
        }
    }

    #[test]
    fn registration_rejects_negative_prices_and_blank_product() {
        let base = InboundRegistration {
            product: "ProductA".to_string(),
            buy_price: Money::new(dec!(10)),
            quantity: 1,
            ..InboundRegistration::default()
        };
        assert!(base.validate().is_ok());

        let blank = InboundRegistration {
            product: " ".to_string(),
            ..base.clone()
        };
        assert!(matches!(blank.validate(), Err(DomainError::Validation(_))));

        let negative = InboundRegistration {
            commission: Money::new(dec!(-1)),
            ..base
        };
        assert!(matches!(negative.validate(), Err(DomainError::Validation(_))));
    }

    #[test]
    fn bulk_skips_blank_lines_and_reports_bad_ones() {
        let bulk = BulkInbound {
            supplier: "SupplierA".to_string(),
            inbound_time: "2024-05-01 09:00:00".to_string(),
            inbound_tracking: "IN-1".to_string(),
            lines: vec![
                line("ProductA", "90", "10", "20"),
                BulkLine::default(),
                line("ProductB", "abc", "", "1"),
                line("ProductC", "5", "", "0"),
                line("ProductD", "5", "", "3"),
            ],
        };

        let (ok, errors) = bulk.into_registrations().unwrap();

        assert_eq!(ok.len(), 2);
        assert_eq!(ok[0].settlement_price(), Money::new(dec!(100)));
        assert_eq!(ok[1].commission, Money::ZERO);
        assert!(ok.iter().all(|r| r.inbound_tracking == "IN-1" && r.settlement_status == UNSETTLED));

        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].line, 3);
        assert!(matches!(errors[0].error, DomainError::Validation(_)));
        assert_eq!(errors[1].line, 4);
        assert!(matches!(errors[1].error, DomainError::InvalidQuantity(_)));
    }

    #[test]
    fn bulk_without_tracking_or_lines_fails() {
        let no_tracking = BulkInbound {
            supplier: "SupplierA".to_string(),
            lines: vec![line("ProductA", "1", "", "1")],
            ..BulkInbound::default()
        };
        assert!(no_tracking.into_registrations().is_err());

        let empty = BulkInbound {
            supplier: "SupplierA".to_string(),
            inbound_tracking: "IN-1".to_string(),
            lines: vec![BulkLine::default()],
            ..BulkInbound::default()
        };
        assert!(empty.into_registrations().is_err());
    }
}
