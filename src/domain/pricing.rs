//! Line and bill totals.
//!
//! Flat discounts are a per-unit amount and scale with quantity. Percentage
//! discounts apply to the line base (`unit_price * quantity`). Results are never
//! clamped: a discount larger than the base yields a negative amount.

use bigdecimal::{BigDecimal, Zero};

use super::order::{Discount, DiscountType, OrderLineItem};

/// Payable amount for a single line.
pub fn line_payable(item: &OrderLineItem) -> BigDecimal {
    if item.free {
        return BigDecimal::zero();
    }
    let quantity = BigDecimal::from(item.quantity);
    let base = item.unit_price.clone() * quantity.clone();
    match item.discount_type {
        DiscountType::Percentage => percentage_off(&base, &item.discount),
        DiscountType::Flat => base - item.discount.clone() * quantity,
    }
}

/// Sum of line payables.
pub fn subtotal(items: &[OrderLineItem]) -> BigDecimal {
    items
        .iter()
        .map(line_payable)
        .fold(BigDecimal::zero(), |acc, payable| acc + payable)
}

/// Applies an optional bill-level discount to a subtotal. A flat bill discount
/// is taken once, not per unit.
pub fn apply_bill_discount(subtotal: &BigDecimal, discount: Option<&Discount>) -> BigDecimal {
    match discount {
        None => subtotal.clone(),
        Some(d) => match d.kind {
            DiscountType::Flat => subtotal.clone() - d.amount.clone(),
            DiscountType::Percentage => percentage_off(subtotal, &d.amount),
        },
    }
}

/// Grand total of an order: subtotal minus the bill discount.
pub fn grand_total(items: &[OrderLineItem], discount: Option<&Discount>) -> BigDecimal {
    apply_bill_discount(&subtotal(items), discount)
}

fn percentage_off(base: &BigDecimal, percent: &BigDecimal) -> BigDecimal {
    let fraction = percent.clone() / BigDecimal::from(100);
    base.clone() - fraction * base.clone()
}
