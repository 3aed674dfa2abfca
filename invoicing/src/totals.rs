//! Invoice money arithmetic.
//!
//! Taxes are charged on the undiscounted line totals; the discount only
//! reduces the sub total.

use crate::models::{CreateLineItem, Discount, LineItem, Tax};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Anything priced like an invoice line.
pub trait PricedLine {
    fn line_total(&self) -> Decimal;
    fn tax_ids(&self) -> [Option<Uuid>; 2];
}

impl PricedLine for LineItem {
    fn line_total(&self) -> Decimal {
        LineItem::line_total(self)
    }

    fn tax_ids(&self) -> [Option<Uuid>; 2] {
        [self.tax1_id, self.tax2_id]
    }
}

impl PricedLine for CreateLineItem {
    fn line_total(&self) -> Decimal {
        CreateLineItem::line_total(self)
    }

    fn tax_ids(&self) -> [Option<Uuid>; 2] {
        [self.tax1_id, self.tax2_id]
    }
}

/// Stored totals of an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InvoiceTotals {
    pub sub_total: Decimal,
    pub discount_amount: Decimal,
    pub tax_amount: Decimal,
    pub invoice_total: Decimal,
}

impl InvoiceTotals {
    /// Compute totals. Tax ids missing from `taxes` contribute nothing.
    pub fn compute<L: PricedLine>(
        lines: &[L],
        taxes: &HashMap<Uuid, Tax>,
        discount: Discount,
    ) -> Self {
        let sub_total: Decimal = lines.iter().map(PricedLine::line_total).sum();
        let tax_amount: Decimal = lines
            .iter()
            .flat_map(|line| line_taxes(line, taxes))
            .map(|(_, amount)| amount)
            .sum();
        let discount_amount = match discount {
            Discount::None => Decimal::ZERO,
            Discount::Percentage(pct) => sub_total * pct / HUNDRED,
            Discount::Amount(amount) => amount,
        };

        let sub_total = sub_total.round_dp(2);
        let discount_amount = discount_amount.round_dp(2);
        let tax_amount = tax_amount.round_dp(2);

        Self {
            sub_total,
            discount_amount,
            tax_amount,
            invoice_total: sub_total - discount_amount + tax_amount,
        }
    }
}

/// One row of the tax breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaxDetail {
    pub label: String,
    pub amount: Decimal,
}

/// Tax amounts grouped by `"<name> <pct>%"`, sorted by label.
pub fn tax_details<L: PricedLine>(lines: &[L], taxes: &HashMap<Uuid, Tax>) -> Vec<TaxDetail> {
    let mut grouped: BTreeMap<String, Decimal> = BTreeMap::new();
    for (tax, amount) in lines.iter().flat_map(|line| line_taxes(line, taxes)) {
        *grouped.entry(tax.label()).or_default() += amount;
    }

    grouped
        .into_iter()
        .map(|(label, amount)| TaxDetail {
            label,
            amount: amount.round_dp(2),
        })
        .collect()
}

fn line_taxes<'a, L: PricedLine>(
    line: &L,
    taxes: &'a HashMap<Uuid, Tax>,
) -> impl Iterator<Item = (&'a Tax, Decimal)> {
    let line_total = line.line_total();
    line.tax_ids()
        .into_iter()
        .flatten()
        .filter_map(move |id| taxes.get(&id))
        .map(move |tax| (tax, line_total * tax.percentage / HUNDRED))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn tax(name: &str, pct: Decimal) -> Tax {
        Tax {
            tax_id: Uuid::new_v4(),
            name: name.to_string(),
            percentage: pct,
            created_utc: Utc::now(),
        }
    }

    fn line(cost: Decimal, qty: Decimal, tax1: Option<&Tax>, tax2: Option<&Tax>) -> CreateLineItem {
        CreateLineItem {
            item_name: "Consulting".to_string(),
            item_description: None,
            item_unit_cost: cost,
            item_quantity: qty,
            tax1_id: tax1.map(|t| t.tax_id),
            tax2_id: tax2.map(|t| t.tax_id),
        }
    }

    fn index(taxes: &[&Tax]) -> HashMap<Uuid, Tax> {
        taxes.iter().map(|t| (t.tax_id, (*t).clone())).collect()
    }

    #[test]
    fn test_totals_without_taxes_or_discount() {
        let lines = vec![
            line(Decimal::new(10000, 2), Decimal::from(2), None, None),
            line(Decimal::new(2550, 2), Decimal::ONE, None, None),
        ];
        let totals = InvoiceTotals::compute(&lines, &HashMap::new(), Discount::None);

        assert_eq!(totals.sub_total, Decimal::new(22550, 2));
        assert_eq!(totals.tax_amount, Decimal::ZERO);
        assert_eq!(totals.invoice_total, Decimal::new(22550, 2));
    }

    #[test]
    fn test_taxes_apply_before_discount() {
        let gst = tax("GST", Decimal::from(5));
        let pst = tax("PST", Decimal::from(7));
        let lines = vec![line(
            Decimal::from(100),
            Decimal::ONE,
            Some(&gst),
            Some(&pst),
        )];
        let totals = InvoiceTotals::compute(
            &lines,
            &index(&[&gst, &pst]),
            Discount::Percentage(Decimal::from(10)),
        );

        assert_eq!(totals.sub_total, Decimal::from(100));
        assert_eq!(totals.discount_amount, Decimal::from(10));
        assert_eq!(totals.tax_amount, Decimal::from(12));
        assert_eq!(totals.invoice_total, Decimal::from(102));
    }

    #[test]
    fn test_fixed_discount() {
        let lines = vec![line(Decimal::from(50), Decimal::from(3), None, None)];
        let totals = InvoiceTotals::compute(
            &lines,
            &HashMap::new(),
            Discount::Amount(Decimal::new(2500, 2)),
        );

        assert_eq!(totals.invoice_total, Decimal::new(12500, 2));
    }

    #[test]
    fn test_tax_details_group_by_label() {
        let gst = tax("GST", Decimal::new(75, 1));
        let lines = vec![
            line(Decimal::from(100), Decimal::ONE, Some(&gst), None),
            line(Decimal::from(200), Decimal::ONE, None, Some(&gst)),
        ];
        let details = tax_details(&lines, &index(&[&gst]));

        assert_eq!(
            details,
            vec![TaxDetail {
                label: "GST 7.5%".to_string(),
                amount: Decimal::new(2250, 2),
            }]
        );
    }

    #[test]
    fn test_unknown_tax_is_ignored() {
        let gst = tax("GST", Decimal::from(5));
        let lines = vec![line(Decimal::from(100), Decimal::ONE, Some(&gst), None)];
        let totals = InvoiceTotals::compute(&lines, &HashMap::new(), Discount::None);

        assert_eq!(totals.tax_amount, Decimal::ZERO);
        assert!(tax_details(&lines, &HashMap::new()).is_empty());
    }
}
