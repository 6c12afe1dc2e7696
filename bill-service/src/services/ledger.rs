//! Payment arithmetic for bills.
//!
//! Everything here is a pure function over `Decimal`. Bad input never fails:
//! anything that is not a usable non-negative number counts as zero.

use crate::models::{CatalogItem, LineItem};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use serde_json::Value;
use std::str::FromStr;

/// Money is kept to two decimal places.
pub const MONEY_SCALE: u32 = 2;

/// Round a monetary value to [`MONEY_SCALE`] places, halves away from zero,
/// and pad it to that scale so `25` renders as `25.00`.
pub fn money(value: Decimal) -> Decimal {
    let mut rounded =
        value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(MONEY_SCALE);
    rounded
}

/// Parse a raw JSON field the way the bill form sends it: a number, a numeric
/// string, an empty string or nothing at all. Unparseable input is zero.
pub fn parse_amount(raw: &Value) -> Decimal {
    match raw {
        Value::Number(n) => parse_str(&n.to_string()),
        Value::String(s) => parse_str(s),
        _ => Decimal::ZERO,
    }
}

fn parse_str(s: &str) -> Decimal {
    let s = s.trim();
    if s.is_empty() {
        return Decimal::ZERO;
    }
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .unwrap_or(Decimal::ZERO)
}

/// Negative values are clamped to zero.
pub fn non_negative(value: Decimal) -> Decimal {
    value.max(Decimal::ZERO)
}

/// [`parse_amount`] followed by [`non_negative`].
pub fn coerce_amount(raw: &Value) -> Decimal {
    non_negative(parse_amount(raw))
}

/// `quantity * rate`, rounded to money. Negative operands count as zero and
/// overflow saturates.
pub fn line_amount(quantity: Decimal, rate: Decimal) -> Decimal {
    money(non_negative(quantity).saturating_mul(non_negative(rate)))
}

/// Build a line with its amount derived from quantity and rate.
pub fn price_line(
    item_name: CatalogItem,
    custom_item: Option<String>,
    quantity: Decimal,
    rate: Decimal,
) -> LineItem {
    let quantity = non_negative(quantity);
    let rate = money(non_negative(rate));
    let custom_item = custom_item
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty());

    LineItem {
        item_name,
        custom_item,
        quantity,
        rate,
        amount: line_amount(quantity, rate),
    }
}

/// A line is billable when it has either a quantity or a rate.
pub fn is_billable(item: &LineItem) -> bool {
    item.quantity > Decimal::ZERO || item.rate > Decimal::ZERO
}

/// Drop empty rows, keeping display order.
pub fn retain_billable(items: Vec<LineItem>) -> Vec<LineItem> {
    items.into_iter().filter(is_billable).collect()
}

/// Sum of line amounts over billable lines. Amounts are recomputed, so a
/// stale `amount` on the input never leaks into the total.
pub fn subtotal(items: &[LineItem]) -> Decimal {
    money(
        items
            .iter()
            .filter(|item| is_billable(item))
            .map(|item| line_amount(item.quantity, item.rate))
            .fold(Decimal::ZERO, Decimal::saturating_add),
    )
}

/// Derived payment fields of a bill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Settlement {
    pub subtotal: Decimal,
    pub advance_payment: Decimal,
    /// Accumulated additional payments, including the one just applied.
    pub additional_payment: Decimal,
    pub total_paid: Decimal,
    /// May be negative when the customer has overpaid.
    pub remaining_amount: Decimal,
}

/// Fold `new_payment` into `prior_additional` and derive the balance.
///
/// A new bill is `settle(items, advance, 0, 0)`. Recomputing a stored bill
/// with its stored additional payment and a zero new payment reproduces the
/// stored figures.
pub fn settle(
    items: &[LineItem],
    advance_payment: Decimal,
    prior_additional: Decimal,
    new_payment: Decimal,
) -> Settlement {
    let subtotal = subtotal(items);
    let advance_payment = money(non_negative(advance_payment));
    let additional_payment = money(
        non_negative(prior_additional).saturating_add(non_negative(new_payment)),
    );
    let total_paid = advance_payment.saturating_add(additional_payment);

    Settlement {
        subtotal,
        advance_payment,
        additional_payment,
        total_paid,
        remaining_amount: subtotal.saturating_sub(total_paid),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn line(item: CatalogItem, quantity: Decimal, rate: Decimal) -> LineItem {
        price_line(item, None, quantity, rate)
    }

    #[test]
    fn parse_amount_accepts_numbers_and_numeric_strings() {
        assert_eq!(parse_amount(&json!(250)), dec!(250));
        assert_eq!(parse_amount(&json!(12.5)), dec!(12.5));
        assert_eq!(parse_amount(&json!("  99.90 ")), dec!(99.90));
        assert_eq!(parse_amount(&json!("1e3")), dec!(1000));
    }

    #[test]
    fn parse_amount_treats_garbage_as_zero() {
        for raw in [json!(""), json!("abc"), json!(null), json!(true), json!([1]), json!("NaN")] {
            assert_eq!(parse_amount(&raw), Decimal::ZERO, "input {raw}");
        }
    }

    #[test]
    fn negative_and_empty_advance_count_as_zero() {
        assert_eq!(coerce_amount(&json!("-50")), Decimal::ZERO);
        assert_eq!(coerce_amount(&json!("")), Decimal::ZERO);
        assert_eq!(coerce_amount(&json!(-0.01)), Decimal::ZERO);
    }

    #[test]
    fn line_amount_rounds_to_cents() {
        assert_eq!(line_amount(dec!(3), dec!(33.333)), dec!(100.00));
        assert_eq!(line_amount(dec!(1), dec!(0.005)), dec!(0.01));
        assert_eq!(line_amount(dec!(-2), dec!(10)), Decimal::ZERO);
    }

    #[test]
    fn empty_rows_are_dropped_in_order() {
        let items = vec![
            line(CatalogItem::Mandap, dec!(1), dec!(500)),
            line(CatalogItem::Table, Decimal::ZERO, Decimal::ZERO),
            line(CatalogItem::Gate, Decimal::ZERO, dec!(150)),
            line(CatalogItem::Stage, dec!(2), Decimal::ZERO),
        ];

        let kept = retain_billable(items);
        let names: Vec<_> = kept.iter().map(|i| i.item_name).collect();
        assert_eq!(
            names,
            vec![CatalogItem::Mandap, CatalogItem::Gate, CatalogItem::Stage]
        );
    }

    #[test]
    fn subtotal_ignores_stale_amounts() {
        let mut item = line(CatalogItem::Carpet, dec!(4), dec!(25));
        item.amount = dec!(9999);
        assert_eq!(subtotal(&[item]), dec!(100));
    }

    #[test]
    fn edit_folds_new_payment_into_additional() {
        let items = vec![
            line(CatalogItem::Mandap, dec!(1), dec!(600)),
            line(CatalogItem::LedLight, dec!(8), dec!(50)),
        ];

        let s = settle(&items, dec!(200), dec!(100), dec!(50));

        assert_eq!(s.subtotal, dec!(1000));
        assert_eq!(s.additional_payment, dec!(150));
        assert_eq!(s.total_paid, dec!(350));
        assert_eq!(s.remaining_amount, dec!(650));
    }

    #[test]
    fn create_time_balance_has_no_additional_payment() {
        let items = vec![line(CatalogItem::Stage, dec!(1), dec!(800))];
        let s = settle(&items, dec!(300), Decimal::ZERO, Decimal::ZERO);

        assert_eq!(s.additional_payment, Decimal::ZERO);
        assert_eq!(s.total_paid, dec!(300));
        assert_eq!(s.remaining_amount, dec!(500));
    }

    #[test]
    fn overpayment_leaves_a_negative_balance() {
        let items = vec![line(CatalogItem::Gate, dec!(1), dec!(100))];
        let s = settle(&items, dec!(80), dec!(0), dec!(70));
        assert_eq!(s.remaining_amount, dec!(-50));
    }

    #[test]
    fn negative_payments_are_clamped() {
        let items = vec![line(CatalogItem::Gate, dec!(1), dec!(100))];
        let s = settle(&items, dec!(-10), dec!(-5), dec!(-1));
        assert_eq!(s.total_paid, Decimal::ZERO);
        assert_eq!(s.remaining_amount, dec!(100));
    }

    fn cents() -> impl Strategy<Value = Decimal> {
        (0i64..10_000_000).prop_map(|c| Decimal::new(c, 2))
    }

    fn quantity() -> impl Strategy<Value = Decimal> {
        (0i64..100_000).prop_map(|q| Decimal::new(q, 1))
    }

    fn items() -> impl Strategy<Value = Vec<LineItem>> {
        prop::collection::vec(
            (0usize..CatalogItem::ALL.len(), quantity(), cents())
                .prop_map(|(i, q, r)| line(CatalogItem::ALL[i], q, r)),
            0..12,
        )
    }

    proptest! {
        #[test]
        fn subtotal_is_sum_of_billable_lines(items in items()) {
            let expected = items
                .iter()
                .filter(|i| i.quantity > Decimal::ZERO || i.rate > Decimal::ZERO)
                .map(|i| money(i.quantity * i.rate))
                .sum::<Decimal>();
            prop_assert_eq!(subtotal(&items), expected);
        }

        #[test]
        fn money_is_conserved(
            items in items(),
            advance in cents(),
            prior in cents(),
            new_payment in cents(),
        ) {
            let s = settle(&items, advance, prior, new_payment);
            prop_assert_eq!(s.additional_payment, prior + new_payment);
            prop_assert_eq!(s.total_paid, s.advance_payment + s.additional_payment);
            prop_assert_eq!(s.remaining_amount, s.subtotal - s.total_paid);
            prop_assert!(s.additional_payment >= prior);
        }

        #[test]
        fn settle_is_deterministic(items in items(), advance in cents(), prior in cents()) {
            prop_assert_eq!(
                settle(&items, advance, prior, Decimal::ZERO),
                settle(&items, advance, prior, Decimal::ZERO)
            );
        }

        #[test]
        fn reloading_a_bill_reproduces_its_figures(
            items in items(),
            advance in cents(),
            prior in cents(),
            new_payment in cents(),
        ) {
            let saved = settle(&items, advance, prior, new_payment);
            let stored_items = retain_billable(items);
            let reloaded = settle(
                &stored_items,
                saved.advance_payment,
                saved.additional_payment,
                Decimal::ZERO,
            );
            prop_assert_eq!(reloaded, saved);
        }
    }
}
