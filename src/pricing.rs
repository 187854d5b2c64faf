//! Checkout arithmetic: `sum(unit price × quantity) + delivery fee`.
//!
//! There is no discounting, tax or currency conversion. Amounts are dinars.

use rust_decimal::Decimal;

/// Narrow no-break space, the French thousands separator.
const GROUP_SEPARATOR: char = '\u{202F}';

/// Base price plus the adjustments of the selected variants.
pub fn unit_price<I>(base: Decimal, adjustments: I) -> Decimal
where
    I: IntoIterator<Item = Decimal>,
{
    adjustments.into_iter().fold(base, |acc, adj| acc + adj)
}

pub fn line_total(unit_price: Decimal, quantity: u32) -> Decimal {
    unit_price * Decimal::from(quantity)
}

/// Sum of `(unit price, quantity)` lines.
pub fn subtotal<I>(lines: I) -> Decimal
where
    I: IntoIterator<Item = (Decimal, u32)>,
{
    lines
        .into_iter()
        .map(|(price, quantity)| line_total(price, quantity))
        .sum()
}

pub fn order_total(subtotal: Decimal, delivery_fee: Decimal) -> Decimal {
    subtotal + delivery_fee
}

/// Breakdown returned by quotes and stored on orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, utoipa::ToSchema)]
pub struct Totals {
    pub subtotal: Decimal,
    pub delivery_fee: Decimal,
    pub total: Decimal,
}

impl Totals {
    pub fn new(subtotal: Decimal, delivery_fee: Decimal) -> Self {
        Self {
            subtotal,
            delivery_fee,
            total: order_total(subtotal, delivery_fee),
        }
    }
}

/// Renders an amount the way the storefront prints prices: `12 500 DA`, `1 234,5 DA`.
pub fn format_dinars(amount: Decimal) -> String {
    let rounded = amount.round_dp(2).normalize();
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let text = rounded.abs().to_string();
    let (int_part, frac_part) = match text.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (text.as_str(), None),
    };

    let digits: Vec<char> = int_part.chars().collect();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 8);
    if negative {
        grouped.push('-');
    }
    for (idx, digit) in digits.iter().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            grouped.push(GROUP_SEPARATOR);
        }
        grouped.push(*digit);
    }
    if let Some(frac) = frac_part {
        grouped.push(',');
        grouped.push_str(frac);
    }
    grouped.push_str(" DA");
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    #[test]
    fn unit_price_adds_variant_adjustments() {
        assert_eq!(unit_price(dec!(2500), vec![dec!(300), dec!(-100)]), dec!(2700));
        assert_eq!(unit_price(dec!(2500), Vec::new()), dec!(2500));
    }

    #[test]
    fn totals_include_delivery_fee() {
        let sub = subtotal(vec![(dec!(1500), 2), (dec!(800), 1)]);
        assert_eq!(sub, dec!(3800));
        let totals = Totals::new(sub, dec!(600));
        assert_eq!(totals.total, dec!(4400));
    }

    #[test]
    fn empty_subtotal_is_zero() {
        assert_eq!(subtotal(Vec::new()), Decimal::ZERO);
    }

    #[test]
    fn formats_like_the_storefront() {
        assert_eq!(format_dinars(dec!(12500)), "12\u{202F}500 DA");
        assert_eq!(format_dinars(dec!(1234.50)), "1\u{202F}234,5 DA");
        assert_eq!(format_dinars(dec!(999)), "999 DA");
        assert_eq!(format_dinars(dec!(1000000)), "1\u{202F}000\u{202F}000 DA");
        assert_eq!(format_dinars(Decimal::ZERO), "0 DA");
        assert_eq!(format_dinars(dec!(-450)), "-450 DA");
    }

    proptest! {
        #[test]
        fn subtotal_is_sum_of_line_totals(
            lines in prop::collection::vec((0u32..1_000_000, 1u32..50), 0..20)
        ) {
            let lines: Vec<(Decimal, u32)> = lines
                .into_iter()
                .map(|(cents, qty)| (Decimal::new(cents as i64, 2), qty))
                .collect();
            let expected: Decimal = lines
                .iter()
                .map(|(p, q)| *p * Decimal::from(*q))
                .sum();
            prop_assert_eq!(subtotal(lines.clone()), expected);
            prop_assert!(subtotal(lines) >= Decimal::ZERO);
        }

        #[test]
        fn total_never_below_subtotal_for_non_negative_fee(
            sub in 0i64..10_000_000, fee in 0i64..100_000
        ) {
            let totals = Totals::new(Decimal::from(sub), Decimal::from(fee));
            prop_assert!(totals.total >= totals.subtotal);
            prop_assert_eq!(totals.total - totals.subtotal, Decimal::from(fee));
        }
    }
}
