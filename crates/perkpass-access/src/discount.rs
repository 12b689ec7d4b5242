//! Discount arithmetic.
//!
//! Monetary values are `rust_decimal::Decimal`. Percentage discounts
//! round half-up (midpoint away from zero) to the currency's minor
//! unit, applied once at final computation — intermediates are never
//! rounded.

use perkpass_core::models::agreement::DiscountType;
use rust_decimal::{Decimal, RoundingStrategy};

/// Minor-unit precision of the ledger currency.
const MINOR_UNIT_DP: u32 = 2;

/// The computed split of an original amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscountBreakdown {
    pub discount_amount: Decimal,
    pub final_amount: Decimal,
}

/// Apply an agreement's discount rule to `original`.
///
/// - `Percentage`: `discount = original * value / 100`, rounded once.
/// - `FixedAmount`: `discount = min(value, original)` — the final
///   amount never goes negative.
/// - `FreeItem` / `SpecialOffer`: `discount = value`, final amount
///   clamped at zero.
pub fn compute(discount_type: DiscountType, value: Decimal, original: Decimal) -> DiscountBreakdown {
    match discount_type {
        DiscountType::Percentage => {
            let discount_amount = (original * value / Decimal::ONE_HUNDRED)
                .round_dp_with_strategy(MINOR_UNIT_DP, RoundingStrategy::MidpointAwayFromZero);
            DiscountBreakdown {
                discount_amount,
                final_amount: original - discount_amount,
            }
        }
        DiscountType::FixedAmount => {
            let discount_amount = value.min(original);
            DiscountBreakdown {
                discount_amount,
                final_amount: original - discount_amount,
            }
        }
        DiscountType::FreeItem | DiscountType::SpecialOffer => DiscountBreakdown {
            discount_amount: value,
            final_amount: (original - value).max(Decimal::ZERO),
        },
    }
}
