use rust_decimal::Decimal;

use crate::error::LedgerError;
use crate::pricing;
use crate::state::MarketState;
use crate::types::Listing;

/// An accepted pre-trade check, carrying what the ledger needs to apply the buy.
#[derive(Debug)]
pub struct PurchaseQuote<'a> {
    pub listing: &'a Listing,
    pub price_ratio: Decimal,
    pub cost: Decimal,
}

/// Validate a purchase against current state without touching it.
///
/// Funds are checked on notional, matching the dashboard's pre-trade check: a buy
/// is refused when `amount` exceeds cash even if the discounted cost would fit.
/// Listings without a positive price ratio are never quoted.
pub fn check_purchase<'a>(
    state: &'a MarketState,
    listing_id: &str,
    amount: Decimal,
) -> Result<PurchaseQuote<'a>, LedgerError> {
    if amount <= Decimal::ZERO {
        return Err(LedgerError::InvalidAmount(amount));
    }

    let listing = state
        .listing(listing_id)
        .ok_or_else(|| LedgerError::ListingNotFound(listing_id.to_string()))?;

    if amount > state.cash_balance {
        return Err(LedgerError::InsufficientFunds {
            required: amount,
            available: state.cash_balance,
        });
    }

    let price_ratio = pricing::price_ratio(listing)
        .filter(|ratio| *ratio > Decimal::ZERO)
        .ok_or_else(|| LedgerError::UnpricedListing(listing_id.to_string()))?;
    let cost = amount
        .checked_mul(price_ratio)
        .ok_or(LedgerError::ArithmeticOverflow)?;

    // A ratio above par can make cost exceed cash even when notional fits.
    if cost > state.cash_balance {
        return Err(LedgerError::InsufficientFunds {
            required: cost,
            available: state.cash_balance,
        });
    }

    Ok(PurchaseQuote {
        listing,
        price_ratio,
        cost,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use rust_decimal_macros::dec;

    fn state(cash: Decimal) -> MarketState {
        MarketState::new(Catalog::default_listings().listings().to_vec(), Vec::new(), cash)
    }

    #[test]
    fn rejects_non_positive_amounts() {
        let s = state(dec!(1000));
        assert!(matches!(
            check_purchase(&s, "LST-001", dec!(0)),
            Err(LedgerError::InvalidAmount(_))
        ));
        assert!(matches!(
            check_purchase(&s, "LST-001", dec!(-5)),
            Err(LedgerError::InvalidAmount(_))
        ));
    }

    #[test]
    fn rejects_unknown_listing() {
        let s = state(dec!(1000));
        assert!(matches!(
            check_purchase(&s, "LST-999", dec!(10)),
            Err(LedgerError::ListingNotFound(id)) if id == "LST-999"
        ));
    }

    #[test]
    fn notional_above_cash_is_rejected_even_below_par() {
        let s = state(dec!(1000));
        // cost would be 990.99, but notional exceeds cash
        assert!(matches!(
            check_purchase(&s, "LST-001", dec!(1001)),
            Err(LedgerError::InsufficientFunds { .. })
        ));
        assert!(check_purchase(&s, "LST-001", dec!(1000)).is_ok());
    }

    #[test]
    fn above_par_cost_checked_against_cash() {
        let s = state(dec!(1000));
        // LST-003 trades at 1.01
        assert!(matches!(
            check_purchase(&s, "LST-003", dec!(1000)),
            Err(LedgerError::InsufficientFunds { required, .. }) if required == dec!(1010)
        ));
    }

    fn repriced(ask: Decimal, outstanding: Decimal) -> MarketState {
        let mut s = state(dec!(1000000));
        let listing = s.listings.get_mut("LST-001").unwrap();
        listing.asking_price = ask;
        listing.outstanding_amount = outstanding;
        s
    }

    #[test]
    fn listings_without_a_positive_price_are_not_quoted() {
        for s in [
            repriced(dec!(-4950000), dec!(5000000)),
            repriced(dec!(0), dec!(5000000)),
            repriced(dec!(4950000), dec!(0)),
        ] {
            assert!(matches!(
                check_purchase(&s, "LST-001", dec!(1000)),
                Err(LedgerError::UnpricedListing(id)) if id == "LST-001"
            ));
        }
    }

    #[test]
    fn cost_overflow_is_an_error() {
        let s = state(Decimal::MAX);
        assert!(matches!(
            check_purchase(&s, "LST-003", Decimal::MAX),
            Err(LedgerError::ArithmeticOverflow)
        ));
    }
}
