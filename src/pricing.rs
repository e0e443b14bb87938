use rust_decimal::Decimal;

use crate::types::{CovenantStatus, Listing, RiskLevel, TradeRiskSignal};

const ONE_HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Asking price per unit of outstanding notional. `None` when the listing has
/// no outstanding amount or the quotient does not fit a `Decimal`.
pub fn price_ratio(listing: &Listing) -> Option<Decimal> {
    listing.asking_price.checked_div(listing.outstanding_amount)
}

/// Cash cost of acquiring `amount` notional of a listing.
pub fn purchase_cost(listing: &Listing, amount: Decimal) -> Option<Decimal> {
    amount.checked_mul(price_ratio(listing)?)
}

/// Mark-to-market value of a holding at the listing's current ratio.
pub fn position_value(current_amount: Decimal, ratio: Decimal) -> Option<Decimal> {
    current_amount.checked_mul(ratio)
}

pub fn unrealized_pnl(current_value: Decimal, cost: Decimal) -> Option<Decimal> {
    current_value.checked_sub(cost)
}

/// Unrealized P&L as a percentage of cost. Zero cost yields zero.
pub fn unrealized_pnl_pct(current_value: Decimal, cost: Decimal) -> Option<Decimal> {
    if cost.is_zero() {
        return Some(Decimal::ZERO);
    }
    unrealized_pnl(current_value, cost)?
        .checked_div(cost)?
        .checked_mul(ONE_HUNDRED)
}

pub fn covenant_status(diligence_score: u8) -> CovenantStatus {
    match diligence_score {
        90.. => CovenantStatus::Pass,
        75..=89 => CovenantStatus::Warning,
        _ => CovenantStatus::Fail,
    }
}

pub fn trade_risk_signal(risk_level: RiskLevel) -> TradeRiskSignal {
    match risk_level {
        RiskLevel::Low => TradeRiskSignal::Safe,
        RiskLevel::Medium => TradeRiskSignal::ReviewRequired,
        RiskLevel::High => TradeRiskSignal::HighRisk,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use rust_decimal_macros::dec;

    #[test]
    fn covenant_boundaries() {
        assert_eq!(covenant_status(100), CovenantStatus::Pass);
        assert_eq!(covenant_status(90), CovenantStatus::Pass);
        assert_eq!(covenant_status(89), CovenantStatus::Warning);
        assert_eq!(covenant_status(75), CovenantStatus::Warning);
        assert_eq!(covenant_status(74), CovenantStatus::Fail);
        assert_eq!(covenant_status(0), CovenantStatus::Fail);
    }

    #[test]
    fn risk_signal_follows_risk_level() {
        assert_eq!(trade_risk_signal(RiskLevel::Low), TradeRiskSignal::Safe);
        assert_eq!(trade_risk_signal(RiskLevel::Medium), TradeRiskSignal::ReviewRequired);
        assert_eq!(trade_risk_signal(RiskLevel::High), TradeRiskSignal::HighRisk);
    }

    #[test]
    fn cost_uses_asking_over_outstanding() {
        let catalog = Catalog::default_listings();
        let listing = catalog.get("LST-001").unwrap();
        assert_eq!(price_ratio(listing), Some(dec!(0.99)));
        assert_eq!(purchase_cost(listing, dec!(5000000)), Some(dec!(4950000)));
    }

    #[test]
    fn zero_outstanding_has_no_ratio() {
        let mut listing = Catalog::default_listings().get("LST-001").unwrap().clone();
        listing.outstanding_amount = Decimal::ZERO;
        assert_eq!(price_ratio(&listing), None);
        assert_eq!(purchase_cost(&listing, dec!(1000)), None);
    }

    #[test]
    fn overflow_is_none() {
        let listing = Catalog::default_listings().get("LST-003").unwrap().clone();
        assert_eq!(purchase_cost(&listing, Decimal::MAX), None);
        assert_eq!(position_value(Decimal::MAX, dec!(2)), None);
        assert_eq!(unrealized_pnl(Decimal::MIN, Decimal::MAX), None);
    }

    #[test]
    fn pnl_percentage() {
        assert_eq!(unrealized_pnl_pct(dec!(110), dec!(100)), Some(dec!(10)));
        assert_eq!(unrealized_pnl_pct(dec!(90), dec!(100)), Some(dec!(-10)));
        assert_eq!(unrealized_pnl_pct(dec!(90), Decimal::ZERO), Some(Decimal::ZERO));
    }
}
