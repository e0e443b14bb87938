use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::pricing;
use crate::state::MarketState;
use crate::types::{CovenantStatus, ListingId, Position};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PortfolioSnapshot {
    pub after_sequence: u64,
    pub cash_balance: Decimal,
    pub total_holdings: Decimal,
    pub total_cost: Decimal,
    pub total_value: Decimal,
    pub unrealized_pnl: Decimal,
    pub unrealized_pnl_pct: Decimal,
    pub covenant_breakdown: BTreeMap<CovenantStatus, usize>,
    pub positions: BTreeMap<ListingId, PositionSnapshot>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PositionSnapshot {
    pub current_amount: Decimal,
    pub purchase_price: Decimal,
    pub current_value: Decimal,
    pub unrealized_pnl: Decimal,
    pub covenant_status: CovenantStatus,
    /// Share of total portfolio value, in percent.
    pub weight_pct: Decimal,
}

impl PortfolioSnapshot {
    pub fn position_count(&self) -> usize {
        self.positions.len()
    }
}

/// Summarise the portfolio as it stands. Values are the ones frozen at the
/// last purchase; nothing is re-marked here. Totals saturate rather than overflow.
pub fn capture(state: &MarketState, after_sequence: u64) -> PortfolioSnapshot {
    let total = |field: fn(&Position) -> Decimal| {
        state
            .portfolio
            .values()
            .map(field)
            .fold(Decimal::ZERO, Decimal::saturating_add)
    };
    let total_holdings = total(|p| p.current_amount);
    let total_cost = total(|p| p.purchase_price);
    let total_value = total(|p| p.current_value);

    let mut covenant_breakdown = BTreeMap::new();
    let mut positions = BTreeMap::new();

    for (listing_id, pos) in &state.portfolio {
        *covenant_breakdown.entry(pos.covenant_status).or_insert(0) += 1;

        let weight_pct = if total_value.is_zero() {
            Decimal::ZERO
        } else {
            pos.current_value
                .checked_div(total_value)
                .and_then(|share| share.checked_mul(Decimal::ONE_HUNDRED))
                .unwrap_or(Decimal::ZERO)
        };

        positions.insert(
            listing_id.clone(),
            PositionSnapshot {
                current_amount: pos.current_amount,
                purchase_price: pos.purchase_price,
                current_value: pos.current_value,
                unrealized_pnl: pos.unrealized_pnl,
                covenant_status: pos.covenant_status,
                weight_pct,
            },
        );
    }

    PortfolioSnapshot {
        after_sequence,
        cash_balance: state.cash_balance,
        total_holdings,
        total_cost,
        total_value,
        unrealized_pnl: total_value.saturating_sub(total_cost),
        unrealized_pnl_pct: pricing::unrealized_pnl_pct(total_value, total_cost)
            .unwrap_or(Decimal::ZERO),
        covenant_breakdown,
        positions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::ledger::Ledger;
    use crate::persistence::MemoryStore;
    use rust_decimal_macros::dec;

    #[test]
    fn empty_portfolio() {
        let state = MarketState::new(Vec::new(), Vec::new(), dec!(500));
        let snap = capture(&state, 0);
        assert_eq!(snap.cash_balance, dec!(500));
        assert_eq!(snap.total_value, Decimal::ZERO);
        assert_eq!(snap.position_count(), 0);
    }

    #[test]
    fn totals_and_weights() {
        let mut ledger = Ledger::open(
            MemoryStore::default(),
            &Catalog::default_listings(),
            Vec::new(),
            dec!(10000000),
        )
        .unwrap();
        ledger.buy_loan("LST-001", dec!(1000000)).unwrap();
        let receipt = ledger.buy_loan("LST-004", dec!(1100000)).unwrap();

        let snap = capture(ledger.state(), receipt.sequence);
        assert_eq!(snap.total_holdings, dec!(2100000));
        // 990,000 + 990,000
        assert_eq!(snap.total_cost, dec!(1980000));
        assert_eq!(snap.positions["LST-001"].weight_pct, dec!(50));
        assert_eq!(snap.covenant_breakdown[&CovenantStatus::Pass], 1);
        assert_eq!(snap.covenant_breakdown[&CovenantStatus::Fail], 1);
        assert_eq!(snap.cash_balance, dec!(8020000));
    }
}
