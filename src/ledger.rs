use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::catalog::Catalog;
use crate::error::LedgerError;
use crate::events::{Event, EventType};
use crate::persistence::Persistence;
use crate::pricing;
use crate::risk::{self, PurchaseQuote};
use crate::state::MarketState;
use crate::types::{
    Listing, ListingId, NotificationId, NotificationKind, Order, Position,
};

/// What an accepted buy did to the ledger.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PurchaseReceipt {
    pub sequence: u64,
    pub listing_id: ListingId,
    pub amount: Decimal,
    pub price_ratio: Decimal,
    pub cost: Decimal,
    pub cash_balance: Decimal,
    pub position: Position,
}

/// The `{success, message}` shape handed to display surfaces.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TradeOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl From<&Result<PurchaseReceipt, LedgerError>> for TradeOutcome {
    fn from(result: &Result<PurchaseReceipt, LedgerError>) -> Self {
        match result {
            Ok(_) => Self {
                success: true,
                message: None,
            },
            Err(e) => Self {
                success: false,
                message: Some(e.to_string()),
            },
        }
    }
}

/// Seed used on first open and on reset.
#[derive(Debug, Clone)]
struct Seed {
    listings: Vec<Listing>,
    orders: Vec<Order>,
    cash_balance: Decimal,
}

impl Seed {
    fn state(&self) -> MarketState {
        MarketState::new(self.listings.clone(), self.orders.clone(), self.cash_balance)
    }
}

/// Single owner of cash balance and positions. Every mutation is written
/// through the persistence port before it becomes visible.
pub struct Ledger<P: Persistence> {
    store: P,
    seed: Seed,
    state: MarketState,
    event_log: Vec<Event>,
    next_sequence: u64,
}

impl<P: Persistence> Ledger<P> {
    /// Rehydrate from the store, or seed from the catalog when nothing is stored.
    pub fn open(
        store: P,
        catalog: &Catalog,
        orders: Vec<Order>,
        initial_cash: Decimal,
    ) -> Result<Self, LedgerError> {
        let seed = Seed {
            listings: catalog.listings().to_vec(),
            orders,
            cash_balance: initial_cash,
        };

        let state = match store.load()? {
            Some(state) => {
                info!(
                    positions = state.portfolio.len(),
                    cash = %state.cash_balance,
                    "ledger rehydrated"
                );
                state
            }
            None => {
                let state = seed.state();
                store.save(&state)?;
                info!(listings = state.listings.len(), cash = %state.cash_balance, "ledger seeded");
                state
            }
        };

        Ok(Self {
            store,
            seed,
            state,
            event_log: Vec::new(),
            next_sequence: 1,
        })
    }

    pub fn state(&self) -> &MarketState {
        &self.state
    }

    pub fn cash_balance(&self) -> Decimal {
        self.state.cash_balance
    }

    pub fn position(&self, listing_id: &str) -> Option<&Position> {
        self.state.position(listing_id)
    }

    pub fn event_log(&self) -> &[Event] {
        &self.event_log
    }

    pub fn store(&self) -> &P {
        &self.store
    }

    /// Acquire `amount` notional of a listing at its asking price ratio.
    pub fn buy_loan(
        &mut self,
        listing_id: &str,
        amount: Decimal,
    ) -> Result<PurchaseReceipt, LedgerError> {
        let planned = risk::check_purchase(&self.state, listing_id, amount)
            .and_then(|quote| self.plan_purchase(&quote, amount));
        let (price_ratio, cost, next) = match planned {
            Ok(planned) => planned,
            Err(e) => {
                warn!(listing_id, %amount, "purchase rejected: {e}");
                self.record(EventType::TradeRejected {
                    listing_id: listing_id.to_string(),
                    amount,
                    reason: e.to_string(),
                });
                return Err(e);
            }
        };

        self.store.save(&next)?;
        self.state = next;

        let position = self.state.portfolio[listing_id].clone();
        let cash_balance = self.state.cash_balance;
        let sequence = self.record(EventType::LoanPurchased {
            listing_id: listing_id.to_string(),
            amount,
            price_ratio,
            cost,
            cash_after: cash_balance,
        });

        info!(listing_id, %amount, %cost, cash = %cash_balance, "loan purchased");

        Ok(PurchaseReceipt {
            sequence,
            listing_id: listing_id.to_string(),
            amount,
            price_ratio,
            cost,
            cash_balance,
            position,
        })
    }

    /// Build the post-purchase state on a copy; only committed once persisted.
    fn plan_purchase(
        &self,
        quote: &PurchaseQuote<'_>,
        amount: Decimal,
    ) -> Result<(Decimal, Decimal, MarketState), LedgerError> {
        let mut next = self.state.clone();
        apply_purchase_to(&mut next.portfolio, quote, amount, Utc::now())?;
        next.cash_balance = next
            .cash_balance
            .checked_sub(quote.cost)
            .ok_or(LedgerError::ArithmeticOverflow)?;
        next.push_notification(
            NotificationKind::Success,
            "Purchase complete",
            format!(
                "Acquired {amount} of {} for {}",
                quote.listing.borrower, quote.cost
            ),
        );
        Ok((quote.price_ratio, quote.cost, next))
    }

    /// Selling is not wired to any execution path.
    pub fn sell_loan(&mut self, listing_id: &str, amount: Decimal) -> Result<(), LedgerError> {
        warn!(listing_id, %amount, "sell requested but not supported");
        Err(LedgerError::NotSupported("sell_loan"))
    }

    /// Ledger-side diligence is not implemented; see `diligence::DueDiligenceGenerator`.
    pub fn run_due_diligence(&mut self, listing_id: &str) -> Result<(), LedgerError> {
        warn!(listing_id, "ledger due diligence requested but not supported");
        Err(LedgerError::NotSupported("run_due_diligence"))
    }

    /// Restore catalog listings, mock orders and the initial cash balance.
    pub fn reset_market(&mut self) -> Result<(), LedgerError> {
        let next = self.seed.state();
        self.store.save(&next)?;
        self.state = next;
        self.record(EventType::MarketReset {
            cash_balance: self.state.cash_balance,
        });
        info!(cash = %self.state.cash_balance, "market reset");
        Ok(())
    }

    pub fn notify(
        &mut self,
        kind: NotificationKind,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Result<NotificationId, LedgerError> {
        let mut next = self.state.clone();
        let id = next.push_notification(kind, title, message);
        self.commit(next)?;
        Ok(id)
    }

    /// Returns false when no notification has that id.
    pub fn mark_notification_read(&mut self, id: NotificationId) -> Result<bool, LedgerError> {
        let mut next = self.state.clone();
        let Some(notification) = next.notifications.iter_mut().find(|n| n.id == id) else {
            return Ok(false);
        };
        notification.read = true;
        self.commit(next)?;
        Ok(true)
    }

    pub fn clear_notifications(&mut self) -> Result<(), LedgerError> {
        let mut next = self.state.clone();
        next.notifications.clear();
        self.commit(next)
    }

    fn commit(&mut self, next: MarketState) -> Result<(), LedgerError> {
        self.store.save(&next)?;
        self.state = next;
        Ok(())
    }

    fn record(&mut self, event_type: EventType) -> u64 {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.event_log.push(Event {
            sequence,
            recorded_at: Utc::now(),
            event_type,
        });
        sequence
    }
}

/// Add a quoted purchase to a portfolio, opening or growing the position.
///
/// Covenant status and risk signal are fixed when the position opens; later
/// buys into the same listing leave them as they were. On error the portfolio
/// may be partly updated, so callers apply this to a copy.
pub fn apply_purchase_to(
    portfolio: &mut BTreeMap<ListingId, Position>,
    quote: &PurchaseQuote<'_>,
    amount: Decimal,
    now: DateTime<Utc>,
) -> Result<(), LedgerError> {
    let listing = quote.listing;

    let position = portfolio
        .entry(listing.id.clone())
        .or_insert_with(|| Position {
            listing_id: listing.id.clone(),
            borrower: listing.borrower.clone(),
            original_lender: listing.original_lender.clone(),
            coupon_rate: listing.coupon_rate,
            maturity_date: listing.maturity_date,
            credit_rating: listing.credit_rating.clone(),
            industry: listing.industry.clone(),
            risk_level: listing.risk_level,
            current_amount: Decimal::ZERO,
            purchase_price: Decimal::ZERO,
            current_value: Decimal::ZERO,
            unrealized_pnl: Decimal::ZERO,
            unrealized_pnl_pct: Decimal::ZERO,
            covenant_status: pricing::covenant_status(listing.diligence_score),
            trade_risk_signal: pricing::trade_risk_signal(listing.risk_level),
            acquired_at: now,
        });

    let overflow = || LedgerError::ArithmeticOverflow;
    position.current_amount = position.current_amount.checked_add(amount).ok_or_else(overflow)?;
    position.purchase_price = position.purchase_price.checked_add(quote.cost).ok_or_else(overflow)?;
    position.current_value = pricing::position_value(position.current_amount, quote.price_ratio)
        .ok_or_else(overflow)?;
    position.unrealized_pnl = pricing::unrealized_pnl(position.current_value, position.purchase_price)
        .ok_or_else(overflow)?;
    position.unrealized_pnl_pct =
        pricing::unrealized_pnl_pct(position.current_value, position.purchase_price)
            .ok_or_else(overflow)?;
    Ok(())
}
