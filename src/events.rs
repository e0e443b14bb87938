use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::ListingId;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Event {
    pub sequence: u64,
    pub recorded_at: DateTime<Utc>,
    pub event_type: EventType,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum EventType {
    LoanPurchased {
        listing_id: ListingId,
        amount: Decimal,
        price_ratio: Decimal,
        cost: Decimal,
        cash_after: Decimal,
    },
    TradeRejected {
        listing_id: ListingId,
        amount: Decimal,
        reason: String,
    },
    MarketReset {
        cash_balance: Decimal,
    },
}
