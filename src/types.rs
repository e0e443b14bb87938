use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

pub type ListingId = String;
pub type OrderId = String;
pub type NotificationId = u64;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ListingStatus {
    Active,
    UnderReview,
    Sold,
    Withdrawn,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CovenantStatus {
    Pass,
    Warning,
    Fail,
}

impl fmt::Display for CovenantStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CovenantStatus::Pass => write!(f, "PASS"),
            CovenantStatus::Warning => write!(f, "WARNING"),
            CovenantStatus::Fail => write!(f, "FAIL"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeRiskSignal {
    Safe,
    ReviewRequired,
    HighRisk,
}

impl fmt::Display for TradeRiskSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeRiskSignal::Safe => write!(f, "SAFE"),
            TradeRiskSignal::ReviewRequired => write!(f, "REVIEW_REQUIRED"),
            TradeRiskSignal::HighRisk => write!(f, "HIGH_RISK"),
        }
    }
}

/// A loan tranche offered for secondary-market purchase. Never mutated by trading.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub id: ListingId,
    pub borrower: String,
    pub original_lender: String,
    pub principal: Decimal,
    pub outstanding_amount: Decimal,
    pub coupon_rate: Decimal,
    pub maturity_date: NaiveDate,
    pub credit_rating: String,
    pub industry: String,
    pub asking_price: Decimal,
    pub yield_to_maturity: Decimal,
    pub diligence_score: u8,
    pub risk_level: RiskLevel,
    pub status: ListingStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub listing_id: ListingId,
    pub borrower: String,
    pub original_lender: String,
    pub coupon_rate: Decimal,
    pub maturity_date: NaiveDate,
    pub credit_rating: String,
    pub industry: String,
    pub risk_level: RiskLevel,
    pub current_amount: Decimal,
    /// Cumulative cost of every purchase into this position.
    pub purchase_price: Decimal,
    pub current_value: Decimal,
    pub unrealized_pnl: Decimal,
    pub unrealized_pnl_pct: Decimal,
    pub covenant_status: CovenantStatus,
    pub trade_risk_signal: TradeRiskSignal,
    pub acquired_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Open,
    Partial,
    Filled,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub listing_id: ListingId,
    pub side: OrderSide,
    pub amount: Decimal,
    pub price: Decimal,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Success,
    Error,
    Info,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: NotificationId,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub read: bool,
}
