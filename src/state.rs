use std::collections::BTreeMap;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{
    Listing, ListingId, Notification, NotificationId, NotificationKind, Order, Position,
};

/// Everything the ledger persists, written and rehydrated as one blob.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MarketState {
    pub listings: BTreeMap<ListingId, Listing>,
    pub portfolio: BTreeMap<ListingId, Position>,
    pub orders: Vec<Order>,
    pub notifications: Vec<Notification>,
    pub cash_balance: Decimal,
    #[serde(default)]
    pub next_notification_id: NotificationId,
}

impl MarketState {
    pub fn new(listings: Vec<Listing>, orders: Vec<Order>, cash_balance: Decimal) -> Self {
        Self {
            listings: listings.into_iter().map(|l| (l.id.clone(), l)).collect(),
            portfolio: BTreeMap::new(),
            orders,
            notifications: Vec::new(),
            cash_balance,
            next_notification_id: 1,
        }
    }

    pub fn listing(&self, listing_id: &str) -> Option<&Listing> {
        self.listings.get(listing_id)
    }

    pub fn position(&self, listing_id: &str) -> Option<&Position> {
        self.portfolio.get(listing_id)
    }

    pub fn push_notification(
        &mut self,
        kind: NotificationKind,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> NotificationId {
        let id = self.next_notification_id.max(1);
        self.next_notification_id = id + 1;
        self.notifications.push(Notification {
            id,
            kind,
            title: title.into(),
            message: message.into(),
            created_at: Utc::now(),
            read: false,
        });
        id
    }

    pub fn unread_notifications(&self) -> impl Iterator<Item = &Notification> {
        self.notifications.iter().filter(|n| !n.read)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn notification_ids_are_monotonic() {
        let mut state = MarketState::new(Vec::new(), Vec::new(), dec!(0));
        let a = state.push_notification(NotificationKind::Info, "a", "first");
        let b = state.push_notification(NotificationKind::Success, "b", "second");
        assert_eq!((a, b), (1, 2));
        assert_eq!(state.unread_notifications().count(), 2);
    }

    #[test]
    fn rehydrated_blob_without_counter_still_issues_ids() {
        let json = r#"{"listings":{},"portfolio":{},"orders":[],"notifications":[],"cashBalance":"10"}"#;
        let mut state: MarketState = serde_json::from_str(json).unwrap();
        assert_eq!(state.cash_balance, dec!(10));
        assert_eq!(state.push_notification(NotificationKind::Info, "t", "m"), 1);
    }
}
