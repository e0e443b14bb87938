use chrono::{TimeZone, Utc};
use rust_decimal_macros::dec;

use crate::types::{Order, OrderSide, OrderStatus};

/// Display-only view over the mock order set. Orders are not wired to the
/// ledger and never change status.
pub struct OrderBook<'a> {
    orders: &'a [Order],
}

impl<'a> OrderBook<'a> {
    pub fn new(orders: &'a [Order]) -> Self {
        Self { orders }
    }

    pub fn all(&self) -> &'a [Order] {
        self.orders
    }

    /// Orders still working: open or partially filled.
    pub fn open(&self) -> Vec<&'a Order> {
        self.orders
            .iter()
            .filter(|o| matches!(o.status, OrderStatus::Open | OrderStatus::Partial))
            .collect()
    }

    pub fn by_status(&self, status: OrderStatus) -> Vec<&'a Order> {
        self.orders.iter().filter(|o| o.status == status).collect()
    }

    pub fn for_listing(&self, listing_id: &str) -> Vec<&'a Order> {
        self.orders
            .iter()
            .filter(|o| o.listing_id == listing_id)
            .collect()
    }
}

pub fn mock_orders() -> Vec<Order> {
    let at = |day: u32, hour: u32| {
        Utc.with_ymd_and_hms(2024, 11, day, hour, 0, 0)
            .single()
            .unwrap_or_default()
    };

    vec![
        Order {
            id: "ORD-1001".into(),
            listing_id: "LST-002".into(),
            side: OrderSide::Buy,
            amount: dec!(2500000),
            price: dec!(0.965),
            status: OrderStatus::Open,
            created_at: at(4, 9),
        },
        Order {
            id: "ORD-1002".into(),
            listing_id: "LST-003".into(),
            side: OrderSide::Sell,
            amount: dec!(5000000),
            price: dec!(1.012),
            status: OrderStatus::Partial,
            created_at: at(5, 14),
        },
        Order {
            id: "ORD-1003".into(),
            listing_id: "LST-001".into(),
            side: OrderSide::Buy,
            amount: dec!(1000000),
            price: dec!(0.99),
            status: OrderStatus::Filled,
            created_at: at(6, 11),
        },
        Order {
            id: "ORD-1004".into(),
            listing_id: "LST-004".into(),
            side: OrderSide::Sell,
            amount: dec!(750000),
            price: dec!(0.895),
            status: OrderStatus::Cancelled,
            created_at: at(7, 16),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_includes_partial_fills() {
        let orders = mock_orders();
        let book = OrderBook::new(&orders);
        let open: Vec<&str> = book.open().iter().map(|o| o.id.as_str()).collect();
        assert_eq!(open, vec!["ORD-1001", "ORD-1002"]);
        assert_eq!(book.by_status(OrderStatus::Filled).len(), 1);
        assert_eq!(book.for_listing("LST-004")[0].id, "ORD-1004");
        assert_eq!(book.all().len(), 4);
    }
}
