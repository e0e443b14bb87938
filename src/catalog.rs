use std::path::Path;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::error::Error;
use crate::types::{Listing, ListingStatus, RiskLevel};

/// Read-only source of tradable listings. The ledger copies these into its
/// state at seed time and never writes back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    listings: Vec<Listing>,
}

#[derive(Debug, Clone, Default)]
pub struct ListingFilter {
    pub risk_level: Option<RiskLevel>,
    pub status: Option<ListingStatus>,
    pub industry: Option<String>,
    pub min_diligence_score: Option<u8>,
}

impl ListingFilter {
    fn matches(&self, listing: &Listing) -> bool {
        self.risk_level.map_or(true, |r| listing.risk_level == r)
            && self.status.map_or(true, |s| listing.status == s)
            && self
                .industry
                .as_deref()
                .map_or(true, |i| listing.industry.eq_ignore_ascii_case(i))
            && self
                .min_diligence_score
                .map_or(true, |s| listing.diligence_score >= s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingSort {
    /// Highest yield first.
    Yield,
    /// Cheapest first.
    AskingPrice,
    /// Best score first.
    DiligenceScore,
    /// Soonest maturity first.
    Maturity,
}

impl Catalog {
    /// Build a catalog from externally sourced listings, rejecting any that
    /// cannot be priced or scored.
    pub fn new(listings: Vec<Listing>) -> Result<Self, Error> {
        for listing in &listings {
            validate_listing(listing)?;
        }
        Ok(Self { listings })
    }

    pub fn from_json(json: &str) -> Result<Self, Error> {
        let listings: Vec<Listing> = serde_json::from_str(json)?;
        Self::new(listings)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn listings(&self) -> &[Listing] {
        &self.listings
    }

    pub fn get(&self, listing_id: &str) -> Option<&Listing> {
        self.listings.iter().find(|l| l.id == listing_id)
    }

    pub fn filter(&self, filter: &ListingFilter) -> Vec<&Listing> {
        self.listings.iter().filter(|l| filter.matches(l)).collect()
    }

    pub fn sorted_by(&self, sort: ListingSort) -> Vec<&Listing> {
        let mut listings: Vec<&Listing> = self.listings.iter().collect();
        match sort {
            ListingSort::Yield => {
                listings.sort_by(|a, b| b.yield_to_maturity.cmp(&a.yield_to_maturity))
            }
            ListingSort::AskingPrice => listings.sort_by(|a, b| a.asking_price.cmp(&b.asking_price)),
            ListingSort::DiligenceScore => {
                listings.sort_by(|a, b| b.diligence_score.cmp(&a.diligence_score))
            }
            ListingSort::Maturity => listings.sort_by_key(|l| l.maturity_date),
        }
        listings
    }

    /// The built-in mock catalog.
    pub fn default_listings() -> Self {
        Self {
            listings: vec![
                listing(
                    "LST-001",
                    "Meridian Logistics Holdings",
                    "First Harbor Bank",
                    dec!(5000000),
                    dec!(5000000),
                    dec!(6.25),
                    date(2029, 6, 30),
                    "BBB+",
                    "Transportation",
                    dec!(4950000),
                    dec!(6.48),
                    92,
                    RiskLevel::Low,
                ),
                listing(
                    "LST-002",
                    "Crestview Healthcare Partners",
                    "Atlantic Commercial Credit",
                    dec!(12000000),
                    dec!(10500000),
                    dec!(7.10),
                    date(2028, 3, 31),
                    "BBB-",
                    "Healthcare",
                    dec!(10185000),
                    dec!(7.85),
                    84,
                    RiskLevel::Medium,
                ),
                listing(
                    "LST-003",
                    "Northwind Renewable Energy",
                    "Pinecrest Capital",
                    dec!(25000000),
                    dec!(24000000),
                    dec!(5.75),
                    date(2031, 12, 15),
                    "A-",
                    "Energy",
                    dec!(24240000),
                    dec!(5.52),
                    95,
                    RiskLevel::Low,
                ),
                listing(
                    "LST-004",
                    "Ironclad Manufacturing Co.",
                    "Summit Lending Group",
                    dec!(8000000),
                    dec!(6400000),
                    dec!(9.50),
                    date(2027, 9, 1),
                    "BB",
                    "Industrials",
                    dec!(5760000),
                    dec!(12.40),
                    68,
                    RiskLevel::High,
                ),
                listing(
                    "LST-005",
                    "Bluewater Hospitality Group",
                    "First Harbor Bank",
                    dec!(15000000),
                    dec!(14250000),
                    dec!(8.00),
                    date(2030, 1, 31),
                    "BB+",
                    "Hospitality",
                    dec!(13680000),
                    dec!(8.95),
                    76,
                    RiskLevel::Medium,
                ),
            ],
        }
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::default_listings()
    }
}

fn validate_listing(listing: &Listing) -> Result<(), Error> {
    let invalid = |reason: String| {
        Err(Error::ConfigurationError(format!("listing {}: {reason}", listing.id)))
    };
    if listing.outstanding_amount <= Decimal::ZERO {
        return invalid(format!(
            "outstanding amount must be positive, got {}",
            listing.outstanding_amount
        ));
    }
    if listing.asking_price < Decimal::ZERO {
        return invalid(format!(
            "asking price must not be negative, got {}",
            listing.asking_price
        ));
    }
    if listing.diligence_score > 100 {
        return invalid(format!(
            "diligence score must be 0-100, got {}",
            listing.diligence_score
        ));
    }
    Ok(())
}

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or_default()
}

#[allow(clippy::too_many_arguments)]
fn listing(
    id: &str,
    borrower: &str,
    original_lender: &str,
    principal: Decimal,
    outstanding_amount: Decimal,
    coupon_rate: Decimal,
    maturity_date: NaiveDate,
    credit_rating: &str,
    industry: &str,
    asking_price: Decimal,
    yield_to_maturity: Decimal,
    diligence_score: u8,
    risk_level: RiskLevel,
) -> Listing {
    Listing {
        id: id.into(),
        borrower: borrower.into(),
        original_lender: original_lender.into(),
        principal,
        outstanding_amount,
        coupon_rate,
        maturity_date,
        credit_rating: credit_rating.into(),
        industry: industry.into(),
        asking_price,
        yield_to_maturity,
        diligence_score,
        risk_level,
        status: ListingStatus::Active,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_by_risk_and_score() {
        let catalog = Catalog::default_listings();

        let low = catalog.filter(&ListingFilter {
            risk_level: Some(RiskLevel::Low),
            ..Default::default()
        });
        assert_eq!(low.len(), 2);

        let strong = catalog.filter(&ListingFilter {
            min_diligence_score: Some(90),
            ..Default::default()
        });
        let ids: Vec<&str> = strong.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, vec!["LST-001", "LST-003"]);

        let energy = catalog.filter(&ListingFilter {
            industry: Some("energy".into()),
            ..Default::default()
        });
        assert_eq!(energy.len(), 1);
    }

    #[test]
    fn sort_orders() {
        let catalog = Catalog::default_listings();
        assert_eq!(catalog.sorted_by(ListingSort::Yield)[0].id, "LST-004");
        assert_eq!(catalog.sorted_by(ListingSort::AskingPrice)[0].id, "LST-001");
        assert_eq!(catalog.sorted_by(ListingSort::DiligenceScore)[0].id, "LST-003");
        assert_eq!(catalog.sorted_by(ListingSort::Maturity)[0].id, "LST-004");
    }

    #[test]
    fn catalog_from_json() {
        let json = serde_json::to_string(Catalog::default_listings().listings()).unwrap();
        let catalog = Catalog::from_json(&json).unwrap();
        assert_eq!(catalog, Catalog::default_listings());
        assert!(Catalog::from_json("not json").is_err());
    }

    fn json_with(edit: impl FnOnce(&mut Listing)) -> String {
        let mut listings = Catalog::default_listings().listings().to_vec();
        edit(&mut listings[0]);
        serde_json::to_string(&listings).unwrap()
    }

    #[test]
    fn rejects_negative_asking_price() {
        let json = json_with(|l| l.asking_price = dec!(-4950000));
        assert!(matches!(
            Catalog::from_json(&json),
            Err(Error::ConfigurationError(msg)) if msg.contains("LST-001") && msg.contains("asking price")
        ));
    }

    #[test]
    fn rejects_non_positive_outstanding() {
        for outstanding in [dec!(0), dec!(-1)] {
            let json = json_with(|l| l.outstanding_amount = outstanding);
            assert!(matches!(
                Catalog::from_json(&json),
                Err(Error::ConfigurationError(msg)) if msg.contains("outstanding amount")
            ));
        }
    }

    #[test]
    fn rejects_out_of_range_score() {
        let json = json_with(|l| l.diligence_score = 250);
        assert!(matches!(
            Catalog::from_json(&json),
            Err(Error::ConfigurationError(msg)) if msg.contains("diligence score")
        ));

        let mut listings = Catalog::default_listings().listings().to_vec();
        listings[1].diligence_score = 100;
        listings[2].asking_price = Decimal::ZERO;
        assert!(Catalog::new(listings).is_ok());
    }
}
