use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::info;

use crate::pricing;
use crate::types::{CovenantStatus, Listing, ListingId, RiskLevel};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DiligenceStage {
    FinancialAnalysis,
    CovenantReview,
    CollateralAssessment,
    MarketComparables,
    FinalScoring,
}

impl DiligenceStage {
    pub const ALL: [DiligenceStage; 5] = [
        DiligenceStage::FinancialAnalysis,
        DiligenceStage::CovenantReview,
        DiligenceStage::CollateralAssessment,
        DiligenceStage::MarketComparables,
        DiligenceStage::FinalScoring,
    ];

    /// Offset applied to the listing's score for this category.
    fn score_offset(self) -> i16 {
        match self {
            DiligenceStage::FinancialAnalysis => 2,
            DiligenceStage::CovenantReview => -3,
            DiligenceStage::CollateralAssessment => 4,
            DiligenceStage::MarketComparables => -1,
            DiligenceStage::FinalScoring => 0,
        }
    }
}

impl fmt::Display for DiligenceStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DiligenceStage::FinancialAnalysis => "financial analysis",
            DiligenceStage::CovenantReview => "covenant review",
            DiligenceStage::CollateralAssessment => "collateral assessment",
            DiligenceStage::MarketComparables => "market comparables",
            DiligenceStage::FinalScoring => "final scoring",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Recommendation {
    Buy,
    Hold,
    Avoid,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CategoryScore {
    pub stage: DiligenceStage,
    pub score: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DueDiligenceReport {
    pub listing_id: ListingId,
    pub borrower: String,
    pub overall_score: u8,
    pub categories: Vec<CategoryScore>,
    pub covenant_status: CovenantStatus,
    pub recommendation: Recommendation,
    pub findings: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiligenceProgress {
    Idle,
    Running { stage: DiligenceStage, completed: usize },
    Done,
}

/// Produces a canned report for a listing after walking through each review
/// stage. Reports are informational and never reach the ledger.
pub struct DueDiligenceGenerator {
    stage_delay: Duration,
    progress: watch::Sender<DiligenceProgress>,
}

impl DueDiligenceGenerator {
    pub fn new(stage_delay: Duration) -> Self {
        let (progress, _) = watch::channel(DiligenceProgress::Idle);
        Self {
            stage_delay,
            progress,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<DiligenceProgress> {
        self.progress.subscribe()
    }

    pub async fn generate(&self, listing: &Listing) -> DueDiligenceReport {
        let mut categories = Vec::with_capacity(DiligenceStage::ALL.len());

        for (completed, stage) in DiligenceStage::ALL.into_iter().enumerate() {
            self.progress
                .send_replace(DiligenceProgress::Running { stage, completed });
            sleep(self.stage_delay).await;
            categories.push(CategoryScore {
                stage,
                score: category_score(listing, stage),
            });
        }

        self.progress.send_replace(DiligenceProgress::Done);

        let report = DueDiligenceReport {
            listing_id: listing.id.clone(),
            borrower: listing.borrower.clone(),
            overall_score: listing.diligence_score,
            categories,
            covenant_status: pricing::covenant_status(listing.diligence_score),
            recommendation: recommendation(listing.diligence_score),
            findings: findings(listing),
            generated_at: Utc::now(),
        };

        info!(
            listing_id = %report.listing_id,
            score = report.overall_score,
            "due diligence report generated"
        );
        report
    }
}

pub fn category_score(listing: &Listing, stage: DiligenceStage) -> u8 {
    let risk_penalty = match listing.risk_level {
        RiskLevel::Low => 0,
        RiskLevel::Medium => 2,
        RiskLevel::High => 5,
    };
    let penalty = if stage == DiligenceStage::FinalScoring {
        0
    } else {
        risk_penalty
    };
    let raw = i16::from(listing.diligence_score) + stage.score_offset() - penalty;
    raw.clamp(0, 100) as u8
}

pub fn recommendation(score: u8) -> Recommendation {
    match score {
        85.. => Recommendation::Buy,
        70..=84 => Recommendation::Hold,
        _ => Recommendation::Avoid,
    }
}

fn findings(listing: &Listing) -> Vec<String> {
    let mut findings = vec![format!(
        "{} rated {} in {}",
        listing.borrower, listing.credit_rating, listing.industry
    )];

    let pct_of_par = pricing::price_ratio(listing)
        .and_then(|ratio| ratio.checked_mul(rust_decimal::Decimal::ONE_HUNDRED));
    match pct_of_par {
        Some(ratio) => findings.push(format!("Offered at {ratio:.2}% of par")),
        None => findings.push("No outstanding balance to price against".into()),
    }

    match pricing::covenant_status(listing.diligence_score) {
        CovenantStatus::Pass => findings.push("All financial covenants in compliance".into()),
        CovenantStatus::Warning => {
            findings.push("Leverage covenant headroom below 15%".into())
        }
        CovenantStatus::Fail => findings.push("Covenant breach reported in last period".into()),
    }

    if listing.risk_level == RiskLevel::High {
        findings.push("Elevated default risk; position sizing review advised".into());
    }
    findings
}
