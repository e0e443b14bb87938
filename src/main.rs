use std::sync::Arc;

use rust_decimal_macros::dec;
use tokio::sync::Mutex;
use tracing::error;

use loan_market_ledger::catalog::{Catalog, ListingFilter, ListingSort};
use loan_market_ledger::configuration::{get_configuration, Config};
use loan_market_ledger::diligence::DueDiligenceGenerator;
use loan_market_ledger::error::Error;
use loan_market_ledger::ledger::{Ledger, TradeOutcome};
use loan_market_ledger::orders::{mock_orders, OrderBook};
use loan_market_ledger::persistence::{JsonFileStore, MemoryStore, Persistence};
use loan_market_ledger::settlement::{
    Route, Router, SettlementConfig, SettlementWorkflow, TimedSteps,
};
use loan_market_ledger::snapshot;
use loan_market_ledger::types::RiskLevel;

type Store = Box<dyn Persistence + Send>;

struct ConsoleRouter;

impl Router for ConsoleRouter {
    fn navigate(&self, route: Route) {
        println!("    -> navigate to {route:?}");
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let result = app_main().await;

    if let Err(err) = &result {
        error!("{}", err);
    }

    result
}

async fn app_main() -> Result<(), Error> {
    let config = get_configuration()?;

    let subscriber = tracing_subscriber::fmt()
        .compact()
        .with_level(true)
        .with_max_level(config.log_level)
        .with_file(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    println!("=== Secondary Loan Market Ledger Demo ===\n");

    let catalog = match &config.catalog_path {
        Some(path) => Catalog::load(path)?,
        None => Catalog::default_listings(),
    };

    let store: Store = match &config.storage_dir {
        Some(dir) => Box::new(JsonFileStore::new(dir, &config.namespace)),
        None => Box::new(MemoryStore::new(config.namespace.clone())),
    };

    let mut ledger = Ledger::open(store, &catalog, mock_orders(), config.initial_cash_balance)?;
    if config.reset_on_start {
        ledger.reset_market()?;
    }

    print_catalog(&catalog);

    // ─── Scenario 1: Single purchase ──────────────────────────────────────

    println!("--- Scenario 1: Buy 5,000,000 of LST-001 at 99% of par ---\n");
    let result = ledger.buy_loan("LST-001", dec!(5000000));
    print_outcome(&TradeOutcome::from(&result));
    print_portfolio(&ledger);

    // ─── Scenario 2: Accumulating into one position ───────────────────────

    println!("--- Scenario 2: Buy LST-002 twice (2,000,000 then 3,000,000) ---\n");
    for amount in [dec!(2000000), dec!(3000000)] {
        let result = ledger.buy_loan("LST-002", amount);
        print_outcome(&TradeOutcome::from(&result));
    }
    print_portfolio(&ledger);

    // ─── Scenario 3: Rejections ───────────────────────────────────────────

    println!("--- Scenario 3: Rejected trades leave the ledger untouched ---\n");
    let too_much = ledger.cash_balance() + dec!(1);
    print_outcome(&TradeOutcome::from(&ledger.buy_loan("LST-003", too_much)));
    print_outcome(&TradeOutcome::from(&ledger.buy_loan("LST-999", dec!(1000))));
    if let Err(e) = ledger.sell_loan("LST-001", dec!(1000000)) {
        println!("    sell_loan: {e}\n");
    }

    // ─── Scenario 4: Settlement workflow ──────────────────────────────────

    println!("--- Scenario 4: Staged settlement of LST-003 ---\n");
    let ledger = Arc::new(Mutex::new(ledger));
    let mut workflow = SettlementWorkflow::new(
        Arc::clone(&ledger),
        TimedSteps {
            delay: config.stage_delay,
        },
        ConsoleRouter,
        SettlementConfig {
            step_timeout: config.step_timeout,
        },
    );
    match workflow.execute("LST-003", dec!(10000000)).await {
        Ok(receipt) => println!("    Settled: cost {} (seq {})", receipt.cost, receipt.sequence),
        Err(e) => println!("    Settlement failed: {e}"),
    }
    let stages: Vec<String> = workflow.history().iter().map(|s| s.to_string()).collect();
    println!("    Stages: {}\n", stages.join(" -> "));

    // ─── Scenario 5: Due diligence ────────────────────────────────────────

    println!("--- Scenario 5: Due-diligence report for LST-004 ---\n");
    if let Some(listing) = catalog.get("LST-004") {
        let generator = DueDiligenceGenerator::new(config.diligence_stage_delay);
        let report = generator.generate(listing).await;
        for category in &report.categories {
            println!("    {:<24} {}", category.stage.to_string(), category.score);
        }
        println!(
            "    Overall {} / covenant {} / {:?}",
            report.overall_score, report.covenant_status, report.recommendation
        );
        for finding in &report.findings {
            println!("    - {finding}");
        }
        println!();
    }

    // ─── Summary ──────────────────────────────────────────────────────────

    let ledger = ledger.lock().await;
    print_portfolio(&*ledger);
    print_orders(&ledger.state().orders);
    print_summary(&config, &*ledger);

    println!("\n--- Event Log ({} events) ---\n", ledger.event_log().len());
    for event in ledger.event_log() {
        println!("  {}", serde_json::to_string(event)?);
    }

    Ok(())
}

fn print_catalog(catalog: &Catalog) {
    println!("  Listings by yield:");
    for listing in catalog.sorted_by(ListingSort::Yield) {
        println!(
            "    {} {:<32} ask {:>12} / out {:>12}  ytm {}%  score {}",
            listing.id,
            listing.borrower,
            listing.asking_price,
            listing.outstanding_amount,
            listing.yield_to_maturity,
            listing.diligence_score
        );
    }
    let low_risk = catalog.filter(&ListingFilter {
        risk_level: Some(RiskLevel::Low),
        ..Default::default()
    });
    println!("  Low-risk listings: {}\n", low_risk.len());
}

fn print_outcome(outcome: &TradeOutcome) {
    match &outcome.message {
        None => println!("    success"),
        Some(message) => println!("    rejected: {message}"),
    }
}

fn print_portfolio<P: Persistence>(ledger: &Ledger<P>) {
    println!("\n    Cash: {}", ledger.cash_balance());
    for position in ledger.state().portfolio.values() {
        println!(
            "    Position {}: amount={} cost={} value={} covenant={} signal={}",
            position.listing_id,
            position.current_amount,
            position.purchase_price,
            position.current_value,
            position.covenant_status,
            position.trade_risk_signal
        );
    }
    println!();
}

fn print_orders(orders: &[loan_market_ledger::types::Order]) {
    let book = OrderBook::new(orders);
    println!("    Open orders:");
    for order in book.open() {
        println!(
            "      {} {:?} {} of {} @ {} ({:?})",
            order.id, order.side, order.amount, order.listing_id, order.price, order.status
        );
    }
    println!();
}

fn print_summary<P: Persistence>(config: &Config, ledger: &Ledger<P>) {
    let last = ledger.event_log().last().map(|e| e.sequence).unwrap_or(0);
    let snap = snapshot::capture(ledger.state(), last);
    println!("--- Portfolio Summary ---\n");
    println!("    Starting cash:  {}", config.initial_cash_balance);
    println!("    Cash:           {}", snap.cash_balance);
    println!("    Holdings:       {}", snap.total_holdings);
    println!("    Cost basis:     {}", snap.total_cost);
    println!("    Market value:   {}", snap.total_value);
    println!(
        "    Unrealized:     {} ({}%)",
        snap.unrealized_pnl,
        snap.unrealized_pnl_pct.round_dp(2)
    );
    println!("    Positions:      {}", snap.position_count());
    for (status, count) in &snap.covenant_breakdown {
        println!("      {status}: {count}");
    }
    println!(
        "    Notifications:  {} unread",
        ledger.state().unread_notifications().count()
    );
}
