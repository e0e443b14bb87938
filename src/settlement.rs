use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::{watch, Mutex};
use tokio::time::{sleep, timeout};
use tracing::{info, warn};

use crate::error::SettlementError;
use crate::ledger::{Ledger, PurchaseReceipt};
use crate::persistence::Persistence;
use crate::types::NotificationKind;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Input,
    Compliance,
    SmartContract,
    Settlement,
    Complete,
}

impl Stage {
    /// Stages in which a cancel request is honoured. Once settlement starts the
    /// ledger call is in flight and the trade must run to an outcome.
    pub fn is_cancellable(self) -> bool {
        matches!(self, Stage::Input | Stage::Compliance | Stage::SmartContract)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Input => "input",
            Stage::Compliance => "compliance",
            Stage::SmartContract => "smart_contract",
            Stage::Settlement => "settlement",
            Stage::Complete => "complete",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Portfolio,
}

/// Navigation collaborator asked to move on once a trade completes.
pub trait Router: Send + Sync {
    fn navigate(&self, route: Route);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopRouter;

impl Router for NoopRouter {
    fn navigate(&self, _route: Route) {}
}

/// The external work behind each stage. An `Err` carries a reason and sends
/// the workflow back to input.
pub trait SettlementSteps: Send + Sync {
    fn compliance_check(
        &self,
        listing_id: &str,
        amount: Decimal,
    ) -> impl Future<Output = Result<(), String>> + Send;

    fn escrow(
        &self,
        listing_id: &str,
        amount: Decimal,
    ) -> impl Future<Output = Result<(), String>> + Send;

    fn transfer(
        &self,
        listing_id: &str,
        amount: Decimal,
    ) -> impl Future<Output = Result<(), String>> + Send;
}

/// Steps that only wait, reproducing the dashboard's fixed 1.5 s cadence.
#[derive(Debug, Clone, Copy)]
pub struct TimedSteps {
    pub delay: Duration,
}

impl Default for TimedSteps {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(1500),
        }
    }
}

impl SettlementSteps for TimedSteps {
    async fn compliance_check(&self, _listing_id: &str, _amount: Decimal) -> Result<(), String> {
        sleep(self.delay).await;
        Ok(())
    }

    async fn escrow(&self, _listing_id: &str, _amount: Decimal) -> Result<(), String> {
        sleep(self.delay).await;
        Ok(())
    }

    async fn transfer(&self, _listing_id: &str, _amount: Decimal) -> Result<(), String> {
        sleep(self.delay).await;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SettlementConfig {
    pub step_timeout: Duration,
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self {
            step_timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub stage: Stage,
    pub cancelled: bool,
}

/// Cheap handle for observing and cancelling a workflow from elsewhere.
#[derive(Debug, Clone)]
pub struct SettlementHandle {
    control: Arc<watch::Sender<Progress>>,
}

impl SettlementHandle {
    pub fn stage(&self) -> Stage {
        self.control.borrow().stage
    }

    pub fn subscribe(&self) -> watch::Receiver<Progress> {
        self.control.subscribe()
    }

    /// Request cancellation. Refused once settlement has started.
    pub fn cancel(&self) -> Result<(), SettlementError> {
        let mut refused = None;
        self.control.send_if_modified(|progress| {
            if !progress.stage.is_cancellable() {
                refused = Some(progress.stage);
                return false;
            }
            let changed = !progress.cancelled;
            progress.cancelled = true;
            changed
        });
        match refused {
            Some(stage) => Err(SettlementError::NotCancellable(stage)),
            None => Ok(()),
        }
    }
}

/// Amount entry check, run before any stage starts.
pub fn validate_amount(amount: Decimal) -> Result<(), SettlementError> {
    if amount <= Decimal::ZERO {
        return Err(SettlementError::InvalidAmount(amount));
    }
    Ok(())
}

/// One trade dialog: `input → compliance → smart_contract → settlement`, then
/// `complete` on success or back to `input` on any failure.
pub struct SettlementWorkflow<P, S, R>
where
    P: Persistence,
    S: SettlementSteps,
    R: Router,
{
    ledger: Arc<Mutex<Ledger<P>>>,
    steps: S,
    router: R,
    config: SettlementConfig,
    control: Arc<watch::Sender<Progress>>,
    history: Vec<Stage>,
}

impl<P, S, R> SettlementWorkflow<P, S, R>
where
    P: Persistence + Send,
    S: SettlementSteps,
    R: Router,
{
    pub fn new(ledger: Arc<Mutex<Ledger<P>>>, steps: S, router: R, config: SettlementConfig) -> Self {
        let (control, _) = watch::channel(Progress {
            stage: Stage::Input,
            cancelled: false,
        });
        Self {
            ledger,
            steps,
            router,
            config,
            control: Arc::new(control),
            history: vec![Stage::Input],
        }
    }

    pub fn handle(&self) -> SettlementHandle {
        SettlementHandle {
            control: Arc::clone(&self.control),
        }
    }

    pub fn stage(&self) -> Stage {
        self.control.borrow().stage
    }

    /// Every stage entered so far, starting with `input`.
    pub fn history(&self) -> &[Stage] {
        &self.history
    }

    /// Run the trade. Validation failures never leave `input`; every other
    /// failure returns there after surfacing an error notification.
    pub async fn execute(
        &mut self,
        listing_id: &str,
        amount: Decimal,
    ) -> Result<PurchaseReceipt, SettlementError> {
        let current = *self.control.borrow();
        if current.stage == Stage::Complete {
            return Err(SettlementError::AlreadyCompleted);
        }
        if current.cancelled {
            return Err(SettlementError::Cancelled(current.stage));
        }
        if let Err(e) = validate_amount(amount) {
            self.surface_error(&e).await;
            return Err(e);
        }

        match self.run(listing_id, amount).await {
            Ok(receipt) => {
                self.enter(Stage::Complete);
                info!(listing_id, %amount, "settlement complete");
                self.router.navigate(Route::Portfolio);
                Ok(receipt)
            }
            Err(e) => {
                warn!(listing_id, %amount, "settlement failed: {e}");
                self.enter(Stage::Input);
                self.surface_error(&e).await;
                Err(e)
            }
        }
    }

    async fn run(
        &mut self,
        listing_id: &str,
        amount: Decimal,
    ) -> Result<PurchaseReceipt, SettlementError> {
        self.enter(Stage::Compliance);
        let step = self.steps.compliance_check(listing_id, amount);
        Self::bounded(&self.control, self.config.step_timeout, Stage::Compliance, step).await?;

        self.enter(Stage::SmartContract);
        let step = self.steps.escrow(listing_id, amount);
        Self::bounded(&self.control, self.config.step_timeout, Stage::SmartContract, step).await?;

        self.enter_settlement()?;
        let step = self.steps.transfer(listing_id, amount);
        Self::bounded(&self.control, self.config.step_timeout, Stage::Settlement, step).await?;

        let mut ledger = self.ledger.lock().await;
        Ok(ledger.buy_loan(listing_id, amount)?)
    }

    /// Bound a step by the configured timeout and, in cancellable stages, by a
    /// cancel request.
    async fn bounded(
        control: &watch::Sender<Progress>,
        step_timeout: Duration,
        stage: Stage,
        step: impl Future<Output = Result<(), String>>,
    ) -> Result<(), SettlementError> {
        let mut cancel = control.subscribe();
        let cancellable = stage.is_cancellable();

        tokio::select! {
            outcome = timeout(step_timeout, step) => match outcome {
                Ok(Ok(())) => Ok(()),
                Ok(Err(reason)) => Err(SettlementError::StepFailed { stage, reason }),
                Err(_) => Err(SettlementError::StepTimedOut(stage)),
            },
            _ = cancel.wait_for(|p| p.cancelled), if cancellable => {
                Err(SettlementError::Cancelled(stage))
            }
        }
    }

    fn enter(&mut self, stage: Stage) {
        self.control.send_modify(|p| p.stage = stage);
        self.history.push(stage);
        info!(%stage, "settlement stage entered");
    }

    /// Entering settlement and checking for a late cancel happen atomically.
    fn enter_settlement(&mut self) -> Result<(), SettlementError> {
        let mut entered = false;
        self.control.send_if_modified(|p| {
            if p.cancelled {
                return false;
            }
            p.stage = Stage::Settlement;
            entered = true;
            true
        });
        if !entered {
            return Err(SettlementError::Cancelled(Stage::SmartContract));
        }
        self.history.push(Stage::Settlement);
        info!(stage = %Stage::Settlement, "settlement stage entered");
        Ok(())
    }

    async fn surface_error(&self, error: &SettlementError) {
        let mut ledger = self.ledger.lock().await;
        if let Err(e) = ledger.notify(NotificationKind::Error, "Trade failed", error.to_string()) {
            warn!("could not record trade failure notification: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::persistence::MemoryStore;
    use rust_decimal_macros::dec;
    use std::sync::Mutex as StdMutex;

    #[derive(Default)]
    struct RecordingRouter {
        routes: StdMutex<Vec<Route>>,
    }

    impl Router for Arc<RecordingRouter> {
        fn navigate(&self, route: Route) {
            self.routes.lock().unwrap().push(route);
        }
    }

    fn shared_ledger(cash: Decimal) -> Arc<Mutex<Ledger<MemoryStore>>> {
        let ledger = Ledger::open(
            MemoryStore::default(),
            &Catalog::default_listings(),
            Vec::new(),
            cash,
        )
        .unwrap();
        Arc::new(Mutex::new(ledger))
    }

    #[test]
    fn stage_names() {
        assert_eq!(Stage::SmartContract.to_string(), "smart_contract");
        assert!(Stage::Compliance.is_cancellable());
        assert!(!Stage::Settlement.is_cancellable());
        assert!(!Stage::Complete.is_cancellable());
    }

    #[tokio::test(start_paused = true)]
    async fn completes_and_navigates() {
        let ledger = shared_ledger(dec!(1000000));
        let router = Arc::new(RecordingRouter::default());
        let mut workflow = SettlementWorkflow::new(
            Arc::clone(&ledger),
            TimedSteps::default(),
            Arc::clone(&router),
            SettlementConfig::default(),
        );

        let receipt = workflow.execute("LST-001", dec!(100000)).await.unwrap();
        assert_eq!(receipt.cost, dec!(99000));
        assert_eq!(workflow.stage(), Stage::Complete);
        assert_eq!(*router.routes.lock().unwrap(), vec![Route::Portfolio]);

        assert!(matches!(
            workflow.execute("LST-001", dec!(1)).await,
            Err(SettlementError::AlreadyCompleted)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_amount_never_leaves_input() {
        let ledger = shared_ledger(dec!(1000));
        let mut workflow =
            SettlementWorkflow::new(Arc::clone(&ledger), TimedSteps::default(), NoopRouter, SettlementConfig::default());

        assert!(matches!(
            workflow.execute("LST-001", dec!(0)).await,
            Err(SettlementError::InvalidAmount(_))
        ));
        assert_eq!(workflow.history(), &[Stage::Input]);

        let ledger = ledger.lock().await;
        assert_eq!(ledger.state().notifications[0].kind, NotificationKind::Error);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_in_input_closes_the_dialog() {
        let ledger = shared_ledger(dec!(1000));
        let mut workflow =
            SettlementWorkflow::new(ledger, TimedSteps::default(), NoopRouter, SettlementConfig::default());

        workflow.handle().cancel().unwrap();
        assert!(matches!(
            workflow.execute("LST-001", dec!(10)).await,
            Err(SettlementError::Cancelled(Stage::Input))
        ));
        assert_eq!(workflow.history(), &[Stage::Input]);
    }
}
