//! Scenario runner against an in-process checkout that follows the form rules
//!
//! The simulated page renders whatever the rules predict for the submitted
//! input, and the simulated store records what a real backend would. Faults
//! can be switched on to check how the runner classifies failures.

use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use test_case::test_case;
use tokio::time::Instant;

use checkout_common::{
    predict, CardInput, DataGenerator, FormField, Marker, PurchaseMode, Scenario, ScenarioMatrix,
    TransactionStatus, UiOutcome,
};
use checkout_e2e::{
    E2eError, E2eResult, FailureCategory, FormDriver, OutcomeOracle, RunObserver, ScenarioPhase,
    ScenarioReport, ScenarioRunner, SuiteReport, Timeouts,
};

#[derive(Debug, Default)]
struct Store {
    statuses: HashMap<PurchaseMode, Vec<TransactionStatus>>,
    orders: u64,
    cleanups: usize,
    fail_cleanup_on: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Fault {
    None,
    /// Transaction never reaches the store
    LoseRow,
    /// Page shows this marker instead of the predicted one
    Replace(Marker),
    /// Page shows this marker next to the predicted one
    ShowAlso(Marker),
    /// Page renders no feedback at all
    Silent,
    /// Tour page cannot be loaded
    Unreachable,
}

struct Page {
    mode: Option<PurchaseMode>,
    input: CardInput,
    visible: HashSet<Marker>,
    banner_at: Option<Instant>,
}

struct SimulatedCheckout {
    today: NaiveDate,
    store: Arc<Mutex<Store>>,
    page: Mutex<Page>,
    bank_delay: Duration,
    fault: Fault,
}

impl SimulatedCheckout {
    fn new(today: NaiveDate, store: Arc<Mutex<Store>>) -> Self {
        Self {
            today,
            store,
            page: Mutex::new(Page {
                mode: None,
                input: CardInput::default(),
                visible: HashSet::new(),
                banner_at: None,
            }),
            bank_delay: Duration::from_millis(30),
            fault: Fault::None,
        }
    }

    fn with_fault(mut self, fault: Fault) -> Self {
        self.fault = fault;
        self
    }
}

fn marker_for(ui: UiOutcome) -> Marker {
    match ui {
        UiOutcome::Success => Marker::SuccessBanner,
        UiOutcome::Declined => Marker::DeclineBanner,
        UiOutcome::FieldRequired => Marker::FieldRequired,
        UiOutcome::InvalidFormat => Marker::IncorrectFormat,
        UiOutcome::ExpirationInvalid => Marker::ExpirationInvalid,
        UiOutcome::CardExpired => Marker::CardExpired,
    }
}

#[async_trait]
impl FormDriver for SimulatedCheckout {
    async fn open_form(&self, mode: PurchaseMode) -> E2eResult<()> {
        if self.fault == Fault::Unreachable {
            return Err(E2eError::Playwright("net::ERR_CONNECTION_REFUSED".to_string()));
        }
        let mut page = self.page.lock();
        page.mode = Some(mode);
        page.input = CardInput::default();
        page.visible.clear();
        page.banner_at = None;
        Ok(())
    }

    async fn set_field(&self, field: FormField, value: &str) -> E2eResult<()> {
        let mut page = self.page.lock();
        let input = std::mem::take(&mut page.input);
        page.input = input.with(field, value);
        Ok(())
    }

    async fn submit(&self) -> E2eResult<()> {
        let mut page = self.page.lock();
        let mode = page
            .mode
            .ok_or_else(|| E2eError::Playwright("form is not open".to_string()))?;
        let predicted = predict(&page.input, self.today);

        let shown = match self.fault {
            Fault::Silent => None,
            Fault::Replace(marker) => Some(marker),
            _ => Some(marker_for(predicted.ui)),
        };
        page.visible.extend(shown);
        if let Fault::ShowAlso(marker) = self.fault {
            page.visible.insert(marker);
        }
        page.banner_at = Some(Instant::now() + self.bank_delay);

        if let Some(status) = predicted.persisted.status {
            if self.fault != Fault::LoseRow {
                let mut store = self.store.lock();
                store.statuses.entry(mode).or_default().push(status);
                store.orders += 1;
            }
        }
        Ok(())
    }

    async fn probe(&self, marker: Marker) -> E2eResult<bool> {
        let page = self.page.lock();
        let settled = !marker.is_banner() || page.banner_at.is_some_and(|at| Instant::now() >= at);
        Ok(settled && page.visible.contains(&marker))
    }
}

struct MemoryOracle {
    store: Arc<Mutex<Store>>,
}

#[async_trait]
impl OutcomeOracle for MemoryOracle {
    async fn last_status(&self, mode: PurchaseMode) -> E2eResult<Option<TransactionStatus>> {
        Ok(self
            .store
            .lock()
            .statuses
            .get(&mode)
            .and_then(|rows| rows.last().copied()))
    }

    async fn persisted_count(&self) -> E2eResult<u64> {
        Ok(self.store.lock().orders)
    }

    async fn cleanup(&self) -> E2eResult<()> {
        let mut store = self.store.lock();
        store.cleanups += 1;
        if store.fail_cleanup_on == Some(store.cleanups) {
            return Err(E2eError::CleanupFailure("DELETE FROM order_entity: connection reset".to_string()));
        }
        store.statuses.clear();
        store.orders = 0;
        Ok(())
    }
}

#[derive(Default)]
struct Recorder {
    events: Arc<Mutex<Vec<String>>>,
}

impl RunObserver for Recorder {
    fn run_started(&self, total: usize) {
        self.events.lock().push(format!("run {}", total));
    }

    fn scenario_started(&self, scenario: &Scenario) {
        self.events.lock().push(format!("start {}", scenario.name));
    }

    fn scenario_finished(&self, report: &ScenarioReport) {
        self.events.lock().push(format!("finish {} {}", report.name, report.success));
    }

    fn run_finished(&self, report: &SuiteReport) {
        self.events.lock().push(format!("done {}/{}", report.passed, report.total));
    }
}

const FAST: Timeouts = Timeouts {
    outcome: Duration::from_millis(300),
    marker: Duration::from_millis(200),
    poll: Duration::from_millis(10),
};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn matrix(today: NaiveDate) -> Vec<Scenario> {
    ScenarioMatrix::standard(&mut DataGenerator::with_seed(today, 42))
}

fn first_with(scenarios: &[Scenario], ui: UiOutcome) -> Scenario {
    scenarios
        .iter()
        .find(|s| s.expected.ui == ui)
        .cloned()
        .unwrap_or_else(|| panic!("matrix has no {:?} scenario", ui))
}

fn setup(
    today: NaiveDate,
    fault: Fault,
) -> (ScenarioRunner<SimulatedCheckout, MemoryOracle>, Arc<Mutex<Store>>) {
    let store = Arc::new(Mutex::new(Store::default()));
    let driver = SimulatedCheckout::new(today, store.clone()).with_fault(fault);
    let oracle = MemoryOracle { store: store.clone() };
    (ScenarioRunner::new(driver, oracle).with_timeouts(FAST), store)
}

#[test_case(date(2026, 10, 19) ; "mid year")]
#[test_case(date(2027, 1, 3) ; "january")]
#[test_case(date(2026, 12, 31) ; "december")]
#[tokio::test]
async fn test_full_matrix_passes_against_conforming_checkout(today: NaiveDate) {
    let scenarios = matrix(today);
    let (runner, store) = setup(today, Fault::None);

    let report = runner.run_all(&scenarios).await;

    let failures: Vec<_> = report.results.iter().filter(|r| !r.success).collect();
    assert!(failures.is_empty(), "unexpected failures: {:#?}", failures);
    assert!(report.all_passed());
    assert_eq!(report.total, scenarios.len());
    assert!(report.results.iter().all(|r| r.reached == ScenarioPhase::Cleaned && r.cleaned));
    assert_eq!(store.lock().orders, 0);
}

#[tokio::test]
async fn test_store_is_empty_after_every_scenario() -> anyhow::Result<()> {
    let today = date(2026, 10, 19);
    let scenarios = matrix(today);
    let (runner, store) = setup(today, Fault::None);

    for ui in [UiOutcome::Success, UiOutcome::Declined, UiOutcome::InvalidFormat] {
        let report = runner.run_scenario(&first_with(&scenarios, ui)).await;
        assert!(report.success, "{:?}", report.error);
        assert_eq!(runner.oracle().persisted_count().await?, 0);
        assert!(store.lock().statuses.is_empty());
    }
    Ok(())
}

#[tokio::test]
async fn test_leftover_rows_are_removed_before_first_scenario() {
    let today = date(2026, 10, 19);
    let scenarios = matrix(today);
    let (runner, store) = setup(today, Fault::None);
    {
        let mut store = store.lock();
        store.orders = 3;
        store.statuses.insert(PurchaseMode::Debit, vec![TransactionStatus::Approved]);
    }

    let rejected = [first_with(&scenarios, UiOutcome::FieldRequired)];
    let report = runner.run_all(&rejected).await;

    assert!(report.all_passed(), "{:?}", report.results[0].error);
}

#[tokio::test]
async fn test_lost_transaction_is_a_persisted_state_mismatch() {
    let today = date(2026, 10, 19);
    let approved = first_with(&matrix(today), UiOutcome::Success);
    let (runner, _) = setup(today, Fault::LoseRow);

    let report = runner.run_scenario(&approved).await;

    assert!(!report.success);
    assert_eq!(report.category, Some(FailureCategory::PersistedState));
    assert_eq!(report.reached, ScenarioPhase::Observed);
    assert!(report.cleaned);
    assert!(report.error.unwrap().contains("APPROVED"));
}

#[tokio::test]
async fn test_wrong_banner_is_a_validation_mismatch() {
    let today = date(2026, 10, 19);
    let approved = first_with(&matrix(today), UiOutcome::Success);
    let (runner, _) = setup(today, Fault::Replace(Marker::DeclineBanner));

    let report = runner.run_scenario(&approved).await;

    assert_eq!(report.category, Some(FailureCategory::Validation));
    assert_eq!(report.reached, ScenarioPhase::Submitted);
    assert!(report.error.unwrap().contains("DeclineBanner"));
}

#[tokio::test]
async fn test_marker_that_should_be_hidden_is_a_validation_mismatch() {
    let today = date(2026, 10, 19);
    let required = first_with(&matrix(today), UiOutcome::FieldRequired);
    let (runner, _) = setup(today, Fault::ShowAlso(Marker::IncorrectFormat));

    let report = runner.run_scenario(&required).await;

    assert_eq!(report.category, Some(FailureCategory::Validation));
    assert!(report.error.unwrap().contains("IncorrectFormat"));
}

#[tokio::test]
async fn test_expired_and_invalid_expiration_are_told_apart() {
    let today = date(2026, 10, 19);
    let scenarios = matrix(today);
    let invalid = first_with(&scenarios, UiOutcome::ExpirationInvalid);
    let expired = first_with(&scenarios, UiOutcome::CardExpired);

    let (runner, _) = setup(today, Fault::Replace(Marker::CardExpired));
    assert!(runner.run_scenario(&expired).await.success);
    let report = runner.run_scenario(&invalid).await;
    assert_eq!(report.category, Some(FailureCategory::Validation));

    let (runner, _) = setup(today, Fault::Replace(Marker::ExpirationInvalid));
    assert!(runner.run_scenario(&invalid).await.success);
    let report = runner.run_scenario(&expired).await;
    assert_eq!(report.category, Some(FailureCategory::Validation));
}

#[tokio::test]
async fn test_silent_page_is_a_timeout() {
    let today = date(2026, 10, 19);
    let declined = first_with(&matrix(today), UiOutcome::Declined);
    let (runner, _) = setup(today, Fault::Silent);

    let started = Instant::now();
    let report = runner.run_scenario(&declined).await;

    assert_eq!(report.category, Some(FailureCategory::Timeout));
    assert!(started.elapsed() >= FAST.outcome);
    assert!(report.cleaned);
}

#[tokio::test]
async fn test_unreachable_page_stops_at_init_and_still_cleans() {
    let today = date(2026, 10, 19);
    let approved = first_with(&matrix(today), UiOutcome::Success);
    let (runner, store) = setup(today, Fault::Unreachable);

    let report = runner.run_scenario(&approved).await;

    assert_eq!(report.reached, ScenarioPhase::Init);
    assert_eq!(report.category, Some(FailureCategory::Infrastructure));
    assert!(report.cleaned);
    assert_eq!(store.lock().cleanups, 1);
}

#[tokio::test]
async fn test_cleanup_failure_aborts_the_run() {
    let today = date(2026, 10, 19);
    let scenarios = matrix(today);
    let (runner, store) = setup(today, Fault::None);
    // initial cleanup, then one after each scenario
    store.lock().fail_cleanup_on = Some(3);

    let report = runner.run_all(&scenarios).await;

    assert_eq!(report.results.len(), 2);
    assert_eq!(report.not_run, scenarios.len() - 2);
    assert!(report.aborted.is_some());
    assert!(!report.all_passed());

    let last = &report.results[1];
    assert_eq!(last.category, Some(FailureCategory::Cleanup));
    assert!(!last.cleaned);
    assert_eq!(last.reached, ScenarioPhase::Asserted);
}

#[tokio::test]
async fn test_cleanup_failure_keeps_the_scenario_failure() {
    let today = date(2026, 10, 19);
    let approved = first_with(&matrix(today), UiOutcome::Success);
    let (runner, store) = setup(today, Fault::LoseRow);
    store.lock().fail_cleanup_on = Some(1);

    let report = runner.run_scenario(&approved).await;

    assert_eq!(report.category, Some(FailureCategory::Cleanup));
    assert_eq!(report.reached, ScenarioPhase::Observed);
    assert!(!report.cleaned);
    let error = report.error.unwrap();
    assert!(error.contains("connection reset"), "{}", error);
    assert!(error.contains("scenario failed earlier"), "{}", error);
    assert!(error.contains("APPROVED"), "{}", error);
}

#[tokio::test]
async fn test_passing_scenario_reaches_cleaned() {
    let today = date(2026, 10, 19);
    let declined = first_with(&matrix(today), UiOutcome::Declined);
    let (runner, _) = setup(today, Fault::None);

    let report = runner.run_scenario(&declined).await;

    assert!(report.success);
    assert_eq!(report.reached, ScenarioPhase::Cleaned);
}

#[tokio::test]
async fn test_failed_initial_cleanup_runs_nothing() {
    let today = date(2026, 10, 19);
    let scenarios = matrix(today);
    let (runner, store) = setup(today, Fault::None);
    store.lock().fail_cleanup_on = Some(1);

    let report = runner.run_all(&scenarios).await;

    assert!(report.results.is_empty());
    assert_eq!(report.not_run, scenarios.len());
    assert!(report.aborted.unwrap().contains("connection reset"));
}

#[tokio::test]
async fn test_repeated_runs_have_identical_outcomes() {
    let today = date(2026, 10, 19);
    let scenarios = matrix(today);
    let (runner, _) = setup(today, Fault::None);

    let reports = runner.run_repeated(&scenarios, 3).await;

    assert_eq!(reports.len(), 3);
    let baseline = reports[0].outcomes();
    assert!(reports.iter().all(|r| r.outcomes() == baseline));
}

#[tokio::test]
async fn test_observers_see_every_hook_in_order() {
    let today = date(2026, 10, 19);
    let scenarios = matrix(today).into_iter().take(2).collect::<Vec<_>>();
    let store = Arc::new(Mutex::new(Store::default()));
    let recorder = Recorder::default();
    let events = recorder.events.clone();
    let runner = ScenarioRunner::new(
        SimulatedCheckout::new(today, store.clone()),
        MemoryOracle { store },
    )
    .with_timeouts(FAST)
    .with_observer(recorder);

    runner.run_all(&scenarios).await;

    let events = events.lock();
    assert_eq!(events.len(), 6);
    assert_eq!(events[0], "run 2");
    assert_eq!(events[1], format!("start {}", scenarios[0].name));
    assert_eq!(events[2], format!("finish {} true", scenarios[0].name));
    assert_eq!(events[5], "done 2/2");
}

#[tokio::test]
async fn test_bundled_yaml_scenarios_pass() -> anyhow::Result<()> {
    let today = date(2026, 10, 19);
    let dir = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("scenarios");
    let mut gen = DataGenerator::with_seed(today, 7);

    let scenarios: Vec<Scenario> = checkout_common::ScenarioSpec::load_all(&dir)?
        .iter()
        .flat_map(|spec| spec.scenarios(&mut gen))
        .collect();
    assert_eq!(scenarios.len(), 5);

    let (runner, _) = setup(today, Fault::None);
    let report = runner.run_all(&scenarios).await;
    assert!(report.all_passed(), "{:#?}", report.results);
    Ok(())
}
