//! Checkout E2E Test Framework
//!
//! This crate drives the tour purchase form end to end:
//! - Optionally spawns the application and waits until it serves the page
//! - Controls a browser through a persistent Playwright bridge
//! - Reads the transaction store to confirm what a submission persisted
//! - Runs every scenario through a fixed lifecycle and always cleans up
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 Checkout E2E Runner (Rust)                  │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ScenarioRunner<D: FormDriver, O: OutcomeOracle>            │
//! │    ├── run_all(scenarios) -> SuiteReport                    │
//! │    ├── run_repeated(scenarios, times) -> [SuiteReport]      │
//! │    └── run_scenario(scenario) -> ScenarioReport             │
//! │          INIT → FORM_OPENED → FIELDS_SET → SUBMITTED        │
//! │               → OBSERVED → ASSERTED → CLEANED               │
//! ├─────────────────────────────────────────────────────────────┤
//! │  FormDriver                     OutcomeOracle               │
//! │    ├── open_form(mode)            ├── last_status(mode)     │
//! │    ├── set_field(field, value)    ├── persisted_count()     │
//! │    ├── submit()                   └── cleanup()             │
//! │    └── observe() -> UiState                                 │
//! │          await_visible / await_hidden (bounded)             │
//! ├─────────────────────────────────────────────────────────────┤
//! │  PlaywrightForm (node bridge)   SqlOracle (sqlx AnyPool)    │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod cli;
pub mod driver;
pub mod error;
pub mod observer;
pub mod oracle;
pub mod page;
pub mod playwright;
pub mod runner;
pub mod sut;
pub mod wait;

pub use driver::{FormDriver, Timeouts, UiState};
pub use error::{E2eError, E2eResult, FailureCategory};
pub use observer::{RunObserver, TracingObserver};
pub use oracle::{OutcomeOracle, SqlOracle};
pub use playwright::{PlaywrightConfig, PlaywrightForm};
pub use runner::{RunnerConfig, ScenarioPhase, ScenarioReport, ScenarioRunner, SuiteReport};
pub use sut::{SutConfig, SutHandle};
pub use wait::await_condition;
