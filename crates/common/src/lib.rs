//! Checkout Common Library
//!
//! Card data generation, the payment form's validation rules and the
//! scenario matrix shared by the checkout E2E runner.

pub mod data;
pub mod error;
pub mod rules;
pub mod scenario;
pub mod types;

// Re-export commonly used types
pub use data::{DataClass, DataGenerator, APPROVED_CARD, DECLINED_CARD};
pub use error::{Error, Result};
pub use rules::predict;
pub use scenario::{Scenario, ScenarioMatrix, ScenarioSpec};
pub use types::*;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
