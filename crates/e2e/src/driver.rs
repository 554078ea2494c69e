//! Form driver capability and UI observation

use async_trait::async_trait;
use checkout_common::{FormField, Marker, MarkerCheck, PurchaseMode, Visibility};
use std::time::Duration;
use tracing::debug;

use crate::error::{E2eError, E2eResult};
use crate::wait::await_condition;

/// What a scenario needs from a rendered payment form
#[async_trait]
pub trait FormDriver: Send + Sync {
    /// Load the tour page and open the form for `mode`
    async fn open_form(&self, mode: PurchaseMode) -> E2eResult<()>;

    /// Type `value` into `field`
    async fn set_field(&self, field: FormField, value: &str) -> E2eResult<()>;

    /// Press the continue button
    async fn submit(&self) -> E2eResult<()>;

    /// Whether `marker` is visible right now
    async fn probe(&self, marker: Marker) -> E2eResult<bool>;

    /// Observation handle with the given waits
    fn observe(&self, timeouts: Timeouts) -> UiState<'_>
    where
        Self: Sized,
    {
        UiState::new(self, timeouts)
    }
}

/// Bounded waits used while observing the page
#[derive(Debug, Clone, Copy)]
pub struct Timeouts {
    /// Success and decline banners, which wait on the bank stub
    pub outcome: Duration,

    /// Client-side validation markers
    pub marker: Duration,

    /// Interval between visibility probes
    pub poll: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            outcome: Duration::from_secs(10),
            marker: Duration::from_secs(4),
            poll: Duration::from_millis(100),
        }
    }
}

impl Timeouts {
    pub fn for_marker(&self, marker: Marker) -> Duration {
        if marker.is_banner() {
            self.outcome
        } else {
            self.marker
        }
    }
}

/// Page state after submission
pub struct UiState<'a> {
    driver: &'a dyn FormDriver,
    timeouts: Timeouts,
}

impl<'a> UiState<'a> {
    pub fn new(driver: &'a dyn FormDriver, timeouts: Timeouts) -> Self {
        Self { driver, timeouts }
    }

    /// Block until `marker` is visible, within the marker's timeout
    pub async fn await_visible(&self, marker: Marker) -> E2eResult<()> {
        self.await_state(marker, Visibility::Visible).await
    }

    /// Block until `marker` is hidden, within the marker's timeout
    pub async fn await_hidden(&self, marker: Marker) -> E2eResult<()> {
        self.await_state(marker, Visibility::Hidden).await
    }

    pub async fn check(&self, check: MarkerCheck) -> E2eResult<()> {
        self.await_state(check.marker, check.visibility).await
    }

    /// Instant visibility of every marker
    pub async fn snapshot(&self) -> E2eResult<Vec<(Marker, Visibility)>> {
        let mut states = Vec::with_capacity(Marker::ALL.len());
        for marker in Marker::ALL {
            let visibility = if self.driver.probe(marker).await? {
                Visibility::Visible
            } else {
                Visibility::Hidden
            };
            states.push((marker, visibility));
        }
        Ok(states)
    }

    async fn await_state(&self, marker: Marker, expected: Visibility) -> E2eResult<()> {
        let timeout = self.timeouts.for_marker(marker);
        let want_visible = expected == Visibility::Visible;
        let driver = self.driver;

        debug!("Waiting up to {:?} for {:?} to be {:?}", timeout, marker, expected);

        let met = await_condition(
            move || async move { Ok::<_, E2eError>(driver.probe(marker).await? == want_visible) },
            timeout,
            self.timeouts.poll,
        )
        .await?;

        if met {
            Ok(())
        } else {
            Err(E2eError::UiAssertionTimeout { marker, expected, timeout })
        }
    }
}
