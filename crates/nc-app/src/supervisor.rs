//! Session supervision.
//!
//! A control session is one [`CascadeController`] from seeding to failure.
//! Any recoverable failure throws the whole session away: after a backoff
//! delay a new link is opened and every controller is re-seeded from live
//! plant readings.

use std::convert::Infallible;
use std::thread;
use std::time::Duration;

use nc_link::PlantLink;
use serde::{Deserialize, Serialize};

use crate::cascade::{CascadeController, TickReport};
use crate::config::ControllerConfig;
use crate::error::{AppError, AppResult};

/// Backoff between control sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Delay after the first failure, in milliseconds.
    pub initial_delay_ms: u64,
    /// Upper bound for the delay, in milliseconds.
    pub max_delay_ms: u64,
    /// Growth factor per consecutive failure.
    pub backoff: f64,
    /// Give up after this many sessions. `None` retries forever.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_sessions: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_delay_ms: 1_000,
            max_delay_ms: 30_000,
            backoff: 2.0,
            max_sessions: None,
        }
    }
}

impl RetryPolicy {
    /// Delay before the next session after `failures` consecutive failures.
    pub fn delay(&self, failures: u32) -> Duration {
        let exponent = failures.saturating_sub(1).min(64) as i32;
        let ms = self.initial_delay_ms as f64 * self.backoff.powi(exponent);
        Duration::from_millis(ms.min(self.max_delay_ms as f64) as u64)
    }

    pub fn validate(&self) -> AppResult<()> {
        if !(self.backoff.is_finite() && self.backoff >= 1.0) {
            return Err(AppError::Config(
                "retry.backoff must be a finite factor of at least 1".to_string(),
            ));
        }
        if self.initial_delay_ms > self.max_delay_ms {
            return Err(AppError::Config(
                "retry.initial_delay_ms must not exceed retry.max_delay_ms".to_string(),
            ));
        }
        if self.max_sessions == Some(0) {
            return Err(AppError::Config(
                "retry.max_sessions must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Runs control sessions back to back, restarting after recoverable failures.
pub struct Supervisor<F> {
    config: ControllerConfig,
    connect: F,
}

impl<L, F> Supervisor<F>
where
    L: PlantLink,
    F: FnMut() -> L,
{
    /// `connect` opens a fresh plant link for every session.
    pub fn new(config: ControllerConfig, connect: F) -> Self {
        Self { config, connect }
    }

    /// Run until an unrecoverable error or the session limit is reached.
    ///
    /// `on_tick` sees every completed tick, in order, on the control thread.
    pub fn run(&mut self, mut on_tick: impl FnMut(&TickReport)) -> AppResult<()> {
        self.config.validate()?;
        let policy = self.config.retry.clone();
        let mut sessions = 0_u32;
        let mut failures = 0_u32;

        loop {
            sessions += 1;
            let mut ticks = 0_u64;
            let error = match self.run_session(&mut ticks, &mut on_tick) {
                Ok(never) => match never {},
                Err(error) => error,
            };

            if !error.is_recoverable() {
                tracing::error!(%error, session = sessions, "control session failed permanently");
                return Err(error);
            }
            if policy.max_sessions.is_some_and(|max| sessions >= max) {
                tracing::error!(%error, sessions, "giving up after session limit");
                return Err(error);
            }

            if ticks > 0 {
                failures = 0;
            }
            failures += 1;
            let delay = policy.delay(failures);
            tracing::warn!(
                %error,
                session = sessions,
                ticks,
                delay_ms = delay.as_millis() as u64,
                "control session ended, restarting"
            );
            thread::sleep(delay);
        }
    }

    fn run_session(
        &mut self,
        ticks: &mut u64,
        on_tick: &mut impl FnMut(&TickReport),
    ) -> AppResult<Infallible> {
        let mut link = (self.connect)();
        let probe = &self.config.variables.core_temperature;
        if let Err(error) = link.read(probe) {
            if error.is_transport() {
                tracing::info!(%error, "waiting for plant endpoint");
            }
            return Err(error.into());
        }

        let mut cascade = CascadeController::start(link, self.config.clone())?;
        loop {
            let report = cascade.tick()?;
            *ticks += 1;
            on_tick(&report);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_grows_and_caps() {
        let policy = RetryPolicy {
            initial_delay_ms: 100,
            max_delay_ms: 1_000,
            backoff: 2.0,
            max_sessions: None,
        };
        assert_eq!(policy.delay(1), Duration::from_millis(100));
        assert_eq!(policy.delay(2), Duration::from_millis(200));
        assert_eq!(policy.delay(4), Duration::from_millis(800));
        assert_eq!(policy.delay(5), Duration::from_millis(1_000));
        assert_eq!(policy.delay(500), Duration::from_millis(1_000));
    }

    #[test]
    fn fixed_delay_with_unit_backoff() {
        let policy = RetryPolicy {
            initial_delay_ms: 250,
            max_delay_ms: 250,
            backoff: 1.0,
            max_sessions: Some(3),
        };
        assert_eq!(policy.delay(1), policy.delay(7));
        assert!(policy.validate().is_ok());
    }

    #[test]
    fn invalid_policies() {
        let mut policy = RetryPolicy::default();
        policy.backoff = 0.5;
        assert!(policy.validate().is_err());

        let mut policy = RetryPolicy::default();
        policy.initial_delay_ms = 60_000;
        assert!(policy.validate().is_err());

        let mut policy = RetryPolicy::default();
        policy.max_sessions = Some(0);
        assert!(policy.validate().is_err());
    }
}
