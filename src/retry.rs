//! Reusable retry policy: bounded attempts with exponential backoff plus
//! random jitter. Applied explicitly at the call sites that need it rather
//! than wrapping functions implicitly.

use std::fmt::Display;
use std::time::Duration;

use rand::Rng;
use tracing::{error, warn};

use crate::config::RetryConfig;

/// Retry policy parameterized by max attempts, base delay and backoff factor.
///
/// Sleeps are synchronous and blocking; jitter of up to half the current
/// delay is added to each sleep so concurrent runs do not hammer the server
/// in lockstep.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    backoff_factor: f64,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, backoff_factor: f64) -> Self {
        Self {
            // At least one attempt, or `run` would have nothing to return.
            max_attempts: max_attempts.max(1),
            base_delay,
            backoff_factor,
        }
    }

    /// Run `op` until it succeeds or attempts are exhausted, returning the
    /// last error. `what` names the operation in log lines.
    pub fn run<T, E: Display>(
        &self,
        what: &str,
        mut op: impl FnMut() -> Result<T, E>,
    ) -> Result<T, E> {
        let mut delay = self.base_delay;

        for attempt in 1..=self.max_attempts {
            match op() {
                Ok(value) => return Ok(value),
                Err(e) if attempt == self.max_attempts => {
                    error!("{what}: all {} attempts failed: {e}", self.max_attempts);
                    return Err(e);
                }
                Err(e) => {
                    let jitter = delay.mul_f64(rand::thread_rng().gen_range(0.0..0.5));
                    warn!(
                        "{what}: attempt {attempt} failed: {e}. Retrying in {:?}",
                        delay + jitter
                    );
                    std::thread::sleep(delay + jitter);
                    delay = delay.mul_f64(self.backoff_factor);
                }
            }
        }

        unreachable!("loop returns on the final attempt")
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(cfg: &RetryConfig) -> Self {
        Self::new(cfg.max_attempts, cfg.base_delay, cfg.backoff_factor)
    }
}
