//! Re-run commands until their outputs satisfy a set of conditions.

use std::time::Duration;

use log::{debug, info};

use super::condition::{Condition, MatchMode};
use super::directive::Directive;
use super::response::Response;
use super::sgos::SgosDriver;
use crate::error::{DriverError, Error, Result};
use crate::transport::Transport;

/// Polling knobs for [`SgosDriver::poll_until`].
#[derive(Debug, Clone)]
pub struct PollOptions {
    /// How conditions combine.
    pub match_mode: MatchMode,

    /// Number of rounds. With conditions, 0 sends nothing and fails.
    pub retries: usize,

    /// Pause between rounds.
    pub interval: Duration,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            match_mode: MatchMode::All,
            retries: 10,
            interval: Duration::from_secs(1),
        }
    }
}

impl<T: Transport> SgosDriver<T> {
    /// Run `commands` until `conditions` hold, up to `options.retries`
    /// rounds.
    ///
    /// With [`MatchMode::All`], a condition that held once is not checked
    /// again. With [`MatchMode::Any`], the first condition to hold ends the
    /// poll. There is no pause after the last round. With no conditions the
    /// commands run once; with conditions and no retries nothing is sent.
    ///
    /// Returns the responses of the last round, or
    /// [`DriverError::UnsatisfiedConditions`] listing what never held.
    pub async fn poll_until(
        &mut self,
        commands: &[Directive],
        conditions: &[Condition],
        options: &PollOptions,
    ) -> Result<Vec<Response>> {
        let mut pending: Vec<&Condition> = conditions.iter().collect();
        if pending.is_empty() {
            return self.run_commands(commands).await;
        }
        if options.retries == 0 {
            return Err(unsatisfied(&pending));
        }
        let attempts = options.retries;

        let mut attempt = 0;
        loop {
            attempt += 1;
            let responses = self.run_commands(commands).await?;
            let outputs: Vec<&str> = responses.iter().map(|r| r.result.as_str()).collect();

            match options.match_mode {
                MatchMode::Any => {
                    if pending.iter().any(|c| c.evaluate(&outputs)) {
                        pending.clear();
                    }
                }
                MatchMode::All => pending.retain(|c| !c.evaluate(&outputs)),
            }

            if pending.is_empty() {
                debug!("conditions met after {} attempt(s)", attempt);
                return Ok(responses);
            }

            if attempt >= attempts {
                break;
            }

            debug!(
                "attempt {}/{}: {} condition(s) outstanding",
                attempt,
                attempts,
                pending.len()
            );
            tokio::time::sleep(options.interval).await;
        }

        info!(
            "giving up after {} attempt(s) with {} condition(s) unsatisfied",
            attempts,
            pending.len()
        );
        Err(unsatisfied(&pending))
    }
}

fn unsatisfied(pending: &[&Condition]) -> Error {
    DriverError::UnsatisfiedConditions {
        conditions: pending.iter().map(|c| c.to_string()).collect(),
    }
    .into()
}
