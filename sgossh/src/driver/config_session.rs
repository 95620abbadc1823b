//! Configuration mode tracking and batch application.
//!
//! SGOS has two states that matter: the enabled prompt (`proxy#`) and
//! configuration mode (`proxy#(config...)`), which can nest. Leaving costs
//! one `exit` per level.
//!
//! Any leftover configuration context from an earlier (possibly failed)
//! operation is drained before and after each batch:
//!
//! ```rust,no_run
//! use sgossh::{Directive, DriverBuilder};
//!
//! # async fn example() -> Result<(), sgossh::Error> {
//! let mut driver = DriverBuilder::new("proxy.example.com")
//!     .username("admin")
//!     .password("secret")
//!     .build()?;
//! driver.open().await?;
//!
//! let result = driver
//!     .apply_config(&[
//!         Directive::new("proxy-services"),
//!         Directive::new("edit HTTP"),
//!         Directive::new("exit"),
//!     ])
//!     .await?;
//! assert_eq!(result.requests.len(), result.responses.len());
//! # Ok(())
//! # }
//! ```

use log::{debug, warn};
use serde::Serialize;

use super::directive::Directive;
use super::inline::{DEFAULT_EOF_MARKER, fold_inline_blocks, opened_block};
use super::response::Response;
use super::sgos::SgosDriver;
use crate::error::{DriverError, Result};
use crate::transport::Transport;

/// Where the session currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigMode {
    /// Enabled or unprivileged prompt, outside configuration.
    Normal,

    /// Inside a configuration context, at any depth.
    Config,
}

/// Requests sent and the response recorded for each, in order.
///
/// `requests.len() == responses.len()` always holds, including for
/// directives that were recorded without being sent.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExecutionResult {
    /// Directives, after defaults and inline folding.
    pub requests: Vec<Directive>,

    /// One response per request.
    pub responses: Vec<Response>,
}

impl ExecutionResult {
    fn push(&mut self, request: Directive, response: Response) -> &Response {
        self.requests.push(request);
        self.responses.push(response);
        &self.responses[self.responses.len() - 1]
    }

    /// Number of recorded exchanges.
    pub fn len(&self) -> usize {
        self.requests.len()
    }

    /// Whether nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// Normalized output of each response.
    pub fn outputs(&self) -> Vec<&str> {
        self.responses.iter().map(|r| r.result.as_str()).collect()
    }

    /// Responses the device rejected, with their index.
    pub fn failures(&self) -> impl Iterator<Item = (usize, &Response)> {
        self.responses
            .iter()
            .enumerate()
            .filter(|(_, r)| !r.is_success())
    }
}

/// Call-level defaults for [`SgosDriver::apply_config_with`].
#[derive(Debug, Clone)]
pub struct ApplyOptions {
    /// Inline block terminator for directives that don't set one.
    pub eof_marker: String,

    /// Prompt patterns applied to every directive without its own script.
    pub prompt: Vec<String>,

    /// Answers paired with `prompt`.
    pub answer: Vec<String>,
}

impl Default for ApplyOptions {
    fn default() -> Self {
        Self {
            eof_marker: DEFAULT_EOF_MARKER.to_string(),
            prompt: Vec::new(),
            answer: Vec::new(),
        }
    }
}

impl<T: Transport> SgosDriver<T> {
    /// Probe the latest prompt for the configuration marker.
    pub fn config_mode(&self) -> Result<ConfigMode> {
        let channel = self.channel.as_ref().ok_or(DriverError::NotConnected)?;
        if self.platform.is_config_prompt(channel.current_prompt()) {
            Ok(ConfigMode::Config)
        } else {
            Ok(ConfigMode::Normal)
        }
    }

    /// Send `exit` until the prompt no longer shows configuration mode.
    ///
    /// Safe to call from either state. Gives up with
    /// [`DriverError::ConfigModeStuck`] after `max_config_depth` exits.
    pub async fn exit_config_mode(&mut self) -> Result<()> {
        let exit = Directive::new(self.platform.config_exit_command.clone());
        let mut depth = 0;

        while self.config_mode()? == ConfigMode::Config {
            if depth >= self.platform.max_config_depth {
                return Err(DriverError::ConfigModeStuck {
                    depth,
                    prompt: self.current_prompt()?,
                }
                .into());
            }
            debug!("leaving configuration level at {:?}", self.current_prompt()?);
            self.send(&exit).await?;
            depth += 1;
        }

        Ok(())
    }

    /// Drain to normal mode and enter configuration mode.
    ///
    /// The returned guard borrows the driver until [`ConfigSession::finish`]
    /// drains configuration mode again.
    pub async fn config_session(&mut self) -> Result<ConfigSession<'_, T>> {
        self.exit_config_mode().await?;

        let enter = Directive::new(self.platform.config_enter_command.clone());
        match self.send(&enter).await {
            Ok(response) => {
                if let Some(message) = response.failure_message {
                    if let Err(cleanup) = self.exit_config_mode().await {
                        warn!("config cleanup after rejected entry also failed: {}", cleanup);
                    }
                    return Err(DriverError::CommandRejected {
                        command: response.command,
                        message,
                    }
                    .into());
                }
            }
            Err(e) => {
                if let Err(cleanup) = self.exit_config_mode().await {
                    warn!("config cleanup after failed entry also failed: {}", cleanup);
                }
                return Err(e);
            }
        }

        Ok(ConfigSession {
            driver: self,
            block_marker: None,
            result: ExecutionResult::default(),
            finished: false,
        })
    }

    /// Apply directives in configuration mode with default options.
    pub async fn apply_config(&mut self, directives: &[Directive]) -> Result<ExecutionResult> {
        self.apply_config_with(directives, &ApplyOptions::default())
            .await
    }

    /// Apply directives in configuration mode.
    ///
    /// Directives are validated and inline blocks folded before anything is
    /// sent. Configuration mode is drained before entry and always drained
    /// again afterwards, even when a directive fails.
    pub async fn apply_config_with(
        &mut self,
        directives: &[Directive],
        options: &ApplyOptions,
    ) -> Result<ExecutionResult> {
        let directives = prepare(directives, options)?;

        let mut session = self.config_session().await?;
        let mut failure = None;
        for directive in &directives {
            if let Err(e) = session.apply(directive).await {
                failure = Some(e);
                break;
            }
        }

        let finished = session.finish().await;
        match failure {
            Some(e) => Err(e),
            None => finished,
        }
    }
}

/// Validate, fill in call-level defaults and fold inline blocks.
///
/// The call-level prompt/answer script is not applied to inline blocks or
/// their terminators: the device prints nothing until the block closes.
fn prepare(directives: &[Directive], options: &ApplyOptions) -> Result<Vec<Directive>> {
    let call_script = !options.prompt.is_empty() || !options.answer.is_empty();

    let mut open_marker: Option<String> = None;
    let mut prepared = Vec::with_capacity(directives.len());
    for (index, directive) in directives.iter().enumerate() {
        let mut directive = directive.clone();

        let in_block = match open_marker.as_deref() {
            Some(marker) => {
                let closes = directive.command.contains(marker);
                if closes {
                    open_marker = None;
                }
                true
            }
            None if directive.is_inline_start() => {
                open_marker = opened_block(&directive, &options.eof_marker);
                true
            }
            None => false,
        };

        if call_script {
            if directive.is_interactive() {
                return Err(DriverError::InvalidDirective {
                    index,
                    message: "prompt/answer set at both call level and directive level"
                        .to_string(),
                }
                .into());
            }
            if !in_block {
                directive.prompt = options.prompt.clone();
                directive.answer = options.answer.clone();
            }
        }

        if directive.eof_marker.is_none() {
            directive.eof_marker = Some(options.eof_marker.clone());
        }

        directive
            .compile_prompts()
            .map_err(|message| DriverError::InvalidDirective { index, message })?;

        prepared.push(directive);
    }

    fold_inline_blocks(prepared, &options.eof_marker)
}

/// Guard for an open configuration session.
///
/// Holds `&mut SgosDriver`, so nothing else can use the session meanwhile.
/// [`finish`](Self::finish) consumes the guard and drains configuration
/// mode. A guard dropped without `finish` leaves the device in
/// configuration mode until the next operation's pre-guard drains it.
pub struct ConfigSession<'a, T: Transport> {
    driver: &'a mut SgosDriver<T>,
    block_marker: Option<String>,
    result: ExecutionResult,
    finished: bool,
}

impl<T: Transport> ConfigSession<'_, T> {
    /// Send one directive inside the session and record its response.
    ///
    /// - A bare `exit` at a normal prompt is recorded, not sent.
    /// - An `inline` command turns on send-only mode until the terminator.
    /// - While a block is open, a command starting with the block's marker
    ///   is the terminator: sent without newline and read to the prompt.
    pub async fn apply(&mut self, directive: &Directive) -> Result<&Response> {
        if directive.is_exit() && self.driver.config_mode()? == ConfigMode::Normal {
            debug!("{:?} ignored, already out of config mode", directive.command);
            return Ok(self
                .result
                .push(directive.clone(), Response::ignored_exit(directive.command.as_str())));
        }

        let mut effective = directive.clone();

        let closes_block = self
            .block_marker
            .as_deref()
            .is_some_and(|marker| directive.command.starts_with(marker));

        if closes_block {
            self.block_marker = None;
            effective.send_only = false;
            effective.newline = false;
        } else {
            if self.block_marker.is_none() {
                let default = directive.eof_marker.as_deref().unwrap_or(DEFAULT_EOF_MARKER);
                self.block_marker = opened_block(directive, default);
            }
            effective.send_only = directive.send_only || self.block_marker.is_some();
        }

        let response = self.driver.send(&effective).await?;
        Ok(self.result.push(directive.clone(), response))
    }

    /// Responses recorded so far.
    pub fn result(&self) -> &ExecutionResult {
        &self.result
    }

    /// Drain configuration mode and return everything recorded.
    pub async fn finish(mut self) -> Result<ExecutionResult> {
        self.finished = true;
        self.driver.exit_config_mode().await?;
        Ok(std::mem::take(&mut self.result))
    }
}

impl<T: Transport> Drop for ConfigSession<'_, T> {
    fn drop(&mut self) {
        if !self.finished {
            warn!("ConfigSession dropped without finish(); configuration mode left open");
        }
    }
}
