//! Prompt/answer handling for a single exchange.
//!
//! Many SGOS commands stop and ask before they act:
//! - `restart regular` asks "Are you sure you want to restart?"
//! - `clear-cache` asks for confirmation
//! - `inline` blocks read raw text until their end marker
//!
//! [`SgosDriver::send`] drives one command through any such questions,
//! answering from the directive's prompt/answer script.

use std::time::Instant;

use log::debug;
use regex::bytes::Regex;

use super::directive::Directive;
use super::response::Response;
use super::sgos::SgosDriver;
use crate::channel::Matched;
use crate::error::{DriverError, Result};
use crate::transport::Transport;

impl<T: Transport> SgosDriver<T> {
    /// Send one directive and capture its output.
    ///
    /// - The command is written, with a newline unless `newline` is false.
    /// - Each time an outstanding prompt pattern appears, its paired answer
    ///   is written and that pattern is retired. Patterns are tried in order.
    /// - With `send_only`, the call returns right after the write (or after
    ///   the first answer) without waiting for the device prompt.
    /// - Otherwise everything up to the device prompt is captured into a
    ///   single response.
    ///
    /// No configuration-mode guard is applied here. A device rejection is
    /// recorded in [`Response::failure_message`], not returned as an error.
    pub async fn send(&mut self, directive: &Directive) -> Result<Response> {
        let mut outstanding = directive
            .compile_prompts()
            .map_err(|message| DriverError::InvalidDirective { index: 0, message })?;

        let timeout = self.timeout;
        let channel = self.channel.as_mut().ok_or(DriverError::NotConnected)?;
        let start = Instant::now();

        debug!(
            "send {:?} (prompts: {}, send_only: {}, newline: {})",
            directive.command,
            outstanding.len(),
            directive.send_only,
            directive.newline
        );
        channel
            .send_line(&directive.command, directive.newline)
            .await?;

        if outstanding.is_empty() && directive.send_only {
            return Ok(Response::new(
                directive.command.as_str(),
                "",
                "",
                "",
                start.elapsed(),
            ));
        }

        let mut raw = Vec::new();
        let mut prompt_reached = false;
        loop {
            let patterns: Vec<&Regex> = outstanding.iter().map(|(pattern, _)| pattern).collect();
            let read = channel.read_until_any(&patterns, timeout).await?;
            raw.extend_from_slice(&read.data);

            match read.matched {
                Matched::Prompt => {
                    prompt_reached = true;
                    break;
                }
                Matched::Pattern(index) => {
                    let (_, answer) = outstanding.remove(index);
                    debug!("answering interactive prompt {}", index);
                    channel.send_line(&answer, true).await?;
                    if directive.send_only {
                        break;
                    }
                }
            }
        }

        let elapsed = start.elapsed();
        let raw_result = String::from_utf8_lossy(&raw).to_string();
        let prompt = if prompt_reached {
            String::from_utf8_lossy(channel.current_prompt()).to_string()
        } else {
            String::new()
        };
        let result = self
            .platform
            .normalize_output(&raw_result, &directive.command);

        if self.response_logging {
            debug!("response to {:?}: {:?}", directive.command, result);
        } else {
            debug!(
                "response to {:?}: {} bytes in {:?}",
                directive.command,
                result.len(),
                elapsed
            );
        }

        if let Some(failure) = self.platform.detect_failure(&result) {
            debug!("command {:?} rejected: {}", directive.command, failure);
            return Ok(Response::failed(
                directive.command.as_str(),
                result,
                raw_result,
                prompt,
                elapsed,
                failure,
            ));
        }

        Ok(Response::new(
            directive.command.as_str(),
            result,
            raw_result,
            prompt,
            elapsed,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::sgos;
    use crate::transport::mock::{Reply, ScriptedTransport};

    async fn driver(transport: ScriptedTransport) -> SgosDriver<ScriptedTransport> {
        SgosDriver::with_transport(sgos::platform(), transport)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_prompt_answer_round_trip() {
        let transport = ScriptedTransport::new("proxy")
            .on("restart regular", Reply::ask("confirm?", "Restarting system"));
        let writes = transport.writes();
        let mut driver = driver(transport).await;

        let directive = Directive::new("restart regular").with_prompt("confirm?", "yes");
        let response = driver.send(&directive).await.unwrap();

        assert_eq!(*writes.lock().unwrap(), vec!["restart regular\n", "yes\n"]);
        assert!(response.raw_result.contains("confirm?"));
        assert!(response.raw_result.contains("Restarting system"));
        assert!(response.result.contains("confirm?"));
        assert!(response.result.ends_with("Restarting system"));
        assert_eq!(response.prompt, "proxy#");
    }

    #[tokio::test]
    async fn test_prompts_tried_in_order() {
        let transport = ScriptedTransport::new("proxy")
            .on("clear-cache", Reply::ask("Really clear? [y/n]", "Cache cleared"));
        let writes = transport.writes();
        let mut driver = driver(transport).await;

        let directive = Directive::new("clear-cache")
            .with_prompt(r"\[y/n\]", "y")
            .with_prompt(r"clear\?", "n");
        driver.send(&directive).await.unwrap();

        assert_eq!(*writes.lock().unwrap(), vec!["clear-cache\n", "y\n"]);
    }

    #[tokio::test]
    async fn test_unused_prompt_does_not_block() {
        let transport =
            ScriptedTransport::new("proxy").on("show clock", Reply::output("12:00:00 UTC"));
        let mut driver = driver(transport).await;

        let directive = Directive::new("show clock").with_prompt("confirm?", "y");
        let response = driver.send(&directive).await.unwrap();
        assert_eq!(response.result, "12:00:00 UTC");
    }

    #[tokio::test]
    async fn test_send_only_does_not_read() {
        let transport = ScriptedTransport::new("proxy");
        let writes = transport.writes();
        let mut driver = driver(transport).await;

        let response = driver
            .send(&Directive::new("inline policy local EOF").send_only())
            .await
            .unwrap();
        assert_eq!(response.result, "");
        assert_eq!(response.prompt, "");
        assert_eq!(*writes.lock().unwrap(), vec!["inline policy local EOF\n"]);
    }

    #[tokio::test]
    async fn test_send_only_with_prompt_returns_after_answer() {
        let transport = ScriptedTransport::new("proxy")
            .on("restart regular", Reply::ask("confirm?", "Restarting system"));
        let writes = transport.writes();
        let mut driver = driver(transport).await;

        let directive = Directive::new("restart regular")
            .with_prompt("confirm?", "yes")
            .send_only();
        let response = driver.send(&directive).await.unwrap();

        assert_eq!(*writes.lock().unwrap(), vec!["restart regular\n", "yes\n"]);
        assert_eq!(response.prompt, "");
        assert!(!response.result.contains("Restarting"));
    }

    #[tokio::test]
    async fn test_without_newline() {
        let transport = ScriptedTransport::new("proxy");
        let writes = transport.writes();
        let mut driver = driver(transport).await;

        driver
            .send(&Directive::new("show clock").without_newline())
            .await
            .unwrap();
        assert_eq!(*writes.lock().unwrap(), vec!["show clock"]);
    }

    #[tokio::test]
    async fn test_invalid_directive_sends_nothing() {
        let transport = ScriptedTransport::new("proxy");
        let writes = transport.writes();
        let mut driver = driver(transport).await;

        let mut directive = Directive::new("restart regular");
        directive.prompt.push("confirm?".to_string());

        let err = driver.send(&directive).await.unwrap_err();
        assert!(matches!(
            err,
            crate::Error::Driver(DriverError::InvalidDirective { .. })
        ));
        assert!(writes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rejection_is_recorded_not_raised() {
        let transport = ScriptedTransport::new("proxy")
            .on("bogus", Reply::output("% Invalid input detected at '^' marker."));
        let mut driver = driver(transport).await;

        let response = driver.send(&Directive::new("bogus")).await.unwrap();
        assert!(!response.is_success());
        assert_eq!(response.failure_message.as_deref(), Some("% Invalid"));
    }
}
