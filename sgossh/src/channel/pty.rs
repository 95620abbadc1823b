//! PTY channel: a transport plus prompt-aware reads.

use std::time::Duration;

use log::{debug, trace};
use regex::bytes::Regex;

use super::buffer::PatternBuffer;
use super::patterns::{Matched, ReadMatch};
use crate::error::{ChannelError, Result};
use crate::transport::Transport;

/// High-level PTY channel for an interactive device session.
///
/// Wraps a [`Transport`] and provides pattern-based reads with a deadline.
/// The last device prompt seen is remembered so configuration mode can be
/// probed without sending anything.
#[derive(Debug)]
pub struct PtyChannel<T> {
    /// Raw byte stream to the device.
    transport: T,

    /// Pattern buffer for accumulating output.
    buffer: PatternBuffer,

    /// Pattern matching the device prompt in any mode.
    prompt_pattern: Regex,

    /// The most recent prompt matched at the end of a read.
    last_prompt: Vec<u8>,
}

impl<T: Transport> PtyChannel<T> {
    /// Create a new channel over an already-open transport.
    pub fn new(transport: T, prompt_pattern: Regex, search_depth: usize) -> Self {
        Self {
            transport,
            buffer: PatternBuffer::new(search_depth),
            prompt_pattern,
            last_prompt: Vec::new(),
        }
    }

    /// Write `input`, followed by a newline unless `newline` is false.
    pub async fn send_line(&mut self, input: &str, newline: bool) -> Result<()> {
        let mut data = Vec::with_capacity(input.len() + 1);
        data.extend_from_slice(input.as_bytes());
        if newline {
            data.push(b'\n');
        }
        self.transport.send(&data).await
    }

    /// Read until one of `patterns` (checked in order) or the device prompt
    /// matches the buffer tail.
    ///
    /// Interactive patterns win over the device prompt when both match.
    pub async fn read_until_any(&mut self, patterns: &[&Regex], timeout: Duration) -> Result<ReadMatch> {
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            if !self.buffer.is_empty() {
                if let Some(index) = patterns.iter().position(|p| self.buffer.tail_contains(p)) {
                    debug!("matched interactive pattern {}", index);
                    return Ok(ReadMatch {
                        data: self.buffer.take(),
                        matched: Matched::Pattern(index),
                    });
                }

                if let Some(m) = self.buffer.search_tail(&self.prompt_pattern) {
                    self.last_prompt = m.as_bytes().trim_ascii().to_vec();
                    trace!("matched prompt {:?}", String::from_utf8_lossy(&self.last_prompt));
                    return Ok(ReadMatch {
                        data: self.buffer.take(),
                        matched: Matched::Prompt,
                    });
                }
            }

            let chunk = match tokio::time::timeout_at(deadline, self.transport.recv()).await {
                Err(_) => return Err(ChannelError::PatternTimeout(timeout).into()),
                Ok(result) => result?.ok_or(ChannelError::Closed)?,
            };

            self.buffer.extend(&chunk);
            trace!("read {} bytes, buffer: {} bytes", chunk.len(), self.buffer.len());
        }
    }

    /// Read until the device prompt.
    pub async fn read_until_prompt(&mut self, timeout: Duration) -> Result<Vec<u8>> {
        Ok(self.read_until_any(&[], timeout).await?.data)
    }

    /// The last prompt seen at the end of a read, trimmed.
    pub fn current_prompt(&self) -> &[u8] {
        &self.last_prompt
    }

    /// The device prompt pattern.
    pub fn prompt_pattern(&self) -> &Regex {
        &self.prompt_pattern
    }

    /// Close the underlying transport.
    pub async fn close(self) -> Result<()> {
        self.transport.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::ScriptedTransport;

    fn prompt() -> Regex {
        Regex::new(r"(?m)^[\w.\-]+(?:>|#(?:\([^)\r\n]*\))?)\s*\z").unwrap()
    }

    #[test]
    fn test_reads_initial_prompt() {
        tokio_test::block_on(async {
            let mut channel = PtyChannel::new(ScriptedTransport::new("proxy"), prompt(), 1000);
            let data = channel.read_until_prompt(Duration::from_secs(1)).await.unwrap();
            assert_eq!(data, b"proxy#");
            assert_eq!(channel.current_prompt(), b"proxy#");
        });
    }

    #[test]
    fn test_prompt_tracks_config_mode() {
        tokio_test::block_on(async {
            let mut channel = PtyChannel::new(ScriptedTransport::new("proxy"), prompt(), 1000);
            channel.read_until_prompt(Duration::from_secs(1)).await.unwrap();

            channel.send_line("configure terminal", true).await.unwrap();
            channel.read_until_prompt(Duration::from_secs(1)).await.unwrap();
            assert_eq!(channel.current_prompt(), b"proxy#(config)");
        });
    }

    #[test]
    fn test_interactive_pattern_wins_over_prompt() {
        tokio_test::block_on(async {
            let transport = ScriptedTransport::new("proxy").on(
                "restart",
                crate::transport::mock::Reply::ask("Are you sure? confirm?", "restarting"),
            );
            let mut channel = PtyChannel::new(transport, prompt(), 1000);
            channel.read_until_prompt(Duration::from_secs(1)).await.unwrap();

            channel.send_line("restart", true).await.unwrap();
            let confirm = Regex::new(r"confirm\?").unwrap();
            let read = channel
                .read_until_any(&[&confirm], Duration::from_secs(1))
                .await
                .unwrap();
            assert_eq!(read.matched, Matched::Pattern(0));
            assert!(read.as_str().contains("Are you sure?"));
        });
    }

    #[test]
    fn test_closed_transport_is_an_error() {
        tokio_test::block_on(async {
            let mut channel = PtyChannel::new(ScriptedTransport::new("proxy"), prompt(), 1000);
            channel.read_until_prompt(Duration::from_secs(1)).await.unwrap();

            // Nothing was sent, so the script has nothing more to say.
            let err = channel
                .read_until_prompt(Duration::from_secs(1))
                .await
                .unwrap_err();
            assert!(err.is_connection_failure());
        });
    }
}
