//! In-memory transport that plays an SGOS appliance for tests.
//!
//! Every write is recorded. Replies come from prefix rules, then from a
//! small built-in model of the device: `configure terminal`, `exit`,
//! `enable` and `inline ... <marker>` blocks.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use super::Transport;
use crate::error::Result;

/// Scripted reply to a command.
#[derive(Debug, Clone)]
pub(crate) enum Reply {
    /// Print output, then the prompt.
    Output(String),

    /// Print a question and wait for one more line before printing
    /// `then` and the prompt.
    Ask { question: String, then: String },

    /// Print output and descend one configuration level.
    Enter(String),
}

impl Reply {
    pub(crate) fn output(text: &str) -> Self {
        Reply::Output(text.to_string())
    }

    pub(crate) fn ask(question: &str, then: &str) -> Self {
        Reply::Ask {
            question: question.to_string(),
            then: then.to_string(),
        }
    }

    pub(crate) fn enter(text: &str) -> Self {
        Reply::Enter(text.to_string())
    }
}

enum Awaiting {
    Answer { then: String },
    Inline { marker: String },
    EnableSecret,
}

pub(crate) struct ScriptedTransport {
    hostname: String,
    depth: usize,
    enabled: bool,
    enable_secret: Option<String>,
    rules: Vec<(String, Reply)>,
    pending: VecDeque<Vec<u8>>,
    awaiting: Option<Awaiting>,
    started: bool,
    writes: Arc<Mutex<Vec<String>>>,
}

impl ScriptedTransport {
    /// An enabled appliance sitting at `<hostname>#`.
    pub(crate) fn new(hostname: &str) -> Self {
        Self {
            hostname: hostname.to_string(),
            depth: 0,
            enabled: true,
            enable_secret: None,
            rules: Vec::new(),
            pending: VecDeque::new(),
            awaiting: None,
            started: false,
            writes: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Start at `<hostname>>`; `enable` succeeds with `secret`.
    pub(crate) fn unprivileged(mut self, secret: &str) -> Self {
        self.enabled = false;
        self.enable_secret = Some(secret.to_string());
        self
    }

    /// Start `depth` levels deep in configuration mode.
    pub(crate) fn in_config(mut self, depth: usize) -> Self {
        self.depth = depth;
        self
    }

    /// Reply to any line starting with `prefix`. Rules are checked in order
    /// and before the built-in behaviour.
    pub(crate) fn on(mut self, prefix: &str, reply: Reply) -> Self {
        self.rules.push((prefix.to_string(), reply));
        self
    }

    /// Shared log of every write, kept by tests after the transport moves.
    pub(crate) fn writes(&self) -> Arc<Mutex<Vec<String>>> {
        self.writes.clone()
    }

    fn prompt(&self) -> String {
        let mark = if self.enabled { "#" } else { ">" };
        match self.depth {
            0 => format!("{}{}", self.hostname, mark),
            1 => format!("{}{}(config)", self.hostname, mark),
            n => format!("{}{}(config level{})", self.hostname, mark, n),
        }
    }

    fn respond(&mut self, echo: &str, output: &str) {
        let mut text = format!("{}\r\n", echo);
        if !output.is_empty() {
            text.push_str(&output.replace('\n', "\r\n"));
            text.push_str("\r\n");
        }
        text.push_str(&self.prompt());
        self.pending.push_back(text.into_bytes());
    }

    fn handle(&mut self, text: &str) {
        let line = text.strip_suffix('\n').unwrap_or(text);

        match self.awaiting.take() {
            Some(Awaiting::Answer { then }) => {
                self.respond(line, &then);
                return;
            }
            Some(Awaiting::Inline { marker }) => {
                if line.contains(&marker) {
                    let closing = format!("{}\r\nok\r\n{}", line, self.prompt());
                    self.pending.push_back(closing.into_bytes());
                } else {
                    self.awaiting = Some(Awaiting::Inline { marker });
                }
                return;
            }
            Some(Awaiting::EnableSecret) => {
                if self.enable_secret.as_deref() == Some(line) {
                    self.enabled = true;
                    let prompt = format!("\r\n{}", self.prompt());
                    self.pending.push_back(prompt.into_bytes());
                } else {
                    let denied = format!("\r\n% Bad password\r\n{}", self.prompt());
                    self.pending.push_back(denied.into_bytes());
                }
                return;
            }
            None => {}
        }

        if let Some((_, reply)) = self
            .rules
            .iter()
            .find(|(prefix, _)| line.starts_with(prefix.as_str()))
        {
            match reply.clone() {
                Reply::Output(output) => self.respond(line, &output),
                Reply::Ask { question, then } => {
                    self.pending
                        .push_back(format!("{}\r\n{}", line, question).into_bytes());
                    self.awaiting = Some(Awaiting::Answer { then });
                }
                Reply::Enter(output) => {
                    self.depth += 1;
                    self.respond(line, &output);
                }
            }
            return;
        }

        let first = line.lines().next().unwrap_or("").trim();
        let lower = first.to_lowercase();

        if lower.starts_with("inline") {
            let marker = first.split_whitespace().last().unwrap_or("_EOF").to_string();
            self.awaiting = Some(Awaiting::Inline { marker });
        } else if lower == "configure terminal" {
            if self.depth == 0 {
                self.depth = 1;
            }
            self.respond(line, "");
        } else if lower == "exit" {
            self.depth = self.depth.saturating_sub(1);
            self.respond(line, "");
        } else if lower == "enable" && !self.enabled {
            self.pending
                .push_back(format!("{}\r\nEnable Password:", line).into_bytes());
            self.awaiting = Some(Awaiting::EnableSecret);
        } else {
            self.respond(line, "");
        }
    }
}

impl Transport for ScriptedTransport {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        let text = String::from_utf8_lossy(data).to_string();
        if let Ok(mut writes) = self.writes.lock() {
            writes.push(text.clone());
        }
        self.handle(&text);
        Ok(())
    }

    async fn recv(&mut self) -> Result<Option<Vec<u8>>> {
        if !self.started {
            self.started = true;
            self.pending.push_front(self.prompt().into_bytes());
        }
        Ok(self.pending.pop_front())
    }

    async fn close(self) -> Result<()> {
        Ok(())
    }
}
