//! Command directives: one logical unit of work sent to the device.

use regex::bytes::Regex;
use serde::{Deserialize, Serialize};

use crate::channel::compile_answer_pattern;

/// A command plus its optional interactive prompt/answer script.
///
/// Deserializes from either a bare string or a map:
///
/// ```rust
/// use sgossh::driver::Directive;
///
/// let plain: Directive = serde_json::from_str(r#""show version""#).unwrap();
/// assert_eq!(plain.command, "show version");
///
/// let scripted: Directive = serde_json::from_str(
///     r#"{"command": "restart regular", "prompt": "confirm?", "answer": "y"}"#,
/// )
/// .unwrap();
/// assert_eq!(scripted.prompt, vec!["confirm?"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "DirectiveRepr")]
pub struct Directive {
    /// Text to send.
    pub command: String,

    /// Interactive sub-prompt patterns, tried in order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub prompt: Vec<String>,

    /// Answers, `answer[i]` pairs with `prompt[i]`.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub answer: Vec<String>,

    /// Inline block terminator; falls back to the call default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eof_marker: Option<String>,

    /// Don't wait for the device prompt after sending.
    pub send_only: bool,

    /// Append a newline when sending.
    pub newline: bool,
}

impl Directive {
    /// A plain command.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            prompt: Vec::new(),
            answer: Vec::new(),
            eof_marker: None,
            send_only: false,
            newline: true,
        }
    }

    /// Add a prompt pattern and the answer to send when it appears.
    pub fn with_prompt(mut self, prompt: impl Into<String>, answer: impl Into<String>) -> Self {
        self.prompt.push(prompt.into());
        self.answer.push(answer.into());
        self
    }

    /// Set the inline block terminator.
    pub fn with_eof_marker(mut self, marker: impl Into<String>) -> Self {
        self.eof_marker = Some(marker.into());
        self
    }

    /// Don't wait for the device prompt.
    pub fn send_only(mut self) -> Self {
        self.send_only = true;
        self
    }

    /// Send without a trailing newline.
    pub fn without_newline(mut self) -> Self {
        self.newline = false;
        self
    }

    /// Whether this directive carries an interactive script.
    pub fn is_interactive(&self) -> bool {
        !self.prompt.is_empty() || !self.answer.is_empty()
    }

    /// First whitespace-separated token, lowercased.
    pub fn keyword(&self) -> String {
        self.command
            .split_whitespace()
            .next()
            .unwrap_or("")
            .to_lowercase()
    }

    /// Whether this is a bare `exit`.
    pub fn is_exit(&self) -> bool {
        self.command.trim().eq_ignore_ascii_case("exit")
    }

    /// Whether this starts an inline block.
    pub fn is_inline_start(&self) -> bool {
        self.keyword() == "inline"
    }

    /// Check prompt/answer cardinality and compile the prompt patterns.
    pub fn compile_prompts(&self) -> Result<Vec<(Regex, String)>, String> {
        if self.prompt.len() != self.answer.len() {
            return Err(format!(
                "{} prompt(s) but {} answer(s); prompt and answer must pair up",
                self.prompt.len(),
                self.answer.len()
            ));
        }

        self.prompt
            .iter()
            .zip(&self.answer)
            .map(|(prompt, answer)| {
                compile_answer_pattern(prompt)
                    .map(|regex| (regex, answer.clone()))
                    .map_err(|e| format!("invalid prompt pattern '{prompt}': {e}"))
            })
            .collect()
    }
}

impl From<&str> for Directive {
    fn from(command: &str) -> Self {
        Directive::new(command)
    }
}

impl From<String> for Directive {
    fn from(command: String) -> Self {
        Directive::new(command)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DirectiveRepr {
    Plain(String),
    Full {
        command: String,
        #[serde(default)]
        prompt: Option<OneOrMany>,
        #[serde(default)]
        answer: Option<OneOrMany>,
        #[serde(default)]
        eof_marker: Option<String>,
        #[serde(default)]
        send_only: bool,
        #[serde(default = "default_newline")]
        newline: bool,
    },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl From<OneOrMany> for Vec<String> {
    fn from(value: OneOrMany) -> Self {
        match value {
            OneOrMany::One(item) => vec![item],
            OneOrMany::Many(items) => items,
        }
    }
}

fn default_newline() -> bool {
    true
}

impl From<DirectiveRepr> for Directive {
    fn from(repr: DirectiveRepr) -> Self {
        match repr {
            DirectiveRepr::Plain(command) => Directive::new(command),
            DirectiveRepr::Full {
                command,
                prompt,
                answer,
                eof_marker,
                send_only,
                newline,
            } => Directive {
                command,
                prompt: prompt.map(Vec::from).unwrap_or_default(),
                answer: answer.map(Vec::from).unwrap_or_default(),
                eof_marker,
                send_only,
                newline,
            },
        }
    }
}
