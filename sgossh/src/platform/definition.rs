//! Platform definition: everything dialect-specific about the device CLI.

use regex::bytes::Regex;

use crate::channel::{compile_prompt_pattern, contains_literal};
use crate::error::{PlatformError, Result};

/// Platform definition containing the CLI dialect of a device family.
#[derive(Debug, Clone)]
pub struct PlatformDefinition {
    /// Platform name (e.g., "sgos").
    pub name: String,

    /// Pattern matching the prompt in every mode, anchored at the end.
    pub prompt_pattern: Regex,

    /// Substring of the prompt that marks configuration mode.
    pub config_marker: String,

    /// Command that enters configuration mode.
    pub config_enter_command: String,

    /// Command that leaves one configuration level.
    pub config_exit_command: String,

    /// Maximum number of exits tried before giving up on a drain.
    pub max_config_depth: usize,

    /// Command that escalates from the `>` prompt.
    pub enable_command: String,

    /// Pattern for the enable password prompt.
    pub enable_prompt: Regex,

    /// Patterns that indicate the device rejected a command.
    pub failed_when_contains: Vec<String>,

    /// Commands to run when connection is established.
    pub on_open_commands: Vec<String>,

    /// Terminal width for PTY.
    pub terminal_width: u32,

    /// Terminal height for PTY.
    pub terminal_height: u32,

    /// How many tail bytes are searched for prompts.
    pub search_depth: usize,
}

impl PlatformDefinition {
    /// Create a platform with the given prompt pattern and SGOS-like defaults
    /// for everything else.
    pub fn new(name: impl Into<String>, prompt_pattern: &str) -> Result<Self> {
        let prompt_pattern =
            compile_prompt_pattern(prompt_pattern).map_err(|e| PlatformError::InvalidDefinition {
                message: format!("prompt pattern: {e}"),
            })?;

        let enable_prompt = Regex::new(r"(?i)password:\s*\z").map_err(|e| {
            PlatformError::InvalidDefinition {
                message: format!("enable prompt: {e}"),
            }
        })?;

        Ok(Self {
            name: name.into(),
            prompt_pattern,
            config_marker: "#(config".to_string(),
            config_enter_command: "configure terminal".to_string(),
            config_exit_command: "exit".to_string(),
            max_config_depth: 16,
            enable_command: "enable".to_string(),
            enable_prompt,
            failed_when_contains: vec![],
            on_open_commands: vec![],
            terminal_width: 511,
            terminal_height: 24,
            search_depth: 1000,
        })
    }

    /// Set the configuration-mode marker.
    pub fn with_config_marker(mut self, marker: impl Into<String>) -> Self {
        self.config_marker = marker.into();
        self
    }

    /// Set the configuration entry and exit commands.
    pub fn with_config_commands(mut self, enter: impl Into<String>, exit: impl Into<String>) -> Self {
        self.config_enter_command = enter.into();
        self.config_exit_command = exit.into();
        self
    }

    /// Bound the configuration drain loop.
    pub fn with_max_config_depth(mut self, depth: usize) -> Self {
        self.max_config_depth = depth;
        self
    }

    /// Add a failure pattern.
    pub fn with_failure_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.failed_when_contains.push(pattern.into());
        self
    }

    /// Add an on_open command.
    pub fn with_on_open_command(mut self, command: impl Into<String>) -> Self {
        self.on_open_commands.push(command.into());
        self
    }

    /// Set terminal dimensions.
    pub fn with_terminal_size(mut self, width: u32, height: u32) -> Self {
        self.terminal_width = width;
        self.terminal_height = height;
        self
    }

    /// Whether `prompt` shows the configuration marker.
    pub fn is_config_prompt(&self, prompt: &[u8]) -> bool {
        contains_literal(prompt, &self.config_marker)
    }

    /// Whether `prompt` is the unprivileged (`>`) prompt.
    pub fn is_unprivileged_prompt(&self, prompt: &[u8]) -> bool {
        prompt.trim_ascii_end().ends_with(b">")
    }

    /// Strip the command echo and the trailing prompt from raw output.
    pub fn normalize_output(&self, raw: &str, command: &str) -> String {
        let text = raw.replace("\r\n", "\n").replace('\r', "");
        let output = text
            .strip_prefix(command)
            .unwrap_or(&text)
            .trim_start_matches('\n');

        let body = match output.rfind('\n') {
            Some(pos) if self.prompt_pattern.is_match(output[pos + 1..].as_bytes()) => &output[..pos],
            None if self.prompt_pattern.is_match(output.as_bytes()) => "",
            _ => output,
        };

        body.trim_end().to_string()
    }

    /// Return the first failure pattern found in `output`.
    pub fn detect_failure(&self, output: &str) -> Option<String> {
        self.failed_when_contains
            .iter()
            .find(|pattern| output.contains(pattern.as_str()))
            .cloned()
    }
}
