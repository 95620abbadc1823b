//! SGOS platform definition.
//!
//! SGOS prompts carry the configuration context after the `#`:
//!
//! ```text
//! proxy>                               # unprivileged
//! proxy#                               # enabled
//! proxy#(config)                       # configuration mode
//! proxy#(config proxy-services)        # nested configuration context
//! ```
//!
//! Every nested context is left with one `exit`.

use super::PlatformDefinition;

/// Name of the built-in SGOS platform.
pub const PLATFORM_NAME: &str = "sgos";

/// Prompt pattern covering every SGOS mode.
pub const PROMPT_PATTERN: &str = r"(?m)^[\w.\-@/:]{1,63}(?:>|#(?:\([^)\r\n]*\))?)";

/// Create the SGOS platform definition.
pub fn platform() -> PlatformDefinition {
    PlatformDefinition::new(PLATFORM_NAME, PROMPT_PATTERN)
        .expect("built-in SGOS prompt pattern is valid")
        .with_config_marker("#(config")
        .with_config_commands("configure terminal", "exit")
        .with_failure_pattern("% Invalid")
        .with_failure_pattern("% Error")
        .with_failure_pattern("% Unknown")
        .with_failure_pattern("% Incomplete command")
        .with_failure_pattern("% Ambiguous")
        .with_terminal_size(511, 24)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sgos_platform() {
        let platform = platform();
        assert_eq!(platform.name, "sgos");
        assert_eq!(platform.config_enter_command, "configure terminal");
        assert_eq!(platform.config_exit_command, "exit");
        assert_eq!(platform.config_marker, "#(config");
    }

    #[test]
    fn test_prompt_match() {
        let platform = platform();
        let prompt = &platform.prompt_pattern;

        assert!(prompt.is_match(b"proxy>"));
        assert!(prompt.is_match(b"proxy#"));
        assert!(prompt.is_match(b"proxy# "));
        assert!(prompt.is_match(b"output\r\nSG-300.lab#(config)"));
        assert!(prompt.is_match(b"output\r\nproxy#(config proxy-services)"));

        // Only the last line counts.
        assert!(!prompt.is_match(b"proxy#\r\nVersion: SGOS 6.7"));
        assert!(!prompt.is_match(b"Are you sure? confirm?"));
    }

    #[test]
    fn test_failure_patterns() {
        let platform = platform();
        assert!(
            platform
                .failed_when_contains
                .contains(&"% Invalid".to_string())
        );
        assert!(platform.detect_failure("% Unknown command").is_some());
    }
}
