//! Inline block folding.
//!
//! SGOS reads policy, CA certificates and similar payloads through
//! `inline <kind> [<name>] <marker>`, followed by raw lines, closed by a
//! line holding `<marker>`:
//!
//! ```text
//! inline policy local _EOF
//! <proxy>
//!   ALLOW
//! _EOF
//! ```
//!
//! The device prints nothing until the marker arrives, so the opening line
//! and the body are folded into one directive written in a single burst.
//! The marker line stays a separate directive that waits for the prompt.

use super::directive::Directive;
use crate::error::{DriverError, Result};

/// Terminator used when an inline command names none.
pub const DEFAULT_EOF_MARKER: &str = "_EOF";

/// Marker an inline command expects: its last token when it has at least
/// three (`inline policy local END`), otherwise `default`.
pub fn block_marker<'a>(command: &'a str, default: &'a str) -> &'a str {
    let tokens: Vec<&str> = command.split_whitespace().collect();
    if tokens.len() >= 3 {
        tokens[tokens.len() - 1]
    } else {
        default
    }
}

/// Marker of the block `directive` leaves open, if it is an `inline`
/// command whose terminator has not been sent yet.
///
/// The marker comes from the first line, so pre-folded blocks
/// (`"inline policy local END\n<proxy>"`) are recognised too.
pub fn opened_block(directive: &Directive, default: &str) -> Option<String> {
    if !directive.is_inline_start() {
        return None;
    }

    let mut lines = directive.command.lines();
    let marker = block_marker(lines.next().unwrap_or(""), default);
    if lines.any(|line| line.contains(marker)) {
        return None;
    }
    Some(marker.to_string())
}

/// Fold every single-line `inline` directive with the lines that follow it
/// up to its terminator.
///
/// - Body lines are joined to the opening command with `\n`.
/// - Text before the marker on the terminator line belongs to the body.
/// - The terminator directive gets the block's marker as its `eof_marker`.
/// - An `inline` directive already holding a newline is left alone.
/// - A block with no terminator is an [`DriverError::InvalidDirective`].
pub fn fold_inline_blocks(directives: Vec<Directive>, default_marker: &str) -> Result<Vec<Directive>> {
    let mut folded = Vec::with_capacity(directives.len());
    let mut iter = directives.into_iter().enumerate();

    while let Some((start, directive)) = iter.next() {
        if !directive.is_inline_start() || directive.command.contains('\n') {
            folded.push(directive);
            continue;
        }

        let marker = block_marker(&directive.command, default_marker).to_string();
        let mut block = directive;
        let mut terminator = None;

        for (_, line) in iter.by_ref() {
            match line.command.find(marker.as_str()) {
                Some(pos) => {
                    let leading = &line.command[..pos];
                    if !leading.is_empty() {
                        block.command.push('\n');
                        block.command.push_str(leading);
                    }
                    let mut closing = Directive {
                        command: line.command[pos..].to_string(),
                        ..line
                    };
                    closing.eof_marker = Some(marker.clone());
                    terminator = Some(closing);
                    break;
                }
                None => {
                    block.command.push('\n');
                    block.command.push_str(&line.command);
                }
            }
        }

        let Some(terminator) = terminator else {
            return Err(DriverError::InvalidDirective {
                index: start,
                message: format!("inline block is never closed by '{marker}'"),
            }
            .into());
        };

        block.eof_marker = Some(marker);
        folded.push(block);
        folded.push(terminator);
    }

    Ok(folded)
}

/// Split a configuration source into directives.
///
/// Blank lines are dropped and inline blocks folded.
pub fn parse_source(text: &str, eof_marker: &str) -> Result<Vec<Directive>> {
    let directives = text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            Directive::new(line.trim_end_matches('\r')).with_eof_marker(eof_marker)
        })
        .collect();

    fold_inline_blocks(directives, eof_marker)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn directives(lines: &[&str]) -> Vec<Directive> {
        lines.iter().map(|line| Directive::new(*line)).collect()
    }

    #[test]
    fn test_block_marker() {
        assert_eq!(block_marker("inline policy local END", "_EOF"), "END");
        assert_eq!(block_marker("inline policy", "_EOF"), "_EOF");
    }

    #[test]
    fn test_opened_block_marker() {
        let open = |command: &str| opened_block(&Directive::new(command), DEFAULT_EOF_MARKER);
        assert_eq!(open("inline policy local END").as_deref(), Some("END"));
        assert_eq!(open("inline policy local END\n<proxy>").as_deref(), Some("END"));
        assert_eq!(open("inline policy").as_deref(), Some("_EOF"));
        assert_eq!(open("inline policy local END\n<proxy>\nEND"), None);
        assert_eq!(open("show version"), None);
    }

    #[test]
    fn test_fold_basic_block() {
        let folded = fold_inline_blocks(
            directives(&["inline foo _EOF", "line1", "line2", "_EOF"]),
            DEFAULT_EOF_MARKER,
        )
        .unwrap();

        assert_eq!(folded.len(), 2);
        assert_eq!(folded[0].command, "inline foo _EOF\nline1\nline2");
        assert_eq!(folded[1].command, "_EOF");
        assert_eq!(folded[1].eof_marker.as_deref(), Some("_EOF"));
    }

    #[test]
    fn test_fold_keeps_text_before_marker() {
        let folded = fold_inline_blocks(
            directives(&["inline policy local EOF", "<proxy>", "  ALLOW EOF"]),
            DEFAULT_EOF_MARKER,
        )
        .unwrap();

        assert_eq!(folded[0].command, "inline policy local EOF\n<proxy>\n  ALLOW ");
        assert_eq!(folded[1].command, "EOF");
    }

    #[test]
    fn test_fold_leaves_other_directives() {
        let folded = fold_inline_blocks(
            directives(&["show version", "inline foo _EOF", "x", "_EOF", "exit"]),
            DEFAULT_EOF_MARKER,
        )
        .unwrap();

        let commands: Vec<&str> = folded.iter().map(|d| d.command.as_str()).collect();
        assert_eq!(commands, vec!["show version", "inline foo _EOF\nx", "_EOF", "exit"]);
    }

    #[test]
    fn test_marker_outside_block_is_plain() {
        let folded =
            fold_inline_blocks(directives(&["_EOF", "show clock"]), DEFAULT_EOF_MARKER).unwrap();
        assert_eq!(folded.len(), 2);
    }

    #[test]
    fn test_unterminated_block() {
        let err = fold_inline_blocks(
            directives(&["show clock", "inline foo _EOF", "line1"]),
            DEFAULT_EOF_MARKER,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            crate::Error::Driver(DriverError::InvalidDirective { index: 1, .. })
        ));
    }

    #[test]
    fn test_prefolded_block_untouched() {
        let folded = fold_inline_blocks(
            directives(&["inline foo _EOF\nline1", "_EOF"]),
            DEFAULT_EOF_MARKER,
        )
        .unwrap();
        assert_eq!(folded.len(), 2);
        assert_eq!(folded[0].command, "inline foo _EOF\nline1");
    }

    #[test]
    fn test_parse_source() {
        let source = "proxy-services\r\n\r\n  edit HTTP\n\ninline policy local _EOF\n<proxy>\n_EOF\n";
        let directives = parse_source(source, DEFAULT_EOF_MARKER).unwrap();

        let commands: Vec<&str> = directives.iter().map(|d| d.command.as_str()).collect();
        assert_eq!(
            commands,
            vec!["proxy-services", "  edit HTTP", "inline policy local _EOF\n<proxy>", "_EOF"]
        );
    }
}
