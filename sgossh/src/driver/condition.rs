//! Conditions over command results, used by the poller.
//!
//! A condition reads `result[N] [not] <op> <value>`:
//!
//! ```rust
//! use sgossh::driver::Condition;
//!
//! let condition: Condition = "result[0] contains SGOS".parse().unwrap();
//! assert!(condition.evaluate(&["Version: SGOS 6.7.4"]));
//!
//! let negated: Condition = "result[1] not eq 'ready'".parse().unwrap();
//! assert!(negated.evaluate(&["x", "starting"]));
//! ```

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{DriverError, Error};

static CONDITION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*result\[(\d+)\]\s+(not\s+)?(\S+)\s+(.+?)\s*$")
        .expect("condition grammar is a valid regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Eq,
    Neq,
    Gt,
    Ge,
    Lt,
    Le,
    Contains,
    Matches,
}

impl Op {
    fn parse(token: &str) -> Option<Self> {
        Some(match token {
            "eq" | "==" => Op::Eq,
            "neq" | "ne" | "!=" => Op::Neq,
            "gt" | ">" => Op::Gt,
            "ge" | ">=" => Op::Ge,
            "lt" | "<" => Op::Lt,
            "le" | "<=" => Op::Le,
            "contains" => Op::Contains,
            "matches" => Op::Matches,
            _ => return None,
        })
    }

    fn is_numeric(self) -> bool {
        matches!(self, Op::Gt | Op::Ge | Op::Lt | Op::Le)
    }
}

/// A parsed predicate over one command's output.
#[derive(Debug, Clone)]
pub struct Condition {
    raw: String,
    index: usize,
    negate: bool,
    op: Op,
    value: String,
    regex: Option<Regex>,
}

impl Condition {
    /// The condition text as given.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Index of the command output this condition reads.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Test the condition against the outputs of one polling round.
    ///
    /// A missing output, or a non-numeric operand to an ordering operator,
    /// makes the condition false (before negation).
    pub fn evaluate(&self, outputs: &[&str]) -> bool {
        let Some(output) = outputs.get(self.index) else {
            return false;
        };
        let output = output.trim();

        let holds = match self.op {
            Op::Eq => output == self.value,
            Op::Neq => output != self.value,
            Op::Contains => output.contains(self.value.as_str()),
            Op::Matches => self.regex.as_ref().is_some_and(|re| re.is_match(output)),
            op => match (output.parse::<f64>(), self.value.parse::<f64>()) {
                (Ok(lhs), Ok(rhs)) => match op {
                    Op::Gt => lhs > rhs,
                    Op::Ge => lhs >= rhs,
                    Op::Lt => lhs < rhs,
                    _ => lhs <= rhs,
                },
                _ => false,
            },
        };

        holds != self.negate
    }
}

impl FromStr for Condition {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |message: String| DriverError::InvalidCondition {
            condition: s.to_string(),
            message,
        };

        let caps = CONDITION
            .captures(s)
            .ok_or_else(|| invalid("expected `result[N] [not] <op> <value>`".to_string()))?;

        let index = caps[1]
            .parse()
            .map_err(|e| invalid(format!("bad result index: {e}")))?;
        let negate = caps.get(2).is_some();
        let op = Op::parse(&caps[3])
            .ok_or_else(|| invalid(format!("unknown operator '{}'", &caps[3])))?;
        let value = unquote(&caps[4]).to_string();

        if op.is_numeric() && value.parse::<f64>().is_err() {
            return Err(invalid(format!("'{value}' is not a number")).into());
        }

        let regex = if op == Op::Matches {
            Some(Regex::new(&value).map_err(|e| invalid(format!("bad pattern: {e}")))?)
        } else {
            None
        };

        Ok(Condition {
            raw: s.trim().to_string(),
            index,
            negate,
            op,
            value,
            regex,
        })
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = value
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner;
        }
    }
    value
}

/// How a set of conditions is satisfied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MatchMode {
    /// Every condition must hold, not necessarily in the same round.
    #[default]
    All,

    /// One condition holding in any round is enough.
    Any,
}

impl FromStr for MatchMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(MatchMode::All),
            "any" => Ok(MatchMode::Any),
            other => Err(DriverError::InvalidConfig {
                message: format!("match mode must be 'all' or 'any', got '{other}'"),
            }
            .into()),
        }
    }
}
