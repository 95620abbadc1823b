//! High-level driver for SGOS sessions.
//!
//! The driver layer provides the main API:
//! - [`SgosDriver::send`] for one exchange, including prompt/answer scripts
//! - [`SgosDriver::run_command`] for single-shot commands outside configuration mode
//! - [`SgosDriver::apply_config`] for configuration batches
//! - [`SgosDriver::poll_until`] for waiting on command output

mod builder;
pub mod condition;
pub mod config_session;
mod directive;
pub mod inline;
mod interactive;
mod poll;
pub(crate) mod response;
mod sgos;

pub use builder::DriverBuilder;
pub use condition::{Condition, MatchMode};
pub use config_session::{ApplyOptions, ConfigMode, ConfigSession, ExecutionResult};
pub use directive::Directive;
pub use inline::{DEFAULT_EOF_MARKER, fold_inline_blocks, parse_source};
pub use poll::PollOptions;
pub use response::Response;
pub use sgos::SgosDriver;
