//! # sgossh
//!
//! Async SSH CLI driver for SGOS proxy appliances.
//!
//! sgossh drives an interactive SGOS shell over SSH: it answers command
//! prompts, keeps track of configuration mode from the live prompt, applies
//! configuration batches (including `inline` payloads) and polls show
//! commands until their output satisfies a set of conditions.
//!
//! ## Features
//!
//! - Async SSH connections via russh
//! - Prompt-aware reads with ANSI stripping and tail search
//! - Configuration mode drained before and after every batch
//! - Inline block folding for policy and certificate payloads
//! - Conditional polling with `all`/`any` semantics
//! - Device info and fact gathering
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sgossh::{Directive, DriverBuilder};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), sgossh::Error> {
//!     let mut driver = DriverBuilder::new("10.0.0.5")
//!         .username("admin")
//!         .password("secret")
//!         .enable_secret("enable-secret")
//!         .build()?;
//!
//!     driver.open().await?;
//!
//!     let response = driver.run_command(&Directive::new("show version")).await?;
//!     println!("{}", response.result);
//!
//!     let result = driver
//!         .apply_config(&[Directive::new("appliance-name bc-proxy-01")])
//!         .await?;
//!     println!("{} change(s) applied", result.len());
//!
//!     driver.close().await?;
//!     Ok(())
//! }
//! ```

pub mod channel;
pub mod driver;
pub mod error;
pub mod facts;
pub mod platform;
pub mod transport;

// Re-export main types for convenience
pub use driver::{
    ApplyOptions, Condition, ConfigMode, ConfigSession, Directive, DriverBuilder,
    ExecutionResult, MatchMode, PollOptions, Response, SgosDriver,
};
pub use error::Error;
pub use facts::{Capabilities, DeviceInfo, FactValue, Facts};
pub use platform::PlatformDefinition;
pub use transport::{AuthMethod, HostKeyVerification, SshConfig, Transport};
