//! Platform definitions.
//!
//! This module defines the CLI dialect the driver speaks: prompt patterns,
//! the configuration-mode marker and the failure patterns.

mod definition;
pub mod sgos;

pub use definition::PlatformDefinition;
