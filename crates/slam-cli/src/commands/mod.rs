//! CLI command implementations.
//!
//! This module contains the implementation of each CLI command.

pub mod achievements;
pub mod games;
pub mod modify;
pub mod reset;
pub mod schema;
pub mod stat;
