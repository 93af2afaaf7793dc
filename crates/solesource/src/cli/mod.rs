//! CLI command implementations

pub mod config;
pub mod error;
pub mod evaluate;
pub mod export;
pub mod output;
pub mod steps;
pub mod wizard;
