//! Core domain types and logic.

pub mod kbar;
pub mod fees;
pub mod grid;
pub mod strategy;
pub mod state;
pub mod trading;
pub mod engine;
pub mod metrics;
pub mod config_validation;
pub mod error;
