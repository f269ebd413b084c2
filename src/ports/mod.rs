//! Port traits for the hexagonal boundary.

pub mod config_port;
pub mod data_port;
pub mod report_port;
