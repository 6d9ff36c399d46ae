//! Core domain types and logic.

pub mod config_validation;
pub mod error;
pub mod fee;
pub mod moving_average;
pub mod params;
pub mod price_point;
pub mod quarter;
pub mod result;
pub mod simulator;
pub mod state;
pub mod stats;
pub mod sweep;
pub mod volume_window;
