//! Hourly economic dispatch of a CHP unit and an auxiliary gas boiler.
//!
//! The same plant is solved by two formulations, a direct mixed-integer program
//! and a carrier network model, whose normalized results are cross-checked by
//! [`analysis::Comparator`].

pub mod analysis;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod io;
pub mod network;
pub mod optimizer;
pub mod solver;
pub mod tables;
pub mod telemetry;

pub use error::DispatchError;
