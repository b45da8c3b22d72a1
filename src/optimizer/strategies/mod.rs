//! Dispatch formulations
//!
//! - Direct: mixed-integer program built straight against the solver
//! - Network: carrier network assembled by the energy-system framework, plus
//!   the CHP >= Boiler constraint

pub mod direct;
pub mod network;

pub use direct::*;
pub use network::{build_network, NetworkDispatch};
