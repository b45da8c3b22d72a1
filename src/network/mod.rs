//! Multi-carrier energy-system network
//!
//! Carriers and buses form commodity-conservation nodes; generators, links and
//! loads attach to them. A [`Network`] is frozen by [`NetworkBuilder::build`],
//! translated into a MILP by [`Network::assemble`], optionally extended with
//! custom constraints, then solved into a [`NetworkSolution`].

pub mod assemble;
pub mod components;
pub mod model;
pub mod solution;

pub use assemble::{AssembledModel, VariableGroup};
pub use components::{Attribute, Bus, Generator, Link, Load};
pub use model::{Network, NetworkBuilder};
pub use solution::{LinkSeries, NetworkSolution};
