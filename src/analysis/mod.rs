//! Post-processing of dispatch results: cross-model comparison, KPIs and
//! calendar profiles

pub mod compare;
pub mod kpi;
pub mod profile;

pub use compare::*;
pub use kpi::*;
pub use profile::*;
