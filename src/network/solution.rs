use chrono::{DateTime, Utc};
use indexmap::IndexMap;

/// Link flows per component. Input `p0` is positive, outputs `p1`/`p2` are
/// negative (energy delivered away from the link).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinkSeries {
    pub p0: IndexMap<String, Vec<f64>>,
    pub p1: IndexMap<String, Vec<f64>>,
    pub p2: IndexMap<String, Vec<f64>>,
    pub status: IndexMap<String, Vec<f64>>,
}

/// Optimal dispatch of every component of a network
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkSolution {
    pub snapshots: Vec<DateTime<Utc>>,
    /// Total marginal cost at the optimum
    pub objective: f64,
    pub generators_p: IndexMap<String, Vec<f64>>,
    pub links_t: LinkSeries,
    pub loads_p: IndexMap<String, Vec<f64>>,
}
