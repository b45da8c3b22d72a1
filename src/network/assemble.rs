use std::collections::BTreeSet;
use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use good_lp::{constraint, variable, Constraint, Expression, ProblemVariables, Variable};
use indexmap::IndexMap;
use strum::{Display, EnumIter};

use super::{LinkSeries, Network, NetworkSolution};
use crate::error::DispatchError;
use crate::solver::{LinearProblem, Sense, SolverSettings};

pub const NODAL_BALANCE: &str = "Bus-nodal_balance";
pub const LINK_COMMIT_LOWER: &str = "Link-com-p-lower";
pub const LINK_COMMIT_UPPER: &str = "Link-com-p-upper";

/// Named families of decision variables, indexed by component and snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum VariableGroup {
    #[strum(serialize = "Generator-p")]
    GeneratorP,
    #[strum(serialize = "Link-p")]
    LinkP,
    #[strum(serialize = "Link-status")]
    LinkStatus,
}

#[derive(Debug, Clone, Copy)]
struct LinkOutputs {
    efficiency: f64,
    efficiency2: Option<f64>,
}

/// The optimization model derived from a [`Network`].
///
/// Holds the variables, the cost objective and the constraint groups. Custom
/// constraints are added by value with [`AssembledModel::add_constraints`] before
/// the model is consumed by [`AssembledModel::solve`].
pub struct AssembledModel {
    snapshots: Vec<DateTime<Utc>>,
    variables: ProblemVariables,
    objective: Expression,
    generator_p: IndexMap<String, Vec<Variable>>,
    link_p: IndexMap<String, Vec<Variable>>,
    link_status: IndexMap<String, Vec<Variable>>,
    link_outputs: IndexMap<String, LinkOutputs>,
    load_p: IndexMap<String, Vec<f64>>,
    constraints: IndexMap<String, Vec<Constraint>>,
}

impl AssembledModel {
    pub(crate) fn from_network(network: &Network) -> Result<Self, DispatchError> {
        let n = network.snapshots().len();
        let mut variables = ProblemVariables::new();
        let mut objective = Expression::from(0.0);
        let mut constraints: IndexMap<String, Vec<Constraint>> = IndexMap::new();

        let mut generator_p = IndexMap::new();
        for g in network.generators() {
            let definition = if g.p_nom_extendable {
                variable().min(0.0)
            } else {
                variable().min(0.0).max(g.p_nom)
            };
            let p = variables.add_vector(definition, n);
            for (t, &p_t) in p.iter().enumerate() {
                objective += g.marginal_cost.at(t) * p_t;
            }
            generator_p.insert(g.name.clone(), p);
        }

        let mut link_p = IndexMap::new();
        let mut link_status = IndexMap::new();
        let mut link_outputs = IndexMap::new();
        for l in network.links() {
            let p_max = l.p_max_pu * l.p_nom;
            let p_min = l.p_min_pu * l.p_nom;

            let p = if l.committable {
                let p = variables.add_vector(variable().min(0.0).max(p_max), n);
                let status = variables.add_vector(variable().binary(), n);
                for t in 0..n {
                    constraints
                        .entry(LINK_COMMIT_LOWER.to_string())
                        .or_default()
                        .push(constraint!(p[t] >= p_min * status[t]));
                    constraints
                        .entry(LINK_COMMIT_UPPER.to_string())
                        .or_default()
                        .push(constraint!(p[t] <= p_max * status[t]));
                }
                link_status.insert(l.name.clone(), status);
                p
            } else {
                variables.add_vector(variable().min(p_min).max(p_max), n)
            };

            for (t, &p_t) in p.iter().enumerate() {
                objective += l.marginal_cost.at(t) * p_t;
            }
            link_outputs.insert(
                l.name.clone(),
                LinkOutputs {
                    efficiency: l.efficiency,
                    efficiency2: l.bus2.as_ref().map(|_| l.efficiency2),
                },
            );
            link_p.insert(l.name.clone(), p);
        }

        let load_p: IndexMap<String, Vec<f64>> = network
            .loads()
            .map(|l| (l.name.clone(), (0..n).map(|t| l.p_set.at(t)).collect()))
            .collect();

        for bus in network.buses() {
            let generators: Vec<_> = network.generators().filter(|g| g.bus == bus.name).collect();
            let withdrawing: Vec<_> = network.links().filter(|l| l.bus0 == bus.name).collect();
            let primary: Vec<_> = network.links().filter(|l| l.bus1 == bus.name).collect();
            let secondary: Vec<_> = network
                .links()
                .filter(|l| l.bus2.as_deref() == Some(bus.name.as_str()))
                .collect();
            let loads: Vec<_> = network.loads().filter(|l| l.bus == bus.name).collect();

            if generators.is_empty()
                && withdrawing.is_empty()
                && primary.is_empty()
                && secondary.is_empty()
                && loads.is_empty()
            {
                tracing::debug!(bus = %bus.name, "bus has no attached components, skipping balance");
                continue;
            }

            let rows = constraints.entry(NODAL_BALANCE.to_string()).or_default();
            for t in 0..n {
                let mut balance = Expression::from(0.0);
                for g in &generators {
                    balance += g.sign * generator_p[g.name.as_str()][t];
                }
                for l in &withdrawing {
                    balance -= link_p[l.name.as_str()][t];
                }
                for l in &primary {
                    balance += l.efficiency * link_p[l.name.as_str()][t];
                }
                for l in &secondary {
                    balance += l.efficiency2 * link_p[l.name.as_str()][t];
                }
                for l in &loads {
                    balance -= load_p[l.name.as_str()][t];
                }
                rows.push(constraint!(balance == 0.0));
            }
        }

        tracing::debug!(
            snapshots = n,
            generators = generator_p.len(),
            links = link_p.len(),
            constraint_groups = constraints.len(),
            "network model assembled"
        );

        Ok(Self {
            snapshots: network.snapshots().to_vec(),
            variables,
            objective,
            generator_p,
            link_p,
            link_status,
            link_outputs,
            load_p,
            constraints,
        })
    }

    pub fn snapshots(&self) -> &[DateTime<Utc>] {
        &self.snapshots
    }

    /// Per-snapshot variables of one component, e.g. (`Link-p`, `CHP`)
    pub fn variables(&self, group: VariableGroup, component: &str) -> Result<&[Variable], DispatchError> {
        let map = match group {
            VariableGroup::GeneratorP => &self.generator_p,
            VariableGroup::LinkP => &self.link_p,
            VariableGroup::LinkStatus => &self.link_status,
        };
        map.get(component).map(Vec::as_slice).ok_or_else(|| {
            DispatchError::Network(format!("no '{}' variables for component '{}'", group, component))
        })
    }

    /// Add a named group of constraints on top of the assembled ones
    pub fn add_constraints(
        mut self,
        name: impl Into<String>,
        constraints: Vec<Constraint>,
    ) -> Result<Self, DispatchError> {
        let name = name.into();
        if self.constraints.contains_key(&name) {
            return Err(DispatchError::Network(format!(
                "constraint group '{}' already exists",
                name
            )));
        }
        tracing::debug!(group = %name, rows = constraints.len(), "custom constraints added");
        self.constraints.insert(name, constraints);
        Ok(self)
    }

    pub fn constraint_groups(&self) -> impl Iterator<Item = (&str, usize)> {
        self.constraints.iter().map(|(k, v)| (k.as_str(), v.len()))
    }

    /// Human-readable description of the model structure
    pub fn summary(&self) -> String {
        let n = self.snapshots.len();
        let mut out = String::new();
        let _ = writeln!(out, "Network optimization model");
        let _ = writeln!(out, "==========================");
        if let (Some(first), Some(last)) = (self.snapshots.first(), self.snapshots.last()) {
            let _ = writeln!(out, "Snapshots: {} ({} .. {})", n, first, last);
        }
        let _ = writeln!(out, "Objective: minimise total marginal cost");
        let _ = writeln!(out);

        let _ = writeln!(out, "Variables:");
        let _ = writeln!(out, "----------");
        for (group, map, kind) in [
            (VariableGroup::GeneratorP, &self.generator_p, "CONTINUOUS"),
            (VariableGroup::LinkP, &self.link_p, "CONTINUOUS"),
            (VariableGroup::LinkStatus, &self.link_status, "BINARY"),
        ] {
            if map.is_empty() {
                continue;
            }
            let names: Vec<&str> = map.keys().map(String::as_str).collect();
            let _ = writeln!(
                out,
                " * {} (name: {}; snapshot: {}) [{}]",
                group,
                names.join(", "),
                n,
                kind
            );
        }

        let _ = writeln!(out);
        let _ = writeln!(out, "Constraints:");
        let _ = writeln!(out, "------------");
        for (name, rows) in self.constraint_groups() {
            let _ = writeln!(out, " * {} ({} rows)", name, rows);
        }

        let names: BTreeSet<&str> = self
            .generator_p
            .keys()
            .chain(self.link_p.keys())
            .chain(self.load_p.keys())
            .map(String::as_str)
            .collect();
        let _ = writeln!(out);
        let _ = writeln!(out, "Component names:");
        let _ = writeln!(out, "----------------");
        for (i, name) in names.iter().enumerate() {
            let _ = writeln!(out, "{}. {}", i + 1, name);
        }
        out
    }

    /// Solve the model. Blocks until the backend returns.
    pub fn solve(self, settings: &SolverSettings) -> Result<NetworkSolution, DispatchError> {
        let AssembledModel {
            snapshots,
            variables,
            objective,
            generator_p,
            link_p,
            link_status,
            link_outputs,
            load_p,
            constraints,
        } = self;
        let n = snapshots.len();

        let readout: Vec<Variable> = generator_p
            .values()
            .chain(link_p.values())
            .chain(link_status.values())
            .flat_map(|vars| vars.iter().copied())
            .collect();

        let mut problem = LinearProblem::new(variables, objective, Sense::Minimise);
        problem.constraints = constraints.into_values().flatten().collect();
        let outcome = problem.solve(settings, n, &readout)?;

        let mut chunks = outcome.values.chunks_exact(n).map(<[f64]>::to_vec);
        let generators_p: IndexMap<String, Vec<f64>> =
            generator_p.into_keys().zip(chunks.by_ref()).collect();
        let links_p0: IndexMap<String, Vec<f64>> = link_p.into_keys().zip(chunks.by_ref()).collect();
        let links_status: IndexMap<String, Vec<f64>> =
            link_status.into_keys().zip(chunks.by_ref()).collect();

        let mut links_t = LinkSeries {
            p0: IndexMap::new(),
            p1: IndexMap::new(),
            p2: IndexMap::new(),
            status: links_status,
        };
        for (name, p0) in links_p0 {
            let outputs = link_outputs[name.as_str()];
            links_t
                .p1
                .insert(name.clone(), p0.iter().map(|p| -outputs.efficiency * p).collect());
            if let Some(efficiency2) = outputs.efficiency2 {
                links_t
                    .p2
                    .insert(name.clone(), p0.iter().map(|p| -efficiency2 * p).collect());
            }
            links_t.p0.insert(name, p0);
        }

        Ok(NetworkSolution {
            snapshots,
            objective: outcome.objective,
            generators_p,
            links_t,
            loads_p: load_p,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::{Bus, Generator, Link, Load};
    use chrono::TimeZone;

    fn snapshots(n: usize) -> Vec<DateTime<Utc>> {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        (0..n).map(|i| start + chrono::Duration::hours(i as i64)).collect()
    }

    fn boiler_only(demand: Vec<f64>) -> Network {
        Network::builder(snapshots(demand.len()))
            .carrier("gas")
            .carrier("heat")
            .bus(Bus::new("gas").carrier("gas"))
            .bus(Bus::new("heat").carrier("heat"))
            .generator(Generator::new("Gas_Supply", "gas").extendable().marginal_cost(40.0))
            .link(Link::new("Boiler", "gas", "heat").efficiency(0.8).p_nom(10.0))
            .load(Load::new("Heat_Load", "heat", demand))
            .build()
            .unwrap()
    }

    #[test]
    fn test_variable_lookup() {
        let model = boiler_only(vec![1.0, 2.0]).assemble().unwrap();
        assert_eq!(model.variables(VariableGroup::LinkP, "Boiler").unwrap().len(), 2);
        assert!(model.variables(VariableGroup::LinkStatus, "Boiler").is_err());
        assert!(model.variables(VariableGroup::LinkP, "CHP").is_err());
    }

    #[test]
    fn test_duplicate_constraint_group_is_rejected() {
        let model = boiler_only(vec![1.0]).assemble().unwrap();
        assert!(model.add_constraints(NODAL_BALANCE, vec![]).is_err());
    }

    #[test]
    fn test_summary_lists_groups() {
        let summary = boiler_only(vec![1.0, 2.0]).assemble().unwrap().summary();
        assert!(summary.contains("Link-p (name: Boiler; snapshot: 2) [CONTINUOUS]"));
        assert!(summary.contains("Bus-nodal_balance (4 rows)"));
        assert!(summary.contains("Heat_Load"));
    }

    #[cfg(feature = "microlp")]
    #[test]
    fn test_boiler_only_dispatch_and_signs() {
        let settings = SolverSettings::from_name("microlp", None).unwrap();
        let solution = boiler_only(vec![4.0, 8.0]).assemble().unwrap().solve(&settings).unwrap();

        let p0 = &solution.links_t.p0["Boiler"];
        let p1 = &solution.links_t.p1["Boiler"];
        assert!((p0[0] - 5.0).abs() < 1e-6);
        assert!((p0[1] - 10.0).abs() < 1e-6);
        assert!((p1[1] + 8.0).abs() < 1e-6);
        assert!((solution.generators_p["Gas_Supply"][1] - 10.0).abs() < 1e-6);
        assert!((solution.objective - 600.0).abs() < 1e-4);
    }

    #[cfg(feature = "microlp")]
    #[test]
    fn test_undersized_network_is_infeasible() {
        let settings = SolverSettings::from_name("microlp", None).unwrap();
        let err = boiler_only(vec![9.0]).assemble().unwrap().solve(&settings).unwrap_err();
        assert!(err.is_infeasible());
    }
}
