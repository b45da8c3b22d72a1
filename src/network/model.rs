use chrono::{DateTime, Utc};
use indexmap::{IndexMap, IndexSet};

use super::{AssembledModel, Bus, Generator, Link, Load};
use crate::error::DispatchError;

/// Collects carriers, buses and components before they are frozen into a [`Network`]
#[derive(Debug, Clone, Default)]
pub struct NetworkBuilder {
    snapshots: Vec<DateTime<Utc>>,
    carriers: Vec<String>,
    buses: Vec<Bus>,
    generators: Vec<Generator>,
    links: Vec<Link>,
    loads: Vec<Load>,
}

impl NetworkBuilder {
    pub fn new(snapshots: Vec<DateTime<Utc>>) -> Self {
        Self {
            snapshots,
            ..Default::default()
        }
    }

    pub fn carrier(mut self, name: impl Into<String>) -> Self {
        self.carriers.push(name.into());
        self
    }

    pub fn bus(mut self, bus: Bus) -> Self {
        self.buses.push(bus);
        self
    }

    pub fn generator(mut self, generator: Generator) -> Self {
        self.generators.push(generator);
        self
    }

    pub fn link(mut self, link: Link) -> Self {
        self.links.push(link);
        self
    }

    pub fn load(mut self, load: Load) -> Self {
        self.loads.push(load);
        self
    }

    /// Validate all references and freeze the network
    pub fn build(self) -> Result<Network, DispatchError> {
        let n = self.snapshots.len();
        if n == 0 {
            return Err(DispatchError::Network("network has no snapshots".to_string()));
        }
        if self.snapshots.windows(2).any(|w| w[1] <= w[0]) {
            return Err(DispatchError::Network(
                "snapshots must be strictly increasing".to_string(),
            ));
        }

        let mut carriers = IndexSet::new();
        for carrier in self.carriers {
            if !carriers.insert(carrier.clone()) {
                return Err(duplicate("carrier", &carrier));
            }
        }

        let mut buses = IndexMap::new();
        for bus in self.buses {
            check_carrier(&carriers, "bus", &bus.name, bus.carrier.as_deref())?;
            if buses.contains_key(&bus.name) {
                return Err(duplicate("bus", &bus.name));
            }
            buses.insert(bus.name.clone(), bus);
        }

        let mut generators = IndexMap::new();
        for g in self.generators {
            check_bus(&buses, "generator", &g.name, &g.bus)?;
            check_carrier(&carriers, "generator", &g.name, g.carrier.as_deref())?;
            g.marginal_cost
                .check(n)
                .map_err(|e| invalid("generator", &g.name, "marginal_cost", e))?;
            if !(g.sign == 1.0 || g.sign == -1.0) {
                return Err(invalid("generator", &g.name, "sign", format!("{} is not +1 or -1", g.sign)));
            }
            if !g.p_nom_extendable && !(g.p_nom.is_finite() && g.p_nom >= 0.0) {
                return Err(invalid("generator", &g.name, "p_nom", format!("{}", g.p_nom)));
            }
            if generators.contains_key(&g.name) {
                return Err(duplicate("generator", &g.name));
            }
            generators.insert(g.name.clone(), g);
        }

        let mut links = IndexMap::new();
        for l in self.links {
            check_bus(&buses, "link", &l.name, &l.bus0)?;
            check_bus(&buses, "link", &l.name, &l.bus1)?;
            if let Some(bus2) = &l.bus2 {
                check_bus(&buses, "link", &l.name, bus2)?;
            }
            check_carrier(&carriers, "link", &l.name, l.carrier.as_deref())?;
            l.check().map_err(|e| DispatchError::Network(format!("link '{}': {}", l.name, e)))?;
            l.marginal_cost
                .check(n)
                .map_err(|e| invalid("link", &l.name, "marginal_cost", e))?;
            if links.contains_key(&l.name) {
                return Err(duplicate("link", &l.name));
            }
            links.insert(l.name.clone(), l);
        }

        let mut loads = IndexMap::new();
        for l in self.loads {
            check_bus(&buses, "load", &l.name, &l.bus)?;
            check_carrier(&carriers, "load", &l.name, l.carrier.as_deref())?;
            l.p_set.check(n).map_err(|e| invalid("load", &l.name, "p_set", e))?;
            if loads.contains_key(&l.name) {
                return Err(duplicate("load", &l.name));
            }
            loads.insert(l.name.clone(), l);
        }

        Ok(Network {
            snapshots: self.snapshots,
            carriers,
            buses,
            generators,
            links,
            loads,
        })
    }
}

fn duplicate(kind: &str, name: &str) -> DispatchError {
    DispatchError::Network(format!("duplicate {} '{}'", kind, name))
}

fn invalid(kind: &str, name: &str, attribute: &str, reason: String) -> DispatchError {
    DispatchError::Network(format!("{} '{}' attribute {}: {}", kind, name, attribute, reason))
}

fn check_bus(
    buses: &IndexMap<String, Bus>,
    kind: &str,
    name: &str,
    bus: &str,
) -> Result<(), DispatchError> {
    if buses.contains_key(bus) {
        Ok(())
    } else {
        Err(DispatchError::Network(format!(
            "{} '{}' refers to unknown bus '{}'",
            kind, name, bus
        )))
    }
}

fn check_carrier(
    carriers: &IndexSet<String>,
    kind: &str,
    name: &str,
    carrier: Option<&str>,
) -> Result<(), DispatchError> {
    match carrier {
        Some(c) if !carriers.contains(c) => Err(DispatchError::Network(format!(
            "{} '{}' refers to unknown carrier '{}'",
            kind, name, c
        ))),
        _ => Ok(()),
    }
}

/// A validated multi-carrier network. Immutable once built.
#[derive(Debug, Clone)]
pub struct Network {
    snapshots: Vec<DateTime<Utc>>,
    carriers: IndexSet<String>,
    buses: IndexMap<String, Bus>,
    generators: IndexMap<String, Generator>,
    links: IndexMap<String, Link>,
    loads: IndexMap<String, Load>,
}

impl Network {
    pub fn builder(snapshots: Vec<DateTime<Utc>>) -> NetworkBuilder {
        NetworkBuilder::new(snapshots)
    }

    pub fn snapshots(&self) -> &[DateTime<Utc>] {
        &self.snapshots
    }

    pub fn carriers(&self) -> impl Iterator<Item = &str> {
        self.carriers.iter().map(String::as_str)
    }

    pub fn buses(&self) -> impl Iterator<Item = &Bus> {
        self.buses.values()
    }

    pub fn generators(&self) -> impl Iterator<Item = &Generator> {
        self.generators.values()
    }

    pub fn links(&self) -> impl Iterator<Item = &Link> {
        self.links.values()
    }

    pub fn loads(&self) -> impl Iterator<Item = &Load> {
        self.loads.values()
    }

    pub fn link(&self, name: &str) -> Option<&Link> {
        self.links.get(name)
    }

    /// Translate the network into an optimization model
    pub fn assemble(&self) -> Result<AssembledModel, DispatchError> {
        AssembledModel::from_network(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn snapshots(n: usize) -> Vec<DateTime<Utc>> {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        (0..n).map(|i| start + chrono::Duration::hours(i as i64)).collect()
    }

    fn base() -> NetworkBuilder {
        Network::builder(snapshots(2))
            .carrier("gas")
            .carrier("heat")
            .bus(Bus::new("gas").carrier("gas"))
            .bus(Bus::new("heat").carrier("heat"))
    }

    #[test]
    fn test_valid_network() {
        let network = base()
            .generator(Generator::new("Gas_Supply", "gas").extendable().marginal_cost(30.0))
            .link(Link::new("Boiler", "gas", "heat").efficiency(0.9).p_nom(10.0))
            .load(Load::new("Heat_Load", "heat", vec![1.0, 2.0]))
            .build()
            .unwrap();

        assert_eq!(network.snapshots().len(), 2);
        assert_eq!(network.links().count(), 1);
        assert!(network.link("Boiler").is_some());
    }

    #[test]
    fn test_unknown_bus_is_rejected() {
        let err = base()
            .link(Link::new("Boiler", "gas", "steam").efficiency(0.9).p_nom(10.0))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("unknown bus 'steam'"));
    }

    #[test]
    fn test_unknown_carrier_is_rejected() {
        let err = base()
            .bus(Bus::new("electricity").carrier("electricity"))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("unknown carrier"));
    }

    #[test]
    fn test_series_length_must_match_snapshots() {
        let err = base()
            .load(Load::new("Heat_Load", "heat", vec![1.0, 2.0, 3.0]))
            .build()
            .unwrap_err();
        assert!(matches!(err, DispatchError::Network(_)));
    }

    #[test]
    fn test_duplicate_component_is_rejected() {
        let err = base()
            .load(Load::new("Heat_Load", "heat", 1.0))
            .load(Load::new("Heat_Load", "heat", 2.0))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("duplicate load"));
    }

    #[test]
    fn test_empty_snapshots_are_rejected() {
        assert!(Network::builder(vec![]).build().is_err());
    }
}
