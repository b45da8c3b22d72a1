use serde::{Deserialize, Serialize};

/// A component attribute that is either constant or given per snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Attribute {
    Static(f64),
    Series(Vec<f64>),
}

impl Attribute {
    pub fn at(&self, snapshot: usize) -> f64 {
        match self {
            Attribute::Static(v) => *v,
            Attribute::Series(values) => values[snapshot],
        }
    }

    /// Checks finiteness and, for series, that one value exists per snapshot
    pub(crate) fn check(&self, n_snapshots: usize) -> Result<(), String> {
        match self {
            Attribute::Static(v) if !v.is_finite() => Err(format!("non-finite value {}", v)),
            Attribute::Static(_) => Ok(()),
            Attribute::Series(values) if values.len() != n_snapshots => Err(format!(
                "series has {} values for {} snapshots",
                values.len(),
                n_snapshots
            )),
            Attribute::Series(values) => match values.iter().position(|v| !v.is_finite()) {
                Some(i) => Err(format!("non-finite value at snapshot {}", i)),
                None => Ok(()),
            },
        }
    }
}

impl From<f64> for Attribute {
    fn from(v: f64) -> Self {
        Attribute::Static(v)
    }
}

impl From<Vec<f64>> for Attribute {
    fn from(values: Vec<f64>) -> Self {
        Attribute::Series(values)
    }
}

impl Default for Attribute {
    fn default() -> Self {
        Attribute::Static(0.0)
    }
}

/// A commodity-conservation node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bus {
    pub name: String,
    pub carrier: Option<String>,
}

impl Bus {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            carrier: None,
        }
    }

    pub fn carrier(mut self, carrier: impl Into<String>) -> Self {
        self.carrier = Some(carrier.into());
        self
    }
}

/// Injects into (sign = +1) or withdraws from (sign = -1) a single bus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Generator {
    pub name: String,
    pub bus: String,
    pub carrier: Option<String>,
    pub p_nom: f64,
    /// Capacity is a free decision with no capital cost, so dispatch is unbounded above
    pub p_nom_extendable: bool,
    pub marginal_cost: Attribute,
    pub sign: f64,
}

impl Generator {
    pub fn new(name: impl Into<String>, bus: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bus: bus.into(),
            carrier: None,
            p_nom: 0.0,
            p_nom_extendable: false,
            marginal_cost: Attribute::default(),
            sign: 1.0,
        }
    }

    pub fn carrier(mut self, carrier: impl Into<String>) -> Self {
        self.carrier = Some(carrier.into());
        self
    }

    pub fn p_nom(mut self, p_nom: f64) -> Self {
        self.p_nom = p_nom;
        self
    }

    pub fn extendable(mut self) -> Self {
        self.p_nom_extendable = true;
        self
    }

    pub fn marginal_cost(mut self, cost: impl Into<Attribute>) -> Self {
        self.marginal_cost = cost.into();
        self
    }

    pub fn sign(mut self, sign: f64) -> Self {
        self.sign = sign;
        self
    }
}

/// Converter drawing `p` from `bus0` and delivering `efficiency * p` to `bus1`
/// and, if present, `efficiency2 * p` to `bus2`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub name: String,
    pub bus0: String,
    pub bus1: String,
    pub bus2: Option<String>,
    pub carrier: Option<String>,
    pub efficiency: f64,
    pub efficiency2: f64,
    pub p_nom: f64,
    pub p_min_pu: f64,
    pub p_max_pu: f64,
    pub marginal_cost: Attribute,
    pub committable: bool,
}

impl Link {
    pub fn new(name: impl Into<String>, bus0: impl Into<String>, bus1: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bus0: bus0.into(),
            bus1: bus1.into(),
            bus2: None,
            carrier: None,
            efficiency: 1.0,
            efficiency2: 0.0,
            p_nom: 0.0,
            p_min_pu: 0.0,
            p_max_pu: 1.0,
            marginal_cost: Attribute::default(),
            committable: false,
        }
    }

    pub fn bus2(mut self, bus2: impl Into<String>, efficiency2: f64) -> Self {
        self.bus2 = Some(bus2.into());
        self.efficiency2 = efficiency2;
        self
    }

    pub fn carrier(mut self, carrier: impl Into<String>) -> Self {
        self.carrier = Some(carrier.into());
        self
    }

    pub fn efficiency(mut self, efficiency: f64) -> Self {
        self.efficiency = efficiency;
        self
    }

    pub fn p_nom(mut self, p_nom: f64) -> Self {
        self.p_nom = p_nom;
        self
    }

    pub fn p_min_pu(mut self, p_min_pu: f64) -> Self {
        self.p_min_pu = p_min_pu;
        self
    }

    pub fn marginal_cost(mut self, cost: impl Into<Attribute>) -> Self {
        self.marginal_cost = cost.into();
        self
    }

    pub fn committable(mut self) -> Self {
        self.committable = true;
        self
    }

    pub(crate) fn check(&self) -> Result<(), String> {
        if !(self.efficiency.is_finite() && self.efficiency > 0.0) {
            return Err(format!("efficiency must be positive, got {}", self.efficiency));
        }
        if !(self.efficiency2.is_finite() && self.efficiency2 >= 0.0) {
            return Err(format!(
                "efficiency2 must be non-negative, got {}",
                self.efficiency2
            ));
        }
        if !(self.p_nom.is_finite() && self.p_nom > 0.0) {
            return Err(format!("p_nom must be positive, got {}", self.p_nom));
        }
        if !(self.p_max_pu > 0.0 && self.p_max_pu <= 1.0) {
            return Err(format!("p_max_pu must be in (0, 1], got {}", self.p_max_pu));
        }
        if !(self.p_min_pu >= 0.0 && self.p_min_pu <= self.p_max_pu) {
            return Err(format!(
                "p_min_pu must be in [0, p_max_pu], got {}",
                self.p_min_pu
            ));
        }
        Ok(())
    }
}

/// Fixed withdrawal from a bus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Load {
    pub name: String,
    pub bus: String,
    pub carrier: Option<String>,
    pub p_set: Attribute,
}

impl Load {
    pub fn new(name: impl Into<String>, bus: impl Into<String>, p_set: impl Into<Attribute>) -> Self {
        Self {
            name: name.into(),
            bus: bus.into(),
            carrier: None,
            p_set: p_set.into(),
        }
    }

    pub fn carrier(mut self, carrier: impl Into<String>) -> Self {
        self.carrier = Some(carrier.into());
        self
    }
}
