//! Owned ANNarchy network: populations, projections between population
//! views, monitors and the simulation clock.

use crate::neurons::{NeuronType, TypeCatalog, TypeKind};
use crate::{AnnarchyError, Result};
use multiscale_core::{Delay, Params, Time};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Synapse types a projection may use
pub const SYNAPSE_TYPES: &[&str] = &["static_synapse", "STDP", "Hebb"];

pub type PopulationId = usize;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Population {
    pub id: PopulationId,
    pub name: String,
    pub neuron: String,
    pub size: usize,
    pub params: Params,
}

/// Subset of a population, by rank
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopulationView {
    pub population: PopulationId,
    pub ranks: Vec<usize>,
}

impl PopulationView {
    pub fn len(&self) -> usize {
        self.ranks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranks.is_empty()
    }
}

/// Connector of a projection
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Pattern {
    AllToAll,
    OneToOne,
    /// Fixed number of presynaptic neurons per postsynaptic neuron
    FixedNumberPre(usize),
    /// Fixed number of postsynaptic neurons per presynaptic neuron
    FixedNumberPost(usize),
    FixedProbability(f64),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Synapse {
    pub pre: usize,
    pub post: usize,
    pub delay: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    pub id: usize,
    pub pre: PopulationView,
    pub post: PopulationView,
    /// Conductance the projection feeds, e.g. `exc`
    pub target: String,
    pub synapse: String,
    pub pattern: Pattern,
    pub weight: f64,
    pub synapses: Vec<Synapse>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Recording {
    Spikes,
    Variables { variables: Vec<String>, period: Option<Time> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Monitor {
    pub id: usize,
    pub name: String,
    pub recording: Recording,
    pub sources: Vec<PopulationView>,
}

impl Monitor {
    pub fn number_of_neurons(&self) -> usize {
        self.sources.iter().map(PopulationView::len).sum()
    }
}

/// Parameters a projection is made with
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionSpec<'a> {
    pub target: &'a str,
    pub synapse: &'a str,
    pub pattern: Pattern,
    pub allow_self_connections: bool,
    pub weight: f64,
    pub delay: Delay,
}

#[derive(Debug)]
pub struct Network {
    dt: Time,
    time: Time,
    compiled: bool,
    seed: u64,
    catalog: TypeCatalog,
    populations: Vec<Population>,
    projections: Vec<Projection>,
    monitors: Vec<Monitor>,
    rng: StdRng,
}

impl Default for Network {
    fn default() -> Self {
        Self::new(0.1, 42)
    }
}

impl Network {
    pub fn new(dt: Time, seed: u64) -> Self {
        Self {
            dt,
            time: 0.0,
            compiled: false,
            seed,
            catalog: TypeCatalog::builtin(),
            populations: Vec::new(),
            projections: Vec::new(),
            monitors: Vec::new(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Remove every object; registered types stay available
    pub fn clear(&mut self) {
        self.time = 0.0;
        self.compiled = false;
        self.populations.clear();
        self.projections.clear();
        self.monitors.clear();
        self.rng = StdRng::seed_from_u64(self.seed);
    }

    pub fn dt(&self) -> Time {
        self.dt
    }

    pub fn set_dt(&mut self, dt: Time) -> Result<()> {
        if !self.populations.is_empty() {
            return Err(AnnarchyError::Simulation("dt cannot change once populations exist".into()));
        }
        if !(dt > 0.0) {
            return Err(AnnarchyError::InvalidParameter(format!("dt must be positive, got {}", dt)));
        }
        self.dt = dt;
        Ok(())
    }

    pub fn time(&self) -> Time {
        self.time
    }

    pub fn is_compiled(&self) -> bool {
        self.compiled
    }

    pub fn catalog(&self) -> &TypeCatalog {
        &self.catalog
    }

    pub fn register_type(&mut self, neuron: NeuronType) {
        self.catalog.register(neuron);
    }

    pub fn populations(&self) -> &[Population] {
        &self.populations
    }

    pub fn projections(&self) -> &[Projection] {
        &self.projections
    }

    pub fn monitors(&self) -> &[Monitor] {
        &self.monitors
    }

    pub fn population(&self, id: PopulationId) -> Result<&Population> {
        self.populations
            .get(id)
            .ok_or_else(|| AnnarchyError::UnknownPopulation(id.to_string()))
    }

    fn check_open(&self, what: &str) -> Result<()> {
        if self.compiled {
            return Err(AnnarchyError::Simulation(format!("cannot add {} after compile()", what)));
        }
        Ok(())
    }

    fn neuron_type(&self, name: &str) -> Result<&NeuronType> {
        self.catalog
            .get(name)
            .ok_or_else(|| AnnarchyError::UnknownType(name.to_string()))
    }

    /// Merge `params` over the type defaults, rejecting unknown names
    fn checked_params(neuron: &NeuronType, params: &Params) -> Result<Params> {
        let mut merged = neuron.parameters.clone();
        for (key, value) in params {
            if !neuron.parameters.contains_key(key) {
                return Err(AnnarchyError::InvalidParameter(format!(
                    "{} has no parameter {}",
                    neuron.name, key
                )));
            }
            merged.insert(key.clone(), value.clone());
        }
        Ok(merged)
    }

    pub fn add_population(&mut self, name: &str, neuron: &str, size: usize, params: &Params) -> Result<PopulationId> {
        self.check_open("populations")?;
        let neuron_type = self.neuron_type(neuron)?;
        if neuron_type.kind == TypeKind::Monitor {
            return Err(AnnarchyError::InvalidParameter(format!("{} is a monitor", neuron)));
        }
        if size == 0 {
            return Err(AnnarchyError::InvalidParameter(format!("population {} has no neurons", name)));
        }
        let params = Self::checked_params(neuron_type, params)?;
        let id = self.populations.len();
        self.populations.push(Population {
            id,
            name: name.to_string(),
            neuron: neuron.to_string(),
            size,
            params,
        });
        debug!(target: "multiscale::annarchy", "Population {} ({} x {})", name, size, neuron);
        Ok(id)
    }

    /// View of a population; `None` selects every neuron
    pub fn view(&self, id: PopulationId, ranks: Option<&[usize]>) -> Result<PopulationView> {
        let population = self.population(id)?;
        let ranks = match ranks {
            Some(ranks) => {
                if let Some(&bad) = ranks.iter().find(|&&r| r >= population.size) {
                    return Err(AnnarchyError::InvalidParameter(format!(
                        "rank {} out of range for {} of size {}",
                        bad, population.name, population.size
                    )));
                }
                ranks.to_vec()
            }
            None => (0..population.size).collect(),
        };
        Ok(PopulationView { population: id, ranks })
    }

    /// Create a projection; returns the number of synapses
    pub fn connect(&mut self, pre: PopulationView, post: PopulationView, spec: &ProjectionSpec<'_>) -> Result<usize> {
        self.check_open("projections")?;
        if self.neuron_type(&self.population(post.population)?.neuron)?.kind != TypeKind::Neuron {
            return Err(AnnarchyError::Projection(format!(
                "post-synaptic population {} cannot receive projections",
                post.population
            )));
        }
        if spec.target.is_empty() {
            return Err(AnnarchyError::Projection("empty target".into()));
        }
        if !SYNAPSE_TYPES.contains(&spec.synapse) {
            return Err(AnnarchyError::UnknownType(spec.synapse.to_string()));
        }
        let (low, high) = match spec.delay {
            Delay::Constant(d) => (d, d),
            Delay::Uniform { low, high } if low <= high => (low, high),
            other => {
                return Err(AnnarchyError::InvalidParameter(format!("unsupported delay {}", other)));
            }
        };
        if low < 0.0 {
            return Err(AnnarchyError::InvalidParameter(format!("negative delay {}", low)));
        }

        let same = pre.population == post.population;
        let allowed = |i: usize, j: usize| spec.allow_self_connections || !same || i != j;
        let mut pairs = Vec::new();
        match spec.pattern {
            Pattern::AllToAll => {
                for &i in &pre.ranks {
                    pairs.extend(post.ranks.iter().filter(|&&j| allowed(i, j)).map(|&j| (i, j)));
                }
            }
            // pairs up to the smaller view
            Pattern::OneToOne => {
                pairs.extend(pre.ranks.iter().zip(&post.ranks).filter(|(&i, &j)| allowed(i, j)).map(|(&i, &j)| (i, j)));
            }
            Pattern::FixedNumberPre(k) => {
                for &j in &post.ranks {
                    let candidates: Vec<usize> = pre.ranks.iter().copied().filter(|&i| allowed(i, j)).collect();
                    pairs.extend(self.sample(&candidates, k)?.into_iter().map(|i| (i, j)));
                }
            }
            Pattern::FixedNumberPost(k) => {
                for &i in &pre.ranks {
                    let candidates: Vec<usize> = post.ranks.iter().copied().filter(|&j| allowed(i, j)).collect();
                    pairs.extend(self.sample(&candidates, k)?.into_iter().map(|j| (i, j)));
                }
            }
            Pattern::FixedProbability(p) => {
                if !(0.0..=1.0).contains(&p) {
                    return Err(AnnarchyError::InvalidParameter(format!("probability {} not in [0, 1]", p)));
                }
                for &i in &pre.ranks {
                    for &j in &post.ranks {
                        if allowed(i, j) && self.rng.gen_bool(p) {
                            pairs.push((i, j));
                        }
                    }
                }
            }
        }

        let synapses: Vec<Synapse> = pairs
            .into_iter()
            .map(|(pre, post)| Synapse {
                pre,
                post,
                delay: if high > low { self.rng.gen_range(low..high) } else { low },
            })
            .collect();
        let n = synapses.len();
        let id = self.projections.len();
        self.projections.push(Projection {
            id,
            pre,
            post,
            target: spec.target.to_string(),
            synapse: spec.synapse.to_string(),
            pattern: spec.pattern,
            weight: spec.weight,
            synapses,
        });
        debug!(target: "multiscale::annarchy", "Projection {} ({:?}): {} synapses", id, spec.pattern, n);
        Ok(n)
    }

    /// Draw `k` distinct candidates
    fn sample(&mut self, candidates: &[usize], k: usize) -> Result<Vec<usize>> {
        if k > candidates.len() {
            return Err(AnnarchyError::Projection(format!(
                "cannot draw {} distinct neurons out of {}",
                k,
                candidates.len()
            )));
        }
        Ok(candidates.choose_multiple(&mut self.rng, k).copied().collect())
    }

    /// Create a spike or variable monitor without sources
    pub fn add_monitor(&mut self, name: &str, model: &str, params: &Params) -> Result<usize> {
        self.check_open("monitors")?;
        let monitor_type = self.neuron_type(model)?;
        if monitor_type.kind != TypeKind::Monitor {
            return Err(AnnarchyError::InvalidParameter(format!("{} is not a monitor", model)));
        }
        let params = Self::checked_params(monitor_type, params)?;
        let recording = if model == "SpikeMonitor" {
            Recording::Spikes
        } else {
            let variables = params
                .get("variables")
                .and_then(|v| v.as_array())
                .map(|vars| vars.iter().filter_map(|v| v.as_str().map(String::from)).collect())
                .unwrap_or_default();
            Recording::Variables {
                variables,
                period: params.get("period").and_then(|p| p.as_f64()),
            }
        };
        let id = self.monitors.len();
        self.monitors.push(Monitor {
            id,
            name: name.to_string(),
            recording,
            sources: Vec::new(),
        });
        Ok(id)
    }

    /// Record from a population view
    pub fn monitor_view(&mut self, monitor: usize, view: PopulationView) -> Result<()> {
        self.check_open("monitored views")?;
        let neuron = self.neuron_type(&self.population(view.population)?.neuron)?.clone();
        let entry = self
            .monitors
            .get_mut(monitor)
            .ok_or_else(|| AnnarchyError::UnknownPopulation(format!("monitor {}", monitor)))?;
        if let Recording::Variables { variables, .. } = &entry.recording {
            if let Some(missing) = variables.iter().find(|v| !neuron.variables.contains(v)) {
                return Err(AnnarchyError::InvalidParameter(format!(
                    "{} has no variable {}",
                    neuron.name, missing
                )));
            }
        }
        entry.sources.push(view);
        Ok(())
    }

    /// Freeze the network structure
    pub fn compile(&mut self) {
        if !self.compiled {
            info!(
                target: "multiscale::annarchy",
                "Compiling network: {} populations, {} projections, {} monitors",
                self.populations.len(),
                self.projections.len(),
                self.monitors.len()
            );
            self.compiled = true;
        }
    }

    /// Advance by a whole number of steps, compiling first if needed
    pub fn simulate(&mut self, duration: Time) -> Result<()> {
        if !(duration >= 0.0) {
            return Err(AnnarchyError::Simulation(format!("invalid duration {}", duration)));
        }
        self.compile();
        let steps = (duration / self.dt).round();
        self.time += steps * self.dt;
        Ok(())
    }
}
