//! In-process NEST kernel: node and connection bookkeeping, model catalog,
//! extension modules and the simulation clock.
//!
//! The kernel is an owned value; every builder drives its own instance.

use crate::models::{ModelCatalog, ModelInfo, ModelKind, ModuleSpec};
use crate::{NestError, Result};
use multiscale_core::{Delay, Params, Time};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Synapse model without transmission delay
pub const INSTANTANEOUS_RATE_SYNAPSE: &str = "rate_connection_instantaneous";

/// Delay used when a `SynSpec` carries none (ms)
pub const DEFAULT_DELAY: Time = 1.0;

// ============================================================================
// NODE IDS
// ============================================================================

/// Global node identifier; the first node is 1
pub type NodeId = usize;

/// Ordered node ids, as returned by `create`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NodeCollection {
    pub ids: Vec<NodeId>,
}

impl NodeCollection {
    pub fn new(ids: Vec<NodeId>) -> Self {
        Self { ids }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn first(&self) -> Option<NodeId> {
        self.ids.first().copied()
    }

    pub fn last(&self) -> Option<NodeId> {
        self.ids.last().copied()
    }

    /// Sub-collection at local positions
    pub fn select(&self, positions: &[usize]) -> Result<Self> {
        positions
            .iter()
            .map(|&i| {
                self.ids.get(i).copied().ok_or_else(|| {
                    NestError::InvalidParameter(format!("index {} out of range for {} nodes", i, self.len()))
                })
            })
            .collect::<Result<Vec<_>>>()
            .map(Self::new)
    }
}

impl<'a> IntoIterator for &'a NodeCollection {
    type Item = &'a NodeId;
    type IntoIter = std::slice::Iter<'a, NodeId>;

    fn into_iter(self) -> Self::IntoIter {
        self.ids.iter()
    }
}

// ============================================================================
// CONNECTIONS
// ============================================================================

/// Connectivity rule with its parameter
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnRule {
    AllToAll,
    OneToOne,
    FixedIndegree(usize),
    FixedOutdegree(usize),
    FixedTotalNumber(usize),
    PairwiseBernoulli(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConnSpec {
    pub rule: ConnRule,
    pub allow_autapses: bool,
    pub allow_multapses: bool,
}

impl Default for ConnSpec {
    fn default() -> Self {
        Self {
            rule: ConnRule::AllToAll,
            allow_autapses: true,
            allow_multapses: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynSpec {
    pub model: String,
    pub weight: f64,
    /// `None` for instantaneous rate synapses
    pub delay: Option<Delay>,
    pub receptor_type: usize,
    pub params: Params,
}

impl SynSpec {
    pub fn new(model: impl Into<String>, weight: f64, delay: Option<Delay>) -> Self {
        Self {
            model: model.into(),
            weight,
            delay,
            receptor_type: 0,
            params: Params::new(),
        }
    }
}

/// A created synapse
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub source: NodeId,
    pub target: NodeId,
    pub weight: f64,
    pub delay: Option<f64>,
    pub synapse_model: String,
    pub receptor_type: usize,
}

/// Node state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeState {
    pub id: NodeId,
    pub model: String,
    pub params: Params,
}

// ============================================================================
// KERNEL
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KernelParams {
    /// ms
    pub resolution: Time,
    /// Time grid of the kernel (ms)
    pub tic: Time,
    pub rng_seed: u64,
}

impl Default for KernelParams {
    fn default() -> Self {
        Self {
            resolution: 0.1,
            tic: 0.001,
            rng_seed: 12345,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NestKernel {
    params: KernelParams,
    time: Time,
    next_node_id: NodeId,
    nodes: BTreeMap<NodeId, NodeState>,
    connections: Vec<Connection>,
    catalog: ModelCatalog,
    modules: BTreeMap<String, ModuleSpec>,
    installed: BTreeSet<String>,
    /// Directory holding `<module>/lib<module>.so`
    module_path: PathBuf,
    rng: StdRng,
}

impl NestKernel {
    pub fn new(module_path: impl Into<PathBuf>) -> Self {
        let params = KernelParams::default();
        Self {
            rng: StdRng::seed_from_u64(params.rng_seed),
            params,
            time: 0.0,
            next_node_id: 1,
            nodes: BTreeMap::new(),
            connections: Vec::new(),
            catalog: ModelCatalog::builtin(),
            modules: BTreeMap::new(),
            installed: BTreeSet::new(),
            module_path: module_path.into(),
        }
    }

    /// Drop all nodes and connections and restore the default kernel parameters.
    ///
    /// Installed modules stay loaded.
    pub fn reset(&mut self) {
        self.params = KernelParams::default();
        self.rng = StdRng::seed_from_u64(self.params.rng_seed);
        self.time = 0.0;
        self.next_node_id = 1;
        self.nodes.clear();
        self.connections.clear();
        debug!(target: "multiscale::nest", "Kernel reset");
    }

    pub fn params(&self) -> &KernelParams {
        &self.params
    }

    pub fn resolution(&self) -> Time {
        self.params.resolution
    }

    pub fn time(&self) -> Time {
        self.time
    }

    pub fn set_resolution(&mut self, resolution: Time) -> Result<()> {
        if !self.nodes.is_empty() {
            return Err(NestError::SimulationError(
                "the resolution cannot be changed after nodes have been created".into(),
            ));
        }
        let tics = (resolution / self.params.tic).round();
        if !(tics >= 1.0) {
            return Err(NestError::InvalidParameter(format!(
                "resolution {} is not a positive multiple of the tic {}",
                resolution, self.params.tic
            )));
        }
        self.params.resolution = tics * self.params.tic;
        Ok(())
    }

    pub fn set_rng_seed(&mut self, seed: u64) {
        self.params.rng_seed = seed;
        self.rng = StdRng::seed_from_u64(seed);
    }

    pub fn catalog(&self) -> &ModelCatalog {
        &self.catalog
    }

    pub fn module_path(&self) -> &Path {
        &self.module_path
    }

    /// Make a module's sources known; its models appear once it is installed
    pub fn register_module(&mut self, module: ModuleSpec) {
        self.modules.insert(module.name.clone(), module);
    }

    /// Shared library a module is loaded from
    pub fn module_library(&self, module: &str) -> PathBuf {
        self.module_path.join(module).join(format!("lib{}.so", module))
    }

    pub fn is_installed(&self, module: &str) -> bool {
        self.installed.contains(module)
    }

    /// Load a built module and register its models
    pub fn install(&mut self, module: &str) -> Result<()> {
        if self.installed.contains(module) {
            return Ok(());
        }
        let spec = self
            .modules
            .get(module)
            .ok_or_else(|| NestError::ModuleNotFound(module.to_string()))?;
        let library = self.module_library(module);
        if !library.is_file() {
            return Err(NestError::ModuleNotBuilt {
                module: module.to_string(),
                path: library,
            });
        }
        for model in &spec.models {
            self.catalog.register(model.clone());
        }
        info!(
            target: "multiscale::nest",
            "Installed module {} ({} models)", module, spec.models.len()
        );
        self.installed.insert(module.to_string());
        Ok(())
    }

    fn model(&self, name: &str) -> Result<&ModelInfo> {
        self.catalog
            .get(name)
            .ok_or_else(|| NestError::UnknownModel(name.to_string()))
    }

    fn checked_params(info: &ModelInfo, params: &Params) -> Result<Params> {
        let mut merged = info.defaults.clone();
        for (key, value) in params {
            if !info.defaults.contains_key(key) {
                return Err(NestError::InvalidParameter(format!(
                    "unused parameter {} for model {}",
                    key, info.name
                )));
            }
            merged.insert(key.clone(), value.clone());
        }
        Ok(merged)
    }

    /// Create `n` nodes of a neuron or device model
    pub fn create(&mut self, model: &str, n: usize, params: &Params) -> Result<NodeCollection> {
        let info = self.model(model)?;
        if info.kind == ModelKind::Synapse {
            return Err(NestError::InvalidParameter(format!("{} is a synapse model", model)));
        }
        if n == 0 {
            return Err(NestError::InvalidParameter(format!("cannot create 0 nodes of {}", model)));
        }
        let params = Self::checked_params(info, params)?;
        let name = info.name.clone();
        let first = self.next_node_id;
        self.next_node_id += n;
        for id in first..first + n {
            self.nodes.insert(
                id,
                NodeState {
                    id,
                    model: name.clone(),
                    params: params.clone(),
                },
            );
        }
        Ok(NodeCollection::new((first..first + n).collect()))
    }

    pub fn node(&self, id: NodeId) -> Result<&NodeState> {
        self.nodes.get(&id).ok_or(NestError::NodeNotFound(id))
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn set_status(&mut self, nodes: &NodeCollection, params: &Params) -> Result<()> {
        for &id in nodes {
            let model = self.node(id)?.model.clone();
            Self::checked_params(self.model(&model)?, params)?;
            if let Some(node) = self.nodes.get_mut(&id) {
                node.params.extend(params.iter().map(|(k, v)| (k.clone(), v.clone())));
            }
        }
        Ok(())
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn num_connections(&self) -> usize {
        self.connections.len()
    }

    /// Connect two node collections; returns the number of synapses created
    pub fn connect(
        &mut self,
        sources: &NodeCollection,
        targets: &NodeCollection,
        conn: &ConnSpec,
        syn: &SynSpec,
    ) -> Result<usize> {
        let synapse = self.model(&syn.model)?;
        if synapse.kind != ModelKind::Synapse {
            return Err(NestError::InvalidParameter(format!("{} is not a synapse model", syn.model)));
        }
        let synapse_model = synapse.name.clone();
        let delay = self.check_delay(&synapse_model, syn.delay)?;

        let mut checked_models = BTreeSet::new();
        for &target in targets {
            let model = &self.node(target)?.model;
            if checked_models.insert(model.clone()) {
                let ports = self.model(model)?.receptor_ports;
                if syn.receptor_type >= ports {
                    return Err(NestError::ConnectionError(format!(
                        "unknown receptor type {} for model {} with {} receptor port(s)",
                        syn.receptor_type, model, ports
                    )));
                }
            }
        }

        let pairs = self.pairs(&sources.ids, &targets.ids, conn)?;
        let n = pairs.len();
        for (source, target) in pairs {
            let sampled = delay.map(|d| self.sample_delay(&d));
            self.connections.push(Connection {
                source,
                target,
                weight: syn.weight,
                delay: sampled,
                synapse_model: synapse_model.clone(),
                receptor_type: syn.receptor_type,
            });
        }
        debug!(
            target: "multiscale::nest",
            "Connected {} -> {} nodes with {:?}: {} synapses", sources.len(), targets.len(), conn.rule, n
        );
        Ok(n)
    }

    fn check_delay(&self, synapse_model: &str, delay: Option<Delay>) -> Result<Option<Delay>> {
        if synapse_model == INSTANTANEOUS_RATE_SYNAPSE {
            return match delay {
                None => Ok(None),
                Some(d) if d.is_zero() => Ok(None),
                Some(d) => Err(NestError::InvalidParameter(format!("{} has no delay, got {}", synapse_model, d))),
            };
        }
        let delay = delay.unwrap_or(Delay::Constant(DEFAULT_DELAY));
        let min = match delay {
            Delay::Constant(d) => d,
            Delay::Uniform { low, high } if low <= high => low,
            other => {
                return Err(NestError::InvalidParameter(format!("unsupported delay distribution {}", other)));
            }
        };
        // tolerate rounding of delays computed from the resolution
        if min < self.params.resolution - self.params.tic / 2.0 {
            return Err(NestError::InvalidParameter(format!(
                "delay {} is smaller than the resolution {}",
                min, self.params.resolution
            )));
        }
        Ok(Some(delay))
    }

    fn sample_delay(&mut self, delay: &Delay) -> f64 {
        match *delay {
            Delay::Uniform { low, high } if high > low => self.rng.gen_range(low..high),
            Delay::Uniform { low, .. } => low,
            Delay::Constant(d) => d,
            Delay::Normal { mean, .. } => mean,
        }
    }

    fn pairs(&mut self, sources: &[NodeId], targets: &[NodeId], conn: &ConnSpec) -> Result<Vec<(NodeId, NodeId)>> {
        let allowed = |s: NodeId, t: NodeId| conn.allow_autapses || s != t;
        let mut pairs = Vec::new();
        match conn.rule {
            ConnRule::AllToAll => {
                for &s in sources {
                    pairs.extend(targets.iter().filter(|&&t| allowed(s, t)).map(|&t| (s, t)));
                }
            }
            // pairs up to the smaller collection
            ConnRule::OneToOne => {
                pairs.extend(sources.iter().zip(targets).filter(|(&s, &t)| allowed(s, t)).map(|(&s, &t)| (s, t)));
            }
            ConnRule::FixedIndegree(k) => {
                for &t in targets {
                    let candidates: Vec<NodeId> = sources.iter().copied().filter(|&s| allowed(s, t)).collect();
                    for s in self.draw(&candidates, k, conn.allow_multapses, "indegree")? {
                        pairs.push((s, t));
                    }
                }
            }
            ConnRule::FixedOutdegree(k) => {
                for &s in sources {
                    let candidates: Vec<NodeId> = targets.iter().copied().filter(|&t| allowed(s, t)).collect();
                    for t in self.draw(&candidates, k, conn.allow_multapses, "outdegree")? {
                        pairs.push((s, t));
                    }
                }
            }
            ConnRule::FixedTotalNumber(n) => {
                let mut candidates = Vec::with_capacity(sources.len() * targets.len());
                for &s in sources {
                    candidates.extend(targets.iter().filter(|&&t| allowed(s, t)).map(|&t| (s, t)));
                }
                pairs = self.draw(&candidates, n, conn.allow_multapses, "N")?;
            }
            ConnRule::PairwiseBernoulli(p) => {
                if !(0.0..=1.0).contains(&p) {
                    return Err(NestError::InvalidParameter(format!("probability {} not in [0, 1]", p)));
                }
                for &s in sources {
                    for &t in targets {
                        if allowed(s, t) && self.rng.gen_bool(p) {
                            pairs.push((s, t));
                        }
                    }
                }
            }
        }
        Ok(pairs)
    }

    /// Draw `k` candidates, with replacement when multapses are allowed
    fn draw<T: Copy>(&mut self, candidates: &[T], k: usize, multapses: bool, what: &str) -> Result<Vec<T>> {
        if k == 0 {
            return Ok(Vec::new());
        }
        if candidates.is_empty() || (!multapses && k > candidates.len()) {
            return Err(NestError::ConnectionError(format!(
                "{} {} exceeds the {} available connection(s)",
                what,
                k,
                candidates.len()
            )));
        }
        if multapses {
            Ok((0..k).map(|_| candidates[self.rng.gen_range(0..candidates.len())]).collect())
        } else {
            Ok(candidates.choose_multiple(&mut self.rng, k).copied().collect())
        }
    }

    /// Advance the clock by a whole number of resolution steps
    pub fn simulate(&mut self, duration: Time) -> Result<()> {
        if !(duration >= 0.0) {
            return Err(NestError::SimulationError(format!("invalid simulation time {}", duration)));
        }
        let steps = (duration / self.params.resolution).round();
        self.time += steps * self.params.resolution;
        debug!(target: "multiscale::nest", "Simulated {} steps, t = {} ms", steps, self.time);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kernel() -> NestKernel {
        NestKernel::new("target/nest-modules")
    }

    fn params(pairs: &[(&str, f64)]) -> Params {
        pairs.iter().map(|(k, v)| (k.to_string(), (*v).into())).collect()
    }

    #[test]
    fn test_node_collection() {
        let nodes = NodeCollection::new(vec![1, 2, 3, 4, 5]);
        assert_eq!(nodes.len(), 5);
        assert_eq!(nodes.first(), Some(1));
        assert_eq!(nodes.last(), Some(5));
        assert_eq!(nodes.select(&[1, 2]).unwrap().ids, vec![2, 3]);
        assert!(nodes.select(&[5]).is_err());
    }

    #[test]
    fn test_create_and_params() {
        let mut k = kernel();
        let a = k.create("iaf_cond_alpha", 10, &params(&[("I_e", 5.0)])).unwrap();
        let b = k.create("izhikevich", 5, &Params::new()).unwrap();
        assert_eq!(a.ids, (1..=10).collect::<Vec<_>>());
        assert_eq!(b.first(), Some(11));
        assert_eq!(k.node(3).unwrap().params["I_e"], 5.0);
        assert_eq!(k.node(3).unwrap().params["E_in"], -85.0);

        assert!(matches!(
            k.create("iaf_cond_alpha", 1, &params(&[("tau_w", 1.0)])),
            Err(NestError::InvalidParameter(_))
        ));
        assert!(matches!(k.create("nope", 1, &Params::new()), Err(NestError::UnknownModel(_))));
        assert!(k.create("static_synapse", 1, &Params::new()).is_err());

        k.set_status(&b, &params(&[("a", 0.1)])).unwrap();
        assert_eq!(k.node(12).unwrap().params["a"], 0.1);
    }

    #[test]
    fn test_resolution_grid() {
        let mut k = kernel();
        k.set_resolution(0.0249).unwrap();
        assert!((k.resolution() - 0.025).abs() < 1e-12);
        assert!(k.set_resolution(0.0001).is_err());
        k.create("iaf_psc_alpha", 1, &Params::new()).unwrap();
        assert!(k.set_resolution(0.1).is_err());
        k.reset();
        assert_eq!(k.resolution(), 0.1);
        assert_eq!(k.num_nodes(), 0);
    }

    #[test]
    fn test_connection_rules() {
        let mut k = kernel();
        let a = k.create("iaf_psc_alpha", 10, &Params::new()).unwrap();
        let b = k.create("iaf_psc_alpha", 8, &Params::new()).unwrap();
        let syn = SynSpec::new("static_synapse", 1.0, Some(Delay::Constant(1.0)));
        let spec = |rule| ConnSpec {
            rule,
            ..ConnSpec::default()
        };

        assert_eq!(k.connect(&a, &b, &spec(ConnRule::AllToAll), &syn).unwrap(), 80);
        assert_eq!(k.connect(&a, &b, &spec(ConnRule::FixedIndegree(3)), &syn).unwrap(), 24);
        assert_eq!(k.connect(&a, &b, &spec(ConnRule::FixedOutdegree(2)), &syn).unwrap(), 20);
        assert_eq!(k.connect(&a, &b, &spec(ConnRule::FixedTotalNumber(7)), &syn).unwrap(), 7);
        assert_eq!(k.connect(&a, &b, &spec(ConnRule::OneToOne), &syn).unwrap(), 8);
        assert_eq!(k.connect(&a, &a, &spec(ConnRule::OneToOne), &syn).unwrap(), 10);

        let no_autapses = ConnSpec {
            rule: ConnRule::AllToAll,
            allow_autapses: false,
            allow_multapses: true,
        };
        assert_eq!(k.connect(&a, &a, &no_autapses, &syn).unwrap(), 90);

        let strict = ConnSpec {
            rule: ConnRule::FixedIndegree(11),
            allow_autapses: true,
            allow_multapses: false,
        };
        assert!(k.connect(&a, &b, &strict, &syn).is_err());
        assert_eq!(k.num_connections(), 80 + 24 + 20 + 7 + 8 + 10 + 90);
    }

    #[test]
    fn test_fixed_indegree_without_multapses_is_distinct() {
        let mut k = kernel();
        let a = k.create("iaf_psc_alpha", 6, &Params::new()).unwrap();
        let syn = SynSpec::new("static_synapse", 1.0, Some(Delay::Constant(0.5)));
        let spec = ConnSpec {
            rule: ConnRule::FixedIndegree(5),
            allow_autapses: false,
            allow_multapses: false,
        };
        k.connect(&a, &a, &spec, &syn).unwrap();
        for &t in &a {
            let sources: BTreeSet<_> = k.connections().iter().filter(|c| c.target == t).map(|c| c.source).collect();
            assert_eq!(sources.len(), 5);
            assert!(!sources.contains(&t));
        }
    }

    #[test]
    fn test_synapse_checks() {
        let mut k = kernel();
        let a = k.create("iaf_psc_alpha", 2, &Params::new()).unwrap();
        let spec = ConnSpec::default();

        let short = SynSpec::new("static_synapse", 1.0, Some(Delay::Constant(0.01)));
        assert!(k.connect(&a, &a, &spec, &short).is_err());

        let mut port = SynSpec::new("static_synapse", 1.0, Some(Delay::Constant(1.0)));
        port.receptor_type = 1;
        assert!(matches!(k.connect(&a, &a, &spec, &port), Err(NestError::ConnectionError(_))));

        let instantaneous = SynSpec::new(INSTANTANEOUS_RATE_SYNAPSE, 1.0, None);
        k.connect(&a, &a, &spec, &instantaneous).unwrap();
        assert!(k.connections().iter().all(|c| c.delay.is_none()));

        let uniform = SynSpec::new(
            "static_synapse",
            1.0,
            Some(Delay::Uniform { low: 1.0, high: 2.0 }),
        );
        k.connect(&a, &a, &spec, &uniform).unwrap();
        assert!(k
            .connections()
            .iter()
            .filter_map(|c| c.delay)
            .all(|d| (1.0..2.0).contains(&d)));
        assert!(k.connect(&a, &a, &spec, &SynSpec::new("iaf_psc_alpha", 1.0, None)).is_err());
    }

    #[test]
    fn test_simulate() {
        let mut k = kernel();
        k.simulate(10.0).unwrap();
        k.simulate(0.04).unwrap();
        assert!((k.time() - 10.0).abs() < 1e-9);
        assert!(k.simulate(-1.0).is_err());
    }

    #[test]
    fn test_install_requires_library() {
        let dir = tempfile::tempdir().unwrap();
        let mut k = NestKernel::new(dir.path());
        assert!(matches!(k.install("xmodule"), Err(NestError::ModuleNotFound(_))));
        k.register_module(ModuleSpec {
            name: "xmodule".into(),
            models: vec![ModelInfo::new("x_neuron", ModelKind::Neuron, Params::new())],
        });
        assert!(matches!(k.install("xmodule"), Err(NestError::ModuleNotBuilt { .. })));
        let library = k.module_library("xmodule");
        std::fs::create_dir_all(library.parent().unwrap()).unwrap();
        std::fs::write(&library, b"").unwrap();
        k.install("xmodule").unwrap();
        assert!(k.catalog().contains("x_neuron"));
        k.reset();
        assert!(k.is_installed("xmodule"));
        assert!(k.catalog().contains("x_neuron"));
    }
}
