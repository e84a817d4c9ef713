//! Shared fixtures for unit tests: a configuration context and a recording backend.

use crate::backend::{
    ConnectionFactory, DeviceFactory, DeviceKind, PopulationFactory, SimulationKernel, SpikingPopulation,
};
use crate::connection::SynapseSpec;
use crate::context::ConfigContext;
use multiscale_core::{
    BuilderConfig, ConnectivityRule, Delay, MultiscaleError, NodeIndex, Params, RateSynapseNames, Receptor,
    ResolvedConnSpec, Result, Time, Timing, TvbParams,
};
use std::collections::{BTreeMap, BTreeSet};

pub struct Fixture {
    pub config: BuilderConfig,
    pub tvb: TvbParams,
    pub nodes: Vec<NodeIndex>,
    pub names: RateSynapseNames,
    pub timing: Timing,
}

impl Fixture {
    /// TVB step 0.1 ms, spiking step 0.025 ms, minimum delay 0.05 ms
    pub fn new(n_regions: usize, nodes: &[NodeIndex]) -> Self {
        let config = BuilderConfig {
            tvb_to_spiking_dt_ratio: 4.0,
            ..BuilderConfig::default()
        };
        let tvb = TvbParams::new(n_regions, 0.1);
        let timing = Timing::derive(
            tvb.dt,
            config.tvb_to_spiking_dt_ratio,
            config.default_min_spiking_dt,
            config.default_min_delay_ratio,
            config.default_min_delay,
        )
        .unwrap();
        Self {
            config,
            tvb,
            nodes: nodes.to_vec(),
            names: RateSynapseNames::default(),
            timing,
        }
    }

    pub fn ctx(&self) -> ConfigContext<'_> {
        ConfigContext {
            config: &self.config,
            tvb: &self.tvb,
            nodes: &self.nodes,
            population_order: self.config.population_order,
            timing: self.timing,
            resolution: self.timing.spiking_dt,
            rate_synapses: &self.names,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MockPopulation {
    pub id: usize,
    pub label: String,
    pub model: String,
    pub size: usize,
    pub params: Params,
}

impl SpikingPopulation for MockPopulation {
    fn label(&self) -> &str {
        &self.label
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn size(&self) -> usize {
        self.size
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MockDevice {
    pub model: String,
    pub label: String,
    pub kind: DeviceKind,
    /// (population id, weight, receptor)
    pub targets: Vec<(usize, f64, Receptor)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConnectCall {
    pub source: usize,
    pub target: usize,
    pub source_neurons: Option<Vec<usize>>,
    pub target_neurons: Option<Vec<usize>>,
    pub rule: ConnectivityRule,
    pub synapse: SynapseSpec,
    pub receptor: Receptor,
}

/// Extension module known to the mock: the model it provides and whether it is built
#[derive(Debug, Clone)]
struct MockModule {
    model: String,
    built: bool,
}

#[derive(Debug, Default)]
pub struct MockBackend {
    pub resolution: Time,
    pub time: Time,
    pub resets: usize,
    pub models: BTreeSet<String>,
    modules: BTreeMap<String, MockModule>,
    pub install_calls: Vec<String>,
    pub compile_calls: Vec<(String, bool)>,
    pub compile_fails: bool,
    /// Installs of built modules that still fail
    pub broken_installs: usize,
    pub region_nodes: Vec<(NodeIndex, String)>,
    pub populations: Vec<MockPopulation>,
    pub connects: Vec<ConnectCall>,
    pub devices: Vec<MockDevice>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            resolution: 0.1,
            models: ["iaf_cond_alpha", "izhikevich", "static_synapse", "spike_recorder", "poisson_generator", "multimeter"]
                .iter()
                .map(|m| m.to_string())
                .collect(),
            ..Self::default()
        }
    }

    pub fn with_module(mut self, model: &str, built: bool) -> Self {
        self.modules.insert(
            format!("{}module", model),
            MockModule {
                model: model.to_string(),
                built,
            },
        );
        self
    }
}

impl SimulationKernel for MockBackend {
    fn reset(&mut self) -> Result<()> {
        self.resets += 1;
        self.time = 0.0;
        self.region_nodes.clear();
        self.populations.clear();
        self.connects.clear();
        self.devices.clear();
        Ok(())
    }

    fn configure_resolution(&mut self, resolution: Time) -> Result<()> {
        self.resolution = resolution;
        Ok(())
    }

    fn resolution(&self) -> Time {
        self.resolution
    }

    fn has_model(&self, model: &str) -> bool {
        self.models.contains(model)
    }

    fn install_module(&mut self, module: &str) -> Result<()> {
        self.install_calls.push(module.to_string());
        let failed = |reason: &str| MultiscaleError::ModuleInstall {
            module: module.to_string(),
            reason: reason.to_string(),
        };
        let Some(entry) = self.modules.get(module) else {
            return Err(failed("module not found"));
        };
        if !entry.built {
            return Err(failed("module not built"));
        }
        if self.broken_installs > 0 {
            self.broken_installs -= 1;
            return Err(failed("broken build"));
        }
        self.models.insert(entry.model.clone());
        Ok(())
    }

    fn compile_module(&mut self, module: &str, force: bool) -> Result<()> {
        self.compile_calls.push((module.to_string(), force));
        let failed = |reason: &str| MultiscaleError::ModuleCompile {
            module: module.to_string(),
            reason: reason.to_string(),
        };
        if self.compile_fails {
            return Err(failed("make: *** [install] Error 1"));
        }
        match self.modules.get_mut(module) {
            Some(entry) => {
                entry.built = true;
                Ok(())
            }
            None => Err(failed("no sources")),
        }
    }

    fn simulate(&mut self, duration: Time) -> Result<()> {
        self.time += duration;
        Ok(())
    }

    fn time(&self) -> Time {
        self.time
    }
}

impl PopulationFactory for MockBackend {
    type Population = MockPopulation;

    fn create_region_node(&mut self, node: NodeIndex, label: &str) -> Result<()> {
        self.region_nodes.push((node, label.to_string()));
        Ok(())
    }

    fn create_population(&mut self, label: &str, model: &str, size: usize, params: &Params) -> Result<MockPopulation> {
        if !self.has_model(model) {
            return Err(MultiscaleError::UnknownModel(model.to_string()));
        }
        let population = MockPopulation {
            id: self.populations.len(),
            label: label.to_string(),
            model: model.to_string(),
            size,
            params: params.clone(),
        };
        self.populations.push(population.clone());
        Ok(population)
    }
}

fn count(rule: &ResolvedConnSpec, n_src: usize, n_trg: usize, same: bool) -> usize {
    match rule.rule {
        ConnectivityRule::OneToOne => n_src.min(n_trg),
        ConnectivityRule::FixedIndegree => rule.indegree.unwrap_or(0) * n_trg,
        ConnectivityRule::FixedOutdegree => rule.outdegree.unwrap_or(0) * n_src,
        ConnectivityRule::FixedTotalNumber => rule.n.unwrap_or(0),
        ConnectivityRule::AllToAll | ConnectivityRule::PairwiseBernoulli => {
            let all = n_src * n_trg - if same && !rule.allow_autapses { n_src } else { 0 };
            match rule.p {
                Some(p) if rule.rule == ConnectivityRule::PairwiseBernoulli => (p * all as f64).round() as usize,
                _ => all,
            }
        }
    }
}

impl ConnectionFactory for MockBackend {
    fn connect_populations(
        &mut self,
        source: &MockPopulation,
        source_neurons: Option<&[usize]>,
        target: &MockPopulation,
        target_neurons: Option<&[usize]>,
        conn_spec: &ResolvedConnSpec,
        synapse: &SynapseSpec,
        receptor: &Receptor,
    ) -> Result<usize> {
        let n_src = source_neurons.map_or(source.size, <[usize]>::len);
        let n_trg = target_neurons.map_or(target.size, <[usize]>::len);
        self.connects.push(ConnectCall {
            source: source.id,
            target: target.id,
            source_neurons: source_neurons.map(<[usize]>::to_vec),
            target_neurons: target_neurons.map(<[usize]>::to_vec),
            rule: conn_spec.rule,
            synapse: synapse.clone(),
            receptor: receptor.clone(),
        });
        Ok(count(conn_spec, n_src, n_trg, source.id == target.id))
    }
}

impl DeviceFactory for MockBackend {
    type Device = MockDevice;

    fn build_device(&mut self, model: &str, label: &str, kind: DeviceKind, _params: &Params) -> Result<MockDevice> {
        let model = if model == "spike_multimeter" { "multimeter" } else { model };
        if !self.has_model(model) {
            return Err(MultiscaleError::UnknownModel(model.to_string()));
        }
        Ok(MockDevice {
            model: model.to_string(),
            label: label.to_string(),
            kind,
            targets: Vec::new(),
        })
    }

    fn connect_device(
        &mut self,
        device: &mut MockDevice,
        population: &MockPopulation,
        neurons: Option<&[usize]>,
        weight: f64,
        _delay: &Delay,
        receptor: &Receptor,
    ) -> Result<usize> {
        device.targets.push((population.id, weight, receptor.clone()));
        if let Some(recorded) = self.devices.iter_mut().find(|d| d.label == device.label) {
            *recorded = device.clone();
        } else {
            self.devices.push(device.clone());
        }
        Ok(neurons.map_or(population.size, <[usize]>::len))
    }
}
