//! Builder backend on top of an ANNarchy [`Network`].

use crate::network::{Network, Pattern, PopulationId, ProjectionSpec};
use crate::neurons::{NeuronType, TypeKind};
use crate::AnnarchyError;
use multiscale_builder::backend::{
    ConnectionFactory, DeviceFactory, DeviceKind, PopulationFactory, SimulationKernel, SpikingPopulation,
};
use multiscale_builder::SynapseSpec;
use multiscale_core::{ConnectivityRule, Delay, NodeIndex, Params, Receptor, ResolvedConnSpec, Result, Time};
use serde::Serialize;
use tracing::{debug, warn};

/// Device parameter giving the size of a spike source population
pub const GEOMETRY: &str = "geometry";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnarchyPopulation {
    pub label: String,
    pub neuron: String,
    pub id: PopulationId,
    pub size: usize,
}

impl SpikingPopulation for AnnarchyPopulation {
    fn label(&self) -> &str {
        &self.label
    }

    fn model(&self) -> &str {
        &self.neuron
    }

    fn size(&self) -> usize {
        self.size
    }
}

/// What a device is in the network
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DeviceHandle {
    /// Spike source population projecting onto its targets
    Source(PopulationId),
    Monitor(usize),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnarchyDevice {
    pub label: String,
    pub model: String,
    pub kind: DeviceKind,
    pub handle: DeviceHandle,
    pub number_of_neurons: usize,
}

#[derive(Debug, Default)]
pub struct AnnarchyBackend {
    network: Network,
}

impl AnnarchyBackend {
    pub fn new(network: Network) -> Self {
        Self { network }
    }

    /// Make a user-defined neuron type available to population templates
    pub fn register_type(mut self, neuron: NeuronType) -> Self {
        self.network.register_type(neuron);
        self
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn network_mut(&mut self) -> &mut Network {
        &mut self.network
    }
}

/// Port numbers 0 and 1 name the excitatory and inhibitory conductances
fn target(receptor: &Receptor) -> Result<String> {
    match receptor {
        Receptor::Index(0) => Ok("exc".into()),
        Receptor::Index(1) => Ok("inh".into()),
        Receptor::Index(i) => Err(AnnarchyError::InvalidParameter(format!("no target for receptor type {}", i)).into()),
        Receptor::Name(name) => Ok(name.clone()),
    }
}

fn pattern(spec: &ResolvedConnSpec) -> Result<Pattern> {
    let missing = |param: &str| AnnarchyError::InvalidParameter(format!("{} needs {}", spec.rule.as_str(), param));
    Ok(match spec.rule {
        ConnectivityRule::AllToAll => Pattern::AllToAll,
        ConnectivityRule::OneToOne => Pattern::OneToOne,
        ConnectivityRule::FixedIndegree => Pattern::FixedNumberPre(spec.indegree.ok_or_else(|| missing("indegree"))?),
        ConnectivityRule::FixedOutdegree => {
            Pattern::FixedNumberPost(spec.outdegree.ok_or_else(|| missing("outdegree"))?)
        }
        ConnectivityRule::PairwiseBernoulli => Pattern::FixedProbability(spec.p.ok_or_else(|| missing("p"))?),
        ConnectivityRule::FixedTotalNumber => {
            return Err(AnnarchyError::UnsupportedRule(spec.rule.as_str().to_string()).into());
        }
    })
}

impl SimulationKernel for AnnarchyBackend {
    fn reset(&mut self) -> Result<()> {
        self.network.clear();
        Ok(())
    }

    fn configure_resolution(&mut self, resolution: Time) -> Result<()> {
        Ok(self.network.set_dt(resolution)?)
    }

    fn resolution(&self) -> Time {
        self.network.dt()
    }

    fn min_delay(&self) -> Option<Time> {
        Some(self.network.dt())
    }

    fn has_model(&self, model: &str) -> bool {
        self.network.catalog().contains(model)
    }

    fn install_module(&mut self, module: &str) -> Result<()> {
        Err(AnnarchyError::Extension(module.to_string()).into())
    }

    fn compile_module(&mut self, module: &str, _force: bool) -> Result<()> {
        Err(AnnarchyError::Compile(module.to_string()).into())
    }

    fn simulate(&mut self, duration: Time) -> Result<()> {
        Ok(self.network.simulate(duration)?)
    }

    fn time(&self) -> Time {
        self.network.time()
    }
}

impl PopulationFactory for AnnarchyBackend {
    type Population = AnnarchyPopulation;

    fn create_region_node(&mut self, node: NodeIndex, label: &str) -> Result<()> {
        debug!(target: "multiscale::annarchy", "Region node {} ({})", node, label);
        Ok(())
    }

    fn create_population(&mut self, label: &str, model: &str, size: usize, params: &Params) -> Result<AnnarchyPopulation> {
        let id = self.network.add_population(label, model, size, params)?;
        Ok(AnnarchyPopulation {
            label: label.to_string(),
            neuron: model.to_string(),
            id,
            size,
        })
    }
}

impl ConnectionFactory for AnnarchyBackend {
    fn connect_populations(
        &mut self,
        source: &AnnarchyPopulation,
        source_neurons: Option<&[usize]>,
        target_population: &AnnarchyPopulation,
        target_neurons: Option<&[usize]>,
        conn_spec: &ResolvedConnSpec,
        synapse: &SynapseSpec,
        receptor: &Receptor,
    ) -> Result<usize> {
        if conn_spec.allow_multapses && !matches!(conn_spec.rule, ConnectivityRule::AllToAll | ConnectivityRule::OneToOne) {
            debug!(target: "multiscale::annarchy", "Projections have no multapses; drawing distinct partners");
        }
        let pre = self.network.view(source.id, source_neurons)?;
        let post = self.network.view(target_population.id, target_neurons)?;
        let target_name = target(receptor)?;
        let spec = ProjectionSpec {
            target: &target_name,
            synapse: &synapse.model,
            pattern: pattern(conn_spec)?,
            allow_self_connections: conn_spec.allow_autapses,
            weight: synapse.weight,
            delay: synapse.delay.unwrap_or(Delay::Constant(self.network.dt())),
        };
        Ok(self.network.connect(pre, post, &spec)?)
    }
}

impl DeviceFactory for AnnarchyBackend {
    type Device = AnnarchyDevice;

    fn build_device(&mut self, model: &str, label: &str, kind: DeviceKind, params: &Params) -> Result<AnnarchyDevice> {
        let type_kind = self
            .network
            .catalog()
            .get(model)
            .map(|t| t.kind)
            .ok_or_else(|| AnnarchyError::UnknownType(model.to_string()))?;
        let handle = match (type_kind, kind) {
            (TypeKind::SpikeSource, DeviceKind::Input) => {
                let mut params = params.clone();
                let size = match params.remove(GEOMETRY) {
                    Some(value) => value
                        .as_u64()
                        .and_then(|n| usize::try_from(n).ok())
                        .ok_or_else(|| AnnarchyError::InvalidParameter(format!("invalid {} {}", GEOMETRY, value)))?,
                    None => 1,
                };
                DeviceHandle::Source(self.network.add_population(label, model, size, &params)?)
            }
            (TypeKind::Monitor, DeviceKind::Output) => DeviceHandle::Monitor(self.network.add_monitor(label, model, params)?),
            _ => {
                return Err(AnnarchyError::InvalidParameter(format!("{} cannot be used as an {:?} device", model, kind)).into());
            }
        };
        Ok(AnnarchyDevice {
            label: label.to_string(),
            model: model.to_string(),
            kind,
            handle,
            number_of_neurons: 0,
        })
    }

    fn connect_device(
        &mut self,
        device: &mut AnnarchyDevice,
        population: &AnnarchyPopulation,
        neurons: Option<&[usize]>,
        weight: f64,
        delay: &Delay,
        receptor: &Receptor,
    ) -> Result<usize> {
        let view = self.network.view(population.id, neurons)?;
        let n = view.len();
        match device.handle {
            DeviceHandle::Monitor(monitor) => {
                if weight != 1.0 {
                    warn!(target: "multiscale::annarchy", "Weight {} of monitor {} is ignored", weight, device.label);
                }
                self.network.monitor_view(monitor, view)?;
                device.number_of_neurons += n;
                Ok(n)
            }
            DeviceHandle::Source(source) => {
                let target_name = target(receptor)?;
                let spec = ProjectionSpec {
                    target: &target_name,
                    synapse: "static_synapse",
                    pattern: Pattern::AllToAll,
                    allow_self_connections: true,
                    weight,
                    delay: *delay,
                };
                let pre = self.network.view(source, None)?;
                let synapses = self.network.connect(pre, view, &spec)?;
                device.number_of_neurons += n;
                Ok(synapses)
            }
        }
    }
}
