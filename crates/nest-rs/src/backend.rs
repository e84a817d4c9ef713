//! Builder backend on top of [`NestKernel`].

use crate::compile::{CommandCompiler, ModuleCompiler};
use crate::kernel::{ConnRule, ConnSpec, NestKernel, NodeCollection, NodeId, SynSpec};
use crate::models::{ModelKind, ModuleSpec};
use crate::NestError;
use multiscale_builder::backend::{
    ConnectionFactory, DeviceFactory, DeviceKind, PopulationFactory, SimulationKernel, SpikingPopulation,
};
use multiscale_builder::SynapseSpec;
use multiscale_core::{
    ConnectivityRule, Delay, ExtensionConfig, NodeIndex, Params, Receptor, ResolvedConnSpec, Result, Time,
};
use serde::Serialize;
use tracing::debug;

/// A population created in the kernel
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NestPopulation {
    pub label: String,
    pub model: String,
    pub nodes: NodeCollection,
}

impl SpikingPopulation for NestPopulation {
    fn label(&self) -> &str {
        &self.label
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn size(&self) -> usize {
        self.nodes.len()
    }
}

/// A recording or stimulating device and the neurons it is connected to
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NestDevice {
    pub label: String,
    pub model: String,
    pub kind: DeviceKind,
    pub node: NodeId,
    pub neurons: Vec<NodeId>,
}

impl NestDevice {
    pub fn number_of_neurons(&self) -> usize {
        self.neurons.len()
    }
}

/// NEST kernel with extension module compilation
#[derive(Debug)]
pub struct NestBackend<C = CommandCompiler> {
    kernel: NestKernel,
    extensions: ExtensionConfig,
    compiler: C,
}

impl NestBackend<CommandCompiler> {
    pub fn new(extensions: ExtensionConfig) -> Self {
        Self::with_compiler(extensions, CommandCompiler)
    }
}

impl Default for NestBackend<CommandCompiler> {
    fn default() -> Self {
        Self::new(ExtensionConfig::default())
    }
}

impl<C: ModuleCompiler> NestBackend<C> {
    /// Modules are built into and loaded from `extensions.build_dir`
    pub fn with_compiler(extensions: ExtensionConfig, compiler: C) -> Self {
        Self {
            kernel: NestKernel::new(extensions.build_dir.clone()),
            extensions,
            compiler,
        }
    }

    pub fn register_module(mut self, module: ModuleSpec) -> Self {
        self.kernel.register_module(module);
        self
    }

    pub fn kernel(&self) -> &NestKernel {
        &self.kernel
    }

    pub fn kernel_mut(&mut self) -> &mut NestKernel {
        &mut self.kernel
    }

    pub fn extensions(&self) -> &ExtensionConfig {
        &self.extensions
    }
}

fn receptor_port(receptor: &Receptor) -> Result<usize> {
    match receptor {
        Receptor::Index(i) => usize::try_from(*i)
            .map_err(|_| NestError::InvalidParameter(format!("negative receptor type {}", i)).into()),
        Receptor::Name(name) => {
            Err(NestError::InvalidParameter(format!("receptor types are port numbers, got '{}'", name)).into())
        }
    }
}

fn conn_rule(spec: &ResolvedConnSpec) -> Result<ConnRule> {
    let missing = |param: &str| NestError::InvalidParameter(format!("{} needs {}", spec.rule.as_str(), param));
    Ok(match spec.rule {
        ConnectivityRule::AllToAll => ConnRule::AllToAll,
        ConnectivityRule::OneToOne => ConnRule::OneToOne,
        ConnectivityRule::FixedIndegree => ConnRule::FixedIndegree(spec.indegree.ok_or_else(|| missing("indegree"))?),
        ConnectivityRule::FixedOutdegree => {
            ConnRule::FixedOutdegree(spec.outdegree.ok_or_else(|| missing("outdegree"))?)
        }
        ConnectivityRule::FixedTotalNumber => ConnRule::FixedTotalNumber(spec.n.ok_or_else(|| missing("N"))?),
        ConnectivityRule::PairwiseBernoulli => ConnRule::PairwiseBernoulli(spec.p.ok_or_else(|| missing("p"))?),
    })
}

fn selection(nodes: &NodeCollection, neurons: Option<&[usize]>) -> Result<NodeCollection> {
    match neurons {
        Some(positions) => Ok(nodes.select(positions)?),
        None => Ok(nodes.clone()),
    }
}

impl<C: ModuleCompiler> SimulationKernel for NestBackend<C> {
    fn reset(&mut self) -> Result<()> {
        self.kernel.reset();
        Ok(())
    }

    fn configure_resolution(&mut self, resolution: Time) -> Result<()> {
        Ok(self.kernel.set_resolution(resolution)?)
    }

    fn resolution(&self) -> Time {
        self.kernel.resolution()
    }

    fn min_delay(&self) -> Option<Time> {
        Some(self.kernel.resolution())
    }

    fn min_spiking_dt(&self) -> Option<Time> {
        Some(self.kernel.params().tic)
    }

    fn has_model(&self, model: &str) -> bool {
        self.kernel.catalog().contains(model)
    }

    fn install_module(&mut self, module: &str) -> Result<()> {
        Ok(self.kernel.install(module)?)
    }

    fn compile_module(&mut self, module: &str, force: bool) -> Result<()> {
        let model = module.strip_suffix("module").unwrap_or(module);
        self.compiler.compile(module, model, &self.extensions, force)?;
        Ok(())
    }

    fn simulate(&mut self, duration: Time) -> Result<()> {
        Ok(self.kernel.simulate(duration)?)
    }

    fn time(&self) -> Time {
        self.kernel.time()
    }
}

impl<C: ModuleCompiler> PopulationFactory for NestBackend<C> {
    type Population = NestPopulation;

    fn create_region_node(&mut self, node: NodeIndex, label: &str) -> Result<()> {
        debug!(target: "multiscale::nest", "Region node {} ({})", node, label);
        Ok(())
    }

    fn create_population(&mut self, label: &str, model: &str, size: usize, params: &Params) -> Result<NestPopulation> {
        let nodes = self.kernel.create(model, size, params)?;
        Ok(NestPopulation {
            label: label.to_string(),
            model: model.to_string(),
            nodes,
        })
    }
}

impl<C: ModuleCompiler> ConnectionFactory for NestBackend<C> {
    fn connect_populations(
        &mut self,
        source: &NestPopulation,
        source_neurons: Option<&[usize]>,
        target: &NestPopulation,
        target_neurons: Option<&[usize]>,
        conn_spec: &ResolvedConnSpec,
        synapse: &SynapseSpec,
        receptor: &Receptor,
    ) -> Result<usize> {
        let sources = selection(&source.nodes, source_neurons)?;
        let targets = selection(&target.nodes, target_neurons)?;
        let conn = ConnSpec {
            rule: conn_rule(conn_spec)?,
            allow_autapses: conn_spec.allow_autapses,
            allow_multapses: conn_spec.allow_multapses,
        };
        let syn = SynSpec {
            model: synapse.model.clone(),
            weight: synapse.weight,
            delay: synapse.delay,
            receptor_type: receptor_port(receptor)?,
            params: synapse.params.clone(),
        };
        Ok(self.kernel.connect(&sources, &targets, &conn, &syn)?)
    }
}

impl<C: ModuleCompiler> DeviceFactory for NestBackend<C> {
    type Device = NestDevice;

    fn build_device(&mut self, model: &str, label: &str, kind: DeviceKind, params: &Params) -> Result<NestDevice> {
        let info = self
            .kernel
            .catalog()
            .get(model)
            .ok_or_else(|| NestError::UnknownModel(model.to_string()))?;
        let expected = match info.kind {
            ModelKind::Stimulator => DeviceKind::Input,
            ModelKind::SpikeRecorder | ModelKind::Sampler => DeviceKind::Output,
            ModelKind::Neuron | ModelKind::Synapse => {
                return Err(NestError::InvalidParameter(format!("{} is not a device model", model)).into());
            }
        };
        if expected != kind {
            return Err(NestError::InvalidParameter(format!("{} cannot be used as an {:?} device", model, kind)).into());
        }
        let model = info.name.clone();
        let nodes = self.kernel.create(&model, 1, params)?;
        let node = nodes.first().ok_or_else(|| NestError::SimulationError(format!("no node created for {}", label)))?;
        Ok(NestDevice {
            label: label.to_string(),
            model,
            kind,
            node,
            neurons: Vec::new(),
        })
    }

    fn connect_device(
        &mut self,
        device: &mut NestDevice,
        population: &NestPopulation,
        neurons: Option<&[usize]>,
        weight: f64,
        delay: &Delay,
        receptor: &Receptor,
    ) -> Result<usize> {
        let neurons = selection(&population.nodes, neurons)?;
        let device_nodes = NodeCollection::new(vec![device.node]);
        let mut syn = SynSpec::new("static_synapse", weight, Some(*delay));
        let recorder = self
            .kernel
            .catalog()
            .get(&device.model)
            .is_some_and(|info| info.kind == ModelKind::SpikeRecorder);
        let n = if recorder {
            self.kernel.connect(&neurons, &device_nodes, &ConnSpec::default(), &syn)?
        } else {
            syn.receptor_type = receptor_port(receptor)?;
            self.kernel.connect(&device_nodes, &neurons, &ConnSpec::default(), &syn)?
        };
        device.neurons.extend(neurons.ids);
        Ok(n)
    }
}
