//! Network Builder: configures every template, then materializes region
//! nodes, populations, synapses and devices through a backend in a fixed order.

use crate::backend::{DeviceKind, SpikingBackend, SpikingPopulation};
use crate::brain::{DeviceSet, DeviceSets, RegionNode, SpikingBrain, SpikingNetwork};
use crate::connection::{
    configure_cross_connections, configure_within_connections, select_neurons, ConfiguredConnections,
    ConnectionDescriptor,
};
use crate::context::ConfigContext;
use crate::device::{configure_devices, ConfiguredDevices, DeviceDescriptor};
use crate::models::{confirm_models, install_module, ModelSource};
use crate::population::{configure_populations, ConfiguredPopulations};
use crate::templates::NetworkTemplates;
use multiscale_core::{
    BuildWarning, BuilderConfig, MultiscaleError, NodeIndex, RateSynapseNames, Result, Timing, TvbParams,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, info};

/// Build progress; steps only move forward
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum BuildStage {
    Unconfigured,
    Configured,
    RegionsBuilt,
    WithinConnected,
    CrossConnected,
    DevicesBuilt,
}

impl fmt::Display for BuildStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unconfigured => "unconfigured",
            Self::Configured => "configured",
            Self::RegionsBuilt => "regions built",
            Self::WithinConnected => "within-region connected",
            Self::CrossConnected => "cross-region connected",
            Self::DevicesBuilt => "devices built",
        };
        f.write_str(name)
    }
}

/// Everything produced by one `configure()` pass
#[derive(Clone, Default)]
struct Configured {
    timing: Option<Timing>,
    rate_synapses: RateSynapseNames,
    populations: ConfiguredPopulations,
    within: ConfiguredConnections,
    cross: ConfiguredConnections,
    outputs: ConfiguredDevices,
    inputs: ConfiguredDevices,
    models: BTreeMap<String, ModelSource>,
}

impl Configured {
    fn warnings(&self) -> impl Iterator<Item = &BuildWarning> {
        self.within
            .warnings
            .iter()
            .chain(&self.cross.warnings)
            .chain(&self.outputs.warnings)
            .chain(&self.inputs.warnings)
    }
}

/// Builds a spiking network for a set of TVB region nodes
pub struct SpikingModelBuilder<B: SpikingBackend> {
    backend: B,
    config: BuilderConfig,
    tvb: TvbParams,
    nodes: Vec<NodeIndex>,
    templates: NetworkTemplates,
    stage: BuildStage,
    configured: Configured,
    brain: SpikingBrain<B::Population>,
    output_devices: DeviceSets<B::Device>,
    input_devices: DeviceSets<B::Device>,
    connection_counts: Vec<usize>,
}

impl<B: SpikingBackend> SpikingModelBuilder<B> {
    pub fn new(
        backend: B,
        nodes: impl Into<Vec<NodeIndex>>,
        tvb: TvbParams,
        templates: NetworkTemplates,
        config: BuilderConfig,
    ) -> Result<Self> {
        config.validate()?;
        tvb.validate()?;
        let mut nodes = nodes.into();
        nodes.sort_unstable();
        nodes.dedup();
        if let Some(&bad) = nodes.iter().find(|&&n| n >= tvb.number_of_regions) {
            return Err(MultiscaleError::UnknownNode(bad));
        }
        Ok(Self {
            backend,
            config,
            tvb,
            nodes,
            templates,
            stage: BuildStage::Unconfigured,
            configured: Configured::default(),
            brain: SpikingBrain::default(),
            output_devices: DeviceSets::default(),
            input_devices: DeviceSets::default(),
            connection_counts: Vec::new(),
        })
    }

    pub fn stage(&self) -> BuildStage {
        self.stage
    }

    pub fn nodes(&self) -> &[NodeIndex] {
        &self.nodes
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn timing(&self) -> Option<Timing> {
        self.configured.timing
    }

    pub fn populations(&self) -> &ConfiguredPopulations {
        &self.configured.populations
    }

    pub fn within_connections(&self) -> &[ConnectionDescriptor] {
        &self.configured.within.descriptors
    }

    pub fn cross_connections(&self) -> &[ConnectionDescriptor] {
        &self.configured.cross.descriptors
    }

    pub fn output_devices(&self) -> &[DeviceDescriptor] {
        &self.configured.outputs.descriptors
    }

    pub fn input_devices(&self) -> &[DeviceDescriptor] {
        &self.configured.inputs.descriptors
    }

    pub fn models(&self) -> &BTreeMap<String, ModelSource> {
        &self.configured.models
    }

    pub fn brain(&self) -> &SpikingBrain<B::Population> {
        &self.brain
    }

    /// Warnings recorded while configuring
    pub fn warnings(&self) -> Vec<BuildWarning> {
        self.configured.warnings().cloned().collect()
    }

    fn expect_stage(&self, expected: BuildStage) -> Result<()> {
        if self.stage != expected {
            return Err(MultiscaleError::Stage {
                current: self.stage.to_string(),
                expected: expected.to_string(),
            });
        }
        Ok(())
    }

    /// Reset the kernel and configure every template.
    ///
    /// May be repeated until the first build step; each pass starts from a
    /// fresh kernel and yields the same descriptors.
    pub fn configure(&mut self) -> Result<()> {
        if self.stage > BuildStage::Configured {
            return Err(MultiscaleError::Stage {
                current: self.stage.to_string(),
                expected: BuildStage::Configured.to_string(),
            });
        }
        self.backend.reset()?;

        let config = &self.config;
        let min_spiking_dt = self.backend.min_spiking_dt().unwrap_or(config.default_min_spiking_dt);
        let derive = |min_delay| {
            Timing::derive(
                self.tvb.dt,
                config.tvb_to_spiking_dt_ratio,
                min_spiking_dt,
                config.default_min_delay_ratio,
                min_delay,
            )
        };
        let timing = derive(config.default_min_delay)?;
        self.backend.configure_resolution(timing.spiking_dt)?;
        let timing = match self.backend.min_delay() {
            Some(min_delay) => derive(min_delay)?,
            None => timing,
        };
        info!(
            target: "multiscale::builder",
            "TVB dt {} ms, spiking dt {} ms, minimum delay {} ms",
            timing.tvb_dt, timing.spiking_dt, timing.min_delay
        );

        for module in &config.modules_to_install {
            install_module(&mut self.backend, module, &config.extensions)?;
        }

        let rate_synapses = self.backend.rate_synapse_names();
        let ctx = ConfigContext {
            config,
            tvb: &self.tvb,
            nodes: &self.nodes,
            population_order: self.templates.population_order.unwrap_or(config.population_order),
            timing,
            resolution: self.backend.resolution(),
            rate_synapses: &rate_synapses,
        };
        let templates = &self.templates;
        let populations = configure_populations(&templates.populations, &ctx)?;
        let within = configure_within_connections(&templates.within_connections, &populations, &ctx)?;
        let cross = configure_cross_connections(&templates.cross_connections, &populations, &ctx)?;
        let outputs = configure_devices(&templates.output_devices, DeviceKind::Output, &populations, &ctx)?;
        let inputs = configure_devices(&templates.input_devices, DeviceKind::Input, &populations, &ctx)?;
        let models = confirm_models(&mut self.backend, &populations.models, &config.extensions)?;

        self.configured = Configured {
            timing: Some(timing),
            rate_synapses,
            populations,
            within,
            cross,
            outputs,
            inputs,
            models,
        };
        self.stage = BuildStage::Configured;
        info!(
            target: "multiscale::builder",
            "Configured {} populations, {} connections and {} device sets in {} region nodes",
            self.configured.populations.descriptors.len(),
            self.configured.within.descriptors.len() + self.configured.cross.descriptors.len(),
            self.configured.outputs.descriptors.len() + self.configured.inputs.descriptors.len(),
            self.nodes.len()
        );
        Ok(())
    }

    /// Create every region node and the populations living in it
    pub fn build_spiking_region_nodes(&mut self) -> Result<()> {
        self.expect_stage(BuildStage::Configured)?;
        let mut brain = SpikingBrain::default();
        for &node in &self.nodes {
            let label = self.tvb.region_label(node)?;
            self.backend.create_region_node(node, label)?;
            let mut region = RegionNode::new(node, label);
            for descriptor in self.configured.populations.in_node(node) {
                let population = self.backend.create_population(
                    &descriptor.label,
                    &descriptor.model,
                    descriptor.size,
                    &descriptor.params,
                )?;
                debug!(
                    target: "multiscale::builder",
                    "Created population {} of {} {} neurons in {}",
                    descriptor.label, population.size(), descriptor.model, region.key()
                );
                region.populations.push((descriptor.label.clone(), population));
            }
            brain.nodes.push(region);
        }
        info!(
            target: "multiscale::builder",
            "Built {} region nodes with {} neurons",
            brain.nodes.len(),
            brain.number_of_neurons()
        );
        self.brain = brain;
        self.stage = BuildStage::RegionsBuilt;
        Ok(())
    }

    pub fn connect_within_node_spiking_populations(&mut self) -> Result<()> {
        self.expect_stage(BuildStage::RegionsBuilt)?;
        for descriptor in &self.configured.within.descriptors {
            let n = connect(&mut self.backend, &self.brain, descriptor)?;
            self.connection_counts.push(n);
        }
        self.stage = BuildStage::WithinConnected;
        Ok(())
    }

    pub fn connect_spiking_region_nodes(&mut self) -> Result<()> {
        self.expect_stage(BuildStage::WithinConnected)?;
        for descriptor in &self.configured.cross.descriptors {
            let n = connect(&mut self.backend, &self.brain, descriptor)?;
            self.connection_counts.push(n);
        }
        self.stage = BuildStage::CrossConnected;
        Ok(())
    }

    /// Region nodes, then within-region and cross-region synapses
    pub fn build_spiking_brain(&mut self) -> Result<()> {
        self.build_spiking_region_nodes()?;
        self.connect_within_node_spiking_populations()?;
        self.connect_spiking_region_nodes()
    }

    /// Output devices, then input devices
    pub fn build_and_connect_devices(&mut self) -> Result<()> {
        self.expect_stage(BuildStage::CrossConnected)?;
        let mut outputs = DeviceSets::default();
        for descriptor in &self.configured.outputs.descriptors {
            outputs.insert(build_device_set(&mut self.backend, &self.brain, descriptor)?);
        }
        let mut inputs = DeviceSets::default();
        for descriptor in &self.configured.inputs.descriptors {
            inputs.insert(build_device_set(&mut self.backend, &self.brain, descriptor)?);
        }
        info!(
            target: "multiscale::builder",
            "Built {} output and {} input device sets",
            outputs.len(),
            inputs.len()
        );
        self.output_devices = outputs;
        self.input_devices = inputs;
        self.stage = BuildStage::DevicesBuilt;
        Ok(())
    }

    /// Assemble the built network
    pub fn build(self) -> Result<SpikingNetwork<B>> {
        self.expect_stage(BuildStage::DevicesBuilt)?;
        let warnings = self.warnings();
        let Configured {
            timing,
            populations,
            within,
            cross,
            models,
            ..
        } = self.configured;
        let timing = timing.ok_or_else(|| MultiscaleError::Stage {
            current: BuildStage::Unconfigured.to_string(),
            expected: BuildStage::DevicesBuilt.to_string(),
        })?;
        let mut connections = within.descriptors;
        connections.extend(cross.descriptors);
        Ok(SpikingNetwork {
            backend: self.backend,
            brain: self.brain,
            output_devices: self.output_devices,
            input_devices: self.input_devices,
            populations: populations.descriptors,
            connections,
            connection_counts: self.connection_counts,
            models,
            timing,
            warnings,
        })
    }

    /// Configure, build the brain and its devices, and assemble the network
    pub fn build_spiking_network(mut self) -> Result<SpikingNetwork<B>> {
        self.configure()?;
        self.build_spiking_brain()?;
        self.build_and_connect_devices()?;
        self.build()
    }
}

/// Connect the populations of one descriptor, once per receptor type
fn connect<B: SpikingBackend>(
    backend: &mut B,
    brain: &SpikingBrain<B::Population>,
    descriptor: &ConnectionDescriptor,
) -> Result<usize> {
    let find = |label: &str, node: NodeIndex| {
        brain
            .population(label, node)
            .ok_or_else(|| MultiscaleError::PopulationNotInNode {
                population: label.to_string(),
                node,
            })
    };
    let source = find(&descriptor.source, descriptor.source_node)?;
    let target = find(&descriptor.target, descriptor.target_node)?;
    let mut total = 0;
    for receptor in &descriptor.synapse.receptor_types {
        total += backend.connect_populations(
            source,
            descriptor.source_neurons.as_deref(),
            target,
            descriptor.target_neurons.as_deref(),
            &descriptor.conn_spec,
            &descriptor.synapse,
            receptor,
        )?;
    }
    debug!(
        target: "multiscale::builder",
        "Connected {} in {}: {} synapses ({} expected per receptor)",
        descriptor.label,
        descriptor.node_key(),
        total,
        descriptor.expected_connections
    );
    Ok(total)
}

fn build_device_set<B: SpikingBackend>(
    backend: &mut B,
    brain: &SpikingBrain<B::Population>,
    descriptor: &DeviceDescriptor,
) -> Result<DeviceSet<B::Device>> {
    let mut devices = Vec::with_capacity(descriptor.labels.len());
    let mut targets = Vec::with_capacity(descriptor.labels.len());
    for (i, label) in descriptor.labels.iter().enumerate() {
        let mut device = backend.build_device(&descriptor.model, label, descriptor.kind, &descriptor.params)?;
        let mut device_targets = Vec::new();
        for (position, index) in descriptor.targets(i) {
            let node = descriptor.nodes[position];
            let index = index.as_slice();
            for population_label in &descriptor.populations[position] {
                let population = brain.population(population_label, node).ok_or_else(|| {
                    MultiscaleError::PopulationNotInNode {
                        population: population_label.clone(),
                        node,
                    }
                })?;
                let neurons = select_neurons(
                    descriptor.neurons[index].as_ref(),
                    population_label,
                    node,
                    population.size(),
                )?;
                backend.connect_device(
                    &mut device,
                    population,
                    neurons.as_deref(),
                    descriptor.weights[index],
                    &descriptor.delays[index],
                    &descriptor.receptors[index],
                )?;
                device_targets.push((node, population_label.clone()));
            }
        }
        devices.push((label.clone(), device));
        targets.push(device_targets);
    }
    debug!(
        target: "multiscale::builder",
        "Built {} {} device(s) for {}", devices.len(), descriptor.model, descriptor.variable
    );
    Ok(DeviceSet {
        kind: descriptor.kind,
        variable: descriptor.variable.clone(),
        model: descriptor.model.clone(),
        devices,
        targets,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::templates::{ConnectionTemplate, DeviceTemplate, PopulationTemplate};
    use crate::testing::MockBackend;
    use multiscale_core::{tvb_delay, tvb_weight, ConnSpec, Delay, Receptor};
    use ndarray::Array2;
    use std::sync::Arc;

    fn config() -> BuilderConfig {
        BuilderConfig {
            tvb_to_spiking_dt_ratio: 4.0,
            default_model: "izhikevich".into(),
            ..BuilderConfig::default()
        }
    }

    fn tvb() -> TvbParams {
        let weights = Array2::from_shape_fn((3, 3), |(i, j)| if i == j { 0.0 } else { (i + 2 * j) as f64 });
        TvbParams::new(3, 0.1)
            .with_weights(weights)
            .with_delays(Array2::from_elem((3, 3), 2.0))
            .with_region_labels(["A", "B", "C"])
    }

    fn templates(tvb: &TvbParams) -> NetworkTemplates {
        NetworkTemplates {
            populations: vec![
                PopulationTemplate::new("E"),
                PopulationTemplate::new("I").with_scale(0.25),
            ],
            within_connections: vec![
                ConnectionTemplate::new("E", "I").with_delay(0.03),
                ConnectionTemplate::new("I", "E")
                    .with_delay(0.03)
                    .with_weight(-2.0)
                    .with_conn_spec(ConnSpec::fixed_indegree(5)),
            ],
            cross_connections: vec![ConnectionTemplate::new("E", "E")
                .with_weight(tvb_weight(Arc::new(tvb.weights.clone()), 10.0))
                .with_delay(tvb_delay(Arc::new(tvb.delays.clone()), 0.1))
                .with_conn_spec(ConnSpec::one_to_one())],
            output_devices: vec![DeviceTemplate::new("spike_recorder")
                .connect("E_spikes", &["E"])
                .connect("I_spikes", &["I"])],
            input_devices: vec![DeviceTemplate::new("poisson_generator")
                .connect("stimulus", &["E"])
                .with_names(["background"])
                .with_weights(5.0)],
            population_order: None,
        }
    }

    fn builder(nodes: &[NodeIndex]) -> SpikingModelBuilder<MockBackend> {
        let tvb = tvb();
        let templates = templates(&tvb);
        SpikingModelBuilder::new(MockBackend::new(), nodes.to_vec(), tvb, templates, config()).unwrap()
    }

    #[test]
    fn test_build_spiking_network() {
        let network = builder(&[0, 2]).build_spiking_network().unwrap();

        assert_eq!(network.backend.region_nodes, vec![(0, "A".to_string()), (2, "C".to_string())]);
        assert_eq!(network.backend.populations.len(), 4);
        assert_eq!(network.number_of_neurons(), 250);
        assert_eq!(network.population_sizes()["I"]["2-C"], 25);

        // 2 within templates x 2 nodes, 1 cross template x 2 ordered pairs
        assert_eq!(network.backend.connects.len(), 6);
        let weights = network.connection_weights();
        assert_eq!(weights["E->E"]["0.A->2.C"], 10.0 * 2.0);
        assert_eq!(weights["E->E"]["2.C->0.A"], 10.0 * 4.0);
        assert_eq!(weights["I->E"]["0-A"], -2.0);
        assert_eq!(network.expected_connections()["I->E"]["2-C"], 500);
        assert_eq!(network.connection_delays()["E->E"]["0.A->2.C"], Some(Delay::Constant(2.0)));

        let spikes = network.output_devices.get("E_spikes").unwrap();
        assert_eq!(spikes.len(), 2);
        assert!(spikes.get("E_spikes_C").is_some());
        let stimulus = network.input_devices.get("stimulus").unwrap();
        assert_eq!(stimulus.len(), 1);
        assert_eq!(stimulus.targets[0], vec![(0, "E".to_string()), (2, "E".to_string())]);
        let background = stimulus.get("stimulus_background").unwrap();
        assert!(background.targets.iter().all(|(_, w, _)| *w == 5.0));
        assert!(network.warnings.is_empty());
    }

    #[test]
    fn test_configure_is_idempotent() {
        let mut b = builder(&[0, 1, 2]);
        b.configure().unwrap();
        let populations = b.populations().descriptors.clone();
        let within = b.within_connections().to_vec();
        let cross = b.cross_connections().to_vec();
        let outputs = b.output_devices().to_vec();
        let inputs = b.input_devices().to_vec();
        let models = b.models().clone();
        b.configure().unwrap();
        assert_eq!(b.populations().descriptors, populations);
        assert_eq!(b.within_connections(), within.as_slice());
        assert_eq!(b.cross_connections(), cross.as_slice());
        assert_eq!(b.output_devices(), outputs.as_slice());
        assert_eq!(b.input_devices(), inputs.as_slice());
        assert!(!b.input_devices().is_empty());
        assert_eq!(b.models(), &models);
        assert_eq!(b.backend().resets, 2);
    }

    #[test]
    fn test_rate_synapse_names_checked_against_delay() {
        let tvb = tvb();
        let rate_templates = |model: &str, delay: f64| NetworkTemplates {
            populations: vec![PopulationTemplate::new("E")],
            cross_connections: vec![ConnectionTemplate::new("E", "E")
                .with_synapse_model(model)
                .with_delay(delay)],
            ..NetworkTemplates::default()
        };
        for (model, delay) in [("rate_instantaneous", 0.5), ("rate_delayed", 0.0)] {
            let mut b =
                SpikingModelBuilder::new(MockBackend::new(), vec![0, 1], tvb.clone(), rate_templates(model, delay), config())
                    .unwrap();
            assert!(
                matches!(b.configure(), Err(MultiscaleError::SynapseDelayMismatch { .. })),
                "{} with delay {}",
                model,
                delay
            );
        }
        for (model, delay) in [("rate_instantaneous", 0.0), ("rate_delayed", 0.5)] {
            let mut b =
                SpikingModelBuilder::new(MockBackend::new(), vec![0, 1], tvb.clone(), rate_templates(model, delay), config())
                    .unwrap();
            b.configure().unwrap();
            assert!(b.cross_connections().iter().all(|c| c.synapse.model == model));
            assert_eq!(b.cross_connections()[0].synapse.delay.is_none(), delay == 0.0);
        }
    }

    #[test]
    fn test_stage_order() {
        let mut b = builder(&[0, 1]);
        assert!(matches!(
            b.connect_within_node_spiking_populations(),
            Err(MultiscaleError::Stage { .. })
        ));
        b.configure().unwrap();
        b.build_spiking_region_nodes().unwrap();
        assert!(matches!(b.build_spiking_region_nodes(), Err(MultiscaleError::Stage { .. })));
        assert!(matches!(b.configure(), Err(MultiscaleError::Stage { .. })));
        assert!(b.build_and_connect_devices().is_err());
        b.connect_within_node_spiking_populations().unwrap();
        b.connect_spiking_region_nodes().unwrap();
        assert_eq!(b.stage(), BuildStage::CrossConnected);
        assert!(matches!(b.build(), Err(MultiscaleError::Stage { .. })));
    }

    #[test]
    fn test_undeclared_population_fails_at_configure() {
        let tvb = tvb();
        let mut templates = templates(&tvb);
        templates.within_connections.push(ConnectionTemplate::new("E", "Str"));
        let mut b = SpikingModelBuilder::new(MockBackend::new(), vec![0, 1], tvb, templates, config()).unwrap();
        assert!(matches!(b.configure(), Err(MultiscaleError::UndeclaredPopulation { .. })));
        assert_eq!(b.stage(), BuildStage::Unconfigured);
        assert!(b.backend().populations.is_empty());
    }

    #[test]
    fn test_one_connect_per_receptor() {
        let tvb = tvb();
        let templates = NetworkTemplates {
            populations: vec![PopulationTemplate::new("E")],
            within_connections: vec![ConnectionTemplate::new("E", "E")
                .with_delay(0.03)
                .with_receptors(vec![Receptor::Index(1), Receptor::Index(2)])],
            ..NetworkTemplates::default()
        };
        let network = SpikingModelBuilder::new(MockBackend::new(), vec![1], tvb, templates, config())
            .unwrap()
            .build_spiking_network()
            .unwrap();
        let receptors: Vec<_> = network.backend.connects.iter().map(|c| c.receptor.clone()).collect();
        assert_eq!(receptors, vec![Receptor::Index(1), Receptor::Index(2)]);
        assert_eq!(network.number_of_connections(), 2 * 100 * 100);
    }

    #[test]
    fn test_invalid_nodes_and_modules() {
        let tvb = tvb();
        let err = SpikingModelBuilder::new(MockBackend::new(), vec![0, 3], tvb.clone(), templates(&tvb), config());
        assert!(matches!(err, Err(MultiscaleError::UnknownNode(3))));

        let mut config = config();
        config.default_model = "izhikevich_hamker".into();
        config.modules_to_install = vec!["extramodule".into()];
        let backend = MockBackend::new()
            .with_module("izhikevich_hamker", false)
            .with_module("extra", true);
        let mut b = SpikingModelBuilder::new(backend, vec![0], tvb.clone(), templates(&tvb), config).unwrap();
        b.configure().unwrap();
        assert_eq!(
            b.models()["izhikevich_hamker"],
            ModelSource::Compiled("izhikevich_hamkermodule".into())
        );
        assert_eq!(b.backend().install_calls[0], "extramodule");
    }

    #[test]
    fn test_default_delay_warns_and_simulates() {
        let tvb = TvbParams::new(2, 0.1);
        let templates = NetworkTemplates {
            populations: vec![PopulationTemplate::new("E")],
            within_connections: vec![ConnectionTemplate::new("E", "E")],
            ..NetworkTemplates::default()
        };
        // ratio 2: spiking dt 0.05 and the default minimum delay is half the TVB step
        let config = BuilderConfig {
            default_model: "izhikevich".into(),
            ..BuilderConfig::default()
        };
        let mut network = SpikingModelBuilder::new(MockBackend::new(), vec![0, 1], tvb, templates, config)
            .unwrap()
            .build_spiking_network()
            .unwrap();
        assert_eq!(network.timing.spiking_dt, 0.05);
        assert_eq!(network.backend.resolution, 0.05);
        assert_eq!(network.warnings.len(), 2);
        network.simulate(10.0).unwrap();
        network.simulate(5.0).unwrap();
        assert_eq!(network.time(), 15.0);
    }
}
