//! The assembled spiking network: region nodes with their populations,
//! device sets and read-only views of what was built.

use crate::backend::{DeviceKind, SpikingBackend, SpikingPopulation};
use crate::connection::ConnectionDescriptor;
use crate::models::ModelSource;
use crate::population::PopulationDescriptor;
use multiscale_core::{
    node_key, BuildWarning, ConnectivityRule, Delay, NodeIndex, Params, Receptor, Result, Time, Timing,
};
use std::collections::BTreeMap;
use tracing::info;

/// Label -> node key -> value
pub type View<T> = BTreeMap<String, BTreeMap<String, T>>;

// ============================================================================
// REGION NODES
// ============================================================================

/// Spiking populations of one region
#[derive(Debug, Clone)]
pub struct RegionNode<P> {
    pub index: NodeIndex,
    pub label: String,
    /// In template order
    pub populations: Vec<(String, P)>,
}

impl<P: SpikingPopulation> RegionNode<P> {
    pub fn new(index: NodeIndex, label: impl Into<String>) -> Self {
        Self {
            index,
            label: label.into(),
            populations: Vec::new(),
        }
    }

    pub fn key(&self) -> String {
        node_key(self.index, &self.label)
    }

    pub fn get(&self, label: &str) -> Option<&P> {
        self.populations.iter().find(|(l, _)| l == label).map(|(_, p)| p)
    }

    pub fn population_labels(&self) -> Vec<&str> {
        self.populations.iter().map(|(l, _)| l.as_str()).collect()
    }

    pub fn number_of_neurons(&self) -> usize {
        self.populations.iter().map(|(_, p)| p.size()).sum()
    }
}

/// Region nodes modeled in the spiking simulator, sorted by index
#[derive(Debug, Clone)]
pub struct SpikingBrain<P> {
    pub nodes: Vec<RegionNode<P>>,
}

impl<P> Default for SpikingBrain<P> {
    fn default() -> Self {
        Self { nodes: Vec::new() }
    }
}

impl<P: SpikingPopulation> SpikingBrain<P> {
    pub fn node(&self, index: NodeIndex) -> Option<&RegionNode<P>> {
        self.nodes.iter().find(|n| n.index == index)
    }

    pub fn population(&self, label: &str, node: NodeIndex) -> Option<&P> {
        self.node(node).and_then(|n| n.get(label))
    }

    pub fn number_of_neurons(&self) -> usize {
        self.nodes.iter().map(RegionNode::number_of_neurons).sum()
    }
}

// ============================================================================
// DEVICES
// ============================================================================

/// Devices measuring or stimulating one variable
#[derive(Debug, Clone)]
pub struct DeviceSet<D> {
    pub kind: DeviceKind,
    pub variable: String,
    pub model: String,
    /// (device label, device)
    pub devices: Vec<(String, D)>,
    /// (region node, population label) pairs each device targets
    pub targets: Vec<Vec<(NodeIndex, String)>>,
}

impl<D> DeviceSet<D> {
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn get(&self, label: &str) -> Option<&D> {
        self.devices.iter().find(|(l, _)| l == label).map(|(_, d)| d)
    }
}

/// Device sets keyed by variable; sets of a repeated variable are merged
#[derive(Debug, Clone)]
pub struct DeviceSets<D> {
    sets: Vec<DeviceSet<D>>,
}

impl<D> Default for DeviceSets<D> {
    fn default() -> Self {
        Self { sets: Vec::new() }
    }
}

impl<D> DeviceSets<D> {
    pub fn insert(&mut self, set: DeviceSet<D>) {
        match self.sets.iter_mut().find(|s| s.variable == set.variable) {
            Some(existing) => {
                existing.devices.extend(set.devices);
                existing.targets.extend(set.targets);
            }
            None => self.sets.push(set),
        }
    }

    pub fn get(&self, variable: &str) -> Option<&DeviceSet<D>> {
        self.sets.iter().find(|s| s.variable == variable)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DeviceSet<D>> {
        self.sets.iter()
    }

    pub fn variables(&self) -> Vec<&str> {
        self.sets.iter().map(|s| s.variable.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }
}

// ============================================================================
// NETWORK
// ============================================================================

/// A built spiking network bound to its backend
pub struct SpikingNetwork<B: SpikingBackend> {
    pub backend: B,
    pub brain: SpikingBrain<B::Population>,
    pub output_devices: DeviceSets<B::Device>,
    pub input_devices: DeviceSets<B::Device>,
    pub populations: Vec<PopulationDescriptor>,
    pub connections: Vec<ConnectionDescriptor>,
    /// Synapses reported by the backend, one entry per connection descriptor
    pub connection_counts: Vec<usize>,
    pub models: BTreeMap<String, ModelSource>,
    pub timing: Timing,
    pub warnings: Vec<BuildWarning>,
}

impl<B: SpikingBackend> SpikingNetwork<B> {
    fn population_view<T>(&self, value: impl Fn(&PopulationDescriptor) -> T) -> View<T> {
        let mut view = View::new();
        for p in &self.populations {
            view.entry(p.label.clone()).or_default().insert(p.node_key(), value(p));
        }
        view
    }

    fn connection_view<T>(&self, value: impl Fn(&ConnectionDescriptor) -> T) -> View<T> {
        let mut view = View::new();
        for c in &self.connections {
            view.entry(c.label.clone()).or_default().insert(c.node_key(), value(c));
        }
        view
    }

    pub fn population_models(&self) -> View<String> {
        self.population_view(|p| p.model.clone())
    }

    pub fn population_sizes(&self) -> View<usize> {
        self.population_view(|p| p.size)
    }

    pub fn population_params(&self) -> View<Params> {
        self.population_view(|p| p.params.clone())
    }

    pub fn connection_models(&self) -> View<String> {
        self.connection_view(|c| c.synapse.model.clone())
    }

    pub fn connection_weights(&self) -> View<f64> {
        self.connection_view(|c| c.synapse.weight)
    }

    pub fn connection_delays(&self) -> View<Option<Delay>> {
        self.connection_view(|c| c.synapse.delay)
    }

    pub fn connection_receptors(&self) -> View<Vec<Receptor>> {
        self.connection_view(|c| c.synapse.receptor_types.clone())
    }

    pub fn connection_rules(&self) -> View<ConnectivityRule> {
        self.connection_view(|c| c.conn_spec.rule)
    }

    pub fn expected_connections(&self) -> View<usize> {
        self.connection_view(|c| c.expected_connections)
    }

    pub fn number_of_neurons(&self) -> usize {
        self.brain.number_of_neurons()
    }

    pub fn number_of_connections(&self) -> usize {
        self.connection_counts.iter().sum()
    }

    /// Advance the spiking simulation
    pub fn simulate(&mut self, duration: Time) -> Result<()> {
        info!(target: "multiscale::network", "Simulating {} ms", duration);
        self.backend.simulate(duration)
    }

    pub fn time(&self) -> Time {
        self.backend.time()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockDevice, MockPopulation};

    fn population(label: &str, size: usize) -> MockPopulation {
        MockPopulation {
            id: 0,
            label: label.into(),
            model: "izhikevich".into(),
            size,
            params: Params::new(),
        }
    }

    fn device_set(variable: &str, labels: &[&str]) -> DeviceSet<MockDevice> {
        DeviceSet {
            kind: DeviceKind::Output,
            variable: variable.into(),
            model: "spike_recorder".into(),
            devices: labels
                .iter()
                .map(|l| {
                    let device = MockDevice {
                        model: "spike_recorder".into(),
                        label: l.to_string(),
                        kind: DeviceKind::Output,
                        targets: Vec::new(),
                    };
                    (l.to_string(), device)
                })
                .collect(),
            targets: labels.iter().map(|_| vec![(0, "E".to_string())]).collect(),
        }
    }

    #[test]
    fn test_region_node() {
        let mut node = RegionNode::new(3, "Thalamus");
        node.populations.push(("E".into(), population("E", 100)));
        node.populations.push(("I".into(), population("I", 25)));
        assert_eq!(node.key(), "3-Thalamus");
        assert_eq!(node.number_of_neurons(), 125);
        assert_eq!(node.population_labels(), vec!["E", "I"]);
        assert_eq!(node.get("I").map(|p| p.size), Some(25));

        let brain = SpikingBrain { nodes: vec![node] };
        assert!(brain.population("E", 3).is_some());
        assert!(brain.population("E", 0).is_none());
    }

    #[test]
    fn test_device_sets_merge_variable() {
        let mut sets = DeviceSets::default();
        sets.insert(device_set("E_spikes", &["E_spikes_A", "E_spikes_B"]));
        sets.insert(device_set("I_spikes", &["I_spikes_A"]));
        sets.insert(device_set("E_spikes", &["E_spikes_C"]));
        assert_eq!(sets.len(), 2);
        assert_eq!(sets.variables(), vec!["E_spikes", "I_spikes"]);
        let e = sets.get("E_spikes").unwrap();
        assert_eq!(e.len(), 3);
        assert_eq!(e.targets.len(), 3);
        assert!(e.get("E_spikes_C").is_some());
    }
}
