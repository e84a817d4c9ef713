//! User templates for populations, connections and devices.
//!
//! Templates are plain data: a model builder is just a function returning
//! [`NetworkTemplates`].

use multiscale_core::{ConnSpec, Delay, NodeFn, NodeIndex, Params, Property, Receptor};
use ndarray::ArrayD;
use std::fmt;
use std::sync::Arc;

// ============================================================================
// NEURON SELECTORS
// ============================================================================

/// Selects local neuron indices of a population, given its region node and size
#[derive(Clone)]
pub struct NeuronSelector(Arc<dyn Fn(NodeIndex, usize) -> Vec<usize> + Send + Sync>);

impl NeuronSelector {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(NodeIndex, usize) -> Vec<usize> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// The first `n` neurons (or all, if fewer)
    pub fn first(n: usize) -> Self {
        Self::new(move |_, size| (0..n.min(size)).collect())
    }

    /// Neurons `start..end`, truncated to the population
    pub fn range(start: usize, end: usize) -> Self {
        Self::new(move |_, size| (start.min(size)..end.min(size)).collect())
    }

    pub fn select(&self, node: NodeIndex, size: usize) -> Vec<usize> {
        (self.0)(node, size)
    }
}

impl PartialEq for NeuronSelector {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for NeuronSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("NeuronSelector(<fn>)")
    }
}

// ============================================================================
// POPULATIONS
// ============================================================================

/// Population replicated in a set of region nodes
#[derive(Debug, Clone)]
pub struct PopulationTemplate {
    /// `Pop<i>` when missing
    pub label: Option<String>,
    /// Configured default model when missing
    pub model: Option<String>,
    /// Size relative to the population order
    pub scale: Property<f64>,
    pub params: Property<Params>,
    /// All spiking nodes when missing
    pub nodes: Option<Vec<NodeIndex>>,
}

impl Default for PopulationTemplate {
    fn default() -> Self {
        Self {
            label: None,
            model: None,
            scale: Property::Constant(1.0),
            params: Property::Constant(Params::new()),
            nodes: None,
        }
    }
}

impl PopulationTemplate {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            ..Default::default()
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_scale(mut self, scale: impl Into<Property<f64>>) -> Self {
        self.scale = scale.into();
        self
    }

    pub fn with_params(mut self, params: impl Into<Property<Params>>) -> Self {
        self.params = params.into();
        self
    }

    pub fn with_nodes(mut self, nodes: impl Into<Vec<NodeIndex>>) -> Self {
        self.nodes = Some(nodes.into());
        self
    }
}

// ============================================================================
// CONNECTIONS
// ============================================================================

/// Connection between every source and every target population.
///
/// Within-region templates use `nodes` and per-node properties; cross-region
/// templates use `source_nodes`/`target_nodes` and per-node-pair properties.
/// Unset fields fall back to the configured default connection.
#[derive(Debug, Clone, Default)]
pub struct ConnectionTemplate {
    pub source: Vec<String>,
    pub target: Vec<String>,
    pub synapse_model: Option<String>,
    pub conn_spec: Option<ConnSpec>,
    pub weight: Option<Property<f64>>,
    pub delay: Option<Property<Delay>>,
    pub receptor_type: Option<Property<Vec<Receptor>>>,
    pub params: Option<Property<Params>>,
    pub nodes: Option<Vec<NodeIndex>>,
    pub source_nodes: Option<Vec<NodeIndex>>,
    pub target_nodes: Option<Vec<NodeIndex>>,
    pub source_neurons: Option<NeuronSelector>,
    pub target_neurons: Option<NeuronSelector>,
}

impl ConnectionTemplate {
    pub fn new(source: &str, target: &str) -> Self {
        Self::many(&[source], &[target])
    }

    pub fn many(sources: &[&str], targets: &[&str]) -> Self {
        Self {
            source: sources.iter().map(|s| s.to_string()).collect(),
            target: targets.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn with_synapse_model(mut self, model: impl Into<String>) -> Self {
        self.synapse_model = Some(model.into());
        self
    }

    pub fn with_conn_spec(mut self, conn_spec: ConnSpec) -> Self {
        self.conn_spec = Some(conn_spec);
        self
    }

    pub fn with_weight(mut self, weight: impl Into<Property<f64>>) -> Self {
        self.weight = Some(weight.into());
        self
    }

    pub fn with_delay(mut self, delay: impl Into<Property<Delay>>) -> Self {
        self.delay = Some(delay.into());
        self
    }

    pub fn with_receptor(mut self, receptor: impl Into<Receptor>) -> Self {
        self.receptor_type = Some(Property::Constant(vec![receptor.into()]));
        self
    }

    pub fn with_receptors(mut self, receptors: impl Into<Property<Vec<Receptor>>>) -> Self {
        self.receptor_type = Some(receptors.into());
        self
    }

    pub fn with_params(mut self, params: impl Into<Property<Params>>) -> Self {
        self.params = Some(params.into());
        self
    }

    pub fn with_nodes(mut self, nodes: impl Into<Vec<NodeIndex>>) -> Self {
        self.nodes = Some(nodes.into());
        self
    }

    pub fn between(mut self, source_nodes: impl Into<Vec<NodeIndex>>, target_nodes: impl Into<Vec<NodeIndex>>) -> Self {
        self.source_nodes = Some(source_nodes.into());
        self.target_nodes = Some(target_nodes.into());
        self
    }

    pub fn with_source_neurons(mut self, selector: NeuronSelector) -> Self {
        self.source_neurons = Some(selector);
        self
    }

    pub fn with_target_neurons(mut self, selector: NeuronSelector) -> Self {
        self.target_neurons = Some(selector);
        self
    }
}

// ============================================================================
// DEVICES
// ============================================================================

/// Per-target device value: broadcast scalar, function of the region node, or explicit array
#[derive(Clone)]
pub enum DeviceProperty<T> {
    Scalar(T),
    PerNode(NodeFn<T>),
    Array(ArrayD<T>),
}

impl<T> DeviceProperty<T> {
    pub fn per_node<F>(f: F) -> Self
    where
        F: Fn(NodeIndex) -> T + Send + Sync + 'static,
    {
        Self::PerNode(Arc::new(f))
    }
}

impl<T> From<T> for DeviceProperty<T> {
    fn from(value: T) -> Self {
        Self::Scalar(value)
    }
}

impl From<f64> for DeviceProperty<Delay> {
    fn from(delay: f64) -> Self {
        Self::Scalar(Delay::Constant(delay))
    }
}

impl<T: fmt::Debug> fmt::Debug for DeviceProperty<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(v) => f.debug_tuple("Scalar").field(v).finish(),
            Self::PerNode(_) => f.write_str("PerNode(<fn>)"),
            Self::Array(a) => f.debug_tuple("Array").field(&a.shape()).finish(),
        }
    }
}

/// Input or output device template.
///
/// Without `names` one device is placed per target region node; with `names`
/// each named device is connected to every target region node.
#[derive(Debug, Clone)]
pub struct DeviceTemplate {
    pub model: String,
    pub params: Params,
    /// Measured/stimulated variable -> population labels (empty: every population of the node)
    pub connections: Vec<(String, Vec<String>)>,
    pub nodes: Option<Vec<NodeIndex>>,
    pub names: Option<Vec<String>>,
    pub weights: Option<DeviceProperty<f64>>,
    pub delays: Option<DeviceProperty<Delay>>,
    pub receptor_type: Option<DeviceProperty<Receptor>>,
    pub neurons: DeviceProperty<Option<NeuronSelector>>,
}

impl DeviceTemplate {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            params: Params::new(),
            connections: Vec::new(),
            nodes: None,
            names: None,
            weights: None,
            delays: None,
            receptor_type: None,
            neurons: DeviceProperty::Scalar(None),
        }
    }

    pub fn with_params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }

    pub fn connect(mut self, variable: impl Into<String>, populations: &[&str]) -> Self {
        self.connections
            .push((variable.into(), populations.iter().map(|p| p.to_string()).collect()));
        self
    }

    pub fn with_nodes(mut self, nodes: impl Into<Vec<NodeIndex>>) -> Self {
        self.nodes = Some(nodes.into());
        self
    }

    pub fn with_names<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.names = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_weights(mut self, weights: impl Into<DeviceProperty<f64>>) -> Self {
        self.weights = Some(weights.into());
        self
    }

    pub fn with_delays(mut self, delays: impl Into<DeviceProperty<Delay>>) -> Self {
        self.delays = Some(delays.into());
        self
    }

    pub fn with_receptor(mut self, receptor: impl Into<Receptor>) -> Self {
        self.receptor_type = Some(DeviceProperty::Scalar(receptor.into()));
        self
    }

    pub fn with_neurons(mut self, selector: NeuronSelector) -> Self {
        self.neurons = DeviceProperty::Scalar(Some(selector));
        self
    }
}

// ============================================================================
// NETWORK
// ============================================================================

/// Everything a model builder supplies
#[derive(Debug, Clone, Default)]
pub struct NetworkTemplates {
    pub populations: Vec<PopulationTemplate>,
    pub within_connections: Vec<ConnectionTemplate>,
    pub cross_connections: Vec<ConnectionTemplate>,
    pub output_devices: Vec<DeviceTemplate>,
    pub input_devices: Vec<DeviceTemplate>,
    /// Overrides the configured population order
    pub population_order: Option<usize>,
}
