//! Device Configurator: places input/output devices on region nodes and
//! broadcasts their per-target weights, delays, receptors and neuron selections.

use crate::backend::DeviceKind;
use crate::context::ConfigContext;
use crate::population::{merge_params, ConfiguredPopulations};
use crate::templates::{DeviceProperty, DeviceTemplate, NeuronSelector};
use multiscale_core::timing::clamp_to_resolution;
use multiscale_core::{BuildWarning, Delay, MultiscaleError, NodeIndex, Params, Receptor, Result};
use ndarray::{ArrayD, IxDyn};
use tracing::debug;

/// Devices measuring or stimulating one variable
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceDescriptor {
    pub kind: DeviceKind,
    pub variable: String,
    pub model: String,
    pub params: Params,
    pub nodes: Vec<NodeIndex>,
    pub node_labels: Vec<String>,
    /// Target population labels, one list per node
    pub populations: Vec<Vec<String>>,
    /// One label per device
    pub labels: Vec<String>,
    /// Every device targets every node
    pub one_to_many: bool,
    /// Shape `(nodes,)`, or `(devices, nodes)` when one-to-many
    pub weights: ArrayD<f64>,
    pub delays: ArrayD<Delay>,
    pub receptors: ArrayD<Receptor>,
    pub neurons: ArrayD<Option<NeuronSelector>>,
}

impl DeviceDescriptor {
    pub fn shape(&self) -> &[usize] {
        self.weights.shape()
    }

    /// Node positions targeted by a device, with the index of their values
    pub fn targets(&self, device: usize) -> Vec<(usize, Vec<usize>)> {
        if self.one_to_many {
            (0..self.nodes.len()).map(|i| (i, vec![device, i])).collect()
        } else {
            vec![(device, vec![device])]
        }
    }
}

/// Output of one device configurator pass
#[derive(Debug, Clone, Default)]
pub struct ConfiguredDevices {
    pub descriptors: Vec<DeviceDescriptor>,
    pub warnings: Vec<BuildWarning>,
}

/// Fill an array of `shape` from a device property.
///
/// Scalars and size-1 arrays broadcast, per-node functions fill every row,
/// other arrays must match the shape exactly.
pub fn broadcast<T: Clone>(
    property: &DeviceProperty<T>,
    name: &str,
    shape: &[usize],
    nodes: &[NodeIndex],
) -> Result<ArrayD<T>> {
    let mismatch = |got: &[usize]| MultiscaleError::ShapeMismatch {
        property: name.to_string(),
        expected: shape.to_vec(),
        got: got.to_vec(),
    };
    match property {
        DeviceProperty::Scalar(value) => Ok(ArrayD::from_elem(IxDyn(shape), value.clone())),
        DeviceProperty::PerNode(f) => {
            let row: Vec<T> = nodes.iter().map(|&n| f(n)).collect();
            let rows = shape.iter().rev().skip(1).product::<usize>();
            let data: Vec<T> = (0..rows).flat_map(|_| row.iter().cloned()).collect();
            ArrayD::from_shape_vec(IxDyn(shape), data).map_err(|_| mismatch(&[rows, row.len()]))
        }
        DeviceProperty::Array(array) => {
            if array.shape() == shape {
                return Ok(array.clone());
            }
            match array.iter().next() {
                Some(value) if array.len() == 1 => Ok(ArrayD::from_elem(IxDyn(shape), value.clone())),
                _ => Err(mismatch(array.shape())),
            }
        }
    }
}

fn device_defaults(kind: DeviceKind, model: &str, ctx: &ConfigContext<'_>) -> Params {
    let defaults = match kind {
        DeviceKind::Input => &ctx.config.input_device_params,
        DeviceKind::Output => &ctx.config.output_device_params,
    };
    defaults.get(model).cloned().unwrap_or_default()
}

pub fn configure_devices(
    templates: &[DeviceTemplate],
    kind: DeviceKind,
    pops: &ConfiguredPopulations,
    ctx: &ConfigContext<'_>,
) -> Result<ConfiguredDevices> {
    let mut out = ConfiguredDevices::default();
    let defaults = &ctx.config.default_connection;

    for template in templates {
        if template.connections.is_empty() {
            return Err(MultiscaleError::MissingConnectionEnd {
                end: match kind {
                    DeviceKind::Input => "target",
                    DeviceKind::Output => "source",
                },
                connection: template.model.clone(),
            });
        }
        let nodes = ctx.nodes_or_all(template.nodes.as_deref())?;
        let node_labels = nodes
            .iter()
            .map(|&n| ctx.node_label(n).map(str::to_string))
            .collect::<Result<Vec<_>>>()?;
        let shape = match &template.names {
            Some(names) => vec![names.len(), nodes.len()],
            None => vec![nodes.len()],
        };

        let weights = broadcast(
            template
                .weights
                .as_ref()
                .unwrap_or(&DeviceProperty::Scalar(defaults.weight)),
            "weights",
            &shape,
            &nodes,
        )?;
        let mut delays = broadcast(
            template
                .delays
                .as_ref()
                .unwrap_or(&DeviceProperty::Scalar(Delay::Constant(ctx.timing.min_delay))),
            "delays",
            &shape,
            &nodes,
        )?;
        let context = format!("{} device", template.model);
        for delay in delays.iter_mut() {
            let (clamped, warning) = clamp_to_resolution(delay, ctx.resolution, &context)?;
            *delay = clamped;
            out.warnings.extend(warning);
        }
        let receptors = broadcast(
            template
                .receptor_type
                .as_ref()
                .unwrap_or(&DeviceProperty::Scalar(defaults.receptor_type.clone())),
            "receptor_type",
            &shape,
            &nodes,
        )?;
        let neurons = broadcast(&template.neurons, "neurons", &shape, &nodes)?;
        let params = merge_params(&device_defaults(kind, &template.model, ctx), &template.params);

        for (variable, labels) in &template.connections {
            if let Some(label) = labels.iter().find(|l| !pops.is_declared(l)) {
                return Err(MultiscaleError::UndeclaredPopulation {
                    label: label.clone(),
                    context: format!("device {}", variable),
                });
            }
            let mut populations = Vec::with_capacity(nodes.len());
            for &node in &nodes {
                if labels.is_empty() {
                    populations.push(pops.labels_in(node));
                    continue;
                }
                for label in labels {
                    pops.size(label, node)?;
                }
                populations.push(labels.clone());
            }
            let device_labels = match &template.names {
                Some(names) => names.iter().map(|n| format!("{}_{}", variable, n)).collect(),
                None => node_labels.iter().map(|l| format!("{}_{}", variable, l)).collect(),
            };
            debug!(
                target: "multiscale::device",
                "Configured {} device(s) {} for {}", template.model, variable, labels.join(", ")
            );
            out.descriptors.push(DeviceDescriptor {
                kind,
                variable: variable.clone(),
                model: template.model.clone(),
                params: params.clone(),
                nodes: nodes.clone(),
                node_labels: node_labels.clone(),
                populations,
                labels: device_labels,
                one_to_many: template.names.is_some(),
                weights: weights.clone(),
                delays: delays.clone(),
                receptors: receptors.clone(),
                neurons: neurons.clone(),
            });
        }
    }
    Ok(out)
}
