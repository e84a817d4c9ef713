//! Connection Configurator: expands within-region and cross-region templates
//! into one descriptor per (source node, target node, source, target) combination.

use crate::context::ConfigContext;
use crate::population::ConfiguredPopulations;
use crate::templates::{ConnectionTemplate, NeuronSelector};
use multiscale_core::synapse::{assert_delay, assert_synapse_model, SynapseClass};
use multiscale_core::timing::clamp_to_resolution;
use multiscale_core::{
    node_key, node_pair_key, BuildWarning, Delay, MultiscaleError, NodeIndex, PairFn, Params, Property,
    Receptor, ResolvedConnSpec, Result,
};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ConnectionScope {
    /// Between populations of the same region node
    Within,
    /// Between populations of two distinct region nodes
    Cross,
}

/// Synapse of a resolved connection
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SynapseSpec {
    pub model: String,
    pub weight: f64,
    /// `None` for instantaneous rate synapses
    pub delay: Option<Delay>,
    /// One connection is made per receptor type
    pub receptor_types: Vec<Receptor>,
    pub params: Params,
}

/// Connection between two concrete populations
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectionDescriptor {
    /// `"<source>-><target>"`
    pub label: String,
    pub scope: ConnectionScope,
    pub source: String,
    pub target: String,
    pub source_node: NodeIndex,
    pub source_node_label: String,
    pub target_node: NodeIndex,
    pub target_node_label: String,
    pub synapse: SynapseSpec,
    pub conn_spec: ResolvedConnSpec,
    pub expected_connections: usize,
    pub source_neurons: Option<Vec<usize>>,
    pub target_neurons: Option<Vec<usize>>,
}

impl ConnectionDescriptor {
    /// `"<node>-<label>"` within a region, `"<src>.<label>-><trg>.<label>"` across regions
    pub fn node_key(&self) -> String {
        match self.scope {
            ConnectionScope::Within => node_key(self.source_node, &self.source_node_label),
            ConnectionScope::Cross => node_pair_key(
                self.source_node,
                &self.source_node_label,
                self.target_node,
                &self.target_node_label,
            ),
        }
    }
}

/// Output of one connection configurator pass
#[derive(Debug, Clone, Default)]
pub struct ConfiguredConnections {
    pub descriptors: Vec<ConnectionDescriptor>,
    pub warnings: Vec<BuildWarning>,
    keys: HashSet<(String, String)>,
}

impl ConfiguredConnections {
    /// Connection views are keyed by label and node key, so each pair may be configured once
    fn push(&mut self, descriptor: ConnectionDescriptor) -> Result<()> {
        let key = (descriptor.label.clone(), descriptor.node_key());
        if !self.keys.insert(key) {
            return Err(MultiscaleError::DuplicateConnection {
                node: descriptor.node_key(),
                connection: descriptor.label,
            });
        }
        self.descriptors.push(descriptor);
        Ok(())
    }
}

/// Template properties as functions of a (source, target) node pair
struct ResolvedProperties {
    weight: PairFn<f64>,
    delay: PairFn<Delay>,
    receptors: PairFn<Vec<Receptor>>,
    params: PairFn<Params>,
}

fn resolve<T>(property: &Property<T>, scope: ConnectionScope, name: &str) -> Result<PairFn<T>>
where
    T: Clone + Send + Sync + 'static,
{
    match scope {
        ConnectionScope::Within => {
            let f = property.resolve_per_node(name)?;
            Ok(Arc::new(move |source, _| f(source)))
        }
        ConnectionScope::Cross => property.resolve_per_node_pair(name),
    }
}

impl ResolvedProperties {
    fn new(template: &ConnectionTemplate, scope: ConnectionScope, ctx: &ConfigContext<'_>) -> Result<Self> {
        let defaults = &ctx.config.default_connection;
        let weight = template
            .weight
            .clone()
            .unwrap_or(Property::Constant(defaults.weight));
        let delay = template
            .delay
            .clone()
            .unwrap_or(Property::Constant(Delay::Constant(ctx.timing.min_delay)));
        let receptors = template
            .receptor_type
            .clone()
            .unwrap_or_else(|| Property::Constant(vec![defaults.receptor_type.clone()]));
        let params = template
            .params
            .clone()
            .unwrap_or_else(|| Property::Constant(Params::new()));
        Ok(Self {
            weight: resolve(&weight, scope, "weight")?,
            delay: resolve(&delay, scope, "delay")?,
            receptors: resolve(&receptors, scope, "receptor_type")?,
            params: resolve(&params, scope, "params")?,
        })
    }
}

/// Evaluate a neuron selector and check its indices against the population size
pub fn select_neurons(
    selector: Option<&NeuronSelector>,
    population: &str,
    node: NodeIndex,
    size: usize,
) -> Result<Option<Vec<usize>>> {
    let Some(selector) = selector else {
        return Ok(None);
    };
    let neurons = selector.select(node, size);
    if let Some(&index) = neurons.iter().find(|&&i| i >= size) {
        return Err(MultiscaleError::NeuronOutOfRange {
            population: population.to_string(),
            index,
            size,
        });
    }
    Ok(Some(neurons))
}

fn check_labels(template: &ConnectionTemplate, pops: &ConfiguredPopulations, context: &str) -> Result<()> {
    let connection = || format!("{:?}->{:?}", template.source, template.target);
    if template.source.is_empty() {
        return Err(MultiscaleError::MissingConnectionEnd {
            end: "source",
            connection: connection(),
        });
    }
    if template.target.is_empty() {
        return Err(MultiscaleError::MissingConnectionEnd {
            end: "target",
            connection: connection(),
        });
    }
    if let Some(label) = template
        .source
        .iter()
        .chain(&template.target)
        .find(|l| !pops.is_declared(l))
    {
        return Err(MultiscaleError::UndeclaredPopulation {
            label: label.clone(),
            context: context.to_string(),
        });
    }
    Ok(())
}

/// Everything identifying one descriptor to build
struct Endpoint<'t> {
    source: &'t str,
    target: &'t str,
    source_node: NodeIndex,
    target_node: NodeIndex,
}

fn describe(
    template: &ConnectionTemplate,
    scope: ConnectionScope,
    props: &ResolvedProperties,
    end: Endpoint<'_>,
    pops: &ConfiguredPopulations,
    ctx: &ConfigContext<'_>,
    warnings: &mut Vec<BuildWarning>,
) -> Result<ConnectionDescriptor> {
    let Endpoint {
        source,
        target,
        source_node,
        target_node,
    } = end;
    let source_size = pops.size(source, source_node)?;
    let target_size = pops.size(target, target_node)?;
    let source_node_label = ctx.node_label(source_node)?.to_string();
    let target_node_label = ctx.node_label(target_node)?.to_string();
    let label = format!("{}->{}", source, target);
    let context = match scope {
        ConnectionScope::Within => format!("{} in {}", label, node_key(source_node, &source_node_label)),
        ConnectionScope::Cross => format!(
            "{} in {}",
            label,
            node_pair_key(source_node, &source_node_label, target_node, &target_node_label)
        ),
    };

    let source_neurons = select_neurons(template.source_neurons.as_ref(), source, source_node, source_size)?;
    let target_neurons = select_neurons(template.target_neurons.as_ref(), target, target_node, target_size)?;
    let n_src = source_neurons.as_ref().map_or(source_size, Vec::len);
    let n_trg = target_neurons.as_ref().map_or(target_size, Vec::len);
    let src_is_trg = scope == ConnectionScope::Within && source == target;

    let conn_spec = template
        .conn_spec
        .as_ref()
        .unwrap_or(&ctx.config.default_connection.conn_spec);
    let (conn_spec, expected_connections) = conn_spec.resolve(n_src, n_trg, src_is_trg, ctx.config.default_probability);

    let requested_model = template
        .synapse_model
        .as_deref()
        .unwrap_or(&ctx.config.default_connection.synapse_model);
    let delay = (props.delay)(source_node, target_node);
    let model = assert_synapse_model(requested_model, &delay, ctx.rate_synapses)?;
    let delay = if SynapseClass::classify(&model, ctx.rate_synapses) == SynapseClass::RateInstantaneous {
        None
    } else {
        let delay = assert_delay(&model, &delay, ctx.rate_synapses, &context)?;
        if scope == ConnectionScope::Within {
            warnings.extend(ctx.timing.check_within_node_delay(&delay, &context)?);
        }
        let (delay, clamped) = clamp_to_resolution(&delay, ctx.resolution, &context)?;
        warnings.extend(clamped);
        Some(delay)
    };

    let mut receptor_types = (props.receptors)(source_node, target_node);
    if receptor_types.is_empty() {
        receptor_types.push(ctx.config.default_connection.receptor_type.clone());
    }
    let weight = ctx
        .config
        .weight_scaling
        .apply((props.weight)(source_node, target_node), expected_connections);

    Ok(ConnectionDescriptor {
        label,
        scope,
        source: source.to_string(),
        target: target.to_string(),
        source_node,
        source_node_label,
        target_node,
        target_node_label,
        synapse: SynapseSpec {
            model,
            weight,
            delay,
            receptor_types,
            params: (props.params)(source_node, target_node),
        },
        conn_spec,
        expected_connections,
        source_neurons,
        target_neurons,
    })
}

/// Configure connections among populations of the same region node
pub fn configure_within_connections(
    templates: &[ConnectionTemplate],
    pops: &ConfiguredPopulations,
    ctx: &ConfigContext<'_>,
) -> Result<ConfiguredConnections> {
    let mut out = ConfiguredConnections::default();
    for template in templates {
        check_labels(template, pops, "a within-region connection")?;
        let props = ResolvedProperties::new(template, ConnectionScope::Within, ctx)?;
        for node in ctx.nodes_or_all(template.nodes.as_deref())? {
            for source in &template.source {
                for target in &template.target {
                    let end = Endpoint {
                        source,
                        target,
                        source_node: node,
                        target_node: node,
                    };
                    let descriptor =
                        describe(template, ConnectionScope::Within, &props, end, pops, ctx, &mut out.warnings)?;
                    out.push(descriptor)?;
                }
            }
        }
    }
    debug!(
        target: "multiscale::connection",
        "Configured {} within-region connections", out.descriptors.len()
    );
    Ok(out)
}

/// Configure connections among populations of distinct region nodes.
///
/// Source and target node sets default to every spiking node; pairs of the
/// same node are skipped.
pub fn configure_cross_connections(
    templates: &[ConnectionTemplate],
    pops: &ConfiguredPopulations,
    ctx: &ConfigContext<'_>,
) -> Result<ConfiguredConnections> {
    let mut out = ConfiguredConnections::default();
    for template in templates {
        check_labels(template, pops, "a cross-region connection")?;
        let props = ResolvedProperties::new(template, ConnectionScope::Cross, ctx)?;
        let source_nodes = ctx.nodes_or_all(template.source_nodes.as_deref())?;
        let target_nodes = ctx.nodes_or_all(template.target_nodes.as_deref())?;
        for &source_node in &source_nodes {
            for &target_node in target_nodes.iter().filter(|&&t| t != source_node) {
                for source in &template.source {
                    for target in &template.target {
                        let end = Endpoint {
                            source,
                            target,
                            source_node,
                            target_node,
                        };
                        let descriptor =
                            describe(template, ConnectionScope::Cross, &props, end, pops, ctx, &mut out.warnings)?;
                        out.push(descriptor)?;
                    }
                }
            }
        }
    }
    debug!(
        target: "multiscale::connection",
        "Configured {} cross-region connections", out.descriptors.len()
    );
    Ok(out)
}
