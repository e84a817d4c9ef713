//! Population Configurator: expands population templates into per-region populations.

use crate::context::ConfigContext;
use crate::templates::PopulationTemplate;
use multiscale_core::{node_key, MultiscaleError, NodeFn, NodeIndex, Params, Result};
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::debug;

/// A population template with every property resolved to a function of the region node
#[derive(Clone)]
pub struct ConfiguredPopulation {
    pub label: String,
    pub model: String,
    pub nodes: Vec<NodeIndex>,
    pub scale: NodeFn<f64>,
    pub params: NodeFn<Params>,
}

/// Population as it will be created in one region node
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PopulationDescriptor {
    pub label: String,
    pub model: String,
    pub node: NodeIndex,
    pub node_label: String,
    pub size: usize,
    pub params: Params,
}

impl PopulationDescriptor {
    pub fn node_key(&self) -> String {
        node_key(self.node, &self.node_label)
    }
}

/// Output of the population configurator
#[derive(Clone, Default)]
pub struct ConfiguredPopulations {
    pub populations: Vec<ConfiguredPopulation>,
    /// Ordered by region node, then template order
    pub descriptors: Vec<PopulationDescriptor>,
    /// Neuron models in order of first use
    pub models: Vec<String>,
}

impl ConfiguredPopulations {
    pub fn is_declared(&self, label: &str) -> bool {
        self.populations.iter().any(|p| p.label == label)
    }

    pub fn get(&self, label: &str, node: NodeIndex) -> Option<&PopulationDescriptor> {
        self.descriptors.iter().find(|d| d.node == node && d.label == label)
    }

    pub fn size(&self, label: &str, node: NodeIndex) -> Result<usize> {
        self.get(label, node)
            .map(|d| d.size)
            .ok_or_else(|| MultiscaleError::PopulationNotInNode {
                population: label.to_string(),
                node,
            })
    }

    /// Labels of the populations living in a node, in template order
    pub fn labels_in(&self, node: NodeIndex) -> Vec<String> {
        self.descriptors
            .iter()
            .filter(|d| d.node == node)
            .map(|d| d.label.clone())
            .collect()
    }

    pub fn in_node(&self, node: NodeIndex) -> impl Iterator<Item = &PopulationDescriptor> {
        self.descriptors.iter().filter(move |d| d.node == node)
    }
}

/// Merge `overrides` on top of `base`
pub fn merge_params(base: &Params, overrides: &Params) -> Params {
    let mut merged = base.clone();
    for (k, v) in overrides {
        merged.insert(k.clone(), v.clone());
    }
    merged
}

pub fn configure_populations(
    templates: &[PopulationTemplate],
    ctx: &ConfigContext<'_>,
) -> Result<ConfiguredPopulations> {
    let mut out = ConfiguredPopulations::default();
    let mut labels = BTreeSet::new();
    let mut models = BTreeSet::new();

    for (i, template) in templates.iter().enumerate() {
        let label = match template.label.as_deref() {
            Some(l) if !l.is_empty() => l.to_string(),
            _ => format!("Pop{}", i),
        };
        if !labels.insert(label.clone()) {
            return Err(MultiscaleError::DuplicatePopulation(label));
        }
        let model = template
            .model
            .clone()
            .unwrap_or_else(|| ctx.config.default_model.clone());
        if models.insert(model.clone()) {
            out.models.push(model.clone());
        }
        let population = ConfiguredPopulation {
            nodes: ctx.nodes_or_all(template.nodes.as_deref())?,
            scale: template.scale.resolve_per_node("scale")?,
            params: template.params.resolve_per_node("params")?,
            label,
            model,
        };
        debug!(
            target: "multiscale::population",
            "Configured population {} ({}) in nodes {:?}",
            population.label, population.model, population.nodes
        );
        out.populations.push(population);
    }

    for &node in ctx.nodes {
        let node_label = ctx.node_label(node)?;
        for population in out.populations.iter().filter(|p| p.nodes.contains(&node)) {
            let scaled = (population.scale)(node) * ctx.population_order as f64;
            let size = scaled.round();
            if !(size >= 1.0) {
                return Err(MultiscaleError::InvalidSize {
                    population: population.label.clone(),
                    node,
                    size: scaled,
                });
            }
            let defaults = ctx.config.model_defaults(&population.model);
            out.descriptors.push(PopulationDescriptor {
                label: population.label.clone(),
                model: population.model.clone(),
                node,
                node_label: node_label.to_string(),
                size: size as usize,
                params: merge_params(&defaults, &(population.params)(node)),
            });
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Fixture;
    use multiscale_core::Property;
    use serde_json::json;

    fn params(value: serde_json::Value) -> Params {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_population_only_in_its_nodes() {
        let fx = Fixture::new(10, &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9]);
        let templates = vec![PopulationTemplate::new("E").with_nodes([0, 1])];
        let pops = configure_populations(&templates, &fx.ctx()).unwrap();
        assert_eq!(pops.descriptors.len(), 2);
        assert!(pops.descriptors.iter().all(|d| d.size == 100));
        assert_eq!(pops.size("E", 1).unwrap(), 100);
        assert!(pops.get("E", 2).is_none());
    }

    #[test]
    fn test_defaults_and_labels() {
        let fx = Fixture::new(2, &[0, 1]);
        let templates = vec![PopulationTemplate::default(), PopulationTemplate::new("")];
        let pops = configure_populations(&templates, &fx.ctx()).unwrap();
        assert_eq!(pops.populations[0].label, "Pop0");
        assert_eq!(pops.populations[1].label, "Pop1");
        assert_eq!(pops.populations[0].model, fx.config.default_model);
        assert_eq!(pops.models, vec![fx.config.default_model.clone()]);
        assert_eq!(pops.labels_in(1), vec!["Pop0", "Pop1"]);
    }

    #[test]
    fn test_per_node_scale_and_params() {
        let mut fx = Fixture::new(3, &[0, 1, 2]);
        fx.config
            .model_params
            .insert("izhikevich".into(), params(json!({"a": 0.02, "d": 8.0})));
        let templates = vec![PopulationTemplate::new("I")
            .with_model("izhikevich")
            .with_scale(Property::per_node(|n| 0.5 * (n + 1) as f64))
            .with_params(Property::per_node(|n| params(json!({"I_e": n as f64, "d": 2.0}))))];
        let pops = configure_populations(&templates, &fx.ctx()).unwrap();
        assert_eq!(pops.size("I", 0).unwrap(), 50);
        assert_eq!(pops.size("I", 2).unwrap(), 150);
        let p = &pops.get("I", 2).unwrap().params;
        assert_eq!(p["I_e"], 2.0);
        assert_eq!(p["d"], 2.0);
        assert_eq!(p["a"], 0.02);
    }

    #[test]
    fn test_invalid_templates() {
        let fx = Fixture::new(3, &[0, 1]);
        let dup = vec![PopulationTemplate::new("E"), PopulationTemplate::new("E")];
        assert!(matches!(
            configure_populations(&dup, &fx.ctx()),
            Err(MultiscaleError::DuplicatePopulation(_))
        ));

        let outside = vec![PopulationTemplate::new("E").with_nodes([2])];
        assert!(matches!(
            configure_populations(&outside, &fx.ctx()),
            Err(MultiscaleError::UnknownNode(2))
        ));

        let empty = vec![PopulationTemplate::new("E").with_scale(0.001)];
        assert!(matches!(
            configure_populations(&empty, &fx.ctx()),
            Err(MultiscaleError::InvalidSize { .. })
        ));

        let pair = vec![PopulationTemplate::new("E").with_scale(Property::per_node_pair(|_, _| 1.0_f64))];
        assert!(matches!(
            configure_populations(&pair, &fx.ctx()),
            Err(MultiscaleError::ArityMismatch { .. })
        ));
    }
}
