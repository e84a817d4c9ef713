//! Neuron, input and monitor types known to an ANNarchy network.

use multiscale_core::Params;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;

/// Role of a type in the network
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeKind {
    /// Integrated neuron population
    Neuron,
    /// Population emitting spikes without integrating inputs
    SpikeSource,
    /// Records from population views
    Monitor,
}

/// A neuron, input or monitor type with its default parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeuronType {
    pub name: String,
    pub kind: TypeKind,
    pub parameters: Params,
    /// State variables a monitor may record
    pub variables: Vec<String>,
}

impl NeuronType {
    pub fn new(name: impl Into<String>, kind: TypeKind, parameters: Params) -> Self {
        Self {
            name: name.into(),
            kind,
            parameters,
            variables: Vec::new(),
        }
    }

    pub fn with_variables(mut self, variables: &[&str]) -> Self {
        self.variables = variables.iter().map(|v| v.to_string()).collect();
        self
    }
}

fn params(value: serde_json::Value) -> Params {
    value.as_object().cloned().unwrap_or_default()
}

/// Types available to a network
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TypeCatalog {
    types: BTreeMap<String, NeuronType>,
}

impl TypeCatalog {
    pub fn builtin() -> Self {
        let mut catalog = Self::default();
        catalog.register(
            NeuronType::new(
                "Izhikevich",
                TypeKind::Neuron,
                params(json!({
                    "a": 0.02, "b": 0.2, "c": -65.0, "d": 8.0,
                    "v_thresh": 30.0, "i_offset": 0.0, "noise": 0.0, "tau_refrac": 0.0
                })),
            )
            .with_variables(&["v", "u", "g_exc", "g_inh"]),
        );
        catalog.register(
            NeuronType::new(
                "IF_curr_alpha",
                TypeKind::Neuron,
                params(json!({
                    "v_rest": -65.0, "cm": 1.0, "tau_m": 20.0, "tau_refrac": 0.0,
                    "tau_syn_E": 5.0, "tau_syn_I": 5.0, "v_thresh": -50.0, "v_reset": -65.0, "i_offset": 0.0
                })),
            )
            .with_variables(&["v", "g_exc", "g_inh"]),
        );
        catalog.register(
            NeuronType::new(
                "IF_cond_alpha",
                TypeKind::Neuron,
                params(json!({
                    "v_rest": -65.0, "cm": 1.0, "tau_m": 20.0, "tau_refrac": 0.0,
                    "tau_syn_E": 0.3, "tau_syn_I": 0.5, "e_rev_E": 0.0, "e_rev_I": -70.0,
                    "v_thresh": -50.0, "v_reset": -65.0, "i_offset": 0.0
                })),
            )
            .with_variables(&["v", "g_exc", "g_inh"]),
        );
        catalog.register(
            NeuronType::new(
                "EIF_cond_alpha_isfa_ista",
                TypeKind::Neuron,
                params(json!({
                    "v_rest": -70.6, "cm": 0.281, "tau_m": 9.3667, "tau_refrac": 0.1,
                    "tau_syn_E": 5.0, "tau_syn_I": 5.0, "e_rev_E": 0.0, "e_rev_I": -80.0,
                    "tau_w": 144.0, "a": 4.0, "b": 0.0805, "i_offset": 0.0, "delta_T": 2.0,
                    "v_thresh": -50.4, "v_reset": -70.6, "v_spike": -40.0
                })),
            )
            .with_variables(&["v", "w", "g_exc", "g_inh"]),
        );
        catalog.register(NeuronType::new(
            "PoissonPopulation",
            TypeKind::SpikeSource,
            params(json!({"rates": 0.0})),
        ));
        catalog.register(NeuronType::new(
            "SpikeSourceArray",
            TypeKind::SpikeSource,
            params(json!({"spike_times": []})),
        ));
        catalog.register(NeuronType::new(
            "SpikeMonitor",
            TypeKind::Monitor,
            params(json!({"start": true})),
        ));
        catalog.register(NeuronType::new(
            "Monitor",
            TypeKind::Monitor,
            params(json!({"variables": [], "period": null, "start": true})),
        ));
        catalog
    }

    pub fn register(&mut self, neuron: NeuronType) {
        self.types.insert(neuron.name.clone(), neuron);
    }

    pub fn get(&self, name: &str) -> Option<&NeuronType> {
        self.types.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }
}
