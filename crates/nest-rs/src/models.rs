//! Model catalog: neuron, device and synapse models known to the kernel,
//! with their default parameters and receptor ports.

use multiscale_core::Params;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// NEURON MODELS
// ============================================================================

/// Parameters for iaf_psc_alpha
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IafPscAlphaParams {
    #[serde(rename = "C_m")]
    pub c_m: f64,
    pub tau_m: f64,
    pub tau_syn_ex: f64,
    pub tau_syn_in: f64,
    pub t_ref: f64,
    #[serde(rename = "E_L")]
    pub e_l: f64,
    #[serde(rename = "V_reset")]
    pub v_reset: f64,
    #[serde(rename = "V_th")]
    pub v_th: f64,
    #[serde(rename = "V_m")]
    pub v_m: f64,
    #[serde(rename = "I_e")]
    pub i_e: f64,
}

impl Default for IafPscAlphaParams {
    fn default() -> Self {
        Self {
            c_m: 250.0,
            tau_m: 10.0,
            tau_syn_ex: 2.0,
            tau_syn_in: 2.0,
            t_ref: 2.0,
            e_l: -70.0,
            v_reset: -70.0,
            v_th: -55.0,
            v_m: -70.0,
            i_e: 0.0,
        }
    }
}

/// Parameters for iaf_cond_alpha
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IafCondAlphaParams {
    #[serde(rename = "C_m")]
    pub c_m: f64,
    #[serde(rename = "g_L")]
    pub g_l: f64,
    pub tau_syn_ex: f64,
    pub tau_syn_in: f64,
    pub t_ref: f64,
    #[serde(rename = "E_L")]
    pub e_l: f64,
    #[serde(rename = "E_ex")]
    pub e_ex: f64,
    #[serde(rename = "E_in")]
    pub e_in: f64,
    #[serde(rename = "V_reset")]
    pub v_reset: f64,
    #[serde(rename = "V_th")]
    pub v_th: f64,
    #[serde(rename = "V_m")]
    pub v_m: f64,
    #[serde(rename = "I_e")]
    pub i_e: f64,
}

impl Default for IafCondAlphaParams {
    fn default() -> Self {
        Self {
            c_m: 250.0,
            g_l: 16.6667,
            tau_syn_ex: 0.2,
            tau_syn_in: 2.0,
            t_ref: 2.0,
            e_l: -70.0,
            e_ex: 0.0,
            e_in: -85.0,
            v_reset: -60.0,
            v_th: -55.0,
            v_m: -70.0,
            i_e: 0.0,
        }
    }
}

/// Parameters for aeif_cond_alpha (AdEx)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AeifCondAlphaParams {
    #[serde(rename = "C_m")]
    pub c_m: f64,
    #[serde(rename = "g_L")]
    pub g_l: f64,
    pub tau_syn_ex: f64,
    pub tau_syn_in: f64,
    pub t_ref: f64,
    #[serde(rename = "E_L")]
    pub e_l: f64,
    #[serde(rename = "E_ex")]
    pub e_ex: f64,
    #[serde(rename = "E_in")]
    pub e_in: f64,
    #[serde(rename = "V_reset")]
    pub v_reset: f64,
    #[serde(rename = "V_th")]
    pub v_th: f64,
    #[serde(rename = "V_peak")]
    pub v_peak: f64,
    #[serde(rename = "Delta_T")]
    pub delta_t: f64,
    pub tau_w: f64,
    pub a: f64,
    pub b: f64,
    #[serde(rename = "V_m")]
    pub v_m: f64,
    #[serde(rename = "I_e")]
    pub i_e: f64,
}

impl Default for AeifCondAlphaParams {
    fn default() -> Self {
        Self {
            c_m: 281.0,
            g_l: 30.0,
            tau_syn_ex: 0.2,
            tau_syn_in: 2.0,
            t_ref: 0.0,
            e_l: -70.6,
            e_ex: 0.0,
            e_in: -85.0,
            v_reset: -60.0,
            v_th: -50.4,
            v_peak: 0.0,
            delta_t: 2.0,
            tau_w: 144.0,
            a: 4.0,
            b: 80.5,
            v_m: -70.6,
            i_e: 0.0,
        }
    }
}

/// Parameters for izhikevich
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IzhikevichParams {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    #[serde(rename = "V_th")]
    pub v_th: f64,
    #[serde(rename = "V_min")]
    pub v_min: f64,
    #[serde(rename = "V_m")]
    pub v_m: f64,
    #[serde(rename = "U_m")]
    pub u_m: f64,
    #[serde(rename = "I_e")]
    pub i_e: f64,
}

impl Default for IzhikevichParams {
    fn default() -> Self {
        // Regular spiking
        Self {
            a: 0.02,
            b: 0.2,
            c: -65.0,
            d: 8.0,
            v_th: 30.0,
            v_min: f64::MIN,
            v_m: -65.0,
            u_m: -13.0,
            i_e: 0.0,
        }
    }
}

// ============================================================================
// DEVICES
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoissonGeneratorParams {
    /// Hz
    pub rate: f64,
    pub origin: f64,
    pub start: f64,
    pub stop: f64,
}

impl Default for PoissonGeneratorParams {
    fn default() -> Self {
        Self {
            rate: 0.0,
            origin: 0.0,
            start: 0.0,
            stop: f64::MAX,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DcGeneratorParams {
    /// pA
    pub amplitude: f64,
    pub origin: f64,
    pub start: f64,
    pub stop: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpikeGeneratorParams {
    pub spike_times: Vec<f64>,
    pub spike_weights: Vec<f64>,
    pub origin: f64,
    pub start: f64,
    pub stop: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecorderParams {
    pub record_to: String,
    pub origin: f64,
    pub start: f64,
    pub stop: f64,
}

impl Default for RecorderParams {
    fn default() -> Self {
        Self {
            record_to: "memory".into(),
            origin: 0.0,
            start: 0.0,
            stop: f64::MAX,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultimeterParams {
    pub record_to: String,
    pub record_from: Vec<String>,
    /// ms
    pub interval: f64,
    pub origin: f64,
    pub start: f64,
    pub stop: f64,
}

impl Default for MultimeterParams {
    fn default() -> Self {
        Self {
            record_to: "memory".into(),
            record_from: Vec::new(),
            interval: 1.0,
            origin: 0.0,
            start: 0.0,
            stop: f64::MAX,
        }
    }
}

// ============================================================================
// CATALOG
// ============================================================================

/// What a model creates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelKind {
    Neuron,
    /// Emits events into the network
    Stimulator,
    /// Receives spike events
    SpikeRecorder,
    /// Samples state variables of the neurons it is connected to
    Sampler,
    Synapse,
}

/// A model registered in the kernel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    pub kind: ModelKind,
    pub defaults: Params,
    /// Number of receptor ports; 0 for synapse models
    pub receptor_ports: usize,
}

impl ModelInfo {
    pub fn new(name: impl Into<String>, kind: ModelKind, defaults: Params) -> Self {
        let receptor_ports = if kind == ModelKind::Synapse { 0 } else { 1 };
        Self {
            name: name.into(),
            kind,
            defaults,
            receptor_ports,
        }
    }

    pub fn with_receptor_ports(mut self, ports: usize) -> Self {
        self.receptor_ports = ports;
        self
    }

    pub fn is_device(&self) -> bool {
        matches!(self.kind, ModelKind::Stimulator | ModelKind::SpikeRecorder | ModelKind::Sampler)
    }
}

/// Extension module and the models it provides once installed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleSpec {
    pub name: String,
    pub models: Vec<ModelInfo>,
}

/// Serialize a parameter struct into a parameter map
pub fn to_params<T: Serialize>(params: &T) -> Params {
    serde_json::to_value(params)
        .ok()
        .and_then(|v| v.as_object().cloned())
        .unwrap_or_default()
}

/// Older or alternative names of catalog models
const ALIASES: &[(&str, &str)] = &[
    ("spike_detector", "spike_recorder"),
    ("spike_multimeter", "multimeter"),
];

/// Models known to a kernel
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelCatalog {
    models: BTreeMap<String, ModelInfo>,
}

impl ModelCatalog {
    /// Models shipped with the kernel
    pub fn builtin() -> Self {
        let mut catalog = Self::default();
        let neurons = [
            ("iaf_psc_alpha", to_params(&IafPscAlphaParams::default())),
            ("iaf_cond_alpha", to_params(&IafCondAlphaParams::default())),
            ("aeif_cond_alpha", to_params(&AeifCondAlphaParams::default())),
            ("izhikevich", to_params(&IzhikevichParams::default())),
            ("parrot_neuron", Params::new()),
        ];
        for (name, defaults) in neurons {
            catalog.register(ModelInfo::new(name, ModelKind::Neuron, defaults));
        }
        catalog.register(ModelInfo::new(
            "poisson_generator",
            ModelKind::Stimulator,
            to_params(&PoissonGeneratorParams::default()),
        ));
        catalog.register(ModelInfo::new(
            "dc_generator",
            ModelKind::Stimulator,
            to_params(&DcGeneratorParams::default()),
        ));
        catalog.register(ModelInfo::new(
            "spike_generator",
            ModelKind::Stimulator,
            to_params(&SpikeGeneratorParams::default()),
        ));
        catalog.register(ModelInfo::new(
            "spike_recorder",
            ModelKind::SpikeRecorder,
            to_params(&RecorderParams::default()),
        ));
        catalog.register(ModelInfo::new(
            "multimeter",
            ModelKind::Sampler,
            to_params(&MultimeterParams::default()),
        ));
        for name in [
            "static_synapse",
            "stdp_synapse",
            "tsodyks_synapse",
            "rate_connection_instantaneous",
            "rate_connection_delayed",
        ] {
            catalog.register(ModelInfo::new(name, ModelKind::Synapse, Params::new()));
        }
        catalog
    }

    pub fn register(&mut self, info: ModelInfo) {
        self.models.insert(info.name.clone(), info);
    }

    /// Catalog name of a model, following aliases
    pub fn resolve<'a>(&self, name: &'a str) -> &'a str {
        ALIASES
            .iter()
            .find(|(alias, _)| *alias == name)
            .map_or(name, |&(_, canonical)| canonical)
    }

    pub fn get(&self, name: &str) -> Option<&ModelInfo> {
        self.models.get(self.resolve(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.models.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog() {
        let catalog = ModelCatalog::builtin();
        let iaf = catalog.get("iaf_cond_alpha").unwrap();
        assert_eq!(iaf.kind, ModelKind::Neuron);
        assert_eq!(iaf.defaults["E_in"], -85.0);
        assert_eq!(iaf.receptor_ports, 1);
        assert!(catalog.get("static_synapse").is_some_and(|m| m.receptor_ports == 0));
        assert!(!catalog.contains("izhikevich_hamker"));
    }

    #[test]
    fn test_aliases() {
        let catalog = ModelCatalog::builtin();
        assert_eq!(catalog.resolve("spike_multimeter"), "multimeter");
        assert_eq!(catalog.get("spike_detector").unwrap().kind, ModelKind::SpikeRecorder);
        assert!(catalog.get("multimeter").unwrap().is_device());
    }

    #[test]
    fn test_izhikevich_defaults() {
        let params = to_params(&IzhikevichParams::default());
        assert_eq!(params["a"], 0.02);
        assert_eq!(params["U_m"], -13.0);
    }
}
