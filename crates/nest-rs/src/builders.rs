//! Ready-made network templates.

use crate::models::{to_params, IafCondAlphaParams, ModelInfo, ModelKind, ModuleSpec};
use multiscale_builder::{ConnectionTemplate, DeviceTemplate, NetworkTemplates, PopulationTemplate};
use multiscale_core::{tvb_delay, tvb_weight, Delay, NodeIndex, Params, Property, Receptor, TvbParams};
use serde_json::json;
use std::sync::Arc;

// ============================================================================
// BASAL GANGLIA (IZHIKEVICH-HAMKER)
// ============================================================================

/// Neuron model of the basal ganglia network, provided by an extension module
pub const IZHIKEVICH_HAMKER: &str = "izhikevich_hamker";

/// Coupling `a = 1/256` times the global coupling `G = 20`
pub const BASAL_GANGLIA_COUPLING: f64 = 20.0 / 256.0;

const GPE: [NodeIndex; 2] = [0, 1];
const GPI: [NodeIndex; 2] = [2, 3];
const STN: [NodeIndex; 2] = [4, 5];
const STR: [NodeIndex; 2] = [6, 7];
const TH: [NodeIndex; 2] = [8, 9];

fn params(value: serde_json::Value) -> Params {
    value.as_object().cloned().unwrap_or_default()
}

fn izhikevich_hamker_common() -> Params {
    params(json!({
        "E_rev_AMPA": 0.0, "E_rev_GABA_A": -90.0, "V_th": 30.0, "c": -65.0,
        "C_m": 1.0, "I_e": 0.0, "t_ref": 10.0,
        "tau_rise": 1.0, "tau_rise_AMPA": 10.0, "tau_rise_GABA_A": 10.0,
        "n0": 140.0, "n1": 5.0, "n2": 0.04
    }))
}

fn with(mut base: Params, overrides: serde_json::Value) -> Params {
    base.extend(params(overrides));
    base
}

/// Module providing [`IZHIKEVICH_HAMKER`]; receptor 0 is AMPA, 1 is GABA_A
pub fn izhikevich_hamker_module() -> ModuleSpec {
    let defaults = with(
        izhikevich_hamker_common(),
        json!({"a": 0.02, "b": 0.2, "d": 8.0, "V_m": -70.0, "U_m": -18.55}),
    );
    ModuleSpec {
        name: format!("{}module", IZHIKEVICH_HAMKER),
        models: vec![ModelInfo::new(IZHIKEVICH_HAMKER, ModelKind::Neuron, defaults).with_receptor_ports(2)],
    }
}

fn excitatory_params(node: NodeIndex) -> Params {
    let base = izhikevich_hamker_common();
    if STN.contains(&node) {
        with(base, json!({"a": 0.005, "b": 0.265, "d": 2.0, "I_e": 3.0}))
    } else if TH.contains(&node) {
        with(base, json!({"a": 0.02, "b": 0.25, "d": 0.05, "I_e": 3.5}))
    } else {
        base
    }
}

fn inhibitory_params(node: NodeIndex) -> Params {
    let base = with(izhikevich_hamker_common(), json!({"a": 0.005, "b": 0.585, "d": 4.0}));
    if GPE.contains(&node) {
        with(base, json!({"I_e": 12.0}))
    } else if GPI.contains(&node) {
        with(base, json!({"I_e": 30.0}))
    } else {
        base
    }
}

fn striatum_params() -> Params {
    with(
        izhikevich_hamker_common(),
        json!({
            "V_th": 40.0, "C_m": 50.0, "n0": 61.65, "n1": 2.59, "n2": 0.02,
            "a": 0.05, "b": -20.0, "c": -55.0, "d": 377.0
        }),
    )
}

/// Basal ganglia loop over regions 0-9.
///
/// GPe (0, 1) and GPi (2, 3) hold population `I`, STN (4, 5) and thalamus
/// (8, 9) hold `E`, striatum (6, 7) holds the D1/D2 populations `I1`/`I2`.
/// Inhibitory populations inhibit themselves; region pairs are coupled with
/// TVB weights scaled by `coupling`, negative for inhibitory sources, and TVB
/// delays of at least one TVB step.
pub fn basal_ganglia_izhikevich(tvb: &TvbParams, coupling: f64) -> NetworkTemplates {
    let e_nodes = [STN, TH].concat();
    let i_nodes = [GPE, GPI].concat();
    let populations = vec![
        PopulationTemplate::new("E")
            .with_model(IZHIKEVICH_HAMKER)
            .with_params(Property::per_node(excitatory_params))
            .with_nodes(e_nodes.clone()),
        PopulationTemplate::new("I")
            .with_model(IZHIKEVICH_HAMKER)
            .with_params(Property::per_node(inhibitory_params))
            .with_nodes(i_nodes.clone()),
        PopulationTemplate::new("I1")
            .with_model(IZHIKEVICH_HAMKER)
            .with_params(striatum_params())
            .with_nodes(STR),
        PopulationTemplate::new("I2")
            .with_model(IZHIKEVICH_HAMKER)
            .with_params(striatum_params())
            .with_nodes(STR),
    ];

    let within_connections = populations
        .iter()
        .filter_map(|pop| {
            let label = pop.label.as_deref()?;
            label.starts_with('I').then(|| {
                ConnectionTemplate::new(label, label)
                    .with_weight(-1.0)
                    .with_receptor(Receptor::Index(0))
                    .with_nodes(pop.nodes.clone().unwrap_or_default())
            })
        })
        .collect();

    let weights = Arc::new(tvb.weights.clone());
    let delays = Arc::new(tvb.delays.clone());
    // (sources, targets, source nodes, target nodes)
    let pathways: [(&[&str], &[&str], &[NodeIndex], &[NodeIndex]); 7] = [
        (&["I1"], &["I"], &STR, &GPI),
        (&["I2"], &["I"], &STR, &GPE),
        (&["I"], &["I"], &GPE, &GPI),
        (&["I"], &["E"], &GPI, &TH),
        (&["I"], &["E"], &GPE, &STN),
        (&["E"], &["I1", "I2"], &TH, &STR),
        (&["E"], &["I"], &STN, &[0, 1, 2, 3]),
    ];
    let cross_connections = pathways
        .iter()
        .map(|&(sources, targets, source_nodes, target_nodes)| {
            let sign = if sources[0].starts_with('I') { -1.0 } else { 1.0 };
            ConnectionTemplate::many(sources, targets)
                .with_weight(tvb_weight(weights.clone(), sign * coupling))
                .with_delay(tvb_delay(delays.clone(), tvb.dt))
                .with_receptor(Receptor::Index(0))
                .between(source_nodes, target_nodes)
        })
        .collect();

    let recorded = [
        ("E", e_nodes.clone()),
        ("I", i_nodes.clone()),
        ("I1", STR.to_vec()),
        ("I2", STR.to_vec()),
    ];
    let mut output_devices: Vec<DeviceTemplate> = recorded
        .iter()
        .map(|(label, nodes)| {
            DeviceTemplate::new("spike_recorder")
                .connect(format!("{}_spikes", label), &[*label])
                .with_nodes(nodes.clone())
        })
        .collect();
    let multimeter = params(json!({
        "interval": 1.0,
        "record_from": ["V_m", "U_m", "I_syn", "I_syn_ex", "I_syn_in", "g_L", "g_AMPA", "g_GABA_A"]
    }));
    output_devices.extend(recorded.iter().map(|(label, nodes)| {
        DeviceTemplate::new("multimeter")
            .with_params(multimeter.clone())
            .connect(*label, &[*label])
            .with_nodes(nodes.clone())
    }));

    // (variable, population, nodes, rate, weight)
    let baselines: [(&str, &str, [NodeIndex; 2], f64, f64); 3] = [
        ("BaselineEstn", "E", STN, 500.0, 0.009),
        ("BaselineIgpe", "I", GPE, 100.0, 0.015),
        ("BaselineIgpi", "I", GPI, 700.0, 0.02),
    ];
    let input_devices = baselines
        .iter()
        .map(|&(variable, population, nodes, rate, weight)| {
            DeviceTemplate::new("poisson_generator")
                .with_params(params(json!({"rate": rate, "origin": 0.0, "start": 0.1})))
                .connect(variable, &[population])
                .with_nodes(nodes)
                .with_weights(weight)
                .with_delays(Delay::Constant(0.0))
                .with_receptor(Receptor::Index(1))
        })
        .collect();

    NetworkTemplates {
        populations,
        within_connections,
        cross_connections,
        output_devices,
        input_devices,
        population_order: Some(200),
    }
}

// ============================================================================
// WILSON-COWAN
// ============================================================================

/// Coupling constants of the Wilson-Cowan mean field
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WilsonCowanCoupling {
    pub c_ee: f64,
    pub c_ei: f64,
    pub c_ie: f64,
    pub c_ii: f64,
}

impl Default for WilsonCowanCoupling {
    fn default() -> Self {
        Self {
            c_ee: 12.0,
            c_ei: 4.0,
            c_ie: 13.0,
            c_ii: 11.0,
        }
    }
}

/// Excitatory/inhibitory iaf_cond_alpha network per region node.
///
/// Within each node `E` and `I` couple with the mean-field constants,
/// inhibition being negative; `E` populations of different nodes couple with
/// the TVB weights and delays.
pub fn wilson_cowan(tvb: &TvbParams, coupling: WilsonCowanCoupling) -> NetworkTemplates {
    let neuron = to_params(&IafCondAlphaParams::default());
    let populations = vec![
        PopulationTemplate::new("E").with_model("iaf_cond_alpha").with_params(neuron.clone()),
        PopulationTemplate::new("I")
            .with_model("iaf_cond_alpha")
            .with_params(neuron)
            .with_scale(0.25),
    ];
    let within_connections = vec![
        ConnectionTemplate::new("E", "E").with_weight(coupling.c_ee),
        ConnectionTemplate::new("E", "I").with_weight(coupling.c_ei),
        ConnectionTemplate::new("I", "E").with_weight(-coupling.c_ie),
        ConnectionTemplate::new("I", "I").with_weight(-coupling.c_ii),
    ];
    let cross_connections = vec![ConnectionTemplate::new("E", "E")
        .with_weight(tvb_weight(Arc::new(tvb.weights.clone()), 1.0))
        .with_delay(tvb_delay(Arc::new(tvb.delays.clone()), tvb.dt))];
    let output_devices = vec![DeviceTemplate::new("spike_recorder")
        .connect("E", &["E"])
        .connect("I", &["I"])];

    NetworkTemplates {
        populations,
        within_connections,
        cross_connections,
        output_devices,
        ..NetworkTemplates::default()
    }
}
