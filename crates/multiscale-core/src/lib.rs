//! # Multiscale Core
//!
//! Shared types for building spiking networks embedded in a TVB whole-brain
//! simulation.
//!
//! ## Building blocks
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`property`] | Constants or per-node / per-node-pair functions |
//! | [`connectivity`] | Connectivity rules and expected synapse counts |
//! | [`synapse`] | Delays, receptor types and rate-synapse legality |
//! | [`timing`] | Spiking step and minimum delay derived from the TVB step |
//! | [`connectome`] | Structural connectivity inputs from TVB |
//! | [`config`] | Builder configuration (TOML + environment overrides) |
//! | [`logging`] | `tracing` subscriber initialization |

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub mod config;
pub mod connectivity;
pub mod connectome;
pub mod logging;
pub mod property;
pub mod synapse;
pub mod timing;

pub use config::{BuilderConfig, ConnectionDefaults, ExtensionConfig, WeightScaling};
pub use connectivity::{ConnSpec, ConnectivityRule, ResolvedConnSpec};
pub use connectome::{tvb_delay, tvb_weight, TvbParams};
pub use property::{NodeFn, PairFn, Property};
pub use synapse::{Delay, RateSynapseNames, Receptor, SynapseClass};
pub use timing::Timing;

/// Common errors
#[derive(Debug, Error)]
pub enum MultiscaleError {
    #[error("Population '{label}' referenced by {context} is not declared")]
    UndeclaredPopulation { label: String, context: String },

    #[error("Population '{population}' does not exist in region node {node}")]
    PopulationNotInNode { population: String, node: NodeIndex },

    #[error("Duplicate population label '{0}'")]
    DuplicatePopulation(String),

    #[error("Connection {connection} in {node} is configured more than once")]
    DuplicateConnection { connection: String, node: String },

    #[error("No {end} population in connection {connection}")]
    MissingConnectionEnd { end: &'static str, connection: String },

    #[error("Property '{property}' must be a function of {expected} node(s), got a function of {got}")]
    ArityMismatch {
        property: String,
        expected: usize,
        got: usize,
    },

    #[error("Device {property} of shape {got:?} is neither of shape {expected:?} nor of size 1")]
    ShapeMismatch {
        property: String,
        expected: Vec<usize>,
        got: Vec<usize>,
    },

    #[error("Only uniform distribution is allowed for delays, got {0}")]
    NonUniformDelay(String),

    #[error("Coupling with synapse model '{model}' and delay {delay} is not possible: {reason}")]
    SynapseDelayMismatch {
        model: String,
        delay: String,
        reason: &'static str,
    },

    #[error("Within-node delay {delay} of connection {connection} is larger than the TVB integration step {tvb_dt}")]
    WithinNodeDelay {
        connection: String,
        delay: f64,
        tvb_dt: f64,
    },

    #[error("Invalid delay {delay} for {context}")]
    InvalidDelay { delay: f64, context: String },

    #[error("Node {0} is not a region node modeled in the spiking simulator")]
    UnknownNode(NodeIndex),

    #[error("Neuron index {index} out of range for population '{population}' of size {size}")]
    NeuronOutOfRange {
        population: String,
        index: usize,
        size: usize,
    },

    #[error("Population '{population}' in node {node} has invalid size {size}")]
    InvalidSize {
        population: String,
        node: NodeIndex,
        size: f64,
    },

    #[error("Unknown model: {0}")]
    UnknownModel(String),

    #[error("Failed to install module {module}: {reason}")]
    ModuleInstall { module: String, reason: String },

    #[error("Failed to compile module {module}: {reason}")]
    ModuleCompile { module: String, reason: String },

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Builder stage is {current}, expected {expected}")]
    Stage { current: String, expected: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, MultiscaleError>;

/// Index of a region in the TVB structural connectivity
pub type NodeIndex = usize;

/// Time (ms)
pub type Time = f64;

/// Model, synapse and device parameters
pub type Params = serde_json::Map<String, serde_json::Value>;

/// Key of per-node views: `"<index>-<label>"`
pub fn node_key(index: NodeIndex, label: &str) -> String {
    format!("{}-{}", index, label)
}

/// Key of per-node-pair views: `"<src>.<label>-><trg>.<label>"`
pub fn node_pair_key(source: NodeIndex, source_label: &str, target: NodeIndex, target_label: &str) -> String {
    format!("{}.{}->{}.{}", source, source_label, target, target_label)
}

/// Auto-corrected or tolerated violations recorded while configuring and building
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BuildWarning {
    /// Within-node delay not smaller than half the TVB step
    WithinNodeDelay {
        connection: String,
        delay: f64,
        tvb_dt: f64,
    },
    /// Delay raised to the kernel resolution
    DelayClamped {
        context: String,
        delay: f64,
        resolution: f64,
    },
}

impl fmt::Display for BuildWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WithinNodeDelay { connection, delay, tvb_dt } => write!(
                f,
                "Within-node delay {} of {} is not smaller than half the TVB integration step {}",
                delay, connection, tvb_dt
            ),
            Self::DelayClamped { context, delay, resolution } => write!(
                f,
                "Delay {} of {} is smaller than the simulation resolution {}, setting it to the resolution",
                delay, context, resolution
            ),
        }
    }
}
