//! # Multiscale NEST
//!
//! NEST backend for the multiscale builder.
//!
//! NEST (NEural Simulation Tool) addresses nodes by global ids starting at 1,
//! connects node collections with a connectivity rule and a synapse
//! spec, and loads extra neuron models from compiled extension
//! modules. This crate keeps that bookkeeping in an owned [`NestKernel`] and
//! exposes it to the builder through [`NestBackend`].
//!
//! ## Example
//!
//! ```ignore
//! use multiscale_builder::SpikingModelBuilder;
//! use multiscale_nest::{builders, NestBackend};
//!
//! let backend = NestBackend::new(config.extensions.clone())
//!     .register_module(builders::izhikevich_hamker_module());
//! let templates = builders::basal_ganglia_izhikevich(&tvb, builders::BASAL_GANGLIA_COUPLING);
//! let network = SpikingModelBuilder::new(backend, (0..10).collect(), tvb, templates, config)?
//!     .build_spiking_network()?;
//! network.simulate(100.0)?;
//! ```

use multiscale_core::MultiscaleError;
use std::path::PathBuf;
use thiserror::Error;

pub mod backend;
pub mod builders;
pub mod compile;
pub mod kernel;
pub mod models;

pub use backend::{NestBackend, NestDevice, NestPopulation};
pub use compile::{CommandCompiler, ModuleCompiler};
pub use kernel::{ConnRule, ConnSpec, Connection, KernelParams, NestKernel, NodeCollection, NodeId, SynSpec};
pub use models::{ModelCatalog, ModelInfo, ModelKind, ModuleSpec};

#[derive(Error, Debug)]
pub enum NestError {
    #[error("Unknown model: {0}")]
    UnknownModel(String),
    #[error("Node not found: {0}")]
    NodeNotFound(usize),
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("Connection error: {0}")]
    ConnectionError(String),
    #[error("Simulation error: {0}")]
    SimulationError(String),
    #[error("Module {0} is not known to the kernel")]
    ModuleNotFound(String),
    #[error("Module {module} is not built: {path:?} does not exist")]
    ModuleNotBuilt { module: String, path: PathBuf },
    #[error("Compilation of module {module} failed:\n{log}")]
    CompileFailed { module: String, log: String },
    #[error("Compilation of module {module} did not finish within {secs} s")]
    CompileTimeout { module: String, secs: u64 },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, NestError>;

impl From<NestError> for MultiscaleError {
    fn from(err: NestError) -> Self {
        match err {
            NestError::ModuleNotFound(ref module) | NestError::ModuleNotBuilt { ref module, .. } => {
                MultiscaleError::ModuleInstall {
                    module: module.clone(),
                    reason: err.to_string(),
                }
            }
            NestError::CompileFailed { ref module, .. } | NestError::CompileTimeout { ref module, .. } => {
                MultiscaleError::ModuleCompile {
                    module: module.clone(),
                    reason: err.to_string(),
                }
            }
            NestError::UnknownModel(model) => MultiscaleError::UnknownModel(model),
            NestError::Io(e) => MultiscaleError::Io(e),
            other => MultiscaleError::Backend(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion() {
        let install: MultiscaleError = NestError::ModuleNotFound("xmodule".into()).into();
        assert!(matches!(install, MultiscaleError::ModuleInstall { ref module, .. } if module == "xmodule"));

        let compile: MultiscaleError = NestError::CompileTimeout {
            module: "xmodule".into(),
            secs: 3,
        }
        .into();
        match compile {
            MultiscaleError::ModuleCompile { reason, .. } => assert!(reason.contains("3 s")),
            other => panic!("unexpected {:?}", other),
        }

        let backend: MultiscaleError = NestError::NodeNotFound(7).into();
        assert!(matches!(backend, MultiscaleError::Backend(ref text) if text.contains('7')));
    }
}
