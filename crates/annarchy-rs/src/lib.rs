//! # Multiscale ANNarchy
//!
//! ANNarchy backend for the multiscale builder.
//!
//! ANNarchy networks are made of populations of a neuron type, projections
//! between population views feeding a named conductance (`exc`, `inh`), and
//! monitors. Input devices become spike source populations projecting onto
//! their targets; output devices become monitors.
//!
//! Neuron types are not compiled from extension modules here: register them
//! with [`AnnarchyBackend::register_type`] before building.

use multiscale_core::MultiscaleError;
use thiserror::Error;

pub mod backend;
pub mod network;
pub mod neurons;

pub use backend::{AnnarchyBackend, AnnarchyDevice, AnnarchyPopulation, DeviceHandle};
pub use network::{Monitor, Network, Pattern, Population, PopulationView, Projection, ProjectionSpec, Recording};
pub use neurons::{NeuronType, TypeCatalog, TypeKind};

#[derive(Error, Debug)]
pub enum AnnarchyError {
    #[error("Unknown type: {0}")]
    UnknownType(String),
    #[error("Unknown population: {0}")]
    UnknownPopulation(String),
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("Projection error: {0}")]
    Projection(String),
    #[error("Connectivity rule {0} has no ANNarchy connector")]
    UnsupportedRule(String),
    #[error("Simulation error: {0}")]
    Simulation(String),
    #[error("Module {0} cannot be loaded; register its neuron types instead")]
    Extension(String),
    #[error("Module {0} cannot be compiled; register its neuron types instead")]
    Compile(String),
}

pub type Result<T> = std::result::Result<T, AnnarchyError>;

impl From<AnnarchyError> for MultiscaleError {
    fn from(err: AnnarchyError) -> Self {
        match err {
            AnnarchyError::UnknownType(name) => MultiscaleError::UnknownModel(name),
            AnnarchyError::Extension(ref module) => MultiscaleError::ModuleInstall {
                module: module.clone(),
                reason: err.to_string(),
            },
            AnnarchyError::Compile(ref module) => MultiscaleError::ModuleCompile {
                module: module.clone(),
                reason: err.to_string(),
            },
            other => MultiscaleError::Backend(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion() {
        let unknown: MultiscaleError = AnnarchyError::UnknownType("Hodgkin".into()).into();
        assert!(matches!(unknown, MultiscaleError::UnknownModel(ref m) if m == "Hodgkin"));

        let module: MultiscaleError = AnnarchyError::Extension("xmodule".into()).into();
        assert!(matches!(module, MultiscaleError::ModuleInstall { ref module, .. } if module == "xmodule"));

        let compile: MultiscaleError = AnnarchyError::Compile("xmodule".into()).into();
        assert!(matches!(compile, MultiscaleError::ModuleCompile { ref module, .. } if module == "xmodule"));

        let rule: MultiscaleError = AnnarchyError::UnsupportedRule("fixed_total_number".into()).into();
        assert!(matches!(rule, MultiscaleError::Backend(_)));
    }
}
