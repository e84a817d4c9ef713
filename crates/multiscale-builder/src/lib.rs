//! # Multiscale Builder
//!
//! Turns population, connection and device templates into a spiking network
//! of TVB region nodes, through any backend implementing the capability
//! traits of [`backend`].
//!
//! ## Build order
//!
//! | Step | Method |
//! |------|--------|
//! | Reset kernel, derive timing, configure templates, install models | [`SpikingModelBuilder::configure`] |
//! | Region nodes and their populations | [`SpikingModelBuilder::build_spiking_region_nodes`] |
//! | Synapses within each region node | [`SpikingModelBuilder::connect_within_node_spiking_populations`] |
//! | Synapses between region nodes | [`SpikingModelBuilder::connect_spiking_region_nodes`] |
//! | Output, then input devices | [`SpikingModelBuilder::build_and_connect_devices`] |
//! | Assembled network | [`SpikingModelBuilder::build`] |
//!
//! [`SpikingModelBuilder::build_spiking_network`] runs every step.
//!
//! ## Example
//!
//! ```ignore
//! use multiscale_builder::{ConnectionTemplate, NetworkTemplates, PopulationTemplate, SpikingModelBuilder};
//!
//! let templates = NetworkTemplates {
//!     populations: vec![PopulationTemplate::new("E"), PopulationTemplate::new("I").with_scale(0.25)],
//!     within_connections: vec![ConnectionTemplate::many(&["E", "I"], &["E", "I"])],
//!     ..NetworkTemplates::default()
//! };
//! let network = SpikingModelBuilder::new(backend, vec![0, 1], tvb, templates, config)?
//!     .build_spiking_network()?;
//! ```

pub mod backend;
pub mod brain;
pub mod builder;
pub mod connection;
pub mod context;
pub mod device;
pub mod models;
pub mod population;
pub mod templates;

#[cfg(test)]
mod testing;

pub use backend::{
    ConnectionFactory, DeviceFactory, DeviceKind, PopulationFactory, SimulationKernel, SpikingBackend,
    SpikingPopulation,
};
pub use brain::{DeviceSet, DeviceSets, RegionNode, SpikingBrain, SpikingNetwork, View};
pub use builder::{BuildStage, SpikingModelBuilder};
pub use connection::{ConnectionDescriptor, ConnectionScope, SynapseSpec};
pub use device::DeviceDescriptor;
pub use models::ModelSource;
pub use population::PopulationDescriptor;
pub use templates::{
    ConnectionTemplate, DeviceProperty, DeviceTemplate, NetworkTemplates, NeuronSelector, PopulationTemplate,
};
