//! Capabilities a spiking simulator must provide to the builder.
//!
//! A backend is any type implementing the four traits below; the blanket
//! [`SpikingBackend`] impl composes them.

use crate::connection::SynapseSpec;
use multiscale_core::{Delay, NodeIndex, Params, RateSynapseNames, Receptor, ResolvedConnSpec, Result, Time};
use serde::{Deserialize, Serialize};

/// Direction of a device relative to the populations it targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DeviceKind {
    /// Stimulates populations
    Input,
    /// Records from populations
    Output,
}

/// Kernel lifecycle, timing and model management
pub trait SimulationKernel {
    /// Drop every node and connection and restore default kernel settings
    fn reset(&mut self) -> Result<()>;

    fn configure_resolution(&mut self, resolution: Time) -> Result<()>;

    fn resolution(&self) -> Time;

    /// Minimum delay supported by the kernel, if it reports one
    fn min_delay(&self) -> Option<Time> {
        None
    }

    /// Smallest integration step of the kernel, if it imposes one
    fn min_spiking_dt(&self) -> Option<Time> {
        None
    }

    fn rate_synapse_names(&self) -> RateSynapseNames {
        RateSynapseNames::default()
    }

    fn has_model(&self, model: &str) -> bool;

    fn install_module(&mut self, module: &str) -> Result<()>;

    /// Compile an extension module; `force` discards previous build products
    fn compile_module(&mut self, module: &str, force: bool) -> Result<()>;

    fn simulate(&mut self, duration: Time) -> Result<()>;

    /// Current simulation time
    fn time(&self) -> Time;
}

/// Handle to a population created in the kernel
pub trait SpikingPopulation {
    fn label(&self) -> &str;
    fn model(&self) -> &str;
    fn size(&self) -> usize;
}

pub trait PopulationFactory {
    type Population: SpikingPopulation;

    fn create_region_node(&mut self, _node: NodeIndex, _label: &str) -> Result<()> {
        Ok(())
    }

    fn create_population(
        &mut self,
        label: &str,
        model: &str,
        size: usize,
        params: &Params,
    ) -> Result<Self::Population>;
}

pub trait ConnectionFactory: PopulationFactory {
    /// Connect (a selection of) two populations for one receptor type.
    ///
    /// Returns the number of synapses created.
    #[allow(clippy::too_many_arguments)]
    fn connect_populations(
        &mut self,
        source: &Self::Population,
        source_neurons: Option<&[usize]>,
        target: &Self::Population,
        target_neurons: Option<&[usize]>,
        conn_spec: &ResolvedConnSpec,
        synapse: &SynapseSpec,
        receptor: &Receptor,
    ) -> Result<usize>;
}

pub trait DeviceFactory: PopulationFactory {
    type Device;

    fn build_device(&mut self, model: &str, label: &str, kind: DeviceKind, params: &Params) -> Result<Self::Device>;

    /// Connect a device to (a selection of) a population.
    ///
    /// Recorders receive from the population, stimulators project onto it.
    fn connect_device(
        &mut self,
        device: &mut Self::Device,
        population: &Self::Population,
        neurons: Option<&[usize]>,
        weight: f64,
        delay: &Delay,
        receptor: &Receptor,
    ) -> Result<usize>;
}

/// A complete spiking simulator backend
pub trait SpikingBackend: SimulationKernel + ConnectionFactory + DeviceFactory {}

impl<T> SpikingBackend for T where T: SimulationKernel + ConnectionFactory + DeviceFactory {}
