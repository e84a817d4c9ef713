//! State shared by the configurators during one `configure()` pass.

use multiscale_core::{
    BuilderConfig, MultiscaleError, NodeIndex, RateSynapseNames, Result, Time, Timing, TvbParams,
};

pub struct ConfigContext<'a> {
    pub config: &'a BuilderConfig,
    pub tvb: &'a TvbParams,
    /// Spiking region nodes, sorted and unique
    pub nodes: &'a [NodeIndex],
    pub population_order: usize,
    pub timing: Timing,
    /// Kernel resolution after configuration
    pub resolution: Time,
    pub rate_synapses: &'a RateSynapseNames,
}

impl<'a> ConfigContext<'a> {
    pub fn node_label(&self, node: NodeIndex) -> Result<&'a str> {
        self.tvb.region_label(node)
    }

    /// Template nodes (sorted, unique) or every spiking node if none are given
    pub fn nodes_or_all(&self, nodes: Option<&[NodeIndex]>) -> Result<Vec<NodeIndex>> {
        match nodes {
            None => Ok(self.nodes.to_vec()),
            Some(nodes) => {
                let mut nodes = nodes.to_vec();
                nodes.sort_unstable();
                nodes.dedup();
                if let Some(&bad) = nodes.iter().find(|n| self.nodes.binary_search(n).is_err()) {
                    return Err(MultiscaleError::UnknownNode(bad));
                }
                Ok(nodes)
            }
        }
    }
}
