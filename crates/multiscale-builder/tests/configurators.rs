//! Invariants of the configurators over generated templates.

use multiscale_builder::connection::configure_cross_connections;
use multiscale_builder::context::ConfigContext;
use multiscale_builder::population::configure_populations;
use multiscale_builder::{ConnectionTemplate, PopulationTemplate};
use multiscale_core::{BuilderConfig, RateSynapseNames, Timing, TvbParams};
use proptest::prelude::*;
use std::collections::BTreeSet;

const REGIONS: usize = 8;

fn with_context<T>(nodes: &[usize], f: impl FnOnce(&ConfigContext<'_>) -> T) -> T {
    let config = BuilderConfig::default();
    let tvb = TvbParams::new(REGIONS, 0.1);
    let names = RateSynapseNames::default();
    let timing = Timing::derive(0.1, 4.0, 0.001, 2.0, 0.001).expect("valid timing");
    let ctx = ConfigContext {
        config: &config,
        tvb: &tvb,
        nodes,
        population_order: config.population_order,
        timing,
        resolution: timing.spiking_dt,
        rate_synapses: &names,
    };
    f(&ctx)
}

fn node_set() -> impl Strategy<Value = Vec<usize>> {
    proptest::collection::btree_set(0..REGIONS, 1..=REGIONS).prop_map(|s| s.into_iter().collect())
}

proptest! {
    #[test]
    fn population_sizes_follow_scale(scale in 0.01f64..3.0, nodes in node_set()) {
        let templates = vec![PopulationTemplate::new("E").with_scale(scale)];
        let pops = with_context(&nodes, |ctx| configure_populations(&templates, ctx)).unwrap();
        prop_assert_eq!(pops.descriptors.len(), nodes.len());
        let expected = (scale * 100.0).round() as usize;
        prop_assert!(pops.descriptors.iter().all(|d| d.size == expected));
    }

    #[test]
    fn cross_pairs_skip_self(nodes in node_set(), sources in node_set(), targets in node_set()) {
        let spiking: BTreeSet<usize> = nodes.iter().copied().collect();
        let sources: Vec<usize> = sources.into_iter().filter(|n| spiking.contains(n)).collect();
        let targets: Vec<usize> = targets.into_iter().filter(|n| spiking.contains(n)).collect();
        let populations = vec![PopulationTemplate::new("E")];
        let connections = vec![ConnectionTemplate::new("E", "E").between(sources.clone(), targets.clone())];

        let descriptors = with_context(&nodes, |ctx| {
            let pops = configure_populations(&populations, ctx)?;
            configure_cross_connections(&connections, &pops, ctx)
        })
        .unwrap()
        .descriptors;

        let overlap = sources.iter().filter(|s| targets.contains(s)).count();
        prop_assert_eq!(descriptors.len(), sources.len() * targets.len() - overlap);
        prop_assert!(descriptors.iter().all(|d| d.source_node != d.target_node));
    }
}

#[test]
fn cross_template_from_one_source() -> anyhow::Result<()> {
    let populations = vec![PopulationTemplate::new("E")];
    let connections = vec![ConnectionTemplate::new("E", "E").between(vec![0], vec![1, 2])];
    let nodes: Vec<usize> = (0..REGIONS).collect();
    let descriptors = with_context(&nodes, |ctx| {
        let pops = configure_populations(&populations, ctx)?;
        configure_cross_connections(&connections, &pops, ctx)
    })?
    .descriptors;
    let pairs: Vec<_> = descriptors.iter().map(|d| (d.source_node, d.target_node)).collect();
    assert_eq!(pairs, vec![(0, 1), (0, 2)]);
    Ok(())
}
