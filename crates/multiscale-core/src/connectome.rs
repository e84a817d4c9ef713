//! Structural connectivity handed over by TVB.
//!
//! TVB stores the connectome as `weights[[target, source]]`; the helpers here
//! turn it into per-node-pair properties called as `(source, target)`.

use crate::property::Property;
use crate::synapse::Delay;
use crate::{MultiscaleError, NodeIndex, Result, Time};
use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Inputs taken from the TVB simulator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TvbParams {
    /// Integration step (ms)
    pub dt: Time,
    /// Period of the communication monitor (ms)
    pub monitor_period: Time,
    pub number_of_regions: usize,
    pub weights: Array2<f64>,
    pub delays: Array2<f64>,
    pub region_labels: Vec<String>,
    /// Name of the TVB mean-field model
    pub model: String,
}

impl TvbParams {
    /// Zero weights, delays of one step and `Region-<i>` labels
    pub fn new(number_of_regions: usize, dt: Time) -> Self {
        let shape = (number_of_regions, number_of_regions);
        Self {
            dt,
            monitor_period: dt,
            number_of_regions,
            weights: Array2::zeros(shape),
            delays: Array2::from_elem(shape, dt),
            region_labels: (0..number_of_regions).map(|i| format!("Region-{}", i)).collect(),
            model: String::new(),
        }
    }

    pub fn with_weights(mut self, weights: Array2<f64>) -> Self {
        self.weights = weights;
        self
    }

    pub fn with_delays(mut self, delays: Array2<f64>) -> Self {
        self.delays = delays;
        self
    }

    pub fn with_region_labels<S: Into<String>>(mut self, labels: impl IntoIterator<Item = S>) -> Self {
        self.region_labels = labels.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_monitor_period(mut self, period: Time) -> Self {
        self.monitor_period = period;
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn validate(&self) -> Result<()> {
        let n = self.number_of_regions;
        if !(self.dt > 0.0) {
            return Err(MultiscaleError::Config(format!("TVB dt must be positive, got {}", self.dt)));
        }
        for (name, m) in [("weights", &self.weights), ("delays", &self.delays)] {
            if m.dim() != (n, n) {
                return Err(MultiscaleError::Config(format!(
                    "TVB {} must be of shape ({n}, {n}), got {:?}",
                    name,
                    m.dim()
                )));
            }
        }
        if self.weights.iter().any(|&w| w < 0.0) {
            return Err(MultiscaleError::Config("TVB weights must be non-negative".into()));
        }
        if self.delays.iter().any(|&d| d < 0.0) {
            return Err(MultiscaleError::Config("TVB delays must be non-negative".into()));
        }
        if self.region_labels.len() != n {
            return Err(MultiscaleError::Config(format!(
                "Expected {} region labels, got {}",
                n,
                self.region_labels.len()
            )));
        }
        Ok(())
    }

    pub fn region_label(&self, node: NodeIndex) -> Result<&str> {
        self.region_labels
            .get(node)
            .map(String::as_str)
            .ok_or(MultiscaleError::UnknownNode(node))
    }

    /// Weights and delays restricted to the given (sorted) nodes
    pub fn restrict(&self, nodes: &[NodeIndex]) -> Result<(Array2<f64>, Array2<f64>)> {
        if let Some(&bad) = nodes.iter().find(|&&n| n >= self.number_of_regions) {
            return Err(MultiscaleError::UnknownNode(bad));
        }
        let w = self.weights.select(Axis(0), nodes).select(Axis(1), nodes);
        let d = self.delays.select(Axis(0), nodes).select(Axis(1), nodes);
        Ok((w, d))
    }
}

/// Per-node-pair weight `scale * weights[[target, source]]`
pub fn tvb_weight(weights: Arc<Array2<f64>>, scale: f64) -> Property<f64> {
    Property::per_node_pair(move |source, target| {
        weights.get((target, source)).copied().unwrap_or(0.0) * scale
    })
}

/// Per-node-pair delay `max(delays[[target, source]], min_delay)`
pub fn tvb_delay(delays: Arc<Array2<f64>>, min_delay: Time) -> Property<Delay> {
    Property::per_node_pair(move |source, target| {
        Delay::Constant(delays.get((target, source)).copied().unwrap_or(min_delay).max(min_delay))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_defaults() {
        let p = TvbParams::new(3, 0.1);
        assert_eq!(p.region_labels, vec!["Region-0", "Region-1", "Region-2"]);
        assert_eq!(p.weights.sum(), 0.0);
        assert!(p.delays.iter().all(|&d| d == 0.1));
        assert_eq!(p.monitor_period, 0.1);
        assert!(p.validate().is_ok());
    }

    #[test]
    fn test_validate_shape() {
        let p = TvbParams::new(3, 0.1).with_weights(Array2::zeros((2, 3)));
        assert!(p.validate().is_err());
        let p = TvbParams::new(2, 0.1).with_weights(array![[0.0, -1.0], [0.0, 0.0]]);
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_weight_orientation() {
        // row = target, column = source
        let w = Arc::new(array![[0.0, 2.0], [5.0, 0.0]]);
        let f = tvb_weight(w, -0.5).resolve_per_node_pair("weight").unwrap();
        assert_eq!(f(1, 0), -1.0);
        assert_eq!(f(0, 1), -2.5);
    }

    #[test]
    fn test_delay_floor() {
        let d = Arc::new(array![[0.0, 0.01], [3.0, 0.0]]);
        let f = tvb_delay(d, 0.1).resolve_per_node_pair("delay").unwrap();
        assert_eq!(f(1, 0), Delay::Constant(0.1));
        assert_eq!(f(0, 1), Delay::Constant(3.0));
    }

    #[test]
    fn test_restrict() {
        let p = TvbParams::new(3, 0.1).with_weights(array![[0.0, 1.0, 2.0], [3.0, 0.0, 4.0], [5.0, 6.0, 0.0]]);
        let (w, _) = p.restrict(&[0, 2]).unwrap();
        assert_eq!(w, array![[0.0, 2.0], [5.0, 0.0]]);
        assert!(matches!(p.restrict(&[3]), Err(MultiscaleError::UnknownNode(3))));
    }
}
